use std::path::{Path, PathBuf};

use anyhow::{ensure, Context};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

/// One (peak list, identification file) pair belonging to a project
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub project: String,
    pub peak_list: String,
    pub identification: String,
}

#[derive(Serialize)]
/// Actual run parameters - may include overrides or default values not set by user
pub struct Search {
    pub version: String,
    pub max_workers: usize,
    pub stats: bool,
    pub tasks: Vec<Task>,
    pub output_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

#[derive(Deserialize, Default)]
/// Input parameters deserialized from JSON file
pub struct Input {
    output_directory: Option<String>,
    max_workers: Option<usize>,
    archive: Option<String>,
    tasks: Option<Vec<Task>>,
    stats: Option<bool>,
}

/// Read a `project;peak_list;identification` manifest without a header row
pub fn read_archive<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Task>> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open archive `{}`", path.display()))?;

    let mut tasks = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        ensure!(
            record.len() >= 3,
            "`{}` line {}: expected `project;peak_list;identification`",
            path.display(),
            line + 1
        );
        tasks.push(Task {
            project: record[0].trim().into(),
            peak_list: record[1].trim().into(),
            identification: record[2].trim().into(),
        });
    }
    Ok(tasks)
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .expect("required parameters");
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(archive) = matches.get_one::<String>("archive") {
            log::trace!("overriding `archive` parameter.");
            input.archive = Some(archive.into());
        }
        if let Some(max_workers) = matches.get_one::<u16>("max-workers").copied() {
            log::trace!("overriding `max_workers` parameter.");
            input.max_workers = Some(max_workers as usize);
        }
        if matches.get_flag("stats") {
            input.stats = Some(true);
        }

        Ok(input)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        psmfeat_io::util::read_json(path).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Search> {
        let mut tasks = self.tasks.unwrap_or_default();
        if let Some(archive) = &self.archive {
            let archived = read_archive(archive)?;
            log::trace!("read {} tasks from `{}`", archived.len(), archive);
            tasks.extend(archived);
        }
        ensure!(
            !tasks.is_empty(),
            "no files to process: set `tasks` or `archive`. For more information try '--help'"
        );

        let max_workers = match self.max_workers {
            Some(0) => {
                log::warn!("`max_workers` must be at least 1");
                1
            }
            Some(n) => n,
            None => num_cpus::get(),
        };

        let output_directory = match self.output_directory {
            Some(path) => {
                let path = PathBuf::from(path);
                std::fs::create_dir_all(&path).with_context(|| {
                    format!("Failed to create output directory `{}`", path.display())
                })?;
                path
            }
            None => std::env::current_dir()?,
        };

        Ok(Search {
            version: clap::crate_version!().into(),
            max_workers,
            stats: self.stats.unwrap_or(false),
            tasks,
            output_paths: Vec::new(),
            output_directory,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_input() -> anyhow::Result<()> {
        let input: Input = serde_json::from_str(
            r#"{
                "max_workers": 0,
                "tasks": [
                    {"project": "PXD000001", "peak_list": "a.mgf", "identification": "a.mzid"}
                ]
            }"#,
        )?;
        let search = input.build()?;
        assert_eq!(search.max_workers, 1);
        assert!(!search.stats);
        assert_eq!(
            search.tasks,
            vec![Task {
                project: "PXD000001".into(),
                peak_list: "a.mgf".into(),
                identification: "a.mzid".into()
            }]
        );
        Ok(())
    }

    #[test]
    fn no_tasks() {
        assert!(Input::default().build().is_err());
    }

    #[test]
    fn archive_manifest() -> anyhow::Result<()> {
        let tasks = read_archive("../../tests/demo.archive")?;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].project, "demo");
        assert_eq!(tasks[0].peak_list, "../../tests/demo.mgf");
        assert_eq!(tasks[0].identification, "../../tests/demo.mzid");
        assert_eq!(tasks[1].project, "missing");
        Ok(())
    }
}
