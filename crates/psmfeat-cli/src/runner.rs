use std::collections::{BTreeMap, BTreeSet};
use std::ops::AddAssign;
use std::time::Instant;

use anyhow::Context;
use log::info;
use psmfeat_core::features::{FeatureError, FeatureVector, Outcome, Scorer};
use psmfeat_core::join::join;
use psmfeat_io::mzid::Identifications;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;

use crate::input::{Search, Task};

/// Per-file-pair bookkeeping of why PSMs did or did not produce a row
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub identifications: usize,
    /// Items whose SpectrumIdentificationResult had no spectrum index
    pub rejected: usize,
    pub non_standard: usize,
    /// Identifications kept as targets without PeptideEvidence decoy status
    pub without_evidence: usize,
    pub missing_spectrum: usize,
    pub mass_mismatch: usize,
    pub no_ion_matches: usize,
    pub undetermined_label: usize,
    /// Feature computation aborted, e.g. a modification beyond the sequence
    pub aborted: usize,
    pub rows: usize,
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        self.identifications += rhs.identifications;
        self.rejected += rhs.rejected;
        self.non_standard += rhs.non_standard;
        self.without_evidence += rhs.without_evidence;
        self.missing_spectrum += rhs.missing_spectrum;
        self.mass_mismatch += rhs.mass_mismatch;
        self.no_ion_matches += rhs.no_ion_matches;
        self.undetermined_label += rhs.undetermined_label;
        self.aborted += rhs.aborted;
        self.rows += rhs.rows;
    }
}

pub struct TaskOutput {
    pub project: String,
    pub rows: Vec<FeatureVector>,
    pub tally: Tally,
}

/// Load both files of a task, join them and score every PSM
pub fn process(task: &Task) -> anyhow::Result<TaskOutput> {
    info!("- loading identifications from {}", task.identification);
    let identifications = psmfeat_io::util::read_mzid(&task.identification)
        .with_context(|| format!("Failed to parse `{}`", task.identification))?;
    let tolerance = identifications
        .tolerance()
        .with_context(|| format!("Skipping `{}`", task.identification))?;

    info!("- loading spectra from {}", task.peak_list);
    let spectra = psmfeat_io::util::read_mgf(&task.peak_list)
        .with_context(|| format!("Failed to parse `{}`", task.peak_list))?;

    let (psms, summary) = join(&spectra, &identifications.records);
    let mut tally = Tally {
        identifications: identifications.records.len(),
        rejected: identifications.rejected,
        non_standard: identifications.non_standard,
        without_evidence: identifications.without_evidence,
        missing_spectrum: summary.missing_spectrum,
        mass_mismatch: summary.mass_mismatch,
        ..Default::default()
    };

    let scorer = Scorer::new(tolerance);
    let mut rows = Vec::with_capacity(psms.len());
    for psm in &psms {
        match scorer.score(psm) {
            Ok(Outcome::Row(row)) => rows.push(*row),
            Ok(Outcome::NoIonMatches) => tally.no_ion_matches += 1,
            Err(FeatureError::Label(e)) => {
                log::debug!("{} ({}): {}", psm.identification.spectrum_id, task.identification, e);
                tally.undetermined_label += 1;
            }
            Err(FeatureError::Mass(e)) => {
                log::error!("{}: {}", task.identification, e);
                tally.aborted += 1;
            }
        }
    }
    tally.rows = rows.len();

    report(task, &tally);
    Ok(TaskOutput {
        project: task.project.clone(),
        rows,
        tally,
    })
}

fn report(task: &Task, tally: &Tally) {
    let skipped = [
        (tally.rejected, "identifications without a spectrum index"),
        (tally.non_standard, "peptides with non-standard residues"),
        (tally.missing_spectrum, "identifications not found in peak list"),
        (tally.mass_mismatch, "identifications not matching precursor mass"),
        (tally.undetermined_label, "PSMs without score, probability or rank"),
        (tally.aborted, "PSMs with invalid modifications"),
    ];
    for (count, reason) in skipped {
        if count > 0 {
            log::warn!("{}: skipped {} {}", task.identification, count, reason);
        }
    }
    if tally.without_evidence > 0 {
        info!(
            "{}: {} identifications without decoy evidence, treated as targets",
            task.identification, tally.without_evidence
        );
    }
    if tally.no_ion_matches > 0 {
        info!(
            "{}: {} PSMs without matched fragment ions",
            task.identification, tally.no_ion_matches
        );
    }
    info!(
        "{}: {} rows from {} identifications",
        task.identification, tally.rows, tally.identifications
    );
}

/// Software and score-parameter names of every identification file
#[derive(Default, Debug)]
pub struct Statistics {
    pub software: BTreeMap<String, usize>,
    pub score_params: BTreeMap<String, usize>,
}

impl Statistics {
    pub fn add(&mut self, identifications: &Identifications) {
        let software = identifications
            .parameters
            .software
            .clone()
            .unwrap_or_else(|| "unknown".into());
        let names = identifications
            .parameters
            .score_names
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";");
        *self.software.entry(software).or_default() += 1;
        *self.score_params.entry(names).or_default() += 1;
    }
}

pub struct Runner {
    pub parameters: Search,
    start: Instant,
}

impl Runner {
    pub fn new(parameters: Search) -> Self {
        Self {
            parameters,
            start: Instant::now(),
        }
    }

    fn pool(&self) -> anyhow::Result<rayon::ThreadPool> {
        let threads = num_cpus::get().min(self.parameters.max_workers).max(1);
        log::trace!("using {} worker threads", threads);
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("Failed to build worker pool")
    }

    /// Score every task, returning successful outputs in task order
    pub fn batch_files(&self, pool: &rayon::ThreadPool) -> Vec<TaskOutput> {
        let results = pool.install(|| {
            self.parameters
                .tasks
                .par_iter()
                .map(|task| (task, process(task)))
                .collect::<Vec<_>>()
        });

        let mut outputs = Vec::with_capacity(results.len());
        for (task, result) in results {
            match result {
                Ok(output) => outputs.push(output),
                Err(e) => log::error!("{} / {}: {:#}", task.peak_list, task.identification, e),
            }
        }
        outputs
    }

    pub fn collect_statistics(&self, pool: &rayon::ThreadPool) -> Statistics {
        let paths = self
            .parameters
            .tasks
            .iter()
            .map(|task| task.identification.as_str())
            .collect::<BTreeSet<_>>();

        let parsed = pool.install(|| {
            paths
                .into_par_iter()
                .map(|path| (path, psmfeat_io::util::read_mzid(path)))
                .collect::<Vec<_>>()
        });

        let mut stats = Statistics::default();
        for (path, result) in parsed {
            match result {
                Ok(identifications) => stats.add(&identifications),
                Err(e) => log::error!("{}: {}", path, e),
            }
        }
        stats
    }

    pub fn run(mut self) -> anyhow::Result<Tally> {
        let pool = self.pool()?;
        let mut total = Tally::default();

        if self.parameters.stats {
            let stats = self.collect_statistics(&pool);
            let files = stats.software.values().sum::<usize>();
            let paths = self.write_statistics(&stats)?;
            self.parameters.output_paths.extend(paths);
            info!("tallied software and score parameters of {} files", files);
        } else {
            let outputs = self.batch_files(&pool);
            info!(
                "processed {}/{} file pairs",
                outputs.len(),
                self.parameters.tasks.len()
            );

            let mut projects: BTreeMap<String, Vec<FeatureVector>> = BTreeMap::new();
            for output in outputs {
                total += output.tally;
                projects
                    .entry(output.project)
                    .or_default()
                    .extend(output.rows);
            }
            for (project, rows) in &projects {
                let path = self.write_project(project, rows)?;
                self.parameters.output_paths.push(path);
            }
            info!(
                "wrote {} rows, {} PSMs without matched fragment ions",
                total.rows, total.no_ion_matches
            );
        }

        let path = self.make_path("results.json");
        self.parameters
            .output_paths
            .push(path.display().to_string());
        println!("{}", serde_json::to_string_pretty(&self.parameters)?);

        let bytes = serde_json::to_vec_pretty(&self.parameters)?;
        std::fs::write(&path, bytes)?;

        let run_time = (Instant::now() - self.start).as_secs();
        info!("finished in {}s", run_time);
        Ok(total)
    }
}
