use std::path::PathBuf;

use psmfeat_core::features::FeatureVector;

use crate::runner::{Runner, Statistics};

pub const HEADER: [&str; 31] = [
    "Id",
    "Domain_Id",
    "Charge",
    "sumI",
    "norm_high_peak_intensity",
    "Num_of_Modifications",
    "Pep_Len",
    "Num_Pl",
    "mh(group)",
    "mh(domain)",
    "uniqueDM",
    "uniqueDMppm",
    "Sum_match_intensities",
    "Log_sum_match_intensity",
    "b+_ratio",
    "b++_ratio",
    "y+_ratio",
    "y++_ratio",
    "b+_count",
    "b++_count",
    "y+_count",
    "y++_count",
    "b+_long_count",
    "b++_long_count",
    "y+_long_count",
    "y++_long_count",
    "median_matched_frag_ion_errors",
    "mean_matched_frag_ion_errors",
    "iqr_matched_frag_ion_errors",
    "Class_Label",
    "ClassLabel_Decision",
];

pub fn serialize_feature(feature: &FeatureVector) -> csv::ByteRecord {
    let mut record = csv::ByteRecord::new();
    record.push_field(feature.id.as_bytes());
    record.push_field(feature.domain_id.as_bytes());
    record.push_field(itoa::Buffer::new().format(feature.charge).as_bytes());
    record.push_field(ryu::Buffer::new().format(feature.sum_intensity).as_bytes());
    record.push_field(
        ryu::Buffer::new()
            .format(feature.norm_high_peak_intensity)
            .as_bytes(),
    );
    record.push_field(itoa::Buffer::new().format(feature.modifications).as_bytes());
    record.push_field(itoa::Buffer::new().format(feature.peptide_len).as_bytes());
    record.push_field(
        ryu::Buffer::new()
            .format(feature.modifications_per_residue)
            .as_bytes(),
    );
    record.push_field(ryu::Buffer::new().format(feature.mh_group).as_bytes());
    record.push_field(ryu::Buffer::new().format(feature.mh_domain).as_bytes());
    record.push_field(ryu::Buffer::new().format(feature.delta_mass).as_bytes());
    record.push_field(ryu::Buffer::new().format(feature.delta_mass_ppm).as_bytes());
    record.push_field(
        ryu::Buffer::new()
            .format(feature.matched_intensity)
            .as_bytes(),
    );
    record.push_field(
        ryu::Buffer::new()
            .format(feature.log_matched_intensity)
            .as_bytes(),
    );
    for ratio in [
        feature.b1_ratio,
        feature.b2_ratio,
        feature.y1_ratio,
        feature.y2_ratio,
    ] {
        record.push_field(ryu::Buffer::new().format(ratio).as_bytes());
    }
    for count in [
        feature.b1_count,
        feature.b2_count,
        feature.y1_count,
        feature.y2_count,
        feature.b1_longest,
        feature.b2_longest,
        feature.y1_longest,
        feature.y2_longest,
    ] {
        record.push_field(itoa::Buffer::new().format(count).as_bytes());
    }
    record.push_field(ryu::Buffer::new().format(feature.median_error).as_bytes());
    record.push_field(ryu::Buffer::new().format(feature.mean_error).as_bytes());
    record.push_field(ryu::Buffer::new().format(feature.iqr_error).as_bytes());
    record.push_field(match feature.label {
        true => b"true",
        false => b"false",
    });
    record.push_field(feature.decision.as_str().as_bytes());
    record
}

impl Runner {
    pub fn make_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        self.parameters.output_directory.join(file_name.as_ref())
    }

    /// Write every row of a project to `<project>.csv`
    pub fn write_project(&self, project: &str, features: &[FeatureVector]) -> anyhow::Result<String> {
        let path = self.make_path(format!("{}.csv", project));

        let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
        wtr.write_byte_record(&csv::ByteRecord::from(HEADER.to_vec()))?;
        for feature in features {
            wtr.write_byte_record(&serialize_feature(feature))?;
        }
        wtr.flush()?;

        let bytes = wtr.into_inner()?;
        std::fs::write(&path, bytes)?;
        Ok(path.display().to_string())
    }

    pub fn write_statistics(&self, stats: &Statistics) -> anyhow::Result<Vec<String>> {
        let mut paths = Vec::new();
        for (name, column, counts) in [
            ("software.tsv", "software", &stats.software),
            ("score_params.tsv", "score_params", &stats.score_params),
        ] {
            let path = self.make_path(name);
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_writer(vec![]);
            wtr.write_record([column, "files"])?;
            for (key, count) in counts {
                let mut record = csv::ByteRecord::new();
                record.push_field(key.as_bytes());
                record.push_field(itoa::Buffer::new().format(*count).as_bytes());
                wtr.write_byte_record(&record)?;
            }
            wtr.flush()?;

            let bytes = wtr.into_inner()?;
            std::fs::write(&path, bytes)?;
            paths.push(path.display().to_string());
        }
        Ok(paths)
    }
}
