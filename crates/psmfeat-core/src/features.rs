use serde::Serialize;

use crate::ion_series::{Fragment, Kind};
use crate::join::Psm;
use crate::label::{class_label, Decision, LabelError};
use crate::mass::{mass_ladder, MassError, Tolerance};
use crate::matching::{match_series, MatchResult};

/// Written into the identifier columns until a row-sink assigns real ids
pub const UNDEFINED: &str = "UNDEFINED";

#[derive(Serialize, Clone, Debug, PartialEq)]
/// Features of a search engine peptide spectrum match
pub struct FeatureVector {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Domain_Id")]
    pub domain_id: String,
    #[serde(rename = "Charge")]
    pub charge: u8,
    #[serde(rename = "sumI")]
    pub sum_intensity: f64,
    pub norm_high_peak_intensity: f64,
    #[serde(rename = "Num_of_Modifications")]
    pub modifications: usize,
    #[serde(rename = "Pep_Len")]
    pub peptide_len: usize,
    /// Modifications per residue
    #[serde(rename = "Num_Pl")]
    pub modifications_per_residue: f64,
    /// Precursor mass reported by the peak list
    #[serde(rename = "mh(group)")]
    pub mh_group: f64,
    /// Calculated mass reported by the search engine
    #[serde(rename = "mh(domain)")]
    pub mh_domain: f64,
    #[serde(rename = "uniqueDM")]
    pub delta_mass: f64,
    #[serde(rename = "uniqueDMppm")]
    pub delta_mass_ppm: f64,
    #[serde(rename = "Sum_match_intensities")]
    pub matched_intensity: f64,
    #[serde(rename = "Log_sum_match_intensity")]
    pub log_matched_intensity: f64,
    #[serde(rename = "b+_ratio")]
    pub b1_ratio: f64,
    #[serde(rename = "b++_ratio")]
    pub b2_ratio: f64,
    #[serde(rename = "y+_ratio")]
    pub y1_ratio: f64,
    #[serde(rename = "y++_ratio")]
    pub y2_ratio: f64,
    #[serde(rename = "b+_count")]
    pub b1_count: usize,
    #[serde(rename = "b++_count")]
    pub b2_count: usize,
    #[serde(rename = "y+_count")]
    pub y1_count: usize,
    #[serde(rename = "y++_count")]
    pub y2_count: usize,
    #[serde(rename = "b+_long_count")]
    pub b1_longest: usize,
    #[serde(rename = "b++_long_count")]
    pub b2_longest: usize,
    #[serde(rename = "y+_long_count")]
    pub y1_longest: usize,
    #[serde(rename = "y++_long_count")]
    pub y2_longest: usize,
    #[serde(rename = "median_matched_frag_ion_errors")]
    pub median_error: f64,
    #[serde(rename = "mean_matched_frag_ion_errors")]
    pub mean_error: f64,
    #[serde(rename = "iqr_matched_frag_ion_errors")]
    pub iqr_error: f64,
    #[serde(rename = "Class_Label")]
    pub label: bool,
    #[serde(rename = "ClassLabel_Decision")]
    pub decision: Decision,
}

/// Result of scoring a single PSM
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Row(Box<FeatureVector>),
    /// None of the four ion ladders matched a single peak
    NoIonMatches,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureError {
    Mass(MassError),
    Label(LabelError),
}

impl std::fmt::Display for FeatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mass(e) => e.fmt(f),
            Self::Label(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for FeatureError {}

impl From<MassError> for FeatureError {
    fn from(value: MassError) -> Self {
        Self::Mass(value)
    }
}

impl From<LabelError> for FeatureError {
    fn from(value: LabelError) -> Self {
        Self::Label(value)
    }
}

/// Matched counts, ratios and longest runs of one fragment ladder
#[derive(Copy, Clone, Default, Debug)]
struct SeriesStats {
    count: usize,
    ratio: f64,
    longest: usize,
}

pub struct Scorer {
    pub tolerance: Tolerance,
}

impl Scorer {
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// Match the b/y ladders of the identified peptide against its spectrum
    /// and summarize the matches into a [`FeatureVector`]
    pub fn score(&self, psm: &Psm) -> Result<Outcome, FeatureError> {
        let identification = psm.identification;
        let spectrum = psm.spectrum;

        let masses = mass_ladder(&identification.sequence, &identification.modifications)?;
        let peaks = spectrum.sorted_peaks();

        let results: Vec<(Fragment, MatchResult)> = Fragment::SCORED
            .iter()
            .map(|frag| {
                let ladder = frag.ladder(&masses);
                (*frag, match_series(&ladder, &peaks, self.tolerance))
            })
            .collect();

        let mut errors = results
            .iter()
            .flat_map(|(_, r)| r.errors.iter().copied())
            .collect::<Vec<_>>();
        if errors.is_empty() {
            return Ok(Outcome::NoIonMatches);
        }
        errors.sort_by(|a, b| a.total_cmp(b));

        let label = class_label(identification)?;

        let matches = results.iter().map(|(_, r)| r.len()).sum::<usize>();
        let matched_intensity = results
            .iter()
            .map(|(_, r)| r.summed_intensity())
            .sum::<f64>();

        let stats = |kind: Kind, charge: u8| -> SeriesStats {
            results
                .iter()
                .find(|(frag, _)| frag.kind == kind && frag.charge == charge)
                .map(|(_, r)| SeriesStats {
                    count: r.len(),
                    ratio: r.len() as f64 / matches as f64,
                    longest: r.longest_run,
                })
                .unwrap_or_default()
        };
        let b1 = stats(Kind::B, 1);
        let b2 = stats(Kind::B, 2);
        let y1 = stats(Kind::Y, 1);
        let y2 = stats(Kind::Y, 2);

        let sum_intensity = spectrum.total_intensity();
        let norm_high_peak_intensity = match sum_intensity > 0.0 {
            true => spectrum.highest_intensity() / sum_intensity,
            false => 0.0,
        };

        let peptide_len = identification.sequence.len();
        let modifications = identification.modifications.len();
        let calculated = identification.calculated_mass;
        let delta_mass = calculated - spectrum.precursor_mass;

        Ok(Outcome::Row(Box::new(FeatureVector {
            id: UNDEFINED.into(),
            domain_id: UNDEFINED.into(),
            charge: spectrum.charge,
            sum_intensity,
            norm_high_peak_intensity,
            modifications,
            peptide_len,
            modifications_per_residue: modifications as f64 / peptide_len as f64,
            mh_group: spectrum.precursor_mass,
            mh_domain: calculated,
            delta_mass,
            delta_mass_ppm: delta_mass / calculated * 1E6,
            matched_intensity,
            log_matched_intensity: log_sum(matched_intensity),
            b1_ratio: b1.ratio,
            b2_ratio: b2.ratio,
            y1_ratio: y1.ratio,
            y2_ratio: y2.ratio,
            b1_count: b1.count,
            b2_count: b2.count,
            y1_count: y1.count,
            y2_count: y2.count,
            b1_longest: b1.longest,
            b2_longest: b2.longest,
            y1_longest: y1.longest,
            y2_longest: y2.longest,
            median_error: median(&errors),
            mean_error: mean(&errors),
            iqr_error: iqr(&errors),
            label: label.label,
            decision: label.decision,
        })))
    }
}

/// log10 of a summed intensity, 0 for an empty sum
pub fn log_sum(sum: f64) -> f64 {
    if sum > 0.0 {
        sum.log10()
    } else {
        0.0
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of a sorted slice: the middle element, or the mean of the two
/// middle elements for an even length
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2],
        _ => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Percentile of a sorted slice, interpolating linearly between the closest ranks
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let position = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = position.floor() as usize;
    let hi = position.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (position - lo as f64)
}

/// Interquartile range of a sorted slice
pub fn iqr(sorted: &[f64]) -> f64 {
    percentile(sorted, 75.0) - percentile(sorted, 25.0)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::label::MASCOT_SCORE;
    use crate::peptide::{IdentificationRecord, Modification};
    use crate::spectrum::SpectrumRecord;

    fn identification(sequence: &str) -> IdentificationRecord {
        IdentificationRecord {
            spectrum_id: "index=0".into(),
            sequence: sequence.into(),
            rank: Some(1),
            experimental_mass: 133.1,
            calculated_mass: 133.0,
            ..Default::default()
        }
    }

    fn glycine_spectrum() -> SpectrumRecord {
        SpectrumRecord {
            title: "GG".into(),
            charge: 1,
            precursor_mass: 133.1,
            mz: vec![97.0403, 40.01884, 79.02974, 58.0294],
            intensity: vec![40.0, 10.0, 30.0, 20.0],
        }
    }

    fn score(identification: &IdentificationRecord, spectrum: &SpectrumRecord) -> Outcome {
        let psm = Psm {
            index: 0,
            spectrum,
            identification,
        };
        Scorer::new(Tolerance::new(0.02, 0.02)).score(&psm).unwrap()
    }

    #[test]
    fn glycine_dipeptide() {
        let id = identification("GG");
        let row = match score(&id, &glycine_spectrum()) {
            Outcome::Row(row) => row,
            Outcome::NoIonMatches => panic!("expected matches"),
        };

        assert_eq!(row.id, UNDEFINED);
        assert_eq!(row.charge, 1);
        assert_eq!(row.peptide_len, 2);
        assert_eq!(row.modifications, 0);
        assert_eq!(row.modifications_per_residue, 0.0);

        assert_eq!(
            (row.b1_count, row.y1_count, row.b2_count, row.y2_count),
            (2, 2, 1, 0)
        );
        assert_eq!(
            (row.b1_longest, row.y1_longest, row.b2_longest, row.y2_longest),
            (1, 1, 0, 0)
        );
        assert!((row.b1_ratio - 0.4).abs() < 1E-9);
        assert!((row.y1_ratio - 0.4).abs() < 1E-9);
        assert!((row.b2_ratio - 0.2).abs() < 1E-9);
        assert_eq!(row.y2_ratio, 0.0);

        assert!((row.sum_intensity - 100.0).abs() < 1E-9);
        assert!((row.norm_high_peak_intensity - 0.4).abs() < 1E-9);
        assert!((row.matched_intensity - 110.0).abs() < 1E-9);
        assert!((row.log_matched_intensity - 110f64.log10()).abs() < 1E-9);

        assert!((row.delta_mass + 0.1).abs() < 1E-9);
        assert!((row.delta_mass_ppm + 0.1 / 133.0 * 1E6).abs() < 1E-3);
        assert!(row.median_error < 1E-4);
        assert!(row.iqr_error < 1E-4);

        assert!(row.label);
        assert_eq!(row.decision, Decision::Rank);
    }

    #[test]
    fn no_peaks_no_row() {
        let spectrum = SpectrumRecord {
            precursor_mass: 133.1,
            ..Default::default()
        };
        assert_eq!(
            score(&identification("GG"), &spectrum),
            Outcome::NoIonMatches
        );
    }

    #[test]
    fn modification_out_of_range() {
        let mut id = identification("GG");
        id.modifications.push(Modification::new(15.9949, 3));
        let spectrum = glycine_spectrum();
        let psm = Psm {
            index: 0,
            spectrum: &spectrum,
            identification: &id,
        };
        let err = Scorer::new(Tolerance::new(0.02, 0.02))
            .score(&psm)
            .unwrap_err();
        assert!(matches!(
            err,
            FeatureError::Mass(MassError::ModificationOutOfRange { .. })
        ));
    }

    #[test]
    fn undetermined_label() {
        let mut id = identification("GG");
        id.rank = None;
        id.parameters.insert(MASCOT_SCORE.into(), "40".into());
        let spectrum = glycine_spectrum();
        let psm = Psm {
            index: 0,
            spectrum: &spectrum,
            identification: &id,
        };
        assert_eq!(
            Scorer::new(Tolerance::new(0.02, 0.02)).score(&psm),
            Err(FeatureError::Label(LabelError::Undetermined))
        );
    }

    #[test]
    fn log_sum_zero_iff_sum_zero() {
        assert_eq!(log_sum(0.0), 0.0);
        assert!((log_sum(1000.0) - 3.0).abs() < 1E-12);
        assert!(log_sum(2.0) != 0.0);
    }

    #[test]
    fn median_odd_even() {
        assert_eq!(median(&[1.0, 2.0, 7.0]), 2.0);
        assert_eq!(median(&[1.0, 2.0, 4.0, 7.0]), 3.0);
        assert_eq!(median(&[5.0]), 5.0);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn interquartile_range() {
        // Same as numpy.percentile with linear interpolation
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&v, 25.0) - 1.75).abs() < 1E-12);
        assert!((percentile(&v, 75.0) - 3.25).abs() < 1E-12);
        assert!((iqr(&v) - 1.5).abs() < 1E-12);
        assert_eq!(iqr(&[0.3]), 0.0);
        assert_eq!(mean(&v), 2.5);
    }
}
