use serde::Serialize;

/// An observed fragment peak
#[derive(PartialEq, PartialOrd, Copy, Clone, Default, Debug, Serialize)]
pub struct Peak {
    pub mz: f64,
    pub intensity: f64,
}

/// One `BEGIN IONS` .. `END IONS` block of a peak list
#[derive(Clone, Default, Debug, PartialEq, Serialize)]
pub struct SpectrumRecord {
    pub title: String,
    /// Precursor charge, 0 if the file did not state a usable one
    pub charge: u8,
    /// Precursor m/z
    pub precursor_mass: f64,
    /// M/z array
    pub mz: Vec<f64>,
    /// Intensity array, parallel to `mz`
    pub intensity: Vec<f64>,
}

impl SpectrumRecord {
    /// Peaks sorted by m/z in ascending order
    pub fn sorted_peaks(&self) -> Vec<Peak> {
        let mut peaks = self
            .mz
            .iter()
            .zip(self.intensity.iter())
            .map(|(&mz, &intensity)| Peak { mz, intensity })
            .collect::<Vec<_>>();
        peaks.sort_by(|a, b| a.mz.total_cmp(&b.mz));
        peaks
    }

    pub fn total_intensity(&self) -> f64 {
        self.intensity.iter().sum()
    }

    pub fn highest_intensity(&self) -> f64 {
        self.intensity.iter().copied().fold(0.0, f64::max)
    }
}
