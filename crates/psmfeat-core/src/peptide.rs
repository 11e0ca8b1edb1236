use fnv::FnvHashMap;
use serde::Serialize;

/// Mass shift applied to a single residue
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Modification {
    /// Monoisotopic mass delta
    pub delta: f64,
    /// 1-based residue position, 0 being the N-terminus
    pub position: usize,
}

impl Modification {
    pub fn new(delta: f64, position: usize) -> Self {
        Self { delta, position }
    }
}

/// A search engine's identification of a single spectrum
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IdentificationRecord {
    /// Native spectrum identifier, e.g. `index=12`
    pub spectrum_id: String,
    pub sequence: String,
    pub modifications: Vec<Modification>,
    /// Rank of this identification among all candidates for the spectrum
    pub rank: Option<u32>,
    /// Experimental precursor m/z
    pub experimental_mass: f64,
    /// Calculated precursor m/z
    pub calculated_mass: f64,
    pub is_decoy: bool,
    /// Engine specific scores and probabilities, keyed by cvParam name
    pub parameters: FnvHashMap<String, String>,
}

impl IdentificationRecord {
    /// Look up a search engine parameter and parse it as a number
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters
            .get(name)
            .and_then(|value| value.trim().parse::<f64>().ok())
    }
}
