use serde::{Deserialize, Serialize};

use crate::mass::{H2O, HYDROGEN};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    B,
    Y,
}

/// Ion type and fragment charge state
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fragment {
    pub kind: Kind,
    pub charge: u8,
}

impl Fragment {
    /// The four ladders scored for every PSM, in feature order
    pub const SCORED: [Fragment; 4] = [
        Fragment { kind: Kind::B, charge: 1 },
        Fragment { kind: Kind::Y, charge: 1 },
        Fragment { kind: Kind::B, charge: 2 },
        Fragment { kind: Kind::Y, charge: 2 },
    ];

    /// Theoretical m/z ladder of this fragment type for a residue mass ladder
    pub fn ladder(&self, masses: &[f64]) -> Vec<f64> {
        IonSeries::new(masses, self.kind, self.charge).collect()
    }
}

impl std::fmt::Display for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            Kind::B => 'b',
            Kind::Y => 'y',
        };
        write!(f, "{}{}", kind, "+".repeat(self.charge as usize))
    }
}

/// Generate B/Y ion m/z values for a residue mass ladder under a given charge state.
///
/// B ions are emitted N- to C-terminal, Y ions from the C-terminal residue
/// inwards, so both series are increasing in m/z.
pub struct IonSeries<'m> {
    pub kind: Kind,
    charge: f64,
    masses: &'m [f64],
    cumulative_mz: f64,
    idx: usize,
}

impl<'m> IonSeries<'m> {
    /// Create a new [`IonSeries`] iterator for a residue mass ladder
    pub fn new(masses: &'m [f64], kind: Kind, charge: u8) -> Self {
        Self {
            kind,
            charge: charge as f64,
            masses,
            cumulative_mz: 0.0,
            idx: 0,
        }
    }
}

impl<'m> Iterator for IonSeries<'m> {
    type Item = f64;

    fn next(&mut self) -> Option<Self::Item> {
        let residue = match self.kind {
            Kind::B => *self.masses.get(self.idx)?,
            Kind::Y => *self
                .masses
                .len()
                .checked_sub(self.idx + 1)
                .and_then(|ix| self.masses.get(ix))?,
        };

        self.cumulative_mz = match (self.idx, self.kind) {
            (0, Kind::B) => (residue + self.charge * HYDROGEN - H2O) / self.charge,
            (0, Kind::Y) => (residue + self.charge * HYDROGEN) / self.charge,
            _ => self.cumulative_mz + (residue - H2O) / self.charge,
        };
        self.idx += 1;
        Some(self.cumulative_mz)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.masses.len().saturating_sub(self.idx);
        (n, Some(n))
    }
}
