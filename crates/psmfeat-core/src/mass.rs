use serde::{Deserialize, Serialize};

use crate::peptide::Modification;

pub const H2O: f64 = 18.01056;
pub const HYDROGEN: f64 = 1.00794;

/// Asymmetric fragment tolerance window, in Daltons
#[derive(Copy, Clone, Serialize, Deserialize, Debug, PartialEq, PartialOrd)]
pub struct Tolerance {
    /// Allowed deviation above the theoretical m/z
    pub plus: f64,
    /// Allowed deviation below the theoretical m/z
    pub minus: f64,
}

impl Tolerance {
    pub fn new(plus: f64, minus: f64) -> Self {
        Self { plus, minus }
    }

    /// Compute the (`lower`, `upper`) window (in Da) around a theoretical m/z
    pub fn bounds(&self, center: f64) -> (f64, f64) {
        (center - self.minus, center + self.plus)
    }

    pub fn contains(&self, center: f64, rhs: f64) -> bool {
        let (lo, hi) = self.bounds(center);
        rhs >= lo && rhs <= hi
    }
}

pub trait Mass {
    fn monoisotopic(&self) -> f64;
}

pub const VALID_AA: [u8; 20] = [
    b'A', b'C', b'D', b'E', b'F', b'G', b'H', b'I', b'K', b'L', b'M', b'N', b'P', b'Q', b'R', b'S',
    b'T', b'V', b'W', b'Y',
];

/// Is every residue of `sequence` one of the 20 standard amino acids?
pub fn is_standard(sequence: &str) -> bool {
    !sequence.is_empty() && sequence.bytes().all(|c| VALID_AA.contains(&c))
}

impl Mass for u8 {
    fn monoisotopic(&self) -> f64 {
        match self {
            b'A' => 71.03711,
            b'R' => 156.10111,
            b'N' => 114.04293,
            b'D' => 115.02694,
            b'C' => 103.00919,
            b'E' => 129.04259,
            b'Q' => 128.05858,
            b'G' => 57.02146,
            b'H' => 137.05891,
            b'I' => 113.08406,
            b'L' => 113.08406,
            b'K' => 128.09496,
            b'M' => 131.04049,
            b'F' => 147.06841,
            b'P' => 97.05276,
            b'S' => 87.03203,
            b'T' => 101.04768,
            b'W' => 186.07931,
            b'Y' => 163.06333,
            b'V' => 99.06841,
            _ => unreachable!("BUG: invalid amino acid {}", *self as char),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MassError {
    /// A modification points past the end of the peptide
    ModificationOutOfRange {
        sequence: String,
        position: usize,
    },
    /// Residue outside of the standard amino acid alphabet
    InvalidResidue(char),
}

impl std::fmt::Display for MassError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MassError::ModificationOutOfRange { sequence, position } => write!(
                f,
                "modification location {} larger than sequence {} (len: {})",
                position,
                sequence,
                sequence.len()
            ),
            MassError::InvalidResidue(c) => write!(f, "invalid amino acid {}", c),
        }
    }
}

impl std::error::Error for MassError {}

/// Transform a peptide into one mass per residue, with modification deltas
/// added at their (1-based) positions. Location 0 is the N-terminus and is
/// folded onto the first residue.
pub fn mass_ladder(sequence: &str, modifications: &[Modification]) -> Result<Vec<f64>, MassError> {
    let mut ladder = sequence
        .bytes()
        .map(|c| match VALID_AA.contains(&c) {
            true => Ok(c.monoisotopic()),
            false => Err(MassError::InvalidResidue(c as char)),
        })
        .collect::<Result<Vec<f64>, _>>()?;

    for m in modifications {
        let idx = m.position.saturating_sub(1);
        match ladder.get_mut(idx) {
            Some(mass) => *mass += m.delta,
            None => {
                return Err(MassError::ModificationOutOfRange {
                    sequence: sequence.into(),
                    position: m.position,
                })
            }
        }
    }
    Ok(ladder)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn smoke() {
        for ch in VALID_AA {
            assert!(ch.monoisotopic() > 0.0);
        }
    }

    #[test]
    fn tolerances() {
        let tol = Tolerance::new(0.5, 0.25);
        assert_eq!(tol.bounds(100.0), (99.75, 100.5));
        assert!(tol.contains(100.0, 100.5));
        assert!(tol.contains(100.0, 99.75));
        assert!(!tol.contains(100.0, 99.7));
        assert!(!tol.contains(100.0, 100.51));
    }

    #[test]
    fn standard_residues() {
        assert!(is_standard("PEPTIDE"));
        assert!(!is_standard("PEPXIDE"));
        assert!(!is_standard("BJZ"));
        assert!(!is_standard("peptide"));
        assert!(!is_standard(""));
    }

    #[test]
    fn ladder_with_modifications() {
        let mods = [
            Modification::new(15.99491, 1),
            Modification::new(1.0, 2),
            Modification::new(2.0, 2),
        ];
        let ladder = mass_ladder("MGG", &mods).unwrap();
        assert!((ladder[0] - (131.04049 + 15.99491)).abs() < 1e-9);
        assert!((ladder[1] - (57.02146 + 3.0)).abs() < 1e-9);
        assert!((ladder[2] - 57.02146).abs() < 1e-9);
    }

    #[test]
    fn nterm_location_folds_onto_first_residue() {
        let ladder = mass_ladder("GG", &[Modification::new(42.01057, 0)]).unwrap();
        assert!((ladder[0] - (57.02146 + 42.01057)).abs() < 1e-9);
    }

    #[test]
    fn modification_out_of_range() {
        let err = mass_ladder("GG", &[Modification::new(1.0, 3)]).unwrap_err();
        assert_eq!(
            err,
            MassError::ModificationOutOfRange {
                sequence: "GG".into(),
                position: 3
            }
        );
        assert!(mass_ladder("GG", &[Modification::new(1.0, 2)]).is_ok());
    }
}
