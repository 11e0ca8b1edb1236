use std::collections::BTreeMap;

use crate::peptide::IdentificationRecord;
use crate::spectrum::SpectrumRecord;

/// An identification paired with the spectrum it claims to explain
#[derive(Copy, Clone, Debug)]
pub struct Psm<'a> {
    /// Zero-based spectrum index in the peak list
    pub index: usize,
    pub spectrum: &'a SpectrumRecord,
    pub identification: &'a IdentificationRecord,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum JoinMismatch {
    /// No spectrum at this index in the peak list
    MissingSpectrum,
    /// Nominal precursor masses of the two files disagree
    MassMismatch { spectrum: f64, identification: f64 },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinSummary {
    pub joined: usize,
    pub missing_spectrum: usize,
    pub mass_mismatch: usize,
}

impl JoinSummary {
    pub fn skipped(&self) -> usize {
        self.missing_spectrum + self.mass_mismatch
    }
}

/// Pair one identification with its spectrum, checking that both files agree
/// on the nominal precursor mass
pub fn pair<'a>(
    index: usize,
    spectra: &'a [SpectrumRecord],
    identification: &'a IdentificationRecord,
) -> Result<Psm<'a>, JoinMismatch> {
    let spectrum = spectra.get(index).ok_or(JoinMismatch::MissingSpectrum)?;
    if spectrum.precursor_mass.round() != identification.experimental_mass.round() {
        return Err(JoinMismatch::MassMismatch {
            spectrum: spectrum.precursor_mass,
            identification: identification.experimental_mass,
        });
    }
    Ok(Psm {
        index,
        spectrum,
        identification,
    })
}

/// Join every identification to its spectrum by index, in ascending index order.
/// Identifications that cannot be paired are tallied and dropped.
pub fn join<'a>(
    spectra: &'a [SpectrumRecord],
    identifications: &'a BTreeMap<usize, IdentificationRecord>,
) -> (Vec<Psm<'a>>, JoinSummary) {
    let mut summary = JoinSummary::default();
    let mut psms = Vec::with_capacity(identifications.len());

    for (&index, identification) in identifications {
        match pair(index, spectra, identification) {
            Ok(psm) => {
                summary.joined += 1;
                psms.push(psm);
            }
            Err(JoinMismatch::MissingSpectrum) => {
                log::trace!("- {}: not found in peak list", identification.spectrum_id);
                summary.missing_spectrum += 1;
            }
            Err(JoinMismatch::MassMismatch {
                spectrum,
                identification: expmass,
            }) => {
                log::trace!(
                    "- {}: precursor mass {} does not match {}",
                    identification.spectrum_id,
                    spectrum,
                    expmass
                );
                summary.mass_mismatch += 1;
            }
        }
    }
    (psms, summary)
}

#[cfg(test)]
mod test {
    use super::*;

    fn spectrum(precursor_mass: f64) -> SpectrumRecord {
        SpectrumRecord {
            precursor_mass,
            ..Default::default()
        }
    }

    fn identification(experimental_mass: f64) -> IdentificationRecord {
        IdentificationRecord {
            experimental_mass,
            ..Default::default()
        }
    }

    #[test]
    fn join_by_index() {
        let spectra = vec![spectrum(500.2), spectrum(600.4), spectrum(700.0)];
        let identifications = [
            (0, identification(500.3)),
            (1, identification(601.7)),
            (2, identification(699.6)),
            (7, identification(700.0)),
        ]
        .into_iter()
        .collect::<BTreeMap<_, _>>();

        let (psms, summary) = join(&spectra, &identifications);
        assert_eq!(psms.iter().map(|p| p.index).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(
            summary,
            JoinSummary {
                joined: 2,
                missing_spectrum: 1,
                mass_mismatch: 1
            }
        );
        assert_eq!(summary.skipped(), 2);
        assert_eq!(psms[1].spectrum.precursor_mass, 700.0);
    }

    #[test]
    fn nominal_mass_uses_rounding() {
        let spectra = vec![spectrum(500.6)];
        assert!(pair(0, &spectra, &identification(500.9)).is_ok());
        assert_eq!(
            pair(0, &spectra, &identification(500.4)).unwrap_err(),
            JoinMismatch::MassMismatch {
                spectrum: 500.6,
                identification: 500.4
            }
        );
        assert_eq!(
            pair(3, &spectra, &identification(500.6)).unwrap_err(),
            JoinMismatch::MissingSpectrum
        );
    }
}
