use psmfeat_core::spectrum::SpectrumRecord;
use regex::Regex;
use std::panic::Location;

const BEGIN: &str = "BEGIN IONS";
const END: &str = "END IONS";

/// Line offsets of the headers and the first peak line, relative to a
/// `BEGIN IONS` line. Learned once from the first block and reused for
/// every block in the file.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Offsets {
    pub title: usize,
    pub pepmass: usize,
    pub charge: usize,
    pub peaks: usize,
}

impl Offsets {
    /// Scan one block starting at its `BEGIN IONS` line
    pub fn learn(block: &[&str]) -> Result<Self, MgfError> {
        let mut title = None;
        let mut pepmass = None;
        let mut charge = None;
        let mut peaks = None;

        for (offset, line) in block.iter().enumerate() {
            if line.starts_with(END) {
                break;
            }
            if is_peak_line(line) {
                peaks = Some(offset);
                break;
            }
            match line.split_once('=').map(|(key, _)| key) {
                Some("TITLE") => title = Some(offset),
                Some("PEPMASS") => pepmass = Some(offset),
                Some("CHARGE") => charge = Some(offset),
                _ => {}
            }
        }

        Ok(Self {
            title: title.ok_or(MgfError::MissingHeader("TITLE"))?,
            pepmass: pepmass.ok_or(MgfError::MissingHeader("PEPMASS"))?,
            charge: charge.ok_or(MgfError::MissingHeader("CHARGE"))?,
            peaks: peaks.ok_or(MgfError::MissingHeader("peak list"))?,
        })
    }
}

fn is_peak_line(line: &str) -> bool {
    line.chars().next().unwrap_or_default().is_ascii_digit()
}

#[track_caller]
fn line_at<'a>(lines: &[&'a str], ix: usize) -> Result<&'a str, MgfError> {
    lines.get(ix).copied().ok_or(MgfError::Malformed {
        location: *Location::caller(),
    })
}

pub struct MgfReader {
    charge: Regex,
}

impl Default for MgfReader {
    fn default() -> Self {
        Self {
            charge: Regex::new(r"^CHARGE=(\d)\+").expect("valid regex"),
        }
    }
}

impl MgfReader {
    /// Parse every `BEGIN IONS` .. `END IONS` block. Blocks are numbered in
    /// file order, starting from 0, regardless of their titles.
    ///
    /// Header positions are taken from the first block: a file whose blocks
    /// order their headers differently is rejected as a whole once a line
    /// fails to parse.
    pub fn parse(&self, contents: &str) -> Result<Vec<SpectrumRecord>, MgfError> {
        let lines = contents.lines().map(str::trim).collect::<Vec<_>>();

        let first = match lines.iter().position(|line| line.starts_with(BEGIN)) {
            Some(first) => first,
            None => return Ok(Vec::new()),
        };
        let offsets = Offsets::learn(&lines[first..])?;

        let mut spectra = Vec::new();
        for (begin, _) in lines
            .iter()
            .enumerate()
            .skip(first)
            .filter(|(_, line)| line.starts_with(BEGIN))
        {
            spectra.push(self.parse_block(&lines, begin, &offsets)?);
        }
        Ok(spectra)
    }

    fn parse_block(
        &self,
        lines: &[&str],
        begin: usize,
        offsets: &Offsets,
    ) -> Result<SpectrumRecord, MgfError> {
        let line = |offset: usize| line_at(lines, begin + offset);

        let title = line(offsets.title)?;
        let title = title.strip_prefix("TITLE=").unwrap_or(title);

        let pepmass = line(offsets.pepmass)?;
        let precursor_mass = pepmass
            .strip_prefix("PEPMASS=")
            .unwrap_or(pepmass)
            .split_ascii_whitespace()
            .next()
            .ok_or(MgfError::Malformed {
                location: *Location::caller(),
            })?
            .parse::<f64>()?;

        let charge = self
            .charge
            .captures(line(offsets.charge)?)
            .and_then(|cap| cap[1].parse::<u8>().ok())
            .unwrap_or_default();

        let mut spectrum = SpectrumRecord {
            title: title.to_string(),
            charge,
            precursor_mass,
            ..Default::default()
        };

        let mut ix = begin + offsets.peaks;
        loop {
            let peak = lines.get(ix).ok_or(MgfError::Truncated {
                index: begin,
            })?;
            if peak.starts_with(END) {
                break;
            }
            if peak.is_empty() {
                ix += 1;
                continue;
            }
            let mut split = peak.split_ascii_whitespace();
            match (split.next(), split.next()) {
                (Some(mz), Some(intensity)) => {
                    spectrum.mz.push(mz.parse()?);
                    spectrum.intensity.push(intensity.parse()?);
                }
                _ => {
                    return Err(MgfError::Malformed {
                        location: *Location::caller(),
                    })
                }
            }
            ix += 1;
        }

        Ok(spectrum)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MgfError {
    #[error("malformed MGF: {location}")]
    Malformed { location: Location<'static> },
    #[error("first spectrum has no {0} header")]
    MissingHeader(&'static str),
    #[error("spectrum starting at line {index} has no END IONS")]
    Truncated { index: usize },
    #[error("error parsing float: {0}")]
    FloatError(#[from] std::num::ParseFloatError),
}

#[cfg(test)]
mod test {
    use super::{MgfError, MgfReader, Offsets};

    const TWO_SPECTRA: &str = "
        BEGIN IONS
        TITLE=spectrum 0 scan=17
        PEPMASS=367.069682741984 56700.5185546875
        CHARGE=2+
        RTINSECONDS=0.8963232289
        148.2041016\t12.5
        169.5001831\t4608.2421875
        228.3407898\t30918.244140625
        END IONS

        BEGIN IONS
        TITLE=spectrum 1 scan=18
        PEPMASS=983.6
        CHARGE=3+
        RTINSECONDS=1.20
        846.60\t73
        846.80\t44
        END IONS
        ";

    #[test]
    fn offsets() -> Result<(), MgfError> {
        let lines = TWO_SPECTRA
            .lines()
            .map(str::trim)
            .skip_while(|l| l.is_empty())
            .collect::<Vec<_>>();
        assert_eq!(
            Offsets::learn(&lines)?,
            Offsets {
                title: 1,
                pepmass: 2,
                charge: 3,
                peaks: 5
            }
        );
        Ok(())
    }

    #[test]
    fn parse_two_spectra() -> Result<(), MgfError> {
        let spectra = MgfReader::default().parse(TWO_SPECTRA)?;
        assert_eq!(spectra.len(), 2);

        let s = &spectra[0];
        assert_eq!(s.title, "spectrum 0 scan=17");
        assert_eq!(s.charge, 2);
        assert!((s.precursor_mass - 367.069682741984).abs() < 1E-9);
        assert_eq!(s.mz.len(), 3);
        assert_eq!(s.intensity.len(), s.mz.len());
        assert!((s.mz[2] - 228.3407898).abs() < 1E-9);
        assert!((s.intensity[0] - 12.5).abs() < 1E-9);

        let s = &spectra[1];
        assert_eq!(s.charge, 3);
        assert_eq!(s.precursor_mass, 983.6);
        assert_eq!(s.mz, vec![846.60, 846.80]);
        assert_eq!(s.intensity, vec![73.0, 44.0]);
        Ok(())
    }

    #[test]
    fn unparsable_charge_is_zero() -> Result<(), MgfError> {
        let s = "
        BEGIN IONS
        TITLE=weird charge
        PEPMASS=500.0
        CHARGE=unknown
        100.0\t1.0
        END IONS
        ";
        let spectra = MgfReader::default().parse(s)?;
        assert_eq!(spectra[0].charge, 0);
        Ok(())
    }

    #[test]
    fn leading_comments_are_skipped() -> Result<(), MgfError> {
        let mut content = "# a comment at the beginning of the file\nCOM=digest\n".to_string();
        content.push_str(TWO_SPECTRA);
        let spectra = MgfReader::default().parse(&content)?;
        assert_eq!(spectra.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_header() {
        let s = "
        BEGIN IONS
        TITLE=no charge
        PEPMASS=500.0
        100.0\t1.0
        END IONS
        ";
        assert!(matches!(
            MgfReader::default().parse(s),
            Err(MgfError::MissingHeader("CHARGE"))
        ));
    }

    #[test]
    fn malformed_block_fails_file() {
        let s = "
        BEGIN IONS
        TITLE=ok
        PEPMASS=500.0
        CHARGE=2+
        100.0\t1.0
        END IONS
        BEGIN IONS
        TITLE=bad
        PEPMASS=not a number
        CHARGE=2+
        100.0\t1.0
        END IONS
        ";
        assert!(matches!(
            MgfReader::default().parse(s),
            Err(MgfError::FloatError(_))
        ));

        let s = "
        BEGIN IONS
        TITLE=truncated
        PEPMASS=500.0
        CHARGE=2+
        100.0\t1.0
        ";
        assert!(matches!(
            MgfReader::default().parse(s),
            Err(MgfError::Truncated { .. })
        ));
    }

    #[test]
    fn empty_file() -> Result<(), MgfError> {
        assert!(MgfReader::default().parse("")?.is_empty());
        Ok(())
    }
}
