use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;

use fnv::FnvHashMap;
use psmfeat_core::mass::{is_standard, Tolerance};
use psmfeat_core::peptide::{IdentificationRecord, Modification};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

const TOLERANCE_PLUS: &str = "search tolerance plus value";
const TOLERANCE_MINUS: &str = "search tolerance minus value";
const FRAGMENT_ION_TOLERANCE: &str = "fragment_ion_tolerance";
const DALTON: &[u8] = b"UO:0000221";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// Which tag are we inside?
enum State {
    FragmentTolerance,
    SpectrumIdentificationResult,
    SpectrumIdentificationItem,
    Peptide,
    PeptideSequence,
}

/// Search parameters that apply to every identification in a file
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileParameters {
    pub software: Option<String>,
    /// Fragment tolerances in Daltons
    pub plus: Option<f64>,
    pub minus: Option<f64>,
    /// `fragment_ion_tolerance` userParam, used when the cvParams give nothing
    pub fallback: Option<f64>,
    /// Names of every cvParam seen under a SpectrumIdentificationItem
    pub score_names: BTreeSet<String>,
}

impl FileParameters {
    /// Window used to match fragment ions. One-sided cvParams are mirrored,
    /// and signs are ignored.
    pub fn tolerance(&self) -> Option<Tolerance> {
        match (self.plus, self.minus, self.fallback) {
            (Some(plus), Some(minus), _) => Some(Tolerance::new(plus.abs(), minus.abs())),
            (Some(tol), None, _) | (None, Some(tol), _) | (None, None, Some(tol)) => {
                Some(Tolerance::new(tol.abs(), tol.abs()))
            }
            (None, None, None) => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Identifications {
    /// Keyed by zero-based spectrum index
    pub records: BTreeMap<usize, IdentificationRecord>,
    pub parameters: FileParameters,
    /// SpectrumIdentificationItems skipped because their result had no `index=<n>`
    pub rejected: usize,
    /// Peptides dropped for residues outside the 20 standard amino acids
    pub non_standard: usize,
    /// Records whose peptide no PeptideEvidence marked as target or decoy
    pub without_evidence: usize,
}

impl Identifications {
    pub fn tolerance(&self) -> Result<Tolerance, MzIdentError> {
        self.parameters
            .tolerance()
            .ok_or(MzIdentError::MissingTolerance)
    }
}

#[derive(Clone, Debug)]
struct Item {
    spectrum_id: String,
    index: usize,
    rank: Option<u32>,
    experimental_mass: f64,
    calculated_mass: f64,
    parameters: FnvHashMap<String, String>,
}

/// Everything collected while streaming through the document
#[derive(Default)]
struct Context {
    open: Vec<Option<State>>,
    parameters: FileParameters,
    rejected: usize,

    /// (spectrum id, spectrum index) of the open SpectrumIdentificationResult
    spectrum: Option<(String, usize)>,
    /// peptide_ref of the open SpectrumIdentificationItem
    item: Option<String>,
    peptide: Option<String>,
    sequence: String,

    peptides: Vec<String>,
    sequences: FnvHashMap<String, String>,
    modifications: FnvHashMap<String, Vec<Modification>>,
    decoys: FnvHashMap<String, bool>,
    items: FnvHashMap<String, Item>,
}

fn attribute(ev: &BytesStart, key: &[u8]) -> Result<Option<String>, MzIdentError> {
    match ev.try_get_attribute(key)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

macro_rules! extract {
    ($ev:expr, $key:literal) => {
        attribute($ev, $key.as_bytes())?.ok_or_else(|| MzIdentError::MissingAttribute {
            element: String::from_utf8_lossy($ev.local_name().as_ref()).into_owned(),
            attribute: $key,
        })?
    };
}

fn is_dalton(ev: &BytesStart) -> Result<bool, MzIdentError> {
    let name = attribute(ev, b"unitName")?
        .map(|name| name.to_lowercase().contains("dalton"))
        .unwrap_or(false);
    let accession = ev
        .try_get_attribute(b"unitAccession")?
        .map(|acc| acc.value.as_ref() == DALTON)
        .unwrap_or(false);
    Ok(name || accession)
}

fn has_unit(ev: &BytesStart) -> Result<bool, MzIdentError> {
    Ok(ev.try_get_attribute(b"unitName")?.is_some()
        || ev.try_get_attribute(b"unitAccession")?.is_some())
}

impl Context {
    fn inside(&self, state: State) -> bool {
        self.open.contains(&Some(state))
    }

    fn cv_param(&mut self, ev: &BytesStart) -> Result<(), MzIdentError> {
        if self.inside(State::FragmentTolerance) {
            let name = extract!(ev, "name");
            let plus = name.contains(TOLERANCE_PLUS);
            if (plus || name.contains(TOLERANCE_MINUS)) && is_dalton(ev)? {
                let value = extract!(ev, "value").parse::<f64>()?;
                match plus {
                    true => self.parameters.plus = Some(value),
                    false => self.parameters.minus = Some(value),
                }
            }
        } else if self.inside(State::SpectrumIdentificationItem) {
            let name = extract!(ev, "name");
            self.item_param(ev, name)?;
        }
        Ok(())
    }

    fn user_param(&mut self, ev: &BytesStart) -> Result<(), MzIdentError> {
        let name = extract!(ev, "name");
        if name == FRAGMENT_ION_TOLERANCE {
            if !has_unit(ev)? || is_dalton(ev)? {
                self.parameters.fallback = Some(extract!(ev, "value").parse()?);
            }
        } else if self.inside(State::SpectrumIdentificationItem) {
            self.item_param(ev, name)?;
        }
        Ok(())
    }

    fn item_param(&mut self, ev: &BytesStart, name: String) -> Result<(), MzIdentError> {
        self.parameters.score_names.insert(name.clone());
        if let Some(value) = attribute(ev, b"value")? {
            if let Some(item) = self.item.as_ref().and_then(|r| self.items.get_mut(r)) {
                item.parameters.insert(name, value);
            }
        }
        Ok(())
    }

    fn identification_item(&mut self, ev: &BytesStart) -> Result<(), MzIdentError> {
        let (spectrum_id, index) = match &self.spectrum {
            Some(spectrum) => spectrum.clone(),
            None => {
                self.rejected += 1;
                self.item = None;
                return Ok(());
            }
        };

        let peptide_ref = extract!(ev, "peptide_ref");
        let rank = attribute(ev, b"rank")?.map(|r| r.parse()).transpose()?;
        let item = Item {
            spectrum_id,
            index,
            rank,
            experimental_mass: extract!(ev, "experimentalMassToCharge").parse()?,
            calculated_mass: extract!(ev, "calculatedMassToCharge").parse()?,
            parameters: FnvHashMap::default(),
        };

        // A later item for the same peptide replaces the earlier one
        self.items.insert(peptide_ref.clone(), item);
        self.item = Some(peptide_ref);
        Ok(())
    }

    fn modification(&mut self, ev: &BytesStart) -> Result<(), MzIdentError> {
        let delta = extract!(ev, "monoisotopicMassDelta").parse()?;
        let position = extract!(ev, "location").parse()?;
        if let Some(peptide) = &self.peptide {
            self.modifications
                .entry(peptide.clone())
                .or_default()
                .push(Modification::new(delta, position));
        }
        Ok(())
    }

    /// Build one record per peptide that has both a sequence and an
    /// identification item, in document order
    fn assemble(self) -> Identifications {
        let mut records = BTreeMap::new();
        let mut non_standard = 0;
        let mut without_evidence = 0;

        for peptide in &self.peptides {
            let (item, sequence) = match (self.items.get(peptide), self.sequences.get(peptide)) {
                (Some(item), Some(sequence)) => (item, sequence),
                _ => continue,
            };
            if !is_standard(sequence) {
                log::trace!("- {}: non-standard residues in {}", peptide, sequence);
                non_standard += 1;
                continue;
            }

            let is_decoy = match self.decoys.get(peptide) {
                Some(&decoy) => decoy,
                None => {
                    log::trace!("- {}: no decoy evidence, assuming target", peptide);
                    without_evidence += 1;
                    false
                }
            };

            records.insert(
                item.index,
                IdentificationRecord {
                    spectrum_id: item.spectrum_id.clone(),
                    sequence: sequence.clone(),
                    modifications: self.modifications.get(peptide).cloned().unwrap_or_default(),
                    rank: item.rank,
                    experimental_mass: item.experimental_mass,
                    calculated_mass: item.calculated_mass,
                    is_decoy,
                    parameters: item.parameters.clone(),
                },
            );
        }

        Identifications {
            records,
            parameters: self.parameters,
            rejected: self.rejected,
            non_standard,
            without_evidence,
        }
    }
}

pub struct MzIdentReader {
    spectrum_index: Regex,
}

impl Default for MzIdentReader {
    fn default() -> Self {
        Self {
            spectrum_index: Regex::new(r"index=(\d+)").expect("valid regex"),
        }
    }
}

impl MzIdentReader {
    /// Stream through an mzIdentML document, keeping only what is needed to
    /// score PSMs: peptides, their modifications and decoy status,
    /// identification items and the fragment tolerance.
    pub fn parse<B: BufRead>(&self, b: B) -> Result<Identifications, MzIdentError> {
        let mut reader = Reader::from_reader(b);
        let mut buf = Vec::new();
        let mut ctx = Context::default();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref ev) => {
                    let state = self.open(&mut ctx, ev)?;
                    ctx.open.push(state);
                }
                Event::Empty(ref ev) => {
                    self.open(&mut ctx, ev)?;
                }
                Event::Text(text) => {
                    if let Some(Some(State::PeptideSequence)) = ctx.open.last() {
                        ctx.sequence.push_str(&text.unescape()?);
                    }
                }
                Event::End(_) => match ctx.open.pop() {
                    Some(Some(State::PeptideSequence)) => {
                        if let Some(peptide) = &ctx.peptide {
                            let sequence = std::mem::take(&mut ctx.sequence);
                            ctx.sequences
                                .insert(peptide.clone(), sequence.trim().to_string());
                        }
                    }
                    Some(Some(State::SpectrumIdentificationItem)) => ctx.item = None,
                    Some(Some(State::SpectrumIdentificationResult)) => ctx.spectrum = None,
                    Some(Some(State::Peptide)) => ctx.peptide = None,
                    _ => {}
                },
                Event::Eof => match ctx.open.is_empty() {
                    true => break,
                    false => {
                        return Err(MzIdentError::Truncated {
                            unclosed: ctx.open.len(),
                        })
                    }
                },
                _ => {}
            }
            buf.clear();
        }

        Ok(ctx.assemble())
    }

    /// Handle an opening (or self-closing) tag, returning the state it
    /// enters, if any
    fn open(&self, ctx: &mut Context, ev: &BytesStart) -> Result<Option<State>, MzIdentError> {
        let state = match ev.local_name().as_ref() {
            b"AnalysisSoftware" => {
                ctx.parameters.software = match attribute(ev, b"name")? {
                    Some(name) => Some(name),
                    None => attribute(ev, b"id")?,
                };
                None
            }
            b"FragmentTolerance" => Some(State::FragmentTolerance),
            b"cvParam" => {
                ctx.cv_param(ev)?;
                None
            }
            b"userParam" => {
                ctx.user_param(ev)?;
                None
            }
            b"SpectrumIdentificationResult" => {
                let id = extract!(ev, "spectrumID");
                let spectrum_id = id.split_ascii_whitespace().next().unwrap_or_default();
                let index = self
                    .spectrum_index
                    .captures(spectrum_id)
                    .and_then(|cap| cap[1].parse::<usize>().ok());
                ctx.spectrum = match index {
                    Some(index) => Some((spectrum_id.to_string(), index)),
                    None => {
                        log::trace!("- {}: no spectrum index", id);
                        None
                    }
                };
                Some(State::SpectrumIdentificationResult)
            }
            b"SpectrumIdentificationItem" => {
                ctx.identification_item(ev)?;
                Some(State::SpectrumIdentificationItem)
            }
            b"Peptide" => {
                let id = extract!(ev, "id");
                ctx.peptides.push(id.clone());
                ctx.peptide = Some(id);
                Some(State::Peptide)
            }
            b"PeptideSequence" => {
                ctx.sequence.clear();
                Some(State::PeptideSequence)
            }
            b"Modification" if ctx.inside(State::Peptide) => {
                ctx.modification(ev)?;
                None
            }
            b"PeptideEvidence" => {
                let peptide_ref = extract!(ev, "peptide_ref");
                if let Some(decoy) = attribute(ev, b"isDecoy")? {
                    ctx.decoys
                        .insert(peptide_ref, matches!(decoy.as_str(), "true" | "1"));
                }
                None
            }
            _ => None,
        };
        Ok(state)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MzIdentError {
    #[error("malformed mzIdentML: <{element}> has no `{attribute}`")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[error("no fragment tolerance in Daltons")]
    MissingTolerance,
    #[error("document ended with {unclosed} elements still open")]
    Truncated { unclosed: usize },
    #[error("XML parsing error: {0}")]
    XMLError(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    AttrError(#[from] quick_xml::events::attributes::AttrError),
    #[error("error parsing float: {0}")]
    FloatError(#[from] std::num::ParseFloatError),
    #[error("error parsing int: {0}")]
    IntError(#[from] std::num::ParseIntError),
}
