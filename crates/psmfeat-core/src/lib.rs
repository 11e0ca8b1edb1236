pub mod features;
pub mod ion_series;
pub mod join;
pub mod label;
pub mod mass;
pub mod matching;
pub mod peptide;
pub mod spectrum;
