pub mod mgf;
pub mod mzid;
pub mod util;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{path}: {source}")]
    IO {
        path: String,
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("MGF error: {0}")]
    MGF(#[from] mgf::MgfError),
    #[error("mzIdentML error: {0}")]
    MzIdent(#[from] mzid::MzIdentError),
}
