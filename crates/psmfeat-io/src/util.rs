use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use psmfeat_core::spectrum::SpectrumRecord;

use crate::mgf::MgfReader;
use crate::mzid::{Identifications, MzIdentReader};
use crate::Error;

fn open<P: AsRef<Path>>(path: P) -> Result<File, Error> {
    File::open(path.as_ref()).map_err(|source| Error::IO {
        path: path.as_ref().display().to_string(),
        source,
    })
}

fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String, Error> {
    let mut contents = String::new();
    open(path.as_ref())?
        .read_to_string(&mut contents)
        .map_err(|source| Error::IO {
            path: path.as_ref().display().to_string(),
            source,
        })?;
    Ok(contents)
}

pub fn read_mgf<P: AsRef<Path>>(path: P) -> Result<Vec<SpectrumRecord>, Error> {
    let contents = read_to_string(path)?;
    Ok(MgfReader::default().parse(&contents)?)
}

pub fn read_mzid<P: AsRef<Path>>(path: P) -> Result<Identifications, Error> {
    let file = open(path)?;
    Ok(MzIdentReader::default().parse(BufReader::new(file))?)
}

pub fn read_json<P, T>(path: P) -> Result<T, Error>
where
    P: AsRef<Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
