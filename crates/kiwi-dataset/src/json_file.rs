use crate::error::{DatasetError, DatasetResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> DatasetResult<T> {
    let file = File::open(path).map_err(|e| DatasetError::read(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| DatasetError::json(path, e))
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> DatasetResult<()> {
    let file = File::create(path).map_err(|e| DatasetError::write(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|e| DatasetError::json(path, e))?;
    writer.flush().map_err(|e| DatasetError::write(path, e))
}
