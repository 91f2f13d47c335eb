use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Error as IoError, Write},
    path::Path,
};

use thiserror::Error as ThisError;

use crate::{Element, keyvalues::KeyValuesError, serializers::VmfSerializer};

#[derive(Debug, ThisError)]
pub enum SerializationError {
    #[error("IO Error: {0}")]
    Io(#[from] IoError),
    #[error(transparent)]
    KeyValues(#[from] KeyValuesError),
    #[error("No Serializer For Format: {0}")]
    UnknownFormat(String),
    #[error("Missing Required Field: {0}")]
    MissingField(&'static str),
    #[error("Empty Value For Field: {0}")]
    EmptyFieldValue(String),
    #[error("Invalid Value For Field: {0}")]
    InvalidFieldValue(String),
    #[error("Failed To Import Element: {block}")]
    ImportFailed {
        block: String,
        #[source]
        source: Box<SerializationError>,
    },
}

/// A bidirectional translator between one text format and the element graph.
///
/// Serializers are stateless; per-call bookkeeping lives on the stack of the
/// call. The identifying methods describe the format for registry lookup.
pub trait Serializer: Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn extension(&self) -> &'static str;
    fn default_encoding(&self) -> &'static str;
    fn current_version(&self) -> i32;

    /// Writes the root element to the buffer.
    fn serialize(&self, buffer: &mut dyn Write, root: &Element) -> Result<(), SerializationError>;

    /// Reads a root element from the buffer.
    fn deserialize(&self, buffer: &mut dyn BufRead) -> Result<Element, SerializationError>;
}

static SERIALIZERS: &[&dyn Serializer] = &[&VmfSerializer];

/// Returns the installed serializer with the given name.
pub fn serializer(name: &str) -> Option<&'static dyn Serializer> {
    SERIALIZERS.iter().find(|serializer| serializer.name().eq_ignore_ascii_case(name)).copied()
}

/// Returns the installed serializer handling the given file extension.
pub fn serializer_for_extension(extension: &str) -> Option<&'static dyn Serializer> {
    SERIALIZERS.iter().find(|serializer| serializer.extension().eq_ignore_ascii_case(extension)).copied()
}

/// Reads a root element from the file at the given path, selecting the
/// serializer by file extension.
pub fn deserialize<P: AsRef<Path>>(path: P) -> Result<Element, SerializationError> {
    let path = path.as_ref();
    let extension = path.extension().and_then(|extension| extension.to_str()).unwrap_or_default();
    let serializer = serializer_for_extension(extension).ok_or_else(|| SerializationError::UnknownFormat(extension.to_string()))?;

    let mut reader = BufReader::new(File::open(path)?);
    serializer.deserialize(&mut reader)
}

/// Writes a root element to the file at the given path, selecting the
/// serializer by file extension.
pub fn serialize<P: AsRef<Path>>(path: P, root: &Element) -> Result<(), SerializationError> {
    let path = path.as_ref();
    let extension = path.extension().and_then(|extension| extension.to_str()).unwrap_or_default();
    let serializer = serializer_for_extension(extension).ok_or_else(|| SerializationError::UnknownFormat(extension.to_string()))?;

    let mut writer = BufWriter::new(File::create(path)?);
    serializer.serialize(&mut writer, root)?;
    writer.flush()?;
    Ok(())
}
