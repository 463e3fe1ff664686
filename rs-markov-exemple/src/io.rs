use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rs_markov_core::{Model, ModelSnapshot};

/// Builds a sibling path with another extension.
///
/// Example:
/// `data/sample.txt` + `"bin"` → `data/sample.bin`
pub fn build_output_path<P: AsRef<Path>>(input_path: P, output_extension: &str) -> io::Result<PathBuf> {
    let input_path = input_path.as_ref();

    let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
    let file_stem = input_path
        .file_stem()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input path has no filename"))?;

    let mut output = PathBuf::from(parent);
    output.push(file_stem);
    output.set_extension(output_extension);

    Ok(output)
}

/// Reads a `postcard` snapshot written by [`write_snapshot`].
pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<ModelSnapshot, Box<dyn std::error::Error>> {
    let bytes = fs::read(path)?;
    Ok(postcard::from_bytes(&bytes)?)
}

/// Encodes the model with `postcard` and writes it to `path`.
pub fn write_snapshot<P: AsRef<Path>>(model: &Model, path: P) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = postcard::to_stdvec(&model.snapshot())?;
    fs::write(path, bytes)?;
    Ok(())
}
