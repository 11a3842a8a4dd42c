//! File-level API: decode one container file into one output file.
//!
//! ```no_run
//! use flz4::container::{decompress_file, default_output_path};
//! use flz4::DecodeOptions;
//!
//! let input = std::path::Path::new("sys_config.lz4");
//! let summary = decompress_file(input, &default_output_path(input), &DecodeOptions::default())?;
//! println!("{} block(s)", summary.blocks);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Output is written to a sibling `<output>.part` file and renamed into place
//! only once the whole container decoded, so a failed run never leaves a
//! truncated file under the final name unless `keep_partial` asks for it.

use log::{info, warn};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::block::DecodeOptions;
use crate::error::FormatError;
use crate::io_stream::{decode_stream_with, DecodeSummary};

/// Suffix the original tooling appends to the input name.
pub const DECODED_SUFFIX: &str = ".dec";
const PARTIAL_SUFFIX: &str = ".part";

#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Cannot open input {}: {source}", .path.display())]
    OpenInput { path: PathBuf, source: io::Error },
    #[error("Cannot create output {}: {source}", .path.display())]
    CreateOutput { path: PathBuf, source: io::Error },
    #[error("Cannot publish output {}: {source}", .path.display())]
    Publish { path: PathBuf, source: io::Error },
    #[error("{}: {source}", .path.display())]
    Format { path: PathBuf, source: FormatError },
}

impl ContainerError {
    /// The underlying format error, when decoding itself failed.
    pub fn format_error(&self) -> Option<&FormatError> {
        match self {
            ContainerError::Format { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// `<input>.dec`, next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    with_suffix(input, DECODED_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Decode the container at `input` into `output`.
pub fn decompress_file(
    input: &Path,
    output: &Path,
    options: &DecodeOptions,
) -> Result<DecodeSummary, ContainerError> {
    let src = File::open(input)
        .map_err(|source| ContainerError::OpenInput { path: input.to_path_buf(), source })?;
    let partial = with_suffix(output, PARTIAL_SUFFIX);
    let dst = File::create(&partial)
        .map_err(|source| ContainerError::CreateOutput { path: partial.clone(), source })?;

    let mut reader = BufReader::new(src);
    let mut writer = BufWriter::new(dst);
    let result = decode_stream_with(&mut reader, &mut writer, options)
        .and_then(|summary| writer.flush().map(|_| summary).map_err(FormatError::from));
    drop(writer);

    match result {
        Ok(summary) => {
            publish(&partial, output)?;
            info!(
                "decompress : {} -> {}: {} block(s), {} bytes",
                input.display(),
                output.display(),
                summary.blocks,
                summary.bytes_out
            );
            Ok(summary)
        }
        Err(source) => {
            if options.keep_partial {
                warn!("keeping partial output {} after failure", output.display());
                if let Err(e) = publish(&partial, output) {
                    warn!("{e}");
                }
            } else if let Err(e) = fs::remove_file(&partial) {
                warn!("cannot remove partial output {}: {e}", partial.display());
            }
            Err(ContainerError::Format { path: input.to_path_buf(), source })
        }
    }
}

fn publish(partial: &Path, output: &Path) -> Result<(), ContainerError> {
    fs::rename(partial, output)
        .map_err(|source| ContainerError::Publish { path: output.to_path_buf(), source })
}
