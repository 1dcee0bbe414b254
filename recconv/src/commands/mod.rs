//! Subcommands, plus the format dispatch they share.

pub mod convert;
pub mod list;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use classdef_rs::{
    load_records, save_records, ClassRecord, Compression, ContainerBackend, FieldCodec,
    MatBackend, TextBackend,
};

use crate::cli::Format;

/// Read every record of `path`.
pub(crate) fn read_records(format: Format, path: &Path) -> Result<Vec<ClassRecord>> {
    let records = match format {
        Format::Text => load_records(&TextBackend::new(), path),
        Format::Mat => load_records(&MatBackend::new(), path),
    };
    records.with_context(|| format!("Failed to read {} file: {}", format.name(), path.display()))
}

/// Write `records` to `path`.
pub(crate) fn write_records(
    format: Format,
    path: &Path,
    records: &[ClassRecord],
    compress: bool,
) -> Result<()> {
    let result = match format {
        Format::Text => save_records(&TextBackend::new(), path, records),
        Format::Mat => {
            let compression = if compress {
                Compression::Default
            } else {
                Compression::None
            };
            save_records(&MatBackend::new().compression(compression), path, records)
        }
    };
    result.with_context(|| format!("Failed to write {} file: {}", format.name(), path.display()))
}

/// Encode `records` for `format` without writing anything, returning the
/// number of fields that would be written.
pub(crate) fn check_records(format: Format, records: &[ClassRecord]) -> Result<usize> {
    match format {
        Format::Text => encode_all(&TextBackend::new(), records),
        Format::Mat => encode_all(&MatBackend::new(), records),
    }
}

fn encode_all<B: ContainerBackend>(backend: &B, records: &[ClassRecord]) -> Result<usize> {
    let mut fields = 0;
    for (i, record) in records.iter().enumerate() {
        let encoded = backend
            .codec()
            .encode_record(record)
            .with_context(|| format!("Record {} cannot be stored as {}", i + 1, backend.name()))?;
        fields += encoded.fields.len();
    }
    Ok(fields)
}

/// Apply a `--class` override to every record.
pub(crate) fn rename_class(records: &mut [ClassRecord], class: Option<&str>) {
    if let Some(class) = class {
        for record in records {
            record.class_name = Some(class.to_string());
        }
    }
}
