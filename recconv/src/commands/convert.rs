//! Main conversion command.

use std::time::Instant;

use anyhow::{bail, Result};

use crate::cli::{Args, Format};
use crate::output;

/// Run the convert command.
pub fn run(args: &Args) -> Result<()> {
    let start_time = Instant::now();

    let (Some(output_path), Some(output_format)) = (args.output.as_ref(), args.output_format()) else {
        bail!("Output file is required (or use --list)");
    };
    let input_format = args.input_format();

    output::print_verbose(
        &format!("Opening {} file: {}", input_format.name(), args.input.display()),
        args.verbose,
    );

    let mut records = super::read_records(input_format, &args.input)?;
    if records.is_empty() {
        bail!("No records found in {}", args.input.display());
    }
    if output_format == Format::Mat && records.len() > 1 {
        bail!(
            "A MAT file holds one record, but {} contains {}",
            args.input.display(),
            records.len()
        );
    }
    super::rename_class(&mut records, args.class.as_deref());

    output::print_verbose(
        &format!(
            "Writing {} as {}",
            output::count(records.len(), "record"),
            output_format.name()
        ),
        args.verbose,
    );

    super::write_records(output_format, output_path, &records, args.compress)?;

    if !args.quiet {
        let fields: usize = records.iter().map(|r| r.record.len()).sum();
        println!();
        output::print_success(
            &format!(
                "Converted {} to {}",
                args.input.display(),
                output_path.display()
            ),
            false,
        );
        println!();
        output::print_kv("Records", &records.len().to_string(), 2);
        output::print_kv("Fields", &fields.to_string(), 2);
        if let Ok(meta) = std::fs::metadata(output_path) {
            output::print_kv("Output size", &output::format_size(meta.len()), 2);
        }
        output::print_kv("Processing time", &format!("{:.2?}", start_time.elapsed()), 2);
    }

    Ok(())
}
