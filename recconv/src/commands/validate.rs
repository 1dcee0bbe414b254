//! Dry-run validation command.

use anyhow::{bail, Result};
use colored::Colorize;

use crate::cli::{Args, Format};
use crate::output;

/// Run the validate (dry-run) command.
pub fn run(args: &Args) -> Result<()> {
    if !args.quiet {
        println!("{} (no files will be written)\n", "Dry run mode".yellow());
    }

    let (Some(output_path), Some(output_format)) = (args.output.as_ref(), args.output_format()) else {
        bail!("Output file is required");
    };
    let input_format = args.input_format();

    output::print_verbose(
        &format!("Opening {} file: {}", input_format.name(), args.input.display()),
        args.verbose,
    );

    let mut records = super::read_records(input_format, &args.input)?;
    super::rename_class(&mut records, args.class.as_deref());

    if !args.quiet {
        println!("{}", "Input".bold().underline());
        println!();
        output::print_kv("File", &args.input.display().to_string(), 2);
        output::print_kv("Format", input_format.name(), 2);
        output::print_kv("Records", &records.len().to_string(), 2);
        if let Ok(meta) = std::fs::metadata(&args.input) {
            output::print_kv("Size", &output::format_size(meta.len()), 2);
        }
    }

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

    let fields = super::check_records(output_format, &records)?;

    if !args.quiet {
        println!();
        println!("{}", "Output".bold().underline());
        println!();
        output::print_kv("File", &output_path.display().to_string(), 2);
        output::print_kv("Format", output_format.name(), 2);
        for record in &records {
            output::print_kv(
                "Class",
                &output::class_label(record.class_name.as_deref()),
                2,
            );
        }
        output::print_kv("Fields", &fields.to_string(), 2);
        if output_format == Format::Mat {
            output::print_kv("Compressed", if args.compress { "yes" } else { "no" }, 2);
        }
        if output_path.exists() {
            output::print_warning(&format!(
                "{} exists and would need --force",
                output_path.display()
            ));
        }
        println!();
    }

    output::print_success("Validation passed - ready to convert", args.quiet);
    Ok(())
}
