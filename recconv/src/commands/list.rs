//! List records command (--list mode).

use anyhow::Result;
use colored::Colorize;

use classdef_rs::TypedValue;

use crate::cli::Args;
use crate::output;

/// Run the list command.
pub fn run(args: &Args) -> Result<()> {
    let format = args.input_format();
    output::print_verbose(
        &format!("Opening {} file: {}", format.name(), args.input.display()),
        args.verbose,
    );

    let records = super::read_records(format, &args.input)?;

    if records.is_empty() {
        output::print_warning("No records found");
        return Ok(());
    }

    println!("{}", format!("Records in '{}':", args.input.display()).bold());

    for (i, record) in records.iter().enumerate() {
        output::print_header(&format!(
            "#{} {}",
            i + 1,
            output::class_label(record.class_name.as_deref())
        ));

        if record.record.is_empty() {
            println!("  {}", "(no fields)".dimmed());
            continue;
        }

        let max_name = record
            .record
            .names()
            .map(str::len)
            .max()
            .unwrap_or(4)
            .max(4);

        // Print header row
        println!(
            "  {:<width$}  {:>10}  {:>10}  {}",
            "Name", "Shape", "Kind", "Notes",
            width = max_name
        );
        println!(
            "  {:-<width$}  {:->10}  {:->10}  -----",
            "", "", "",
            width = max_name
        );

        for field in &record.record {
            let value = field.value();
            println!(
                "  {:<width$}  {:>10}  {:>10}  {}",
                field.name(),
                value.shape().to_string(),
                value.kind().to_string(),
                notes(value),
                width = max_name
            );
        }
    }

    println!();
    println!(
        "{} in {} file",
        output::count(records.len(), "record"),
        format.name()
    );

    Ok(())
}

/// Short description of a value's contents.
fn notes(value: &TypedValue) -> String {
    match value {
        TypedValue::Text(text) => {
            let mut preview: String = text.chars().take(24).collect();
            if preview.len() < text.len() {
                preview.push_str("...");
            }
            format!("{:?}", preview).dimmed().to_string()
        }
        TypedValue::Record(record) => output::count(record.len(), "field").dimmed().to_string(),
        TypedValue::List(_) => "cell".dimmed().to_string(),
        TypedValue::Numeric(array) if array.is_scalar() => "scalar".dimmed().to_string(),
        _ => String::new(),
    }
}
