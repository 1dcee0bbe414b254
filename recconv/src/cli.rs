//! Command-line argument definitions using clap derive macros.

use clap::Parser;
use std::path::{Path, PathBuf};

/// Inspect and convert classdef record containers.
///
/// recconv reads the records saved from classdef objects, either in the
/// line-oriented text format or in Level 5 MAT files, and rewrites them in
/// the other format. Files ending in `.mat` are MAT files; anything else is
/// read and written as text.
#[derive(Parser, Debug)]
#[command(name = "recconv")]
#[command(author, version, about, long_about = None)]
#[command(after_help = EXAMPLES)]
pub struct Args {
    /// Input container (.mat or text)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output container (omit for --list mode)
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    // ========================================================================
    // Mode Selection
    // ========================================================================
    /// List the records and fields in the input and exit
    #[arg(short, long)]
    pub list: bool,

    /// Check that the conversion would succeed without writing output
    #[arg(long)]
    pub dry_run: bool,

    // ========================================================================
    // Conversion
    // ========================================================================
    /// Class name to record in the output, replacing the input's
    #[arg(short, long, value_name = "NAME")]
    pub class: Option<String>,

    /// Compress variables when writing a MAT file
    #[arg(short = 'z', long)]
    pub compress: bool,

    // ========================================================================
    // Output Control
    // ========================================================================
    /// Show detailed progress and debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Force overwrite of existing output file
    #[arg(long)]
    pub force: bool,
}

/// On-disk container format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Line-oriented text.
    Text,
    /// Level 5 MAT file.
    Mat,
}

impl Format {
    /// Pick the format for `path`.
    pub fn of(path: &Path) -> Format {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("mat") => Format::Mat,
            _ => Format::Text,
        }
    }

    /// Short name for display.
    pub fn name(self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Mat => "MAT",
        }
    }
}

impl Args {
    /// Validate argument combinations.
    pub fn validate(&self) -> Result<(), String> {
        // Quiet and verbose are mutually exclusive
        if self.quiet && self.verbose {
            return Err("Cannot use both --quiet and --verbose".to_string());
        }

        // Check input file exists
        if !self.input.exists() {
            return Err(format!("Input file not found: {}", self.input.display()));
        }

        // List mode doesn't need output file
        if self.list {
            return Ok(());
        }

        let Some(ref output) = self.output else {
            return Err("Output file is required (or use --list)".to_string());
        };

        if output == &self.input {
            return Err("Output file must differ from the input".to_string());
        }

        if self.compress && Format::of(output) != Format::Mat {
            return Err("--compress only applies to .mat output".to_string());
        }

        // Check output doesn't exist (unless --force)
        if output.exists() && !self.force && !self.dry_run {
            return Err(format!(
                "Output file already exists: {} (use --force to overwrite)",
                output.display()
            ));
        }

        Ok(())
    }

    /// Format of the input file.
    pub fn input_format(&self) -> Format {
        Format::of(&self.input)
    }

    /// Format of the output file, if one was given.
    pub fn output_format(&self) -> Option<Format> {
        self.output.as_deref().map(Format::of)
    }

    /// Log filter used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }
}

/// Example usage shown in --help.
const EXAMPLES: &str = r#"
EXAMPLES:
    # List the records in a text container
    recconv --list Person.txt

    # Convert a text container to a MAT file
    recconv Person.txt Person.mat

    # Convert back, renaming the class
    recconv Person.mat person.txt --class Employee

    # Write a compressed MAT file
    recconv -z Person.txt Person.mat

    # Check the conversion without writing anything
    recconv --dry-run Person.mat Person.txt

    # Force overwrite and show debug logging
    recconv -v --force Person.txt Person.mat
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: &str, output: Option<&str>) -> Args {
        Args {
            input: PathBuf::from(input),
            output: output.map(PathBuf::from),
            list: false,
            dry_run: false,
            class: None,
            compress: false,
            verbose: false,
            quiet: false,
            force: false,
        }
    }

    #[test]
    fn test_format_by_extension() {
        assert_eq!(Format::of(Path::new("a.mat")), Format::Mat);
        assert_eq!(Format::of(Path::new("a.MAT")), Format::Mat);
        assert_eq!(Format::of(Path::new("a.txt")), Format::Text);
        assert_eq!(Format::of(Path::new("Person")), Format::Text);
    }

    #[test]
    fn test_formats_of_args() {
        let a = args("in.txt", Some("out.mat"));
        assert_eq!(a.input_format(), Format::Text);
        assert_eq!(a.output_format(), Some(Format::Mat));
        assert_eq!(args("in.mat", None).output_format(), None);
    }

    #[test]
    fn test_log_filter() {
        let mut a = args("in.txt", None);
        assert_eq!(a.log_filter(), "warn");
        a.verbose = true;
        assert_eq!(a.log_filter(), "debug");
    }
}
