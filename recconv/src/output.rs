//! Terminal output formatting utilities.

use colored::Colorize;

/// Print an error message to stderr.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{}: {}", "error".red().bold(), err);

    // Print cause chain
    for cause in err.chain().skip(1) {
        eprintln!("  {}: {}", "caused by".red(), cause);
    }
}

/// Print a warning message to stderr.
pub fn print_warning(msg: &str) {
    eprintln!("{}: {}", "warning".yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str, quiet: bool) {
    if !quiet {
        println!("{}: {}", "success".green().bold(), msg);
    }
}

/// Print a verbose message (only in verbose mode).
pub fn print_verbose(msg: &str, verbose: bool) {
    if verbose {
        println!("{}: {}", "info".blue(), msg);
    }
}

/// Print a header line.
pub fn print_header(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// Print a key-value pair.
pub fn print_kv(key: &str, value: &str, indent: usize) {
    let padding = " ".repeat(indent);
    println!("{}{}: {}", padding, key.dimmed(), value);
}

/// Label for a record's class, `struct` when it has none.
pub fn class_label(class: Option<&str>) -> String {
    match class {
        Some(name) => name.to_string(),
        None => "(struct)".to_string(),
    }
}

/// Format file size in human-readable form.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Pluralize a count, `1 field` / `3 fields`.
pub fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{} {}", n, noun)
    } else {
        format!("{} {}s", n, noun)
    }
}
