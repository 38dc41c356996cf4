//! Output formatters for file reports.
//!
//! This module provides trait-based formatters for rendering file reports
//! in various output formats (human-readable, JSON, compact).

use crate::types::{FileInfo, FileReport, ProgramImage, SubfileInfo};
use std::path::Path;

/// Trait for formatting file reports.
///
/// Implementors provide methods for rendering each component of a report,
/// plus a method to render the complete report.
pub trait ReportFormatter {
    /// Format the file path header.
    fn format_file(&self, path: &Path) -> String;

    /// Format the classification.
    fn format_info(&self, info: &FileInfo) -> Option<String>;

    /// Format the loaded program image.
    fn format_image(&self, image: &ProgramImage) -> Option<String>;

    /// Format a load failure.
    fn format_load_error(&self, message: &str) -> Option<String>;

    /// Format the chained KC-TAP containers.
    fn format_subfiles(&self, subfiles: &[SubfileInfo]) -> Option<String>;

    /// Format the complete report.
    ///
    /// Default implementation concatenates all component outputs.
    fn format_report(&self, report: &FileReport, path: &Path) -> String {
        let mut parts = vec![self.format_file(path)];

        if let Some(s) = self.format_info(&report.info) {
            parts.push(s);
        }
        if let Some(s) = report.image.as_ref().and_then(|i| self.format_image(i)) {
            parts.push(s);
        }
        if let Some(s) = report
            .load_error
            .as_deref()
            .and_then(|e| self.format_load_error(e))
        {
            parts.push(s);
        }
        if let Some(s) = self.format_subfiles(&report.subfiles) {
            parts.push(s);
        }

        parts.join("")
    }
}

/// Human-readable output formatter.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    /// Show verbose output (file length, traits)
    pub verbose: bool,
    /// Quiet mode (one line per file)
    pub quiet: bool,
}

impl HumanFormatter {
    /// Create a new human formatter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a verbose formatter.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            quiet: false,
        }
    }

    /// Create a quiet formatter.
    pub fn quiet() -> Self {
        Self {
            verbose: false,
            quiet: true,
        }
    }
}

impl ReportFormatter for HumanFormatter {
    fn format_file(&self, path: &Path) -> String {
        if self.quiet {
            String::new()
        } else {
            format!("File: {}\n", path.display())
        }
    }

    fn format_info(&self, info: &FileInfo) -> Option<String> {
        if self.quiet {
            return Some(format!("{info}\n"));
        }

        let mut s = match info.format {
            Some(format) => format!("  Format:      {format}\n"),
            None => String::from("  Format:      unknown\n"),
        };
        if let Some(addr) = info.addr_text() {
            s.push_str(&format!("  Addresses:   {addr}\n"));
        }
        if let Some(ref desc) = info.description {
            s.push_str(&format!("  Name:        {desc}\n"));
        }
        if self.verbose {
            s.push_str(&format!("  Length:      {} bytes\n", info.file_len));
            if let Some(format) = info.format {
                s.push_str(&format!("  Traits:      {:?}\n", format.traits()));
            }
        }
        Some(s)
    }

    fn format_image(&self, image: &ProgramImage) -> Option<String> {
        if self.quiet {
            return None;
        }
        let mut s = format!("  Image:       {image}\n");
        if let Some(ref advisory) = image.advisory {
            s.push_str(&format!("  [warn] {advisory}\n"));
        }
        Some(s)
    }

    fn format_load_error(&self, message: &str) -> Option<String> {
        if self.quiet {
            None
        } else {
            Some(format!("  [error] {message}\n"))
        }
    }

    fn format_subfiles(&self, subfiles: &[SubfileInfo]) -> Option<String> {
        if subfiles.is_empty() || self.quiet {
            return None;
        }

        let mut s = String::from("  Subfiles:\n");
        for (i, sub) in subfiles.iter().enumerate() {
            s.push_str(&format!("    {}. @{:06X} {}\n", i + 1, sub.offset, sub.info));
        }
        Some(s)
    }

    fn format_report(&self, report: &FileReport, path: &Path) -> String {
        if self.quiet {
            return format!("{}: {}\n", path.display(), report.info);
        }

        let mut parts = vec![self.format_file(path)];
        if let Some(s) = self.format_info(&report.info) {
            parts.push(s);
        }
        if let Some(s) = report.image.as_ref().and_then(|i| self.format_image(i)) {
            parts.push(s);
        }
        if let Some(s) = report
            .load_error
            .as_deref()
            .and_then(|e| self.format_load_error(e))
        {
            parts.push(s);
        }
        if let Some(s) = self.format_subfiles(&report.subfiles) {
            parts.push(s);
        }
        parts.push(String::from("\n"));
        parts.join("")
    }
}

/// JSON output formatter.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    /// Pretty-print JSON
    pub pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonFormatter {
    /// Create a new JSON formatter with pretty printing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact JSON formatter.
    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl ReportFormatter for JsonFormatter {
    fn format_file(&self, _path: &Path) -> String {
        String::new() // Handled in format_report
    }

    fn format_info(&self, _info: &FileInfo) -> Option<String> {
        None
    }

    fn format_image(&self, _image: &ProgramImage) -> Option<String> {
        None
    }

    fn format_load_error(&self, _message: &str) -> Option<String> {
        None
    }

    fn format_subfiles(&self, _subfiles: &[SubfileInfo]) -> Option<String> {
        None
    }

    fn format_report(&self, report: &FileReport, path: &Path) -> String {
        #[derive(serde::Serialize)]
        struct JsonOutput<'a> {
            file: String,
            format_name: Option<&'static str>,
            summary: String,
            #[serde(flatten)]
            report: &'a FileReport,
            image_len: Option<usize>,
        }

        let output = JsonOutput {
            file: path.display().to_string(),
            format_name: report.info.format.map(|f| f.name()),
            summary: report.info.to_string(),
            report,
            image_len: report.image.as_ref().map(ProgramImage::len),
        };

        let json = if self.pretty {
            serde_json::to_string_pretty(&output)
        } else {
            serde_json::to_string(&output)
        };
        let mut s = json.unwrap_or_else(|_| "{}".to_string());
        s.push('\n');
        s
    }
}

/// Compact single-line output formatter.
#[derive(Debug, Clone, Default)]
pub struct ShortFormatter;

impl ShortFormatter {
    /// Create a new short formatter.
    pub fn new() -> Self {
        Self
    }
}

impl ReportFormatter for ShortFormatter {
    fn format_file(&self, _path: &Path) -> String {
        String::new()
    }

    fn format_info(&self, _info: &FileInfo) -> Option<String> {
        None
    }

    fn format_image(&self, _image: &ProgramImage) -> Option<String> {
        None
    }

    fn format_load_error(&self, _message: &str) -> Option<String> {
        None
    }

    fn format_subfiles(&self, _subfiles: &[SubfileInfo]) -> Option<String> {
        None
    }

    fn format_report(&self, report: &FileReport, path: &Path) -> String {
        let hex = |a: Option<u16>| a.map_or_else(|| "-".to_string(), |a| format!("{a:04X}"));
        let info = &report.info;
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\n",
            path.display(),
            info.format.map_or("unknown", |f| f.name()),
            hex(info.beg_addr),
            hex(info.end_addr),
            hex(info.start_addr),
            info.description.as_deref().unwrap_or("")
        )
    }
}
