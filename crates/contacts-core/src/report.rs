//! Textual batch reports
//!
//! ## Format
//!
//! ```text
//! Summary: Added - 1, Already - 1, Not found - 0
//! 79990000001 - added
//! @alice - already a contact
//! ```
//!
//! `, Failed - N` is appended to the summary only when at least one import
//! call failed. Identifiers never contain whitespace, so the first `" - "`
//! on a detail line separates the identifier from the label.

use crate::batch::{BatchResult, ContactOutcome};
use crate::error::{Error, Result};
use std::fmt::Write;

const SUMMARY_PREFIX: &str = "Summary: ";
const DETAIL_SEPARATOR: &str = " - ";

/// Summary counts read back from a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Added count
    pub added: usize,
    /// Already-a-contact count
    pub already_contact: usize,
    /// Not-found count
    pub not_found: usize,
    /// Failed count (zero when the summary omits it)
    pub failed: usize,
}

/// A report parsed back into structured form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReport {
    /// The summary line
    pub summary: ReportSummary,
    /// `(identifier, outcome)` pairs, in report order
    pub details: Vec<(String, ContactOutcome)>,
}

/// Render the summary line
pub fn format_summary(result: &BatchResult) -> String {
    let mut line = format!(
        "{}Added - {}, Already - {}, Not found - {}",
        SUMMARY_PREFIX,
        result.added(),
        result.already_contact(),
        result.not_found()
    );
    if result.failed() > 0 {
        let _ = write!(line, ", Failed - {}", result.failed());
    }
    line
}

/// Render the full report
pub fn format_report(result: &BatchResult) -> String {
    let mut out = format_summary(result);
    out.push('\n');

    for entry in result.details() {
        let _ = writeln!(
            out,
            "{}{}{}",
            entry.identifier,
            DETAIL_SEPARATOR,
            entry.outcome.label()
        );
    }

    out
}

/// Parse a report produced by [`format_report`]
///
/// Blank lines are ignored. The summary must be the first non-blank line.
pub fn parse_report(text: &str) -> Result<ParsedReport> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let summary_line = lines
        .next()
        .ok_or_else(|| Error::parse("report is empty"))?;
    let summary = parse_summary(summary_line)?;

    let details = lines
        .map(|line| {
            let (identifier, label) = line
                .split_once(DETAIL_SEPARATOR)
                .ok_or_else(|| Error::parse(format!("malformed detail line: '{}'", line)))?;
            let outcome = ContactOutcome::from_label(label.trim_end())
                .ok_or_else(|| Error::parse(format!("unknown status label: '{}'", label)))?;
            Ok((identifier.to_string(), outcome))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ParsedReport { summary, details })
}

fn parse_summary(line: &str) -> Result<ReportSummary> {
    let body = line
        .trim_end()
        .strip_prefix(SUMMARY_PREFIX)
        .ok_or_else(|| Error::parse(format!("missing summary line, got: '{}'", line)))?;

    let mut summary = ReportSummary::default();
    for part in body.split(", ") {
        let (name, value) = part
            .split_once(DETAIL_SEPARATOR)
            .ok_or_else(|| Error::parse(format!("malformed summary field: '{}'", part)))?;
        let value: usize = value
            .parse()
            .map_err(|e| Error::parse(format!("invalid count in '{}': {}", part, e)))?;

        match name {
            "Added" => summary.added = value,
            "Already" => summary.already_contact = value,
            "Not found" => summary.not_found = value,
            "Failed" => summary.failed = value,
            _ => return Err(Error::parse(format!("unknown summary field: '{}'", name))),
        }
    }

    Ok(summary)
}
