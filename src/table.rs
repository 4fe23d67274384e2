//! Parser for the columnar output of `ai-services application ps`.
//!
//! ```text
//! APPLICATION NAME  POD NAME            STATUS
//! ──────────────────────────────────────────────
//! rag-app-1         rag-app-1--backend  Running (healthy)
//! ```
//!
//! The application column is optional per row; status runs to end of line and
//! keeps its internal spacing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::errors::{HarnessError, Result};

static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s─-]+$").expect("separator regex"));
static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^APPLICATION\s+NAME\s+POD\s+NAME\s+STATUS$").expect("header regex")
});
static ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(?P<app>\S+)\s+)?(?P<pod>\S+)\s{2,}(?P<status>.+)$").expect("row regex")
});

/// One parsed data line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitRow {
    pub app: Option<String>,
    pub unit: String,
    pub status: String,
}

impl UnitRow {
    pub fn is_healthy_or_created(&self) -> bool {
        self.status.starts_with(HEALTHY_PREFIX) || self.status == CREATED_STATUS
    }
}

pub const HEALTHY_PREFIX: &str = "Running (healthy)";
pub const CREATED_STATUS: &str = "Created";

/// True for a header line (column titles, whitespace-flexible).
pub fn is_header(line: &str) -> bool {
    HEADER_RE.is_match(line.trim())
}

/// True for a line made only of whitespace, ASCII dashes, or box-drawing dashes.
pub fn is_separator(line: &str) -> bool {
    SEPARATOR_RE.is_match(line)
}

/// Parse already-split lines into rows.
///
/// Blank, header and separator lines are skipped; any other line that does not
/// fit the row shape fails the whole call, quoting the line.
pub fn parse_rows<S: AsRef<str>>(lines: &[S]) -> Result<Vec<UnitRow>> {
    let mut rows = Vec::with_capacity(lines.len());
    for raw in lines {
        let line = raw.as_ref().trim_end();
        if line.is_empty() || is_header(line) || is_separator(line) {
            continue;
        }
        let caps = ROW_RE
            .captures(line)
            .ok_or_else(|| HarnessError::UnparseableRow(line.to_string()))?;
        let app = caps
            .name("app")
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());
        rows.push(UnitRow {
            app,
            unit: caps["pod"].trim().to_string(),
            status: caps["status"].trim().to_string(),
        });
    }
    Ok(rows)
}

/// Split a captured blob into lines and parse it.
pub fn parse_output(output: &str) -> Result<Vec<UnitRow>> {
    let lines: Vec<&str> = output.lines().collect();
    parse_rows(&lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_with_app_and_spaced_status() {
        let rows = parse_rows(&["appX  unitY  Running (healthy)"]).unwrap();
        assert_eq!(
            rows,
            vec![UnitRow {
                app: Some("appX".to_string()),
                unit: "unitY".to_string(),
                status: "Running (healthy)".to_string(),
            }]
        );
    }

    #[test]
    fn row_without_app_column() {
        let rows = parse_rows(&["                  rag-app-1--db  Created"]).unwrap();
        assert_eq!(rows[0].app, None);
        assert_eq!(rows[0].unit, "rag-app-1--db");
        assert_eq!(rows[0].status, "Created");
    }

    #[test]
    fn header_and_separators_are_skipped() {
        let input = [
            "APPLICATION NAME   POD NAME   STATUS   ",
            "──────────────",
            "-----  ----",
            "   ",
            "",
        ];
        assert!(parse_rows(&input).unwrap().is_empty());
    }

    #[test]
    fn single_token_line_is_rejected_verbatim() {
        let err = parse_rows(&["APPLICATION NAME  POD NAME  STATUS", "lonely"]).unwrap_err();
        match err {
            HarnessError::UnparseableRow(line) => assert_eq!(line, "lonely"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn healthy_or_created() {
        let mk = |s: &str| UnitRow {
            app: None,
            unit: "u".to_string(),
            status: s.to_string(),
        };
        assert!(mk("Running (healthy)").is_healthy_or_created());
        assert!(mk("Running (healthy) 3m").is_healthy_or_created());
        assert!(mk("Created").is_healthy_or_created());
        assert!(!mk("Running (starting)").is_healthy_or_created());
        assert!(!mk("Exited").is_healthy_or_created());
    }
}
