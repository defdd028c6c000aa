/// Extraction of annotation blocks from a model reply.
///
/// A block is four consecutive comment lines placed directly above the line
/// they flag:
///
/// ```text
/// // @PROBLEM: Using if-else chain
/// // @SOLUTION: Use switch expression
/// // @SYMBOL: if
/// // @SEVERITY: MIDDLE
/// ```
///
/// The reply echoes the transcript, so removing every annotation line gives
/// back the transcript and lets each block be pinned to a transcript line.
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::prompt::NULL_SYMBOL;
use super::transcript::Transcript;
use crate::inspection::{Finding, Problem, ProblemPosition, Severity};

static PROBLEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*//\s*@PROBLEM:\s*(.*)$").expect("valid regex"));
static SOLUTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*//\s*@SOLUTION:\s*(.*)$").expect("valid regex"));
static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*//\s*@SYMBOL:\s*(.*)$").expect("valid regex"));
static SEVERITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*//\s*@SEVERITY:\s*(.*)$").expect("valid regex"));

/// One annotation block, positioned on the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub transcript_line: usize,
    pub description: String,
    pub solution: String,
    pub symbol: String,
    pub severity: Severity,
}

fn capture<'a>(re: &Regex, line: &'a str) -> Option<&'a str> {
    re.captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn is_marker(line: &str) -> bool {
    [&*PROBLEM_RE, &*SOLUTION_RE, &*SYMBOL_RE, &*SEVERITY_RE]
        .iter()
        .any(|re| re.is_match(line))
}

/// Scan a reply for annotation blocks.
///
/// Malformed fragments are skipped; they never abort the scan.
pub fn extract_annotations(reply: &str) -> Vec<Annotation> {
    let lines: Vec<&str> = reply
        .lines()
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.trim().is_empty())
        .collect();

    let mut annotations = Vec::new();
    let mut annotation_lines = 0usize;
    let mut i = 0usize;

    while i < lines.len() {
        let Some(description) = capture(&PROBLEM_RE, lines[i]) else {
            if is_marker(lines[i]) {
                annotation_lines += 1;
            }
            i += 1;
            continue;
        };

        // A PROBLEM line always opens a four-line block, complete or not.
        let start = i;
        let transcript_line = start - annotation_lines;
        let solution = lines.get(start + 1).and_then(|l| capture(&SOLUTION_RE, l));
        let symbol = lines.get(start + 2).and_then(|l| capture(&SYMBOL_RE, l));
        let severity = lines.get(start + 3).and_then(|l| capture(&SEVERITY_RE, l));
        annotation_lines += 4;
        i += 4;

        let (Some(solution), Some(symbol), Some(severity)) = (solution, symbol, severity) else {
            debug!("dropping incomplete annotation at reply line {start}");
            continue;
        };
        let severity = match severity.parse::<Severity>() {
            Ok(s) => s,
            Err(e) => {
                debug!("dropping annotation at reply line {start}: {e}");
                continue;
            }
        };
        if description.is_empty() || solution.is_empty() {
            debug!("dropping incomplete annotation at reply line {start}");
            continue;
        }
        if symbol == NULL_SYMBOL {
            continue;
        }
        annotations.push(Annotation {
            transcript_line,
            description: description.to_string(),
            solution: solution.to_string(),
            symbol: symbol.to_string(),
            severity,
        });
    }

    annotations.sort_by_key(|a| a.transcript_line);
    annotations
}

/// Pin annotations back onto the source the transcript was encoded from.
///
/// `line` and `relative_line` are both the line within `source`; callers
/// shift `line` to document coordinates.
pub fn remap(annotations: Vec<Annotation>, transcript: &Transcript, source_lines: &[&str]) -> Vec<Finding> {
    annotations
        .into_iter()
        .filter_map(|a| {
            let Some(line) = transcript.original_line(a.transcript_line) else {
                warn!(
                    "dropping annotation '{}': transcript line {} out of range",
                    a.description, a.transcript_line
                );
                return None;
            };
            let Some(code) = source_lines.get(line) else {
                warn!("dropping annotation '{}': source line {line} missing", a.description);
                return None;
            };
            Some(Finding {
                document: None,
                problem: Problem {
                    description: a.description,
                    symbol: a.symbol,
                    position: ProblemPosition {
                        line,
                        relative_line: line,
                        code: code.to_string(),
                    },
                },
                solution: a.solution,
                severity: a.severity,
            })
        })
        .collect()
}
