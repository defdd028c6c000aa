/// The structured finding produced by an inspection.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::symbols::{Position, TextRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Middle,
    Low,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Self::High),
            "MIDDLE" => Ok(Self::Middle),
            "LOW" => Ok(Self::Low),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::High => "HIGH",
            Self::Middle => "MIDDLE",
            Self::Low => "LOW",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemPosition {
    /// Absolute line in the document; recomputed whenever read from the cache.
    pub line: usize,
    /// Line relative to the start of the owning code unit.
    pub relative_line: usize,
    /// Literal source text of `line`.
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub description: String,
    /// A single token of the flagged line, e.g. a keyword or a method name.
    pub symbol: String,
    pub position: ProblemPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    pub problem: Problem,
    pub solution: String,
    pub severity: Severity,
}

impl Finding {
    /// Identity used by renderers to recognize the same finding across renders.
    pub fn key(&self) -> &str {
        self.solution.trim()
    }

    /// Range to highlight for this finding.
    ///
    /// The first occurrence of the problem symbol on the flagged line, or the
    /// line from its first non-whitespace character when the symbol does not
    /// occur in it.
    pub fn indicator_range(&self) -> TextRange {
        let position = &self.problem.position;
        let code = position.code.as_str();
        let symbol = self.problem.symbol.as_str();
        let (start, end) = match code.find(symbol).filter(|_| !symbol.is_empty()) {
            Some(start) => (start, start + symbol.len()),
            None => {
                let start = code.len() - code.trim_start().len();
                (start, code.len())
            }
        };
        TextRange::new(
            Position::new(position.line, start),
            Position::new(position.line, end),
        )
    }
}

#[cfg(test)]
pub(crate) fn finding(line: usize, solution: &str) -> Finding {
    Finding {
        document: None,
        problem: Problem {
            description: format!("problem at {line}"),
            symbol: "if".to_string(),
            position: ProblemPosition {
                line,
                relative_line: line,
                code: "    if (a) {".to_string(),
            },
        },
        solution: solution.to_string(),
        severity: Severity::Middle,
    }
}
