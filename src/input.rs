//! Input file parsing for the submit commands.
//!
//! Two layouts are accepted, and may be mixed line by line:
//!
//! ```text
//! hyperiongray
//! darpa,"agency,government"
//! nasa,space
//! ```
//!
//! A bare line is an identifier. A line with a comma is CSV: column 1 is the
//! identifier and every later column holds comma-separated labels. Fields may
//! be double-quoted, with `""` standing for a literal quote. A line with an
//! unterminated quote is skipped with a warning.

use tracing::warn;

use crate::normalize::{LabelMap, LabelSpec};

/// Identifiers in file order plus any labels found alongside them.
#[derive(Debug, Default)]
pub struct ParsedInput {
    pub identifiers: Vec<String>,
    pub labels: LabelMap,
}

impl ParsedInput {
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

pub fn parse_identifiers(text: &str) -> ParsedInput {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut parsed = ParsedInput::default();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(fields) = split_fields(line) else {
            warn!(line = number + 1, "skipping input line with an unterminated quote");
            continue;
        };
        let id = fields[0].as_str();
        if id.is_empty() {
            continue;
        }

        let rest = fields[1..].join(",");
        if !rest.trim_matches(|c: char| c == ',' || c.is_whitespace()).is_empty() {
            parsed
                .labels
                .insert(id.to_string(), LabelSpec::Joined(rest));
        }
        parsed.identifiers.push(id.to_string());
    }

    parsed
}

/// Split one CSV line into trimmed fields. `None` if a quote is left open.
fn split_fields(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if quoted {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => quoted = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                quoted = true;
            }
            ',' => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }

    if quoted {
        return None;
    }
    fields.push(field.trim().to_string());
    Some(fields)
}
