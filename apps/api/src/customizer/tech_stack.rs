//! Tech-stack parser — turns `Name: • point • point` lines into ordered entries.

use serde::Serialize;

/// Separates points within one tech-stack line.
pub const BULLET_MARKER: char = '•';

/// A named technology and the achievement points to inject for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechStackEntry {
    pub name: String,
    pub points: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedTechStacks {
    pub entries: Vec<TechStackEntry>,
    pub warnings: Vec<String>,
}

impl ParsedTechStacks {
    pub fn total_points(&self) -> usize {
        self.entries.iter().map(|e| e.points.len()).sum()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }
}

/// Parses raw multi-line tech-stack text.
///
/// - Blank lines are ignored.
/// - The text before the first `:` is the name; the rest is split on `•` into points.
///   A remainder without any `•` is a single point.
/// - Lines without a colon (or with an empty name) are skipped with a warning.
/// - Repeated names merge: later points are appended to the first entry.
pub fn parse_tech_stacks(raw_text: &str) -> ParsedTechStacks {
    let mut entries: Vec<TechStackEntry> = Vec::new();
    let mut warnings = Vec::new();

    for line in raw_text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some((name, remainder)) = line.split_once(':') else {
            warnings.push(format!("unparsable tech-stack line: {line}"));
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            warnings.push(format!("unparsable tech-stack line: {line}"));
            continue;
        }

        let points = split_points(remainder);
        match entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.points.extend(points),
            None => entries.push(TechStackEntry {
                name: name.to_string(),
                points,
            }),
        }
    }

    for entry in entries.iter().filter(|e| e.points.is_empty()) {
        warnings.push(format!(
            "tech stack '{}' has no points; nothing to add",
            entry.name
        ));
    }

    ParsedTechStacks { entries, warnings }
}

fn split_points(remainder: &str) -> Vec<String> {
    remainder
        .split(BULLET_MARKER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
