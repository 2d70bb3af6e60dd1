//! Point distributor — spreads every parsed point over the active project sections
//! round-robin.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::customizer::locator::ProjectSection;
use crate::customizer::tech_stack::TechStackEntry;

/// Default size of the active set ("top projects").
pub const DEFAULT_MAX_ACTIVE_SECTIONS: usize = 3;

/// How located sections are ranked before the active set is cut.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionRanking {
    /// Order of appearance in the document.
    #[default]
    DocumentOrder,
    /// Most existing bullets first; ties keep document order.
    MostBullets,
}

impl FromStr for SectionRanking {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document_order" => Ok(Self::DocumentOrder),
            "most_bullets" => Ok(Self::MostBullets),
            other => Err(format!(
                "unknown section ranking '{other}' (expected document_order or most_bullets)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSetPolicy {
    pub max_sections: usize,
    pub ranking: SectionRanking,
}

impl Default for ActiveSetPolicy {
    fn default() -> Self {
        Self {
            max_sections: DEFAULT_MAX_ACTIVE_SECTIONS,
            ranking: SectionRanking::default(),
        }
    }
}

/// Section index → bullets to insert there, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistributionPlan {
    assignments: BTreeMap<usize, Vec<String>>,
}

impl DistributionPlan {
    pub fn bullets_for(&self, section_index: usize) -> &[String] {
        self.assignments
            .get(&section_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sections with at least one bullet, ascending by section index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.assignments
            .iter()
            .map(|(index, bullets)| (*index, bullets.as_slice()))
    }

    pub fn total_points(&self) -> usize {
        self.assignments.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Distribution {
    pub plan: DistributionPlan,
    /// Active section indices in ranking order.
    pub active: Vec<usize>,
    pub warnings: Vec<String>,
}

/// Picks the active set and assigns the i-th point of the flattened point sequence to
/// active section `i mod K`. Deterministic: identical input gives an identical plan.
pub fn distribute(
    entries: &[TechStackEntry],
    sections: &[ProjectSection],
    policy: &ActiveSetPolicy,
) -> Distribution {
    let mut warnings = Vec::new();
    let active = select_active(sections, policy);

    if active.is_empty() {
        warnings.push("no project sections available; no points distributed".to_string());
        return Distribution {
            plan: DistributionPlan::default(),
            active,
            warnings,
        };
    }

    if sections.len() > active.len() {
        warnings.push(format!(
            "{} project sections found; only {} receive new points",
            sections.len(),
            active.len()
        ));
    }

    let mut assignments: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    let points = entries.iter().flat_map(|e| e.points.iter());
    for (i, point) in points.enumerate() {
        let section_index = active[i % active.len()];
        assignments
            .entry(section_index)
            .or_default()
            .push(point.clone());
    }

    Distribution {
        plan: DistributionPlan { assignments },
        active,
        warnings,
    }
}

fn select_active(sections: &[ProjectSection], policy: &ActiveSetPolicy) -> Vec<usize> {
    let mut ranked: Vec<&ProjectSection> = sections.iter().collect();
    if policy.ranking == SectionRanking::MostBullets {
        // stable sort keeps document order among ties
        ranked.sort_by(|a, b| b.existing_bullet_count.cmp(&a.existing_bullet_count));
    }
    ranked
        .into_iter()
        .take(policy.max_sections)
        .map(|s| s.index)
        .collect()
}
