//! Agent filter engine
//!
//! Derives the agent list shown by the dashboard from the current snapshot
//! and a [`FilterCriteria`] value. Everything here is a pure function over
//! borrowed input; callers always receive a freshly allocated list.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::agent::Agent;

/// Sort order for the filtered agent list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Status,
    Category,
    /// Descending by success rate
    Performance,
}

/// Category restriction; `"all"` on the wire disables it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

impl CategoryFilter {
    pub fn named(category: impl Into<String>) -> Self {
        Self::Named(category.into())
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Named(expected) => expected == category,
        }
    }
}

impl From<&str> for CategoryFilter {
    fn from(value: &str) -> Self {
        if value == "all" {
            CategoryFilter::All
        } else {
            CategoryFilter::Named(value.to_string())
        }
    }
}

impl Serialize for CategoryFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CategoryFilter::All => serializer.serialize_str("all"),
            CategoryFilter::Named(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for CategoryFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(CategoryFilter::from(value.as_str()))
    }
}

/// Criteria applied to the agent list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub text: String,
    pub category: CategoryFilter,
    pub sort_key: SortKey,
}

impl FilterCriteria {
    /// Merge a partial update; unset fields keep their current value.
    pub fn merge(&mut self, update: FilterUpdate) {
        if let Some(text) = update.text {
            self.text = text;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(sort_key) = update.sort_key {
            self.sort_key = sort_key;
        }
    }
}

/// Partial filter criteria.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterUpdate {
    pub text: Option<String>,
    pub category: Option<CategoryFilter>,
    pub sort_key: Option<SortKey>,
}

impl FilterUpdate {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn category(category: impl Into<CategoryFilter>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    pub fn sort_key(sort_key: SortKey) -> Self {
        Self {
            sort_key: Some(sort_key),
            ..Self::default()
        }
    }
}

/// Filter and sort `agents` according to `criteria`.
///
/// Non-empty text is matched as given, whitespace included. The sort is
/// stable, so agents that compare equal keep their input order.
pub fn apply(agents: &[Agent], criteria: &FilterCriteria) -> Vec<Agent> {
    let needle = criteria.text.to_lowercase();
    let mut filtered: Vec<Agent> = agents
        .iter()
        .filter(|agent| needle.is_empty() || matches_text(agent, &needle))
        .filter(|agent| criteria.category.matches(&agent.category))
        .cloned()
        .collect();

    match criteria.sort_key {
        SortKey::Name => filtered.sort_by(|a, b| lexicographic(&a.name, &b.name)),
        SortKey::Status => {
            filtered.sort_by(|a, b| lexicographic(a.status.as_str(), b.status.as_str()))
        }
        SortKey::Category => filtered.sort_by(|a, b| lexicographic(&a.category, &b.category)),
        SortKey::Performance => filtered.sort_by(|a, b| {
            performance(b.success_rate).total_cmp(&performance(a.success_rate))
        }),
    }
    filtered
}

/// Group agents by category, preserving input order inside each group.
pub fn group_by_category(agents: &[Agent]) -> BTreeMap<String, Vec<Agent>> {
    let mut groups: BTreeMap<String, Vec<Agent>> = BTreeMap::new();
    for agent in agents {
        groups
            .entry(agent.category.clone())
            .or_default()
            .push(agent.clone());
    }
    groups
}

fn matches_text(agent: &Agent, needle: &str) -> bool {
    [&agent.name, &agent.description, &agent.category]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

fn lexicographic(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

// Agents without a success rate sort after every agent that has one.
fn performance(rate: Option<f64>) -> f64 {
    rate.unwrap_or(f64::NEG_INFINITY)
}
