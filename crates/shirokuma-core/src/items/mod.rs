//! Item model - the universal record.
//!
//! Everything stored in the knowledge base is an Item; its `type` attribute
//! is a free-form lowercase label (issue, plan, doc, knowledge, session,
//! daily, spec, decision, ...), not a schema discriminator. All items share
//! one physical shape.

mod service;

pub use service::AddRelationsResult;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Title length ceiling
pub const MAX_TITLE_LEN: usize = 200;

/// Validate the `type` label: `^[a-z0-9_]+$`.
pub fn is_valid_type(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

pub(crate) fn validate_type(s: &str) -> Result<()> {
    if is_valid_type(s) {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "type must match [a-z0-9_]+, got '{s}'"
        )))
    }
}

pub(crate) fn validate_title(s: &str) -> Result<()> {
    let len = s.chars().count();
    if len == 0 || len > MAX_TITLE_LEN {
        return Err(ServiceError::InvalidInput(format!(
            "title must be 1..{MAX_TITLE_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

// ============================================================================
// PRIORITY
// ============================================================================

/// Item priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
    Minimal,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "CRITICAL",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
            Priority::Minimal => "MINIMAL",
        }
    }

    /// Parse from a string name, case-insensitively. Returns `None` for
    /// unknown values so filter paths can degrade gracefully.
    pub fn parse_name(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CRITICAL" => Some(Priority::Critical),
            "HIGH" => Some(Priority::High),
            "MEDIUM" => Some(Priority::Medium),
            "LOW" => Some(Priority::Low),
            "MINIMAL" => Some(Priority::Minimal),
            _ => None,
        }
    }

    /// Sort rank: CRITICAL first.
    pub fn rank(&self) -> i32 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
            Priority::Minimal => 4,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// REFERENCE DATA
// ============================================================================

/// Workflow status reference row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub is_closable: bool,
    #[serde(skip)]
    pub sort_order: i64,
}

/// The 12 pre-seeded statuses in sort order. `true` marks terminal states.
pub const DEFAULT_STATUSES: &[(&str, bool)] = &[
    ("Open", false),
    ("Specification", false),
    ("Waiting", false),
    ("Ready", false),
    ("In Progress", false),
    ("Review", false),
    ("Testing", false),
    ("Pending", false),
    ("Completed", true),
    ("Closed", true),
    ("Canceled", true),
    ("Rejected", true),
];

/// Status name applied when `create_item` omits one.
pub const DEFAULT_STATUS: &str = "Open";

// ============================================================================
// DERIVED JOINS
// ============================================================================

/// A derived keyword attached to an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedKeyword {
    pub word: String,
    /// Blend score in (0, 1]
    pub weight: f64,
}

/// A derived concept attached to an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedConcept {
    pub name: String,
    /// Confidence in (0, 1]
    pub confidence: f64,
}

// ============================================================================
// ITEM
// ============================================================================

/// A fully hydrated item. `embedding` and `search_index` are internal and
/// never appear here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub priority: Priority,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Denormalized `X.Y.Z` form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub tags: Vec<String>,
    pub keywords: Vec<WeightedKeyword>,
    pub concepts: Vec<WeightedConcept>,
    /// Ids of symmetrically related items
    pub related: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lightweight projection for list/search results (no content, no
/// enrichment payloads).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: i64,
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// Status name
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// INPUT TYPES
// ============================================================================

/// Input for `create_item`.
///
/// Uses `deny_unknown_fields` to reject misspelled or injected fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateItemInput {
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    /// Status name; defaults to "Open"
    pub status: Option<String>,
    /// Defaults to MEDIUM
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// `X.Y.Z`; normalized on write
    pub version: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Item ids to relate symmetrically; unknown ids are skipped
    #[serde(default)]
    pub related: Vec<i64>,
}

impl CreateItemInput {
    /// Minimal input for the common case.
    pub fn new(item_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            title: title.into(),
            description: String::new(),
            content: String::new(),
            status: None,
            priority: None,
            category: None,
            start_date: None,
            end_date: None,
            version: None,
            tags: Vec::new(),
            related: Vec::new(),
        }
    }
}

/// Input for `update_item`. Missing fields are left unchanged; supplied
/// collections (`tags`, `related`) replace the stored set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateItemInput {
    pub id: i64,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub version: Option<String>,
    pub tags: Option<Vec<String>>,
    pub related: Option<Vec<i64>>,
}

impl UpdateItemInput {
    pub fn for_id(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// True when the update touches a field that feeds enrichment.
    pub(crate) fn triggers_enrichment(&self) -> bool {
        self.title.is_some() || self.description.is_some() || self.content.is_some()
    }
}

// ============================================================================
// LISTING PARAMETERS
// ============================================================================

/// Sort key for `list_items`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Created,
    Updated,
    Priority,
}

/// Sort direction for `list_items`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filters for the non-search listing surface. Unknown status or priority
/// names contribute no matches instead of failing.
#[derive(Debug, Clone, Default)]
pub struct ListItemsParams {
    pub item_type: Option<String>,
    /// Status names, matched case-insensitively; OR within the list
    pub statuses: Vec<String>,
    /// Priority names; OR within the list
    pub priorities: Vec<String>,
    /// Tag names; OR within the list
    pub tags: Vec<String>,
    /// When `Some(false)`, items in closable statuses are excluded
    pub include_closed_statuses: Option<bool>,
    /// Clamped to 100; defaults to 20
    pub limit: Option<u32>,
    pub offset: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_validation() {
        assert!(is_valid_type("issue"));
        assert!(is_valid_type("daily_note2"));
        assert!(!is_valid_type(""));
        assert!(!is_valid_type("Issue"));
        assert!(!is_valid_type("bug-report"));
        assert!(!is_valid_type("spec doc"));
    }

    #[test]
    fn test_priority_parse_and_order() {
        assert_eq!(Priority::parse_name("high"), Some(Priority::High));
        assert_eq!(Priority::parse_name("CRITICAL"), Some(Priority::Critical));
        assert_eq!(Priority::parse_name("urgent"), None);
        assert!(Priority::Critical.rank() < Priority::Minimal.rank());
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_default_statuses_shape() {
        assert_eq!(DEFAULT_STATUSES.len(), 12);
        let closable: Vec<&str> = DEFAULT_STATUSES
            .iter()
            .filter(|(_, closable)| *closable)
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(closable, vec!["Completed", "Closed", "Canceled", "Rejected"]);
    }

    #[test]
    fn test_create_input_deny_unknown_fields() {
        let json = r#"{"type": "issue", "title": "t", "tags": []}"#;
        assert!(serde_json::from_str::<CreateItemInput>(json).is_ok());

        let json = r#"{"type": "issue", "title": "t", "bogus": 1}"#;
        assert!(serde_json::from_str::<CreateItemInput>(json).is_err());
    }

    #[test]
    fn test_update_input_enrichment_trigger() {
        let mut input = UpdateItemInput::for_id(1);
        assert!(!input.triggers_enrichment());
        input.priority = Some(Priority::High);
        assert!(!input.triggers_enrichment());
        input.content = Some("new content".into());
        assert!(input.triggers_enrichment());
    }
}
