//! Normalized work item records returned by the fetch executor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discussion comment on a work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Display name of the author
    pub author: String,

    /// When the comment was posted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,

    /// Comment body as plain text
    pub text: String,
}

/// One state change from the work item's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// State before the change (absent for the creating revision)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// State after the change
    pub to: String,

    /// When the change happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// A normalized work item
///
/// Carries the identifying fields plus whatever auxiliary data the query
/// asked for. Comments and transitions are empty unless requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Work item ID
    pub id: u64,

    /// Work item type ("Bug", "User Story", ...)
    pub work_item_type: String,

    /// Title
    pub title: String,

    /// Current state
    pub state: String,

    /// Display name of the assignee
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,

    /// Priority (1 = highest)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,

    /// Tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Area path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_path: Option<String>,

    /// Iteration path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration_path: Option<String>,

    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,

    /// Last-changed timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_date: Option<DateTime<Utc>>,

    /// Discussion comments, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,

    /// State transitions, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_transitions: Vec<StateTransition>,

    /// Web link to the item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl WorkItem {
    /// A record with only the identifying fields set
    pub fn new(
        id: u64,
        work_item_type: impl Into<String>,
        title: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            id,
            work_item_type: work_item_type.into(),
            title: title.into(),
            state: state.into(),
            assigned_to: None,
            priority: None,
            tags: Vec::new(),
            area_path: None,
            iteration_path: None,
            created_date: None,
            changed_date: None,
            comments: Vec::new(),
            state_transitions: Vec::new(),
            url: None,
        }
    }

    /// Split a `;`-separated tag string the way the store returns it
    pub fn parse_tags(raw: &str) -> Vec<String> {
        raw.split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }
}
