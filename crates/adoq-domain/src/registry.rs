//! Field registry - friendly names to canonical references
//!
//! The registry is pure data plus lookup. It is built once (optionally
//! extended with process-specific fields through [`FieldRegistry::with_field`])
//! and shared read-only afterwards.

use crate::field::ValueType;
use std::collections::HashMap;
use std::fmt;

/// A queryable field of the work-tracking store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Fully-qualified reference name (e.g. `System.AreaPath`)
    pub reference: String,

    /// Declared value type
    pub value_type: ValueType,
}

impl FieldDef {
    /// Create a field definition
    pub fn new(reference: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            reference: reference.into(),
            value_type,
        }
    }
}

/// Lookup failure for a field name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    /// The name as the caller supplied it
    pub name: String,
}

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown field: '{}'", self.name)
    }
}

impl std::error::Error for UnknownField {}

/// Outcome of work item type normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeResolution {
    /// Canonical type name, or the input unchanged when unmapped
    pub name: String,

    /// False when no synonym matched (low confidence)
    pub mapped: bool,
}

/// Well-known reference names used outside the registry tables
pub mod refs {
    /// Work item identifier
    pub const ID: &str = "System.Id";
    /// Title
    pub const TITLE: &str = "System.Title";
    /// Description
    pub const DESCRIPTION: &str = "System.Description";
    /// State
    pub const STATE: &str = "System.State";
    /// Work item type
    pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
    /// Assigned to
    pub const ASSIGNED_TO: &str = "System.AssignedTo";
    /// Last changed date
    pub const CHANGED_DATE: &str = "System.ChangedDate";
    /// Creation date
    pub const CREATED_DATE: &str = "System.CreatedDate";
    /// Team project (scope field)
    pub const TEAM_PROJECT: &str = "System.TeamProject";
    /// Area path
    pub const AREA_PATH: &str = "System.AreaPath";
    /// Iteration path
    pub const ITERATION_PATH: &str = "System.IterationPath";
    /// Tags
    pub const TAGS: &str = "System.Tags";
    /// Priority
    pub const PRIORITY: &str = "Microsoft.VSTS.Common.Priority";
}

// (friendly key, reference, type)
const STANDARD_FIELDS: &[(&str, &str, ValueType)] = &[
    // System fields
    ("id", refs::ID, ValueType::Integer),
    ("title", refs::TITLE, ValueType::String),
    ("description", refs::DESCRIPTION, ValueType::PlainText),
    ("state", refs::STATE, ValueType::String),
    ("workitemtype", refs::WORK_ITEM_TYPE, ValueType::String),
    ("assignedto", refs::ASSIGNED_TO, ValueType::Identity),
    ("createdby", "System.CreatedBy", ValueType::Identity),
    ("changedby", "System.ChangedBy", ValueType::Identity),
    ("createddate", refs::CREATED_DATE, ValueType::DateTime),
    ("changeddate", refs::CHANGED_DATE, ValueType::DateTime),
    ("areapath", refs::AREA_PATH, ValueType::TreePath),
    ("iterationpath", refs::ITERATION_PATH, ValueType::TreePath),
    ("teamproject", refs::TEAM_PROJECT, ValueType::String),
    ("reason", "System.Reason", ValueType::String),
    ("tags", refs::TAGS, ValueType::String),
    ("history", "System.History", ValueType::PlainText),
    ("rev", "System.Rev", ValueType::Integer),
    ("commentcount", "System.CommentCount", ValueType::Integer),
    // Common process fields
    ("priority", refs::PRIORITY, ValueType::Integer),
    ("severity", "Microsoft.VSTS.Common.Severity", ValueType::String),
    ("triage", "Microsoft.VSTS.Common.Triage", ValueType::String),
    ("valuearea", "Microsoft.VSTS.Common.ValueArea", ValueType::String),
    ("risk", "Microsoft.VSTS.Common.Risk", ValueType::String),
    ("stackrank", "Microsoft.VSTS.Common.StackRank", ValueType::Integer),
    ("closedby", "Microsoft.VSTS.Common.ClosedBy", ValueType::Identity),
    ("closeddate", "Microsoft.VSTS.Common.ClosedDate", ValueType::DateTime),
    ("resolvedby", "Microsoft.VSTS.Common.ResolvedBy", ValueType::Identity),
    ("resolveddate", "Microsoft.VSTS.Common.ResolvedDate", ValueType::DateTime),
    ("activatedby", "Microsoft.VSTS.Common.ActivatedBy", ValueType::Identity),
    ("activateddate", "Microsoft.VSTS.Common.ActivatedDate", ValueType::DateTime),
    ("statechangedate", "Microsoft.VSTS.Common.StateChangeDate", ValueType::DateTime),
    // Scheduling fields
    ("effort", "Microsoft.VSTS.Scheduling.Effort", ValueType::Integer),
    ("storypoints", "Microsoft.VSTS.Scheduling.StoryPoints", ValueType::Integer),
    ("originalestimate", "Microsoft.VSTS.Scheduling.OriginalEstimate", ValueType::Integer),
    ("remainingwork", "Microsoft.VSTS.Scheduling.RemainingWork", ValueType::Integer),
    ("completedwork", "Microsoft.VSTS.Scheduling.CompletedWork", ValueType::Integer),
    ("activity", "Microsoft.VSTS.Scheduling.Activity", ValueType::String),
    ("startdate", "Microsoft.VSTS.Scheduling.StartDate", ValueType::DateTime),
    ("finishdate", "Microsoft.VSTS.Scheduling.FinishDate", ValueType::DateTime),
    ("targetdate", "Microsoft.VSTS.Scheduling.TargetDate", ValueType::DateTime),
    ("duedate", "Microsoft.VSTS.Scheduling.DueDate", ValueType::DateTime),
];

// (alias, friendly key)
const ALIASES: &[(&str, &str)] = &[
    ("area", "areapath"),
    ("iteration", "iterationpath"),
    ("sprint", "iterationpath"),
    ("type", "workitemtype"),
    ("wit", "workitemtype"),
    ("assignee", "assignedto"),
    ("owner", "assignedto"),
    ("changed", "changeddate"),
    ("updated", "changeddate"),
    ("modified", "changeddate"),
    ("lastchanged", "changeddate"),
    ("created", "createddate"),
    ("opened", "createddate"),
    ("closed", "closeddate"),
    ("resolved", "resolveddate"),
    ("tag", "tags"),
    ("project", "teamproject"),
    ("pri", "priority"),
    ("points", "storypoints"),
    ("sev", "severity"),
    ("body", "description"),
];

// (synonym, canonical type)
const WORK_ITEM_TYPES: &[(&str, &str)] = &[
    ("epic", "Epic"),
    ("feature", "Feature"),
    ("userstory", "User Story"),
    ("story", "User Story"),
    ("task", "Task"),
    ("bug", "Bug"),
    ("defect", "Bug"),
    ("issue", "Issue"),
    ("ticket", "Issue"),
    ("productbacklogitem", "Product Backlog Item"),
    ("pbi", "Product Backlog Item"),
    ("backlogitem", "Product Backlog Item"),
    ("requirement", "Requirement"),
    ("changerequest", "Change Request"),
    ("review", "Review"),
    ("riskassessment", "Risk Assessment"),
    ("impediment", "Impediment"),
    ("testcase", "Test Case"),
    ("item", "Item"),
];

/// Registry of queryable fields
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    by_key: HashMap<String, FieldDef>,
    by_reference: HashMap<String, FieldDef>,
    aliases: HashMap<String, String>,
    types: HashMap<String, String>,
}

impl FieldRegistry {
    /// Registry with the standard system, common and scheduling fields
    pub fn standard() -> Self {
        let mut registry = Self {
            by_key: HashMap::new(),
            by_reference: HashMap::new(),
            aliases: ALIASES
                .iter()
                .map(|(alias, key)| (alias.to_string(), key.to_string()))
                .collect(),
            types: WORK_ITEM_TYPES
                .iter()
                .map(|(synonym, name)| (synonym.to_string(), name.to_string()))
                .collect(),
        };

        for (key, reference, value_type) in STANDARD_FIELDS {
            registry.insert(key, FieldDef::new(*reference, *value_type));
        }

        registry
    }

    /// Add a field under a friendly name (e.g. a custom process field)
    ///
    /// Consumes the registry so that extension happens before it is shared.
    pub fn with_field(mut self, name: &str, def: FieldDef) -> Self {
        self.insert(&normalize_key(name), def);
        self
    }

    /// Add a work item type synonym
    pub fn with_type_synonym(mut self, synonym: &str, canonical: impl Into<String>) -> Self {
        self.types.insert(normalize_key(synonym), canonical.into());
        self
    }

    fn insert(&mut self, key: &str, def: FieldDef) {
        self.by_reference
            .insert(def.reference.to_lowercase(), def.clone());
        self.by_key.insert(key.to_string(), def);
    }

    /// Resolve a friendly name, alias or canonical reference
    ///
    /// Matching is case-insensitive; friendly names ignore spaces, dashes and
    /// underscores, and canonical references may be bracket-quoted.
    ///
    /// # Examples
    ///
    /// ```
    /// use adoq_domain::{FieldRegistry, ValueType};
    ///
    /// let registry = FieldRegistry::standard();
    /// let area = registry.resolve("area").unwrap();
    /// assert_eq!(area.reference, "System.AreaPath");
    /// assert_eq!(area.value_type, ValueType::TreePath);
    ///
    /// let priority = registry.resolve("[microsoft.vsts.common.priority]").unwrap();
    /// assert_eq!(priority.value_type, ValueType::Integer);
    ///
    /// assert!(registry.resolve("favourite colour").is_err());
    /// ```
    pub fn resolve(&self, name: &str) -> Result<&FieldDef, UnknownField> {
        let trimmed = name.trim();
        let unbracketed = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(trimmed);

        if let Some(def) = self.by_reference.get(&unbracketed.to_lowercase()) {
            return Ok(def);
        }

        let key = normalize_key(unbracketed);
        let key = self.aliases.get(&key).cloned().unwrap_or(key);

        self.by_key.get(&key).ok_or_else(|| UnknownField {
            name: name.to_string(),
        })
    }

    /// Map a work item type synonym to the store's canonical vocabulary
    ///
    /// Plurals are folded ("stories", "bugs"). Unmapped names come back
    /// unchanged with `mapped == false`.
    pub fn normalize_work_item_type(&self, name: &str) -> TypeResolution {
        let key = normalize_key(name);

        let candidates = [
            Some(key.clone()),
            key.strip_suffix("ies").map(|stem| format!("{}y", stem)),
            key.strip_suffix('s').map(str::to_string),
        ];

        for candidate in candidates.into_iter().flatten() {
            if let Some(canonical) = self.types.get(&candidate) {
                return TypeResolution {
                    name: canonical.clone(),
                    mapped: true,
                };
            }
        }

        // Already canonical ("User Story")?
        if let Some(canonical) = self.types.values().find(|t| t.eq_ignore_ascii_case(name.trim())) {
            return TypeResolution {
                name: canonical.clone(),
                mapped: true,
            };
        }

        TypeResolution {
            name: name.to_string(),
            mapped: false,
        }
    }

    /// All registered fields, sorted by reference name
    pub fn fields(&self) -> Vec<&FieldDef> {
        let mut fields: Vec<_> = self.by_reference.values().collect();
        fields.sort_by(|a, b| a.reference.cmp(&b.reference));
        fields
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn normalize_key(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_friendly_names() {
        let registry = FieldRegistry::standard();

        assert_eq!(registry.resolve("Assigned To").unwrap().reference, refs::ASSIGNED_TO);
        assert_eq!(registry.resolve("changed_date").unwrap().reference, refs::CHANGED_DATE);
        assert_eq!(registry.resolve("story-points").unwrap().value_type, ValueType::Integer);
    }

    #[test]
    fn test_resolve_aliases() {
        let registry = FieldRegistry::standard();

        assert_eq!(registry.resolve("priority").unwrap().reference, refs::PRIORITY);
        assert_eq!(registry.resolve("area").unwrap().value_type, ValueType::TreePath);
        assert_eq!(registry.resolve("Sprint").unwrap().reference, refs::ITERATION_PATH);
        assert_eq!(registry.resolve("changed").unwrap().reference, refs::CHANGED_DATE);
    }

    #[test]
    fn test_resolve_canonical_references() {
        let registry = FieldRegistry::standard();

        assert_eq!(registry.resolve("System.Title").unwrap().reference, refs::TITLE);
        assert_eq!(registry.resolve("[system.state]").unwrap().reference, refs::STATE);
    }

    #[test]
    fn test_unknown_field_has_no_namespace_fallback() {
        let registry = FieldRegistry::standard();

        let err = registry.resolve("Mood").unwrap_err();
        assert_eq!(err.name, "Mood");
        assert!(registry.resolve("System.Mood").is_err());
        assert!(registry.resolve("").is_err());
    }

    #[test]
    fn test_custom_field_extension() {
        let registry = FieldRegistry::standard()
            .with_field("customer", FieldDef::new("Contoso.Customer", ValueType::String));

        assert_eq!(registry.resolve("Customer").unwrap().reference, "Contoso.Customer");
        assert_eq!(registry.resolve("contoso.customer").unwrap().value_type, ValueType::String);
    }

    #[test]
    fn test_normalize_work_item_type_synonyms() {
        let registry = FieldRegistry::standard();

        assert_eq!(registry.normalize_work_item_type("story").name, "User Story");
        assert_eq!(registry.normalize_work_item_type("Stories").name, "User Story");
        assert_eq!(registry.normalize_work_item_type("tickets").name, "Issue");
        assert_eq!(registry.normalize_work_item_type("PBI").name, "Product Backlog Item");
        assert_eq!(registry.normalize_work_item_type("bugs").name, "Bug");
        assert!(registry.normalize_work_item_type("User Story").mapped);
    }

    #[test]
    fn test_normalize_work_item_type_fallback() {
        let registry = FieldRegistry::standard();

        let resolution = registry.normalize_work_item_type("Incident Report");
        assert_eq!(resolution.name, "Incident Report");
        assert!(!resolution.mapped);
    }

    #[test]
    fn test_fields_listing_is_sorted() {
        let registry = FieldRegistry::standard();
        let fields = registry.fields();

        assert!(fields.len() >= STANDARD_FIELDS.len());
        assert!(fields.windows(2).all(|w| w[0].reference <= w[1].reference));
    }
}
