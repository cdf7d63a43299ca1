//! Find requests.

use crate::condition::Condition;
use crate::page::PageRequest;
use crate::sort::Sort;
use serde::{Deserialize, Serialize};

/// Join type used when a path crosses a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JoinKind {
    /// Drop rows without a related entity.
    Inner,
    /// Keep rows without a related entity; the related columns are null.
    #[default]
    Left,
}

/// A read request rooted at one entity type.
///
/// `fields` are dotted paths to project. Paths may cross relations
/// (`"phones.number"`) and descend into document columns
/// (`"metadata.color"`). With no fields, whole root entities are returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindQuery {
    /// Root entity type.
    pub entity: String,
    /// Field paths to project.
    pub fields: Vec<String>,
    /// Filter condition.
    pub condition: Option<Condition>,
    /// Sort keys in priority order.
    pub sort: Vec<Sort>,
    /// Join type for relation segments.
    pub join_kind: JoinKind,
    /// Page to fetch; `None` fetches everything.
    pub page: Option<PageRequest>,
}

impl FindQuery {
    /// Create a request for all entities of a type.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: Vec::new(),
            condition: None,
            sort: Vec::new(),
            join_kind: JoinKind::default(),
            page: None,
        }
    }

    /// Add field paths to project.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Add one field path.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Set the filter condition. `None` removes it.
    pub fn with_condition(mut self, condition: impl Into<Option<Condition>>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Append a sort key.
    pub fn sort_by(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    /// Append several sort keys.
    pub fn with_sorts(mut self, sorts: impl IntoIterator<Item = Sort>) -> Self {
        self.sort.extend(sorts);
        self
    }

    /// Set the join type for relation segments.
    pub fn with_join_kind(mut self, join_kind: JoinKind) -> Self {
        self.join_kind = join_kind;
        self
    }

    /// Request a single page.
    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }
}
