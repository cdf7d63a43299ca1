//! Sort keys.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// A sort key over a field path or an arithmetic expression of paths.
///
/// The field may combine paths with `+`, `-` and `*`, as in
/// `"salary + bonus"` or `"metadata->score - penalty"`. Operands are always
/// paths; numeric literals are not supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// Field path or arithmetic expression.
    pub field: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Create an ascending sort key.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    /// Create a descending sort key.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Ascending sort keys for several fields, in the given order.
    pub fn asc_list<I, S>(fields: I) -> Result<Vec<Sort>, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::list(fields, SortDirection::Asc)
    }

    /// Descending sort keys for several fields, in the given order.
    pub fn desc_list<I, S>(fields: I) -> Result<Vec<Sort>, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::list(fields, SortDirection::Desc)
    }

    fn list<I, S>(fields: I, direction: SortDirection) -> Result<Vec<Sort>, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorts: Vec<Sort> = fields
            .into_iter()
            .map(|field| Sort {
                field: field.into(),
                direction,
            })
            .collect();
        if sorts.is_empty() {
            return Err(Error::EmptyInput("sort requires at least one field".into()));
        }
        Ok(sorts)
    }
}
