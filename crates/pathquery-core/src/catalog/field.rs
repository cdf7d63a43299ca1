//! Field definitions for entities.

use super::types::{FieldType, ScalarType};
use rkyv::{Archive, Deserialize, Serialize};

/// A scalar field definition within an entity.
///
/// Relationship fields are not declared here; they come from the schema's
/// [`RelationDef`](super::RelationDef)s.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field data type.
    pub field_type: FieldType,
    /// Whether the field is required (non-nullable at the application level).
    pub required: bool,
}

impl FieldDef {
    /// Create a new required field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
        }
    }

    /// Create an optional field (required = false).
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }

    /// Create an optional scalar field.
    pub fn optional_scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self::optional(name, FieldType::OptionalScalar(scalar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_def_builder() {
        let field = FieldDef::new("id", FieldType::scalar(ScalarType::Uuid));
        assert_eq!(field.name, "id");
        assert!(field.required);

        let field = FieldDef::optional_scalar("birthday", ScalarType::Timestamp);
        assert!(!field.required);
        assert!(field.field_type.is_nullable());
    }
}
