//! Predicate trees for find requests.
//!
//! Conditions are built against dotted field paths and stay unresolved until
//! the query compiler sees them. Every operator on [`FieldCondition`] returns
//! `Option<Condition>`: `None` means "no predicate", which is what a null or
//! empty operand produces. Composites drop `None` children, so optional
//! filters can be combined without checking each one.
//!
//! ```ignore
//! let condition = Condition::and([
//!     Condition::field("salary").greater_than_or_equal(26),
//!     Condition::field("lastName").like(form.last_name),
//! ]);
//! ```

use crate::entity::Entity;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// A literal value, coerced to the field type at compile time.
    Value(Value),
    /// A reference to an entity; compared through its identity.
    Entity(EntityRef),
}

/// Reference to a stored entity by type and identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    /// Entity type name.
    pub entity_type: String,
    /// Identity value.
    pub id: Value,
}

/// Boolean junction of a composite condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Junction {
    And,
    Or,
}

/// Conjunction or disjunction of child conditions.
///
/// An empty AND matches everything, an empty OR matches nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeCondition {
    pub junction: Junction,
    pub conditions: Vec<Condition>,
}

/// A predicate over dotted field paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// `field <op> operand`.
    Compare {
        field: String,
        op: CompareOp,
        operand: Operand,
    },
    /// Inclusive range.
    Between {
        field: String,
        low: Operand,
        high: Operand,
    },
    /// Case-insensitive substring match.
    Like { field: String, value: String },
    /// Membership in a literal list.
    In {
        field: String,
        values: Vec<Operand>,
        negated: bool,
    },
    /// Null check.
    Null { field: String, negated: bool },
    /// The collection at `field` contains `operand`.
    Contains { field: String, operand: Operand },
    /// `field <op> other`, comparing two paths of the same row.
    FieldCompare {
        field: String,
        op: CompareOp,
        other: String,
    },
    /// AND / OR of child conditions.
    Composite(CompositeCondition),
}

impl Operand {
    /// Check whether this operand should be treated as "no predicate".
    ///
    /// Null values and empty strings are absent.
    pub fn is_absent(&self) -> bool {
        match self {
            Operand::Value(Value::Null) => true,
            Operand::Value(Value::String(s)) => s.is_empty(),
            _ => false,
        }
    }
}

impl EntityRef {
    /// Create a reference from type and identity.
    pub fn new(entity_type: impl Into<String>, id: impl Into<Value>) -> Self {
        Self {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }
}

macro_rules! operand_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Value(Value::from(v))
                }
            }
        )*
    };
}

operand_from_value!(
    Value,
    bool,
    i32,
    i64,
    f32,
    f64,
    String,
    &str,
    [u8; 16],
    uuid::Uuid,
    serde_json::Value,
);

impl From<EntityRef> for Operand {
    fn from(v: EntityRef) -> Self {
        Operand::Entity(v)
    }
}

impl From<&Entity> for Operand {
    fn from(v: &Entity) -> Self {
        Operand::Entity(EntityRef::new(v.entity_type.clone(), v.id.clone()))
    }
}

impl<T: Into<Operand>> From<Option<T>> for Operand {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Operand::Value(Value::Null),
        }
    }
}

/// Builder for conditions on a single field path.
#[derive(Debug, Clone)]
pub struct FieldCondition {
    field: String,
}

impl Condition {
    /// Start a condition on a dotted field path.
    pub fn field(path: impl Into<String>) -> FieldCondition {
        FieldCondition { field: path.into() }
    }

    /// AND of the present children.
    pub fn and<I, C>(conditions: I) -> Condition
    where
        I: IntoIterator<Item = C>,
        C: Into<Option<Condition>>,
    {
        Self::composite(Junction::And, conditions)
    }

    /// OR of the present children.
    pub fn or<I, C>(conditions: I) -> Condition
    where
        I: IntoIterator<Item = C>,
        C: Into<Option<Condition>>,
    {
        Self::composite(Junction::Or, conditions)
    }

    fn composite<I, C>(junction: Junction, conditions: I) -> Condition
    where
        I: IntoIterator<Item = C>,
        C: Into<Option<Condition>>,
    {
        Condition::Composite(CompositeCondition {
            junction,
            conditions: conditions.into_iter().filter_map(Into::into).collect(),
        })
    }
}

impl FieldCondition {
    fn compare(self, op: CompareOp, operand: impl Into<Operand>) -> Option<Condition> {
        let operand = operand.into();
        if operand.is_absent() {
            return None;
        }
        Some(Condition::Compare {
            field: self.field,
            op,
            operand,
        })
    }

    pub fn equal(self, operand: impl Into<Operand>) -> Option<Condition> {
        self.compare(CompareOp::Eq, operand)
    }

    pub fn not_equal(self, operand: impl Into<Operand>) -> Option<Condition> {
        self.compare(CompareOp::Ne, operand)
    }

    pub fn greater_than(self, operand: impl Into<Operand>) -> Option<Condition> {
        self.compare(CompareOp::Gt, operand)
    }

    pub fn greater_than_or_equal(self, operand: impl Into<Operand>) -> Option<Condition> {
        self.compare(CompareOp::Ge, operand)
    }

    pub fn less_than(self, operand: impl Into<Operand>) -> Option<Condition> {
        self.compare(CompareOp::Lt, operand)
    }

    pub fn less_than_or_equal(self, operand: impl Into<Operand>) -> Option<Condition> {
        self.compare(CompareOp::Le, operand)
    }

    /// Inclusive range; a missing bound degrades to a one-sided comparison.
    pub fn between(
        self,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Option<Condition> {
        let low = low.into();
        let high = high.into();
        match (low.is_absent(), high.is_absent()) {
            (true, true) => None,
            (true, false) => self.less_than_or_equal(high),
            (false, true) => self.greater_than_or_equal(low),
            (false, false) => Some(Condition::Between {
                field: self.field,
                low,
                high,
            }),
        }
    }

    /// Case-insensitive "contains text" match.
    pub fn like(self, value: impl Into<Value>) -> Option<Condition> {
        let text = value.into().to_text()?;
        if text.is_empty() {
            return None;
        }
        Some(Condition::Like {
            field: self.field,
            value: text,
        })
    }

    pub fn in_values<I, T>(self, values: I) -> Option<Condition>
    where
        I: IntoIterator<Item = T>,
        T: Into<Operand>,
    {
        self.membership(values, false)
    }

    pub fn not_in<I, T>(self, values: I) -> Option<Condition>
    where
        I: IntoIterator<Item = T>,
        T: Into<Operand>,
    {
        self.membership(values, true)
    }

    fn membership<I, T>(self, values: I, negated: bool) -> Option<Condition>
    where
        I: IntoIterator<Item = T>,
        T: Into<Operand>,
    {
        let values: Vec<Operand> = values
            .into_iter()
            .map(Into::into)
            .filter(|v| !v.is_absent())
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(Condition::In {
            field: self.field,
            values,
            negated,
        })
    }

    pub fn is_null(self) -> Option<Condition> {
        Some(Condition::Null {
            field: self.field,
            negated: false,
        })
    }

    pub fn is_not_null(self) -> Option<Condition> {
        Some(Condition::Null {
            field: self.field,
            negated: true,
        })
    }

    /// The array field or to-many relation at this path contains `operand`.
    pub fn contains(self, operand: impl Into<Operand>) -> Option<Condition> {
        let operand = operand.into();
        if operand.is_absent() {
            return None;
        }
        Some(Condition::Contains {
            field: self.field,
            operand,
        })
    }

    fn compare_field(self, op: CompareOp, other: impl Into<String>) -> Option<Condition> {
        let other = other.into();
        if other.trim().is_empty() {
            return None;
        }
        Some(Condition::FieldCompare {
            field: self.field,
            op,
            other,
        })
    }

    pub fn equal_field(self, other: impl Into<String>) -> Option<Condition> {
        self.compare_field(CompareOp::Eq, other)
    }

    pub fn less_than_field(self, other: impl Into<String>) -> Option<Condition> {
        self.compare_field(CompareOp::Lt, other)
    }

    pub fn greater_than_field(self, other: impl Into<String>) -> Option<Condition> {
        self.compare_field(CompareOp::Gt, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_operands_yield_no_condition() {
        assert!(Condition::field("salary").equal(None::<i64>).is_none());
        assert!(Condition::field("lastName").equal("").is_none());
        assert!(Condition::field("lastName").like("").is_none());
        assert!(Condition::field("lastName").like(Value::Null).is_none());
        assert!(Condition::field("id").in_values(Vec::<i64>::new()).is_none());
        assert!(Condition::field("id").not_in([None::<i64>]).is_none());
        assert!(Condition::field("tags").contains(Value::Null).is_none());
    }

    #[test]
    fn test_between_degrades() {
        assert!(Condition::field("salary")
            .between(None::<i64>, None::<i64>)
            .is_none());

        assert_eq!(
            Condition::field("salary").between(None::<i64>, 26i64),
            Condition::field("salary").less_than_or_equal(26i64)
        );
        assert_eq!(
            Condition::field("salary").between(20i64, None::<i64>),
            Condition::field("salary").greater_than_or_equal(20i64)
        );

        match Condition::field("salary").between(20i64, 26i64) {
            Some(Condition::Between { low, high, .. }) => {
                assert_eq!(low, Operand::Value(Value::Int64(20)));
                assert_eq!(high, Operand::Value(Value::Int64(26)));
            }
            other => panic!("Expected Between, got {:?}", other),
        }
    }

    #[test]
    fn test_composite_drops_absent_children() {
        let condition = Condition::and([
            Condition::field("salary").greater_than(20),
            Condition::field("firstName").equal(None::<String>),
            Condition::field("lastName").is_not_null(),
        ]);

        match condition {
            Condition::Composite(CompositeCondition {
                junction,
                conditions,
            }) => {
                assert_eq!(junction, Junction::And);
                assert_eq!(conditions.len(), 2);
            }
            other => panic!("Expected Composite, got {:?}", other),
        }

        let empty = Condition::or(Vec::<Option<Condition>>::new());
        assert_eq!(
            empty,
            Condition::Composite(CompositeCondition {
                junction: Junction::Or,
                conditions: vec![],
            })
        );
    }

    #[test]
    fn test_entity_operand() {
        let manager = Entity::new("Employee", 7i64);
        let condition = Condition::field("manager").equal(&manager).unwrap();

        match condition {
            Condition::Compare {
                operand: Operand::Entity(r),
                op,
                ..
            } => {
                assert_eq!(op, CompareOp::Eq);
                assert_eq!(r.entity_type, "Employee");
                assert_eq!(r.id, Value::Int64(7));
            }
            other => panic!("Expected entity comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_field_comparison() {
        let condition = Condition::field("start").less_than_field("birthday").unwrap();
        assert_eq!(
            condition,
            Condition::FieldCompare {
                field: "start".into(),
                op: CompareOp::Lt,
                other: "birthday".into(),
            }
        );
        assert!(Condition::field("start").less_than_field(" ").is_none());

        let eq = Condition::field("lastName").equal_field("firstName").unwrap();
        assert!(matches!(eq, Condition::FieldCompare { op: CompareOp::Eq, .. }));
        let gt = Condition::field("salary").greater_than_field("bonus").unwrap();
        assert!(matches!(gt, Condition::FieldCompare { op: CompareOp::Gt, .. }));
    }
}
