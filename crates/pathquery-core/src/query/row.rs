//! Result rows returned by a backend.

use pathquery_proto::{Entity, Value};

/// Alias of the root entity column in tuple results.
pub const ROOT_ALIAS: &str = "_root";

/// One cell of a tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Value(Value),
    Entity(Entity),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Datum::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Datum::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// A row of named columns in selection order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tuple {
    pub columns: Vec<(String, Datum)>,
}

impl Tuple {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn push(&mut self, alias: impl Into<String>, datum: Datum) {
        self.columns.push((alias.into(), datum));
    }

    /// Look up a column by alias.
    pub fn get(&self, alias: &str) -> Option<&Datum> {
        self.columns
            .iter()
            .find(|(name, _)| name == alias)
            .map(|(_, d)| d)
    }
}

/// Output of one executed query.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSet {
    /// Whole root entities.
    Entities(Vec<Entity>),
    /// Named-column rows.
    Tuples(Vec<Tuple>),
    /// A distinct count.
    Count(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_lookup() {
        let mut tuple = Tuple::new();
        tuple.push(ROOT_ALIAS, Datum::Entity(Entity::new("Employee", 1i64)));
        tuple.push("firstName_p_", Datum::Value(Value::from("Nam")));
        tuple.push("manager_p_", Datum::Null);

        assert!(tuple.get(ROOT_ALIAS).and_then(Datum::as_entity).is_some());
        assert_eq!(
            tuple.get("firstName_p_").and_then(Datum::as_value),
            Some(&Value::from("Nam"))
        );
        assert!(tuple.get("manager_p_").unwrap().is_null());
        assert!(tuple.get("salary_p_").is_none());
    }
}
