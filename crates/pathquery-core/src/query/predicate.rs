//! Compilation of path conditions into backend predicates.

use super::coerce::coerce;
use super::context::QueryContext;
use super::criteria::{Expr, Predicate, ROOT_NODE};
use super::eval::escape_like;
use super::resolver::{PathResolver, Resolved};
use crate::catalog::{FieldKind, ScalarType};
use crate::error::Error;
use pathquery_proto::{CompareOp, CompositeCondition, Condition, Junction, Operand, Value};
use std::sync::Arc;

/// Compiles [`Condition`] trees against a query context.
///
/// Paths are resolved through the context, so joins created for a condition
/// are shared with projected columns and sort keys of the same query.
pub struct PredicateBuilder;

impl PredicateBuilder {
    /// Compile a condition into a predicate.
    pub fn compile(ctx: &mut QueryContext<'_>, condition: &Condition) -> Result<Predicate, Error> {
        match condition {
            Condition::Compare { field, op, operand } => Self::compare(ctx, field, *op, operand),
            Condition::Between { field, low, high } => Self::between(ctx, field, low, high),
            Condition::Like { field, value } => {
                let target = PathResolver::resolve(ctx, field)?;
                Ok(Predicate::Like {
                    expr: target.value_expr().lower(),
                    pattern: format!("%{}%", escape_like(&value.to_lowercase())),
                })
            }
            Condition::In {
                field,
                values,
                negated,
            } => {
                let target = PathResolver::resolve(ctx, field)?;
                let field_type = target.value_type();
                let mut literals = Vec::with_capacity(values.len());
                for operand in values {
                    let value = coerce(operand_value(operand), &field_type)?;
                    if !value.is_null() {
                        literals.push(value);
                    }
                }
                let membership = Predicate::In {
                    expr: target.value_expr(),
                    values: literals,
                };
                Ok(if *negated {
                    Predicate::Not(Box::new(membership))
                } else {
                    membership
                })
            }
            Condition::Null { field, negated } => {
                let target = PathResolver::resolve(ctx, field)?;
                let check = Predicate::IsNull(target.expr());
                Ok(if *negated {
                    Predicate::Not(Box::new(check))
                } else {
                    check
                })
            }
            Condition::Contains { field, operand } => Self::contains(ctx, field, operand),
            Condition::FieldCompare { field, op, other } => {
                let lhs = PathResolver::resolve(ctx, field)?.value_expr();
                let rhs = PathResolver::resolve(ctx, other)?.value_expr();
                Ok(Predicate::Compare { lhs, op: *op, rhs })
            }
            Condition::Composite(composite) => Self::composite(ctx, composite),
        }
    }

    fn composite(
        ctx: &mut QueryContext<'_>,
        composite: &CompositeCondition,
    ) -> Result<Predicate, Error> {
        let parts = composite
            .conditions
            .iter()
            .map(|c| Self::compile(ctx, c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match composite.junction {
            Junction::And => Predicate::And(parts),
            Junction::Or => Predicate::Or(parts),
        })
    }

    fn compare(
        ctx: &mut QueryContext<'_>,
        field: &str,
        op: CompareOp,
        operand: &Operand,
    ) -> Result<Predicate, Error> {
        let target = PathResolver::resolve(ctx, field)?;
        let lhs = target.value_expr();
        let value = coerce(operand_value(operand), &target.value_type())?;

        if value.is_null() {
            let check = Predicate::IsNull(lhs);
            return Ok(match op {
                CompareOp::Eq => check,
                CompareOp::Ne => Predicate::Not(Box::new(check)),
                // Ordering against null matches nothing.
                _ => Predicate::Or(Vec::new()),
            });
        }

        if matches!(op, CompareOp::Eq | CompareOp::Ne) && is_text(&target) {
            if let Value::String(s) = &value {
                return Ok(Predicate::Compare {
                    lhs: lhs.lower(),
                    op,
                    rhs: Expr::Literal(Value::String(s.to_lowercase())),
                });
            }
        }

        Ok(Predicate::Compare {
            lhs,
            op,
            rhs: Expr::Literal(value),
        })
    }

    fn between(
        ctx: &mut QueryContext<'_>,
        field: &str,
        low: &Operand,
        high: &Operand,
    ) -> Result<Predicate, Error> {
        let target = PathResolver::resolve(ctx, field)?;
        let field_type = target.value_type();
        let low = coerce(operand_value(low), &field_type)?;
        let high = coerce(operand_value(high), &field_type)?;
        let expr = target.value_expr();

        Ok(match (low.is_null(), high.is_null()) {
            (true, true) => Predicate::And(Vec::new()),
            (true, false) => Predicate::Compare {
                lhs: expr,
                op: CompareOp::Le,
                rhs: Expr::Literal(high),
            },
            (false, true) => Predicate::Compare {
                lhs: expr,
                op: CompareOp::Ge,
                rhs: Expr::Literal(low),
            },
            (false, false) => Predicate::Between {
                expr,
                low: Expr::Literal(low),
                high: Expr::Literal(high),
            },
        })
    }

    /// Membership in a to-many relation (by identity) or an array column.
    fn contains(
        ctx: &mut QueryContext<'_>,
        field: &str,
        operand: &Operand,
    ) -> Result<Predicate, Error> {
        let (parent_path, last) = match field.rsplit_once('.') {
            Some((parent, last)) => (Some(parent), last.trim()),
            None => (None, field.trim()),
        };
        let parent = match parent_path {
            Some(path) => PathResolver::resolve(ctx, path)?,
            None => Resolved::Entity {
                node: ROOT_NODE,
                descriptor: Arc::clone(ctx.root()),
            },
        };

        // Relations are tested through their identity set, without a join.
        if let Resolved::Entity { node, descriptor } = &parent {
            if let Some(FieldKind::Relation(relation)) = descriptor.field(last).map(|f| &f.kind) {
                if !relation.shape.is_to_many() {
                    return Err(Error::path(field, last, "not a to-many relation"));
                }
                let target = ctx.catalog().descriptor(&relation.target)?;
                let id = coerce(operand_value(operand), target.identity_type())?;
                return Ok(Predicate::Member {
                    value: Expr::Literal(id),
                    collection: Expr::RelatedIds {
                        node: *node,
                        relation: last.to_string(),
                    },
                });
            }
        }

        match PathResolver::resolve(ctx, field)? {
            Resolved::Attribute {
                node,
                field: name,
                keys,
                field_type,
            } if field_type.is_array() || !keys.is_empty() => {
                let value = if keys.is_empty() {
                    coerce(operand_value(operand), &field_type)?
                } else {
                    operand_value(operand).clone()
                };
                Ok(Predicate::Member {
                    value: Expr::Literal(value),
                    collection: Expr::Attribute {
                        node,
                        field: name,
                        path: keys,
                    },
                })
            }
            _ => Err(Error::path(field, last, "not an array field or to-many relation")),
        }
    }
}

/// The literal an operand stands for; entities compare by identity.
fn operand_value(operand: &Operand) -> &Value {
    match operand {
        Operand::Value(v) => v,
        Operand::Entity(entity) => &entity.id,
    }
}

/// String columns and document text compare case-insensitively.
fn is_text(target: &Resolved) -> bool {
    match target {
        Resolved::Document { .. } => true,
        Resolved::Attribute {
            keys, field_type, ..
        } => keys.is_empty() && field_type.scalar_type() == Some(&ScalarType::String),
        Resolved::Entity { .. } => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support;
    use pathquery_proto::{EntityRef, JoinKind};

    fn compile(condition: Option<Condition>) -> Result<(Predicate, usize), Error> {
        let (_db, catalog) = test_support::catalog();
        let mut ctx = QueryContext::new(&catalog, "Employee", JoinKind::Left)?;
        let predicate = PredicateBuilder::compile(&mut ctx, &condition.unwrap())?;
        Ok((predicate, ctx.query.joins.len()))
    }

    fn salary() -> Expr {
        Expr::attribute(ROOT_NODE, "salary")
    }

    #[test]
    fn test_compare_coerces_literal() {
        let (predicate, _) =
            compile(Condition::field("salary").greater_than_or_equal("26")).unwrap();
        assert_eq!(
            predicate,
            Predicate::Compare {
                lhs: salary(),
                op: CompareOp::Ge,
                rhs: Expr::Literal(Value::Int32(26)),
            }
        );
    }

    #[test]
    fn test_string_equality_is_case_insensitive() {
        let (predicate, _) = compile(Condition::field("firstName").equal("HANG")).unwrap();
        assert_eq!(
            predicate,
            Predicate::Compare {
                lhs: Expr::attribute(ROOT_NODE, "firstName").lower(),
                op: CompareOp::Eq,
                rhs: Expr::Literal(Value::from("hang")),
            }
        );
    }

    #[test]
    fn test_between_bounds() {
        let (both, _) = compile(Condition::field("salary").between(20, 26)).unwrap();
        assert_eq!(
            both,
            Predicate::Between {
                expr: salary(),
                low: Expr::Literal(Value::Int32(20)),
                high: Expr::Literal(Value::Int32(26)),
            }
        );

        let (upper, _) = compile(Condition::field("salary").between(Value::Null, 26)).unwrap();
        assert_eq!(
            upper,
            Predicate::Compare {
                lhs: salary(),
                op: CompareOp::Le,
                rhs: Expr::Literal(Value::Int32(26)),
            }
        );
    }

    #[test]
    fn test_like_escapes_wildcards() {
        let (predicate, _) = compile(Condition::field("lastName").like("Ng_%")).unwrap();
        assert_eq!(
            predicate,
            Predicate::Like {
                expr: Expr::attribute(ROOT_NODE, "lastName").lower(),
                pattern: "%ng\\_\\%%".into(),
            }
        );
    }

    #[test]
    fn test_entity_operand_compares_identity() {
        let (predicate, joins) =
            compile(Condition::field("manager").equal(EntityRef::new("Employee", 1i64))).unwrap();
        assert_eq!(joins, 1);
        assert_eq!(
            predicate,
            Predicate::Compare {
                lhs: Expr::attribute(1, "id"),
                op: CompareOp::Eq,
                rhs: Expr::Literal(Value::Int64(1)),
            }
        );
    }

    #[test]
    fn test_null_checks() {
        let (predicate, _) = compile(Condition::field("manager").is_null()).unwrap();
        assert_eq!(predicate, Predicate::IsNull(Expr::Entity(1)));

        let (predicate, _) = compile(Condition::field("birthday").is_not_null()).unwrap();
        assert_eq!(
            predicate,
            Predicate::Not(Box::new(Predicate::IsNull(Expr::attribute(
                ROOT_NODE, "birthday"
            ))))
        );
    }

    #[test]
    fn test_in_and_not_in() {
        let (predicate, _) = compile(Condition::field("salary").not_in(["20", "", "32"])).unwrap();
        assert_eq!(
            predicate,
            Predicate::Not(Box::new(Predicate::In {
                expr: salary(),
                values: vec![Value::Int32(20), Value::Int32(32)],
            }))
        );
    }

    #[test]
    fn test_contains_relation_uses_identity_set() {
        let (predicate, joins) = compile(Condition::field("projects").contains("2")).unwrap();
        assert_eq!(joins, 0);
        assert_eq!(
            predicate,
            Predicate::Member {
                value: Expr::Literal(Value::Int64(2)),
                collection: Expr::RelatedIds {
                    node: ROOT_NODE,
                    relation: "projects".into(),
                },
            }
        );
    }

    #[test]
    fn test_contains_array_and_errors() {
        let (predicate, _) = compile(Condition::field("nicknames").contains("Bo")).unwrap();
        assert_eq!(
            predicate,
            Predicate::Member {
                value: Expr::Literal(Value::from("Bo")),
                collection: Expr::attribute(ROOT_NODE, "nicknames"),
            }
        );

        assert!(matches!(
            compile(Condition::field("firstName").contains("a")),
            Err(Error::PathResolution { .. })
        ));
        assert!(matches!(
            compile(Condition::field("manager").contains(1)),
            Err(Error::PathResolution { .. })
        ));
    }

    #[test]
    fn test_composite_and_field_compare() {
        let (predicate, _) = compile(Some(Condition::or([
            Condition::field("salary").less_than_field("bonus"),
            Condition::field("status").equal("Retired"),
        ])))
        .unwrap();
        assert_eq!(
            predicate,
            Predicate::Or(vec![
                Predicate::Compare {
                    lhs: salary(),
                    op: CompareOp::Lt,
                    rhs: Expr::attribute(ROOT_NODE, "bonus"),
                },
                Predicate::Compare {
                    lhs: Expr::attribute(ROOT_NODE, "status"),
                    op: CompareOp::Eq,
                    rhs: Expr::Literal(Value::from("Retired")),
                },
            ])
        );
    }

    #[test]
    fn test_coercion_failure() {
        assert!(matches!(
            compile(Condition::field("salary").equal("lots")),
            Err(Error::TypeCoercion { .. })
        ));
        assert!(matches!(
            compile(Condition::field("status").equal("Sleeping")),
            Err(Error::TypeCoercion { .. })
        ));
    }
}
