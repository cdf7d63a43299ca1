//! Compilation of sort keys, including arithmetic keys such as
//! `salary + bonus`.

use super::context::QueryContext;
use super::criteria::{ArithmeticOp, Expr, OrderExpr};
use super::resolver::{PathResolver, ARROW};
use crate::error::Error;
use pathquery_proto::Sort;

/// Compiles [`Sort`] keys into ORDER BY expressions.
pub struct SortCompiler;

impl SortCompiler {
    /// Compile sort keys in caller order.
    ///
    /// Keys that resolve to the same expression are coalesced: the first
    /// position is kept and the later direction wins.
    pub fn compile(ctx: &mut QueryContext<'_>, sorts: &[Sort]) -> Result<Vec<OrderExpr>, Error> {
        let mut order: Vec<OrderExpr> = Vec::with_capacity(sorts.len());
        for sort in sorts {
            let expr = Self::expression(ctx, &sort.field)?;
            match order.iter_mut().find(|o| o.expr == expr) {
                Some(existing) => existing.direction = sort.direction,
                None => order.push(OrderExpr {
                    expr,
                    direction: sort.direction,
                }),
            }
        }
        Ok(order)
    }

    /// Compile one key, folding operators left to right.
    pub fn expression(ctx: &mut QueryContext<'_>, key: &str) -> Result<Expr, Error> {
        let (first, rest) = tokenize(key)?;
        let mut expr = PathResolver::resolve(ctx, first)?.value_expr();
        for (op, operand) in rest {
            let rhs = PathResolver::resolve(ctx, operand)?.value_expr();
            expr = Expr::Arithmetic {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }
}

type Tokens<'k> = (&'k str, Vec<(ArithmeticOp, &'k str)>);

/// Split a key into its first operand and `(operator, operand)` pairs.
///
/// A `-` that starts a `->` document pointer is part of the operand.
fn tokenize(key: &str) -> Result<Tokens<'_>, Error> {
    let mut operands = Vec::new();
    let mut ops = Vec::new();
    let mut start = 0;
    for (i, c) in key.char_indices() {
        let op = match c {
            '+' => ArithmeticOp::Add,
            '*' => ArithmeticOp::Multiply,
            '-' if !key[i + 1..].starts_with(&ARROW[1..]) => ArithmeticOp::Subtract,
            _ => continue,
        };
        operands.push(&key[start..i]);
        ops.push(op);
        start = i + 1;
    }
    operands.push(&key[start..]);

    let operands: Vec<&str> = operands.into_iter().map(str::trim).collect();
    if let Some(position) = operands.iter().position(|o| o.is_empty()) {
        return Err(Error::path(
            key,
            "",
            format!("missing operand {} in sort key", position + 1),
        ));
    }

    let mut operands = operands.into_iter();
    let first = operands.next().unwrap_or_default();
    Ok((first, ops.into_iter().zip(operands).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::criteria::ROOT_NODE;
    use crate::query::test_support;
    use pathquery_proto::{JoinKind, SortDirection};

    #[test]
    fn test_tokenize() {
        let (first, rest) = tokenize(" salary+bonus *  2x").unwrap();
        assert_eq!(first, "salary");
        assert_eq!(
            rest,
            vec![(ArithmeticOp::Add, "bonus"), (ArithmeticOp::Multiply, "2x")]
        );

        let (first, rest) = tokenize("metadata->rank - salary").unwrap();
        assert_eq!(first, "metadata->rank");
        assert_eq!(rest, vec![(ArithmeticOp::Subtract, "salary")]);

        assert!(tokenize("salary +").is_err());
        assert!(tokenize("").is_err());
    }

    #[test]
    fn test_arithmetic_folds_left() {
        let (_db, catalog) = test_support::catalog();
        let mut ctx = QueryContext::new(&catalog, "Employee", JoinKind::Left).unwrap();
        let expr = SortCompiler::expression(&mut ctx, "salary - bonus * salary").unwrap();

        let salary = Expr::attribute(ROOT_NODE, "salary");
        let bonus = Expr::attribute(ROOT_NODE, "bonus");
        assert_eq!(
            expr,
            Expr::Arithmetic {
                op: ArithmeticOp::Multiply,
                lhs: Box::new(Expr::Arithmetic {
                    op: ArithmeticOp::Subtract,
                    lhs: Box::new(salary.clone()),
                    rhs: Box::new(bonus),
                }),
                rhs: Box::new(salary),
            }
        );
    }

    #[test]
    fn test_duplicate_keys_coalesce() {
        let (_db, catalog) = test_support::catalog();
        let mut ctx = QueryContext::new(&catalog, "Employee", JoinKind::Left).unwrap();
        let sorts = vec![
            Sort::desc("salary"),
            Sort::asc("manager.firstName"),
            Sort::asc(" salary "),
        ];
        let order = SortCompiler::compile(&mut ctx, &sorts).unwrap();

        assert_eq!(order.len(), 2);
        assert_eq!(order[0].expr, Expr::attribute(ROOT_NODE, "salary"));
        assert_eq!(order[0].direction, SortDirection::Asc);
        assert_eq!(order[1].expr, Expr::attribute(1, "firstName"));
    }

    #[test]
    fn test_relation_key_sorts_by_identity() {
        let (_db, catalog) = test_support::catalog();
        let mut ctx = QueryContext::new(&catalog, "Employee", JoinKind::Left).unwrap();
        let order = SortCompiler::compile(&mut ctx, &[Sort::asc("manager")]).unwrap();
        assert_eq!(order[0].expr, Expr::attribute(1, "id"));
    }
}
