//! Select query IR handed to a [`QueryBackend`](super::QueryBackend).
//!
//! The compiler produces one [`SelectQuery`] per phase: a root plus a join
//! tree, a selection, a filter, an ordering and a row window. Node 0 is
//! always the root entity; every [`JoinNode`] hangs off an earlier node.

use pathquery_proto::{CompareOp, JoinKind, SortDirection, Value};

/// Index of a node in the join tree. The root is [`ROOT_NODE`].
pub type NodeId = usize;

/// Node id of the query root.
pub const ROOT_NODE: NodeId = 0;

/// A relation traversal from `parent` to a new node.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinNode {
    /// This node's id.
    pub id: NodeId,
    /// Node the relation is navigated from.
    pub parent: NodeId,
    /// Relation field on the parent entity.
    pub relation: String,
    /// Entity type reached by the join.
    pub entity: String,
    /// Join type.
    pub kind: JoinKind,
}

/// Arithmetic operator for derived sort keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
}

/// A value expression evaluated per joined row.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The entity bound at a node; null when a left join found nothing.
    Entity(NodeId),
    /// A scalar field of a node, optionally descending into a document by
    /// `path` keys.
    Attribute {
        node: NodeId,
        field: String,
        path: Vec<String>,
    },
    /// Text of the document element at `keys`, null if missing.
    DocumentText {
        node: NodeId,
        field: String,
        keys: Vec<String>,
    },
    /// Identities of the entities related to a node through a to-many
    /// relation, without joining them into the row set.
    RelatedIds { node: NodeId, relation: String },
    /// A constant.
    Literal(Value),
    /// Lower-cased text of the inner expression.
    Lower(Box<Expr>),
    /// Binary arithmetic; null if either side is null.
    Arithmetic {
        op: ArithmeticOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// A boolean predicate with SQL three-valued semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        lhs: Expr,
        op: CompareOp,
        rhs: Expr,
    },
    Between {
        expr: Expr,
        low: Expr,
        high: Expr,
    },
    In {
        expr: Expr,
        values: Vec<Value>,
    },
    IsNull(Expr),
    /// LIKE with `%`, `_` wildcards and `\` escapes.
    Like {
        expr: Expr,
        pattern: String,
    },
    /// `value` is an element of the collection `collection` evaluates to.
    Member {
        value: Expr,
        collection: Expr,
    },
    Not(Box<Predicate>),
    /// Conjunction; empty is true.
    And(Vec<Predicate>),
    /// Disjunction; empty is false.
    Or(Vec<Predicate>),
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderExpr {
    pub expr: Expr,
    pub direction: SortDirection,
}

/// A named output column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub expr: Expr,
    pub alias: String,
}

/// What the query returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Whole root entities, one per joined row.
    Root,
    /// Named columns.
    Columns(Vec<Column>),
    /// Number of distinct non-null values of the expression.
    CountDistinct(Expr),
}

/// A complete select statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Root entity type.
    pub root: String,
    /// Joins in creation order.
    pub joins: Vec<JoinNode>,
    pub selection: Selection,
    /// Remove duplicate output rows, keeping the first.
    pub distinct: bool,
    pub filter: Option<Predicate>,
    pub order_by: Vec<OrderExpr>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl SelectQuery {
    /// A query selecting whole root entities.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            joins: Vec::new(),
            selection: Selection::Root,
            distinct: false,
            filter: None,
            order_by: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// Append a join and return its node id.
    pub fn add_join(
        &mut self,
        parent: NodeId,
        relation: impl Into<String>,
        entity: impl Into<String>,
        kind: JoinKind,
    ) -> NodeId {
        let id = self.joins.len() + 1;
        self.joins.push(JoinNode {
            id,
            parent,
            relation: relation.into(),
            entity: entity.into(),
            kind,
        });
        id
    }

    /// Entity type bound at a node.
    pub fn entity_at(&self, node: NodeId) -> Option<&str> {
        if node == ROOT_NODE {
            return Some(&self.root);
        }
        self.joins.get(node - 1).map(|j| j.entity.as_str())
    }

    /// AND a predicate into the filter.
    pub fn and_filter(&mut self, predicate: Predicate) {
        self.filter = Some(match self.filter.take() {
            None => predicate,
            Some(Predicate::And(mut parts)) => {
                parts.push(predicate);
                Predicate::And(parts)
            }
            Some(existing) => Predicate::And(vec![existing, predicate]),
        });
    }
}

impl Expr {
    /// Scalar attribute of a node.
    pub fn attribute(node: NodeId, field: impl Into<String>) -> Self {
        Expr::Attribute {
            node,
            field: field.into(),
            path: Vec::new(),
        }
    }

    pub fn lower(self) -> Self {
        Expr::Lower(Box::new(self))
    }
}
