//! Dotted path resolution against entity descriptors.
//!
//! Each segment of a path is looked up on the entity reached so far:
//! relation segments add a join, scalar segments end in an attribute, and
//! further segments after a JSON attribute descend into the document. A
//! `base->key->key` pointer resolves `base` as a path to a JSON column and
//! extracts the text at the keys.

use super::context::QueryContext;
use super::criteria::{Expr, NodeId, ROOT_NODE};
use crate::catalog::{EntityDescriptor, FieldKind, FieldType, ScalarType};
use crate::error::Error;
use pathquery_proto::JoinKind;
use std::sync::Arc;

/// Document pointer separator.
pub const ARROW: &str = "->";

/// What a path resolved to.
#[derive(Debug, Clone)]
pub enum Resolved {
    /// An entity bound at a join node (or the root).
    Entity {
        node: NodeId,
        descriptor: Arc<EntityDescriptor>,
    },
    /// A scalar field, possibly descended into by document keys.
    Attribute {
        node: NodeId,
        field: String,
        keys: Vec<String>,
        field_type: FieldType,
    },
    /// Text extracted from a document column.
    Document {
        node: NodeId,
        field: String,
        keys: Vec<String>,
    },
}

impl Resolved {
    /// Expression selecting this path.
    pub fn expr(&self) -> Expr {
        match self {
            Resolved::Entity { node, .. } => Expr::Entity(*node),
            Resolved::Attribute {
                node, field, keys, ..
            } => Expr::Attribute {
                node: *node,
                field: field.clone(),
                path: keys.clone(),
            },
            Resolved::Document { node, field, keys } => Expr::DocumentText {
                node: *node,
                field: field.clone(),
                keys: keys.clone(),
            },
        }
    }

    /// Expression for the value compared in predicates and sorts: the
    /// identity for entities, the path itself otherwise.
    pub fn value_expr(&self) -> Expr {
        match self {
            Resolved::Entity { node, descriptor } => {
                Expr::attribute(*node, descriptor.identity.clone())
            }
            other => other.expr(),
        }
    }

    /// Declared type of [`value_expr`](Self::value_expr).
    pub fn value_type(&self) -> FieldType {
        match self {
            Resolved::Entity { descriptor, .. } => descriptor.identity_type().clone(),
            Resolved::Attribute {
                field_type, keys, ..
            } if keys.is_empty() => field_type.clone(),
            // Values inside a document are untyped.
            Resolved::Attribute { .. } => FieldType::OptionalScalar(ScalarType::Json),
            Resolved::Document { .. } => FieldType::OptionalScalar(ScalarType::String),
        }
    }
}

/// Resolves dotted paths into joins and expressions.
pub struct PathResolver;

impl PathResolver {
    /// Resolve a path using the context's join type.
    pub fn resolve(ctx: &mut QueryContext<'_>, path: &str) -> Result<Resolved, Error> {
        let kind = ctx.join_kind();
        Self::resolve_with(ctx, path, kind)
    }

    /// Resolve a path, creating joins of `kind` for new relation segments.
    pub fn resolve_with(
        ctx: &mut QueryContext<'_>,
        path: &str,
        kind: JoinKind,
    ) -> Result<Resolved, Error> {
        match path.split_once(ARROW) {
            Some((base, rest)) => Self::resolve_document(ctx, path, base, rest, kind),
            None => Self::navigate(ctx, path, kind),
        }
    }

    fn resolve_document(
        ctx: &mut QueryContext<'_>,
        path: &str,
        base: &str,
        rest: &str,
        kind: JoinKind,
    ) -> Result<Resolved, Error> {
        let pointer: Vec<String> = rest.split(ARROW).map(|k| k.trim().to_string()).collect();
        if let Some(blank) = pointer.iter().find(|k| k.is_empty()) {
            return Err(Error::path(path, blank.as_str(), "empty document key"));
        }

        match Self::navigate(ctx, base, kind)? {
            Resolved::Attribute {
                node,
                field,
                mut keys,
                field_type,
            } if field_type.is_json() => {
                keys.extend(pointer);
                Ok(Resolved::Document { node, field, keys })
            }
            _ => Err(Error::path(path, base.trim(), "not a document column")),
        }
    }

    fn navigate(ctx: &mut QueryContext<'_>, path: &str, kind: JoinKind) -> Result<Resolved, Error> {
        let segments: Vec<&str> = path
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        // Resume from the longest prefix resolved earlier in this query.
        let mut start = 0;
        let mut current = Resolved::Entity {
            node: ROOT_NODE,
            descriptor: Arc::clone(ctx.root()),
        };
        for end in (1..=segments.len()).rev() {
            if let Some(hit) = ctx.cached(&segments[..end].join(".")) {
                current = hit.clone();
                start = end;
                break;
            }
        }

        for end in start + 1..=segments.len() {
            let segment = segments[end - 1];
            current = Self::step(ctx, path, segment, current, kind)?;
            ctx.remember(segments[..end].join("."), current.clone());
        }

        Ok(current)
    }

    fn step(
        ctx: &mut QueryContext<'_>,
        path: &str,
        segment: &str,
        current: Resolved,
        kind: JoinKind,
    ) -> Result<Resolved, Error> {
        match current {
            Resolved::Entity { node, descriptor } => {
                let field = descriptor.field(segment).ok_or_else(|| {
                    Error::path(
                        path,
                        segment,
                        format!("entity '{}' has no such field", descriptor.name),
                    )
                })?;
                match &field.kind {
                    FieldKind::Relation(relation) => {
                        let target = ctx.catalog().descriptor(&relation.target)?;
                        let joined =
                            ctx.query
                                .add_join(node, segment, relation.target.clone(), kind);
                        Ok(Resolved::Entity {
                            node: joined,
                            descriptor: target,
                        })
                    }
                    FieldKind::Scalar(field_type) => Ok(Resolved::Attribute {
                        node,
                        field: segment.to_string(),
                        keys: Vec::new(),
                        field_type: field_type.clone(),
                    }),
                }
            }
            Resolved::Attribute {
                node,
                field,
                mut keys,
                field_type,
            } if field_type.is_json() => {
                keys.push(segment.to_string());
                Ok(Resolved::Attribute {
                    node,
                    field,
                    keys,
                    field_type,
                })
            }
            Resolved::Attribute { field, .. } => Err(Error::path(
                path,
                segment,
                format!("'{}' is a scalar field", field),
            )),
            Resolved::Document { .. } => {
                Err(Error::path(path, segment, "cannot navigate past a document pointer"))
            }
        }
    }
}
