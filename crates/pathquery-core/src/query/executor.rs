//! Query executor for running compiled select queries against storage.
//!
//! Rows are joined in memory: each relation join is a hash lookup on the
//! target's join field (through the edge entity for many-to-many), a left
//! join keeps a row with nothing bound, an inner join drops it. Filters use
//! SQL three-valued logic, ordering puts nulls first, and DISTINCT keeps the
//! first occurrence of each output row.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use crate::catalog::{Catalog, FetchMode, RelationDef};
use crate::error::Error;
use crate::storage::StorageEngine;

use super::backend::QueryBackend;
use super::criteria::{ArithmeticOp, Expr, NodeId, Predicate, SelectQuery, Selection};
use super::eval::{compare_values, like_match, sort_order, values_equal};
use super::row::{Datum, ResultSet, Tuple};

use pathquery_proto::{
    CompareOp, Entity, FieldSlot, JoinKind, Key, Relation, RelationValue, SortDirection, Value,
};
use tracing::trace;

/// Query executor that runs queries against storage.
pub struct QueryExecutor<'a> {
    storage: &'a StorageEngine,
    catalog: &'a Catalog,
}

impl<'a> QueryExecutor<'a> {
    /// Create a new executor with storage and catalog references.
    pub fn new(storage: &'a StorageEngine, catalog: &'a Catalog) -> Self {
        Self { storage, catalog }
    }
}

impl QueryBackend for QueryExecutor<'_> {
    fn catalog(&self) -> &Catalog {
        self.catalog
    }

    fn execute(&self, query: &SelectQuery) -> Result<ResultSet, Error> {
        Scope::new(self.storage, self.catalog).run(query)
    }
}

/// A stored row with its identity.
#[derive(Debug)]
struct StoredRow {
    entity_type: String,
    id: Value,
    fields: BTreeMap<String, Value>,
}

/// One joined row: the row bound at each node, `None` after a left join
/// found nothing.
type Binding = Vec<Option<Rc<StoredRow>>>;

type Index = HashMap<Key, Vec<Rc<StoredRow>>>;

/// All rows of one entity type with lazily built field indexes.
struct Table {
    rows: Vec<Rc<StoredRow>>,
    indexes: RefCell<HashMap<String, Rc<Index>>>,
}

impl Table {
    fn index(&self, field: &str) -> Rc<Index> {
        if let Some(index) = self.indexes.borrow().get(field) {
            return Rc::clone(index);
        }

        let mut index = Index::new();
        for row in &self.rows {
            if let Some(key) = row.fields.get(field).and_then(Value::key) {
                index.entry(key).or_default().push(Rc::clone(row));
            }
        }
        let index = Rc::new(index);
        self.indexes
            .borrow_mut()
            .insert(field.to_string(), Rc::clone(&index));
        index
    }
}

/// A projected cell before entity hydration.
enum Cell {
    Null,
    Value(Value),
    Row(Rc<StoredRow>),
}

/// Hashable form of a cell for DISTINCT.
#[derive(PartialEq, Eq, Hash)]
enum CellKey {
    Null,
    Value(Key),
    Row(String, Key),
}

impl Cell {
    fn key(&self) -> CellKey {
        match self {
            Cell::Null => CellKey::Null,
            Cell::Value(v) => v.key().map(CellKey::Value).unwrap_or(CellKey::Null),
            Cell::Row(row) => match row.id.key() {
                Some(key) => CellKey::Row(row.entity_type.clone(), key),
                None => CellKey::Null,
            },
        }
    }
}

/// Per-query state: loaded tables, shared by every join and evaluation.
struct Scope<'a> {
    storage: &'a StorageEngine,
    catalog: &'a Catalog,
    tables: RefCell<HashMap<String, Rc<Table>>>,
}

impl<'a> Scope<'a> {
    fn new(storage: &'a StorageEngine, catalog: &'a Catalog) -> Self {
        Self {
            storage,
            catalog,
            tables: RefCell::new(HashMap::new()),
        }
    }

    fn run(&self, query: &SelectQuery) -> Result<ResultSet, Error> {
        let mut bindings = self.join(query)?;

        if let Some(filter) = &query.filter {
            let mut kept = Vec::with_capacity(bindings.len());
            for binding in bindings {
                if self.test(filter, &binding)? == Some(true) {
                    kept.push(binding);
                }
            }
            bindings = kept;
        }

        if !query.order_by.is_empty() {
            bindings = self.order(query, bindings)?;
        }

        trace!(root = %query.root, rows = bindings.len(), "evaluated select");

        match &query.selection {
            Selection::CountDistinct(expr) => {
                let mut seen = HashSet::new();
                for binding in &bindings {
                    if let Some(key) = self.eval(expr, binding)?.key() {
                        seen.insert(key);
                    }
                }
                Ok(ResultSet::Count(seen.len() as u64))
            }
            Selection::Root => {
                let rows: Vec<Vec<Cell>> = bindings
                    .iter()
                    .filter_map(|b| bound(b, 0))
                    .map(|row| vec![Cell::Row(row)])
                    .collect();
                let rows = window(query, distinct(query.distinct, rows));
                let mut entities = Vec::with_capacity(rows.len());
                for mut row in rows {
                    if let Some(Cell::Row(stored)) = row.pop() {
                        entities.push(self.hydrate(&stored, true)?);
                    }
                }
                Ok(ResultSet::Entities(entities))
            }
            Selection::Columns(columns) => {
                let mut rows = Vec::with_capacity(bindings.len());
                for binding in &bindings {
                    let cells = columns
                        .iter()
                        .map(|c| self.cell(&c.expr, binding))
                        .collect::<Result<Vec<_>, _>>()?;
                    rows.push(cells);
                }
                let rows = window(query, distinct(query.distinct, rows));

                let mut tuples = Vec::with_capacity(rows.len());
                for cells in rows {
                    let mut tuple = Tuple::new();
                    for (column, cell) in columns.iter().zip(cells) {
                        let datum = match cell {
                            Cell::Null => Datum::Null,
                            Cell::Value(v) if v.is_null() => Datum::Null,
                            Cell::Value(v) => Datum::Value(v),
                            Cell::Row(row) => Datum::Entity(self.hydrate(&row, true)?),
                        };
                        tuple.push(column.alias.clone(), datum);
                    }
                    tuples.push(tuple);
                }
                Ok(ResultSet::Tuples(tuples))
            }
        }
    }

    /// Expand the root rows through every join in creation order.
    fn join(&self, query: &SelectQuery) -> Result<Vec<Binding>, Error> {
        let root = self.table(&query.root)?;
        let mut bindings: Vec<Binding> = root
            .rows
            .iter()
            .map(|row| vec![Some(Rc::clone(row))])
            .collect();

        for join in &query.joins {
            let parent = query.entity_at(join.parent).ok_or_else(|| {
                Error::Execution(format!("join '{}' has no parent node", join.relation))
            })?;
            let relation = self.relation(parent, &join.relation)?;

            let mut next = Vec::with_capacity(bindings.len());
            for binding in bindings {
                let related = match bound(&binding, join.parent) {
                    Some(row) => self.related(&row, &relation)?,
                    None => Vec::new(),
                };
                if related.is_empty() {
                    if join.kind == JoinKind::Left {
                        let mut binding = binding;
                        binding.push(None);
                        next.push(binding);
                    }
                    continue;
                }
                for row in related {
                    let mut expanded = binding.clone();
                    expanded.push(Some(row));
                    next.push(expanded);
                }
            }
            bindings = next;
        }

        Ok(bindings)
    }

    /// Stable sort by the ORDER BY keys.
    fn order(&self, query: &SelectQuery, bindings: Vec<Binding>) -> Result<Vec<Binding>, Error> {
        let mut keyed = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let keys = query
                .order_by
                .iter()
                .map(|o| self.eval(&o.expr, &binding))
                .collect::<Result<Vec<_>, _>>()?;
            keyed.push((keys, binding));
        }

        keyed.sort_by(|(a, _), (b, _)| {
            for ((x, y), order) in a.iter().zip(b).zip(&query.order_by) {
                let cmp = match order.direction {
                    SortDirection::Asc => sort_order(x, y),
                    SortDirection::Desc => sort_order(x, y).reverse(),
                };
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });

        Ok(keyed.into_iter().map(|(_, binding)| binding).collect())
    }

    fn table(&self, entity_type: &str) -> Result<Rc<Table>, Error> {
        if let Some(table) = self.tables.borrow().get(entity_type) {
            return Ok(Rc::clone(table));
        }

        let descriptor = self.catalog.descriptor(entity_type)?;
        let mut rows = Vec::new();
        for fields in self.storage.scan(entity_type)? {
            let fields = fields?;
            let id = fields
                .get(&descriptor.identity)
                .cloned()
                .unwrap_or(Value::Null);
            rows.push(Rc::new(StoredRow {
                entity_type: entity_type.to_string(),
                id,
                fields,
            }));
        }

        let table = Rc::new(Table {
            rows,
            indexes: RefCell::new(HashMap::new()),
        });
        self.tables
            .borrow_mut()
            .insert(entity_type.to_string(), Rc::clone(&table));
        Ok(table)
    }

    fn relation(&self, entity_type: &str, name: &str) -> Result<RelationDef, Error> {
        let descriptor = self.catalog.descriptor(entity_type)?;
        descriptor
            .field(name)
            .and_then(|f| f.relation())
            .map(|r| r.def.clone())
            .ok_or_else(|| {
                Error::Execution(format!("'{}' is not a relation of '{}'", name, entity_type))
            })
    }

    /// Rows related to `row` through `relation`, in target insertion order.
    fn related(&self, row: &StoredRow, relation: &RelationDef) -> Result<Vec<Rc<StoredRow>>, Error> {
        let key = match row.fields.get(&relation.from_field).and_then(Value::key) {
            Some(key) => key,
            None => return Ok(Vec::new()),
        };
        let targets = self.table(&relation.to_entity)?.index(&relation.to_field);

        match &relation.edge {
            None => Ok(targets.get(&key).cloned().unwrap_or_default()),
            Some(edge) => {
                let links = self.table(&edge.entity)?.index(&edge.source_field);
                let mut related = Vec::new();
                for link in links.get(&key).into_iter().flatten() {
                    let target_key = link.fields.get(&edge.target_field).and_then(Value::key);
                    if let Some(found) = target_key.and_then(|k| targets.get(&k)) {
                        related.extend(found.iter().cloned());
                    }
                }
                Ok(related)
            }
        }
    }

    fn cell(&self, expr: &Expr, binding: &Binding) -> Result<Cell, Error> {
        match expr {
            Expr::Entity(node) => Ok(bound(binding, *node).map(Cell::Row).unwrap_or(Cell::Null)),
            other => Ok(Cell::Value(self.eval(other, binding)?)),
        }
    }

    fn eval(&self, expr: &Expr, binding: &Binding) -> Result<Value, Error> {
        match expr {
            Expr::Entity(node) => Ok(bound(binding, *node)
                .map(|row| row.id.clone())
                .unwrap_or(Value::Null)),
            Expr::Attribute { node, field, path } => {
                let Some(row) = bound(binding, *node) else {
                    return Ok(Value::Null);
                };
                let value = row.fields.get(field).cloned().unwrap_or(Value::Null);
                if path.is_empty() {
                    return Ok(value);
                }
                Ok(descend(&value, path)
                    .map(|doc| Value::from_json(&doc))
                    .unwrap_or(Value::Null))
            }
            Expr::DocumentText { node, field, keys } => {
                let text = bound(binding, *node)
                    .and_then(|row| row.fields.get(field).and_then(|v| descend(v, keys)))
                    .and_then(|element| match element {
                        serde_json::Value::Null => None,
                        serde_json::Value::String(s) => Some(s),
                        other => Some(other.to_string()),
                    });
                Ok(text.map(Value::String).unwrap_or(Value::Null))
            }
            Expr::RelatedIds { node, relation } => {
                let Some(row) = bound(binding, *node) else {
                    return Ok(Value::Null);
                };
                let relation = self.relation(&row.entity_type, relation)?;
                let ids = self
                    .related(&row, &relation)?
                    .iter()
                    .map(|r| r.id.clone())
                    .collect();
                Ok(Value::Array(ids))
            }
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Lower(inner) => Ok(match self.eval(inner, binding)? {
                Value::String(s) => Value::String(s.to_lowercase()),
                other => other,
            }),
            Expr::Arithmetic { op, lhs, rhs } => {
                arithmetic(*op, &self.eval(lhs, binding)?, &self.eval(rhs, binding)?)
            }
        }
    }

    /// Evaluate a predicate; `None` is SQL unknown.
    fn test(&self, predicate: &Predicate, binding: &Binding) -> Result<Option<bool>, Error> {
        match predicate {
            Predicate::Compare { lhs, op, rhs } => {
                let lhs = self.eval(lhs, binding)?;
                let rhs = self.eval(rhs, binding)?;
                if lhs.is_null() || rhs.is_null() {
                    return Ok(None);
                }
                Ok(Some(compare(&lhs, *op, &rhs)))
            }
            Predicate::Between { expr, low, high } => {
                let value = self.eval(expr, binding)?;
                let low = self.eval(low, binding)?;
                let high = self.eval(high, binding)?;
                if value.is_null() || low.is_null() || high.is_null() {
                    return Ok(None);
                }
                Ok(Some(
                    compare(&value, CompareOp::Ge, &low) && compare(&value, CompareOp::Le, &high),
                ))
            }
            Predicate::In { expr, values } => {
                let value = self.eval(expr, binding)?;
                if value.is_null() {
                    return Ok(None);
                }
                Ok(Some(values.iter().any(|v| values_equal(&value, v))))
            }
            Predicate::IsNull(expr) => Ok(Some(self.eval(expr, binding)?.is_null())),
            Predicate::Like { expr, pattern } => Ok(self
                .eval(expr, binding)?
                .to_text()
                .map(|text| like_match(&text, pattern))),
            Predicate::Member { value, collection } => {
                let value = self.eval(value, binding)?;
                if value.is_null() {
                    return Ok(None);
                }
                let found = match self.eval(collection, binding)? {
                    Value::Array(items) => items.iter().any(|item| values_equal(&value, item)),
                    Value::Json(serde_json::Value::Array(items)) => items
                        .iter()
                        .any(|item| values_equal(&value, &Value::from_json(item))),
                    _ => false,
                };
                Ok(Some(found))
            }
            Predicate::Not(inner) => Ok(self.test(inner, binding)?.map(|b| !b)),
            Predicate::And(parts) => {
                let mut result = Some(true);
                for part in parts {
                    match self.test(part, binding)? {
                        Some(false) => return Ok(Some(false)),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                Ok(result)
            }
            Predicate::Or(parts) => {
                let mut result = Some(false);
                for part in parts {
                    match self.test(part, binding)? {
                        Some(true) => return Ok(Some(true)),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                Ok(result)
            }
        }
    }

    /// Build an entity from a stored row.
    ///
    /// Every declared scalar is present (missing ones as null). Relations are
    /// unloaded, except eager to-one relations when `eager` is set, which
    /// are loaded one level deep.
    fn hydrate(&self, row: &StoredRow, eager: bool) -> Result<Entity, Error> {
        let descriptor = self.catalog.descriptor(&row.entity_type)?;
        let mut entity = Entity::new(row.entity_type.clone(), row.id.clone());

        for (name, _) in descriptor.scalar_fields() {
            let value = row.fields.get(name).cloned().unwrap_or(Value::Null);
            entity.set_field(name, FieldSlot::Value(value));
        }

        for (name, relation) in descriptor.relation_fields() {
            let slot = if eager && relation.fetch == FetchMode::Eager && !relation.shape.is_to_many()
            {
                let target = match self.related(row, &relation.def)?.first() {
                    Some(target) => Some(Box::new(self.hydrate(target, false)?)),
                    None => None,
                };
                Relation::Loaded(RelationValue::One(target))
            } else {
                Relation::Unloaded
            };
            entity.set_field(name, FieldSlot::Relation(slot));
        }

        Ok(entity)
    }
}

fn bound(binding: &Binding, node: NodeId) -> Option<Rc<StoredRow>> {
    binding.get(node).and_then(|slot| slot.clone())
}

/// Element of a document at `keys`; array elements are addressed by index.
fn descend(value: &Value, keys: &[String]) -> Option<serde_json::Value> {
    let mut current = value.as_json()?;
    for key in keys {
        current = match current {
            serde_json::Value::Object(map) => map.get(key)?,
            serde_json::Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

fn compare(lhs: &Value, op: CompareOp, rhs: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(lhs, rhs),
        CompareOp::Ne => !values_equal(lhs, rhs),
        CompareOp::Lt => compare_values(lhs, rhs) == Some(Ordering::Less),
        CompareOp::Le => matches!(
            compare_values(lhs, rhs),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CompareOp::Gt => compare_values(lhs, rhs) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(
            compare_values(lhs, rhs),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

/// Integer arithmetic stays integral unless it overflows; anything else
/// numeric is computed in f64. Null on either side yields null.
fn arithmetic(op: ArithmeticOp, lhs: &Value, rhs: &Value) -> Result<Value, Error> {
    if lhs.is_null() || rhs.is_null() {
        return Ok(Value::Null);
    }

    let integral = |v: &Value| matches!(v, Value::Int32(_) | Value::Int64(_));
    if integral(lhs) && integral(rhs) {
        if let (Some(a), Some(b)) = (lhs.as_i64(), rhs.as_i64()) {
            let result = match op {
                ArithmeticOp::Add => a.checked_add(b),
                ArithmeticOp::Subtract => a.checked_sub(b),
                ArithmeticOp::Multiply => a.checked_mul(b),
            };
            if let Some(result) = result {
                return Ok(Value::Int64(result));
            }
        }
    }

    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => Ok(Value::Float64(match op {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Subtract => a - b,
            ArithmeticOp::Multiply => a * b,
        })),
        _ => Err(Error::Execution(format!(
            "cannot apply arithmetic to {} and {}",
            lhs, rhs
        ))),
    }
}

fn distinct(enabled: bool, rows: Vec<Vec<Cell>>) -> Vec<Vec<Cell>> {
    if !enabled {
        return rows;
    }
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|cells| seen.insert(cells.iter().map(Cell::key).collect::<Vec<_>>()))
        .collect()
}

fn window<T>(query: &SelectQuery, rows: Vec<T>) -> Vec<T> {
    let offset = query
        .offset
        .map(|o| usize::try_from(o).unwrap_or(usize::MAX))
        .unwrap_or(0);
    let limit = query
        .limit
        .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
        .unwrap_or(usize::MAX);
    rows.into_iter().skip(offset).take(limit).collect()
}
