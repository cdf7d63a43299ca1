//! Rebuilding entity graphs from query results.
//!
//! Tuple results carry the root entity in the `_root` column and one column
//! per requested path. Rows are grouped by root identity and each requested
//! path is written into the root, parents before children. Relation values
//! already loaded with the same members are kept, so applying the same rows
//! twice changes nothing. A relation marked as loading belongs to another
//! materialization and is left untouched.

use super::compiler::CompiledQuery;
use super::field_path::FieldPath;
use super::row::{Datum, ResultSet, Tuple, ROOT_ALIAS};
use crate::catalog::{Catalog, FieldKind, RelationDescriptor, RelationShape};
use crate::error::Error;
use pathquery_proto::{Entity, FieldSlot, Key, Relation, RelationValue, Value};
use std::collections::{HashMap, HashSet};
use std::mem;

/// Turns result sets into root entities with the requested paths loaded.
pub struct ResultMaterializer<'a> {
    catalog: &'a Catalog,
}

impl<'a> ResultMaterializer<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Materialize the results of `compiled`.
    ///
    /// Root entities come back once each, in first-seen order.
    pub fn materialize(
        &self,
        compiled: &CompiledQuery,
        results: ResultSet,
    ) -> Result<Vec<Entity>, Error> {
        match results {
            ResultSet::Entities(entities) => Ok(unique(entities)),
            ResultSet::Tuples(tuples) => {
                let mut groups: Vec<(Entity, Vec<Tuple>)> = Vec::new();
                let mut positions: HashMap<(String, Key), usize> = HashMap::new();

                for tuple in tuples {
                    let root = tuple
                        .get(ROOT_ALIAS)
                        .and_then(Datum::as_entity)
                        .cloned()
                        .ok_or_else(|| Error::InvalidData("row has no root entity".into()))?;
                    match root.identity() {
                        Some(id) => match positions.get(&id) {
                            Some(&position) => groups[position].1.push(tuple),
                            None => {
                                positions.insert(id, groups.len());
                                groups.push((root, vec![tuple]));
                            }
                        },
                        None => groups.push((root, vec![tuple])),
                    }
                }

                groups
                    .into_iter()
                    .map(|(mut entity, rows)| {
                        self.merge_into(&mut entity, compiled, &rows)?;
                        Ok(entity)
                    })
                    .collect()
            }
            ResultSet::Count(count) => Err(Error::InvalidData(format!(
                "count result ({}) cannot be materialized",
                count
            ))),
        }
    }

    /// Apply the rows of `tuples` belonging to `entity` to it.
    ///
    /// Rows with a different root are ignored.
    pub fn merge_into(
        &self,
        entity: &mut Entity,
        compiled: &CompiledQuery,
        tuples: &[Tuple],
    ) -> Result<(), Error> {
        let rows: Vec<&Tuple> = tuples
            .iter()
            .filter(|t| match t.get(ROOT_ALIAS).and_then(Datum::as_entity) {
                Some(root) => root.same_identity(entity),
                None => true,
            })
            .collect();
        if rows.is_empty() {
            return Ok(());
        }

        for node in compiled.tree.children() {
            self.fill(entity, node, compiled, &rows)?;
        }
        Ok(())
    }

    fn fill(
        &self,
        entity: &mut Entity,
        node: &FieldPath,
        compiled: &CompiledQuery,
        rows: &[&Tuple],
    ) -> Result<(), Error> {
        let descriptor = self.catalog.descriptor(&entity.entity_type)?;
        let field = descriptor.field(&node.name).ok_or_else(|| {
            Error::path(
                node.path.as_str(),
                node.name.as_str(),
                format!("entity '{}' has no such field", descriptor.name),
            )
        })?;
        let alias = compiled
            .alias_of(&node.path)
            .ok_or_else(|| Error::InvalidData(format!("path '{}' was not selected", node.path)))?;
        let cells = rows
            .iter()
            .filter_map(|row| row.get(alias))
            .filter(|d| !d.is_null());

        let relation = match &field.kind {
            // Paths below a scalar address document content and are not
            // written back.
            FieldKind::Scalar(_) => {
                if let Some(value) = cells.filter_map(Datum::as_value).next() {
                    entity.set_field(node.name.clone(), FieldSlot::Value(value.clone()));
                }
                return Ok(());
            }
            FieldKind::Relation(relation) => relation,
        };

        let candidate = shape(relation, unique(cells.filter_map(Datum::as_entity).cloned().collect()));
        let keep = match entity.relation(&node.name) {
            Some(Relation::Loaded(existing)) => {
                same_members(existing, &candidate)
                    || (relation.shape == RelationShape::ToOne && candidate.is_empty())
            }
            Some(Relation::Loading) => return Ok(()),
            _ => false,
        };
        if !keep {
            entity.set_field(
                node.name.clone(),
                FieldSlot::Relation(Relation::Loaded(candidate)),
            );
        }

        if node.children.is_empty() {
            return Ok(());
        }
        let Some(loaded) = entity
            .relation_mut(&node.name)
            .and_then(Relation::loaded_mut)
        else {
            return Ok(());
        };
        for child in loaded.entities_mut() {
            let child_rows: Vec<&Tuple> = rows
                .iter()
                .copied()
                .filter(|row| {
                    row.get(alias)
                        .and_then(Datum::as_entity)
                        .is_some_and(|e| e.same_identity(child))
                })
                .collect();
            for grandchild in &node.children {
                self.fill(child, grandchild, compiled, &child_rows)?;
            }
        }
        Ok(())
    }
}

/// Remove repeated identities, keeping the first occurrence.
fn unique(entities: Vec<Entity>) -> Vec<Entity> {
    let mut seen = HashSet::new();
    entities
        .into_iter()
        .filter(|e| match e.identity() {
            Some(id) => seen.insert(id),
            None => true,
        })
        .collect()
}

fn shape(relation: &RelationDescriptor, entities: Vec<Entity>) -> RelationValue {
    match &relation.shape {
        RelationShape::ToOne => RelationValue::One(entities.into_iter().next().map(Box::new)),
        RelationShape::List => RelationValue::List(entities),
        RelationShape::Set => RelationValue::Set(entities),
        RelationShape::Map { key } => RelationValue::Map(
            entities
                .into_iter()
                .map(|e| (e.value(key).cloned().unwrap_or(Value::Null), e))
                .collect(),
        ),
    }
}

/// Same container kind holding the same identities.
fn same_members(a: &RelationValue, b: &RelationValue) -> bool {
    fn identities(value: &RelationValue) -> Vec<Option<(String, Key)>> {
        let mut ids: Vec<_> = value.entities().iter().map(|e| e.identity()).collect();
        ids.sort();
        ids
    }
    mem::discriminant(a) == mem::discriminant(b) && identities(a) == identities(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::compiler::QueryCompiler;
    use crate::query::test_support;
    use pathquery_proto::FindQuery;

    fn employee(id: i64, name: &str) -> Entity {
        Entity::new("Employee", id)
            .with_value("firstName", name)
            .with_relation("phones", Relation::Unloaded)
            .with_relation("phoneBook", Relation::Unloaded)
            .with_relation("manager", Relation::Unloaded)
    }

    fn phone(id: i64, number: &str) -> Entity {
        Entity::new("Phone", id)
            .with_value("number", number)
            .with_relation("owner", Relation::Unloaded)
    }

    fn row(cells: Vec<(&str, Datum)>) -> Tuple {
        let mut tuple = Tuple::new();
        for (alias, datum) in cells {
            tuple.push(alias, datum);
        }
        tuple
    }

    fn compile(catalog: &Catalog, fields: &[&str]) -> CompiledQuery {
        let request = FindQuery::new("Employee").with_fields(fields.iter().copied());
        QueryCompiler::new(catalog).compile(&request).unwrap()
    }

    fn fan_out_rows() -> Vec<Tuple> {
        vec![
            row(vec![
                (ROOT_ALIAS, Datum::Entity(employee(3, "Hang"))),
                ("phones_p_", Datum::Entity(phone(4, "444"))),
                ("phones__number_p_", Datum::Value(Value::from("444"))),
                ("manager_p_", Datum::Entity(employee(2, "Minh"))),
            ]),
            row(vec![
                (ROOT_ALIAS, Datum::Entity(employee(3, "Hang"))),
                ("phones_p_", Datum::Entity(phone(5, "555"))),
                ("phones__number_p_", Datum::Value(Value::from("555"))),
                ("manager_p_", Datum::Entity(employee(2, "Minh"))),
            ]),
            row(vec![
                (ROOT_ALIAS, Datum::Entity(employee(1, "Nam"))),
                ("phones_p_", Datum::Null),
                ("phones__number_p_", Datum::Null),
                ("manager_p_", Datum::Null),
            ]),
        ]
    }

    fn loaded<'e>(entity: &'e Entity, field: &str) -> &'e RelationValue {
        entity
            .relation(field)
            .and_then(Relation::loaded)
            .unwrap_or_else(|| panic!("{} not loaded", field))
    }

    #[test]
    fn test_parent_with_children_appears_once() {
        let (_db, catalog) = test_support::catalog();
        let compiled = compile(&catalog, &["phones.number", "manager"]);
        let entities = ResultMaterializer::new(&catalog)
            .materialize(&compiled, ResultSet::Tuples(fan_out_rows()))
            .unwrap();

        assert_eq!(entities.len(), 2);
        let hang = &entities[0];
        assert_eq!(hang.id, Value::Int64(3));
        let phones = loaded(hang, "phones").entities();
        assert_eq!(phones.len(), 2);
        assert_eq!(phones[1].value("number"), Some(&Value::from("555")));
        match loaded(hang, "manager") {
            RelationValue::One(Some(manager)) => assert_eq!(manager.id, Value::Int64(2)),
            other => panic!("Expected manager, got {:?}", other),
        }

        let nam = &entities[1];
        assert!(loaded(nam, "phones").is_empty());
        assert_eq!(loaded(nam, "manager"), &RelationValue::One(None));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (_db, catalog) = test_support::catalog();
        let compiled = compile(&catalog, &["phones.number", "manager"]);
        let materializer = ResultMaterializer::new(&catalog);
        let rows = fan_out_rows();

        let mut hang = employee(3, "Hang");
        materializer.merge_into(&mut hang, &compiled, &rows).unwrap();
        let once = hang.clone();
        materializer.merge_into(&mut hang, &compiled, &rows).unwrap();
        assert_eq!(hang, once);
        // Nam's rows were ignored.
        assert_eq!(loaded(&hang, "phones").len(), 2);
    }

    #[test]
    fn test_merge_ignores_rows_of_other_roots() {
        let (_db, catalog) = test_support::catalog();
        let compiled = compile(&catalog, &["firstName", "phones.number"]);
        let materializer = ResultMaterializer::new(&catalog);
        let minh_rows = vec![row(vec![
            (ROOT_ALIAS, Datum::Entity(employee(2, "Minh"))),
            ("firstName_p_", Datum::Value(Value::from("Minh"))),
            ("phones_p_", Datum::Entity(phone(1, "111"))),
            ("phones__number_p_", Datum::Value(Value::from("111"))),
        ])];

        let mut minh = materializer
            .materialize(&compiled, ResultSet::Tuples(minh_rows))
            .unwrap()
            .remove(0);
        let before = minh.clone();
        materializer
            .merge_into(&mut minh, &compiled, &fan_out_rows())
            .unwrap();

        assert_eq!(minh, before);
        assert_eq!(minh.value("firstName"), Some(&Value::from("Minh")));
        assert_eq!(loaded(&minh, "phones").len(), 1);
    }

    #[test]
    fn test_existing_relation_kept_when_members_match() {
        let (_db, catalog) = test_support::catalog();
        let compiled = compile(&catalog, &["phones"]);
        let mut hang = employee(3, "Hang");
        let enriched = phone(4, "444").with_value("extra", "kept");
        hang.set_field(
            "phones",
            FieldSlot::Relation(Relation::Loaded(RelationValue::List(vec![
                phone(5, "555"),
                enriched,
            ]))),
        );

        ResultMaterializer::new(&catalog)
            .merge_into(&mut hang, &compiled, &fan_out_rows())
            .unwrap();
        let phones = loaded(&hang, "phones").entities();
        assert_eq!(phones[0].id, Value::Int64(5));
        assert_eq!(phones[1].value("extra"), Some(&Value::from("kept")));
    }

    #[test]
    fn test_loading_relation_not_overwritten() {
        let (_db, catalog) = test_support::catalog();
        let compiled = compile(&catalog, &["phones.number", "manager"]);
        let mut hang = employee(3, "Hang").with_relation("phones", Relation::Loading);

        ResultMaterializer::new(&catalog)
            .merge_into(&mut hang, &compiled, &fan_out_rows())
            .unwrap();
        assert_eq!(hang.relation("phones"), Some(&Relation::Loading));
        assert!(hang.relation("manager").is_some_and(Relation::is_loaded));
    }

    #[test]
    fn test_map_relation_keyed_by_field() {
        let (_db, catalog) = test_support::catalog();
        let compiled = compile(&catalog, &["phoneBook"]);
        let rows = vec![
            row(vec![
                (ROOT_ALIAS, Datum::Entity(employee(3, "Hang"))),
                ("phoneBook_p_", Datum::Entity(phone(4, "444"))),
            ]),
            row(vec![
                (ROOT_ALIAS, Datum::Entity(employee(3, "Hang"))),
                ("phoneBook_p_", Datum::Entity(phone(5, "555"))),
            ]),
        ];
        let entities = ResultMaterializer::new(&catalog)
            .materialize(&compiled, ResultSet::Tuples(rows))
            .unwrap();

        match loaded(&entities[0], "phoneBook") {
            RelationValue::Map(entries) => {
                let keys: Vec<&Value> = entries.iter().map(|(k, _)| k).collect();
                assert_eq!(keys, vec![&Value::from("444"), &Value::from("555")]);
            }
            other => panic!("Expected map, got {:?}", other),
        }
    }

    #[test]
    fn test_whole_entities_deduplicated() {
        let (_db, catalog) = test_support::catalog();
        let compiled = compile(&catalog, &[]);
        let entities = ResultMaterializer::new(&catalog)
            .materialize(
                &compiled,
                ResultSet::Entities(vec![
                    employee(3, "Hang"),
                    employee(1, "Nam"),
                    employee(3, "Hang"),
                ]),
            )
            .unwrap();
        let ids: Vec<&Value> = entities.iter().map(|e| &e.id).collect();
        assert_eq!(ids, vec![&Value::Int64(3), &Value::Int64(1)]);
    }

    #[test]
    fn test_count_cannot_be_materialized() {
        let (_db, catalog) = test_support::catalog();
        let compiled = compile(&catalog, &[]);
        let result = ResultMaterializer::new(&catalog).materialize(&compiled, ResultSet::Count(3));
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }
}
