//! Repository tests: schema, writes and the find operations.

use pathquery::{
    Condition, EntityDef, Error, FieldDef, FieldType, JoinKind, PageRequest, RelationDef,
    Repository, RepositoryConfig, ScalarType, SchemaBundle, Sort, Value,
};
use std::collections::BTreeMap;
use uuid::Uuid;

fn schema() -> SchemaBundle {
    let employee = EntityDef::new("Employee", "id").with_fields([
        FieldDef::new("id", FieldType::scalar(ScalarType::Uuid)),
        FieldDef::new("firstName", FieldType::scalar(ScalarType::String)),
        FieldDef::optional_scalar("salary", ScalarType::Float64),
    ]);
    let phone = EntityDef::new("Phone", "id").with_fields([
        FieldDef::new("id", FieldType::scalar(ScalarType::Int64)),
        FieldDef::new("number", FieldType::scalar(ScalarType::String)),
        FieldDef::new("owner_id", FieldType::scalar(ScalarType::Uuid)),
    ]);

    SchemaBundle::new(1)
        .with_entity(employee)
        .with_entity(phone)
        .with_relation(RelationDef::one_to_many(
            "phones", "Employee", "id", "Phone", "owner_id",
        ))
}

fn record(fields: Vec<(&str, Value)>) -> BTreeMap<String, Value> {
    fields
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Seed Nam, Minh and Hang; returns their identities in that order.
fn seed(repo: &Repository) -> Vec<Uuid> {
    let people = [("Nam", 20.0), ("Minh", 26.0), ("Hang", 32.0)];
    let ids: Vec<Uuid> = people.iter().map(|_| Uuid::new_v4()).collect();
    for ((name, salary), id) in people.iter().zip(&ids) {
        repo.insert(
            "Employee",
            record(vec![
                ("id", (*id).into()),
                ("firstName", (*name).into()),
                ("salary", (*salary).into()),
            ]),
        )
        .unwrap();
    }
    for (phone_id, number, owner) in [(1i64, "1", ids[1]), (4, "4", ids[2]), (5, "5", ids[2])] {
        repo.insert(
            "Phone",
            record(vec![
                ("id", phone_id.into()),
                ("number", number.into()),
                ("owner_id", owner.into()),
            ]),
        )
        .unwrap();
    }
    ids
}

fn repository(config: RepositoryConfig) -> (Repository, Vec<Uuid>) {
    let repo = Repository::open(config).unwrap();
    repo.apply_schema(schema()).unwrap();
    let ids = seed(&repo);
    (repo, ids)
}

fn first_name(entity: &pathquery::Entity) -> &str {
    entity.value("firstName").and_then(Value::as_str).unwrap()
}

#[test]
fn test_find_by_id_parses_uuid_strings() {
    let (repo, ids) = repository(RepositoryConfig::temporary());

    let found = repo
        .find_by_id("Employee", ids[2].to_string(), ["phones.number"])
        .unwrap()
        .unwrap();
    assert_eq!(first_name(&found), "Hang");
    let phones = found.relation("phones").and_then(|r| r.loaded()).unwrap();
    assert_eq!(phones.len(), 2);

    let found = repo.find_by_id("Employee", ids[0], Vec::<String>::new()).unwrap();
    assert_eq!(found.map(|e| e.id), Some(Value::from(ids[0])));

    let missing = repo
        .find_by_id("Employee", Uuid::new_v4().to_string(), Vec::<String>::new())
        .unwrap();
    assert!(missing.is_none());

    let phone = repo.find_by_id("Phone", 4i64, Vec::<String>::new()).unwrap();
    assert!(phone.is_some());
}

#[test]
fn test_find_operations() {
    let (repo, _) = repository(RepositoryConfig::temporary());

    let rich = repo.find_all(
        repo.query("Employee")
            .with_condition(Condition::field("salary").greater_than_or_equal(26.0))
            .sort_by(Sort::desc("salary")),
    );
    let names: Vec<&str> = rich.as_ref().unwrap().iter().map(first_name).collect();
    assert_eq!(names, vec!["Hang", "Minh"]);

    let lowest = repo
        .find_one(repo.query("Employee").sort_by(Sort::asc("salary")))
        .unwrap()
        .unwrap();
    assert_eq!(first_name(&lowest), "Nam");

    let minh = repo
        .find_unique(
            repo.query("Employee")
                .with_condition(Condition::field("phones.number").equal("1")),
        )
        .unwrap()
        .unwrap();
    assert_eq!(first_name(&minh), "Minh");
}

#[test]
fn test_find_page_uses_default_size() {
    let config = RepositoryConfig::temporary().with_default_page_size(2);
    let (repo, _) = repository(config);
    let request = repo.query("Employee").sort_by(Sort::asc("salary"));

    let first = repo.find_page(request.clone()).unwrap();
    assert_eq!(first.request.size(), 2);
    assert_eq!(first.content.iter().map(first_name).collect::<Vec<_>>(), vec!["Nam", "Minh"]);
    assert_eq!(first.total_elements, 3);

    let second = repo
        .find_page(request.with_page(first.request.next()))
        .unwrap();
    assert_eq!(second.content.iter().map(first_name).collect::<Vec<_>>(), vec!["Hang"]);
    assert_eq!(second.total_elements, 3);

    let explicit = repo
        .find_page(repo.query("Employee").with_page(PageRequest::of(0, 5)))
        .unwrap();
    assert_eq!(explicit.content.len(), 3);
}

#[test]
fn test_default_join_kind() {
    let (left, _) = repository(RepositoryConfig::temporary());
    let all = left
        .find_all(left.query("Employee").with_field("phones.number"))
        .unwrap();
    assert_eq!(all.len(), 3);

    let (inner, _) =
        repository(RepositoryConfig::temporary().with_default_join_kind(JoinKind::Inner));
    let with_phones = inner
        .find_all(inner.query("Employee").with_field("phones.number"))
        .unwrap();
    let names: Vec<&str> = with_phones.iter().map(first_name).collect();
    assert_eq!(names, vec!["Minh", "Hang"]);
}

#[test]
fn test_insert_requires_identity() {
    let repo = Repository::temporary().unwrap();
    repo.apply_schema(schema()).unwrap();

    let result = repo.insert("Employee", record(vec![("firstName", "Lan".into())]));
    assert!(matches!(result, Err(Error::MissingIdentity { .. })));

    let result = repo.insert("Department", record(vec![("id", 1i64.into())]));
    assert!(matches!(result, Err(Error::Core(_))));
}

#[test]
fn test_invalid_config_rejected() {
    let result = Repository::open(RepositoryConfig::temporary().with_default_page_size(0));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_reopen_keeps_schema_and_records() {
    let dir = tempfile::tempdir().unwrap();
    let ids = {
        let (repo, ids) = repository(RepositoryConfig::new(dir.path()));
        repo.flush().unwrap();
        ids
    };

    let repo = Repository::open(RepositoryConfig::new(dir.path())).unwrap();
    assert_eq!(repo.catalog().current_version(), 1);
    let found = repo
        .find_by_id("Employee", ids[1], Vec::<String>::new())
        .unwrap()
        .unwrap();
    assert_eq!(first_name(&found), "Minh");
}
