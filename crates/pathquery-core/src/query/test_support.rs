//! Shared schema fixture for query unit tests.

use crate::catalog::{
    Catalog, EdgeDef, EntityDef, FieldDef, FieldType, RelationDef, ScalarType, SchemaBundle,
};

/// Employees with phones, an address, a manager and projects.
pub(crate) fn schema() -> SchemaBundle {
    let employee = EntityDef::new("Employee", "id").with_fields([
        FieldDef::new("id", FieldType::scalar(ScalarType::Int64)),
        FieldDef::new("firstName", FieldType::scalar(ScalarType::String)),
        FieldDef::optional_scalar("lastName", ScalarType::String),
        FieldDef::optional_scalar("salary", ScalarType::Int32),
        FieldDef::optional_scalar("bonus", ScalarType::Int32),
        FieldDef::optional_scalar("birthday", ScalarType::Timestamp),
        FieldDef::optional_scalar("manager_id", ScalarType::Int64),
        FieldDef::optional_scalar("address_id", ScalarType::Int64),
        FieldDef::optional_scalar("metadata", ScalarType::Json),
        FieldDef::new("nicknames", FieldType::array_scalar(ScalarType::String)),
        FieldDef::optional(
            "status",
            FieldType::enum_type("Status", vec!["Active".into(), "Retired".into()]),
        ),
    ]);
    let phone = EntityDef::new("Phone", "id").with_fields([
        FieldDef::new("id", FieldType::scalar(ScalarType::Int64)),
        FieldDef::new("number", FieldType::scalar(ScalarType::String)),
        FieldDef::new("owner_id", FieldType::scalar(ScalarType::Int64)),
    ]);
    let address = EntityDef::new("Address", "id").with_fields([
        FieldDef::new("id", FieldType::scalar(ScalarType::Int64)),
        FieldDef::new("city", FieldType::scalar(ScalarType::String)),
    ]);
    let project = EntityDef::new("Project", "id").with_fields([
        FieldDef::new("id", FieldType::scalar(ScalarType::Int64)),
        FieldDef::new("name", FieldType::scalar(ScalarType::String)),
    ]);
    let membership = EntityDef::new("EmployeeProject", "id").with_fields([
        FieldDef::new("id", FieldType::scalar(ScalarType::Int64)),
        FieldDef::new("employee_id", FieldType::scalar(ScalarType::Int64)),
        FieldDef::new("project_id", FieldType::scalar(ScalarType::Int64)),
    ]);

    SchemaBundle::new(0)
        .with_entity(employee)
        .with_entity(phone)
        .with_entity(address)
        .with_entity(project)
        .with_entity(membership)
        .with_relation(RelationDef::one_to_many(
            "phones", "Employee", "id", "Phone", "owner_id",
        ))
        .with_relation(
            RelationDef::one_to_many("phoneBook", "Employee", "id", "Phone", "owner_id")
                .keyed_by("number"),
        )
        .with_relation(RelationDef::many_to_one(
            "owner", "Phone", "owner_id", "Employee", "id",
        ))
        .with_relation(RelationDef::many_to_one(
            "manager",
            "Employee",
            "manager_id",
            "Employee",
            "id",
        ))
        .with_relation(RelationDef::many_to_one(
            "address",
            "Employee",
            "address_id",
            "Address",
            "id",
        ))
        .with_relation(
            RelationDef::many_to_many(
                "projects",
                "Employee",
                "id",
                "Project",
                "id",
                EdgeDef::new("EmployeeProject", "employee_id", "project_id"),
            )
            .as_set(),
        )
}

/// A temporary database with [`schema`] applied.
pub(crate) fn catalog() -> (sled::Db, Catalog) {
    let db = sled::Config::new().temporary(true).open().unwrap();
    let catalog = Catalog::open(&db).unwrap();
    catalog.apply_schema(schema()).unwrap();
    (db, catalog)
}
