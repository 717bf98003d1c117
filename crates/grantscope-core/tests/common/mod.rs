#![allow(dead_code)]

use grantscope_core::{
    inspect, parse_spec, EntityCatalogue, GrantSnapshot, MemoryConnector, Reconciler, RoleInfo,
    SpecDocument, Statement, WarehouseState,
};

/// A small warehouse with two ordinary databases and one shared database.
pub fn warehouse(roles: &[&str]) -> WarehouseState {
    let strings = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
    WarehouseState {
        current_user: "permission_bot".to_string(),
        current_role: "SECURITYADMIN".to_string(),
        databases: strings(&["RAW", "MART", "SHARE", "DATABASE_1"]),
        warehouses: strings(&["LOADING", "REPORTING"]),
        users: strings(&["BOT"]),
        roles: roles
            .iter()
            .map(|name| RoleInfo {
                name: name.to_uppercase(),
                owner: "SECURITYADMIN".to_string(),
            })
            .collect(),
        schemas: strings(&[
            "RAW.EVENTS",
            "RAW.STAGING",
            "RAW.INFORMATION_SCHEMA",
            "MART.CORE",
            "SHARE.PUBLIC",
        ]),
        tables: strings(&[
            "RAW.EVENTS.ORDERS",
            "RAW.EVENTS.ORDER_ITEMS",
            "RAW.STAGING.CUSTOMERS",
            "MART.CORE.USERS",
            "SHARE.PUBLIC.T",
        ]),
        views: strings(&["RAW.EVENTS.ORDERS_V", "MART.CORE.USERS_V"]),
        ..Default::default()
    }
}

pub fn load(yaml: &str) -> (SpecDocument, EntityCatalogue) {
    let spec = parse_spec(yaml).expect("spec should parse");
    let catalogue = inspect(&spec).expect("spec should validate");
    (spec, catalogue)
}

pub fn reconcile(
    spec: &SpecDocument,
    catalogue: &EntityCatalogue,
    connector: &MemoryConnector,
    snapshot: &GrantSnapshot,
) -> Vec<Statement> {
    Reconciler::new(spec, catalogue, connector)
        .reconcile(snapshot)
        .expect("reconcile should succeed")
}

/// Applies every statement that is not already in effect.
pub fn apply_pending(snapshot: &mut GrantSnapshot, statements: &[Statement]) {
    for statement in statements.iter().filter(|s| !s.already_granted) {
        snapshot.apply(&statement.action);
    }
}

pub fn sql(statements: &[Statement]) -> Vec<&str> {
    statements.iter().map(|s| s.sql.as_str()).collect()
}

pub fn pending(statements: &[Statement]) -> Vec<&str> {
    statements
        .iter()
        .filter(|s| !s.already_granted)
        .map(|s| s.sql.as_str())
        .collect()
}
