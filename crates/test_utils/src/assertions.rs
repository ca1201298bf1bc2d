//! Custom Test Assertions
//!
//! Provides assertion helpers for statements and mock backend state that give
//! more meaningful failure messages than bare `assert!`.

use infra_db::Statement;

use crate::mock::MockBackend;

/// Number of value tuples in an upsert statement
pub fn upsert_tuple_count(statement: &Statement) -> usize {
    let sql = statement.sql();
    let values = match (sql.find(" VALUES "), sql.find(" ON CONFLICT ")) {
        (Some(start), Some(end)) if start < end => &sql[start..end],
        _ => return 0,
    };
    values.matches('(').count()
}

/// Asserts that `statement` is an upsert into `table` with `tuples` rows
///
/// # Panics
///
/// Panics if the statement targets another table, is not an upsert, or the
/// tuple count or parameter count does not line up.
pub fn assert_upsert(statement: &Statement, table: &str, tuples: usize) {
    let sql = statement.sql();
    let prefix = format!("INSERT INTO \"{}\" (", table);
    assert!(
        sql.starts_with(&prefix),
        "Expected an insert into {}, got: {}",
        table,
        sql
    );
    assert!(
        sql.contains(" ON CONFLICT (") && sql.contains(" DO UPDATE SET "),
        "Expected an upsert, got: {}",
        sql
    );
    assert_eq!(
        upsert_tuple_count(statement),
        tuples,
        "Tuple count mismatch in: {}",
        sql
    );
    assert_eq!(
        statement.params().len() % tuples.max(1),
        0,
        "Parameter count {} is not a multiple of {} tuples",
        statement.params().len(),
        tuples
    );
}

/// Asserts that every borrowed connection was returned
pub fn assert_no_leaked_connections(backend: &MockBackend) {
    assert_eq!(
        backend.acquires(),
        backend.releases(),
        "Connections leaked: {} borrowed, {} returned",
        backend.acquires(),
        backend.releases()
    );
}

/// Asserts that the backend saw no borrow, ping or statement at all
pub fn assert_untouched(backend: &MockBackend) {
    assert_eq!(
        backend.interactions(),
        0,
        "Expected no backend interaction, saw {} borrows, {} pings, {} statements",
        backend.acquires() + backend.failed_acquires(),
        backend.pings(),
        backend.statements().len()
    );
}
