//! Integration Tests for the persistence core
//!
//! These tests drive the record store, executor and pool registry end to end
//! against the scripted in-memory backend from `test_utils`. Tests marked
//! `#[ignore]` need Docker and run against a real PostgreSQL container.

use std::sync::Arc;
use std::time::Duration;

use core_kernel::{FieldDef, FieldType, FieldValue, Record, RecordSchema};
use domain_care::{Doctor, DoctorReview, User, UserQuery};
use infra_db::{DatabaseError, Row, Statement};
use once_cell::sync::Lazy;
use test_utils::{
    assert_no_leaked_connections, assert_untouched, assert_upsert, ConfigFixtures,
    DoctorBuilder, MockBackend, RecordFixtures, ReviewBuilder,
};

/// A record type declaring no unique key
#[derive(Debug)]
struct AuditNote {
    body: String,
}

static AUDIT_NOTE_SCHEMA: Lazy<RecordSchema> = Lazy::new(|| {
    RecordSchema::new(
        "AuditNote",
        Some("audit_notes"),
        vec![FieldDef::new("body", FieldType::TEXT, false)],
    )
});

impl Record for AuditNote {
    fn schema(&self) -> &'static RecordSchema {
        &AUDIT_NOTE_SCHEMA
    }

    fn field_values(&self) -> Vec<FieldValue> {
        vec![FieldValue::from(self.body.clone())]
    }
}

mod retrying_execution {
    use super::*;

    /// Tests that a statement failing k-1 times succeeds on attempt k
    #[tokio::test]
    async fn test_recovers_within_budget() {
        for budget in 1..=5u32 {
            let backend = MockBackend::new();
            let config = ConfigFixtures::single_resource();
            let store = backend.store(&config);
            backend.fail_next_runs(
                budget as usize - 1,
                DatabaseError::ConnectionFailed("connection reset by peer".into()),
            );

            store
                .executor()
                .execute_with_retries("Doctor", &Statement::new("SELECT 1"), budget)
                .await
                .expect("statement should succeed on the last attempt");

            // One borrow per attempt, each returned
            assert_eq!(backend.acquires(), budget as usize);
            assert_no_leaked_connections(&backend);
            assert_eq!(backend.statements().len(), budget as usize);
            // Initial build plus one forced rebuild per failed attempt
            assert_eq!(backend.pools_created(), budget as usize);
        }
    }

    /// Tests that the last error surfaces once every attempt has failed
    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());
        backend.fail_next_runs(3, DatabaseError::QueryFailed("canceling statement".into()));

        let err = store
            .sync(&RecordFixtures::doctor())
            .await
            .expect_err("every attempt fails");

        assert!(matches!(err, DatabaseError::QueryFailed(_)));
        assert_eq!(backend.acquires(), 3);
        assert_no_leaked_connections(&backend);
    }

    /// Tests that a failed borrow counts as an attempt
    #[tokio::test]
    async fn test_failed_acquire_is_retried() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());
        backend.fail_next_acquires(2, DatabaseError::PoolExhausted);

        store.sync(&RecordFixtures::doctor()).await.unwrap();

        assert_eq!(backend.failed_acquires(), 2);
        assert_eq!(backend.acquires(), 1);
        assert_eq!(backend.statements().len(), 1);
        assert_eq!(backend.outstanding(), 0);
    }

    /// Tests that defects in the caller's data are not retried
    #[tokio::test]
    async fn test_serialization_error_is_not_retried() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());
        backend.fail_next_runs(1, DatabaseError::serialization("invalid byte sequence"));

        let err = store.sync(&RecordFixtures::doctor()).await.unwrap_err();

        assert!(matches!(err, DatabaseError::Serialization(_)));
        assert_eq!(backend.acquires(), 1);
        assert_eq!(backend.pools_created(), 1);
    }

    /// Tests that a zero attempt budget is rejected before any I/O
    #[tokio::test]
    async fn test_zero_budget_is_configuration_error() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());

        let err = store
            .executor()
            .execute_with_retries("Doctor", &Statement::new("SELECT 1"), 0)
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert_untouched(&backend);
        assert_eq!(backend.pools_created(), 0);
    }

    /// Tests that scripted rows come back to the caller
    #[tokio::test]
    async fn test_returns_rows() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());
        backend.push_rows(vec![Row::new().with("n", 42i64)]);

        let rows = store
            .executor()
            .execute("Doctor", &Statement::new("SELECT count(*) AS n FROM doctors"))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("n").and_then(|v| v.as_i64()), Some(42));
    }

    /// Tests that a resource missing even after a rebuild is reported, not retried
    #[tokio::test]
    async fn test_unknown_resource_is_configuration_error() {
        let backend = MockBackend::new();
        let config = ConfigFixtures::single_resource().with_route("Doctor", "reporting");
        let store = backend.store(&config);

        let err = store.sync(&RecordFixtures::doctor()).await.unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("reporting"));
        assert!(backend.statements().is_empty());
        // Initial build plus the forced rebuild looking for the resource
        assert_eq!(backend.pools_created(), 2);
    }

    /// Tests that a pool that cannot be built fails the call
    #[tokio::test]
    async fn test_pool_creation_failure_propagates() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());
        backend.fail_pool_creation("primary");

        let err = store.sync(&RecordFixtures::doctor()).await.unwrap_err();
        assert!(err.is_connection_error());
        assert!(store.executor().registry().current().is_none());

        backend.allow_pool_creation("primary");
        store.sync(&RecordFixtures::doctor()).await.unwrap();
        assert_eq!(backend.statements().len(), 1);
    }
}

mod upserts {
    use super::*;
    use proptest::prelude::*;
    use test_utils::batch_shape_strategy;

    /// Tests that a single sync issues one single-row upsert
    #[tokio::test]
    async fn test_sync_issues_one_upsert() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());
        let doctor = RecordFixtures::doctor();

        store.sync(&doctor).await.unwrap();

        let statements = backend.statements();
        assert_eq!(statements.len(), 1);
        assert_upsert(&statements[0].statement, "doctors", 1);
        assert!(statements[0]
            .statement
            .sql()
            .contains("ON CONFLICT (\"id\") DO UPDATE SET"));
        assert_eq!(statements[0].statement.params().len(), 37);
        assert_eq!(
            statements[0].statement.params()[0].as_uuid(),
            Some(*doctor.id.as_uuid())
        );
    }

    /// Tests that syncing the same record twice sends the latest values
    #[tokio::test]
    async fn test_second_sync_carries_latest_values() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());
        let mut doctor = RecordFixtures::doctor();

        store.sync(&doctor).await.unwrap();
        doctor.name = "Dr. Amara Okafor-Reyes".to_string();
        store.sync(&doctor).await.unwrap();

        let statements = backend.statements();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[1].statement.params()[1].as_str(),
            Some("Dr. Amara Okafor-Reyes")
        );
    }

    /// Tests that an empty batch never reaches the backend
    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());

        store.sync_many::<Doctor>(&[]).await.unwrap();

        assert_untouched(&backend);
    }

    /// Tests that a zero batch size is rejected
    #[tokio::test]
    async fn test_zero_batch_size_is_configuration_error() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());

        let err = store
            .sync_many_in_batches(&DoctorBuilder::new().build_many(3), 0)
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert_untouched(&backend);
    }

    /// Tests that a record type without a unique key is rejected before any I/O
    #[tokio::test]
    async fn test_missing_unique_key_is_configuration_error() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());
        let note = AuditNote {
            body: "credential check overdue".to_string(),
        };

        let err = store.sync(&note).await.unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("AuditNote"));
        assert_untouched(&backend);
    }

    /// Tests that a batch mixing record types is rejected before any I/O
    #[tokio::test]
    async fn test_mixed_batch_is_configuration_error() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());
        let doctor = RecordFixtures::doctor();
        let review = RecordFixtures::review();
        let mixed: Vec<&dyn Record> = vec![&doctor, &review];

        let err = store.sync_many(&mixed).await.unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("Doctor"));
        assert!(err.to_string().contains("DoctorReview"));
        assert_untouched(&backend);
    }

    /// Tests that a type change falling on a batch boundary is still rejected
    #[tokio::test]
    async fn test_mixed_types_across_batches_is_configuration_error() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());
        let doctor = RecordFixtures::doctor();
        let review = RecordFixtures::review();
        let mixed: Vec<&dyn Record> = vec![&doctor, &review];

        let err = store.sync_many_in_batches(&mixed, 1).await.unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("DoctorReview"));
        // No batch is written before the mismatch is reported
        assert_untouched(&backend);
    }

    /// Tests that a batch over the bind parameter limit is rejected
    #[tokio::test]
    async fn test_oversized_batch_is_configuration_error() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());
        // 37 columns per doctor
        let doctors = DoctorBuilder::new().build_many(2000);

        let err = store.sync_many(&doctors).await.unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("bind"));
        assert_untouched(&backend);

        store.sync_many_in_batches(&doctors, 500).await.unwrap();
        assert_eq!(backend.statements().len(), 4);
    }

    /// Tests that a failing batch stops the run and keeps earlier batches
    #[tokio::test]
    async fn test_failed_batch_stops_remaining_batches() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::single_resource());
        let reviews = ReviewBuilder::new().build_many(10);
        backend.push_rows(Vec::new());
        backend.fail_next_runs(3, DatabaseError::QueryFailed("deadlock detected".into()));

        let err = store.sync_many_in_batches(&reviews, 4).await.unwrap_err();

        assert!(matches!(err, DatabaseError::QueryFailed(_)));
        // First batch once, second batch three times, third never
        assert_eq!(backend.statements().len(), 4);
        assert_no_leaked_connections(&backend);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Tests that n records in batches of b issue ceil(n / b) statements
        #[test]
        fn prop_batches_cover_every_record((count, batch_size) in batch_shape_strategy()) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let backend = MockBackend::new();
            let store = backend.store(&ConfigFixtures::single_resource());
            let reviews: Vec<DoctorReview> = ReviewBuilder::new().build_many(count);

            runtime
                .block_on(store.sync_many_in_batches(&reviews, batch_size))
                .unwrap();

            let statements = backend.statements();
            prop_assert_eq!(statements.len(), count.div_ceil(batch_size));
            for (statement, chunk) in statements.iter().zip(reviews.chunks(batch_size)) {
                assert_upsert(&statement.statement, "doctor_reviews", chunk.len());
            }
            prop_assert_eq!(backend.outstanding(), 0);
        }
    }
}

mod routing {
    use super::*;

    /// Tests that routed record types reach their resource
    #[tokio::test]
    async fn test_routed_records_use_their_resource() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::with_analytics());

        store.sync(&RecordFixtures::user_query()).await.unwrap();
        store.sync(&RecordFixtures::review()).await.unwrap();
        store.sync(&RecordFixtures::doctor()).await.unwrap();

        let resources: Vec<String> = backend
            .statements()
            .into_iter()
            .map(|s| s.resource)
            .collect();
        assert_eq!(resources, vec!["analytics", "analytics", "primary"]);
    }

    /// Tests that users stay on the default resource even when routed away
    #[tokio::test]
    async fn test_users_always_use_default_resource() {
        let backend = MockBackend::new();
        let config = ConfigFixtures::with_analytics().with_route("User", "analytics");
        let store = backend.store(&config);

        store.sync(&User::new("care.admin@example.com")).await.unwrap();

        let statements = backend.statements();
        assert_eq!(statements[0].resource, "primary");
        assert_upsert(&statements[0].statement, "users", 1);
    }

    /// Tests that user queries built through the domain API route the same way
    #[tokio::test]
    async fn test_user_query_routing() {
        let backend = MockBackend::new();
        let store = backend.store(&ConfigFixtures::with_analytics());

        store
            .sync(&UserQuery::new("rash on forearm, Denver"))
            .await
            .unwrap();

        assert_eq!(backend.statements()[0].resource, "analytics");
        assert_eq!(backend.pools_created_for("analytics"), 1);
    }
}

mod pool_registry {
    use super::*;
    use infra_db::PooledConnection;

    /// Tests that a sweep replaces only the pool that failed its ping
    #[tokio::test]
    async fn test_sweep_replaces_only_unhealthy_pool() {
        let backend = MockBackend::new();
        let registry = backend.registry(&ConfigFixtures::with_analytics());

        let before = registry.get_pool(false).await.unwrap();
        backend.mark_unhealthy("analytics");
        let after = registry.get_pool(false).await.unwrap();

        assert!(!Arc::ptr_eq(
            before.get("analytics").unwrap(),
            after.get("analytics").unwrap()
        ));
        assert!(Arc::ptr_eq(
            before.get("primary").unwrap(),
            after.get("primary").unwrap()
        ));
        assert_eq!(after.generation(), before.generation() + 1);
        assert_eq!(backend.pools_created_for("analytics"), 2);
        assert_eq!(backend.pools_created_for("primary"), 1);
        assert_no_leaked_connections(&backend);
    }

    /// Tests that a healthy sweep keeps the snapshot
    #[tokio::test]
    async fn test_healthy_sweep_keeps_snapshot() {
        let backend = MockBackend::new();
        let registry = backend.registry(&ConfigFixtures::sweep_every_call());

        let first = registry.get_pool(false).await.unwrap();
        let second = registry.get_pool(false).await.unwrap();
        let third = registry.get_pool(false).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&second, &third));
        // Two sweeps over two resources
        assert_eq!(backend.pings(), 4);
        assert_eq!(backend.pools_created(), 2);
    }

    /// Tests that no ping runs again within the health check interval
    #[tokio::test]
    async fn test_sweeps_respect_interval() {
        let backend = MockBackend::new();
        let registry = backend.registry(&ConfigFixtures::with_analytics());

        registry.get_pool(false).await.unwrap();
        registry.get_pool(false).await.unwrap();
        let pings = backend.pings();
        assert_eq!(pings, 2);

        backend.mark_unhealthy("primary");
        for _ in 0..5 {
            registry.get_pool(false).await.unwrap();
        }
        assert_eq!(backend.pings(), pings);
        assert_eq!(backend.pools_created_for("primary"), 1);
    }

    /// Tests that a forced reset rebuilds every pool
    #[tokio::test]
    async fn test_force_reset_rebuilds_all() {
        let backend = MockBackend::new();
        let registry = backend.registry(&ConfigFixtures::with_analytics());

        let before = registry.get_pool(false).await.unwrap();
        let after = registry.get_pool(true).await.unwrap();

        for key in ["analytics", "primary"] {
            assert!(!Arc::ptr_eq(before.get(key).unwrap(), after.get(key).unwrap()));
        }
        assert_eq!(backend.pools_created(), 4);
        assert_eq!(registry.generation(), 2);
    }

    /// Tests that a connection borrowed before a rebuild stays usable
    #[tokio::test]
    async fn test_rebuild_does_not_disturb_borrowed_connection() {
        let backend = MockBackend::new();
        let registry = backend.registry(&ConfigFixtures::single_resource());

        let old = registry.get_pool(false).await.unwrap();
        let mut connection = old.get("primary").unwrap().acquire().await.unwrap();
        registry.get_pool(true).await.unwrap();

        connection.run(&Statement::new("SELECT 1")).await.unwrap();
        connection.release();
        assert_no_leaked_connections(&backend);
        assert_eq!(backend.statements()[0].pool_id, 1);
    }

    /// Tests that concurrent writers share one pool and return every connection
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_syncs() {
        let backend = MockBackend::new();
        backend.set_latency(Duration::from_millis(20));
        let store = backend.store(&ConfigFixtures::single_resource());
        store.executor().registry().get_pool(false).await.unwrap();

        let handles: Vec<_> = DoctorBuilder::new()
            .build_many(16)
            .into_iter()
            .map(|doctor| {
                let store = store.clone();
                tokio::spawn(async move { store.sync(&doctor).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(backend.statements().len(), 16);
        assert_eq!(backend.pools_created_for("primary"), 1);
        assert_eq!(backend.outstanding(), 0);
        assert_no_leaked_connections(&backend);
    }
}

mod postgres {
    use super::*;
    use test_utils::TestDatabase;

    /// Tests that writing the same doctor twice leaves one row with the latest values
    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_double_sync_keeps_one_row() {
        let db = TestDatabase::new().await.unwrap();
        let store = db.store();
        let mut doctor = RecordFixtures::doctor();

        store.sync(&doctor).await.unwrap();
        doctor.name = "Dr. Amara Okafor-Reyes".to_string();
        doctor.overall_rating = None;
        store.sync(&doctor).await.unwrap();

        assert_eq!(db.count("doctors").await.unwrap(), 1);
        let (name, rating): (String, Option<f64>) =
            sqlx::query_as("SELECT name, overall_rating FROM doctors WHERE id = $1")
                .bind(*doctor.id.as_uuid())
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(name, "Dr. Amara Okafor-Reyes");
        assert_eq!(rating, None);
    }

    /// Tests that every care record type round-trips through its table
    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_every_record_type_persists() {
        let db = TestDatabase::new().await.unwrap();
        let store = db.store();

        store.sync(&RecordFixtures::specialty()).await.unwrap();
        store.sync(&RecordFixtures::doctor()).await.unwrap();
        store.sync(&RecordFixtures::user_query()).await.unwrap();
        store.sync(&RecordFixtures::appointment()).await.unwrap();
        store.sync(&RecordFixtures::review()).await.unwrap();
        store.sync(&RecordFixtures::user()).await.unwrap();

        for table in [
            "medical_specialties",
            "doctors",
            "user_queries",
            "appointments",
            "doctor_reviews",
            "auth.users",
        ] {
            assert_eq!(db.count(table).await.unwrap(), 1, "table {}", table);
        }
    }

    /// Tests that a batch upsert writes every row and reads back through the executor
    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_batch_upsert_and_select() {
        let db = TestDatabase::new().await.unwrap();
        let store = db.store();
        let doctor = RecordFixtures::doctor();
        store.sync(&doctor).await.unwrap();
        let reviews = ReviewBuilder::new().for_doctor(doctor.id).anonymous().build_many(25);

        store.sync_many_in_batches(&reviews, 10).await.unwrap();

        let rows = store
            .executor()
            .execute(
                "DoctorReview",
                &Statement::new("SELECT count(*) AS n FROM doctor_reviews WHERE doctor_id = $1")
                    .bind(*doctor.id.as_uuid()),
            )
            .await
            .unwrap();
        assert_eq!(rows[0].get("n").and_then(|v| v.as_i64()), Some(25));
    }

    /// Tests that a routed record type lands in the routed database
    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_routing_across_databases() {
        let db = TestDatabase::new().await.unwrap();
        let analytics_url = db.create_database("analytics").await.unwrap();
        let config = db
            .store_config()
            .with_resource("analytics", analytics_url)
            .with_route("UserQuery", "analytics");
        let store = infra_db::RecordStore::postgres(&config);

        store.sync(&RecordFixtures::user_query()).await.unwrap();

        assert_eq!(db.count("user_queries").await.unwrap(), 0);
        let rows = store
            .executor()
            .execute("UserQuery", &Statement::new("SELECT count(*) AS n FROM user_queries"))
            .await
            .unwrap();
        assert_eq!(rows[0].get("n").and_then(|v| v.as_i64()), Some(1));
    }
}
