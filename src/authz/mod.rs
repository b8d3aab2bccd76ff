//! Authorization for robot accounts.
//!
//! Robots are granted [`Policy`](crate::models::Policy) lists at creation.
//! The engine owns those grants afterwards and answers two questions:
//! - may this caller manage robots of a project (project ownership)
//! - may this robot perform an action on a resource (grant evaluation)

mod engine;
mod error;
mod memory;
#[cfg(feature = "database-sqlite")]
mod sqlite;

use std::sync::Arc;

pub use engine::{AuthorizationEngine, RobotGrants, Subject};
pub use error::AuthzError;
pub use memory::MemoryAuthorizationEngine;
#[cfg(feature = "database-sqlite")]
pub use sqlite::SqliteAuthorizationEngine;

use crate::db::{DbPool, DbPoolRef};

/// Build the engine that stores grants in the same backend as `db`.
pub fn engine_for(db: &DbPool) -> Arc<dyn AuthorizationEngine> {
    match db.pool() {
        DbPoolRef::Memory => Arc::new(MemoryAuthorizationEngine::new()),
        #[cfg(feature = "database-sqlite")]
        DbPoolRef::Sqlite(pool) => Arc::new(SqliteAuthorizationEngine::new(pool.clone())),
        #[cfg(not(feature = "database-sqlite"))]
        DbPoolRef::_Phantom(_) => Arc::new(MemoryAuthorizationEngine::new()),
    }
}

/// Match a pattern against a value.
///
/// Supports three matching modes:
/// - `*` matches any value (full wildcard)
/// - `foo*` matches any value starting with `foo` (prefix wildcard)
/// - `foo` matches only the exact string `foo` (exact match)
///
/// # Examples
///
/// ```ignore
/// assert!(pattern_matches("*", "library/nginx"));
/// assert!(pattern_matches("library/*", "library/nginx"));
/// assert!(!pattern_matches("library/*", "team/app"));
/// assert!(pattern_matches("library/nginx", "library/nginx"));
/// ```
pub(crate) fn pattern_matches(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        true
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        value.starts_with(prefix)
    } else {
        pattern == value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, Policy, Resource};

    #[test]
    fn test_pattern_matches_full_wildcard() {
        assert!(pattern_matches("*", "anything"));
        assert!(pattern_matches("*", ""));
        assert!(pattern_matches("*", "library/nginx"));
    }

    #[test]
    fn test_pattern_matches_prefix_wildcard() {
        assert!(pattern_matches("library/*", "library/nginx"));
        assert!(pattern_matches("library/*", "library/"));
        assert!(pattern_matches("lib*", "library"));

        assert!(!pattern_matches("library/*", "library"));
        assert!(!pattern_matches("library/*", "team/library/x"));
        assert!(!pattern_matches("library/*", "Library/nginx")); // case sensitive
    }

    #[test]
    fn test_pattern_matches_exact() {
        assert!(pattern_matches("library/nginx", "library/nginx"));
        assert!(pattern_matches("", ""));

        assert!(!pattern_matches("library/nginx", "library/nginx-alpine"));
        assert!(!pattern_matches("library/nginx", "library/ngin"));
    }

    // ========================================================================
    // Shared engine tests
    // ========================================================================

    fn ci_policies() -> Vec<Policy> {
        vec![
            Policy::new(Resource::Repository, Action::Pull),
            Policy::new(Resource::Repository, Action::Push).with_scope("library/*"),
        ]
    }

    async fn check_record_and_read_back(engine: &dyn AuthorizationEngine) {
        engine.record_grants(1, 5, &ci_policies()).await.unwrap();

        let grants = engine.grants_for(1).await.unwrap().expect("recorded");
        assert_eq!(grants.project_id, 5);
        assert_eq!(grants.policies, ci_policies());
        assert!(engine.grants_for(2).await.unwrap().is_none());
    }

    async fn check_record_replaces_previous(engine: &dyn AuthorizationEngine) {
        engine.record_grants(1, 5, &ci_policies()).await.unwrap();
        let only_pull = vec![Policy::new(Resource::Repository, Action::Pull)];
        engine.record_grants(1, 5, &only_pull).await.unwrap();

        let grants = engine.grants_for(1).await.unwrap().unwrap();
        assert_eq!(grants.policies, only_pull);
    }

    async fn check_empty_grants_are_none(engine: &dyn AuthorizationEngine) {
        engine.record_grants(1, 5, &[]).await.unwrap();
        assert!(engine.grants_for(1).await.unwrap().is_none());
    }

    async fn check_revoke(engine: &dyn AuthorizationEngine) {
        engine.record_grants(1, 5, &ci_policies()).await.unwrap();
        engine.revoke_grants(1).await.unwrap();
        assert!(engine.grants_for(1).await.unwrap().is_none());

        // Revoking again is fine
        engine.revoke_grants(1).await.unwrap();
    }

    async fn check_allows(engine: &dyn AuthorizationEngine) {
        engine.record_grants(1, 5, &ci_policies()).await.unwrap();

        assert!(
            engine
                .allows(1, 5, Resource::Repository, Action::Pull, Some("any/repo"))
                .await
                .unwrap()
        );
        assert!(
            engine
                .allows(1, 5, Resource::Repository, Action::Push, Some("library/nginx"))
                .await
                .unwrap()
        );
        assert!(
            !engine
                .allows(1, 5, Resource::Repository, Action::Push, Some("team/app"))
                .await
                .unwrap()
        );
        assert!(
            !engine
                .allows(1, 6, Resource::Repository, Action::Pull, None)
                .await
                .unwrap()
        );
        assert!(
            !engine
                .allows(99, 5, Resource::Repository, Action::Pull, None)
                .await
                .unwrap()
        );
    }

    async fn check_project_ownership(engine: &dyn AuthorizationEngine) {
        let alice = Subject::new("alice");
        assert!(!engine.is_project_owner(&alice, 5).await.unwrap());

        engine.add_project_owner(5, "alice").await.unwrap();
        engine.add_project_owner(5, "alice").await.unwrap();
        assert!(engine.is_project_owner(&alice, 5).await.unwrap());
        assert!(!engine.is_project_owner(&alice, 6).await.unwrap());
        assert!(!engine.is_project_owner(&Subject::new("bob"), 5).await.unwrap());

        assert!(engine.is_project_owner(&Subject::admin("root"), 6).await.unwrap());
    }

    macro_rules! engine_tests {
        ($module:ident, $make:expr) => {
            mod $module {
                use super::*;

                #[tokio::test]
                async fn test_record_and_read_back() {
                    let engine = $make;
                    check_record_and_read_back(&engine).await;
                }

                #[tokio::test]
                async fn test_record_replaces_previous() {
                    let engine = $make;
                    check_record_replaces_previous(&engine).await;
                }

                #[tokio::test]
                async fn test_empty_grants_are_none() {
                    let engine = $make;
                    check_empty_grants_are_none(&engine).await;
                }

                #[tokio::test]
                async fn test_revoke() {
                    let engine = $make;
                    check_revoke(&engine).await;
                }

                #[tokio::test]
                async fn test_allows() {
                    let engine = $make;
                    check_allows(&engine).await;
                }

                #[tokio::test]
                async fn test_project_ownership() {
                    let engine = $make;
                    check_project_ownership(&engine).await;
                }
            }
        };
    }

    engine_tests!(memory, MemoryAuthorizationEngine::new());

    #[cfg(feature = "database-sqlite")]
    engine_tests!(
        sqlite,
        SqliteAuthorizationEngine::new(crate::db::tests::harness::migrated_sqlite_pool().await)
    );

    #[tokio::test]
    async fn test_engine_for_memory_pool() {
        let db = DbPool::in_memory();
        let engine = engine_for(&db);
        engine.record_grants(1, 5, &ci_policies()).await.unwrap();
        assert!(engine.grants_for(1).await.unwrap().is_some());
    }
}
