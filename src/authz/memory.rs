use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{AuthorizationEngine, AuthzError, RobotGrants, Subject};
use crate::models::Policy;

#[derive(Default)]
struct State {
    grants: HashMap<i64, RobotGrants>,
    owners: HashSet<(i64, String)>,
}

/// Process-local authorization engine, paired with the in-memory robot store.
#[derive(Default)]
pub struct MemoryAuthorizationEngine {
    state: RwLock<State>,
}

impl MemoryAuthorizationEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorizationEngine for MemoryAuthorizationEngine {
    async fn record_grants(
        &self,
        robot_id: i64,
        project_id: i64,
        policies: &[Policy],
    ) -> Result<(), AuthzError> {
        let mut state = self.state.write();
        if policies.is_empty() {
            state.grants.remove(&robot_id);
        } else {
            state.grants.insert(
                robot_id,
                RobotGrants {
                    robot_id,
                    project_id,
                    policies: policies.to_vec(),
                },
            );
        }
        Ok(())
    }

    async fn grants_for(&self, robot_id: i64) -> Result<Option<RobotGrants>, AuthzError> {
        Ok(self.state.read().grants.get(&robot_id).cloned())
    }

    async fn revoke_grants(&self, robot_id: i64) -> Result<(), AuthzError> {
        self.state.write().grants.remove(&robot_id);
        Ok(())
    }

    async fn is_project_owner(
        &self,
        subject: &Subject,
        project_id: i64,
    ) -> Result<bool, AuthzError> {
        if subject.is_admin {
            return Ok(true);
        }
        Ok(self
            .state
            .read()
            .owners
            .contains(&(project_id, subject.id.clone())))
    }

    async fn add_project_owner(&self, project_id: i64, subject_id: &str) -> Result<(), AuthzError> {
        self.state
            .write()
            .owners
            .insert((project_id, subject_id.to_string()));
        Ok(())
    }
}
