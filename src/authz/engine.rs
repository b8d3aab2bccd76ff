use async_trait::async_trait;

use super::{AuthzError, pattern_matches};
use crate::models::{Action, Policy, Resource};

/// The caller of a management operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Subject {
    /// Stable identifier of the user or system component
    pub id: String,
    /// System administrators own every project
    pub is_admin: bool,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: false,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: true,
        }
    }
}

/// Grants recorded for one robot, in the order they were requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotGrants {
    pub robot_id: i64,
    pub project_id: i64,
    pub policies: Vec<Policy>,
}

impl RobotGrants {
    /// Whether any grant allows `action` on `resource` in `project_id`.
    ///
    /// `path` is the resource path below the resource kind (e.g. a repository
    /// name). Unscoped grants cover every path; scoped grants are matched with
    /// trailing-`*` prefix patterns.
    pub fn permits(
        &self,
        project_id: i64,
        resource: Resource,
        action: Action,
        path: Option<&str>,
    ) -> bool {
        if project_id != self.project_id {
            return false;
        }
        self.policies.iter().any(|policy| {
            policy.resource == resource
                && policy.action == action
                && match (&policy.scope, path) {
                    (None, _) => true,
                    (Some(scope), Some(path)) => pattern_matches(
                        scope.trim_start_matches('/'),
                        path.trim_start_matches('/'),
                    ),
                    (Some(_), None) => false,
                }
        })
    }
}

/// External authority that owns permission grants and project ownership.
///
/// Robot lifecycle code only records and revokes grants through this trait;
/// evaluating them against requests happens here too.
#[async_trait]
pub trait AuthorizationEngine: Send + Sync {
    /// Record the grants of a newly created robot, replacing any previous ones.
    async fn record_grants(
        &self,
        robot_id: i64,
        project_id: i64,
        policies: &[Policy],
    ) -> Result<(), AuthzError>;

    /// Grants of a robot, or `None` if it holds none.
    async fn grants_for(&self, robot_id: i64) -> Result<Option<RobotGrants>, AuthzError>;

    /// Drop every grant of a robot. Revoking a robot without grants is not an error.
    async fn revoke_grants(&self, robot_id: i64) -> Result<(), AuthzError>;

    /// Whether `subject` may manage robots of `project_id`.
    async fn is_project_owner(&self, subject: &Subject, project_id: i64)
    -> Result<bool, AuthzError>;

    /// Make `subject_id` an owner of `project_id`.
    async fn add_project_owner(&self, project_id: i64, subject_id: &str)
    -> Result<(), AuthzError>;

    /// Evaluate a request made by a robot against its recorded grants.
    async fn allows(
        &self,
        robot_id: i64,
        project_id: i64,
        resource: Resource,
        action: Action,
        path: Option<&str>,
    ) -> Result<bool, AuthzError> {
        Ok(self
            .grants_for(robot_id)
            .await?
            .is_some_and(|grants| grants.permits(project_id, resource, action, path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grants(policies: Vec<Policy>) -> RobotGrants {
        RobotGrants {
            robot_id: 1,
            project_id: 5,
            policies,
        }
    }

    #[test]
    fn test_unscoped_grant_covers_any_path() {
        let g = grants(vec![Policy::new(Resource::Repository, Action::Pull)]);
        assert!(g.permits(5, Resource::Repository, Action::Pull, None));
        assert!(g.permits(5, Resource::Repository, Action::Pull, Some("library/nginx")));
        assert!(!g.permits(5, Resource::Repository, Action::Push, None));
        assert!(!g.permits(5, Resource::Artifact, Action::Pull, None));
    }

    #[test]
    fn test_grants_bound_to_project() {
        let g = grants(vec![Policy::new(Resource::Repository, Action::Pull)]);
        assert!(!g.permits(6, Resource::Repository, Action::Pull, None));
    }

    #[test]
    fn test_scoped_grant_matches_prefix() {
        let g = grants(vec![
            Policy::new(Resource::Repository, Action::Push).with_scope("/library/*"),
        ]);
        assert!(g.permits(5, Resource::Repository, Action::Push, Some("library/nginx")));
        assert!(!g.permits(5, Resource::Repository, Action::Push, Some("team/app")));
        assert!(!g.permits(5, Resource::Repository, Action::Push, None));
    }

    #[test]
    fn test_empty_grants_permit_nothing() {
        let g = grants(Vec::new());
        assert!(!g.permits(5, Resource::Repository, Action::Pull, None));
    }
}
