use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Kind of registry resource a robot can be granted access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    /// Repositories within the project (`pull`/`push` live here)
    Repository,
    /// Individual artifacts (manifests, indexes)
    Artifact,
    /// Tags attached to artifacts
    Tag,
    /// Helm charts stored in the project
    HelmChart,
    /// Individual Helm chart versions
    HelmChartVersion,
    /// Project labels
    Label,
    /// Vulnerability scans
    Scan,
    /// Labels attached to artifacts
    ArtifactLabel,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Repository => "repository",
            Resource::Artifact => "artifact",
            Resource::Tag => "tag",
            Resource::HelmChart => "helm-chart",
            Resource::HelmChartVersion => "helm-chart-version",
            Resource::Label => "label",
            Resource::Scan => "scan",
            Resource::ArtifactLabel => "artifact-label",
        }
    }

    pub fn all_values() -> &'static [Resource] {
        &[
            Resource::Repository,
            Resource::Artifact,
            Resource::Tag,
            Resource::HelmChart,
            Resource::HelmChartVersion,
            Resource::Label,
            Resource::Scan,
            Resource::ArtifactLabel,
        ]
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::all_values()
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Resource::all_values().iter().map(|r| r.as_str()).collect();
                format!("Invalid resource '{}'. Valid resources: {}", s, names.join(", "))
            })
    }
}

/// Action a robot may perform on a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Pull,
    Push,
    Read,
    List,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Pull => "pull",
            Action::Push => "push",
            Action::Read => "read",
            Action::List => "list",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    pub fn all_values() -> &'static [Action] {
        &[
            Action::Pull,
            Action::Push,
            Action::Read,
            Action::List,
            Action::Create,
            Action::Update,
            Action::Delete,
        ]
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::all_values()
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Action::all_values().iter().map(|a| a.as_str()).collect();
                format!("Invalid action '{}'. Valid actions: {}", s, names.join(", "))
            })
    }
}

/// A single permission grant: one action on one kind of resource, optionally
/// narrowed by a scope qualifier (a sub-path or tag pattern).
///
/// Policies have no identity of their own. They are supplied with a creation
/// request and handed to the authorization engine, which owns them afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Policy {
    pub resource: Resource,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Policy {
    pub fn new(resource: Resource, action: Action) -> Self {
        Self {
            resource,
            action,
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_round_trips_through_str() {
        for resource in Resource::all_values() {
            assert_eq!(Resource::from_str(resource.as_str()).unwrap(), *resource);
        }
        assert!(Resource::from_str("project").is_err());
    }

    #[test]
    fn test_action_from_str_rejects_unknown() {
        assert_eq!(Action::from_str("pull").unwrap(), Action::Pull);
        let err = Action::from_str("pul").unwrap_err();
        assert!(err.contains("Valid actions"));
    }

    #[test]
    fn test_policy_json_shape() {
        let policy: Policy =
            serde_json::from_str(r#"{"resource":"helm-chart-version","action":"read"}"#).unwrap();
        assert_eq!(policy, Policy::new(Resource::HelmChartVersion, Action::Read));

        let json = serde_json::to_string(&policy).unwrap();
        assert!(!json.contains("scope"));
    }
}
