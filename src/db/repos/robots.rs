use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    db::error::DbResult,
    models::{Expiration, Robot, RobotPage, RobotQuery},
};

/// A robot row ready to be inserted.
///
/// Carries the hash of the issued secret, which is stored alongside the robot
/// but never read back into [`Robot`].
#[derive(Debug, Clone)]
pub struct NewRobot {
    pub name: String,
    pub description: Option<String>,
    pub project_id: i64,
    pub expires_at: Expiration,
    pub disabled: bool,
    pub visible: bool,
    pub secret_hash: String,
    pub created_at: DateTime<Utc>,
}

impl NewRobot {
    /// Materialize the row with the id assigned by the store.
    pub fn into_robot(self, id: i64) -> Robot {
        Robot {
            id,
            name: self.name,
            description: self.description,
            project_id: self.project_id,
            expires_at: self.expires_at,
            disabled: self.disabled,
            visible: self.visible,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Result of [`RobotRepo::enable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnableOutcome {
    Enabled(Robot),
    /// Left untouched because its expiration has passed
    Expired { expires_at: i64 },
}

#[async_trait]
pub trait RobotRepo: Send + Sync {
    /// Insert a robot and assign its id.
    ///
    /// Fails with `Conflict` when a visible robot with the same name already
    /// exists in the project. The check and the insert are one atomic step.
    /// A secret hash already held by another robot fails with `Internal`.
    async fn create(&self, input: NewRobot) -> DbResult<Robot>;

    async fn get_by_id(&self, id: i64) -> DbResult<Option<Robot>>;

    /// Look up the robot whose current secret hashes to `secret_hash`.
    async fn get_by_secret_hash(&self, secret_hash: &str) -> DbResult<Option<Robot>>;

    /// Run a query: filters, (creation time, id) ordering, then pagination.
    async fn list(&self, query: &RobotQuery) -> DbResult<RobotPage>;

    /// Set the disabled flag. Disabling a disabled robot succeeds.
    ///
    /// Touches only `disabled` and `updated_at`. Returns `NotFound` if the
    /// robot no longer exists.
    async fn disable(&self, id: i64, updated_at: DateTime<Utc>) -> DbResult<Robot>;

    /// Clear the disabled flag unless the robot has expired at `now`.
    ///
    /// The expiry check and the write are one atomic step.
    async fn enable(&self, id: i64, now: DateTime<Utc>) -> DbResult<EnableOutcome>;

    /// Replace the description, leaving every other column alone.
    async fn update_description(
        &self,
        id: i64,
        description: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> DbResult<Robot>;

    /// Replace the stored secret hash, invalidating the previous secret.
    ///
    /// A hash already held by another robot is rejected as `Internal`.
    async fn update_secret_hash(
        &self,
        id: i64,
        secret_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> DbResult<()>;

    /// Hard-delete a robot. Returns `NotFound` if it does not exist.
    async fn delete(&self, id: i64) -> DbResult<()>;
}
