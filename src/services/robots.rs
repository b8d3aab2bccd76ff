use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use validator::Validate;

use crate::{
    authz::{self, AuthorizationEngine, AuthzError, Subject},
    config::{RobotSettings, RobotsConfig},
    db::{DbError, DbPool, EnableOutcome, NewRobot},
    models::{
        Action, CreateRobot, Expiration, FieldError, FieldErrorKind, NEVER_EXPIRES, Policy,
        RandomSecretGenerator, Resource, Robot, RobotCredential, RobotPage, RobotQuery,
        RobotStatus, SecretGenerator, hash_secret, login_name, validate_create_robot,
    },
};

/// Lifecycle manager for robot accounts.
///
/// Owns every mutation of a robot: creation (with its one-time credential),
/// enable/disable, secret regeneration and deletion. Storage and grant
/// bookkeeping are delegated to the repository and the authorization engine.
#[derive(Clone)]
pub struct RobotService {
    db: Arc<DbPool>,
    authz: Arc<dyn AuthorizationEngine>,
    secrets: Arc<dyn SecretGenerator>,
    settings: Arc<RobotSettings>,
}

impl RobotService {
    pub fn new(
        db: Arc<DbPool>,
        authz: Arc<dyn AuthorizationEngine>,
        settings: RobotSettings,
    ) -> Self {
        Self {
            secrets: Arc::new(RandomSecretGenerator::new(settings.secret_prefix.clone())),
            db,
            authz,
            settings: Arc::new(settings),
        }
    }

    /// Open the configured storage and a matching authorization engine.
    pub async fn from_config(config: &RobotsConfig) -> Result<Self, RobotError> {
        let db = Arc::new(DbPool::from_config(&config.database).await?);
        let authz = authz::engine_for(&db);
        Ok(Self::new(db, authz, config.robots.clone()))
    }

    /// Replace the secret source.
    pub fn with_secret_generator(mut self, secrets: Arc<dyn SecretGenerator>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn settings(&self) -> &RobotSettings {
        &self.settings
    }

    /// Create a robot from a request and issue its credential.
    ///
    /// The returned [`RobotCredential`] is the only place the secret ever
    /// appears; the store keeps its hash.
    pub async fn create(
        &self,
        input: CreateRobot,
    ) -> Result<(Robot, RobotCredential), RobotError> {
        validate_create_robot(&input).map_err(RobotError::Validation)?;

        let now = Utc::now().trunc_subsecs(3);
        let expires_at = self.resolve_expiration(input.expires_at, now)?;

        let CreateRobot {
            name,
            project_id,
            description,
            disabled,
            visible,
            policies,
            ..
        } = input;

        let secret = self.secrets.generate();
        let robot = self
            .db
            .robots()
            .create(NewRobot {
                name: name.clone(),
                description,
                project_id,
                expires_at,
                disabled,
                visible,
                secret_hash: hash_secret(&secret),
                created_at: now,
            })
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => RobotError::DuplicateName { name, project_id },
                other => RobotError::from(other),
            })?;

        if let Err(e) = self
            .authz
            .record_grants(robot.id, robot.project_id, &policies)
            .await
        {
            tracing::warn!(
                robot_id = robot.id,
                project_id = robot.project_id,
                error = %e,
                "Failed to record robot grants, removing robot"
            );
            if let Err(cleanup) = self.db.robots().delete(robot.id).await {
                tracing::warn!(
                    robot_id = robot.id,
                    error = %cleanup,
                    "Failed to remove robot after grant failure"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            robot_id = robot.id,
            project_id = robot.project_id,
            name = %robot.name,
            expires_at = robot.expires_at.as_epoch(),
            policies = policies.len(),
            "Created robot account"
        );

        let credential = RobotCredential::new(
            login_name(&self.settings.name_prefix, &robot.name),
            secret,
        );
        Ok((robot, credential))
    }

    /// Map the requested epoch value to a concrete expiration at `now`.
    fn resolve_expiration(
        &self,
        requested: i64,
        now: DateTime<Utc>,
    ) -> Result<Expiration, RobotError> {
        match requested {
            NEVER_EXPIRES => Ok(Expiration::Never),
            0 => Ok(Expiration::At(
                now.timestamp()
                    .saturating_add(self.settings.default_token_duration_secs()),
            )),
            at if at > now.timestamp() => Ok(Expiration::At(at)),
            at => Err(RobotError::Validation(vec![FieldError::new(
                "expires_at",
                FieldErrorKind::InvalidExpiration,
                format!("expiration time {} is not in the future", at),
            )])),
        }
    }

    pub async fn get(&self, id: i64) -> Result<Robot, RobotError> {
        self.db
            .robots()
            .get_by_id(id)
            .await?
            .ok_or(RobotError::NotFound)
    }

    pub async fn list(&self, query: &RobotQuery) -> Result<RobotPage, RobotError> {
        query
            .validate()
            .map_err(|e| RobotError::InvalidQuery(e.to_string()))?;
        if query.pagination.size > self.settings.max_page_size {
            return Err(RobotError::InvalidQuery(format!(
                "page size {} exceeds the maximum of {}",
                query.pagination.size, self.settings.max_page_size
            )));
        }

        Ok(self.db.robots().list(query).await?)
    }

    /// Disable a robot. Disabling a disabled robot succeeds.
    pub async fn disable(&self, id: i64) -> Result<Robot, RobotError> {
        let robot = self
            .db
            .robots()
            .disable(id, Utc::now().trunc_subsecs(3))
            .await?;

        tracing::info!(robot_id = id, project_id = robot.project_id, "Disabled robot account");
        Ok(robot)
    }

    /// Re-enable a robot. Fails with [`RobotError::Expired`] once it has expired.
    pub async fn enable(&self, id: i64) -> Result<Robot, RobotError> {
        let outcome = self
            .db
            .robots()
            .enable(id, Utc::now().trunc_subsecs(3))
            .await?;

        match outcome {
            EnableOutcome::Enabled(robot) => {
                tracing::info!(
                    robot_id = id,
                    project_id = robot.project_id,
                    "Enabled robot account"
                );
                Ok(robot)
            }
            EnableOutcome::Expired { expires_at } => Err(RobotError::Expired { id, expires_at }),
        }
    }

    pub async fn update_description(
        &self,
        id: i64,
        description: Option<String>,
    ) -> Result<Robot, RobotError> {
        Ok(self
            .db
            .robots()
            .update_description(id, description.as_deref(), Utc::now().trunc_subsecs(3))
            .await?)
    }

    /// Permanently remove a robot and its grants.
    ///
    /// Only owners of the robot's project may do this.
    pub async fn delete(&self, caller: &Subject, id: i64) -> Result<(), RobotError> {
        let robot = self.get(id).await?;

        if !self
            .authz
            .is_project_owner(caller, robot.project_id)
            .await?
        {
            tracing::warn!(
                robot_id = id,
                project_id = robot.project_id,
                caller = %caller.id,
                "Rejected robot deletion by non-owner"
            );
            return Err(RobotError::Forbidden(format!(
                "'{}' is not an owner of project {}",
                caller.id, robot.project_id
            )));
        }

        // Grants go first so a failed delete never leaves a robot with stale access
        self.authz.revoke_grants(id).await?;
        self.db.robots().delete(id).await?;

        tracing::info!(
            robot_id = id,
            project_id = robot.project_id,
            caller = %caller.id,
            "Deleted robot account"
        );
        Ok(())
    }

    /// Issue a new secret, invalidating the previous one.
    pub async fn regenerate_secret(&self, id: i64) -> Result<RobotCredential, RobotError> {
        let robot = self.get(id).await?;

        let secret = self.secrets.generate();
        self.db
            .robots()
            .update_secret_hash(id, &hash_secret(&secret), Utc::now().trunc_subsecs(3))
            .await?;

        tracing::info!(robot_id = id, project_id = robot.project_id, "Regenerated robot secret");
        Ok(RobotCredential::new(
            login_name(&self.settings.name_prefix, &robot.name),
            secret,
        ))
    }

    /// Resolve a presented login name and secret to a usable robot.
    pub async fn authenticate(&self, login: &str, secret: &str) -> Result<Robot, RobotError> {
        let Some(name) = login.strip_prefix(self.settings.name_prefix.as_str()) else {
            tracing::warn!(login = %login, "Robot login without the robot name prefix");
            return Err(RobotError::InvalidCredential);
        };

        let robot = match self
            .db
            .robots()
            .get_by_secret_hash(&hash_secret(secret))
            .await?
        {
            Some(robot) if robot.name == name => robot,
            Some(robot) => {
                tracing::debug!(
                    login = %login,
                    robot_id = robot.id,
                    "Robot secret belongs to a different login name"
                );
                tracing::warn!(login = %login, "Rejected robot credential");
                return Err(RobotError::InvalidCredential);
            }
            None => {
                tracing::debug!(login = %login, "No robot holds the presented secret");
                tracing::warn!(login = %login, "Rejected robot credential");
                return Err(RobotError::InvalidCredential);
            }
        };

        match robot.status(Utc::now()) {
            RobotStatus::Active => Ok(robot),
            RobotStatus::Disabled => {
                tracing::warn!(robot_id = robot.id, "Rejected login of disabled robot");
                Err(RobotError::Disabled(robot.id))
            }
            RobotStatus::Expired => {
                tracing::warn!(robot_id = robot.id, "Rejected login of expired robot");
                Err(RobotError::Expired {
                    id: robot.id,
                    expires_at: robot.expires_at.as_epoch(),
                })
            }
        }
    }

    /// Grants recorded for a robot, in request order.
    pub async fn policies(&self, id: i64) -> Result<Vec<Policy>, RobotError> {
        let robot = self.get(id).await?;
        Ok(self
            .authz
            .grants_for(robot.id)
            .await?
            .map(|grants| grants.policies)
            .unwrap_or_default())
    }

    /// Whether a robot may perform `action` on `resource` in its project right now.
    ///
    /// Unusable robots (disabled or expired) are denied before grants are consulted.
    pub async fn authorize(
        &self,
        id: i64,
        resource: Resource,
        action: Action,
        path: Option<&str>,
    ) -> Result<bool, RobotError> {
        let robot = self.get(id).await?;
        if !robot.is_usable(Utc::now()) {
            return Ok(false);
        }

        Ok(self
            .authz
            .allows(robot.id, robot.project_id, resource, action, path)
            .await?)
    }
}

/// Errors surfaced by [`RobotService`].
#[derive(Debug, thiserror::Error)]
pub enum RobotError {
    /// Every validation failure of a creation request
    #[error("Invalid robot request: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("Robot '{name}' already exists in project {project_id}")]
    DuplicateName { name: String, project_id: i64 },

    #[error("Robot {id} expired at {expires_at}")]
    Expired { id: i64, expires_at: i64 },

    #[error("Robot not found")]
    NotFound,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Robot {0} is disabled")]
    Disabled(i64),

    #[error("Invalid robot credential")]
    InvalidCredential,

    #[error("Database error: {0}")]
    Database(#[source] DbError),

    #[error("Authorization error: {0}")]
    Authz(#[from] AuthzError),
}

impl From<DbError> for RobotError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => RobotError::NotFound,
            other => RobotError::Database(other),
        }
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Flat classification of [`RobotError`] for transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RobotErrorKind {
    InvalidName,
    InvalidExpiration,
    DuplicateName,
    Expired,
    NotFound,
    InvalidQuery,
    Forbidden,
    Disabled,
    InvalidCredential,
    Internal,
}

impl RobotError {
    /// Kind of the error; for validation failures, the kind of the first violation.
    pub fn kind(&self) -> RobotErrorKind {
        match self {
            RobotError::Validation(errors) => match errors.first().map(|e| e.kind) {
                Some(FieldErrorKind::InvalidExpiration) => RobotErrorKind::InvalidExpiration,
                _ => RobotErrorKind::InvalidName,
            },
            RobotError::DuplicateName { .. } => RobotErrorKind::DuplicateName,
            RobotError::Expired { .. } => RobotErrorKind::Expired,
            RobotError::NotFound => RobotErrorKind::NotFound,
            RobotError::InvalidQuery(_) => RobotErrorKind::InvalidQuery,
            RobotError::Forbidden(_) => RobotErrorKind::Forbidden,
            RobotError::Disabled(_) => RobotErrorKind::Disabled,
            RobotError::InvalidCredential => RobotErrorKind::InvalidCredential,
            RobotError::Database(_) | RobotError::Authz(_) => RobotErrorKind::Internal,
        }
    }

    /// Field-level violations, empty for every other kind.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            RobotError::Validation(errors) => errors,
            _ => &[],
        }
    }
}
