use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use super::{AuthorizationEngine, AuthzError, RobotGrants, Subject};
use crate::models::{Action, Policy, Resource};

/// Authorization engine persisting grants next to the robots table.
pub struct SqliteAuthorizationEngine {
    pool: SqlitePool,
}

impl SqliteAuthorizationEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationEngine for SqliteAuthorizationEngine {
    async fn record_grants(
        &self,
        robot_id: i64,
        project_id: i64,
        policies: &[Policy],
    ) -> Result<(), AuthzError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM robot_grants WHERE robot_id = ?")
            .bind(robot_id)
            .execute(&mut *tx)
            .await?;

        for (position, policy) in policies.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO robot_grants (robot_id, project_id, position, resource, action, scope)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(robot_id)
            .bind(project_id)
            .bind(position as i64)
            .bind(policy.resource.as_str())
            .bind(policy.action.as_str())
            .bind(&policy.scope)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn grants_for(&self, robot_id: i64) -> Result<Option<RobotGrants>, AuthzError> {
        let rows = sqlx::query(
            r#"
            SELECT project_id, resource, action, scope
            FROM robot_grants
            WHERE robot_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(robot_id)
        .fetch_all(&self.pool)
        .await?;

        let Some(first) = rows.first() else {
            return Ok(None);
        };
        let project_id: i64 = first.get("project_id");

        let policies = rows
            .iter()
            .map(|row| {
                let resource: Resource = row
                    .get::<String, _>("resource")
                    .parse()
                    .map_err(AuthzError::Internal)?;
                let action: Action = row
                    .get::<String, _>("action")
                    .parse()
                    .map_err(AuthzError::Internal)?;
                Ok(Policy {
                    resource,
                    action,
                    scope: row.get("scope"),
                })
            })
            .collect::<Result<Vec<_>, AuthzError>>()?;

        Ok(Some(RobotGrants {
            robot_id,
            project_id,
            policies,
        }))
    }

    async fn revoke_grants(&self, robot_id: i64) -> Result<(), AuthzError> {
        sqlx::query("DELETE FROM robot_grants WHERE robot_id = ?")
            .bind(robot_id)
            .execute(&self.pool)
            .await?;
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
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM project_owners WHERE project_id = ? AND subject = ?",
        )
        .bind(project_id)
        .bind(&subject.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("count") > 0)
    }

    async fn add_project_owner(&self, project_id: i64, subject_id: &str) -> Result<(), AuthzError> {
        sqlx::query("INSERT OR IGNORE INTO project_owners (project_id, subject) VALUES (?, ?)")
            .bind(project_id)
            .bind(subject_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
