use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{EnableOutcome, NewRobot, RobotRepo},
    },
    models::{Expiration, NameFilter, Robot, RobotPage, RobotQuery},
};

const ROBOT_COLUMNS: &str =
    "id, name, description, project_id, expires_at, disabled, visible, created_at, updated_at";

/// Map a write error, telling a secret hash collision apart from a name conflict.
fn map_write_error(err: sqlx::Error, name_conflict: impl FnOnce() -> DbError) -> DbError {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            // SQLite names the violated columns: "UNIQUE constraint failed: robots.secret_hash"
            if db_err.message().contains("secret_hash") {
                DbError::Internal("secret hash already assigned to another robot".to_string())
            } else {
                name_conflict()
            }
        }
        other => DbError::from(other),
    }
}

/// Bind value for dynamically built queries.
enum Param {
    Int(i64),
    Text(String),
}

pub struct SqliteRobotRepo {
    pool: SqlitePool,
}

impl SqliteRobotRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_robot(row: &SqliteRow) -> DbResult<Robot> {
        let id: i64 = row.get("id");
        let raw_expiry: i64 = row.get("expires_at");
        let expires_at = Expiration::from_epoch(raw_expiry).ok_or_else(|| {
            DbError::Internal(format!(
                "robot {} has invalid expires_at {}",
                id, raw_expiry
            ))
        })?;

        Ok(Robot {
            id,
            name: row.get("name"),
            description: row.get("description"),
            project_id: row.get("project_id"),
            expires_at,
            disabled: row.get("disabled"),
            visible: row.get("visible"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    /// WHERE clause and bind values for the filter part of a query.
    fn build_filter(query: &RobotQuery) -> (String, Vec<Param>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if query.project_id != crate::models::ALL_PROJECTS {
            conditions.push("project_id = ?");
            params.push(Param::Int(query.project_id));
        }
        if !query.include_hidden {
            conditions.push("visible = 1");
        }
        if let Some(disabled) = query.disabled.required() {
            conditions.push("disabled = ?");
            params.push(Param::Int(i64::from(disabled)));
        }
        match &query.name {
            Some(NameFilter::Exact(name)) => {
                conditions.push("name = ?");
                params.push(Param::Text(name.clone()));
            }
            // instr is case-sensitive, unlike LIKE
            Some(NameFilter::Contains(needle)) => {
                conditions.push("instr(name, ?) > 0");
                params.push(Param::Text(needle.clone()));
            }
            None => {}
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }
}

#[async_trait]
impl RobotRepo for SqliteRobotRepo {
    async fn create(&self, input: NewRobot) -> DbResult<Robot> {
        let result = sqlx::query(
            r#"
            INSERT INTO robots (name, description, project_id, expires_at, disabled, visible, secret_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.project_id)
        .bind(input.expires_at.as_epoch())
        .bind(input.disabled)
        .bind(input.visible)
        .bind(&input.secret_hash)
        .bind(input.created_at)
        .bind(input.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_write_error(e, || {
                DbError::Conflict(format!(
                    "Robot with name '{}' already exists in project {}",
                    input.name, input.project_id
                ))
            })
        })?;

        Ok(input.into_robot(result.last_insert_rowid()))
    }

    async fn get_by_id(&self, id: i64) -> DbResult<Option<Robot>> {
        let sql = format!("SELECT {} FROM robots WHERE id = ?", ROBOT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_robot).transpose()
    }

    async fn get_by_secret_hash(&self, secret_hash: &str) -> DbResult<Option<Robot>> {
        let sql = format!("SELECT {} FROM robots WHERE secret_hash = ?", ROBOT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(secret_hash)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::parse_robot).transpose()
    }

    async fn list(&self, query: &RobotQuery) -> DbResult<RobotPage> {
        let (where_clause, params) = Self::build_filter(query);

        let count_sql = format!("SELECT COUNT(*) as count FROM robots {}", where_clause);
        let mut count_query = sqlx::query(&count_sql);
        for param in &params {
            count_query = match param {
                Param::Int(value) => count_query.bind(*value),
                Param::Text(value) => count_query.bind(value.as_str()),
            };
        }
        let count_row = count_query.fetch_one(&self.pool).await?;
        let total: i64 = count_row.get("count");

        let list_sql = format!(
            "SELECT {} FROM robots {} ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?",
            ROBOT_COLUMNS, where_clause
        );
        let limit = i64::try_from(query.pagination.size).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.pagination.offset()).unwrap_or(i64::MAX);
        let mut list_query = sqlx::query(&list_sql);
        for param in &params {
            list_query = match param {
                Param::Int(value) => list_query.bind(*value),
                Param::Text(value) => list_query.bind(value.as_str()),
            };
        }
        let rows = list_query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .iter()
            .map(Self::parse_robot)
            .collect::<DbResult<Vec<_>>>()?;

        Ok(RobotPage::new(
            items,
            u64::try_from(total).unwrap_or_default(),
            query.pagination,
        ))
    }

    async fn disable(&self, id: i64, updated_at: DateTime<Utc>) -> DbResult<Robot> {
        let result = sqlx::query("UPDATE robots SET disabled = 1, updated_at = ? WHERE id = ?")
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    async fn enable(&self, id: i64, now: DateTime<Utc>) -> DbResult<EnableOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE robots
            SET disabled = 0, updated_at = ?
            WHERE id = ? AND (expires_at = -1 OR expires_at >= ?)
            "#,
        )
        .bind(now)
        .bind(id)
        .bind(now.timestamp())
        .execute(&self.pool)
        .await?;

        let robot = self.get_by_id(id).await?.ok_or(DbError::NotFound)?;
        if result.rows_affected() == 0 {
            return Ok(EnableOutcome::Expired {
                expires_at: robot.expires_at.as_epoch(),
            });
        }

        Ok(EnableOutcome::Enabled(robot))
    }

    async fn update_description(
        &self,
        id: i64,
        description: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> DbResult<Robot> {
        let result = sqlx::query("UPDATE robots SET description = ?, updated_at = ? WHERE id = ?")
            .bind(description)
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    async fn update_secret_hash(
        &self,
        id: i64,
        secret_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE robots SET secret_hash = ?, updated_at = ? WHERE id = ?")
            .bind(secret_hash)
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                map_write_error(e, || {
                    DbError::Internal(format!("unexpected unique violation updating robot {}", id))
                })
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM robots WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}
