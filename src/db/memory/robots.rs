use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{EnableOutcome, NewRobot, RobotRepo},
    },
    models::{LifecycleError, Robot, RobotPage, RobotQuery},
};

struct StoredRobot {
    robot: Robot,
    secret_hash: String,
}

#[derive(Default)]
struct State {
    last_id: i64,
    rows: BTreeMap<i64, StoredRobot>,
}

impl State {
    fn hash_taken(&self, secret_hash: &str, except: Option<i64>) -> bool {
        self.rows
            .iter()
            .any(|(id, row)| Some(*id) != except && row.secret_hash == secret_hash)
    }

    fn row_mut(&mut self, id: i64) -> DbResult<&mut StoredRobot> {
        self.rows.get_mut(&id).ok_or(DbError::NotFound)
    }
}

fn hash_collision() -> DbError {
    DbError::Internal("secret hash already assigned to another robot".to_string())
}

/// Process-local robot store. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryRobotRepo {
    state: RwLock<State>,
}

impl MemoryRobotRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RobotRepo for MemoryRobotRepo {
    async fn create(&self, input: NewRobot) -> DbResult<Robot> {
        let mut state = self.state.write();

        if input.visible
            && state.rows.values().any(|row| {
                row.robot.visible
                    && row.robot.project_id == input.project_id
                    && row.robot.name == input.name
            })
        {
            return Err(DbError::Conflict(format!(
                "Robot with name '{}' already exists in project {}",
                input.name, input.project_id
            )));
        }
        if state.hash_taken(&input.secret_hash, None) {
            return Err(hash_collision());
        }

        state.last_id += 1;
        let id = state.last_id;
        let secret_hash = input.secret_hash.clone();
        let robot = input.into_robot(id);
        state.rows.insert(
            id,
            StoredRobot {
                robot: robot.clone(),
                secret_hash,
            },
        );

        Ok(robot)
    }

    async fn get_by_id(&self, id: i64) -> DbResult<Option<Robot>> {
        Ok(self.state.read().rows.get(&id).map(|row| row.robot.clone()))
    }

    async fn get_by_secret_hash(&self, secret_hash: &str) -> DbResult<Option<Robot>> {
        Ok(self
            .state
            .read()
            .rows
            .values()
            .find(|row| row.secret_hash == secret_hash)
            .map(|row| row.robot.clone()))
    }

    async fn list(&self, query: &RobotQuery) -> DbResult<RobotPage> {
        let state = self.state.read();
        Ok(query.select(state.rows.values().map(|row| &row.robot)))
    }

    async fn disable(&self, id: i64, updated_at: DateTime<Utc>) -> DbResult<Robot> {
        let mut state = self.state.write();
        let row = state.row_mut(id)?;

        row.robot = row.robot.clone().disable(updated_at);
        Ok(row.robot.clone())
    }

    async fn enable(&self, id: i64, now: DateTime<Utc>) -> DbResult<EnableOutcome> {
        let mut state = self.state.write();
        let row = state.row_mut(id)?;

        match row.robot.clone().enable(now) {
            Ok(robot) => {
                row.robot = robot.clone();
                Ok(EnableOutcome::Enabled(robot))
            }
            Err(LifecycleError::Expired { expires_at }) => {
                Ok(EnableOutcome::Expired { expires_at })
            }
        }
    }

    async fn update_description(
        &self,
        id: i64,
        description: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> DbResult<Robot> {
        let mut state = self.state.write();
        let row = state.row_mut(id)?;

        row.robot.description = description.map(str::to_string);
        row.robot.updated_at = updated_at;
        Ok(row.robot.clone())
    }

    async fn update_secret_hash(
        &self,
        id: i64,
        secret_hash: &str,
        updated_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let mut state = self.state.write();
        if !state.rows.contains_key(&id) {
            return Err(DbError::NotFound);
        }
        if state.hash_taken(secret_hash, Some(id)) {
            return Err(hash_collision());
        }

        let row = state.row_mut(id)?;
        row.secret_hash = secret_hash.to_string();
        row.robot.updated_at = updated_at;

        Ok(())
    }

    async fn delete(&self, id: i64) -> DbResult<()> {
        self.state
            .write()
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(DbError::NotFound)
    }
}
