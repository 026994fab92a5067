use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::debug;

use crate::config::DbConfig;
use crate::models::{NewTask, Task};

// Each row is projected to a JSON object by the database and decoded into `Task`.
const SELECT_TASKS: &str = "SELECT json_build_object(
        'id', id,
        'title', title,
        'description', COALESCE(description, ''),
        'due_date', due_date,
        'completed', completed
    ) AS json_data
    FROM tasks";

/// Storage operations needed by the HTTP handlers.
#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    async fn get_tasks(&self) -> anyhow::Result<Vec<Task>>;

    async fn get_task(&self, task_id: i64) -> anyhow::Result<Option<Task>>;

    async fn create_task(&self, task: &NewTask) -> anyhow::Result<i64>;

    /// Returns whether a row was deleted.
    async fn delete_task(&self, task_id: i64) -> anyhow::Result<bool>;

    /// Returns whether a row matched; completing a completed task still matches.
    async fn complete_task(&self, task_id: i64) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    pub async fn connect(config: &DbConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options())
            .await?;

        Ok(Db::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Db { pool }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TaskStore for Db {
    async fn get_tasks(&self) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_scalar::<_, Json<Task>>(&format!("{SELECT_TASKS} WHERE id >= 1"))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "fetched tasks");
        Ok(rows.into_iter().map(|Json(task)| task).collect())
    }

    async fn get_task(&self, task_id: i64) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_scalar::<_, Json<Task>>(&format!("{SELECT_TASKS} WHERE id = $1"))
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|Json(task)| task))
    }

    async fn create_task(&self, task: &NewTask) -> anyhow::Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO tasks (title, description, due_date, completed)
             VALUES ($1, $2, $3, $4)
             RETURNING id::bigint",
        )
        .bind(task.title())
        .bind(task.description())
        .bind(task.due_date())
        .bind(false)
        .fetch_one(&self.pool)
        .await?;

        debug!(task_id = id, "created task");
        Ok(id)
    }

    async fn delete_task(&self, task_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn complete_task(&self, task_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE tasks SET completed = true WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, Ordering};

    use super::*;

    /// In-process stand-in for the `tasks` table.
    #[derive(Default)]
    pub struct MemoryStore {
        rows: Mutex<Vec<Task>>,
        next_id: AtomicI64,
    }

    impl MemoryStore {
        pub fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TaskStore for MemoryStore {
        async fn get_tasks(&self) -> anyhow::Result<Vec<Task>> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn get_task(&self, task_id: i64) -> anyhow::Result<Option<Task>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().find(|t| t.id == task_id).cloned())
        }

        async fn create_task(&self, task: &NewTask) -> anyhow::Result<i64> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            self.rows.lock().unwrap().push(Task {
                id,
                title: task.title().to_string(),
                description: task.description().to_string(),
                due_date: task.due_date().to_string(),
                completed: false,
            });
            Ok(id)
        }

        async fn delete_task(&self, task_id: i64) -> anyhow::Result<bool> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|t| t.id != task_id);
            Ok(rows.len() != before)
        }

        async fn complete_task(&self, task_id: i64) -> anyhow::Result<bool> {
            let mut rows = self.rows.lock().unwrap();
            match rows.iter_mut().find(|t| t.id == task_id) {
                Some(task) => {
                    task.completed = true;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    /// Every operation fails, as if the database were unreachable.
    pub struct FailingStore;

    #[async_trait]
    impl TaskStore for FailingStore {
        async fn get_tasks(&self) -> anyhow::Result<Vec<Task>> {
            anyhow::bail!("connection refused")
        }

        async fn get_task(&self, _task_id: i64) -> anyhow::Result<Option<Task>> {
            anyhow::bail!("connection refused")
        }

        async fn create_task(&self, _task: &NewTask) -> anyhow::Result<i64> {
            anyhow::bail!("connection refused")
        }

        async fn delete_task(&self, _task_id: i64) -> anyhow::Result<bool> {
            anyhow::bail!("connection refused")
        }

        async fn complete_task(&self, _task_id: i64) -> anyhow::Result<bool> {
            anyhow::bail!("connection refused")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskForm;

    const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS tasks (
        id SERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT,
        due_date TEXT NOT NULL,
        completed BOOLEAN NOT NULL DEFAULT false
    )";

    async fn test_db() -> Db {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("Couldn't connect to test database");
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .expect("Couldn't create tasks table");
        Db::from_pool(pool)
    }

    fn new_task(title: &str) -> NewTask {
        NewTask::try_from(TaskForm {
            title: title.to_string(),
            description: "from db tests".to_string(),
            due_date: "2025-04-28".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    async fn test_create_and_get_task() {
        let db = test_db().await;
        let id = db.create_task(&new_task("db create")).await.unwrap();

        let task = db.get_task(id).await.unwrap().expect("task should exist");
        assert_eq!(task.title, "db create");
        assert_eq!(task.description, "from db tests");
        assert_eq!(task.due_date, "2025-04-28");
        assert!(!task.completed);

        assert!(db.get_tasks().await.unwrap().iter().any(|t| t.id == id));
        db.delete_task(id).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL at DATABASE_URL"]
    async fn test_complete_and_delete_task() {
        let db = test_db().await;
        let id = db.create_task(&new_task("db complete")).await.unwrap();

        assert!(db.complete_task(id).await.unwrap());
        assert!(db.complete_task(id).await.unwrap());
        assert!(db.get_task(id).await.unwrap().unwrap().completed);

        assert!(db.delete_task(id).await.unwrap());
        assert!(!db.delete_task(id).await.unwrap());
        assert!(db.get_task(id).await.unwrap().is_none());
        assert!(!db.complete_task(id).await.unwrap());
    }
}
