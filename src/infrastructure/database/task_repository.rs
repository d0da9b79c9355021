//! Sqlite-backed [`TaskRepository`].
//!
//! Grounded on the teacher's `database/task_repo.rs` row-mapping and
//! optimistic-locking idioms, cut down to the narrow CRUD surface this
//! system's domain port actually needs — no task-queue, dependency-graph,
//! or worktree concerns survive the port boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{OrchestrationError, OrchestrationResult};
use crate::domain::models::{SubTask, SubTaskStatus, Task, TaskStatus};
use crate::domain::ports::task_repository::TaskRepository;

fn task_status_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::InProgress => "in_progress",
        TaskStatus::Validating => "validating",
        TaskStatus::Debating => "debating",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::Cancelled => "cancelled",
    }
}

fn parse_task_status(s: &str) -> OrchestrationResult<TaskStatus> {
    Ok(match s {
        "pending" => TaskStatus::Pending,
        "in_progress" => TaskStatus::InProgress,
        "validating" => TaskStatus::Validating,
        "debating" => TaskStatus::Debating,
        "completed" => TaskStatus::Completed,
        "failed" => TaskStatus::Failed,
        "cancelled" => TaskStatus::Cancelled,
        other => return Err(OrchestrationError::PersistenceFailed(format!("unknown task status {other}"))),
    })
}

fn subtask_status_str(status: SubTaskStatus) -> &'static str {
    match status {
        SubTaskStatus::Pending => "pending",
        SubTaskStatus::InProgress => "in_progress",
        SubTaskStatus::Completed => "completed",
        SubTaskStatus::Failed => "failed",
    }
}

fn parse_subtask_status(s: &str) -> OrchestrationResult<SubTaskStatus> {
    Ok(match s {
        "pending" => SubTaskStatus::Pending,
        "in_progress" => SubTaskStatus::InProgress,
        "completed" => SubTaskStatus::Completed,
        "failed" => SubTaskStatus::Failed,
        other => return Err(OrchestrationError::PersistenceFailed(format!("unknown subtask status {other}"))),
    })
}

fn parse_rfc3339(s: &str) -> OrchestrationResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OrchestrationError::PersistenceFailed(e.to_string()))
}

fn row_to_subtask(row: &SqliteRow) -> OrchestrationResult<SubTask> {
    let id: String = row.try_get("id")?;
    let parent_task_id: String = row.try_get("parent_task_id")?;
    let result: Option<String> = row.try_get("result")?;
    let status: String = row.try_get("status")?;

    Ok(SubTask {
        id: Uuid::parse_str(&id).map_err(|e| OrchestrationError::PersistenceFailed(e.to_string()))?,
        parent_task_id: Uuid::parse_str(&parent_task_id).map_err(|e| OrchestrationError::PersistenceFailed(e.to_string()))?,
        description: row.try_get("description")?,
        agent_id: row.try_get("agent_id")?,
        agent_type: row.try_get("agent_type")?,
        status: parse_subtask_status(&status)?,
        result: result.map(|r| serde_json::from_str(&r)).transpose()?,
        error: row.try_get("error")?,
        rework_count: {
            let n: i64 = row.try_get("rework_count")?;
            n as u32
        },
    })
}

fn row_to_task(row: &SqliteRow) -> OrchestrationResult<Task> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let context: String = row.try_get("context")?;
    let result: Option<String> = row.try_get("result")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;
    let debate_state: Option<String> = row.try_get("debate_state")?;
    let validation_results: Option<String> = row.try_get("validation_results")?;
    let tokens_used: i64 = row.try_get("tokens_used")?;
    let agents_count: i64 = row.try_get("agents_count")?;

    Ok(Task {
        id: Uuid::parse_str(&id).map_err(|e| OrchestrationError::PersistenceFailed(e.to_string()))?,
        description: row.try_get("description")?,
        status: parse_task_status(&status)?,
        provider: row.try_get("provider")?,
        context: serde_json::from_str(&context)?,
        result: result.map(|r| serde_json::from_str(&r)).transpose()?,
        error: row.try_get("error")?,
        created_at: parse_rfc3339(&created_at)?,
        updated_at: parse_rfc3339(&updated_at)?,
        completed_at: completed_at.map(|c| parse_rfc3339(&c)).transpose()?,
        tokens_used: tokens_used as u64,
        agents_count: agents_count as u32,
        progress: row.try_get::<f64, _>("progress")? as f32,
        debate_state: debate_state.map(|d| serde_json::from_str(&d)).transpose()?,
        subtasks: Vec::new(),
        validation_results: validation_results.map(|v| serde_json::from_str(&v)).transpose()?,
    })
}

/// Sqlite-backed [`TaskRepository`].
pub struct TaskRepositoryImpl {
    pool: SqlitePool,
}

impl TaskRepositoryImpl {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for TaskRepositoryImpl {
    async fn create(&self, task: &Task) -> OrchestrationResult<()> {
        let context = serde_json::to_string(&task.context)?;
        let result = task.result.as_ref().map(serde_json::to_string).transpose()?;
        let debate_state = task.debate_state.as_ref().map(serde_json::to_string).transpose()?;
        let validation_results = task.validation_results.as_ref().map(serde_json::to_string).transpose()?;

        sqlx::query(
            "INSERT INTO tasks (id, description, status, provider, context, result, error, created_at, \
             updated_at, completed_at, tokens_used, agents_count, progress, debate_state, validation_results, version) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(task.id.to_string())
        .bind(&task.description)
        .bind(task_status_str(task.status))
        .bind(&task.provider)
        .bind(context)
        .bind(result)
        .bind(&task.error)
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(task.tokens_used as i64)
        .bind(task.agents_count as i64)
        .bind(task.progress as f64)
        .bind(debate_state)
        .bind(validation_results)
        .execute(&self.pool)
        .await?;

        for subtask in &task.subtasks {
            self.create_subtask(&task.id.to_string(), subtask).await?;
        }
        Ok(())
    }

    async fn get(&self, task_id: &str) -> OrchestrationResult<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        let mut task = row_to_task(&row)?;
        task.subtasks = self.list_subtasks(task_id).await?;
        Ok(Some(task))
    }

    async fn update(&self, task: &Task) -> OrchestrationResult<()> {
        let context = serde_json::to_string(&task.context)?;
        let result = task.result.as_ref().map(serde_json::to_string).transpose()?;
        let debate_state = task.debate_state.as_ref().map(serde_json::to_string).transpose()?;
        let validation_results = task.validation_results.as_ref().map(serde_json::to_string).transpose()?;

        let outcome = sqlx::query(
            "UPDATE tasks SET description = ?, status = ?, provider = ?, context = ?, result = ?, \
             error = ?, updated_at = ?, completed_at = ?, tokens_used = ?, agents_count = ?, progress = ?, \
             debate_state = ?, validation_results = ?, version = version + 1 WHERE id = ?",
        )
        .bind(&task.description)
        .bind(task_status_str(task.status))
        .bind(&task.provider)
        .bind(context)
        .bind(result)
        .bind(&task.error)
        .bind(task.updated_at.to_rfc3339())
        .bind(task.completed_at.map(|t| t.to_rfc3339()))
        .bind(task.tokens_used as i64)
        .bind(task.agents_count as i64)
        .bind(task.progress as f64)
        .bind(debate_state)
        .bind(validation_results)
        .bind(task.id.to_string())
        .execute(&self.pool)
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(OrchestrationError::PersistenceFailed(format!("task {} not found", task.id)));
        }
        Ok(())
    }

    async fn list(&self, limit: u32, offset: u32) -> OrchestrationResult<Vec<Task>> {
        let rows = sqlx::query("SELECT * FROM tasks ORDER BY created_at DESC LIMIT ? OFFSET ?")
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut task = row_to_task(row)?;
            task.subtasks = self.list_subtasks(&task.id.to_string()).await?;
            tasks.push(task);
        }
        Ok(tasks)
    }

    async fn delete(&self, task_id: &str) -> OrchestrationResult<()> {
        sqlx::query("DELETE FROM tasks WHERE id = ?").bind(task_id).execute(&self.pool).await?;
        Ok(())
    }

    async fn create_subtask(&self, task_id: &str, subtask: &SubTask) -> OrchestrationResult<()> {
        let result = subtask.result.as_ref().map(serde_json::to_string).transpose()?;
        sqlx::query(
            "INSERT INTO subtasks (id, parent_task_id, description, agent_id, agent_type, status, result, error, rework_count) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(subtask.id.to_string())
        .bind(task_id)
        .bind(&subtask.description)
        .bind(&subtask.agent_id)
        .bind(&subtask.agent_type)
        .bind(subtask_status_str(subtask.status))
        .bind(result)
        .bind(&subtask.error)
        .bind(subtask.rework_count as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_subtask(&self, _task_id: &str, subtask: &SubTask) -> OrchestrationResult<()> {
        let result = subtask.result.as_ref().map(serde_json::to_string).transpose()?;
        sqlx::query(
            "UPDATE subtasks SET description = ?, agent_id = ?, agent_type = ?, status = ?, result = ?, \
             error = ?, rework_count = ? WHERE id = ?",
        )
        .bind(&subtask.description)
        .bind(&subtask.agent_id)
        .bind(&subtask.agent_type)
        .bind(subtask_status_str(subtask.status))
        .bind(result)
        .bind(&subtask.error)
        .bind(subtask.rework_count as i64)
        .bind(subtask.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_subtasks(&self, task_id: &str) -> OrchestrationResult<Vec<SubTask>> {
        let rows = sqlx::query("SELECT * FROM subtasks WHERE parent_task_id = ? ORDER BY rowid ASC")
            .bind(task_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_subtask).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::connection::DatabaseConnection;

    async fn repo() -> (DatabaseConnection, TaskRepositoryImpl) {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        conn.migrate().await.unwrap();
        let repo = TaskRepositoryImpl::new(conn.pool().clone());
        (conn, repo)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (_conn, repo) = repo().await;
        let task = Task::new("investigate the outage", "auto");
        let task_id = task.id.to_string();
        repo.create(&task).await.unwrap();

        let fetched = repo.get(&task_id).await.unwrap().expect("task should exist");
        assert_eq!(fetched.id, task.id);
        assert_eq!(fetched.description, "investigate the outage");
        assert_eq!(fetched.status, TaskStatus::Pending);
        assert!(fetched.subtasks.is_empty());
    }

    #[tokio::test]
    async fn update_persists_status_transition() {
        let (_conn, repo) = repo().await;
        let mut task = Task::new("x", "auto");
        repo.create(&task).await.unwrap();

        task.transition(TaskStatus::Completed);
        repo.update(&task).await.unwrap();

        let fetched = repo.get(&task.id.to_string()).await.unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::Completed);
        assert!(fetched.completed_at.is_some());
        assert!((fetched.progress - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn update_of_missing_task_errors() {
        let (_conn, repo) = repo().await;
        let task = Task::new("ghost", "auto");
        let err = repo.update(&task).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::PersistenceFailed(_)));
    }

    #[tokio::test]
    async fn subtasks_are_created_and_listed_with_parent() {
        let (_conn, repo) = repo().await;
        let mut task = Task::new("plan the release", "auto");
        let subtask = SubTask::new(task.id, "agent-1", "researcher", "find prior incidents");
        task.subtasks.push(subtask.clone());
        repo.create(&task).await.unwrap();

        let subtasks = repo.list_subtasks(&task.id.to_string()).await.unwrap();
        assert_eq!(subtasks.len(), 1);
        assert_eq!(subtasks[0].id, subtask.id);
        assert_eq!(subtasks[0].agent_type, "researcher");
    }

    #[tokio::test]
    async fn list_orders_newest_first_and_respects_limit() {
        let (_conn, repo) = repo().await;
        for i in 0..3 {
            let task = Task::new(format!("task {i}"), "auto");
            repo.create(&task).await.unwrap();
        }
        let page = repo.list(2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn delete_removes_task_and_subtasks() {
        let (_conn, repo) = repo().await;
        let mut task = Task::new("transient", "auto");
        task.subtasks.push(SubTask::new(task.id, "agent-1", "researcher", "look into it"));
        repo.create(&task).await.unwrap();

        repo.delete(&task.id.to_string()).await.unwrap();

        assert!(repo.get(&task.id.to_string()).await.unwrap().is_none());
        assert!(repo.list_subtasks(&task.id.to_string()).await.unwrap().is_empty());
    }
}
