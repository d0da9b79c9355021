//! Durable task storage port.

use async_trait::async_trait;

use crate::domain::errors::OrchestrationResult;
use crate::domain::models::{SubTask, Task};

/// CRUD surface over the authoritative task store. The sqlite-backed
/// adapter lives in `infrastructure::database::task_repository`.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: &Task) -> OrchestrationResult<()>;
    async fn get(&self, task_id: &str) -> OrchestrationResult<Option<Task>>;
    async fn update(&self, task: &Task) -> OrchestrationResult<()>;
    async fn list(&self, limit: u32, offset: u32) -> OrchestrationResult<Vec<Task>>;
    async fn delete(&self, task_id: &str) -> OrchestrationResult<()>;

    async fn create_subtask(&self, task_id: &str, subtask: &SubTask) -> OrchestrationResult<()>;
    async fn update_subtask(&self, task_id: &str, subtask: &SubTask) -> OrchestrationResult<()>;
    async fn list_subtasks(&self, task_id: &str) -> OrchestrationResult<Vec<SubTask>>;
}
