//! Command handlers invoked from `main`.

use anyhow::{Context, Result};

use crate::domain::models::task::TaskStatus;
use crate::services::task_service::TaskService;

fn parse_status(raw: &str) -> Result<TaskStatus> {
    serde_json::from_value(serde_json::json!(raw.to_lowercase())).with_context(|| format!("unrecognized task status {raw}"))
}

pub async fn handle_submit(tasks: &TaskService, description: String, provider: String, auto_execute: bool, json: bool) -> Result<()> {
    let task = tasks.submit(description, provider, auto_execute).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else {
        println!("submitted task {} ({:?})", task.id, task.status);
    }
    Ok(())
}

pub async fn handle_get(tasks: &TaskService, task_id: String, json: bool) -> Result<()> {
    match tasks.get(&task_id).await? {
        Some(task) if json => println!("{}", serde_json::to_string_pretty(&task)?),
        Some(task) => println!(
            "{}  {:?}  progress={:.0}%  agents={}\n{}",
            task.id,
            task.status,
            task.progress * 100.0,
            task.agents_count,
            task.description
        ),
        None => println!("task {task_id} not found"),
    }
    Ok(())
}

pub async fn handle_list(tasks: &TaskService, status: Option<String>, limit: u32, json: bool) -> Result<()> {
    let status = status.map(|s| parse_status(&s)).transpose()?;
    let tasks = tasks.list(status, limit, 0).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
    } else {
        for task in &tasks {
            println!("{}  {:?}  {}", task.id, task.status, truncate(&task.description, 60));
        }
        if tasks.is_empty() {
            println!("no tasks");
        }
    }
    Ok(())
}

pub async fn handle_cancel(tasks: &TaskService, task_id: String, json: bool) -> Result<()> {
    match tasks.cancel(&task_id).await? {
        Some(task) if json => println!("{}", serde_json::to_string_pretty(&task)?),
        Some(task) => println!("task {} is now {:?}", task.id, task.status),
        None => println!("task {task_id} not found"),
    }
    Ok(())
}

pub async fn handle_serve(state: crate::infrastructure::http::AppState, bind: String) -> Result<()> {
    let router = crate::infrastructure::http::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind).await.with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!(%bind, "taskswarm HTTP API listening");
    axum::serve(listener, router).await.context("HTTP server error")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    format!("{}...", text.chars().take(max_chars).collect::<String>())
}
