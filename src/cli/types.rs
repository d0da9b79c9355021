//! Clap command structures for the `taskswarm` binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "taskswarm")]
#[command(about = "Multi-agent task orchestration engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a task and launch its pipeline
    Submit {
        /// Natural-language task description
        description: String,

        /// Provider hint, or "auto" to pick by cloud priority
        #[arg(short, long, default_value = "auto")]
        provider: String,

        /// Persist the task without launching its pipeline
        #[arg(long)]
        no_execute: bool,
    },

    /// Show a task's current state
    Get {
        /// Task ID (full UUID)
        task_id: String,
    },

    /// List tasks, most recent first
    List {
        /// Filter by status (pending, in_progress, validating, debating, completed, failed, cancelled)
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of tasks to display
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Cancel a running task
    Cancel {
        /// Task ID (full UUID)
        task_id: String,
    },

    /// Start the HTTP API server
    Serve {
        /// Address to bind, e.g. 0.0.0.0:8080
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
}
