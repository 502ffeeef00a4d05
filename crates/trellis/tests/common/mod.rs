//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

use trellis::domain::{NewTask, Task};
use trellis::relations::RelationshipService;
use trellis::storage::{GraphStore, MemoryStore};
use trellis::tasks::TaskService;

/// Run the trellis binary in the specified directory
pub fn run_trellis_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trellis"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute trellis")
}

/// Run trellis with `--json` and parse stdout, asserting success
pub fn run_trellis_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut full: Vec<&str> = args.to_vec();
    full.push("--json");
    let output = run_trellis_in_dir(dir, &full);
    assert!(
        output.status.success(),
        "trellis {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

/// Create a task through the CLI and return its numeric id
pub fn add_task(dir: &Path, args: &[&str]) -> u64 {
    let mut full = vec!["task", "add"];
    full.extend_from_slice(args);
    let task = run_trellis_json(dir, &full);
    task["id"].as_u64().expect("task id in output")
}

/// Task and relationship services sharing one in-memory store
pub struct Services {
    pub store: Arc<dyn GraphStore>,
    pub tasks: TaskService,
    pub relations: RelationshipService,
}

impl Services {
    pub fn new() -> Self {
        let store: Arc<dyn GraphStore> = Arc::new(MemoryStore::new());
        let relations = RelationshipService::new(Arc::clone(&store));
        let tasks = TaskService::new(Arc::clone(&store)).with_hook(Arc::new(relations.clone()));
        Self {
            store,
            tasks,
            relations,
        }
    }

    pub async fn task(&self, title: &str) -> Task {
        self.tasks
            .create(NewTask::titled(title))
            .await
            .expect("Failed to create task")
    }
}
