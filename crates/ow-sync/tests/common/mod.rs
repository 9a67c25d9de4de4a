#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ow_api_types::{Artifact, BudgetSnapshot, Dependency, GraphPayload, Task};
use ow_sync::backend::DashboardBackend;
use ow_sync::{Result, SyncError};

/// In-memory backend with scripted latency and failures.
///
/// Latency applies to the budget read only; the other reads answer
/// immediately, so one budget call corresponds to one refresh cycle.
pub struct FakeBackend {
    budget: Mutex<BudgetSnapshot>,
    tasks: Mutex<Vec<Task>>,
    dependencies: Mutex<Vec<Dependency>>,
    artifacts: Mutex<Vec<Artifact>>,
    delay: Mutex<Duration>,
    /// Per-call overrides, consumed in call order.
    script: Mutex<VecDeque<(Duration, BudgetSnapshot)>>,
    budget_error: Mutex<Option<SyncError>>,
    artifacts_error: Mutex<Option<SyncError>>,
    started: AtomicUsize,
    completed: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            budget: Mutex::new(BudgetSnapshot::new(100.0, 100.0)),
            tasks: Mutex::new(vec![
                Task::new("t1", "Plan the launch")
                    .with_status("done")
                    .with_business_value(8.0),
                Task::new("t2", "Build it").with_business_value(1.0),
            ]),
            dependencies: Mutex::new(vec![Dependency::new("t1", "t2")]),
            artifacts: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
            script: Mutex::new(VecDeque::new()),
            budget_error: Mutex::new(None),
            artifacts_error: Mutex::new(None),
            started: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn set_budget(&self, budget_left: f64, budget_total: f64) {
        *self.budget.lock().unwrap() = BudgetSnapshot::new(budget_left, budget_total);
    }

    pub fn script(&self, delay: Duration, budget: BudgetSnapshot) {
        self.script.lock().unwrap().push_back((delay, budget));
    }

    pub fn fail_budget(&self, err: Option<SyncError>) {
        *self.budget_error.lock().unwrap() = err;
    }

    pub fn fail_artifacts(&self, err: Option<SyncError>) {
        *self.artifacts_error.lock().unwrap() = err;
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DashboardBackend for FakeBackend {
    async fn budget(&self) -> Result<BudgetSnapshot> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        let scripted = self.script.lock().unwrap().pop_front();
        let (delay, budget) =
            scripted.unwrap_or_else(|| (*self.delay.lock().unwrap(), *self.budget.lock().unwrap()));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        match self.budget_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(budget),
        }
    }

    async fn backlog(&self) -> Result<Vec<Task>> {
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn graph(&self) -> Result<GraphPayload> {
        Ok(GraphPayload {
            tasks: self.tasks.lock().unwrap().clone(),
            dependencies: self.dependencies.lock().unwrap().clone(),
        })
    }

    async fn artifacts(&self) -> Result<Vec<Artifact>> {
        match self.artifacts_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(self.artifacts.lock().unwrap().clone()),
        }
    }
}
