//! Run-state machine shared by the ingestion and validation components
//!
//! `Initialized -> Running(stage)* -> Completed | Failed(stage)`. A failure
//! in any stage is terminal; nothing is retried or rolled back.

use serde::Serialize;
use std::fmt;

/// A pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Download,
    Mirror,
    Split,
    ExistsCheck,
    SchemaCheck,
    DriftReport,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Mirror => "mirror",
            Self::Split => "split",
            Self::ExistsCheck => "exists-check",
            Self::SchemaCheck => "schema-check",
            Self::DriftReport => "drift-report",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a component is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum RunState {
    Initialized,
    Running(Stage),
    Completed,
    Failed(Stage),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialized => write!(f, "INITIALIZED"),
            Self::Running(stage) => write!(f, "STAGE_RUNNING({})", stage),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed(stage) => write!(f, "FAILED({})", stage),
        }
    }
}

/// Tracks and logs the state transitions of one component run
#[derive(Debug, Clone)]
pub struct StageTracker {
    component: &'static str,
    state: RunState,
    history: Vec<RunState>,
}

impl StageTracker {
    pub fn new(component: &'static str) -> Self {
        tracing::info!(component, "{} started", component);
        Self {
            component,
            state: RunState::Initialized,
            history: vec![RunState::Initialized],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state visited so far, oldest first
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            !self.state.is_terminal(),
            "{}: transition {} -> {} after terminal state",
            self.component,
            self.state,
            next
        );
        tracing::debug!(component = self.component, from = %self.state, to = %next, "state transition");
        self.state = next;
        self.history.push(next);
    }

    /// Start a stage
    pub fn enter(&mut self, stage: Stage) {
        tracing::info!(component = self.component, stage = %stage, "stage started");
        self.transition(RunState::Running(stage));
    }

    /// Pass a stage result through, moving to `Failed` on error
    pub fn record<T, E: fmt::Display>(&mut self, result: Result<T, E>) -> Result<T, E> {
        if let Err(e) = &result {
            let stage = match self.state {
                RunState::Running(stage) | RunState::Failed(stage) => stage,
                // a failure outside any stage is attributed to the first one
                RunState::Initialized | RunState::Completed => Stage::Download,
            };
            tracing::error!(component = self.component, stage = %stage, error = %e, "stage failed");
            self.transition(RunState::Failed(stage));
        }
        result
    }

    /// Run a synchronous stage
    pub fn run<T, E: fmt::Display>(&mut self, stage: Stage, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        self.enter(stage);
        let result = f();
        self.record(result)
    }

    /// Mark the run complete
    pub fn complete(&mut self) {
        self.transition(RunState::Completed);
        tracing::info!(component = self.component, "{} completed", self.component);
    }
}
