//! Sequential workflow driver.
//!
//! [`WorkflowRun`] owns the [`RunContext`] for one run, drives each action
//! through Init → Do → Cleanup, applies the configured failure policy, then
//! disposes every instantiated action and optionally shuts the resource
//! registry down. The outcome of each action is captured in an [`ActionReport`].

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::{DisposeOrder, EngineConfig, FailurePolicy},
    lifecycle::{ActionInstance, ActionState, RunContext},
    workflow::{
        catalog::{ActionCatalog, CatalogError},
        document::WorkflowDocument,
    },
};

/// Outcome of a single scheduled action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReport {
    pub name: String,
    pub kind: String,
    /// State after Init/Do/Cleanup, before disposal.
    pub state: ActionState,
    pub error: Option<String>,
    /// `None` when the action was never started because the run halted.
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed: Duration,
}

impl ActionReport {
    pub fn skipped(&self) -> bool {
        self.started_at.is_none()
    }
}

/// Summary of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub workflow: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub actions: Vec<ActionReport>,
    /// Messages from actions whose dispose failed.
    pub disposal_warnings: Vec<String>,
}

impl RunReport {
    /// True when every action ran and none failed.
    pub fn succeeded(&self) -> bool {
        self.actions.iter().all(|action| action.error.is_none() && !action.skipped())
    }

    pub fn failed_actions(&self) -> impl Iterator<Item = &ActionReport> {
        self.actions.iter().filter(|action| action.error.is_some())
    }
}

/// One execution of an ordered list of actions against a shared context.
#[derive(Debug)]
pub struct WorkflowRun {
    name: String,
    context: RunContext,
    config: EngineConfig,
    actions: Vec<ActionInstance>,
}

impl WorkflowRun {
    pub fn new(name: impl Into<String>, context: RunContext, config: EngineConfig) -> Self {
        Self {
            name: name.into(),
            context,
            config,
            actions: Vec::new(),
        }
    }

    /// Build a run from a document: seed variables, then instantiate every action.
    pub fn from_document(
        document: &WorkflowDocument,
        catalog: &ActionCatalog,
        mut context: RunContext,
        config: EngineConfig,
    ) -> Result<Self, CatalogError> {
        for (name, value) in &document.seed_variables() {
            context.variables.set(name.clone(), value.clone());
        }

        let actions = document
            .actions
            .iter()
            .map(|definition| catalog.instantiate(definition))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: document.name().to_string(),
            context,
            config,
            actions,
        })
    }

    pub fn push(&mut self, action: ActionInstance) {
        self.actions.push(action);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RunContext {
        &mut self.context
    }

    /// Number of actions waiting to be executed.
    pub fn pending(&self) -> usize {
        self.actions.len()
    }

    /// Execute every pending action and dispose them all.
    ///
    /// Pending actions are consumed; the variable store keeps the published
    /// outputs and remains available through [`WorkflowRun::context`].
    pub fn execute(&mut self) -> RunReport {
        let started_at = Utc::now();
        let mut actions = std::mem::take(&mut self.actions);
        let mut reports = Vec::with_capacity(actions.len());
        let mut halted = false;

        info!(workflow = %self.name, actions = actions.len(), "workflow run started");
        for action in &mut actions {
            if halted {
                reports.push(ActionReport {
                    name: action.name().to_string(),
                    kind: action.kind().to_string(),
                    state: action.state(),
                    error: None,
                    started_at: None,
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            let action_started_at = Utc::now();
            let timer = Instant::now();
            let outcome = action.run(&mut self.context);
            let error = outcome.err().map(|error| {
                warn!(workflow = %self.name, action = %action.name(), %error, "action failed");
                self.context.host.warn(&error.to_string());
                error.to_string()
            });
            if error.is_some() && self.config.failure_policy == FailurePolicy::Halt {
                halted = true;
            }

            reports.push(ActionReport {
                name: action.name().to_string(),
                kind: action.kind().to_string(),
                state: action.state(),
                error,
                started_at: Some(action_started_at),
                elapsed: timer.elapsed(),
            });
        }

        if self.config.dispose_order == DisposeOrder::Reverse {
            actions.reverse();
        }
        let disposal_warnings = actions
            .iter_mut()
            .filter_map(|action| action.dispose(&mut self.context))
            .map(|warning| warning.to_string())
            .collect();

        if self.config.quit_resources_on_finish {
            self.context.registry.release_idle();
        }

        let report = RunReport {
            workflow: self.name.clone(),
            started_at,
            finished_at: Utc::now(),
            actions: reports,
            disposal_warnings,
        };
        info!(
            workflow = %report.workflow,
            succeeded = report.succeeded(),
            failed = report.failed_actions().count(),
            "workflow run finished"
        );
        report
    }
}
