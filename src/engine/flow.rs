// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::actors::control::Sequence;
use crate::engine::context::{ErrorLogEntry, FlowContext, FlowSettings};
use crate::engine::director;
use crate::errors::{FlowError, SetupError, SetupErrors};
use crate::observability::messages::flow::{FlowControl, FlowFinished, FlowSetupFailed, FlowStarted};
use crate::observability::messages::StructuredLog;
use crate::token::Token;
use crate::traits::{Actor, ActorBase};

/// Variable holding the flow's unique id while it runs.
pub const FLOW_ID_VARIABLE: &str = "flow_id";
/// Variable holding the flow's name while it runs.
pub const FLOW_NAME_VARIABLE: &str = "flow_name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Constructed,
    SetUp,
    Running,
    Completed,
    Stopped,
    Failed,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Completed | FlowState::Stopped | FlowState::Failed)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Constructed => "constructed",
            FlowState::SetUp => "set_up",
            FlowState::Running => "running",
            FlowState::Completed => "completed",
            FlowState::Stopped => "stopped",
            FlowState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a run that did not fail.
#[derive(Debug, Clone)]
pub struct FlowReport {
    pub state: FlowState,
    pub stop_reason: Option<String>,
    /// Non-fatal errors recorded during the run
    pub errors: Vec<ErrorLogEntry>,
    /// Tokens emitted by the root, if its last actor produces output
    pub outputs: Vec<Token>,
    pub duration: Duration,
}

/// Controls a flow from outside its run, e.g. from another task.
#[derive(Clone)]
pub struct FlowHandle {
    ctx: FlowContext,
    state: Arc<RwLock<FlowState>>,
}

impl FlowHandle {
    pub fn state(&self) -> FlowState {
        *self.state.read()
    }

    /// Cooperative stop; in-flight steps finish, nothing new starts.
    pub fn stop(&self, reason: &str) {
        FlowControl {
            flow_name: self.ctx.flow_name(),
            action: "stop requested",
            reason: Some(reason),
        }
        .log();
        self.ctx.stop(reason);
    }

    /// Actors block at their next step boundary until [`FlowHandle::resume`].
    pub fn pause(&self) {
        FlowControl {
            flow_name: self.ctx.flow_name(),
            action: "paused",
            reason: None,
        }
        .log();
        self.ctx.pause();
    }

    pub fn resume(&self) {
        FlowControl {
            flow_name: self.ctx.flow_name(),
            action: "resumed",
            reason: None,
        }
        .log();
        self.ctx.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.ctx.is_paused()
    }

    /// Fires the event trigger published under `name`.
    pub fn fire(&self, name: &str) -> bool {
        self.ctx.trigger(name).is_some_and(|handle| handle.fire())
    }

    pub fn context(&self) -> &FlowContext {
        &self.ctx
    }
}

/// One runnable actor tree and the context it runs in.
///
/// A flow runs once: `Constructed -> SetUp -> Running -> {Completed | Stopped | Failed}`.
///
/// ```no_run
/// use actorflow::config::{load_and_validate_config, FlowBuilder};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_and_validate_config("configs/double.yaml")?;
/// let mut flow = FlowBuilder::new().build(&config)?;
/// let report = flow.run().await?;
/// println!("{} after {:?}", report.state, report.duration);
/// # Ok(())
/// # }
/// ```
pub struct Flow {
    root: Box<dyn Actor>,
    ctx: FlowContext,
    state: Arc<RwLock<FlowState>>,
}

impl Flow {
    pub fn new(settings: FlowSettings, root: Box<dyn Actor>) -> Self {
        Self {
            root,
            ctx: FlowContext::new(settings),
            state: Arc::new(RwLock::new(FlowState::Constructed)),
        }
    }

    /// A flow whose root is a sequence of `actors`, named after the flow.
    pub fn from_actors(settings: FlowSettings, actors: Vec<Box<dyn Actor>>) -> Self {
        let root = Sequence::new(ActorBase::new(settings.name.clone()), actors);
        Self::new(settings, Box::new(root))
    }

    pub fn context(&self) -> &FlowContext {
        &self.ctx
    }

    pub fn state(&self) -> FlowState {
        *self.state.read()
    }

    pub fn handle(&self) -> FlowHandle {
        FlowHandle {
            ctx: self.ctx.clone(),
            state: self.state.clone(),
        }
    }

    pub fn root(&self) -> &dyn Actor {
        self.root.as_ref()
    }

    /// Flow parameter; visible to `${name}` placeholders.
    pub fn set_variable(&self, name: &str, value: &str) {
        self.ctx.variables().set(name, value);
    }

    fn set_state(&self, state: FlowState) {
        *self.state.write() = state;
    }

    /// Registers callable actors and sets up the whole tree, collecting every
    /// detectable error before failing.
    pub async fn set_up(&mut self) -> Result<(), FlowError> {
        let state = self.state();
        if state != FlowState::Constructed {
            return Err(FlowError::InvalidState {
                operation: "set up",
                state: state.to_string(),
            });
        }

        self.ctx
            .variables()
            .set(FLOW_ID_VARIABLE, self.ctx.flow_id().to_string());
        self.ctx
            .variables()
            .set(FLOW_NAME_VARIABLE, self.ctx.flow_name().to_string());

        let mut errors = SetupErrors::new();
        self.root.prepare(None, &self.ctx, &mut errors).await;
        errors.absorb(director::set_up(self.root.as_mut(), &self.ctx).await);
        if self.root.role().takes_input() {
            errors.push(SetupError::IncompatibleWiring {
                path: self.root.full_name().to_string(),
                message: format!(
                    "the flow expects input ({}) but nothing feeds it",
                    self.root.role()
                ),
            });
        }

        if errors.is_empty() {
            self.set_state(FlowState::SetUp);
            Ok(())
        } else {
            FlowSetupFailed {
                flow_name: self.ctx.flow_name(),
                error_count: errors.len(),
                errors: &errors.to_string(),
            }
            .log();
            self.set_state(FlowState::Failed);
            Err(FlowError::Setup(errors))
        }
    }

    /// Runs the flow to a terminal state, setting it up first if needed.
    ///
    /// Wrap-up and clean-up run on every actor regardless of the outcome.
    /// A fatal actor error is returned as [`FlowError::Execution`] carrying
    /// the actor's full path; completed and stopped runs return a report.
    pub async fn run(&mut self) -> Result<FlowReport, FlowError> {
        if self.state() == FlowState::Constructed {
            if let Err(error) = self.set_up().await {
                self.tear_down().await;
                return Err(error);
            }
        }
        let state = self.state();
        if state != FlowState::SetUp {
            return Err(FlowError::InvalidState {
                operation: "run",
                state: state.to_string(),
            });
        }

        self.set_state(FlowState::Running);
        let started = Instant::now();
        let flow_id = self.ctx.flow_id().to_string();
        let actor_count = self.describe().await.lines().count();
        let start_msg = FlowStarted {
            flow_name: self.ctx.flow_name(),
            flow_id: &flow_id,
            actor_count,
        };
        start_msg.log();

        let result = director::process(self.root.as_mut(), None, &self.ctx).await;
        let outputs = director::drain_output(self.root.as_mut());
        if let Err(error) = result {
            self.ctx.fail(error);
        }

        let tracker = self.ctx.tracker().clone();
        tracker.close();
        tracker.wait().await;

        let final_state = if self.ctx.fatal_error().is_some() {
            FlowState::Failed
        } else if self.ctx.is_stopped() {
            FlowState::Stopped
        } else {
            FlowState::Completed
        };

        self.tear_down().await;
        self.set_state(final_state);

        let errors = self.ctx.error_log();
        FlowFinished {
            flow_name: self.ctx.flow_name(),
            state: &final_state.to_string(),
            duration: started.elapsed(),
            non_fatal_errors: errors.len(),
        }
        .log();

        match self.ctx.fatal_error() {
            Some(error) => Err(FlowError::Execution(error)),
            None => Ok(FlowReport {
                state: final_state,
                stop_reason: self.ctx.stop_reason(),
                errors,
                outputs,
                duration: started.elapsed(),
            }),
        }
    }

    /// Wraps up and cleans up the whole tree. Safe after a partial setup and
    /// idempotent.
    pub async fn tear_down(&mut self) {
        director::wrap_up(self.root.as_mut(), &self.ctx).await;
        director::clean_up(self.root.as_mut()).await;
        self.ctx.clear_triggers();
    }

    /// Indented tree of actors with their quick info.
    pub async fn describe(&self) -> String {
        let mut out = String::new();
        self.root.describe(0, &mut out).await;
        out
    }
}
