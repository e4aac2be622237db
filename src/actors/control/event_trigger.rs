// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::engine::{director, pipeline, FireHandle, FlowContext};
use crate::errors::{ExecutionError, SetupErrors};
use crate::observability::messages::actor::{TriggerFired, TriggerStopped};
use crate::observability::messages::StructuredLog;
use crate::traits::actor::describe_line;
use crate::traits::{Actor, ActorBase, ActorRole, CombinationPolicy};

/// What happens to fires arriving while the body is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirePolicy {
    /// Every fire runs the body once, in arrival order
    #[default]
    Queue,
    /// Pending fires collapse into a single run
    LatestWins,
}

impl FromStr for FirePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queue" => Ok(FirePolicy::Queue),
            "latest_wins" => Ok(FirePolicy::LatestWins),
            other => Err(format!(
                "unknown fire policy '{}', expected queue or latest_wins",
                other
            )),
        }
    }
}

type Body = Arc<Mutex<Vec<Box<dyn Actor>>>>;

struct WorkerSettings {
    path: String,
    interval: Option<Duration>,
    fire_on_start: bool,
    max_fires: Option<u64>,
    policy: FirePolicy,
}

/// Runs a self-contained body each time it is fired.
///
/// Fires come from an interval timer (`interval_ms`), a one-shot start event
/// (`fire_on_start`) or a named manual handle (`handle`, see
/// [`crate::engine::FlowHandle::fire`]). Executing the trigger only starts
/// its worker; bodies run on that worker, one fire at a time, and the flow
/// waits for the worker before it completes. A worker without `max_fires`
/// that listens on a timer or a handle runs until the flow is stopped.
pub struct EventTrigger {
    base: ActorBase,
    body: Body,
    receiver: Option<mpsc::UnboundedReceiver<()>>,
    started: bool,
}

impl EventTrigger {
    pub fn new(base: ActorBase, body: Vec<Box<dyn Actor>>) -> Self {
        Self {
            base,
            body: Arc::new(Mutex::new(body)),
            receiver: None,
            started: false,
        }
    }

    fn worker_settings(&self, ctx: &FlowContext) -> Result<WorkerSettings, ExecutionError> {
        let vars = ctx.variables();
        let interval = self
            .base
            .option::<u64>("interval_ms", vars)?
            .map(Duration::from_millis);
        Ok(WorkerSettings {
            path: self.base.full_name().to_string(),
            interval,
            fire_on_start: self.base.option_or("fire_on_start", vars, false)?,
            max_fires: self.base.option("max_fires", vars)?,
            policy: self.base.option_or("fire_policy", vars, FirePolicy::Queue)?,
        })
    }
}

enum Wake {
    Fire,
    HandleClosed,
    Stop,
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn receive(receiver: &mut Option<mpsc::UnboundedReceiver<()>>) -> Option<()> {
    match receiver {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}

async fn run_worker(
    settings: WorkerSettings,
    body: Body,
    mut receiver: Option<mpsc::UnboundedReceiver<()>>,
    ctx: FlowContext,
) {
    let mut ticker = settings.interval.map(|period| {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(match settings.policy {
            FirePolicy::Queue => MissedTickBehavior::Burst,
            FirePolicy::LatestWins => MissedTickBehavior::Skip,
        });
        ticker
    });
    let mut pending: usize = usize::from(settings.fire_on_start);
    let mut fires: u64 = 0;

    loop {
        if settings.max_fires.is_some_and(|max| fires >= max) || ctx.is_stopped() {
            break;
        }
        if pending == 0 {
            if ticker.is_none() && receiver.is_none() {
                break;
            }
            let wake = tokio::select! {
                _ = ctx.cancellation().cancelled() => Wake::Stop,
                _ = tick(&mut ticker) => Wake::Fire,
                received = receive(&mut receiver) => match received {
                    Some(()) => Wake::Fire,
                    None => Wake::HandleClosed,
                },
            };
            match wake {
                Wake::Stop => break,
                Wake::HandleClosed => {
                    receiver = None;
                    continue;
                }
                Wake::Fire => pending += 1,
            }
        }
        if let Some(receiver) = receiver.as_mut() {
            while receiver.try_recv().is_ok() {
                pending += 1;
            }
        }

        let coalesced = match settings.policy {
            FirePolicy::Queue => 0,
            FirePolicy::LatestWins => std::mem::replace(&mut pending, 1) - 1,
        };
        pending -= 1;
        fires += 1;
        TriggerFired {
            path: &settings.path,
            fire: fires,
            coalesced,
        }
        .log();

        ctx.checkpoint().await;
        if ctx.is_stopped() {
            break;
        }
        let mut body = body.lock().await;
        if let Err(error) = pipeline::run(&mut body, None, &ctx).await {
            ctx.fail(error);
            break;
        }
    }

    TriggerStopped {
        path: &settings.path,
        fires,
    }
    .log();
}

#[async_trait]
impl Actor for EventTrigger {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Standalone
    }

    fn policy(&self) -> Option<CombinationPolicy> {
        Some(CombinationPolicy::EventTriggered)
    }

    fn quick_info(&self) -> Option<String> {
        let options = self.base.options();
        let mut sources = Vec::new();
        if let Some(ms) = options.raw_text("interval_ms") {
            sources.push(format!("every {}ms", ms));
        }
        if options.flag("fire_on_start") {
            sources.push("on start".to_string());
        }
        if let Some(handle) = options.raw_text("handle") {
            sources.push(format!("handle '{}'", handle));
        }
        let mut info = sources.join(", ");
        if let Some(max) = options.raw_text("max_fires") {
            info.push_str(&format!(", max fires: {}", max));
        }
        Some(info)
    }

    async fn prepare(&mut self, parent: Option<&str>, ctx: &FlowContext, errors: &mut SetupErrors) {
        self.base.attach(parent);
        let path = self.base.full_name().to_string();
        let mut body = self.body.lock().await;
        director::prepare_children(&mut body, &path, ctx, errors).await;
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut body = self.body.lock().await;
        let mut errors = director::set_up_children(&mut body, ctx).await;
        for error in pipeline::check_wiring(&body, self.base.full_name()) {
            errors.push(error);
        }
        let roles: Vec<ActorRole> = body.iter().map(|c| c.role()).collect();
        if pipeline::derive_role(&roles).takes_input() {
            errors.push(self.base.setup_error("the trigger body must not expect input"));
        }
        drop(body);

        let vars = ctx.variables();
        let interval = self
            .base
            .check_option::<u64>("interval_ms", vars, false, &mut errors);
        if interval == Some(0) {
            errors.push(self.base.setup_error("interval_ms must be greater than 0"));
        }
        self.base
            .check_option::<bool>("fire_on_start", vars, false, &mut errors);
        self.base.check_option::<u64>("max_fires", vars, false, &mut errors);
        self.base
            .check_option::<FirePolicy>("fire_policy", vars, false, &mut errors);

        let handle = self.base.options().text("handle", vars);
        let options = self.base.options();
        if !options.contains("interval_ms") && !options.contains("fire_on_start") && handle.is_none() {
            errors.push(self.base.setup_error(
                "no fire source configured, set interval_ms, fire_on_start or handle",
            ));
        }

        self.started = false;
        self.receiver = None;
        if let Some(handle) = handle {
            let (sender, receiver) = mpsc::unbounded_channel();
            if ctx.register_trigger(&handle, FireHandle::new(sender)) {
                self.receiver = Some(receiver);
            } else {
                errors.push(self.base.setup_error(format!(
                    "trigger handle '{}' is already in use",
                    handle
                )));
            }
        }
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        if self.started {
            return Ok(());
        }
        let settings = self.worker_settings(ctx)?;
        self.started = true;
        ctx.tracker().spawn(run_worker(
            settings,
            self.body.clone(),
            self.receiver.take(),
            ctx.clone(),
        ));
        Ok(())
    }

    async fn wrap_up(&mut self, ctx: &FlowContext) {
        self.receiver = None;
        let mut body = self.body.lock().await;
        director::wrap_up_children(&mut body, ctx).await;
    }

    async fn clean_up(&mut self) {
        let mut body = self.body.lock().await;
        director::clean_up_children(&mut body).await;
    }

    async fn describe(&self, depth: usize, out: &mut String) {
        describe_line(&self.base, self.role(), self.quick_info(), depth, out);
        let body = self.body.lock().await;
        director::describe_children(&body, depth + 1, out).await;
    }
}
