// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::actors::ScopeOption;
use crate::engine::FlowContext;
use crate::errors::{ExecutionError, SetupErrors};
use crate::token::Token;
use crate::traits::{Actor, ActorBase, ActorRole};

/// Discards every token.
pub struct NullSink {
    base: ActorBase,
}

impl NullSink {
    pub fn new(base: ActorBase) -> Self {
        Self { base }
    }
}

#[async_trait]
impl Actor for NullSink {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Sink
    }

    async fn execute(&mut self, _ctx: &FlowContext) -> Result<(), ExecutionError> {
        self.base.take_input();
        Ok(())
    }
}

/// Shared view of the tokens a [`Collector`] received.
pub type Collected = Arc<Mutex<Vec<Token>>>;

/// Keeps every token it receives.
///
/// Tokens are available through [`Collector::handle`] and, with `key` set,
/// appended as an array to storage (`scope: flow` or `cache`).
pub struct Collector {
    base: ActorBase,
    collected: Collected,
}

impl Collector {
    pub fn new(base: ActorBase) -> Self {
        Self {
            base,
            collected: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn handle(&self) -> Collected {
        self.collected.clone()
    }
}

#[async_trait]
impl Actor for Collector {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Sink
    }

    fn quick_info(&self) -> Option<String> {
        let count = self.collected.lock().len();
        Some(match self.base.options().raw_text("key") {
            Some(key) => format!("{} tokens -> {}", count, key),
            None => format!("{} tokens", count),
        })
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = SetupErrors::new();
        self.base
            .check_option::<ScopeOption>("scope", ctx.variables(), false, &mut errors);
        self.collected.lock().clear();
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let token = self.base.require_input()?;
        let vars = ctx.variables();
        if let Some(key) = self.base.options().text("key", vars) {
            let scope = self
                .base
                .option_or("scope", vars, ScopeOption::Flow)?
                .resolve(ctx);
            ctx.storage().append(scope, &key, token.payload().clone());
        }
        self.collected.lock().push(token);
        Ok(())
    }
}

/// Logs each token at info level, prefixed with `prefix` when set.
pub struct LogSink {
    base: ActorBase,
}

impl LogSink {
    pub fn new(base: ActorBase) -> Self {
        Self { base }
    }
}

#[async_trait]
impl Actor for LogSink {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Sink
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let token = self.base.require_input()?;
        let prefix = self
            .base
            .options()
            .text("prefix", ctx.variables())
            .unwrap_or_default();
        tracing::info!(
            actor = self.base.full_name(),
            payload_type = %token.payload_type(),
            "{}{}",
            prefix,
            token.payload().to_text()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::engine::{director, FlowSettings};
    use crate::scope::StorageScope;
    use crate::token::Payload;

    #[tokio::test]
    async fn test_collector_keeps_order_and_appends_to_storage() {
        let ctx = FlowContext::new(FlowSettings::default());
        let mut collector = Collector::new(
            ActorBase::new("collect").with_options(Options::new().with("key", "seen")),
        );
        let handle = collector.handle();
        director::set_up(&mut collector, &ctx).await.unwrap();

        for n in 1..=3i64 {
            director::process(&mut collector, Some(Token::anonymous(n)), &ctx)
                .await
                .unwrap();
        }

        let payloads: Vec<Payload> = handle.lock().iter().map(|t| t.payload().clone()).collect();
        assert_eq!(payloads, vec![Payload::Integer(1), Payload::Integer(2), Payload::Integer(3)]);
        assert_eq!(
            ctx.storage().get(&StorageScope::Flow, "seen"),
            Some(Payload::Array(payloads))
        );
    }
}
