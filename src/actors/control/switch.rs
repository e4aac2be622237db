// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_yaml::Value;

use crate::actors::conditions::ConditionConfig;
use crate::engine::{director, FlowContext};
use crate::errors::{ExecutionError, SetupErrors};
use crate::observability::messages::actor::TokenDropped;
use crate::observability::messages::StructuredLog;
use crate::token::PayloadType;
use crate::traits::actor::describe_line;
use crate::traits::{Actor, ActorBase, ActorRole, CombinationPolicy, Condition};

/// Routes each token to the first case whose condition matches.
///
/// `conditions` holds one condition per case. A single extra trailing case
/// acts as the default and receives tokens no condition matched. Tokens that
/// match nothing and find no default are dropped.
pub struct Switch {
    base: ActorBase,
    cases: Vec<Box<dyn Actor>>,
    conditions: Vec<Box<dyn Condition>>,
    condition_errors: Vec<String>,
    dropped: u64,
}

impl Switch {
    pub fn new(base: ActorBase, cases: Vec<Box<dyn Actor>>) -> Self {
        let mut conditions = Vec::new();
        let mut condition_errors = Vec::new();
        match base.options().raw("conditions") {
            Some(Value::Sequence(items)) => {
                for (index, item) in items.iter().enumerate() {
                    match ConditionConfig::from_value(item).and_then(|c| c.build()) {
                        Ok(condition) => conditions.push(condition),
                        Err(e) => condition_errors.push(format!("condition #{}: {}", index + 1, e)),
                    }
                }
            }
            Some(_) => condition_errors.push("'conditions' must be a list".to_string()),
            None => {}
        }
        Self {
            base,
            cases,
            conditions,
            condition_errors,
            dropped: 0,
        }
    }

    fn has_default(&self) -> bool {
        self.cases.len() == self.conditions.len() + 1
    }

    /// Number of tokens that matched no case.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[async_trait]
impl Actor for Switch {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        if self.cases.iter().any(|c| c.role().produces_output()) {
            ActorRole::Transformer
        } else {
            ActorRole::Sink
        }
    }

    fn policy(&self) -> Option<CombinationPolicy> {
        Some(CombinationPolicy::Conditional)
    }

    fn accepts(&self) -> Vec<PayloadType> {
        vec![PayloadType::Unknown]
    }

    fn generates(&self) -> Vec<PayloadType> {
        let mut types = Vec::new();
        for case in self.cases.iter().filter(|c| c.role().produces_output()) {
            for generated in case.generates() {
                if !types.contains(&generated) {
                    types.push(generated);
                }
            }
        }
        types
    }

    fn quick_info(&self) -> Option<String> {
        let summary = self
            .conditions
            .iter()
            .map(|c| c.describe())
            .collect::<Vec<_>>()
            .join(" | ");
        let mut info = if self.has_default() {
            format!("{} | default", summary)
        } else {
            summary
        };
        if self.dropped > 0 {
            info.push_str(&format!(" (dropped: {})", self.dropped));
        }
        Some(info)
    }

    async fn prepare(&mut self, parent: Option<&str>, ctx: &FlowContext, errors: &mut SetupErrors) {
        self.base.attach(parent);
        let path = self.base.full_name().to_string();
        director::prepare_children(&mut self.cases, &path, ctx, errors).await;
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = director::set_up_children(&mut self.cases, ctx).await;
        for message in &self.condition_errors {
            errors.push(self.base.setup_error(message.clone()));
        }
        let declared = self.conditions.len() + self.condition_errors.len();
        if declared == 0 {
            errors.push(self.base.setup_error("No condition provided"));
        } else if self.cases.len() < declared {
            errors.push(self.base.setup_error(format!(
                "Not enough cases defined: {} conditions but {} cases",
                declared,
                self.cases.len()
            )));
        } else if self.cases.len() > declared + 1 {
            errors.push(self.base.setup_error(format!(
                "Too many cases defined: {} conditions allow at most {} cases",
                declared,
                declared + 1
            )));
        }
        for case in &self.cases {
            if !case.role().takes_input() {
                errors.push(self.base.setup_error(format!(
                    "case '{}' does not take input",
                    case.name()
                )));
            }
        }
        self.dropped = 0;
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let token = self.base.require_input()?;

        let mut target = None;
        for (index, condition) in self.conditions.iter().enumerate() {
            if condition.evaluate(Some(&token), ctx)? {
                target = Some(index);
                break;
            }
        }
        let target = target.or_else(|| self.has_default().then_some(self.conditions.len()));

        let Some(index) = target else {
            self.dropped += 1;
            let summary = token.summary();
            TokenDropped {
                path: self.base.full_name(),
                token: &summary,
                reason: "no matching case",
            }
            .log();
            return Ok(());
        };

        let case = self.cases[index].as_mut();
        director::process(case, Some(token), ctx).await?;
        for output in director::drain_output(case) {
            self.base.push_output(output);
        }
        Ok(())
    }

    async fn wrap_up(&mut self, ctx: &FlowContext) {
        director::wrap_up_children(&mut self.cases, ctx).await;
    }

    async fn clean_up(&mut self) {
        director::clean_up_children(&mut self.cases).await;
    }

    async fn describe(&self, depth: usize, out: &mut String) {
        describe_line(&self.base, self.role(), self.quick_info(), depth, out);
        director::describe_children(&self.cases, depth + 1, out).await;
    }
}
