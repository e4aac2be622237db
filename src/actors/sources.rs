// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::actors::ScopeOption;
use crate::engine::FlowContext;
use crate::errors::{ExecutionError, SetupErrors};
use crate::token::{Payload, PayloadType, Token};
use crate::traits::{Actor, ActorBase, ActorRole};

/// Emits the integers `start..=end` in steps of `step`, one per execution.
///
/// After the last value the range is finished; executing it again starts
/// over. Changing a variable the options refer to restarts the range.
pub struct IntegerRange {
    base: ActorBase,
    next: Option<i64>,
    finished: bool,
}

impl IntegerRange {
    pub fn new(base: ActorBase) -> Self {
        Self {
            base,
            next: None,
            finished: false,
        }
    }
}

fn within(value: i64, end: i64, step: i64) -> bool {
    if step > 0 {
        value <= end
    } else {
        value >= end
    }
}

#[async_trait]
impl Actor for IntegerRange {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Source
    }

    fn generates(&self) -> Vec<PayloadType> {
        vec![PayloadType::Integer]
    }

    fn quick_info(&self) -> Option<String> {
        let options = self.base.options();
        let text = |key: &str, default: &str| {
            options
                .raw_text(key)
                .unwrap_or_else(|| default.to_string())
        };
        Some(format!(
            "{}..={} step {}",
            text("start", "1"),
            text("end", "?"),
            text("step", "1")
        ))
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = SetupErrors::new();
        let vars = ctx.variables();
        self.base.check_option::<i64>("start", vars, false, &mut errors);
        self.base.check_option::<i64>("end", vars, true, &mut errors);
        if self.base.check_option::<i64>("step", vars, false, &mut errors) == Some(0) {
            errors.push(self.base.setup_error("step must not be 0"));
        }
        self.next = None;
        self.finished = false;
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let vars = ctx.variables();
        let start = self.base.option_or("start", vars, 1i64)?;
        let end: i64 = self
            .base
            .option("end", vars)?
            .ok_or_else(|| self.base.fail("option 'end' is not set"))?;
        let step = self.base.option_or("step", vars, 1i64)?;
        if step == 0 {
            return Err(self.base.fail("step must not be 0"));
        }

        let current = self.next.unwrap_or(start);
        if !within(current, end, step) {
            self.next = None;
            self.finished = true;
            return Ok(());
        }
        self.base.push_output(Token::new(current, self.base.full_name()));

        match current.checked_add(step) {
            Some(next) if within(next, end, step) => {
                self.next = Some(next);
                self.finished = false;
            }
            _ => {
                self.next = None;
                self.finished = true;
            }
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    async fn refresh(&mut self, _ctx: &FlowContext) -> Result<(), ExecutionError> {
        self.next = None;
        self.finished = false;
        Ok(())
    }

    async fn wrap_up(&mut self, _ctx: &FlowContext) {
        self.next = None;
    }
}

/// Emits the configured `strings`, one per execution.
pub struct StringConstants {
    base: ActorBase,
    cursor: usize,
    finished: bool,
}

impl StringConstants {
    pub fn new(base: ActorBase) -> Self {
        Self {
            base,
            cursor: 0,
            finished: false,
        }
    }
}

#[async_trait]
impl Actor for StringConstants {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Source
    }

    fn generates(&self) -> Vec<PayloadType> {
        vec![PayloadType::Text]
    }

    fn quick_info(&self) -> Option<String> {
        let count = match self.base.options().raw("strings") {
            Some(serde_yaml::Value::Sequence(items)) => items.len(),
            Some(_) => 1,
            None => 0,
        };
        Some(format!("{} strings", count))
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = SetupErrors::new();
        if let Err(message) = self.base.options().list("strings", ctx.variables()) {
            errors.push(self.base.setup_error(format!("option 'strings': {}", message)));
        }
        self.cursor = 0;
        self.finished = false;
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let strings = self
            .base
            .options()
            .list("strings", ctx.variables())
            .map_err(|message| self.base.fail(message))?
            .unwrap_or_default();
        if let Some(text) = strings.get(self.cursor) {
            self.base
                .push_output(Token::new(text.as_str(), self.base.full_name()));
            self.cursor += 1;
        }
        self.finished = self.cursor >= strings.len();
        if self.finished {
            self.cursor = 0;
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    async fn refresh(&mut self, _ctx: &FlowContext) -> Result<(), ExecutionError> {
        self.cursor = 0;
        Ok(())
    }
}

/// Emits the payload stored under `key`, or nothing when the key is absent.
pub struct StorageValue {
    base: ActorBase,
}

impl StorageValue {
    pub fn new(base: ActorBase) -> Self {
        Self { base }
    }
}

#[async_trait]
impl Actor for StorageValue {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Source
    }

    fn quick_info(&self) -> Option<String> {
        self.base.options().raw_text("key")
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = SetupErrors::new();
        self.base
            .check_option::<String>("key", ctx.variables(), true, &mut errors);
        self.base
            .check_option::<ScopeOption>("scope", ctx.variables(), false, &mut errors);
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let key: String = self
            .base
            .option("key", ctx.variables())?
            .ok_or_else(|| self.base.fail("option 'key' is not set"))?;
        let scope = self
            .base
            .option_or("scope", ctx.variables(), ScopeOption::Flow)?
            .resolve(ctx);
        if let Some(payload) = ctx.storage().get(&scope, &key) {
            self.base.push_output(Token::new(payload, self.base.full_name()));
        }
        Ok(())
    }
}

/// Emits the value of `variable` converted to `type` (text by default).
pub struct VariableValue {
    base: ActorBase,
}

impl VariableValue {
    pub fn new(base: ActorBase) -> Self {
        Self { base }
    }

    fn target_type(&self) -> PayloadType {
        self.base
            .options()
            .raw_text("type")
            .and_then(|t| t.parse::<PayloadType>().ok())
            .unwrap_or(PayloadType::Text)
    }
}

#[async_trait]
impl Actor for VariableValue {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Source
    }

    fn generates(&self) -> Vec<PayloadType> {
        vec![self.target_type()]
    }

    fn quick_info(&self) -> Option<String> {
        self.base
            .options()
            .raw_text("variable")
            .map(|name| format!("${{{}}} as {}", name, self.target_type()))
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = SetupErrors::new();
        self.base
            .check_option::<String>("variable", ctx.variables(), true, &mut errors);
        self.base
            .check_option::<PayloadType>("type", ctx.variables(), false, &mut errors);
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let name: String = self
            .base
            .option("variable", ctx.variables())?
            .ok_or_else(|| self.base.fail("option 'variable' is not set"))?;
        let value = ctx
            .variables()
            .get(&name)
            .ok_or_else(|| self.base.fail(format!("variable '{}' is not set", name)))?;
        let payload = Payload::Text(value)
            .convert(self.target_type())
            .map_err(|message| self.base.fail(message))?;
        self.base.push_output(Token::new(payload, self.base.full_name()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::engine::{director, FlowSettings};

    async fn drain_source(actor: &mut dyn Actor, ctx: &FlowContext) -> Vec<Payload> {
        let mut payloads = Vec::new();
        loop {
            director::process(actor, None, ctx).await.unwrap();
            payloads.extend(director::drain_output(actor).into_iter().map(Token::into_payload));
            if actor.is_finished() {
                break;
            }
        }
        payloads
    }

    #[tokio::test]
    async fn test_integer_range() {
        struct TestCase {
            name: &'static str,
            options: Options,
            expected: Vec<i64>,
        }

        let cases = vec![
            TestCase {
                name: "default start and step",
                options: Options::new().with("end", 3),
                expected: vec![1, 2, 3],
            },
            TestCase {
                name: "step not landing on end",
                options: Options::new().with("start", 0).with("end", 7).with("step", 3),
                expected: vec![0, 3, 6],
            },
            TestCase {
                name: "counting down",
                options: Options::new().with("start", 3).with("end", 1).with("step", -1),
                expected: vec![3, 2, 1],
            },
            TestCase {
                name: "empty range",
                options: Options::new().with("start", 5).with("end", 1),
                expected: vec![],
            },
        ];

        for case in cases {
            let ctx = FlowContext::new(FlowSettings::default());
            let mut range = IntegerRange::new(ActorBase::new("range").with_options(case.options));
            director::set_up(&mut range, &ctx).await.unwrap();
            let payloads = drain_source(&mut range, &ctx).await;
            let expected: Vec<Payload> = case.expected.into_iter().map(Payload::Integer).collect();
            assert_eq!(payloads, expected, "{}", case.name);
        }
    }

    #[tokio::test]
    async fn test_integer_range_rejects_zero_step_and_missing_end() {
        let ctx = FlowContext::new(FlowSettings::default());
        let mut range = IntegerRange::new(
            ActorBase::new("range").with_options(Options::new().with("step", 0)),
        );
        let errors = director::set_up(&mut range, &ctx).await.unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn test_integer_range_follows_variables() {
        let ctx = FlowContext::new(FlowSettings::default());
        ctx.variables().set("last", "2");
        let mut range = IntegerRange::new(
            ActorBase::new("range").with_options(Options::new().with("end", "${last}")),
        );
        director::set_up(&mut range, &ctx).await.unwrap();
        assert_eq!(drain_source(&mut range, &ctx).await.len(), 2);

        ctx.variables().set("last", "4");
        assert_eq!(drain_source(&mut range, &ctx).await.len(), 4);
    }

    #[tokio::test]
    async fn test_string_constants_restart_after_finishing() {
        let ctx = FlowContext::new(FlowSettings::default());
        let mut strings = StringConstants::new(
            ActorBase::new("words").with_options(Options::new().with("strings", vec!["a", "b"])),
        );
        director::set_up(&mut strings, &ctx).await.unwrap();
        let first = drain_source(&mut strings, &ctx).await;
        let second = drain_source(&mut strings, &ctx).await;
        assert_eq!(first, vec![Payload::from("a"), Payload::from("b")]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_variable_value_conversion() {
        let ctx = FlowContext::new(FlowSettings::default());
        ctx.variables().set("n", "21");
        let mut value = VariableValue::new(
            ActorBase::new("n")
                .with_options(Options::new().with("variable", "n").with("type", "integer")),
        );
        director::set_up(&mut value, &ctx).await.unwrap();
        assert_eq!(drain_source(&mut value, &ctx).await, vec![Payload::Integer(21)]);

        ctx.variables().remove("n");
        assert!(director::process(&mut value, None, &ctx).await.is_err());
    }
}
