// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::actors::ScopeOption;
use crate::engine::FlowContext;
use crate::errors::{ExecutionError, SetupErrors};
use crate::token::{exact_i64, Payload, PayloadType};
use crate::traits::{Actor, ActorBase, ActorRole};

/// Multiplies numeric tokens by `factor`.
///
/// Integers stay integers while the factor is integral; overflow is an
/// error rather than a wrap-around.
pub struct Scale {
    base: ActorBase,
}

impl Scale {
    pub fn new(base: ActorBase) -> Self {
        Self { base }
    }
}

#[async_trait]
impl Actor for Scale {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Transformer
    }

    fn accepts(&self) -> Vec<PayloadType> {
        vec![PayloadType::Integer, PayloadType::Float]
    }

    fn generates(&self) -> Vec<PayloadType> {
        vec![PayloadType::Integer, PayloadType::Float]
    }

    fn quick_info(&self) -> Option<String> {
        self.base
            .options()
            .raw_text("factor")
            .map(|factor| format!("x {}", factor))
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = SetupErrors::new();
        self.base
            .check_option::<f64>("factor", ctx.variables(), true, &mut errors);
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let token = self.base.require_input()?;
        let factor: f64 = self
            .base
            .option("factor", ctx.variables())?
            .ok_or_else(|| self.base.fail("option 'factor' is not set"))?;

        let scaled = match token.payload() {
            Payload::Integer(value) if factor.fract() == 0.0 => exact_i64(factor)
                .and_then(|factor| value.checked_mul(factor))
                .map(Payload::Integer)
                .ok_or_else(|| self.base.fail(format!("{} x {} overflows", value, factor)))?,
            Payload::Integer(value) => Payload::Float(*value as f64 * factor),
            Payload::Float(value) => Payload::Float(value * factor),
            other => {
                return Err(self
                    .base
                    .fail(format!("cannot scale {}", other.payload_type())))
            }
        };
        self.base
            .push_output(token.derive(scaled, self.base.full_name()));
        Ok(())
    }
}

/// Stores the token text (or `value`, if set) in `variable` and forwards
/// the token.
pub struct SetVariable {
    base: ActorBase,
}

impl SetVariable {
    pub fn new(base: ActorBase) -> Self {
        Self { base }
    }
}

#[async_trait]
impl Actor for SetVariable {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Transformer
    }

    fn quick_info(&self) -> Option<String> {
        self.base
            .options()
            .raw_text("variable")
            .map(|name| format!("-> ${{{}}}", name))
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = SetupErrors::new();
        self.base
            .check_option::<String>("variable", ctx.variables(), true, &mut errors);
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let token = self.base.require_input()?;
        let vars = ctx.variables();
        let name: String = self
            .base
            .option("variable", vars)?
            .ok_or_else(|| self.base.fail("option 'variable' is not set"))?;
        let value = self
            .base
            .options()
            .text("value", vars)
            .unwrap_or_else(|| token.payload().to_text());
        vars.set(name, value);
        self.base.push_output(token);
        Ok(())
    }
}

/// Stores each token's payload under `key` and forwards the token.
pub struct SetStorageValue {
    base: ActorBase,
}

impl SetStorageValue {
    pub fn new(base: ActorBase) -> Self {
        Self { base }
    }
}

#[async_trait]
impl Actor for SetStorageValue {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Transformer
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
        let token = self.base.require_input()?;
        let key: String = self
            .base
            .option("key", ctx.variables())?
            .ok_or_else(|| self.base.fail("option 'key' is not set"))?;
        let scope = self
            .base
            .option_or("scope", ctx.variables(), ScopeOption::Flow)?
            .resolve(ctx);
        ctx.storage().put(scope, key, token.payload().clone());
        self.base.push_output(token);
        Ok(())
    }
}

/// Forwards every token unchanged.
pub struct PassThrough {
    base: ActorBase,
}

impl PassThrough {
    pub fn new(base: ActorBase) -> Self {
        Self { base }
    }
}

#[async_trait]
impl Actor for PassThrough {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Transformer
    }

    async fn execute(&mut self, _ctx: &FlowContext) -> Result<(), ExecutionError> {
        let token = self.base.require_input()?;
        self.base.push_output(token);
        Ok(())
    }
}

/// Converts each payload to the type named by `to`.
pub struct Convert {
    base: ActorBase,
}

impl Convert {
    pub fn new(base: ActorBase) -> Self {
        Self { base }
    }

    fn target(&self) -> Option<PayloadType> {
        self.base
            .options()
            .raw_text("to")
            .and_then(|t| t.parse::<PayloadType>().ok())
    }
}

#[async_trait]
impl Actor for Convert {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn role(&self) -> ActorRole {
        ActorRole::Transformer
    }

    fn generates(&self) -> Vec<PayloadType> {
        vec![self.target().unwrap_or(PayloadType::Unknown)]
    }

    fn quick_info(&self) -> Option<String> {
        self.target().map(|target| format!("to {}", target))
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), SetupErrors> {
        let mut errors = SetupErrors::new();
        self.base
            .check_option::<PayloadType>("to", ctx.variables(), true, &mut errors);
        errors.into_result()
    }

    async fn execute(&mut self, ctx: &FlowContext) -> Result<(), ExecutionError> {
        let token = self.base.require_input()?;
        let target: PayloadType = self
            .base
            .option("to", ctx.variables())?
            .ok_or_else(|| self.base.fail("option 'to' is not set"))?;
        let converted = token
            .payload()
            .convert(target)
            .map_err(|message| self.base.fail(message))?;
        self.base
            .push_output(token.derive(converted, self.base.full_name()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::engine::{director, FlowSettings};
    use crate::errors::ExecutionError;
    use crate::token::Token;

    async fn transform(
        actor: &mut dyn Actor,
        ctx: &FlowContext,
        payload: Payload,
    ) -> Result<Vec<Payload>, ExecutionError> {
        director::process(actor, Some(Token::anonymous(payload)), ctx).await?;
        Ok(director::drain_output(actor)
            .into_iter()
            .map(Token::into_payload)
            .collect())
    }

    #[tokio::test]
    async fn test_scale() {
        struct TestCase {
            factor: f64,
            input: Payload,
            expected: Payload,
        }

        let cases = vec![
            TestCase {
                factor: 2.0,
                input: Payload::Integer(21),
                expected: Payload::Integer(42),
            },
            TestCase {
                factor: 0.5,
                input: Payload::Integer(3),
                expected: Payload::Float(1.5),
            },
            TestCase {
                factor: 3.0,
                input: Payload::Float(1.5),
                expected: Payload::Float(4.5),
            },
        ];

        let ctx = FlowContext::new(FlowSettings::default());
        for case in cases {
            let mut scale = Scale::new(
                ActorBase::new("scale").with_options(Options::new().with("factor", case.factor)),
            );
            director::set_up(&mut scale, &ctx).await.unwrap();
            let output = transform(&mut scale, &ctx, case.input.clone()).await.unwrap();
            assert_eq!(output, vec![case.expected], "{:?} x {}", case.input, case.factor);
        }
    }

    #[tokio::test]
    async fn test_scale_integral_factor_limits() {
        struct TestCase {
            factor: f64,
            input: Payload,
            expected: Option<Payload>,
        }

        let cases = vec![
            TestCase {
                factor: 1e19,
                input: Payload::Integer(1),
                expected: None,
            },
            TestCase {
                factor: -1e19,
                input: Payload::Integer(0),
                expected: None,
            },
            TestCase {
                factor: 4e18,
                input: Payload::Integer(3),
                expected: None,
            },
            TestCase {
                factor: i64::MIN as f64,
                input: Payload::Integer(1),
                expected: Some(Payload::Integer(i64::MIN)),
            },
            TestCase {
                factor: 1e19,
                input: Payload::Float(1.0),
                expected: Some(Payload::Float(1e19)),
            },
        ];

        let ctx = FlowContext::new(FlowSettings::default());
        for case in cases {
            let mut scale = Scale::new(
                ActorBase::new("scale").with_options(Options::new().with("factor", case.factor)),
            );
            director::set_up(&mut scale, &ctx).await.unwrap();
            let output = transform(&mut scale, &ctx, case.input.clone()).await;
            match (output, &case.expected) {
                (Ok(output), Some(expected)) => {
                    assert_eq!(output, vec![expected.clone()], "{:?} x {}", case.input, case.factor)
                }
                (Err(ExecutionError::ActorFailed { .. }), None) => {}
                (other, _) => panic!("{:?} x {}: unexpected {:?}", case.input, case.factor, other),
            }
        }
    }

    #[tokio::test]
    async fn test_scale_overflow_and_type_mismatch_fail() {
        let ctx = FlowContext::new(FlowSettings::default());
        let mut scale = Scale::new(
            ActorBase::new("scale").with_options(Options::new().with("factor", 2)),
        );
        director::set_up(&mut scale, &ctx).await.unwrap();

        let overflow = transform(&mut scale, &ctx, Payload::Integer(i64::MAX)).await;
        assert!(matches!(overflow, Err(ExecutionError::ActorFailed { .. })));

        let mismatch = transform(&mut scale, &ctx, Payload::from("x")).await;
        assert!(matches!(mismatch, Err(ExecutionError::TypeMismatch { .. })));
    }

    #[tokio::test]
    async fn test_set_variable_forwards_and_notifies() {
        let ctx = FlowContext::new(FlowSettings::default());
        let mut set = SetVariable::new(
            ActorBase::new("remember").with_options(Options::new().with("variable", "last")),
        );
        director::set_up(&mut set, &ctx).await.unwrap();

        let output = transform(&mut set, &ctx, Payload::Integer(7)).await.unwrap();
        assert_eq!(output, vec![Payload::Integer(7)]);
        assert_eq!(ctx.variables().get("last").as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_storage_round_trip_through_actors() {
        let ctx = FlowContext::new(FlowSettings::default());
        let mut store = SetStorageValue::new(
            ActorBase::new("store").with_options(Options::new().with("key", "latest")),
        );
        director::set_up(&mut store, &ctx).await.unwrap();
        transform(&mut store, &ctx, Payload::from("hello")).await.unwrap();

        let mut read = crate::actors::sources::StorageValue::new(
            ActorBase::new("read").with_options(Options::new().with("key", "latest")),
        );
        director::set_up(&mut read, &ctx).await.unwrap();
        director::process(&mut read, None, &ctx).await.unwrap();
        let tokens = director::drain_output(&mut read);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].payload(), &Payload::from("hello"));
    }

    #[tokio::test]
    async fn test_convert_failure_names_the_actor() {
        let ctx = FlowContext::new(FlowSettings::default());
        let mut convert = Convert::new(
            ActorBase::new("to_int").with_options(Options::new().with("to", "integer")),
        );
        director::set_up(&mut convert, &ctx).await.unwrap();

        let output = transform(&mut convert, &ctx, Payload::from("12")).await.unwrap();
        assert_eq!(output, vec![Payload::Integer(12)]);

        match transform(&mut convert, &ctx, Payload::from("twelve")).await {
            Err(ExecutionError::ActorFailed { path, .. }) => assert_eq!(path, "to_int"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
