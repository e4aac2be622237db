// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Conditions used by `switch` and `loop`.
//!
//! Conditions are declared in flow files as tagged maps:
//!
//! ```yaml
//! conditions:
//!   - { type: numeric_range, min: 0, max: 9 }
//!   - { type: matches, pattern: "^err" }
//!   - { type: not, condition: { type: payload_type, payload_type: text } }
//! ```
//!
//! Values inside conditions may reference variables; they are expanded each
//! time the condition is evaluated.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::FlowContext;
use crate::errors::ExecutionError;
use crate::scope::StorageScope;
use crate::token::{PayloadType, Token};
use crate::traits::Condition;

fn default_inclusive() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionConfig {
    Always,
    Never,
    /// Token text equals `value`.
    Equals { value: String },
    /// Token (or `variable`) read as a number lies within `min..max`.
    NumericRange {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default = "default_inclusive")]
        inclusive: bool,
        #[serde(default)]
        variable: Option<String>,
    },
    /// Token text matches the regular expression.
    Matches { pattern: String },
    PayloadType { payload_type: PayloadType },
    VariableEquals { variable: String, value: String },
    /// Flow-scoped storage holds `key`.
    StorageHas { key: String },
    Not { condition: Box<ConditionConfig> },
}

impl ConditionConfig {
    /// Parses a single condition from its YAML form.
    pub fn from_value(value: &serde_yaml::Value) -> Result<Self, String> {
        serde_yaml::from_value(value.clone()).map_err(|e| format!("invalid condition: {}", e))
    }

    pub fn build(&self) -> Result<Box<dyn Condition>, String> {
        Ok(match self {
            ConditionConfig::Always => Box::new(Constant(true)),
            ConditionConfig::Never => Box::new(Constant(false)),
            ConditionConfig::Equals { value } => Box::new(Equals {
                value: value.clone(),
            }),
            ConditionConfig::NumericRange {
                min,
                max,
                inclusive,
                variable,
            } => {
                if let (Some(min), Some(max)) = (min, max) {
                    if min > max {
                        return Err(format!("min {} is greater than max {}", min, max));
                    }
                }
                Box::new(NumericRange {
                    min: *min,
                    max: *max,
                    inclusive: *inclusive,
                    variable: variable.clone(),
                })
            }
            ConditionConfig::Matches { pattern } => Box::new(Matches {
                regex: Regex::new(pattern).map_err(|e| format!("invalid pattern: {}", e))?,
            }),
            ConditionConfig::PayloadType { payload_type } => Box::new(TypeIs(*payload_type)),
            ConditionConfig::VariableEquals { variable, value } => Box::new(VariableEquals {
                variable: variable.clone(),
                value: value.clone(),
            }),
            ConditionConfig::StorageHas { key } => Box::new(StorageHas { key: key.clone() }),
            ConditionConfig::Not { condition } => Box::new(Not(condition.build()?)),
        })
    }
}

struct Constant(bool);

impl Condition for Constant {
    fn evaluate(&self, _token: Option<&Token>, _ctx: &FlowContext) -> Result<bool, ExecutionError> {
        Ok(self.0)
    }

    fn describe(&self) -> String {
        if self.0 { "always" } else { "never" }.to_string()
    }
}

struct Equals {
    value: String,
}

impl Condition for Equals {
    fn evaluate(&self, token: Option<&Token>, ctx: &FlowContext) -> Result<bool, ExecutionError> {
        Ok(token
            .map(|t| t.payload().to_text() == ctx.variables().expand(&self.value))
            .unwrap_or(false))
    }

    fn describe(&self) -> String {
        format!("== {}", self.value)
    }
}

struct NumericRange {
    min: Option<f64>,
    max: Option<f64>,
    inclusive: bool,
    variable: Option<String>,
}

impl NumericRange {
    fn contains(&self, n: f64) -> bool {
        let above = match self.min {
            Some(min) if self.inclusive => n >= min,
            Some(min) => n > min,
            None => true,
        };
        let below = match self.max {
            Some(max) if self.inclusive => n <= max,
            Some(max) => n < max,
            None => true,
        };
        above && below
    }
}

impl Condition for NumericRange {
    fn evaluate(&self, token: Option<&Token>, ctx: &FlowContext) -> Result<bool, ExecutionError> {
        let number = match &self.variable {
            Some(name) => ctx
                .variables()
                .get(name)
                .and_then(|v| v.trim().parse::<f64>().ok()),
            None => token.and_then(|t| t.payload().as_f64()),
        };
        Ok(number.map(|n| self.contains(n)).unwrap_or(false))
    }

    fn describe(&self) -> String {
        let (open, close) = if self.inclusive { ("[", "]") } else { ("(", ")") };
        let bound = |b: Option<f64>| b.map(|v| v.to_string()).unwrap_or_else(|| "*".to_string());
        let subject = self.variable.as_deref().unwrap_or("token");
        format!("{} in {}{}, {}{}", subject, open, bound(self.min), bound(self.max), close)
    }
}

struct Matches {
    regex: Regex,
}

impl Condition for Matches {
    fn evaluate(&self, token: Option<&Token>, _ctx: &FlowContext) -> Result<bool, ExecutionError> {
        Ok(token
            .map(|t| self.regex.is_match(&t.payload().to_text()))
            .unwrap_or(false))
    }

    fn describe(&self) -> String {
        format!("~ /{}/", self.regex.as_str())
    }
}

struct TypeIs(PayloadType);

impl Condition for TypeIs {
    fn evaluate(&self, token: Option<&Token>, _ctx: &FlowContext) -> Result<bool, ExecutionError> {
        Ok(token.map(|t| t.payload_type() == self.0).unwrap_or(false))
    }

    fn describe(&self) -> String {
        format!("is {}", self.0)
    }
}

struct VariableEquals {
    variable: String,
    value: String,
}

impl Condition for VariableEquals {
    fn evaluate(&self, _token: Option<&Token>, ctx: &FlowContext) -> Result<bool, ExecutionError> {
        let vars = ctx.variables();
        Ok(vars.get(&self.variable).as_deref() == Some(vars.expand(&self.value).as_str()))
    }

    fn describe(&self) -> String {
        format!("${{{}}} == {}", self.variable, self.value)
    }
}

struct StorageHas {
    key: String,
}

impl Condition for StorageHas {
    fn evaluate(&self, _token: Option<&Token>, ctx: &FlowContext) -> Result<bool, ExecutionError> {
        let key = ctx.variables().expand(&self.key);
        Ok(ctx.storage().has(&StorageScope::Flow, &key))
    }

    fn describe(&self) -> String {
        format!("storage has {}", self.key)
    }
}

struct Not(Box<dyn Condition>);

impl Condition for Not {
    fn evaluate(&self, token: Option<&Token>, ctx: &FlowContext) -> Result<bool, ExecutionError> {
        Ok(!self.0.evaluate(token, ctx)?)
    }

    fn describe(&self) -> String {
        format!("not ({})", self.0.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FlowSettings;
    use crate::token::Payload;

    fn condition(yaml: &str) -> Box<dyn Condition> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        ConditionConfig::from_value(&value).unwrap().build().unwrap()
    }

    #[test]
    fn test_token_conditions() {
        struct TestCase {
            name: &'static str,
            yaml: &'static str,
            payload: Payload,
            expected: bool,
        }

        let cases = vec![
            TestCase {
                name: "equals text",
                yaml: "{type: equals, value: abc}",
                payload: Payload::from("abc"),
                expected: true,
            },
            TestCase {
                name: "equals integer as text",
                yaml: "{type: equals, value: '3'}",
                payload: Payload::Integer(3),
                expected: true,
            },
            TestCase {
                name: "inclusive upper bound",
                yaml: "{type: numeric_range, min: 0, max: 9}",
                payload: Payload::Integer(9),
                expected: true,
            },
            TestCase {
                name: "exclusive upper bound",
                yaml: "{type: numeric_range, min: 0, max: 9, inclusive: false}",
                payload: Payload::Integer(9),
                expected: false,
            },
            TestCase {
                name: "numeric text",
                yaml: "{type: numeric_range, min: 10}",
                payload: Payload::from("12.5"),
                expected: true,
            },
            TestCase {
                name: "non numeric never in range",
                yaml: "{type: numeric_range}",
                payload: Payload::from("abc"),
                expected: false,
            },
            TestCase {
                name: "regex",
                yaml: "{type: matches, pattern: '^err'}",
                payload: Payload::from("error: disk full"),
                expected: true,
            },
            TestCase {
                name: "payload type",
                yaml: "{type: payload_type, payload_type: float}",
                payload: Payload::Float(1.5),
                expected: true,
            },
            TestCase {
                name: "negation",
                yaml: "{type: not, condition: {type: always}}",
                payload: Payload::Null,
                expected: false,
            },
        ];

        let ctx = FlowContext::new(FlowSettings::default());
        for case in cases {
            let token = Token::anonymous(case.payload);
            let result = condition(case.yaml).evaluate(Some(&token), &ctx).unwrap();
            assert_eq!(result, case.expected, "{}", case.name);
        }
    }

    #[test]
    fn test_token_conditions_without_token_are_false() {
        let ctx = FlowContext::new(FlowSettings::default());
        for yaml in [
            "{type: equals, value: x}",
            "{type: matches, pattern: x}",
            "{type: numeric_range}",
        ] {
            assert!(!condition(yaml).evaluate(None, &ctx).unwrap(), "{}", yaml);
        }
    }

    #[test]
    fn test_variable_conditions_follow_variable_changes() {
        let ctx = FlowContext::new(FlowSettings::default());
        let done = condition("{type: variable_equals, variable: state, value: done}");
        let late = condition("{type: numeric_range, variable: i, min: 3}");

        assert!(!done.evaluate(None, &ctx).unwrap());
        assert!(!late.evaluate(None, &ctx).unwrap());

        ctx.variables().set("state", "done");
        ctx.variables().set("i", "3");
        assert!(done.evaluate(None, &ctx).unwrap());
        assert!(late.evaluate(None, &ctx).unwrap());
    }

    #[test]
    fn test_invalid_conditions_are_rejected() {
        let cases = [
            "{type: matches, pattern: '('}",
            "{type: numeric_range, min: 5, max: 1}",
        ];
        for yaml in cases {
            let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
            let config = ConditionConfig::from_value(&value).unwrap();
            assert!(config.build().is_err(), "{}", yaml);
        }

        let unknown: serde_yaml::Value = serde_yaml::from_str("{type: sometimes}").unwrap();
        assert!(ConditionConfig::from_value(&unknown).is_err());
    }
}
