// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::Options;
use crate::errors::{ExecutionError, SetupError, SetupErrors};
use crate::scope::{ListenerId, Variables};
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorState {
    Inactive,
    Initialized,
    Executing,
    Stopped,
    Error,
}

/// State every actor carries: identity, options, flags and token queues.
#[derive(Debug)]
pub struct ActorBase {
    name: String,
    full_name: String,
    options: Options,
    /// Forward tokens unchanged instead of executing
    pub skip: bool,
    /// Log execution errors and drop the token instead of failing the flow
    pub non_fatal: bool,
    /// Fail the flow on error even when the flow continues on errors
    pub stop_flow_on_error: bool,
    pub annotation: Option<String>,
    state: ActorState,
    input: Option<Token>,
    output: VecDeque<Token>,
    stale: Arc<AtomicBool>,
    listener: Option<ListenerId>,
    wrapped_up: bool,
    cleaned_up: bool,
}

impl ActorBase {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            full_name: escape(&name),
            name,
            options: Options::new(),
            skip: false,
            non_fatal: false,
            stop_flow_on_error: false,
            annotation: None,
            state: ActorState::Inactive,
            input: None,
            output: VecDeque::new(),
            stale: Arc::new(AtomicBool::new(false)),
            listener: None,
            wrapped_up: false,
            cleaned_up: false,
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted tree path; dots inside names are escaped as `\.`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn attach(&mut self, parent: Option<&str>) {
        self.full_name = match parent {
            Some(parent) => format!("{}.{}", parent, escape(&self.name)),
            None => escape(&self.name),
        };
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn state(&self) -> ActorState {
        self.state
    }

    pub fn set_state(&mut self, state: ActorState) {
        self.state = state;
    }

    pub fn set_input(&mut self, token: Token) {
        self.input = Some(token);
    }

    pub fn take_input(&mut self) -> Option<Token> {
        self.input.take()
    }

    /// The pending input, or an error naming this actor.
    pub fn require_input(&mut self) -> Result<Token, ExecutionError> {
        self.input
            .take()
            .ok_or_else(|| self.fail("no input token available"))
    }

    pub fn push_output(&mut self, token: Token) {
        self.output.push_back(token);
    }

    pub fn pop_output(&mut self) -> Option<Token> {
        self.output.pop_front()
    }

    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    pub fn clear_tokens(&mut self) {
        self.input = None;
        self.output.clear();
    }

    /// An [`ExecutionError`] attributed to this actor.
    pub fn fail(&self, message: impl Into<String>) -> ExecutionError {
        ExecutionError::ActorFailed {
            path: self.full_name.clone(),
            message: message.into(),
        }
    }

    pub fn setup_error(&self, message: impl Into<String>) -> SetupError {
        SetupError::invalid(self.full_name.clone(), message)
    }

    /// Validates an option during setup.
    ///
    /// Options bound to variables cannot be checked before the variables are
    /// known and are reported as `None` without an error.
    pub fn check_option<T>(
        &self,
        key: &str,
        vars: &Variables,
        required: bool,
        errors: &mut SetupErrors,
    ) -> Option<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if !self.options.contains(key) {
            if required {
                errors.push(SetupError::MissingOption {
                    path: self.full_name.clone(),
                    option: key.to_string(),
                });
            }
            return None;
        }
        if self.options.is_variable_bound(key) {
            return None;
        }
        match self.options.parse::<T>(key, vars) {
            Ok(value) => value,
            Err(message) => {
                errors.push(SetupError::InvalidOption {
                    path: self.full_name.clone(),
                    option: key.to_string(),
                    message,
                });
                None
            }
        }
    }

    /// Resolves an option at execution time, expanding variables.
    pub fn option<T>(&self, key: &str, vars: &Variables) -> Result<Option<T>, ExecutionError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.options
            .parse::<T>(key, vars)
            .map_err(|message| self.fail(format!("option '{}': {}", key, message)))
    }

    /// Like [`ActorBase::option`] but falls back to `default` when unset.
    pub fn option_or<T>(&self, key: &str, vars: &Variables, default: T) -> Result<T, ExecutionError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.option(key, vars)?.unwrap_or(default))
    }

    pub(crate) fn stale_flag(&self) -> Arc<AtomicBool> {
        self.stale.clone()
    }

    /// Clears and returns the "variables changed" flag.
    pub(crate) fn take_stale(&self) -> bool {
        self.stale.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn set_listener(&mut self, listener: Option<ListenerId>) -> Option<ListenerId> {
        std::mem::replace(&mut self.listener, listener)
    }

    /// Marks wrap-up done; `false` if it already ran.
    pub(crate) fn begin_wrap_up(&mut self) -> bool {
        !std::mem::replace(&mut self.wrapped_up, true)
    }

    /// Marks clean-up done; `false` if it already ran.
    pub(crate) fn begin_clean_up(&mut self) -> bool {
        !std::mem::replace(&mut self.cleaned_up, true)
    }

    /// Re-arms the lifecycle so the actor can take part in another run.
    pub(crate) fn reset_lifecycle(&mut self) {
        self.wrapped_up = false;
        self.cleaned_up = false;
        self.clear_tokens();
    }
}

fn escape(name: &str) -> String {
    name.replace('.', "\\.")
}
