// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod context;
pub mod director;
pub mod flow;
pub mod pipeline;

#[cfg(test)]
mod integration_tests;

pub use context::{ErrorLogEntry, FireHandle, FlowContext, FlowSettings};
pub use flow::{Flow, FlowHandle, FlowReport, FlowState, FLOW_ID_VARIABLE, FLOW_NAME_VARIABLE};
