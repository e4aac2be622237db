// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod options;
mod runtime;
mod validation;

pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, save_config, ActorConfig, ExecutorOptions, FlowConfig,
};
pub use options::Options;
pub use runtime::FlowBuilder;
pub use validation::validate_flow_config;
