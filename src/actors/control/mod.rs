// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Handlers: actors that own children and decide how tokens and control
//! move among them.

pub mod branch;
pub mod callable;
pub mod event_trigger;
pub mod local_scope;
pub mod loop_actor;
pub mod sequence;
pub mod switch;
pub mod tee;
pub mod trigger;
pub mod try_catch;

pub use branch::Branch;
pub use callable::{CallableActors, CallableRef};
pub use event_trigger::{EventTrigger, FirePolicy};
pub use local_scope::{LocalScopeTrigger, ScopeHandling};
pub use loop_actor::{Loop, LoopMode};
pub use sequence::Sequence;
pub use switch::Switch;
pub use tee::Tee;
pub use trigger::Trigger;
pub use try_catch::TryCatch;
