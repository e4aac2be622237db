// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod actor;
pub mod base;
pub mod condition;

pub use actor::{share, Actor, ActorRole, CombinationPolicy, SharedActor};
pub use base::{ActorBase, ActorState};
pub use condition::Condition;
