// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Flow-scoped registries shared by every actor of one flow instance.
//!
//! * [`CallableRegistry`] - name to non-owning actor reference
//! * [`Variables`] - string environment used for `${name}` substitution
//! * [`Storage`] - payload cache for handing values across the tree

mod callable;
mod storage;
mod variables;

pub use callable::{ActorRef, CallableRegistry};
pub use storage::{Storage, StorageScope};
pub use variables::{ListenerId, VariableChange, VariableChangeKind, Variables};
