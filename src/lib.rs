// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod actors;     // shipped actor classes + factory
pub mod config;     // flow definitions + builder
pub mod engine;     // flow lifecycle and token drive
pub mod errors;     // error handling
pub mod observability;
pub mod scope;      // variables, storage, callables
pub mod token;      // tokens and payloads
pub mod traits;     // actor contract
