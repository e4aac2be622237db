// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Iteration cap of an `until` loop that sets no `max_iterations`
pub const DEFAULT_MAX_ITERATIONS: u64 = 1000;
/// Parallel branch workers when the host parallelism cannot be read
pub const FALLBACK_MAX_THREADS: usize = 4;
/// `max_threads` value of a branch meaning "use the flow setting"
pub const FLOW_MAX_THREADS: i64 = -1;
