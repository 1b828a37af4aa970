// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of build timestamps, in whole seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        unix_seconds(SystemTime::now())
    }
}

/// Deterministic clock that advances by one second per reading.
#[derive(Debug)]
pub struct TickClock {
    next: AtomicU64,
}

impl TickClock {
    pub fn starting_at(seconds: u64) -> Self {
        Self {
            next: AtomicU64::new(seconds),
        }
    }

    /// Start `offset` seconds after the current wall time, so files written
    /// just before a build are never newer than its timestamps.
    pub fn after_now(offset: u64) -> Self {
        Self::starting_at(SystemClock.now() + offset)
    }

    /// The value the next call to [`Clock::now`] will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Clock for TickClock {
    fn now(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

/// Whole seconds since the epoch; times before it read as zero.
pub fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
