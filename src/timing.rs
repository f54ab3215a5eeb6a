//! Injectable randomness for arrival gaps, dining times, order choice and head count.
//!
//! Everything random in a run goes through [`Jitter`], so a run can be
//! thread-random, seeded for replay, or fully scripted in tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::types::{CountRange, DelayRange};

/// Source of simulated timing noise.
pub trait Jitter: Send + Sync + fmt::Debug {
    /// Duration drawn uniformly from `range` (millisecond resolution).
    fn sample(&self, range: DelayRange) -> Duration;

    /// Index in `0..len`. `len` is never zero.
    fn pick(&self, len: usize) -> usize;

    /// Count drawn uniformly from `range`.
    fn count(&self, range: CountRange) -> u32;
}

fn sample_with<R: Rng + ?Sized>(rng: &mut R, range: DelayRange) -> Duration {
    let lo = range.min.as_millis() as u64;
    let hi = range.max.as_millis() as u64;
    if lo >= hi {
        return range.min;
    }
    Duration::from_millis(rng.gen_range(lo..=hi))
}

fn pick_with<R: Rng + ?Sized>(rng: &mut R, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    rng.gen_range(0..len)
}

fn count_with<R: Rng + ?Sized>(rng: &mut R, range: CountRange) -> u32 {
    if range.min >= range.max {
        return range.min;
    }
    rng.gen_range(range.min..=range.max)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Thread-local RNG; different every run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadJitter;

impl Jitter for ThreadJitter {
    fn sample(&self, range: DelayRange) -> Duration {
        sample_with(&mut rand::thread_rng(), range)
    }

    fn pick(&self, len: usize) -> usize {
        pick_with(&mut rand::thread_rng(), len)
    }

    fn count(&self, range: CountRange) -> u32 {
        count_with(&mut rand::thread_rng(), range)
    }
}

/// Seeded RNG; the same seed replays the same draws in the same order.
#[derive(Debug)]
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Jitter for SeededJitter {
    fn sample(&self, range: DelayRange) -> Duration {
        sample_with(&mut *lock(&self.rng), range)
    }

    fn pick(&self, len: usize) -> usize {
        pick_with(&mut *lock(&self.rng), len)
    }

    fn count(&self, range: CountRange) -> u32 {
        count_with(&mut *lock(&self.rng), range)
    }
}

/// Replays scripted values; falls back to the low end of each range (index 0
/// for picks) once a script runs dry.
///
/// Delays are scripted per range, so arrival gaps and dining times can be
/// steered independently as long as the two ranges differ.
#[derive(Debug, Default)]
pub struct ScriptedJitter {
    delays: Mutex<HashMap<DelayRange, VecDeque<Duration>>>,
    picks: Mutex<VecDeque<usize>>,
    counts: Mutex<VecDeque<u32>>,
}

impl ScriptedJitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values returned, in order, by `sample(range)`. Clamped into the range.
    pub fn with_delays(self, range: DelayRange, script: impl IntoIterator<Item = Duration>) -> Self {
        lock(&self.delays)
            .entry(range)
            .or_default()
            .extend(script.into_iter().map(|d| d.clamp(range.min, range.max)));
        self
    }

    pub fn with_picks(self, script: impl IntoIterator<Item = usize>) -> Self {
        lock(&self.picks).extend(script);
        self
    }

    pub fn with_counts(self, script: impl IntoIterator<Item = u32>) -> Self {
        lock(&self.counts).extend(script);
        self
    }
}

impl Jitter for ScriptedJitter {
    fn sample(&self, range: DelayRange) -> Duration {
        lock(&self.delays)
            .get_mut(&range)
            .and_then(VecDeque::pop_front)
            .unwrap_or(range.min)
    }

    fn pick(&self, len: usize) -> usize {
        lock(&self.picks).pop_front().unwrap_or(0) % len.max(1)
    }

    fn count(&self, range: CountRange) -> u32 {
        lock(&self.counts)
            .pop_front()
            .map(|n| n.clamp(range.min, range.max))
            .unwrap_or(range.min)
    }
}
