//! Test-only fixtures, instrumented stores and scripted randomness.

mod fixtures;
mod store;

pub(crate) use fixtures::{linear_fixture, snapshot_for, users_fixture, users_schema};
pub(crate) use store::CountingStore;

use crate::random::RandomSource;
use std::collections::VecDeque;

///
/// ScriptedRandom
///
/// Replays a fixed list of raw draws, then repeats the last one.
///

#[derive(Clone, Debug)]
pub(crate) struct ScriptedRandom {
    draws: VecDeque<u64>,
    last: u64,
}

impl ScriptedRandom {
    pub(crate) fn new(draws: impl IntoIterator<Item = u64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            last: 0,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn next_u64(&mut self) -> u64 {
        if let Some(next) = self.draws.pop_front() {
            self.last = next;
        }

        self.last
    }
}
