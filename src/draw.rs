use rand::Rng;
use thiserror::Error;

use crate::column::Column;

/// A draw was attempted against an empty pool. Callers placing numbers on a
/// card convert this into a template over-allocation error, since a validated
/// template can never run a 15-number pool dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("number pool for column {0} is exhausted")]
pub struct PoolExhausted(pub Column);

/// Fisher-Yates: walk from the back, swapping each element with a uniformly
/// chosen element at or before it. Every permutation is equally likely.
pub fn shuffle<T, R: Rng + ?Sized>(rng: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// A private, shuffled copy of one column's numbers. Draws pop from the end,
/// so the same pool never hands out a value twice.
#[derive(Debug, Clone)]
pub struct DrawPool {
    column: Column,
    numbers: Vec<u8>,
}

impl DrawPool {
    pub fn fresh<R: Rng + ?Sized>(column: Column, rng: &mut R) -> Self {
        let mut numbers = column.pool();
        shuffle(rng, &mut numbers);
        Self { column, numbers }
    }

    pub fn draw(&mut self) -> Result<u8, PoolExhausted> {
        self.numbers.pop().ok_or(PoolExhausted(self.column))
    }

    pub fn remaining(&self) -> usize {
        self.numbers.len()
    }
}

/// One card's worth of draws. Every column gets its own fresh pool, so cards
/// generated back to back (or concurrently) never see each other's numbers.
#[derive(Debug, Clone)]
pub struct DrawSession {
    pools: [DrawPool; Column::ALL.len()],
}

impl DrawSession {
    pub fn fresh<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            pools: Column::ALL.map(|column| DrawPool::fresh(column, rng)),
        }
    }

    pub fn draw(&mut self, column: Column) -> Result<u8, PoolExhausted> {
        self.pools[column.index()].draw()
    }

    pub fn remaining(&self, column: Column) -> usize {
        self.pools[column.index()].remaining()
    }
}
