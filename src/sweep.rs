// RAPL-SWEEP FREQUENCY PLANS
// PURE-RUST MODULE: NO PROCESS OR FILESYSTEM ACCESS
//
// A SWEEP IS A SMALL VALUE (KIND + STEP + COUNT). ITERATING IT IS LAZY AND
// RESTARTABLE: EVERY CALL TO iter() STARTS AGAIN FROM ZERO.
// FREQUENCY 0 IS THE "POLLING DISABLED" SENTINEL, NOT AN INFINITELY SLOW RATE.

use crate::error::{Error, Result};

// REQUESTED FREQUENCY (HZ) -> POLLING INTERVAL (SECONDS)
// 0, NEGATIVE AND NaN ALL MAP TO 0: THE RECIPROCAL IS NEVER TAKEN FOR THEM.
pub fn hz_to_interval(hz: f64) -> f64 {
    if hz > 0.0 {
        1.0 / hz
    } else {
        0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepKind {
    Linear,
    Fibonacci,
}

impl SweepKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Linear => "LINEAR",
            Self::Fibonacci => "FIBONACCI",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sweep {
    kind: SweepKind,
    step: f64,
    count: u32,
}

impl Sweep {
    // 0, step, 2*step, ..., count*step (count + 1 POINTS)
    pub fn linear(step: f64, count: u32) -> Result<Self> {
        Self::new(SweepKind::Linear, step, count)
    }

    // 0, 1, 2, 3, 5, 8, ... SCALED BY scale (count + 1 POINTS)
    pub fn fibonacci(scale: f64, count: u32) -> Result<Self> {
        Self::new(SweepKind::Fibonacci, scale, count)
    }

    pub fn new(kind: SweepKind, step: f64, count: u32) -> Result<Self> {
        if !step.is_finite() || step < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "sweep step must be a non-negative finite number, got {step}"
            )));
        }
        Ok(Self { kind, step, count })
    }

    pub fn kind(&self) -> SweepKind {
        self.kind
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn iter(&self) -> SweepIter {
        SweepIter {
            kind: self.kind,
            step: self.step,
            index: 0,
            end: u64::from(self.count) + 1,
            fib: (1, 1),
        }
    }
}

impl IntoIterator for &Sweep {
    type Item = f64;
    type IntoIter = SweepIter;

    fn into_iter(self) -> SweepIter {
        self.iter()
    }
}

#[derive(Clone, Debug)]
pub struct SweepIter {
    kind: SweepKind,
    step: f64,
    index: u64,
    end: u64,
    // (a, b) OF THE FIBONACCI RECURRENCE; b IS THE NEXT MULTIPLIER
    fib: (u64, u64),
}

impl Iterator for SweepIter {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.index >= self.end {
            return None;
        }
        let i = self.index;
        self.index += 1;

        // MULTIPLY, NEVER ACCUMULATE: POINT i IS EXACTLY i * step
        let multiplier = match self.kind {
            SweepKind::Linear => i,
            SweepKind::Fibonacci => {
                if i == 0 {
                    0
                } else {
                    let (a, b) = self.fib;
                    self.fib = (b, a.saturating_add(b));
                    b
                }
            }
        };
        Some(multiplier as f64 * self.step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.end - self.index) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for SweepIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_sentinels() {
        assert_eq!(hz_to_interval(0.0), 0.0);
        assert_eq!(hz_to_interval(-5.0), 0.0);
        assert_eq!(hz_to_interval(f64::NAN), 0.0);
        assert_eq!(hz_to_interval(1000.0), 0.001);
    }

    #[test]
    fn fibonacci_multipliers() {
        let pts: Vec<f64> = Sweep::fibonacci(1.0, 7).unwrap().iter().collect();
        assert_eq!(pts, vec![0.0, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0]);
    }

    #[test]
    fn size_hint_tracks_progress() {
        let sweep = Sweep::linear(10.0, 4).unwrap();
        let mut it = sweep.iter();
        assert_eq!(it.len(), 5);
        it.next();
        it.next();
        assert_eq!(it.len(), 3);
    }

    #[test]
    fn rejects_negative_step() {
        assert!(matches!(Sweep::linear(-1.0, 3), Err(Error::InvalidArgument(_))));
        assert!(matches!(Sweep::linear(f64::INFINITY, 3), Err(Error::InvalidArgument(_))));
    }
}
