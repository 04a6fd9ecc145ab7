//! Shrinking heuristic implementation
//!
//! A variable sitting at a bound whose gradient points further outward
//! than the largest current violation is unlikely to move again, so it is
//! temporarily removed from working-set selection.
//!
//! The solver keeps the gradient exact for every variable, so shrinking
//! never has to reconstruct it: unshrinking only widens the active list.

use crate::solver::smo::{AlphaStatus, SolverVariant};

/// Indices currently eligible for working-set selection
#[derive(Debug, Clone)]
pub struct ActiveSet {
    indices: Vec<usize>,
    total: usize,
    unshrunk: bool,
}

impl ActiveSet {
    /// Every variable of an `n`-variable problem starts active
    pub fn new(n: usize) -> Self {
        Self {
            indices: (0..n).collect(),
            total: n,
            unshrunk: false,
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Whether no variable is currently shrunk
    pub fn is_full(&self) -> bool {
        self.indices.len() == self.total
    }

    /// Make every variable active again
    pub fn reset(&mut self) {
        if !self.is_full() {
            self.indices = (0..self.total).collect();
        }
    }

    /// Keep only the variables for which `keep` holds
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize) -> bool,
    {
        self.indices.retain(|&t| keep(t));
    }

    /// Shrink with the given thresholds
    ///
    /// The first time the violation gap falls within `10 * eps` every
    /// variable is restored before shrinking, so variables shrunk early on
    /// a coarse gradient get reconsidered once near the optimum.
    pub fn shrink(
        &mut self,
        thresholds: &Thresholds,
        eps: f64,
        y: &[i8],
        g: &[f64],
        status: &[AlphaStatus],
    ) {
        if !self.unshrunk && thresholds.gap() <= eps * 10.0 {
            self.unshrunk = true;
            self.reset();
        }
        self.retain(|t| !thresholds.should_shrink(y[t], g[t], status[t]));
    }
}

/// Largest violations over the active set
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Thresholds {
    Standard { gmax1: f64, gmax2: f64 },
    Nu { gmax1: f64, gmax2: f64, gmax3: f64, gmax4: f64 },
}

impl Thresholds {
    pub fn compute(
        variant: SolverVariant,
        active: &[usize],
        y: &[i8],
        g: &[f64],
        status: &[AlphaStatus],
    ) -> Self {
        match variant {
            SolverVariant::Standard => {
                let mut gmax1 = f64::NEG_INFINITY;
                let mut gmax2 = f64::NEG_INFINITY;
                for &i in active {
                    let (up, down) = if y[i] == 1 {
                        (&mut gmax1, &mut gmax2)
                    } else {
                        (&mut gmax2, &mut gmax1)
                    };
                    if status[i] != AlphaStatus::UpperBound && -g[i] >= *up {
                        *up = -g[i];
                    }
                    if status[i] != AlphaStatus::LowerBound && g[i] >= *down {
                        *down = g[i];
                    }
                }
                Thresholds::Standard { gmax1, gmax2 }
            }
            SolverVariant::Nu => {
                let mut gmax1 = f64::NEG_INFINITY;
                let mut gmax2 = f64::NEG_INFINITY;
                let mut gmax3 = f64::NEG_INFINITY;
                let mut gmax4 = f64::NEG_INFINITY;
                for &i in active {
                    if status[i] != AlphaStatus::UpperBound {
                        if y[i] == 1 {
                            gmax1 = gmax1.max(-g[i]);
                        } else {
                            gmax4 = gmax4.max(-g[i]);
                        }
                    }
                    if status[i] != AlphaStatus::LowerBound {
                        if y[i] == 1 {
                            gmax2 = gmax2.max(g[i]);
                        } else {
                            gmax3 = gmax3.max(g[i]);
                        }
                    }
                }
                Thresholds::Nu {
                    gmax1,
                    gmax2,
                    gmax3,
                    gmax4,
                }
            }
        }
    }

    /// Current maximal violation
    pub fn gap(&self) -> f64 {
        match *self {
            Thresholds::Standard { gmax1, gmax2 } => gmax1 + gmax2,
            Thresholds::Nu {
                gmax1,
                gmax2,
                gmax3,
                gmax4,
            } => (gmax1 + gmax2).max(gmax3 + gmax4),
        }
    }

    pub fn should_shrink(&self, y: i8, g: f64, status: AlphaStatus) -> bool {
        let positive = y == 1;
        match (*self, status) {
            (_, AlphaStatus::Free) => false,
            (Thresholds::Standard { gmax1, gmax2 }, AlphaStatus::UpperBound) => {
                -g > if positive { gmax1 } else { gmax2 }
            }
            (Thresholds::Standard { gmax1, gmax2 }, AlphaStatus::LowerBound) => {
                g > if positive { gmax2 } else { gmax1 }
            }
            (Thresholds::Nu { gmax1, gmax4, .. }, AlphaStatus::UpperBound) => {
                -g > if positive { gmax1 } else { gmax4 }
            }
            (Thresholds::Nu { gmax2, gmax3, .. }, AlphaStatus::LowerBound) => {
                g > if positive { gmax2 } else { gmax3 }
            }
        }
    }
}
