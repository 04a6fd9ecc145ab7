//! Sequential Minimal Optimization (SMO) solver implementation
//!
//! Solves the SVM dual
//!
//! ```text
//! min 0.5 a^T Q a + p^T a   s.t.  y^T a = const,  0 <= a_i <= C_i
//! ```
//!
//! by repeatedly optimizing a pair of variables chosen with second-order
//! working-set selection. The `Nu` variant adds the second equality
//! constraint of the nu formulations and picks both variables from the
//! same class.

use crate::solver::qmatrix::QMatrix;
use crate::solver::shrinking::{ActiveSet, Thresholds};
use log::{debug, warn};

const TAU: f64 = 1e-12;
const INF: f64 = f64::INFINITY;

/// Alpha variable status relative to its box constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaStatus {
    LowerBound,
    UpperBound,
    Free,
}

/// Standard vs nu solver variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverVariant {
    Standard,
    Nu,
}

/// Box constraints and stopping rule of one solve
#[derive(Debug, Clone, Copy)]
pub struct SmoConfig {
    /// Upper bound for variables with `y = +1`
    pub cp: f64,
    /// Upper bound for variables with `y = -1`
    pub cn: f64,
    /// Stopping tolerance on the maximal violation
    pub eps: f64,
    pub shrinking: bool,
}

/// Result of one solve
#[derive(Debug, Clone)]
pub struct SolutionInfo {
    pub obj: f64,
    pub rho: f64,
    pub upper_bound_p: f64,
    pub upper_bound_n: f64,
    /// `(r1 + r2) / 2` for the nu variant, 0 otherwise
    pub r: f64,
    pub iterations: usize,
}

/// SMO solver for SVM optimization
pub struct SMOSolver<'q> {
    variant: SolverVariant,
    config: SmoConfig,
    q: &'q mut dyn QMatrix,
    qd: Vec<f64>,
    y: Vec<i8>,
    p: Vec<f64>,
    g: Vec<f64>,
    alpha: Vec<f64>,
    status: Vec<AlphaStatus>,
    active: ActiveSet,
}

impl<'q> SMOSolver<'q> {
    /// Solve the dual; `alpha` holds the starting point and receives the solution
    pub fn solve(
        variant: SolverVariant,
        config: SmoConfig,
        q: &'q mut dyn QMatrix,
        p: &[f64],
        y: &[i8],
        alpha: &mut [f64],
    ) -> SolutionInfo {
        let l = q.len();
        let qd = q.diagonal().to_vec();

        let mut solver = SMOSolver {
            variant,
            config,
            q,
            qd,
            y: y.to_vec(),
            p: p.to_vec(),
            g: p.to_vec(),
            alpha: alpha.to_vec(),
            status: vec![AlphaStatus::LowerBound; l],
            active: ActiveSet::new(l),
        };

        for i in 0..l {
            solver.update_alpha_status(i);
        }
        for i in 0..l {
            if solver.status[i] != AlphaStatus::LowerBound {
                let alpha_i = solver.alpha[i];
                let q_i = solver.q.column(i);
                for (g, &q_ij) in solver.g.iter_mut().zip(q_i.iter()) {
                    *g += alpha_i * q_ij;
                }
            }
        }

        let iterations = solver.run();
        let (rho, r) = solver.calculate_rho();
        let obj = (0..l)
            .map(|i| solver.alpha[i] * (solver.g[i] + solver.p[i]))
            .sum::<f64>()
            / 2.0;

        alpha.copy_from_slice(&solver.alpha);
        debug!("optimization finished, #iter = {}", iterations);

        SolutionInfo {
            obj,
            rho,
            upper_bound_p: config.cp,
            upper_bound_n: config.cn,
            r,
            iterations,
        }
    }

    /// Main loop; returns the number of pair updates
    fn run(&mut self) -> usize {
        let l = self.alpha.len();
        let max_iter = 10_000_000usize.max(l.saturating_mul(100));
        let mut counter = l.min(1000) + 1;
        let mut iter = 0usize;

        while iter < max_iter {
            counter -= 1;
            if counter == 0 {
                counter = l.min(1000);
                if self.config.shrinking {
                    self.do_shrinking();
                }
            }

            let (i, j) = match self.select_working_set() {
                Some(pair) => pair,
                None if self.active.is_full() => break,
                None => {
                    self.active.reset();
                    match self.select_working_set() {
                        Some(pair) => {
                            counter = 1;
                            pair
                        }
                        None => break,
                    }
                }
            };

            iter += 1;
            self.update_alpha_pair(i, j);
        }

        if iter >= max_iter {
            self.active.reset();
            warn!("reaching max number of iterations");
        }
        iter
    }

    fn get_c(&self, i: usize) -> f64 {
        if self.y[i] > 0 {
            self.config.cp
        } else {
            self.config.cn
        }
    }

    fn update_alpha_status(&mut self, i: usize) {
        self.status[i] = if self.alpha[i] >= self.get_c(i) {
            AlphaStatus::UpperBound
        } else if self.alpha[i] <= 0.0 {
            AlphaStatus::LowerBound
        } else {
            AlphaStatus::Free
        };
    }

    fn is_upper_bound(&self, i: usize) -> bool {
        self.status[i] == AlphaStatus::UpperBound
    }

    fn is_lower_bound(&self, i: usize) -> bool {
        self.status[i] == AlphaStatus::LowerBound
    }

    fn do_shrinking(&mut self) {
        let thresholds = Thresholds::compute(
            self.variant,
            self.active.indices(),
            &self.y,
            &self.g,
            &self.status,
        );
        self.active
            .shrink(&thresholds, self.config.eps, &self.y, &self.g, &self.status);
    }

    fn select_working_set(&mut self) -> Option<(usize, usize)> {
        match self.variant {
            SolverVariant::Standard => self.select_working_set_standard(),
            SolverVariant::Nu => self.select_working_set_nu(),
        }
    }

    /// Second-order objective decrease for a candidate pair
    fn obj_diff(grad_diff: f64, quad_coef: f64) -> f64 {
        if quad_coef > 0.0 {
            -(grad_diff * grad_diff) / quad_coef
        } else {
            -(grad_diff * grad_diff) / TAU
        }
    }

    fn select_working_set_standard(&mut self) -> Option<(usize, usize)> {
        let mut gmax = -INF;
        let mut gmax2 = -INF;
        let mut gmax_idx = None;
        let mut gmin_idx = None;
        let mut obj_diff_min = INF;

        // i maximizes -y_i * grad(f)_i over I_up
        for &t in self.active.indices() {
            if self.y[t] == 1 {
                if !self.is_upper_bound(t) && -self.g[t] >= gmax {
                    gmax = -self.g[t];
                    gmax_idx = Some(t);
                }
            } else if !self.is_lower_bound(t) && self.g[t] >= gmax {
                gmax = self.g[t];
                gmax_idx = Some(t);
            }
        }

        let i = gmax_idx?;
        let q_i = self.q.column(i);
        let yi = f64::from(self.y[i]);

        // j minimizes the second-order objective decrease over I_low
        for &j in self.active.indices() {
            if self.y[j] == 1 {
                if !self.is_lower_bound(j) {
                    let grad_diff = gmax + self.g[j];
                    gmax2 = gmax2.max(self.g[j]);
                    if grad_diff > 0.0 {
                        let quad_coef = self.qd[i] + self.qd[j] - 2.0 * yi * q_i[j];
                        let obj_diff = Self::obj_diff(grad_diff, quad_coef);
                        if obj_diff <= obj_diff_min {
                            gmin_idx = Some(j);
                            obj_diff_min = obj_diff;
                        }
                    }
                }
            } else if !self.is_upper_bound(j) {
                let grad_diff = gmax - self.g[j];
                gmax2 = gmax2.max(-self.g[j]);
                if grad_diff > 0.0 {
                    let quad_coef = self.qd[i] + self.qd[j] + 2.0 * yi * q_i[j];
                    let obj_diff = Self::obj_diff(grad_diff, quad_coef);
                    if obj_diff <= obj_diff_min {
                        gmin_idx = Some(j);
                        obj_diff_min = obj_diff;
                    }
                }
            }
        }

        if gmax + gmax2 < self.config.eps {
            return None;
        }
        gmin_idx.map(|j| (i, j))
    }

    fn select_working_set_nu(&mut self) -> Option<(usize, usize)> {
        let mut gmaxp = -INF;
        let mut gmaxp2 = -INF;
        let mut gmaxp_idx = None;
        let mut gmaxn = -INF;
        let mut gmaxn2 = -INF;
        let mut gmaxn_idx = None;
        let mut gmin_idx = None;
        let mut obj_diff_min = INF;

        for &t in self.active.indices() {
            if self.y[t] == 1 {
                if !self.is_upper_bound(t) && -self.g[t] >= gmaxp {
                    gmaxp = -self.g[t];
                    gmaxp_idx = Some(t);
                }
            } else if !self.is_lower_bound(t) && self.g[t] >= gmaxn {
                gmaxn = self.g[t];
                gmaxn_idx = Some(t);
            }
        }

        let q_ip = gmaxp_idx.map(|ip| self.q.column(ip));
        let q_in = gmaxn_idx.map(|in_| self.q.column(in_));

        for &j in self.active.indices() {
            if self.y[j] == 1 {
                if !self.is_lower_bound(j) {
                    let grad_diff = gmaxp + self.g[j];
                    gmaxp2 = gmaxp2.max(self.g[j]);
                    if let (true, Some(ip), Some(q_ip)) = (grad_diff > 0.0, gmaxp_idx, &q_ip) {
                        let quad_coef = self.qd[ip] + self.qd[j] - 2.0 * q_ip[j];
                        let obj_diff = Self::obj_diff(grad_diff, quad_coef);
                        if obj_diff <= obj_diff_min {
                            gmin_idx = Some(j);
                            obj_diff_min = obj_diff;
                        }
                    }
                }
            } else if !self.is_upper_bound(j) {
                let grad_diff = gmaxn - self.g[j];
                gmaxn2 = gmaxn2.max(-self.g[j]);
                if let (true, Some(in_), Some(q_in)) = (grad_diff > 0.0, gmaxn_idx, &q_in) {
                    let quad_coef = self.qd[in_] + self.qd[j] - 2.0 * q_in[j];
                    let obj_diff = Self::obj_diff(grad_diff, quad_coef);
                    if obj_diff <= obj_diff_min {
                        gmin_idx = Some(j);
                        obj_diff_min = obj_diff;
                    }
                }
            }
        }

        if (gmaxp + gmaxp2).max(gmaxn + gmaxn2) < self.config.eps {
            return None;
        }
        let j = gmin_idx?;
        let i = if self.y[j] == 1 { gmaxp_idx? } else { gmaxn_idx? };
        Some((i, j))
    }

    fn update_alpha_pair(&mut self, i: usize, j: usize) {
        let q_i = self.q.column(i);
        let q_j = self.q.column(j);

        let c_i = self.get_c(i);
        let c_j = self.get_c(j);

        let old_alpha_i = self.alpha[i];
        let old_alpha_j = self.alpha[j];

        if self.y[i] != self.y[j] {
            let mut quad_coef = self.qd[i] + self.qd[j] + 2.0 * q_i[j];
            if quad_coef <= 0.0 {
                quad_coef = TAU;
            }
            let delta = (-self.g[i] - self.g[j]) / quad_coef;
            let diff = self.alpha[i] - self.alpha[j];
            self.alpha[i] += delta;
            self.alpha[j] += delta;

            if diff > 0.0 {
                if self.alpha[j] < 0.0 {
                    self.alpha[j] = 0.0;
                    self.alpha[i] = diff;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = -diff;
            }
            if diff > c_i - c_j {
                if self.alpha[i] > c_i {
                    self.alpha[i] = c_i;
                    self.alpha[j] = c_i - diff;
                }
            } else if self.alpha[j] > c_j {
                self.alpha[j] = c_j;
                self.alpha[i] = c_j + diff;
            }
        } else {
            let mut quad_coef = self.qd[i] + self.qd[j] - 2.0 * q_i[j];
            if quad_coef <= 0.0 {
                quad_coef = TAU;
            }
            let delta = (self.g[i] - self.g[j]) / quad_coef;
            let sum = self.alpha[i] + self.alpha[j];
            self.alpha[i] -= delta;
            self.alpha[j] += delta;

            if sum > c_i {
                if self.alpha[i] > c_i {
                    self.alpha[i] = c_i;
                    self.alpha[j] = sum - c_i;
                }
            } else if self.alpha[j] < 0.0 {
                self.alpha[j] = 0.0;
                self.alpha[i] = sum;
            }
            if sum > c_j {
                if self.alpha[j] > c_j {
                    self.alpha[j] = c_j;
                    self.alpha[i] = sum - c_j;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = sum;
            }
        }

        // Gradient stays exact over every variable, shrunk or not
        let delta_alpha_i = self.alpha[i] - old_alpha_i;
        let delta_alpha_j = self.alpha[j] - old_alpha_j;
        for (k, g) in self.g.iter_mut().enumerate() {
            *g += q_i[k] * delta_alpha_i + q_j[k] * delta_alpha_j;
        }

        self.update_alpha_status(i);
        self.update_alpha_status(j);
    }

    fn calculate_rho(&self) -> (f64, f64) {
        match self.variant {
            SolverVariant::Standard => (self.calculate_rho_standard(), 0.0),
            SolverVariant::Nu => self.calculate_rho_nu(),
        }
    }

    fn calculate_rho_standard(&self) -> f64 {
        let mut nr_free = 0;
        let mut ub = INF;
        let mut lb = -INF;
        let mut sum_free = 0.0;

        for i in 0..self.alpha.len() {
            let yg = f64::from(self.y[i]) * self.g[i];
            match self.status[i] {
                AlphaStatus::UpperBound if self.y[i] == -1 => ub = ub.min(yg),
                AlphaStatus::UpperBound => lb = lb.max(yg),
                AlphaStatus::LowerBound if self.y[i] == 1 => ub = ub.min(yg),
                AlphaStatus::LowerBound => lb = lb.max(yg),
                AlphaStatus::Free => {
                    nr_free += 1;
                    sum_free += yg;
                }
            }
        }

        if nr_free > 0 {
            sum_free / nr_free as f64
        } else {
            (ub + lb) / 2.0
        }
    }

    fn calculate_rho_nu(&self) -> (f64, f64) {
        // Index 0 collects y = +1, index 1 collects y = -1
        let mut nr_free = [0usize; 2];
        let mut ub = [INF; 2];
        let mut lb = [-INF; 2];
        let mut sum_free = [0.0; 2];

        for i in 0..self.alpha.len() {
            let side = usize::from(self.y[i] != 1);
            match self.status[i] {
                AlphaStatus::UpperBound => lb[side] = lb[side].max(self.g[i]),
                AlphaStatus::LowerBound => ub[side] = ub[side].min(self.g[i]),
                AlphaStatus::Free => {
                    nr_free[side] += 1;
                    sum_free[side] += self.g[i];
                }
            }
        }

        let side_r = |side: usize| {
            if nr_free[side] > 0 {
                sum_free[side] / nr_free[side] as f64
            } else {
                (ub[side] + lb[side]) / 2.0
            }
        };
        let r1 = side_r(0);
        let r2 = side_r(1);

        ((r1 - r2) / 2.0, (r1 + r2) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{dense_to_nodes, KernelType, SvmNode};
    use crate::parameter::SvmParameter;
    use crate::solver::qmatrix::SvcQ;
    use approx::assert_relative_eq;

    fn linear_param() -> SvmParameter {
        SvmParameter {
            kernel_type: KernelType::Linear,
            ..SvmParameter::default()
        }
    }

    fn config(shrinking: bool) -> SmoConfig {
        SmoConfig {
            cp: 10.0,
            cn: 10.0,
            eps: 1e-6,
            shrinking,
        }
    }

    #[test]
    fn test_two_point_problem() {
        // x = +1 labelled +1, x = -1 labelled -1: w = 1, b = 0, alpha = 0.5 each
        let data = [dense_to_nodes(&[1.0]), dense_to_nodes(&[-1.0])];
        let rows: Vec<&[SvmNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [1i8, -1];
        let mut q = SvcQ::new(rows, &linear_param(), &y);
        let mut alpha = [0.0; 2];

        let si = SMOSolver::solve(
            SolverVariant::Standard,
            config(true),
            &mut q,
            &[-1.0, -1.0],
            &y,
            &mut alpha,
        );

        assert_relative_eq!(alpha[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(alpha[1], 0.5, epsilon = 1e-6);
        assert_relative_eq!(si.rho, 0.0, epsilon = 1e-6);
        assert_relative_eq!(si.obj, -0.5, epsilon = 1e-6);
        assert!(si.iterations >= 1);
    }

    #[test]
    fn test_equality_constraint_holds() {
        let points = [[0.0, 0.0], [1.0, 0.5], [0.2, 1.0], [3.0, 3.0], [2.5, 4.0], [4.0, 2.0]];
        let data: Vec<Vec<SvmNode>> = points.iter().map(|p| dense_to_nodes(p)).collect();
        let rows: Vec<&[SvmNode]> = data.iter().map(Vec::as_slice).collect();
        let y = [-1i8, -1, -1, 1, 1, 1];

        for shrinking in [false, true] {
            let mut q = SvcQ::new(rows.clone(), &linear_param(), &y);
            let mut alpha = [0.0; 6];
            SMOSolver::solve(
                SolverVariant::Standard,
                config(shrinking),
                &mut q,
                &[-1.0; 6],
                &y,
                &mut alpha,
            );

            let balance: f64 = alpha
                .iter()
                .zip(y.iter())
                .map(|(a, &yi)| a * f64::from(yi))
                .sum();
            assert_relative_eq!(balance, 0.0, epsilon = 1e-9);
            assert!(alpha.iter().all(|&a| (0.0..=10.0).contains(&a)));
        }
    }
}
