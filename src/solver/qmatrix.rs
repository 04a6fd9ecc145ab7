//! Q matrices consumed by the SMO solver
//!
//! `Q[i][j] = y[i] * y[j] * K(x[i], x[j])` for classification, `K(i, j)`
//! for one-class and a signed, doubled variant for regression. Columns are
//! always full length and come out of an LRU column cache.

use crate::cache::KernelCache;
use crate::core::SvmNode;
use crate::kernel::linear::dot;
use crate::kernel::{kernel_for, Kernel};
use crate::parameter::SvmParameter;
use std::sync::Arc;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Column access used by the SMO solver
pub trait QMatrix {
    /// Number of dual variables
    fn len(&self) -> usize;

    /// Column `i` of Q, `len()` entries
    fn column(&mut self, i: usize) -> Arc<[f64]>;

    /// Diagonal of Q: `qd[i] = Q[i][i]`
    fn diagonal(&self) -> &[f64];
}

/// Training rows plus the kernel evaluated over them
struct KernelRows<'a> {
    rows: Vec<&'a [SvmNode]>,
    norms: Vec<f64>,
    kernel: Box<dyn Kernel>,
}

impl<'a> KernelRows<'a> {
    fn new(rows: Vec<&'a [SvmNode]>, param: &SvmParameter) -> Self {
        let norms = rows.iter().map(|row| dot(row, row)).collect();
        Self {
            rows,
            norms,
            kernel: kernel_for(param),
        }
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn evaluate(&self, i: usize, j: usize) -> f64 {
        self.kernel
            .compute_with_norms(self.rows[i], self.rows[j], self.norms[i], self.norms[j])
    }
}

fn column_cache(param: &SvmParameter, column_len: usize) -> KernelCache {
    let bytes = (param.cache_size.max(0.0) * BYTES_PER_MB) as usize;
    KernelCache::with_memory_limit(bytes, column_len)
}

/// Q matrix for C-SVC and nu-SVC
pub struct SvcQ<'a> {
    rows: KernelRows<'a>,
    y: Vec<i8>,
    cache: KernelCache,
    qd: Vec<f64>,
}

impl<'a> SvcQ<'a> {
    pub fn new(rows: Vec<&'a [SvmNode]>, param: &SvmParameter, y: &[i8]) -> Self {
        let rows = KernelRows::new(rows, param);
        let l = rows.len();
        let qd = (0..l).map(|i| rows.evaluate(i, i)).collect();
        Self {
            rows,
            y: y.to_vec(),
            cache: column_cache(param, l),
            qd,
        }
    }
}

impl QMatrix for SvcQ<'_> {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn column(&mut self, i: usize) -> Arc<[f64]> {
        let rows = &self.rows;
        let y = &self.y;
        self.cache.get_or_insert_with(i, || {
            let yi = f64::from(y[i]);
            (0..rows.len())
                .map(|j| yi * f64::from(y[j]) * rows.evaluate(i, j))
                .collect()
        })
    }

    fn diagonal(&self) -> &[f64] {
        &self.qd
    }
}

/// Q matrix for one-class SVM: no label scaling
pub struct OneClassQ<'a> {
    rows: KernelRows<'a>,
    cache: KernelCache,
    qd: Vec<f64>,
}

impl<'a> OneClassQ<'a> {
    pub fn new(rows: Vec<&'a [SvmNode]>, param: &SvmParameter) -> Self {
        let rows = KernelRows::new(rows, param);
        let l = rows.len();
        let qd = (0..l).map(|i| rows.evaluate(i, i)).collect();
        Self {
            rows,
            cache: column_cache(param, l),
            qd,
        }
    }
}

impl QMatrix for OneClassQ<'_> {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn column(&mut self, i: usize) -> Arc<[f64]> {
        let rows = &self.rows;
        self.cache
            .get_or_insert_with(i, || (0..rows.len()).map(|j| rows.evaluate(i, j)).collect())
    }

    fn diagonal(&self) -> &[f64] {
        &self.qd
    }
}

/// Q matrix for epsilon-SVR and nu-SVR
///
/// The regression dual has `2l` variables: `k < l` stands for alpha+ of
/// row `k` and `k + l` for alpha- of the same row. Only the `l` real kernel
/// columns are cached.
pub struct SvrQ<'a> {
    rows: KernelRows<'a>,
    cache: KernelCache,
    qd: Vec<f64>,
}

impl<'a> SvrQ<'a> {
    pub fn new(rows: Vec<&'a [SvmNode]>, param: &SvmParameter) -> Self {
        let rows = KernelRows::new(rows, param);
        let l = rows.len();
        let mut qd = Vec::with_capacity(2 * l);
        qd.extend((0..l).map(|k| rows.evaluate(k, k)));
        qd.extend_from_within(..);
        Self {
            rows,
            cache: column_cache(param, l),
            qd,
        }
    }

    fn sign(&self, i: usize) -> f64 {
        if i < self.rows.len() {
            1.0
        } else {
            -1.0
        }
    }
}

impl QMatrix for SvrQ<'_> {
    fn len(&self) -> usize {
        2 * self.rows.len()
    }

    fn column(&mut self, i: usize) -> Arc<[f64]> {
        let l = self.rows.len();
        let real_i = i % l;
        let rows = &self.rows;
        let kernel_column = self
            .cache
            .get_or_insert_with(real_i, || (0..l).map(|j| rows.evaluate(real_i, j)).collect());

        let si = self.sign(i);
        let mut column = Vec::with_capacity(2 * l);
        column.extend(kernel_column.iter().map(|&k| si * k));
        column.extend(kernel_column.iter().map(|&k| -si * k));
        column.into()
    }

    fn diagonal(&self) -> &[f64] {
        &self.qd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{dense_to_nodes, KernelType};
    use approx::assert_relative_eq;

    fn rbf_param() -> SvmParameter {
        SvmParameter {
            kernel_type: KernelType::Rbf,
            gamma: 0.5,
            cache_size: 1.0,
            ..SvmParameter::default()
        }
    }

    #[test]
    fn test_svc_q_symmetry_and_sign() {
        let data: Vec<Vec<SvmNode>> = [[1.0], [2.0], [3.0]]
            .iter()
            .map(|row| dense_to_nodes(row))
            .collect();
        let rows = data.iter().map(Vec::as_slice).collect();
        let y = [1i8, -1, 1];
        let mut q = SvcQ::new(rows, &rbf_param(), &y);

        for &d in q.diagonal() {
            assert_relative_eq!(d, 1.0, epsilon = 1e-15);
        }

        let columns: Vec<Arc<[f64]>> = (0..3).map(|i| q.column(i)).collect();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(columns[i][j], columns[j][i], epsilon = 1e-15);
            }
        }
        assert!(columns[0][1] < 0.0);
        assert!(columns[0][2] > 0.0);
    }

    #[test]
    fn test_one_class_q_unscaled() {
        let data = [dense_to_nodes(&[1.0]), dense_to_nodes(&[2.0])];
        let rows = data.iter().map(Vec::as_slice).collect();
        let mut q = OneClassQ::new(rows, &rbf_param());

        let column = q.column(0);
        assert_relative_eq!(column[0], 1.0, epsilon = 1e-15);
        assert_relative_eq!(column[1], (-0.5f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_svr_q_signs() {
        let data = [dense_to_nodes(&[1.0]), dense_to_nodes(&[2.0])];
        let rows = data.iter().map(Vec::as_slice).collect();
        let mut q = SvrQ::new(rows, &rbf_param());

        assert_eq!(q.len(), 4);
        assert_eq!(q.diagonal().len(), 4);

        let column = q.column(0);
        assert_relative_eq!(column[0], 1.0, epsilon = 1e-15);
        assert_relative_eq!(column[2], -1.0, epsilon = 1e-15);

        let mirrored = q.column(2);
        assert_relative_eq!(mirrored[2], 1.0, epsilon = 1e-15);
        assert_relative_eq!(mirrored[1], -column[1], epsilon = 1e-15);
    }
}
