//! Trained decision functions and their support-vector storage

use crate::core::{SvmNode, SvmType};
use crate::kernel::kernel_for;
use crate::parameter::SvmParameter;
use std::ops::Range;
use std::sync::Arc;

/// Who owns the support-vector storage of a trained result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Storage allocated for the result; released through the solver
    Owned,
    /// Storage shared with the training problem's node buffer
    Borrowed,
}

/// Support-vector rows of a trained result
#[derive(Debug, Clone)]
pub enum SupportVectors {
    Owned(Vec<Vec<SvmNode>>),
    /// Rows are ranges into a problem's node buffer; the `Arc` keeps the
    /// buffer alive after the problem itself is gone.
    Borrowed {
        nodes: Arc<[SvmNode]>,
        rows: Vec<Range<usize>>,
    },
}

impl Default for SupportVectors {
    fn default() -> Self {
        SupportVectors::Owned(Vec::new())
    }
}

impl SupportVectors {
    pub fn len(&self) -> usize {
        match self {
            SupportVectors::Owned(rows) => rows.len(),
            SupportVectors::Borrowed { rows, .. } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<&[SvmNode]> {
        match self {
            SupportVectors::Owned(rows) => rows.get(i).map(Vec::as_slice),
            SupportVectors::Borrowed { nodes, rows } => {
                rows.get(i).and_then(|range| nodes.get(range.clone()))
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &[SvmNode]> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    pub fn ownership(&self) -> Ownership {
        match self {
            SupportVectors::Owned(_) => Ownership::Owned,
            SupportVectors::Borrowed { .. } => Ownership::Borrowed,
        }
    }

    /// Copy every row into owned storage
    pub fn to_rows(&self) -> Vec<Vec<SvmNode>> {
        self.iter().map(<[SvmNode]>::to_vec).collect()
    }
}

/// Result of training: one-vs-one decision functions over support vectors
///
/// For `k` classes, `sv_coef` has `k - 1` rows and `rho` has `k(k-1)/2`
/// entries. Regression and one-class results use `nr_class == 2` with a
/// single coefficient row and no labels.
#[derive(Debug, Clone, Default)]
pub struct TrainedModel {
    /// Parameters used for training, gamma resolved
    pub param: SvmParameter,
    pub nr_class: usize,
    pub support_vectors: SupportVectors,
    pub sv_coef: Vec<Vec<f64>>,
    pub rho: Vec<f64>,
    /// Class labels in one-vs-one order
    pub label: Vec<i32>,
    /// Support vectors per class, same order as `label`
    pub n_sv: Vec<usize>,
    /// 1-based row of each support vector in the training problem
    pub sv_indices: Vec<usize>,
}

impl TrainedModel {
    pub fn ownership(&self) -> Ownership {
        self.support_vectors.ownership()
    }

    /// Total number of support vectors
    pub fn sv_count(&self) -> usize {
        self.support_vectors.len()
    }

    /// Decision values and the predicted label or function value
    pub fn predict_values(&self, x: &[SvmNode]) -> (f64, Vec<f64>) {
        let kernel = kernel_for(&self.param);
        let kvalue: Vec<f64> = self
            .support_vectors
            .iter()
            .map(|sv| kernel.compute(x, sv))
            .collect();

        match self.param.svm_type {
            SvmType::OneClass | SvmType::EpsilonSvr | SvmType::NuSvr => {
                let coef = self.sv_coef.first().map(Vec::as_slice).unwrap_or(&[]);
                let rho = self.rho.first().copied().unwrap_or(0.0);
                let sum = coef.iter().zip(&kvalue).map(|(c, k)| c * k).sum::<f64>() - rho;

                let prediction = if self.param.svm_type == SvmType::OneClass {
                    if sum > 0.0 {
                        1.0
                    } else {
                        -1.0
                    }
                } else {
                    sum
                };
                (prediction, vec![sum])
            }
            SvmType::CSvc | SvmType::NuSvc => {
                let nr_class = self.nr_class;
                let mut start = vec![0usize; nr_class];
                for i in 1..nr_class {
                    start[i] = start[i - 1] + self.n_sv[i - 1];
                }

                let mut vote = vec![0usize; nr_class];
                let mut dec_values = Vec::with_capacity(nr_class * nr_class.saturating_sub(1) / 2);
                for i in 0..nr_class {
                    for j in (i + 1)..nr_class {
                        let class_i = start[i]..start[i] + self.n_sv[i];
                        let class_j = start[j]..start[j] + self.n_sv[j];
                        let mut sum = 0.0;
                        for k in class_i {
                            sum += self.sv_coef[j - 1][k] * kvalue[k];
                        }
                        for k in class_j {
                            sum += self.sv_coef[i][k] * kvalue[k];
                        }
                        sum -= self.rho[dec_values.len()];

                        if sum > 0.0 {
                            vote[i] += 1;
                        } else {
                            vote[j] += 1;
                        }
                        dec_values.push(sum);
                    }
                }

                // Ties go to the class listed first
                let mut winner = 0;
                for i in 1..nr_class {
                    if vote[i] > vote[winner] {
                        winner = i;
                    }
                }
                let prediction = self.label.get(winner).map_or(0.0, |&l| f64::from(l));
                (prediction, dec_values)
            }
        }
    }

    /// Predicted label (classification), ±1 (one-class) or value (regression)
    pub fn predict(&self, x: &[SvmNode]) -> f64 {
        self.predict_values(x).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{dense_to_nodes, KernelType};

    fn linear(svm_type: SvmType) -> SvmParameter {
        SvmParameter {
            svm_type,
            kernel_type: KernelType::Linear,
            ..SvmParameter::default()
        }
    }

    #[test]
    fn test_borrowed_rows_share_buffer() {
        let nodes: Arc<[SvmNode]> = dense_to_nodes(&[1.0, 2.0, 3.0, 4.0]).into();
        let svs = SupportVectors::Borrowed {
            nodes: Arc::clone(&nodes),
            rows: vec![2..4],
        };

        assert_eq!(svs.len(), 1);
        assert_eq!(svs.ownership(), Ownership::Borrowed);
        assert!(std::ptr::eq(svs.get(0).unwrap(), &nodes[2..4]));
        assert_eq!(Arc::strong_count(&nodes), 2);
    }

    #[test]
    fn test_regression_prediction() {
        // f(x) = 2x - 1 with a single support vector at x = 1
        let model = TrainedModel {
            param: linear(SvmType::EpsilonSvr),
            nr_class: 2,
            support_vectors: SupportVectors::Owned(vec![dense_to_nodes(&[1.0])]),
            sv_coef: vec![vec![2.0]],
            rho: vec![1.0],
            label: Vec::new(),
            n_sv: Vec::new(),
            sv_indices: vec![1],
        };

        assert_eq!(model.predict(&dense_to_nodes(&[3.0])), 5.0);
        assert_eq!(model.ownership(), Ownership::Owned);
    }

    #[test]
    fn test_one_vs_one_voting() {
        // Three classes on a line, one support vector each
        let model = TrainedModel {
            param: linear(SvmType::CSvc),
            nr_class: 3,
            support_vectors: SupportVectors::Owned(vec![
                dense_to_nodes(&[1.0]),
                dense_to_nodes(&[1.0]),
                dense_to_nodes(&[1.0]),
            ]),
            sv_coef: vec![vec![1.0, 0.0, 0.0], vec![1.0, 0.0, -1.0]],
            rho: vec![0.0, 0.0, 0.0],
            label: vec![7, 8, 9],
            n_sv: vec![1, 1, 1],
            sv_indices: vec![1, 2, 3],
        };

        let (prediction, dec_values) = model.predict_values(&dense_to_nodes(&[1.0]));
        // 7 beats 8, 7 beats 9, 9 beats 8
        assert_eq!(dec_values, vec![1.0, 1.0, -1.0]);
        assert_eq!(prediction, 7.0);
    }
}
