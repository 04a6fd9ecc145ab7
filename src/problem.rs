//! Training problems
//!
//! A [`Problem`] copies labels and a dense row-major matrix into the node
//! layout the solver reads: one flat buffer of `rows * columns` nodes and a
//! table with the start of each row. Zero values are kept, so every row has
//! exactly `columns` nodes with indices `1..=columns`.
//!
//! The flat buffer is reference counted. A trained result may keep support
//! vectors as views into it, and the buffer then outlives the problem.

use crate::core::{Grid, Matrix, Result, SVMError, SvmNode};
use log::debug;
use std::sync::Arc;

/// Labeled training rows in solver layout
#[derive(Debug, Clone)]
pub struct Problem {
    rows: usize,
    columns: usize,
    labels: Box<[f64]>,
    nodes: Arc<[SvmNode]>,
    row_starts: Box<[usize]>,
}

impl Problem {
    /// Build a problem from `rows` labels and a `rows x columns` row-major matrix
    ///
    /// Empty problems (no rows or no columns) are valid.
    pub fn new(rows: usize, labels: &[f64], columns: usize, matrix: &[f64]) -> Result<Self> {
        if labels.len() != rows {
            return Err(SVMError::DimensionMismatch {
                expected: rows,
                actual: labels.len(),
            });
        }
        let size = rows.checked_mul(columns).ok_or_else(|| {
            SVMError::InvalidShape(format!("{rows} x {columns} problem is too large"))
        })?;
        if matrix.len() != size {
            return Err(SVMError::InvalidShape(format!(
                "expected {size} feature values for {rows} rows of {columns} columns, got {}",
                matrix.len()
            )));
        }

        let mut nodes = Vec::with_capacity(size);
        let mut row_starts = Vec::with_capacity(rows);
        for i in 0..rows {
            row_starts.push(i * columns);
            for j in 0..columns {
                nodes.push(SvmNode::new(j as i32 + 1, matrix[i * columns + j]));
            }
        }

        debug!("Created problem with {rows} rows and {columns} columns");

        Ok(Self {
            rows,
            columns,
            labels: labels.into(),
            nodes: nodes.into(),
            row_starts: row_starts.into_boxed_slice(),
        })
    }

    /// Build a problem from labels and a host matrix
    pub fn from_matrix(labels: &[f64], matrix: &Matrix) -> Result<Self> {
        Self::new(matrix.rows(), labels, matrix.columns(), matrix.values())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Nodes of row `i`
    ///
    /// # Panics
    /// Panics if `i >= rows()`
    pub fn row(&self, i: usize) -> &[SvmNode] {
        let start = self.row_starts[i];
        &self.nodes[start..start + self.columns]
    }

    /// Offset of row `i` in the flat node buffer
    pub fn row_start(&self, i: usize) -> usize {
        self.row_starts[i]
    }

    /// Shared handle to the flat node buffer
    pub fn nodes(&self) -> &Arc<[SvmNode]> {
        &self.nodes
    }

    /// Stored data as a table: header `[0, 1..=c]`, then `[label, values...]` per row
    pub fn query(&self) -> Grid {
        let mut grid = Grid::new(self.rows + 1, self.columns + 1);
        grid.set(0, 0, 0.0);
        for j in 1..=self.columns {
            grid.set(0, j, j as f64);
        }
        for i in 0..self.rows {
            grid.set(i + 1, 0, self.labels[i]);
            for (j, node) in self.row(i).iter().enumerate() {
                grid.set(i + 1, j + 1, node.value);
            }
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_by_two_problem() {
        let problem = Problem::new(2, &[1.0, -1.0], 2, &[1.0, 2.0, 3.0, 4.0])
            .expect("Problem should be created");

        assert_eq!(problem.rows(), 2);
        assert_eq!(problem.columns(), 2);
        assert_eq!(problem.row(0), &[SvmNode::new(1, 1.0), SvmNode::new(2, 2.0)]);
        assert_eq!(problem.row(1), &[SvmNode::new(1, 3.0), SvmNode::new(2, 4.0)]);

        let grid = problem.query();
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.columns(), 3);
        let expected = [[0.0, 1.0, 2.0], [1.0, 1.0, 2.0], [-1.0, 3.0, 4.0]];
        for (i, row) in expected.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                assert_eq!(grid.number(i, j), Some(value));
            }
        }
    }

    #[test]
    fn test_rows_share_one_buffer() {
        let problem = Problem::new(3, &[1.0, 2.0, 3.0], 2, &[0.0; 6]).unwrap();
        for i in 0..3 {
            assert_eq!(problem.row_start(i), i * 2);
            let row = problem.row(i);
            let base = problem.nodes().as_ptr();
            assert!(std::ptr::eq(row.as_ptr(), base.wrapping_add(i * 2)));
        }
    }

    #[test]
    fn test_zero_values_are_emitted() {
        let problem = Problem::new(1, &[1.0], 3, &[0.0, 5.0, 0.0]).unwrap();
        let indices: Vec<i32> = problem.row(0).iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(problem.row(0)[0].value, 0.0);
    }

    #[test]
    fn test_label_count_mismatch_rejected() {
        let result = Problem::new(2, &[1.0], 2, &[1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(
            result,
            Err(SVMError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_matrix_size_mismatch_rejected() {
        let result = Problem::new(2, &[1.0, -1.0], 2, &[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(SVMError::InvalidShape(_))));
    }

    #[test]
    fn test_empty_problems_are_valid() {
        let no_rows = Problem::new(0, &[], 3, &[]).unwrap();
        assert!(no_rows.is_empty());
        let grid = no_rows.query();
        assert_eq!(grid.rows(), 1);
        assert_eq!(grid.columns(), 4);
        assert_eq!(grid.number(0, 3), Some(3.0));

        let no_columns = Problem::new(2, &[1.0, -1.0], 0, &[]).unwrap();
        assert_eq!(no_columns.row(1).len(), 0);
        let grid = no_columns.query();
        assert_eq!(grid.columns(), 1);
        assert_eq!(grid.number(2, 0), Some(-1.0));
    }

    #[test]
    fn test_input_is_copied() {
        let mut labels = vec![1.0, -1.0];
        let mut values = vec![1.0, 2.0];
        let problem = Problem::new(2, &labels, 1, &values).unwrap();
        labels[0] = 99.0;
        values[1] = 99.0;
        assert_eq!(problem.labels(), &[1.0, -1.0]);
        assert_eq!(problem.row(1)[0].value, 2.0);
    }

    #[test]
    fn test_from_matrix() {
        let matrix = Matrix::new(1, 2, vec![0.5, 0.25]).unwrap();
        let problem = Problem::from_matrix(&[3.0], &matrix).unwrap();
        assert_eq!(problem.columns(), 2);
        assert_eq!(problem.row(0)[1].value, 0.25);
    }
}
