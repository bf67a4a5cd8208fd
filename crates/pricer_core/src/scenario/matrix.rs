//! Dense matrices of scenario values.
//!
//! Storage is one contiguous arena laid out path-major:
//! `data[path * rows * cols + row * cols + col]`, so that each path's
//! matrix is a contiguous block that can be handed to a per-path
//! linear-algebra routine in parallel.

use nalgebra::DMatrix;
use rayon::prelude::*;

use super::ScenarioValue;
use crate::math::linalg::pseudo_inverse;

/// Matrix whose entries are scenario values with a common path count.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioMatrix {
    rows: usize,
    cols: usize,
    n_paths: usize,
    data: Vec<f64>,
}

impl ScenarioMatrix {
    /// All-zero matrix.
    pub fn zeros(rows: usize, cols: usize, n_paths: usize) -> Self {
        Self {
            rows,
            cols,
            n_paths,
            data: vec![0.0; rows * cols * n_paths],
        }
    }

    /// Identity matrix on every path.
    pub fn identity(n: usize, n_paths: usize) -> Self {
        let mut m = Self::zeros(n, n, n_paths);
        for i in 0..n {
            m.set(i, i, &ScenarioValue::constant(1.0));
        }
        m
    }

    /// Builds a matrix from per-entry values. Entries for which `f`
    /// returns `None` are zero.
    pub fn from_fn<F>(rows: usize, cols: usize, n_paths: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> Option<ScenarioValue>,
    {
        let mut m = Self::zeros(rows, cols, n_paths);
        for r in 0..rows {
            for c in 0..cols {
                if let Some(value) = f(r, c) {
                    m.set(r, c, &value);
                }
            }
        }
        m
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of paths.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    #[inline]
    fn offset(&self, path: usize, row: usize, col: usize) -> usize {
        path * self.rows * self.cols + row * self.cols + col
    }

    /// Entry `(row, col)` as a scenario value.
    pub fn entry(&self, row: usize, col: usize) -> ScenarioValue {
        ScenarioValue::from_fn(self.n_paths, |p| self.data[self.offset(p, row, col)])
    }

    /// Overwrites entry `(row, col)`. A deterministic value is broadcast.
    pub fn set(&mut self, row: usize, col: usize, value: &ScenarioValue) {
        for p in 0..self.n_paths {
            let idx = self.offset(p, row, col);
            self.data[idx] = value.get(p);
        }
    }

    /// The matrix realised on a single path.
    pub fn path_matrix(&self, path: usize) -> DMatrix<f64> {
        let start = path * self.rows * self.cols;
        DMatrix::from_row_slice(
            self.rows,
            self.cols,
            &self.data[start..start + self.rows * self.cols],
        )
    }

    /// Leading `rows x cols` block.
    pub fn leading_block(&self, rows: usize, cols: usize) -> Self {
        let rows = rows.min(self.rows);
        let cols = cols.min(self.cols);
        let mut block = Self::zeros(rows, cols, self.n_paths);
        for p in 0..self.n_paths {
            for r in 0..rows {
                for c in 0..cols {
                    let src = self.offset(p, r, c);
                    let dst = block.offset(p, r, c);
                    block.data[dst] = self.data[src];
                }
            }
        }
        block
    }

    /// Moore-Penrose pseudo-inverse computed independently on every path.
    ///
    /// The result is `cols x rows`. Paths whose matrix is singular get the
    /// pseudo-inverse of the non-degenerate part; paths with non-finite
    /// entries get a zero block. Never fails.
    pub fn pseudo_inverse(&self) -> Self {
        let block = self.rows * self.cols;
        if block == 0 {
            return Self::zeros(self.cols, self.rows, self.n_paths);
        }
        let mut data = vec![0.0; block * self.n_paths];
        data.par_chunks_mut(block)
            .zip(self.data.par_chunks(block))
            .for_each(|(out, input)| {
                let m = DMatrix::from_row_slice(self.rows, self.cols, input);
                let inverse = pseudo_inverse(&m);
                for r in 0..self.cols {
                    for c in 0..self.rows {
                        out[r * self.rows + c] = inverse[(r, c)];
                    }
                }
            });
        Self {
            rows: self.cols,
            cols: self.rows,
            n_paths: self.n_paths,
            data,
        }
    }

    /// Row vector times matrix: `result[c] = sum_r v[r] * M[r][c]`.
    ///
    /// Only the leading `min(v.len(), rows)` rows take part.
    pub fn left_multiply(&self, v: &[ScenarioValue]) -> Vec<ScenarioValue> {
        let k = v.len().min(self.rows);
        (0..self.cols)
            .map(|c| {
                let mut acc = vec![0.0; self.n_paths];
                for (r, vr) in v.iter().enumerate().take(k) {
                    for (p, slot) in acc.iter_mut().enumerate() {
                        *slot += vr.get(p) * self.data[self.offset(p, r, c)];
                    }
                }
                ScenarioValue::from_paths(acc)
            })
            .collect()
    }

    /// Matrix product, path by path.
    ///
    /// # Panics
    ///
    /// Panics if the inner dimensions or the path counts differ.
    pub fn multiply(&self, other: &Self) -> Self {
        assert_eq!(self.cols, other.rows, "inner dimensions differ");
        assert_eq!(self.n_paths, other.n_paths, "path counts differ");
        let mut out = Self::zeros(self.rows, other.cols, self.n_paths);
        for p in 0..self.n_paths {
            let product = self.path_matrix(p) * other.path_matrix(p);
            for r in 0..self.rows {
                for c in 0..other.cols {
                    let idx = out.offset(p, r, c);
                    out.data[idx] = product[(r, c)];
                }
            }
        }
        out
    }
}
