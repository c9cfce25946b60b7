use rand::Rng;
use serde::{Serialize, Deserialize};
use std::ops::{Index, IndexMut};

/// Dense row-major matrix backed by one contiguous buffer.
///
/// Element `(row, col)` lives at offset `row * cols + col`. Both coordinates
/// are checked on every access, so an overflowing column can never alias
/// into the following row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Overwrites every entry with a fresh uniform sample from `[-1, 1]`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for x in self.data.iter_mut() {
            *x = rng.gen_range(-1.0..=1.0);
        }
    }

    /// One row as a slice.
    pub fn row(&self, row: usize) -> &[f64] {
        assert!(row < self.rows, "row {} out of range for {}x{} matrix", row, self.rows, self.cols);
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Row-major view of the whole buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    fn offset(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.rows && col < self.cols {
            Some(row * self.cols + col)
        } else {
            None
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        match self.offset(row, col) {
            Some(k) => &self.data[k],
            None => panic!("index ({}, {}) out of range for {}x{} matrix", row, col, self.rows, self.cols),
        }
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        match self.offset(row, col) {
            Some(k) => &mut self.data[k],
            None => panic!("index ({}, {}) out of range for {}x{} matrix", row, col, self.rows, self.cols),
        }
    }
}
