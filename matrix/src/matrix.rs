//! Row-major `f64` matrix used for batches, model outputs and parameters.
//!
//! Rows index examples, columns index features. The storage is an
//! [`ndarray::Array2`], exposed through [`Matrix::view`] and [`Matrix::view_mut`]
//! for code that wants the full ndarray API.

use ndarray::{Array1, Array2, ArrayView2, ArrayViewMut2, Axis, ShapeError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Matrix {
    pub(crate) data: Array2<f64>,
}

impl Matrix {
    /// Builds a matrix from row-major data.
    ///
    /// Fails when `data.len() != rows * cols`.
    pub fn from_shape_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, ShapeError> {
        Ok(Self {
            data: Array2::from_shape_vec((rows, cols), data)?,
        })
    }

    /// Builds a `rows x cols` matrix by calling `f` with each `(row, col)`.
    #[must_use]
    pub fn from_shape_fn<F>(rows: usize, cols: usize, f: F) -> Self
    where
        F: FnMut((usize, usize)) -> f64,
    {
        Self {
            data: Array2::from_shape_fn((rows, cols), f),
        }
    }

    /// Builds a matrix with one row per inner vector.
    ///
    /// Returns `None` when the rows are ragged.
    #[must_use]
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != cols) {
            return None;
        }
        let data = rows.iter().flatten().copied().collect();
        Self::from_shape_vec(rows.len(), cols, data).ok()
    }

    /// Column vector (`n x 1`) holding `values`.
    #[must_use]
    pub fn column(values: &[f64]) -> Self {
        Self {
            data: Array1::from(values.to_vec()).insert_axis(Axis(1)),
        }
    }

    #[inline(always)]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    #[inline(always)]
    #[must_use]
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    #[inline(always)]
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    #[inline(always)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.data.get((row, col)).copied()
    }

    /// Elements in row-major order regardless of the underlying memory layout.
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.data.iter()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }

    #[must_use]
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    #[must_use]
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.data.view_mut()
    }

    /// Uniformly distributed values in `[-scale, scale)`.
    #[must_use]
    pub fn random(rows: usize, cols: usize, scale: f64) -> Self {
        let mut rng = rand::rng();
        Self::from_shape_fn(rows, cols, |_| rng.random_range(-scale..scale))
    }

    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
        }
    }

    #[must_use]
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
        }
    }

    #[must_use]
    pub fn zeros_like(other: &Matrix) -> Self {
        Self::zeros(other.rows(), other.cols())
    }

    #[must_use]
    pub fn elementwise_multiply(&self, other: &Matrix) -> Matrix {
        self.assert_same_shape(other);
        Matrix {
            data: &self.data * &other.data,
        }
    }

    #[must_use]
    pub fn dot_multiply(&self, other: &Matrix) -> Matrix {
        assert_eq!(
            self.cols(),
            other.rows(),
            "Invalid matrix dimensions for multiplication"
        );
        Matrix {
            data: self.data.dot(&other.data),
        }
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        Matrix {
            data: self.data.t().as_standard_layout().into_owned(),
        }
    }

    #[must_use]
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            data: self.data.mapv(f),
        }
    }

    /// Combines two equally shaped matrices element by element.
    #[must_use]
    pub fn zip_map<F>(&self, other: &Matrix, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64,
    {
        self.assert_same_shape(other);
        Matrix {
            data: ndarray::Zip::from(&self.data)
                .and(&other.data)
                .map_collect(|&a, &b| f(a, b)),
        }
    }

    #[must_use]
    pub fn add(&self, other: &Matrix) -> Matrix {
        self.assert_same_shape(other);
        Matrix {
            data: &self.data + &other.data,
        }
    }

    #[must_use]
    pub fn subtract(&self, other: &Matrix) -> Matrix {
        self.assert_same_shape(other);
        Matrix {
            data: &self.data - &other.data,
        }
    }

    #[must_use]
    pub fn scale(&self, factor: f64) -> Matrix {
        Matrix {
            data: &self.data * factor,
        }
    }

    /// Adds a `1 x cols` row to every row of `self`.
    #[must_use]
    pub fn add_row(&self, row: &Matrix) -> Matrix {
        assert_eq!(row.rows(), 1, "Row vector must have exactly one row");
        assert_eq!(self.cols(), row.cols(), "Matrix columns must match");
        Matrix {
            data: &self.data + &row.data,
        }
    }

    /// Sums every column into a `1 x cols` row.
    #[must_use]
    pub fn sum_rows(&self) -> Matrix {
        Matrix {
            data: self.data.sum_axis(Axis(0)).insert_axis(Axis(0)),
        }
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.data.sum()
    }

    /// In-place `self += other`.
    pub fn add_assign(&mut self, other: &Matrix) {
        self.assert_same_shape(other);
        self.data += &other.data;
    }

    /// Sets every element to `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// New matrix made of the rows at `indices`, in that order.
    ///
    /// Returns `None` when an index is past the last row.
    #[must_use]
    pub fn select_rows(&self, indices: &[usize]) -> Option<Matrix> {
        if indices.iter().any(|&index| index >= self.rows()) {
            return None;
        }
        Some(Matrix {
            data: self.data.select(Axis(0), indices),
        })
    }

    /// Stacks matrices with equal column counts on top of each other.
    ///
    /// Returns `None` when the column counts disagree.
    #[must_use]
    pub fn concatenate_rows(parts: &[&Matrix]) -> Option<Matrix> {
        let views: Vec<_> = parts.iter().map(|m| m.data.view()).collect();
        ndarray::concatenate(Axis(0), &views)
            .ok()
            .map(|data| Matrix { data })
    }

    fn assert_same_shape(&self, other: &Matrix) {
        assert_eq!(self.rows(), other.rows(), "Matrix rows must match");
        assert_eq!(self.cols(), other.cols(), "Matrix columns must match");
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::zeros(0, 0)
    }
}

impl From<Vec<f64>> for Matrix {
    /// A single row holding `vec`.
    fn from(vec: Vec<f64>) -> Self {
        Matrix {
            data: Array1::from(vec).insert_axis(Axis(0)),
        }
    }
}

impl From<Array2<f64>> for Matrix {
    fn from(data: Array2<f64>) -> Self {
        Matrix { data }
    }
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.data.rows() {
            for value in row {
                write!(f, "{:8.4}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
