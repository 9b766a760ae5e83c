use crate::PolicyError;
use serde::{Deserialize, Serialize};

/// A row-major matrix of `f32`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Mat {
    data: Vec<f32>,
    shape: [usize; 2],
}

impl Mat {
    /// Constructs a `rows x cols` matrix.
    pub fn new(data: Vec<f32>, rows: usize, cols: usize) -> Result<Self, PolicyError> {
        if data.len() != rows * cols {
            return Err(PolicyError::Shape {
                op: "new",
                lhs: [rows, cols],
                rhs: [data.len(), 1],
            });
        }
        Ok(Self {
            data,
            shape: [rows, cols],
        })
    }

    /// A matrix of zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            shape: [rows, cols],
        }
    }

    /// `[rows, cols]`.
    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    /// Elements in row-major order.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the elements.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Matrix product `self * x`.
    pub fn matmul(&self, x: &Mat) -> Result<Self, PolicyError> {
        let [m, l] = self.shape;
        let [l_, n] = x.shape;
        if l != l_ {
            return Err(PolicyError::Shape {
                op: "matmul",
                lhs: self.shape,
                rhs: x.shape,
            });
        }

        let mut data = vec![0.0f32; m * n];
        for i in 0..m {
            for k in 0..l {
                let a = self.data[i * l + k];
                for j in 0..n {
                    data[i * n + j] += a * x.data[k * n + j];
                }
            }
        }
        Ok(Self {
            data,
            shape: [m, n],
        })
    }

    /// Element-wise sum.
    pub fn add(&self, x: &Mat) -> Result<Self, PolicyError> {
        if self.shape != x.shape {
            return Err(PolicyError::Shape {
                op: "add",
                lhs: self.shape,
                rhs: x.shape,
            });
        }
        let data = self
            .data
            .iter()
            .zip(x.data.iter())
            .map(|(a, b)| a + b)
            .collect();
        Ok(Self {
            data,
            shape: self.shape,
        })
    }

    /// Element-wise `max(0, x)`.
    pub fn relu(&self) -> Self {
        Self {
            data: self.data.iter().map(|a| a.max(0.0)).collect(),
            shape: self.shape,
        }
    }
}

impl From<Vec<f32>> for Mat {
    /// A column vector.
    fn from(x: Vec<f32>) -> Self {
        let shape = [x.len(), 1];
        Self { data: x, shape }
    }
}
