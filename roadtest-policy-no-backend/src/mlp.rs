use crate::{Mat, PolicyError};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
/// Multilayer perceptron with ReLU activation function in the hidden layers
/// and a linear output layer.
pub struct Mlp {
    /// Weights of layers, `[out, in]`.
    ws: Vec<Mat>,

    /// Biases of layers, `[out, 1]`.
    bs: Vec<Mat>,
}

impl Mlp {
    /// Constructs a network from its layers.
    pub fn new(ws: Vec<Mat>, bs: Vec<Mat>) -> Result<Self, PolicyError> {
        if ws.is_empty() || ws.len() != bs.len() {
            return Err(PolicyError::Layers(format!(
                "{} weight and {} bias matrices",
                ws.len(),
                bs.len()
            )));
        }
        for i in 0..ws.len() {
            let [out, _] = ws[i].shape();
            if bs[i].shape() != [out, 1] {
                return Err(PolicyError::Layers(format!(
                    "bias of layer {} has shape {:?}, expected {:?}",
                    i,
                    bs[i].shape(),
                    [out, 1]
                )));
            }
            if i > 0 && ws[i].shape()[1] != ws[i - 1].shape()[0] {
                return Err(PolicyError::Layers(format!(
                    "layer {} takes {} inputs, layer {} has {} outputs",
                    i,
                    ws[i].shape()[1],
                    i - 1,
                    ws[i - 1].shape()[0]
                )));
            }
        }
        Ok(Self { ws, bs })
    }

    /// A network with uniformly initialized weights and zero biases.
    ///
    /// `dims` lists the input dimension, the hidden dimensions and the output
    /// dimension.
    pub fn random(dims: &[usize], seed: u64) -> Result<Self, PolicyError> {
        let rng = fastrand::Rng::with_seed(seed);
        let mut ws = vec![];
        let mut bs = vec![];
        for pair in dims.windows(2) {
            let (n_in, n_out) = (pair[0], pair[1]);
            let bound = (6.0 / n_in.max(1) as f32).sqrt();
            let data = (0..n_in * n_out)
                .map(|_| (rng.f32() * 2.0 - 1.0) * bound)
                .collect();
            ws.push(Mat::new(data, n_out, n_in)?);
            bs.push(Mat::zeros(n_out, 1));
        }
        Self::new(ws, bs)
    }

    /// Number of inputs.
    pub fn input_dim(&self) -> usize {
        self.ws[0].shape()[1]
    }

    /// Number of outputs.
    pub fn output_dim(&self) -> usize {
        self.ws[self.ws.len() - 1].shape()[0]
    }

    /// Computes the output for a column vector `x`.
    pub fn forward(&self, x: &Mat) -> Result<Mat, PolicyError> {
        let n_layers = self.ws.len();
        let mut x = x.clone();
        for i in 0..n_layers {
            x = self.ws[i].matmul(&x)?.add(&self.bs[i])?;
            if i != n_layers - 1 {
                x = x.relu();
            }
        }
        Ok(x)
    }

    /// Loads the network from a file written by [`Mlp::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let mlp: Self = bincode::deserialize_from(BufReader::new(file))?;
        Ok(Self::new(mlp.ws, mlp.bs)?)
    }

    /// Saves the network with `bincode`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self)?;
        Ok(())
    }
}
