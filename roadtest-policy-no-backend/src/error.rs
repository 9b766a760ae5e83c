use thiserror::Error;

/// Errors of the policy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// Matrix shapes do not fit the operation.
    #[error("Shape mismatch in {op}: {lhs:?} and {rhs:?}")]
    Shape {
        /// Operation.
        op: &'static str,

        /// Shape of the left operand.
        lhs: [usize; 2],

        /// Shape of the right operand.
        rhs: [usize; 2],
    },

    /// The layers of a network do not chain.
    #[error("Invalid layers: {0}")]
    Layers(String),

    /// The observation does not have the configured shape.
    #[error("Observation of shape {got:?}, expected {expected:?}")]
    ObsShape {
        /// Configured shape.
        expected: [usize; 3],

        /// Shape of the observation.
        got: [usize; 3],
    },

    /// The pooled observation does not fit the input of the network.
    #[error("Network takes {expected} inputs, the observation gives {got}")]
    InputDim {
        /// Inputs of the network.
        expected: usize,

        /// Values of the pooled observation.
        got: usize,
    },

    /// The observation is smaller than the pooling window.
    #[error("Pooling factor {pool} does not fit an observation of shape {shape:?}")]
    Pooling {
        /// Pooling factor.
        pool: usize,

        /// Shape of the observation.
        shape: [usize; 3],
    },

    /// A randomly initialized policy needs the shape of the observation.
    #[error("expected_shape must be set to initialize a policy")]
    MissingShape,
}
