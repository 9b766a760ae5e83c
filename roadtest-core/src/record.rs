//! Types and traits for telemetry.
//!
//! The evaluation loop emits one [`Record`] per step, holding the smoothed
//! throughput, the action-values and the chosen action together with whatever
//! the environment adds. Records are handed to a [`Recorder`].
//!
//! ```rust
//! use roadtest_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("fps", RecordValue::Scalar(29.7));
//! record.insert("q", RecordValue::Array1(vec![0.1, 0.8, 0.3]));
//! assert_eq!(record.get_scalar("fps").unwrap(), 29.7);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
