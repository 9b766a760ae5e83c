//! Writes roadtest telemetry to TensorBoard event files.
use log::{debug, warn};
use roadtest_core::record::{Record, RecordValue, Recorder};
use std::path::Path;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Write records to TFRecord.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
    step_key: String,
    ignore_unsupported_value: bool,
}

impl TensorboardRecorder {
    /// Construct a [`TensorboardRecorder`].
    ///
    /// TFRecord will be stored in `logdir`. Records are placed on the time
    /// axis by their `frame` value.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            step_key: "frame".to_string(),
            ignore_unsupported_value: true,
        }
    }

    /// Construct a [`TensorboardRecorder`] which warns about values it can not write.
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new_with_check_unsupported_value<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            ignore_unsupported_value: false,
            ..Self::new(logdir)
        }
    }

    /// Sets the key of the scalar used as the step of the other values.
    pub fn step_key(mut self, v: impl Into<String>) -> Self {
        self.step_key = v.into();
        self
    }
}

impl Recorder for TensorboardRecorder {
    /// Write a given [`Record`] into a TFRecord.
    ///
    /// [`RecordValue::Scalar`] is written as a scalar and each element of
    /// [`RecordValue::Array1`] as a scalar tagged `<key>/<index>`.
    /// Other variants are skipped. A record without the step key is skipped.
    fn write(&mut self, record: Record) {
        let step = match record.get(&self.step_key) {
            Some(RecordValue::Scalar(v)) => *v as usize,
            _ => {
                warn!("Record without scalar {:?} is skipped", self.step_key);
                return;
            }
        };

        for (k, v) in record.iter() {
            if *k == self.step_key {
                continue;
            }
            match v {
                RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                RecordValue::Array1(values) => {
                    for (i, v) in values.iter().enumerate() {
                        self.writer.add_scalar(&format!("{}/{}", k, i), *v, step);
                    }
                }
                RecordValue::DateTime(_) => {} // discard value
                _ => {
                    if self.ignore_unsupported_value {
                        debug!("Unsupported value skipped: {:?}", (k, v));
                    } else {
                        warn!("Unsupported value: {:?}", (k, v));
                    }
                }
            }
        }
    }

    fn flush(&mut self) {
        self.writer.flush();
    }
}
