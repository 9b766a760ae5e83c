//! Persistence of camera frames as PNG files.
use crate::CameraObs;
use anyhow::{ensure, Context, Result};
use image::{codecs::png::PngEncoder, ColorType};
use log::{info, trace};
use roadtest_core::FrameStore;
use std::{
    fs::{self, OpenOptions},
    io::BufWriter,
    path::{Path, PathBuf},
};

/// Writes every frame to `<dir>/<index>.png`.
///
/// The directory must exist beforehand. A file is never overwritten: storing a
/// frame under an index which already has a file fails. Frames of earlier runs
/// are kept; [`PngFrameStore::next_index`] is the first index after them.
#[derive(Debug, Clone)]
pub struct PngFrameStore {
    dir: PathBuf,
    next_index: u64,
}

/// Returns the index of a file named `<index>.png`.
fn frame_index(name: &str) -> Option<u64> {
    name.strip_suffix(".png")?.parse().ok()
}

impl PngFrameStore {
    /// Constructs a store writing into an existing directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        ensure!(
            dir.is_dir(),
            "Frame directory {} does not exist",
            dir.display()
        );

        let mut next_index = 0;
        for entry in fs::read_dir(dir)
            .with_context(|| format!("Failed to list {}", dir.display()))?
        {
            let name = entry?.file_name();
            if let Some(index) = name.to_str().and_then(frame_index) {
                next_index = next_index.max(index + 1);
            }
        }
        if next_index > 0 {
            info!(
                "{} holds frames up to {}, continuing from {}",
                dir.display(),
                next_index - 1,
                next_index
            );
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            next_index,
        })
    }

    /// Returns the first index without a frame file after those found in the
    /// directory when the store was constructed.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Returns the path of the frame with the given index.
    pub fn path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{}.png", index))
    }
}

impl FrameStore<CameraObs> for PngFrameStore {
    fn store(&mut self, index: u64, obs: &CameraObs) -> Result<()> {
        let path = self.path(index);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        PngEncoder::new(BufWriter::new(file))
            .encode(
                obs.pixels(),
                obs.width() as u32,
                obs.height() as u32,
                ColorType::Rgb8,
            )
            .with_context(|| format!("Failed to encode {}", path.display()))?;
        trace!("Stored frame {} to {}", index, path.display());
        Ok(())
    }
}
