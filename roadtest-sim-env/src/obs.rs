//! Camera observation.
use crate::sim::RawImage;
use anyhow::{ensure, Result};
use roadtest_core::Obs;
use std::sync::Arc;

/// An RGB camera frame.
///
/// Pixels are stored row-major in `HWC` order and shared between clones.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraObs {
    frame: u64,
    height: usize,
    width: usize,
    pixels: Arc<[u8]>,
}

impl CameraObs {
    /// Constructs an observation from RGB pixels.
    pub fn new(frame: u64, height: usize, width: usize, pixels: Vec<u8>) -> Result<Self> {
        ensure!(
            pixels.len() == height * width * 3,
            "expected {} bytes for a {}x{} RGB image, got {}",
            height * width * 3,
            width,
            height,
            pixels.len()
        );
        Ok(Self {
            frame,
            height,
            width,
            pixels: pixels.into(),
        })
    }

    /// Decodes a BGRA camera image, dropping the alpha channel.
    pub fn from_bgra(image: &RawImage) -> Result<Self> {
        let (h, w) = (image.height as usize, image.width as usize);
        ensure!(
            image.bgra.len() == h * w * 4,
            "expected {} bytes for a {}x{} BGRA image, got {}",
            h * w * 4,
            w,
            h,
            image.bgra.len()
        );
        let mut rgb = Vec::with_capacity(h * w * 3);
        for px in image.bgra.chunks_exact(4) {
            rgb.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        Self::new(image.frame, h, w, rgb)
    }

    /// Simulator frame the image was rendered at.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// RGB bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl Obs for CameraObs {
    fn shape(&self) -> [usize; 3] {
        [self.height, self.width, 3]
    }

    fn to_scaled(&self) -> Vec<f32> {
        self.pixels.iter().map(|&v| v as f32 / 255.0).collect()
    }
}
