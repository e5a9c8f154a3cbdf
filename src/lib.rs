//! Pixel-by-pixel image comparison with an RMS difference score.
//!
//! Both images are compared in RGBA8. The result carries the absolute
//! difference image, the RMS of every channel and an aggregate RMS that
//! is checked against a caller-supplied threshold.
//!
//! ```no_run
//! use imgdiff::{compare_images, load_rgba, Comparison, ComparisonOptions};
//!
//! # fn main() -> imgdiff::Result<()> {
//! let baseline = load_rgba("baseline.png")?;
//! let current = load_rgba("current.png")?;
//!
//! if let Comparison::Compared(diff) = compare_images(&baseline, &current) {
//!     let outcome = diff.outcome(&ComparisonOptions::new().max_rms(1.5));
//!     println!("rms {:.4} -> {:?}", diff.rms, outcome);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{Error, Result};

use image::io::Reader as ImageReader;
use image::{DynamicImage, RgbaImage};
use num_traits::AsPrimitive;
use rayon::prelude::*;
use std::path::Path;
use tracing::debug;

/// Number of channels compared per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Open an image file and convert it to RGBA8.
///
/// The decoder is picked from the file contents, so the extension does not
/// have to match the format.
///
/// # Errors
///
/// Returns [`Error::ImageLoad`] if the file is missing, unreadable or in a
/// format the decoder does not support.
pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
    let path = path.as_ref();

    let decode = || -> image::ImageResult<DynamicImage> {
        ImageReader::open(path)?.with_guessed_format()?.decode()
    };

    let img = decode()
        .map_err(|source| Error::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?
        .into_rgba8();

    debug!(path = %path.display(), dimensions = ?img.dimensions(), "loaded image");
    Ok(img)
}

/// Compare two RGBA images of the same size.
///
/// Images of different sizes are never compared pixel-wise; the mismatch is
/// reported as [`Comparison::DifferentSizes`].
pub fn compare_images(baseline: &RgbaImage, current: &RgbaImage) -> Comparison {
    if baseline.dimensions() != current.dimensions() {
        return Comparison::DifferentSizes {
            baseline: baseline.dimensions(),
            current: current.dimensions(),
        };
    }

    let (width, height) = baseline.dimensions();
    let mut image = RgbaImage::new(width, height);

    let sum_sq = {
        let out: &mut [u8] = &mut image;
        out.par_chunks_mut(CHANNELS)
            .zip(baseline.as_raw().par_chunks(CHANNELS))
            .zip(current.as_raw().par_chunks(CHANNELS))
            .map(|((out, p1), p2)| diff_pixel(p1, p2, out))
            .reduce(|| [0; CHANNELS], add_channels)
    };

    let pixel_count = u64::from(width) * u64::from(height);
    let channel_rms = channel_rms(&sum_sq, pixel_count);
    let rms = aggregate_rms(&channel_rms);

    debug!(?channel_rms, rms, "computed difference");

    Comparison::Compared(DiffResult {
        image,
        channel_rms,
        rms,
    })
}

/// Result of [`compare_images`].
#[derive(Debug)]
pub enum Comparison {
    /// The images have different `(width, height)`; no diff was computed.
    DifferentSizes {
        baseline: (u32, u32),
        current: (u32, u32),
    },
    /// The images have the same size and were diffed.
    Compared(DiffResult),
}

/// Difference between two same-sized images.
#[derive(Debug, Clone)]
pub struct DiffResult {
    /// Absolute per-channel difference, `|baseline - current|`.
    pub image: RgbaImage,
    /// RMS of each channel over all pixels, in R, G, B, A order.
    pub channel_rms: [f64; CHANNELS],
    /// `sqrt(mean(channel_rms^2))`.
    pub rms: f64,
}

impl DiffResult {
    pub fn has_difference(&self) -> bool {
        self.rms > 0.0
    }

    /// Decide the outcome for a threshold. Equal to the threshold counts as
    /// identical.
    pub fn outcome(&self, opt: &ComparisonOptions) -> Outcome {
        if self.rms <= opt.max_rms {
            Outcome::Identical
        } else {
            Outcome::Different
        }
    }

    /// Write the difference image; the format follows the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageSave`] if the image cannot be encoded or written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        self.image.save(path).map_err(|source| Error::ImageSave {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), "wrote diff image");
        Ok(())
    }
}

/// Final verdict of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Identical,
    Different,
    Error,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Identical => 0,
            Outcome::Different => 1,
            Outcome::Error => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComparisonOptions {
    max_rms: f64,
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        ComparisonOptions { max_rms: 0.0 }
    }
}

impl ComparisonOptions {
    pub fn new() -> ComparisonOptions {
        Default::default()
    }

    /// Largest aggregate RMS still reported as identical.
    pub fn max_rms(mut self, max_rms: f64) -> Self {
        self.max_rms = max_rms;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.max_rms
    }
}

fn diff_pixel(p1: &[u8], p2: &[u8], out: &mut [u8]) -> [u64; CHANNELS] {
    let mut sq = [0; CHANNELS];

    for c in 0..CHANNELS {
        let d = p1[c].abs_diff(p2[c]);
        out[c] = d;
        sq[c] = u64::from(d) * u64::from(d);
    }

    sq
}

fn add_channels(a: [u64; CHANNELS], b: [u64; CHANNELS]) -> [u64; CHANNELS] {
    let mut sum = a;
    for (s, v) in sum.iter_mut().zip(b) {
        *s += v;
    }
    sum
}

fn channel_rms(sum_sq: &[u64; CHANNELS], pixel_count: u64) -> [f64; CHANNELS] {
    let mut rms = [0.0; CHANNELS];

    // empty images have nothing to differ
    if pixel_count == 0 {
        return rms;
    }

    let n: f64 = pixel_count.as_();
    for (r, &s) in rms.iter_mut().zip(sum_sq) {
        let s: f64 = s.as_();
        *r = (s / n).sqrt();
    }
    rms
}

fn aggregate_rms(channel_rms: &[f64; CHANNELS]) -> f64 {
    let n: f64 = CHANNELS.as_();
    let sum: f64 = channel_rms.iter().map(|v| v * v).sum();
    (sum / n).sqrt()
}
