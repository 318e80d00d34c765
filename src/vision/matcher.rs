//! Dual-mode template matching
//!
//! Both modes use the zero-mean normalized cross-correlation coefficient, so
//! raw and edge scores live on the same [-1, 1] scale and can be compared
//! directly.

use image::{GrayImage, Luma};
use imageproc::filter::separable_filter_equal;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::integral_image::{integral_image, integral_squared_image};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::capture::Frame;
use super::template::Template;
use crate::config::MatchingConfig;
use crate::region::Point;

/// 3x3 Gaussian, sigma derived from the kernel size
const BLUR_KERNEL: [f32; 3] = [0.25, 0.5, 0.25];

/// Canny hysteresis thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeParams {
    pub low: f32,
    pub high: f32,
}

impl Default for EdgeParams {
    fn default() -> Self {
        Self {
            low: 50.0,
            high: 150.0,
        }
    }
}

impl From<&MatchingConfig> for EdgeParams {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            low: config.canny_low,
            high: config.canny_high,
        }
    }
}

/// Templates whose edge map covers less than this fraction of their area
/// never produce an edge-mode candidate
pub const MIN_EDGE_DENSITY: f32 = 0.02;

const TAN_22_5: f32 = 0.414_213_56;
const TAN_67_5: f32 = 2.414_213_6;

/// Blur then detect edges. Templates and live frames must both go through
/// this so their edge maps are comparable.
///
/// The blur is the only smoothing step: Sobel gradients (L1 magnitude),
/// non-maximum suppression, then hysteresis between `params.low` and
/// `params.high`. Edge pixels are 255, everything else 0.
pub fn edge_map(gray: &GrayImage, params: EdgeParams) -> GrayImage {
    let blurred: GrayImage = separable_filter_equal(gray, &BLUR_KERNEL);
    detect_edges(&blurred, params)
}

fn detect_edges(image: &GrayImage, params: EdgeParams) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = GrayImage::new(width, height);
    if width < 3 || height < 3 {
        return out;
    }

    let gx = horizontal_sobel(image);
    let gy = vertical_sobel(image);
    let w = width as usize;
    let h = height as usize;
    let gx: Vec<f32> = gx.pixels().map(|p| p[0] as f32).collect();
    let gy: Vec<f32> = gy.pixels().map(|p| p[0] as f32).collect();
    let magnitude: Vec<f32> = gx.iter().zip(&gy).map(|(x, y)| x.abs() + y.abs()).collect();

    // Non-maximum suppression along the quantized gradient direction.
    // The one-pixel border never holds an edge.
    let mut thin = vec![0.0f32; w * h];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let i = y * w + x;
            let m = magnitude[i];
            if m <= params.low {
                continue;
            }
            let (ax, ay) = (gx[i].abs(), gy[i].abs());
            let (before, after) = if ay <= ax * TAN_22_5 {
                (i - 1, i + 1)
            } else if ay >= ax * TAN_67_5 {
                (i - w, i + w)
            } else if (gx[i] > 0.0) == (gy[i] > 0.0) {
                (i - w - 1, i + w + 1)
            } else {
                (i - w + 1, i + w - 1)
            };
            if m > magnitude[before] && m >= magnitude[after] {
                thin[i] = m;
            }
        }
    }

    // Hysteresis: strong pixels seed, weak pixels join when 8-connected
    let mut stack: Vec<usize> = Vec::new();
    let mut marked = vec![false; w * h];
    for (i, &m) in thin.iter().enumerate() {
        if m > params.high {
            marked[i] = true;
            stack.push(i);
        }
    }
    while let Some(i) = stack.pop() {
        let (x, y) = (i % w, i / w);
        for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                let j = ny * w + nx;
                if !marked[j] && thin[j] > params.low {
                    marked[j] = true;
                    stack.push(j);
                }
            }
        }
    }

    for (i, &edge) in marked.iter().enumerate() {
        if edge {
            out.put_pixel((i % w) as u32, (i / w) as u32, Luma([255]));
        }
    }
    out
}

/// Fraction of pixels set in an edge map
pub fn edge_density(edges: &GrayImage) -> f32 {
    let total = edges.width() as usize * edges.height() as usize;
    if total == 0 {
        return 0.0;
    }
    edges.pixels().filter(|p| p[0] > 0).count() as f32 / total as f32
}

/// Per-mode acceptance thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchThresholds {
    pub raw: f32,
    pub edge: f32,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            raw: 0.70,
            edge: 0.35,
        }
    }
}

impl From<&MatchingConfig> for MatchThresholds {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            raw: config.raw_threshold,
            edge: config.edge_threshold,
        }
    }
}

/// Which image representation produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Raw,
    Edge,
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchMode::Raw => write!(f, "raw"),
            MatchMode::Edge => write!(f, "edge"),
        }
    }
}

/// Best correlation peak of one mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub score: f32,
    /// Top-left of the best window
    pub location: (u32, u32),
}

/// Accepted template match, in frame-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub mode: MatchMode,
    pub score: f32,
    pub location: (u32, u32),
    pub center: (u32, u32),
}

impl MatchResult {
    fn new(mode: MatchMode, peak: Peak, template_width: u32, template_height: u32) -> Self {
        let (lx, ly) = peak.location;
        Self {
            mode,
            score: peak.score,
            location: peak.location,
            center: (lx + template_width / 2, ly + template_height / 2),
        }
    }

    /// Center translated into absolute screen coordinates
    pub fn absolute_center(&self, origin: Point) -> Point {
        Point::new(self.center.0 as i32, self.center.1 as i32).offset_by(origin)
    }
}

/// Match one template against one frame.
///
/// Returns `None` when neither mode reaches its threshold. When both do, the
/// higher score wins and a tie goes to the raw mode.
pub fn match_template(
    frame: &Frame,
    template: &Template,
    thresholds: &MatchThresholds,
) -> Option<MatchResult> {
    let raw = correlate(frame.gray(), template.gray());
    let edge = if template.edge_density() >= MIN_EDGE_DENSITY {
        correlate(frame.edges(), template.edges())
    } else {
        None
    };

    log::trace!(
        "{}: raw={:.3} edge={:.3}",
        template.cue(),
        raw.map_or(f32::NAN, |p| p.score),
        edge.map_or(f32::NAN, |p| p.score)
    );

    let (mode, peak) = select_candidate(
        raw.filter(|p| p.score >= thresholds.raw),
        edge.filter(|p| p.score >= thresholds.edge),
    )?;

    Some(MatchResult::new(mode, peak, template.width(), template.height()))
}

/// Pick between the thresholded raw and edge candidates
pub fn select_candidate(raw: Option<Peak>, edge: Option<Peak>) -> Option<(MatchMode, Peak)> {
    match (raw, edge) {
        (Some(r), Some(e)) if e.score > r.score => Some((MatchMode::Edge, e)),
        (Some(r), _) => Some((MatchMode::Raw, r)),
        (None, Some(e)) => Some((MatchMode::Edge, e)),
        (None, None) => None,
    }
}

/// Slide `template` over `image` and return the global maximum of the
/// normalized correlation coefficient. The first maximum in row-major order
/// wins. Windows (or templates) with no variance score 0.
///
/// The numerator of every window comes from one frequency-domain
/// cross-correlation, the denominators from integral images, so the cost is
/// dominated by three FFTs of the image size rather than by the template area.
///
/// Returns `None` if the template does not fit inside the image.
pub fn correlate(image: &GrayImage, template: &GrayImage) -> Option<Peak> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return None;
    }

    let n = (tw * th) as f64;
    let t_mean = template.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
    let t_centered: Vec<f64> = template.pixels().map(|p| p[0] as f64 - t_mean).collect();
    let t_norm = t_centered.iter().map(|v| v * v).sum::<f64>().sqrt();

    let out_w = iw - tw + 1;
    let out_h = ih - th + 1;

    if t_norm <= f64::EPSILON {
        return Some(Peak {
            score: 0.0,
            location: (0, 0),
        });
    }

    let numerators = cross_correlate(image, &t_centered, tw, th);
    let sums = integral_image::<_, u64>(image);
    let squares = integral_squared_image::<_, u64>(image);
    let window = |integral: &image::ImageBuffer<Luma<u64>, Vec<u64>>, x: u32, y: u32| {
        let at = |px: u32, py: u32| integral.get_pixel(px, py)[0] as f64;
        at(x + tw, y + th) - at(x, y + th) - at(x + tw, y) + at(x, y)
    };

    let scan_row = |y: u32| -> Peak {
        let mut best = Peak {
            score: f32::NEG_INFINITY,
            location: (0, y),
        };
        let row = &numerators[(y * iw) as usize..];
        for x in 0..out_w {
            let sum = window(&sums, x, y);
            let sq = window(&squares, x, y);
            let variance = sq - sum * sum / n;
            let score = if variance <= f64::EPSILON {
                0.0
            } else {
                (row[x as usize] / (t_norm * variance.sqrt())).clamp(-1.0, 1.0) as f32
            };
            if score > best.score {
                best = Peak {
                    score,
                    location: (x, y),
                };
            }
        }
        best
    };

    #[cfg(feature = "parallel")]
    let rows: Vec<Peak> = (0..out_h).into_par_iter().map(scan_row).collect();
    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Peak> = (0..out_h).map(scan_row).collect();

    rows.into_iter().fold(None, |best: Option<Peak>, peak| match best {
        Some(b) if b.score >= peak.score => Some(b),
        _ => Some(peak),
    })
}

/// `out[y * width + x] = sum(kernel[j][i] * image[y + j][x + i])` for every
/// position where the kernel fits. Positions where it does not fit hold
/// wrapped-around garbage and must not be read.
fn cross_correlate(image: &GrayImage, kernel: &[f64], kw: u32, kh: u32) -> Vec<f64> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let mut planner = FftPlanner::<f64>::new();
    let forward = (planner.plan_fft_forward(w), planner.plan_fft_forward(h));
    let inverse = (planner.plan_fft_inverse(w), planner.plan_fft_inverse(h));

    let mut spectrum: Vec<Complex<f64>> = image
        .pixels()
        .map(|p| Complex::new(p[0] as f64, 0.0))
        .collect();
    let mut padded = vec![Complex::new(0.0, 0.0); w * h];
    for (row, chunk) in kernel.chunks_exact(kw as usize).take(kh as usize).enumerate() {
        for (col, &value) in chunk.iter().enumerate() {
            padded[row * w + col] = Complex::new(value, 0.0);
        }
    }

    fft_2d(&mut spectrum, w, h, &forward);
    fft_2d(&mut padded, w, h, &forward);
    for (s, k) in spectrum.iter_mut().zip(&padded) {
        *s *= k.conj();
    }
    fft_2d(&mut spectrum, w, h, &inverse);

    let scale = 1.0 / (w * h) as f64;
    spectrum.into_iter().map(|c| c.re * scale).collect()
}

/// In-place 2D transform of a row-major buffer: rows first, then columns
fn fft_2d(
    data: &mut [Complex<f64>],
    width: usize,
    height: usize,
    plans: &(Arc<dyn Fft<f64>>, Arc<dyn Fft<f64>>),
) {
    let (rows, columns) = plans;
    rows.process(data);

    let mut column = vec![Complex::new(0.0, 0.0); height];
    for x in 0..width {
        for (y, slot) in column.iter_mut().enumerate() {
            *slot = data[y * width + x];
        }
        columns.process(&mut column);
        for (y, value) in column.iter().enumerate() {
            data[y * width + x] = *value;
        }
    }
}
