// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Incremental freehand curve fitting
//!
//! [`VCurve`] turns a live stream of noisy input samples (position, width,
//! device resolution) into a smooth, arclength-parameterized centerline with
//! interpolated width. The scheme is local: each appended sample re-fits
//! only a constant-size trailing window of quadratic Béziers, so the curve
//! can be re-rendered after every pointer event.
//!
//! Pipeline per appended sample:
//! 1. discard the sample if it is within 10% of the device resolution of
//!    the previous one (slow pointer motion produces near-duplicates),
//! 2. fit a least-squares quadratic to every window of up to 5 consecutive
//!    input samples,
//! 3. blend the overlapping fits with the bell kernel `u²(1-u)²`, keeping
//!    the stroke's endpoints exact,
//! 4. smooth widths with a 0.25/0.50/0.25 kernel (0.67/0.33 at the ends),
//! 5. derive tangents by central difference, normals, and cumulative
//!    arclength.

use smallvec::SmallVec;

use crate::fit::fit_quadratic;
use crate::sample::set_tangent;
use crate::{CurveSample, Point2, QuadraticCurve, Vector2};

/// A raw input sample as delivered by the input device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VCurveInputSample {
    pub position: Point2<f64>,
    pub width: f64,
    /// Spatial resolution of the input device (e.g. size of one pixel in
    /// scene units). Controls redundancy filtering and sample spacing.
    pub resolution: f64,
}

impl VCurveInputSample {
    pub fn new(x: f64, y: f64, width: f64, resolution: f64) -> Self {
        Self {
            position: Point2::new(x, y),
            width,
            resolution,
        }
    }
}

/// Fitting parameters.
#[derive(Debug, Clone, Copy)]
pub struct VCurveParams {
    /// Maximum number of consecutive input samples per local quadratic fit.
    /// Must be at least 3.
    pub samples_per_fit: usize,
}

impl Default for VCurveParams {
    fn default() -> Self {
        Self { samples_per_fit: 5 }
    }
}

/// Bell kernel for blending overlapping fits: zero value and zero slope at
/// both endpoints, maximal at the midpoint.
#[inline]
fn bell(u: f64) -> f64 {
    u * u * (1.0 - u) * (1.0 - u)
}

/// A smooth curve with variable width, fitted incrementally from input
/// samples. See the module documentation for the algorithm.
#[derive(Debug, Clone, Default)]
pub struct VCurve {
    params: VCurveParams,
    input_samples: Vec<VCurveInputSample>,
    reg_fits: Vec<QuadraticCurve>,
    reg_positions: Vec<Point2<f64>>,
    reg_widths: Vec<f64>,
    samples: Vec<CurveSample>,
}

impl VCurve {
    pub fn new(params: VCurveParams) -> Self {
        Self {
            params,
            input_samples: Vec::new(),
            reg_fits: Vec::new(),
            reg_positions: Vec::new(),
            reg_widths: Vec::new(),
            samples: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.input_samples.clear();
        self.reg_fits.clear();
        self.reg_positions.clear();
        self.reg_widths.clear();
        self.samples.clear();
    }

    /// Starts a new interactive fit. Call once, then [`continue_fit`] once
    /// per input sample, then [`end_fit`]. The curve is valid and can be
    /// sampled at any moment during the fit.
    ///
    /// [`continue_fit`]: VCurve::continue_fit
    /// [`end_fit`]: VCurve::end_fit
    pub fn begin_fit(&mut self) {
        self.clear();
    }

    /// Appends one input sample and re-fits the trailing window.
    pub fn continue_fit(&mut self, input_sample: VCurveInputSample) {
        self.append_input_sample(input_sample);
        self.compute_reg_fits();
        self.average_reg_fits();
        self.compute_reg_widths();
        self.compute_samples();
    }

    /// Ends the interactive fit. Currently nothing to finalize.
    pub fn end_fit(&mut self) {}

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[CurveSample] {
        &self.samples
    }

    /// Total arclength of the fitted curve.
    pub fn length(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.arclength)
    }

    fn append_input_sample(&mut self, input_sample: VCurveInputSample) {
        match self.input_samples.last() {
            None => self.input_samples.push(input_sample),
            Some(prev) => {
                // Keep only samples that moved more than 10% of the device
                // resolution since the previous one
                let ds = (input_sample.position - prev.position).norm();
                if ds > 0.1 * input_sample.resolution {
                    self.input_samples.push(input_sample);
                }
            }
        }
    }

    fn compute_reg_fits(&mut self) {
        let n = self.input_samples.len();
        let samples_per_fit = self.params.samples_per_fit.max(3).min(n.max(1));
        let num_fits = n + 1 - samples_per_fit.min(n);

        self.reg_fits.clear();
        let mut window: SmallVec<[Vector2<f64>; 8]> = SmallVec::new();
        for i in 0..num_fits {
            window.clear();
            for j in 0..samples_per_fit.min(n) {
                window.push(self.input_samples[i + j].position.coords);
            }
            self.reg_fits.push(fit_quadratic(&window));
        }
    }

    fn average_reg_fits(&mut self) {
        let n = self.input_samples.len();
        let num_fits = self.reg_fits.len();
        let samples_per_fit = n + 1 - num_fits;

        self.reg_positions.clear();
        self.reg_positions.reserve(n);

        // End positions are kept exact to anchor the stroke to the user's
        // actual start and end
        self.reg_positions.push(self.input_samples[0].position);
        for i in 1..n.saturating_sub(1) {
            let mut pos = Vector2::zeros();
            let mut sum_w = 0.0;

            // j is this sample's index within fit k; the kernel vanishes at
            // j = 0 and j = samples_per_fit - 1, so skip those
            for j in 1..samples_per_fit.saturating_sub(1) {
                if i >= j && i - j < num_fits {
                    let k = i - j;
                    let uj = j as f64 / (samples_per_fit - 1) as f64;
                    let w = bell(uj);
                    pos += w * self.reg_fits[k].pos(uj);
                    sum_w += w;
                }
            }

            if sum_w > 0.0 {
                self.reg_positions.push(Point2::from(pos / sum_w));
            } else {
                self.reg_positions.push(self.input_samples[i].position);
            }
        }
        if n > 1 {
            self.reg_positions.push(self.input_samples[n - 1].position);
        }
    }

    fn compute_reg_widths(&mut self) {
        let n = self.input_samples.len();
        self.reg_widths.clear();
        self.reg_widths.reserve(n);

        if n == 1 {
            self.reg_widths.push(self.input_samples[0].width);
            return;
        }

        self.reg_widths
            .push(0.67 * self.input_samples[0].width + 0.33 * self.input_samples[1].width);
        for i in 1..n - 1 {
            self.reg_widths.push(
                0.25 * self.input_samples[i - 1].width
                    + 0.50 * self.input_samples[i].width
                    + 0.25 * self.input_samples[i + 1].width,
            );
        }
        self.reg_widths
            .push(0.67 * self.input_samples[n - 1].width + 0.33 * self.input_samples[n - 2].width);
    }

    fn compute_samples(&mut self) {
        let eps = 1e-10;
        self.samples.clear();

        let n = self.reg_positions.len();
        if n == 0 {
            return;
        }

        // Drop regularized positions that collapsed onto their predecessor
        // during blending, always keeping the true endpoints
        let mut positions: Vec<Point2<f64>> = Vec::with_capacity(n);
        let mut widths: Vec<f64> = Vec::with_capacity(n);
        positions.push(self.reg_positions[0]);
        widths.push(self.reg_widths[0]);
        for i in 1..n {
            let ds = (self.reg_positions[i] - *positions.last().unwrap_or(&self.reg_positions[0]))
                .norm();
            if ds > eps {
                positions.push(self.reg_positions[i]);
                widths.push(self.reg_widths[i]);
            } else if i == n - 1 && positions.len() > 1 {
                let last = positions.len() - 1;
                positions[last] = self.reg_positions[i];
                widths[last] = self.reg_widths[i];
            }
        }

        let m = positions.len();
        let mut arclength = 0.0;
        for i in 0..m {
            if i > 0 {
                arclength += (positions[i] - positions[i - 1]).norm();
            }
            let mut sample = CurveSample::new(positions[i], widths[i]);
            sample.arclength = arclength;

            // Central difference in the interior, one-sided at the ends
            let tangent = if m == 1 {
                Vector2::new(1.0, 0.0)
            } else if i == 0 {
                positions[1] - positions[0]
            } else if i == m - 1 {
                positions[m - 1] - positions[m - 2]
            } else {
                positions[i + 1] - positions[i - 1]
            };
            set_tangent(&mut sample, tangent);

            self.samples.push(sample);
        }
    }
}
