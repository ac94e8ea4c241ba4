// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # VAC Geometry
//!
//! Curve fitting, sampling, and triangulation for the vector animation
//! complex. This crate has no knowledge of topology: it turns raw freehand
//! input samples into smooth, arclength-parameterized polylines with
//! variable width, and turns sampled polylines and polygons into triangles
//! for rendering and hit-testing.
//!
//! The fitting pipeline is incremental by design: [`VCurve`] re-fits only a
//! constant-size trailing window after each appended input sample, so it can
//! be called after every pointer event during interactive sketching. A batch
//! variant ([`fit_quadratic`] / [`fit_cubic`]) exists for when all samples
//! are known upfront.

pub mod curve;
pub mod error;
pub mod fit;
pub mod sample;
pub mod stroke;
pub mod triangulation;
pub mod vcurve;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Vector2};

pub use curve::{CubicCurve, QuadraticCurve};
pub use error::{Error, Result};
pub use fit::{fit_cubic, fit_quadratic};
pub use sample::{CurveSample, EdgeSample};
pub use stroke::{triangulate_stroke, Triangle, Triangles};
pub use triangulation::{fill_triangles, triangulate_polygon, triangulate_polygon_with_holes};
pub use vcurve::{VCurve, VCurveInputSample, VCurveParams};
