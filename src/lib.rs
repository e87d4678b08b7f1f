//! # bucketfill
//!
//! Interactive "paint bucket" fill engine for raster images: given an RGBA
//! pixel buffer, a seed coordinate and a target colour, it computes the
//! connected region of fillable pixels and recolours them — while keeping
//! the interactive surface responsive.
//!
//! ## What's inside
//!
//! - [`flood_fill`] — on-demand connected-component fill with two
//!   fillability regimes (transparent-background line art, and exact-match
//!   for sketch mode) and streaming progress snapshots.
//! - [`RegionSegmenter`] — precomputes up to 254 disjoint fillable regions
//!   of a loaded image so later clicks resolve by table lookup.
//! - [`FillCoordinator`] — runs both off the interactive path on a
//!   dedicated worker thread, streams partial/final results back, enforces
//!   admission limits and drops superseded (stale) results.
//!
//! Display rendering, input handling, image decoding and persistence are
//! the embedding application's business; this crate only ever sees pixel
//! buffers, which move in and out of it by value.
//!
//! ## Usage
//!
//! ```no_run
//! use bucketfill::{FillCoordinator, PixelBuffer, Point, Response};
//! use std::time::Duration;
//!
//! let mut coordinator = FillCoordinator::new();
//! let canvas = PixelBuffer::new(640, 480);
//! coordinator.fill(canvas, None, Point::new(12, 34), "#ff0000", 1)?;
//!
//! while let Some(response) = coordinator.recv_timeout(Duration::from_secs(1)) {
//!     match response {
//!         Response::Fill { is_final, .. } => {
//!             // composite the fragment; stop after the final message
//!             if is_final { break; }
//!         }
//!         _ => {}
//!     }
//! }
//! # Ok::<(), bucketfill::SubmitError>(())
//! ```

#[macro_use]
pub mod logger;

mod buffer;
mod colour;
mod coordinator;
mod fill;
mod frontier;
mod segment;

pub use buffer::{BoundingBox, BufferShapeError, PixelBuffer, Point};
pub use colour::{Colour, ParseError};
pub use coordinator::{
    ADMISSION_LIMIT, ADMISSION_WINDOW, FillCoordinator, FillPatch, Response, SubmitError,
};
pub use fill::{
    ALPHA_MATCH_TOLERANCE, FLUSH_INTERVAL, FillOutcome, PROPAGATION_ALPHA_CUTOFF, ProgressSink,
    flood_fill,
};
pub use frontier::{CoordSet, FrontierQueue};
pub use segment::{
    MAX_REGIONS, RegionCatalog, RegionMask, RegionSegmenter, SCAN_STRIDE, SegmentationStep,
};
