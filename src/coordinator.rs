//! Concurrency and protocol glue between the interactive caller and the
//! fill algorithms.
//!
//! All expensive work runs on one dedicated worker thread, fed through a
//! channel; the caller polls [`FillCoordinator::try_recv`] from its UI loop
//! (or blocks with [`FillCoordinator::recv_timeout`] when it has no loop).
//! Buffers move into requests by value and come back inside responses — the
//! caller's handle is gone the moment a request is submitted.
//!
//! Requests carry caller-chosen session tokens.  Submitting a request makes
//! its token the *expected* one for that response kind; results bearing any
//! other token are discarded silently on receipt.  Cancellation is advisory
//! only — a running fill is never interrupted, its results are just dropped
//! as stale.  Segmentation is the exception: it yields between region
//! discoveries and abandons the rest of a pass that has been superseded.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::buffer::{BoundingBox, BufferShapeError, PixelBuffer, Point};
use crate::colour::{Colour, ParseError};
use crate::fill::flood_fill;
use crate::segment::{RegionCatalog, RegionSegmenter, SegmentationStep};

/// Admission window for algorithmic fills.
pub const ADMISSION_WINDOW: Duration = Duration::from_secs(10);

/// Fills allowed to start within one admission window.
pub const ADMISSION_LIMIT: usize = 2;

// ============================================================================
// PROTOCOL TYPES
// ============================================================================

/// A request moved onto the worker thread.
enum Request {
    Fill {
        current: PixelBuffer,
        reference: Option<PixelBuffer>,
        seed: Point,
        colour: Colour,
        token: u64,
    },
    Process {
        buffer: PixelBuffer,
        token: u64,
    },
}

/// A result streamed back from the worker thread.
pub enum Response {
    /// Partial (`is_final == false`) or final fill fragment.  On the final
    /// message `pixels` is `None` when zero pixels changed.
    Fill {
        pixels: Option<PixelBuffer>,
        bounding_box: Option<BoundingBox>,
        colour: Colour,
        is_final: bool,
        token: u64,
    },
    /// Segmentation output — always carries the full tagged raster and the
    /// catalog, even when the catalog is empty.
    Process { catalog: RegionCatalog, token: u64 },
}

impl Response {
    fn token(&self) -> u64 {
        match self {
            Response::Fill { token, .. } | Response::Process { token, .. } => *token,
        }
    }
}

/// Request rejected before any computation started.
#[derive(Debug)]
pub enum SubmitError {
    Colour(ParseError),
    Shape(BufferShapeError),
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Colour(e) => write!(f, "colour error: {}", e),
            SubmitError::Shape(e) => write!(f, "shape error: {}", e),
        }
    }
}

impl std::error::Error for SubmitError {}

impl From<ParseError> for SubmitError {
    fn from(e: ParseError) -> Self {
        SubmitError::Colour(e)
    }
}

impl From<BufferShapeError> for SubmitError {
    fn from(e: BufferShapeError) -> Self {
        SubmitError::Shape(e)
    }
}

// ============================================================================
// FILL PATCH (instant-fill output)
// ============================================================================

/// A recoloured region fragment, positioned on the full image.  `pixels` is
/// RGBA sized `width * height * 4` with alpha 255 at recoloured pixels and
/// 0 elsewhere, so it composites as a stencil.
pub struct FillPatch {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl FillPatch {
    /// Composite the patch into a caller-held full-size buffer, honouring
    /// the stencil alpha.  Pixels falling outside the target are dropped.
    pub fn apply_to(&self, target: &mut PixelBuffer) {
        for row in 0..self.height {
            let ty = self.y + row;
            if ty >= target.height() {
                break;
            }
            for col in 0..self.width {
                let tx = self.x + col;
                if tx >= target.width() {
                    break;
                }
                let src = (row as usize * self.width as usize + col as usize) * 4;
                if self.pixels[src + 3] > 0 {
                    let dst = target.index_of(tx, ty);
                    target.data_mut()[dst..dst + 4].copy_from_slice(&self.pixels[src..src + 4]);
                }
            }
        }
    }
}

// ============================================================================
// COORDINATOR
// ============================================================================

pub struct FillCoordinator {
    requests: Sender<Request>,
    responses: Receiver<Response>,
    expected_fill_token: u64,
    expected_process_token: u64,
    /// Shared with the worker so an in-flight segmentation pass can observe
    /// that it has been superseded at its next yield point.
    latest_process_token: Arc<AtomicU64>,
    /// Start timestamps of recently admitted algorithmic fills.
    recent_fills: VecDeque<Instant>,
}

impl FillCoordinator {
    /// Spawn the worker thread and the channels feeding it.  The worker
    /// exits when the coordinator is dropped (its request channel
    /// disconnects).
    pub fn new() -> Self {
        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (response_tx, response_rx) = mpsc::channel::<Response>();
        let latest_process_token = Arc::new(AtomicU64::new(0));

        let worker_latest = Arc::clone(&latest_process_token);
        std::thread::spawn(move || {
            worker_loop(request_rx, response_tx, worker_latest);
        });

        Self {
            requests: request_tx,
            responses: response_rx,
            expected_fill_token: 0,
            expected_process_token: 0,
            latest_process_token,
            recent_fills: VecDeque::new(),
        }
    }

    /// Submit an algorithmic fill.
    ///
    /// The colour spec is parsed and the buffer shapes are checked
    /// synchronously — a bad request fails here, before any computation.
    /// Returns `Ok(false)` when admission control dropped the request
    /// (too many fills in flight); that is a silent no-op, the caller
    /// retries at the user's next interaction.
    pub fn fill(
        &mut self,
        current: PixelBuffer,
        reference: Option<PixelBuffer>,
        seed: Point,
        colour_spec: &str,
        token: u64,
    ) -> Result<bool, SubmitError> {
        let colour = Colour::parse(colour_spec)?;
        if let Some(r) = &reference
            && (r.width() != current.width() || r.height() != current.height())
        {
            return Err(SubmitError::Shape(BufferShapeError {
                width: current.width(),
                height: current.height(),
                actual_len: r.data().len(),
            }));
        }

        if !self.admit_fill() {
            log_warn!(
                "fill dropped: {} fills already started within {:?}",
                ADMISSION_LIMIT,
                ADMISSION_WINDOW
            );
            return Ok(false);
        }

        self.expected_fill_token = token;
        log_info!(
            "fill submitted: seed ({}, {}), token {}",
            seed.x,
            seed.y,
            token
        );
        let _ = self.requests.send(Request::Fill {
            current,
            reference,
            seed,
            colour,
            token,
        });
        Ok(true)
    }

    /// Submit a segmentation pass over a freshly loaded image.  A newer
    /// process request supersedes any in-flight pass, which abandons its
    /// remaining work at the next region boundary.
    pub fn process(&mut self, buffer: PixelBuffer, token: u64) {
        self.expected_process_token = token;
        self.latest_process_token.store(token, Ordering::Relaxed);
        log_info!(
            "segmentation submitted: {}×{}, token {}",
            buffer.width(),
            buffer.height(),
            token
        );
        let _ = self.requests.send(Request::Process { buffer, token });
    }

    /// Instant-fill fast path: resolve the click against a precomputed
    /// catalog.  `Ok(None)` means the point has no precomputed region
    /// (id 0) — fall back to [`FillCoordinator::fill`].  No worker round
    /// trip; the catalog is read-only so this is safe from any thread.
    pub fn instant_fill(
        &self,
        catalog: &RegionCatalog,
        seed: Point,
        colour_spec: &str,
    ) -> Result<Option<FillPatch>, ParseError> {
        let colour = Colour::parse(colour_spec)?;
        let id = catalog.region_id_at(seed);
        if id == 0 {
            return Ok(None);
        }
        let Some(mask) = catalog.masks.get(id as usize - 1) else {
            return Ok(None);
        };

        // RGB replace under the stencil — the mask alpha decides which
        // pixels take the colour
        let row_stride = mask.width as usize * 4;
        let mut pixels = vec![0u8; mask.mask.len()];
        pixels
            .par_chunks_mut(row_stride)
            .zip(mask.mask.par_chunks(row_stride))
            .for_each(|(out_row, stencil_row)| {
                for px in 0..mask.width as usize {
                    if stencil_row[px * 4 + 3] == 255 {
                        out_row[px * 4] = colour.r;
                        out_row[px * 4 + 1] = colour.g;
                        out_row[px * 4 + 2] = colour.b;
                        out_row[px * 4 + 3] = 255;
                    }
                }
            });

        Ok(Some(FillPatch {
            x: mask.x,
            y: mask.y,
            width: mask.width,
            height: mask.height,
            pixels,
        }))
    }

    /// Drain the response channel, discarding stale results, and return the
    /// first live one.  Call from the caller's update loop.
    pub fn try_recv(&mut self) -> Option<Response> {
        while let Ok(resp) = self.responses.try_recv() {
            if self.is_live(&resp) {
                return Some(resp);
            }
        }
        None
    }

    /// Blocking variant of [`try_recv`](Self::try_recv) for callers without
    /// an update loop: waits up to `timeout` for a live result.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<Response> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.responses.recv_timeout(remaining) {
                Ok(resp) if self.is_live(&resp) => return Some(resp),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
    }

    /// A result is live when its token still matches the expected token of
    /// its response kind.  Superseding is a normal interaction pattern, so
    /// a stale result is logged and dropped, never reported as a failure.
    fn is_live(&self, resp: &Response) -> bool {
        let expected = match resp {
            Response::Fill { .. } => self.expected_fill_token,
            Response::Process { .. } => self.expected_process_token,
        };
        if resp.token() == expected {
            true
        } else {
            log_info!(
                "discarding stale result: token {}, expected {}",
                resp.token(),
                expected
            );
            false
        }
    }

    /// Prune start timestamps that fell out of the admission window, then
    /// admit unless the window is already at its limit.
    fn admit_fill(&mut self) -> bool {
        let now = Instant::now();
        while let Some(t) = self.recent_fills.front() {
            if now.duration_since(*t) > ADMISSION_WINDOW {
                self.recent_fills.pop_front();
            } else {
                break;
            }
        }
        if self.recent_fills.len() >= ADMISSION_LIMIT {
            return false;
        }
        self.recent_fills.push_back(now);
        true
    }
}

impl Default for FillCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// WORKER
// ============================================================================

/// One computation at a time: requests are taken off the channel in order
/// and run to completion (fills) or to their next yield point
/// (segmentation steps).  Exits when the request channel disconnects.
fn worker_loop(
    requests: Receiver<Request>,
    responses: Sender<Response>,
    latest_process_token: Arc<AtomicU64>,
) {
    log_info!("fill worker started");
    while let Ok(request) = requests.recv() {
        match request {
            Request::Fill {
                current,
                reference,
                seed,
                colour,
                token,
            } => run_fill(&responses, current, reference, seed, colour, token),
            Request::Process { buffer, token } => {
                run_segmentation(&responses, buffer, token, &latest_process_token)
            }
        }
    }
    log_info!("fill worker stopped");
}

fn run_fill(
    responses: &Sender<Response>,
    current: PixelBuffer,
    reference: Option<PixelBuffer>,
    seed: Point,
    colour: Colour,
    token: u64,
) {
    // Stream a snapshot every flush interval; handing the buffer into the
    // response message transfers ownership, so the engine starts a fresh one
    let mut on_progress = |partial: PixelBuffer| -> Option<PixelBuffer> {
        log_info!("fill progressing (token {})", token);
        let _ = responses.send(Response::Fill {
            pixels: Some(partial),
            bounding_box: None,
            colour,
            is_final: false,
            token,
        });
        None
    };

    match flood_fill(
        &current,
        reference.as_ref(),
        seed,
        colour,
        None,
        Some(&mut on_progress),
    ) {
        Ok(outcome) => {
            log_info!(
                "fill complete: {} pixels (token {})",
                outcome.pixels_filled,
                token
            );
            let _ = responses.send(Response::Fill {
                pixels: outcome.buffer,
                bounding_box: outcome.bounding_box,
                colour,
                is_final: true,
                token,
            });
        }
        Err(e) => {
            // Shapes were validated at submission; a mismatch here means the
            // caller raced a resize — report it as a no-change fill
            log_err!("fill failed: {} (token {})", e, token);
            let _ = responses.send(Response::Fill {
                pixels: None,
                bounding_box: None,
                colour,
                is_final: true,
                token,
            });
        }
    }
}

fn run_segmentation(
    responses: &Sender<Response>,
    buffer: PixelBuffer,
    token: u64,
    latest_process_token: &AtomicU64,
) {
    let mut segmenter = RegionSegmenter::new(buffer);
    loop {
        // Yield point between regions: a newer process request makes the
        // rest of this pass pointless, so stop before the next unit of work
        if latest_process_token.load(Ordering::Relaxed) != token {
            log_info!(
                "segmentation abandoned after {} regions (token {} superseded)",
                segmenter.regions_found(),
                token
            );
            return;
        }
        if segmenter.step() == SegmentationStep::Complete {
            break;
        }
    }
    let catalog = segmenter.finish();
    log_info!(
        "segmentation complete: {} regions (token {})",
        catalog.masks.len(),
        token
    );
    let _ = responses.send(Response::Process { catalog, token });
}
