//! Connected-region flood fill.
//!
//! Given a buffer, a seed point and a target colour, computes the maximal
//! connected region of fillable pixels reachable from the seed and recolours
//! them into a fresh destination buffer.  The source buffer is never
//! mutated — the destination accumulates only the changed pixels, which is
//! what lets results stream out as partial fragments.
//!
//! Two fillability regimes exist.  The *background* regime treats anything
//! not fully opaque (or "white") as fillable — right for line art over a
//! transparent background, and for segmentation.  The *exact-match* regime
//! is for sketch/free-draw use, where earlier fills have already recoloured
//! parts of the reference image: only pixels matching the seed pixel itself
//! are fillable, so a second fill over an old one replaces exactly the old
//! colour.

use crate::buffer::{BoundingBox, BufferShapeError, PixelBuffer, Point};
use crate::colour::Colour;
use crate::frontier::{CoordSet, FrontierQueue};

/// Pixels processed between progress emissions.
pub const FLUSH_INTERVAL: u64 = 5000;

/// Propagation stops at pixels at or above this alpha.  Semi-opaque pixels
/// below 255 still *fill* (soft anti-aliased edges get coloured), but a
/// seemingly-solid line of alpha ≥ 100 must not let the fill pass through.
pub const PROPAGATION_ALPHA_CUTOFF: u8 = 100;

/// Exact-match regime: two not-fully-opaque alphas within this distance are
/// treated as equal.
pub const ALPHA_MATCH_TOLERANCE: u8 = 100;

const WHITE_SUM: u32 = 255 * 3;

/// Streaming sink for partial fill buffers.  Called every
/// [`FLUSH_INTERVAL`] processed pixels with the destination buffer by
/// value; return it to keep accumulating into it, or return `None` to take
/// ownership — the engine then continues into a fresh buffer, so only
/// pixels changed after the flush accumulate there.
pub type ProgressSink<'a> = dyn FnMut(PixelBuffer) -> Option<PixelBuffer> + 'a;

/// Result of one fill pass.
///
/// `buffer` is `None` exactly when zero pixels were fillable — the
/// "no change" sentinel.  When a progress sink consumed earlier fragments,
/// `buffer` holds only the tail fragment accumulated since the last flush.
#[derive(Debug)]
pub struct FillOutcome {
    pub buffer: Option<PixelBuffer>,
    pub bounding_box: Option<BoundingBox>,
    pub pixels_filled: u64,
}

impl FillOutcome {
    fn no_change() -> Self {
        Self {
            buffer: None,
            bounding_box: None,
            pixels_filled: 0,
        }
    }
}

/// Breadth-first flood fill from `seed`.
///
/// * `current` — the live canvas the fill is computed against.
/// * `reference` — when supplied, classification runs against this buffer
///   instead (exact-match regime); must share `current`'s dimensions.
/// * `forced_alpha` — alpha written for filled pixels instead of 255; the
///   segmenter uses this to tag pixels with a region id.
/// * `progress` — optional streaming sink, see [`ProgressSink`].
///
/// An out-of-bounds seed is a zero-pixel fill, not an error; a
/// reference-buffer shape mismatch fails fast before any work.
pub fn flood_fill(
    current: &PixelBuffer,
    reference: Option<&PixelBuffer>,
    seed: Point,
    colour: Colour,
    forced_alpha: Option<u8>,
    mut progress: Option<&mut ProgressSink<'_>>,
) -> Result<FillOutcome, BufferShapeError> {
    let width = current.width();
    let height = current.height();

    if let Some(r) = reference
        && (r.width() != width || r.height() != height)
    {
        return Err(BufferShapeError {
            width,
            height,
            actual_len: r.data().len(),
        });
    }

    if !current.contains(seed) {
        return Ok(FillOutcome::no_change());
    }

    // Classification always reads the reference when one is supplied; the
    // exact-match rules only make sense against it, since the live canvas
    // drifts away from it with every committed fill.
    let src = reference.unwrap_or(current).data();
    let exact_match = reference.is_some();

    let seed_x = seed.x as u32;
    let seed_y = seed.y as u32;
    let seed_idx = current.index_of(seed_x, seed_y);
    let seed_white = is_white(src, seed_idx);
    let seed_rgb = [src[seed_idx], src[seed_idx + 1], src[seed_idx + 2]];
    let seed_alpha = src[seed_idx + 3];

    let pixel_count = width as usize * height as usize;
    let mut visited = CoordSet::new(pixel_count);
    let mut queued = CoordSet::new(pixel_count);
    let mut frontier = FrontierQueue::new(width, height);

    frontier.push(seed);
    queued.insert(seed_y as usize * width as usize + seed_x as usize);

    let mut dest = PixelBuffer::new(width, height);
    let fill_px = colour.with_alpha(forced_alpha.unwrap_or(255));
    let mut bbox: Option<BoundingBox> = None;
    let mut filled: u64 = 0;

    while let Some(point) = frontier.pop() {
        let x = point.x as u32;
        let y = point.y as u32;
        let flat = y as usize * width as usize + x as usize;
        queued.remove(flat);
        if !visited.insert(flat) {
            continue;
        }

        let idx = flat * 4;
        let alpha = src[idx + 3];
        let white = is_white(src, idx);

        let (can_fill, can_propagate) = if exact_match {
            let both_white = white && seed_white;
            let rgb_matches = src[idx] == seed_rgb[0]
                && src[idx + 1] == seed_rgb[1]
                && src[idx + 2] == seed_rgb[2];
            (
                (rgb_matches && alpha_equalish(alpha, seed_alpha)) || both_white,
                both_white || alpha.abs_diff(seed_alpha) < ALPHA_MATCH_TOLERANCE,
            )
        } else {
            (alpha < 255 || white, alpha < PROPAGATION_ALPHA_CUTOFF)
        };

        if !can_fill {
            continue;
        }

        match bbox.as_mut() {
            Some(b) => b.expand(x, y),
            None => bbox = Some(BoundingBox::seeded(x, y)),
        }

        if can_propagate {
            for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
                let neighbour = Point::new(point.x + dx, point.y + dy);
                if !current.contains(neighbour) {
                    continue;
                }
                let nf = neighbour.y as usize * width as usize + neighbour.x as usize;
                if !visited.contains(nf) && queued.insert(nf) {
                    frontier.push(neighbour);
                }
            }
        }

        dest.put_pixel(x, y, fill_px);
        filled += 1;

        if filled % FLUSH_INTERVAL == 0
            && let Some(sink) = progress.as_mut()
        {
            // The sink either hands the buffer back or keeps it, in which
            // case the remaining pixels accumulate in a fresh one.
            dest = match sink(dest) {
                Some(buf) => buf,
                None => PixelBuffer::new(width, height),
            };
        }
    }

    Ok(FillOutcome {
        buffer: (filled > 0).then_some(dest),
        bounding_box: bbox,
        pixels_filled: filled,
    })
}

/// "White" covers both the default fully-transparent black background and
/// pure white strokes drawn by the user.
#[inline]
fn is_white(src: &[u8], idx: usize) -> bool {
    let sum = src[idx] as u32 + src[idx + 1] as u32 + src[idx + 2] as u32;
    (sum == 0 && src[idx + 3] == 0) || sum == WHITE_SUM
}

/// Tolerant alpha equality for the exact-match regime: equal, or neither
/// fully opaque and within [`ALPHA_MATCH_TOLERANCE`].
#[inline]
fn alpha_equalish(a: u8, b: u8) -> bool {
    a == b || (a < 255 && b < 255 && a.abs_diff(b) < ALPHA_MATCH_TOLERANCE)
}
