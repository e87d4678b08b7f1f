//! Region segmentation — precomputes the fillable regions of a loaded image
//! so a later click can be resolved by table lookup instead of a fresh
//! flood fill.
//!
//! The segmenter walks a coarse grid over the source image; every grid
//! point that is still fully transparent and unclaimed seeds a background
//! fill whose output alpha is *forced* to the next region id.  Ids live in
//! the alpha channel of an intermediate raster, which is what caps the
//! catalog at 254 regions (0 is reserved for "no precomputed region").
//!
//! Segmenting a large image can take seconds, so the work is sliced into
//! explicit resumable steps: each [`RegionSegmenter::step`] call discovers
//! at most one region and returns, giving the worker loop a yield point
//! between regions.

use rayon::prelude::*;

use crate::buffer::{PixelBuffer, Point};
use crate::colour::Colour;
use crate::fill::flood_fill;

/// Hard ceiling on precomputed regions — ids are carried as single-byte
/// alpha values and 0 is reserved.
pub const MAX_REGIONS: usize = 254;

/// Grid stride of the region scan, in pixels.  Finer strides find smaller
/// regions at the cost of more scan passes.
pub const SCAN_STRIDE: u32 = 20;

// ============================================================================
// REGION MASK & CATALOG
// ============================================================================

/// Stencil for one precomputed region, restricted to its bounding box.
/// `mask` is RGBA sized `width * height * 4`; alpha is 255 exactly at
/// pixels inside the region and 0 elsewhere, RGB is zero — the fill colour
/// is applied at instant-fill time.
pub struct RegionMask {
    pub id: u8,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub mask: Vec<u8>,
}

/// Published output of a segmentation pass: the full-image raster tagged
/// with region ids in its alpha channel, plus the ordered mask catalog
/// (`masks[i]` has id `i + 1`).  Read-only once published — instant-fill
/// lookups may consult it concurrently without locking.
pub struct RegionCatalog {
    pub tagged: PixelBuffer,
    pub masks: Vec<RegionMask>,
}

impl RegionCatalog {
    /// Region id under a click point; 0 means "not part of any precomputed
    /// region, fall back to an on-demand fill".
    pub fn region_id_at(&self, p: Point) -> u8 {
        if self.tagged.contains(p) {
            self.tagged.alpha_at(p.x as u32, p.y as u32)
        } else {
            0
        }
    }
}

// ============================================================================
// SEGMENTER
// ============================================================================

/// Outcome of one segmentation step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentationStep {
    /// A region was discovered and claimed; call `step` again.
    Found,
    /// The grid is exhausted (or the region cap was hit).
    Complete,
}

/// Resumable segmentation state: source image, the id-tagged intermediate
/// raster, the scan cursor and the regions claimed so far.
pub struct RegionSegmenter {
    source: PixelBuffer,
    tagged: PixelBuffer,
    masks: Vec<RegionMask>,
    scan_x: u32,
    scan_y: u32,
}

impl RegionSegmenter {
    pub fn new(source: PixelBuffer) -> Self {
        let tagged = PixelBuffer::new(source.width(), source.height());
        Self {
            source,
            tagged,
            masks: Vec::new(),
            scan_x: 0,
            scan_y: 0,
        }
    }

    pub fn regions_found(&self) -> usize {
        self.masks.len()
    }

    /// Advance the scan until the next unclaimed transparent grid point,
    /// claim its region, and return.  The cursor never rewinds: the scan
    /// resumes exactly where the previous step left off, with the x cursor
    /// restarting at 0 on every row after the resumed one.
    pub fn step(&mut self) -> SegmentationStep {
        let width = self.source.width();
        let height = self.source.height();

        while self.masks.len() < MAX_REGIONS && self.scan_y < height {
            let mut x = self.scan_x;
            while x < width {
                let idx = self.source.index_of(x, self.scan_y);
                // Unclaimed and fully transparent in the source: a pixel
                // the user could fill that no region owns yet
                if self.tagged.data()[idx + 3] == 0 && self.source.data()[idx + 3] == 0 {
                    self.scan_x = x;
                    if self.claim_region(x, self.scan_y) {
                        return SegmentationStep::Found;
                    }
                }
                x += SCAN_STRIDE;
            }
            self.scan_x = 0;
            self.scan_y += SCAN_STRIDE;
        }
        SegmentationStep::Complete
    }

    /// Consume the segmenter into its published catalog.
    pub fn finish(self) -> RegionCatalog {
        RegionCatalog {
            tagged: self.tagged,
            masks: self.masks,
        }
    }

    /// Flood-fill from (x, y) with the output alpha forced to the next
    /// region id, merge the claimed pixels into the tagged raster and cut
    /// the stencil mask.  Returns false when the fill claimed nothing (the
    /// cursor is then advanced so the scan cannot stall).
    fn claim_region(&mut self, x: u32, y: u32) -> bool {
        let id = (self.masks.len() + 1) as u8;
        // Background regime against the source only — cannot fail
        let outcome = flood_fill(
            &self.source,
            None,
            Point::new(x as i32, y as i32),
            Colour::new(0, 0, 0),
            Some(id),
            None,
        )
        .unwrap();

        let (Some(filled), Some(bbox)) = (outcome.buffer, outcome.bounding_box) else {
            self.scan_x += SCAN_STRIDE;
            return false;
        };

        let width = self.source.width() as usize;
        let stride = width * 4;
        let fill_data = filled.data();
        let min_x = bbox.min_x as usize;
        let max_x = bbox.max_x as usize;
        let min_y = bbox.min_y as usize;

        // Merge: copy the region's pixels (id in alpha) into the tagged
        // raster.  Only pixels whose forced alpha matches the new id belong
        // to this region — soft edge pixels of an earlier region keep
        // their original owner.
        self.tagged.data_mut()[min_y * stride..(bbox.max_y as usize + 1) * stride]
            .par_chunks_mut(stride)
            .enumerate()
            .for_each(|(row_off, row)| {
                let src_row = (min_y + row_off) * stride;
                for px in min_x..=max_x {
                    let src = src_row + px * 4;
                    if fill_data[src + 3] == id {
                        row[px * 4..px * 4 + 4].copy_from_slice(&fill_data[src..src + 4]);
                    }
                }
            });

        // Cut the stencil, restricted to the bounding box: alpha 255 inside
        // the region, 0 outside, RGB zero
        let mask_w = bbox.width() as usize;
        let mut mask = vec![0u8; mask_w * bbox.height() as usize * 4];
        mask.par_chunks_mut(mask_w * 4)
            .enumerate()
            .for_each(|(row_off, row)| {
                let src_row = (min_y + row_off) * stride;
                for (col, px) in (min_x..=max_x).enumerate() {
                    if fill_data[src_row + px * 4 + 3] == id {
                        row[col * 4 + 3] = 255;
                    }
                }
            });

        log_info!(
            "segmentation: region {} at ({}, {}) is {}×{} px ({} filled)",
            id,
            bbox.min_x,
            bbox.min_y,
            bbox.width(),
            bbox.height(),
            outcome.pixels_filled
        );

        self.masks.push(RegionMask {
            id,
            x: bbox.min_x,
            y: bbox.min_y,
            width: bbox.width(),
            height: bbox.height(),
            mask,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Opaque non-white column at `wall_x`, everything else transparent.
    fn walled_buffer(w: u32, h: u32, wall_x: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(w, h);
        for y in 0..h {
            buf.put_pixel(wall_x, y, image::Rgba([40, 40, 40, 255]));
        }
        buf
    }

    #[test]
    fn single_open_area_is_one_region() {
        let mut seg = RegionSegmenter::new(PixelBuffer::new(50, 50));
        assert_eq!(seg.step(), SegmentationStep::Found);
        assert_eq!(seg.step(), SegmentationStep::Complete);
        let catalog = seg.finish();
        assert_eq!(catalog.masks.len(), 1);
        let mask = &catalog.masks[0];
        assert_eq!((mask.x, mask.y, mask.width, mask.height), (0, 0, 50, 50));
        assert_eq!(catalog.region_id_at(Point::new(25, 25)), 1);
    }

    #[test]
    fn wall_splits_two_regions() {
        // Wall at x=24 sits between the grid columns 20 and 40
        let mut seg = RegionSegmenter::new(walled_buffer(50, 50, 24));
        assert_eq!(seg.step(), SegmentationStep::Found);
        assert_eq!(seg.step(), SegmentationStep::Found);
        assert_eq!(seg.step(), SegmentationStep::Complete);
        let catalog = seg.finish();
        assert_eq!(catalog.masks.len(), 2);
        assert_eq!(catalog.masks[0].id, 1);
        assert_eq!(catalog.masks[1].id, 2);
        // Left region reaches up to the wall, right region starts past it
        assert_eq!(catalog.region_id_at(Point::new(0, 10)), 1);
        assert_eq!(catalog.region_id_at(Point::new(23, 10)), 1);
        assert_eq!(catalog.region_id_at(Point::new(40, 10)), 2);
        // The wall itself is claimed by nobody
        assert_eq!(catalog.region_id_at(Point::new(24, 10)), 0);
    }

    #[test]
    fn stencil_matches_region_extent() {
        let catalog = {
            let mut seg = RegionSegmenter::new(walled_buffer(50, 50, 24));
            while seg.step() == SegmentationStep::Found {}
            seg.finish()
        };
        let left = &catalog.masks[0];
        assert_eq!((left.x, left.width), (0, 24));
        // Every in-region stencil pixel is exactly 255, the rest 0
        for col in 0..left.width as usize {
            assert_eq!(left.mask[col * 4 + 3], 255);
        }
        let right = &catalog.masks[1];
        assert_eq!((right.x, right.width), (25, 25));
    }

    #[test]
    fn opaque_image_yields_empty_catalog() {
        let mut buf = PixelBuffer::new(40, 40);
        for y in 0..40 {
            for x in 0..40 {
                buf.put_pixel(x, y, image::Rgba([10, 10, 10, 255]));
            }
        }
        let mut seg = RegionSegmenter::new(buf);
        assert_eq!(seg.step(), SegmentationStep::Complete);
        assert!(seg.finish().masks.is_empty());
    }
}
