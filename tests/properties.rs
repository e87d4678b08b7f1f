//! Algorithmic properties of the fill engine and the region segmenter,
//! checked on small synthetic buffers.

use bucketfill::{
    BoundingBox, Colour, FillCoordinator, MAX_REGIONS, PixelBuffer, Point, RegionSegmenter,
    SegmentationStep, flood_fill,
};

/// Fully opaque, non-white pixels at every odd x or y — leaves a lattice of
/// isolated 1×1 transparent cells at even coordinates.
fn lattice(w: u32, h: u32) -> PixelBuffer {
    let mut buf = PixelBuffer::new(w, h);
    for y in 0..h {
        for x in 0..w {
            if x % 2 == 1 || y % 2 == 1 {
                buf.put_pixel(x, y, image::Rgba([60, 60, 60, 255]));
            }
        }
    }
    buf
}

#[test]
fn any_seed_recolours_a_fully_transparent_buffer() {
    for (sx, sy) in [(0, 0), (7, 0), (3, 4), (7, 7)] {
        let buf = PixelBuffer::new(8, 8);
        let out = flood_fill(
            &buf,
            None,
            Point::new(sx, sy),
            Colour::new(1, 2, 3),
            None,
            None,
        )
        .unwrap();
        assert_eq!(out.pixels_filled, 64, "seed ({sx}, {sy})");
        assert_eq!(
            out.bounding_box,
            Some(BoundingBox { min_x: 0, min_y: 0, max_x: 7, max_y: 7 })
        );
    }
}

#[test]
fn opaque_non_white_pixels_never_fill() {
    let mut buf = PixelBuffer::new(6, 6);
    for y in 0..6 {
        for x in 0..6 {
            buf.put_pixel(x, y, image::Rgba([120, 60, 180, 255]));
        }
    }
    for (sx, sy) in [(0, 0), (5, 5), (2, 3)] {
        let out = flood_fill(
            &buf,
            None,
            Point::new(sx, sy),
            Colour::new(255, 0, 0),
            None,
            None,
        )
        .unwrap();
        assert_eq!(out.pixels_filled, 0);
        assert!(out.buffer.is_none(), "no-change sentinel expected");
    }
}

#[test]
fn four_by_four_scenario() {
    let buf = PixelBuffer::new(4, 4);
    let colour = Colour::parse("#ff0000").unwrap();
    let out = flood_fill(&buf, None, Point::new(0, 0), colour, None, None).unwrap();
    assert_eq!(
        out.bounding_box,
        Some(BoundingBox { min_x: 0, min_y: 0, max_x: 3, max_y: 3 })
    );
    let dest = out.buffer.unwrap();
    for y in 0..4 {
        for x in 0..4 {
            assert_eq!(dest.pixel(x, y).0, [255, 0, 0, 255]);
        }
    }
}

#[test]
fn region_ids_increase_and_stop_at_the_cap() {
    // 30×30 grid points land on isolated cells: 900 candidate regions,
    // far past the 254-id ceiling
    let mut segmenter = RegionSegmenter::new(lattice(600, 600));
    while segmenter.step() == SegmentationStep::Found {}
    let catalog = segmenter.finish();

    assert_eq!(catalog.masks.len(), MAX_REGIONS);
    for (i, mask) in catalog.masks.iter().enumerate() {
        assert_eq!(mask.id as usize, i + 1);
        assert_eq!((mask.width, mask.height), (1, 1));
    }
    // The scan never got far enough to claim the last grid cell
    assert_eq!(catalog.region_id_at(Point::new(580, 580)), 0);
    // The first grid cell belongs to region 1
    assert_eq!(catalog.region_id_at(Point::new(0, 0)), 1);
}

#[test]
fn instant_fill_matches_the_algorithmic_fill() {
    // Opaque wall at x=24 splits the image into two regions
    let mut source = PixelBuffer::new(50, 50);
    for y in 0..50 {
        source.put_pixel(24, y, image::Rgba([40, 40, 40, 255]));
    }

    let mut segmenter = RegionSegmenter::new(source.clone());
    while segmenter.step() == SegmentationStep::Found {}
    let catalog = segmenter.finish();

    // Algorithmic fill from a different point strictly inside region 1
    let colour = Colour::new(10, 20, 30);
    let out = flood_fill(&source, None, Point::new(3, 41), colour, None, None).unwrap();
    let algorithmic = out.buffer.unwrap();

    let coordinator = FillCoordinator::new();
    let patch = coordinator
        .instant_fill(&catalog, Point::new(10, 10), "rgb(10,20,30)")
        .unwrap()
        .expect("point lies in a precomputed region");
    let mut from_patch = PixelBuffer::new(50, 50);
    patch.apply_to(&mut from_patch);

    assert_eq!(algorithmic.data(), from_patch.data());
}

#[test]
fn instant_fill_misses_fall_back() {
    let mut segmenter = RegionSegmenter::new(lattice(40, 40));
    while segmenter.step() == SegmentationStep::Found {}
    let catalog = segmenter.finish();

    let coordinator = FillCoordinator::new();
    // The lattice wall carries no region id
    let miss = coordinator
        .instant_fill(&catalog, Point::new(1, 0), "#fff")
        .unwrap();
    assert!(miss.is_none());
}

#[test]
fn streaming_fragments_are_disjoint() {
    // 80×80 = 6400 fillable pixels: one flush at 5000, tail of 1400
    let buf = PixelBuffer::new(80, 80);
    let mut fragments: Vec<PixelBuffer> = Vec::new();
    let mut sink = |partial: PixelBuffer| {
        fragments.push(partial);
        None // take ownership — the engine continues into a fresh buffer
    };
    let out = flood_fill(
        &buf,
        None,
        Point::new(0, 0),
        Colour::new(9, 9, 9),
        None,
        Some(&mut sink),
    )
    .unwrap();

    assert_eq!(out.pixels_filled, 6400);
    assert_eq!(fragments.len(), 1);
    let partial = &fragments[0];
    let tail = out.buffer.unwrap();

    let set_pixels = |buf: &PixelBuffer| -> Vec<bool> {
        buf.data().chunks(4).map(|px| px[3] != 0).collect()
    };
    let a = set_pixels(partial);
    let b = set_pixels(&tail);
    assert_eq!(a.iter().filter(|&&v| v).count(), 5000);
    assert_eq!(b.iter().filter(|&&v| v).count(), 1400);
    assert!(
        a.iter().zip(&b).all(|(x, y)| !(x & y)),
        "fragments must not overlap"
    );
}
