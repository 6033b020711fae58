use foosball_vision::core_modules::blob::{BorderKind, Point};
use foosball_vision::core_modules::blob_detector::blob_detector;
use foosball_vision::core_modules::enclosing_circle::min_enclosing_circle;
use foosball_vision::core_modules::mask::{ColorSegmenter, Mask};
use foosball_vision::{
    Bgr, ColorRange, Frame, Hsv, MemorySource, NeverStop, RegionSpec, TrackerConfig, Trajectory,
    TrackingSession,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn any_bgr() -> impl Strategy<Value = Bgr> {
    (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(b, g, r)| Bgr::new(b, g, r))
}

fn any_range() -> impl Strategy<Value = ColorRange> {
    (
        0u8..=179,
        0u8..=179,
        any::<u8>(),
        any::<u8>(),
        any::<u8>(),
        any::<u8>(),
    )
        .prop_map(|(h0, h1, s0, s1, v0, v1)| ColorRange {
            lower: Hsv::new(h0.min(h1), s0.min(s1), v0.min(v1)),
            upper: Hsv::new(h0.max(h1), s0.max(s1), v0.max(v1)),
        })
}

/// Number of 8-connected foreground regions.
fn connected_regions(mask: &Mask) -> usize {
    let (width, height) = (mask.width() as i64, mask.height() as i64);
    let mut seen = vec![false; (width * height) as usize];
    let mut regions = 0;
    for start in 0..width * height {
        if seen[start as usize] || !mask.get(start % width, start / width) {
            continue;
        }
        regions += 1;
        seen[start as usize] = true;
        let mut stack = vec![(start % width, start / width)];
        while let Some((x, y)) = stack.pop() {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let (nx, ny) = (x + dx, y + dy);
                    if mask.get(nx, ny) && !seen[(ny * width + nx) as usize] {
                        seen[(ny * width + nx) as usize] = true;
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    regions
}

proptest! {
    #[test]
    fn hsv_stays_on_the_8bit_wheel(pixel in any_bgr()) {
        let hsv = pixel.to_hsv();
        prop_assert!(hsv.hue <= 179);
        prop_assert_eq!(hsv.value, pixel.blue.max(pixel.green).max(pixel.red));
    }

    #[test]
    fn mask_is_foreground_exactly_where_every_channel_is_in_range(
        pixels in prop::collection::vec(any_bgr(), 12),
        range in any_range(),
    ) {
        let mut frame = Frame::filled(4, 3, Bgr::default());
        for (index, pixel) in pixels.iter().enumerate() {
            frame.set_pixel(index as u32 % 4, index as u32 / 4, *pixel);
        }
        let view = RegionSpec::full_frame().view(&frame).unwrap();
        let mask = ColorSegmenter::new(range).unwrap().segment(&view);

        for (index, pixel) in pixels.iter().enumerate() {
            let hsv = pixel.to_hsv();
            let expected = range.lower.hue <= hsv.hue && hsv.hue <= range.upper.hue
                && range.lower.saturation <= hsv.saturation && hsv.saturation <= range.upper.saturation
                && range.lower.value <= hsv.value && hsv.value <= range.upper.value;
            prop_assert_eq!(mask.get(index as i64 % 4, index as i64 / 4), expected);
        }
    }

    #[test]
    fn enclosing_circle_contains_every_point(
        coords in prop::collection::vec((0u32..300, 0u32..300), 1..60),
    ) {
        let points: Vec<Point> = coords.iter().map(|&(x, y)| Point::new(x, y)).collect();
        let circle = min_enclosing_circle(&points).unwrap();

        for point in &points {
            let distance = ((point.x as f64 - circle.center.0).powi(2)
                + (point.y as f64 - circle.center.1).powi(2))
            .sqrt();
            prop_assert!(distance <= circle.radius + 1e-6);
        }

        // Never larger than the circle around the bounding box.
        let min_x = points.iter().map(|p| p.x).min().unwrap() as f64;
        let max_x = points.iter().map(|p| p.x).max().unwrap() as f64;
        let min_y = points.iter().map(|p| p.y).min().unwrap() as f64;
        let max_y = points.iter().map(|p| p.y).max().unwrap() as f64;
        let half_diagonal = ((max_x - min_x).powi(2) + (max_y - min_y).powi(2)).sqrt() / 2.0;
        prop_assert!(circle.radius <= half_diagonal + 1e-6);
    }

    #[test]
    fn each_connected_region_has_exactly_one_outer_border(
        cells in prop::collection::vec(any::<bool>(), 64),
    ) {
        let mut mask = Mask::new(8, 8);
        for (index, on) in cells.iter().enumerate() {
            mask.set(index as u32 % 8, index as u32 / 8, *on);
        }
        let blobs = blob_detector::find_blobs(&mask);
        let outer = blobs.iter().filter(|b| b.border == BorderKind::Outer).count();
        prop_assert_eq!(outer, connected_regions(&mask));
        for blob in &blobs {
            prop_assert!(blob.contour.iter().all(|p| mask.get(p.x as i64, p.y as i64)));
            let distinct: HashSet<Point> = blob.contour.iter().copied().collect();
            prop_assert!(blob.pixel_count >= distinct.len());
        }
        let outer_area: usize = blobs
            .iter()
            .filter(|b| b.border == BorderKind::Outer)
            .map(|b| b.pixel_count)
            .sum();
        prop_assert!(outer_area >= mask.foreground_count());
    }

    #[test]
    fn trajectory_grows_by_the_candidates_of_each_frame(
        frames in prop::collection::vec(prop::collection::vec(10u32..200, 0..=3), 1..12),
    ) {
        // ROI starts at x = 243 for a 640 wide frame; balls sit in separate columns.
        let ball = Bgr::new(0, 180, 255);
        let rendered: Vec<Frame> = frames
            .iter()
            .map(|rows| {
                let mut frame = Frame::filled(640, 240, Bgr::new(40, 120, 30));
                for (column, &y) in rows.iter().enumerate() {
                    frame.fill_rect(243 + 20 + 60 * column as u32, y, 7, 7, ball);
                }
                frame
            })
            .collect();

        let mut session = TrackingSession::new(&TrackerConfig::default()).unwrap();
        let mut trajectory = Trajectory::new();
        let summary = session.run(MemorySource::new(rendered), &NeverStop, &mut trajectory);

        let expected: usize = frames.iter().map(Vec::len).sum();
        prop_assert_eq!(trajectory.len(), expected);
        prop_assert_eq!(summary.candidates_accepted, expected as u64);

        let points = trajectory.snapshot();
        prop_assert!(points.windows(2).all(|pair| pair[0].frame_index <= pair[1].frame_index));
    }
}
