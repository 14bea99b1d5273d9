use crate::model::Rect;

/// Row bucket of `rect` when `image_height` is split into `rows` equal bands:
/// `floor(centroidY / (image_height / rows))`, clamped to `rows - 1`.
///
/// Evaluated as `floor((y1 + y2) * rows / (2 * image_height))` so no float rounding is involved.
pub fn row_bucket(rect: &Rect, image_height: u32, rows: u32) -> u32 {
    let rows = rows.max(1);
    if image_height == 0 {
        return 0;
    }
    let (_, cy2) = rect.centroid2();
    let bucket = cy2 * rows as u64 / (2 * image_height as u64);
    bucket.min(rows as u64 - 1) as u32
}

/// Sorts rectangles into reading order: by row bucket, then by centroid x.
///
/// The sort is stable, so rectangles with equal keys keep their incoming (discovery) order.
pub fn order(mut rects: Vec<Rect>, image_height: u32, rows: u32) -> Vec<Rect> {
    rects.sort_by_key(|r| (row_bucket(r, image_height, rows), r.centroid2().0));
    rects
}

/// Number of distinct row buckets the rectangles fall into.
pub fn occupied_rows(rects: &[Rect], image_height: u32, rows: u32) -> usize {
    let mut seen: Vec<u32> = rects
        .iter()
        .map(|r| row_bucket(r, image_height, rows))
        .collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}
