use crate::mask::Mask;
use crate::model::Rect;
use tracing::{debug, instrument};

/// Result of a labeling run with cell accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labeling {
    /// Bounding boxes (mask space, half-open) of components that passed the size filter,
    /// in discovery (row-major) order.
    pub components: Vec<Rect>,
    /// Set cells belonging to emitted components.
    pub kept_cells: usize,
    /// Set cells belonging to components rejected by the size filter.
    pub dropped_cells: usize,
    /// Number of components rejected by the size filter.
    pub dropped_components: usize,
}

/// Labels 4-connected regions of `mask` and returns the bounding boxes of those strictly wider
/// than `min_width` and strictly taller than `min_height` (mask cells).
pub fn label(mask: &Mask, min_width: u32, min_height: u32) -> Vec<Rect> {
    label_with_stats(mask, min_width, min_height).components
}

/// Same as [`label`], also reporting how many set cells were kept and dropped.
///
/// Cells are scanned row-major; each unvisited set cell seeds an explicit-stack flood fill.
/// Cells are marked visited when pushed, so every cell enters the stack at most once.
#[instrument(skip_all, fields(w = mask.width(), h = mask.height()))]
pub fn label_with_stats(mask: &Mask, min_width: u32, min_height: u32) -> Labeling {
    let w = mask.width() as usize;
    let h = mask.height() as usize;
    let mut visited = vec![false; mask.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut out = Labeling::default();

    for seed in 0..mask.len() {
        if !mask.is_set(seed) || visited[seed] {
            continue;
        }
        let (mut min_x, mut min_y) = (seed % w, seed / w);
        let (mut max_x, mut max_y) = (min_x, min_y);
        let mut cells = 0usize;

        visited[seed] = true;
        stack.push(seed);
        while let Some(cur) = stack.pop() {
            cells += 1;
            let cx = cur % w;
            let cy = cur / w;
            min_x = min_x.min(cx);
            max_x = max_x.max(cx);
            min_y = min_y.min(cy);
            max_y = max_y.max(cy);

            let mut visit = |n: usize| {
                if mask.is_set(n) && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            };
            if cx > 0 {
                visit(cur - 1);
            }
            if cx + 1 < w {
                visit(cur + 1);
            }
            if cy > 0 {
                visit(cur - w);
            }
            if cy + 1 < h {
                visit(cur + w);
            }
        }

        let bw = (max_x - min_x + 1) as u32;
        let bh = (max_y - min_y + 1) as u32;
        if bw > min_width && bh > min_height {
            out.components.push(Rect::new(
                min_x as u32,
                min_y as u32,
                max_x as u32 + 1,
                max_y as u32 + 1,
            ));
            out.kept_cells += cells;
        } else {
            out.dropped_cells += cells;
            out.dropped_components += 1;
        }
    }

    debug!(
        kept = out.components.len(),
        dropped = out.dropped_components,
        "labeled components"
    );
    out
}
