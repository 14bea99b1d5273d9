use image::RgbaImage;

/// Binary occupancy grid at reduced resolution, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl Mask {
    /// All-clear mask of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
        }
    }

    /// Builds a mask cell by cell from `f(x, y)`.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut cells = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    /// Downsamples `image` by `scale` with nearest-neighbour sampling and marks every cell whose
    /// sampled alpha is `> alpha_threshold`.
    ///
    /// Mask size is `ceil(w / scale) x ceil(h / scale)`. Each cell samples the centre pixel of
    /// its `scale x scale` block, clamped to the last column/row for partial blocks.
    pub fn build(image: &RgbaImage, scale: u32, alpha_threshold: u8) -> Self {
        let scale = scale.max(1);
        let (w, h) = image.dimensions();
        let mw = w.div_ceil(scale);
        let mh = h.div_ceil(scale);
        let half = scale / 2;
        Self::from_fn(mw, mh, |x, y| {
            let sx = (x * scale + half).min(w - 1);
            let sy = (y * scale + half).min(h - 1);
            image.get_pixel(sx, sy)[3] > alpha_threshold
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, v: bool) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.cells[i] = v;
        }
    }

    /// Cell at linear (row-major) index `i`.
    pub fn is_set(&self, i: usize) -> bool {
        self.cells[i]
    }

    pub fn count_set(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    /// True if every cell set in `other` is also set in `self` (same dimensions required).
    pub fn is_superset_of(&self, other: &Mask) -> bool {
        self.width == other.width
            && self.height == other.height
            && self
                .cells
                .iter()
                .zip(&other.cells)
                .all(|(a, b)| *a || !*b)
    }

    /// Grows set regions by `passes` rounds of 4-connected dilation.
    ///
    /// Each round reads the previous round's mask and writes a fresh one, so growth is
    /// direction-independent: after `n` passes every cell within Manhattan distance `n` of an
    /// originally set cell is set.
    pub fn dilate(&self, passes: u32) -> Mask {
        let mut current = self.clone();
        let (w, h) = (self.width as usize, self.height as usize);
        for _ in 0..passes {
            let mut next = current.cells.clone();
            for (i, set) in current.cells.iter().enumerate() {
                if !*set {
                    continue;
                }
                let x = i % w;
                let y = i / w;
                if x > 0 {
                    next[i - 1] = true;
                }
                if x + 1 < w {
                    next[i + 1] = true;
                }
                if y > 0 {
                    next[i - w] = true;
                }
                if y + 1 < h {
                    next[i + w] = true;
                }
            }
            if next == current.cells {
                break;
            }
            current.cells = next;
        }
        current
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}
