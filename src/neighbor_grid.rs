use glam::Vec3;

const MIN_CELL_SIZE: f32 = 1.0e-3;
const INVALID_INDEX: usize = usize::MAX;
// Keeps sparse flocks from allocating a huge mostly-empty grid.
const MAX_CELLS_PER_AGENT: usize = 8;

/// Uniform cell grid over the bounding box of the last rebuilt positions.
/// Cells hold intrusive linked lists (`head` / `next`) of agent indices.
pub struct NeighborGrid {
    cell_size: f32,
    effective_cell_size: f32,
    origin: Vec3,
    dims: [usize; 3],
    head: Vec<usize>,
    next: Vec<usize>,
    cached: Vec<Vec3>,
}

impl NeighborGrid {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = sanitize_cell_size(cell_size);
        Self {
            cell_size,
            effective_cell_size: cell_size,
            origin: Vec3::ZERO,
            dims: [1, 1, 1],
            head: vec![INVALID_INDEX],
            next: Vec::new(),
            cached: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cached.is_empty()
    }

    pub fn rebuild<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = Vec3>,
    {
        self.cached.clear();
        self.cached.extend(positions);

        let count = self.cached.len();
        self.ensure_layout(count);
        self.head.fill(INVALID_INDEX);
        self.next.clear();
        self.next.resize(count, INVALID_INDEX);

        for i in 0..count {
            let cell = self.cell_index(self.cell_coords(self.cached[i]));
            self.next[i] = self.head[cell];
            self.head[cell] = i;
        }
    }

    /// Calls `callback` for every cached index strictly closer than
    /// `radius` to `point`.
    pub fn for_each_within<F>(&self, point: Vec3, radius: f32, mut callback: F)
    where
        F: FnMut(usize),
    {
        if self.cached.is_empty() || radius.is_nan() || radius <= 0.0 {
            return;
        }

        let radius_sq = radius * radius;
        let lo = self.cell_coords(point - Vec3::splat(radius));
        let hi = self.cell_coords(point + Vec3::splat(radius));

        for cz in lo[2]..=hi[2] {
            for cy in lo[1]..=hi[1] {
                for cx in lo[0]..=hi[0] {
                    let mut candidate = self.head[self.cell_index([cx, cy, cz])];
                    while candidate != INVALID_INDEX {
                        if (self.cached[candidate] - point).length_squared() < radius_sq {
                            callback(candidate);
                        }
                        candidate = self.next[candidate];
                    }
                }
            }
        }
    }

    fn ensure_layout(&mut self, count: usize) {
        let (min, max) = self
            .cached
            .iter()
            .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), p| {
                (lo.min(*p), hi.max(*p))
            });
        let extent = max - min;
        let (min, extent) = if count == 0 || !min.is_finite() || !extent.is_finite() {
            (Vec3::ZERO, Vec3::ZERO)
        } else {
            (min, extent)
        };

        let max_cells = count.saturating_mul(MAX_CELLS_PER_AGENT).max(1);
        let mut cell_size = self.cell_size;
        let mut dims = grid_dims(extent, cell_size);
        while cell_count(dims) > max_cells {
            cell_size *= 2.0;
            dims = grid_dims(extent, cell_size);
        }

        self.origin = min;
        self.effective_cell_size = cell_size;
        self.dims = dims;
        let grid_size = cell_count(dims);
        if self.head.len() != grid_size {
            self.head.resize(grid_size, INVALID_INDEX);
        }
    }

    fn cell_coords(&self, p: Vec3) -> [usize; 3] {
        let rel = (p - self.origin) / self.effective_cell_size;
        [
            clamp_cell(rel.x, self.dims[0]),
            clamp_cell(rel.y, self.dims[1]),
            clamp_cell(rel.z, self.dims[2]),
        ]
    }

    fn cell_index(&self, [x, y, z]: [usize; 3]) -> usize {
        (z * self.dims[1] + y) * self.dims[0] + x
    }
}

fn sanitize_cell_size(cell_size: f32) -> f32 {
    if cell_size.is_finite() {
        cell_size.max(MIN_CELL_SIZE)
    } else {
        MIN_CELL_SIZE
    }
}

fn grid_dims(extent: Vec3, cell_size: f32) -> [usize; 3] {
    let axis = |e: f32| ((e / cell_size).floor() as usize).saturating_add(1);
    [axis(extent.x), axis(extent.y), axis(extent.z)]
}

fn cell_count(dims: [usize; 3]) -> usize {
    dims.iter().fold(1usize, |acc, d| acc.saturating_mul(*d))
}

fn clamp_cell(rel: f32, len: usize) -> usize {
    (rel.floor().max(0.0) as usize).min(len - 1)
}
