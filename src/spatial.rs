//! Uniform-grid spatial partition for neighbor queries.
//!
//! Particles are bucketed by cell with a counting sort, producing a
//! `cell_start` table into one flat, sorted index array:
//!
//! ```text
//! cells:        0     1     2     3 ...
//! cell_start:  [0,    2,    2,    5, ...]
//! sorted:      [i, j, |  k, l, m, | ...]
//! ```
//!
//! Members of cell `c` are `sorted[cell_start[c]..cell_start[c + 1]]`.
//! Positions outside the grid bounds are clamped into the border cells,
//! which keeps every pair closer than one cell size in adjacent cells.
//!
//! Rebuilding is `O(n + cells)` and allocation-free once the buffers have
//! grown to their working size.

use glam::Vec2;

/// Upper bound on cells per axis; the cell size grows to respect it.
pub const MAX_CELLS_PER_AXIS: u32 = 512;

/// Flat uniform grid over a rectangular region.
#[derive(Clone, Debug, Default)]
pub struct SpatialGrid {
    cell_size: f32,
    cols: u32,
    rows: u32,
    /// Particle index per sorted slot.
    sorted: Vec<u32>,
    /// Cell of each inserted entry, parallel to the insertion order.
    cells: Vec<u32>,
    /// Inserted particle indices, in insertion order.
    members: Vec<u32>,
    cell_start: Vec<u32>,
}

impl SpatialGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the grid over `[0, bounds]` with cells of at least `cell_size`.
    ///
    /// `entries` yields `(particle_index, position)` pairs. Only those
    /// particles take part in later queries.
    pub fn rebuild(&mut self, bounds: Vec2, cell_size: f32, entries: impl IntoIterator<Item = (u32, Vec2)>) {
        let bounds = bounds.max(Vec2::ONE);
        let mut cell_size = if cell_size.is_finite() && cell_size > 0.0 { cell_size } else { 1.0 };
        let longest = bounds.max_element();
        if longest / cell_size > MAX_CELLS_PER_AXIS as f32 {
            cell_size = longest / MAX_CELLS_PER_AXIS as f32;
        }
        self.cell_size = cell_size;
        self.cols = ((bounds.x / cell_size).ceil() as u32).clamp(1, MAX_CELLS_PER_AXIS);
        self.rows = ((bounds.y / cell_size).ceil() as u32).clamp(1, MAX_CELLS_PER_AXIS);

        self.members.clear();
        self.cells.clear();
        for (index, position) in entries {
            let (cx, cy) = self.cell_coords(position);
            self.members.push(index);
            self.cells.push(cy * self.cols + cx);
        }

        // Counting sort by cell.
        let total = (self.cols * self.rows) as usize;
        self.cell_start.clear();
        self.cell_start.resize(total + 1, 0);
        for &cell in &self.cells {
            self.cell_start[cell as usize + 1] += 1;
        }
        for c in 0..total {
            self.cell_start[c + 1] += self.cell_start[c];
        }
        self.sorted.clear();
        self.sorted.resize(self.members.len(), 0);
        let mut cursor = self.cell_start.clone();
        for (&member, &cell) in self.members.iter().zip(&self.cells) {
            let slot = &mut cursor[cell as usize];
            self.sorted[*slot as usize] = member;
            *slot += 1;
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Grid dimensions in cells.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    /// Number of inserted particles.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Cell coordinates of a position, clamped into the grid.
    pub fn cell_coords(&self, position: Vec2) -> (u32, u32) {
        let clamp_axis = |v: f32, count: u32| -> u32 {
            let c = (v / self.cell_size).floor();
            if c.is_nan() || c < 0.0 {
                0
            } else {
                (c as u32).min(count - 1)
            }
        };
        (clamp_axis(position.x, self.cols), clamp_axis(position.y, self.rows))
    }

    /// Particle indices stored in one cell.
    pub fn cell(&self, cx: u32, cy: u32) -> &[u32] {
        if cx >= self.cols || cy >= self.rows {
            return &[];
        }
        let c = (cy * self.cols + cx) as usize;
        &self.sorted[self.cell_start[c] as usize..self.cell_start[c + 1] as usize]
    }

    /// Indices in every cell overlapping the square of half-width `radius`
    /// around `position`. Candidates only; callers check the exact distance.
    pub fn query_radius(&self, position: Vec2, radius: f32, out: &mut Vec<u32>) {
        out.clear();
        if self.members.is_empty() {
            return;
        }
        let (lo_x, lo_y) = self.cell_coords(position - Vec2::splat(radius));
        let (hi_x, hi_y) = self.cell_coords(position + Vec2::splat(radius));
        for cy in lo_y..=hi_y {
            for cx in lo_x..=hi_x {
                out.extend_from_slice(self.cell(cx, cy));
            }
        }
    }

    /// Every unordered pair `(i, j)` with `i < j` sharing or touching a cell.
    ///
    /// Pairs come out in a fixed order for identical input, grouped by the
    /// lower index's cell.
    pub fn candidate_pairs(&self, out: &mut Vec<(u32, u32)>) {
        out.clear();
        for cy in 0..self.rows {
            for cx in 0..self.cols {
                let home = self.cell(cx, cy);
                if home.is_empty() {
                    continue;
                }
                // Same cell, then the four "forward" neighbors so each
                // adjacent cell pair is visited once.
                for (a, &i) in home.iter().enumerate() {
                    for &j in &home[a + 1..] {
                        out.push(ordered(i, j));
                    }
                }
                for (dx, dy) in [(1i64, 0i64), (-1, 1), (0, 1), (1, 1)] {
                    let nx = cx as i64 + dx;
                    let ny = cy as i64 + dy;
                    if nx < 0 || ny < 0 {
                        continue;
                    }
                    let other = self.cell(nx as u32, ny as u32);
                    for &i in home {
                        for &j in other {
                            out.push(ordered(i, j));
                        }
                    }
                }
            }
        }
    }
}

#[inline]
fn ordered(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
