//! Uniform-grid spatial index for fixed-radius neighbor search.
//!
//! Uses sorted-index + cell-offset arrays rather than `HashMap` so the whole
//! index is a handful of flat vectors that are rebuilt every step (no pointer
//! chasing, trivial teardown).

/// Uniform-grid spatial index for O(1) neighbor cell lookup.
///
/// The grid covers a fixed axis-aligned domain with its origin at the domain
/// minimum corner. Cell size should be at least the query radius so that, for
/// any point, the 27 (3x3x3) adjacent cells contain every candidate.
/// Positions outside the domain are mapped onto the nearest edge cell; this
/// never separates two points by more than one cell more than their true
/// distance allows, so queries stay exact.
#[derive(Debug, Clone)]
pub struct NeighborGrid {
    cell_size: f32,
    grid_min: [f32; 3],
    grid_dims: [u32; 3],
    /// Cell index for each particle (parallel to particle arrays).
    cell_indices: Vec<u32>,
    /// Particle indices sorted by cell index.
    sorted_indices: Vec<u32>,
    /// Start offset in `sorted_indices` for each cell.
    cell_offsets: Vec<u32>,
    /// Number of particles in each cell.
    cell_counts: Vec<u32>,
    /// Write heads used while scattering, kept to avoid a per-rebuild allocation.
    scratch: Vec<u32>,
}

impl NeighborGrid {
    /// Create a new neighbor grid covering `[domain_min, domain_max]`.
    ///
    /// `cell_size` should be set to the smoothing radius.
    ///
    /// # Panics
    ///
    /// Panics if `cell_size` is not positive (NaN included). Parameters that
    /// passed [`SimulationParams::validate`](crate::SimulationParams::validate)
    /// never trigger this.
    pub fn new(cell_size: f32, domain_min: [f32; 3], domain_max: [f32; 3]) -> Self {
        assert!(cell_size > 0.0, "cell_size must be positive");
        let dims = Self::dims_for(cell_size, domain_min, domain_max);
        let total_cells = dims.iter().map(|&d| d as usize).product();
        Self {
            cell_size,
            grid_min: domain_min,
            grid_dims: dims,
            cell_indices: Vec::new(),
            sorted_indices: Vec::new(),
            cell_offsets: vec![0; total_cells],
            cell_counts: vec![0; total_cells],
            scratch: Vec::new(),
        }
    }

    /// Number of cells per axis a grid over the given domain would use.
    pub fn dims_for(cell_size: f32, domain_min: [f32; 3], domain_max: [f32; 3]) -> [u32; 3] {
        let mut dims = [1u32; 3];
        for axis in 0..3 {
            let extent = (domain_max[axis] - domain_min[axis]).max(0.0);
            dims[axis] = (extent / cell_size).ceil().max(1.0) as u32;
        }
        dims
    }

    /// Cell edge length.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of cells per axis.
    pub fn dims(&self) -> [u32; 3] {
        self.grid_dims
    }

    /// Total number of cells in the grid.
    pub fn total_cells(&self) -> usize {
        self.cell_counts.len()
    }

    /// Unclamped integer cell address of a position: `floor((p - origin) / cell_size)`.
    #[inline]
    pub fn cell_of(&self, p: [f32; 3]) -> [i64; 3] {
        let mut cell = [0i64; 3];
        for axis in 0..3 {
            cell[axis] = ((p[axis] - self.grid_min[axis]) / self.cell_size).floor() as i64;
        }
        cell
    }

    /// Map a world-space position to a stored cell (cx, cy, cz), clamped to grid bounds.
    #[inline]
    fn pos_to_cell(&self, p: [f32; 3]) -> [u32; 3] {
        let raw = self.cell_of(p);
        let mut cell = [0u32; 3];
        for axis in 0..3 {
            cell[axis] = raw[axis].clamp(0, self.grid_dims[axis] as i64 - 1) as u32;
        }
        cell
    }

    /// Flat cell index from (cx, cy, cz).
    #[inline]
    fn cell_hash(&self, cx: u32, cy: u32, cz: u32) -> u32 {
        cx + cy * self.grid_dims[0] + cz * self.grid_dims[0] * self.grid_dims[1]
    }

    /// Rebuild the grid from current particle positions, discarding prior contents.
    ///
    /// The three slices must all have the same length (one entry per particle).
    pub fn update(&mut self, x: &[f32], y: &[f32], z: &[f32]) {
        let n = x.len();
        debug_assert_eq!(n, y.len());
        debug_assert_eq!(n, z.len());

        let total_cells = self.total_cells();

        // --- 1. Compute cell index for each particle ---
        self.cell_indices.resize(n, 0);
        for i in 0..n {
            let [cx, cy, cz] = self.pos_to_cell([x[i], y[i], z[i]]);
            self.cell_indices[i] = self.cell_hash(cx, cy, cz);
        }

        // --- 2. Count particles per cell ---
        self.cell_counts.clear();
        self.cell_counts.resize(total_cells, 0);
        for &ci in &self.cell_indices {
            self.cell_counts[ci as usize] += 1;
        }

        // --- 3. Prefix-sum to get cell offsets ---
        let mut running = 0u32;
        for c in 0..total_cells {
            self.cell_offsets[c] = running;
            running += self.cell_counts[c];
        }

        // --- 4. Scatter particle indices into sorted order ---
        // Indices are scattered in ascending order, so each cell lists its
        // particles in ascending index order.
        self.sorted_indices.resize(n, 0);
        self.scratch.clear();
        self.scratch.extend_from_slice(&self.cell_offsets);
        for i in 0..n {
            let ci = self.cell_indices[i] as usize;
            let pos = self.scratch[ci] as usize;
            self.sorted_indices[pos] = i as u32;
            self.scratch[ci] += 1;
        }
    }

    /// Particle indices stored in the cell containing `p`.
    pub fn cell_contents(&self, p: [f32; 3]) -> &[u32] {
        let [cx, cy, cz] = self.pos_to_cell(p);
        let cell = self.cell_hash(cx, cy, cz) as usize;
        let start = self.cell_offsets[cell] as usize;
        &self.sorted_indices[start..start + self.cell_counts[cell] as usize]
    }

    /// Visit every particle within `radius` of the point `p` (inclusive).
    ///
    /// Scans the block of cells around `p` (3x3x3 when `radius <= cell_size`)
    /// and filters candidates by exact distance. Each qualifying particle is
    /// passed to `f` exactly once as `(index, dx, dy, dz, dist_sq)` where
    /// `(dx, dy, dz) = p - x_j`.
    pub fn for_each_within<F>(&self, p: [f32; 3], x: &[f32], y: &[f32], z: &[f32], radius: f32, mut f: F)
    where
        F: FnMut(usize, f32, f32, f32, f32),
    {
        let [cx, cy, cz] = self.pos_to_cell(p);
        let radius_sq = radius * radius;
        let reach = (radius / self.cell_size).ceil().max(1.0) as i64;

        let range = |c: u32, axis: usize| {
            let lo = (c as i64 - reach).max(0);
            let hi = (c as i64 + reach).min(self.grid_dims[axis] as i64 - 1);
            lo..=hi
        };

        for nz in range(cz, 2) {
            for ny in range(cy, 1) {
                for nx in range(cx, 0) {
                    let cell = self.cell_hash(nx as u32, ny as u32, nz as u32) as usize;
                    let start = self.cell_offsets[cell] as usize;
                    let count = self.cell_counts[cell] as usize;

                    for &j in &self.sorted_indices[start..start + count] {
                        let j = j as usize;
                        let ddx = p[0] - x[j];
                        let ddy = p[1] - y[j];
                        let ddz = p[2] - z[j];
                        let dist_sq = ddx * ddx + ddy * ddy + ddz * ddz;
                        if dist_sq <= radius_sq {
                            f(j, ddx, ddy, ddz, dist_sq);
                        }
                    }
                }
            }
        }
    }

    /// Iterate over all neighbors of `particle_idx` within `radius`, excluding itself.
    pub fn for_each_neighbor<F>(
        &self,
        particle_idx: usize,
        x: &[f32],
        y: &[f32],
        z: &[f32],
        radius: f32,
        mut f: F,
    ) where
        F: FnMut(usize, f32, f32, f32, f32),
    {
        let p = [x[particle_idx], y[particle_idx], z[particle_idx]];
        self.for_each_within(p, x, y, z, radius, |j, dx, dy, dz, dist_sq| {
            if j != particle_idx {
                f(j, dx, dy, dz, dist_sq);
            }
        });
    }

    /// Collect the indices of all particles within `radius` of `p`.
    pub fn neighbors_of(&self, p: [f32; 3], x: &[f32], y: &[f32], z: &[f32], radius: f32) -> Vec<usize> {
        let mut found = Vec::new();
        self.for_each_within(p, x, y, z, radius, |j, _, _, _, _| found.push(j));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_neighbors(grid: &NeighborGrid, i: usize, x: &[f32], y: &[f32], z: &[f32], r: f32) -> Vec<usize> {
        let mut neighbors = Vec::new();
        grid.for_each_neighbor(i, x, y, z, r, |j, _, _, _, _| neighbors.push(j));
        neighbors
    }

    #[test]
    #[should_panic(expected = "cell_size must be positive")]
    fn zero_cell_size_panics() {
        NeighborGrid::new(0.0, [0.0; 3], [1.0; 3]);
    }

    #[test]
    #[should_panic(expected = "cell_size must be positive")]
    fn nan_cell_size_panics() {
        NeighborGrid::new(f32::NAN, [0.0; 3], [1.0; 3]);
    }

    #[test]
    fn empty_grid() {
        let grid = NeighborGrid::new(0.1, [0.0; 3], [1.0; 3]);
        assert_eq!(grid.total_cells(), 10 * 10 * 10);
    }

    #[test]
    fn flat_domain_has_one_layer() {
        let grid = NeighborGrid::new(0.25, [0.0; 3], [1.0, 1.0, 0.0]);
        assert_eq!(grid.dims(), [4, 4, 1]);
    }

    #[test]
    fn single_particle_no_neighbors() {
        let mut grid = NeighborGrid::new(0.2, [0.0; 3], [1.0; 3]);
        let x = [0.5];
        let y = [0.5];
        let z = [0.5];
        grid.update(&x, &y, &z);
        assert!(collect_neighbors(&grid, 0, &x, &y, &z, 0.2).is_empty());
        // A point query includes the particle itself
        assert_eq!(grid.neighbors_of([0.5; 3], &x, &y, &z, 0.2), vec![0]);
    }

    #[test]
    fn two_close_particles() {
        let mut grid = NeighborGrid::new(0.2, [0.0; 3], [1.0; 3]);
        let x = [0.5, 0.51];
        let y = [0.5, 0.5];
        let z = [0.5, 0.5];
        grid.update(&x, &y, &z);

        assert_eq!(collect_neighbors(&grid, 0, &x, &y, &z, 0.2), vec![1]);
        assert_eq!(collect_neighbors(&grid, 1, &x, &y, &z, 0.2), vec![0]);
    }

    #[test]
    fn two_far_particles() {
        let mut grid = NeighborGrid::new(0.2, [0.0; 3], [1.0; 3]);
        let x = [0.1, 0.9];
        let y = [0.1, 0.9];
        let z = [0.1, 0.9];
        grid.update(&x, &y, &z);
        assert!(collect_neighbors(&grid, 0, &x, &y, &z, 0.2).is_empty());
    }

    #[test]
    fn particles_across_cell_boundary() {
        let cell_size = 0.2;
        let mut grid = NeighborGrid::new(cell_size, [0.0; 3], [1.0; 3]);
        // Particle 0 near right edge of a cell, particle 1 near left edge of next cell
        let x = [0.19, 0.21];
        let y = [0.5, 0.5];
        let z = [0.5, 0.5];
        grid.update(&x, &y, &z);
        assert_eq!(collect_neighbors(&grid, 0, &x, &y, &z, cell_size), vec![1]);
    }

    #[test]
    fn distance_equal_to_radius_is_included() {
        let mut grid = NeighborGrid::new(0.5, [0.0; 3], [2.0; 3]);
        let x = [0.5, 1.0];
        let y = [0.5, 0.5];
        let z = [0.5, 0.5];
        grid.update(&x, &y, &z);
        assert_eq!(collect_neighbors(&grid, 0, &x, &y, &z, 0.5), vec![1]);
    }

    #[test]
    fn query_outside_domain_resolves() {
        let mut grid = NeighborGrid::new(0.2, [0.0; 3], [1.0; 3]);
        let x = [-0.05, 0.05, 0.9];
        let y = [0.5, 0.5, 0.5];
        let z = [0.5, 0.5, 0.5];
        grid.update(&x, &y, &z);
        assert_eq!(grid.cell_of([-0.05, 0.5, 0.5])[0], -1);

        let mut found = grid.neighbors_of([-0.1, 0.5, 0.5], &x, &y, &z, 0.2);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1]);
        assert!(grid.neighbors_of([-5.0, 0.5, 0.5], &x, &y, &z, 0.2).is_empty());
    }

    #[test]
    fn radius_larger_than_cell_widens_scan() {
        let mut grid = NeighborGrid::new(0.1, [0.0; 3], [1.0; 3]);
        let x = [0.1, 0.35];
        let y = [0.5, 0.5];
        let z = [0.5, 0.5];
        grid.update(&x, &y, &z);
        assert_eq!(collect_neighbors(&grid, 0, &x, &y, &z, 0.3), vec![1]);
    }

    #[test]
    fn rebuild_discards_previous_contents() {
        let mut grid = NeighborGrid::new(0.2, [0.0; 3], [1.0; 3]);
        grid.update(&[0.1, 0.15], &[0.1, 0.1], &[0.1, 0.1]);
        assert_eq!(grid.cell_contents([0.1; 3]).len(), 2);

        grid.update(&[0.9], &[0.9], &[0.9]);
        assert!(grid.cell_contents([0.1; 3]).is_empty());
        assert_eq!(grid.cell_contents([0.9; 3]), &[0]);
    }

    #[test]
    fn many_particles_in_cluster() {
        let cell_size = 0.2;
        let mut grid = NeighborGrid::new(cell_size, [0.0; 3], [1.0; 3]);
        let n = 10;
        let x: Vec<f32> = (0..n).map(|i| 0.5 + (i as f32) * 0.01).collect();
        let y: Vec<f32> = vec![0.5; n];
        let z: Vec<f32> = vec![0.5; n];
        grid.update(&x, &y, &z);

        // Particle 0 should see all others (they're all within 0.09 of each other)
        assert_eq!(collect_neighbors(&grid, 0, &x, &y, &z, 0.2).len(), n - 1);
    }
}
