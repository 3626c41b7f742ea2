// ----------------------------------------------------------------------------
use glam::UVec2;
use log::debug;

use crate::error::GridError;
use crate::tile::Tile;
// ----------------------------------------------------------------------------

/// Precomputed geometry of the implicit right-triangulated binary tree for a
/// fixed `grid_size`.
///
/// A Grid holds no heightfield data; it is built once for a given tile
/// resolution and reused for every [`Tile`] of that resolution. All fields are
/// set at construction and never change afterwards, so a Grid can be shared
/// (e.g. behind an `Arc`) across any number of tiles or threads.
pub struct Grid {
    grid_size: u32,
    tile_size: u32,
    num_triangles: u32,
    num_parent_triangles: u32,
    /// `(a_x, a_y, b_x, b_y)` for triangle `id`, at offset `(id - 2) * 4`.
    coords: Vec<u16>,
}

// ----------------------------------------------------------------------------
impl Grid {
    /// Builds the coordinate table for a `grid_size x grid_size` tile.
    ///
    /// `grid_size` must be `2^n + 1` for some `n >= 1` (so `grid_size - 1`,
    /// the tile side length in unit cells, is a power of two of at least 2).
    pub fn new(grid_size: u32) -> Result<Self, GridError> {
        if grid_size < 3 {
            return Err(GridError::InvalidGridSize(grid_size));
        }
        let tile_size = grid_size - 1;
        if !tile_size.is_power_of_two() {
            return Err(GridError::InvalidGridSize(grid_size));
        }

        let num_triangles = tile_size * tile_size * 2 - 2;
        let num_parent_triangles = num_triangles - tile_size * tile_size;

        debug!(
            "building rtin grid: grid_size={grid_size} tile_size={tile_size} num_triangles={num_triangles}"
        );

        let coords = Self::build_coords(tile_size, num_triangles);

        Ok(Self {
            grid_size,
            tile_size,
            num_triangles,
            num_parent_triangles,
            coords,
        })
    }

    // ------------------------------------------------------------------------
    /// Walks the implicit binary tree for every triangle id and records its
    /// two stored vertices (a, b). The third vertex is never stored; see
    /// [`Grid::apex`].
    fn build_coords(tile_size: u32, num_triangles: u32) -> Vec<u16> {
        let mut coords = vec![0u16; (num_triangles * 4) as usize];

        for i in 0..num_triangles {
            let mut id = i + 2;

            // root configuration, by parity of id
            let (mut ax, mut ay, mut bx, mut by, mut cx, mut cy) = if id & 1 == 1 {
                (0u32, 0u32, tile_size, tile_size, tile_size, 0u32)
            } else {
                (tile_size, tile_size, 0u32, 0u32, 0u32, tile_size)
            };

            // descend from the root to triangle `id`, one tree level per
            // right-shift, refining (a, b, c) at each step
            loop {
                id >>= 1;
                if id <= 1 {
                    break;
                }
                let mx = (ax + bx) / 2;
                let my = (ay + by) / 2;
                if id & 1 == 1 {
                    bx = ax;
                    by = ay;
                    ax = cx;
                    ay = cy;
                } else {
                    ax = bx;
                    ay = by;
                    bx = cx;
                    by = cy;
                }
                cx = mx;
                cy = my;
            }

            let k = (i * 4) as usize;
            coords[k] = ax as u16;
            coords[k + 1] = ay as u16;
            coords[k + 2] = bx as u16;
            coords[k + 3] = by as u16;
        }

        coords
    }

    // ------------------------------------------------------------------------
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }
    // ------------------------------------------------------------------------
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }
    // ------------------------------------------------------------------------
    pub fn num_triangles(&self) -> u32 {
        self.num_triangles
    }
    // ------------------------------------------------------------------------
    pub fn num_parent_triangles(&self) -> u32 {
        self.num_parent_triangles
    }

    // ------------------------------------------------------------------------
    /// The two stored vertices for triangle `id` (`id >= 2`).
    pub(crate) fn triangle_coords(&self, id: u32) -> (UVec2, UVec2) {
        let k = ((id - 2) * 4) as usize;
        let a = UVec2::new(self.coords[k] as u32, self.coords[k + 1] as u32);
        let b = UVec2::new(self.coords[k + 2] as u32, self.coords[k + 3] as u32);
        (a, b)
    }

    // ------------------------------------------------------------------------
    /// Recovers the right-angle apex of a triangle from its two stored
    /// vertices via the 90-degree rotation identity: `c = m + rot90(a - m)`,
    /// where `m` is the midpoint of `(a, b)`. Exact in integer arithmetic
    /// because all coordinates in the tree have even parity at every level
    /// above the leaves.
    pub(crate) fn apex(a: UVec2, b: UVec2) -> UVec2 {
        let m = midpoint(a, b);
        let (ax, ay, mx, my) = (a.x as i64, a.y as i64, m.x as i64, m.y as i64);
        let cx = mx + (my - ay);
        let cy = my + (ax - mx);
        UVec2::new(cx as u32, cy as u32)
    }

    // ------------------------------------------------------------------------
    /// Binds a heightfield to this Grid and eagerly computes its error field.
    ///
    /// `terrain` must have exactly `grid_size * grid_size` samples, in
    /// row-major order (`terrain[y * grid_size + x]`). Any numeric sample
    /// type that can be widened to `f32` is accepted.
    pub fn create_tile<T>(&self, terrain: Vec<T>) -> Result<Tile<'_>, crate::error::TileError>
    where
        T: Copy,
        f32: From<T>,
    {
        Tile::new(self, terrain)
    }
}

// ----------------------------------------------------------------------------
pub(crate) fn midpoint(a: UVec2, b: UVec2) -> UVec2 {
    UVec2::new((a.x + b.x) / 2, (a.y + b.y) / 2)
}
// ----------------------------------------------------------------------------
