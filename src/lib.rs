//! Right-Triangulated Irregular Network (RTIN) level-of-detail mesh
//! extraction for square heightfield tiles.
//!
//! A [`grid::Grid`] precomputes the implicit binary triangle tree geometry
//! for a fixed `grid_size = 2^n + 1`. A [`tile::Tile`] binds a heightfield
//! sample buffer to a Grid, eagerly computes a per-pixel approximation-error
//! field, and extracts an adaptive, crack-free mesh via
//! [`tile::Tile::get_mesh`] for any vertical-error / max-edge-length budget.
//!
//! This crate does no I/O, decoding, projection, or rendering: callers
//! supply an already-decoded square heightfield and consume the emitted
//! vertex/index buffers.
//!
//! ```
//! use rtin_terrain::Grid;
//!
//! let grid = Grid::new(5).unwrap();
//! let terrain = vec![0.0f32; 25];
//! let tile = grid.create_tile(terrain).unwrap();
//! let mesh = tile.get_mesh(0.0, None);
//! assert_eq!(mesh.triangle_count(), 2);
//! ```
// ----------------------------------------------------------------------------
pub mod error;
pub mod grid;
pub mod settings;
pub mod tile;
// ----------------------------------------------------------------------------
pub use error::{GridError, TileError};
pub use grid::Grid;
pub use settings::MeshExtractionSettings;
pub use tile::{Mesh, Tile};
// ----------------------------------------------------------------------------
