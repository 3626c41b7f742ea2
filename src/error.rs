use thiserror::Error;

/// Failure building a [`Grid`](crate::grid::Grid).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// `grid_size - 1` was not a power of two of at least `2^1`, i.e.
    /// `grid_size` was not of the form `2^n + 1` for `n >= 1`.
    #[error("invalid grid_size {0}: grid_size - 1 must be a power of two (grid_size = 2^n + 1, n >= 1)")]
    InvalidGridSize(u32),
}

/// Failure binding a heightfield sample buffer to a [`Grid`](crate::grid::Grid).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TileError {
    /// `terrain.len()` did not equal `grid_size * grid_size`.
    #[error("terrain size mismatch: expected {expected} samples, found {actual}")]
    TerrainSizeMismatch { expected: usize, actual: usize },
}
