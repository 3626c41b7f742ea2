// ----------------------------------------------------------------------------

/// Named, reusable pair of extraction thresholds for [`Tile::get_mesh_with`](crate::tile::Tile::get_mesh_with).
///
/// This is sugar over the raw `get_mesh(max_error, max_length)` call for callers
/// that want to carry one set of thresholds around (e.g. per LOD level) instead
/// of passing the same two values at every call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshExtractionSettings {
    pub max_error: f32,
    pub max_length: Option<f32>,
}

// ----------------------------------------------------------------------------
impl Default for MeshExtractionSettings {
    fn default() -> Self {
        Self {
            max_error: 0.0,
            max_length: None,
        }
    }
}

// ----------------------------------------------------------------------------
impl MeshExtractionSettings {
    pub fn new(max_error: f32, max_length: Option<f32>) -> Self {
        Self {
            max_error: max_error.max(0.0),
            max_length: max_length.map(|l| l.max(0.0)),
        }
    }
    // ------------------------------------------------------------------------
    pub fn with_max_error(mut self, max_error: f32) -> Self {
        self.max_error = max_error.max(0.0);
        self
    }
    // ------------------------------------------------------------------------
    pub fn with_max_length(mut self, max_length: f32) -> Self {
        self.max_length = Some(max_length.max(0.0));
        self
    }
}
// ----------------------------------------------------------------------------
