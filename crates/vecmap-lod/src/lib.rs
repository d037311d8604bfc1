//! Level-of-detail selection for the tile quadtree: viewport math, the
//! blend tree that produces each frame's draw list, and the candidate set
//! that drives background loading.

mod candidates;
mod tree;
mod viewport;

pub use candidates::{CandidateTracker, compute_candidates};
pub use tree::{DrawItem, LodConfig, LodTree, NodeState, TileAvailability};
pub use viewport::{
    LAYER_SCALE_THRESHOLDS, MAX_SCALE, MIN_SCALE, ScreenEdges, TileEdges, camera_distance,
    clamp_scale, layer_for_scale,
};
