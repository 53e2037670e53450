pub mod backend;

/// Rendering backends the bridge ships with.
pub mod backends {
    pub mod null;
}

pub mod node;
pub mod texture;
pub mod user_data;

pub use node::{NodeState, RenderNode};
pub use texture::{Filtering, Rect, TextureHandle, TextureNode};
pub use user_data::UserData;
