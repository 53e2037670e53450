//! Texture published to the host scene graph.
//!
//! A [`TextureHandle`] wraps the native id of the render window's first color
//! attachment. It is only valid for the size it was derived at: every resize
//! discards it and a fresh one is derived after the next render.
//!
//! [`TextureNode`] is what the host actually displays: the current texture,
//! the item's logical rectangle and how the texture is sampled.

use crate::render::backend::{ColorAttachment, SurfaceSize};

/// Handle the host can composite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureHandle {
    /// Native texture object of the color attachment.
    pub native_id: u64,
    /// Size in device pixels.
    pub size: SurfaceSize,
    /// Render pass that last wrote into the texture. Helps hosts avoid sampling stale frames.
    pub frame_id: u64,
    pub has_alpha: bool,
}

impl TextureHandle {
    pub fn from_attachment(attachment: &ColorAttachment, frame_id: u64) -> Self {
        Self {
            native_id: attachment.native_id,
            size: attachment.size,
            frame_id,
            has_alpha: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Filtering {
    #[default]
    Linear,
    Nearest,
}

impl Filtering {
    pub fn for_smooth(smooth: bool) -> Self {
        if smooth {
            Filtering::Linear
        } else {
            Filtering::Nearest
        }
    }
}

/// Logical rectangle of the item, in host coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Scene graph node state for a bridged item.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureNode {
    pub texture: Option<TextureHandle>,
    pub rect: Rect,
    pub filtering: Filtering,
    /// Renderer output is bottom-up; the host flips it when sampling.
    pub mirror_vertically: bool,
}

impl Default for TextureNode {
    fn default() -> Self {
        Self {
            texture: None,
            rect: Rect::default(),
            filtering: Filtering::Linear,
            mirror_vertically: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_follows_attachment() {
        let att = ColorAttachment { native_id: 7, size: SurfaceSize::new(640, 480) };
        let tex = TextureHandle::from_attachment(&att, 3);
        assert_eq!(tex.native_id, 7);
        assert_eq!(tex.size, SurfaceSize::new(640, 480));
        assert_eq!(tex.frame_id, 3);
        assert!(tex.has_alpha);
    }

    #[test]
    fn smooth_picks_linear() {
        assert_eq!(Filtering::for_smooth(true), Filtering::Linear);
        assert_eq!(Filtering::for_smooth(false), Filtering::Nearest);
        assert!(TextureNode::default().mirror_vertically);
    }
}
