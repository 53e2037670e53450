//! Interfaces of the external renderer the bridge drives.
//!
//! The bridge never depends on a concrete renderer. A [`RenderBackend`]
//! creates [`RenderWindow`]s; the integrator's [`SceneInitializer`] builds
//! whatever scene it wants inside a window and hands back a single
//! [`UserData`] token owning all of it.

use crate::events::InputEvent;
use crate::render::user_data::UserData;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::{Display, Formatter};

/// Size of a surface in device pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Display for SurfaceSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Graphics API the host scene graph renders with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphicsApi {
    /// Headless, no GPU involved
    Null,
    Software,
    OpenGL,
    OpenGLRhi,
    Vulkan,
    Metal,
    Direct3D11,
    Direct3D12,
}

impl Display for GraphicsApi {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// What kind of input sink the render window currently has installed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractorKind {
    /// No interactor at all
    None,
    /// An interactor that accepts events forwarded by the host
    HostForwarded,
    /// Some renderer-native interactor the bridge cannot feed
    Other(String),
}

impl Display for InteractorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractorKind::None => write!(f, "none"),
            InteractorKind::HostForwarded => write!(f, "host-forwarded"),
            InteractorKind::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A color attachment of the window's display framebuffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorAttachment {
    /// Native texture object (GL name, image id, ...).
    pub native_id: u64,
    pub size: SurfaceSize,
}

/// The framebuffer a render pass drew into.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Framebuffer {
    pub color_attachments: Vec<ColorAttachment>,
}

/// One renderer composed into a window. Owns its own graphics resources.
pub trait SubRenderer {
    fn name(&self) -> &str;

    /// Release every graphics resource this renderer holds for its window.
    fn release_graphics_resources(&mut self);
}

/// The external renderer's offscreen window. All calls occur on the render thread.
pub trait RenderWindow {
    /// Current size in device pixels.
    fn size(&self) -> SurfaceSize;

    /// Resize the window; previously created framebuffers become invalid.
    fn set_size(&mut self, size: SurfaceSize);

    fn set_multisamples(&mut self, samples: u32);

    /// Gate that keeps the renderer from drawing outside a render pass.
    fn set_ready_for_rendering(&mut self, ready: bool);

    fn interactor_kind(&self) -> InteractorKind;

    /// Prepare the interactor and the shared context for drawing.
    fn initialize_interactor(&mut self) -> anyhow::Result<()>;

    fn set_interactor_size(&mut self, size: SurfaceSize);

    /// Feed one host input event to the interactor.
    fn process_event(&mut self, event: &InputEvent);

    /// Let the interactor run timers and observers before a render.
    fn process_pending_events(&mut self) {}

    /// Render exactly one frame into the display framebuffer.
    fn render(&mut self) -> anyhow::Result<()>;

    /// Framebuffer of the last render pass, if there was one.
    fn display_framebuffer(&self) -> Option<Framebuffer>;

    /// The renderers composed into this window.
    fn renderers_mut(&mut self) -> &mut [Box<dyn SubRenderer>];

    /// Release window-level graphics resources (after all renderers released theirs).
    fn release_graphics_resources(&mut self);

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Core backend interface. Calls occur on the render thread.
pub trait RenderBackend {
    fn name(&self) -> &str;

    /// The graphics API the backend shares textures through.
    fn graphics_api(&self) -> GraphicsApi;

    /// Create a new, not yet sized render window.
    fn create_window(&self) -> anyhow::Result<Box<dyn RenderWindow>>;
}

/// Builds the renderer-side scene for a freshly created window.
///
/// Runs on the render thread while the producer thread is blocked, so it may
/// read any state the producer owns. It runs again whenever the host
/// recreates the node, and must restore all renderer state each time.
pub trait SceneInitializer {
    /// Build the scene and return the token that owns everything created here.
    fn initialize(&mut self, window: &mut dyn RenderWindow) -> anyhow::Result<UserData>;
}

impl<F> SceneInitializer for F
where
    F: FnMut(&mut dyn RenderWindow) -> anyhow::Result<UserData>,
{
    fn initialize(&mut self, window: &mut dyn RenderWindow) -> anyhow::Result<UserData> {
        self(window)
    }
}
