//! Render-target lifecycle.
//!
//! A [`RenderNode`] owns the external renderer's window and the integrator's
//! [`UserData`] for as long as the host keeps its scene graph node alive. It
//! is created lazily on the first frame, resized whenever the item's pixel
//! size changes, and torn down when the host releases its resources.

use crate::config::BridgeConfig;
use crate::dispatch::{CommandQueue, DrainReport};
use crate::errors::BridgeError;
use crate::render::backend::{InteractorKind, RenderBackend, RenderWindow, SceneInitializer, SurfaceSize};
use crate::render::texture::{Filtering, Rect, TextureHandle, TextureNode};
use crate::render::user_data::UserData;
use crate::thread::NotSend;
use std::marker::PhantomData;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeState {
    /// No render target exists yet
    Uninitialized,
    Ready,
    /// Size changed, new texture not derived yet
    Resizing,
    /// Torn down, terminal
    Destroyed,
}

pub struct RenderNode {
    state: NodeState,
    window: Option<Box<dyn RenderWindow>>,
    user_data: Option<UserData>,
    size: SurfaceSize,
    texture_node: TextureNode,
    render_pending: bool,
    frame_id: u64,
    _not_send: NotSend,
}

impl RenderNode {
    /// Create the render window and build the scene in it.
    ///
    /// The window is only usable when it comes with a host-forwarded
    /// interactor. Anything else is refused and the half-built window is
    /// released before returning.
    pub fn initialize(
        backend: &dyn RenderBackend,
        initializer: &mut dyn SceneInitializer,
        config: &BridgeConfig,
    ) -> Result<Self, BridgeError> {
        log::debug!("creating render window on backend {}", backend.name());

        let mut window = backend.create_window().map_err(BridgeError::TargetCreation)?;
        window.set_multisamples(config.multisamples);
        window.set_ready_for_rendering(false);

        let user_data = match initializer.initialize(window.as_mut()) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("scene initialization failed: {e:#}");
                release_window(window.as_mut());
                return Err(BridgeError::SceneInit(e));
            }
        };

        let kind = window.interactor_kind();
        if kind != InteractorKind::HostForwarded {
            log::warn!("render window has a {kind} interactor; only host-forwarded interactors are supported");
            release_window(window.as_mut());
            drop(user_data);
            return Err(BridgeError::InteractorMismatch(kind.to_string()));
        }

        if let Err(e) = window.initialize_interactor() {
            log::warn!("cannot initialize interactor: {e:#}");
            release_window(window.as_mut());
            drop(user_data);
            return Err(BridgeError::TargetCreation(e));
        }

        Ok(Self {
            state: NodeState::Ready,
            window: Some(window),
            user_data: Some(user_data),
            size: SurfaceSize::default(),
            texture_node: TextureNode::default(),
            render_pending: false,
            frame_id: 0,
            _not_send: PhantomData,
        })
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Size of the render target in device pixels.
    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn render_pending(&self) -> bool {
        self.render_pending
    }

    pub fn schedule_render(&mut self) {
        self.render_pending = true;
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture_node.texture
    }

    pub fn texture_node(&self) -> &TextureNode {
        &self.texture_node
    }

    pub fn window(&self) -> Option<&(dyn RenderWindow + 'static)> {
        self.window.as_deref()
    }

    pub fn window_mut(&mut self) -> Option<&mut (dyn RenderWindow + 'static)> {
        self.window.as_deref_mut()
    }

    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    /// Resize the render target. The current texture is discarded and a render is scheduled.
    pub fn resize(&mut self, size: SurfaceSize) -> Result<(), BridgeError> {
        let Some(window) = self.window.as_mut() else {
            return Err(BridgeError::NotInitialized);
        };

        log::debug!("resizing render target {} -> {}", self.size, size);
        window.set_size(size);
        window.set_interactor_size(size);

        self.size = size;
        self.texture_node.texture = None;
        self.render_pending = true;
        self.state = NodeState::Resizing;
        Ok(())
    }

    pub fn finish_resize(&mut self) {
        if self.state == NodeState::Resizing {
            self.state = NodeState::Ready;
        }
    }

    /// Run the queued commands with the window marked ready for rendering.
    pub fn drain(&mut self, queue: &mut CommandQueue) -> Result<DrainReport, BridgeError> {
        if queue.is_empty() {
            return Ok(DrainReport::default());
        }
        let (Some(window), Some(user_data)) = (self.window.as_mut(), self.user_data.as_mut()) else {
            return Err(BridgeError::NotInitialized);
        };

        window.set_ready_for_rendering(true);
        let report = queue.drain_and_execute(window.as_mut(), user_data);
        window.set_ready_for_rendering(false);

        if report.attempted() > 0 {
            self.render_pending = true;
        }
        Ok(report)
    }

    /// Render one frame if one is pending. Returns whether a pass ran.
    pub fn render(&mut self) -> Result<bool, BridgeError> {
        if !self.render_pending {
            return Ok(false);
        }
        let Some(window) = self.window.as_mut() else {
            return Err(BridgeError::NotInitialized);
        };

        self.render_pending = false;
        window.process_pending_events();
        window.render().map_err(BridgeError::RenderFailed)?;
        self.frame_id = self.frame_id.wrapping_add(1);

        log::trace!("rendered frame {} at {}", self.frame_id, self.size);
        Ok(true)
    }

    /// Derive the texture from the first color attachment of the last render.
    ///
    /// On failure the previously published texture stays in place.
    pub fn publish_texture(&mut self) -> Result<TextureHandle, BridgeError> {
        let Some(window) = self.window.as_ref() else {
            return Err(BridgeError::NotInitialized);
        };

        let framebuffer = window.display_framebuffer().ok_or(BridgeError::FramebufferAbsent)?;
        let attachment = framebuffer
            .color_attachments
            .first()
            .ok_or(BridgeError::NoColorAttachment)?;

        let texture = TextureHandle::from_attachment(attachment, self.frame_id);
        self.texture_node.texture = Some(texture);
        Ok(texture)
    }

    pub fn sync_geometry(&mut self, rect: Rect, smooth: bool) {
        self.texture_node.rect = rect;
        self.texture_node.filtering = Filtering::for_smooth(smooth);
        self.texture_node.mirror_vertically = true;
    }

    /// Release everything: texture, renderer resources, window resources, then user data.
    ///
    /// Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.state == NodeState::Destroyed {
            return;
        }
        log::debug!("tearing down render node");

        self.texture_node.texture = None;
        if let Some(window) = self.window.as_mut() {
            release_window(window.as_mut());
        }
        self.user_data = None;
        self.window = None;
        self.render_pending = false;
        self.state = NodeState::Destroyed;
    }
}

impl Drop for RenderNode {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn release_window(window: &mut dyn RenderWindow) {
    for renderer in window.renderers_mut() {
        log::trace!("releasing graphics resources of {}", renderer.name());
        renderer.release_graphics_resources();
    }
    window.release_graphics_resources();
}
