//! Per-frame synchronization on the render thread.
//!
//! The host calls [`FrameDriver::update_paint_node`] once per frame while the
//! producer thread is blocked. The driver creates the render node on demand,
//! follows size changes, drains the deferred command queue, renders at most
//! once and publishes the resulting texture.

use crate::config::BridgeConfig;
use crate::dispatch::CommandQueue;
use crate::errors::{BridgeError, FaultKind};
use crate::events::BridgeEvent;
use crate::item::{ItemHandle, ItemId, Shared};
use crate::render::backend::{GraphicsApi, RenderBackend, SceneInitializer};
use crate::render::node::{NodeState, RenderNode};
use crate::render::texture::{TextureHandle, TextureNode};
use crate::thread::NotSend;
use std::marker::PhantomData;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum FrameStatus {
    /// No render node exists, nothing was done
    #[default]
    NotInitialized,
    /// The item has no area, node creation was skipped
    Skipped,
    /// Node exists, nothing was pending
    Idle,
    Rendered,
    /// A fault occurred; see [`FrameReport::fault`]
    Faulted,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameReport {
    pub status: FrameStatus,
    pub resized: bool,
    pub commands_executed: usize,
    pub commands_failed: usize,
    pub rendered: bool,
    /// A new texture was published this frame
    pub texture_changed: bool,
    pub fault: Option<FaultKind>,
}

impl FrameReport {
    fn with_status(status: FrameStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// The host should composite again.
    pub fn needs_redraw(&self) -> bool {
        self.texture_changed
    }
}

/// Render-thread half of an item. Cannot leave the thread it was attached on.
pub struct FrameDriver {
    shared: Arc<Shared>,
    queue: CommandQueue,
    initializer: Box<dyn SceneInitializer + Send>,
    backend: Box<dyn RenderBackend>,
    node: Option<RenderNode>,
    _not_send: NotSend,
}

impl FrameDriver {
    pub(crate) fn new(
        shared: Arc<Shared>,
        queue: CommandQueue,
        initializer: Box<dyn SceneInitializer + Send>,
        backend: Box<dyn RenderBackend>,
    ) -> Self {
        Self {
            shared,
            queue,
            initializer,
            backend,
            node: None,
            _not_send: PhantomData,
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.shared.id
    }

    pub fn handle(&self) -> ItemHandle {
        ItemHandle::from_shared(self.shared.clone())
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.shared.config
    }

    /// Fold a render request into the next frame without asking the host for one.
    pub fn request_render(&self) {
        self.shared.render_requested.store(true, Ordering::SeqCst);
    }

    pub fn graphics_api(&self) -> GraphicsApi {
        self.backend.graphics_api()
    }

    pub fn node(&self) -> Option<&RenderNode> {
        self.node.as_ref()
    }

    pub fn node_state(&self) -> NodeState {
        self.node.as_ref().map_or(NodeState::Uninitialized, RenderNode::state)
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.node.as_ref().and_then(RenderNode::texture)
    }

    pub fn texture_node(&self) -> Option<&TextureNode> {
        self.node.as_ref().map(RenderNode::texture_node)
    }

    /// Create the render node if it does not exist yet.
    pub fn create_node(&mut self) -> Result<(), BridgeError> {
        if self.node.is_some() {
            return Ok(());
        }

        let api = self.backend.graphics_api();
        if !self.shared.config.supports(api) {
            let err = BridgeError::UnsupportedBackend(api);
            report_fault(&self.shared, &err);
            return Err(err);
        }

        match RenderNode::initialize(self.backend.as_ref(), self.initializer.as_mut(), &self.shared.config) {
            Ok(node) => {
                log::debug!("render node created for item {}", self.shared.id);
                self.node = Some(node);
                self.shared.emit(BridgeEvent::NodeCreated { item_id: self.shared.id });
                Ok(())
            }
            Err(err) => {
                report_fault(&self.shared, &err);
                Err(err)
            }
        }
    }

    /// Per-frame sync entry point.
    pub fn update_paint_node(&mut self) -> FrameReport {
        if self.node.is_none() {
            if !self.shared.geometry().has_area() {
                return FrameReport::with_status(FrameStatus::Skipped);
            }
            if let Err(err) = self.create_node() {
                return FrameReport {
                    fault: Some(err.kind()),
                    ..FrameReport::with_status(FrameStatus::NotInitialized)
                };
            }
        }
        self.on_frame()
    }

    /// Resize, drain, render and publish, in that order.
    pub fn on_frame(&mut self) -> FrameReport {
        let geometry = *self.shared.geometry();
        let shared = &self.shared;
        let Some(node) = self.node.as_mut() else {
            return FrameReport::with_status(FrameStatus::NotInitialized);
        };

        let mut report = FrameReport::with_status(FrameStatus::Idle);

        let size = geometry.pixel_size();
        if size != node.size() {
            match node.resize(size) {
                Ok(()) => {
                    report.resized = true;
                    shared.set_published(None);
                }
                Err(err) => fault(shared, &mut report, &err),
            }
        }

        match node.drain(&mut self.queue) {
            Ok(drained) => {
                report.commands_executed = drained.executed;
                report.commands_failed = drained.failed;
                if drained.failed > 0 {
                    report.fault = Some(FaultKind::CommandFailed);
                    shared.emit(BridgeEvent::Fault {
                        item_id: shared.id,
                        kind: FaultKind::CommandFailed,
                        message: format!("{} deferred command(s) failed", drained.failed),
                    });
                }
            }
            Err(err) => fault(shared, &mut report, &err),
        }

        if shared.render_requested.swap(false, Ordering::SeqCst) {
            node.schedule_render();
        }

        match node.render() {
            Ok(rendered) => report.rendered = rendered,
            Err(err) => fault(shared, &mut report, &err),
        }

        if report.rendered {
            match node.publish_texture() {
                Ok(texture) => {
                    report.texture_changed = true;
                    shared.set_published(Some(texture));
                    shared.emit(BridgeEvent::TextureChanged {
                        item_id: shared.id,
                        texture,
                    });
                }
                Err(err) => fault(shared, &mut report, &err),
            }
        }

        // The host composites the resized texture on its next frame.
        if report.resized && report.texture_changed {
            shared.request_frame();
        }

        node.finish_resize();
        node.sync_geometry(geometry.rect(), geometry.smooth);

        if report.fault.is_some() {
            report.status = FrameStatus::Faulted;
        } else if report.rendered {
            report.status = FrameStatus::Rendered;
        }
        report
    }

    /// The host released the item's graphics resources.
    pub fn release_resources(&mut self) {
        self.teardown("resources released");
    }

    /// The host's scene graph was invalidated, e.g. its window closed.
    pub fn invalidate_scene_graph(&mut self) {
        self.teardown("scene graph invalidated");
    }

    fn teardown(&mut self, reason: &str) {
        let dropped = self.queue.discard();
        if dropped > 0 {
            log::debug!("item {}: {reason}, dropped {dropped} queued command(s)", self.shared.id);
        }

        if let Some(mut node) = self.node.take() {
            log::debug!("item {}: {reason}, tearing down render node", self.shared.id);
            node.teardown();
            self.shared.set_published(None);
            self.shared.emit(BridgeEvent::NodeDestroyed { item_id: self.shared.id });
        }
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        self.teardown("driver dropped");
    }
}

fn report_fault(shared: &Shared, err: &BridgeError) {
    log::warn!("item {}: {err}", shared.id);
    shared.emit(BridgeEvent::Fault {
        item_id: shared.id,
        kind: err.kind(),
        message: err.to_string(),
    });
}

fn fault(shared: &Shared, report: &mut FrameReport, err: &BridgeError) {
    report_fault(shared, err);
    report.fault = Some(err.kind());
}
