//! Producer-facing side of a bridged item.
//!
//! An [`OffscreenItem`] is created on the producer (UI/event) thread and
//! handed to the render thread, where [`OffscreenItem::attach`] turns it into
//! a [`FrameDriver`]. Everything the producer keeps is an [`ItemHandle`]:
//! it enqueues deferred commands, forwards input, updates geometry and asks
//! the host for frames. It never touches renderer state itself.

use crate::config::BridgeConfig;
use crate::dispatch::{self, CommandQueue, CommandSender, PendingCommand};
use crate::errors::BridgeError;
use crate::events::{BridgeEvent, EventKind, InputEvent};
use crate::frame::FrameDriver;
use crate::render::backend::{RenderBackend, RenderWindow, SceneInitializer, SurfaceSize};
use crate::render::texture::{Rect, TextureHandle};
use crate::render::user_data::UserData;
use crate::thread::RenderThread;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, Notify};
use uuid::Uuid;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The host's "schedule a frame" signal.
pub trait FrameRequester: Send + Sync {
    fn request_frame(&self);
}

impl<F> FrameRequester for F
where
    F: Fn() + Send + Sync,
{
    fn request_frame(&self) {
        self()
    }
}

/// Requests frames by waking whoever waits on a [`Notify`], e.g. a [`RenderLoop`](crate::render_loop::RenderLoop).
#[derive(Debug, Clone, Default)]
pub struct NotifyRequester(Arc<Notify>);

impl NotifyRequester {
    pub fn new(notify: Arc<Notify>) -> Self {
        Self(notify)
    }

    pub fn notify(&self) -> Arc<Notify> {
        self.0.clone()
    }
}

impl FrameRequester for NotifyRequester {
    fn request_frame(&self) {
        self.0.notify_one();
    }
}

/// Logical geometry of the item as laid out by the host.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
    pub smooth: bool,
}

impl Geometry {
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Size in device pixels: logical size times device pixel ratio, rounded.
    pub fn pixel_size(&self) -> SurfaceSize {
        let px = |v: f64| (v * self.device_pixel_ratio).round().max(0.0) as u32;
        SurfaceSize::new(px(self.width), px(self.height))
    }

    pub fn rect(&self) -> Rect {
        Rect {
            x: 0.0,
            y: 0.0,
            width: self.width,
            height: self.height,
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            device_pixel_ratio: 1.0,
            smooth: true,
        }
    }
}

/// State shared between the producer handles and the frame driver.
pub(crate) struct Shared {
    pub(crate) id: ItemId,
    pub(crate) config: BridgeConfig,
    pub(crate) sender: CommandSender,
    pub(crate) render_requested: AtomicBool,
    pub(crate) geometry: Mutex<Geometry>,
    pub(crate) render_thread: RenderThread,
    pub(crate) event_tx: broadcast::Sender<BridgeEvent>,
    pub(crate) published: Mutex<Option<TextureHandle>>,
    requester: Arc<dyn FrameRequester>,
}

impl Shared {
    pub(crate) fn geometry(&self) -> MutexGuard<'_, Geometry> {
        self.geometry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn set_published(&self, texture: Option<TextureHandle>) {
        *self.published.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = texture;
    }

    /// Send a bridge event. Having no subscribers is fine.
    pub(crate) fn emit(&self, event: BridgeEvent) {
        let _ = self.event_tx.send(event);
    }

    pub(crate) fn request_frame(&self) {
        self.requester.request_frame();
    }
}

/// A bridged item before it is attached to a render thread.
pub struct OffscreenItem {
    shared: Arc<Shared>,
    queue: CommandQueue,
    initializer: Box<dyn SceneInitializer + Send>,
}

impl OffscreenItem {
    pub fn new(
        config: BridgeConfig,
        initializer: impl SceneInitializer + Send + 'static,
        requester: Arc<dyn FrameRequester>,
    ) -> Self {
        let (sender, queue) = dispatch::channel();
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let geometry = Geometry {
            smooth: config.smooth,
            ..Geometry::default()
        };

        let shared = Arc::new(Shared {
            id: ItemId::new(),
            config,
            sender,
            render_requested: AtomicBool::new(false),
            geometry: Mutex::new(geometry),
            render_thread: RenderThread::new(),
            event_tx,
            published: Mutex::new(None),
            requester,
        });

        log::debug!("created offscreen item {}", shared.id);
        Self {
            shared,
            queue,
            initializer: Box::new(initializer),
        }
    }

    pub fn id(&self) -> ItemId {
        self.shared.id
    }

    pub fn handle(&self) -> ItemHandle {
        ItemHandle::from_shared(self.shared.clone())
    }

    /// Bind the calling thread as the render thread and hand over the render side.
    pub fn attach(self, backend: Box<dyn RenderBackend>) -> Result<FrameDriver, BridgeError> {
        self.shared.render_thread.bind()?;
        log::debug!("item {} attached to backend {}", self.shared.id, backend.name());
        Ok(FrameDriver::new(self.shared, self.queue, self.initializer, backend))
    }
}

/// Producer-side handle of an item. Cheap to clone, usable from any thread.
#[derive(Clone)]
pub struct ItemHandle {
    shared: Arc<Shared>,
}

impl ItemHandle {
    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> ItemId {
        self.shared.id
    }

    /// Defer `f` to the render thread and request a frame.
    ///
    /// `f` runs during the next frame sync, with the render window marked
    /// ready and the integrator's user data at hand.
    pub fn dispatch_async<F>(&self, f: F) -> Result<(), BridgeError>
    where
        F: FnOnce(&mut dyn RenderWindow, &mut UserData) -> anyhow::Result<()> + Send + 'static,
    {
        self.dispatch(PendingCommand::new(f))
    }

    pub fn dispatch(&self, command: PendingCommand) -> Result<(), BridgeError> {
        self.shared.sender.send(command)?;
        self.shared.request_frame();
        Ok(())
    }

    /// Ask for a render pass without queueing any command.
    pub fn request_render(&self) {
        self.shared.render_requested.store(true, Ordering::SeqCst);
        self.shared.request_frame();
    }

    /// Forward a host input event to the render window's interactor.
    ///
    /// Returns whether the item accepted the event. Rejected events should be
    /// propagated by the host.
    pub fn forward_event(&self, event: InputEvent) -> bool {
        let config = &self.shared.config;
        let accepted = match event.kind() {
            EventKind::Hover => config.accept_hover,
            EventKind::Touch => config.accept_touch,
            _ => true,
        };
        if !accepted {
            log::trace!("not accepting {} event", event.name());
            return false;
        }

        let command = PendingCommand::labeled(event.name(), move |window, _| {
            window.process_event(&event);
            Ok(())
        });
        self.dispatch(command).is_ok()
    }

    pub fn set_position(&self, x: f64, y: f64) {
        let mut geo = self.shared.geometry();
        geo.x = x;
        geo.y = y;
    }

    /// Set the logical size. A change requests a frame.
    pub fn set_size(&self, width: f64, height: f64) {
        let changed = {
            let mut geo = self.shared.geometry();
            let changed = geo.width != width || geo.height != height;
            geo.width = width;
            geo.height = height;
            changed
        };
        if changed {
            self.shared.request_frame();
        }
    }

    /// The item moved to a screen with a different pixel density.
    pub fn set_device_pixel_ratio(&self, dpr: f64) {
        let changed = {
            let mut geo = self.shared.geometry();
            let changed = geo.device_pixel_ratio != dpr;
            geo.device_pixel_ratio = dpr;
            changed
        };
        if changed {
            log::debug!("item {} device pixel ratio changed to {dpr}", self.shared.id);
            self.shared.request_frame();
        }
    }

    pub fn set_smooth(&self, smooth: bool) {
        let changed = {
            let mut geo = self.shared.geometry();
            let changed = geo.smooth != smooth;
            geo.smooth = smooth;
            changed
        };
        if changed {
            self.shared.request_frame();
        }
    }

    pub fn geometry(&self) -> Geometry {
        *self.shared.geometry()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<BridgeEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Commands waiting for the next drain.
    pub fn pending_commands(&self) -> usize {
        self.shared.sender.pending()
    }

    pub fn is_attached(&self) -> bool {
        self.shared.render_thread.is_bound()
    }

    /// The texture currently published to the host.
    ///
    /// Only meaningful on the render thread; anywhere else this logs a warning
    /// and returns `None`.
    pub fn texture(&self) -> Option<TextureHandle> {
        if !self.shared.render_thread.is_current() {
            log::warn!("texture of item {} queried outside the render thread", self.shared.id);
            return None;
        }
        *self.shared.published.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ItemHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemHandle")
            .field("id", &self.shared.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Modifiers, Point, TouchPhase};
    use crate::render::backends::null::NullBackend;
    use std::sync::atomic::AtomicUsize;

    fn counting_item(config: BridgeConfig) -> (OffscreenItem, Arc<AtomicUsize>) {
        let frames = Arc::new(AtomicUsize::new(0));
        let counter = frames.clone();
        let requester = move || {
            counter.fetch_add(1, Ordering::SeqCst);
        };
        let init = |_: &mut dyn RenderWindow| -> anyhow::Result<UserData> { Ok(UserData::empty()) };
        (OffscreenItem::new(config, init, Arc::new(requester)), frames)
    }

    fn hover() -> InputEvent {
        InputEvent::HoverEnter {
            pos: Point::new(1.0, 1.0),
            modifiers: Modifiers::empty(),
        }
    }

    #[test]
    fn dispatch_queues_and_requests_frame() {
        let (item, frames) = counting_item(BridgeConfig::default());
        let handle = item.handle();

        handle.dispatch_async(|_, _| Ok(())).unwrap();
        handle.dispatch_async(|_, _| Ok(())).unwrap();
        assert_eq!(handle.pending_commands(), 2);
        assert_eq!(frames.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dispatch_fails_after_item_is_gone() {
        let (item, _) = counting_item(BridgeConfig::default());
        let handle = item.handle();
        drop(item);

        assert!(matches!(handle.dispatch_async(|_, _| Ok(())), Err(BridgeError::ChannelClosed)));
        assert!(!handle.forward_event(InputEvent::Leave));
    }

    #[test]
    fn hover_and_touch_follow_config() {
        let (item, _) = counting_item(BridgeConfig::default());
        let handle = item.handle();
        let touch = InputEvent::Touch {
            phase: TouchPhase::Begin,
            modifiers: Modifiers::empty(),
            points: vec![],
        };

        assert!(handle.forward_event(hover()));
        assert!(!handle.forward_event(touch.clone()));
        assert!(handle.forward_event(InputEvent::Leave));
        assert_eq!(handle.pending_commands(), 2);

        let config = BridgeConfig::builder().accept_hover(false).accept_touch(true).build().unwrap();
        let (item, _) = counting_item(config);
        let handle = item.handle();
        assert!(!handle.forward_event(hover()));
        assert!(handle.forward_event(touch));
        assert_eq!(handle.pending_commands(), 1);
    }

    #[test]
    fn geometry_changes_request_frames() {
        let (item, frames) = counting_item(BridgeConfig::default());
        let handle = item.handle();

        handle.set_size(200.0, 100.0);
        handle.set_size(200.0, 100.0);
        assert_eq!(frames.load(Ordering::SeqCst), 1);

        handle.set_device_pixel_ratio(2.0);
        handle.set_device_pixel_ratio(2.0);
        assert_eq!(frames.load(Ordering::SeqCst), 2);

        handle.set_smooth(false);
        assert_eq!(frames.load(Ordering::SeqCst), 3);

        let geo = handle.geometry();
        assert_eq!(geo.pixel_size(), SurfaceSize::new(400, 200));
        assert!(!geo.smooth);
    }

    #[test]
    fn pixel_size_rounds() {
        let geo = Geometry {
            width: 100.4,
            height: 50.5,
            device_pixel_ratio: 1.5,
            ..Geometry::default()
        };
        assert_eq!(geo.pixel_size(), SurfaceSize::new(151, 76));
        assert!(geo.has_area());
        assert!(!Geometry::default().has_area());
    }

    #[test]
    fn texture_query_off_render_thread_is_none() {
        let (item, _) = counting_item(BridgeConfig::default());
        let handle = item.handle();
        assert!(handle.texture().is_none());
        assert!(!handle.is_attached());

        let driver_thread = std::thread::spawn(move || {
            let driver = item.attach(Box::new(NullBackend::new().unwrap())).unwrap();
            drop(driver);
        });
        driver_thread.join().unwrap();

        assert!(handle.is_attached());
        assert!(handle.texture().is_none());
    }

    #[tokio::test]
    async fn notify_requester_wakes_waiter() {
        let notify = Arc::new(Notify::new());
        let requester = NotifyRequester::new(notify.clone());
        requester.request_frame();

        // the stored permit completes this immediately
        tokio::time::timeout(std::time::Duration::from_secs(1), notify.notified())
            .await
            .unwrap();
    }
}
