use crate::events::InputEvent;
use crate::render::backend::{
    ColorAttachment, Framebuffer, GraphicsApi, InteractorKind, RenderBackend, RenderWindow, SubRenderer, SurfaceSize,
};
use anyhow::{anyhow, Result};
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared journal of every call the null backend received.
///
/// Clones share the same journal, so a test can keep one while the backend
/// moves into a frame driver.
#[derive(Clone, Debug, Default)]
pub struct NullProbe {
    journal: Arc<Mutex<Vec<String>>>,
}

impl NullProbe {
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an entry. Scene objects can use this to journal their own release.
    pub fn record(&self, entry: impl Into<String>) {
        self.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Number of entries starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.lock().iter().filter(|e| e.starts_with(prefix)).count()
    }

    /// Index of the first entry starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.lock().iter().position(|e| e.starts_with(prefix))
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Faults the null backend can be told to produce. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct NullFaults {
    no_framebuffer: Arc<AtomicBool>,
    no_color_attachment: Arc<AtomicBool>,
    foreign_interactor: Arc<AtomicBool>,
    fail_render: Arc<AtomicBool>,
}

impl NullFaults {
    /// Render passes leave no framebuffer behind.
    pub fn set_no_framebuffer(&self, on: bool) {
        self.no_framebuffer.store(on, Ordering::SeqCst);
    }

    /// Render passes produce a framebuffer without color attachments.
    pub fn set_no_color_attachment(&self, on: bool) {
        self.no_color_attachment.store(on, Ordering::SeqCst);
    }

    /// New windows come with an interactor the bridge cannot feed.
    pub fn set_foreign_interactor(&self, on: bool) {
        self.foreign_interactor.store(on, Ordering::SeqCst);
    }

    pub fn set_fail_render(&self, on: bool) {
        self.fail_render.store(on, Ordering::SeqCst);
    }

    fn get(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }
}

/// Null backend renderer that does not perform any rendering.
pub struct NullBackend {
    api: GraphicsApi,
    renderer_count: usize,
    probe: NullProbe,
    faults: NullFaults,
    next_attachment: Arc<AtomicU64>,
}

impl NullBackend {
    /// Creates a new instance of the null backend.
    pub fn new() -> Result<Self> {
        Ok(Self {
            api: GraphicsApi::Null,
            renderer_count: 1,
            probe: NullProbe::default(),
            faults: NullFaults::default(),
            next_attachment: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Pretend to share textures through `api`.
    pub fn with_api(mut self, api: GraphicsApi) -> Self {
        self.api = api;
        self
    }

    /// Number of sub-renderers composed into each new window.
    pub fn with_renderers(mut self, count: usize) -> Self {
        self.renderer_count = count;
        self
    }

    pub fn probe(&self) -> NullProbe {
        self.probe.clone()
    }

    pub fn faults(&self) -> NullFaults {
        self.faults.clone()
    }
}

impl RenderBackend for NullBackend {
    fn name(&self) -> &str {
        "NullBackend"
    }

    fn graphics_api(&self) -> GraphicsApi {
        self.api
    }

    fn create_window(&self) -> Result<Box<dyn RenderWindow>> {
        self.probe.record("create_window");

        let renderers = (0..self.renderer_count)
            .map(|i| {
                Box::new(NullRenderer {
                    name: format!("renderer{i}"),
                    probe: self.probe.clone(),
                }) as Box<dyn SubRenderer>
            })
            .collect();

        let interactor = if NullFaults::get(&self.faults.foreign_interactor) {
            InteractorKind::Other("native-trackball".into())
        } else {
            InteractorKind::HostForwarded
        };

        Ok(Box::new(NullWindow {
            size: SurfaceSize::default(),
            multisamples: 0,
            ready: false,
            interactor,
            interactor_initialized: false,
            interactor_size: SurfaceSize::default(),
            framebuffer: None,
            renderers,
            events: Vec::new(),
            frames: 0,
            probe: self.probe.clone(),
            faults: self.faults.clone(),
            next_attachment: self.next_attachment.clone(),
        }))
    }
}

/// Offscreen window of the null backend. Keeps enough state for tests to inspect.
pub struct NullWindow {
    size: SurfaceSize,
    multisamples: u32,
    ready: bool,
    interactor: InteractorKind,
    interactor_initialized: bool,
    interactor_size: SurfaceSize,
    framebuffer: Option<Framebuffer>,
    renderers: Vec<Box<dyn SubRenderer>>,
    events: Vec<InputEvent>,
    frames: u64,
    probe: NullProbe,
    faults: NullFaults,
    next_attachment: Arc<AtomicU64>,
}

impl NullWindow {
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn multisamples(&self) -> u32 {
        self.multisamples
    }

    pub fn interactor_size(&self) -> SurfaceSize {
        self.interactor_size
    }

    pub fn interactor_initialized(&self) -> bool {
        self.interactor_initialized
    }

    /// Events the interactor received, oldest first.
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    /// Number of completed render passes.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn attachment(&self) -> ColorAttachment {
        // Keep the attachment across renders at the same size; resizes drop the framebuffer.
        if let Some(att) = self.framebuffer.as_ref().and_then(|fb| fb.color_attachments.first()) {
            return *att;
        }
        ColorAttachment {
            native_id: self.next_attachment.fetch_add(1, Ordering::SeqCst),
            size: self.size,
        }
    }
}

impl RenderWindow for NullWindow {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.probe.record(format!("set_size {size}"));
        self.size = size;
        self.framebuffer = None;
    }

    fn set_multisamples(&mut self, samples: u32) {
        self.multisamples = samples;
    }

    fn set_ready_for_rendering(&mut self, ready: bool) {
        self.ready = ready;
    }

    fn interactor_kind(&self) -> InteractorKind {
        self.interactor.clone()
    }

    fn initialize_interactor(&mut self) -> Result<()> {
        if self.interactor != InteractorKind::HostForwarded {
            return Err(anyhow!("cannot initialize a {} interactor", self.interactor));
        }
        self.probe.record("initialize_interactor");
        self.interactor_initialized = true;
        Ok(())
    }

    fn set_interactor_size(&mut self, size: SurfaceSize) {
        self.probe.record(format!("set_interactor_size {size}"));
        self.interactor_size = size;
    }

    fn process_event(&mut self, event: &InputEvent) {
        self.probe.record(format!("event {}", event.name()));
        self.events.push(event.clone());
    }

    fn process_pending_events(&mut self) {
        self.probe.record("process_pending_events");
    }

    fn render(&mut self) -> Result<()> {
        if NullFaults::get(&self.faults.fail_render) {
            self.probe.record("render failed");
            return Err(anyhow!("null render failure"));
        }

        self.probe.record(format!("render {}", self.size));
        self.frames = self.frames.wrapping_add(1);

        self.framebuffer = if NullFaults::get(&self.faults.no_framebuffer) {
            None
        } else if NullFaults::get(&self.faults.no_color_attachment) {
            Some(Framebuffer::default())
        } else {
            Some(Framebuffer {
                color_attachments: vec![self.attachment()],
            })
        };
        Ok(())
    }

    fn display_framebuffer(&self) -> Option<Framebuffer> {
        self.framebuffer.clone()
    }

    fn renderers_mut(&mut self) -> &mut [Box<dyn SubRenderer>] {
        &mut self.renderers
    }

    fn release_graphics_resources(&mut self) {
        self.probe.record("release window");
        self.framebuffer = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Sub-renderer of a [`NullWindow`]. Only records that it released its resources.
pub struct NullRenderer {
    name: String,
    probe: NullProbe,
}

impl SubRenderer for NullRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    fn release_graphics_resources(&mut self) {
        self.probe.record(format!("release {}", self.name));
    }
}
