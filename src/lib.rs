//! Bridges an external renderer's offscreen render target into a host UI scene graph.
//!
//! The producer (UI/event) thread talks to an [`ItemHandle`]: it defers
//! commands, forwards input and updates geometry. The render thread owns the
//! matching [`FrameDriver`], which lazily creates the render target, drains
//! the deferred commands once per frame, renders at most once and publishes
//! the resulting texture.

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod frame;
pub mod item;
pub mod logging;
pub mod render;
pub mod render_loop;
pub mod thread;

pub use config::BridgeConfig;
pub use dispatch::{CommandQueue, CommandSender, DrainReport, PendingCommand};
pub use errors::{BridgeError, FaultKind};
pub use events::{BridgeEvent, InputEvent};
pub use frame::{FrameDriver, FrameReport, FrameStatus};
pub use item::{FrameRequester, Geometry, ItemHandle, ItemId, NotifyRequester, OffscreenItem};
pub use render::backend::{RenderBackend, RenderWindow, SceneInitializer, SurfaceSize};
pub use render::{TextureHandle, TextureNode, UserData};
pub use render_loop::{RenderLoop, RenderLoopHandle};
