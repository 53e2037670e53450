use crate::config::ConfigError;
use crate::render::backend::GraphicsApi;
use std::fmt::{Display, Formatter};

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Unsupported graphics API: {0}")]
    UnsupportedBackend(GraphicsApi),

    #[error("Render window interactor is not host-forwarded (found {0})")]
    InteractorMismatch(String),

    #[error("Render pass did not create a framebuffer")]
    FramebufferAbsent,

    #[error("Render pass did not create any color attachments on its framebuffer")]
    NoColorAttachment,

    #[error("Can only be called on the render thread")]
    WrongThread,

    #[error("Render node is not initialized")]
    NotInitialized,

    #[error("Item is already attached to a render thread")]
    AlreadyAttached,

    #[error("Command channel closed")]
    ChannelClosed,

    #[error("Cannot create render target: {0}")]
    TargetCreation(anyhow::Error),

    #[error("Scene initialization failed: {0}")]
    SceneInit(anyhow::Error),

    #[error("Render pass failed: {0}")]
    RenderFailed(anyhow::Error),

    #[error("Render loop failed: {0}")]
    RenderLoop(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Cloneable classification of a [`BridgeError`], carried by events and frame reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FaultKind {
    UnsupportedBackend,
    InteractorMismatch,
    FramebufferAbsent,
    NoColorAttachment,
    WrongThread,
    NotInitialized,
    AlreadyAttached,
    ChannelClosed,
    TargetCreation,
    SceneInit,
    RenderFailed,
    CommandFailed,
    RenderLoop,
    Config,
}

impl Display for FaultKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl BridgeError {
    pub fn kind(&self) -> FaultKind {
        match self {
            BridgeError::UnsupportedBackend(_) => FaultKind::UnsupportedBackend,
            BridgeError::InteractorMismatch(_) => FaultKind::InteractorMismatch,
            BridgeError::FramebufferAbsent => FaultKind::FramebufferAbsent,
            BridgeError::NoColorAttachment => FaultKind::NoColorAttachment,
            BridgeError::WrongThread => FaultKind::WrongThread,
            BridgeError::NotInitialized => FaultKind::NotInitialized,
            BridgeError::AlreadyAttached => FaultKind::AlreadyAttached,
            BridgeError::ChannelClosed => FaultKind::ChannelClosed,
            BridgeError::TargetCreation(_) => FaultKind::TargetCreation,
            BridgeError::SceneInit(_) => FaultKind::SceneInit,
            BridgeError::RenderFailed(_) => FaultKind::RenderFailed,
            BridgeError::RenderLoop(_) => FaultKind::RenderLoop,
            BridgeError::Config(_) => FaultKind::Config,
        }
    }
}
