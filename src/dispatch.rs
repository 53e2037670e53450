//! Deferred command queue.
//!
//! Producers append [`PendingCommand`]s through a [`CommandSender`] from any
//! thread. The render thread owns the [`CommandQueue`] and drains it right
//! before a render pass, handing every command the current render window and
//! user data.
//!
//! A drain only runs the commands that were queued when it started. Anything
//! enqueued while the drain runs (including by the commands themselves) waits
//! for the next drain.

use crate::errors::BridgeError;
use crate::render::backend::RenderWindow;
use crate::render::user_data::UserData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

type CommandFn = dyn FnOnce(&mut dyn RenderWindow, &mut UserData) -> anyhow::Result<()> + Send + 'static;

/// A unit of deferred work: a captured snapshot plus the function applying it to renderer state.
pub struct PendingCommand {
    label: &'static str,
    func: Box<CommandFn>,
}

impl PendingCommand {
    pub fn new<F>(func: F) -> Self
    where
        F: FnOnce(&mut dyn RenderWindow, &mut UserData) -> anyhow::Result<()> + Send + 'static,
    {
        Self::labeled("command", func)
    }

    /// Like [`PendingCommand::new`], with a label that shows up in logs.
    pub fn labeled<F>(label: &'static str, func: F) -> Self
    where
        F: FnOnce(&mut dyn RenderWindow, &mut UserData) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            label,
            func: Box::new(func),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    fn execute(self, window: &mut dyn RenderWindow, user_data: &mut UserData) -> anyhow::Result<()> {
        (self.func)(window, user_data)
    }
}

impl std::fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCommand")
            .field("label", &self.label)
            .finish()
    }
}

/// Outcome of one drain.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DrainReport {
    pub executed: usize,
    pub failed: usize,
}

impl DrainReport {
    /// Number of commands taken off the queue.
    pub fn attempted(&self) -> usize {
        self.executed + self.failed
    }
}

/// Producer side of the queue. Cheap to clone, usable from any thread.
#[derive(Clone, Debug)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<PendingCommand>,
    pending: Arc<AtomicUsize>,
}

impl CommandSender {
    /// Append a command at the tail. Never blocks.
    pub fn send(&self, command: PendingCommand) -> Result<(), BridgeError> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.tx.send(command).map_err(|e| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            log::debug!("dropping command '{}': render side is gone", e.0.label);
            BridgeError::ChannelClosed
        })
    }

    /// Commands queued and not yet taken by a drain.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Render side of the queue.
#[derive(Debug)]
pub struct CommandQueue {
    rx: mpsc::UnboundedReceiver<PendingCommand>,
    pending: Arc<AtomicUsize>,
}

/// Creates a connected sender/queue pair.
pub fn channel() -> (CommandSender, CommandQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    (
        CommandSender {
            tx,
            pending: pending.clone(),
        },
        CommandQueue { rx, pending },
    )
}

impl CommandQueue {
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    fn take(&mut self) -> Option<PendingCommand> {
        let command = self.rx.try_recv().ok()?;
        self.pending.fetch_sub(1, Ordering::SeqCst);
        Some(command)
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Execute every command queued as of now, in FIFO order, each exactly once.
    ///
    /// A command returning an error is logged and skipped; the rest still run.
    /// A panicking command unwinds out of the drain, leaving the commands
    /// behind it queued in order.
    pub fn drain_and_execute(&mut self, window: &mut dyn RenderWindow, user_data: &mut UserData) -> DrainReport {
        let pending = self.rx.len();
        let mut report = DrainReport::default();

        for _ in 0..pending {
            let Some(command) = self.take() else {
                break;
            };

            let label = command.label();
            log::trace!("executing deferred {label}");
            match command.execute(window, user_data) {
                Ok(()) => report.executed += 1,
                Err(e) => {
                    log::warn!("deferred {label} failed, skipping: {e:#}");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Drop every queued command without running it. Returns how many were dropped.
    pub fn discard(&mut self) -> usize {
        let mut dropped = 0;
        while self.take().is_some() {
            dropped += 1;
        }
        dropped
    }
}
