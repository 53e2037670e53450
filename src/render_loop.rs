//! Dedicated render thread for hosts that do not bring their own.
//!
//! The loop owns the [`FrameDriver`] and runs a frame sync whenever the item
//! requests one through its [`NotifyRequester`](crate::item::NotifyRequester),
//! and optionally at a fixed rate when the item is configured as continuous.

use crate::errors::BridgeError;
use crate::item::OffscreenItem;
use crate::render::backend::RenderBackend;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub struct RenderLoop;

impl RenderLoop {
    /// Start a render thread for `item`.
    ///
    /// `notify` must be the one the item's frame requester signals.
    /// `make_backend` runs on the new thread, so backends that are tied to
    /// their creating thread work as well.
    pub fn spawn<B>(item: OffscreenItem, notify: Arc<Notify>, make_backend: B) -> Result<RenderLoopHandle, BridgeError>
    where
        B: FnOnce() -> anyhow::Result<Box<dyn RenderBackend>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let name = format!("render-{}", item.id());

        let join = std::thread::Builder::new()
            .name(name)
            .spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                    .map_err(|e| BridgeError::RenderLoop(e.to_string()))?;
                rt.block_on(run(item, notify, make_backend, token))
            })
            .map_err(|e| BridgeError::RenderLoop(e.to_string()))?;

        Ok(RenderLoopHandle {
            cancel,
            join: Some(join),
        })
    }
}

async fn run<B>(item: OffscreenItem, notify: Arc<Notify>, make_backend: B, cancel: CancellationToken) -> Result<(), BridgeError>
where
    B: FnOnce() -> anyhow::Result<Box<dyn RenderBackend>>,
{
    let backend = make_backend().map_err(|e| {
        log::warn!("cannot create render backend: {e:#}");
        BridgeError::TargetCreation(e)
    })?;
    let mut driver = item.attach(backend)?;

    let mut ticker = if driver.config().continuous {
        let mut interval = tokio::time::interval(frame_period(driver.config().fps));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Some(interval)
    } else {
        None
    };

    log::debug!("render loop for item {} started", driver.item_id());
    driver.update_paint_node();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = notify.notified() => {
                driver.update_paint_node();
            }
            _ = tick(&mut ticker) => {
                driver.request_render();
                driver.update_paint_node();
            }
        }
    }

    driver.release_resources();
    log::debug!("render loop for item {} stopped", driver.item_id());
    Ok(())
}

/// Time between continuous frames. Never zero, whatever `fps` says.
fn frame_period(fps: u16) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(fps.max(1)))
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Owner of a running render loop. Dropping it stops the loop.
pub struct RenderLoopHandle {
    cancel: CancellationToken,
    join: Option<JoinHandle<Result<(), BridgeError>>>,
}

impl RenderLoopHandle {
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the loop, release the render node and wait for the thread to exit.
    pub fn shutdown(mut self) -> Result<(), BridgeError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), BridgeError> {
        self.cancel.cancel();
        match self.join.take() {
            Some(join) => join
                .join()
                .map_err(|_| BridgeError::RenderLoop("render thread panicked".into()))?,
            None => Ok(()),
        }
    }
}

impl Drop for RenderLoopHandle {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("render loop ended with error: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::events::BridgeEvent;
    use crate::item::{ItemHandle, NotifyRequester};
    use crate::render::backend::RenderWindow;
    use crate::render::backends::null::NullBackend;
    use crate::render::user_data::UserData;
    use tokio::sync::broadcast::{error::RecvError, Receiver};
    use tokio::sync::oneshot;

    fn item(config: BridgeConfig) -> (OffscreenItem, ItemHandle, Arc<Notify>) {
        let notify = Arc::new(Notify::new());
        let init = |_: &mut dyn RenderWindow| -> anyhow::Result<UserData> { Ok(UserData::empty()) };
        let item = OffscreenItem::new(config, init, Arc::new(NotifyRequester::new(notify.clone())));
        let handle = item.handle();
        (item, handle, notify)
    }

    fn null_backend() -> anyhow::Result<Box<dyn RenderBackend>> {
        Ok(Box::new(NullBackend::new()?))
    }

    async fn wait_for(rx: &mut Receiver<BridgeEvent>, pred: impl Fn(&BridgeEvent) -> bool) -> BridgeEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Ok(ev) if pred(&ev) => return ev,
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => panic!("event channel closed"),
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn renders_when_requested() {
        let (item, handle, notify) = item(BridgeConfig::default());
        let mut rx = handle.subscribe_events();
        let lp = RenderLoop::spawn(item, notify, null_backend).unwrap();

        handle.set_size(40.0, 30.0);
        let ev = wait_for(&mut rx, |e| matches!(e, BridgeEvent::TextureChanged { .. })).await;
        match ev {
            BridgeEvent::TextureChanged { texture, .. } => assert_eq!(texture.size.width, 40),
            _ => unreachable!(),
        }
        assert!(handle.is_attached());

        lp.shutdown().unwrap();
        wait_for(&mut rx, |e| matches!(e, BridgeEvent::NodeDestroyed { .. })).await;
    }

    #[tokio::test]
    async fn commands_run_on_render_thread() {
        let (item, handle, notify) = item(BridgeConfig::default());
        let lp = RenderLoop::spawn(item, notify, null_backend).unwrap();
        handle.set_size(8.0, 8.0);

        let (tx, rx) = oneshot::channel();
        handle
            .dispatch_async(move |_, _| {
                let _ = tx.send(std::thread::current().name().map(str::to_owned));
                Ok(())
            })
            .unwrap();

        let name = tokio::time::timeout(Duration::from_secs(5), rx).await.unwrap().unwrap();
        assert_eq!(name, Some(format!("render-{}", handle.id())));

        lp.shutdown().unwrap();
    }

    #[tokio::test]
    async fn continuous_mode_keeps_rendering() {
        let config = BridgeConfig::builder().continuous(true).fps(200).build().unwrap();
        let (item, handle, notify) = item(config);
        let mut rx = handle.subscribe_events();
        handle.set_size(4.0, 4.0);
        let lp = RenderLoop::spawn(item, notify, null_backend).unwrap();

        let mut frames = Vec::new();
        for _ in 0..3 {
            let ev = wait_for(&mut rx, |e| matches!(e, BridgeEvent::TextureChanged { .. })).await;
            if let BridgeEvent::TextureChanged { texture, .. } = ev {
                frames.push(texture.frame_id);
            }
        }
        assert!(frames.windows(2).all(|w| w[0] < w[1]));

        lp.shutdown().unwrap();
    }

    #[test]
    fn frame_period_is_never_zero() {
        assert_eq!(frame_period(60), Duration::from_micros(16_666));
        assert_eq!(frame_period(2000), Duration::from_micros(500));
        assert!(frame_period(u16::MAX) > Duration::ZERO);
    }

    #[tokio::test]
    async fn high_fps_continuous_loop_runs_and_stops() {
        let config = BridgeConfig::builder().continuous(true).fps(2000).build().unwrap();
        let (item, handle, notify) = item(config);
        let mut rx = handle.subscribe_events();
        handle.set_size(4.0, 4.0);
        let lp = RenderLoop::spawn(item, notify, null_backend).unwrap();

        wait_for(&mut rx, |e| matches!(e, BridgeEvent::TextureChanged { .. })).await;
        assert!(!lp.is_finished());
        lp.shutdown().unwrap();
    }

    #[tokio::test]
    async fn shutdown_closes_the_queue() {
        let (item, handle, notify) = item(BridgeConfig::default());
        let lp = RenderLoop::spawn(item, notify, null_backend).unwrap();
        lp.shutdown().unwrap();

        assert!(matches!(handle.dispatch_async(|_, _| Ok(())), Err(BridgeError::ChannelClosed)));
    }

    #[test]
    fn backend_failure_ends_the_loop() {
        let (item, _handle, notify) = item(BridgeConfig::default());
        let lp = RenderLoop::spawn(item, notify, || anyhow::bail!("no gpu")).unwrap();
        assert!(matches!(lp.shutdown(), Err(BridgeError::TargetCreation(_))));
    }
}
