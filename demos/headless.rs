use offscreen_bridge::events::{Modifiers, MouseButton, MouseButtons, Point};
use offscreen_bridge::logging::{init_logging, LoggingConfig};
use offscreen_bridge::render::backends::null::NullBackend;
use offscreen_bridge::{
    BridgeConfig, BridgeError, BridgeEvent, InputEvent, NotifyRequester, OffscreenItem, RenderBackend, RenderLoop,
    RenderWindow, UserData,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Whatever the scene initializer builds. The bridge only hands it back to commands.
struct Scene {
    highlighted: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    init_logging(LoggingConfig::default());

    let config = BridgeConfig::builder()
        .smooth(true)
        .fps(30)
        .build()?;

    // The scene initializer runs on the render thread each time the render node is (re)created.
    let init = |window: &mut dyn RenderWindow| -> anyhow::Result<UserData> {
        println!("initializing scene in a {} window", window.size());
        Ok(UserData::new(Scene { highlighted: None }))
    };

    // Frame requests wake the render loop through this notify.
    let notify = Arc::new(Notify::new());
    let item = OffscreenItem::new(config, init, Arc::new(NotifyRequester::new(notify.clone())));
    let handle = item.handle();
    let mut event_rx = handle.subscribe_events();

    let render_loop = RenderLoop::spawn(item, notify, || {
        Ok(Box::new(NullBackend::new()?) as Box<dyn RenderBackend>)
    })?;

    // Lay out the item, then forward a click and change the scene from the UI side.
    handle.set_size(800.0, 600.0);
    handle.forward_event(InputEvent::MousePress {
        pos: Point::new(400.0, 300.0),
        button: MouseButton::Left,
        buttons: MouseButtons::LEFT,
        modifiers: Modifiers::empty(),
    });
    handle.dispatch_async(|_, data| {
        if let Some(scene) = data.downcast_mut::<Scene>() {
            scene.highlighted = Some(1);
        }
        Ok(())
    })?;

    handle.dispatch_async(|_, data| {
        if let Some(scene) = data.downcast_ref::<Scene>() {
            println!("highlighted actor: {:?}", scene.highlighted);
        }
        Ok(())
    })?;

    // Move to a high-dpi screen.
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.set_device_pixel_ratio(2.0);

    let deadline = tokio::time::sleep(Duration::from_millis(300));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Ok(ev) = event_rx.recv() => match ev {
                BridgeEvent::NodeCreated { item_id } => println!("[{item_id}] node created"),
                BridgeEvent::NodeDestroyed { item_id } => println!("[{item_id}] node destroyed"),
                BridgeEvent::TextureChanged { texture, .. } => {
                    println!("texture {} ({}) frame {}", texture.native_id, texture.size, texture.frame_id)
                }
                BridgeEvent::Fault { kind, message, .. } => println!("fault {kind}: {message}"),
            },
        }
    }

    render_loop.shutdown()?;
    println!("render loop stopped");
    Ok(())
}
