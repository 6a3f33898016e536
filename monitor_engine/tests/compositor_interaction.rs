use std::thread;

use anyhow::Result;
use monitor_engine::{
    dispatch, BackgroundKind, ButtonAction, ButtonHost, Compositor, CompositorAssets, InputEvent,
    MonitorConfig, PanelId, Rotation,
};
use monitor_feed::{feed, Severity};

const STEP: f32 = 1.0 / 60.0;

fn config(rotation: Rotation) -> MonitorConfig {
    MonitorConfig {
        screen_width: 320,
        screen_height: 240,
        rotation,
        background_id: 1,
        brain_nodes: 120,
        max_particles: 200,
        ..MonitorConfig::default()
    }
}

struct Host<'a> {
    compositor: &'a mut Compositor,
    running: bool,
}

impl ButtonHost for Host<'_> {
    fn shutdown(&mut self) {
        self.running = false;
    }

    fn cycle_background(&mut self) {
        self.compositor.cycle_background();
    }
}

#[test]
fn producers_and_render_loop_run_together() -> Result<()> {
    for rotation in [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270] {
        let config = config(rotation);
        let (handle, receiver) = feed();
        let assets = CompositorAssets::fallback(&config);
        let mut compositor = Compositor::with_seed(config, receiver, assets, 21)?;

        let producer = {
            let handle = handle.clone();
            thread::spawn(move || {
                for index in 0..40 {
                    let _ = handle.push_log("LLM", format!("reply {index}"), Severity::Tars);
                    handle.publish_spectrum(vec![(index % 7) as f32; 512], 22_500);
                }
                let _ = handle.trigger_wake();
                let _ = handle.trigger_save_memory();
            })
        };
        producer.join().expect("producer thread");

        for _ in 0..120 {
            compositor.tick(STEP, &[])?;
        }
        assert!(compositor.brain_visible(), "rotation {rotation:?}");
        assert_eq!(compositor.console().log().entry_count(), 40);
        assert!(compositor.console().log().is_overflowing());
        let frame = compositor.frame();
        assert_eq!((frame.width(), frame.height()), (320, 240));
        compositor.shutdown();
    }
    Ok(())
}

#[test]
fn wheel_scrolls_the_expanded_console() -> Result<()> {
    let config = MonitorConfig {
        maximize_console: true,
        ..config(Rotation::Deg0)
    };
    let (handle, receiver) = feed();
    let assets = CompositorAssets::fallback(&config);
    let mut compositor = Compositor::with_seed(config, receiver, assets, 2)?;
    for index in 0..60 {
        handle.push_log("SYS", format!("line {index}"), Severity::System)?;
    }
    compositor.tick(STEP, &[])?;
    let bottom = compositor.console().log().scroll_offset();
    assert!(bottom > 0);

    compositor.tick(STEP, &[InputEvent::Wheel { lines: 3 }])?;
    assert_eq!(compositor.console().log().scroll_offset(), bottom - 3);

    handle.push_log("SYS", "late", Severity::System)?;
    compositor.tick(STEP, &[])?;
    assert_eq!(compositor.console().log().scroll_offset(), bottom - 3);

    compositor.tick(STEP, &[InputEvent::Wheel { lines: -100 }])?;
    let log = compositor.console().log();
    assert_eq!(log.scroll_offset(), log.max_offset());
    Ok(())
}

#[test]
fn button_actions_dispatch_through_the_host() -> Result<()> {
    let config = config(Rotation::Deg180);
    let (_handle, receiver) = feed();
    let assets = CompositorAssets::fallback(&config);
    let mut compositor = Compositor::with_seed(config, receiver, assets, 4)?;

    let system = *compositor.layout().panel(PanelId::System);
    let rects = monitor_engine::panels::button_rects(&system, compositor.layout().scale());
    let (action, rect) = rects[1];
    assert_eq!(action, ButtonAction::CycleBackground);
    let click = InputEvent::Click {
        x: (rect.x + rect.width / 2) as i32,
        y: (rect.y + rect.height / 2) as i32,
    };

    let outcome = compositor.tick(STEP, &[click])?;
    let mut host = Host {
        compositor: &mut compositor,
        running: true,
    };
    for action in outcome.actions {
        dispatch(action, &mut host);
    }
    dispatch(ButtonAction::Shutdown, &mut host);
    assert!(!host.running);
    assert_eq!(compositor.background(), BackgroundKind::Image);
    Ok(())
}
