mod audio;
mod cli;
mod demo;
mod display;
mod movie;
mod pacing;
mod worker;

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail, ensure};
use clap::Parser;
use image::{ColorType, ImageEncoder, codecs::png::PngEncoder};
use monitor_engine::layout::MIN_SCREEN_SIDE;
use monitor_engine::{
    ButtonHost, Compositor, CompositorAssets, InputEvent, MonitorConfig, dispatch,
};
use monitor_feed::{FeedHandle, FeedReceiver, feed};
use pollster::FutureExt;
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    keyboard::{Key, NamedKey},
    window::{Fullscreen, WindowBuilder},
};

use crate::audio::AudioCapture;
use crate::cli::Args;
use crate::demo::DemoScript;
use crate::display::{Presenter, window_to_frame};
use crate::movie::open_background_videos;
use crate::pacing::FramePacer;
use crate::worker::Worker;

/// Wheel travel in pixels that counts as one console line.
const PIXELS_PER_LINE: f64 = 20.0;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.monitor_config()?;
    log::info!(
        "screen {}x{} rotation {} background {}",
        config.screen_width,
        config.screen_height,
        config.rotation.degrees(),
        config.background_id
    );

    let (handle, receiver) = feed();
    if args.headless {
        return run_headless(&args, config, handle, receiver);
    }
    run_windowed(&args, config, handle, receiver)
}

fn load_assets(config: &MonitorConfig) -> CompositorAssets {
    let mut assets = CompositorAssets::load(config);
    let (first, second) =
        open_background_videos(config.background_videos.clone().map(|path| config.resolve(&path)));
    assets.backgrounds = assets.backgrounds.with_videos(first, second);
    assets
}

/// Simulate `--ticks` frames at the configured rate without a window.
fn run_headless(
    args: &Args,
    config: MonitorConfig,
    handle: FeedHandle,
    receiver: FeedReceiver,
) -> Result<()> {
    let dt = config.frame_interval().as_secs_f32();
    let assets = load_assets(&config);
    let mut compositor = Compositor::new(config, receiver, assets)?;
    let mut script = args.demo.then(DemoScript::new);

    let mut ticks = 0;
    while ticks < args.ticks {
        if let Some(script) = script.as_mut() {
            for step in script.advance(dt) {
                step.apply(&handle)?;
            }
        }
        let outcome = compositor.tick(dt, &[])?;
        ticks += 1;
        if outcome.quit {
            break;
        }
    }
    log::info!("headless run finished after {ticks} ticks");

    if let Some(path) = &args.dump_frame {
        let frame = compositor.frame();
        export_rgba_to_png(frame.width(), frame.height(), frame.pixels(), path)?;
        println!("Wrote {}x{} frame to {}", frame.width(), frame.height(), path.display());
    }
    compositor.shutdown();
    Ok(())
}

fn run_windowed(
    args: &Args,
    mut config: MonitorConfig,
    handle: FeedHandle,
    receiver: FeedReceiver,
) -> Result<()> {
    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let mut builder = WindowBuilder::new()
        .with_title("Agent Monitor")
        .with_inner_size(PhysicalSize::new(config.screen_width, config.screen_height));
    if config.fullscreen {
        builder = builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }
    let window = Arc::new(builder.build(&event_loop).context("creating monitor window")?);
    window.set_cursor_visible(config.show_mouse);

    let size = window.inner_size();
    if (size.width, size.height) != (config.screen_width, config.screen_height)
        && size.width >= MIN_SCREEN_SIDE
        && size.height >= MIN_SCREEN_SIDE
    {
        log::info!("window opened at {}x{}", size.width, size.height);
        config.screen_width = size.width;
        config.screen_height = size.height;
    }

    let presenter = Presenter::new(window, config.screen_width, config.screen_height).block_on()?;
    let interval = config.frame_interval();
    let use_camera = config.use_camera;
    let assets = load_assets(&config);
    let compositor = Compositor::new(config, receiver, assets)?;

    let audio = if args.no_audio {
        None
    } else {
        match AudioCapture::start(handle.clone()) {
            Ok(capture) => Some(capture),
            Err(err) => {
                log::warn!("audio capture unavailable: {err:#}");
                None
            }
        }
    };
    let demo = if args.demo {
        Some(demo::spawn(handle.clone(), use_camera)?)
    } else {
        None
    };

    let mut app = App {
        compositor,
        presenter,
        feed: handle,
        audio,
        demo,
        inputs: Vec::new(),
        cursor: (0.0, 0.0),
        pacer: FramePacer::new(interval, Instant::now()),
        running: true,
    };

    event_loop
        .run(move |event, target| match event {
            Event::WindowEvent { window_id, event }
                if window_id == app.presenter.window().id() =>
            {
                app.window_event(event, target)
            }
            Event::AboutToWait => {
                if !app.running {
                    target.exit();
                    return;
                }
                let now = Instant::now();
                if app.pacer.due(now) {
                    app.presenter.window().request_redraw();
                }
                target.set_control_flow(ControlFlow::WaitUntil(app.pacer.deadline()));
            }
            Event::LoopExiting => app.release(),
            _ => {}
        })
        .context("running monitor event loop")?;
    Ok(())
}

/// Render-thread state owned by the event loop.
struct App {
    compositor: Compositor,
    presenter: Presenter,
    feed: FeedHandle,
    audio: Option<AudioCapture>,
    demo: Option<Worker>,
    inputs: Vec<InputEvent>,
    cursor: (f64, f64),
    pacer: FramePacer,
    running: bool,
}

impl App {
    fn window_event(&mut self, event: WindowEvent, target: &EventLoopWindowTarget<()>) {
        match event {
            WindowEvent::CloseRequested => self.inputs.push(InputEvent::Quit),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match logical_key {
                Key::Named(NamedKey::Escape) => self.inputs.push(InputEvent::Escape),
                Key::Character(text) => self.inputs.extend(text.chars().map(InputEvent::Key)),
                _ => {}
            },
            WindowEvent::CursorMoved { position, .. } => self.cursor = (position.x, position.y),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                let frame = self.compositor.frame();
                let (x, y) = window_to_frame(
                    self.cursor,
                    self.presenter.size(),
                    (frame.width(), frame.height()),
                );
                self.inputs.push(InputEvent::Click { x, y });
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y.round() as i32,
                    MouseScrollDelta::PixelDelta(position) => {
                        (position.y / PIXELS_PER_LINE).round() as i32
                    }
                };
                if lines != 0 {
                    self.inputs.push(InputEvent::Wheel { lines });
                }
            }
            WindowEvent::Resized(new_size) => self.resize(new_size),
            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    log::error!("stopping after render failure: {err:#}");
                    self.running = false;
                }
                if !self.running {
                    target.exit();
                }
            }
            _ => {}
        }
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.presenter.resize(new_size);
        if new_size.width < MIN_SCREEN_SIDE || new_size.height < MIN_SCREEN_SIDE {
            return;
        }
        if let Err(err) = self.compositor.resize(new_size.width, new_size.height) {
            log::warn!("layout unchanged: {err:#}");
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let dt = self.pacer.begin_frame(Instant::now());
        let inputs = std::mem::take(&mut self.inputs);
        let outcome = self.compositor.tick(dt, &inputs)?;
        for action in outcome.actions {
            dispatch(action, self);
        }
        if outcome.quit {
            self.running = false;
        }

        let frame = self.compositor.frame();
        self.presenter
            .upload_frame(frame.width(), frame.height(), frame.pixels())?;
        match self.presenter.render() {
            Ok(()) => {}
            Err(SurfaceError::Lost) => self.presenter.resize(self.presenter.size()),
            Err(SurfaceError::OutOfMemory) => bail!("GPU out of memory"),
            Err(err) => log::warn!("render error: {err:?}"),
        }
        Ok(())
    }

    /// Stop producers and release devices. Safe to call twice.
    fn release(&mut self) {
        self.feed.request_shutdown();
        if let Some(audio) = self.audio.take() {
            audio.stop();
        }
        if let Some(mut demo) = self.demo.take() {
            demo.stop();
        }
        self.compositor.shutdown();
    }
}

impl ButtonHost for App {
    fn shutdown(&mut self) {
        log::info!("shutdown requested from the display");
        self.running = false;
    }

    fn cycle_background(&mut self) {
        self.compositor.cycle_background();
    }
}

fn export_rgba_to_png(width: u32, height: u32, data: &[u8], destination: &Path) -> Result<()> {
    let expected_len = width as usize * height as usize * 4;
    ensure!(
        data.len() == expected_len,
        "RGBA buffer size {} does not match dimensions {}x{}",
        data.len(),
        width,
        height
    );
    let file = File::create(destination)
        .with_context(|| format!("creating {}", destination.display()))?;
    let encoder = PngEncoder::new(file);
    encoder.write_image(data, width, height, ColorType::Rgba8.into())?;
    Ok(())
}
