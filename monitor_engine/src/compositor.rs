//! Per-tick driver: input, feed draining, panel composition.

use std::sync::Arc;

use anyhow::{Context, Result};
use monitor_feed::{FeedEvent, FeedReceiver, SpectrumFrame, Trigger, SILENCE_FRAMES_MAX};

use crate::background::{BackgroundKind, Backgrounds, Starfield};
use crate::brain::{render_brain, BrainConfig, BrainEngine, EffectCommand, EffectQueue};
use crate::canvas::{Canvas, BLACK};
use crate::config::MonitorConfig;
use crate::layout::{DashboardLayout, Panel, PanelId};
use crate::panels::{
    button_at, BarsPanel, ButtonAction, ButtonBar, CameraPanel, ConsolePanel, EyePanel,
    FrameContext, PanelRenderer, PanelWarnings, Slideshow, SlideshowPanel, TerminalPanel,
    WaveformPanel,
};
use crate::text::Typeface;

/// Input already translated from the windowing system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Quit,
    Escape,
    Key(char),
    Click { x: i32, y: i32 },
    /// Positive lines scroll toward older console entries.
    Wheel { lines: i32 },
}

/// What the host should do after a tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub actions: Vec<ButtonAction>,
    pub quit: bool,
}

/// Fonts, images and backdrops handed to the compositor at startup.
pub struct CompositorAssets {
    pub typeface: Typeface,
    pub terminal_typeface: Typeface,
    pub slideshow: Option<Slideshow>,
    pub backgrounds: Backgrounds,
}

impl CompositorAssets {
    /// Load everything the config points at. Missing files degrade to
    /// fallbacks with a warning.
    pub fn load(config: &MonitorConfig) -> Self {
        let typeface = Typeface::load_or_fallback(&config.resolve(&config.font_path));
        let terminal_typeface =
            Typeface::load_or_fallback(&config.resolve(&config.terminal_font_path));

        let slideshow_dir = config.resolve(&config.slideshow_dir);
        let slideshow = match Slideshow::load(&slideshow_dir) {
            Ok(slideshow) => Some(slideshow),
            Err(err) => {
                log::warn!("slideshow disabled: {err}");
                None
            }
        };

        let image_path = config.resolve(&config.background_image);
        let image = match image::open(&image_path) {
            Ok(image) => Some(image.to_rgba8()),
            Err(err) => {
                log::warn!("background image {} unavailable: {err}", image_path.display());
                None
            }
        };

        let starfield = Starfield::new(config.screen_width, config.screen_height);
        Self {
            typeface,
            terminal_typeface,
            slideshow,
            backgrounds: Backgrounds::new(config.background(), starfield).with_image(image),
        }
    }

    /// Block glyphs, no images. Used headless and in tests.
    pub fn fallback(config: &MonitorConfig) -> Self {
        let starfield = Starfield::new(config.screen_width, config.screen_height);
        Self {
            typeface: Typeface::fallback(),
            terminal_typeface: Typeface::fallback(),
            slideshow: None,
            backgrounds: Backgrounds::new(config.background(), starfield),
        }
    }
}

pub struct Compositor {
    config: MonitorConfig,
    layout: DashboardLayout,
    feed: FeedReceiver,
    typeface: Typeface,
    terminal_typeface: Typeface,
    backgrounds: Backgrounds,
    console: ConsolePanel,
    camera: CameraPanel,
    terminal: TerminalPanel,
    waveform: WaveformPanel,
    bars: BarsPanel,
    eye: EyePanel,
    slideshow: SlideshowPanel,
    buttons: ButtonBar,
    brain: Option<BrainEngine>,
    effects: Option<EffectQueue>,
    expanded: Option<PanelId>,
    brain_visible: bool,
    /// Seconds since a trigger or silence update last kept the brain shown.
    since_activity: f32,
    silence_frames: u32,
    clock: f32,
    frame: Canvas,
    warnings: PanelWarnings,
    released: bool,
}

impl Compositor {
    pub fn new(config: MonitorConfig, feed: FeedReceiver, assets: CompositorAssets) -> Result<Self> {
        Self::build(config, feed, assets, None)
    }

    /// Deterministic variant: seeds the brain and the terminal scroller.
    pub fn with_seed(
        config: MonitorConfig,
        feed: FeedReceiver,
        assets: CompositorAssets,
        seed: u64,
    ) -> Result<Self> {
        Self::build(config, feed, assets, Some(seed))
    }

    fn build(
        config: MonitorConfig,
        feed: FeedReceiver,
        assets: CompositorAssets,
        seed: Option<u64>,
    ) -> Result<Self> {
        config.validate().context("invalid monitor config")?;
        let rotation = config.rotation;
        let layout = DashboardLayout::compute(config.screen_width, config.screen_height, rotation)
            .context("computing dashboard layout")?;

        let claim = if config.use_camera {
            match feed.claim_camera() {
                Ok(claim) => Some(claim),
                Err(err) => {
                    log::warn!("camera panel without feed: {err}");
                    None
                }
            }
        } else {
            None
        };
        let camera = CameraPanel::new(claim);

        let brain = config.neural_net.then(|| {
            let brain_config = BrainConfig {
                node_count: config.brain_nodes,
                max_particles: config.max_particles,
            };
            match seed {
                Some(seed) => BrainEngine::with_seed(brain_config, seed),
                None => BrainEngine::new(brain_config),
            }
        });
        let effects = brain.as_ref().map(BrainEngine::queue);
        let terminal = match seed {
            Some(seed) => TerminalPanel::with_seed(seed),
            None => TerminalPanel::new(),
        };

        let expanded = config.maximize_console.then_some(PanelId::Console);
        let brain_visible = config.neural_net && config.neural_net_always_visible;
        log::info!(
            "compositor {}x{} rotation {} background {:?}",
            config.screen_width,
            config.screen_height,
            rotation.degrees(),
            assets.backgrounds.kind()
        );

        let compositor = Self {
            frame: Canvas::new(config.screen_width, config.screen_height),
            layout,
            feed,
            typeface: assets.typeface,
            terminal_typeface: assets.terminal_typeface,
            backgrounds: assets.backgrounds,
            console: ConsolePanel::new(),
            camera,
            terminal,
            waveform: WaveformPanel::new(),
            bars: BarsPanel::new(),
            eye: EyePanel::new(),
            slideshow: SlideshowPanel::new(assets.slideshow),
            buttons: ButtonBar::new(),
            brain,
            effects,
            expanded,
            brain_visible,
            since_activity: 0.0,
            silence_frames: 0,
            clock: 0.0,
            warnings: PanelWarnings::new(),
            released: false,
            config,
        };
        compositor.request_camera_resolution();
        Ok(compositor)
    }

    pub fn layout(&self) -> &DashboardLayout {
        &self.layout
    }

    pub fn frame(&self) -> &Canvas {
        &self.frame
    }

    pub fn expanded(&self) -> Option<PanelId> {
        self.expanded
    }

    pub fn brain_visible(&self) -> bool {
        self.brain_visible
    }

    pub fn brain(&self) -> Option<&BrainEngine> {
        self.brain.as_ref()
    }

    /// Queue for effect commands from other threads.
    pub fn effect_queue(&self) -> Option<EffectQueue> {
        self.effects.clone()
    }

    pub fn feed(&self) -> &FeedReceiver {
        &self.feed
    }

    pub fn console(&self) -> &ConsolePanel {
        &self.console
    }

    pub fn silence_frames(&self) -> u32 {
        self.silence_frames
    }

    pub fn background(&self) -> BackgroundKind {
        self.backgrounds.kind()
    }

    pub fn cycle_background(&mut self) -> BackgroundKind {
        self.backgrounds.cycle()
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    /// Recompute the layout for a new screen size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let layout = DashboardLayout::compute(width, height, self.layout.rotation())
            .with_context(|| format!("resizing to {width}x{height}"))?;
        self.layout = layout;
        self.config.screen_width = width;
        self.config.screen_height = height;
        self.frame.reset(width, height);
        self.request_camera_resolution();
        Ok(())
    }

    /// Run one frame: apply input, drain the feed, advance animation and
    /// redraw. Panel failures are logged and skipped, never returned.
    pub fn tick(&mut self, dt: f32, inputs: &[InputEvent]) -> Result<TickOutcome> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.clock += dt;
        let mut outcome = TickOutcome::default();

        for input in inputs {
            self.handle_input(*input, &mut outcome);
        }
        self.drain_feed();
        if self.feed.shutdown_requested() {
            log::info!("shutdown requested by feed");
            outcome.quit = true;
        }

        self.since_activity += dt;
        if self.brain_visible
            && !self.config.neural_net_always_visible
            && self.since_activity >= self.config.neural_visible_secs
        {
            log::debug!("brain overlay hidden after {:.1}s", self.since_activity);
            self.brain_visible = false;
        }
        if let Some(brain) = self.brain.as_mut() {
            brain.tick(dt);
        }

        self.redraw(dt);
        Ok(outcome)
    }

    fn handle_input(&mut self, input: InputEvent, outcome: &mut TickOutcome) {
        match input {
            InputEvent::Quit | InputEvent::Escape => outcome.quit = true,
            InputEvent::Key('v' | 'V') => {
                self.cycle_background();
            }
            InputEvent::Key(_) => {}
            InputEvent::Click { x, y } => self.click(x, y, outcome),
            InputEvent::Wheel { lines } => {
                let console_shown = matches!(self.expanded, None | Some(PanelId::Console));
                if console_shown && self.console.log().is_overflowing() {
                    self.console.scroll(lines);
                }
            }
        }
    }

    fn click(&mut self, x: i32, y: i32, outcome: &mut TickOutcome) {
        if let Some(panel) = self.expanded.take() {
            log::debug!("collapse {}", panel.label());
            if panel == PanelId::Camera {
                self.request_camera_resolution();
            }
            return;
        }

        let system = self.layout.panel(PanelId::System);
        if let Some(action) = button_at(system, self.layout.scale(), x, y) {
            outcome.actions.push(action);
        }

        let Some(target) = self.layout.panel_at(x, y) else {
            return;
        };
        let hidden = self.overlay_shown() && PanelId::GRID.contains(&target);
        if target.is_expandable() && !hidden {
            log::debug!("expand {}", target.label());
            self.expanded = Some(target);
            if target == PanelId::Camera {
                self.request_camera_resolution();
            }
        }
    }

    fn request_camera_resolution(&self) {
        let panel = match self.expanded {
            Some(PanelId::Camera) => self.layout.expanded(PanelId::Camera),
            _ => *self.layout.panel(PanelId::Camera),
        };
        self.camera
            .request_resolution(panel.canonical_width, panel.canonical_height);
    }

    fn drain_feed(&mut self) {
        for event in self.feed.drain() {
            match event {
                FeedEvent::Log(entry) => self.console.push(entry, &self.typeface),
                FeedEvent::Trigger(trigger) => self.fire(trigger),
                FeedEvent::SilenceProgress(frames) => {
                    self.silence_frames = frames.min(SILENCE_FRAMES_MAX);
                    if frames != 0 {
                        self.since_activity = 0.0;
                    }
                }
            }
        }
    }

    fn fire(&mut self, trigger: Trigger) {
        let Some(effects) = &self.effects else {
            return;
        };
        log::debug!("trigger {trigger:?}");
        effects.send(EffectCommand::from(trigger));
        self.since_activity = 0.0;
        if trigger == Trigger::Wake {
            self.brain_visible = true;
        }
    }

    fn overlay_shown(&self) -> bool {
        self.brain_visible && self.brain.is_some()
    }

    fn redraw(&mut self, dt: f32) {
        let spectrum: Option<Arc<SpectrumFrame>> = self.feed.latest_spectrum();
        let overlay = self.overlay_shown();
        let Self {
            layout,
            typeface,
            terminal_typeface,
            backgrounds,
            console,
            camera,
            terminal,
            waveform,
            bars,
            eye,
            slideshow,
            buttons,
            brain,
            expanded,
            silence_frames,
            clock,
            frame,
            warnings,
            config,
            ..
        } = self;

        frame.fill(BLACK);
        backgrounds.draw(frame, dt);

        let tiled = FrameContext {
            typeface,
            terminal_typeface,
            font_px: config.font_size as f32,
            scale: layout.scale(),
            clock: *clock,
            dt,
            expanded: false,
            silence_frames: *silence_frames,
            spectrum: spectrum.as_deref(),
        };

        if let Some(id) = *expanded {
            let panel = layout.expanded(id);
            let renderer: &mut dyn PanelRenderer = match id {
                PanelId::Camera => camera,
                _ => console,
            };
            let context = FrameContext {
                expanded: true,
                ..tiled
            };
            draw_panel(frame, warnings, &panel, renderer, &context);
            return;
        }

        draw_panel(frame, warnings, layout.panel(PanelId::Console), console, &tiled);
        draw_panel(frame, warnings, layout.panel(PanelId::System), buttons, &tiled);

        if overlay {
            let panel = layout.panel(PanelId::Brain);
            let mut overlay_renderer = BrainOverlay {
                bars,
                brain: brain.as_ref(),
            };
            draw_panel(frame, warnings, panel, &mut overlay_renderer, &tiled);
            return;
        }

        let grid: [(PanelId, &mut dyn PanelRenderer); 5] = [
            (PanelId::Eye, eye as &mut dyn PanelRenderer),
            (PanelId::Terminal, terminal as &mut dyn PanelRenderer),
            (PanelId::Slideshow, slideshow as &mut dyn PanelRenderer),
            (PanelId::Waveform, waveform as &mut dyn PanelRenderer),
            (PanelId::Camera, camera as &mut dyn PanelRenderer),
        ];
        for (id, renderer) in grid {
            draw_panel(frame, warnings, layout.panel(id), renderer, &tiled);
        }
    }

    /// Release the camera claim and video files. Safe to call twice.
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if self.camera.release() {
            log::info!("camera released");
        }
        self.backgrounds.release();
        if let Some(brain) = self.brain.as_mut() {
            brain.clear();
        }
        log::info!("compositor stopped after {:.1}s", self.clock);
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Bars with the 3D brain drawn over them.
struct BrainOverlay<'a> {
    bars: &'a mut BarsPanel,
    brain: Option<&'a BrainEngine>,
}

impl PanelRenderer for BrainOverlay<'_> {
    fn render(&mut self, canvas: &mut Canvas, frame: &FrameContext<'_>) -> Result<()> {
        self.bars.render(canvas, frame)?;
        if let Some(brain) = self.brain {
            render_brain(canvas, brain);
        }
        Ok(())
    }
}

/// Render `panel` upright, rotate it and blend it onto the frame.
fn draw_panel(
    frame: &mut Canvas,
    warnings: &mut PanelWarnings,
    panel: &Panel,
    renderer: &mut dyn PanelRenderer,
    context: &FrameContext<'_>,
) {
    if panel.canonical_width == 0 || panel.canonical_height == 0 {
        return;
    }
    let mut canvas = Canvas::new(panel.canonical_width, panel.canonical_height);
    match renderer.render(&mut canvas, context) {
        Ok(()) => {
            warnings.clear(panel.id);
            let rotated = canvas.rotated(panel.rotation);
            frame.blit(&rotated, panel.screen.x as i32, panel.screen.y as i32, 1.0);
        }
        Err(err) => {
            warnings.record(panel.id, &err);
        }
    }
}
