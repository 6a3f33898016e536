//! Display and animation engine for the agent status monitor.
//!
//! Everything here runs on the CPU and draws into a [`canvas::Canvas`]; the
//! viewer binary uploads the finished frame to the GPU. The [`Compositor`]
//! ties the pieces together once per tick.

pub mod background;
pub mod brain;
pub mod canvas;
pub mod compositor;
pub mod config;
pub mod console;
pub mod error;
pub mod layout;
pub mod panels;
pub mod spectrum;
pub mod text;

pub use background::{BackgroundKind, Backgrounds, FrameSource, Starfield};
pub use brain::{BrainConfig, BrainEngine, EffectCommand, EffectQueue};
pub use canvas::Canvas;
pub use compositor::{Compositor, CompositorAssets, InputEvent, TickOutcome};
pub use config::{load_config, MonitorConfig};
pub use console::{ConsoleLine, ConsoleLog};
pub use error::EngineError;
pub use layout::{DashboardLayout, Panel, PanelId, PanelRect, Rotation};
pub use panels::{dispatch, ButtonAction, ButtonHost};
pub use spectrum::SpectrumAnalyzer;
pub use text::Typeface;
