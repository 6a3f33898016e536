//! Scripted producer used with `--demo`: dialogue lines, triggers and an
//! optional camera test pattern.

use std::time::{Duration, Instant};

use anyhow::Result;
use monitor_feed::{CameraFrame, FeedError, FeedHandle, SILENCE_FRAMES_MAX, Severity};

use crate::worker::Worker;

const CYCLE_SECS: f32 = 12.0;
const SILENCE_START: f32 = 0.5;
const SILENCE_STEP: f32 = 0.1;
const CAMERA_INTERVAL: f32 = 1.0 / 15.0;
const DEFAULT_CAMERA: (u32, u32) = (320, 240);

const EXCHANGES: [(&str, &str); 3] = [
    (
        "USER: what's the weather like on Mars?",
        "TARS: Cold. Minus sixty on a good day, with a chance of dust.",
    ),
    (
        "USER: set a timer for ten minutes",
        "TARS: Timer set. I will try not to count out loud.",
    ),
    (
        "USER: what were we talking about yesterday?",
        "TARS: Robots, mostly. You were losing the argument.",
    ),
];

#[derive(Debug, Clone, PartialEq)]
pub enum DemoStep {
    Log {
        source: &'static str,
        text: &'static str,
        severity: Severity,
    },
    Wake,
    Think,
    SaveMemory,
    Silence(u32),
}

impl DemoStep {
    pub fn apply(&self, feed: &FeedHandle) -> Result<(), FeedError> {
        match self {
            DemoStep::Log {
                source,
                text,
                severity,
            } => feed.push_log(*source, *text, *severity),
            DemoStep::Wake => feed.trigger_wake(),
            DemoStep::Think => feed.trigger_think(),
            DemoStep::SaveMemory => feed.trigger_save_memory(),
            DemoStep::Silence(frames) => feed.set_silence_progress(*frames),
        }
    }
}

/// One exchange as (offset seconds, step), sorted by offset.
fn exchange(index: usize) -> Vec<(f32, DemoStep)> {
    let (user, reply) = EXCHANGES[index % EXCHANGES.len()];
    let mut steps = vec![
        (
            0.0,
            DemoStep::Log {
                source: "SYSTEM",
                text: "Wake word detected",
                severity: Severity::System,
            },
        ),
        (0.0, DemoStep::Wake),
    ];
    for frame in 0..=SILENCE_FRAMES_MAX {
        steps.push((SILENCE_START + frame as f32 * SILENCE_STEP, DemoStep::Silence(frame)));
    }
    let answer_at = SILENCE_START + (SILENCE_FRAMES_MAX + 1) as f32 * SILENCE_STEP;
    steps.extend([
        (answer_at, DemoStep::Silence(0)),
        (
            answer_at,
            DemoStep::Log {
                source: "STT",
                text: user,
                severity: Severity::User,
            },
        ),
        (answer_at + 0.4, DemoStep::Think),
        (
            answer_at + 1.5,
            DemoStep::Log {
                source: "LLM",
                text: reply,
                severity: Severity::Tars,
            },
        ),
        (
            answer_at + 4.0,
            DemoStep::Log {
                source: "MEMORY",
                text: "stored exchange",
                severity: Severity::Highlight,
            },
        ),
        (answer_at + 4.0, DemoStep::SaveMemory),
        (
            answer_at + 6.0,
            DemoStep::Log {
                source: "DEBUG",
                text: "waiting for wake word",
                severity: Severity::Debug,
            },
        ),
    ]);
    steps
}

/// Time-driven dialogue script, repeating every [`CYCLE_SECS`].
#[derive(Debug, Default)]
pub struct DemoScript {
    elapsed: f32,
    exchange: usize,
    cursor: usize,
}

impl DemoScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps whose time falls within the next `dt` seconds, in order.
    pub fn advance(&mut self, dt: f32) -> Vec<DemoStep> {
        let mut due = Vec::new();
        let mut remaining = dt.max(0.0);
        loop {
            let steps = exchange(self.exchange);
            let until_cycle_end = CYCLE_SECS - self.elapsed;
            let horizon = self.elapsed + remaining.min(until_cycle_end);
            while let Some((at, step)) = steps.get(self.cursor) {
                if *at > horizon {
                    break;
                }
                due.push(step.clone());
                self.cursor += 1;
            }
            if remaining < until_cycle_end {
                self.elapsed += remaining;
                return due;
            }
            remaining -= until_cycle_end;
            self.elapsed = 0.0;
            self.cursor = 0;
            self.exchange += 1;
        }
    }
}

/// Moving diagonal gradient standing in for a camera.
pub fn test_pattern(width: u32, height: u32, phase: f32) -> Result<CameraFrame, FeedError> {
    let shift = (phase * 60.0) as u32;
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let band = ((x + y + shift) % 256) as u8;
            pixels.extend_from_slice(&[band / 3, band, 255 - band, 255]);
        }
    }
    CameraFrame::new(width, height, pixels)
}

/// Run the script on a background thread until stopped or the feed closes.
pub fn spawn(feed: FeedHandle, camera: bool) -> Result<Worker> {
    Worker::spawn("demo-producer", move |stop| {
        let mut script = DemoScript::new();
        let mut last = Instant::now();
        let mut camera_due = 0.0f32;
        let mut clock = 0.0f32;
        while stop.sleep(Duration::from_millis(20)) {
            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f32();
            last = now;
            clock += dt;
            for step in script.advance(dt) {
                if let Err(err) = step.apply(&feed) {
                    log::info!("demo producer stopping: {err}");
                    return;
                }
            }
            if camera && clock >= camera_due {
                camera_due = clock + CAMERA_INTERVAL;
                let (width, height) = feed.requested_camera_resolution().unwrap_or(DEFAULT_CAMERA);
                match test_pattern(width.max(1), height.max(1), clock) {
                    Ok(frame) => feed.publish_camera_frame(frame),
                    Err(err) => log::warn!("demo camera frame rejected: {err}"),
                }
            }
        }
    })
}

#[cfg(test)]
mod demo_tests {
    use super::*;
    use monitor_feed::{FeedEvent, Trigger, feed};

    #[test]
    fn first_cycle_wakes_then_answers() {
        let mut script = DemoScript::new();
        let opening = script.advance(0.01);
        assert_eq!(opening[1], DemoStep::Wake);
        let rest = script.advance(CYCLE_SECS - 0.1);
        let think = rest.iter().position(|step| *step == DemoStep::Think).expect("think");
        let user = rest
            .iter()
            .position(|step| matches!(step, DemoStep::Log { source: "STT", .. }))
            .expect("user line");
        let memory = rest
            .iter()
            .position(|step| *step == DemoStep::SaveMemory)
            .expect("save memory");
        assert!(user < think && think < memory);
        assert!(rest.contains(&DemoStep::Silence(SILENCE_FRAMES_MAX)));
    }

    #[test]
    fn small_and_large_steps_emit_the_same_sequence() {
        let mut fine = DemoScript::new();
        let mut coarse = DemoScript::new();
        let mut fine_steps = Vec::new();
        for _ in 0..600 {
            fine_steps.extend(fine.advance(0.05));
        }
        let coarse_steps = coarse.advance(30.0);
        assert_eq!(fine_steps.len(), coarse_steps.len());
        assert_eq!(fine_steps, coarse_steps);
        assert_eq!(
            coarse_steps.iter().filter(|step| **step == DemoStep::Wake).count(),
            3
        );
    }

    #[test]
    fn steps_reach_the_feed() {
        let (handle, receiver) = feed();
        for step in DemoScript::new().advance(4.0) {
            step.apply(&handle).expect("apply");
        }
        let events = receiver.drain();
        assert!(events.contains(&FeedEvent::Trigger(Trigger::Wake)));
        assert!(events.iter().any(|event| matches!(
            event,
            FeedEvent::Log(entry) if entry.source == "STT" && entry.severity == Severity::User
        )));
    }

    #[test]
    fn pattern_has_the_requested_size() {
        let frame = test_pattern(8, 4, 0.5).expect("frame");
        assert_eq!((frame.width(), frame.height()), (8, 4));
        assert_eq!(frame.pixels().len(), 8 * 4 * 4);
        assert!(frame.pixels().chunks_exact(4).all(|px| px[3] == 255));
    }
}
