//! Microphone capture feeding the spectrum panels.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use monitor_engine::SpectrumAnalyzer;
use monitor_engine::spectrum::{CHUNK_FRAMES, SAMPLE_RATE};
use monitor_feed::FeedHandle;

use crate::worker::{StopFlag, Worker};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const CALLBACK_QUEUE: usize = 16;

/// Collects interleaved callback buffers into fixed-size mono chunks.
pub struct ChunkAssembler {
    channels: usize,
    chunk_frames: usize,
    pending: Vec<f32>,
}

impl ChunkAssembler {
    pub fn new(channels: usize, chunk_frames: usize) -> Self {
        Self {
            channels: channels.max(1),
            chunk_frames: chunk_frames.max(1),
            pending: Vec::new(),
        }
    }

    /// Append interleaved samples and return every completed mono chunk.
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<Vec<f32>> {
        self.pending.extend_from_slice(interleaved);
        let chunk_len = self.chunk_frames * self.channels;
        let mut chunks = Vec::new();
        while self.pending.len() >= chunk_len {
            let chunk: Vec<f32> = self.pending.drain(..chunk_len).collect();
            chunks.push(SpectrumAnalyzer::downmix(&chunk, self.channels));
        }
        chunks
    }

    pub fn pending_frames(&self) -> usize {
        self.pending.len() / self.channels
    }
}

/// The capture thread. Dropping it stops the stream.
pub struct AudioCapture {
    worker: Worker,
}

impl AudioCapture {
    pub fn start(feed: FeedHandle) -> Result<Self> {
        let worker = Worker::spawn("audio-capture", move |stop| {
            if let Err(err) = capture(&feed, &stop) {
                log::warn!("audio capture stopped: {err:#}");
            }
            feed.clear_spectrum();
        })?;
        Ok(Self { worker })
    }

    pub fn stop(mut self) -> bool {
        self.worker.stop()
    }
}

fn capture(feed: &FeedHandle, stop: &StopFlag) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no audio input device found"))?;
    let supported = input_config(&device)?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0;
    log::info!(
        "audio capture from {} at {sample_rate} Hz, {channels} channel(s), {sample_format:?}",
        device.name().unwrap_or_else(|_| "unknown device".into())
    );

    let (tx, rx) = mpsc::sync_channel::<Vec<f32>>(CALLBACK_QUEUE);
    let failed = Arc::new(AtomicBool::new(false));
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream(&device, &config, tx, failed.clone(), |s: f32| s)?,
        cpal::SampleFormat::I16 => build_stream(&device, &config, tx, failed.clone(), |s: i16| {
            s as f32 / 32_768.0
        })?,
        cpal::SampleFormat::U16 => build_stream(&device, &config, tx, failed.clone(), |s: u16| {
            (s as f32 - 32_768.0) / 32_768.0
        })?,
        other => bail!("unsupported sample format {other:?}"),
    };
    stream.play().context("starting audio stream")?;

    let mut assembler = ChunkAssembler::new(channels, CHUNK_FRAMES);
    let mut analyzer = SpectrumAnalyzer::new(CHUNK_FRAMES);
    while !stop.is_set() {
        if failed.load(Ordering::Acquire) {
            bail!("audio stream reported an error");
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(samples) => {
                for chunk in assembler.push(&samples) {
                    feed.publish_spectrum(analyzer.analyze(&chunk), sample_rate);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => bail!("audio stream closed"),
        }
    }
    log::info!("audio capture released");
    Ok(())
}

/// Prefer a config that can run at the requested rate; otherwise take the
/// device default.
fn input_config(device: &cpal::Device) -> Result<cpal::SupportedStreamConfig> {
    let wanted = cpal::SampleRate(SAMPLE_RATE);
    if let Ok(ranges) = device.supported_input_configs() {
        for range in ranges {
            if range.min_sample_rate() <= wanted && wanted <= range.max_sample_rate() {
                return Ok(range.with_sample_rate(wanted));
            }
        }
    }
    device
        .default_input_config()
        .context("querying default input config")
}

fn build_stream<T, F>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    tx: SyncSender<Vec<f32>>,
    failed: Arc<AtomicBool>,
    convert: F,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample,
    F: Fn(T) -> f32 + Send + 'static,
{
    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples = data.iter().copied().map(&convert).collect();
                // Full queue: the analysis thread is behind, drop this buffer.
                let _ = tx.try_send(samples);
            },
            move |err| {
                log::warn!("audio stream error: {err}");
                failed.store(true, Ordering::Release);
            },
            None,
        )
        .context("building audio input stream")?;
    Ok(stream)
}
