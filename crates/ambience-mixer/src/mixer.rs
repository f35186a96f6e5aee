//! [`Mixer`]: the owned, lockable audio-thread driver (spec §4.4/§5).
//!
//! One `Mixer` is constructed once at start-up and handed out by
//! capability to the control plane (spec §9 "global mutable state").
//! Every piece of state the audio thread touches each frame lives
//! behind a single mutex, matching the reference design's "single
//! mixer mutex" concurrency model exactly: app-state snapshot, runtime
//! cache, transport, DSP chain, and RNG.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use ambience_dsp::{DspChain, DspConfig};
use ambience_model::{AppState, PlayState};
use ambience_registry::SoundFileRegistry;
use ambience_runtime::{ChanceRng, ThreadRngSource};
use ambience_transport::Transport;
use tracing::{debug, info, warn};

use crate::cache::RuntimeCache;
use crate::error::{Error, Result};
use crate::mix;

pub const SAMPLE_RATE: u32 = 48_000;
pub const CHANNELS: usize = 2;
pub const FRAME_MS: u32 = 40;
pub const CHUNK_SAMPLES: usize = (SAMPLE_RATE as u64 * FRAME_MS as u64 / 1000) as usize;
/// Target downstream buffer depth: 200 ms expressed in frames.
pub const TARGET_BUFFER_CHUNKS: usize = 200 / FRAME_MS as usize;

const OVERHEAD_SMOOTHING_ALPHA: f32 = 0.1;
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(1);
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(5);
const SLEEP_GUARD: Duration = Duration::from_millis(1);

pub(crate) struct Inner {
    pub(crate) snapshot: Option<AppState>,
    pub(crate) cache: RuntimeCache,
    pub(crate) dsp: DspChain,
    pub(crate) rng: Box<dyn ChanceRng + Send>,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) registry: Arc<SoundFileRegistry>,
    pub(crate) running: bool,
}

/// Owns the mixer loop's shared state and audio thread handle.
///
/// Cloning is intentionally not provided: a `Mixer` is a single
/// capability constructed once and shared by `Arc` at the call site
/// that needs it (the HTTP handlers, the CLI's run command).
pub struct Mixer {
    inner: Arc<Mutex<Inner>>,
    stop_requested: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Mixer {
    /// Build a mixer over `registry` (already populated — decoding never
    /// happens on the audio thread) and `transport`, using the
    /// production thread-local RNG.
    pub fn new(registry: Arc<SoundFileRegistry>, transport: Box<dyn Transport>) -> Self {
        Self::with_rng(registry, transport, Box::new(ThreadRngSource::new()))
    }

    /// Build a mixer with an injected RNG, for deterministic tests
    /// (spec §5 "Determinism").
    pub fn with_rng(
        registry: Arc<SoundFileRegistry>,
        transport: Box<dyn Transport>,
        rng: Box<dyn ChanceRng + Send>,
    ) -> Self {
        let dsp = DspChain::new(SAMPLE_RATE as f32, DspConfig::default());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                snapshot: None,
                cache: RuntimeCache::new(),
                dsp,
                rng,
                transport,
                registry,
                running: false,
            })),
            stop_requested: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().expect("mixer mutex poisoned").running
    }

    /// Ids of layers whose most recent `should_play` evaluation passed,
    /// across every environment (spec §6 `GET /api/playing-layers`).
    pub fn playing_layer_ids(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("mixer mutex poisoned");
        let Some(snapshot) = &inner.snapshot else {
            return Vec::new();
        };
        snapshot
            .environments
            .iter()
            .flat_map(|e| &e.layers)
            .filter(|l| {
                inner
                    .cache
                    .layer_runtime(&l.id)
                    .map(|rt| rt.was_playing())
                    .unwrap_or(false)
            })
            .map(|l| l.id.clone())
            .collect()
    }

    /// Diff `next` against the currently held snapshot, start or clear
    /// environment fades for every play_state transition, recover any
    /// orphaned preset reference, and publish the result (spec §4.6).
    /// Starts the audio thread if the result calls for playback and it
    /// wasn't already running.
    pub fn reconcile(&self, next: AppState) {
        let should_start = {
            let mut inner = self.inner.lock().expect("mixer mutex poisoned");
            let prev = inner.snapshot.clone();
            crate::reconcile::apply(&mut inner, prev.as_ref(), next)
        };
        if should_start {
            self.start();
        }
    }

    /// Swap in a new snapshot directly, bypassing transition/fade
    /// computation. Used for the initial snapshot at start-up, where
    /// there is no previous state to diff against.
    pub fn publish(&self, snapshot: AppState) {
        let should_start = {
            let mut inner = self.inner.lock().expect("mixer mutex poisoned");
            inner.dsp.set_filter_cutoffs(
                snapshot.effects.filters.high_pass.frequency,
                snapshot.effects.filters.low_pass.frequency,
            );
            inner.dsp.set_compressor(
                snapshot.effects.compressor.low_threshold_db,
                snapshot.effects.compressor.high_threshold_db,
                snapshot.effects.compressor.ratio,
            );
            let wants_playback = snapshot
                .environments
                .iter()
                .any(|e| e.play_state == PlayState::Playing || inner.cache.env_fade(&e.id).is_some());
            inner.snapshot = Some(snapshot);
            wants_playback && !inner.running
        };
        if should_start {
            self.start();
        }
    }

    /// Trigger a one-shot soundboard sound (spec §4.4 `play_soundboard`),
    /// starting the audio thread if it was idle. No-ops (with a warning)
    /// if no app-state snapshot has ever been published — there would be
    /// nothing to drain the runtime it would otherwise spin forever.
    pub fn play_soundboard(&self, file_id: &str) {
        let should_start = {
            let mut inner = self.inner.lock().expect("mixer mutex poisoned");
            crate::soundboard::play_soundboard(&mut inner, file_id) && !inner.running
        };
        if should_start {
            self.start();
        }
    }

    fn start(&self) {
        let mut handle_guard = self.handle.lock().expect("mixer mutex poisoned");
        if handle_guard.is_some() {
            return;
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        {
            let mut inner = self.inner.lock().expect("mixer mutex poisoned");
            inner.running = true;
        }
        let inner = Arc::clone(&self.inner);
        let stop_requested = Arc::clone(&self.stop_requested);
        let handle = std::thread::Builder::new()
            .name("ambience-mixer".into())
            .spawn(move || run_loop(&inner, &stop_requested))
            .expect("failed to spawn mixer audio thread");
        *handle_guard = Some(handle);
    }

    /// Request the audio thread stop and join it, with a 1-second
    /// timeout past which resources are abandoned (spec §5
    /// "Cancellation").
    pub fn stop(&self) -> Result<()> {
        self.stop_requested.store(true, Ordering::SeqCst);
        let handle = self.handle.lock().expect("mixer mutex poisoned").take();
        let Some(handle) = handle else {
            return Ok(());
        };
        let start = Instant::now();
        while !handle.is_finished() {
            if start.elapsed() >= STOP_JOIN_TIMEOUT {
                warn!("mixer audio thread did not stop within timeout; abandoning");
                return Err(Error::StopTimeout {
                    timeout_ms: STOP_JOIN_TIMEOUT.as_millis() as u64,
                });
            }
            std::thread::sleep(STOP_POLL_INTERVAL);
        }
        let _ = handle.join();
        Ok(())
    }
}

/// Deadline-driven pacing loop (spec §4.4 "Loop (deadline-driven)").
fn run_loop(inner: &Arc<Mutex<Inner>>, stop_requested: &Arc<AtomicBool>) {
    let frame_time = Duration::from_millis(FRAME_MS as u64);
    let mut next_frame_time = Instant::now();
    let mut overhead = Duration::ZERO;

    loop {
        if stop_requested.load(Ordering::SeqCst) {
            inner.lock().expect("mixer mutex poisoned").running = false;
            debug!("mixer audio thread stopping on request");
            return;
        }

        let now = Instant::now();
        if now < next_frame_time {
            let sleep_budget = (next_frame_time - now).saturating_sub(overhead);
            if sleep_budget > SLEEP_GUARD {
                std::thread::sleep(sleep_budget);
            }
        } else if now - next_frame_time > frame_time {
            debug!("mixer fell behind by more than one frame; skipping ahead instead of bursting");
            next_frame_time = now + frame_time;
        }

        let loop_start = Instant::now();
        let keep_running = {
            let mut guard = inner.lock().expect("mixer mutex poisoned");
            mix::run_one_frame(&mut guard)
        };
        let loop_duration = loop_start.elapsed();
        overhead = Duration::from_secs_f32(
            (1.0 - OVERHEAD_SMOOTHING_ALPHA) * overhead.as_secs_f32()
                + OVERHEAD_SMOOTHING_ALPHA * loop_duration.as_secs_f32(),
        );

        next_frame_time += frame_time;

        if !keep_running {
            inner.lock().expect("mixer mutex poisoned").running = false;
            info!("mixer audio thread exiting: no active environments or soundboard sounds");
            return;
        }
    }
}
