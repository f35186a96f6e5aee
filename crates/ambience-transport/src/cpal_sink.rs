//! Local-speaker playback sink built on `cpal`, feature-gated behind
//! `cpal-sink`. Frames queued by the mixer land in a small ring buffer
//! that the device's output callback drains; this is the same
//! producer/callback split the deleted `stream.rs`/`cpal_backend.rs`
//! teacher modules used, narrowed to this crate's single [`Transport`]
//! boundary.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::{Error, Result, Transport};

/// Frames queued but not yet consumed by the output callback, beyond
/// which [`CpalSinkTransport::queue_frame`] starts dropping frames
/// instead of growing unbounded (spec §4.4's backpressure budget).
const MAX_BUFFERED_FRAMES: usize = 10;

struct Shared {
    queue: VecDeque<i16>,
}

/// Plays queued frames out the default output device.
pub struct CpalSinkTransport {
    _stream: cpal::Stream,
    shared: Arc<Mutex<Shared>>,
}

impl CpalSinkTransport {
    pub fn default_device() -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(Error::NoDevice)?;
        let config = cpal::StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(48_000),
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = Arc::new(Mutex::new(Shared {
            queue: VecDeque::new(),
        }));
        let callback_shared = Arc::clone(&shared);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [i16], _info: &cpal::OutputCallbackInfo| {
                    let mut shared = callback_shared.lock().unwrap_or_else(|e| e.into_inner());
                    for sample in data.iter_mut() {
                        *sample = shared.queue.pop_front().unwrap_or(0);
                    }
                },
                move |err| {
                    tracing::warn!(error = %err, "cpal output stream error");
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;

        Ok(Self { _stream: stream, shared })
    }

    fn buffered_frame_count(shared: &Shared) -> usize {
        shared.queue.len() / (1920 * 2)
    }
}

impl Transport for CpalSinkTransport {
    fn queue_frame(&mut self, bytes: &[u8]) -> bool {
        let mut shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        if Self::buffered_frame_count(&shared) >= MAX_BUFFERED_FRAMES {
            return false;
        }
        for chunk in bytes.chunks_exact(2) {
            shared.queue.push_back(i16::from_le_bytes([chunk[0], chunk[1]]));
        }
        true
    }

    fn buffered_frames(&self) -> usize {
        let shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        Self::buffered_frame_count(&shared)
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn ensure_connected(&mut self) {}

    fn has_voice_activity(&self) -> bool {
        false
    }
}
