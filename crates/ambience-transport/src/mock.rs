//! A fully in-process [`Transport`] double for mixer tests: configurable
//! connection/voice-activity state, a bounded buffer depth, and a record
//! of every frame submitted so assertions can inspect the output stream.

use crate::Transport;
use std::collections::VecDeque;

/// Records every queued frame and lets a test script the adapter's
/// connection state, buffer depth, and voice activity frame-by-frame.
#[derive(Debug, Default)]
pub struct MockTransport {
    frames: Vec<Vec<u8>>,
    /// Frames "in flight" downstream; tests drain this to simulate the
    /// transport consuming buffered audio over time.
    buffered: VecDeque<()>,
    connected: bool,
    voice_activity: bool,
    reject_next: bool,
    ensure_connected_calls: u32,
}

impl MockTransport {
    /// A transport that starts connected, with no buffered frames and
    /// no voice activity.
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            buffered: VecDeque::new(),
            connected: true,
            voice_activity: false,
            reject_next: false,
            ensure_connected_calls: 0,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    /// All frames accepted so far, in submission order.
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn set_voice_activity(&mut self, active: bool) {
        self.voice_activity = active;
    }

    /// Make the next [`Transport::queue_frame`] call report failure
    /// without recording the frame (spec §7: transport errors drop the
    /// frame but don't reset pacing).
    pub fn reject_next_frame(&mut self) {
        self.reject_next = true;
    }

    /// Simulate the downstream buffer already holding `n` frames.
    pub fn set_buffered(&mut self, n: usize) {
        self.buffered = std::iter::repeat(()).take(n).collect();
    }

    /// Simulate the transport draining `n` buffered frames (e.g. the
    /// voice socket having sent them on).
    pub fn drain_buffered(&mut self, n: usize) {
        for _ in 0..n {
            self.buffered.pop_front();
        }
    }

    pub fn ensure_connected_calls(&self) -> u32 {
        self.ensure_connected_calls
    }
}

impl Transport for MockTransport {
    fn queue_frame(&mut self, bytes: &[u8]) -> bool {
        if self.reject_next {
            self.reject_next = false;
            return false;
        }
        self.frames.push(bytes.to_vec());
        self.buffered.push_back(());
        true
    }

    fn buffered_frames(&self) -> usize {
        self.buffered.len()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn ensure_connected(&mut self) {
        self.ensure_connected_calls += 1;
        self.connected = true;
    }

    fn has_voice_activity(&self) -> bool {
        self.voice_activity
    }
}
