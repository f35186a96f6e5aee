//! The transport adapter boundary (spec §4.4/§6, component C7).
//!
//! The mixer speaks to whatever is downstream of it — a Discord voice
//! client, a local speaker, a file — entirely through this trait. The
//! voice socket/opus layer itself is out of scope (spec §1): this crate
//! owns only the boundary and a handful of concrete sinks useful for
//! testing and local development.

/// Accepts fixed-size PCM frames from the mixer and reports the state
/// the mixer's backpressure and ducking logic need.
///
/// Every method is non-blocking/constant-time from the mixer's point of
/// view (spec §5): the audio thread must never stall inside these
/// calls except for [`Transport::ensure_connected`]'s brief reconnect
/// pause, which is expected and budgeted for in the frame loop.
pub trait Transport: Send {
    /// Submit one frame of 48 kHz 16-bit-LE stereo interleaved PCM.
    /// Returns `false` if the frame was dropped (spec §7: transport
    /// errors drop the frame rather than panicking or blocking).
    fn queue_frame(&mut self, bytes: &[u8]) -> bool;

    /// Frames currently buffered downstream, used for backpressure
    /// (spec §4.4: skip mixing once this reaches the target depth).
    fn buffered_frames(&self) -> usize;

    /// Whether the transport is presently connected.
    fn is_connected(&self) -> bool;

    /// Attempt to (re)establish the connection. May block briefly; must
    /// never block indefinitely.
    fn ensure_connected(&mut self);

    /// Whether another participant is currently speaking, gating the
    /// speech ducker (spec §4.5).
    fn has_voice_activity(&self) -> bool;
}
