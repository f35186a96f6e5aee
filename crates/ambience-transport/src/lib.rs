//! Transport adapter boundary (component C7): the trait the mixer
//! targets for every frame it produces, plus a handful of concrete
//! sinks. The real Discord voice/opus layer lives entirely outside
//! this crate and this workspace; what's here is the seam and the
//! sinks useful for development and testing.

mod error;
mod mock;
mod transport;
mod wav_sink;

#[cfg(feature = "cpal-sink")]
mod cpal_sink;

pub use error::{Error, Result};
pub use mock::MockTransport;
pub use transport::Transport;
pub use wav_sink::WavSinkTransport;

#[cfg(feature = "cpal-sink")]
pub use cpal_sink::CpalSinkTransport;
