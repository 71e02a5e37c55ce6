//! Voice transport and sound file implementations.
//!
//! - `loopback`: in-process transport that simulates a voice channel
//! - `sound_source`: resolves notification sounds from a directory

pub mod loopback;
pub mod sound_source;

pub use loopback::{LoopbackConfig, LoopbackTransport, LoopbackVoiceGateway, PlaybackBehavior};
pub use sound_source::DirectorySoundSource;
