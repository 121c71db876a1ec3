//! Audio rendering for scheduled notes.
//!
//! This module provides the SoundFont-backed [`SynthRenderer`], using
//! rustysynth for synthesis and rodio for audio output, along with the
//! per-pitch voicing that shapes each note's loudness, length and pan.

pub mod engine;
pub mod voicing;

pub use engine::{SynthRenderer, VoiceHandle, SAMPLE_RATE};
pub use voicing::Voicing;
