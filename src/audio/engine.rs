//! SoundFont note renderer.
//!
//! Synthesizes scheduled notes with rustysynth and plays them through rodio.
//! The synthesizer lives behind a mutex shared with the audio thread. The
//! audio thread renders in blocks of 256 frames (about 5.8 ms) and starts or
//! ends each voice at the start of the block containing its frame, so a note
//! may sound up to one block early. The number of frames rendered so far is
//! published as the renderer clock.

use super::voicing::{slot_channels, slot_pan_value, Voicing, PAN_SLOTS};
use crate::playback::{NoteRenderer, RendererError, ScheduledNote};
use rodio::{OutputStream, OutputStreamHandle, Source};
use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sample rate for audio synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Audio buffer size for low-latency playback.
/// Smaller = lower latency but higher CPU usage.
const BUFFER_SIZE: usize = 256;

/// Length of the master volume ramp, in frames (50 ms).
const VOLUME_RAMP_FRAMES: f32 = SAMPLE_RATE as f32 * 0.05;

/// Handle to one dispatched note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceHandle(u64);

/// The synthesizer operations the audio thread needs.
trait VoiceSynth {
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, key: u8);
    fn render(&mut self, left: &mut [f32], right: &mut [f32]);
}

impl VoiceSynth for Synthesizer {
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
        Synthesizer::note_on(self, channel as i32, key as i32, velocity as i32);
    }

    fn note_off(&mut self, channel: u8, key: u8) {
        Synthesizer::note_off(self, channel as i32, key as i32);
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        Synthesizer::render(self, left, right);
    }
}

/// A dispatched note, waiting to start or currently sounding.
#[derive(Debug, Clone, Copy)]
struct Voice {
    id: u64,
    /// Stereo position; the channel is picked from it at note-on.
    slot: u8,
    pitch: u8,
    velocity: u8,
    on_frame: u64,
    off_frame: u64,
    /// Set once the voice has started.
    channel: Option<u8>,
}

/// Synthesizer plus the voices it still has to start or end.
struct SynthCore<S = Synthesizer> {
    synth: S,
    voices: Vec<Voice>,
    /// Frames rendered so far; the renderer clock.
    frame: u64,
    gain: f32,
    gain_target: f32,
    gain_step: f32,
}

impl<S: VoiceSynth> SynthCore<S> {
    fn new(synth: S, volume: f32) -> Self {
        Self {
            synth,
            voices: Vec::new(),
            frame: 0,
            gain: volume,
            gain_target: volume,
            gain_step: 0.0,
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.gain_target = volume;
        self.gain_step = (volume - self.gain) / VOLUME_RAMP_FRAMES;
    }

    /// Starts and ends voices due before the end of this block, then renders.
    fn render_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let block_end = self.frame + left.len() as u64;

        // Ends first, so a repeated pitch is released before it is struck again
        let mut index = 0;
        while index < self.voices.len() {
            let voice = self.voices[index];
            if voice.channel.is_some() && voice.off_frame < block_end {
                self.voices.swap_remove(index);
                self.release(voice);
            } else {
                index += 1;
            }
        }

        for index in 0..self.voices.len() {
            let voice = self.voices[index];
            if voice.channel.is_none() && voice.on_frame < block_end {
                let channel = self.free_channel(voice.slot, voice.pitch);
                self.voices[index].channel = Some(channel);
                self.synth.note_on(channel, voice.pitch, voice.velocity);
            }
        }

        self.synth.render(left, right);
        self.apply_gain(left, right);
        self.frame = block_end;
    }

    /// Whether a started voice other than those already removed holds this key.
    fn key_held(&self, channel: u8, pitch: u8) -> bool {
        self.voices
            .iter()
            .any(|v| v.channel == Some(channel) && v.pitch == pitch)
    }

    /// A channel of the slot on which this pitch is not sounding. When every
    /// channel already holds it, the first is shared.
    fn free_channel(&self, slot: u8, pitch: u8) -> u8 {
        let channels = slot_channels(slot);
        channels
            .iter()
            .copied()
            .find(|&channel| !self.key_held(channel, pitch))
            .unwrap_or(channels[0])
    }

    /// Sends the note-off for a voice already removed from `voices`. A
    /// note-off ends every voice on that channel and key, so it is held back
    /// while another voice still shares them.
    fn release(&mut self, voice: Voice) {
        if let Some(channel) = voice.channel {
            if !self.key_held(channel, voice.pitch) {
                self.synth.note_off(channel, voice.pitch);
            }
        }
    }

    fn apply_gain(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            if self.gain != self.gain_target {
                self.gain += self.gain_step;
                let overshot = (self.gain_step > 0.0 && self.gain > self.gain_target)
                    || (self.gain_step < 0.0 && self.gain < self.gain_target);
                if overshot || self.gain_step == 0.0 {
                    self.gain = self.gain_target;
                }
            }
            *l *= self.gain;
            *r *= self.gain;
        }
    }

    /// Ends a voice now, or drops it if it has not started. Unknown ids are
    /// ignored.
    fn stop_voice(&mut self, id: u64) {
        if let Some(index) = self.voices.iter().position(|v| v.id == id) {
            let voice = self.voices.swap_remove(index);
            self.release(voice);
        }
    }
}

/// Audio source that generates samples from the synthesizer.
/// Implements rodio's Source trait for playback.
struct SynthSource {
    core: Arc<Mutex<SynthCore>>,
    /// Shared with the renderer for lock-free clock reads.
    frames: Arc<AtomicU64>,
    left_buf: Vec<f32>,
    right_buf: Vec<f32>,
    buf_pos: usize,
    /// Current channel (0 = left, 1 = right).
    channel: usize,
}

impl SynthSource {
    fn new(core: Arc<Mutex<SynthCore>>, frames: Arc<AtomicU64>) -> Self {
        Self {
            core,
            frames,
            left_buf: vec![0.0; BUFFER_SIZE],
            right_buf: vec![0.0; BUFFER_SIZE],
            buf_pos: BUFFER_SIZE, // Start at end to trigger first render
            channel: 0,
        }
    }
}

impl Iterator for SynthSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.buf_pos >= BUFFER_SIZE {
            if let Ok(mut core) = self.core.lock() {
                core.render_block(&mut self.left_buf, &mut self.right_buf);
                self.frames.store(core.frame, Ordering::Relaxed);
            } else {
                // Only fill with silence if we can't get the lock
                self.left_buf.fill(0.0);
                self.right_buf.fill(0.0);
            }
            self.buf_pos = 0;
        }

        // Interleave stereo samples: L, R, L, R, ...
        let sample = if self.channel == 0 {
            self.left_buf[self.buf_pos]
        } else {
            self.right_buf[self.buf_pos]
        };

        self.channel = 1 - self.channel;
        if self.channel == 0 {
            self.buf_pos += 1;
        }

        Some(sample)
    }
}

impl Source for SynthSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        2 // Stereo
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite stream
    }
}

/// The open audio output. Dropping it stops the stream.
struct AudioOutput {
    core: Arc<Mutex<SynthCore>>,
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
}

/// Plays scheduled notes with a SoundFont piano.
///
/// Nothing is loaded until [`NoteRenderer::prepare`]; before that, dispatched
/// notes are accepted and silently dropped.
pub struct SynthRenderer {
    soundfont_path: Option<PathBuf>,
    output: Option<AudioOutput>,
    frames: Arc<AtomicU64>,
    next_id: u64,
    volume: f64,
}

impl SynthRenderer {
    /// Creates a renderer that will load the given SoundFont on first use.
    ///
    /// # Arguments
    ///
    /// * `soundfont_path` - Path to a .sf2 file, or None to fail on start
    /// * `volume` - Initial master volume (0.0-2.0)
    pub fn new(soundfont_path: Option<PathBuf>, volume: f64) -> Self {
        Self {
            soundfont_path,
            output: None,
            frames: Arc::new(AtomicU64::new(0)),
            next_id: 0,
            volume: volume.clamp(0.0, 2.0),
        }
    }

    pub fn soundfont_path(&self) -> Option<&Path> {
        self.soundfont_path.as_deref()
    }

    /// Whether the SoundFont is loaded and audio output is running.
    pub fn is_ready(&self) -> bool {
        self.output.is_some()
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Sets the master volume, ramped over 50 ms to avoid clicks.
    pub fn set_volume(&mut self, volume: f64) -> f64 {
        self.volume = volume.clamp(0.0, 2.0);
        if let Some(output) = &self.output {
            if let Ok(mut core) = output.core.lock() {
                core.set_volume(self.volume as f32);
            }
        }
        self.volume
    }

    /// Loads the SoundFont and builds a synthesizer with every slot channel
    /// set to the grand piano and panned to its slot.
    fn load_synthesizer(path: &Path) -> Result<Synthesizer, RendererError> {
        let mut file =
            BufReader::new(
                File::open(path).map_err(|source| RendererError::SoundFontOpen {
                    path: path.to_path_buf(),
                    source,
                })?,
            );
        let soundfont =
            Arc::new(
                SoundFont::new(&mut file).map_err(|e| RendererError::SoundFontInvalid {
                    path: path.to_path_buf(),
                    reason: format!("{:?}", e),
                })?,
            );

        let settings = SynthesizerSettings::new(SAMPLE_RATE as i32);
        let mut synth = Synthesizer::new(&soundfont, &settings)
            .map_err(|e| RendererError::Synthesizer(format!("{:?}", e)))?;

        for slot in 0..PAN_SLOTS {
            for &channel in slot_channels(slot) {
                // Program change 0: acoustic grand piano
                synth.process_midi_message(channel as i32, 0xC0, 0, 0);
                // Control change 10 is pan
                synth.process_midi_message(
                    channel as i32,
                    0xB0,
                    10,
                    slot_pan_value(slot) as i32,
                );
            }
        }
        Ok(synth)
    }
}

impl NoteRenderer for SynthRenderer {
    type Handle = VoiceHandle;

    fn prepare(&mut self) -> Result<(), RendererError> {
        if self.output.is_some() {
            return Ok(());
        }
        let path = self
            .soundfont_path
            .clone()
            .ok_or(RendererError::NoSoundFont)?;
        let synth = Self::load_synthesizer(&path)?;
        let core = Arc::new(Mutex::new(SynthCore::new(synth, self.volume as f32)));

        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| RendererError::Output(e.to_string()))?;
        self.frames.store(0, Ordering::Relaxed);
        let source = SynthSource::new(Arc::clone(&core), Arc::clone(&self.frames));
        stream_handle
            .play_raw(source)
            .map_err(|e| RendererError::Output(e.to_string()))?;

        tracing::info!("Loaded SoundFont {:?}", path);
        self.output = Some(AudioOutput {
            core,
            _stream: stream,
            _stream_handle: stream_handle,
        });
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.frames.load(Ordering::Relaxed) as f64 / SAMPLE_RATE as f64
    }

    fn dispatch(&mut self, note: ScheduledNote) -> VoiceHandle {
        let id = self.next_id;
        self.next_id += 1;

        let Some(output) = &self.output else {
            return VoiceHandle(id);
        };

        let voicing = Voicing::for_note(note.pitch, note.velocity, note.duration);
        let on_frame = (note.deadline.max(0.0) * SAMPLE_RATE as f64) as u64;
        let off_frame = on_frame + (voicing.duration * SAMPLE_RATE as f64) as u64;
        if let Ok(mut core) = output.core.lock() {
            core.voices.push(Voice {
                id,
                slot: voicing.pan_slot(),
                pitch: note.pitch,
                velocity: voicing.velocity,
                on_frame,
                off_frame,
                channel: None,
            });
        }
        VoiceHandle(id)
    }

    fn stop(&mut self, handle: VoiceHandle) {
        if let Some(output) = &self.output {
            if let Ok(mut core) = output.core.lock() {
                core.stop_voice(handle.0);
            }
        }
    }
}
