//! Playback session: one timeline, one clock, one dispatch cursor.

use super::clock::{PlaybackClock, PlaybackState};
use super::renderer::{NoteRenderer, RendererError, VisualSink};
use super::scheduler::{Scheduler, SchedulerSettings};
use super::ticker::Ticker;
use super::time::{MonotonicClock, TimeSource};
use super::voices::VoiceRegistry;
use crate::config::PlayerConfig;
use crate::midi::Timeline;
use thiserror::Error;

/// Errors reported by [`PlaybackSession::start`].
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The renderer could not be brought up. Not retried automatically;
    /// calling `start()` again retries.
    #[error("audio engine unavailable: {0}")]
    EngineUnavailable(#[source] RendererError),
}

/// What a call to [`PlaybackSession::start`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyPlaying,
    /// The timeline has no notes; nothing changed.
    NothingToPlay,
}

/// Which periodic callbacks ran during a [`PlaybackSession::poll`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollResult {
    /// Notes dispatched by the scheduler tick, if it ran.
    pub dispatched: Option<usize>,
    /// Whether the visual tick ran.
    pub frame: bool,
    /// Whether playback stopped on its own at the end of the song.
    pub finished: bool,
}

/// All mutable state of a playback, owned in one place.
///
/// The session drives two periodic callbacks through [`Ticker`]s: the
/// scheduler tick and the visual tick. Both are armed on start and cancelled
/// on pause and stop, and both check the clock state before doing anything.
pub struct PlaybackSession<R: NoteRenderer, T: TimeSource = MonotonicClock> {
    timeline: Timeline,
    clock: PlaybackClock,
    scheduler: Scheduler,
    voices: VoiceRegistry<R::Handle>,
    renderer: R,
    time: T,
    renderer_ready: bool,
    scheduler_ticker: Ticker,
    frame_ticker: Ticker,
    end_grace: f64,
    min_speed: f64,
    max_speed: f64,
}

impl<R: NoteRenderer, T: TimeSource> PlaybackSession<R, T> {
    /// Creates a stopped session.
    ///
    /// # Arguments
    ///
    /// * `timeline` - The song to play (may be empty)
    /// * `renderer` - Note renderer, prepared lazily on the first start
    /// * `time` - Wall-clock source
    /// * `config` - Scheduler and ticker settings
    pub fn new(timeline: Timeline, renderer: R, time: T, config: &PlayerConfig) -> Self {
        Self {
            timeline,
            clock: PlaybackClock::new(config.clamp_speed(config.speed)),
            scheduler: Scheduler::new(SchedulerSettings::from(config)),
            voices: VoiceRegistry::new(),
            renderer,
            time,
            renderer_ready: false,
            scheduler_ticker: Ticker::new(config.scheduler_interval_seconds()),
            frame_ticker: Ticker::new(config.frame_interval_seconds()),
            end_grace: config.end_grace_seconds,
            min_speed: config.min_speed,
            max_speed: config.max_speed,
        }
    }

    /// Read-only snapshot of the song for visual consumers.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    /// Current song time in seconds.
    pub fn song_time(&self) -> f64 {
        self.clock.song_time(self.time.now())
    }

    /// Index of the next note the scheduler will dispatch.
    pub fn next_index(&self) -> usize {
        self.scheduler.next_index()
    }

    /// Number of voices dispatched since the last pause or stop.
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Replaces the timeline, stopping playback and resetting the clock.
    pub fn load(&mut self, timeline: Timeline) {
        self.stop();
        self.timeline = timeline;
        self.clock = PlaybackClock::new(self.clock.speed());
        self.scheduler.reset();
    }

    /// Starts playback, or resumes from the pause offset.
    ///
    /// On an empty timeline this is a no-op. The renderer is prepared before
    /// the first start; if that fails the session stays where it was.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::EngineUnavailable`] if the renderer cannot be
    /// prepared.
    pub fn start(&mut self) -> Result<StartOutcome, PlaybackError> {
        if self.clock.is_playing() {
            return Ok(StartOutcome::AlreadyPlaying);
        }
        if self.timeline.is_empty() {
            tracing::warn!("Nothing to play: timeline has no notes");
            return Ok(StartOutcome::NothingToPlay);
        }

        if !self.renderer_ready {
            self.renderer.prepare().map_err(|e| {
                tracing::error!("Renderer failed to start: {}", e);
                PlaybackError::EngineUnavailable(e)
            })?;
            self.renderer_ready = true;
        }

        let wall_now = self.time.now();
        self.clock.start(wall_now, self.renderer.current_time());
        self.scheduler
            .seek(&self.timeline, self.clock.pause_offset());
        self.scheduler_ticker.arm(wall_now);
        self.frame_ticker.arm(wall_now);
        tracing::info!(
            from = self.clock.pause_offset(),
            speed = self.clock.speed(),
            next_index = self.scheduler.next_index(),
            "Playback started"
        );

        self.scheduler_tick();
        Ok(StartOutcome::Started)
    }

    /// Pauses at the current song time. Only valid while playing.
    ///
    /// Returns false if the session was not playing.
    pub fn pause(&mut self) -> bool {
        if !self.clock.pause(self.time.now()) {
            return false;
        }
        self.halt();
        tracing::info!(at = self.clock.pause_offset(), "Playback paused");
        true
    }

    /// Stops playback and rewinds to the start. Valid from any state.
    pub fn stop(&mut self) {
        self.clock.stop();
        self.scheduler.reset();
        self.halt();
        tracing::debug!("Playback stopped");
    }

    /// Stops and immediately starts again from the beginning.
    pub fn restart(&mut self) -> Result<StartOutcome, PlaybackError> {
        self.stop();
        self.start()
    }

    /// Cancels both periodic callbacks and silences every dispatched voice.
    fn halt(&mut self) {
        self.scheduler_ticker.cancel();
        self.frame_ticker.cancel();
        let stopped = self.voices.stop_all(&mut self.renderer);
        if stopped > 0 {
            tracing::debug!(stopped, "Silenced dispatched voices");
        }
    }

    /// Moves to `seconds`, clamped to the song.
    ///
    /// While playing, sounding voices are silenced and playback continues
    /// from the target. Otherwise the target becomes the resume point.
    pub fn seek(&mut self, seconds: f64) {
        let target = seconds.clamp(0.0, self.timeline.total_duration());
        let playing = self.clock.is_playing();
        if playing {
            self.voices.stop_all(&mut self.renderer);
        }
        self.clock
            .seek(target, self.time.now(), self.renderer.current_time());
        self.scheduler.seek(&self.timeline, target);
        tracing::debug!(target, next_index = self.scheduler.next_index(), "Seek");
        if playing {
            self.scheduler_tick();
        }
    }

    /// Sets the speed multiplier, clamped to the configured range.
    ///
    /// Takes effect from the next scheduler tick; notes already handed to the
    /// renderer keep their deadlines. Returns the speed actually applied.
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        let speed = speed.clamp(self.min_speed, self.max_speed);
        self.clock
            .set_speed(speed, self.time.now(), self.renderer.current_time());
        speed
    }

    /// Runs one scheduler tick. A no-op unless playing.
    pub fn scheduler_tick(&mut self) -> usize {
        if !self.clock.is_playing() {
            return 0;
        }
        self.scheduler.tick(
            &self.timeline,
            &self.clock,
            self.time.now(),
            &mut self.renderer,
            &mut self.voices,
        )
    }

    /// Runs one visual tick: pushes the song time to the sink and stops once
    /// the song is over. A no-op unless playing.
    ///
    /// Returns true if this tick ended playback.
    pub fn visual_tick<S: VisualSink + ?Sized>(&mut self, sink: &mut S) -> bool {
        if !self.clock.is_playing() {
            return false;
        }
        let now = self.song_time();
        sink.song_time(now);

        if self.scheduler.is_finished(&self.timeline)
            && now > self.timeline.total_duration() + self.end_grace
        {
            tracing::info!("Reached end of song");
            self.stop();
            sink.song_time(self.song_time());
            return true;
        }
        false
    }

    /// Fires whichever periodic callbacks are due.
    pub fn poll<S: VisualSink + ?Sized>(&mut self, sink: &mut S) -> PollResult {
        let mut result = PollResult::default();
        let now = self.time.now();
        if self.scheduler_ticker.fire(now) {
            result.dispatched = Some(self.scheduler_tick());
        }
        if self.frame_ticker.fire(now) {
            result.frame = true;
            result.finished = self.visual_tick(sink);
        }
        result
    }

    /// Seconds until the next periodic callback is due, or None when idle.
    pub fn time_until_next_tick(&self) -> Option<f64> {
        let now = self.time.now();
        match (
            self.scheduler_ticker.time_until_due(now),
            self.frame_ticker.time_until_due(now),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
