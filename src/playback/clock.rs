//! Playback clock: maps wall-clock time to song time.
//!
//! Holds the Stopped/Playing/Paused state machine. All methods take the
//! current wall (and where needed audio) time as arguments, so the clock
//! itself never reads a system timer.

/// Represents the current playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Not playing, position reset to start.
    Stopped,
    /// Currently playing.
    Playing,
    /// Paused at the current position.
    Paused,
}

/// Song-time reference for one playback session.
///
/// While playing, song time is `(wall_now - wall_start) * speed`. The matching
/// audio-clock reference lets the scheduler turn a song time into a renderer
/// deadline with `audio_start + song_time / speed`.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    state: PlaybackState,
    speed: f64,
    wall_start: f64,
    audio_start: f64,
    /// Song time to resume from when not playing.
    pause_offset: f64,
}

impl PlaybackClock {
    /// Creates a stopped clock at song time zero.
    pub fn new(speed: f64) -> Self {
        Self {
            state: PlaybackState::Stopped,
            speed,
            wall_start: 0.0,
            audio_start: 0.0,
            pause_offset: 0.0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Song time playback will resume from.
    pub fn pause_offset(&self) -> f64 {
        self.pause_offset
    }

    /// Current song time in seconds.
    pub fn song_time(&self, wall_now: f64) -> f64 {
        match self.state {
            PlaybackState::Playing => ((wall_now - self.wall_start) * self.speed).max(0.0),
            PlaybackState::Paused | PlaybackState::Stopped => self.pause_offset,
        }
    }

    /// Audio-clock time at which a song time is due, at the current speed.
    pub fn audio_deadline(&self, song_seconds: f64) -> f64 {
        self.audio_start + song_seconds / self.speed
    }

    /// Anchors both references so that song time equals `song_seconds` now.
    fn anchor(&mut self, song_seconds: f64, wall_now: f64, audio_now: f64) {
        self.wall_start = wall_now - song_seconds / self.speed;
        self.audio_start = audio_now - song_seconds / self.speed;
    }

    /// Starts or resumes from the pause offset.
    ///
    /// Returns false (and does nothing) if already playing.
    pub fn start(&mut self, wall_now: f64, audio_now: f64) -> bool {
        if self.state == PlaybackState::Playing {
            return false;
        }
        self.anchor(self.pause_offset, wall_now, audio_now);
        self.state = PlaybackState::Playing;
        true
    }

    /// Captures the current song time and pauses.
    ///
    /// Returns false (and does nothing) unless playing.
    pub fn pause(&mut self, wall_now: f64) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        self.pause_offset = self.song_time(wall_now);
        self.state = PlaybackState::Paused;
        true
    }

    /// Returns to the start of the song. Valid from any state.
    pub fn stop(&mut self) {
        self.pause_offset = 0.0;
        self.state = PlaybackState::Stopped;
    }

    /// Moves to `song_seconds`.
    ///
    /// While playing the references are re-anchored so playback continues
    /// from the target. Otherwise the target becomes the resume offset, and a
    /// stopped clock becomes paused there.
    pub fn seek(&mut self, song_seconds: f64, wall_now: f64, audio_now: f64) {
        let target = song_seconds.max(0.0);
        match self.state {
            PlaybackState::Playing => self.anchor(target, wall_now, audio_now),
            PlaybackState::Paused | PlaybackState::Stopped => {
                self.pause_offset = target;
                self.state = PlaybackState::Paused;
            }
        }
    }

    /// Changes the speed multiplier.
    ///
    /// While playing, the references are re-anchored at the current song
    /// time so song time stays continuous. Deadlines already handed to the
    /// renderer are not touched.
    pub fn set_speed(&mut self, speed: f64, wall_now: f64, audio_now: f64) {
        if self.state == PlaybackState::Playing {
            let now = self.song_time(wall_now);
            self.speed = speed;
            self.anchor(now, wall_now, audio_now);
        } else {
            self.speed = speed;
        }
    }
}
