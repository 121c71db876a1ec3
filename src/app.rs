//! Application state and event handling.
//!
//! This module defines the main application state that coordinates
//! between the loaded timeline, the playback session, and the TUI.

use crate::audio::SynthRenderer;
use crate::config::PlayerConfig;
use crate::midi::Timeline;
use crate::playback::{MonotonicClock, PlaybackSession, PlaybackState, StartOutcome};
use crate::ui::RollView;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a status message stays on screen.
const STATUS_DURATION: Duration = Duration::from_secs(3);

/// Longest wait for input while idle, so expired status messages clear.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Main application state.
pub struct App {
    session: PlaybackSession<SynthRenderer>,
    config: PlayerConfig,
    midi_path: PathBuf,
    view: RollView,
    status_message: Option<(String, Instant)>,
}

impl App {
    /// Creates the application and loads the MIDI file.
    ///
    /// A file that fails to load leaves an empty timeline and a status
    /// message; the player still opens so the file can be fixed and reloaded.
    ///
    /// # Arguments
    ///
    /// * `midi_path` - The Standard MIDI File to play
    /// * `soundfont` - SoundFont for the renderer, loaded on first play
    /// * `config` - Player settings (already merged with command-line flags)
    pub fn new(midi_path: PathBuf, soundfont: Option<PathBuf>, config: PlayerConfig) -> Self {
        let renderer = SynthRenderer::new(soundfont, config.volume);
        let session = PlaybackSession::new(
            Timeline::empty(),
            renderer,
            MonotonicClock::new(),
            &config,
        );
        let mut app = Self {
            session,
            config,
            midi_path,
            view: RollView::new(),
            status_message: None,
        };
        app.load_midi();
        app
    }

    pub fn session(&self) -> &PlaybackSession<SynthRenderer> {
        &self.session
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn view(&self) -> &RollView {
        &self.view
    }

    pub fn midi_path(&self) -> &Path {
        &self.midi_path
    }

    /// File name shown in the title bar.
    pub fn file_name(&self) -> String {
        self.midi_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.midi_path.display().to_string())
    }

    pub fn volume(&self) -> f64 {
        self.session.renderer().volume()
    }

    /// Sets a status message to display temporarily.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_ref().map(|(msg, _)| msg.as_str())
    }

    /// Clears expired status messages.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > STATUS_DURATION {
                self.status_message = None;
            }
        }
    }

    /// (Re)loads the MIDI file into the session, stopping playback.
    ///
    /// # Returns
    ///
    /// true if the file parsed.
    pub fn load_midi(&mut self) -> bool {
        match Timeline::load(&self.midi_path) {
            Ok(timeline) => {
                let count = timeline.len();
                self.session.load(timeline);
                if count == 0 {
                    self.set_status("No playable notes in file");
                } else {
                    self.set_status(format!("Loaded {} notes", count));
                }
                self.sync_view();
                true
            }
            Err(e) => {
                tracing::error!("Failed to load {}: {}", self.midi_path.display(), e);
                self.session.load(Timeline::empty());
                self.set_status(format!("Load failed: {}", e));
                self.sync_view();
                false
            }
        }
    }

    /// Plays from the current position, or pauses if already playing.
    pub fn toggle_playback(&mut self) {
        if self.session.pause() {
            self.sync_view();
            self.set_status("Paused");
            return;
        }
        match self.session.start() {
            Ok(StartOutcome::Started) => self.set_status("Playing"),
            Ok(StartOutcome::AlreadyPlaying) => {}
            Ok(StartOutcome::NothingToPlay) => self.set_status("Nothing to play"),
            Err(e) => self.set_status(e.to_string()),
        }
    }

    pub fn stop(&mut self) {
        self.session.stop();
        self.sync_view();
        self.set_status("Stopped");
    }

    pub fn restart(&mut self) {
        match self.session.restart() {
            Ok(StartOutcome::Started) => self.set_status("Restarted"),
            Ok(StartOutcome::NothingToPlay) => self.set_status("Nothing to play"),
            Ok(StartOutcome::AlreadyPlaying) => {}
            Err(e) => self.set_status(e.to_string()),
        }
        self.sync_view();
    }

    /// Seeks by `delta` song seconds from the current position.
    pub fn seek_by(&mut self, delta: f64) {
        let target = self.session.song_time() + delta;
        self.session.seek(target);
        self.sync_view();
    }

    /// Changes speed by `delta`, within the configured range.
    pub fn change_speed(&mut self, delta: f64) {
        let speed = self.session.set_speed(self.session.speed() + delta);
        self.set_status(format!("Speed {:.2}x", speed));
    }

    /// Changes master volume by `delta`, within 0-200%.
    pub fn change_volume(&mut self, delta: f64) {
        let renderer = self.session.renderer_mut();
        let volume = renderer.set_volume(renderer.volume() + delta);
        self.set_status(format!("Volume {:.0}%", volume * 100.0));
    }

    /// Runs whatever playback callbacks are due. Call every loop iteration.
    pub fn update(&mut self) {
        let result = self.session.poll(&mut self.view);
        if result.finished {
            self.set_status("Finished");
        }
        if self.session.state() != PlaybackState::Playing {
            self.sync_view();
        }
        self.clear_expired_status();
    }

    /// How long the event loop may block before the next update is due.
    pub fn poll_timeout(&self) -> Duration {
        self.session
            .time_until_next_tick()
            .map(|secs| Duration::from_secs_f64(secs.max(0.0)).min(IDLE_POLL))
            .unwrap_or(IDLE_POLL)
    }

    /// Points the view at the session's position outside visual ticks.
    fn sync_view(&mut self) {
        self.view.set_song_time(self.session.song_time());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::fixtures::notes_file;
    use std::fs;

    fn temp_midi(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "pianofall_app_{}_{}.mid",
            name,
            std::process::id()
        ));
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_loads_file_on_creation() {
        // Two quarter notes at 120 BPM
        let path = temp_midi("load", &notes_file(480, &[(60, 0, 480), (64, 480, 960)]));
        let app = App::new(path.clone(), None, PlayerConfig::default());
        assert_eq!(app.session().timeline().len(), 2);
        assert_eq!(app.session().timeline().total_duration(), 1.0);
        assert_eq!(app.status_message(), Some("Loaded 2 notes"));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_leaves_empty_timeline() {
        let mut app = App::new(
            PathBuf::from("/nonexistent/song.mid"),
            None,
            PlayerConfig::default(),
        );
        assert!(app.session().timeline().is_empty());
        assert!(app.status_message().unwrap().starts_with("Load failed"));

        app.toggle_playback();
        assert_eq!(app.status_message(), Some("Nothing to play"));
        assert_eq!(app.session().state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_play_without_soundfont_reports_error() {
        let path = temp_midi("nosf", &notes_file(480, &[(60, 0, 480)]));
        let mut app = App::new(path.clone(), None, PlayerConfig::default());
        app.toggle_playback();
        assert_eq!(app.session().state(), PlaybackState::Stopped);
        assert!(app
            .status_message()
            .unwrap()
            .starts_with("audio engine unavailable"));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_seek_while_stopped_moves_view() {
        let path = temp_midi(
            "seek",
            &notes_file(480, &[(60, 0, 480), (62, 4800, 5280)]),
        );
        let mut app = App::new(path.clone(), None, PlayerConfig::default());
        app.seek_by(3.0);
        assert_eq!(app.session().state(), PlaybackState::Paused);
        assert_eq!(app.view().song_time(), 3.0);

        // Clamped to the end of the song
        app.seek_by(100.0);
        assert_eq!(app.view().song_time(), 5.5);
        app.seek_by(-100.0);
        assert_eq!(app.view().song_time(), 0.0);
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_speed_and_volume_are_clamped() {
        let mut app = App::new(
            PathBuf::from("/nonexistent/song.mid"),
            None,
            PlayerConfig::default(),
        );
        app.change_speed(10.0);
        assert_eq!(app.session().speed(), 3.0);
        app.change_speed(-10.0);
        assert_eq!(app.session().speed(), 0.25);

        app.change_volume(-5.0);
        assert_eq!(app.volume(), 0.0);
        app.change_volume(0.5);
        assert_eq!(app.volume(), 0.5);
        assert_eq!(app.status_message(), Some("Volume 50%"));
    }

    #[test]
    fn test_idle_poll_timeout() {
        let app = App::new(
            PathBuf::from("/nonexistent/song.mid"),
            None,
            PlayerConfig::default(),
        );
        assert_eq!(app.poll_timeout(), IDLE_POLL);
    }
}
