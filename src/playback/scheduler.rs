//! Lookahead scheduler.
//!
//! On every tick the scheduler hands the renderer each note whose start falls
//! inside the lookahead window, timed on the renderer's clock. A monotonic
//! cursor into the timeline guarantees each note is dispatched at most once
//! per session.

use super::clock::PlaybackClock;
use super::renderer::{NoteRenderer, ScheduledNote};
use super::voices::VoiceRegistry;
use crate::config::PlayerConfig;
use crate::midi::Timeline;

/// Timing constants for dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerSettings {
    /// Lookahead in wall seconds; multiplied by speed to get song seconds.
    pub lookahead: f64,
    /// Deadlines are never earlier than renderer-now plus this margin.
    pub safety_margin: f64,
    /// Floor applied to note length before speed scaling.
    pub min_duration: f64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from(&PlayerConfig::default())
    }
}

impl From<&PlayerConfig> for SchedulerSettings {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            lookahead: config.lookahead_seconds,
            safety_margin: config.safety_margin_seconds,
            min_duration: config.min_note_seconds,
        }
    }
}

/// Dispatch cursor over a timeline.
#[derive(Debug, Clone)]
pub struct Scheduler {
    next_index: usize,
    settings: SchedulerSettings,
}

impl Scheduler {
    pub fn new(settings: SchedulerSettings) -> Self {
        Self {
            next_index: 0,
            settings,
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Index of the next note to dispatch.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// True once every note of the timeline has been dispatched.
    pub fn is_finished(&self, timeline: &Timeline) -> bool {
        self.next_index >= timeline.len()
    }

    /// Clears the cursor back to the first note.
    pub fn reset(&mut self) {
        self.next_index = 0;
    }

    /// Rewinds (or advances) the cursor to the first note starting at or
    /// after `seconds`. The only way the cursor moves backwards.
    pub fn seek(&mut self, timeline: &Timeline, seconds: f64) {
        self.next_index = timeline.first_index_at_or_after(seconds);
    }

    /// Dispatches every note due within the lookahead window.
    ///
    /// Does nothing unless the clock is playing.
    ///
    /// # Arguments
    ///
    /// * `timeline` - The song being played
    /// * `clock` - Session clock, read for song time, speed and references
    /// * `wall_now` - Current wall-clock time
    /// * `renderer` - Receives the dispatched notes
    /// * `voices` - Collects the handles of dispatched notes
    ///
    /// # Returns
    ///
    /// The number of notes dispatched by this tick.
    pub fn tick<R: NoteRenderer>(
        &mut self,
        timeline: &Timeline,
        clock: &PlaybackClock,
        wall_now: f64,
        renderer: &mut R,
        voices: &mut VoiceRegistry<R::Handle>,
    ) -> usize {
        if !clock.is_playing() {
            return 0;
        }

        let speed = clock.speed();
        let audio_now = renderer.current_time();
        let window_end = clock.song_time(wall_now) + self.settings.lookahead * speed;
        let earliest = audio_now + self.settings.safety_margin;

        let mut dispatched = 0;
        while let Some(note) = timeline.notes().get(self.next_index) {
            if note.start > window_end {
                break;
            }

            let deadline = clock.audio_deadline(note.start).max(earliest);
            let duration = note.duration().max(self.settings.min_duration) / speed;
            let handle = renderer.dispatch(ScheduledNote {
                pitch: note.pitch,
                velocity: note.velocity,
                duration,
                deadline,
            });
            voices.register(handle);

            self.next_index += 1;
            dispatched += 1;
        }

        if dispatched > 0 {
            tracing::debug!(
                dispatched,
                next_index = self.next_index,
                window_end,
                "Scheduled notes"
            );
        }
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::Note;
    use crate::playback::testing::{ManualClock, RecordingRenderer};
    use crate::playback::TimeSource;

    fn note(pitch: u8, start: f64, end: f64) -> Note {
        Note {
            pitch,
            velocity: 100,
            start,
            end,
        }
    }

    fn timeline() -> Timeline {
        Timeline::from_notes(vec![
            note(60, 0.0, 0.5),
            note(62, 0.2, 0.3),
            note(64, 0.5, 0.51),
            note(65, 1.0, 2.0),
            note(67, 3.0, 4.0),
        ])
    }

    struct Rig {
        wall: ManualClock,
        audio: ManualClock,
        renderer: RecordingRenderer,
        voices: VoiceRegistry<usize>,
        clock: PlaybackClock,
        scheduler: Scheduler,
    }

    impl Rig {
        fn new(speed: f64) -> Self {
            let audio = ManualClock::new();
            Self {
                wall: ManualClock::new(),
                renderer: RecordingRenderer::new(audio.clone()),
                audio,
                voices: VoiceRegistry::new(),
                clock: PlaybackClock::new(speed),
                scheduler: Scheduler::new(SchedulerSettings::default()),
            }
        }

        fn start(&mut self) {
            self.clock.start(self.wall.now(), self.audio.now());
        }

        fn advance(&mut self, seconds: f64) {
            self.wall.advance(seconds);
            self.audio.advance(seconds);
        }

        fn tick(&mut self, timeline: &Timeline) -> usize {
            self.scheduler.tick(
                timeline,
                &self.clock,
                self.wall.now(),
                &mut self.renderer,
                &mut self.voices,
            )
        }
    }

    #[test]
    fn test_no_dispatch_unless_playing() {
        let tl = timeline();
        let mut rig = Rig::new(1.0);
        assert_eq!(rig.tick(&tl), 0);
        assert!(rig.renderer.dispatched.is_empty());
    }

    #[test]
    fn test_window_dispatch() {
        let tl = timeline();
        let mut rig = Rig::new(1.0);
        rig.audio.set(10.0);
        rig.start();

        // Window [0, 0.25] holds the first two notes
        assert_eq!(rig.tick(&tl), 2);
        assert_eq!(rig.scheduler.next_index(), 2);
        let first = rig.renderer.dispatched[0];
        // Due immediately, so clamped to now + margin
        assert!((first.deadline - 10.008).abs() < 1e-9);
        assert!((first.duration - 0.5).abs() < 1e-9);
        let second = rig.renderer.dispatched[1];
        assert!((second.deadline - 10.2).abs() < 1e-9);
        assert!((second.duration - 0.1).abs() < 1e-9);

        rig.advance(0.3);
        assert_eq!(rig.tick(&tl), 1);
        // 10 ms note raised to the 50 ms floor
        assert!((rig.renderer.dispatched[2].duration - 0.05).abs() < 1e-9);

        rig.advance(0.5);
        assert_eq!(rig.tick(&tl), 1);
        rig.advance(5.0);
        assert_eq!(rig.tick(&tl), 1);
        assert!(rig.scheduler.is_finished(&tl));
        assert_eq!(rig.tick(&tl), 0);
        assert_eq!(rig.voices.len(), 5);
    }

    #[test]
    fn test_each_note_dispatched_once() {
        let tl = timeline();
        let mut rig = Rig::new(1.0);
        rig.start();
        let mut last_index = 0;
        for _ in 0..400 {
            rig.tick(&tl);
            assert!(rig.scheduler.next_index() >= last_index);
            last_index = rig.scheduler.next_index();
            rig.advance(0.025);
        }
        let pitches: Vec<u8> = rig.renderer.dispatched.iter().map(|n| n.pitch).collect();
        assert_eq!(pitches, vec![60, 62, 64, 65, 67]);
    }

    #[test]
    fn test_speed_halves_deadline_and_duration() {
        let tl = Timeline::from_notes(vec![note(60, 2.0, 3.0)]);

        let mut normal = Rig::new(1.0);
        normal.start();
        normal.advance(1.8);
        assert_eq!(normal.tick(&tl), 1);

        let mut fast = Rig::new(2.0);
        fast.start();
        fast.advance(0.9);
        assert_eq!(fast.tick(&tl), 1);

        let a = normal.renderer.dispatched[0];
        let b = fast.renderer.dispatched[0];
        assert!((a.deadline - 2.0).abs() < 1e-9);
        assert!((b.deadline - 1.0).abs() < 1e-9);
        assert!((a.duration - 1.0).abs() < 1e-9);
        assert!((b.duration - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_lookahead_scales_with_speed() {
        let tl = Timeline::from_notes(vec![note(60, 0.45, 1.0)]);
        let mut rig = Rig::new(2.0);
        rig.start();
        // 0.25 wall seconds of lookahead cover 0.5 song seconds at 2x
        assert_eq!(rig.tick(&tl), 1);
    }

    #[test]
    fn test_seek_rewinds_cursor() {
        let tl = timeline();
        let mut scheduler = Scheduler::new(SchedulerSettings::default());
        scheduler.seek(&tl, 0.5);
        assert_eq!(scheduler.next_index(), 2);
        scheduler.seek(&tl, 0.0);
        assert_eq!(scheduler.next_index(), 0);
        scheduler.seek(&tl, 10.0);
        assert!(scheduler.is_finished(&tl));
        scheduler.reset();
        assert_eq!(scheduler.next_index(), 0);
    }

    #[test]
    fn test_empty_timeline() {
        let tl = Timeline::empty();
        let mut rig = Rig::new(1.0);
        rig.start();
        assert_eq!(rig.tick(&tl), 0);
        assert!(rig.scheduler.is_finished(&tl));
    }
}
