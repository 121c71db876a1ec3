//! Timed playback of a [`Timeline`](crate::midi::Timeline).
//!
//! A [`PlaybackSession`] owns the song, the [`PlaybackClock`] and the
//! [`Scheduler`] cursor, and drives a [`NoteRenderer`] with lookahead
//! dispatch. Everything here is single-threaded: the owner calls
//! [`PlaybackSession::poll`] from its loop and the session fires its
//! scheduler and visual ticks when they are due.

mod clock;
mod renderer;
mod scheduler;
mod session;
mod ticker;
mod time;
mod voices;

pub use clock::{PlaybackClock, PlaybackState};
pub use renderer::{NoteRenderer, RendererError, ScheduledNote, VisualSink};
pub use scheduler::{Scheduler, SchedulerSettings};
pub use session::{PlaybackError, PlaybackSession, PollResult, StartOutcome};
pub use ticker::Ticker;
pub use time::{MonotonicClock, TimeSource};
pub use voices::VoiceRegistry;

/// Deterministic clock and renderer doubles for tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::{NoteRenderer, RendererError, ScheduledNote, TimeSource};
    use std::cell::Cell;
    use std::rc::Rc;

    /// A clock that only moves when told to. Clones share the same time.
    #[derive(Debug, Clone, Default)]
    pub struct ManualClock(Rc<Cell<f64>>);

    impl ManualClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&self, seconds: f64) {
            self.0.set(seconds);
        }

        pub fn advance(&self, seconds: f64) {
            self.0.set(self.0.get() + seconds);
        }
    }

    impl TimeSource for ManualClock {
        fn now(&self) -> f64 {
            self.0.get()
        }
    }

    /// Records every dispatch and stop. Handles are dispatch indices.
    #[derive(Debug)]
    pub struct RecordingRenderer {
        pub audio: ManualClock,
        pub dispatched: Vec<ScheduledNote>,
        pub stopped: Vec<usize>,
        pub prepare_calls: usize,
        pub fail_prepare: bool,
    }

    impl RecordingRenderer {
        pub fn new(audio: ManualClock) -> Self {
            Self {
                audio,
                dispatched: Vec::new(),
                stopped: Vec::new(),
                prepare_calls: 0,
                fail_prepare: false,
            }
        }
    }

    impl NoteRenderer for RecordingRenderer {
        type Handle = usize;

        fn prepare(&mut self) -> Result<(), RendererError> {
            self.prepare_calls += 1;
            if self.fail_prepare {
                Err(RendererError::NoSoundFont)
            } else {
                Ok(())
            }
        }

        fn current_time(&self) -> f64 {
            self.audio.now()
        }

        fn dispatch(&mut self, note: ScheduledNote) -> usize {
            self.dispatched.push(note);
            self.dispatched.len() - 1
        }

        fn stop(&mut self, handle: usize) {
            if !self.stopped.contains(&handle) {
                self.stopped.push(handle);
            }
        }
    }
}
