//! Registry of renderer voices dispatched during the current session.

use super::renderer::NoteRenderer;

/// Arena of stoppable handles for every note handed to the renderer since
/// the last pause or stop.
#[derive(Debug)]
pub struct VoiceRegistry<H> {
    handles: Vec<H>,
}

impl<H: Copy> VoiceRegistry<H> {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
        }
    }

    pub fn register(&mut self, handle: H) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stops every registered voice and empties the registry.
    ///
    /// Returns the number of handles that were stopped.
    pub fn stop_all<R>(&mut self, renderer: &mut R) -> usize
    where
        R: NoteRenderer<Handle = H>,
    {
        let count = self.handles.len();
        for handle in self.handles.drain(..) {
            renderer.stop(handle);
        }
        count
    }
}

impl<H: Copy> Default for VoiceRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
