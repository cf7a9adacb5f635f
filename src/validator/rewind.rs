use std::io::{self, Seek, SeekFrom};
use std::ops::{Deref, DerefMut};

/// Borrow of a candidate stream that seeks back to the start when dropped,
/// whichever way validation exits.
pub(crate) struct RewindGuard<'a, S: Seek> {
    stream: &'a mut S,
}

impl<'a, S: Seek> RewindGuard<'a, S> {
    /// Fails if the stream cannot report its position.
    pub fn new(stream: &'a mut S) -> io::Result<Self> {
        stream.stream_position()?;
        Ok(Self { stream })
    }
}

impl<S: Seek> Deref for RewindGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.stream
    }
}

impl<S: Seek> DerefMut for RewindGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.stream
    }
}

impl<S: Seek> Drop for RewindGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.stream.seek(SeekFrom::Start(0)) {
            log::warn!("Failed to rewind upload stream: {e}");
        }
    }
}
