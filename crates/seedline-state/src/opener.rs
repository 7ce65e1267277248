//! Hand-off of resolved content paths to the platform opener.

use std::io;
use std::path::Path;

/// Opens a local path with whatever application the platform associates with it.
pub trait FileOpener: Send + Sync {
    /// Launch the opener without waiting for it to exit.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while spawning the opener.
    fn open(&self, path: &Path) -> io::Result<()>;
}

/// Opener backed by `xdg-open`, `open`, or `start` depending on the platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl FileOpener for SystemOpener {
    fn open(&self, path: &Path) -> io::Result<()> {
        open::that_detached(path)
    }
}
