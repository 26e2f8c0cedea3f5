use std::path::Path;

use crate::foundation::error::FlipreelResult;

pub(crate) mod fs;

/// Receives the paths the engine wants change notifications for.
///
/// The engine calls [`PathWatcher::watch`] once per distinct path: the document path on first
/// load and every asset path on its first load attempt.
pub trait PathWatcher {
    fn watch(&mut self, path: &Path) -> FlipreelResult<()>;
}

/// Watcher that ignores registrations, for one-shot use.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullWatcher;

impl PathWatcher for NullWatcher {
    fn watch(&mut self, _path: &Path) -> FlipreelResult<()> {
        Ok(())
    }
}

impl<W: PathWatcher + ?Sized> PathWatcher for &mut W {
    fn watch(&mut self, path: &Path) -> FlipreelResult<()> {
        (**self).watch(path)
    }
}
