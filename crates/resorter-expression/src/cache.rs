use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Keeps the resource of the most recently accessed file.
///
/// Files are evaluated one at a time, so a single slot is enough: every
/// function reading the same file reuses the resource, and moving to the next
/// file replaces it.
#[derive(Debug)]
pub struct SlotCache<T> {
    slot: Mutex<Option<(PathBuf, T)>>,
}

impl<T> Default for SlotCache<T> {
    fn default() -> Self {
        SlotCache { slot: Mutex::new(None) }
    }
}

impl<T: Clone> SlotCache<T> {
    pub fn new() -> Self {
        SlotCache::default()
    }

    /// Returns the cached resource for `path`, calling `open` on a miss.
    pub fn get_or_open<E>(
        &self,
        path: &Path,
        open: impl FnOnce(&Path) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut slot = self.lock();
        if let Some((cached, resource)) = slot.as_ref() {
            if cached == path {
                return Ok(resource.clone());
            }
        }
        let resource = open(path)?;
        *slot = Some((path.to_path_buf(), resource.clone()));
        Ok(resource)
    }

    /// Drops the cached resource, e.g. after the file was renamed.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<(PathBuf, T)>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn reopens_only_for_another_file() {
        let cache: SlotCache<usize> = SlotCache::new();
        let opened = Cell::new(0);
        let open = |_: &Path| -> Result<usize, ()> {
            opened.set(opened.get() + 1);
            Ok(opened.get())
        };
        assert_eq!(cache.get_or_open(Path::new("a"), open), Ok(1));
        assert_eq!(cache.get_or_open(Path::new("a"), open), Ok(1));
        assert_eq!(cache.get_or_open(Path::new("b"), open), Ok(2));
        assert_eq!(cache.get_or_open(Path::new("a"), open), Ok(3));
        cache.invalidate();
        assert_eq!(cache.get_or_open(Path::new("a"), open), Ok(4));
    }

    #[test]
    fn failed_open_keeps_nothing() {
        let cache: SlotCache<u8> = SlotCache::new();
        assert_eq!(cache.get_or_open(Path::new("a"), |_| Err("boom")), Err("boom"));
        assert_eq!(cache.get_or_open(Path::new("a"), |_| Ok::<_, &str>(7)), Ok(7));
    }
}
