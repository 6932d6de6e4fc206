//! Process-wide, load-once library bindings
//!
//! Each backend family owns one `static` [`LazyBinding`]. The slot's mutex
//! covers both the "already bound" check and the population of the table, so
//! a binding is either absent or complete. Failed loads leave the slot empty
//! and the next caller retries. A populated slot is never cleared: loaded
//! libraries stay mapped until the process exits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{EncoderError, Result};

/// A binding table loaded at most once per process
pub struct LazyBinding<T> {
    name: &'static str,
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> LazyBinding<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: parking_lot::const_mutex(None),
        }
    }

    /// Return the cached table, loading it with `load` on first use
    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        let mut slot = self.slot.lock();
        if let Some(table) = slot.as_ref() {
            return Ok(Arc::clone(table));
        }

        debug!("binding {} for the first time", self.name);
        let table = Arc::new(load()?);
        *slot = Some(Arc::clone(&table));
        info!("{} bound", self.name);
        Ok(table)
    }

    /// Whether a complete table is cached
    pub fn is_bound(&self) -> bool {
        self.slot.lock().is_some()
    }
}

/// Where to look for a backend library
#[derive(Debug, Clone, Default)]
pub struct LibrarySearch {
    /// Explicit path, typically from the config file
    pub explicit: Option<PathBuf>,
    /// Environment variable holding an override path
    pub env_var: Option<&'static str>,
    /// Bare names and absolute paths tried in order
    pub candidates: &'static [&'static str],
}

impl LibrarySearch {
    /// Ordered candidate list: explicit, then environment, then defaults
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(explicit) = &self.explicit {
            paths.push(explicit.clone());
        }
        if let Some(var) = self.env_var {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    paths.push(PathBuf::from(value));
                }
            }
        }
        paths.extend(self.candidates.iter().map(PathBuf::from));
        paths
    }

    /// Try each candidate with `open` until one succeeds
    pub fn load_first<T, F>(&self, what: &str, mut open: F) -> Result<T>
    where
        F: FnMut(&Path) -> Result<T>,
    {
        let mut last_error = None;
        for path in self.paths() {
            match open(&path) {
                Ok(table) => {
                    info!("Loaded {} from {}", what, path.display());
                    return Ok(table);
                }
                Err(e) => {
                    debug!("{} not usable at {}: {}", what, path.display(), e);
                    last_error = Some(e);
                }
            }
        }

        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no candidate paths".to_string());
        warn!("load {} failed: {}", what, detail);
        Err(EncoderError::binding(format!(
            "failed to load {}: {}",
            what, detail
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_loads_once() {
        static BINDING: LazyBinding<u32> = LazyBinding::new("test");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let table = BINDING
                .get_or_load(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .unwrap();
            assert_eq!(*table, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(BINDING.is_bound());
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let binding: LazyBinding<u32> = LazyBinding::new("flaky");
        assert!(
            binding
                .get_or_load(|| Err(EncoderError::binding("missing symbol")))
                .is_err()
        );
        assert!(!binding.is_bound());
        assert_eq!(*binding.get_or_load(|| Ok(3)).unwrap(), 3);
        assert!(binding.is_bound());
    }

    #[test]
    fn test_concurrent_first_use_binds_once() {
        static BINDING: LazyBinding<u64> = LazyBinding::new("concurrent");
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        let threads: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    BINDING
                        .get_or_load(|| {
                            CALLS.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(5));
                            Ok(42)
                        })
                        .map(|t| *t)
                })
            })
            .collect();

        for t in threads {
            assert_eq!(t.join().unwrap().unwrap(), 42);
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_search_order() {
        let search = LibrarySearch {
            explicit: Some(PathBuf::from("/opt/custom/libfoo.so")),
            env_var: None,
            candidates: &["libfoo.so", "/usr/lib/libfoo.so"],
        };
        let paths = search.paths();
        assert_eq!(paths[0], PathBuf::from("/opt/custom/libfoo.so"));
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn test_load_first_reports_binding_error() {
        let search = LibrarySearch {
            explicit: None,
            env_var: None,
            candidates: &["a", "b"],
        };
        let mut tried = Vec::new();
        let result: Result<()> = search.load_first("libfoo", |p| {
            tried.push(p.to_path_buf());
            Err(EncoderError::binding("nope"))
        });
        assert!(matches!(result, Err(EncoderError::Binding(_))));
        assert_eq!(tried.len(), 2);
    }
}
