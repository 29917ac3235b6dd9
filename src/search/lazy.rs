//! One-time initialization for model handles
//!
//! A [`LazyHandle`] holds a factory and builds its value on first use.
//! Concurrent first calls build at most once; a failed build is not cached,
//! so the next call tries again.

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::fmt;

type Factory<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

pub struct LazyHandle<T> {
    cell: OnceCell<T>,
    factory: Factory<T>,
}

impl<T> LazyHandle<T> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    /// Already-built handle; the factory is never called
    pub fn ready(value: T) -> Self
    where
        T: 'static,
    {
        let cell = OnceCell::new();
        let _ = cell.set(value);
        Self {
            cell,
            factory: Box::new(|| anyhow::bail!("handle was provided pre-built")),
        }
    }

    pub fn get(&self) -> Result<&T> {
        self.cell.get_or_try_init(|| (self.factory)())
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> fmt::Debug for LazyHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyHandle")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
