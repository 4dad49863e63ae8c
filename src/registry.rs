//! Named, lazily materialized collection of shader programs.

use crate::context::ShaderContext;
use crate::error::ShaderError;
use crate::loader;
use crate::program::ShaderProgram;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Factory invoked on first access to materialize a registered program.
pub type ShaderSupplier = Arc<dyn Fn() -> Result<ShaderProgram, ShaderError> + Send + Sync>;

/// Caches shader programs by name, materializing each registered supplier at
/// most once.
///
/// Registration and lookup are safe from multiple threads; the supplier call
/// itself performs backend work and is expected to run on the context-owning
/// thread in practice. A per-name [`OnceCell`] guarantees that concurrent
/// first access for the same name runs the supplier exactly once and hands
/// every caller the same instance. Suppliers survive [`ShaderRegistry::reload`],
/// so the next access re-materializes; [`ShaderRegistry::remove`] forgets
/// both the instance and the supplier.
#[derive(Default)]
pub struct ShaderRegistry {
    realized: Mutex<HashMap<String, Arc<OnceCell<Arc<ShaderProgram>>>>>,
    suppliers: Mutex<HashMap<String, ShaderSupplier>>,
}

impl ShaderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a supplier under `name` without invoking it. A supplier
    /// registered under an existing name replaces the previous one but does
    /// not touch an already realized instance.
    pub fn register(
        &self,
        name: impl Into<String>,
        supplier: impl Fn() -> Result<ShaderProgram, ShaderError> + Send + Sync + 'static,
    ) {
        lock(&self.suppliers).insert(name.into(), Arc::new(supplier));
    }

    /// Registers a filesystem supplier using the `.vert`/`.frag` naming
    /// convention rooted at `base`.
    pub fn register_base_path(
        &self,
        name: impl Into<String>,
        context: &Arc<ShaderContext>,
        base: impl Into<PathBuf>,
    ) {
        let context = Arc::clone(context);
        let base = base.into();
        self.register(name, move || loader::from_base_path(&context, &base));
    }

    /// Inserts an already built program as the realized instance for `name`.
    /// A previously realized instance under the same name is disposed.
    pub fn add(&self, name: impl Into<String>, program: ShaderProgram) {
        let cell = Arc::new(OnceCell::new());
        // The cell is freshly created, so this set cannot fail.
        let _ = cell.set(Arc::new(program));
        let previous = lock(&self.realized).insert(name.into(), cell);
        if let Some(previous) = previous {
            if let Some(old) = previous.get() {
                old.close();
            }
        }
    }

    /// Returns the program registered under `name`, materializing it on
    /// first access.
    ///
    /// # Errors
    /// [`ShaderError::UnknownShader`] when `name` is neither realized nor
    /// registered; any failure from the supplier. A failed materialization
    /// caches nothing, so a later call retries.
    pub fn get(&self, name: &str) -> Result<Arc<ShaderProgram>, ShaderError> {
        let cell = {
            let mut realized = lock(&self.realized);
            if let Some(cell) = realized.get(name) {
                Arc::clone(cell)
            } else if lock(&self.suppliers).contains_key(name) {
                let cell = Arc::new(OnceCell::new());
                realized.insert(name.to_string(), Arc::clone(&cell));
                cell
            } else {
                // Unknown names must not leave empty cells behind; the
                // realized map holds entries only for names that exist.
                return Err(ShaderError::UnknownShader(name.to_string()));
            }
        };
        let program = cell.get_or_try_init(|| {
            let supplier = lock(&self.suppliers)
                .get(name)
                .cloned()
                .ok_or_else(|| ShaderError::UnknownShader(name.to_string()))?;
            log::debug!("materializing shader '{name}'");
            (supplier.as_ref())().map(Arc::new)
        })?;
        Ok(Arc::clone(program))
    }

    /// Non-failing variant of [`ShaderRegistry::get`]: any failure maps to
    /// `None`.
    pub fn get_or_none(&self, name: &str) -> Option<Arc<ShaderProgram>> {
        match self.get(name) {
            Ok(program) => Some(program),
            Err(error) => {
                log::debug!("shader '{name}' unavailable: {error}");
                None
            }
        }
    }

    /// Whether `name` is realized or has a registered supplier.
    pub fn has(&self, name: &str) -> bool {
        if lock(&self.realized)
            .get(name)
            .is_some_and(|cell| cell.get().is_some())
        {
            return true;
        }
        lock(&self.suppliers).contains_key(name)
    }

    /// Disposes the realized instance for `name` (if any) and forgets it,
    /// leaving the supplier registered so the next access re-materializes.
    ///
    /// An empty cell may have a materialization in flight on another thread;
    /// it stays in the map so the instance it produces remains tracked and
    /// reachable by a later reload or [`ShaderRegistry::dispose`].
    pub fn reload(&self, name: &str) {
        let cell = {
            let mut realized = lock(&self.realized);
            let materialized = realized
                .get(name)
                .is_some_and(|cell| cell.get().is_some());
            if materialized {
                realized.remove(name)
            } else {
                None
            }
        };
        if let Some(cell) = cell {
            if let Some(program) = cell.get() {
                log::debug!("disposing shader '{name}' for reload");
                program.close();
            }
        }
    }

    /// Applies [`ShaderRegistry::reload`] to every realized entry. Empty
    /// cells stay in place, as in [`ShaderRegistry::reload`].
    pub fn reload_all(&self) {
        let mut disposable = Vec::new();
        {
            let mut realized = lock(&self.realized);
            realized.retain(|name, cell| {
                if cell.get().is_some() {
                    disposable.push((name.clone(), Arc::clone(cell)));
                    false
                } else {
                    true
                }
            });
        }
        // Backend disposal happens outside the map lock.
        for (name, cell) in disposable {
            if let Some(program) = cell.get() {
                log::debug!("disposing shader '{name}' for reload");
                program.close();
            }
        }
    }

    /// Disposes and forgets both the realized instance and the supplier for
    /// `name`.
    pub fn remove(&self, name: &str) {
        self.reload(name);
        lock(&self.realized).remove(name);
        lock(&self.suppliers).remove(name);
    }

    /// Disposes every realized program and clears all state. The registry
    /// remains usable afterwards.
    pub fn dispose(&self) {
        self.reload_all();
        lock(&self.realized).clear();
        lock(&self.suppliers).clear();
    }

    /// Number of realized (materialized) entries.
    pub fn realized_count(&self) -> usize {
        lock(&self.realized)
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    /// Number of registered suppliers, realized or not.
    pub fn registered_count(&self) -> usize {
        lock(&self.suppliers).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
