//! Memoized uniform location lookups.

use crate::backend::ProgramHandle;
use crate::context::ShaderContext;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Caches uniform name → backend location lookups for one program.
///
/// Location queries are comparatively expensive driver calls, so results are
/// memoized, including the "not found" sentinel: probing for intentionally
/// absent optional uniforms stays cheap. Cached locations are only valid for
/// one link generation; [`UniformCache::invalidate`] drops everything when
/// the owning program is relinked. The uniform set of a program is small and
/// bounded, so there is no eviction beyond full invalidation.
#[derive(Debug)]
pub struct UniformCache {
    context: Arc<ShaderContext>,
    program: ProgramHandle,
    cache: Mutex<HashMap<String, i32>>,
}

impl UniformCache {
    /// Sentinel location for uniforms that are not found or not active.
    pub const NOT_FOUND: i32 = -1;

    /// Creates an empty cache for `program`.
    pub fn new(context: Arc<ShaderContext>, program: ProgramHandle) -> Self {
        Self {
            context,
            program,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The location of `name`, querying the backend at most once per name
    /// per link generation.
    pub fn location(&self, name: &str) -> i32 {
        let mut cache = self.lock_cache();
        if let Some(&location) = cache.get(name) {
            return location;
        }
        let location = self.context.backend().uniform_location(self.program, name);
        if location == Self::NOT_FOUND {
            log::debug!("uniform '{name}' not active in program {:?}", self.program);
        }
        cache.insert(name.to_string(), location);
        location
    }

    /// Whether `name` resolves to an active uniform.
    pub fn exists(&self, name: &str) -> bool {
        self.location(name) != Self::NOT_FOUND
    }

    /// Drops every cached entry. Required after a relink, since locations
    /// are only valid for one link generation.
    pub fn invalidate(&self) {
        self.lock_cache().clear();
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, i32>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_context;

    #[test]
    fn repeated_lookups_query_the_backend_once() {
        let (backend, context) = test_context();
        let program = backend.create_test_program();
        backend.define_uniform("u_color", 4);
        let cache = UniformCache::new(context, program);
        assert_eq!(cache.location("u_color"), 4);
        assert_eq!(cache.location("u_color"), 4);
        assert_eq!(cache.location("u_color"), 4);
        assert_eq!(backend.uniform_query_count("u_color"), 1);
    }

    #[test]
    fn negative_lookups_are_cached_too() {
        let (backend, context) = test_context();
        let program = backend.create_test_program();
        let cache = UniformCache::new(context, program);
        assert_eq!(cache.location("u_missing"), UniformCache::NOT_FOUND);
        assert!(!cache.exists("u_missing"));
        assert!(!cache.exists("u_missing"));
        assert_eq!(backend.uniform_query_count("u_missing"), 1);
    }

    #[test]
    fn exists_reflects_the_sentinel() {
        let (backend, context) = test_context();
        let program = backend.create_test_program();
        backend.define_uniform("u_time", 0);
        let cache = UniformCache::new(context, program);
        assert!(cache.exists("u_time"));
        assert!(!cache.exists("u_nope"));
    }

    #[test]
    fn invalidate_forces_a_fresh_query() {
        let (backend, context) = test_context();
        let program = backend.create_test_program();
        backend.define_uniform("u_mvp", 2);
        let cache = UniformCache::new(context, program);
        assert_eq!(cache.location("u_mvp"), 2);
        cache.invalidate();
        // Simulate a relink assigning a different location.
        backend.define_uniform("u_mvp", 7);
        assert_eq!(cache.location("u_mvp"), 7);
        assert_eq!(backend.uniform_query_count("u_mvp"), 2);
    }
}
