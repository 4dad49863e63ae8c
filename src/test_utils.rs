//! Shared test doubles: a call-counting stub backend and an in-memory
//! source tree.

use crate::backend::{ProgramHandle, ShaderBackend, StageHandle, UniformValue};
use crate::context::ShaderContext;
use crate::error::ShaderError;
use crate::source::{SourceReader, StageKind};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Creates a recording backend and a context driving it.
pub fn test_context() -> (Arc<RecordingBackend>, Arc<ShaderContext>) {
    let backend = Arc::new(RecordingBackend::new());
    let context = Arc::new(ShaderContext::new(
        Arc::clone(&backend) as Arc<dyn ShaderBackend>
    ));
    (backend, context)
}

/// Stub backend that records every call so tests can assert call counts,
/// handle leaks, and disposal ordering. Compilation, linking and validation
/// succeed unless a failure is scripted.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_handle: AtomicU32,
    live_stages: Mutex<HashSet<u32>>,
    deleted_stages: AtomicUsize,
    stage_kinds: Mutex<HashMap<u32, StageKind>>,
    live_programs: Mutex<HashSet<u32>>,
    program_creates: AtomicUsize,
    program_deletes: AtomicUsize,
    attached: Mutex<HashMap<u32, Vec<u32>>>,
    deleted_while_attached: AtomicBool,
    use_program_calls: AtomicUsize,
    uniform_table: Mutex<HashMap<String, i32>>,
    uniform_queries: Mutex<HashMap<String, usize>>,
    uniform_uploads: Mutex<Vec<(i32, String)>>,
    attribute_table: Mutex<HashMap<String, i32>>,
    scripted_compile_failure: Mutex<Option<(StageKind, String)>>,
    scripted_link_failure: Mutex<Option<String>>,
    scripted_validate_failure: Mutex<Option<String>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU32::new(1),
            ..Self::default()
        }
    }

    // --- Failure scripting ---

    /// Makes compilation of the given stage kind fail with `log`.
    pub fn fail_compile(&self, kind: StageKind, log: &str) {
        *lock(&self.scripted_compile_failure) = Some((kind, log.to_string()));
    }

    /// Makes the next link fail with `log`.
    pub fn fail_link(&self, log: &str) {
        *lock(&self.scripted_link_failure) = Some(log.to_string());
    }

    /// Makes validation fail with `log`.
    pub fn fail_validate(&self, log: &str) {
        *lock(&self.scripted_validate_failure) = Some(log.to_string());
    }

    // --- Scripted lookup tables ---

    /// Assigns a location to a uniform name; unknown names resolve to -1.
    pub fn define_uniform(&self, name: &str, location: i32) {
        lock(&self.uniform_table).insert(name.to_string(), location);
    }

    /// Assigns a location to an attribute name; unknown names resolve to -1.
    pub fn define_attribute(&self, name: &str, location: i32) {
        lock(&self.attribute_table).insert(name.to_string(), location);
    }

    /// Creates a bare program handle, for tests that need one without going
    /// through the builder.
    pub fn create_test_program(&self) -> ProgramHandle {
        ShaderBackend::create_program(self)
    }

    // --- Observations ---

    pub fn live_stage_count(&self) -> usize {
        lock(&self.live_stages).len()
    }

    pub fn deleted_stage_count(&self) -> usize {
        self.deleted_stages.load(Ordering::SeqCst)
    }

    pub fn live_program_count(&self) -> usize {
        lock(&self.live_programs).len()
    }

    pub fn program_create_count(&self) -> usize {
        self.program_creates.load(Ordering::SeqCst)
    }

    pub fn program_delete_count(&self) -> usize {
        self.program_deletes.load(Ordering::SeqCst)
    }

    pub fn use_program_count(&self) -> usize {
        self.use_program_calls.load(Ordering::SeqCst)
    }

    /// How many times the backend was queried for this uniform name.
    pub fn uniform_query_count(&self, name: &str) -> usize {
        lock(&self.uniform_queries).get(name).copied().unwrap_or(0)
    }

    /// Every uniform upload as (location, debug rendering of the value).
    pub fn uniform_uploads(&self) -> Vec<(i32, String)> {
        lock(&self.uniform_uploads).clone()
    }

    /// False if any stage or program was deleted while still attached.
    pub fn all_detached_before_delete(&self) -> bool {
        !self.deleted_while_attached.load(Ordering::SeqCst)
    }

    fn allocate(&self) -> u32 {
        self.next_handle.fetch_add(1, Ordering::SeqCst)
    }
}

impl ShaderBackend for RecordingBackend {
    fn create_stage(&self, kind: StageKind) -> Result<StageHandle, String> {
        let handle = self.allocate();
        lock(&self.live_stages).insert(handle);
        lock(&self.stage_kinds).insert(handle, kind);
        Ok(StageHandle(handle))
    }

    fn set_source(&self, _stage: StageHandle, _text: &str) {}

    fn compile(&self, stage: StageHandle) -> Result<(), String> {
        let kind = lock(&self.stage_kinds).get(&stage.0).copied();
        if let Some((failing_kind, log)) = lock(&self.scripted_compile_failure).as_ref() {
            if kind == Some(*failing_kind) {
                return Err(log.clone());
            }
        }
        Ok(())
    }

    fn delete_stage(&self, stage: StageHandle) {
        if lock(&self.attached)
            .values()
            .any(|stages| stages.contains(&stage.0))
        {
            self.deleted_while_attached.store(true, Ordering::SeqCst);
        }
        if lock(&self.live_stages).remove(&stage.0) {
            self.deleted_stages.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn create_program(&self) -> ProgramHandle {
        let handle = self.allocate();
        lock(&self.live_programs).insert(handle);
        lock(&self.attached).insert(handle, Vec::new());
        self.program_creates.fetch_add(1, Ordering::SeqCst);
        ProgramHandle(handle)
    }

    fn attach(&self, program: ProgramHandle, stage: StageHandle) {
        lock(&self.attached)
            .entry(program.0)
            .or_default()
            .push(stage.0);
    }

    fn detach(&self, program: ProgramHandle, stage: StageHandle) {
        if let Some(stages) = lock(&self.attached).get_mut(&program.0) {
            stages.retain(|&handle| handle != stage.0);
        }
    }

    fn link(&self, _program: ProgramHandle) -> Result<(), String> {
        match lock(&self.scripted_link_failure).as_ref() {
            Some(log) => Err(log.clone()),
            None => Ok(()),
        }
    }

    fn validate(&self, _program: ProgramHandle) -> Result<(), String> {
        match lock(&self.scripted_validate_failure).as_ref() {
            Some(log) => Err(log.clone()),
            None => Ok(()),
        }
    }

    fn delete_program(&self, program: ProgramHandle) {
        let still_attached = lock(&self.attached)
            .remove(&program.0)
            .is_some_and(|stages| !stages.is_empty());
        if still_attached {
            self.deleted_while_attached.store(true, Ordering::SeqCst);
        }
        if lock(&self.live_programs).remove(&program.0) {
            self.program_deletes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn use_program(&self, _program: Option<ProgramHandle>) {
        self.use_program_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn uniform_location(&self, _program: ProgramHandle, name: &str) -> i32 {
        *lock(&self.uniform_queries)
            .entry(name.to_string())
            .or_insert(0) += 1;
        lock(&self.uniform_table).get(name).copied().unwrap_or(-1)
    }

    fn attribute_location(&self, _program: ProgramHandle, name: &str) -> i32 {
        lock(&self.attribute_table).get(name).copied().unwrap_or(-1)
    }

    fn set_uniform(&self, location: i32, value: UniformValue<'_>) {
        lock(&self.uniform_uploads).push((location, format!("{value:?}")));
    }
}

/// In-memory source tree for preprocessor tests.
#[derive(Debug, Default)]
pub struct MapSourceReader {
    files: HashMap<String, String>,
}

impl MapSourceReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file at the given logical path.
    pub fn with(mut self, path: &str, text: &str) -> Self {
        self.files.insert(path.to_string(), text.to_string());
        self
    }
}

impl SourceReader for MapSourceReader {
    fn read_text(&self, path: &str) -> Result<String, ShaderError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ShaderError::ResourceNotFound {
                path: path.to_string(),
            })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
