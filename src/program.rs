//! Linked shader programs and the builder that produces them.
//!
//! The builder walks the compile → attach → link → validate sequence with
//! deterministic cleanup on every failure path: a stage that fails to compile
//! is deleted immediately, earlier stages are released on unwind by
//! [`CompiledStage`]'s drop path, and a failed link detaches and disposes
//! every attached stage before deleting the program handle. A partially
//! linked program is never returned.

use crate::backend::{ProgramHandle, UniformValue};
use crate::context::ShaderContext;
use crate::error::ShaderError;
use crate::source::{ShaderSource, StageKind};
use crate::stage::CompiledStage;
use crate::uniform::UniformCache;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A linked, bindable shader program.
///
/// Owns its backend program handle and the compiled stages attached to it;
/// disposal detaches and releases the stages before deleting the program.
/// Uniform lookups go through a per-program [`UniformCache`].
#[derive(Debug)]
pub struct ShaderProgram {
    context: Arc<ShaderContext>,
    handle: ProgramHandle,
    stages: Vec<CompiledStage>,
    uniforms: UniformCache,
    disposed: AtomicBool,
}

impl ShaderProgram {
    /// Starts an empty builder on the given context.
    pub fn builder(context: Arc<ShaderContext>) -> ProgramBuilder {
        ProgramBuilder::new(context)
    }

    /// Builds the common vertex + fragment pair from raw source text.
    pub fn from_sources(
        context: Arc<ShaderContext>,
        vertex: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Result<Self, ShaderError> {
        ProgramBuilder::new(context)
            .vertex(vertex)
            .fragment(fragment)
            .build()
    }

    /// The backend program handle.
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Whether this program has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Makes this program the active one in its context, skipping the
    /// backend call when it already is.
    ///
    /// # Errors
    /// [`ShaderError::InvalidState`] when the program has been disposed; a
    /// disposed program can never be rebound.
    pub fn bind(&self) -> Result<(), ShaderError> {
        if self.is_disposed() {
            return Err(ShaderError::InvalidState(format!(
                "cannot bind disposed program {:?}",
                self.handle
            )));
        }
        self.context.bind(self.handle);
        Ok(())
    }

    /// Deactivates whatever program is active in this context.
    pub fn unbind(&self) {
        self.context.unbind();
    }

    /// Whether this program is the currently active one.
    pub fn is_bound(&self) -> bool {
        !self.is_disposed() && self.context.is_bound(self.handle)
    }

    /// Binds this program, runs `action` with it, and leaves it bound.
    ///
    /// # Errors
    /// [`ShaderError::InvalidState`] from [`ShaderProgram::bind`] when the
    /// program has been disposed; `action` does not run in that case.
    pub fn with_bound<R>(&self, action: impl FnOnce(&Self) -> R) -> Result<R, ShaderError> {
        self.bind()?;
        Ok(action(self))
    }

    /// Binds this program, runs `action` with it, and unbinds afterwards.
    /// The unbind happens even when `action` panics.
    ///
    /// # Errors
    /// [`ShaderError::InvalidState`] from [`ShaderProgram::bind`] when the
    /// program has been disposed; `action` does not run in that case.
    pub fn with_bound_then_unbind<R>(
        &self,
        action: impl FnOnce(&Self) -> R,
    ) -> Result<R, ShaderError> {
        self.bind()?;
        let _guard = UnbindGuard {
            context: self.context.as_ref(),
        };
        Ok(action(self))
    }

    /// The cached location of a named uniform, `-1` when absent.
    pub fn uniform_location(&self, name: &str) -> i32 {
        self.uniforms.location(name)
    }

    /// Whether the program has an active uniform of this name.
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.exists(name)
    }

    /// This program's uniform location cache.
    pub fn uniforms(&self) -> &UniformCache {
        &self.uniforms
    }

    /// The location of a named vertex attribute, `-1` when absent.
    pub fn attribute_location(&self, name: &str) -> i32 {
        self.context.backend().attribute_location(self.handle, name)
    }

    // --- Uniform setters ---
    // All setters resolve the location through the cache; setting a location
    // of -1 is a backend no-op, mirroring GL semantics for inactive uniforms.

    /// Sets a single integer uniform.
    pub fn set_int(&self, name: &str, value: i32) -> &Self {
        self.upload(name, UniformValue::Int(value))
    }

    /// Sets an `ivec2` uniform.
    pub fn set_ivec2(&self, name: &str, x: i32, y: i32) -> &Self {
        self.upload(name, UniformValue::IVec2(x, y))
    }

    /// Sets an `ivec3` uniform.
    pub fn set_ivec3(&self, name: &str, x: i32, y: i32, z: i32) -> &Self {
        self.upload(name, UniformValue::IVec3(x, y, z))
    }

    /// Sets an `ivec4` uniform.
    pub fn set_ivec4(&self, name: &str, x: i32, y: i32, z: i32, w: i32) -> &Self {
        self.upload(name, UniformValue::IVec4(x, y, z, w))
    }

    /// Sets a single float uniform.
    pub fn set_float(&self, name: &str, value: f32) -> &Self {
        self.upload(name, UniformValue::Float(value))
    }

    /// Sets a `vec2` uniform.
    pub fn set_vec2(&self, name: &str, x: f32, y: f32) -> &Self {
        self.upload(name, UniformValue::Vec2(x, y))
    }

    /// Sets a `vec3` uniform.
    pub fn set_vec3(&self, name: &str, x: f32, y: f32, z: f32) -> &Self {
        self.upload(name, UniformValue::Vec3(x, y, z))
    }

    /// Sets a `vec4` uniform.
    pub fn set_vec4(&self, name: &str, x: f32, y: f32, z: f32, w: f32) -> &Self {
        self.upload(name, UniformValue::Vec4(x, y, z, w))
    }

    /// Sets a boolean uniform, stored as 0/1.
    pub fn set_bool(&self, name: &str, value: bool) -> &Self {
        self.set_int(name, i32::from(value))
    }

    /// Sets an integer array uniform.
    pub fn set_int_array(&self, name: &str, values: &[i32]) -> &Self {
        self.upload(name, UniformValue::IntArray(values))
    }

    /// Sets a float array uniform.
    pub fn set_float_array(&self, name: &str, values: &[f32]) -> &Self {
        self.upload(name, UniformValue::FloatArray(values))
    }

    /// Sets a `mat2` uniform, column-major.
    pub fn set_mat2(&self, name: &str, matrix: &[f32; 4]) -> &Self {
        self.upload(name, UniformValue::Mat2(matrix))
    }

    /// Sets a `mat3` uniform, column-major.
    pub fn set_mat3(&self, name: &str, matrix: &[f32; 9]) -> &Self {
        self.upload(name, UniformValue::Mat3(matrix))
    }

    /// Sets a `mat4` uniform, column-major.
    pub fn set_mat4(&self, name: &str, matrix: &[f32; 16]) -> &Self {
        self.upload(name, UniformValue::Mat4(matrix))
    }

    /// Points a sampler uniform at a texture unit.
    pub fn set_sampler(&self, name: &str, texture_unit: i32) -> &Self {
        self.set_int(name, texture_unit)
    }

    /// Sets a float uniform only when it is active, for shader variants with
    /// differing uniform sets.
    pub fn set_float_if_present(&self, name: &str, value: f32) -> &Self {
        if self.has_uniform(name) {
            self.set_float(name, value);
        }
        self
    }

    fn upload(&self, name: &str, value: UniformValue<'_>) -> &Self {
        let location = self.uniforms.location(name);
        self.context.backend().set_uniform(location, value);
        self
    }

    /// Releases every backend resource owned by this program: unbinds it if
    /// it is the active one, detaches and disposes each owned stage, then
    /// deletes the program handle. Safe to call more than once.
    pub fn close(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.context.unbind_if_current(self.handle);
        let backend = self.context.backend();
        for stage in &self.stages {
            backend.detach(self.handle, stage.handle());
            stage.close();
        }
        backend.delete_program(self.handle);
        log::debug!("disposed shader program {:?}", self.handle);
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.close();
    }
}

// Unbinds on drop, so a scoped bind releases the context on every exit path,
// including unwinding out of the caller's closure.
struct UnbindGuard<'a> {
    context: &'a ShaderContext,
}

impl Drop for UnbindGuard<'_> {
    fn drop(&mut self) {
        self.context.unbind();
    }
}

/// Accumulates stage sources and performs the compile/link/validate
/// transition in [`ProgramBuilder::build`].
#[derive(Debug)]
pub struct ProgramBuilder {
    context: Arc<ShaderContext>,
    sources: Vec<ShaderSource>,
}

impl ProgramBuilder {
    /// Creates an empty builder on the given context.
    pub fn new(context: Arc<ShaderContext>) -> Self {
        Self {
            context,
            sources: Vec::new(),
        }
    }

    /// Adds a stage source.
    pub fn stage(mut self, source: ShaderSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Adds a vertex stage from raw source text.
    pub fn vertex(self, text: impl Into<String>) -> Self {
        self.stage(ShaderSource::new(text, "<vertex>", StageKind::Vertex))
    }

    /// Adds a fragment stage from raw source text.
    pub fn fragment(self, text: impl Into<String>) -> Self {
        self.stage(ShaderSource::new(text, "<fragment>", StageKind::Fragment))
    }

    /// Adds a geometry stage from raw source text.
    pub fn geometry(self, text: impl Into<String>) -> Self {
        self.stage(ShaderSource::new(text, "<geometry>", StageKind::Geometry))
    }

    /// Adds a compute stage from raw source text.
    pub fn compute(self, text: impl Into<String>) -> Self {
        self.stage(ShaderSource::new(text, "<compute>", StageKind::Compute))
    }

    /// Compiles every accumulated source, links them into a program, and
    /// validates the result.
    ///
    /// Validation failure is non-fatal and only logged; the program is still
    /// returned as usable.
    ///
    /// # Errors
    /// [`ShaderError::InvalidState`] when no stages were added (checked
    /// before any backend call), [`ShaderError::CompilationFailed`] or
    /// [`ShaderError::LinkingFailed`] from the backend, with all partially
    /// created backend objects released.
    pub fn build(self) -> Result<ShaderProgram, ShaderError> {
        if self.sources.is_empty() {
            return Err(ShaderError::InvalidState(
                "no shader stages attached to program".into(),
            ));
        }

        let mut stages = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            stages.push(CompiledStage::compile(Arc::clone(&self.context), source)?);
        }

        let backend = self.context.backend();
        let handle = backend.create_program();
        for stage in &stages {
            backend.attach(handle, stage.handle());
        }

        if let Err(log) = backend.link(handle) {
            for stage in &stages {
                backend.detach(handle, stage.handle());
                stage.close();
            }
            backend.delete_program(handle);
            return Err(ShaderError::LinkingFailed { log });
        }

        if let Err(log) = backend.validate(handle) {
            log::warn!("shader program {handle:?} failed validation: {log}");
        }

        log::debug!(
            "linked shader program {handle:?} from {} stage(s)",
            stages.len()
        );
        let uniforms = UniformCache::new(Arc::clone(&self.context), handle);
        Ok(ShaderProgram {
            context: self.context,
            handle,
            stages,
            uniforms,
            disposed: AtomicBool::new(false),
        })
    }
}
