// backend.rs - Graphics Backend Abstraction Layer
//
// This module separates the hardware-specific shader calls from the lifecycle
// logic, allowing different graphics APIs (or test stubs) to be plugged in.
// All methods are expected to be invoked from the single thread owning the
// graphics context; see the crate documentation for the threading contract.

use crate::source::StageKind;
use std::fmt::Debug;

/// Opaque handle to a backend shader stage object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageHandle(pub u32);

/// Opaque handle to a backend program object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// A uniform value ready for upload, tagged by shape.
///
/// Keeping the whole scalar/vector/matrix surface in one enum gives the
/// backend a single upload entry point instead of one trait method per shape.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue<'a> {
    /// Single signed integer (also used for booleans and samplers).
    Int(i32),
    /// 2-component integer vector.
    IVec2(i32, i32),
    /// 3-component integer vector.
    IVec3(i32, i32, i32),
    /// 4-component integer vector.
    IVec4(i32, i32, i32, i32),
    /// Single float.
    Float(f32),
    /// 2-component float vector.
    Vec2(f32, f32),
    /// 3-component float vector.
    Vec3(f32, f32, f32),
    /// 4-component float vector.
    Vec4(f32, f32, f32, f32),
    /// Array of signed integers.
    IntArray(&'a [i32]),
    /// Array of floats.
    FloatArray(&'a [f32]),
    /// 2x2 matrix, column-major.
    Mat2(&'a [f32; 4]),
    /// 3x3 matrix, column-major.
    Mat3(&'a [f32; 9]),
    /// 4x4 matrix, column-major.
    Mat4(&'a [f32; 16]),
}

/// Trait defining the shader-related capabilities required from a graphics
/// backend.
///
/// Fallible calls report failure as the backend's diagnostic log; the
/// lifecycle layer converts those logs into typed [`crate::ShaderError`]
/// values and performs cleanup of partially created objects.
pub trait ShaderBackend: Send + Sync + Debug {
    /// Create a new shader stage object of the given kind.
    ///
    /// # Returns
    /// The new handle, or a message describing why creation failed.
    fn create_stage(&self, kind: StageKind) -> Result<StageHandle, String>;

    /// Upload source text to a stage object.
    fn set_source(&self, stage: StageHandle, text: &str);

    /// Compile a stage object.
    ///
    /// # Returns
    /// `Ok(())` on success, or the compiler's diagnostic log.
    fn compile(&self, stage: StageHandle) -> Result<(), String>;

    /// Delete a stage object.
    fn delete_stage(&self, stage: StageHandle);

    /// Create a new, empty program object.
    fn create_program(&self) -> ProgramHandle;

    /// Attach a compiled stage to a program.
    fn attach(&self, program: ProgramHandle, stage: StageHandle);

    /// Detach a stage from a program.
    fn detach(&self, program: ProgramHandle, stage: StageHandle);

    /// Link the attached stages into a complete program.
    ///
    /// # Returns
    /// `Ok(())` on success, or the linker's diagnostic log.
    fn link(&self, program: ProgramHandle) -> Result<(), String>;

    /// Validate a linked program against the current backend state.
    ///
    /// # Returns
    /// `Ok(())` on success, or the validation log. Validation failure is
    /// advisory; callers treat it as a warning, not an error.
    fn validate(&self, program: ProgramHandle) -> Result<(), String>;

    /// Delete a program object.
    fn delete_program(&self, program: ProgramHandle);

    /// Make `program` the active program, or deactivate with `None`.
    fn use_program(&self, program: Option<ProgramHandle>);

    /// Query the location of a named uniform. Returns `-1` when the uniform
    /// is not found or not active.
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> i32;

    /// Query the location of a named vertex attribute. Returns `-1` when the
    /// attribute is not found or not active.
    fn attribute_location(&self, program: ProgramHandle, name: &str) -> i32;

    /// Upload a uniform value to a resolved location.
    fn set_uniform(&self, location: i32, value: UniformValue<'_>);
}
