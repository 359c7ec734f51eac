//! [`GlDevice`] on the host's current OpenGL context.

use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::sync::Once;

use anyhow::{anyhow, Result};
use gl::types::{GLchar, GLenum, GLint, GLsizei, GLuint};

use luma_core::{GlslFeatures, GpuVendor, PlatformInfo, UniformValue};

use crate::buffer::BufferDesc;
use crate::device::{DrawMode, GlDevice, GlHandle};

static GL_INIT_ONCE: Once = Once::new();

/// OpenGL device wrapping whatever context is current on this thread.
///
/// GL function pointers are loaded exactly once via `gl_loader`. Every method
/// assumes the context that was current at [`RawGlDevice::new`] is still
/// current; using it from another thread or context is undefined behavior.
#[derive(Debug)]
pub struct RawGlDevice {
    platform: PlatformInfo,
    vao: GLuint,
}

impl RawGlDevice {
    pub fn new() -> Result<Self> {
        GL_INIT_ONCE.call_once(|| {
            gl_loader::init_gl();
            gl::load_with(|s| gl_loader::get_proc_address(s).cast());
        });

        // SAFETY: a context is current (documented precondition).
        unsafe {
            if gl::GetString(gl::VERSION).is_null() {
                return Err(anyhow!("No current OpenGL context"));
            }
            let platform = query_platform();

            let mut vao = 0;
            gl::GenVertexArrays(1, &mut vao);
            gl::BindVertexArray(vao);

            tracing::debug!(?platform, "OpenGL device ready");
            Ok(Self { platform, vao })
        }
    }
}

impl Drop for RawGlDevice {
    fn drop(&mut self) {
        if self.vao != 0 {
            unsafe {
                gl::BindVertexArray(0);
                gl::DeleteVertexArrays(1, &self.vao);
            }
        }
    }
}

unsafe fn gl_string(name: GLenum) -> String {
    let raw = gl::GetString(name);
    if raw.is_null() {
        String::new()
    } else {
        CStr::from_ptr(raw.cast::<c_char>()).to_string_lossy().into_owned()
    }
}

unsafe fn query_platform() -> PlatformInfo {
    let vendor = GpuVendor::detect(&format!(
        "{} {}",
        gl_string(gl::VENDOR),
        gl_string(gl::RENDERER)
    ));

    let mut major = 0;
    gl::GetIntegerv(gl::MAJOR_VERSION, &mut major);
    if major >= 3 {
        return PlatformInfo::es3(vendor);
    }

    let mut features = GlslFeatures::empty();
    for extension in gl_string(gl::EXTENSIONS).split_whitespace() {
        features |= GlslFeatures::from_extension(extension);
    }
    PlatformInfo::es1(vendor, features)
}

unsafe fn info_log(
    object: GLuint,
    get_iv: unsafe fn(GLuint, GLenum, *mut GLint),
    get_log: unsafe fn(GLuint, GLsizei, *mut GLsizei, *mut GLchar),
) -> String {
    let mut len = 0;
    get_iv(object, gl::INFO_LOG_LENGTH, &mut len);
    let mut buf = vec![0u8; len.max(1) as usize];
    let mut written = 0;
    get_log(object, buf.len() as GLsizei, &mut written, buf.as_mut_ptr().cast());
    buf.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buf).into_owned()
}

unsafe fn compile_shader(kind: GLenum, source: &str) -> Result<GLuint> {
    let c_source =
        CString::new(source).map_err(|_| anyhow!("Shader source contains a NUL byte"))?;
    let shader = gl::CreateShader(kind);
    gl::ShaderSource(shader, 1, &c_source.as_ptr(), ptr::null());
    gl::CompileShader(shader);

    let mut status = 0;
    gl::GetShaderiv(shader, gl::COMPILE_STATUS, &mut status);
    if status == 0 {
        let log = info_log(shader, gl::GetShaderiv, gl::GetShaderInfoLog);
        gl::DeleteShader(shader);
        let stage = if kind == gl::VERTEX_SHADER { "vertex" } else { "fragment" };
        return Err(anyhow!("Failed to compile {stage} shader: {log}"));
    }
    Ok(shader)
}

impl GlDevice for RawGlDevice {
    fn platform_info(&self) -> PlatformInfo {
        self.platform
    }

    fn create_buffer(&mut self, desc: &BufferDesc, data: Option<&[u8]>) -> Result<GlHandle> {
        let target = desc.target.gl_enum();
        let size = isize::try_from(desc.byte_length)
            .map_err(|_| anyhow!("Buffer of {} bytes is too large", desc.byte_length))?;
        let data_ptr = match data {
            Some(bytes) if bytes.len() != desc.byte_length => {
                return Err(anyhow!(
                    "Buffer data is {} bytes, expected {}",
                    bytes.len(),
                    desc.byte_length
                ))
            }
            Some(bytes) => bytes.as_ptr().cast(),
            None => ptr::null(),
        };

        unsafe {
            while gl::GetError() != gl::NO_ERROR {}

            let mut buffer = 0;
            gl::GenBuffers(1, &mut buffer);
            gl::BindBuffer(target, buffer);
            gl::BufferData(target, size, data_ptr, desc.usage.gl_enum());
            gl::BindBuffer(target, 0);

            let error = gl::GetError();
            if error != gl::NO_ERROR {
                gl::DeleteBuffers(1, &buffer);
                return Err(anyhow!(
                    "Failed to allocate buffer of {} bytes (GL error 0x{error:04X})",
                    desc.byte_length
                ));
            }
            Ok(buffer)
        }
    }

    fn delete_buffer(&mut self, buffer: GlHandle) {
        unsafe { gl::DeleteBuffers(1, &buffer) }
    }

    fn create_program(&mut self, vs: &str, fs: &str, varyings: &[String]) -> Result<GlHandle> {
        let c_varyings = varyings
            .iter()
            .map(|v| CString::new(v.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| anyhow!("Varying name contains a NUL byte"))?;
        let varying_ptrs: Vec<*const GLchar> = c_varyings.iter().map(|v| v.as_ptr()).collect();

        unsafe {
            let vertex = compile_shader(gl::VERTEX_SHADER, vs)?;
            let fragment = match compile_shader(gl::FRAGMENT_SHADER, fs) {
                Ok(shader) => shader,
                Err(e) => {
                    gl::DeleteShader(vertex);
                    return Err(e);
                }
            };

            let program = gl::CreateProgram();
            gl::AttachShader(program, vertex);
            gl::AttachShader(program, fragment);
            if !varying_ptrs.is_empty() {
                gl::TransformFeedbackVaryings(
                    program,
                    varying_ptrs.len() as GLsizei,
                    varying_ptrs.as_ptr(),
                    gl::SEPARATE_ATTRIBS,
                );
            }
            gl::LinkProgram(program);
            gl::DetachShader(program, vertex);
            gl::DetachShader(program, fragment);
            gl::DeleteShader(vertex);
            gl::DeleteShader(fragment);

            let mut status = 0;
            gl::GetProgramiv(program, gl::LINK_STATUS, &mut status);
            if status == 0 {
                let log = info_log(program, gl::GetProgramiv, gl::GetProgramInfoLog);
                gl::DeleteProgram(program);
                return Err(anyhow!("Failed to link program: {log}"));
            }
            Ok(program)
        }
    }

    fn delete_program(&mut self, program: GlHandle) {
        unsafe { gl::DeleteProgram(program) }
    }

    fn use_program(&mut self, program: GlHandle) {
        unsafe { gl::UseProgram(program) }
    }

    fn attribute_location(&self, program: GlHandle, name: &str) -> Option<u32> {
        let name = CString::new(name).ok()?;
        let location = unsafe { gl::GetAttribLocation(program, name.as_ptr()) };
        u32::try_from(location).ok()
    }

    fn bind_attribute(&mut self, location: u32, buffer: GlHandle, desc: &BufferDesc) {
        let layout = &desc.layout;
        let size = layout.size.clamp(1, 4) as GLint;
        let stride = layout.stride as GLsizei;
        let offset = layout.offset as usize as *const std::ffi::c_void;
        let element_type = desc.element_type.gl_enum();

        unsafe {
            gl::BindBuffer(gl::ARRAY_BUFFER, buffer);
            if desc.element_type.is_integer() && !layout.normalized {
                gl::VertexAttribIPointer(location, size, element_type, stride, offset);
            } else {
                let normalized = if layout.normalized { gl::TRUE } else { gl::FALSE };
                gl::VertexAttribPointer(location, size, element_type, normalized, stride, offset);
            }
            gl::VertexAttribDivisor(location, layout.divisor);
            gl::EnableVertexAttribArray(location);
            gl::BindBuffer(gl::ARRAY_BUFFER, 0);
        }
    }

    fn disable_attribute(&mut self, location: u32) {
        unsafe { gl::DisableVertexAttribArray(location) }
    }

    fn set_uniform(&mut self, program: GlHandle, name: &str, value: &UniformValue) {
        let Ok(c_name) = CString::new(name) else {
            return;
        };
        unsafe {
            let location = gl::GetUniformLocation(program, c_name.as_ptr());
            if location < 0 {
                tracing::trace!(uniform = name, "uniform not active in program");
                return;
            }
            match value {
                UniformValue::Bool(v) => gl::Uniform1i(location, GLint::from(*v)),
                UniformValue::Int(v) => gl::Uniform1i(location, *v),
                UniformValue::UInt(v) => gl::Uniform1ui(location, *v),
                UniformValue::Float(v) => gl::Uniform1f(location, *v),
                UniformValue::Vec2(v) => gl::Uniform2fv(location, 1, v.as_ptr()),
                UniformValue::Vec3(v) => gl::Uniform3fv(location, 1, v.as_ptr()),
                UniformValue::Vec4(v) => gl::Uniform4fv(location, 1, v.as_ptr()),
                UniformValue::Mat3(v) => gl::UniformMatrix3fv(location, 1, gl::FALSE, v.as_ptr()),
                UniformValue::Mat4(v) => gl::UniformMatrix4fv(location, 1, gl::FALSE, v.as_ptr()),
                UniformValue::FloatArray(v) => {
                    gl::Uniform1fv(location, v.len() as GLsizei, v.as_ptr())
                }
                UniformValue::IntArray(v) => {
                    gl::Uniform1iv(location, v.len() as GLsizei, v.as_ptr())
                }
            }
        }
    }

    fn create_transform_feedback(&mut self) -> Result<GlHandle> {
        let mut handle = 0;
        unsafe { gl::GenTransformFeedbacks(1, &mut handle) };
        if handle == 0 {
            return Err(anyhow!("Failed to create transform feedback object"));
        }
        Ok(handle)
    }

    fn delete_transform_feedback(&mut self, transform_feedback: GlHandle) {
        unsafe { gl::DeleteTransformFeedbacks(1, &transform_feedback) }
    }

    fn bind_transform_feedback(&mut self, transform_feedback: GlHandle) {
        unsafe { gl::BindTransformFeedback(gl::TRANSFORM_FEEDBACK, transform_feedback) }
    }

    fn bind_feedback_buffer(&mut self, index: u32, buffer: Option<GlHandle>) {
        unsafe { gl::BindBufferBase(gl::TRANSFORM_FEEDBACK_BUFFER, index, buffer.unwrap_or(0)) }
    }

    fn begin_transform_feedback(&mut self, primitive: DrawMode) {
        unsafe { gl::BeginTransformFeedback(primitive.gl_enum()) }
    }

    fn end_transform_feedback(&mut self) {
        unsafe { gl::EndTransformFeedback() }
    }

    fn set_rasterizer_discard(&mut self, enabled: bool) {
        unsafe {
            if enabled {
                gl::Enable(gl::RASTERIZER_DISCARD);
            } else {
                gl::Disable(gl::RASTERIZER_DISCARD);
            }
        }
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: usize, count: usize) {
        let first = GLint::try_from(first).unwrap_or(GLint::MAX);
        let count = GLsizei::try_from(count).unwrap_or(GLsizei::MAX);
        unsafe { gl::DrawArrays(mode.gl_enum(), first, count) }
    }
}
