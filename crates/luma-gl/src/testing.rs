//! A [`GlDevice`] that records commands instead of issuing them.
//!
//! Handles are handed out from a counter, attribute locations are assigned to
//! any name that appears in the program's vertex source, and link failures
//! can be scripted with [`RecordingDevice::fail_next_link`].

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, Result};

use luma_core::{GpuVendor, PlatformInfo, UniformValue};

use crate::buffer::BufferDesc;
use crate::device::{DrawMode, GlDevice, GlHandle};

/// One recorded driver command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateBuffer { buffer: GlHandle, byte_length: usize },
    DeleteBuffer(GlHandle),
    CreateProgram { program: GlHandle, varyings: Vec<String> },
    DeleteProgram(GlHandle),
    UseProgram(GlHandle),
    BindAttribute { location: u32, buffer: GlHandle },
    DisableAttribute(u32),
    SetUniform { name: String, value: UniformValue },
    CreateTransformFeedback(GlHandle),
    DeleteTransformFeedback(GlHandle),
    BindTransformFeedback(GlHandle),
    BindFeedbackBuffer { index: u32, buffer: Option<GlHandle> },
    BeginTransformFeedback(DrawMode),
    EndTransformFeedback,
    RasterizerDiscard(bool),
    DrawArrays { mode: DrawMode, first: usize, count: usize },
}

#[derive(Debug, Default)]
struct RecordedProgram {
    vs: String,
    fs: String,
    varyings: Vec<String>,
}

#[derive(Debug)]
pub struct RecordingDevice {
    platform: PlatformInfo,
    commands: Vec<Command>,
    next_handle: GlHandle,
    programs: BTreeMap<GlHandle, RecordedProgram>,
    live_buffers: BTreeSet<GlHandle>,
    link_failure: Option<String>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    /// A device reporting an ES 3.00 class context.
    pub fn new() -> Self {
        Self::with_platform(PlatformInfo::es3(GpuVendor::Unknown))
    }

    pub fn with_platform(platform: PlatformInfo) -> Self {
        Self {
            platform,
            commands: Vec::new(),
            next_handle: 1,
            programs: BTreeMap::new(),
            live_buffers: BTreeSet::new(),
            link_failure: None,
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Make the next `create_program` fail with `log`.
    pub fn fail_next_link(&mut self, log: impl Into<String>) {
        self.link_failure = Some(log.into());
    }

    /// Vertex and fragment source the program was linked from.
    pub fn program_source(&self, program: GlHandle) -> Option<(&str, &str)> {
        self.programs
            .get(&program)
            .map(|p| (p.vs.as_str(), p.fs.as_str()))
    }

    pub fn program_varyings(&self, program: GlHandle) -> Option<&[String]> {
        self.programs.get(&program).map(|p| p.varyings.as_slice())
    }

    /// Buffers created and not yet deleted.
    pub fn live_buffers(&self) -> &BTreeSet<GlHandle> {
        &self.live_buffers
    }

    pub fn is_live(&self, buffer: GlHandle) -> bool {
        self.live_buffers.contains(&buffer)
    }

    pub fn count(&self, matches: impl Fn(&Command) -> bool) -> usize {
        self.commands.iter().filter(|c| matches(c)).count()
    }

    fn next(&mut self) -> GlHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

/// Byte offset of the first whole-word mention of `name`.
fn find_word(source: &str, name: &str) -> Option<usize> {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    source.match_indices(name).map(|(at, _)| at).find(|&at| {
        let before = source[..at].chars().next_back();
        let after = source[at + name.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

impl GlDevice for RecordingDevice {
    fn platform_info(&self) -> PlatformInfo {
        self.platform
    }

    fn create_buffer(&mut self, desc: &BufferDesc, data: Option<&[u8]>) -> Result<GlHandle> {
        if let Some(data) = data {
            if data.len() != desc.byte_length {
                return Err(anyhow!(
                    "Buffer data is {} bytes, expected {}",
                    data.len(),
                    desc.byte_length
                ));
            }
        }
        let buffer = self.next();
        self.live_buffers.insert(buffer);
        self.commands.push(Command::CreateBuffer {
            buffer,
            byte_length: desc.byte_length,
        });
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: GlHandle) {
        self.live_buffers.remove(&buffer);
        self.commands.push(Command::DeleteBuffer(buffer));
    }

    fn create_program(&mut self, vs: &str, fs: &str, varyings: &[String]) -> Result<GlHandle> {
        if let Some(log) = self.link_failure.take() {
            return Err(anyhow!("Failed to link program: {log}"));
        }
        let program = self.next();
        self.programs.insert(
            program,
            RecordedProgram {
                vs: vs.to_owned(),
                fs: fs.to_owned(),
                varyings: varyings.to_vec(),
            },
        );
        self.commands.push(Command::CreateProgram {
            program,
            varyings: varyings.to_vec(),
        });
        Ok(program)
    }

    fn delete_program(&mut self, program: GlHandle) {
        self.programs.remove(&program);
        self.commands.push(Command::DeleteProgram(program));
    }

    fn use_program(&mut self, program: GlHandle) {
        self.commands.push(Command::UseProgram(program));
    }

    fn attribute_location(&self, program: GlHandle, name: &str) -> Option<u32> {
        let program = self.programs.get(&program)?;
        let at = find_word(&program.vs, name)?;
        // one location per statement preceding the declaration
        u32::try_from(program.vs[..at].matches(';').count()).ok()
    }

    fn bind_attribute(&mut self, location: u32, buffer: GlHandle, _desc: &BufferDesc) {
        self.commands.push(Command::BindAttribute { location, buffer });
    }

    fn disable_attribute(&mut self, location: u32) {
        self.commands.push(Command::DisableAttribute(location));
    }

    fn set_uniform(&mut self, _program: GlHandle, name: &str, value: &UniformValue) {
        self.commands.push(Command::SetUniform {
            name: name.to_owned(),
            value: value.clone(),
        });
    }

    fn create_transform_feedback(&mut self) -> Result<GlHandle> {
        let handle = self.next();
        self.commands.push(Command::CreateTransformFeedback(handle));
        Ok(handle)
    }

    fn delete_transform_feedback(&mut self, transform_feedback: GlHandle) {
        self.commands
            .push(Command::DeleteTransformFeedback(transform_feedback));
    }

    fn bind_transform_feedback(&mut self, transform_feedback: GlHandle) {
        self.commands
            .push(Command::BindTransformFeedback(transform_feedback));
    }

    fn bind_feedback_buffer(&mut self, index: u32, buffer: Option<GlHandle>) {
        self.commands
            .push(Command::BindFeedbackBuffer { index, buffer });
    }

    fn begin_transform_feedback(&mut self, primitive: DrawMode) {
        self.commands.push(Command::BeginTransformFeedback(primitive));
    }

    fn end_transform_feedback(&mut self) {
        self.commands.push(Command::EndTransformFeedback);
    }

    fn set_rasterizer_discard(&mut self, enabled: bool) {
        self.commands.push(Command::RasterizerDiscard(enabled));
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: usize, count: usize) {
        self.commands.push(Command::DrawArrays { mode, first, count });
    }
}
