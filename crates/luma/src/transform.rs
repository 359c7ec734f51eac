//! Iterative GPU computation through transform feedback.
//!
//! A [`Transform`] owns a capture program and two buffer slots. Each
//! [`run`](Transform::run) reads the current slot's source buffers as vertex
//! attributes and captures the program's varyings into the current slot's
//! feedback buffers. With a feedback map (`source name -> feedback name`)
//! whose sources all exist, [`swap`](Transform::swap) flips to the other slot,
//! where every mapped pair has traded roles, so the next pass reads what the
//! previous one wrote without a copy.

use std::collections::BTreeMap;

use luma_core::{parse_version_directive, ModuleOptions, UniformMap, UniformValue};
use luma_gl::{Buffer, BufferMap, DrawMode, GlDevice, Program, TransformFeedback};
use luma_shadertools::{
    assemble_shaders, AssembleOptions, ModuleRegistry, ShaderDefines, UniformComposer,
};

use crate::error::{Result, TransformError};

/// Source buffer name to the feedback buffer name that captures its next value.
pub type FeedbackMap = BTreeMap<String, String>;

const FS_BODY: &str = "void main() {}\n";

/// Everything [`Transform::initialize`] needs.
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    pub id: Option<String>,
    pub vs: String,
    /// Captured varyings, in capture index order. Defaults to the values of
    /// `feedback_map`.
    pub varyings: Vec<String>,
    pub feedback_map: Option<FeedbackMap>,
    pub source_buffers: BufferMap,
    pub feedback_buffers: BufferMap,
    pub element_count: usize,
    pub draw_mode: DrawMode,
    pub modules: Vec<String>,
    pub defines: ShaderDefines,
}

impl TransformOptions {
    pub fn new(vs: impl Into<String>) -> Self {
        Self {
            vs: vs.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn varyings<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.varyings = names.into_iter().map(Into::into).collect();
        self
    }

    /// Map `source` to the `feedback` varying that holds its next value.
    #[must_use]
    pub fn feedback(mut self, source: impl Into<String>, feedback: impl Into<String>) -> Self {
        self.feedback_map
            .get_or_insert_with(FeedbackMap::new)
            .insert(source.into(), feedback.into());
        self
    }

    #[must_use]
    pub fn source_buffer(mut self, name: impl Into<String>, buffer: Buffer) -> Self {
        self.source_buffers.insert(name.into(), buffer);
        self
    }

    #[must_use]
    pub fn feedback_buffer(mut self, name: impl Into<String>, buffer: Buffer) -> Self {
        self.feedback_buffers.insert(name.into(), buffer);
        self
    }

    #[must_use]
    pub fn element_count(mut self, count: usize) -> Self {
        self.element_count = count;
        self
    }

    #[must_use]
    pub fn draw_mode(mut self, mode: DrawMode) -> Self {
        self.draw_mode = mode;
        self
    }

    #[must_use]
    pub fn modules<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules = names.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn define(mut self, name: &str, value: impl Into<String>) -> Self {
        self.defines.set(name, value);
        self
    }
}

/// Per-pass inputs for [`Transform::run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Applied after module uniforms, so these win on a name clash.
    pub uniforms: UniformMap,
    /// Handed to every module's uniform provider.
    pub module_options: ModuleOptions,
    /// Attributes to disable again once the pass is done.
    pub unbind: Vec<String>,
}

impl RunOptions {
    #[must_use]
    pub fn uniform(mut self, name: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.uniforms.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn module_option(
        mut self,
        name: impl Into<String>,
        value: impl Into<UniformValue>,
    ) -> Self {
        self.module_options.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn unbind(mut self, attribute: impl Into<String>) -> Self {
        self.unbind.push(attribute.into());
        self
    }
}

/// Buffers for [`Transform::update`]. Only the sets given are touched.
#[derive(Debug, Clone, Default)]
pub struct BufferUpdate {
    pub source_buffers: Option<BufferMap>,
    pub feedback_buffers: Option<BufferMap>,
    pub element_count: Option<usize>,
}

impl BufferUpdate {
    #[must_use]
    pub fn source(mut self, name: impl Into<String>, buffer: Buffer) -> Self {
        self.source_buffers
            .get_or_insert_with(BufferMap::new)
            .insert(name.into(), buffer);
        self
    }

    #[must_use]
    pub fn feedback(mut self, name: impl Into<String>, buffer: Buffer) -> Self {
        self.feedback_buffers
            .get_or_insert_with(BufferMap::new)
            .insert(name.into(), buffer);
        self
    }

    #[must_use]
    pub fn element_count(mut self, count: usize) -> Self {
        self.element_count = Some(count);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformPhase {
    /// Initialized, nothing captured yet.
    Ready,
    /// At least one pass has run.
    Iterating,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    source: BufferMap,
    feedback: BufferMap,
}

/// Double-buffered transform feedback runner.
#[derive(Debug)]
pub struct Transform {
    program: Program,
    slots: [Slot; 2],
    /// One capture object per slot once swapping is possible, one otherwise.
    feedback_objects: Vec<TransformFeedback>,
    feedback_map: Option<FeedbackMap>,
    /// Buffers this transform allocated; everything else is the caller's.
    owned: Vec<Buffer>,
    current: usize,
    swap_eligible: bool,
    swap_pending: bool,
    element_count: usize,
    draw_mode: DrawMode,
    uniforms: UniformComposer,
    phase: TransformPhase,
}

impl Transform {
    /// Build the capture program and the first buffer slot.
    ///
    /// Feedback buffers named by the feedback map but not supplied are
    /// allocated with the layout of their source buffer.
    pub fn initialize(
        device: &mut dyn GlDevice,
        registry: &ModuleRegistry,
        options: TransformOptions,
    ) -> Result<Self> {
        let varyings = if options.varyings.is_empty() {
            options
                .feedback_map
                .as_ref()
                .map(|map| map.values().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        } else {
            options.varyings.clone()
        };
        if varyings.is_empty() {
            return Err(TransformError::Configuration(
                "either varyings or a feedback map must be given".into(),
            ));
        }
        if options.source_buffers.is_empty() {
            return Err(TransformError::Configuration(
                "at least one source buffer is required".into(),
            ));
        }
        if let Some((name, _)) = options
            .feedback_buffers
            .iter()
            .find(|(_, buffer)| buffer.byte_length() == 0)
        {
            return Err(TransformError::Configuration(format!(
                "feedback buffer `{name}` has no storage to capture into"
            )));
        }

        // the fragment stage declares exactly what the vertex stage declares
        let fs = match options
            .vs
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| parse_version_directive(line).is_some())
        {
            Some(directive) => format!("{directive}\n{FS_BODY}"),
            None => FS_BODY.to_owned(),
        };
        let mut assemble = AssembleOptions::new(options.vs.as_str(), fs).modules(&options.modules);
        assemble.defines = options.defines.clone();
        if let Some(id) = &options.id {
            assemble = assemble.id(id.as_str());
        }
        let shader = assemble_shaders(registry, &device.platform_info(), &assemble)?;
        let program = Program::new(device, &shader.vs, &shader.fs, varyings)?;

        let swap_eligible = Self::can_swap(options.feedback_map.as_ref(), &options.source_buffers);
        let mut transform = Self {
            program,
            slots: [
                Slot {
                    source: options.source_buffers,
                    feedback: options.feedback_buffers,
                },
                Slot::default(),
            ],
            feedback_objects: Vec::with_capacity(2),
            feedback_map: options.feedback_map,
            owned: Vec::new(),
            current: 0,
            swap_eligible,
            swap_pending: true,
            element_count: options.element_count,
            draw_mode: options.draw_mode,
            uniforms: shader.uniforms,
            phase: TransformPhase::Ready,
        };

        if let Err(err) = transform.setup(device) {
            transform.delete(device);
            return Err(err);
        }

        tracing::debug!(
            id = options.id.as_deref().unwrap_or("<unnamed>"),
            swap_eligible,
            elements = transform.element_count,
            "initialized transform"
        );
        Ok(transform)
    }

    fn setup(&mut self, device: &mut dyn GlDevice) -> Result<()> {
        self.derive_feedback_buffers(device)?;
        let objects = if self.swap_eligible { 2 } else { 1 };
        for _ in 0..objects {
            self.feedback_objects.push(TransformFeedback::new(device)?);
        }
        self.bind_current_feedback();
        Ok(())
    }

    fn can_swap(map: Option<&FeedbackMap>, source: &BufferMap) -> bool {
        map.is_some_and(|map| !map.is_empty() && map.keys().all(|name| source.contains_key(name)))
    }

    /// Allocate mapped feedback buffers the current slot lacks, and replace
    /// owned ones that no longer match their source's layout.
    fn derive_feedback_buffers(&mut self, device: &mut dyn GlDevice) -> Result<()> {
        let Some(map) = &self.feedback_map else {
            return Ok(());
        };
        let slot = &mut self.slots[self.current];
        for (source_name, feedback_name) in map {
            let Some(source) = slot.source.get(source_name) else {
                continue;
            };
            let stale = match slot.feedback.get(feedback_name) {
                None => false,
                Some(existing)
                    if self.owned.contains(existing)
                        && !existing.desc().same_layout(source.desc()) =>
                {
                    true
                }
                Some(_) => continue,
            };
            let buffer = Buffer::with_same_layout(device, source)?;
            tracing::debug!(
                source = source_name.as_str(),
                feedback = feedback_name.as_str(),
                bytes = buffer.byte_length(),
                stale,
                "allocated feedback buffer"
            );
            self.owned.push(buffer.clone());
            slot.feedback.insert(feedback_name.clone(), buffer);
        }
        Ok(())
    }

    /// Delete owned buffers the current slot no longer refers to.
    fn release_unreferenced(&mut self, device: &mut dyn GlDevice) {
        let slot = &self.slots[self.current];
        let (keep, release): (Vec<_>, Vec<_>) = self.owned.drain(..).partition(|buffer| {
            slot.source.values().any(|b| b == buffer) || slot.feedback.values().any(|b| b == buffer)
        });
        for buffer in release {
            tracing::debug!(id = buffer.id(), "releasing replaced feedback buffer");
            buffer.delete(device);
        }
        self.owned = keep;
    }

    fn bind_current_feedback(&mut self) {
        let slot = &self.slots[self.current];
        self.feedback_objects[self.current].set_buffers(&self.program, &slot.feedback);
    }

    /// Run one capture pass over the current slot. Rasterization is
    /// discarded for the duration of the draw.
    pub fn run(&mut self, device: &mut dyn GlDevice, options: &RunOptions) {
        let program = self.program.handle();
        let slot = &self.slots[self.current];
        device.use_program(program);

        let mut bound = Vec::with_capacity(slot.source.len());
        for (name, buffer) in &slot.source {
            match device.attribute_location(program, name) {
                Some(location) => {
                    device.bind_attribute(location, buffer.handle(), buffer.desc());
                    bound.push((name.as_str(), location));
                }
                None => tracing::trace!(attribute = name.as_str(), "not an active attribute"),
            }
        }

        let mut uniforms = self.uniforms.get_uniforms(&options.module_options);
        uniforms.extend(options.uniforms.iter().map(|(k, v)| (k.clone(), v.clone())));
        for (name, value) in &uniforms {
            device.set_uniform(program, name, value);
        }

        let feedback = &self.feedback_objects[self.current];
        device.set_rasterizer_discard(true);
        feedback.begin(device, self.draw_mode);
        device.draw_arrays(self.draw_mode, 0, self.element_count);
        feedback.end(device);
        device.set_rasterizer_discard(false);

        for (name, location) in bound {
            if options.unbind.iter().any(|n| n == name) {
                device.disable_attribute(location);
            }
        }

        tracing::trace!(
            slot = self.current,
            elements = self.element_count,
            attributes = slot.source.len(),
            "ran transform pass"
        );
        self.phase = TransformPhase::Iterating;
    }

    /// Make the other slot current, its mapped buffers having traded roles.
    pub fn swap(&mut self) -> Result<()> {
        if !self.swap_eligible {
            return Err(TransformError::InvalidOperation(
                "swap needs a feedback map whose source buffers all exist".into(),
            ));
        }
        if self.swap_pending {
            self.setup_swap_buffers();
        }
        self.current = 1 - self.current;
        tracing::trace!(slot = self.current, "swapped transform buffers");
        Ok(())
    }

    fn setup_swap_buffers(&mut self) {
        let next = 1 - self.current;
        let current = &self.slots[self.current];
        let mut slot = current.clone();
        if let Some(map) = &self.feedback_map {
            for (source_name, feedback_name) in map {
                if let (Some(source), Some(feedback)) = (
                    current.source.get(source_name),
                    current.feedback.get(feedback_name),
                ) {
                    slot.source.insert(source_name.clone(), feedback.clone());
                    slot.feedback.insert(feedback_name.clone(), source.clone());
                }
            }
        }
        self.feedback_objects[next].set_buffers(&self.program, &slot.feedback);
        self.slots[next] = slot;
        self.swap_pending = false;
    }

    /// Merge new buffers into the current slot.
    ///
    /// The other slot is rebuilt on the next [`swap`](Self::swap). Owned
    /// buffers displaced by caller buffers are deleted. With no buffer sets
    /// given this logs a warning and changes nothing.
    pub fn update(&mut self, device: &mut dyn GlDevice, update: BufferUpdate) -> Result<()> {
        if update.source_buffers.is_none() && update.feedback_buffers.is_none() {
            tracing::warn!("transform update without buffers, ignoring");
            return Ok(());
        }

        let slot = &mut self.slots[self.current];
        if let Some(source) = update.source_buffers {
            slot.source.extend(source);
        }
        if let Some(feedback) = update.feedback_buffers {
            slot.feedback.extend(feedback);
        }
        if let Some(count) = update.element_count {
            self.element_count = count;
        }

        self.derive_feedback_buffers(device)?;
        self.release_unreferenced(device);

        if !self.swap_eligible
            && Self::can_swap(self.feedback_map.as_ref(), &self.slots[self.current].source)
        {
            while self.feedback_objects.len() < 2 {
                self.feedback_objects.push(TransformFeedback::new(device)?);
            }
            self.swap_eligible = true;
            tracing::debug!("transform became swap eligible");
        }

        self.bind_current_feedback();
        self.swap_pending = true;
        Ok(())
    }

    /// The current slot's feedback buffer named `name`.
    pub fn get_buffer(&self, name: &str) -> Result<&Buffer> {
        self.slots[self.current]
            .feedback
            .get(name)
            .ok_or_else(|| TransformError::NotFound(format!("feedback buffer `{name}`")))
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_swap_eligible(&self) -> bool {
        self.swap_eligible
    }

    pub fn phase(&self) -> TransformPhase {
        self.phase
    }

    /// Source buffers of slot `0` or `1`.
    ///
    /// # Panics
    ///
    /// If `slot` is greater than 1.
    pub fn source_buffers(&self, slot: usize) -> &BufferMap {
        &self.slots[slot].source
    }

    /// Feedback buffers of slot `0` or `1`.
    ///
    /// # Panics
    ///
    /// If `slot` is greater than 1.
    pub fn feedback_buffers(&self, slot: usize) -> &BufferMap {
        &self.slots[slot].feedback
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Release the program, the capture objects and every buffer this
    /// transform allocated. Caller buffers are left alone.
    pub fn delete(self, device: &mut dyn GlDevice) {
        for buffer in &self.owned {
            buffer.delete(device);
        }
        for feedback in self.feedback_objects {
            feedback.delete(device);
        }
        self.program.delete(device);
    }
}

#[cfg(test)]
mod tests {
    use luma_gl::testing::{Command, RecordingDevice};
    use luma_gl::BufferDesc;

    use super::*;

    const VS: &str = "#version 300 es\nin float value;\nout float doubled;\n\
                      void main() { doubled = value * 2.0; }\n";

    #[test]
    fn varyings_default_to_feedback_map_values() {
        let mut device = RecordingDevice::new();
        let value = Buffer::new(&mut device, BufferDesc::new(16)).unwrap();
        let options = TransformOptions::new(VS)
            .feedback("value", "doubled")
            .source_buffer("value", value);
        let transform =
            Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap();

        assert_eq!(transform.program().varyings(), ["doubled"]);
        assert!(transform.is_swap_eligible());
        assert_eq!(transform.phase(), TransformPhase::Ready);
    }

    #[test]
    fn explicit_varyings_win() {
        let mut device = RecordingDevice::new();
        let value = Buffer::new(&mut device, BufferDesc::new(16)).unwrap();
        let options = TransformOptions::new(VS)
            .varyings(["doubled", "gl_Position"])
            .feedback("value", "doubled")
            .source_buffer("value", value);
        let transform =
            Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap();

        assert_eq!(transform.program().varyings(), ["doubled", "gl_Position"]);
    }

    #[test]
    fn one_capture_object_without_feedback_map() {
        let mut device = RecordingDevice::new();
        let value = Buffer::new(&mut device, BufferDesc::new(16)).unwrap();
        let options = TransformOptions::new(VS)
            .varyings(["doubled"])
            .source_buffer("value", value);
        let transform =
            Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap();

        assert!(!transform.is_swap_eligible());
        assert_eq!(
            device.count(|c| matches!(c, Command::CreateTransformFeedback(_))),
            1
        );
    }
}
