//! Transform feedback capture objects.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::buffer::{Buffer, BufferMap};
use crate::device::{DrawMode, GlDevice, GlHandle};
use crate::program::Program;

/// A capture object plus the buffers it writes into.
///
/// Buffers are recorded by capture index and only attached to the GL object
/// between [`begin`](Self::begin) and [`end`](Self::end), so the same buffer
/// can be an attribute source for another pass in between.
#[derive(Debug)]
pub struct TransformFeedback {
    handle: GlHandle,
    buffers: BTreeMap<u32, Buffer>,
    unused: BufferMap,
}

impl TransformFeedback {
    pub fn new(device: &mut dyn GlDevice) -> Result<Self> {
        let handle = device.create_transform_feedback()?;
        Ok(Self {
            handle,
            buffers: BTreeMap::new(),
            unused: BufferMap::new(),
        })
    }

    pub fn handle(&self) -> GlHandle {
        self.handle
    }

    /// Replace all buffers, resolving names through `program`'s varyings.
    ///
    /// Names the program does not capture are kept aside in
    /// [`unused`](Self::unused) rather than rejected.
    pub fn set_buffers(&mut self, program: &Program, buffers: &BufferMap) {
        self.buffers.clear();
        self.unused.clear();
        for (name, buffer) in buffers {
            self.set_buffer(program, name, buffer.clone());
        }
    }

    pub fn set_buffer(&mut self, program: &Program, name: &str, buffer: Buffer) {
        match program.varying_location(name) {
            Some(index) => {
                self.buffers.insert(index, buffer);
            }
            None => {
                tracing::warn!(
                    varying = name,
                    "no varying captures this buffer, leaving it unused"
                );
                self.unused.insert(name.to_owned(), buffer);
            }
        }
    }

    pub fn buffer(&self, index: u32) -> Option<&Buffer> {
        self.buffers.get(&index)
    }

    pub fn buffers(&self) -> &BTreeMap<u32, Buffer> {
        &self.buffers
    }

    /// Buffers whose names matched no varying at the last `set_buffers`.
    pub fn unused(&self) -> &BufferMap {
        &self.unused
    }

    /// Bind the object, attach its buffers and start capturing.
    pub fn begin(&self, device: &mut dyn GlDevice, primitive: DrawMode) {
        device.bind_transform_feedback(self.handle);
        for (&index, buffer) in &self.buffers {
            device.bind_feedback_buffer(index, Some(buffer.handle()));
        }
        device.begin_transform_feedback(primitive.feedback_primitive());
    }

    /// Stop capturing and detach everything attached by `begin`.
    pub fn end(&self, device: &mut dyn GlDevice) {
        device.end_transform_feedback();
        for &index in self.buffers.keys() {
            device.bind_feedback_buffer(index, None);
        }
        device.bind_transform_feedback(0);
    }

    pub fn delete(self, device: &mut dyn GlDevice) {
        device.delete_transform_feedback(self.handle);
    }
}
