//! Linked programs that capture vertex output.

use anyhow::Result;

use crate::device::{GlDevice, GlHandle};

/// A linked program and the varyings it captures, in capture-index order.
#[derive(Debug, PartialEq, Eq)]
pub struct Program {
    handle: GlHandle,
    varyings: Vec<String>,
}

impl Program {
    pub fn new(
        device: &mut dyn GlDevice,
        vs: &str,
        fs: &str,
        varyings: Vec<String>,
    ) -> Result<Self> {
        let handle = device.create_program(vs, fs, &varyings)?;
        tracing::debug!(handle, ?varyings, "linked transform feedback program");
        Ok(Self { handle, varyings })
    }

    pub fn handle(&self) -> GlHandle {
        self.handle
    }

    pub fn varyings(&self) -> &[String] {
        &self.varyings
    }

    /// Capture index of `name`.
    pub fn varying_location(&self, name: &str) -> Option<u32> {
        self.varyings
            .iter()
            .position(|v| v == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    pub fn delete(self, device: &mut dyn GlDevice) {
        device.delete_program(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Command, RecordingDevice};

    #[test]
    fn varying_locations_follow_declaration_order() {
        let mut device = RecordingDevice::new();
        let program = Program::new(
            &mut device,
            "void main() {}",
            "void main() {}",
            vec!["outPosition".into(), "outVelocity".into()],
        )
        .unwrap();

        assert_eq!(program.varying_location("outVelocity"), Some(1));
        assert_eq!(program.varying_location("outColor"), None);

        let handle = program.handle();
        program.delete(&mut device);
        assert_eq!(device.commands().last(), Some(&Command::DeleteProgram(handle)));
    }

    #[test]
    fn link_failures_surface() {
        let mut device = RecordingDevice::new();
        device.fail_next_link("error: 'foo' undeclared");
        let err = Program::new(&mut device, "void main() { foo; }", "void main() {}", vec![])
            .unwrap_err();
        assert!(err.to_string().contains("'foo' undeclared"));
    }
}
