//! Transform Feedback Tests
//!
//! Tests for:
//! - Configuration errors at initialize
//! - The capture pass command sequence and repeated runs
//! - Ping-pong swapping and swap eligibility
//! - Buffer updates and ownership of auto-created buffers
//! - Program assembly (fragment version, modules, uniforms)

use luma::luma_gl::testing::{Command, RecordingDevice};
use luma::{
    Buffer, BufferDesc, BufferLayout, BufferUpdate, DrawMode, ElementType, ModuleOptions,
    ModuleRegistry, RunOptions, ShaderModule, Transform, TransformError, TransformOptions,
    TransformPhase, UniformMap, UniformValue,
};

const VS: &str = "#version 300 es\n\
in vec2 posIn;\n\
out vec2 posOut;\n\
uniform float dt;\n\
void main() { posOut = posIn + vec2(dt); }\n";

fn vec2_buffer(device: &mut RecordingDevice, vertices: usize) -> Buffer {
    let desc = BufferDesc::default().layout(BufferLayout::with_size(2));
    Buffer::from_slice(device, desc, &vec![0.0f32; vertices * 2]).unwrap()
}

fn ping_pong(device: &mut RecordingDevice) -> (Transform, Buffer) {
    let positions = vec2_buffer(device, 4);
    let options = TransformOptions::new(VS)
        .id("particles")
        .feedback("posIn", "posOut")
        .source_buffer("posIn", positions.clone())
        .element_count(4);
    let transform = Transform::initialize(device, &ModuleRegistry::new(), options).unwrap();
    (transform, positions)
}

fn captured_buffers(commands: &[Command]) -> Vec<u32> {
    commands
        .iter()
        .filter_map(|c| match c {
            Command::BindFeedbackBuffer {
                buffer: Some(buffer),
                ..
            } => Some(*buffer),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn missing_varyings_and_map_is_rejected() {
    let mut device = RecordingDevice::new();
    let positions = vec2_buffer(&mut device, 4);
    let options = TransformOptions::new(VS).source_buffer("posIn", positions);

    let err = Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap_err();
    assert!(matches!(err, TransformError::Configuration(_)));
}

#[test]
fn empty_source_buffers_are_rejected() {
    let mut device = RecordingDevice::new();
    let options = TransformOptions::new(VS).feedback("posIn", "posOut");

    let err = Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap_err();
    assert!(matches!(err, TransformError::Configuration(_)));
}

#[test]
fn empty_feedback_buffer_is_rejected() {
    let mut device = RecordingDevice::new();
    let positions = vec2_buffer(&mut device, 4);
    let empty = Buffer::new(&mut device, BufferDesc::new(0)).unwrap();
    let options = TransformOptions::new(VS)
        .feedback("posIn", "posOut")
        .source_buffer("posIn", positions)
        .feedback_buffer("posOut", empty);

    let err = Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap_err();
    assert!(matches!(err, TransformError::Configuration(_)));
}

#[test]
fn link_failure_surfaces_driver_log() {
    let mut device = RecordingDevice::new();
    let positions = vec2_buffer(&mut device, 4);
    device.fail_next_link("varying posOut not written");
    let options = TransformOptions::new(VS)
        .feedback("posIn", "posOut")
        .source_buffer("posIn", positions);

    let err = Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap_err();
    assert!(matches!(err, TransformError::Device(_)));
    assert!(err.to_string().contains("varying posOut not written"));
}

#[test]
fn unknown_module_fails_initialize() {
    let mut device = RecordingDevice::new();
    let positions = vec2_buffer(&mut device, 4);
    let options = TransformOptions::new(VS)
        .feedback("posIn", "posOut")
        .source_buffer("posIn", positions)
        .modules(["missing"]);

    let err = Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap_err();
    assert!(matches!(err, TransformError::Shader(_)));
}

// ============================================================================
// Running
// ============================================================================

#[test]
fn run_captures_with_rasterizer_discarded() {
    let mut device = RecordingDevice::new();
    let (mut transform, positions) = ping_pong(&mut device);
    let program = transform.program().handle();
    let feedback = transform.get_buffer("posOut").unwrap().handle();
    device.clear_commands();

    transform.run(&mut device, &RunOptions::default().uniform("dt", 0.5_f32));

    let commands = device.commands();
    assert_eq!(commands[0], Command::UseProgram(program));
    assert!(matches!(
        commands[1],
        Command::BindAttribute { buffer, .. } if buffer == positions.handle()
    ));
    assert_eq!(
        commands[2],
        Command::SetUniform {
            name: "dt".into(),
            value: UniformValue::Float(0.5)
        }
    );

    let tail = &commands[3..];
    assert_eq!(tail[0], Command::RasterizerDiscard(true));
    assert!(matches!(tail[1], Command::BindTransformFeedback(h) if h != 0));
    assert_eq!(
        tail[2],
        Command::BindFeedbackBuffer {
            index: 0,
            buffer: Some(feedback)
        }
    );
    assert_eq!(tail[3], Command::BeginTransformFeedback(DrawMode::Points));
    assert_eq!(
        tail[4],
        Command::DrawArrays {
            mode: DrawMode::Points,
            first: 0,
            count: 4
        }
    );
    assert_eq!(tail[5], Command::EndTransformFeedback);
    assert_eq!(tail[tail.len() - 1], Command::RasterizerDiscard(false));
    assert_eq!(transform.phase(), TransformPhase::Iterating);
}

#[test]
fn repeated_runs_overwrite_the_same_buffers() {
    let mut device = RecordingDevice::new();
    let (mut transform, _) = ping_pong(&mut device);
    device.clear_commands();

    transform.run(&mut device, &RunOptions::default());
    transform.run(&mut device, &RunOptions::default());

    assert_eq!(transform.current_index(), 0);
    let captured = captured_buffers(device.commands());
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0], captured[1]);
}

#[test]
fn unbind_disables_named_attributes() {
    let mut device = RecordingDevice::new();
    let (mut transform, _) = ping_pong(&mut device);
    device.clear_commands();

    transform.run(&mut device, &RunOptions::default().unbind("posIn"));
    assert_eq!(device.count(|c| matches!(c, Command::DisableAttribute(_))), 1);

    transform.run(&mut device, &RunOptions::default());
    assert_eq!(device.count(|c| matches!(c, Command::DisableAttribute(_))), 1);
}

#[test]
fn draw_mode_selects_capture_primitive() {
    let mut device = RecordingDevice::new();
    let positions = vec2_buffer(&mut device, 6);
    let options = TransformOptions::new(VS)
        .feedback("posIn", "posOut")
        .source_buffer("posIn", positions)
        .element_count(6)
        .draw_mode(DrawMode::TriangleStrip);
    let mut transform =
        Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap();

    transform.run(&mut device, &RunOptions::default());
    assert_eq!(
        device.count(|c| *c == Command::BeginTransformFeedback(DrawMode::Triangles)),
        1
    );
}

// ============================================================================
// Swapping
// ============================================================================

#[test]
fn swap_hands_feedback_to_next_source() {
    let mut device = RecordingDevice::new();
    let (mut transform, positions) = ping_pong(&mut device);
    let captured = transform.feedback_buffers(0)["posOut"].clone();

    transform.run(&mut device, &RunOptions::default());
    transform.swap().unwrap();

    assert_eq!(transform.current_index(), 1);
    assert_eq!(transform.source_buffers(1)["posIn"], captured);
    assert_eq!(transform.feedback_buffers(1)["posOut"], positions);
    assert_eq!(transform.get_buffer("posOut").unwrap(), &positions);
}

#[test]
fn swapping_alternates_between_two_slots() {
    let mut device = RecordingDevice::new();
    let (mut transform, positions) = ping_pong(&mut device);
    let created = transform.get_buffer("posOut").unwrap().clone();
    device.clear_commands();

    for _ in 0..4 {
        transform.run(&mut device, &RunOptions::default());
        transform.swap().unwrap();
    }

    assert_eq!(transform.current_index(), 0);
    assert_eq!(
        captured_buffers(device.commands()),
        [
            created.handle(),
            positions.handle(),
            created.handle(),
            positions.handle()
        ]
    );
    assert_eq!(
        device.count(|c| matches!(c, Command::CreateBuffer { .. })),
        0
    );
}

#[test]
fn swap_without_feedback_map_is_invalid() {
    let mut device = RecordingDevice::new();
    let positions = vec2_buffer(&mut device, 4);
    let output = vec2_buffer(&mut device, 4);
    let options = TransformOptions::new(VS)
        .varyings(["posOut"])
        .source_buffer("posIn", positions)
        .feedback_buffer("posOut", output);
    let mut transform =
        Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap();

    transform.run(&mut device, &RunOptions::default());
    let err = transform.swap().unwrap_err();
    assert!(matches!(err, TransformError::InvalidOperation(_)));
    assert_eq!(transform.current_index(), 0);
}

#[test]
fn map_naming_absent_source_is_not_swappable() {
    let mut device = RecordingDevice::new();
    let velocity = vec2_buffer(&mut device, 4);
    let options = TransformOptions::new(VS)
        .feedback("posIn", "posOut")
        .source_buffer("velocity", velocity);
    let mut transform =
        Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap();

    assert!(!transform.is_swap_eligible());
    assert!(transform.feedback_buffers(0).is_empty());
    assert!(matches!(transform.swap(), Err(TransformError::InvalidOperation(_))));
}

#[test]
fn get_buffer_reports_missing_names() {
    let mut device = RecordingDevice::new();
    let (transform, _) = ping_pong(&mut device);

    assert!(transform.get_buffer("posOut").is_ok());
    assert!(matches!(
        transform.get_buffer("velocityOut"),
        Err(TransformError::NotFound(_))
    ));
}

// ============================================================================
// Updates and ownership
// ============================================================================

#[test]
fn auto_created_feedback_copies_source_layout() {
    let mut device = RecordingDevice::new();
    let (transform, positions) = ping_pong(&mut device);
    let created = transform.get_buffer("posOut").unwrap();

    assert_ne!(created, &positions);
    assert!(created.desc().same_layout(positions.desc()));
    assert_eq!(created.element_type(), ElementType::Float);
    assert_eq!(created.vertex_count(), 4);
}

#[test]
fn delete_spares_caller_buffers() {
    let mut device = RecordingDevice::new();
    let (transform, positions) = ping_pong(&mut device);
    let created = transform.get_buffer("posOut").unwrap().clone();
    let program = transform.program().handle();

    transform.delete(&mut device);

    assert!(device.is_live(positions.handle()));
    assert!(!device.is_live(created.handle()));
    assert_eq!(device.count(|c| *c == Command::DeleteProgram(program)), 1);
    assert_eq!(
        device.count(|c| matches!(c, Command::DeleteTransformFeedback(_))),
        2
    );
}

#[test]
fn replacing_owned_feedback_releases_it() {
    let mut device = RecordingDevice::new();
    let (mut transform, _) = ping_pong(&mut device);
    let created = transform.get_buffer("posOut").unwrap().clone();
    let replacement = vec2_buffer(&mut device, 4);

    transform
        .update(&mut device, BufferUpdate::default().feedback("posOut", replacement.clone()))
        .unwrap();

    assert!(!device.is_live(created.handle()));
    assert_eq!(transform.get_buffer("posOut").unwrap(), &replacement);

    transform.delete(&mut device);
    assert!(device.is_live(replacement.handle()));
}

#[test]
fn resized_source_rederives_feedback() {
    let mut device = RecordingDevice::new();
    let (mut transform, _) = ping_pong(&mut device);
    let stale = transform.get_buffer("posOut").unwrap().clone();
    let larger = vec2_buffer(&mut device, 16);

    transform
        .update(
            &mut device,
            BufferUpdate::default().source("posIn", larger.clone()).element_count(16),
        )
        .unwrap();

    let fresh = transform.get_buffer("posOut").unwrap();
    assert_ne!(fresh, &stale);
    assert!(fresh.desc().same_layout(larger.desc()));
    assert!(!device.is_live(stale.handle()));
    assert_eq!(transform.element_count(), 16);

    transform.swap().unwrap();
    assert_eq!(
        transform.source_buffers(1)["posIn"],
        transform.feedback_buffers(0)["posOut"]
    );
}

#[test]
fn update_rebuilds_next_slot_lazily() {
    let mut device = RecordingDevice::new();
    let (mut transform, _) = ping_pong(&mut device);
    transform.swap().unwrap();
    transform.swap().unwrap();

    let replacement = vec2_buffer(&mut device, 4);
    transform
        .update(&mut device, BufferUpdate::default().source("posIn", replacement.clone()))
        .unwrap();
    transform.swap().unwrap();

    assert_eq!(transform.feedback_buffers(1)["posOut"], replacement);
}

#[test]
fn update_without_buffers_changes_nothing() {
    let mut device = RecordingDevice::new();
    let (mut transform, _) = ping_pong(&mut device);
    device.clear_commands();

    transform
        .update(&mut device, BufferUpdate::default().element_count(99))
        .unwrap();

    assert_eq!(transform.element_count(), 4);
    assert!(device.commands().is_empty());
}

#[test]
fn update_can_make_transform_swappable() {
    let mut device = RecordingDevice::new();
    let velocity = vec2_buffer(&mut device, 4);
    let options = TransformOptions::new(VS)
        .feedback("posIn", "posOut")
        .source_buffer("velocity", velocity);
    let mut transform =
        Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap();
    assert_eq!(
        device.count(|c| matches!(c, Command::CreateTransformFeedback(_))),
        1
    );

    let positions = vec2_buffer(&mut device, 4);
    transform
        .update(&mut device, BufferUpdate::default().source("posIn", positions))
        .unwrap();

    assert!(transform.is_swap_eligible());
    assert!(transform.get_buffer("posOut").is_ok());
    assert_eq!(
        device.count(|c| matches!(c, Command::CreateTransformFeedback(_))),
        2
    );
    transform.swap().unwrap();
}

#[test]
fn uncaptured_feedback_buffers_are_not_bound() {
    let mut device = RecordingDevice::new();
    let positions = vec2_buffer(&mut device, 4);
    let extra = vec2_buffer(&mut device, 4);
    let options = TransformOptions::new(VS)
        .feedback("posIn", "posOut")
        .source_buffer("posIn", positions)
        .feedback_buffer("debugOut", extra);
    let mut transform =
        Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap();
    device.clear_commands();

    transform.run(&mut device, &RunOptions::default());
    assert_eq!(captured_buffers(device.commands()).len(), 1);
}

// ============================================================================
// Program assembly
// ============================================================================

#[test]
fn fragment_shader_matches_vertex_version() {
    let mut device = RecordingDevice::new();
    let (transform, _) = ping_pong(&mut device);
    let (vs, fs) = device.program_source(transform.program().handle()).unwrap();

    assert_eq!(vs.lines().next(), Some("#version 300 es"));
    assert!(vs.contains("#define SHADER_NAME particles_vertex\n"));
    assert_eq!(fs.lines().next(), Some("#version 300 es"));
    assert!(fs.ends_with("void main() {}\n"));

    let legacy_vs =
        "attribute vec2 posIn;\nvarying vec2 posOut;\nvoid main() { posOut = posIn; }\n";
    let positions = vec2_buffer(&mut device, 4);
    let options = TransformOptions::new(legacy_vs)
        .feedback("posIn", "posOut")
        .source_buffer("posIn", positions);
    let legacy = Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap();
    let (_, fs) = device.program_source(legacy.program().handle()).unwrap();
    assert!(!fs.contains("#version"));
}

#[test]
fn fragment_shader_copies_desktop_directive() {
    let mut device = RecordingDevice::new();
    let positions = vec2_buffer(&mut device, 4);
    let vs = VS.replacen("#version 300 es", "#version 330", 1);
    let options = TransformOptions::new(vs)
        .feedback("posIn", "posOut")
        .source_buffer("posIn", positions);
    let transform = Transform::initialize(&mut device, &ModuleRegistry::new(), options).unwrap();

    let (vs, fs) = device.program_source(transform.program().handle()).unwrap();
    assert_eq!(vs.lines().next(), Some("#version 330"));
    assert_eq!(fs.lines().next(), Some("#version 330"));
    assert_eq!(fs.matches("#version").count(), 1);
}

#[test]
fn module_uniforms_feed_each_run() {
    let mut registry = ModuleRegistry::new();
    registry.register(
        ShaderModule::new("gravity")
            .vertex(
                "uniform float gravity;\n\
                 vec2 gravity_apply(vec2 p) { return p - vec2(0.0, gravity); }\n",
            )
            .define("gravity_steps", "2")
            .uniforms(|options: &ModuleOptions, _: &UniformMap| {
                let strength = options
                    .get("strength")
                    .and_then(UniformValue::as_f32)
                    .unwrap_or(9.8);
                UniformMap::from([
                    ("gravity".to_owned(), UniformValue::Float(strength)),
                    ("dt".to_owned(), UniformValue::Float(1.0)),
                ])
            }),
    );

    let mut device = RecordingDevice::new();
    let positions = vec2_buffer(&mut device, 4);
    let options = TransformOptions::new(VS)
        .feedback("posIn", "posOut")
        .source_buffer("posIn", positions)
        .modules(["gravity"])
        .define("fixed_step", "1");
    let mut transform = Transform::initialize(&mut device, &registry, options).unwrap();

    let (vs, _) = device.program_source(transform.program().handle()).unwrap();
    assert!(vs.contains("#define MODULE_GRAVITY\n"));
    assert!(vs.contains("#define GRAVITY_STEPS 2\n"));
    assert!(vs.contains("#define FIXED_STEP 1\n"));

    device.clear_commands();
    let run = RunOptions::default()
        .module_option("strength", 1.5_f32)
        .uniform("dt", 0.25_f32);
    transform.run(&mut device, &run);

    let uniforms: Vec<_> = device
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::SetUniform { name, value } => Some((name.as_str(), value.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        uniforms,
        [
            ("dt", UniformValue::Float(0.25)),
            ("gravity", UniformValue::Float(1.5)),
        ]
    );
}
