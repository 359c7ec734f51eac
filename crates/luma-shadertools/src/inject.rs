//! Splicing caller snippets into assembled source.

use luma_core::ShaderStage;

use crate::error::{Result, ShaderError};

/// Placeholder where `#decl` snippets are spliced. Removed if unused.
pub const DECLARATION_INJECT_MARKER: &str = "__LUMA_INJECT_DECLARATIONS__";

const VERTEX_STUBS: &str = "\
#ifdef MODULE_LOGDEPTH
  logdepth_adjustPosition(gl_Position);
#endif
";

const FRAGMENT_STUBS: &str = "\
#ifdef MODULE_MATERIAL
  gl_FragColor = material_filterColor(gl_FragColor);
#endif

#ifdef MODULE_LIGHTING
  gl_FragColor = lighting_filterColor(gl_FragColor);
#endif

#ifdef MODULE_FOG
  gl_FragColor = fog_filterColor(gl_FragColor);
#endif

#ifdef MODULE_PICKING
  gl_FragColor = picking_filterHighlightColor(gl_FragColor);
  gl_FragColor = picking_filterPickingColor(gl_FragColor);
#endif

#ifdef MODULE_LOGDEPTH
  logdepth_setFragDepth();
#endif
";

/// Where an injected snippet goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionPoint {
    /// `vs:#decl` / `fs:#decl`: at the declaration marker.
    Declarations(ShaderStage),
    /// `vs:#main-start` / `fs:#main-start`: first thing inside `main`.
    MainStart(ShaderStage),
    /// `vs:#main-end` / `fs:#main-end`: last thing inside `main`.
    MainEnd(ShaderStage),
    /// Any other key: right after the first occurrence of this literal text,
    /// in whichever stage contains it.
    After(String),
}

impl InjectionPoint {
    pub fn parse(key: &str) -> Result<Self> {
        let Some((prefix, hook)) = key.split_once(":#") else {
            return Ok(InjectionPoint::After(key.to_owned()));
        };
        let Some(stage) = [ShaderStage::Vertex, ShaderStage::Fragment]
            .into_iter()
            .find(|stage| stage.prefix() == prefix)
        else {
            return Ok(InjectionPoint::After(key.to_owned()));
        };
        match hook {
            "decl" => Ok(InjectionPoint::Declarations(stage)),
            "main-start" => Ok(InjectionPoint::MainStart(stage)),
            "main-end" => Ok(InjectionPoint::MainEnd(stage)),
            _ => Err(ShaderError::InvalidInjection(key.to_owned())),
        }
    }

    /// The stage a hook is bound to; `None` for literal markers.
    pub fn stage(&self) -> Option<ShaderStage> {
        match self {
            InjectionPoint::Declarations(stage)
            | InjectionPoint::MainStart(stage)
            | InjectionPoint::MainEnd(stage) => Some(*stage),
            InjectionPoint::After(_) => None,
        }
    }
}

/// Parse `(key, snippet)` pairs, keeping their order.
pub fn parse_injections(pairs: &[(String, String)]) -> Result<Vec<(InjectionPoint, String)>> {
    pairs
        .iter()
        .map(|(key, snippet)| Ok((InjectionPoint::parse(key)?, snippet.clone())))
        .collect()
}

/// Apply `injections` that target `stage` (or a literal marker) to `source`.
///
/// With `standard_stubs`, the built-in `#ifdef MODULE_*` hook calls are
/// added before the closing brace of `main`.
pub fn inject_shader(
    source: &str,
    stage: ShaderStage,
    injections: &[(InjectionPoint, String)],
    standard_stubs: bool,
) -> String {
    let mut out = source.to_owned();

    for (point, snippet) in injections {
        if point.stage().is_some_and(|s| s != stage) {
            continue;
        }
        match point {
            InjectionPoint::Declarations(_) => {
                match out.find(DECLARATION_INJECT_MARKER) {
                    Some(at) => out.insert_str(at, &format!("{snippet}\n")),
                    None => tracing::warn!(
                        stage = stage.name(),
                        "no declaration marker, dropping declaration snippet"
                    ),
                }
            }
            InjectionPoint::MainStart(_) => match find_main_body_start(&out) {
                Some(at) => out.insert_str(at, &format!("{snippet}\n")),
                None => tracing::warn!(stage = stage.name(), "no `main` to inject into"),
            },
            InjectionPoint::MainEnd(_) => match find_main_body_end(&out) {
                Some(at) => out.insert_str(at, &format!("{snippet}\n")),
                None => tracing::warn!(stage = stage.name(), "no `main` to inject into"),
            },
            InjectionPoint::After(marker) => {
                if let Some(at) = out.find(marker.as_str()) {
                    out.insert_str(at + marker.len(), snippet);
                }
            }
        }
    }

    out = out.replace(DECLARATION_INJECT_MARKER, "");

    if standard_stubs {
        let stubs = match stage {
            ShaderStage::Vertex => VERTEX_STUBS,
            ShaderStage::Fragment => FRAGMENT_STUBS,
        };
        if let Some(at) = find_main_body_end(&out) {
            out.insert_str(at, stubs);
        }
    }
    out
}

/// Offset just past `void main(...) {` (and one newline, if any).
fn find_main_body_start(source: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(found) = source[from..].find("void") {
        let start = from + found;
        from = start + "void".len();

        let boundary = start == 0 || !crate::text::is_ident_byte(source.as_bytes()[start - 1]);
        if !boundary {
            continue;
        }
        let rest = &source[from..];
        let after_void = rest.trim_start();
        if after_void.len() == rest.len() {
            continue;
        }
        let Some(rest) = after_void.strip_prefix("main") else {
            continue;
        };
        let Some(rest) = rest.trim_start().strip_prefix('(') else {
            continue;
        };
        let Some(close) = rest.find(')') else {
            continue;
        };
        let Some(rest) = rest[close + 1..].trim_start().strip_prefix('{') else {
            continue;
        };
        let rest = rest.strip_prefix('\n').unwrap_or(rest);
        return Some(source.len() - rest.len());
    }
    None
}

/// Offset of the final closing brace, provided only whitespace follows it.
fn find_main_body_end(source: &str) -> Option<usize> {
    let at = source.rfind('}')?;
    source[at + 1..].trim().is_empty().then_some(at)
}
