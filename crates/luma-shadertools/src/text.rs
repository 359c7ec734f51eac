//! Identifier-aware scanning of GLSL source text.
//!
//! The rewrites needed by the transpiler and the deprecation scanner are all
//! of the form "this identifier, followed by that". Tokens are maximal runs of
//! `[A-Za-z0-9_]`, so `texture2D` never matches inside `mytexture2D`.

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Iterator over identifier tokens: `(byte offset, token, text after token)`.
pub(crate) struct Identifiers<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Identifiers<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }
}

impl<'a> Iterator for Identifiers<'a> {
    type Item = (usize, &'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.source.as_bytes();
        while self.pos < bytes.len() && !is_ident_byte(bytes[self.pos]) {
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return None;
        }
        let start = self.pos;
        while self.pos < bytes.len() && is_ident_byte(bytes[self.pos]) {
            self.pos += 1;
        }
        Some((
            start,
            &self.source[start..self.pos],
            &self.source[self.pos..],
        ))
    }
}

/// Rewrite identifier tokens. `rewrite` receives each token and the text that
/// follows it; returning `Some` replaces the token.
pub(crate) fn rewrite_identifiers<F>(source: &str, mut rewrite: F) -> String
where
    F: FnMut(&str, &str) -> Option<String>,
{
    let mut out = String::with_capacity(source.len());
    let mut copied = 0;
    for (start, token, rest) in Identifiers::new(source) {
        if let Some(replacement) = rewrite(token, rest) {
            out.push_str(&source[copied..start]);
            out.push_str(&replacement);
            copied = start + token.len();
        }
    }
    out.push_str(&source[copied..]);
    out
}

/// Replace calls `name(` for any of `names` with `replacement(`.
pub(crate) fn replace_calls(source: &str, names: &[&str], replacement: &str) -> String {
    rewrite_identifiers(source, |token, rest| {
        (rest.starts_with('(') && names.contains(&token)).then(|| replacement.to_owned())
    })
}

/// True if `source` calls `name(` as a whole word.
pub(crate) fn contains_call(source: &str, name: &str) -> bool {
    Identifiers::new(source).any(|(_, token, rest)| token == name && rest.starts_with('('))
}

/// Replace every whole-word occurrence of `word`.
pub(crate) fn replace_word(source: &str, word: &str, replacement: &str) -> String {
    rewrite_identifiers(source, |token, _| (token == word).then(|| replacement.to_owned()))
}

/// Replace the storage qualifier of simple declarations
/// (`qualifier type name;` or `qualifier type name[N];`).
pub(crate) fn replace_qualifier(source: &str, qualifier: &str, replacement: &str) -> String {
    rewrite_identifiers(source, |token, rest| {
        (token == qualifier && is_simple_declaration(rest)).then(|| replacement.to_owned())
    })
}

/// Find `out vec4 <name>;` and return `(start, end, name)`.
///
/// `end` includes a single trailing newline when present.
pub(crate) fn find_output_declaration(source: &str) -> Option<(usize, usize, &str)> {
    Identifiers::new(source).find_map(|(start, token, rest)| {
        if token != "out" {
            return None;
        }
        let cursor = skip_blanks(rest)?;
        let cursor = cursor.strip_prefix("vec4")?;
        let cursor = skip_blanks(cursor)?;
        let name_len = ident_len(cursor);
        if name_len == 0 {
            return None;
        }
        let name = &cursor[..name_len];
        let cursor = cursor[name_len..].trim_start_matches([' ', '\t']);
        let cursor = cursor.strip_prefix(';')?;
        let cursor = cursor.strip_prefix('\n').unwrap_or(cursor);
        let end = source.len() - cursor.len();
        Some((start, end, name))
    })
}

fn is_simple_declaration(rest: &str) -> bool {
    let Some(cursor) = skip_blanks(rest) else {
        return false;
    };
    let Some(cursor) = skip_ident(cursor) else {
        return false;
    };
    let Some(cursor) = skip_blanks(cursor) else {
        return false;
    };
    let Some(mut cursor) = skip_ident(cursor) else {
        return false;
    };
    if let Some(inner) = cursor.strip_prefix('[') {
        let Some(after) = skip_ident(inner).and_then(|c| c.strip_prefix(']')) else {
            return false;
        };
        cursor = after;
    }
    cursor.starts_with(';')
}

/// Skip one or more spaces/tabs.
fn skip_blanks(s: &str) -> Option<&str> {
    let trimmed = s.trim_start_matches([' ', '\t']);
    (trimmed.len() < s.len()).then_some(trimmed)
}

/// Skip one identifier (at least one byte).
fn skip_ident(s: &str) -> Option<&str> {
    let len = ident_len(s);
    (len > 0).then(|| &s[len..])
}

fn ident_len(s: &str) -> usize {
    s.bytes().take_while(|&b| is_ident_byte(b)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calls_respect_word_boundaries() {
        let src = "vec4 a = texture2D(s, uv); vec4 b = mytexture2D(s, uv); float texture2D;";
        let out = replace_calls(src, &["texture2D"], "texture");
        assert_eq!(
            out,
            "vec4 a = texture(s, uv); vec4 b = mytexture2D(s, uv); float texture2D;"
        );
    }

    #[test]
    fn detects_calls() {
        assert!(contains_call("x = project_scale(1.0);", "project_scale"));
        assert!(!contains_call("x = project_scale2(1.0);", "project_scale"));
        assert!(!contains_call("float project_scale;", "project_scale"));
    }

    #[test]
    fn rewrites_simple_declarations_only() {
        let src = "attribute vec3 positions;\nattribute float sizes[4];\nattribute highp vec3 x;\n";
        let out = replace_qualifier(src, "attribute", "in");
        assert_eq!(
            out,
            "in vec3 positions;\nin float sizes[4];\nattribute highp vec3 x;\n"
        );
    }

    #[test]
    fn finds_fragment_output() {
        let src = "out vec4 fragColor;\nvoid main() { fragColor = vec4(1.0); }";
        let (start, end, name) = find_output_declaration(src).unwrap();
        assert_eq!(name, "fragColor");
        assert_eq!(&src[start..end], "out vec4 fragColor;\n");
    }

    #[test]
    fn non_ascii_text_is_preserved() {
        let src = "// résumé\nvarying vec2 uv;";
        assert_eq!(replace_qualifier(src, "varying", "in"), "// résumé\nin vec2 uv;");
    }
}
