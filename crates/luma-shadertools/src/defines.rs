//! Preprocessor define collections.
//!
//! Defines are kept in insertion order so the emitted prologue is stable and
//! mirrors the order in which modules and the application declared them.
//! Names are upper-cased on insertion; setting an existing name replaces its
//! value in place.

/// An ordered set of `#define NAME VALUE` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderDefines {
    defines: Vec<(String, String)>,
}

impl ShaderDefines {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a define. If the (upper-cased) name exists, its value is replaced.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_uppercase();
        let value = value.into();
        match self.defines.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.defines.push((name, value)),
        }
    }

    /// Builder form of [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let name = name.to_ascii_uppercase();
        let before = self.defines.len();
        self.defines.retain(|(k, _)| *k != name);
        self.defines.len() != before
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_uppercase();
        self.defines
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Merge `other` into `self`; values from `other` win on conflict.
    pub fn merge(&mut self, other: &ShaderDefines) {
        for (name, value) in &other.defines {
            self.set(name, value.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.defines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defines.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render as `#define NAME VALUE` lines.
    #[must_use]
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.defines {
            out.push_str("#define ");
            out.push_str(name);
            if !value.is_empty() {
                out.push(' ');
                out.push_str(value);
            }
            out.push('\n');
        }
        out
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ShaderDefines {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut defines = ShaderDefines::new();
        for (name, value) in iter {
            defines.set(name.as_ref(), value);
        }
        defines
    }
}
