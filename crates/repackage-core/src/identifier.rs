use std::fmt;
use std::path::PathBuf;

/// A dotted package identifier such as `com.example.app`.
///
/// Segments are the non-empty pieces between dots, so `"a..b."` has the
/// segments `["a", "b"]`. The raw (trimmed) string is kept as well because
/// text rewriting works on the literal identifier, while directory migration
/// works on the segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DottedIdentifier {
    raw: String,
    segments: Vec<String>,
}

impl DottedIdentifier {
    pub fn parse(identifier: &str) -> Self {
        let raw = identifier.trim().to_string();
        let segments = split(&raw);
        Self { raw, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Nested relative path, one directory per segment.
    pub fn to_relative_path(&self) -> PathBuf {
        to_path(&self.segments)
    }
}

impl fmt::Display for DottedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

pub fn split(identifier: &str) -> Vec<String> {
    identifier
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn to_path<S: AsRef<str>>(segments: &[S]) -> PathBuf {
    segments.iter().map(AsRef::as_ref).collect()
}
