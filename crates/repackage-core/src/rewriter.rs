use regex::{Captures, Regex};
use tracing::debug;

/// Result of running a rewriter over a file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    Changed(String),
    /// The pattern matched but the replacement produced identical content.
    Unchanged,
    NotFound,
}

impl Rewrite {
    pub fn changed(self) -> Option<String> {
        match self {
            Rewrite::Changed(content) => Some(content),
            Rewrite::Unchanged | Rewrite::NotFound => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Rewrite::NotFound)
    }

    fn from_replacement(original: &str, replaced: String) -> Self {
        if replaced == original {
            Rewrite::Unchanged
        } else {
            Rewrite::Changed(replaced)
        }
    }
}

/// Replaces `key = "old"` declarations with `key = "new"` for a fixed set of keys.
///
/// Only the exact quoted value matches, so `namespace = "com.example.old.feature"`
/// is left alone when the old identifier is `com.example.old`.
pub struct KeyValueRewriter {
    pairs: Vec<(String, String)>,
}

impl KeyValueRewriter {
    pub fn new<K: AsRef<str>>(keys: &[K], old: &str, new: &str) -> Self {
        let pairs = keys
            .iter()
            .map(|key| {
                let key = key.as_ref();
                (format!("{key} = \"{old}\""), format!("{key} = \"{new}\""))
            })
            .collect();
        Self { pairs }
    }

    pub fn process_content(&self, content: &str) -> Rewrite {
        let mut updated = content.to_string();
        let mut found = false;

        for (declaration, replacement) in &self.pairs {
            if updated.contains(declaration.as_str()) {
                debug!("Declaration replacement: '{}' -> '{}'", declaration, replacement);
                updated = updated.replace(declaration.as_str(), replacement);
                found = true;
            }
        }

        if !found {
            return Rewrite::NotFound;
        }
        Rewrite::from_replacement(content, updated)
    }
}

/// Replaces every literal occurrence of a token, with no regard to word boundaries.
///
/// `com.example.old` inside `com.example.older` is rewritten too.
pub struct LiteralRewriter {
    token: String,
    replacement: String,
}

impl LiteralRewriter {
    pub fn new(token: &str, replacement: &str) -> Self {
        Self {
            token: token.to_string(),
            replacement: replacement.to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn matches(&self, content: &str) -> bool {
        content.contains(&self.token)
    }

    pub fn process_content(&self, content: &str) -> Rewrite {
        if !self.matches(content) {
            return Rewrite::NotFound;
        }
        debug!(
            "Literal replacement: found {} occurrences of '{}'",
            content.matches(&self.token).count(),
            self.token
        );
        Rewrite::from_replacement(content, content.replace(&self.token, &self.replacement))
    }
}

/// Replaces the inner text of every `<string name="...">` element with a given name.
///
/// The opening and closing tags are kept byte for byte.
pub struct TagRewriter {
    pattern: Regex,
    replacement: String,
}

impl TagRewriter {
    pub fn string_resource(name: &str, replacement: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r#"(?s)(<string\s+name="{}">)(.*?)(</string>)"#,
            regex::escape(name)
        ))?;
        Ok(Self {
            pattern,
            replacement: replacement.to_string(),
        })
    }

    pub fn process_content(&self, content: &str) -> Rewrite {
        let count = self.pattern.find_iter(content).count();
        if count == 0 {
            return Rewrite::NotFound;
        }
        debug!("Tag replacement: found {} elements", count);

        let replaced = self.pattern.replace_all(content, |caps: &Captures| {
            format!("{}{}{}", &caps[1], self.replacement, &caps[3])
        });
        Rewrite::from_replacement(content, replaced.into_owned())
    }
}
