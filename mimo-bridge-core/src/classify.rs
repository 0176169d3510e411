//! Prefix classification of backend output lines.
//!
//! The backend writes JSON-RPC responses to the same stdout as its runtime
//! chatter: interpreter banners, log lines, and term-like tuples such as
//! `{:ok, :started}`. There is no out-of-band framing to separate them, so
//! the bridge decides per line by looking only at its leading characters.
//!
//! This is a heuristic, not a parser. A line is forwarded only when it opens a
//! JSON object whose first key is one of a fixed set (`jsonrpc`, `id`,
//! `result`, `error`). Any other line starting with `{` is treated as
//! structured runtime noise; anything else is plain text noise. A diagnostic
//! line that happens to start with `{"id` is forwarded, and a valid response
//! whose first key is not in the set is dropped. The recognized set is a
//! contract with the backend's serializer, so it lives behind
//! [`LineClassifier`] and can be swapped without touching the relay loop.

/// First keys that mark a line as a protocol message.
pub const RECOGNIZED_KEYS: &[&str] = &["jsonrpc", "id", "result", "error"];

/// Outcome of classifying one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Protocol traffic: write the trimmed line to the upstream peer.
    Forward,
    /// Incidental output: record it diagnostically, never forward it.
    Suppress(SuppressReason),
}

/// Why a line was suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Nothing but whitespace.
    Empty,
    /// Starts with `{` but not with a recognized `{"<key>` prefix.
    StructuredNoise,
    /// Does not start with `{` at all.
    Text,
}

impl SuppressReason {
    /// Short tag used in diagnostic log entries.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Empty => "SKIP_EMPTY",
            Self::StructuredNoise => "SKIP_STRUCTURED",
            Self::Text => "SKIP",
        }
    }
}

/// Decides whether a child output line crosses the bridge.
///
/// Implementations must be pure: the same input always yields the same
/// classification, and no I/O or state mutation happens.
pub trait LineClassifier: Send + Sync {
    fn classify(&self, line: &str) -> Classification;
}

/// Classifier matching `{"<key>` for a configurable set of keys.
#[derive(Debug, Clone)]
pub struct PrefixClassifier {
    keys: Vec<String>,
}

impl PrefixClassifier {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for PrefixClassifier {
    fn default() -> Self {
        Self::new(RECOGNIZED_KEYS.iter().copied())
    }
}

impl LineClassifier for PrefixClassifier {
    fn classify(&self, line: &str) -> Classification {
        classify_with_keys(line, &self.keys)
    }
}

/// Classify with the default recognized key set.
pub fn classify(line: &str) -> Classification {
    classify_with_keys(line, RECOGNIZED_KEYS)
}

fn classify_with_keys<K: AsRef<str>>(line: &str, keys: &[K]) -> Classification {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Classification::Suppress(SuppressReason::Empty);
    }
    if let Some(rest) = trimmed.strip_prefix("{\"") {
        if keys.iter().any(|k| rest.starts_with(k.as_ref())) {
            return Classification::Forward;
        }
    }
    if trimmed.starts_with('{') {
        Classification::Suppress(SuppressReason::StructuredNoise)
    } else {
        Classification::Suppress(SuppressReason::Text)
    }
}
