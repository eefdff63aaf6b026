//! Decoded increments of generated text

/// A decoded increment of generated text
///
/// Fragments are produced and consumed within one relay operation and are
/// never persisted individually.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// The text payload
    pub text: String,
    /// Set on the single fragment that marks the end of the upstream stream
    pub is_final: bool,
}

impl Fragment {
    /// A non-final fragment carrying text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    /// The end-of-stream marker (empty payload)
    pub fn end() -> Self {
        Self {
            text: String::new(),
            is_final: true,
        }
    }
}

/// Accumulates forwarded fragments into the full assistant text
#[derive(Debug, Default)]
pub struct FragmentAccumulator {
    content: String,
    fragments: usize,
}

impl FragmentAccumulator {
    /// Create a new accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment's payload. The end marker contributes nothing.
    pub fn push(&mut self, fragment: &Fragment) {
        if fragment.is_final {
            return;
        }
        self.content.push_str(&fragment.text);
        self.fragments += 1;
    }

    /// Get the accumulated content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of fragments appended so far
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Consume the accumulator, returning the content
    pub fn into_content(self) -> String {
        self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_concatenates_in_order() {
        let mut acc = FragmentAccumulator::new();
        acc.push(&Fragment::text("He"));
        acc.push(&Fragment::text("llo"));
        acc.push(&Fragment::end());

        assert_eq!(acc.content(), "Hello");
        assert_eq!(acc.fragments(), 2);
        assert_eq!(acc.into_content(), "Hello");
    }

    #[test]
    fn test_end_marker_is_empty_and_final() {
        let end = Fragment::end();
        assert!(end.is_final);
        assert!(end.text.is_empty());
        assert!(!Fragment::text("x").is_final);
    }
}
