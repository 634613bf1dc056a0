//! Text accumulator - concatenates streamed text fragments.

/// Growing response text. Offsets into it are UTF-8 byte offsets.
#[derive(Debug, Default, Clone)]
pub struct TextAccumulator {
    text: String,
    fragments: usize,
}

impl TextAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Empty fragments are ignored.
    pub fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_concatenates_and_tracks_length() {
        let mut text = TextAccumulator::new();
        text.push("Hello");
        text.push("");
        text.push(" world");
        assert_eq!(text.as_str(), "Hello world");
        assert_eq!(text.len(), 11);
        assert_eq!(text.fragments(), 2);
    }
}
