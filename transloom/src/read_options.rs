//! Options for loading a file on disk into a client.

/// Detection threshold used when none is given.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Load behavior options for [`crate::codec::load_path`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Overrides the source language the format reports (or defaults to).
    pub source_language: Option<String>,
    /// Overrides the target language the format reports.
    pub target_language: Option<String>,
    /// Lowest detection score accepted when resolving a codec.
    pub min_confidence: f32,
    /// Skips detection and uses this format id.
    pub format_id: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            source_language: None,
            target_language: None,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            format_id: None,
        }
    }
}

impl LoadOptions {
    /// Creates default load options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_language(mut self, language: Option<String>) -> Self {
        self.source_language = language;
        self
    }

    pub fn with_target_language(mut self, language: Option<String>) -> Self {
        self.target_language = language;
        self
    }

    /// Sets the detection threshold, clamped to `0.0..=1.0`.
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_format(mut self, format_id: Option<String>) -> Self {
        self.format_id = format_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let options = LoadOptions::new()
            .with_source_language(Some("en".to_string()))
            .with_target_language(Some("fr".to_string()))
            .with_min_confidence(1.5);
        assert_eq!(options.source_language.as_deref(), Some("en"));
        assert_eq!(options.target_language.as_deref(), Some("fr"));
        assert_eq!(options.min_confidence, 1.0);
        assert_eq!(LoadOptions::default().min_confidence, DEFAULT_MIN_CONFIDENCE);
    }
}
