//! Language detection behind a trait so pipeline tests stay deterministic.

use lingua::{LanguageDetector, LanguageDetectorBuilder};

/// Best-effort text → ISO 639-1 code. Never fails the caller: undetectable
/// input yields None and the record is stored untagged.
pub trait LanguageDetect: Send + Sync {
    fn detect(&self, text: &str) -> Option<String>;
}

/// Statistical detector over all spoken languages. Building the models is
/// expensive, so construct once and share.
pub struct LinguaDetector {
    detector: LanguageDetector,
}

impl LinguaDetector {
    pub fn new() -> Self {
        Self {
            detector: LanguageDetectorBuilder::from_all_spoken_languages().build(),
        }
    }
}

impl Default for LinguaDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageDetect for LinguaDetector {
    fn detect(&self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        self.detector
            .detect_language_of(text)
            .map(|lang| lang.iso_code_639_1().to_string().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_detects_nothing() {
        let detector = LinguaDetector::new();
        assert_eq!(detector.detect(""), None);
        assert_eq!(detector.detect("   "), None);
    }

    #[test]
    fn detects_common_languages() {
        let detector = LinguaDetector::new();
        assert_eq!(
            detector.detect("The quick brown fox jumps over the lazy dog"),
            Some("en".to_string())
        );
        assert_eq!(
            detector.detect("El rápido zorro marrón salta sobre el perro perezoso"),
            Some("es".to_string())
        );
    }
}
