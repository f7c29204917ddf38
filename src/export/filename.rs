use std::sync::LazyLock;

use regex::Regex;

use crate::block::DocumentUri;

/// Stem used when the document URI has no usable file name
pub const FALLBACK_FILE_STEM: &str = "mermaid-diagram";

// Invalid characters for Windows: < > : " / \ | ? *, plus control characters
static INVALID_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("Failed to compile invalid filename regex")
});

static RESERVED_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])$")
        .expect("Failed to compile reserved filename regex")
});

const MAX_STEM_CHARS: usize = 200;

/// Sanitize a filename for cross-platform compatibility
/// Removes/replaces characters that are invalid on Windows, macOS, or Linux
pub fn sanitize_filename(name: &str) -> String {
    let sanitized = INVALID_CHARS_RE.replace_all(name, "_");

    // Leading/trailing spaces and dots are problematic on Windows
    let sanitized = sanitized.trim_matches(|c| c == ' ' || c == '.');

    if RESERVED_NAME_RE.is_match(sanitized) {
        return format!("_{sanitized}");
    }

    let sanitized: String = sanitized.chars().take(MAX_STEM_CHARS).collect();

    if sanitized.is_empty() {
        "untitled".to_string()
    } else {
        sanitized
    }
}

/// Export file stem for a document: its file name up to the first `.`
pub fn diagram_file_stem(uri: &DocumentUri) -> String {
    let stem = uri
        .file_name()
        .and_then(|name| name.split('.').next())
        .filter(|stem| !stem.is_empty())
        .unwrap_or(FALLBACK_FILE_STEM);
    sanitize_filename(stem)
}

pub fn export_file_name(uri: &DocumentUri, extension: &str) -> String {
    format!("{}.{extension}", diagram_file_stem(uri))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize_filename("Normal Diagram"), "Normal Diagram");
        assert_eq!(sanitize_filename("Flow: A Tale"), "Flow_ A Tale");
        assert_eq!(sanitize_filename("Flow/Chart"), "Flow_Chart");
        assert_eq!(sanitize_filename("Flow\\Chart"), "Flow_Chart");
        assert_eq!(sanitize_filename("Flow|Chart"), "Flow_Chart");
        assert_eq!(sanitize_filename("Flow<>?*\"Chart"), "Flow_____Chart");
    }

    #[test]
    fn test_sanitize_reserved() {
        assert_eq!(sanitize_filename("CON"), "_CON");
        assert_eq!(sanitize_filename("con"), "_con");
        assert_eq!(sanitize_filename("COM1"), "_COM1");
        assert_eq!(sanitize_filename("LPT9"), "_LPT9");
    }

    #[test]
    fn test_sanitize_empty_and_trim() {
        assert_eq!(sanitize_filename(""), "untitled");
        assert_eq!(sanitize_filename(" . "), "untitled");
        assert_eq!(sanitize_filename(" . Notes . "), "Notes");
    }

    #[test]
    fn test_sanitize_long_unicode_name() {
        let long_name = "図".repeat(250);
        let result = sanitize_filename(&long_name);
        assert_eq!(result.chars().count(), 200);
    }

    #[test]
    fn test_sanitize_control_chars() {
        assert_eq!(sanitize_filename("Flow\x00Chart"), "Flow_Chart");
        assert_eq!(sanitize_filename("Flow\x1FChart"), "Flow_Chart");
    }

    #[test]
    fn stem_comes_from_document_file_name() {
        assert_eq!(
            diagram_file_stem(&DocumentUri::new("file:///home/me/design.notes.md")),
            "design"
        );
        assert_eq!(diagram_file_stem(&DocumentUri::new("/tmp/README")), "README");
    }

    #[test]
    fn stem_falls_back_when_name_is_unusable() {
        assert_eq!(diagram_file_stem(&DocumentUri::new("file:///dir/")), FALLBACK_FILE_STEM);
        assert_eq!(diagram_file_stem(&DocumentUri::new("/dir/.hidden")), FALLBACK_FILE_STEM);
    }

    #[test]
    fn export_file_name_appends_extension() {
        assert_eq!(
            export_file_name(&DocumentUri::new("file:///a/flows.md"), "png"),
            "flows.png"
        );
    }
}
