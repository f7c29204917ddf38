//! Fenced diagram block identity
//!
//! A block is identified by its owning document and its ordinal position in
//! that document. Whether its text changed is a separate question.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Path-like identifier of the document that owns a block.
///
/// Accepts either a bare path or a `scheme://authority/path` URI. Identity
/// comparisons use only the path portion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentUri(String);

impl DocumentUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn path(&self) -> &str {
        match self.0.split_once("://") {
            Some((_, rest)) => rest.find('/').map_or("/", |idx| &rest[idx..]),
            None => &self.0,
        }
    }

    /// Final path segment, if any
    pub fn file_name(&self) -> Option<&str> {
        self.path().rsplit('/').next().filter(|name| !name.is_empty())
    }
}

impl fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentUri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDescriptor {
    /// Ordinal of the block within its document, counted from 0 on every scan
    pub sequence: usize,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_character: usize,
    pub end_character: usize,
    pub document_uri: DocumentUri,
}

/// How an incoming descriptor relates to the previously rendered one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockChange {
    /// Same text as before; nothing to redraw
    Unchanged,
    /// Same logical block with edited text; keep the user's pan and zoom
    ContentUpdated,
    /// A different block; start from a fresh fit
    NewBlock,
}

impl BlockDescriptor {
    pub fn is_same_block(&self, other: Option<&BlockDescriptor>) -> bool {
        other.is_some_and(|other| {
            self.document_uri.path() == other.document_uri.path()
                && self.sequence == other.sequence
        })
    }

    pub fn is_content_changed(&self, other: Option<&BlockDescriptor>) -> bool {
        other.is_none_or(|other| self.content != other.content)
    }

    /// Same block and same text
    pub fn is_current_with(&self, other: Option<&BlockDescriptor>) -> bool {
        self.is_same_block(other) && !self.is_content_changed(other)
    }

    pub fn classify(&self, previous: Option<&BlockDescriptor>) -> BlockChange {
        if !self.is_content_changed(previous) {
            BlockChange::Unchanged
        } else if self.is_same_block(previous) {
            BlockChange::ContentUpdated
        } else {
            BlockChange::NewBlock
        }
    }
}

/// Identity check that tolerates either side being absent
pub fn is_same_block(a: Option<&BlockDescriptor>, b: Option<&BlockDescriptor>) -> bool {
    a.is_some_and(|a| a.is_same_block(b))
}

/// True when `b` is absent or its text differs from `a`'s
pub fn is_content_changed(a: &BlockDescriptor, b: Option<&BlockDescriptor>) -> bool {
    a.is_content_changed(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(uri: &str, sequence: usize, content: &str) -> BlockDescriptor {
        BlockDescriptor {
            sequence,
            content: content.to_string(),
            start_line: sequence * 10,
            end_line: sequence * 10 + 3,
            start_character: 0,
            end_character: 3,
            document_uri: DocumentUri::new(uri),
        }
    }

    #[test]
    fn uri_path_strips_scheme_and_authority() {
        assert_eq!(DocumentUri::new("file:///home/a/notes.md").path(), "/home/a/notes.md");
        assert_eq!(DocumentUri::new("vscode-remote://ssh-host/x/y.md").path(), "/x/y.md");
        assert_eq!(DocumentUri::new("/plain/path.md").path(), "/plain/path.md");
        assert_eq!(DocumentUri::new("untitled://").path(), "/");
    }

    #[test]
    fn uri_file_name() {
        assert_eq!(DocumentUri::new("file:///a/b/notes.md").file_name(), Some("notes.md"));
        assert_eq!(DocumentUri::new("file:///a/b/").file_name(), None);
    }

    #[test]
    fn same_block_requires_path_and_sequence() {
        let a = block("file:///doc.md", 1, "graph TD");
        assert!(a.is_same_block(Some(&block("/doc.md", 1, "other text"))));
        assert!(!a.is_same_block(Some(&block("/doc.md", 2, "graph TD"))));
        assert!(!a.is_same_block(Some(&block("/other.md", 1, "graph TD"))));
    }

    #[test]
    fn same_block_is_false_when_either_side_missing() {
        let a = block("/doc.md", 0, "x");
        assert!(!a.is_same_block(None));
        assert!(!is_same_block(None, Some(&a)));
        assert!(!is_same_block(Some(&a), None));
        assert!(!is_same_block(None, None));
        assert!(is_same_block(Some(&a), Some(&a.clone())));
    }

    #[test]
    fn content_changed_against_missing_or_different_text() {
        let a = block("/doc.md", 0, "graph TD; A-->B");
        assert!(is_content_changed(&a, None));
        assert!(a.is_content_changed(Some(&block("/doc.md", 0, "graph TD; A-->C"))));
        assert!(!a.is_content_changed(Some(&block("/elsewhere.md", 4, "graph TD; A-->B"))));
    }

    #[test]
    fn classify_covers_all_transitions() {
        let rendered = block("/doc.md", 0, "graph TD; A-->B");

        assert_eq!(rendered.classify(None), BlockChange::NewBlock);
        assert_eq!(rendered.clone().classify(Some(&rendered)), BlockChange::Unchanged);
        assert_eq!(
            block("/doc.md", 0, "graph TD; A-->C").classify(Some(&rendered)),
            BlockChange::ContentUpdated
        );
        assert_eq!(
            block("/doc.md", 1, "graph LR; X-->Y").classify(Some(&rendered)),
            BlockChange::NewBlock
        );
    }

    #[test]
    fn descriptor_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(block("file:///doc.md", 2, "pie")).unwrap();
        assert_eq!(json["documentUri"], "file:///doc.md");
        assert_eq!(json["startLine"], 20);
        assert_eq!(json["endCharacter"], 3);
        assert_eq!(json["sequence"], 2);
    }
}
