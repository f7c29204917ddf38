use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::block::{BlockDescriptor, DocumentUri};

static MERMAID_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```mermaid\s*(.*?)```").expect("Failed to compile mermaid fence regex")
});

/// Byte offset to (line, character) lookup for one document text
struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(text: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(idx, _)| idx + 1))
            .collect();
        Self { text, line_starts }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let character = self.text[self.line_starts[line]..offset].chars().count();
        (line, character)
    }
}

/// Find every ```` ```mermaid ```` fenced block in document order.
///
/// Sequence numbers start at 0 on every call, so a block keeps its identity
/// across scans as long as no block is inserted before it.
pub fn scan_blocks(document_uri: &DocumentUri, text: &str) -> Vec<BlockDescriptor> {
    let index = LineIndex::new(text);

    let blocks: Vec<BlockDescriptor> = MERMAID_FENCE_RE
        .captures_iter(text)
        .enumerate()
        .filter_map(|(sequence, caps)| {
            let fence = caps.get(0)?;
            let content = caps.get(1)?;
            let (start_line, start_character) = index.position(fence.start());
            let (end_line, end_character) = index.position(fence.end());
            Some(BlockDescriptor {
                sequence,
                content: content.as_str().to_string(),
                start_line,
                end_line,
                start_character,
                end_character,
                document_uri: document_uri.clone(),
            })
        })
        .collect();

    debug!("Found {} mermaid blocks in {}", blocks.len(), document_uri);
    blocks
}
