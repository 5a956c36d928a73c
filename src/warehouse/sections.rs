//! Heading-delimited section index
//!
//! Sections are derived from heading_open tokens in document order with a
//! stack of currently open heading levels: a new heading closes every open
//! heading of equal or deeper level at the line immediately preceding its
//! own start; shallower headings stay open as structural ancestors. ATX
//! and Setext headings are handled uniformly because the tokenizer's map
//! already covers a Setext underline as part of its heading's span. At end
//! of document any still-open heading closes at the last valid line.
//!
//! Lookup is backed by parallel `starts`/`ends` arrays sorted ascending,
//! so `section_of` is a single binary search.

use std::collections::HashMap;

use crate::warehouse::token::{collect_fragments, LineSpan, Token};

/// A frozen, heading-delimited span of the document
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Section {
    /// First line of the section, inclusive
    pub start_line: usize,
    /// Last line of the section, inclusive
    pub end_line: usize,
    /// Index of the heading_open token that started this section;
    /// `None` only for the implicit document-root pseudo-section
    pub heading_open: Option<usize>,
    /// Heading level 1-6; 0 for the root pseudo-section
    pub level: u8,
    /// Title text extracted from the heading's inline content
    pub title: String,
}

/// Binary-searchable index over the document's sections
#[derive(Debug, Clone)]
pub struct SectionIndex {
    sections: Vec<Section>,
    starts: Vec<usize>,
    root: Section,
    last_line: usize,
}

impl SectionIndex {
    /// All real (heading-started) sections in document order
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// The implicit root pseudo-section spanning the whole document
    pub fn root(&self) -> &Section {
        &self.root
    }

    /// The innermost section enclosing `line`, or the root pseudo-section
    /// when no heading precedes it. Lines beyond end of file are clamped
    /// to the last valid line. O(log S).
    pub fn section_of(&self, line: usize) -> &Section {
        let line = line.min(self.last_line);
        let idx = self.starts.partition_point(|&start| start <= line);
        if idx == 0 {
            return &self.root;
        }
        // The latest-started section at or before `line` always contains
        // it: had it ended earlier, the heading that closed it would have
        // started a later section at or before `line`.
        debug_assert!(self.sections[idx - 1].end_line >= line);
        &self.sections[idx - 1]
    }
}

pub(crate) fn build_section_index(
    tokens: &[Token],
    spans: &[Option<LineSpan>],
    parents: &[Option<usize>],
    pairs: &HashMap<usize, usize>,
    line_count: usize,
) -> SectionIndex {
    // Guard against underflow on empty documents
    let last_line = line_count.saturating_sub(1);

    let mut sections: Vec<Section> = Vec::new();
    // Indices into `sections` of headings not yet closed, with their levels
    let mut open: Vec<(usize, u8)> = Vec::new();

    for (idx, token) in tokens.iter().enumerate() {
        if token.kind != "heading_open" {
            continue;
        }
        let Some(level) = token.heading_level() else {
            let tag = token.tag.as_deref().unwrap_or("");
            tracing::warn!(index = idx, tag, "heading_open without a valid h1-h6 tag, skipped");
            continue;
        };
        let Some(span) = spans[idx] else {
            tracing::warn!(index = idx, "heading_open without a valid line map, skipped");
            continue;
        };
        let start_line = span.start;

        // Heading maps must be non-decreasing in token order; an
        // out-of-order start would break the sorted `starts` array, so
        // it is discarded like any other malformed mapping.
        if let Some(last) = sections.last() {
            if start_line < last.start_line {
                tracing::warn!(index = idx, start_line, "heading map out of document order, skipped");
                continue;
            }
        }

        // Close every open heading of equal or deeper level at the line
        // immediately preceding this heading's start.
        while let Some(&(section_idx, open_level)) = open.last() {
            if open_level < level {
                break;
            }
            sections[section_idx].end_line = start_line.saturating_sub(1);
            open.pop();
        }

        let title = extract_title(tokens, parents, pairs, idx);
        sections.push(Section {
            start_line,
            end_line: last_line,
            heading_open: Some(idx),
            level,
            title,
        });
        open.push((sections.len() - 1, level));
    }

    // End of document closes the rest at the last valid line; the
    // placeholder written at creation is already `last_line`, so nothing
    // remains to patch for the entries still on the stack.

    let starts = sections.iter().map(|s| s.start_line).collect();
    let root = Section {
        start_line: 0,
        end_line: last_line,
        heading_open: None,
        level: 0,
        title: String::new(),
    };
    SectionIndex {
        sections,
        starts,
        root,
        last_line,
    }
}

/// Title text comes only from the first inline token whose direct parent
/// is this heading_open; fragments are joined without separators so that
/// emphasis boundaries never introduce extra spaces.
fn extract_title(
    tokens: &[Token],
    parents: &[Option<usize>],
    pairs: &HashMap<usize, usize>,
    heading_open: usize,
) -> String {
    let bound = pairs
        .get(&heading_open)
        .copied()
        .unwrap_or(tokens.len());
    for idx in heading_open + 1..bound.min(tokens.len()) {
        if parents[idx] == Some(heading_open) {
            let mut fragments = Vec::new();
            collect_fragments(&tokens[idx], &mut fragments);
            return fragments.concat();
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::token::Nesting;

    fn heading(level: u8, line: i64) -> [Token; 3] {
        let tag = format!("h{}", level);
        [
            Token::new("heading_open", Nesting::Open)
                .with_tag(&tag)
                .with_map(line, line + 1),
            Token::new("inline", Nesting::SelfClosing).with_children(vec![Token::new(
                "text",
                Nesting::SelfClosing,
            )
            .with_content(format!("H{} at {}", level, line))]),
            Token::new("heading_close", Nesting::Close).with_tag(&tag),
        ]
    }

    fn index_for(headings: &[(u8, i64)], line_count: usize) -> SectionIndex {
        let mut tokens = Vec::new();
        for &(level, line) in headings {
            tokens.extend(heading(level, line));
        }
        let spans: Vec<Option<LineSpan>> = tokens
            .iter()
            .map(|t| t.map.and_then(LineSpan::from_raw))
            .collect();
        let mut parents = vec![None; tokens.len()];
        let mut pairs = HashMap::new();
        for chunk_start in (0..tokens.len()).step_by(3) {
            parents[chunk_start + 1] = Some(chunk_start);
            pairs.insert(chunk_start, chunk_start + 2);
        }
        build_section_index(&tokens, &spans, &parents, &pairs, line_count)
    }

    #[test]
    fn equal_level_run_produces_disjoint_sections() {
        let index = index_for(&[(2, 0), (2, 4), (2, 8)], 12);
        let bounds: Vec<(usize, usize)> = index
            .sections()
            .iter()
            .map(|s| (s.start_line, s.end_line))
            .collect();
        assert_eq!(bounds, vec![(0, 3), (4, 7), (8, 11)]);
    }

    #[test]
    fn shallower_heading_stays_open_across_deeper_ones() {
        // H1 at 0, H2 at 5, H1 at 10, EOF at 14
        let index = index_for(&[(1, 0), (2, 5), (1, 10)], 15);
        let bounds: Vec<(usize, usize, u8)> = index
            .sections()
            .iter()
            .map(|s| (s.start_line, s.end_line, s.level))
            .collect();
        assert_eq!(bounds, vec![(0, 9, 1), (5, 9, 2), (10, 14, 1)]);
    }

    #[test]
    fn section_of_returns_innermost_section() {
        let index = index_for(&[(1, 0), (2, 5), (1, 10)], 15);
        assert_eq!(index.section_of(3).level, 1);
        assert_eq!(index.section_of(7).level, 2);
        assert_eq!(index.section_of(12).start_line, 10);
    }

    #[test]
    fn empty_document_has_only_a_root_section() {
        let index = index_for(&[], 0);
        assert!(index.sections().is_empty());
        let root = index.section_of(0);
        assert_eq!(root.heading_open, None);
        assert_eq!((root.start_line, root.end_line), (0, 0));
    }

    #[test]
    fn heading_without_valid_tag_is_skipped() {
        let tokens = vec![
            Token::new("heading_open", Nesting::Open).with_map(0, 1),
            Token::new("heading_close", Nesting::Close),
        ];
        let spans = vec![LineSpan::from_raw((0, 1)), None];
        let parents = vec![None, None];
        let pairs = HashMap::from([(0usize, 1usize)]);
        let index = build_section_index(&tokens, &spans, &parents, &pairs, 4);
        assert!(index.sections().is_empty());
    }
}
