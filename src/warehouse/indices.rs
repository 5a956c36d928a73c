//! Warehouse construction: derived indices over the token sequence
//!
//! The warehouse owns the tokens for the duration of processing and builds
//! every derived index exactly once, in a bounded number of linear passes:
//!
//! 1. resource-limit validation (token count, buffer bytes),
//! 2. map validation (clamp malformed line ranges to "no mapping"),
//! 3. one structural pass filling `by_type`, `pairs`/`pairs_rev` and
//!    `parents` with an open-token stack (nesting depth checked here),
//! 4. section index construction.
//!
//! The `children` index is deliberately not built here: it is memoized on
//! the first `find_children` call (see the queries module).

use std::collections::HashMap;

use once_cell::unsync::OnceCell;

use crate::error::{LimitKind, WarehouseError};
use crate::limits::ResourceLimits;
use crate::warehouse::sections::{build_section_index, SectionIndex};
use crate::warehouse::token::{LineSpan, Token};

/// Shape of the normalized source buffer the tokens were produced from
///
/// The buffer itself stays with the external parser shim; the warehouse
/// never re-normalizes or copies it, it only needs the line count for
/// section boundaries and the byte length for resource limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceInfo {
    pub line_count: usize,
    pub byte_len: usize,
}

/// Owns a document's token sequence and all derived indices
#[derive(Debug)]
pub struct Warehouse {
    tokens: Vec<Token>,
    line_count: usize,
    /// Validated line span per token; `None` where the tokenizer gave no
    /// map or a malformed one
    spans: Vec<Option<LineSpan>>,
    malformed_maps: usize,
    /// Token type -> ascending token indices
    by_type: HashMap<String, Vec<usize>>,
    /// open index -> close index, first match wins
    pairs: HashMap<usize, usize>,
    /// close index -> open index
    pairs_rev: HashMap<usize, usize>,
    /// token index -> enclosing open token, `None` at depth 0
    parents: Vec<Option<usize>>,
    unmatched_opens: usize,
    /// Memoized on first `find_children` call
    pub(crate) children: OnceCell<HashMap<usize, Vec<usize>>>,
    sections: SectionIndex,
}

impl Warehouse {
    /// Build a warehouse over `tokens`, enforcing `limits`.
    ///
    /// Fails with a distinct resource-limit error before any index is
    /// built when the token count or buffer size exceeds its bound, and
    /// during the structural pass when nesting depth does. Malformed
    /// token maps and unmatched open tokens never fail the build.
    pub fn build(
        tokens: Vec<Token>,
        source: SourceInfo,
        limits: &ResourceLimits,
    ) -> Result<Warehouse, WarehouseError> {
        check_limit(LimitKind::Tokens, tokens.len(), limits.max_tokens)?;
        check_limit(LimitKind::Bytes, source.byte_len, limits.max_bytes)?;

        let (spans, malformed_maps) = validate_maps(&tokens);
        let structural = build_structural(&tokens, limits.max_nesting)?;
        let sections = build_section_index(
            &tokens,
            &spans,
            &structural.parents,
            &structural.pairs,
            source.line_count,
        );

        tracing::debug!(
            tokens = tokens.len(),
            pairs = structural.pairs.len(),
            unmatched_opens = structural.unmatched_opens,
            malformed_maps,
            sections = sections.sections().len(),
            "warehouse indices built"
        );

        Ok(Warehouse {
            tokens,
            line_count: source.line_count,
            spans,
            malformed_maps,
            by_type: structural.by_type,
            pairs: structural.pairs,
            pairs_rev: structural.pairs_rev,
            parents: structural.parents,
            unmatched_opens: structural.unmatched_opens,
            children: OnceCell::new(),
            sections,
        })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, idx: usize) -> Option<&Token> {
        self.tokens.get(idx)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Validated line span of a token, if it has one
    pub fn span(&self, idx: usize) -> Option<LineSpan> {
        self.spans.get(idx).copied().flatten()
    }

    /// Number of tokenizer maps discarded as malformed during the build
    pub fn malformed_map_count(&self) -> usize {
        self.malformed_maps
    }

    /// Number of open tokens left without a close partner at end of input
    pub fn unmatched_open_count(&self) -> usize {
        self.unmatched_opens
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub(crate) fn by_type_index(&self, kind: &str) -> Option<&[usize]> {
        self.by_type.get(kind).map(Vec::as_slice)
    }

    pub(crate) fn pairs_index(&self) -> &HashMap<usize, usize> {
        &self.pairs
    }

    pub(crate) fn pairs_rev_index(&self) -> &HashMap<usize, usize> {
        &self.pairs_rev
    }

    pub(crate) fn parents_index(&self) -> &[Option<usize>] {
        &self.parents
    }

    pub(crate) fn section_index(&self) -> &SectionIndex {
        &self.sections
    }
}

fn check_limit(kind: LimitKind, actual: usize, limit: usize) -> Result<(), WarehouseError> {
    if actual > limit {
        return Err(WarehouseError::ResourceLimit {
            kind,
            actual,
            limit,
        });
    }
    Ok(())
}

/// Validate every raw tokenizer map, counting the malformed ones
fn validate_maps(tokens: &[Token]) -> (Vec<Option<LineSpan>>, usize) {
    let mut malformed = 0;
    let spans = tokens
        .iter()
        .enumerate()
        .map(|(idx, token)| match token.map {
            None => None,
            Some(raw) => {
                let span = LineSpan::from_raw(raw);
                if span.is_none() {
                    malformed += 1;
                    tracing::warn!(index = idx, map = ?raw, "malformed token map discarded");
                }
                span
            }
        })
        .collect();
    (spans, malformed)
}

struct StructuralIndices {
    by_type: HashMap<String, Vec<usize>>,
    pairs: HashMap<usize, usize>,
    pairs_rev: HashMap<usize, usize>,
    parents: Vec<Option<usize>>,
    unmatched_opens: usize,
}

/// Single linear pass with an open-token stack.
///
/// Invariants established here:
/// - `by_type` lists are ascending (indices are pushed in order);
/// - a pair entry, once written, is never overwritten (first match wins);
/// - a close token inherits the parent of its matching open token;
/// - unmatched opens and closes are left unpaired, never an error.
fn build_structural(
    tokens: &[Token],
    max_nesting: usize,
) -> Result<StructuralIndices, WarehouseError> {
    use crate::warehouse::token::Nesting;

    let mut by_type: HashMap<String, Vec<usize>> = HashMap::new();
    let mut pairs = HashMap::new();
    let mut pairs_rev = HashMap::new();
    let mut parents = vec![None; tokens.len()];
    let mut stack: Vec<usize> = Vec::new();

    for (idx, token) in tokens.iter().enumerate() {
        by_type.entry(token.kind.clone()).or_default().push(idx);

        match token.nesting {
            Nesting::Open => {
                parents[idx] = stack.last().copied();
                stack.push(idx);
                if stack.len() > max_nesting {
                    return Err(WarehouseError::ResourceLimit {
                        kind: LimitKind::Nesting,
                        actual: stack.len(),
                        limit: max_nesting,
                    });
                }
            }
            Nesting::Close => match stack.pop() {
                Some(open_idx) => {
                    pairs.entry(open_idx).or_insert(idx);
                    pairs_rev.entry(idx).or_insert(open_idx);
                    parents[idx] = parents[open_idx];
                }
                None => {
                    tracing::warn!(index = idx, kind = %token.kind, "close token without a matching open");
                }
            },
            Nesting::SelfClosing => {
                parents[idx] = stack.last().copied();
            }
        }
    }

    let unmatched_opens = stack.len();
    if unmatched_opens > 0 {
        tracing::warn!(
            count = unmatched_opens,
            "open tokens left unpaired at end of input"
        );
    }

    Ok(StructuralIndices {
        by_type,
        pairs,
        pairs_rev,
        parents,
        unmatched_opens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::token::Nesting;

    fn source(line_count: usize) -> SourceInfo {
        SourceInfo {
            line_count,
            byte_len: line_count * 40,
        }
    }

    fn paragraph(text: &str, line: i64) -> Vec<Token> {
        vec![
            Token::new("paragraph_open", Nesting::Open)
                .with_tag("p")
                .with_map(line, line + 1),
            Token::new("inline", Nesting::SelfClosing).with_children(vec![Token::new(
                "text",
                Nesting::SelfClosing,
            )
            .with_content(text)]),
            Token::new("paragraph_close", Nesting::Close).with_tag("p"),
        ]
    }

    #[test]
    fn close_inherits_parent_of_its_open() {
        let mut tokens = vec![Token::new("blockquote_open", Nesting::Open).with_map(0, 4)];
        tokens.extend(paragraph("quoted", 1));
        tokens.push(Token::new("blockquote_close", Nesting::Close));
        let wh = Warehouse::build(tokens, source(5), &ResourceLimits::default()).unwrap();

        // paragraph pair sits inside the blockquote
        assert_eq!(wh.parents_index()[1], Some(0));
        assert_eq!(wh.parents_index()[3], Some(0));
        // blockquote pair sits at depth 0
        assert_eq!(wh.parents_index()[0], None);
        assert_eq!(wh.parents_index()[4], None);
        assert_eq!(wh.pairs_index().get(&0), Some(&4));
        assert_eq!(wh.pairs_index().get(&1), Some(&3));
    }

    #[test]
    fn unmatched_open_does_not_fail_the_build() {
        let tokens = vec![
            Token::new("blockquote_open", Nesting::Open).with_map(0, 3),
            Token::new("inline", Nesting::SelfClosing),
        ];
        let wh = Warehouse::build(tokens, source(3), &ResourceLimits::default()).unwrap();
        assert_eq!(wh.unmatched_open_count(), 1);
        assert!(wh.pairs_index().is_empty());
    }

    #[test]
    fn malformed_map_is_discarded_not_fatal() {
        let tokens = vec![Token::new("fence", Nesting::SelfClosing).with_map(-1, 5)];
        let wh = Warehouse::build(tokens, source(6), &ResourceLimits::default()).unwrap();
        assert_eq!(wh.malformed_map_count(), 1);
        assert_eq!(wh.span(0), None);
    }

    #[test]
    fn token_limit_fails_before_indexing() {
        let tokens: Vec<Token> = (0..4)
            .map(|_| Token::new("text", Nesting::SelfClosing))
            .collect();
        let mut limits = ResourceLimits::default();
        limits.max_tokens = 3;
        let err = Warehouse::build(tokens, source(1), &limits).unwrap_err();
        assert_eq!(
            err,
            WarehouseError::ResourceLimit {
                kind: LimitKind::Tokens,
                actual: 4,
                limit: 3
            }
        );
    }

    #[test]
    fn nesting_limit_fails_during_structural_pass() {
        let mut tokens = Vec::new();
        for _ in 0..5 {
            tokens.push(Token::new("blockquote_open", Nesting::Open));
        }
        for _ in 0..5 {
            tokens.push(Token::new("blockquote_close", Nesting::Close));
        }
        let mut limits = ResourceLimits::default();
        limits.max_nesting = 4;
        let err = Warehouse::build(tokens, source(10), &limits).unwrap_err();
        assert!(matches!(
            err,
            WarehouseError::ResourceLimit {
                kind: LimitKind::Nesting,
                ..
            }
        ));
    }

    #[test]
    fn by_type_lists_are_ascending() {
        let mut tokens = paragraph("one", 0);
        tokens.extend(paragraph("two", 2));
        tokens.extend(paragraph("three", 4));
        let wh = Warehouse::build(tokens, source(6), &ResourceLimits::default()).unwrap();
        let opens = wh.by_type_index("paragraph_open").unwrap();
        assert_eq!(opens, &[0, 3, 6]);
    }
}
