//! Structural queries over a built warehouse
//!
//! All queries are read-only and sublinear: pair and parent lookups are
//! O(1), children lookups are O(1) after the memoized index is built on
//! first access, `tokens_between` binary-searches the per-type index and
//! `section_of` binary-searches the section bounds. Absence (no pair, no
//! parent, no children) is a normal state and answered with `None` or an
//! empty slice, never an error.

use std::collections::HashMap;

use crate::warehouse::indices::Warehouse;
use crate::warehouse::sections::Section;
use crate::warehouse::token::collect_fragments;

static NO_CHILDREN: [usize; 0] = [];

impl Warehouse {
    /// Index of the close token matching the open token at `idx`
    pub fn find_close(&self, idx: usize) -> Option<usize> {
        self.pairs_index().get(&idx).copied()
    }

    /// Index of the open token matching the close token at `idx`
    pub fn find_open(&self, idx: usize) -> Option<usize> {
        self.pairs_rev_index().get(&idx).copied()
    }

    /// Index of the structurally enclosing open token, `None` at depth 0
    pub fn find_parent(&self, idx: usize) -> Option<usize> {
        self.parents_index().get(idx).copied().flatten()
    }

    /// Ordered immediate children of the open token at `idx`.
    ///
    /// The children index is memoized: the first call scans the parent
    /// index once and caches the result, later calls are plain lookups.
    pub fn find_children(&self, idx: usize) -> &[usize] {
        let index = self.children.get_or_init(|| {
            let mut by_parent: HashMap<usize, Vec<usize>> = HashMap::new();
            for (child, parent) in self.parents_index().iter().enumerate() {
                if let Some(parent) = parent {
                    by_parent.entry(*parent).or_default().push(child);
                }
            }
            by_parent
        });
        index.get(&idx).map_or(&NO_CHILDREN, Vec::as_slice)
    }

    /// Ordered token indices strictly between positions `a` and `b`,
    /// optionally restricted to one token type.
    ///
    /// The filtered form binary-searches the ascending per-type index,
    /// O(log N + K) for K results.
    pub fn tokens_between(&self, a: usize, b: usize, kind: Option<&str>) -> Vec<usize> {
        if b <= a + 1 {
            return Vec::new();
        }
        match kind {
            Some(kind) => {
                let Some(index) = self.by_type_index(kind) else {
                    return Vec::new();
                };
                let lo = index.partition_point(|&i| i <= a);
                let hi = index.partition_point(|&i| i < b);
                index[lo..hi].to_vec()
            }
            None => (a + 1..b.min(self.len())).collect(),
        }
    }

    /// Concatenated textual content of tokens strictly between `a` and `b`,
    /// descending into inline children.
    ///
    /// With `join_spaces` the fragments are separated by single spaces;
    /// heading-title extraction must pass `false` so that emphasis
    /// boundaries inside a heading never introduce spurious spaces.
    pub fn text_between(&self, a: usize, b: usize, join_spaces: bool) -> String {
        let mut fragments = Vec::new();
        for idx in self.tokens_between(a, b, None) {
            collect_fragments(&self.tokens()[idx], &mut fragments);
        }
        if join_spaces {
            fragments.join(" ")
        } else {
            fragments.concat()
        }
    }

    /// The innermost section enclosing `line`, or the document-root
    /// pseudo-section. O(log S); lines beyond end of file are clamped.
    pub fn section_of(&self, line: usize) -> &Section {
        self.section_index().section_of(line)
    }

    /// All heading-started sections in document order
    pub fn sections(&self) -> &[Section] {
        self.section_index().sections()
    }

    /// The implicit root pseudo-section spanning the whole document
    pub fn root_section(&self) -> &Section {
        self.section_index().root()
    }
}
