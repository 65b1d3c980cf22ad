//! Assembled runs of fragments.

use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone)]
struct Piece {
    text: String,
    /// Bytes shared with the preceding piece (0 for the first piece).
    overlap: usize,
}

/// An ordered splice of fragments with the overlap recorded at every boundary.
#[derive(Debug, Clone)]
pub struct Chain {
    pieces: VecDeque<Piece>,
    length: usize,
}

impl Chain {
    pub fn new(text: String) -> Self {
        let length = text.len();
        let mut pieces = VecDeque::with_capacity(1);
        pieces.push_back(Piece { text, overlap: 0 });
        Self { pieces, length }
    }

    /// Prepend `text`, which shares `overlap` bytes with the current front.
    pub fn add_front(&mut self, text: String, overlap: usize) {
        debug_assert!(overlap <= text.len());
        self.length += text.len().saturating_sub(overlap);
        if let Some(first) = self.pieces.front_mut() {
            first.overlap = overlap;
        }
        self.pieces.push_front(Piece { text, overlap: 0 });
    }

    /// Append `text`, which shares `overlap` bytes with the current back.
    pub fn add_back(&mut self, text: String, overlap: usize) {
        debug_assert!(overlap <= text.len());
        self.length += text.len().saturating_sub(overlap);
        self.pieces.push_back(Piece { text, overlap });
    }

    /// Splice `other` after this chain; its front shares `overlap` bytes with
    /// this chain's back.
    pub fn join(&mut self, other: Chain, overlap: usize) {
        self.length += other.length.saturating_sub(overlap);
        let mut pieces = other.pieces;
        if let Some(first) = pieces.front_mut() {
            first.overlap = overlap;
        }
        self.pieces.extend(pieces);
    }

    /// Assembled length net of every recorded overlap.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of fragments in the chain.
    pub fn size(&self) -> usize {
        self.pieces.len()
    }

    pub fn front(&self) -> &str {
        self.pieces.front().map_or("", |piece| piece.text.as_str())
    }

    pub fn back(&self) -> &str {
        self.pieces.back().map_or("", |piece| piece.text.as_str())
    }

    /// Fragment texts in assembly order.
    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.pieces.iter().map(|piece| piece.text.as_str())
    }

    /// Characters of a `target`-long original that this chain does not cover.
    pub fn skipped(&self, target: usize) -> usize {
        target.saturating_sub(self.length)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for piece in &self.pieces {
            debug_assert!(piece.text.is_char_boundary(piece.overlap));
            f.write_str(&piece.text[piece.overlap..])?;
        }
        Ok(())
    }
}

/// Chains are equal when they have the same length and the same fragments in
/// the same order; the overlaps recorded at each boundary are not compared.
impl PartialEq for Chain {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length
            && self.size() == other.size()
            && self.fragments().eq(other.fragments())
    }
}

impl Eq for Chain {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_fragment_renders_itself() {
        let chain = Chain::new("ACGTACGT".to_string());
        assert_eq!(chain.to_string(), "ACGTACGT");
        assert_eq!(chain.length(), 8);
        assert_eq!(chain.size(), 1);
        assert_eq!(chain.front(), chain.back());
    }

    #[test]
    fn growing_on_both_sides_tracks_length_and_anchors() {
        let mut chain = Chain::new("BCDE".to_string());
        chain.add_front("ABCD".to_string(), 3);
        chain.add_back("CDEF".to_string(), 3);
        chain.add_back("DEFG".to_string(), 3);

        assert_eq!(chain.to_string(), "ABCDEFG");
        assert_eq!(chain.length(), 7);
        assert_eq!(chain.size(), 4);
        assert_eq!(chain.front(), "ABCD");
        assert_eq!(chain.back(), "DEFG");
        assert_eq!(
            chain.fragments().collect::<Vec<_>>(),
            ["ABCD", "BCDE", "CDEF", "DEFG"]
        );
    }

    #[test]
    fn join_follows_merge_law() {
        let mut left = Chain::new("ABCD".to_string());
        left.add_back("BCDE".to_string(), 3);
        let mut right = Chain::new("DEFG".to_string());
        right.add_back("EFGH".to_string(), 3);

        let (la, lb) = (left.length(), right.length());
        let (text_a, text_b) = (left.to_string(), right.to_string());
        left.join(right, 2);

        assert_eq!(left.length(), la + lb - 2);
        assert_eq!(left.to_string(), format!("{}{}", text_a, &text_b[2..]));
        assert_eq!(left.to_string(), "ABCDEFGH");
    }

    #[test]
    fn rendering_uses_the_overlap_of_each_boundary() {
        let mut chain = Chain::new("ABCD".to_string());
        chain.add_back("BCDE".to_string(), 3);
        chain.join(Chain::new("DEFG".to_string()), 2);
        chain.add_back("GHIJ".to_string(), 1);
        assert_eq!(chain.to_string(), "ABCDEFGHIJ");
        assert_eq!(chain.length(), 10);
    }

    #[test]
    fn equality_ignores_recorded_overlaps() {
        let mut first = Chain::new("AAAA".to_string());
        first.add_back("AAAB".to_string(), 3);
        let mut second = Chain::new("AAAA".to_string());
        second.add_back("AAAB".to_string(), 3);
        assert_eq!(first, second);

        // Same texts and length reached through different boundaries.
        let mut left = Chain::new("AB".to_string());
        left.add_back("BC".to_string(), 1);
        left.add_back("CD".to_string(), 0);
        let mut right = Chain::new("AB".to_string());
        right.add_back("BC".to_string(), 0);
        right.add_back("CD".to_string(), 1);
        assert_eq!(left.length(), right.length());
        assert_ne!(left.to_string(), right.to_string());
        assert_eq!(left, right);

        let mut longer = Chain::new("AAAA".to_string());
        longer.add_back("AAAB".to_string(), 2);
        assert_ne!(first, longer);
    }

    #[test]
    fn multibyte_overlaps_render_whole_characters() {
        let mut chain = Chain::new("aβ".to_string());
        chain.add_back("βγ".to_string(), 'β'.len_utf8());
        assert_eq!(chain.to_string(), "aβγ");
        assert_eq!(chain.length(), "aβγ".len());
    }

    #[test]
    #[should_panic]
    fn overlap_inside_a_character_is_not_rendered_silently() {
        let mut chain = Chain::new("aβ".to_string());
        chain.add_back("βγ".to_string(), 1);
        let _ = chain.to_string();
    }

    #[test]
    fn skipped_counts_uncovered_target_characters() {
        let mut chain = Chain::new("ABCDE".to_string());
        chain.add_back("BCDEF".to_string(), 4);
        assert_eq!(chain.skipped(10), 4);
        assert_eq!(chain.skipped(6), 0);
        assert_eq!(chain.skipped(3), 0);
    }
}
