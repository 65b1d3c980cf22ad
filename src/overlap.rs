//! Offset-specific overlap index over a working set of anchor strings.
//!
//! Candidate lists live in an arena and are addressed by [`ListId`]. Every
//! entry remembers which lists currently hold its key, so removing an anchor
//! only touches the lists that mention it.

use std::collections::{HashMap, HashSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Handle of a candidate list inside the index arena.
type ListId = usize;

/// Errors raised by index lookups and construction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OverlapError {
    #[error("anchor not found in overlap index: {0:?}")]
    NotFound(String),
    #[error("overlap offset must be at least 1")]
    InvalidOffset,
}

/// `true` when dropping the last `offset` bytes of `prefix` leaves exactly the
/// bytes of `word` after its first `offset` bytes, i.e. `word` can precede
/// `prefix` with a shift of `offset`.
pub fn is_prefix(prefix: &str, word: &str, offset: usize) -> bool {
    let (prefix, word) = (prefix.as_bytes(), word.as_bytes());
    if prefix.len() <= offset || word.len() <= offset {
        return false;
    }
    prefix[..prefix.len() - offset] == word[offset..]
}

/// Mirror of [`is_prefix`]: `word` can follow `suffix` with a shift of `offset`.
pub fn is_suffix(suffix: &str, word: &str, offset: usize) -> bool {
    is_prefix(word, suffix, offset)
}

#[derive(Debug, Clone)]
struct Entry {
    /// Anchors that may precede this key.
    prefixes: ListId,
    /// Anchors that may follow this key.
    suffixes: ListId,
    /// Lists (owned by other entries) that currently contain this key.
    holders: HashSet<ListId>,
}

/// Prefix/suffix candidate index for one offset round.
#[derive(Debug, Clone)]
pub struct OverlapIndex {
    offset: usize,
    entries: HashMap<String, Entry>,
    lists: Vec<Vec<String>>,
}

impl OverlapIndex {
    /// Index every anchor against every other anchor.
    pub fn symmetric(
        anchors: &[String],
        offset: usize,
        use_threads: bool,
    ) -> Result<Self, OverlapError> {
        if offset == 0 {
            return Err(OverlapError::InvalidOffset);
        }

        let candidates = collect_candidates(anchors, anchors, offset, use_threads, true);

        let mut index = Self::with_capacity(offset, anchors.len());
        for (text, prefixes) in anchors.iter().zip(candidates.iter()) {
            let prefixes = prefixes.iter().map(|&i| anchors[i].clone()).collect();
            index.insert_entry(text, prefixes);
        }
        for (text, prefixes) in anchors.iter().zip(candidates) {
            for i in prefixes {
                index.link(&anchors[i], text);
            }
        }
        Ok(index)
    }

    /// Index chain back anchors against chain front anchors: fronts only gain
    /// prefix candidates drawn from `backs`, backs only gain suffix candidates
    /// drawn from `fronts`. Every anchor gets an entry, even with no candidates.
    pub fn asymmetric(
        backs: &[String],
        fronts: &[String],
        offset: usize,
        use_threads: bool,
    ) -> Result<Self, OverlapError> {
        if offset == 0 {
            return Err(OverlapError::InvalidOffset);
        }

        let candidates = collect_candidates(fronts, backs, offset, use_threads, false);

        let mut index = Self::with_capacity(offset, fronts.len() + backs.len());
        for (text, prefixes) in fronts.iter().zip(candidates.iter()) {
            let prefixes = prefixes.iter().map(|&i| backs[i].clone()).collect();
            index.insert_entry(text, prefixes);
        }
        for text in backs {
            if !index.entries.contains_key(text) {
                index.insert_entry(text, Vec::new());
            }
        }
        for (text, prefixes) in fronts.iter().zip(candidates) {
            for i in prefixes {
                index.link(&backs[i], text);
            }
        }
        Ok(index)
    }

    fn with_capacity(offset: usize, anchors: usize) -> Self {
        Self {
            offset,
            entries: HashMap::with_capacity(anchors),
            lists: Vec::with_capacity(anchors * 2),
        }
    }

    fn insert_entry(&mut self, text: &str, prefixes: Vec<String>) {
        let prefix_id = self.lists.len();
        self.lists.push(prefixes);
        let suffix_id = self.lists.len();
        self.lists.push(Vec::new());
        self.entries.insert(
            text.to_owned(),
            Entry {
                prefixes: prefix_id,
                suffixes: suffix_id,
                holders: HashSet::new(),
            },
        );
    }

    /// Publish the reverse half of an edge `pred -> succ` whose forward half
    /// (`pred` in the prefix list of `succ`) is already stored.
    fn link(&mut self, pred: &str, succ: &str) {
        let (Some(pred_entry), Some(succ_entry)) = (self.entries.get(pred), self.entries.get(succ))
        else {
            return;
        };
        let pred_suffixes = pred_entry.suffixes;
        let succ_prefixes = succ_entry.prefixes;

        self.lists[pred_suffixes].push(succ.to_owned());
        if let Some(entry) = self.entries.get_mut(pred) {
            entry.holders.insert(succ_prefixes);
        }
        if let Some(entry) = self.entries.get_mut(succ) {
            entry.holders.insert(pred_suffixes);
        }
    }

    fn entry(&self, key: &str) -> Result<&Entry, OverlapError> {
        self.entries
            .get(key)
            .ok_or_else(|| OverlapError::NotFound(key.to_owned()))
    }

    /// Shift used for every comparison in this index.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Anchors that may precede `key`, in discovery order.
    pub fn get_prefixes(&self, key: &str) -> Result<&[String], OverlapError> {
        let entry = self.entry(key)?;
        Ok(&self.lists[entry.prefixes])
    }

    /// Anchors that may follow `key`, in discovery order.
    pub fn get_suffixes(&self, key: &str) -> Result<&[String], OverlapError> {
        let entry = self.entry(key)?;
        Ok(&self.lists[entry.suffixes])
    }

    /// Delete `key` and erase it from every candidate list that holds it.
    pub fn remove(&mut self, key: &str) -> Result<(), OverlapError> {
        let entry = self
            .entries
            .remove(key)
            .ok_or_else(|| OverlapError::NotFound(key.to_owned()))?;

        for &holder in &entry.holders {
            self.lists[holder].retain(|anchor| anchor != key);
        }

        // Anchors listed by the removed entry are no longer held by its lists.
        for own in [entry.prefixes, entry.suffixes] {
            for member in std::mem::take(&mut self.lists[own]) {
                if let Some(other) = self.entries.get_mut(&member) {
                    other.holders.remove(&own);
                }
            }
        }
        Ok(())
    }

    /// Delete the single edge `pred -> succ` from both sides.
    pub fn unlink(&mut self, pred: &str, succ: &str) -> Result<(), OverlapError> {
        let pred_suffixes = self.entry(pred)?.suffixes;
        let succ_prefixes = self.entry(succ)?.prefixes;

        self.lists[pred_suffixes].retain(|anchor| anchor != succ);
        self.lists[succ_prefixes].retain(|anchor| anchor != pred);

        if let Some(entry) = self.entries.get_mut(pred) {
            entry.holders.remove(&succ_prefixes);
        }
        if let Some(entry) = self.entries.get_mut(succ) {
            entry.holders.remove(&pred_suffixes);
        }
        Ok(())
    }

    /// Drop every edge ending at `key`; its suffix side is left untouched.
    pub fn clear_prefixes(&mut self, key: &str) -> Result<(), OverlapError> {
        let prefixes = self.get_prefixes(key)?.to_vec();
        for pred in prefixes {
            self.unlink(&pred, key)?;
        }
        Ok(())
    }

    /// Drop every edge starting at `key`; its prefix side is left untouched.
    pub fn clear_suffixes(&mut self, key: &str) -> Result<(), OverlapError> {
        let suffixes = self.get_suffixes(key)?.to_vec();
        for succ in suffixes {
            self.unlink(key, &succ)?;
        }
        Ok(())
    }
}

/// For each anchor in `targets`, the positions in `pool` of the words that
/// may precede it. Each target is independent, so this is the parallel half of
/// construction; publishing into the index happens afterwards on one thread.
fn collect_candidates(
    targets: &[String],
    pool: &[String],
    offset: usize,
    use_threads: bool,
    skip_self: bool,
) -> Vec<Vec<usize>> {
    let candidates_for = |text: &String| -> Vec<usize> {
        pool.iter()
            .enumerate()
            .filter(|(_, word)| !(skip_self && *word == text))
            .filter(|(_, word)| is_prefix(text, word, offset))
            .map(|(i, _)| i)
            .collect()
    };

    if use_threads {
        #[cfg(feature = "parallel")]
        {
            targets.par_iter().map(candidates_for).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            log::warn!(
                "Threaded index construction requested, but the 'parallel' feature is not enabled; falling back to sequential mode"
            );
            targets.iter().map(candidates_for).collect()
        }
    } else {
        targets.iter().map(candidates_for).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn spectrum() -> Vec<String> {
        strings(&["BCDE", "ABCD", "CDEF", "DEFG"])
    }

    #[test]
    fn prefix_predicate_matches_shifted_windows() {
        assert!(is_prefix("BCDE", "ABCD", 1));
        assert!(!is_prefix("ABCD", "BCDE", 1));
        assert!(is_prefix("CDEF", "ABCD", 2));
        assert!(!is_prefix("AB", "AB", 2));
        assert!(!is_prefix("ABC", "AB", 1));
        assert!(is_suffix("ABCD", "BCDE", 1));
        assert_eq!(is_suffix("ABCD", "CDEF", 2), is_prefix("CDEF", "ABCD", 2));
    }

    #[test]
    fn symmetric_index_records_both_directions() {
        let anchors = spectrum();
        let index = OverlapIndex::symmetric(&anchors, 1, false).expect("index");

        assert_eq!(index.len(), 4);
        assert_eq!(index.get_prefixes("BCDE").unwrap(), ["ABCD"]);
        assert_eq!(index.get_suffixes("BCDE").unwrap(), ["CDEF"]);
        assert!(index.get_prefixes("ABCD").unwrap().is_empty());
        assert!(index.get_suffixes("DEFG").unwrap().is_empty());
    }

    #[test]
    fn symmetric_index_skips_periodic_self_match() {
        let anchors = strings(&["AAAA", "AAAB"]);
        let index = OverlapIndex::symmetric(&anchors, 1, false).expect("index");
        assert!(!index.get_prefixes("AAAA").unwrap().contains(&"AAAA".to_string()));
        assert_eq!(index.get_suffixes("AAAA").unwrap(), ["AAAB"]);
    }

    #[test]
    fn candidate_lists_keep_discovery_order() {
        let anchors = strings(&["XAB", "YAB", "ABC"]);
        let index = OverlapIndex::symmetric(&anchors, 1, false).expect("index");
        assert_eq!(index.get_prefixes("ABC").unwrap(), ["XAB", "YAB"]);
    }

    #[test]
    fn remove_erases_every_reference() {
        let anchors = spectrum();
        let mut index = OverlapIndex::symmetric(&anchors, 1, false).expect("index");

        index.remove("CDEF").expect("remove");

        assert!(!index.contains("CDEF"));
        for anchor in ["ABCD", "BCDE", "DEFG"] {
            assert!(!index.get_prefixes(anchor).unwrap().contains(&"CDEF".to_string()));
            assert!(!index.get_suffixes(anchor).unwrap().contains(&"CDEF".to_string()));
        }
        assert!(index.get_suffixes("BCDE").unwrap().is_empty());
        assert!(index.get_prefixes("DEFG").unwrap().is_empty());
    }

    #[test]
    fn removing_twice_reports_not_found() {
        let anchors = spectrum();
        let mut index = OverlapIndex::symmetric(&anchors, 1, false).expect("index");
        index.remove("ABCD").unwrap();
        assert_eq!(
            index.remove("ABCD"),
            Err(OverlapError::NotFound("ABCD".to_string()))
        );
        assert!(index.get_prefixes("missing").is_err());
    }

    #[test]
    fn zero_offset_is_rejected() {
        let anchors = spectrum();
        assert_eq!(
            OverlapIndex::symmetric(&anchors, 0, false).err(),
            Some(OverlapError::InvalidOffset)
        );
        assert_eq!(
            OverlapIndex::asymmetric(&anchors, &anchors, 0, false).err(),
            Some(OverlapError::InvalidOffset)
        );
    }

    #[test]
    fn asymmetric_index_pairs_backs_with_fronts_only() {
        let backs = strings(&["ABCD", "QRST"]);
        let fronts = strings(&["CDEF", "BCDE"]);
        let index = OverlapIndex::asymmetric(&backs, &fronts, 2, false).expect("index");

        assert_eq!(index.len(), 4);
        assert_eq!(index.get_suffixes("ABCD").unwrap(), ["CDEF"]);
        assert_eq!(index.get_prefixes("CDEF").unwrap(), ["ABCD"]);
        // BCDE would follow ABCD at shift 1 only.
        assert!(index.get_prefixes("BCDE").unwrap().is_empty());
        // Backs never gain prefixes, fronts never gain suffixes.
        assert!(index.get_prefixes("ABCD").unwrap().is_empty());
        assert!(index.get_suffixes("CDEF").unwrap().is_empty());
        assert!(index.get_suffixes("QRST").unwrap().is_empty());
    }

    #[test]
    fn asymmetric_index_keeps_self_pairs_for_pruning() {
        // Single-fragment chain: the same text is both a front and a back.
        let anchors = strings(&["ABAB"]);
        let mut index = OverlapIndex::asymmetric(&anchors, &anchors, 2, false).expect("index");
        assert_eq!(index.get_suffixes("ABAB").unwrap(), ["ABAB"]);

        index.unlink("ABAB", "ABAB").expect("unlink");
        assert!(index.get_suffixes("ABAB").unwrap().is_empty());
        assert!(index.get_prefixes("ABAB").unwrap().is_empty());
        assert!(index.contains("ABAB"));
    }

    #[test]
    fn clearing_one_side_keeps_the_other() {
        let anchors = spectrum();
        let mut index = OverlapIndex::symmetric(&anchors, 1, false).expect("index");

        index.clear_prefixes("BCDE").expect("clear");
        assert!(index.get_prefixes("BCDE").unwrap().is_empty());
        assert!(index.get_suffixes("ABCD").unwrap().is_empty());
        assert_eq!(index.get_suffixes("BCDE").unwrap(), ["CDEF"]);

        index.clear_suffixes("BCDE").expect("clear");
        assert!(index.get_prefixes("CDEF").unwrap().is_empty());

        // Stale holders must not disturb later removals.
        index.remove("BCDE").expect("remove");
        assert_eq!(index.get_suffixes("CDEF").unwrap(), ["DEFG"]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn threaded_construction_matches_sequential() {
        let text = "THEQUICKBROWNFOXJUMPSOVERTHELAZYDOG";
        let anchors: Vec<String> = (0..=text.len() - 6)
            .map(|i| text[i..i + 6].to_string())
            .collect();
        let sequential = OverlapIndex::symmetric(&anchors, 1, false).unwrap();
        let threaded = OverlapIndex::symmetric(&anchors, 1, true).unwrap();
        for anchor in &anchors {
            assert_eq!(
                sequential.get_prefixes(anchor).unwrap(),
                threaded.get_prefixes(anchor).unwrap()
            );
            assert_eq!(
                sequential.get_suffixes(anchor).unwrap(),
                threaded.get_suffixes(anchor).unwrap()
            );
        }
    }
}
