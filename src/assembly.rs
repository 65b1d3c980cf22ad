//! Multi-round greedy assembly of fragments into chains.
//!
//! Round 0 glues fragments that overlap exactly (shift 1). Each later round
//! `i` rebuilds an [`OverlapIndex`] over the live chain anchors at shift `i`
//! and merges chains, longest partner first, until a chain reaches the target
//! length, a single chain remains, or the round bound is exhausted.

use std::collections::{HashMap, HashSet};

use log::{debug, info, trace, warn};
use serde::Serialize;

use crate::chain::Chain;
use crate::overlap::{OverlapError, OverlapIndex};

/// Position of a chain in the driver's chain arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(usize);

/// Errors raised while driving an assembly.
#[derive(thiserror::Error, Debug)]
pub enum AssemblyError {
    #[error("anchor is not live: {0:?}")]
    UnknownAnchor(String),
    #[error("chain {0:?} is no longer live")]
    UnknownChain(ChainId),
    #[error("anchor {0:?} belongs to more than one chain")]
    DuplicateAnchor(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
    #[error(transparent)]
    Overlap(#[from] OverlapError),
}

/// Options that govern a single assembly run.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyConfig {
    /// Length of the original string; assembly stops once a chain reaches it.
    pub target_length: usize,
    /// Highest shift tried by the error-tolerant rounds.
    pub max_offset: usize,
    /// Build overlap indexes on a worker pool.
    pub use_threads: bool,
    /// Worker count when threading is enabled.
    pub max_workers: usize,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            target_length: 1,
            max_offset: 5,
            use_threads: false,
            max_workers: 1,
        }
    }
}

/// Outcome of a complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assembly {
    /// Longest chain, truncated to the target length.
    pub sequence: String,
    /// Untruncated length of the longest chain.
    pub length: usize,
    /// Target characters the longest chain does not cover.
    pub skipped: usize,
    /// Error-tolerant rounds that were executed.
    pub rounds: usize,
    /// Chains still live at the end.
    pub chains: usize,
    pub reached_target: bool,
}

/// Greedy multi-round assembler.
pub struct AssemblyDriver {
    config: AssemblyConfig,
    chains: Vec<Option<Chain>>,
    by_front: HashMap<String, ChainId>,
    by_back: HashMap<String, ChainId>,
    rounds: usize,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl AssemblyDriver {
    pub fn new(config: AssemblyConfig) -> Result<Self, AssemblyError> {
        if config.target_length == 0 {
            return Err(AssemblyError::InvalidConfig(
                "target length must be at least 1".to_string(),
            ));
        }
        if config.max_offset == 0 {
            return Err(AssemblyError::InvalidConfig(
                "maximum offset must be at least 1".to_string(),
            ));
        }

        #[cfg(feature = "parallel")]
        let pool = if config.use_threads {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.max_workers.max(1))
                .build()
                .map_err(|error| AssemblyError::ThreadPool(error.to_string()))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            config,
            chains: Vec::new(),
            by_front: HashMap::new(),
            by_back: HashMap::new(),
            rounds: 0,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    /// Start from already assembled chains instead of raw fragments.
    pub fn from_chains(
        chains: Vec<Chain>,
        config: AssemblyConfig,
    ) -> Result<Self, AssemblyError> {
        let mut driver = Self::new(config)?;
        for chain in chains {
            for anchor in [chain.front(), chain.back()] {
                if driver.is_anchor(anchor) {
                    return Err(AssemblyError::DuplicateAnchor(anchor.to_owned()));
                }
            }
            driver.register(chain);
        }
        Ok(driver)
    }

    /// `true` when `text` is the front or back of any live chain.
    fn is_anchor(&self, text: &str) -> bool {
        self.by_front.contains_key(text) || self.by_back.contains_key(text)
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Number of live chains.
    pub fn len(&self) -> usize {
        self.by_front.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_front.is_empty()
    }

    /// Error-tolerant rounds executed so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn chain(&self, id: ChainId) -> Result<&Chain, AssemblyError> {
        self.chains
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(AssemblyError::UnknownChain(id))
    }

    fn chain_mut(&mut self, id: ChainId) -> Result<&mut Chain, AssemblyError> {
        self.chains
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(AssemblyError::UnknownChain(id))
    }

    pub fn live_chains(&self) -> impl Iterator<Item = &Chain> {
        self.chains.iter().flatten()
    }

    pub fn fronts(&self) -> Vec<String> {
        self.by_front.keys().cloned().collect()
    }

    pub fn backs(&self) -> Vec<String> {
        self.by_back.keys().cloned().collect()
    }

    pub fn get_by_front(&self, anchor: &str) -> Result<ChainId, AssemblyError> {
        self.by_front
            .get(anchor)
            .copied()
            .ok_or_else(|| AssemblyError::UnknownAnchor(anchor.to_owned()))
    }

    pub fn get_by_back(&self, anchor: &str) -> Result<ChainId, AssemblyError> {
        self.by_back
            .get(anchor)
            .copied()
            .ok_or_else(|| AssemblyError::UnknownAnchor(anchor.to_owned()))
    }

    /// Live chain ids, longest first; equal lengths put fewer fragments first.
    pub fn sorted_ids(&self) -> Vec<ChainId> {
        let mut ids: Vec<ChainId> = self
            .chains
            .iter()
            .enumerate()
            .filter(|(_, chain)| chain.is_some())
            .map(|(i, _)| ChainId(i))
            .collect();
        ids.sort_by(|a, b| {
            let (a, b) = (&self.chains[a.0], &self.chains[b.0]);
            match (a, b) {
                (Some(a), Some(b)) => b
                    .length()
                    .cmp(&a.length())
                    .then(a.size().cmp(&b.size())),
                _ => std::cmp::Ordering::Equal,
            }
        });
        ids
    }

    /// Longest live chain under the same ordering as [`Self::sorted_ids`].
    pub fn longest(&self) -> Option<&Chain> {
        self.sorted_ids()
            .first()
            .and_then(|id| self.chains[id.0].as_ref())
    }

    fn register(&mut self, chain: Chain) -> ChainId {
        let id = ChainId(self.chains.len());
        self.by_front.insert(chain.front().to_owned(), id);
        self.by_back.insert(chain.back().to_owned(), id);
        self.chains.push(Some(chain));
        id
    }

    fn build_index<F>(&self, build: F) -> Result<OverlapIndex, AssemblyError>
    where
        F: FnOnce(bool) -> Result<OverlapIndex, OverlapError> + Send,
    {
        #[cfg(feature = "parallel")]
        {
            if let Some(pool) = &self.pool {
                return Ok(pool.install(|| build(true))?);
            }
        }
        Ok(build(self.config.use_threads)?)
    }

    /// Round 0: chain fragments that overlap exactly. Returns `true` once a
    /// chain reaches the target length.
    pub fn seed(&mut self, fragments: &[String]) -> Result<bool, AssemblyError> {
        let target = self.config.target_length;
        info!("Indexing {} fragments at offset 1...", fragments.len());
        let mut index = self.build_index(|threads| OverlapIndex::symmetric(fragments, 1, threads))?;

        let mut consumed: HashSet<String> = HashSet::with_capacity(fragments.len());
        for seed in fragments {
            if !consumed.insert(seed.clone()) {
                continue;
            }
            let mut chain = Chain::new(seed.clone());

            while chain.length() < target {
                let Some(prefix) = index.get_prefixes(chain.front())?.first().cloned() else {
                    break;
                };
                let previous = chain.front().to_owned();
                if !consumed.insert(prefix.clone()) {
                    trace!("Dropping edge from consumed fragment {prefix:?}");
                    index.unlink(&prefix, &previous)?;
                    continue;
                }
                let interior = chain.size() > 1;
                chain.add_front(prefix.clone(), prefix.len() - 1);
                if interior {
                    index.remove(&previous)?;
                } else {
                    index.clear_prefixes(&previous)?;
                }
                index.clear_suffixes(&prefix)?;
            }

            while chain.length() < target {
                let Some(suffix) = index.get_suffixes(chain.back())?.first().cloned() else {
                    break;
                };
                let previous = chain.back().to_owned();
                if !consumed.insert(suffix.clone()) {
                    trace!("Dropping edge to consumed fragment {suffix:?}");
                    index.unlink(&previous, &suffix)?;
                    continue;
                }
                let interior = chain.size() > 1;
                chain.add_back(suffix.clone(), suffix.len() - 1);
                if interior {
                    index.remove(&previous)?;
                } else {
                    index.clear_suffixes(&previous)?;
                }
                index.clear_prefixes(&suffix)?;
            }

            let reached = chain.length() >= target;
            trace!(
                "Chain {} -> {} with {} fragments, length {}",
                chain.front(),
                chain.back(),
                chain.size(),
                chain.length()
            );
            self.register(chain);
            if reached {
                info!("Target length {target} reached during exact-overlap round");
                return Ok(true);
            }
        }

        info!("Exact-overlap round produced {} chains", self.len());
        Ok(false)
    }

    /// One error-tolerant round at the given shift. Returns `true` once a
    /// chain reaches the target length.
    pub fn merge_round(&mut self, offset: usize) -> Result<bool, AssemblyError> {
        let order = self.sorted_ids();
        let mut index = self.round_index(&order, offset)?;
        self.rounds += 1;
        debug!(
            "Round {}: {} chains, {} anchors at offset {offset}",
            self.rounds,
            order.len(),
            index.len()
        );

        for id in order {
            if self.chain(id).is_err() {
                continue;
            }
            if self.extend_back(&mut index, id)? || self.extend_front(&mut index, id)? {
                return Ok(true);
            }
        }

        debug!("Round {} left {} chains", self.rounds, self.len());
        Ok(false)
    }

    /// Asymmetric index of chain backs against chain fronts. Candidate lists
    /// follow `order`, so the first candidate found is the first in that order.
    fn round_index(&self, order: &[ChainId], offset: usize) -> Result<OverlapIndex, AssemblyError> {
        let mut backs = Vec::with_capacity(order.len());
        let mut fronts = Vec::with_capacity(order.len());
        for &id in order {
            let chain = self.chain(id)?;
            backs.push(chain.back().to_owned());
            fronts.push(chain.front().to_owned());
        }
        self.build_index(|threads| OverlapIndex::asymmetric(&backs, &fronts, offset, threads))
    }

    /// Absorb chains after the back of `id` until its back has no candidates
    /// left. Returns `true` once the chain reaches the target length.
    fn extend_back(&mut self, index: &mut OverlapIndex, id: ChainId) -> Result<bool, AssemblyError> {
        let target = self.config.target_length;
        loop {
            let back = self.chain(id)?.back().to_owned();
            if !index.contains(&back) {
                return Ok(false);
            }
            let Some((candidate, owner)) =
                self.longest_owner(index.get_suffixes(&back)?, &self.by_front)?
            else {
                return Ok(false);
            };
            if owner == id {
                trace!("Pruning self-referential edge {back:?} -> {candidate:?}");
                index.unlink(&back, &candidate)?;
                continue;
            }
            self.merge(index, id, owner)?;
            if self.chain(id)?.length() >= target {
                return Ok(true);
            }
        }
    }

    /// Merge `id` onto the back of the longest chain that may precede it,
    /// repeating from the merged chain's front. Returns `true` once the
    /// chain reaches the target length.
    fn extend_front(
        &mut self,
        index: &mut OverlapIndex,
        mut id: ChainId,
    ) -> Result<bool, AssemblyError> {
        let target = self.config.target_length;
        loop {
            let front = self.chain(id)?.front().to_owned();
            if !index.contains(&front) {
                return Ok(false);
            }
            let Some((candidate, owner)) =
                self.longest_owner(index.get_prefixes(&front)?, &self.by_back)?
            else {
                return Ok(false);
            };
            if owner == id {
                trace!("Pruning self-referential edge {candidate:?} -> {front:?}");
                index.unlink(&candidate, &front)?;
                continue;
            }
            self.merge(index, owner, id)?;
            id = owner;
            if self.chain(id)?.length() >= target {
                return Ok(true);
            }
        }
    }

    /// Candidate whose owning chain is longest; the first one found wins ties.
    /// `None` when there are no candidates.
    fn longest_owner(
        &self,
        candidates: &[String],
        table: &HashMap<String, ChainId>,
    ) -> Result<Option<(String, ChainId)>, AssemblyError> {
        let mut best: Option<(&String, ChainId, usize)> = None;
        for candidate in candidates {
            let owner = *table
                .get(candidate)
                .ok_or_else(|| AssemblyError::UnknownAnchor(candidate.clone()))?;
            let length = self.chain(owner)?.length();
            if best.map_or(true, |(_, _, longest)| length > longest) {
                best = Some((candidate, owner, length));
            }
        }
        Ok(best.map(|(candidate, owner, _)| (candidate.clone(), owner)))
    }

    /// Splice `absorbed` onto the back of `survivor`, retiring the two
    /// boundary anchors from the index and the anchor tables.
    fn merge(
        &mut self,
        index: &mut OverlapIndex,
        survivor: ChainId,
        absorbed: ChainId,
    ) -> Result<(), AssemblyError> {
        let other = self
            .chains
            .get_mut(absorbed.0)
            .and_then(Option::take)
            .ok_or(AssemblyError::UnknownChain(absorbed))?;
        let offset = index.offset();
        let chain = self.chain_mut(survivor)?;

        let old_back = chain.back().to_owned();
        let old_front = other.front().to_owned();
        if chain.size() > 1 {
            index.remove(&old_back)?;
        } else {
            index.clear_suffixes(&old_back)?;
        }
        if other.size() > 1 {
            index.remove(&old_front)?;
        } else {
            index.clear_prefixes(&old_front)?;
        }

        trace!(
            "Merging {old_back:?} -> {old_front:?} at offset {offset} ({} + {})",
            chain.length(),
            other.length()
        );
        let new_back = other.back().to_owned();
        chain.join(other, old_front.len().saturating_sub(offset));

        self.by_back.remove(&old_back);
        self.by_front.remove(&old_front);
        self.by_back.insert(new_back, survivor);
        Ok(())
    }

    /// Run round 0 and then error-tolerant rounds at shifts `1..=max_offset`.
    pub fn run(&mut self, fragments: &[String]) -> Result<Assembly, AssemblyError> {
        let fragments = unique_fragments(fragments);
        let mut reached = self.seed(&fragments)?;

        for offset in 1..=self.config.max_offset {
            let target = self.config.target_length;
            if reached
                || self.len() <= 1
                || self.longest().is_some_and(|chain| chain.length() >= target)
            {
                break;
            }
            reached = self.merge_round(offset)?;
        }

        Ok(self.finish())
    }

    /// Render the longest chain, truncated to the target length.
    pub fn finish(&self) -> Assembly {
        let target = self.config.target_length;
        let (sequence, length, skipped) = match self.longest() {
            Some(chain) => {
                let mut text = chain.to_string();
                truncate_at_boundary(&mut text, target);
                (text, chain.length(), chain.skipped(target))
            }
            None => (String::new(), 0, target),
        };
        info!(
            "Assembled {length} of {target} characters with {} chains left after {} rounds",
            self.len(),
            self.rounds
        );
        Assembly {
            sequence,
            length,
            skipped,
            rounds: self.rounds,
            chains: self.len(),
            reached_target: length >= target,
        }
    }
}

/// Assemble `fragments` with a fresh driver.
pub fn assemble(fragments: &[String], config: AssemblyConfig) -> Result<Assembly, AssemblyError> {
    AssemblyDriver::new(config)?.run(fragments)
}

/// Input order with duplicates and empty fragments dropped.
fn unique_fragments(fragments: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(fragments.len());
    let unique: Vec<String> = fragments
        .iter()
        .filter(|fragment| !fragment.is_empty() && seen.insert(fragment.as_str()))
        .cloned()
        .collect();
    if unique.len() < fragments.len() {
        warn!(
            "Dropped {} duplicate or empty fragments",
            fragments.len() - unique.len()
        );
    }
    unique
}

fn truncate_at_boundary(text: &mut String, max_len: usize) {
    if text.len() <= max_len {
        return;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}
