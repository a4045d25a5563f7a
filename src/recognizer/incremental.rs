//! Incremental consistency-graph construction.
//!
//! Pairwise consistency tests dominate graph construction, and successive
//! recognition calls mostly see the same matches with slightly refined
//! centroids. This builder caches, for every match it has seen, the list of
//! other matches that were within a loosened consistency threshold when the
//! match was last written to the cache. On later calls only that candidate
//! list is re-tested against the strict threshold instead of all O(n²)
//! pairs.
//!
//! Three thresholds govern the cache:
//! - the strict threshold (the configured resolution) decides graph edges;
//! - pairs within twice the strict threshold are recorded as candidates, so
//!   a candidate list stays valid while centroids drift;
//! - a cached match whose centroids have drifted by more than half the
//!   caching threshold since its slot was written is invalidated and
//!   recomputed from scratch.

use std::collections::HashMap;

use tracing::debug;

use crate::graph::ConsistencyGraph;
use crate::matches::{IdPair, PairwiseMatch, PointPair};

use super::{consistency_distance, ConsistencyGraphBuilder, ConsistencyParams};

// ── Cache data ──────────────────────────────────────────────────────────────

/// Cached information for one match, persisted across recognition calls.
#[derive(Debug, Clone)]
struct MatchCacheSlot {
    /// Slot indices of the matches that were within the caching threshold of
    /// this match when the slot was written. Symmetric by construction: slot
    /// `a` lists slot `b` iff `b` lists `a`.
    candidate_consistent_matches: Vec<usize>,
    /// Centroids observed when the slot was written; drift is measured
    /// against these.
    centroids_at_caching: PointPair,
}

/// Positions of one cached match in the current match vector and in the
/// cache.
#[derive(Debug, Clone, Copy)]
struct MatchLocations {
    match_index: usize,
    cache_slot_index: usize,
}

// ── The builder ─────────────────────────────────────────────────────────────

/// Consistency-graph builder that caches candidate consistent pairs between
/// recognition calls.
///
/// The cache is keyed externally by [`IdPair`] and indexed internally by
/// dense slot index; slot indices are stable for a given identifier pair
/// until the match disappears or its centroids drift past the budget. Freed
/// slots are recycled and the slot vector never shrinks.
#[derive(Debug)]
pub struct IncrementalGraphBuilder {
    // Cache state.
    matches_cache: Vec<MatchCacheSlot>,
    cache_slot_indices: HashMap<IdPair, usize>,

    // Thresholds derived from the parameters.
    max_consistency_distance: f32,
    max_consistency_distance_for_caching: f32,
    half_max_consistency_distance_for_caching: f32,
    max_target_distance: f32,
}

impl IncrementalGraphBuilder {
    /// Create a builder with an empty cache.
    pub fn new(params: &ConsistencyParams, max_model_radius: f32) -> Self {
        let max_consistency_distance = params.resolution;
        let max_consistency_distance_for_caching = 2.0 * max_consistency_distance;
        Self {
            matches_cache: Vec::new(),
            cache_slot_indices: HashMap::new(),
            max_consistency_distance,
            max_consistency_distance_for_caching,
            half_max_consistency_distance_for_caching: max_consistency_distance_for_caching / 2.0,
            max_target_distance: super::max_target_distance(params, max_model_radius),
        }
    }

    /// Number of cache slots currently allocated (live and free).
    pub fn cache_slot_count(&self) -> usize {
        self.matches_cache.len()
    }

    /// Number of identifier pairs currently live in the cache.
    pub fn cached_pair_count(&self) -> usize {
        self.cache_slot_indices.len()
    }

    /// Check the internal cache invariants, panicking on violation: the key
    /// index and the slot vector must agree, and candidate lists of live
    /// slots must reference only live slots, symmetrically. Intended for
    /// tests and debugging.
    pub fn validate_cache(&self) {
        let mut live = vec![false; self.matches_cache.len()];
        for (&ids, &slot) in &self.cache_slot_indices {
            assert!(
                slot < self.matches_cache.len(),
                "cache index for {:?} points past the slot vector",
                ids
            );
            assert!(!live[slot], "two identifier pairs share cache slot {}", slot);
            live[slot] = true;
        }
        for (slot, cached) in self.matches_cache.iter().enumerate() {
            if !live[slot] {
                continue;
            }
            for &candidate in &cached.candidate_consistent_matches {
                assert!(
                    live[candidate],
                    "slot {} lists dead candidate slot {}",
                    slot, candidate
                );
                assert!(
                    self.matches_cache[candidate]
                        .candidate_consistent_matches
                        .contains(&slot),
                    "candidate lists are asymmetric between slots {} and {}",
                    slot,
                    candidate
                );
            }
        }
    }

    /// Decide whether a cached match must be invalidated: true when either
    /// centroid has drifted further from its cached position than the drift
    /// budget allows.
    fn must_remove_from_cache(&self, m: &PairwiseMatch, cache_slot_index: usize) -> bool {
        let cached = &self.matches_cache[cache_slot_index].centroids_at_caching;
        let model_drift = nalgebra::distance(&m.centroids.model, &cached.model);
        let scene_drift = nalgebra::distance(&m.centroids.scene, &cached.scene);
        model_drift.max(scene_drift) > self.half_max_consistency_distance_for_caching
    }

    /// Process the matches already present in the cache: drop candidate
    /// references to evicted slots and re-test the remaining candidates
    /// against the strict threshold, adding the consistent pairs to the
    /// graph.
    fn process_cached_matches(
        &mut self,
        predicted_matches: &[PairwiseMatch],
        cached_matches_locations: &[MatchLocations],
        cache_slot_index_to_match_index: &[Option<usize>],
        new_cache_slot_indices: &mut HashMap<IdPair, usize>,
        consistency_graph: &mut ConsistencyGraph,
    ) {
        let max_consistency_distance = self.max_consistency_distance;
        let max_target_distance = self.max_target_distance;

        for location in cached_matches_locations {
            let match_index = location.match_index;
            let current_match = &predicted_matches[match_index];
            new_cache_slot_indices.insert(current_match.ids, location.cache_slot_index);

            let mut candidates = std::mem::take(
                &mut self.matches_cache[location.cache_slot_index].candidate_consistent_matches,
            );
            candidates.retain(|&candidate_slot| {
                let Some(other_index) = cache_slot_index_to_match_index[candidate_slot] else {
                    // The candidate's match is gone; forget the slot.
                    return false;
                };
                // Each surviving pair is seen from both of its slots; test it
                // only once.
                if match_index < other_index {
                    let distance = consistency_distance(
                        current_match,
                        &predicted_matches[other_index],
                        max_target_distance,
                    );
                    if let Some(distance) = distance {
                        if distance <= max_consistency_distance {
                            consistency_graph.add_edge(match_index as u32, other_index as u32);
                        }
                    }
                }
                true
            });
            self.matches_cache[location.cache_slot_index].candidate_consistent_matches = candidates;
        }
    }

    /// Process the matches that were not present in the cache: assign each a
    /// slot, test it against every match that already has one, and record
    /// both graph edges and symmetric candidate-list entries.
    fn process_new_matches(
        &mut self,
        predicted_matches: &[PairwiseMatch],
        new_match_indices: &[usize],
        free_cache_slot_indices: Vec<usize>,
        match_index_to_cache_slot_index: &mut [Option<usize>],
        new_cache_slot_indices: &mut HashMap<IdPair, usize>,
        consistency_graph: &mut ConsistencyGraph,
    ) {
        let mut free_slots = free_cache_slot_indices.into_iter();

        for &match_index in new_match_indices {
            let current_match = &predicted_matches[match_index];

            // Acquire a slot and reset it for this match.
            let fresh_slot = MatchCacheSlot {
                candidate_consistent_matches: Vec::new(),
                centroids_at_caching: current_match.centroids,
            };
            let cache_slot_index = match free_slots.next() {
                Some(slot) => {
                    self.matches_cache[slot] = fresh_slot;
                    slot
                }
                None => {
                    self.matches_cache.push(fresh_slot);
                    self.matches_cache.len() - 1
                }
            };
            match_index_to_cache_slot_index[match_index] = Some(cache_slot_index);
            let previous = new_cache_slot_indices.insert(current_match.ids, cache_slot_index);
            debug_assert!(
                previous.is_none(),
                "identifier pair {:?} appears twice in one recognition call",
                current_match.ids
            );

            // Test against every match that already owns a slot: all cached
            // matches and the new matches processed before this one. Later
            // new matches will test this pair from their side.
            for (other_index, other_match) in predicted_matches.iter().enumerate() {
                if other_index == match_index {
                    continue;
                }
                let Some(other_slot) = match_index_to_cache_slot_index[other_index] else {
                    continue;
                };
                let Some(distance) =
                    consistency_distance(current_match, other_match, self.max_target_distance)
                else {
                    continue;
                };
                if distance <= self.max_consistency_distance {
                    consistency_graph.add_edge(match_index as u32, other_index as u32);
                }
                if distance <= self.max_consistency_distance_for_caching {
                    self.matches_cache[cache_slot_index]
                        .candidate_consistent_matches
                        .push(other_slot);
                    self.matches_cache[other_slot]
                        .candidate_consistent_matches
                        .push(cache_slot_index);
                }
            }
        }
    }
}

impl ConsistencyGraphBuilder for IncrementalGraphBuilder {
    fn build(&mut self, predicted_matches: &[PairwiseMatch]) -> ConsistencyGraph {
        let n_matches = predicted_matches.len();
        let mut consistency_graph = ConsistencyGraph::new(n_matches);

        // ── Classify the matches ──
        // Split into cached matches (slot present, centroids within the
        // drift budget) and new matches (no slot, or slot invalidated).
        let mut cached_matches_locations: Vec<MatchLocations> = Vec::new();
        let mut new_match_indices: Vec<usize> = Vec::new();
        let mut match_index_to_cache_slot_index: Vec<Option<usize>> = vec![None; n_matches];
        let mut cache_slot_index_to_match_index: Vec<Option<usize>> =
            vec![None; self.matches_cache.len()];

        for (match_index, m) in predicted_matches.iter().enumerate() {
            match self.cache_slot_indices.get(&m.ids).copied() {
                Some(cache_slot_index) if !self.must_remove_from_cache(m, cache_slot_index) => {
                    debug_assert!(
                        cache_slot_index_to_match_index[cache_slot_index].is_none(),
                        "identifier pair {:?} appears twice in one recognition call",
                        m.ids
                    );
                    cached_matches_locations.push(MatchLocations {
                        match_index,
                        cache_slot_index,
                    });
                    match_index_to_cache_slot_index[match_index] = Some(cache_slot_index);
                    cache_slot_index_to_match_index[cache_slot_index] = Some(match_index);
                }
                _ => new_match_indices.push(match_index),
            }
        }

        // Slots not claimed by a cached match are free for reuse: this
        // covers never-used slots, slots of matches absent from this call,
        // and slots invalidated by drift.
        let free_cache_slot_indices: Vec<usize> = (0..self.matches_cache.len())
            .filter(|&slot| cache_slot_index_to_match_index[slot].is_none())
            .collect();

        debug!(
            "Classified {} matches: {} cached, {} new, {} free slots",
            n_matches,
            cached_matches_locations.len(),
            new_match_indices.len(),
            free_cache_slot_indices.len()
        );

        // ── Rebuild the cache around the current matches ──
        let mut new_cache_slot_indices: HashMap<IdPair, usize> =
            HashMap::with_capacity(n_matches);

        self.process_cached_matches(
            predicted_matches,
            &cached_matches_locations,
            &cache_slot_index_to_match_index,
            &mut new_cache_slot_indices,
            &mut consistency_graph,
        );

        self.process_new_matches(
            predicted_matches,
            &new_match_indices,
            free_cache_slot_indices,
            &mut match_index_to_cache_slot_index,
            &mut new_cache_slot_indices,
            &mut consistency_graph,
        );

        // Commit: the key index now reflects exactly the current matches.
        self.cache_slot_indices = new_cache_slot_indices;

        consistency_graph
    }
}
