/// Suppression-scored matching engine
pub mod suppression;

/// Nearest-neighbor matching engines
pub mod nearest;

use std::collections::{HashMap, HashSet};

/// Slot identifier of a tracked target. Slots are allocated and released by
/// the external working-memory layer; the matcher only fills them in.
pub type Slot = u64;

/// How overlap scores become the final slot-candidate assignment.
///
#[derive(Clone, Debug)]
pub enum MatchingAlgorithm {
    /// Scores pairs against enhanced regions on the suppression field
    Suppression,
    /// 1-to-1 squared-center-distance matching with the two-pass greedy core
    NearestNeighbor(DistanceCaps),
    /// Independent per-slot nearest candidate, reuse unrestricted
    PlainNearestNeighbor(DistanceCaps),
}

impl Default for MatchingAlgorithm {
    fn default() -> Self {
        MatchingAlgorithm::Suppression
    }
}

/// Eligibility caps for the nearest-neighbor engines. A pair participates
/// only when the center distance passes every configured cap.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct DistanceCaps {
    /// Absolute center-distance cap, pixels
    pub absolute: Option<f32>,
    /// Cap as a multiple of the slot region's radius
    pub normalized: Option<f32>,
}

impl DistanceCaps {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn absolute(cap: f32) -> Self {
        Self {
            absolute: Some(cap),
            ..Self::default()
        }
    }

    pub fn normalized(cap: f32) -> Self {
        Self {
            normalized: Some(cap),
            ..Self::default()
        }
    }

    pub fn admits(&self, distance: f32, slot_radius: f32) -> bool {
        self.absolute.map_or(true, |cap| distance <= cap)
            && self
                .normalized
                .map_or(true, |cap| distance <= cap * slot_radius)
    }
}

/// Two-pass greedy assignment over pairs ordered best-first.
///
/// Pass 1 walks the pairs disallowing candidate reuse. Pass 2 walks them
/// again for the slots that stayed unassigned, this time allowing reuse, so
/// two targets may legitimately end up on one candidate (occlusion). This is
/// a deliberate speed/simplicity tradeoff: under adversarial orderings the
/// distinct-candidate part of the result is not a maximum matching.
///
pub(crate) fn two_pass_greedy<S>(pairs: &[(Slot, usize)], slots: S) -> HashMap<Slot, Option<usize>>
where
    S: IntoIterator<Item = Slot>,
{
    let mut assigned: HashMap<Slot, usize> = HashMap::default();
    let mut used: HashSet<usize> = HashSet::default();

    for &(slot, candidate) in pairs {
        if !assigned.contains_key(&slot) && !used.contains(&candidate) {
            assigned.insert(slot, candidate);
            used.insert(candidate);
        }
    }

    for &(slot, candidate) in pairs {
        assigned.entry(slot).or_insert(candidate);
    }

    slots
        .into_iter()
        .map(|slot| (slot, assigned.get(&slot).copied()))
        .collect()
}
