use crate::matching::{two_pass_greedy, Slot};
use crate::utils::region::Region;
use itertools::Itertools;
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::collections::HashMap;

/// Everything the suppression scorer knows about one slot this cycle.
///
#[derive(Clone, Debug)]
pub struct SlotEvidence {
    pub slot: Slot,
    /// Last cycle's region
    pub prior: Region,
    /// Extrapolated expected region, when the caller provided one
    pub bias: Option<Region>,
    /// Region where the target currently dominates the field. `None` falls
    /// back to scoring against `prior`.
    pub enhanced: Option<Region>,
    /// Radius of the excitatory lobe of the slot's main kernel
    pub enhance_radius: f32,
    /// Radius of the positive lobe of the slot's bias kernel
    pub bias_radius: f32,
}

impl SlotEvidence {
    fn scoring_region(&self) -> &Region {
        self.enhanced.as_ref().unwrap_or(&self.prior)
    }
}

#[derive(Clone, Copy, Debug)]
struct PairScore {
    slot: Slot,
    candidate: usize,
    tier: u8,
    value: f32,
}

/// Suppression-scored matching engine.
///
/// Every (slot, candidate) pair with a nonzero overlap against the slot's
/// enhanced region receives a `(tier, value)` score:
///
/// * tier 2 - the candidate sits closer to the bias kernel's radius than to
///   the main kernel's; the value is `max_bias_distance - bias_distance`;
/// * tier 1 / 0 - the degrees-converted overlap is above / below a cutoff
///   drawn per pair from `Normal(noise_center, noise_width)`, modeling
///   perceptual noise.
///
/// Pairs sort by tier then value (stable, so insertion order breaks ties)
/// and go through the two-pass greedy assignment.
///
#[derive(Clone, Copy, Debug)]
pub struct SuppressionMatching {
    noise: Normal<f32>,
    degrees_per_pixel: f32,
    max_bias_distance: f32,
}

impl SuppressionMatching {
    pub fn new(noise: Normal<f32>, degrees_per_pixel: f32, max_bias_distance: f32) -> Self {
        Self {
            noise,
            degrees_per_pixel,
            max_bias_distance,
        }
    }

    /// Computes the slot-candidate assignment.
    ///
    /// The generator is injected by the caller; with slots presented in a
    /// stable order the draw sequence, and therefore the assignment, is
    /// reproducible under a fixed seed.
    ///
    pub fn winners<R: Rng>(
        &self,
        slots: &[SlotEvidence],
        candidates: &[Region],
        rng: &mut R,
    ) -> HashMap<Slot, Option<usize>> {
        let mut scores: Vec<PairScore> = Vec::with_capacity(slots.len() * candidates.len());

        for evidence in slots {
            for (index, candidate) in candidates.iter().enumerate() {
                if let Some(score) = self.score_pair(evidence, index, candidate, rng) {
                    scores.push(score);
                }
            }
        }

        let ordered = scores
            .into_iter()
            .sorted_by(|a, b| {
                b.tier
                    .cmp(&a.tier)
                    .then(b.value.partial_cmp(&a.value).unwrap())
            })
            .collect::<Vec<_>>();

        debug!("Scored pairs, best first: {:#?}", &ordered);

        let pairs = ordered
            .iter()
            .map(|s| (s.slot, s.candidate))
            .collect::<Vec<_>>();

        let res = two_pass_greedy(&pairs, slots.iter().map(|e| e.slot));
        debug!("Assignment: {:?}", &res);
        res
    }

    fn score_pair<R: Rng>(
        &self,
        evidence: &SlotEvidence,
        index: usize,
        candidate: &Region,
        rng: &mut R,
    ) -> Option<PairScore> {
        let overlap = evidence.scoring_region().intersection(candidate);
        if overlap <= 0.0 {
            return None;
        }

        if let Some(bias) = &evidence.bias {
            let bias_distance =
                (candidate.center().distance(&bias.center()) - evidence.bias_radius).abs();
            let main_distance = (candidate.center().distance(&evidence.prior.center())
                - evidence.enhance_radius)
                .abs();
            if bias_distance < main_distance {
                return Some(PairScore {
                    slot: evidence.slot,
                    candidate: index,
                    tier: 2,
                    value: self.max_bias_distance - bias_distance,
                });
            }
        }

        let overlap_degrees = overlap.sqrt() * self.degrees_per_pixel;
        let cutoff = self.noise.sample(rng);
        Some(PairScore {
            slot: evidence.slot,
            candidate: index,
            tier: u8::from(overlap_degrees > cutoff),
            value: overlap_degrees,
        })
    }
}
