use crate::matching::{two_pass_greedy, DistanceCaps, Slot};
use crate::utils::region::Region;
use itertools::Itertools;
use log::debug;
use std::collections::HashMap;

/// Nearest-neighbor matching engines over squared center distances.
///
/// The exclusive engine sorts eligible pairs by distance ascending and runs
/// the same two-pass greedy assignment the suppression engine uses. The
/// plain engine assigns every slot its nearest eligible candidate
/// independently, so candidates may be reused freely.
///
#[derive(Clone, Copy, Debug)]
pub struct NearestNeighborMatching {
    caps: DistanceCaps,
    exclusive: bool,
}

impl NearestNeighborMatching {
    /// 1-to-1 engine with the two-pass greedy core.
    ///
    pub fn exclusive(caps: DistanceCaps) -> Self {
        Self {
            caps,
            exclusive: true,
        }
    }

    /// Independent per-slot engine, reuse unrestricted.
    ///
    pub fn plain(caps: DistanceCaps) -> Self {
        Self {
            caps,
            exclusive: false,
        }
    }

    pub fn winners(
        &self,
        slots: &[(Slot, Region)],
        candidates: &[Region],
    ) -> HashMap<Slot, Option<usize>> {
        let eligible = slots
            .iter()
            .cartesian_product(candidates.iter().enumerate())
            .filter_map(|((slot, region), (index, candidate))| {
                let sq_dist = region.center().sq_distance(&candidate.center());
                self.caps
                    .admits(sq_dist.sqrt(), region.radius())
                    .then_some((*slot, index, sq_dist))
            })
            .collect::<Vec<_>>();

        debug!("Eligible pairs: {:?}", &eligible);

        if self.exclusive {
            let pairs = eligible
                .into_iter()
                .sorted_by(|a, b| a.2.partial_cmp(&b.2).unwrap())
                .map(|(slot, index, _)| (slot, index))
                .collect::<Vec<_>>();
            two_pass_greedy(&pairs, slots.iter().map(|(slot, _)| *slot))
        } else {
            let mut best: HashMap<Slot, (usize, f32)> = HashMap::default();
            for (slot, index, sq_dist) in eligible {
                match best.get(&slot) {
                    Some((_, closest)) if *closest <= sq_dist => {}
                    _ => {
                        best.insert(slot, (index, sq_dist));
                    }
                }
            }
            slots
                .iter()
                .map(|(slot, _)| (*slot, best.get(slot).map(|(index, _)| *index)))
                .collect()
        }
    }
}
