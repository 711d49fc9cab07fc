use crate::field::enhance::enhanced_region;
use crate::field::{attention_baseline, compose, FieldSource, SuppressionField};
use crate::kernels::cache::{KernelCache, KernelSetParams};
use crate::matching::nearest::NearestNeighborMatching;
use crate::matching::suppression::{SlotEvidence, SuppressionMatching};
use crate::matching::MatchingAlgorithm;
use crate::utils::region::{Point2D, Region};
use crate::Errors::{InvalidBucketBoundaries, InvalidNoiseWidth};
use anyhow::Result;
use itertools::Itertools;
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Normal;
use rayon::prelude::*;
use std::collections::HashMap;

pub use crate::matching::Slot;

/// Prior state of one tracked target, owned by the working-memory layer.
///
/// Created when a target gains a slot, updated every cycle it stays tracked,
/// discarded when the slot is released. The tracker never allocates or
/// releases slots, it only fills in the region.
///
#[derive(Clone, Copy, Debug)]
pub struct Location {
    pub slot: Slot,
    pub region: Region,
    /// Extrapolated expected region, when motion prediction is available
    pub bias: Option<Region>,
}

impl Location {
    pub fn new(slot: Slot, region: Region) -> Self {
        Self {
            slot,
            region,
            bias: None,
        }
    }

    pub fn with_bias(slot: Slot, region: Region, bias: Region) -> Self {
        Self {
            slot,
            region,
            bias: Some(bias),
        }
    }
}

/// Class that is used to configure the tracking engine
#[derive(Clone, Debug)]
pub struct TrackerOptions {
    field_width: usize,
    field_height: usize,
    kernel_params: KernelSetParams,
    width_thresh: f32,
    aspect_thresh: f32,
    noise_center: f32,
    noise_width: f32,
    degrees_per_pixel: f32,
    max_bias_distance: f32,
    attention_cost: f32,
    global_baseline: f32,
    algorithm: MatchingAlgorithm,
    seed: Option<u64>,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            field_width: 640,
            field_height: 480,
            kernel_params: KernelSetParams::default(),
            width_thresh: 0.3,
            aspect_thresh: 0.3,
            noise_center: 0.1,
            noise_width: 0.02,
            degrees_per_pixel: 0.05,
            max_bias_distance: 45.0,
            attention_cost: 0.0,
            global_baseline: 0.0,
            algorithm: MatchingAlgorithm::default(),
            seed: None,
        }
    }
}

impl TrackerOptions {
    /// Dimensions of the suppression field, usually the frame size.
    ///
    pub fn field_size(mut self, width: usize, height: usize) -> Self {
        self.field_width = width;
        self.field_height = height;
        self
    }

    /// Kernel synthesis parameters shared by every shape bucket.
    ///
    pub fn kernel_params(mut self, params: KernelSetParams) -> Self {
        self.kernel_params = params;
        self
    }

    /// Shape tolerances under which two regions reuse one cached kernel set.
    ///
    pub fn reuse_tolerances(mut self, width_thresh: f32, aspect_thresh: f32) -> Self {
        self.width_thresh = width_thresh;
        self.aspect_thresh = aspect_thresh;
        self
    }

    /// Center and width of the per-pair Gaussian cutoff jitter that models
    /// perceptual noise in the suppression scorer.
    ///
    pub fn score_noise(mut self, center: f32, width: f32) -> Self {
        self.noise_center = center;
        self.noise_width = width;
        self
    }

    /// Conversion factor from pixels to visual degrees for overlap scoring.
    ///
    pub fn degrees_per_pixel(mut self, factor: f32) -> Self {
        self.degrees_per_pixel = factor;
        self
    }

    /// Upper bound of the bias-proximity score.
    ///
    pub fn max_bias_distance(mut self, distance: f32) -> Self {
        self.max_bias_distance = distance;
        self
    }

    /// Fixed attentional cost subtracted from the field baseline once per
    /// tracked target.
    ///
    pub fn attention_cost(mut self, cost: f32) -> Self {
        self.attention_cost = cost;
        self
    }

    /// Value the field accumulator is reset to before per-target costs.
    ///
    pub fn global_baseline(mut self, baseline: f32) -> Self {
        self.global_baseline = baseline;
        self
    }

    /// Selects the correspondence matching engine.
    ///
    pub fn algorithm(mut self, algorithm: MatchingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Seed for the score-noise generator. Unseeded trackers draw entropy.
    ///
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration and builds the tracker.
    ///
    pub fn build(self) -> Result<Tracker> {
        let boundaries = &self.kernel_params.bucket_boundaries;
        let ascending = boundaries.windows(2).all(|w| w[0] < w[1]);
        if !ascending || boundaries.iter().any(|b| *b <= 0.0) {
            return Err(InvalidBucketBoundaries.into());
        }

        if !self.noise_width.is_finite() || self.noise_width < 0.0 {
            return Err(InvalidNoiseWidth(self.noise_width).into());
        }
        let noise = Normal::new(self.noise_center, self.noise_width)
            .map_err(|_| InvalidNoiseWidth(self.noise_width))?;

        let field = SuppressionField::new(self.field_width, self.field_height)?;
        let cache = KernelCache::new(self.width_thresh, self.aspect_thresh);
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Tracker {
            opts: self,
            noise,
            cache,
            field,
            rng,
        })
    }
}

/// Multi-target tracking engine solving frame-to-frame correspondence for a
/// bounded set of externally owned slots.
///
/// One `cycle` invocation per processing cycle, synchronous, single writer
/// for the field and the cache. Per-slot enhanced-region extraction is the
/// only parallel section and reads the field immutably.
///
pub struct Tracker {
    opts: TrackerOptions,
    noise: Normal<f32>,
    cache: KernelCache,
    field: SuppressionField,
    rng: StdRng,
}

impl Tracker {
    /// Runs one processing cycle and returns the updated region per slot.
    ///
    /// # Parameters
    /// * `prior` - locations of the currently tracked targets;
    /// * `candidates` - this cycle's unlabeled detector regions, indexed by
    ///   insertion order;
    /// * `gaze` - gaze/fixation center, defaults to the field center;
    /// * `saccade_in_progress` - when true, matching is skipped and prior
    ///   regions are echoed back without touching the suppression field.
    ///
    /// Unmatched slots map to `None` and keep no region this cycle.
    ///
    pub fn cycle(
        &mut self,
        prior: &[Location],
        candidates: &[Region],
        gaze: Option<Point2D>,
        saccade_in_progress: bool,
    ) -> HashMap<Slot, Option<Region>> {
        if saccade_in_progress {
            debug!("Saccade in progress, echoing {} prior regions", prior.len());
            return prior.iter().map(|l| (l.slot, Some(l.region))).collect();
        }

        let gaze = gaze.unwrap_or_else(|| self.field.center());

        // cache growth happens here, before any parallel section
        self.cache.ensure(
            prior.iter().map(|l| &l.region).chain(candidates.iter()),
            &self.opts.kernel_params,
        );

        let tracked = prior
            .iter()
            .sorted_by_key(|l| l.slot)
            .map(|l| {
                (
                    l,
                    self.cache.kernels_for(&l.region, &self.opts.kernel_params),
                )
            })
            .collect::<Vec<_>>();
        let candidate_kernels = candidates
            .iter()
            .map(|c| self.cache.kernels_for(c, &self.opts.kernel_params))
            .collect::<Vec<_>>();

        let tracked_sources = tracked
            .iter()
            .map(|(l, k)| FieldSource {
                center: l.region.center(),
                kernels: k.as_ref(),
            })
            .collect::<Vec<_>>();
        let candidate_sources = candidates
            .iter()
            .zip(candidate_kernels.iter())
            .map(|(c, k)| FieldSource {
                center: c.center(),
                kernels: k.as_ref(),
            })
            .collect::<Vec<_>>();

        compose(
            &mut self.field,
            attention_baseline(
                self.opts.global_baseline,
                self.opts.attention_cost,
                prior.len(),
            ),
            &tracked_sources,
            &candidate_sources,
            gaze,
            &self.opts.kernel_params.bucket_boundaries,
        );

        let field = &self.field;
        let evidence = tracked
            .par_iter()
            .map(|(l, k)| SlotEvidence {
                slot: l.slot,
                prior: l.region,
                bias: l.bias,
                enhanced: enhanced_region(field, k, &l.region, l.bias.as_ref()),
                enhance_radius: k.enhance_radius,
                bias_radius: k.bias_radius,
            })
            .collect::<Vec<_>>();

        let assignment = match &self.opts.algorithm {
            MatchingAlgorithm::Suppression => SuppressionMatching::new(
                self.noise,
                self.opts.degrees_per_pixel,
                self.opts.max_bias_distance,
            )
            .winners(&evidence, candidates, &mut self.rng),
            MatchingAlgorithm::NearestNeighbor(caps) => {
                let slots = evidence
                    .iter()
                    .map(|e| (e.slot, e.prior))
                    .collect::<Vec<_>>();
                NearestNeighborMatching::exclusive(*caps).winners(&slots, candidates)
            }
            MatchingAlgorithm::PlainNearestNeighbor(caps) => {
                let slots = evidence
                    .iter()
                    .map(|e| (e.slot, e.prior))
                    .collect::<Vec<_>>();
                NearestNeighborMatching::plain(*caps).winners(&slots, candidates)
            }
        };

        debug!(
            "Cycle complete: {} slots, {} candidates, {} matched",
            prior.len(),
            candidates.len(),
            assignment.values().filter(|v| v.is_some()).count()
        );

        assignment
            .into_iter()
            .map(|(slot, index)| (slot, index.map(|i| candidates[i])))
            .collect()
    }

    /// Raw suppression field for diagnostics.
    ///
    pub fn field(&self) -> &SuppressionField {
        &self.field
    }

    /// Kernel cache accumulated over the run.
    ///
    pub fn cache(&self) -> &KernelCache {
        &self.cache
    }
}

#[cfg(test)]
mod tracker_tests {
    use crate::kernels::cache::KernelSetParams;
    use crate::matching::{DistanceCaps, MatchingAlgorithm};
    use crate::tracker::{Location, TrackerOptions};
    use crate::utils::region::Region;

    fn options() -> TrackerOptions {
        TrackerOptions::default()
            .field_size(160, 48)
            .kernel_params(KernelSetParams {
                min_downscale_radius: 0,
                ..Default::default()
            })
            .seed(99)
    }

    fn slots() -> Vec<Location> {
        vec![
            Location::new(1, Region::new(15.0, 15.0, 10.0, 10.0)),
            Location::new(2, Region::new(65.0, 15.0, 10.0, 10.0)),
            Location::new(3, Region::new(115.0, 15.0, 10.0, 10.0)),
        ]
    }

    #[test]
    fn unique_candidates_match_bijectively() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut tracker = options().build().unwrap();
        let candidates = vec![
            Region::new(117.0, 17.0, 10.0, 10.0),
            Region::new(17.0, 17.0, 10.0, 10.0),
            Region::new(67.0, 17.0, 10.0, 10.0),
        ];

        let res = tracker.cycle(&slots(), &candidates, None, false);
        assert!(res[&1].unwrap().almost_same(&candidates[1], 0.001));
        assert!(res[&2].unwrap().almost_same(&candidates[2], 0.001));
        assert!(res[&3].unwrap().almost_same(&candidates[0], 0.001));
    }

    #[test]
    fn occluded_targets_share_one_candidate() {
        let mut tracker = options().build().unwrap();
        let prior = vec![
            Location::new(1, Region::new(15.0, 15.0, 10.0, 10.0)),
            Location::new(2, Region::new(23.0, 15.0, 10.0, 10.0)),
        ];
        let candidates = vec![Region::new(19.0, 17.0, 10.0, 10.0)];

        let res = tracker.cycle(&prior, &candidates, None, false);
        assert!(res[&1].unwrap().almost_same(&candidates[0], 0.001));
        assert!(res[&2].unwrap().almost_same(&candidates[0], 0.001));
    }

    #[test]
    fn saccade_echoes_priors_and_keeps_the_field() {
        let mut tracker = options().build().unwrap();
        let prior = slots();
        let candidates = vec![Region::new(100.0, 30.0, 12.0, 12.0)];

        // give the field some non-trivial content first
        tracker.cycle(&prior, &candidates, None, false);
        let before = tracker.field().front().clone();

        let res = tracker.cycle(&prior, &candidates, None, true);
        for location in &prior {
            assert!(res[&location.slot]
                .unwrap()
                .almost_same(&location.region, 0.0001));
        }
        assert_eq!(*tracker.field().front(), before);
    }

    #[test]
    fn empty_candidate_list_unmatches_every_slot() {
        let mut tracker = options().build().unwrap();
        let res = tracker.cycle(&slots(), &[], None, false);
        assert_eq!(res.len(), 3);
        assert!(res.values().all(|v| v.is_none()));
    }

    #[test]
    fn identical_seeds_reproduce_field_and_assignment() {
        let candidates = vec![
            Region::new(17.0, 17.0, 10.0, 10.0),
            Region::new(64.0, 13.0, 10.0, 10.0),
            Region::new(70.0, 18.0, 10.0, 10.0),
        ];

        let mut a = options().build().unwrap();
        let mut b = options().build().unwrap();
        let res_a = a.cycle(&slots(), &candidates, None, false);
        let res_b = b.cycle(&slots(), &candidates, None, false);

        assert_eq!(a.field().front(), b.field().front());
        assert_eq!(res_a.len(), res_b.len());
        for (slot, region) in res_a {
            match (region, res_b[&slot]) {
                (Some(ra), Some(rb)) => assert!(ra.almost_same(&rb, 0.000001)),
                (None, None) => {}
                other => panic!("assignments diverge for slot {slot}: {other:?}"),
            }
        }
    }

    #[test]
    fn nearest_neighbor_cap_leaves_slot_unmatched() {
        let mut tracker = options()
            .algorithm(MatchingAlgorithm::NearestNeighbor(DistanceCaps::absolute(
                5.0,
            )))
            .build()
            .unwrap();
        let prior = vec![Location::new(1, Region::new(15.0, 15.0, 10.0, 10.0))];
        let candidates = vec![Region::new(120.0, 15.0, 10.0, 10.0)];

        let res = tracker.cycle(&prior, &candidates, None, false);
        assert_eq!(res[&1], None);
    }

    #[test]
    fn plain_nearest_neighbor_reuses_candidates() {
        let mut tracker = options()
            .algorithm(MatchingAlgorithm::PlainNearestNeighbor(
                DistanceCaps::none(),
            ))
            .build()
            .unwrap();
        let prior = vec![
            Location::new(1, Region::new(15.0, 15.0, 10.0, 10.0)),
            Location::new(2, Region::new(25.0, 15.0, 10.0, 10.0)),
        ];
        let candidates = vec![Region::new(20.0, 15.0, 10.0, 10.0)];

        let res = tracker.cycle(&prior, &candidates, None, false);
        assert!(res[&1].unwrap().almost_same(&candidates[0], 0.001));
        assert!(res[&2].unwrap().almost_same(&candidates[0], 0.001));
    }

    #[test]
    fn cache_grows_once_per_shape_bucket() {
        let mut tracker = options().build().unwrap();
        let candidates = vec![Region::new(17.0, 17.0, 10.0, 10.0)];
        tracker.cycle(&slots(), &candidates, None, false);
        // every region this cycle shares one 10x10 shape bucket
        assert_eq!(tracker.cache().len(), 1);
        tracker.cycle(&slots(), &candidates, None, false);
        assert_eq!(tracker.cache().len(), 1);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        assert!(options().score_noise(0.1, -1.0).build().is_err());
        assert!(options().field_size(0, 100).build().is_err());
        assert!(options()
            .kernel_params(KernelSetParams {
                bucket_boundaries: vec![300.0, 100.0],
                ..Default::default()
            })
            .build()
            .is_err());
    }
}
