use crate::kernels::builder::{build_kernel, Lobe, ProfileParams};
use crate::kernels::Kernel;
use crate::utils::region::Region;
use std::sync::Arc;

/// Coarse orientation bucket of a region.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    Landscape,
    Portrait,
}

/// Coarse shape signature deciding kernel reuse.
///
/// Two regions share a cached [KernelSet] iff their extent ratios stay within
/// the width tolerance, their aspect ratios stay within the aspect tolerance
/// and their orientation buckets match.
///
#[derive(Clone, Copy, Debug)]
pub struct ShapeIndex {
    min_extent: f32,
    max_extent: f32,
    aspect: f32,
    orientation: Orientation,
}

impl From<&Region> for ShapeIndex {
    fn from(region: &Region) -> Self {
        Self {
            min_extent: region.width().min(region.height()),
            max_extent: region.width().max(region.height()),
            aspect: region.aspect(),
            orientation: if region.width() >= region.height() {
                Orientation::Landscape
            } else {
                Orientation::Portrait
            },
        }
    }
}

impl ShapeIndex {
    pub fn matches(&self, other: &ShapeIndex, width_thresh: f32, aspect_thresh: f32) -> bool {
        self.orientation == other.orientation
            && ratio_delta(self.min_extent, other.min_extent) <= width_thresh
            && ratio_delta(self.max_extent, other.max_extent) <= width_thresh
            && (self.aspect - other.aspect).abs() <= aspect_thresh
    }
}

fn ratio_delta(a: f32, b: f32) -> f32 {
    a.max(b) / a.min(b) - 1.0
}

/// Parameters for synthesizing a [KernelSet] from a region shape.
///
#[derive(Clone, Debug)]
pub struct KernelSetParams {
    /// Kernel radius as a multiple of the region radius
    pub radius_scale: f32,
    /// Surround half-width as a multiple of the excitatory width
    pub surround_scale: f32,
    pub excite_gain: f32,
    pub excite_base: f32,
    pub surround_gain: f32,
    pub surround_base: f32,
    /// Distances from gaze splitting targets into surround-width buckets
    pub bucket_boundaries: Vec<f32>,
    /// Surround width growth per distance bucket
    pub bucket_widening: f32,
    /// Reduced-resolution rendering keeps the radius at or above this value
    pub min_downscale_radius: usize,
}

impl Default for KernelSetParams {
    fn default() -> Self {
        Self {
            radius_scale: 3.0,
            surround_scale: 1.0,
            excite_gain: 1.0,
            excite_base: 0.0,
            surround_gain: 1.0,
            surround_base: 0.0,
            bucket_boundaries: vec![100.0, 300.0],
            bucket_widening: 0.25,
            min_downscale_radius: 16,
        }
    }
}

/// Kernels shared by every target of one shape bucket.
///
#[derive(Debug)]
pub struct KernelSet {
    /// Radius of the excitatory lobe of `positive`
    pub enhance_radius: f32,
    /// Radius of the positive lobe of `bias`
    pub bias_radius: f32,
    /// Full center-surround kernel stamped during region enhancement
    pub positive: Kernel,
    /// Positive-lobe kernel stamped at the extrapolated position
    pub bias: Kernel,
    /// Narrow inhibitory kernel stamped for untracked candidates
    pub small_surround: Kernel,
    /// Inhibitory kernels per distance-from-gaze bucket, widening with eccentricity
    pub surround_by_bucket: Vec<Kernel>,
}

const SMALL_SURROUND_FACTOR: f32 = 0.5;

impl KernelSet {
    fn synthesize(region: &Region, params: &KernelSetParams) -> Self {
        let w = region.radius().max(1.0);
        let profile = ProfileParams {
            excite_width: w,
            surround_width: params.surround_scale * w,
            excite_gain: params.excite_gain,
            excite_base: params.excite_base,
            surround_gain: params.surround_gain,
            surround_base: params.surround_base,
        };
        let radius = (params.radius_scale * w).ceil() as usize;
        let min_dr = params.min_downscale_radius;

        let widened = |factor: f32| ProfileParams {
            excite_width: profile.excite_width * factor,
            surround_width: profile.surround_width * factor,
            ..profile
        };

        let surround_by_bucket = (0..=params.bucket_boundaries.len())
            .map(|bucket| {
                let factor = 1.0 + params.bucket_widening * bucket as f32;
                build_kernel(
                    (radius as f32 * factor).ceil() as usize,
                    &widened(factor),
                    Lobe::SurroundOnly,
                    min_dr,
                )
            })
            .collect();

        Self {
            enhance_radius: w,
            bias_radius: w,
            positive: build_kernel(radius, &profile, Lobe::Full, min_dr),
            bias: build_kernel(w.ceil() as usize, &profile, Lobe::CenterOnly, min_dr),
            small_surround: build_kernel(
                (radius as f32 * SMALL_SURROUND_FACTOR).ceil() as usize,
                &widened(SMALL_SURROUND_FACTOR),
                Lobe::SurroundOnly,
                min_dr,
            ),
            surround_by_bucket,
        }
    }
}

/// Cache of synthesized kernel sets, looked up by shape within tolerance.
///
/// The cache lives for one run and only grows. Entries are never overwritten:
/// the first region of a shape bucket defines the kernels every later region
/// of that bucket reuses. Lookup is a linear scan - bucket counts per run are
/// tens at most. LRU eviction is a documented extension point for deployments
/// that run long enough to accumulate unbounded shape variety.
///
#[derive(Debug)]
pub struct KernelCache {
    entries: Vec<(ShapeIndex, Arc<KernelSet>)>,
    width_thresh: f32,
    aspect_thresh: f32,
}

impl Default for KernelCache {
    fn default() -> Self {
        Self::new(0.3, 0.3)
    }
}

impl KernelCache {
    /// Constructs an empty cache with the given reuse tolerances.
    ///
    /// # Parameters
    /// * `width_thresh` - allowed relative extent difference for reuse;
    /// * `aspect_thresh` - allowed absolute aspect-ratio difference for reuse.
    ///
    pub fn new(width_thresh: f32, aspect_thresh: f32) -> Self {
        Self {
            entries: Vec::default(),
            width_thresh,
            aspect_thresh,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the kernel set covering the region's shape, if one is cached.
    ///
    pub fn get(&self, region: &Region) -> Option<Arc<KernelSet>> {
        let index = ShapeIndex::from(region);
        self.entries
            .iter()
            .find(|(cached, _)| cached.matches(&index, self.width_thresh, self.aspect_thresh))
            .map(|(_, set)| Arc::clone(set))
    }

    /// Synthesizes kernel sets for every region shape not yet represented
    /// within tolerance. Existing entries are kept as-is.
    ///
    pub fn ensure<'a, I>(&mut self, regions: I, params: &KernelSetParams)
    where
        I: IntoIterator<Item = &'a Region>,
    {
        for region in regions {
            if self.get(region).is_none() {
                self.entries.push((
                    ShapeIndex::from(region),
                    Arc::new(KernelSet::synthesize(region, params)),
                ));
            }
        }
    }

    /// Infallible lookup: synthesizes the kernel set on demand when the scan
    /// finds no shape bucket for the region.
    ///
    pub fn kernels_for(&mut self, region: &Region, params: &KernelSetParams) -> Arc<KernelSet> {
        if let Some(set) = self.get(region) {
            return set;
        }
        let set = Arc::new(KernelSet::synthesize(region, params));
        self.entries
            .push((ShapeIndex::from(region), Arc::clone(&set)));
        set
    }
}
