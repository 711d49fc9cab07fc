/// Enhanced region extraction
pub mod enhance;

use crate::kernels::cache::KernelSet;
use crate::kernels::Kernel;
use crate::utils::region::{Point2D, Region};
use crate::Errors::InvalidFieldDimensions;
use anyhow::Result;
use nalgebra::DMatrix;
use std::mem;

/// Cycle-scoped suppression accumulator.
///
/// A single-channel f32 image double-buffered across cycles: `begin_cycle`
/// swaps the buffers and resets the front one, so the previous cycle's field
/// stays readable for diagnostics. The field is mutated only by the
/// compositor and read-only for the extractor.
///
#[derive(Debug, Clone)]
pub struct SuppressionField {
    width: usize,
    height: usize,
    front: DMatrix<f32>,
    back: DMatrix<f32>,
}

impl SuppressionField {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(InvalidFieldDimensions(width, height).into());
        }
        Ok(Self {
            width,
            height,
            front: DMatrix::zeros(height, width),
            back: DMatrix::zeros(height, width),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    /// Current cycle's accumulator.
    ///
    pub fn front(&self) -> &DMatrix<f32> {
        &self.front
    }

    /// Previous cycle's accumulator.
    ///
    pub fn previous(&self) -> &DMatrix<f32> {
        &self.back
    }

    /// Swaps the buffers and fills the front one with the baseline value.
    ///
    pub fn begin_cycle(&mut self, baseline: f32) {
        mem::swap(&mut self.front, &mut self.back);
        self.front.fill(baseline);
    }

    /// Additively stamps the kernel at the rounded center, clipped to bounds.
    /// A kernel fully outside the image contributes nothing.
    ///
    pub fn stamp(&mut self, kernel: &Kernel, center: Point2D) {
        stamp_into(&mut self.front, kernel, center);
    }
}

pub(crate) fn stamp_into(target: &mut DMatrix<f32>, kernel: &Kernel, center: Point2D) {
    let cx = center.x.round() as i64;
    let cy = center.y.round() as i64;
    let r = kernel.radius() as i64;
    let width = target.ncols() as i64;
    let height = target.nrows() as i64;

    for ky in -r..=r {
        let ty = cy + ky;
        if ty < 0 || ty >= height {
            continue;
        }
        for kx in -r..=r {
            let tx = cx + kx;
            if tx < 0 || tx >= width {
                continue;
            }
            target[(ty as usize, tx as usize)] += kernel.value_at(kx, ky);
        }
    }
}

/// One stamping source for the compositor: a target or candidate center with
/// the kernel set serving its shape bucket.
///
pub struct FieldSource<'a> {
    pub center: Point2D,
    pub kernels: &'a KernelSet,
}

/// Builds the suppression field for one cycle.
///
/// Every tracked target stamps the surround kernel of its distance-from-gaze
/// bucket, every untracked candidate stamps its small surround kernel. The
/// result is purely additive, so stamping order never changes it.
///
pub fn compose(
    field: &mut SuppressionField,
    baseline: f32,
    tracked: &[FieldSource],
    candidates: &[FieldSource],
    gaze: Point2D,
    bucket_boundaries: &[f32],
) {
    field.begin_cycle(baseline);

    for source in tracked {
        let bucket = bucket_for(source.center.distance(&gaze), bucket_boundaries);
        let bucket = bucket.min(source.kernels.surround_by_bucket.len() - 1);
        field.stamp(&source.kernels.surround_by_bucket[bucket], source.center);
    }

    for source in candidates {
        field.stamp(&source.kernels.small_surround, source.center);
    }
}

/// Index of the distance bucket: the count of boundaries below the distance.
///
pub fn bucket_for(distance: f32, boundaries: &[f32]) -> usize {
    boundaries.iter().take_while(|b| distance > **b).count()
}

/// Compositor output helper for callers that track attentional load: the
/// baseline drops by a fixed cost per tracked target.
///
pub fn attention_baseline(global_baseline: f32, attention_cost: f32, tracked: usize) -> f32 {
    global_baseline - attention_cost * tracked as f32
}

pub(crate) fn bounding_region(mask: &DMatrix<f32>) -> Option<Region> {
    let mut min_x = usize::MAX;
    let mut min_y = usize::MAX;
    let mut max_x = 0_usize;
    let mut max_y = 0_usize;
    let mut hit = false;

    for col in 0..mask.ncols() {
        for row in 0..mask.nrows() {
            if mask[(row, col)] > 0.0 {
                hit = true;
                min_x = min_x.min(col);
                max_x = max_x.max(col);
                min_y = min_y.min(row);
                max_y = max_y.max(row);
            }
        }
    }

    hit.then(|| {
        Region::new(
            min_x as f32,
            min_y as f32,
            (max_x - min_x + 1) as f32,
            (max_y - min_y + 1) as f32,
        )
    })
}
