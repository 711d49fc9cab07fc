use crate::field::{bounding_region, stamp_into, SuppressionField};
use crate::kernels::cache::KernelSet;
use crate::utils::region::Region;

/// Derives the region where the target's evidence currently dominates.
///
/// The target's own positive kernel is stamped onto a copy of the field at
/// the prior center; when an extrapolated bias region exists, the bias kernel
/// is stamped as well so the result spans both lobes. Strictly positive
/// pixels are the ones where the target wins against the accumulated
/// suppression; their bounding box is the enhanced region. An empty mask
/// yields `None` and the matcher falls back to the raw prior region.
///
pub fn enhanced_region(
    field: &SuppressionField,
    kernels: &KernelSet,
    prior: &Region,
    bias: Option<&Region>,
) -> Option<Region> {
    let mut scratch = field.front().clone();
    stamp_into(&mut scratch, &kernels.positive, prior.center());
    if let Some(bias) = bias {
        stamp_into(&mut scratch, &kernels.bias, bias.center());
    }
    bounding_region(&scratch)
}

#[cfg(test)]
mod enhance_tests {
    use crate::field::enhance::enhanced_region;
    use crate::field::SuppressionField;
    use crate::kernels::cache::{KernelCache, KernelSetParams};
    use crate::utils::region::Region;

    fn params() -> KernelSetParams {
        KernelSetParams {
            bucket_boundaries: vec![100.0],
            min_downscale_radius: 0,
            ..Default::default()
        }
    }

    #[test]
    fn positive_lobe_dominates_quiet_field() {
        let mut field = SuppressionField::new(64, 64).unwrap();
        field.begin_cycle(0.0);

        let prior = Region::new(27.0, 27.0, 10.0, 10.0);
        let mut cache = KernelCache::default();
        let kernels = cache.kernels_for(&prior, &params());

        let enhanced = enhanced_region(&field, &kernels, &prior, None).unwrap();
        let center = enhanced.center();
        assert!(center.distance(&prior.center()) < 1.5);
        assert!(enhanced.width() <= 2.0 * kernels.enhance_radius);
    }

    #[test]
    fn bias_lobe_extends_the_mask() {
        let mut field = SuppressionField::new(96, 96).unwrap();
        field.begin_cycle(0.0);

        let prior = Region::new(20.0, 43.0, 10.0, 10.0);
        let bias = Region::new(50.0, 43.0, 10.0, 10.0);
        let mut cache = KernelCache::default();
        let kernels = cache.kernels_for(&prior, &params());

        let plain = enhanced_region(&field, &kernels, &prior, None).unwrap();
        let spanned = enhanced_region(&field, &kernels, &prior, Some(&bias)).unwrap();
        assert!(spanned.width() > plain.width());
        assert!(spanned.x() + spanned.width() > bias.center().x);
    }

    #[test]
    fn deeply_suppressed_target_has_no_enhanced_region() {
        let mut field = SuppressionField::new(64, 64).unwrap();
        // below any value the positive kernel can add back
        field.begin_cycle(-100.0);

        let prior = Region::new(27.0, 27.0, 10.0, 10.0);
        let mut cache = KernelCache::default();
        let kernels = cache.kernels_for(&prior, &params());

        assert!(enhanced_region(&field, &kernels, &prior, None).is_none());
    }

    #[test]
    fn extraction_leaves_the_field_untouched() {
        let mut field = SuppressionField::new(64, 64).unwrap();
        field.begin_cycle(0.0);
        let before = field.front().clone();

        let prior = Region::new(27.0, 27.0, 10.0, 10.0);
        let mut cache = KernelCache::default();
        let kernels = cache.kernels_for(&prior, &params());
        let _ = enhanced_region(&field, &kernels, &prior, None);

        assert_eq!(*field.front(), before);
    }
}
