use crate::kernels::Kernel;
use nalgebra::DMatrix;
use once_cell::sync::Lazy;
use std::f32::consts::PI;

/// Normalization constant of the Ricker wavelet.
static MEXHAT_NORM: Lazy<f32> = Lazy::new(|| 2.0 / (3.0_f32.sqrt() * PI.powf(0.25)));

/// 1D center-surround ("Mexican hat") wavelet.
///
pub fn mexhat(x: f32) -> f32 {
    *MEXHAT_NORM * (1.0 - x * x) * (-x * x / 2.0).exp()
}

/// Parameters of the 1D center-surround profile evaluated over the distance
/// from the kernel center.
///
/// * `excite_width` - radius of the excitatory lobe;
/// * `surround_width` - half-width of the inhibitory surround;
/// * `excite_gain` / `excite_base` - amplitude and baseline where the wavelet
///   is positive;
/// * `surround_gain` / `surround_base` - amplitude and baseline where the
///   wavelet is non-positive.
///
#[derive(Clone, Copy, Debug)]
pub struct ProfileParams {
    pub excite_width: f32,
    pub surround_width: f32,
    pub excite_gain: f32,
    pub excite_base: f32,
    pub surround_gain: f32,
    pub surround_base: f32,
}

impl ProfileParams {
    fn downscaled(&self, divisor: f32) -> Self {
        Self {
            excite_width: self.excite_width / divisor,
            surround_width: self.surround_width / divisor,
            ..*self
        }
    }
}

/// Which part of the profile the rendered kernel keeps.
///
#[derive(Clone, Copy, Debug)]
pub enum Lobe {
    /// The whole center-surround profile
    Full,
    /// Inhibitory lobe only, zero where the wavelet is positive
    SurroundOnly,
    /// Excitatory lobe only, zero where the wavelet is non-positive
    CenterOnly,
}

fn profile(d: f32, p: &ProfileParams) -> f32 {
    let u = if d < p.excite_width {
        d / p.excite_width
    } else {
        1.0 + (d - p.excite_width) / p.surround_width
    };
    let v = mexhat(u);
    if v > 0.0 {
        p.excite_base + p.excite_gain * v
    } else {
        p.surround_base + p.surround_gain * v
    }
}

fn lobe_profile(d: f32, p: &ProfileParams, lobe: Lobe) -> f32 {
    let u = if d < p.excite_width {
        d / p.excite_width
    } else {
        1.0 + (d - p.excite_width) / p.surround_width
    };
    let v = mexhat(u);
    match lobe {
        Lobe::Full => profile(d, p),
        Lobe::SurroundOnly => {
            if v > 0.0 {
                0.0
            } else {
                p.surround_base + p.surround_gain * v
            }
        }
        Lobe::CenterOnly => {
            if v > 0.0 {
                p.excite_base + p.excite_gain * v
            } else {
                0.0
            }
        }
    }
}

fn render(radius: usize, p: &ProfileParams, lobe: Lobe) -> Kernel {
    let side = 2 * radius + 1;
    let r = radius as i64;
    let image = DMatrix::from_fn(side, side, |row, col| {
        let dx = (col as i64 - r) as f32;
        let dy = (row as i64 - r) as f32;
        lobe_profile((dx * dx + dy * dy).sqrt(), p, lobe)
    });
    Kernel::new(radius, image)
}

fn upscale(reduced: &Kernel, scale: usize, radius: usize) -> Kernel {
    let side = 2 * radius + 1;
    let r = radius as i64;
    let rr = reduced.radius() as i64;
    let image = DMatrix::from_fn(side, side, |row, col| {
        let sx = ((col as i64 - r) as f32 / scale as f32).round() as i64;
        let sy = ((row as i64 - r) as f32 / scale as f32).round() as i64;
        reduced.value_at(sx.clamp(-rr, rr), sy.clamp(-rr, rr))
    });
    Kernel::new(radius, image)
}

/// Renders the radially symmetric kernel of the requested radius.
///
/// Large kernels are rendered at an integer-divided resolution and upscaled
/// with nearest-neighbor sampling. The divisor is the largest integer that
/// keeps the reduced radius at or above `min_downscale_radius`, so small
/// kernels are always rendered at full resolution.
///
pub fn build_kernel(
    radius: usize,
    p: &ProfileParams,
    lobe: Lobe,
    min_downscale_radius: usize,
) -> Kernel {
    let scale = if min_downscale_radius == 0 {
        1
    } else {
        (radius / min_downscale_radius).max(1)
    };

    if scale <= 1 {
        render(radius, p, lobe)
    } else {
        let reduced = render(radius / scale, &p.downscaled(scale as f32), lobe);
        upscale(&reduced, scale, radius)
    }
}

#[cfg(test)]
mod builder_tests {
    use crate::kernels::builder::{build_kernel, profile, Lobe, ProfileParams};
    use crate::EPS;

    fn params(w: f32, w_neg: f32) -> ProfileParams {
        ProfileParams {
            excite_width: w,
            surround_width: w_neg,
            excite_gain: 1.0,
            excite_base: 0.0,
            surround_gain: 1.0,
            surround_base: 0.0,
        }
    }

    #[test]
    fn kernel_is_symmetric() {
        let k = build_kernel(12, &params(5.0, 4.0), Lobe::Full, 0);
        for y in 0..k.side() {
            for x in 0..k.side() {
                assert!(
                    (k.image()[(y, x)] - k.image()[(x, y)]).abs() < EPS,
                    "asymmetry at ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn profile_strictly_decreases_within_excite_lobe() {
        let p = params(10.0, 5.0);
        for d in 0..9 {
            let near = profile(d as f32, &p);
            let far = profile((d + 1) as f32, &p);
            assert!(near > far, "profile must decrease at d = {d}");
        }
    }

    #[test]
    fn profile_flips_sign_exactly_at_excite_width() {
        let p = params(10.0, 5.0);
        for d in 0..10 {
            assert!(profile(d as f32, &p) > 0.0);
        }
        assert!(profile(10.0, &p).abs() < EPS);
        for d in 11..30 {
            assert!(profile(d as f32, &p) < 0.0, "d = {d}");
        }
    }

    #[test]
    fn surround_lobe_is_never_positive() {
        let k = build_kernel(15, &params(5.0, 4.0), Lobe::SurroundOnly, 0);
        assert!(k.image().iter().all(|v| *v <= 0.0));
        assert_eq!(k.value_at(0, 0), 0.0);
    }

    #[test]
    fn center_lobe_is_never_negative() {
        let k = build_kernel(15, &params(5.0, 4.0), Lobe::CenterOnly, 0);
        assert!(k.image().iter().all(|v| *v >= 0.0));
        assert!(k.value_at(0, 0) > 0.0);
        assert_eq!(k.value_at(10, 0), 0.0);
    }

    #[test]
    fn downscaled_kernel_keeps_size_and_center() {
        let p = params(16.0, 8.0);
        let full = build_kernel(48, &p, Lobe::Full, 0);
        let reduced = build_kernel(48, &p, Lobe::Full, 16);
        assert_eq!(reduced.side(), full.side());
        assert!((reduced.value_at(0, 0) - full.value_at(0, 0)).abs() < EPS);
    }

    #[test]
    fn out_of_bounds_reads_are_zero() {
        let k = build_kernel(4, &params(2.0, 2.0), Lobe::Full, 0);
        assert_eq!(k.value_at(5, 0), 0.0);
        assert_eq!(k.value_at(0, -5), 0.0);
    }
}
