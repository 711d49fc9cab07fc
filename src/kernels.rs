/// Center-surround kernel synthesis
pub mod builder;

/// Kernel cache keyed by a coarse shape signature
pub mod cache;

use nalgebra::DMatrix;

/// Square kernel image with the origin at the geometric center.
///
/// The matrix side is always `2 * radius + 1`, rows are `y`, columns are `x`.
///
#[derive(Clone, Debug)]
pub struct Kernel {
    radius: usize,
    image: DMatrix<f32>,
}

impl Kernel {
    pub(crate) fn new(radius: usize, image: DMatrix<f32>) -> Self {
        assert!(
            image.nrows() == 2 * radius + 1 && image.ncols() == 2 * radius + 1,
            "Kernel image must be square with side 2 * radius + 1"
        );
        Self { radius, image }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn side(&self) -> usize {
        2 * self.radius + 1
    }

    pub fn image(&self) -> &DMatrix<f32> {
        &self.image
    }

    /// Kernel value at the signed offset from the center, 0.0 outside.
    ///
    pub fn value_at(&self, dx: i64, dy: i64) -> f32 {
        let r = self.radius as i64;
        if dx.abs() > r || dy.abs() > r {
            0.0
        } else {
            self.image[((dy + r) as usize, (dx + r) as usize)]
        }
    }
}
