use crate::Errors::DegenerateRegion;
use anyhow::Result;

/// Point on the image plane
///
#[derive(Clone, Default, Debug, Copy, PartialEq)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn sq_distance(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Axis-aligned rectangle in the format (x, y, width, height)
///
#[derive(Clone, Default, Debug, Copy, PartialEq)]
pub struct Region {
    _x: f32,
    _y: f32,
    _width: f32,
    _height: f32,
}

impl Region {
    /// Constructor. Panics when the extents are degenerate - a region without
    /// positive finite width and height is a caller contract violation.
    ///
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        assert!(
            Self::well_formed(width, height),
            "Region extents must be positive finite numbers, got {width} x {height}"
        );
        Self {
            _x: x,
            _y: y,
            _width: width,
            _height: height,
        }
    }

    /// Non-panicking constructor for untrusted boundary input.
    ///
    pub fn try_new(x: f32, y: f32, width: f32, height: f32) -> Result<Self> {
        if Self::well_formed(width, height) {
            Ok(Self::new(x, y, width, height))
        } else {
            Err(DegenerateRegion(width, height).into())
        }
    }

    fn well_formed(width: f32, height: f32) -> bool {
        width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0
    }

    pub fn x(&self) -> f32 {
        self._x
    }

    pub fn y(&self) -> f32 {
        self._y
    }

    pub fn width(&self) -> f32 {
        self._width
    }

    pub fn height(&self) -> f32 {
        self._height
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self._x + self._width / 2.0, self._y + self._height / 2.0)
    }

    /// Mean half-extent of the region.
    ///
    pub fn radius(&self) -> f32 {
        (self._width + self._height) / 4.0
    }

    pub fn area(&self) -> f32 {
        self._width * self._height
    }

    pub fn aspect(&self) -> f32 {
        self._width / self._height
    }

    /// Intersection area of two regions, 0.0 when they don't overlap.
    ///
    pub fn intersection(&self, other: &Region) -> f32 {
        let left = self._x.max(other._x);
        let right = (self._x + self._width).min(other._x + other._width);
        let top = self._y.max(other._y);
        let bottom = (self._y + self._height).min(other._y + other._height);
        if right > left && bottom > top {
            (right - left) * (bottom - top)
        } else {
            0.0
        }
    }

    /// Allows comparing regions
    ///
    pub fn almost_same(&self, other: &Self, eps: f32) -> bool {
        (self._x - other._x).abs() < eps
            && (self._y - other._y).abs() < eps
            && (self._width - other._width).abs() < eps
            && (self._height - other._height).abs() < eps
    }
}

#[cfg(test)]
mod region_tests {
    use crate::utils::region::{Point2D, Region};
    use crate::EPS;

    #[test]
    fn derived_quantities() {
        let r = Region::new(10.0, 20.0, 30.0, 10.0);
        assert_eq!(r.center(), Point2D::new(25.0, 25.0));
        assert!((r.radius() - 10.0).abs() < EPS);
        assert!((r.area() - 300.0).abs() < EPS);
        assert!((r.aspect() - 3.0).abs() < EPS);
    }

    #[test]
    fn intersection_area() {
        let a = Region::new(0.0, 0.0, 10.0, 10.0);
        let b = Region::new(5.0, 5.0, 10.0, 10.0);
        let c = Region::new(20.0, 20.0, 5.0, 5.0);
        assert!((a.intersection(&b) - 25.0).abs() < EPS);
        assert!((b.intersection(&a) - 25.0).abs() < EPS);
        assert_eq!(a.intersection(&c), 0.0);
    }

    #[test]
    #[should_panic]
    fn zero_width_is_contract_violation() {
        let _ = Region::new(0.0, 0.0, 0.0, 10.0);
    }

    #[test]
    fn try_new_rejects_degenerate() {
        assert!(Region::try_new(0.0, 0.0, 10.0, f32::NAN).is_err());
        assert!(Region::try_new(0.0, 0.0, -1.0, 10.0).is_err());
        assert!(Region::try_new(0.0, 0.0, 10.0, 10.0).is_ok());
    }
}
