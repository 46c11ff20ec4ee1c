use std::cmp::Ordering;

/// Axis-aligned face box in frame pixel coordinates, corners `(x1, y1)`-`(x2, y2)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    /// Orders boxes by top-left corner: ascending x, then ascending y.
    pub fn cmp_top_left(&self, other: &BoundingBox) -> Ordering {
        self.x1
            .total_cmp(&other.x1)
            .then_with(|| self.y1.total_cmp(&other.y1))
    }

    /// Clamps the box to a `width` x `height` frame.
    pub fn clamped(&self, width: u32, height: u32) -> BoundingBox {
        let w = width as f64;
        let h = height as f64;
        BoundingBox {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_dimensions() {
        let b = BoundingBox::new(10.0, 20.0, 50.0, 80.0);
        assert_relative_eq!(b.width(), 40.0);
        assert_relative_eq!(b.height(), 60.0);
        assert_relative_eq!(b.area(), 2400.0);
        assert_eq!(b.center(), (30.0, 50.0));
    }

    #[test]
    fn test_inverted_box_has_zero_area() {
        let b = BoundingBox::new(50.0, 50.0, 10.0, 10.0);
        assert_relative_eq!(b.area(), 0.0);
    }

    #[test]
    fn test_iou_identical() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert_relative_eq!(b.iou(&b), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // intersection 50x100 = 5000, union 15000
        let a = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BoundingBox::new(50.0, 0.0, 150.0, 100.0);
        assert_relative_eq!(a.iou(&b), 5000.0 / 15000.0);
    }

    #[rstest]
    #[case::disjoint(BoundingBox::new(20.0, 20.0, 30.0, 30.0))]
    #[case::touching(BoundingBox::new(10.0, 0.0, 20.0, 10.0))]
    fn test_iou_zero(#[case] other: BoundingBox) {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert_relative_eq!(a.iou(&other), 0.0);
    }

    #[test]
    fn test_cmp_top_left_orders_by_x_then_y() {
        let a = BoundingBox::new(10.0, 90.0, 20.0, 100.0);
        let b = BoundingBox::new(10.0, 5.0, 20.0, 15.0);
        let c = BoundingBox::new(30.0, 0.0, 40.0, 10.0);
        assert_eq!(a.cmp_top_left(&c), Ordering::Less);
        assert_eq!(b.cmp_top_left(&a), Ordering::Less);
        assert_eq!(a.cmp_top_left(&a), Ordering::Equal);
    }

    #[test]
    fn test_clamped() {
        let b = BoundingBox::new(-5.0, -10.0, 120.0, 50.0).clamped(100, 40);
        assert_eq!(b, BoundingBox::new(0.0, 0.0, 100.0, 40.0));
    }
}
