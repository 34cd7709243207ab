use glam::Vec2;

/// Axis-aligned box in floating point pixel space.
///
/// Detector outputs (table candidates, text line candidates) live in this
/// representation until they are snapped to the integer [`BoundingBox`] grid
/// used by the rest of the pipeline.
///
/// [`BoundingBox`]: crate::layout::element::BoundingBox
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bbox {
    /// Top-left corner.
    pub min: Vec2,
    /// Bottom-right corner.
    pub max: Vec2,
}

impl Bbox {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Builds a box from YOLO style `(center, size)` values.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use ledgerscan_core::analysis::bbox::Bbox;
    /// let bbox = Bbox::from_center_size(Vec2::new(100.0, 200.0), Vec2::new(50.0, 80.0));
    /// assert_eq!(bbox.min, Vec2::new(75.0, 160.0));
    /// assert_eq!(bbox.max, Vec2::new(125.0, 240.0));
    /// ```
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half_size = size / 2.0;
        Self {
            min: center - half_size,
            max: center + half_size,
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f32 {
        let length = self.max - self.min;
        length.x * length.y
    }

    /// Overlapping area of two boxes, `0.0` when they are disjoint.
    pub fn intersection(&self, other: &Self) -> f32 {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);

        if max.x > min.x && max.y > min.y {
            (max.x - min.x) * (max.y - min.y)
        } else {
            0.
        }
    }

    /// Intersection over the smaller of the two areas.
    ///
    /// Unlike IoU this reaches `1.0` when a small box sits entirely inside a
    /// large one, which is the case to collapse when a detector emits both a
    /// whole table and one of its sub-blocks.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use ledgerscan_core::analysis::bbox::Bbox;
    /// let large = Bbox::new(Vec2::new(0.0, 0.0), Vec2::new(100.0, 100.0));
    /// let small = Bbox::new(Vec2::new(10.0, 10.0), Vec2::new(30.0, 30.0));
    /// assert_eq!(large.overlap_ratio(&small), 1.0);
    /// ```
    pub fn overlap_ratio(&self, other: &Self) -> f32 {
        let intersection_area = self.intersection(other);
        let min_area = self.area().min(other.area());

        if min_area > 0.0 {
            intersection_area / min_area
        } else {
            0.0
        }
    }

    /// Smallest box enclosing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn clamp(&self, min_bounds: Vec2, max_bounds: Vec2) -> Self {
        Self {
            min: self.min.max(min_bounds),
            max: self.max.min(max_bounds),
        }
    }

    /// Multiplies both corners, moving the box between resolutions.
    pub fn scale(&self, factor: f32) -> Self {
        Self {
            min: self.min * factor,
            max: self.max * factor,
        }
    }

    /// Grows the box by `distance` on every side.
    pub fn expand(&self, distance: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(distance),
            max: self.max + Vec2::splat(distance),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}
