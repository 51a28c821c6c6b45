//! Integer grid geometry shared by the filters and the contour tracer.
//!
//! [`Point`], [`Offset`] and [`Rectangle`] live on the pixel lattice:
//! contour corners sit between pixels, so every coordinate is an `i32`.
//! Rectangles are half-open for point containment (`origin <= p < corner`)
//! but closed for [`Rectangle::overlap`].
//!
//! [`Vec2`] and [`Line`] carry the sub-pixel output of the Hough line
//! extraction.

use serde::{Deserialize, Serialize};

/// A position on the pixel lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Shorthand for [`Point::new`].
#[must_use]
pub const fn point_at(x: i32, y: i32) -> Point {
    Point::new(x, y)
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Component-wise minimum.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Translate by `offset`.
    #[must_use]
    pub const fn offset_by(self, offset: Offset) -> Self {
        Self::new(self.x + offset.dx, self.y + offset.dy)
    }

    /// Vector from `origin` to `self`.
    #[must_use]
    pub const fn subtract(self, origin: Self) -> Offset {
        Offset::new(self.x - origin.x, self.y - origin.y)
    }

    /// Rectangle with this point as origin and the given size.
    #[must_use]
    pub const fn rect(self, width: i32, height: i32) -> Rectangle {
        Rectangle::new(self, Dimension::new(width, height))
    }

    /// Rectangle spanning from this point to `corner`.
    #[must_use]
    pub const fn rect_at_corner(self, corner: Self) -> Rectangle {
        Rectangle::new(self, Dimension::new(corner.x - self.x, corner.y - self.y))
    }
}

/// A displacement between two lattice points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    #[must_use]
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self::new(self.dx + other.dx, self.dy + other.dy)
    }

    /// Z component of the 3D cross product.
    #[must_use]
    pub const fn cross_product(self, other: Self) -> i64 {
        self.dx as i64 * other.dy as i64 - self.dy as i64 * other.dx as i64
    }
}

/// Width and height of a [`Rectangle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub width: i32,
    pub height: i32,
}

impl Dimension {
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle defined by its origin and size.
///
/// Negative sizes are clamped to zero on construction so the
/// `width >= 0 && height >= 0` invariant always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    #[must_use]
    pub const fn new(origin: Point, size: Dimension) -> Self {
        let width = if size.width < 0 { 0 } else { size.width };
        let height = if size.height < 0 { 0 } else { size.height };
        Self {
            x: origin.x,
            y: origin.y,
            width,
            height,
        }
    }

    #[must_use]
    pub const fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// The exclusive bottom-right corner.
    #[must_use]
    pub const fn corner(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    #[must_use]
    pub const fn bottom_left(&self) -> Point {
        Point::new(self.x, self.y + self.height)
    }

    #[must_use]
    pub const fn top_right(&self) -> Point {
        Point::new(self.x + self.width, self.y)
    }

    #[must_use]
    pub const fn size(&self) -> Dimension {
        Dimension::new(self.width, self.height)
    }

    #[must_use]
    pub const fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    /// Smallest rectangle containing `self` and `p`.
    #[must_use]
    pub fn union_point(&self, p: Point) -> Self {
        self.origin().min(p).rect_at_corner(self.corner().max(p))
    }

    /// Smallest rectangle containing both rectangles.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        self.origin()
            .min(other.origin())
            .rect_at_corner(self.corner().max(other.corner()))
    }

    /// Half-open containment: the corner itself is outside.
    #[must_use]
    pub const fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.x + self.width && p.y < self.y + self.height
    }

    /// Both the origin and the corner of `other` must be contained.
    ///
    /// Because [`contains_point`](Self::contains_point) excludes the corner,
    /// a rectangle does not contain itself.
    #[must_use]
    pub const fn contains_rect(&self, other: &Self) -> bool {
        self.contains_point(other.origin()) && self.contains_point(other.corner())
    }

    /// Closed-interval overlap test: touching edges count as overlapping.
    #[must_use]
    pub const fn overlap(&self, other: &Self) -> bool {
        other.x <= self.x + self.width
            && other.y <= self.y + self.height
            && other.x + other.width >= self.x
            && other.y + other.height >= self.y
    }
}

/// A sub-pixel position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A line segment in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Line {
    pub from: Vec2,
    pub to: Vec2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_corners() {
        let r = point_at(2, 3).rect(4, 5);
        assert_eq!(r.corner(), point_at(6, 8));
        assert_eq!(r.bottom_left(), point_at(2, 8));
        assert_eq!(r.top_right(), point_at(6, 3));
        assert_eq!(r.area(), 20);
    }

    #[test]
    fn negative_size_is_clamped() {
        let r = point_at(5, 5).rect_at_corner(point_at(1, 1));
        assert_eq!(r.width, 0);
        assert_eq!(r.height, 0);
    }

    #[test]
    fn union_point_grows_in_both_directions() {
        let r = point_at(2, 2).rect(0, 0);
        let r = r.union_point(point_at(5, 1));
        let r = r.union_point(point_at(0, 4));
        assert_eq!(r, point_at(0, 1).rect(5, 3));
    }

    #[test]
    fn union_of_disjoint_rects() {
        let a = point_at(0, 0).rect(2, 2);
        let b = point_at(5, 6).rect(1, 1);
        assert_eq!(a.union(&b), point_at(0, 0).rect(6, 7));
    }

    #[test]
    fn contains_point_is_half_open() {
        let r = point_at(0, 0).rect(3, 3);
        assert!(r.contains_point(point_at(0, 0)));
        assert!(r.contains_point(point_at(2, 2)));
        assert!(!r.contains_point(point_at(3, 2)));
        assert!(!r.contains_point(point_at(-1, 0)));
    }

    #[test]
    fn rect_does_not_contain_itself() {
        let r = point_at(0, 0).rect(3, 3);
        assert!(!r.contains_rect(&r));
        assert!(r.contains_rect(&point_at(1, 1).rect(1, 1)));
    }

    #[test]
    fn touching_rects_overlap() {
        let a = point_at(0, 0).rect(2, 2);
        let b = point_at(2, 0).rect(2, 2);
        let c = point_at(3, 0).rect(2, 2);
        assert!(a.overlap(&b));
        assert!(!a.overlap(&c));
    }

    #[test]
    fn cross_product_sign() {
        assert_eq!(Offset::new(1, 0).cross_product(Offset::new(0, 1)), 1);
        assert_eq!(Offset::new(0, 1).cross_product(Offset::new(1, 0)), -1);
        assert_eq!(Offset::new(2, 2).cross_product(Offset::new(1, 1)), 0);
    }
}
