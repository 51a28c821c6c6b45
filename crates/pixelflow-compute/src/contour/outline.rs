//! Chain-coded closed outlines and winding-number containment.

use serde::{Deserialize, Serialize};

use crate::geometry::{Offset, Point, Rectangle};

/// A unit step along an outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Up,
    Right,
    Down,
}

impl Direction {
    #[must_use]
    pub const fn offset(self) -> Offset {
        match self {
            Self::Left => Offset::new(-1, 0),
            Self::Up => Offset::new(0, -1),
            Self::Right => Offset::new(1, 0),
            Self::Down => Offset::new(0, 1),
        }
    }
}

/// Result of a winding-number query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    /// Signed count of boundary crossings to the right of the point.
    Count(i32),
    /// The point lies on the outline itself.
    Intersecting,
}

/// A closed polygon stored as a start point plus unit steps.
///
/// The steps return to `start`. `children` holds outlines nested directly
/// inside this one once a hierarchy has been built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub bounds: Rectangle,
    pub start: Point,
    pub steps: Vec<Direction>,
    #[serde(default)]
    pub children: Vec<Self>,
}

impl Outline {
    /// Build an outline from its chain code, computing the bounds.
    #[must_use]
    pub fn from_steps(start: Point, steps: Vec<Direction>) -> Self {
        let mut pos = start;
        let mut bounds = start.rect(0, 0);
        for step in &steps {
            pos = pos.offset_by(step.offset());
            bounds = bounds.union_point(pos);
        }
        Self {
            bounds,
            start,
            steps,
            children: Vec::new(),
        }
    }

    /// Every vertex, starting at `start` and excluding the closing one.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.steps.iter().scan(self.start, |pos, step| {
            let here = *pos;
            *pos = pos.offset_by(step.offset());
            Some(here)
        })
    }

    /// Winding number of `point` relative to this outline.
    ///
    /// Counts vertical steps crossing the point's row: a downward step
    /// with the outline on the right adds one, an upward one subtracts
    /// one. A step passing exactly through the point is reported as
    /// [`Winding::Intersecting`].
    #[must_use]
    pub fn winding_number(&self, point: Point) -> Winding {
        let mut vec = self.start.subtract(point);
        let mut count = 0;
        for step in &self.steps {
            let step_vec = step.offset();
            let next_vec = vec.add(step_vec);
            if vec.dy <= 0 && next_vec.dy > 0 {
                match vec.cross_product(step_vec) {
                    c if c < 0 => count += 1,
                    0 => return Winding::Intersecting,
                    _ => {}
                }
            } else if vec.dy > 0 && next_vec.dy <= 0 {
                match vec.cross_product(step_vec) {
                    c if c > 0 => count -= 1,
                    0 => return Winding::Intersecting,
                    _ => {}
                }
            }
            vec = next_vec;
        }
        Winding::Count(count)
    }

    /// Whether this outline lies inside `other`.
    ///
    /// The first vertex not on `other`'s boundary decides. When every
    /// vertex touches `other`, the roles are swapped and `other`'s
    /// vertices are tested against `self`; an outline whose vertices all
    /// coincide counts as inside.
    #[must_use]
    pub fn is_inside(&self, other: &Self) -> bool {
        if !self.bounds.overlap(&other.bounds) {
            return false;
        }
        if self.steps.is_empty() {
            return other.bounds.contains_rect(&self.bounds);
        }

        let decided = self
            .points()
            .map(|p| other.winding_number(p))
            .find(|w| *w != Winding::Intersecting);
        if let Some(Winding::Count(count)) = decided {
            return count != 0;
        }

        let reverse = other
            .points()
            .map(|p| self.winding_number(p))
            .find(|w| *w != Winding::Intersecting);
        matches!(reverse, None | Some(Winding::Intersecting | Winding::Count(0)))
    }

    /// Twice the signed area enclosed by the outline alone.
    ///
    /// Outlines traced around black regions are positive; holes are
    /// negative. An outline without steps reports its bounding area.
    #[must_use]
    pub fn outer_area(&self) -> i64 {
        if self.steps.is_empty() {
            return self.bounds.area();
        }
        let mut pos = self.start;
        let mut total = 0i64;
        for step in &self.steps {
            let offset = step.offset();
            if offset.dx > 0 {
                total += i64::from(pos.y);
            } else if offset.dx < 0 {
                total -= i64::from(pos.y);
            }
            pos = pos.offset_by(offset);
        }
        total
    }

    /// Outer area plus the (signed) areas of all nested children.
    #[must_use]
    pub fn area(&self) -> i64 {
        self.outer_area() + self.children.iter().map(Self::area).sum::<i64>()
    }

    /// Every child has an area sign opposite to its parent, recursively.
    #[must_use]
    pub fn is_legally_nested(&self) -> bool {
        if self.steps.is_empty() {
            return true;
        }
        let parent_area = self.outer_area();
        self.children
            .iter()
            .all(|child| child.outer_area() * parent_area <= 0 && child.is_legally_nested())
    }
}
