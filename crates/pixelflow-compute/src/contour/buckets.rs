//! Fixed-grid spatial index.
//!
//! Items are filed by a point key into 16×16 cells covering a bounding
//! rectangle. Range queries visit every cell overlapped by a rectangle,
//! which bounds the cost of containment searches to nearby outlines.

use crate::geometry::{Point, Rectangle};

pub const BUCKET_SIZE: i32 = 16;

#[derive(Debug, Clone)]
pub struct Buckets<T> {
    bounds: Rectangle,
    columns: i32,
    rows: i32,
    cells: Vec<Vec<T>>,
}

impl<T> Buckets<T> {
    #[must_use]
    pub fn new(bounds: Rectangle) -> Self {
        let columns = bounds.width / BUCKET_SIZE + 1;
        let rows = bounds.height / BUCKET_SIZE + 1;
        let count = usize::try_from(columns * rows).unwrap_or(1);
        Self {
            bounds,
            columns,
            rows,
            cells: std::iter::repeat_with(Vec::new).take(count).collect(),
        }
    }

    /// Cell coordinates of `p`, clamped to the grid.
    fn cell_coords(&self, p: Point) -> (i32, i32) {
        (
            (p.x - self.bounds.x)
                .div_euclid(BUCKET_SIZE)
                .clamp(0, self.columns - 1),
            (p.y - self.bounds.y)
                .div_euclid(BUCKET_SIZE)
                .clamp(0, self.rows - 1),
        )
    }

    fn cell_index(&self, (cx, cy): (i32, i32)) -> usize {
        usize::try_from(cy * self.columns + cx).unwrap_or(0)
    }

    pub fn insert(&mut self, key: Point, item: T) {
        let index = self.cell_index(self.cell_coords(key));
        self.cells[index].push(item);
    }

    pub fn fill_with(&mut self, items: impl IntoIterator<Item = T>, key: impl Fn(&T) -> Point) {
        for item in items {
            let k = key(&item);
            self.insert(k, item);
        }
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn cell(&self, index: usize) -> &[T] {
        self.cells.get(index).map_or(&[], Vec::as_slice)
    }

    pub fn cell_mut(&mut self, index: usize) -> Option<&mut Vec<T>> {
        self.cells.get_mut(index)
    }

    /// Indices of all cells overlapped by `rect`, in row-major order.
    #[must_use]
    pub fn cells_in(&self, rect: &Rectangle) -> Vec<usize> {
        let (x0, y0) = self.cell_coords(rect.origin());
        let (x1, y1) = self.cell_coords(rect.corner());
        (y0..=y1)
            .flat_map(|cy| (x0..=x1).map(move |cx| (cx, cy)))
            .map(|c| self.cell_index(c))
            .collect()
    }

    /// Visit each non-empty cell overlapped by `rect` until `visit`
    /// returns `false`.
    pub fn for_each_in(&self, rect: &Rectangle, mut visit: impl FnMut(&[T]) -> bool) {
        for index in self.cells_in(rect) {
            let cell = self.cell(index);
            if !cell.is_empty() && !visit(cell) {
                return;
            }
        }
    }

    /// Total number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Vec::is_empty)
    }
}
