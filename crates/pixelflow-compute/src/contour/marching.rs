//! Marching-squares outline tracer.
//!
//! The tracer walks the block in raster order, one sample point per pixel
//! corner, comparing each pixel with its left and upper neighbors. Open
//! boundary chains are kept in a doubly linked list of edges stored in an
//! arena; `pending` holds, per column, the vertical edge left dangling by
//! the previous row. When two edges meet head to tail and already belong
//! to the same chain, the chain is closed into an [`Outline`].
//!
//! Pixels are binary: black (`red < 128`) is foreground. Everything
//! outside the block reads as white, so regions touching the border are
//! still closed.

use crate::contour::outline::{Direction, Outline};
use crate::geometry::{Point, Rectangle, point_at};
use crate::types::RgbaImage;

/// Outlines shorter than this are discarded as noise.
pub const MIN_OUTLINE_STEPS: usize = 8;

const BLACK: i32 = 0;
const WHITE: i32 = 0xFF;

type EdgeId = usize;

#[derive(Debug, Clone, Copy)]
struct Edge {
    pos: Point,
    dir: Direction,
    prev: EdgeId,
    next: EdgeId,
}

impl Edge {
    fn next_point(&self) -> Point {
        self.pos.offset_by(self.dir.offset())
    }
}

/// Trace every closed boundary between black and white inside `block`.
#[must_use = "returns the traced outlines"]
pub fn trace_outlines(image: &RgbaImage, block: Rectangle) -> Vec<Outline> {
    let mut tracer = MarchingSquares::new(image, block);
    while !tracer.step() {}
    tracer.outlines
}

struct MarchingSquares<'a> {
    image: &'a RgbaImage,
    block: Rectangle,
    edges: Vec<Edge>,
    pending: Vec<Option<EdgeId>>,
    current: Option<EdgeId>,
    scan: Point,
    outlines: Vec<Outline>,
}

impl<'a> MarchingSquares<'a> {
    fn new(image: &'a RgbaImage, block: Rectangle) -> Self {
        let columns = usize::try_from(block.width).unwrap_or(0) + 2;
        Self {
            image,
            block,
            edges: Vec::new(),
            pending: vec![None; columns],
            current: None,
            scan: block.origin(),
            outlines: Vec::new(),
        }
    }

    fn pixel(&self, x: i32, y: i32) -> i32 {
        if !self.block.contains_point(point_at(x, y)) {
            return WHITE;
        }
        let (Ok(ux), Ok(uy)) = (u32::try_from(x), u32::try_from(y)) else {
            return WHITE;
        };
        match self.image.get_pixel_checked(ux, uy) {
            Some(p) if p.0[0] < 0x80 => BLACK,
            _ => WHITE,
        }
    }

    /// Process one sample point. Returns `true` once the scan is complete.
    fn step(&mut self) -> bool {
        let Point { x, y } = self.scan;
        let colour = self.pixel(x, y);
        let prev_colour = self.pixel(x - 1, y);
        let upper_colour = self.pixel(x, y - 1);
        let slot = usize::try_from(x - self.block.x + 1).unwrap_or(0);

        if let Some(pending) = self.pending[slot] {
            if colour == prev_colour {
                if colour == upper_colour {
                    self.join_edges(self.current, pending);
                    self.current = None;
                } else {
                    self.current = Some(self.horizontal_edge(upper_colour - colour, Some(pending)));
                }
                self.pending[slot] = None;
            } else if colour == upper_colour {
                self.pending[slot] = Some(self.vertical_edge(colour - prev_colour, Some(pending)));
            } else if colour == WHITE {
                self.join_edges(self.current, pending);
                let current = self.horizontal_edge(upper_colour - colour, None);
                self.current = Some(current);
                self.pending[slot] = Some(self.vertical_edge(colour - prev_colour, Some(current)));
            } else {
                let new_current = self.horizontal_edge(upper_colour - colour, Some(pending));
                self.pending[slot] = Some(self.vertical_edge(colour - prev_colour, self.current));
                self.current = Some(new_current);
            }
        } else {
            if colour != prev_colour {
                let edge = self.vertical_edge(colour - prev_colour, self.current);
                self.pending[slot] = Some(edge);
                self.current = Some(edge);
            }
            self.current = if colour == upper_colour {
                None
            } else {
                Some(self.horizontal_edge(upper_colour - colour, self.current))
            };
        }

        self.scan.x += 1;
        let corner = self.block.corner();
        if self.scan.x > corner.x {
            self.scan.y += 1;
            self.scan.x = self.block.x - 1;
        }
        self.scan.y > corner.y
    }

    fn new_edge(&mut self, pos: Point, dir: Direction) -> EdgeId {
        let id = self.edges.len();
        self.edges.push(Edge {
            pos,
            dir,
            prev: id,
            next: id,
        });
        id
    }

    fn horizontal_edge(&mut self, sign: i32, join: Option<EdgeId>) -> EdgeId {
        let Point { x, y } = self.scan;
        let edge = if sign > 0 {
            self.new_edge(point_at(x + 1, y), Direction::Left)
        } else {
            self.new_edge(point_at(x, y), Direction::Right)
        };
        if let Some(join) = join {
            self.join_with(edge, join);
        }
        edge
    }

    fn vertical_edge(&mut self, sign: i32, join: Option<EdgeId>) -> EdgeId {
        let Point { x, y } = self.scan;
        let edge = if sign < 0 {
            self.new_edge(point_at(x, y), Direction::Down)
        } else {
            self.new_edge(point_at(x, y + 1), Direction::Up)
        };
        if let Some(join) = join {
            self.join_with(edge, join);
        }
        edge
    }

    /// Link a fresh edge next to `join`: before it when `edge` ends where
    /// `join` starts, after it otherwise.
    fn join_with(&mut self, edge: EdgeId, join: EdgeId) {
        if self.edges[edge].next_point() == self.edges[join].pos {
            let join_prev = self.edges[join].prev;
            self.edges[edge].prev = join_prev;
            self.edges[join_prev].next = edge;
            self.edges[edge].next = join;
            self.edges[join].prev = edge;
        } else {
            let join_next = self.edges[join].next;
            self.edges[edge].next = join_next;
            self.edges[join_next].prev = edge;
            self.edges[edge].prev = join;
            self.edges[join].next = edge;
        }
    }

    /// Connect two chain ends, closing an outline if they already form one
    /// chain.
    fn join_edges(&mut self, first: Option<EdgeId>, second: EdgeId) {
        let Some(mut a) = first else {
            return;
        };
        let mut b = second;
        if self.edges[a].next_point() != self.edges[b].pos {
            std::mem::swap(&mut a, &mut b);
        }

        if self.edges[a].next == b {
            let outline = self.build_outline(a);
            if outline.steps.len() >= MIN_OUTLINE_STEPS {
                self.outlines.push(outline);
            }
        } else {
            let b_prev = self.edges[b].prev;
            let a_next = self.edges[a].next;
            self.edges[b_prev].next = a_next;
            self.edges[a_next].prev = b_prev;
            self.edges[a].next = b;
            self.edges[b].prev = a;
        }
    }

    fn build_outline(&self, first: EdgeId) -> Outline {
        let mut steps = Vec::new();
        let mut current = first;
        loop {
            steps.push(self.edges[current].dir);
            current = self.edges[current].next;
            if current == first || steps.len() > self.edges.len() {
                break;
            }
        }
        Outline::from_steps(self.edges[first].pos, steps)
    }
}
