//! Node previews and their rasterization.
//!
//! Processors return a [`Preview`] payload; turning it into pixels is left
//! to [`render_preview`] so hosts that display previews differently can
//! use the payload directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use image::Rgba;
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point as PolyPoint;
use imageproc::rect::Rect;
use pixelflow_compute::RgbaImage;
use pixelflow_compute::geometry::Rectangle;

use crate::globals::ViewerModel;

/// Side length of rendered chart previews.
pub const CHART_SIZE: u32 = 500;

const CHART_FILL: Rgba<u8> = Rgba([0x4a, 0x83, 0xfd, 0xff]);
const MARK_COLOR: Rgba<u8> = Rgba([0x00, 0x00, 0xff, 0xff]);
const LINE_COLOR: Rgba<u8> = Rgba([0xff, 0x00, 0x00, 0xff]);

/// Preview payload attached to a node after evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    /// The node's image as-is.
    Image(Arc<RgbaImage>),
    /// An image with rectangle marks drawn over it.
    Viewer {
        input_image: Arc<RgbaImage>,
        marks: Vec<Rectangle>,
    },
    /// A value profile drawn as a filled chart.
    Chart(Arc<Vec<f64>>),
}

impl Preview {
    /// Tag naming the payload shape, as used by the editor.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Image(_) => "image-preview",
            Self::Viewer { .. } => "viewer-preview",
            Self::Chart(_) => "chart-preview",
        }
    }
}

/// Previews of one update, keyed by node id.
pub type Previews = BTreeMap<String, Preview>;

/// Rasterize a preview.
#[must_use = "returns the rendered preview"]
pub fn render_preview(preview: &Preview) -> RgbaImage {
    match preview {
        Preview::Image(image) => image.as_ref().clone(),
        Preview::Viewer { input_image, marks } => {
            let mut canvas = input_image.as_ref().clone();
            draw_marks(&mut canvas, marks);
            canvas
        }
        Preview::Chart(values) => render_chart(values),
    }
}

/// Rasterize a viewer model: the image with every layer's marks and
/// lines.
#[must_use = "returns the rendered view"]
pub fn render_viewer(model: &ViewerModel) -> RgbaImage {
    let mut canvas = model.image.as_ref().clone();
    for layer in &model.layers {
        draw_marks(&mut canvas, &layer.marks);
        for line in &layer.lines {
            #[allow(clippy::cast_possible_truncation)]
            draw_line_segment_mut(
                &mut canvas,
                (line.from.x as f32, line.from.y as f32),
                (line.to.x as f32, line.to.y as f32),
                LINE_COLOR,
            );
        }
    }
    canvas
}

fn draw_marks(canvas: &mut RgbaImage, marks: &[Rectangle]) {
    for mark in marks {
        let (Ok(width), Ok(height)) = (u32::try_from(mark.width), u32::try_from(mark.height)) else {
            continue;
        };
        if width == 0 || height == 0 {
            continue;
        }
        draw_hollow_rect_mut(canvas, Rect::at(mark.x, mark.y).of_size(width, height), MARK_COLOR);
    }
}

/// Filled profile of `values`, scaled so the maximum touches the top.
fn render_chart(values: &[f64]) -> RgbaImage {
    let mut canvas = RgbaImage::new(CHART_SIZE, CHART_SIZE);
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    if values.is_empty() || max <= 0.0 {
        return canvas;
    }

    let size = f64::from(CHART_SIZE);
    #[allow(clippy::cast_precision_loss)]
    let step = size / values.len() as f64;
    let mut polygon = vec![PolyPoint::new(0, i32::try_from(CHART_SIZE).unwrap_or(i32::MAX))];
    for (i, value) in values.iter().enumerate() {
        let height = size * value / max;
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let point = PolyPoint::new(
            (i as f64 * step).round() as i32,
            (size - height).round() as i32,
        );
        if polygon.last() != Some(&point) {
            polygon.push(point);
        }
    }
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    if polygon.len() >= 3 {
        draw_polygon_mut(&mut canvas, &polygon, CHART_FILL);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globals::Layer;
    use pixelflow_compute::geometry::{Line, Vec2, point_at};

    #[test]
    fn tags_match_editor_names() {
        let img = Arc::new(RgbaImage::new(1, 1));
        assert_eq!(Preview::Image(img.clone()).tag(), "image-preview");
        assert_eq!(
            Preview::Viewer {
                input_image: img,
                marks: Vec::new()
            }
            .tag(),
            "viewer-preview"
        );
        assert_eq!(Preview::Chart(Arc::new(Vec::new())).tag(), "chart-preview");
    }

    #[test]
    fn viewer_preview_outlines_marks() {
        let input_image = Arc::new(RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255])));
        let preview = Preview::Viewer {
            input_image,
            marks: vec![point_at(2, 2).rect(4, 4), point_at(0, 0).rect(0, 3)],
        };
        let out = render_preview(&preview);
        assert_eq!(*out.get_pixel(2, 2), MARK_COLOR);
        assert_eq!(*out.get_pixel(5, 5), MARK_COLOR);
        assert_eq!(*out.get_pixel(3, 3), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn chart_fills_under_profile() {
        let out = render_preview(&Preview::Chart(Arc::new(vec![1.0, 1.0, 1.0, 1.0])));
        assert_eq!(out.dimensions(), (CHART_SIZE, CHART_SIZE));
        assert_eq!(*out.get_pixel(50, 250), CHART_FILL);
    }

    #[test]
    fn empty_chart_is_blank() {
        let out = render_preview(&Preview::Chart(Arc::new(vec![0.0, 0.0])));
        assert!(out.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn viewer_model_draws_lines() {
        let model = ViewerModel {
            image: Arc::new(RgbaImage::new(10, 10)),
            layers: vec![Layer {
                name: "lines".to_owned(),
                marks: Vec::new(),
                lines: vec![Line {
                    from: Vec2::new(0.0, 5.0),
                    to: Vec2::new(9.0, 5.0),
                }],
            }],
        };
        let out = render_viewer(&model);
        assert_eq!(*out.get_pixel(4, 5), LINE_COLOR);
    }
}
