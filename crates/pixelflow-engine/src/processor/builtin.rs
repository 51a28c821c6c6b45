//! Built-in node types.

use std::sync::Arc;

use pixelflow_compute::contour::{build_block, trace_image};
use pixelflow_compute::geometry::Rectangle;
use pixelflow_compute::{Blob, FloatImage, RgbaImage, float_image};
use pixelflow_compute::{binarize, blur, canny, distance, edge, grayscale, histogram, hough};

use crate::globals::{Layer, ViewerModel};
use crate::preview::Preview;
use crate::processor::{Category, Context, Evaluation, Inputs, NodeDefinition};
use crate::value::Value;

/// Every built-in node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    ImageInput,
    Viewer,
    ChartViewer,
    Inputs,
    Outputs,
    Grayscale,
    GaussianBlur,
    SobelEdgeDetect,
    CannyPostProcess,
    HoughTransform,
    HoughToLines,
    Histogram,
    OtsuLevels,
    Binarization,
    Distance,
    MarchingSquares,
    BlobHierarchy,
    Argmax,
}

impl NodeKind {
    pub const ALL: [Self; 18] = [
        Self::ImageInput,
        Self::Viewer,
        Self::ChartViewer,
        Self::Inputs,
        Self::Outputs,
        Self::Grayscale,
        Self::GaussianBlur,
        Self::SobelEdgeDetect,
        Self::CannyPostProcess,
        Self::HoughTransform,
        Self::HoughToLines,
        Self::Histogram,
        Self::OtsuLevels,
        Self::Binarization,
        Self::Distance,
        Self::MarchingSquares,
        Self::BlobHierarchy,
        Self::Argmax,
    ];

    /// Type id used in graph documents.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::ImageInput => "image-input",
            Self::Viewer => "viewer",
            Self::ChartViewer => "chart-viewer",
            Self::Inputs => "inputs",
            Self::Outputs => "outputs",
            Self::Grayscale => "grayscale",
            Self::GaussianBlur => "gaussian-blur",
            Self::SobelEdgeDetect => "sobel-edge-detect",
            Self::CannyPostProcess => "canny-post-process",
            Self::HoughTransform => "hough-transform",
            Self::HoughToLines => "hough-to-lines",
            Self::Histogram => "histogram",
            Self::OtsuLevels => "otsu-levels",
            Self::Binarization => "binarization",
            Self::Distance => "distance",
            Self::MarchingSquares => "marching-squares",
            Self::BlobHierarchy => "blob-hierarchy",
            Self::Argmax => "argmax",
        }
    }

    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn definition(self) -> NodeDefinition {
        use crate::processor::PortDefinition as P;
        use crate::value::ValueKind as K;

        let image_out = || P::output("output", "Output", K::Image);
        let image_in = || P::input("input", "Input", K::Image);
        let (label, category, preview, ports) = match self {
            Self::ImageInput => (
                "Image Input",
                Category::Io,
                true,
                vec![
                    P::output("image", "Image", K::Image),
                    P::input("name", "Name", K::CatalogImage).unlinkable(),
                ],
            ),
            Self::Viewer => (
                "Viewer",
                Category::Io,
                true,
                vec![P::input("image", "Image", K::Image), P::input("marks", "Marks", K::Array)],
            ),
            Self::ChartViewer => (
                "Chart Viewer",
                Category::Io,
                true,
                vec![P::input("values", "Values", K::Array)],
            ),
            Self::Inputs => ("Inputs", Category::Io, false, Vec::new()),
            Self::Outputs => ("Outputs", Category::Io, false, Vec::new()),
            Self::Grayscale => ("Grayscale", Category::Color, false, vec![image_out(), image_in()]),
            Self::GaussianBlur => (
                "Gaussian Blur",
                Category::Filters,
                false,
                vec![
                    image_out(),
                    image_in(),
                    P::input("size", "Size", K::Int)
                        .with_default(Value::Int(2))
                        .with_range(1.0, 5.0),
                    P::input("sigma", "Sigma", K::Real)
                        .with_default(Value::Real(1.4))
                        .with_range(0.1, 2.0),
                ],
            ),
            Self::SobelEdgeDetect => (
                "Sobel Edge Detect",
                Category::Filters,
                false,
                vec![image_out(), P::output("angles", "Angles", K::Array), image_in()],
            ),
            Self::CannyPostProcess => (
                "Canny Post Process",
                Category::Filters,
                false,
                vec![image_out(), image_in(), P::input("angles", "Angles", K::Array)],
            ),
            Self::HoughTransform => (
                "Hough Transform",
                Category::Analysis,
                false,
                vec![image_out(), image_in()],
            ),
            Self::HoughToLines => (
                "Hough To Lines",
                Category::Analysis,
                false,
                vec![
                    P::output("lines", "Lines", K::Array),
                    P::output("histo", "Histo", K::Array),
                    P::input("hough", "Hough", K::Image),
                    P::input("image", "Image", K::Image),
                    P::input("threshold", "Threshold", K::Int)
                        .with_default(Value::Int(67))
                        .with_range(1.0, 255.0),
                    P::input("count", "Count", K::Int).with_default(Value::Int(50)),
                ],
            ),
            Self::Histogram => (
                "Histogram",
                Category::Analysis,
                false,
                vec![
                    P::output("histogram", "Histogram", K::Array),
                    P::input("image", "Image", K::Image),
                ],
            ),
            Self::OtsuLevels => (
                "Otsu Levels",
                Category::Binarize,
                false,
                vec![
                    P::output("levels", "Levels", K::Array),
                    P::input("histogram", "Histogram", K::Array),
                ],
            ),
            Self::Binarization => (
                "Binarization",
                Category::Binarize,
                false,
                vec![
                    image_out(),
                    image_in(),
                    P::input("level", "Level", K::Int)
                        .with_default(Value::Int(128))
                        .with_range(0.0, 255.0),
                ],
            ),
            Self::Distance => (
                "Distance",
                Category::Analysis,
                false,
                vec![image_out(), image_in()],
            ),
            Self::MarchingSquares => (
                "Marching Squares",
                Category::Segmentation,
                false,
                vec![
                    P::output("outlines", "Outlines", K::Array),
                    P::input("image", "Image", K::Image),
                ],
            ),
            Self::BlobHierarchy => (
                "Blob Hierarchy",
                Category::Segmentation,
                false,
                vec![
                    P::output("blobs", "Blobs", K::Any),
                    P::input("outlines", "Outlines", K::Any),
                    P::input("filter-blobs", "Filter Blobs", K::Bool)
                        .with_default(Value::Bool(false))
                        .unlinkable(),
                    P::input("distance", "Distance", K::Image),
                ],
            ),
            Self::Argmax => (
                "Argmax",
                Category::Math,
                false,
                vec![P::output("value", "Value", K::Int), P::input("values", "Values", K::Array)],
            ),
        };
        NodeDefinition {
            id: self.id().to_owned(),
            label: label.to_owned(),
            category,
            preview,
            ports,
        }
    }

    /// Run the node on resolved inputs.
    #[must_use]
    pub fn evaluate(self, inputs: &Inputs, ctx: &mut Context<'_>) -> Evaluation {
        let image = |port: &str| inputs.get(port).and_then(Value::as_image).cloned();
        let int = |port: &str| inputs.get(port).and_then(Value::as_i64);

        match self {
            Self::ImageInput => image_input(inputs, ctx),
            Self::Viewer => viewer(inputs, ctx),
            Self::ChartViewer => inputs
                .get("values")
                .and_then(Value::as_values)
                .map_or_else(Evaluation::empty, |values| {
                    Evaluation::empty().with_preview(Preview::Chart(Arc::new(values)))
                }),
            Self::Inputs | Self::Outputs => Evaluation::empty(),
            Self::Grayscale => map_image(image("input"), grayscale::grayscale),
            Self::GaussianBlur => {
                let (Some(input), Some(size), Some(sigma)) =
                    (image("input"), int("size"), inputs.get("sigma").and_then(Value::as_f64))
                else {
                    return Evaluation::empty();
                };
                let size = u32::try_from(size.max(0)).unwrap_or(0);
                let output = blur::gaussian_blur(&input, size, sigma);
                Evaluation::empty().with_output("output", Value::image(output))
            }
            Self::SobelEdgeDetect => image("input").map_or_else(Evaluation::empty, |input| {
                let sobel = edge::sobel(&input);
                Evaluation::empty()
                    .with_output("output", Value::image(sobel.magnitude))
                    .with_output("angles", Value::Grid(Arc::new(sobel.angles)))
            }),
            Self::CannyPostProcess => {
                let Some(input) = image("input") else {
                    return Evaluation::empty();
                };
                let Some(angles) = inputs.get("angles").and_then(|a| angle_field(&input, a)) else {
                    return Evaluation::empty();
                };
                let edges = canny::canny_post_process(&input, &angles);
                Evaluation::empty().with_output("output", Value::image(edges))
            }
            Self::HoughTransform => map_image(image("input"), hough::hough_transform),
            Self::HoughToLines => {
                let (Some(accumulator), Some(_), Some(threshold), Some(count)) =
                    (image("hough"), image("image"), int("threshold"), int("count"))
                else {
                    return Evaluation::empty();
                };
                let threshold = u8::try_from(threshold.clamp(0, 255)).unwrap_or(u8::MAX);
                let count = u32::try_from(count.max(0)).unwrap_or(u32::MAX);
                let result = hough::hough_to_lines(&accumulator, threshold, count);
                Evaluation::empty()
                    .with_output("lines", Value::Lines(Arc::new(result.lines)))
                    .with_output("histo", Value::array(result.histo))
            }
            Self::Histogram => image("image").map_or_else(Evaluation::empty, |input| {
                Evaluation::empty()
                    .with_output("histogram", Value::array(histogram::build_histogram(&input)))
            }),
            Self::OtsuLevels => inputs
                .get("histogram")
                .and_then(Value::as_values)
                .map_or_else(Evaluation::empty, |values| {
                    let levels = histogram::otsu_levels(&values);
                    Evaluation::empty().with_output("levels", Value::array(levels))
                }),
            Self::Binarization => {
                let (Some(input), Some(level)) = (image("input"), int("level")) else {
                    return Evaluation::empty();
                };
                let level = u8::try_from(level.clamp(0, 255)).unwrap_or(u8::MAX);
                let output = binarize::binarize(&input, level);
                Evaluation::empty().with_output("output", Value::image(output))
            }
            Self::Distance => image("input").map_or_else(Evaluation::empty, |input| {
                let map = distance::distance_transform(&input);
                Evaluation::empty().with_output("output", Value::image(map.image))
            }),
            Self::MarchingSquares => image("image").map_or_else(Evaluation::empty, |input| {
                let outlines = trace_image(&input);
                Evaluation::empty().with_output("outlines", Value::Outlines(Arc::new(outlines)))
            }),
            Self::BlobHierarchy => {
                let Some(Value::Outlines(set)) = inputs.get("outlines") else {
                    return Evaluation::empty();
                };
                let filter = inputs.get("filter-blobs").is_some_and(Value::is_truthy);
                let options = filter.then_some(&ctx.config.block_options);
                let distance = image("distance");
                let block = build_block(set, options, distance.as_deref());
                log::debug!(
                    "blob hierarchy: {} blobs, {} noises, {} smalls, {} larges",
                    block.blobs.len(),
                    block.noises.len(),
                    block.smalls.len(),
                    block.larges.len()
                );
                Evaluation::empty().with_output("blobs", Value::Block(Arc::new(block)))
            }
            Self::Argmax => inputs
                .get("values")
                .and_then(Value::as_values)
                .and_then(|values| histogram::argmax(&values))
                .and_then(|index| i64::try_from(index).ok())
                .map_or_else(Evaluation::empty, |index| {
                    Evaluation::empty().with_output("value", Value::Int(index))
                }),
        }
    }
}

fn map_image(
    input: Option<Arc<RgbaImage>>,
    filter: impl FnOnce(&RgbaImage) -> RgbaImage,
) -> Evaluation {
    input.map_or_else(Evaluation::empty, |input| {
        Evaluation::empty().with_output("output", Value::image(filter(&input)))
    })
}

/// Gradient directions for `image`, from a Sobel grid or a plain array
/// in row-major order.
fn angle_field(image: &RgbaImage, angles: &Value) -> Option<Arc<FloatImage>> {
    match angles {
        Value::Grid(grid) => Some(Arc::clone(grid)),
        Value::Array(values) => {
            #[allow(clippy::cast_possible_truncation)]
            let data = values.iter().map(|&v| v as f32).collect();
            match float_image(image.width(), image.height(), data) {
                Ok(grid) => Some(Arc::new(grid)),
                Err(e) => {
                    log::warn!("canny angles do not fit the input image: {e}");
                    None
                }
            }
        }
        other => {
            log::warn!("canny angles cannot be read from {}", other.kind_name());
            None
        }
    }
}

fn image_input(inputs: &Inputs, ctx: &Context<'_>) -> Evaluation {
    let Some(name) = inputs.get("name").and_then(Value::as_text) else {
        return Evaluation::empty();
    };
    let Some(entry) = ctx.globals.images().iter().find(|image| image.name == name) else {
        log::warn!("image '{name}' is not in the catalog");
        return Evaluation::empty();
    };
    Evaluation::empty()
        .with_output("image", Value::Image(Arc::clone(&entry.data)))
        .with_preview(Preview::Image(Arc::clone(&entry.data)))
}

/// Split a marks value into named layers.
fn layers_for(marks: &Value) -> Vec<Layer> {
    let layer = |name: &str, marks: Vec<Rectangle>| Layer {
        name: name.to_owned(),
        marks,
        lines: Vec::new(),
    };
    match marks {
        Value::Outlines(set) => vec![layer(
            "outlines",
            set.outlines.iter().map(|o| o.bounds).collect(),
        )],
        Value::Block(block) => {
            let boxes = |blobs: &[Blob]| -> Vec<Rectangle> {
                blobs.iter().map(Blob::bounding_box).collect()
            };
            vec![
                layer("blobs", boxes(&block.blobs)),
                layer("noises", boxes(&block.noises)),
                layer("smalls", boxes(&block.smalls)),
                layer("larges", boxes(&block.larges)),
            ]
        }
        Value::Lines(lines) => vec![Layer {
            name: "lines".to_owned(),
            marks: Vec::new(),
            lines: lines.as_ref().clone(),
        }],
        other => {
            log::warn!("viewer cannot display {} marks", other.kind_name());
            Vec::new()
        }
    }
}

fn viewer(inputs: &Inputs, ctx: &mut Context<'_>) -> Evaluation {
    let Some(input_image) = inputs.get("image").and_then(Value::as_image).cloned() else {
        return Evaluation::empty();
    };
    let layers = inputs.get("marks").map(layers_for).unwrap_or_default();
    let marks = layers.iter().flat_map(|l| l.marks.iter().copied()).collect();
    ctx.globals.set_viewer(ViewerModel {
        image: Arc::clone(&input_image),
        layers,
    });
    Evaluation::empty().with_preview(Preview::Viewer { input_image, marks })
}
