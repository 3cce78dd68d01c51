// Rendering of the tally as a donut chart.

use std::f32::consts::PI;
use std::fmt::Write as FmtWrite;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Transform};

use crate::quiz::*;

// DejaVu Sans, see assets/DejaVuSans-LICENSE.txt.
const LABEL_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
const LABEL_FONT_FAMILY: &str = "DejaVu Sans";
const LABEL_COLOR: &str = "#333333";

/// Colour of each category, shared by the chart and the report legend.
pub fn category_color(category: Category) -> [u8; 3] {
    match category {
        Category::Visual => [0x76, 0xc7, 0xc0],
        Category::Auditory => [0xff, 0xa0, 0x7a],
        Category::ReadingWriting => [0xd8, 0xbf, 0xd8],
        Category::Kinesthetic => [0xfd, 0xd8, 0x35],
    }
}

const EMPTY_RING_COLOR: [u8; 3] = [0xdd, 0xdd, 0xdd];

#[derive(PartialEq, Debug, Clone)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    /// Width of the ring, as a fraction of the outer radius.
    pub ring_fraction: f32,
    /// Space around the ring for the labels, in pixels.
    pub margin: f32,
    pub font_size: f32,
    /// Distance between the ring and the category labels.
    pub label_offset: f32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        ChartStyle {
            width: 640,
            height: 480,
            ring_fraction: 0.4,
            margin: 60.0,
            font_size: 16.0,
            label_offset: 12.0,
        }
    }
}

/// A text drawn on the chart. `y` is the baseline.
#[derive(PartialEq, Debug, Clone)]
pub struct ChartLabel {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// The SVG text anchor: start, middle or end.
    pub anchor: &'static str,
}

struct Geometry {
    cx: f32,
    cy: f32,
    outer: f32,
    inner: f32,
}

fn geometry(style: &ChartStyle) -> Geometry {
    let cx = style.width as f32 / 2.0;
    let cy = style.height as f32 / 2.0;
    let outer = (cx.min(cy) - style.margin).max(1.0);
    let inner = outer * (1.0 - style.ring_fraction.clamp(0.0, 1.0));
    Geometry {
        cx,
        cy,
        outer,
        inner,
    }
}

// (category, percentage, start angle, sweep), for the categories with a selection.
fn slices(tally: &ScoreTally) -> Vec<(Category, f64, f32, f32)> {
    let mut res = Vec::new();
    let mut start = 90.0f32;
    for (category, pct) in tally.proportions() {
        if pct <= 0.0 {
            continue;
        }
        let sweep = (pct * 3.6) as f32;
        res.push((category, pct, start, sweep));
        start += sweep;
    }
    res
}

/// Places the category label outside of each slice and its percentage on
/// the ring.
pub fn label_layout(tally: &ScoreTally, style: &ChartStyle) -> Vec<ChartLabel> {
    let g = geometry(style);
    // Moves the baseline so that the text is vertically centered on the point.
    let center_shift = style.font_size * 0.35;
    let mut labels = Vec::new();
    for (category, pct, start, sweep) in slices(tally) {
        let mid = (start + sweep / 2.0) * PI / 180.0;
        let (cos, sin) = (mid.cos(), mid.sin());

        let r = g.outer + style.label_offset;
        let anchor = if cos > 0.1 {
            "start"
        } else if cos < -0.1 {
            "end"
        } else {
            "middle"
        };
        labels.push(ChartLabel {
            text: category.label().to_string(),
            x: g.cx + r * cos,
            y: g.cy - r * sin + center_shift,
            anchor,
        });

        let r = (g.outer + g.inner) / 2.0;
        labels.push(ChartLabel {
            text: format!("{:.1}%", pct),
            x: g.cx + r * cos,
            y: g.cy - r * sin + center_shift,
            anchor: "middle",
        });
    }
    labels
}

fn labels_svg(labels: &[ChartLabel], style: &ChartStyle) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = style.width,
        h = style.height
    );
    for l in labels.iter() {
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-family="{}" font-size="{}" fill="{}" text-anchor="{}">{}</text>"#,
            l.x, l.y, LABEL_FONT_FAMILY, style.font_size, LABEL_COLOR, l.anchor, l.text
        );
    }
    svg.push_str("</svg>\n");
    svg
}

fn draw_labels(pixmap: &mut Pixmap, labels: &[ChartLabel], style: &ChartStyle) -> VarkResult<()> {
    if labels.is_empty() {
        return Ok(());
    }
    let svg = labels_svg(labels, style);
    debug!("draw_labels: {}", svg);
    let mut options = usvg::Options::default();
    options.font_family = LABEL_FONT_FAMILY.to_string();
    options.fontdb_mut().load_font_data(LABEL_FONT.to_vec());
    let tree = usvg::Tree::from_data(svg.as_bytes(), &options).context(ChartLabelsSnafu {})?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
    Ok(())
}

// Angles in degrees, counter-clockwise from the positive x axis.
fn ring_segment(
    cx: f32,
    cy: f32,
    outer: f32,
    inner: f32,
    start_deg: f32,
    sweep_deg: f32,
) -> Option<tiny_skia::Path> {
    let steps = (sweep_deg.abs().ceil() as usize).max(1);
    let point = |r: f32, deg: f32| {
        let rad = deg * PI / 180.0;
        // The y axis of the image points down.
        (cx + r * rad.cos(), cy - r * rad.sin())
    };
    let mut pb = PathBuilder::new();
    let (x0, y0) = point(outer, start_deg);
    pb.move_to(x0, y0);
    for i in 1..=steps {
        let (x, y) = point(outer, start_deg + sweep_deg * (i as f32) / (steps as f32));
        pb.line_to(x, y);
    }
    for i in (0..=steps).rev() {
        let (x, y) = point(inner, start_deg + sweep_deg * (i as f32) / (steps as f32));
        pb.line_to(x, y);
    }
    pb.close();
    pb.finish()
}

fn fill(pixmap: &mut Pixmap, path: &tiny_skia::Path, rgb: [u8; 3]) {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], 255);
    paint.anti_alias = true;
    pixmap.fill_path(path, &paint, FillRule::Winding, Transform::identity(), None);
}

/// Draws the donut chart of the tally and encodes it as a PNG image.
///
/// The first category starts at the top and the slices follow the canonical
/// order counter-clockwise. Each slice carries its label and its percentage.
/// Categories with no selection are not drawn; an empty tally gives a grey
/// ring without labels.
pub fn render_chart(tally: &ScoreTally, style: &ChartStyle) -> VarkResult<Vec<u8>> {
    let mut pixmap = Pixmap::new(style.width, style.height).context(ChartCanvasSnafu {
        width: style.width,
        height: style.height,
    })?;
    pixmap.fill(Color::WHITE);

    let g = geometry(style);
    if tally.total() == 0 {
        if let Some(path) = ring_segment(g.cx, g.cy, g.outer, g.inner, 90.0, 360.0) {
            fill(&mut pixmap, &path, EMPTY_RING_COLOR);
        }
    } else {
        for (category, _, start, sweep) in slices(tally) {
            debug!(
                "render_chart: {:?} start: {} sweep: {}",
                category, start, sweep
            );
            if let Some(path) = ring_segment(g.cx, g.cy, g.outer, g.inner, start, sweep) {
                fill(&mut pixmap, &path, category_color(category));
            }
        }
    }
    draw_labels(&mut pixmap, &label_layout(tally, style), style)?;

    encode_png(&pixmap)
}

// The pixmap is opaque: the premultiplied values are the plain RGB values.
fn encode_png(pixmap: &Pixmap) -> VarkResult<Vec<u8>> {
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, pixmap.width(), pixmap.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().context(ChartEncodingSnafu {})?;
        writer
            .write_image_data(&rgb)
            .context(ChartEncodingSnafu {})?;
    }
    Ok(buf)
}
