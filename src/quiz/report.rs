// The one-page PDF report.
//
// The document is written directly: one page, the standard Helvetica font
// and the chart as the only image. Nothing in the output depends on the
// time or on the machine.

use std::fmt::Write as FmtWrite;

use crate::quiz::chart::category_color;
use crate::quiz::*;

pub const REPORT_MIME_TYPE: &str = "application/pdf";

const DEFAULT_FILE_NAME: &str = "hasil_vark.pdf";
const FILE_NAME_PREFIX: &str = "hasil_vark_";

// All the positions below are in millimeters from the top left corner.
const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_MM: f64 = 10.0;
const LINE_HEIGHT_MM: f64 = 10.0;
const CELL_PADDING_MM: f64 = 1.0;
const SWATCH_MM: f64 = 4.0;
const PT_PER_MM: f64 = 72.0 / 25.4;

#[derive(PartialEq, Debug, Clone)]
pub struct ReportLayout {
    /// The title of the page. The name of the participant is appended.
    pub title: String,
    /// In points.
    pub font_size: f64,
    pub image_x_mm: f64,
    pub image_width_mm: f64,
}

impl Default for ReportLayout {
    fn default() -> Self {
        ReportLayout {
            title: "Hasil Kuisioner VARK".to_string(),
            font_size: 12.0,
            image_x_mm: 30.0,
            image_width_mm: 150.0,
        }
    }
}

/// The name of the report file for a participant.
///
/// Only ASCII letters, digits, `-` and `_` are kept from the name, and
/// whitespace becomes `_`.
pub fn report_file_name(name: &str, embed_name: bool) -> String {
    if !embed_name {
        return DEFAULT_FILE_NAME.to_string();
    }
    let cleaned: String = name
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();
    if cleaned.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        format!("{}{}.pdf", FILE_NAME_PREFIX, cleaned)
    }
}

// Widths of the printable ASCII characters in the standard Helvetica font,
// in thousandths of the font size.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' to '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0' to '9'
    278, 278, 584, 584, 584, 556, 1015, // ':' to '@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A' to 'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N' to 'Z'
    278, 278, 278, 469, 556, 333, // '[' to '`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a' to 'm'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n' to 'z'
    334, 260, 334, 584, // '{' to '~'
];

fn char_width(b: u8) -> u16 {
    match b {
        32..=126 => HELVETICA_WIDTHS[(b - 32) as usize],
        _ => 556,
    }
}

// Text is written with the WinAnsi encoding, which matches Latin-1 for the
// printable characters.
fn encode_text(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match c as u32 {
            x @ 0x20..=0x7e | x @ 0xa0..=0xff => x as u8,
            _ => b'?',
        })
        .collect()
}

fn text_width_mm(text: &[u8], font_size: f64) -> f64 {
    let units: u64 = text.iter().map(|b| char_width(*b) as u64).sum();
    (units as f64) * font_size / 1000.0 / PT_PER_MM
}

fn literal(text: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(text.len() + 2);
    res.push(b'(');
    for b in text.iter() {
        if matches!(b, b'\\' | b'(' | b')') {
            res.push(b'\\');
        }
        res.push(*b);
    }
    res.push(b')');
    res
}

fn num(x: f64) -> String {
    format!("{:.2}", x)
}

// The chart, in the form it is stored in the document.
struct PdfImage {
    width: u32,
    height: u32,
    color_space: &'static str,
    /// The Flate filter parameters, when the data is still compressed.
    decode_parms: Option<String>,
    data: Vec<u8>,
}

fn png_chunks_idat(png_data: &[u8]) -> Option<Vec<u8>> {
    let mut res: Vec<u8> = Vec::new();
    let mut pos = 8;
    while pos + 8 <= png_data.len() {
        let len_bytes: [u8; 4] = png_data[pos..pos + 4].try_into().ok()?;
        let len = u32::from_be_bytes(len_bytes) as usize;
        let chunk_type = &png_data[pos + 4..pos + 8];
        let data = png_data.get(pos + 8..pos + 8 + len)?;
        match chunk_type {
            b"IDAT" => res.extend_from_slice(data),
            b"IEND" => break,
            _ => {}
        }
        pos += 12 + len;
    }
    if res.is_empty() {
        None
    } else {
        Some(res)
    }
}

/// Decodes the chart. Plain 8-bit RGB or gray images keep their compressed
/// data; the other images are converted to RGB, over a white background.
fn prepare_image(chart_png: &[u8]) -> VarkResult<PdfImage> {
    let mut decoder = png::Decoder::new(chart_png);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info().context(ChartDecodingSnafu {})?;
    let (source_color, source_depth, interlaced) = {
        let info = reader.info();
        (info.color_type, info.bit_depth, info.interlaced)
    };
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf).context(ChartDecodingSnafu {})?;
    buf.truncate(frame.buffer_size());
    debug!(
        "prepare_image: {}x{} {:?} {:?} interlaced: {}",
        frame.width, frame.height, source_color, source_depth, interlaced
    );

    let passthrough = match (source_color, source_depth, interlaced) {
        (png::ColorType::Rgb, png::BitDepth::Eight, false) => Some(("/DeviceRGB", 3)),
        (png::ColorType::Grayscale, png::BitDepth::Eight, false) => Some(("/DeviceGray", 1)),
        _ => None,
    };
    if let Some((color_space, colors)) = passthrough {
        let data = png_chunks_idat(chart_png).context(ChartUnsupportedSnafu {
            message: "no image data",
        })?;
        return Ok(PdfImage {
            width: frame.width,
            height: frame.height,
            color_space,
            decode_parms: Some(format!(
                "<< /Predictor 15 /Colors {} /BitsPerComponent 8 /Columns {} >>",
                colors, frame.width
            )),
            data,
        });
    }

    if frame.bit_depth != png::BitDepth::Eight {
        return ChartUnsupportedSnafu {
            message: format!("bit depth {:?}", frame.bit_depth),
        }
        .fail();
    }
    let over_white = |c: u8, a: u8| -> u8 {
        ((c as u32 * a as u32 + 255 * (255 - a as u32) + 127) / 255) as u8
    };
    let data: Vec<u8> = match frame.color_type {
        png::ColorType::Rgb => buf,
        png::ColorType::Rgba => buf
            .chunks_exact(4)
            .flat_map(|px| {
                [
                    over_white(px[0], px[3]),
                    over_white(px[1], px[3]),
                    over_white(px[2], px[3]),
                ]
            })
            .collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|g| [*g, *g, *g]).collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|px| {
                let g = over_white(px[0], px[1]);
                [g, g, g]
            })
            .collect(),
        x => {
            return ChartUnsupportedSnafu {
                message: format!("color type {:?}", x),
            }
            .fail()
        }
    };
    Ok(PdfImage {
        width: frame.width,
        height: frame.height,
        color_space: "/DeviceRGB",
        decode_parms: None,
        data,
    })
}

// Writes the numbered objects and keeps their offsets for the cross-reference table.
struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> PdfWriter {
        let mut buf: Vec<u8> = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");
        PdfWriter {
            buf,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, dict: &str) {
        self.offsets.push(self.buf.len());
        let header = format!("{} 0 obj\n{}\nendobj\n", self.offsets.len(), dict);
        self.buf.extend_from_slice(header.as_bytes());
    }

    fn stream_object(&mut self, dict_entries: &str, data: &[u8]) {
        self.offsets.push(self.buf.len());
        let header = format!(
            "{} 0 obj\n<< {} /Length {} >>\nstream\n",
            self.offsets.len(),
            dict_entries,
            data.len()
        );
        self.buf.extend_from_slice(header.as_bytes());
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for off in self.offsets.iter() {
            let _ = write!(xref, "{:010} 00000 n \n", off);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            self.offsets.len() + 1,
            xref_offset
        );
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}

fn mm_x(x: f64) -> String {
    num(x * PT_PER_MM)
}

// The y axis of the page points up.
fn mm_y(y: f64) -> String {
    num((PAGE_HEIGHT_MM - y) * PT_PER_MM)
}

fn text_op(content: &mut Vec<u8>, font_size: f64, x_mm: f64, baseline_mm: f64, text: &[u8]) {
    let start = format!(
        "BT /F1 {} Tf {} {} Td ",
        num(font_size),
        mm_x(x_mm),
        mm_y(baseline_mm)
    );
    content.extend_from_slice(start.as_bytes());
    content.extend_from_slice(&literal(text));
    content.extend_from_slice(b" Tj ET\n");
}

/// Builds the report of a participant.
///
/// The report can be built again from the same tally: the function has no
/// side effect and the same inputs always give the same bytes.
pub fn build_report(
    name: &str,
    tally: &ScoreTally,
    chart_png: &[u8],
    layout: &ReportLayout,
) -> VarkResult<Vec<u8>> {
    let name = name.trim();
    ensure!(!name.is_empty(), ReportEmptyNameSnafu {});
    let image = prepare_image(chart_png)?;
    info!(
        "build_report: {:?}: chart {}x{}",
        name, image.width, image.height
    );

    let font_size = layout.font_size;
    let font_size_mm = font_size / PT_PER_MM;
    let baseline = |cell_y: f64| cell_y + LINE_HEIGHT_MM / 2.0 + 0.3 * font_size_mm;
    let mut content: Vec<u8> = Vec::new();
    content.extend_from_slice(b"0 g\n");

    // Title, centered on the page.
    let mut y = MARGIN_MM;
    let title = encode_text(&format!("{} - {}", layout.title, name));
    let cell_width = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
    let title_x = MARGIN_MM + (cell_width - text_width_mm(&title, font_size)) / 2.0;
    text_op(&mut content, font_size, title_x, baseline(y), &title);
    y += 2.0 * LINE_HEIGHT_MM;

    for (category, count) in tally.iter() {
        let [r, g, b] = category_color(category);
        let swatch = format!(
            "{} {} {} rg {} {} {} {} re f 0 g\n",
            num(r as f64 / 255.0),
            num(g as f64 / 255.0),
            num(b as f64 / 255.0),
            mm_x(MARGIN_MM + CELL_PADDING_MM),
            mm_y(y + (LINE_HEIGHT_MM + SWATCH_MM) / 2.0),
            num(SWATCH_MM * PT_PER_MM),
            num(SWATCH_MM * PT_PER_MM)
        );
        content.extend_from_slice(swatch.as_bytes());
        let line = encode_text(&format!("{}: {}", category.label(), count));
        let text_x = MARGIN_MM + 2.0 * CELL_PADDING_MM + SWATCH_MM + 1.0;
        text_op(&mut content, font_size, text_x, baseline(y), &line);
        y += LINE_HEIGHT_MM;
    }

    let image_height_mm = layout.image_width_mm * (image.height as f64) / (image.width as f64);
    let image_op = format!(
        "q {} 0 0 {} {} {} cm /I1 Do Q\n",
        num(layout.image_width_mm * PT_PER_MM),
        num(image_height_mm * PT_PER_MM),
        mm_x(layout.image_x_mm),
        mm_y(y + image_height_mm)
    );
    content.extend_from_slice(image_op.as_bytes());

    let mut pdf = PdfWriter::new();
    pdf.object("<< /Type /Catalog /Pages 2 0 R >>");
    pdf.object("<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    pdf.object(&format!(
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
         /Resources << /Font << /F1 4 0 R >> /XObject << /I1 6 0 R >> >> /Contents 5 0 R >>",
        mm_x(PAGE_WIDTH_MM),
        num(PAGE_HEIGHT_MM * PT_PER_MM)
    ));
    pdf.object(
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );
    pdf.stream_object("", &content);
    let mut image_dict = format!(
        "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent 8",
        image.width, image.height, image.color_space
    );
    if let Some(parms) = &image.decode_parms {
        let _ = write!(image_dict, " /Filter /FlateDecode /DecodeParms {}", parms);
    }
    pdf.stream_object(&image_dict, &image.data);
    Ok(pdf.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::chart::{render_chart, ChartStyle};

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn tally() -> ScoreTally {
        ScoreTally::EMPTY
            .with_count(Category::Visual, 2)
            .with_count(Category::Auditory, 1)
            .with_count(Category::Kinesthetic, 1)
    }

    fn chart() -> Vec<u8> {
        render_chart(&tally(), &ChartStyle::default()).unwrap()
    }

    #[test]
    fn document_structure() {
        let pdf = build_report("Budi", &tally(), &chart(), &ReportLayout::default()).unwrap();
        assert!(pdf.starts_with(b"%PDF-"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert!(contains(&pdf, b"(Hasil Kuisioner VARK - Budi) Tj"));
        assert!(contains(&pdf, b"(Visual: 2) Tj"));
        assert!(contains(&pdf, b"(Auditory: 1) Tj"));
        assert!(contains(&pdf, b"(Reading/Writing: 0) Tj"));
        assert!(contains(&pdf, b"(Kinesthetic: 1) Tj"));
        assert_eq!(count(&pdf, b"/Subtype /Image"), 1);
        assert!(contains(&pdf, b"/Width 640 /Height 480"));
        assert!(contains(&pdf, b"/Predictor 15"));
    }

    #[test]
    fn deterministic() {
        let layout = ReportLayout::default();
        let png_data = chart();
        let a = build_report("Sari", &tally(), &png_data, &layout).unwrap();
        let b = build_report("Sari", &tally(), &png_data, &layout).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn special_characters() {
        let pdf = build_report(
            "Budi (2) \\ 王",
            &tally(),
            &chart(),
            &ReportLayout::default(),
        )
        .unwrap();
        assert!(contains(&pdf, b"(Hasil Kuisioner VARK - Budi \\(2\\) \\\\ ?) Tj"));
        let pdf = build_report("Andr\u{e9}", &tally(), &chart(), &ReportLayout::default())
            .unwrap();
        assert!(contains(&pdf, b"- Andr\xe9) Tj"));
    }

    #[test]
    fn rgba_chart_is_converted() {
        let mut png_data: Vec<u8> = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut png_data, 2, 1);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header().unwrap();
            writer
                .write_image_data(&[255, 0, 0, 255, 0, 0, 0, 0])
                .unwrap();
        }
        let image = prepare_image(&png_data).unwrap();
        assert_eq!(image.decode_parms, None);
        assert_eq!(image.data, vec![255, 0, 0, 255, 255, 255]);
    }

    #[test]
    fn errors() {
        let layout = ReportLayout::default();
        let err = build_report("  ", &tally(), &chart(), &layout).unwrap_err();
        assert!(matches!(err, VarkError::ReportEmptyName {}));
        assert_eq!(err.kind(), ErrorKind::Render);
        let err = build_report("Budi", &tally(), b"not a png", &layout).unwrap_err();
        assert!(matches!(err, VarkError::ChartDecoding { .. }));
        assert_eq!(err.kind(), ErrorKind::Render);
    }

    #[test]
    fn title_is_centered() {
        let title = encode_text("Hasil Kuisioner VARK - Budi");
        let width = text_width_mm(&title, 12.0);
        assert!(width > 50.0 && width < 70.0);
        let spaces = text_width_mm(b"  ", 10.0) * PT_PER_MM;
        assert!((spaces - 5.56).abs() < 1e-9);
    }

    #[test]
    fn file_names() {
        assert_eq!(report_file_name("Budi Santoso", true), "hasil_vark_Budi_Santoso.pdf");
        assert_eq!(report_file_name(" Sari ", true), "hasil_vark_Sari.pdf");
        assert_eq!(report_file_name("a/b:c-d_e", true), "hasil_vark_abc-d_e.pdf");
        assert_eq!(report_file_name("王", true), "hasil_vark.pdf");
        assert_eq!(report_file_name("", true), "hasil_vark.pdf");
        assert_eq!(report_file_name("Budi", false), "hasil_vark.pdf");
    }
}
