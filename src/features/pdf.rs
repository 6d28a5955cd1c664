use crate::features::costs::{price_key, qty_key, total_key, MATERIAL_ROWS};
use crate::features::form::{
    material_key, FieldSpec, FormFields, CLOSING_FIELDS, COST_FIELDS, JOB_FIELDS, JOB_NAME,
};
use crate::features::photos::Photo;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

pub const PAGE_WIDTH: f64 = 612.0;
pub const PAGE_HEIGHT: f64 = 792.0;
pub const MARGIN: f64 = 18.0;

const TITLE: &str = "ASR Work Order";
const BODY_SIZE: f64 = 9.5;
const LEADING: f64 = 13.0;
const HEADING_SIZE: f64 = 11.0;
const NOTES_MAX_LINES: usize = 6;
const NOTES_WRAP: usize = 110;
const SIGNATURE_BOX: (f64, f64) = (200.0, 60.0);
const PHOTO_GAP: f64 = 6.0;
const MAX_PHOTO_COLUMNS: usize = 4;

/// WinAnsiEncoding byte for `ch`, if the standard fonts can draw it.
fn win_ansi_byte(ch: char) -> Option<u8> {
    let byte = match ch {
        ' '..='~' => ch as u8,
        '\u{a0}'..='\u{ff}' => ch as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '•' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    };
    Some(byte)
}

/// PDF literal string body in WinAnsiEncoding. Bytes above ASCII are
/// written as octal escapes; unmappable chars become `?`.
fn pdf_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\t' => out.push(' '),
            _ => match win_ansi_byte(ch) {
                Some(b) if b.is_ascii() => out.push(b as char),
                Some(b) => out.push_str(&format!("\\{b:03o}")),
                None => out.push('?'),
            },
        }
    }
    out
}

fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Accumulates the page content stream top-down.
struct PageWriter {
    ops: String,
    y: f64,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            ops: String::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn text_at(&mut self, x: f64, y: f64, size: f64, font: &str, text: &str) {
        self.ops.push_str(&format!(
            "BT /{font} {size} Tf {x:.2} {y:.2} Td ({}) Tj ET\n",
            pdf_text(text)
        ));
    }

    fn line(&mut self, size: f64, font: &str, text: &str) {
        self.y -= size.max(LEADING);
        let y = self.y;
        self.text_at(MARGIN, y, size, font, text);
    }

    fn heading(&mut self, text: &str) {
        self.y -= 6.0;
        self.line(HEADING_SIZE, "F2", text);
        let y = self.y - 3.0;
        self.ops.push_str(&format!(
            "0.5 w {MARGIN:.2} {y:.2} m {:.2} {y:.2} l S\n",
            PAGE_WIDTH - MARGIN
        ));
    }

    fn field(&mut self, spec: &FieldSpec, value: &str) {
        self.line(BODY_SIZE, "F1", &format!("{}: {}", spec.label, value));
    }

    /// Two labelled fields per row.
    fn field_pairs(&mut self, specs: &[FieldSpec], fields: &FormFields) {
        for pair in specs.chunks(2) {
            self.y -= LEADING;
            let y = self.y;
            for (i, spec) in pair.iter().enumerate() {
                let x = MARGIN + i as f64 * (PAGE_WIDTH - 2.0 * MARGIN) / 2.0;
                let text = format!("{}: {}", spec.label, fields.get(spec.key));
                self.text_at(x, y, BODY_SIZE, "F1", &text);
            }
        }
    }

    fn image(&mut self, name: &str, x: f64, y: f64, w: f64, h: f64) {
        self.ops
            .push_str(&format!("q {w:.2} 0 0 {h:.2} {x:.2} {y:.2} cm /{name} Do Q\n"));
    }

    fn remaining(&self) -> f64 {
        self.y - MARGIN
    }
}

/// Scale `(w, h)` to fit inside `(max_w, max_h)` without distortion.
fn fit_box(w: f64, h: f64, max_w: f64, max_h: f64) -> (f64, f64) {
    if w <= 0.0 || h <= 0.0 || max_w <= 0.0 || max_h <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_w / w).min(max_h / h);
    (w * scale, h * scale)
}

fn add_signature_image(doc: &mut Document, png: &[u8]) -> Result<(ObjectId, u32, u32), String> {
    let img = image::load_from_memory(png)
        .map_err(|e| format!("signature_image_invalid:{e}"))?
        .to_rgba8();
    let (img_w, img_h) = img.dimensions();
    let mut rgb = Vec::with_capacity((img_w * img_h * 3) as usize);
    let mut alpha = Vec::with_capacity((img_w * img_h) as usize);
    for pixel in img.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
    }

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    ));
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => img_w as i64,
            "Height" => img_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => smask_id,
        },
        rgb,
    ));
    Ok((image_id, img_w, img_h))
}

fn add_photo_image(doc: &mut Document, photo: &Photo) -> ObjectId {
    let mut stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => photo.width as i64,
            "Height" => photo.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        photo.jpeg.clone(),
    );
    stream.allows_compression = false;
    doc.add_object(stream)
}

/// Render the whole form onto one letter page and return the PDF bytes.
pub fn render_work_order_pdf(
    fields: &FormFields,
    signature_png: Option<&[u8]>,
    photos: &[Photo],
) -> Result<Vec<u8>, String> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut xobjects = Dictionary::new();
    let mut page = PageWriter::new();

    page.line(16.0, "F2", TITLE);

    page.heading("Job Information");
    for spec in JOB_FIELDS.iter() {
        page.field(spec, fields.get(spec.key));
    }

    page.heading("Materials");
    let columns = [MARGIN, 330.0, 400.0, 490.0];
    page.y -= LEADING;
    let header_y = page.y;
    for (x, label) in columns.iter().zip(["Material", "Qty", "Unit Price", "Total"]) {
        page.text_at(*x, header_y, BODY_SIZE, "F2", label);
    }
    for row in 1..=MATERIAL_ROWS {
        page.y -= LEADING;
        let y = page.y;
        let cells = [
            fields.get(&material_key(row)).to_string(),
            fields.get(&qty_key(row)).to_string(),
            fields.get(&price_key(row)).to_string(),
            fields.get(&total_key(row)).to_string(),
        ];
        for (x, cell) in columns.iter().zip(cells.iter()) {
            page.text_at(*x, y, BODY_SIZE, "F1", cell);
        }
    }

    page.heading("Costs");
    page.field_pairs(&COST_FIELDS, fields);

    let notes_spec = &CLOSING_FIELDS[0];
    let notes: Vec<String> = fields
        .get(notes_spec.key)
        .lines()
        .flat_map(|l| wrap_line(l, NOTES_WRAP))
        .take(NOTES_MAX_LINES)
        .collect();
    if !notes.is_empty() {
        page.heading(notes_spec.label);
        for line in &notes {
            page.line(BODY_SIZE, "F1", line);
        }
    }

    page.heading("Authorization");
    let (box_w, box_h) = SIGNATURE_BOX;
    let box_top = page.y - 4.0;
    let box_bottom = box_top - box_h;
    if let Some(png) = signature_png {
        let (image_id, img_w, img_h) = add_signature_image(&mut doc, png)?;
        xobjects.set("ImSig", image_id);
        let (w, h) = fit_box(img_w as f64, img_h as f64, box_w, box_h);
        page.image("ImSig", MARGIN, box_bottom + (box_h - h) / 2.0, w, h);
    }
    page.ops.push_str(&format!(
        "0.5 w {MARGIN:.2} {box_bottom:.2} m {:.2} {box_bottom:.2} l S\n",
        MARGIN + box_w
    ));
    let side_x = MARGIN + box_w + 30.0;
    for (i, spec) in CLOSING_FIELDS[1..].iter().enumerate() {
        let y = box_top - 20.0 - i as f64 * LEADING;
        let text = format!("{}: {}", spec.label, fields.get(spec.key));
        page.text_at(side_x, y, BODY_SIZE, "F1", &text);
    }
    page.y = box_bottom - 4.0;

    if !photos.is_empty() {
        page.heading(&format!("Photos ({})", photos.len()));
        let cols = photos.len().min(MAX_PHOTO_COLUMNS);
        let rows = photos.len().div_ceil(cols);
        let content_w = PAGE_WIDTH - 2.0 * MARGIN;
        let cell_w = content_w / cols as f64;
        let room = (page.remaining() - PHOTO_GAP).max(0.0);
        let cell_h = (room / rows as f64).min(cell_w * 0.75 + PHOTO_GAP);
        let top = page.y - PHOTO_GAP;
        for (i, photo) in photos.iter().enumerate() {
            let (col, row) = (i % cols, i / cols);
            let (w, h) = fit_box(
                photo.width as f64,
                photo.height as f64,
                cell_w - PHOTO_GAP,
                cell_h - PHOTO_GAP,
            );
            if w <= 0.0 || h <= 0.0 {
                continue;
            }
            let name = format!("Ph{i}");
            let id = add_photo_image(&mut doc, photo);
            xobjects.set(name.clone(), id);
            let x = MARGIN + col as f64 * cell_w;
            let y = top - (row as f64 + 1.0) * cell_h + PHOTO_GAP;
            page.image(&name, x, y, w, h);
        }
        page.y = top - rows as f64 * cell_h;
    }

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
        "XObject" => xobjects,
    });
    let content_id = doc.add_object(Stream::new(dictionary! {}, page.ops.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH as i64),
            Object::Integer(PAGE_HEIGHT as i64),
        ],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let job = fields.get(JOB_NAME);
    let title = if job.is_empty() {
        TITLE.to_string()
    } else {
        format!("{TITLE} - {job}")
    };
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(pdf_text(&title).into_bytes(), StringFormat::Literal),
        "Producer" => Object::String(b"workorder_core".to_vec(), StringFormat::Literal),
    });
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| format!("pdf_save_failed:{e}"))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::photos::compress_image;
    use crate::features::signature::{Contact, SignaturePad, SurfaceSize};
    use image::{DynamicImage, ImageOutputFormat, RgbImage};
    use std::io::Cursor;

    fn sample_fields() -> FormFields {
        let mut fields = FormFields::new();
        fields.set_field("jobName", "Smith (Roof)");
        fields.set_field("material1", "Shingles");
        fields.set_field("qty1", "12");
        fields.set_field("price1", "35");
        fields.set_field("labor", "800");
        fields.set_field("contractPrice", "2400");
        fields.set_field("notes", "Remove old flashing.\nCheck vents.");
        fields
    }

    fn signed_png() -> Vec<u8> {
        let mut pad = SignaturePad::new();
        pad.initialize(SurfaceSize::new(200.0, 60.0, 2.0)).unwrap();
        let c = |x: f64, y: f64| Contact {
            id: 1,
            x,
            y,
            pressure: None,
        };
        pad.on_stroke_start(c(10.0, 30.0));
        pad.on_stroke_move(c(60.0, 10.0));
        pad.on_stroke_move(c(120.0, 50.0));
        pad.on_stroke_end(Some(1));
        pad.signature_png().unwrap().unwrap()
    }

    fn photo(w: u32, h: u32) -> Photo {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(w, h))
            .write_to(&mut out, ImageOutputFormat::Png)
            .unwrap();
        compress_image(&out.into_inner()).unwrap()
    }

    fn page_content(bytes: &[u8]) -> (Document, String) {
        let doc = Document::load_mem(bytes).expect("pdf parses");
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.get(&1).unwrap();
        let content = doc.get_page_content(page_id).expect("content");
        (doc, String::from_utf8_lossy(&content).into_owned())
    }

    #[test]
    fn renders_single_letter_page_with_plain_values() {
        let bytes = render_work_order_pdf(&sample_fields(), None, &[]).expect("render");
        let (doc, content) = page_content(&bytes);

        let page_id = *doc.get_pages().get(&1).unwrap();
        let page = doc.get_object(page_id).and_then(|o| o.as_dict()).unwrap();
        let media_box = page.get(b"MediaBox").and_then(|o| o.as_array()).unwrap();
        assert_eq!(media_box.len(), 4);

        assert!(content.contains("(Job Name: Smith \\(Roof\\))"));
        assert!(content.contains("(Shingles)"));
        assert!(content.contains("($420.00)"));
        assert!(content.contains("(Total Cost: $1220.00)"));
        assert!(content.contains("(Gross Profit %: 49.2%)"));
        assert!(content.contains("(Check vents.)"));
        assert!(!content.contains("Clear Signature"));
    }

    #[test]
    fn embeds_signature_with_soft_mask() {
        let png = signed_png();
        let bytes = render_work_order_pdf(&sample_fields(), Some(&png), &[]).expect("render");
        let (doc, content) = page_content(&bytes);
        assert!(content.contains("/ImSig Do"));
        let has_smask = doc.objects.values().any(|obj| {
            obj.as_stream()
                .map(|s| s.dict.get(b"SMask").is_ok())
                .unwrap_or(false)
        });
        assert!(has_smask);
    }

    #[test]
    fn photos_fit_inside_page_margins() {
        let photos: Vec<Photo> = (0..9).map(|_| photo(400, 300)).collect();
        let bytes = render_work_order_pdf(&sample_fields(), None, &photos).expect("render");
        let (_, content) = page_content(&bytes);
        let mut drawn = 0;
        for line in content.lines().filter(|l| l.contains("/Ph") && l.ends_with("Do Q")) {
            let nums: Vec<f64> = line
                .split_whitespace()
                .filter_map(|t| t.parse::<f64>().ok())
                .collect();
            let (w, h, x, y) = (nums[0], nums[3], nums[4], nums[5]);
            assert!(x >= MARGIN - 0.01 && x + w <= PAGE_WIDTH - MARGIN + 0.01, "{line}");
            assert!(y >= MARGIN - 0.01 && y + h <= PAGE_HEIGHT - MARGIN + 0.01, "{line}");
            drawn += 1;
        }
        assert_eq!(drawn, 9);
    }

    fn shown_strings(content: &[u8]) -> Vec<Vec<u8>> {
        lopdf::content::Content::decode(content)
            .expect("content decodes")
            .operations
            .into_iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.into_iter().next() {
                Some(Object::String(bytes, _)) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn accented_text_is_written_in_win_ansi() {
        let mut fields = sample_fields();
        fields.set_field("jobName", "José Núñez");
        fields.set_field("notes", "Façade – 12 m²");
        let bytes = render_work_order_pdf(&fields, None, &[]).expect("render");
        let doc = Document::load_mem(&bytes).expect("pdf parses");
        let page_id = *doc.get_pages().get(&1).unwrap();
        let strings = shown_strings(&doc.get_page_content(page_id).unwrap());

        assert!(strings.contains(&b"Job Name: Jos\xe9 N\xfa\xf1ez".to_vec()));
        assert!(strings.contains(&b"Fa\xe7ade \x96 12 m\xb2".to_vec()));
    }

    #[test]
    fn text_escaping_and_wrapping() {
        assert_eq!(pdf_text("a(b)c\\"), "a\\(b\\)c\\\\");
        assert_eq!(pdf_text("café"), "caf\\351");
        assert_eq!(pdf_text("“ok” – 5€"), "\\223ok\\224 \\226 5\\200");
        assert_eq!(pdf_text("屋根"), "??");
        let wrapped = wrap_line("one two three four", 9);
        assert_eq!(wrapped, vec!["one two", "three", "four"]);
    }
}
