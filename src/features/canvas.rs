use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ColorType, ImageEncoder, ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

pub const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const DEFAULT_LINE_WIDTH: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    fn distance(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    fn scaled(self, scale: f64) -> Point {
        Point::new(self.x * scale, self.y * scale)
    }
}

/// Drawing operations replayed by a host canvas, in logical coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum InkOp {
    Configure { width: u32, height: u32, scale: f64 },
    Clear,
    Begin { x: f64, y: f64 },
    Quad { cx: f64, cy: f64, x: f64, y: f64, width: f64 },
    Line { x: f64, y: f64, width: f64 },
    Image { src: String, width: f64, height: f64 },
}

/// The drawing-context operations the signature state machine relies on.
pub trait InkSurface {
    /// Resize the backing store (device pixels); clears content.
    fn configure(&mut self, backing_width: u32, backing_height: u32, scale: f64);
    fn reset_transform(&mut self);
    fn set_scale(&mut self, scale: f64);
    fn clear(&mut self);
    fn set_line_width(&mut self, width: f64);
    fn begin_path(&mut self, at: Point);
    fn quadratic_curve_to(&mut self, control: Point, end: Point);
    fn line_to(&mut self, end: Point);
    fn stroke(&mut self);
    fn encode_png(&self) -> Result<Vec<u8>, String>;
    /// Draw an encoded image stretched over `logical_width` x `logical_height`.
    fn draw_png(&mut self, png: &[u8], logical_width: f64, logical_height: f64)
        -> Result<(), String>;
    fn is_blank(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct RasterCanvas {
    pixels: RgbaImage,
    scale: f64,
    line_width: f64,
    cursor: Option<Point>,
    // Flattened segments of the open path, in device pixels.
    path: Vec<(Point, Point, f64)>,
    journal: Vec<InkOp>,
}

impl Default for RasterCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterCanvas {
    pub fn new() -> Self {
        Self {
            pixels: RgbaImage::new(0, 0),
            scale: 1.0,
            line_width: DEFAULT_LINE_WIDTH,
            cursor: None,
            path: Vec::new(),
            journal: Vec::new(),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn line_width(&self) -> f64 {
        self.line_width
    }

    pub fn take_journal(&mut self) -> Vec<InkOp> {
        std::mem::take(&mut self.journal)
    }

    fn push_segment(&mut self, from: Point, to: Point) {
        let width = self.line_width * self.scale;
        self.path
            .push((from.scaled(self.scale), to.scaled(self.scale), width));
    }

    fn stamp_segment(&mut self, from: Point, to: Point, width: f64) {
        let radius = (width / 2.0).max(0.5);
        let spacing = (radius / 2.0).max(0.5);
        let steps = (from.distance(to) / spacing).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let p = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
            self.fill_disc(p, radius);
        }
    }

    fn fill_disc(&mut self, center: Point, radius: f64) {
        let (w, h) = self.pixels.dimensions();
        if w == 0 || h == 0 {
            return;
        }
        let min_x = (center.x - radius).floor().max(0.0) as i64;
        let max_x = (center.x + radius).ceil().min(w as f64 - 1.0) as i64;
        let min_y = (center.y - radius).floor().max(0.0) as i64;
        let max_y = (center.y + radius).ceil().min(h as f64 - 1.0) as i64;
        let r2 = radius * radius;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f64 + 0.5 - center.x;
                let dy = y as f64 + 0.5 - center.y;
                if dx * dx + dy * dy <= r2 {
                    self.pixels.put_pixel(x as u32, y as u32, INK);
                }
            }
        }
    }
}

impl InkSurface for RasterCanvas {
    fn configure(&mut self, backing_width: u32, backing_height: u32, scale: f64) {
        self.pixels = RgbaImage::new(backing_width, backing_height);
        self.scale = scale;
        self.line_width = DEFAULT_LINE_WIDTH;
        self.cursor = None;
        self.path.clear();
        self.journal.push(InkOp::Configure {
            width: backing_width,
            height: backing_height,
            scale,
        });
    }

    fn reset_transform(&mut self) {
        self.scale = 1.0;
    }

    fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    fn clear(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
        self.line_width = DEFAULT_LINE_WIDTH;
        self.cursor = None;
        self.path.clear();
        self.journal.push(InkOp::Clear);
    }

    fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
    }

    fn begin_path(&mut self, at: Point) {
        self.path.clear();
        self.cursor = Some(at);
        self.journal.push(InkOp::Begin { x: at.x, y: at.y });
    }

    fn quadratic_curve_to(&mut self, control: Point, end: Point) {
        let start = self.cursor.unwrap_or(control);
        let device_len =
            (start.distance(control) + control.distance(end)) * self.scale;
        let pieces = (device_len / 2.0).ceil().clamp(4.0, 32.0) as usize;
        let mut prev = start;
        for i in 1..=pieces {
            let t = i as f64 / pieces as f64;
            let u = 1.0 - t;
            let next = Point::new(
                u * u * start.x + 2.0 * u * t * control.x + t * t * end.x,
                u * u * start.y + 2.0 * u * t * control.y + t * t * end.y,
            );
            self.push_segment(prev, next);
            prev = next;
        }
        self.cursor = Some(end);
        self.journal.push(InkOp::Quad {
            cx: control.x,
            cy: control.y,
            x: end.x,
            y: end.y,
            width: self.line_width,
        });
    }

    fn line_to(&mut self, end: Point) {
        let start = self.cursor.unwrap_or(end);
        self.push_segment(start, end);
        self.cursor = Some(end);
        self.journal.push(InkOp::Line {
            x: end.x,
            y: end.y,
            width: self.line_width,
        });
    }

    fn stroke(&mut self) {
        let segments = self.path.clone();
        for (from, to, width) in segments {
            self.stamp_segment(from, to, width);
        }
    }

    fn encode_png(&self) -> Result<Vec<u8>, String> {
        let (w, h) = self.pixels.dimensions();
        if w == 0 || h == 0 {
            return Err("canvas_not_initialized".into());
        }
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(self.pixels.as_raw(), w, h, ColorType::Rgba8)
            .map_err(|e| format!("png_encode_failed:{e}"))?;
        Ok(out)
    }

    fn draw_png(
        &mut self,
        png: &[u8],
        logical_width: f64,
        logical_height: f64,
    ) -> Result<(), String> {
        let decoded = image::load_from_memory_with_format(png, ImageFormat::Png)
            .map_err(|e| format!("png_decode_failed:{e}"))?
            .to_rgba8();
        let target_w = (logical_width * self.scale).round() as u32;
        let target_h = (logical_height * self.scale).round() as u32;
        if target_w > 0 && target_h > 0 {
            let resized = if decoded.dimensions() == (target_w, target_h) {
                decoded
            } else {
                imageops::resize(&decoded, target_w, target_h, FilterType::Triangle)
            };
            imageops::overlay(&mut self.pixels, &resized, 0, 0);
        }
        self.journal.push(InkOp::Image {
            src: png_data_url(png),
            width: logical_width,
            height: logical_height,
        });
        Ok(())
    }

    fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] == 0)
    }
}

pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", B64.encode(png))
}
