use crate::features::canvas::{InkSurface, Point, RasterCanvas, DEFAULT_LINE_WIDTH};
use crate::features::debounce::{Debouncer, TimerRequest};
use serde::{Deserialize, Serialize};

pub const MIN_LINE_WIDTH: f64 = 1.0;
pub const MAX_LINE_WIDTH: f64 = 4.0;
pub const RESIZE_TIMER_KEY: &str = "signature_resize";
pub const RESIZE_DEBOUNCE_MS: u64 = 250;
pub const OVERLAY_TEXT: &str = "Sign here";
pub const MAX_BACKING_SIDE: u32 = 4096;

/// One pointer or touch contact reported by the host, in surface-local
/// logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub pressure: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    pub pressure: Option<f64>,
}

impl StrokePoint {
    fn point(self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl From<Contact> for StrokePoint {
    fn from(c: Contact) -> Self {
        Self {
            x: c.x,
            y: c.y,
            pressure: c.pressure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPhase {
    Idle,
    Drawing { contact_id: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawingState {
    pub phase: DrawPhase,
    pub last_point: Option<StrokePoint>,
    pub point_buffer: Vec<StrokePoint>,
    pub has_signature: bool,
}

impl DrawingState {
    pub const fn new() -> Self {
        Self {
            phase: DrawPhase::Idle,
            last_point: None,
            point_buffer: Vec::new(),
            has_signature: false,
        }
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.phase, DrawPhase::Drawing { .. })
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for DrawingState {
    fn default() -> Self {
        Self::new()
    }
}

/// Displayed size of the surface plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_ratio")]
    pub device_pixel_ratio: f64,
}

fn default_ratio() -> f64 {
    1.0
}

impl SurfaceSize {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio,
        }
    }

    pub fn ratio(&self) -> f64 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }

    /// Backing-store size in device pixels. Either side above
    /// [`MAX_BACKING_SIDE`] is refused.
    pub fn backing(&self) -> Result<(u32, u32), String> {
        let dim = |v: f64| {
            if v.is_finite() && v > 0.0 {
                (v * self.ratio()).round()
            } else {
                0.0
            }
        };
        let (w, h) = (dim(self.width), dim(self.height));
        if w > f64::from(MAX_BACKING_SIDE) || h > f64::from(MAX_BACKING_SIDE) {
            return Err(format!("surface_too_large:{w}x{h}"));
        }
        Ok((w as u32, h as u32))
    }
}

/// Line width for a contact, following stylus pressure when reported.
pub fn line_width_for(pressure: Option<f64>) -> f64 {
    match pressure {
        Some(p) if p.is_finite() && p > 0.0 => {
            (DEFAULT_LINE_WIDTH * 2.0 * p).clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH)
        }
        _ => DEFAULT_LINE_WIDTH,
    }
}

pub struct SignaturePad<S: InkSurface = RasterCanvas> {
    surface: S,
    drawing: DrawingState,
    size: Option<SurfaceSize>,
    overlay_visible: bool,
    resize: Debouncer<SurfaceSize>,
}

impl SignaturePad<RasterCanvas> {
    pub fn new() -> Self {
        Self::with_surface(RasterCanvas::new())
    }
}

impl Default for SignaturePad<RasterCanvas> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: InkSurface> SignaturePad<S> {
    pub fn with_surface(surface: S) -> Self {
        Self {
            surface,
            drawing: DrawingState::new(),
            size: None,
            overlay_visible: true,
            resize: Debouncer::new(RESIZE_TIMER_KEY, RESIZE_DEBOUNCE_MS),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn drawing(&self) -> &DrawingState {
        &self.drawing
    }

    pub fn size(&self) -> Option<SurfaceSize> {
        self.size
    }

    pub fn has_signature(&self) -> bool {
        self.drawing.has_signature
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing.is_drawing()
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Fresh surface for `size`. An oversized surface leaves the pad as it was.
    pub fn initialize(&mut self, size: SurfaceSize) -> Result<(), String> {
        let (w, h) = size.backing()?;
        self.resize.cancel();
        self.configure_backing(size, w, h);
        self.drawing.reset();
        self.overlay_visible = true;
        Ok(())
    }

    fn configure_backing(&mut self, size: SurfaceSize, width: u32, height: u32) {
        self.surface.configure(width, height, size.ratio());
        self.size = Some(size);
    }

    /// Contact-down from the host. `active_contacts` is the number of
    /// simultaneous touches; anything beyond one finger is ignored.
    pub fn on_contact_start(&mut self, contact: Contact, active_contacts: usize) -> bool {
        if active_contacts > 1 {
            return false;
        }
        self.on_stroke_start(contact)
    }

    pub fn on_stroke_start(&mut self, contact: Contact) -> bool {
        if self.drawing.is_drawing() {
            return false;
        }
        let point = StrokePoint::from(contact);
        self.drawing.phase = DrawPhase::Drawing {
            contact_id: contact.id,
        };
        self.drawing.has_signature = true;
        self.drawing.point_buffer.clear();
        self.drawing.point_buffer.push(point);
        self.drawing.last_point = Some(point);
        self.overlay_visible = false;
        self.surface.set_line_width(line_width_for(point.pressure));
        self.surface.begin_path(point.point());
        true
    }

    pub fn on_stroke_move(&mut self, contact: Contact) -> bool {
        let DrawPhase::Drawing { contact_id } = self.drawing.phase else {
            return false;
        };
        if contact_id != contact.id {
            return false;
        }
        let point = StrokePoint::from(contact);
        let buffer = &mut self.drawing.point_buffer;
        buffer.push(point);
        if buffer.len() > 3 {
            buffer.remove(0);
        }
        self.drawing.last_point = Some(point);

        if let [_, p1, p2] = buffer.as_slice() {
            let control = p1.point();
            let mid = control.midpoint(p2.point());
            self.surface.set_line_width(line_width_for(point.pressure));
            self.surface.quadratic_curve_to(control, mid);
            self.surface.stroke();
            self.surface.begin_path(mid);
        }
        true
    }

    /// Contact-up, cancel or leave. `None` ends the stroke whatever contact
    /// drives it; a foreign contact id is ignored.
    pub fn on_stroke_end(&mut self, contact_id: Option<i64>) -> bool {
        let DrawPhase::Drawing { contact_id: active } = self.drawing.phase else {
            return false;
        };
        if contact_id.is_some_and(|id| id != active) {
            return false;
        }
        if let Some(last) = self.drawing.point_buffer.last().copied() {
            self.surface.line_to(last.point());
            self.surface.stroke();
        }
        self.drawing.point_buffer.clear();
        self.drawing.phase = DrawPhase::Idle;
        true
    }

    pub fn clear(&mut self) {
        self.surface.reset_transform();
        self.surface.clear();
        let ratio = self.size.map(|s| s.ratio()).unwrap_or(1.0);
        self.surface.set_scale(ratio);
        self.surface.set_line_width(DEFAULT_LINE_WIDTH);
        self.drawing.reset();
        self.overlay_visible = true;
    }

    /// Debounced resize: supersedes any pending request.
    pub fn request_resize(&mut self, size: SurfaceSize) -> TimerRequest {
        self.resize.schedule(size)
    }

    /// Timer callback for a resize request; stale generations do nothing.
    pub fn on_resize_timer(&mut self, generation: u64) -> Result<bool, String> {
        match self.resize.fire(generation) {
            Some(size) => {
                self.apply_resize(size)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Rebuild the backing store for `size`, carrying existing ink over.
    pub fn apply_resize(&mut self, size: SurfaceSize) -> Result<(), String> {
        let (w, h) = size.backing()?;
        let snapshot = if self.drawing.has_signature && !self.surface.is_blank() {
            Some(self.surface.encode_png()?)
        } else {
            None
        };
        self.configure_backing(size, w, h);
        if let Some(png) = snapshot {
            self.surface.draw_png(&png, size.width, size.height)?;
        }
        Ok(())
    }

    /// Encoded surface content, or `None` when nothing was signed.
    pub fn signature_png(&self) -> Option<Result<Vec<u8>, String>> {
        if !self.drawing.has_signature || self.surface.is_blank() {
            return None;
        }
        Some(self.surface.encode_png())
    }
}
