use crate::features::camera::CameraState;
use crate::features::debounce::TimerRequest;
use crate::features::export::ExportState;
use crate::features::form::FormFields;
use crate::features::photos::PhotoAlbum;
use crate::features::signature::SignaturePad;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Screen {
    WorkOrder,
    Camera,
}

/// Side effects the host shell must perform after rendering a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Effect {
    /// `generation` tags the request; the host echoes it in `camera_ready`
    /// or `camera_failed`.
    RequestCamera { generation: u64, constraints: Value },
    /// Stop the stream of one request, or every stream when untagged.
    StopCamera {
        #[serde(skip_serializing_if = "Option::is_none")]
        generation: Option<u64>,
    },
    Timer(TimerRequest),
    SavePdf { filename: String, data: String },
    Alert { message: String },
    Navigate { url: String },
}

pub struct AppState {
    pub nav_stack: Vec<Screen>,
    pub form: FormFields,
    pub signature: SignaturePad,
    pub photos: PhotoAlbum,
    pub camera: CameraState,
    pub export: ExportState,
    pub session_token: Option<String>,
    pub last_error: Option<String>,
    effects: Vec<Effect>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            nav_stack: vec![Screen::WorkOrder],
            form: FormFields::new(),
            signature: SignaturePad::new(),
            photos: PhotoAlbum::new(),
            camera: CameraState::new(),
            export: ExportState::new(),
            session_token: None,
            last_error: None,
            effects: Vec::new(),
        }
    }

    pub fn ensure_navigation(&mut self) {
        if self.nav_stack.is_empty() {
            self.nav_stack.push(Screen::WorkOrder);
        }
    }

    pub fn current_screen(&self) -> Screen {
        self.nav_stack.last().copied().unwrap_or(Screen::WorkOrder)
    }

    pub fn nav_depth(&self) -> usize {
        self.nav_stack.len().max(1)
    }

    pub fn push_screen(&mut self, screen: Screen) {
        self.ensure_navigation();
        if self.current_screen() != screen {
            self.nav_stack.push(screen);
        }
    }

    pub fn pop_screen(&mut self) {
        self.ensure_navigation();
        if self.nav_stack.len() > 1 {
            self.nav_stack.pop();
        }
    }

    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn alert(&mut self, message: impl Into<String>) {
        self.effects.push(Effect::Alert {
            message: message.into(),
        });
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Empty every input, the signature and the photo list; dates go back
    /// to `today`.
    pub fn reset_form(&mut self, today: &str) {
        self.form.clear();
        self.form.apply_default_dates(today);
        self.signature.clear();
        self.photos.clear();
        self.last_error = None;
    }
}
