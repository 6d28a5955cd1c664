use crate::features::photos::{compress_image, decode_base64_payload};
use crate::state::{AppState, Effect, Screen};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraPhase {
    Closed,
    /// Waiting on the host; `fallback` marks the constraint-free retry.
    Requesting { fallback: bool },
    Open,
}

#[derive(Debug, Clone)]
pub struct CameraState {
    pub phase: CameraPhase,
    /// Generation of the latest stream request.
    pub generation: u64,
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraState {
    pub const fn new() -> Self {
        Self {
            phase: CameraPhase::Closed,
            generation: 0,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.phase == CameraPhase::Closed
    }

    fn next_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

pub fn preferred_constraints() -> Value {
    json!({
        "video": {
            "facingMode": "environment",
            "width": { "ideal": 1280 },
            "height": { "ideal": 720 }
        }
    })
}

pub fn fallback_constraints() -> Value {
    json!({ "video": true })
}

fn request_stream(state: &mut AppState, fallback: bool) {
    let generation = state.camera.next_generation();
    state.camera.phase = CameraPhase::Requesting { fallback };
    let constraints = if fallback {
        fallback_constraints()
    } else {
        preferred_constraints()
    };
    state.push_effect(Effect::RequestCamera {
        generation,
        constraints,
    });
}

pub fn handle_camera_open(state: &mut AppState) {
    if !state.camera.is_closed() {
        return;
    }
    state.push_screen(Screen::Camera);
    request_stream(state, false);
}

pub fn handle_camera_ready(state: &mut AppState, generation: u64) {
    let current = generation == state.camera.generation;
    match state.camera.phase {
        CameraPhase::Requesting { .. } if current => {
            state.camera.phase = CameraPhase::Open;
        }
        CameraPhase::Open if current => {}
        // Closed view or superseded request: that stream must not stay live.
        _ => {
            tracing::debug!(generation, "releasing unwanted camera stream");
            state.push_effect(Effect::StopCamera {
                generation: Some(generation),
            });
        }
    }
}

pub fn handle_camera_failed(state: &mut AppState, generation: u64, error: &str) {
    if generation != state.camera.generation {
        tracing::debug!(generation, error, "ignoring failure of a superseded camera request");
        return;
    }
    match state.camera.phase {
        CameraPhase::Requesting { fallback: false } => {
            tracing::warn!(error, "camera request failed, retrying without constraints");
            state.alert(format!("Unable to access camera: {error}"));
            request_stream(state, true);
        }
        CameraPhase::Requesting { fallback: true } => {
            tracing::warn!(error, "camera fallback request failed");
            state.alert(format!(
                "Camera not available: {error}. Please use Upload Photos instead."
            ));
            close_camera(state);
        }
        CameraPhase::Open | CameraPhase::Closed => {}
    }
}

/// Compress a captured frame into the album, then close the camera.
pub fn handle_camera_capture(state: &mut AppState, frame: Option<&str>) {
    let result = if state.camera.phase != CameraPhase::Open {
        Err("camera_not_open".to_string())
    } else {
        frame
            .ok_or_else(|| "missing_frame".to_string())
            .and_then(decode_base64_payload)
            .and_then(|bytes| compress_image(&bytes))
    };
    match result {
        Ok(photo) => state.photos.push(photo),
        Err(e) => state.last_error = Some(e),
    }
    close_camera(state);
}

pub fn handle_camera_close(state: &mut AppState) {
    close_camera(state);
}

/// Every exit from the camera view goes through here.
pub fn close_camera(state: &mut AppState) {
    state.camera.phase = CameraPhase::Closed;
    state.push_effect(Effect::StopCamera { generation: None });
    if state.current_screen() == Screen::Camera {
        state.pop_screen();
    }
}
