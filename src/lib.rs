pub mod features;
#[cfg(not(target_arch = "wasm32"))]
pub mod server;
pub mod state;
pub mod ui;
#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
mod wasm;

use features::camera::{
    close_camera, handle_camera_capture, handle_camera_close, handle_camera_failed,
    handle_camera_open, handle_camera_ready, CameraPhase,
};
use features::canvas::{png_data_url, InkOp};
use features::costs::{price_key, qty_key, total_key, MATERIAL_ROWS};
use features::export::{handle_export_finished, handle_export_start};
use features::form::{
    material_key, today_iso, FieldKind, FieldSpec, FormFields, CLOSING_FIELDS, COST_FIELDS,
    JOB_FIELDS,
};
use features::photos::UploadedFile;
use features::signature::{Contact, SurfaceSize, OVERLAY_TEXT, RESIZE_TIMER_KEY};
use serde::Deserialize;
use serde_json::{json, Value};
use state::{AppState, Effect, Screen};
use std::collections::HashMap;
use ui::{
    node, Button as UiButton, Column as UiColumn, Image as UiImage, Modal as UiModal, Row as UiRow,
    Section as UiSection, SignaturePad as UiSignaturePad, Text as UiText,
    TextInput as UiTextInput,
};

/// One event from the shell. Only `action` is required; the other fields
/// are read by the actions that need them.
#[derive(Debug, Default, Deserialize)]
pub struct Command {
    pub action: String,
    pub bindings: Option<HashMap<String, String>>,
    pub target: Option<String>,
    pub generation: Option<u64>,
    pub contact: Option<Contact>,
    pub active_contacts: Option<usize>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub device_pixel_ratio: Option<f64>,
    pub files: Option<Vec<UploadedFile>>,
    pub frame: Option<String>,
    pub error: Option<String>,
    pub token: Option<String>,
    pub index: Option<usize>,
}

#[derive(Debug)]
enum Action {
    Init {
        bindings: HashMap<String, String>,
    },
    Back,
    FieldChange {
        bindings: HashMap<String, String>,
    },
    Sync {
        bindings: HashMap<String, String>,
    },
    ClearForm,
    SignatureInit(SurfaceSize),
    SignatureStart {
        contact: Contact,
        active_contacts: usize,
    },
    SignatureMove(Contact),
    SignatureEnd {
        contact_id: Option<i64>,
    },
    SignatureClear,
    SignatureResize(SurfaceSize),
    TimerFired {
        key: String,
        generation: u64,
    },
    PhotoUpload {
        files: Vec<UploadedFile>,
    },
    PhotoRemove {
        index: Option<usize>,
    },
    CameraOpen,
    CameraReady {
        generation: u64,
    },
    CameraFailed {
        generation: u64,
        error: String,
    },
    CameraCapture {
        frame: Option<String>,
    },
    CameraClose,
    ExportPdf,
    ExportDone,
    ExportFailed {
        error: String,
    },
    SessionStart {
        token: String,
    },
    Logout,
}

fn surface_size(width: Option<f64>, height: Option<f64>, ratio: Option<f64>) -> Result<SurfaceSize, String> {
    match (width, height) {
        (Some(w), Some(h)) => Ok(SurfaceSize::new(w, h, ratio.unwrap_or(1.0))),
        _ => Err("missing_surface_size".into()),
    }
}

fn parse_action(command: Command) -> Result<Action, String> {
    let Command {
        action,
        bindings,
        target,
        generation,
        contact,
        active_contacts,
        width,
        height,
        device_pixel_ratio,
        files,
        frame,
        error,
        token,
        index,
    } = command;

    let bindings = bindings.unwrap_or_default();
    let error = error.unwrap_or_else(|| "unknown_error".to_string());

    match action.as_str() {
        "init" => Ok(Action::Init { bindings }),
        "back" => Ok(Action::Back),
        "field_change" => Ok(Action::FieldChange { bindings }),
        "sync" => Ok(Action::Sync { bindings }),
        "clear_form" => Ok(Action::ClearForm),
        "signature_init" => surface_size(width, height, device_pixel_ratio).map(Action::SignatureInit),
        "signature_start" => Ok(Action::SignatureStart {
            contact: contact.ok_or_else(|| "missing_contact".to_string())?,
            active_contacts: active_contacts.unwrap_or(1),
        }),
        "signature_move" => contact
            .map(Action::SignatureMove)
            .ok_or_else(|| "missing_contact".to_string()),
        "signature_end" => Ok(Action::SignatureEnd {
            contact_id: contact.map(|c| c.id),
        }),
        "signature_clear" => Ok(Action::SignatureClear),
        "signature_resize" => {
            surface_size(width, height, device_pixel_ratio).map(Action::SignatureResize)
        }
        "timer_fired" => match (target, generation) {
            (Some(key), Some(generation)) => Ok(Action::TimerFired { key, generation }),
            _ => Err("missing_timer".into()),
        },
        "photo_upload" => Ok(Action::PhotoUpload {
            files: files.unwrap_or_default(),
        }),
        "photo_remove" => Ok(Action::PhotoRemove { index }),
        "camera_open" => Ok(Action::CameraOpen),
        "camera_ready" => generation
            .map(|generation| Action::CameraReady { generation })
            .ok_or_else(|| "missing_generation".to_string()),
        "camera_failed" => generation
            .map(|generation| Action::CameraFailed { generation, error })
            .ok_or_else(|| "missing_generation".to_string()),
        "camera_capture" => Ok(Action::CameraCapture { frame }),
        "camera_close" => Ok(Action::CameraClose),
        "export_pdf" => Ok(Action::ExportPdf),
        "export_done" => Ok(Action::ExportDone),
        "export_failed" => Ok(Action::ExportFailed { error }),
        "session_start" => token
            .filter(|t| !t.is_empty())
            .map(|token| Action::SessionStart { token })
            .ok_or_else(|| "missing_token".to_string()),
        "logout" => Ok(Action::Logout),
        other => Err(format!("unknown_action:{other}")),
    }
}

/// Owns the form state and turns shell commands into UI trees.
pub struct WorkOrderCore {
    state: AppState,
    today: fn() -> String,
}

impl Default for WorkOrderCore {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkOrderCore {
    pub fn new() -> Self {
        Self::with_clock(today_iso)
    }

    /// `today` supplies the local date as `YYYY-MM-DD`.
    pub fn with_clock(today: fn() -> String) -> Self {
        let mut state = AppState::new();
        state.form.apply_default_dates(&today());
        Self { state, today }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// JSON in, JSON out. Never panics across the boundary.
    pub fn dispatch(&mut self, input: &str) -> String {
        let response = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            match serde_json::from_str::<Command>(input) {
                Ok(command) => self.handle_command(command),
                Err(e) => {
                    self.state.last_error = Some(format!("invalid_json:{e}"));
                    Ok(self.respond(false))
                }
            }
        }));

        let json_value = match response {
            Ok(Ok(value)) => value,
            Ok(Err(err)) => error_ui(&err),
            Err(_) => error_ui("panic"),
        };
        json_value.to_string()
    }

    pub fn handle_command(&mut self, command: Command) -> Result<Value, String> {
        self.state.ensure_navigation();

        let action = match parse_action(command) {
            Ok(action) => action,
            Err(err) => {
                tracing::warn!(error = %err, "rejected command");
                self.state.last_error = Some(err);
                return Ok(self.respond(false));
            }
        };
        self.state.last_error = None;

        let today = (self.today)();
        let state = &mut self.state;
        let mut full_repaint = false;

        match action {
            Action::Init { bindings } => {
                if !bindings.is_empty() {
                    state.form.sync(&bindings);
                }
                full_repaint = true;
            }
            Action::Back => {
                if state.current_screen() == Screen::Camera {
                    close_camera(state);
                } else {
                    state.pop_screen();
                }
            }
            Action::FieldChange { bindings } => {
                for (key, value) in &bindings {
                    state.form.set_field(key, value);
                }
            }
            Action::Sync { bindings } => state.form.sync(&bindings),
            Action::ClearForm => {
                state.reset_form(&today);
                tracing::info!("form cleared");
            }
            Action::SignatureInit(size) => {
                if let Err(e) = state.signature.initialize(size) {
                    tracing::warn!(error = %e, "signature surface rejected");
                    state.last_error = Some(e);
                }
                full_repaint = true;
            }
            Action::SignatureStart {
                contact,
                active_contacts,
            } => {
                state.signature.on_contact_start(contact, active_contacts);
            }
            Action::SignatureMove(contact) => {
                state.signature.on_stroke_move(contact);
            }
            Action::SignatureEnd { contact_id } => {
                state.signature.on_stroke_end(contact_id);
            }
            Action::SignatureClear => state.signature.clear(),
            Action::SignatureResize(size) => {
                let request = state.signature.request_resize(size);
                state.push_effect(Effect::Timer(request));
            }
            Action::TimerFired { key, generation } => {
                if key == RESIZE_TIMER_KEY {
                    if let Err(e) = state.signature.on_resize_timer(generation) {
                        tracing::warn!(error = %e, "signature resize failed");
                        state.last_error = Some(format!("signature_resize_failed:{e}"));
                    }
                } else {
                    tracing::debug!(%key, generation, "timer for unknown key");
                }
            }
            Action::PhotoUpload { files } => match state.photos.add_uploads(&files) {
                Ok(added) => {
                    tracing::debug!(added, total = state.photos.len(), "photos attached");
                }
                Err(e) => state.last_error = Some(e),
            },
            Action::PhotoRemove { index } => {
                if let Some(index) = index {
                    state.photos.remove(index);
                }
            }
            Action::CameraOpen => handle_camera_open(state),
            Action::CameraReady { generation } => handle_camera_ready(state, generation),
            Action::CameraFailed { generation, error } => {
                handle_camera_failed(state, generation, &error)
            }
            Action::CameraCapture { frame } => handle_camera_capture(state, frame.as_deref()),
            Action::CameraClose => handle_camera_close(state),
            Action::ExportPdf => handle_export_start(state, &today),
            Action::ExportDone => handle_export_finished(state, Ok(())),
            Action::ExportFailed { error } => handle_export_finished(state, Err(error)),
            Action::SessionStart { token } => {
                state.session_token = Some(token);
            }
            Action::Logout => {
                state.session_token = None;
                state.push_effect(Effect::Navigate { url: "/".into() });
            }
        }

        Ok(self.respond(full_repaint))
    }

    /// Render the current state and attach the ink and effects produced by
    /// the last command.
    fn respond(&mut self, full_repaint: bool) -> Value {
        let ink = self.state.signature.surface_mut().take_journal();
        let snapshot = if full_repaint {
            match self.state.signature.signature_png() {
                Some(Ok(png)) => Some(png_data_url(&png)),
                _ => None,
            }
        } else {
            None
        };
        let effects = self.state.take_effects();

        let mut ui = render_ui(&self.state, ink, snapshot);
        if !effects.is_empty() {
            let effects = serde_json::to_value(&effects)
                .unwrap_or_else(|e| json!([{ "type": "Alert", "message": format!("effects_serialize_error:{e}") }]));
            if let Some(root) = ui.as_object_mut() {
                root.insert("effects".into(), effects);
            }
        }
        ui
    }
}

fn error_ui(message: &str) -> Value {
    json!({
        "type": "Column",
        "padding": 24,
        "children": [
            { "type": "Text", "text": "Error", "size": 18.0 },
            { "type": "Text", "text": message }
        ]
    })
}

fn render_ui(state: &AppState, ink: Vec<InkOp>, snapshot: Option<String>) -> Value {
    let mut children = render_work_order(state, ink, snapshot);
    if state.current_screen() == Screen::Camera {
        children.push(render_camera_modal(state));
    }
    node(UiColumn::new(children).id("work_order").padding(16), "root")
}

fn input_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text | FieldKind::Derived => "text",
        FieldKind::Date => "date",
        FieldKind::Number => "number",
        FieldKind::Multiline => "textarea",
    }
}

fn field_input(spec: &FieldSpec, fields: &FormFields, print: bool) -> Value {
    node(
        UiTextInput::new(spec.key, spec.label, fields.get(spec.key))
            .input_type(input_type(spec.kind))
            .read_only(spec.kind == FieldKind::Derived)
            .plain(print),
        spec.key,
    )
}

fn render_material_rows(fields: &FormFields, print: bool) -> Vec<Value> {
    const LABELS: [&str; 4] = ["Material", "Qty", "Unit Price", "Total"];
    const TYPES: [&str; 4] = ["text", "number", "number", "text"];

    (1..=MATERIAL_ROWS)
        .map(|row| {
            let keys = [material_key(row), qty_key(row), price_key(row), total_key(row)];
            let cells = keys
                .iter()
                .enumerate()
                .map(|(i, key)| {
                    node(
                        UiTextInput::new(key, LABELS[i], fields.get(key))
                            .input_type(TYPES[i])
                            .read_only(i == 3)
                            .plain(print),
                        "material_cell",
                    )
                })
                .collect();
            node(UiRow::new(cells), "material_row")
        })
        .collect()
}

fn render_signature(state: &AppState, ink: Vec<InkOp>, snapshot: Option<String>) -> Value {
    let pad = &state.signature;
    let overlay = pad.overlay_visible().then_some(OVERLAY_TEXT);
    node(
        UiSignaturePad::new("signature")
            .has_signature(pad.has_signature())
            .overlay(overlay)
            .snapshot(snapshot)
            .ink(ink),
        "signature",
    )
}

fn render_photos(state: &AppState, print: bool) -> Vec<Value> {
    let mut children = Vec::new();
    if !print {
        children.push(node(
            UiRow::new(vec![
                node(
                    UiButton::new("Upload Photos", "photo_upload")
                        .id("photo_upload")
                        .file_picker("image/*"),
                    "upload",
                ),
                node(
                    UiButton::new("Take Photo", "camera_open").id("camera_open"),
                    "camera_open",
                ),
            ]),
            "photo_controls",
        ));
    }
    for (i, photo) in state.photos.photos().iter().enumerate() {
        let src = photo.data_url();
        let alt = format!("Attached photo {}", i + 1);
        let mut preview = vec![node(UiImage::new(&src, &alt), "photo")];
        if !print {
            preview.push(node(
                UiButton::new("Remove", "photo_remove").payload(json!({ "index": i })),
                "photo_remove",
            ));
        }
        children.push(node(UiColumn::new(preview), "photo_preview"));
    }
    children
}

fn render_work_order(state: &AppState, ink: Vec<InkOp>, snapshot: Option<String>) -> Vec<Value> {
    let print = state.export.print_mode;
    let fields = &state.form;

    let mut children = vec![node(UiText::new("ASR Work Order").size(22.0), "title")];
    if !print && state.session_token.is_some() {
        children.push(node(UiButton::new("Log out", "logout").id("logout"), "logout"));
    }

    let job = JOB_FIELDS
        .iter()
        .map(|spec| field_input(spec, fields, print))
        .collect();
    children.push(node(UiSection::new("Job Information", job), "job"));

    children.push(node(
        UiSection::new("Materials", render_material_rows(fields, print)),
        "materials",
    ));

    let costs = COST_FIELDS
        .iter()
        .map(|spec| field_input(spec, fields, print))
        .collect();
    children.push(node(UiSection::new("Costs", costs), "costs"));

    let [notes, signer, signed_on] = &CLOSING_FIELDS;
    children.push(field_input(notes, fields, print));

    let mut authorization = vec![render_signature(state, ink, snapshot)];
    if !print {
        authorization.push(node(
            UiButton::new("Clear Signature", "signature_clear").id("signature_clear"),
            "signature_clear",
        ));
    }
    authorization.push(field_input(signer, fields, print));
    authorization.push(field_input(signed_on, fields, print));
    children.push(node(
        UiSection::new("Authorization", authorization),
        "authorization",
    ));

    children.push(node(
        UiSection::new("Photos", render_photos(state, print)),
        "photos",
    ));

    if !print {
        children.push(node(
            UiRow::new(vec![
                node(
                    UiButton::new("Export PDF", "export_pdf")
                        .id("export_pdf")
                        .disabled(state.export.in_progress),
                    "export",
                ),
                node(
                    UiButton::new("Clear Form", "clear_form").id("clear_form"),
                    "clear_form",
                ),
            ]),
            "actions",
        ));
    }

    if let Some(err) = &state.last_error {
        children.push(node(
            UiText::new(&format!("Error: {err}")).size(12.0),
            "error",
        ));
    }
    children
}

fn render_camera_modal(state: &AppState) -> Value {
    let phase = state.camera.phase;
    let status = match phase {
        CameraPhase::Requesting { fallback: false } => "Starting camera...",
        CameraPhase::Requesting { fallback: true } => "Retrying camera...",
        CameraPhase::Open => "Camera ready",
        CameraPhase::Closed => "Camera closed",
    };
    node(
        UiModal::new(
            "camera_modal",
            vec![
                node(UiText::new(status), "camera_status"),
                json!({ "type": "CameraPreview", "id": "camera_video" }),
                node(
                    UiRow::new(vec![
                        node(
                            UiButton::new("Capture", "camera_capture")
                                .id("camera_capture")
                                .disabled(phase != CameraPhase::Open),
                            "capture",
                        ),
                        node(
                            UiButton::new("Cancel", "camera_close").id("camera_close"),
                            "camera_close",
                        ),
                    ]),
                    "camera_controls",
                ),
            ],
        ),
        "camera_modal",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_today() -> String {
        "2026-10-18".to_string()
    }

    fn core() -> WorkOrderCore {
        WorkOrderCore::with_clock(fixed_today)
    }

    fn send(core: &mut WorkOrderCore, command: Value) -> Value {
        serde_json::from_str(&core.dispatch(&command.to_string())).expect("response is json")
    }

    fn walk<'a>(node: &'a Value, acc: &mut Vec<&'a Value>) {
        acc.push(node);
        if let Some(children) = node.get("children").and_then(|c| c.as_array()) {
            for child in children {
                walk(child, acc);
            }
        }
    }

    fn nodes(ui: &Value) -> Vec<&Value> {
        let mut acc = Vec::new();
        walk(ui, &mut acc);
        acc
    }

    fn input_value<'a>(ui: &'a Value, key: &str) -> &'a str {
        nodes(ui)
            .into_iter()
            .find(|n| n.get("bind_key").and_then(|v| v.as_str()) == Some(key))
            .and_then(|n| n.get("value"))
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| panic!("no input bound to {key}"))
    }

    fn node_with_type<'a>(ui: &'a Value, kind: &str) -> Option<&'a Value> {
        nodes(ui)
            .into_iter()
            .find(|n| n.get("type").and_then(|v| v.as_str()) == Some(kind))
    }

    fn button<'a>(ui: &'a Value, action: &str) -> Option<&'a Value> {
        nodes(ui).into_iter().find(|n| {
            n.get("type").and_then(|v| v.as_str()) == Some("Button")
                && n.get("action").and_then(|v| v.as_str()) == Some(action)
        })
    }

    fn texts(ui: &Value) -> Vec<String> {
        nodes(ui)
            .into_iter()
            .filter_map(|n| n.get("text").and_then(|t| t.as_str()))
            .map(str::to_string)
            .collect()
    }

    fn effects(ui: &Value) -> Vec<Value> {
        ui.get("effects")
            .and_then(|e| e.as_array())
            .cloned()
            .unwrap_or_default()
    }

    fn touch(action: &str, id: i64, x: f64, y: f64) -> Value {
        json!({ "action": action, "contact": { "id": id, "x": x, "y": y } })
    }

    #[test]
    fn init_shows_default_dates_and_blank_totals() {
        let mut core = core();
        let ui = send(&mut core, json!({ "action": "init" }));
        assert_eq!(input_value(&ui, "dateOrdered"), "2026-10-18");
        assert_eq!(input_value(&ui, "signatureDate"), "2026-10-18");
        assert_eq!(input_value(&ui, "totalCost"), "");
        assert!(ui.get("effects").is_none());
    }

    #[test]
    fn field_changes_drive_cost_summary() {
        let mut core = core();
        send(&mut core, json!({ "action": "field_change", "bindings": { "qty1": "10" } }));
        let ui = send(&mut core, json!({ "action": "field_change", "bindings": { "price1": "20" } }));
        assert_eq!(input_value(&ui, "total1"), "$200.00");

        send(&mut core, json!({ "action": "field_change", "bindings": { "labor": "100" } }));
        let ui = send(
            &mut core,
            json!({ "action": "field_change", "bindings": { "contractPrice": "600", "overhead": "50" } }),
        );
        assert_eq!(input_value(&ui, "totalCost"), "$300.00");
        assert_eq!(input_value(&ui, "grossProfit"), "50.0%");
        assert_eq!(input_value(&ui, "netProfit"), "$250.00");

        let derived = nodes(&ui)
            .into_iter()
            .find(|n| n.get("bind_key").and_then(|v| v.as_str()) == Some("total1"))
            .unwrap();
        assert_eq!(derived.get("read_only").and_then(|v| v.as_bool()), Some(true));
    }

    #[test]
    fn unknown_action_and_bad_json_render_error_line() {
        let mut core = core();
        let ui = send(&mut core, json!({ "action": "frobnicate" }));
        assert!(texts(&ui).iter().any(|t| t == "Error: unknown_action:frobnicate"));

        let raw = core.dispatch("{not json");
        let ui: Value = serde_json::from_str(&raw).unwrap();
        assert!(texts(&ui).iter().any(|t| t.starts_with("Error: invalid_json")));
    }

    #[test]
    fn error_line_clears_after_next_accepted_command() {
        let mut core = core();
        let ui = send(&mut core, json!({ "action": "frobnicate" }));
        assert!(texts(&ui).iter().any(|t| t.starts_with("Error: ")));

        let ui = send(
            &mut core,
            json!({ "action": "field_change", "bindings": { "qty1": "2", "price1": "3" } }),
        );
        assert!(!texts(&ui).iter().any(|t| t.starts_with("Error: ")));
        assert_eq!(input_value(&ui, "total1"), "$6.00");

        send(&mut core, json!({ "action": "signature_move" }));
        assert!(core.state().last_error.is_some());
        let ui = send(&mut core, json!({ "action": "signature_clear" }));
        assert!(!texts(&ui).iter().any(|t| t.starts_with("Error: ")));
        assert!(core.state().last_error.is_none());
    }

    #[test]
    fn oversized_signature_surface_reports_error() {
        let mut core = core();
        let ui = send(
            &mut core,
            json!({ "action": "signature_init", "width": 1e9, "height": 1e9, "device_pixel_ratio": 3.0 }),
        );
        assert!(texts(&ui)
            .iter()
            .any(|t| t.starts_with("Error: surface_too_large")));
        assert!(node_with_type(&ui, "SignaturePad").is_some());
        assert!(core.state().signature.size().is_none());
    }

    #[test]
    fn stroke_streams_ink_and_hides_overlay() {
        let mut core = core();
        let ui = send(
            &mut core,
            json!({ "action": "signature_init", "width": 300.0, "height": 120.0, "device_pixel_ratio": 2.0 }),
        );
        let pad = node_with_type(&ui, "SignaturePad").unwrap();
        assert_eq!(pad.get("touch_action").and_then(|v| v.as_str()), Some("none"));
        assert_eq!(pad.get("overlay").and_then(|v| v.as_str()), Some("Sign here"));

        send(&mut core, touch("signature_start", 1, 10.0, 10.0));
        send(&mut core, touch("signature_move", 1, 40.0, 30.0));
        let ui = send(&mut core, touch("signature_move", 1, 80.0, 60.0));
        let pad = node_with_type(&ui, "SignaturePad").unwrap();
        assert!(pad.get("overlay").is_none());
        assert_eq!(pad["ink"][0]["op"], "quad");

        let ui = send(&mut core, json!({ "action": "signature_end" }));
        let pad = node_with_type(&ui, "SignaturePad").unwrap();
        assert_eq!(pad["ink"][0]["op"], "line");
        assert_eq!(pad.get("has_signature").and_then(|v| v.as_bool()), Some(true));

        let ui = send(&mut core, json!({ "action": "signature_clear" }));
        let pad = node_with_type(&ui, "SignaturePad").unwrap();
        assert_eq!(pad.get("overlay").and_then(|v| v.as_str()), Some("Sign here"));
        assert_eq!(pad.get("has_signature").and_then(|v| v.as_bool()), Some(false));
    }

    #[test]
    fn second_finger_does_not_start_a_stroke() {
        let mut core = core();
        send(
            &mut core,
            json!({ "action": "signature_init", "width": 300.0, "height": 120.0 }),
        );
        let ui = send(
            &mut core,
            json!({ "action": "signature_start", "active_contacts": 2, "contact": { "id": 7, "x": 5.0, "y": 5.0 } }),
        );
        let pad = node_with_type(&ui, "SignaturePad").unwrap();
        assert_eq!(pad.get("has_signature").and_then(|v| v.as_bool()), Some(false));
        assert!(!core.state().signature.is_drawing());
    }

    #[test]
    fn resize_requests_are_debounced_by_generation() {
        let mut core = core();
        send(
            &mut core,
            json!({ "action": "signature_init", "width": 300.0, "height": 120.0 }),
        );
        let first = send(
            &mut core,
            json!({ "action": "signature_resize", "width": 280.0, "height": 110.0 }),
        );
        let second = send(
            &mut core,
            json!({ "action": "signature_resize", "width": 260.0, "height": 100.0 }),
        );
        let stale = effects(&first)[0]["generation"].as_u64().unwrap();
        let latest = effects(&second)[0]["generation"].as_u64().unwrap();
        assert_eq!(effects(&second)[0]["type"], "Timer");
        assert_eq!(effects(&second)[0]["key"], "signature_resize");
        assert_ne!(stale, latest);

        let ui = send(
            &mut core,
            json!({ "action": "timer_fired", "target": "signature_resize", "generation": stale }),
        );
        assert!(node_with_type(&ui, "SignaturePad").unwrap().get("ink").is_none());

        let ui = send(
            &mut core,
            json!({ "action": "timer_fired", "target": "signature_resize", "generation": latest }),
        );
        let pad = node_with_type(&ui, "SignaturePad").unwrap();
        assert_eq!(pad["ink"][0]["op"], "configure");
        assert_eq!(pad["ink"][0]["width"], 260);
        assert_eq!(core.state().signature.size().map(|s| s.width), Some(260.0));
    }

    #[test]
    fn export_lifecycle_toggles_print_mode() {
        let mut core = core();
        send(
            &mut core,
            json!({ "action": "field_change", "bindings": { "jobName": "Oak  Lane" } }),
        );
        let ui = send(&mut core, json!({ "action": "export_pdf" }));
        let effect = &effects(&ui)[0];
        assert_eq!(effect["type"], "SavePdf");
        assert_eq!(effect["filename"], "ASR_WorkOrder_Oak_Lane_2026-10-18.pdf");
        assert!(button(&ui, "export_pdf").is_none());
        assert!(button(&ui, "signature_clear").is_none());
        let job = nodes(&ui)
            .into_iter()
            .find(|n| n.get("bind_key").and_then(|v| v.as_str()) == Some("jobName"))
            .unwrap();
        assert_eq!(job.get("plain").and_then(|v| v.as_bool()), Some(true));

        let ui = send(&mut core, json!({ "action": "export_pdf" }));
        assert!(effects(&ui).is_empty());

        let ui = send(&mut core, json!({ "action": "export_done" }));
        let export = button(&ui, "export_pdf").expect("controls restored");
        assert!(export.get("disabled").is_none());
    }

    #[test]
    fn failed_export_reports_alert() {
        let mut core = core();
        send(&mut core, json!({ "action": "export_pdf" }));
        let ui = send(
            &mut core,
            json!({ "action": "export_failed", "error": "disk full" }),
        );
        let effect = &effects(&ui)[0];
        assert_eq!(effect["type"], "Alert");
        assert_eq!(effect["message"], "Error generating PDF: disk full");
        assert!(button(&ui, "export_pdf").is_some());
    }

    #[test]
    fn camera_modal_opens_and_back_releases_stream() {
        let mut core = core();
        let ui = send(&mut core, json!({ "action": "camera_open" }));
        assert_eq!(effects(&ui)[0]["type"], "RequestCamera");
        assert_eq!(effects(&ui)[0]["constraints"]["video"]["facingMode"], "environment");
        assert!(node_with_type(&ui, "Modal").is_some());
        let capture = button(&ui, "camera_capture").unwrap();
        assert_eq!(capture.get("disabled").and_then(|v| v.as_bool()), Some(true));

        let ui = send(&mut core, json!({ "action": "back" }));
        assert!(effects(&ui).iter().any(|e| e["type"] == "StopCamera"));
        assert!(node_with_type(&ui, "Modal").is_none());
    }

    #[test]
    fn photo_remove_on_empty_list_is_a_no_op() {
        let mut core = core();
        let ui = send(&mut core, json!({ "action": "photo_remove", "index": 0 }));
        assert!(node_with_type(&ui, "Image").is_none());
        assert!(core.state().last_error.is_none());
    }

    #[test]
    fn session_token_and_logout() {
        let mut core = core();
        let ui = send(&mut core, json!({ "action": "session_start", "token": "abc" }));
        assert!(button(&ui, "logout").is_some());
        assert_eq!(core.state().session_token.as_deref(), Some("abc"));

        let ui = send(&mut core, json!({ "action": "logout" }));
        assert_eq!(effects(&ui)[0]["type"], "Navigate");
        assert_eq!(effects(&ui)[0]["url"], "/");
        assert!(core.state().session_token.is_none());
        assert!(button(&ui, "logout").is_none());
    }

    #[test]
    fn clear_form_resets_everything_and_restores_dates() {
        let mut core = core();
        send(
            &mut core,
            json!({ "action": "field_change", "bindings": { "jobName": "X", "dateOrdered": "2020-01-01", "labor": "5" } }),
        );
        let ui = send(&mut core, json!({ "action": "clear_form" }));
        assert_eq!(input_value(&ui, "jobName"), "");
        assert_eq!(input_value(&ui, "labor"), "");
        assert_eq!(input_value(&ui, "dateOrdered"), "2026-10-18");
    }
}
