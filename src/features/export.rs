use crate::features::form::{DATE_ORDERED, JOB_NAME};
use crate::features::pdf::render_work_order_pdf;
use crate::state::{AppState, Effect};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use regex::Regex;
use std::sync::OnceLock;

pub const FILENAME_PREFIX: &str = "ASR_WorkOrder";
pub const DEFAULT_JOB_NAME: &str = "WorkOrder";

#[derive(Debug, Clone, Default)]
pub struct ExportState {
    /// An export is running; the trigger renders disabled.
    pub in_progress: bool,
    /// Controls hidden and inputs drawn as plain text.
    pub print_mode: bool,
}

impl ExportState {
    pub const fn new() -> Self {
        Self {
            in_progress: false,
            print_mode: false,
        }
    }

    fn begin(&mut self) {
        self.in_progress = true;
        self.print_mode = true;
    }

    fn restore(&mut self) {
        self.in_progress = false;
        self.print_mode = false;
    }
}

/// `ASR_WorkOrder_<job>_<date>.pdf`, whitespace runs in the job name
/// collapsed to `_`.
pub fn export_filename(job_name: &str, date_ordered: &str, today: &str) -> String {
    static WHITESPACE: OnceLock<Option<Regex>> = OnceLock::new();
    let job = if job_name.is_empty() {
        DEFAULT_JOB_NAME
    } else {
        job_name
    };
    let job = match WHITESPACE.get_or_init(|| Regex::new(r"\s+").ok()) {
        Some(re) => re.replace_all(job, "_").into_owned(),
        None => job.replace(' ', "_"),
    };
    let date = if date_ordered.is_empty() {
        today
    } else {
        date_ordered
    };
    format!("{FILENAME_PREFIX}_{job}_{date}.pdf")
}

/// Start an export unless one is already running. On success the host
/// receives a `SavePdf` effect and answers with `export_done` or
/// `export_failed`.
pub fn handle_export_start(state: &mut AppState, today: &str) {
    if state.export.in_progress {
        tracing::debug!("export already in progress");
        return;
    }
    state.export.begin();

    let filename = export_filename(
        state.form.get(JOB_NAME),
        state.form.get(DATE_ORDERED),
        today,
    );

    let signature = match state.signature.signature_png() {
        Some(Ok(png)) => Some(png),
        Some(Err(e)) => {
            handle_export_finished(state, Err(e));
            return;
        }
        None => None,
    };

    match render_work_order_pdf(&state.form, signature.as_deref(), state.photos.photos()) {
        Ok(bytes) => {
            tracing::info!(%filename, size = bytes.len(), "work order rendered");
            state.push_effect(Effect::SavePdf {
                filename,
                data: B64.encode(bytes),
            });
        }
        Err(e) => handle_export_finished(state, Err(e)),
    }
}

/// Completion from the host (or an early build failure). Controls are
/// restored on both paths.
pub fn handle_export_finished(state: &mut AppState, result: Result<(), String>) {
    if !state.export.in_progress {
        return;
    }
    state.export.restore();
    if let Err(e) = result {
        tracing::warn!(error = %e, "pdf export failed");
        state.alert(format!("Error generating PDF: {e}"));
        state.last_error = Some(format!("pdf_export_failed:{e}"));
    }
}
