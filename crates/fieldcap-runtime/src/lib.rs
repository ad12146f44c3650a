pub mod api;
pub mod auth;
mod history;
mod types;
pub mod upload;
mod worker;

use std::path::PathBuf;

use chrono::NaiveDate;

pub use api::{ApiConfig, DEFAULT_BASE_URL, HistoryEntry, HttpApi, LoginRequest, RemoteApi};
pub use history::{HistoryGroup, group_by_date};
pub use types::*;
pub use upload::{
    BatchReport, BatchState, ItemResult, RecordOutcome, UploadEvent, UploadOptions,
    UploadOrchestrator,
};
pub use worker::{SiteWorker, worker_task};

// Re-export types the commands and updates carry
pub use fieldcap_composite::{CanvasSize, TableLayout};
pub use fieldcap_forms::{EditMode, FieldValues, FormTemplate, UserRecord};

/// Commands sent from the front end to the worker
#[derive(Debug)]
pub enum SiteCommand {
    Login {
        username: String,
        password: String,
        company_id: String,
    },
    Logout,
    FetchForms,
    SelectForm {
        form_id: String,
    },
    UpdateField {
        field: String,
        value: String,
    },
    SetDate {
        field: String,
        date: NaiveDate,
    },
    Validate,
    Restore,
    SetMode {
        mode: EditMode,
    },
    AddImages {
        paths: Vec<PathBuf>,
    },
    SelectItem {
        index: usize,
    },
    SaveSelected,
    RotateSelected,
    RemoveItem {
        index: usize,
    },
    /// Recompute the table geometry for the current values.
    /// Consecutive requests collapse into the last one.
    RecomputeLayout {
        canvas: CanvasSize,
    },
    Upload,
    FetchHistory,
}

/// Updates sent from the worker to the front end
#[derive(Debug, Clone)]
pub enum SiteUpdate {
    LoggedIn {
        user: UserRecord,
    },
    LoggedOut,
    FormsLoaded {
        forms: Vec<FormTemplate>,
    },
    /// The edit buffer changed
    SessionChanged {
        form_name: Option<String>,
        values: FieldValues,
    },
    Validated {
        valid: bool,
        invalid_fields: Vec<String>,
    },
    Restored {
        restored: bool,
    },
    QueueChanged {
        len: usize,
        selected: Option<usize>,
    },
    LayoutComputed {
        layout: TableLayout,
    },
    UploadProgress {
        completed: usize,
        total: usize,
        percent: u8,
    },
    ItemUploaded {
        index: usize,
        image_url: String,
    },
    ItemFailed {
        index: usize,
        reason: String,
    },
    LoginRequired,
    UploadFinished {
        report: BatchReport,
    },
    HistoryLoaded {
        groups: Vec<HistoryGroup>,
    },
    Error {
        message: String,
    },
}
