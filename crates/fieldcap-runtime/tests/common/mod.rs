#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use fieldcap_composite::{CanvasSize, CompositeConfig, CompositeSurface};
use fieldcap_forms::{EditMode, FormSession, FormTemplate, MemoryStore, UserRecord, save_user};
use fieldcap_runtime::api::{
    LoginResponse, LoginUser, PhotoUpload, PhotoUploadResponse, SingleUploadRequest,
    UploadRecordRequest,
};
use fieldcap_runtime::{
    HistoryEntry, LoginRequest, RemoteApi, Result, RuntimeError, UploadOptions,
    UploadOrchestrator,
};
use image::{Rgb, RgbImage};

/// Everything the fake server was asked to do
#[derive(Default)]
pub struct Calls {
    pub logins: usize,
    pub photos: Vec<PhotoUpload>,
    pub singles: Vec<SingleUploadRequest>,
    pub records: Vec<UploadRecordRequest>,
    pub history: usize,
}

/// In-memory stand-in for the backend
#[derive(Default)]
pub struct FakeApi {
    pub calls: Mutex<Calls>,
    /// 1-based photo upload calls that fail
    pub failing_photos: Vec<usize>,
    pub record_fails: bool,
    pub forms: Vec<FormTemplate>,
    pub history: Vec<HistoryEntry>,
    pub login: Option<LoginResponse>,
}

impl FakeApi {
    pub fn total_calls(&self) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.logins + calls.photos.len() + calls.singles.len() + calls.records.len() + calls.history
    }
}

impl RemoteApi for FakeApi {
    async fn login(&self, _request: &LoginRequest) -> Result<LoginResponse> {
        self.calls.lock().unwrap().logins += 1;
        self.login
            .clone()
            .ok_or_else(|| RuntimeError::Rejected("Invalid credentials".into()))
    }

    async fn fetch_forms(&self, _token: &str) -> Result<Vec<FormTemplate>> {
        Ok(self.forms.clone())
    }

    async fn upload_photo(&self, _token: &str, photo: &PhotoUpload) -> Result<PhotoUploadResponse> {
        let mut calls = self.calls.lock().unwrap();
        calls.photos.push(photo.clone());
        let ordinal = calls.photos.len();
        if self.failing_photos.contains(&ordinal) {
            return Err(RuntimeError::Rejected(format!("upload {ordinal} refused")));
        }
        Ok(PhotoUploadResponse {
            success: true,
            image_url: Some(format!("https://cdn.test/{ordinal}.jpg")),
            error: None,
        })
    }

    async fn upload_single(
        &self,
        _token: &str,
        request: &SingleUploadRequest,
    ) -> Result<PhotoUploadResponse> {
        self.calls.lock().unwrap().singles.push(request.clone());
        Ok(PhotoUploadResponse {
            success: true,
            image_url: Some("https://cdn.test/single.jpg".into()),
            error: None,
        })
    }

    async fn record_upload(&self, _token: &str, record: &UploadRecordRequest) -> Result<()> {
        self.calls.lock().unwrap().records.push(record.clone());
        if self.record_fails {
            return Err(RuntimeError::Rejected("database unavailable".into()));
        }
        Ok(())
    }

    async fn fetch_history(&self, _token: &str) -> Result<Vec<HistoryEntry>> {
        self.calls.lock().unwrap().history += 1;
        Ok(self.history.clone())
    }
}

pub fn canvas() -> CanvasSize {
    CanvasSize::new(120, 160)
}

pub fn template() -> FormTemplate {
    FormTemplate {
        id: "form-1".into(),
        form_name: "골조검측".into(),
        fields: vec!["공사일".into(), "위치".into(), "공종".into()],
        ..Default::default()
    }
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub fn active_user() -> LoginUser {
    LoginUser {
        id: "u1".into(),
        username: "kim".into(),
        name: Some("김현장".into()),
        role: Some("worker".into()),
        company_id: Some("c1".into()),
        is_active: Some(true),
    }
}

pub async fn signed_in_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let user = UserRecord {
        id: "u1".into(),
        username: "kim".into(),
        token: Some("tok".into()),
        ..Default::default()
    };
    save_user(store.as_ref(), &user).await.unwrap();
    store
}

/// Write `count` solid-color photos into `dir`
pub fn write_photos(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("photo_{i}.png"));
            RgbImage::from_pixel(60, 80, Rgb([40 * i as u8, 120, 200]))
                .save(&path)
                .unwrap();
            path
        })
        .collect()
}

/// A session with the test template selected and every field filled in
pub async fn filled_session(store: Arc<MemoryStore>, mode: EditMode) -> FormSession<MemoryStore> {
    let mut session = FormSession::new(store, mode);
    session.select_template_at(template(), today()).await.unwrap();
    session.update_field("위치", "3-401").unwrap();
    session.update_field("공종", "철근").unwrap();
    session
}

pub fn mounted_surface() -> CompositeSurface {
    let surface = CompositeSurface::new(None, 90);
    surface.mount();
    surface
}

pub fn orchestrator(
    api: Arc<FakeApi>,
    store: Arc<MemoryStore>,
    work_dir: &Path,
) -> UploadOrchestrator<FakeApi, MemoryStore> {
    UploadOrchestrator::new(
        api,
        store,
        mounted_surface(),
        CompositeConfig::default(),
        UploadOptions::new(canvas(), work_dir),
    )
}
