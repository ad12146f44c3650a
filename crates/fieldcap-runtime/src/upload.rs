//! Upload orchestration
//!
//! Runs a frozen [`UploadBatch`] through capture, encoding and submission one
//! item at a time. The rendering surface is shared, so items never overlap.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use fieldcap_composite::constants::UPLOAD_MAX_WIDTH;
use fieldcap_composite::render::to_data_url;
use fieldcap_composite::{
    CanvasSize, CompositeConfig, CompositeSurface, EncodeOptions, EncodedComposite, Scene,
    encode_for_upload,
};
use fieldcap_forms::{
    EditMode, FieldValues, FormError, SessionStore, UploadBatch, WorkItem, current_token,
    upload_filename,
};

use crate::api::{
    PhotoUpload, PhotoUploadResponse, RemoteApi, SingleUploadRequest, UploadRecordRequest,
    UploadedItem,
};
use crate::types::{Result, RuntimeError};

/// Where and how composites are produced
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Canvas the composites are rendered at
    pub canvas: CanvasSize,
    /// Scratch directory for captured rasters
    pub work_dir: PathBuf,
    /// Keep a local copy of every composite here
    pub save_dir: Option<PathBuf>,
    pub encode: EncodeOptions,
}

impl UploadOptions {
    pub fn new(canvas: CanvasSize, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            canvas,
            work_dir: work_dir.into(),
            save_dir: None,
            encode: EncodeOptions::default(),
        }
    }
}

/// Notifications emitted while a batch runs
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// Emitted after every item, whether it succeeded or not
    Progress {
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
    /// No usable token; the user has to sign in again
    LoginRequired,
}

/// Outcome of a finished batch; progress is reported through [`UploadEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Completed,
    PartiallyFailed,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemResult {
    Uploaded {
        index: usize,
        filename: String,
        image_url: String,
    },
    Failed {
        index: usize,
        reason: String,
    },
}

impl ItemResult {
    pub fn is_uploaded(&self) -> bool {
        matches!(self, ItemResult::Uploaded { .. })
    }
}

/// Outcome of the aggregate record call
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Recorded,
    /// Images are on the server but the batch is not indexed
    NotRecorded(String),
    /// Nothing was uploaded, so nothing was recorded
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub state: BatchState,
    pub total: usize,
    pub items: Vec<ItemResult>,
    pub record: RecordOutcome,
}

impl BatchReport {
    pub fn uploaded(&self) -> usize {
        self.items.iter().filter(|item| item.is_uploaded()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.uploaded()
    }

    /// One-line outcome for the user
    pub fn summary(&self) -> String {
        let uploaded = self.uploaded();
        match (&self.state, &self.record) {
            (BatchState::Failed, _) | (_, RecordOutcome::Skipped) => {
                "Upload failed: no image was uploaded".to_string()
            }
            (_, RecordOutcome::NotRecorded(reason)) => format!(
                "{uploaded} of {} image(s) uploaded but not recorded: {reason}",
                self.total
            ),
            (BatchState::PartiallyFailed, RecordOutcome::Recorded) => format!(
                "{uploaded} of {} image(s) uploaded and recorded; {} failed",
                self.total,
                self.failed()
            ),
            _ => format!("{uploaded} image(s) uploaded and recorded"),
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// `round(100 * completed / total)`
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 * 100.0 / total as f64).round() as u64).min(100) as u8
}

/// An item that made it to the server
struct Delivered {
    filename: String,
    image_url: String,
    thumbnail: String,
    response: PhotoUploadResponse,
}

pub struct UploadOrchestrator<A, S> {
    api: Arc<A>,
    store: Arc<S>,
    surface: CompositeSurface,
    config: CompositeConfig,
    options: UploadOptions,
}

impl<A: RemoteApi, S: SessionStore> UploadOrchestrator<A, S> {
    pub fn new(
        api: Arc<A>,
        store: Arc<S>,
        surface: CompositeSurface,
        config: CompositeConfig,
        options: UploadOptions,
    ) -> Self {
        Self {
            api,
            store,
            surface,
            config,
            options,
        }
    }

    pub fn surface(&self) -> &CompositeSurface {
        &self.surface
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Upload a batch.
    ///
    /// Returns `Err` only for pre-flight failures (no items, no token), before
    /// any network call. Everything after that ends up in the report.
    pub async fn upload<F>(&self, batch: &UploadBatch, mut on_event: F) -> Result<BatchReport>
    where
        F: FnMut(UploadEvent) + Send,
    {
        if batch.is_empty() {
            return Err(FormError::NoImages.into());
        }

        let Some(token) = current_token(self.store.as_ref()).await? else {
            log::warn!("Upload aborted: not signed in");
            on_event(UploadEvent::LoginRequired);
            return Err(RuntimeError::LoginRequired);
        };

        tokio::fs::create_dir_all(&self.options.work_dir).await?;
        log::info!(
            "Uploading {} image(s) for '{}' ({} mode)",
            batch.len(),
            batch.template.form_name,
            batch.mode
        );

        let report = match batch.mode {
            EditMode::Batch => self.upload_batch(batch, &token, &mut on_event).await,
            EditMode::Single => self.upload_single(batch, &token, &mut on_event).await,
        };

        log::info!("{}", report.summary());
        Ok(report)
    }

    async fn upload_batch<F>(&self, batch: &UploadBatch, token: &str, on_event: &mut F) -> BatchReport
    where
        F: FnMut(UploadEvent) + Send,
    {
        let total = batch.len();
        let mut results = Vec::with_capacity(total);
        let mut delivered: Vec<(usize, Delivered)> = Vec::new();

        for (index, item) in batch.items.iter().enumerate() {
            match self.deliver_item(batch, index, item, token).await {
                Ok(item) => {
                    on_event(UploadEvent::ItemUploaded {
                        index,
                        image_url: item.image_url.clone(),
                    });
                    results.push(ItemResult::Uploaded {
                        index,
                        filename: item.filename.clone(),
                        image_url: item.image_url.clone(),
                    });
                    delivered.push((index, item));
                }
                Err(e) => {
                    log::warn!("Image {} of {} failed: {}", index + 1, total, e);
                    let reason = e.to_string();
                    on_event(UploadEvent::ItemFailed {
                        index,
                        reason: reason.clone(),
                    });
                    results.push(ItemResult::Failed { index, reason });
                }
            }

            on_event(UploadEvent::Progress {
                completed: index + 1,
                total,
                percent: progress_percent(index + 1, total),
            });
        }

        let state = terminal_state(delivered.len(), total);
        let representative = delivered.first().map(|(index, _)| *index);
        let record = match representative {
            None => RecordOutcome::Skipped,
            Some(first) => {
                // The first delivered item stands for the whole batch
                let data = batch.items[first].snapshot().clone();
                let request = UploadRecordRequest {
                    form_name: batch.template.form_name.clone(),
                    form_id: batch.template.id.clone(),
                    data,
                    image_urls: delivered.iter().map(|(_, d)| d.image_url.clone()).collect(),
                    image_count: total,
                    thumbnails: delivered.iter().map(|(_, d)| d.thumbnail.clone()).collect(),
                    uploaded_items: delivered
                        .into_iter()
                        .map(|(_, d)| UploadedItem {
                            filename: d.filename,
                            server_response: d.response,
                        })
                        .collect(),
                };

                match self.api.record_upload(token, &request).await {
                    Ok(()) => RecordOutcome::Recorded,
                    Err(e) => {
                        log::error!("Images uploaded but not recorded: {}", e);
                        RecordOutcome::NotRecorded(e.to_string())
                    }
                }
            }
        };

        BatchReport {
            state,
            total,
            items: results,
            record,
        }
    }

    /// The single flow sends one downscaled composite; the server records it
    /// in the same call.
    async fn upload_single<F>(&self, batch: &UploadBatch, token: &str, on_event: &mut F) -> BatchReport
    where
        F: FnMut(UploadEvent) + Send,
    {
        let item = &batch.items[0];
        let encode = EncodeOptions {
            upload_max_width: Some(self.options.encode.upload_max_width.unwrap_or(UPLOAD_MAX_WIDTH)),
            ..self.options.encode
        };

        let result = async {
            let encoded = self
                .compose(0, item, &batch.template.fields, &encode)
                .await?;
            let filename = format!(
                "{}_{}.jpg",
                batch.template.form_name,
                Utc::now().timestamp_millis()
            );
            let request = SingleUploadRequest {
                form_id: batch.template.id.clone(),
                form_name: batch.template.form_name.clone(),
                total_image_count: 1,
                representative_data: item.snapshot().clone(),
                images: vec![PhotoUpload {
                    filename: filename.clone(),
                    base64_image: to_data_url(&encoded.image_jpeg),
                    thumbnail: to_data_url(&encoded.thumbnail_jpeg),
                    form_id: None,
                    form_name: None,
                    image_count: 1,
                    field_data: item.snapshot().clone(),
                }],
            };
            let response = self.api.upload_single(token, &request).await?;
            let image_url = response.image_url.clone().unwrap_or_else(|| filename.clone());
            Ok::<_, RuntimeError>((filename, image_url))
        }
        .await;

        let (items, state, record) = match result {
            Ok((filename, image_url)) => {
                on_event(UploadEvent::ItemUploaded {
                    index: 0,
                    image_url: image_url.clone(),
                });
                (
                    vec![ItemResult::Uploaded {
                        index: 0,
                        filename,
                        image_url,
                    }],
                    BatchState::Completed,
                    RecordOutcome::Recorded,
                )
            }
            Err(e) => {
                log::warn!("Single upload failed: {}", e);
                let reason = e.to_string();
                on_event(UploadEvent::ItemFailed {
                    index: 0,
                    reason: reason.clone(),
                });
                (
                    vec![ItemResult::Failed { index: 0, reason }],
                    BatchState::Failed,
                    RecordOutcome::Skipped,
                )
            }
        };

        on_event(UploadEvent::Progress {
            completed: 1,
            total: 1,
            percent: 100,
        });

        BatchReport {
            state,
            total: 1,
            items,
            record,
        }
    }

    async fn deliver_item(
        &self,
        batch: &UploadBatch,
        index: usize,
        item: &WorkItem,
        token: &str,
    ) -> Result<Delivered> {
        let encoded = self
            .compose(index, item, &batch.template.fields, &self.options.encode)
            .await?;

        let filename = upload_filename(
            &batch.template,
            item.snapshot(),
            index,
            Utc::now().timestamp_millis(),
        );
        let thumbnail = to_data_url(&encoded.thumbnail_jpeg);
        let photo = PhotoUpload {
            filename: filename.clone(),
            base64_image: to_data_url(&encoded.image_jpeg),
            thumbnail: thumbnail.clone(),
            form_id: Some(batch.template.id.clone()),
            form_name: Some(batch.template.form_name.clone()),
            image_count: batch.len(),
            field_data: item.snapshot().clone(),
        };

        let response = self.api.upload_photo(token, &photo).await?;
        let image_url = response
            .image_url
            .clone()
            .unwrap_or_else(|| filename.clone());
        log::debug!("Uploaded {} as {}", filename, image_url);

        Ok(Delivered {
            filename,
            image_url,
            thumbnail,
            response,
        })
    }

    /// Render, capture and encode one item
    async fn compose(
        &self,
        index: usize,
        item: &WorkItem,
        fields: &[String],
        encode: &EncodeOptions,
    ) -> Result<EncodedComposite> {
        let scene = scene_for(item, fields, &self.config, self.options.canvas);
        let generation = self.surface.commit(scene);
        self.surface.rendered(generation).await?;

        let captured = self.surface.capture(&self.options.work_dir).await?;
        let bytes = tokio::fs::read(&captured).await?;
        if let Err(e) = tokio::fs::remove_file(&captured).await {
            log::debug!("Could not remove {}: {}", captured.display(), e);
        }

        if let Some(save_dir) = &self.options.save_dir {
            if let Err(e) = save_local_copy(save_dir, index, &bytes).await {
                log::warn!("Could not keep a local copy of image {}: {}", index + 1, e);
            }
        }

        let encode = *encode;
        let encoded = tokio::task::spawn_blocking(move || encode_for_upload(&bytes, &encode)).await??;
        Ok(encoded)
    }
}

fn terminal_state(delivered: usize, total: usize) -> BatchState {
    if delivered == total {
        BatchState::Completed
    } else if delivered == 0 {
        BatchState::Failed
    } else {
        BatchState::PartiallyFailed
    }
}

/// Scene for one work item; rows follow `fields`, values come from the snapshot
pub fn scene_for(
    item: &WorkItem,
    fields: &[String],
    config: &CompositeConfig,
    canvas: CanvasSize,
) -> Scene {
    let values: &FieldValues = item.snapshot();
    Scene::new(
        item.source(),
        item.rotation(),
        canvas,
        fields,
        |field| values.get(field),
        &config.table,
    )
}

async fn save_local_copy(dir: &Path, index: usize, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!(
        "composite_{}_{}.jpg",
        index + 1,
        Utc::now().timestamp_millis()
    ));
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent_rounds() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(3, 3), 100);
        assert_eq!(progress_percent(0, 0), 0);
    }

    #[test]
    fn test_terminal_state() {
        assert_eq!(terminal_state(3, 3), BatchState::Completed);
        assert_eq!(terminal_state(2, 3), BatchState::PartiallyFailed);
        assert_eq!(terminal_state(0, 3), BatchState::Failed);
        assert_eq!(terminal_state(1, 1), BatchState::Completed);
    }

    #[test]
    fn test_summary_names_unrecorded_uploads() {
        let report = BatchReport {
            state: BatchState::Completed,
            total: 2,
            items: vec![
                ItemResult::Uploaded {
                    index: 0,
                    filename: "a.jpg".into(),
                    image_url: "u/a".into(),
                },
                ItemResult::Uploaded {
                    index: 1,
                    filename: "b.jpg".into(),
                    image_url: "u/b".into(),
                },
            ],
            record: RecordOutcome::NotRecorded("db down".into()),
        };
        assert_eq!(
            report.summary(),
            "2 of 2 image(s) uploaded but not recorded: db down"
        );
    }
}
