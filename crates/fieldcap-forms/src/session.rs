//! The active editing session
//!
//! Owns the selected template, the edit buffer of field values, validation
//! flags and (in batch mode) the queued work items. Template choice and
//! values are mirrored into the [`SessionStore`] so an interrupted session can
//! be restored.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use fieldcap_composite::Rotation;

use crate::store::{self, SessionStore};
use crate::template::{FieldKind, FormTemplate, normalize_unit};
use crate::types::{EditMode, FieldValues, FormError, Result, ValidationState};
use crate::work::{WorkItem, WorkQueue};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Everything an upload needs, detached from the session
#[derive(Debug, Clone)]
pub struct UploadBatch {
    pub template: FormTemplate,
    pub mode: EditMode,
    pub items: Vec<WorkItem>,
}

impl UploadBatch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct FormSession<S> {
    store: Arc<S>,
    mode: EditMode,
    template: Option<FormTemplate>,
    values: FieldValues,
    validation: ValidationState,
    queue: WorkQueue,
    in_flight: bool,
}

impl<S: SessionStore> FormSession<S> {
    pub fn new(store: Arc<S>, mode: EditMode) -> Self {
        Self {
            store,
            mode,
            template: None,
            values: FieldValues::new(),
            validation: ValidationState::default(),
            queue: WorkQueue::new(),
            in_flight: false,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn template(&self) -> Option<&FormTemplate> {
        self.template.as_ref()
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn validation(&self) -> &ValidationState {
        &self.validation
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// True between [`FormSession::freeze`] and [`FormSession::thaw`]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Switch editing flow. Queued photos are dropped.
    pub async fn set_mode(&mut self, mode: EditMode) -> Result<()> {
        self.ensure_editable()?;
        if mode != self.mode {
            self.queue.clear();
        }
        self.mode = mode;
        store::save_mode(self.store.as_ref(), mode).await
    }

    // =========================================================================
    // Template and Values
    // =========================================================================

    /// Select a template, dated today in local time
    pub async fn select_template(&mut self, template: FormTemplate) -> Result<()> {
        self.select_template_at(template, Local::now().date_naive()).await
    }

    /// Select a template. Date fields start at `today`, all others empty.
    /// Validation flags and queued photos are reset.
    pub async fn select_template_at(&mut self, template: FormTemplate, today: NaiveDate) -> Result<()> {
        self.ensure_editable()?;

        let today = today.format(DATE_FORMAT).to_string();
        self.values = template
            .fields
            .iter()
            .map(|field| match template.field_kind(field) {
                FieldKind::Date => (field.clone(), today.clone()),
                _ => (field.clone(), String::new()),
            })
            .collect();
        self.validation.clear();
        self.queue.clear();

        log::info!(
            "Selected form '{}' ({} fields)",
            template.form_name,
            template.fields.len()
        );

        store::save_mode(self.store.as_ref(), self.mode).await?;
        store::save_session(self.store.as_ref(), &template, &self.values).await?;
        self.template = Some(template);
        Ok(())
    }

    /// Set a field value, applying unit shorthand normalization, and clear
    /// the field's validation flag
    pub fn update_field(&mut self, field: &str, value: &str) -> Result<()> {
        self.ensure_editable()?;
        let template = self.template.as_ref().ok_or(FormError::NoTemplate)?;
        if !template.has_field(field) {
            return Err(FormError::UnknownField(field.to_string()));
        }

        let value = if template.normalizes_unit(field) {
            normalize_unit(value).unwrap_or_else(|| value.to_string())
        } else {
            value.to_string()
        };

        self.values.set(field, value);
        self.validation.clear_field(field);
        Ok(())
    }

    /// Set a field to a calendar date (`YYYY-MM-DD`)
    pub fn set_date(&mut self, field: &str, date: NaiveDate) -> Result<()> {
        self.update_field(field, &date.format(DATE_FORMAT).to_string())
    }

    /// Recompute validation flags and persist the session either way.
    ///
    /// Returns whether every field has a non-blank value.
    pub async fn validate(&mut self) -> Result<bool> {
        let template = self.template.as_ref().ok_or(FormError::NoTemplate)?;
        self.validation = ValidationState::check(template, &self.values);
        store::save_session(self.store.as_ref(), template, &self.values).await?;
        Ok(self.validation.is_valid())
    }

    /// Restore the last template and values when the stored mode matches ours.
    ///
    /// Returns whether anything was restored. Unreadable stored state is
    /// ignored.
    pub async fn restore(&mut self) -> Result<bool> {
        self.ensure_editable()?;

        match store::load_mode(self.store.as_ref()).await {
            Ok(Some(stored)) if stored != self.mode => {
                log::debug!("Not restoring: stored mode {} differs from {}", stored, self.mode);
                return Ok(false);
            }
            Ok(_) => {}
            Err(e) => log::warn!("Could not read stored mode: {}", e),
        }

        let (template, values) = match store::load_session(self.store.as_ref()).await {
            Ok(Some(session)) => session,
            Ok(None) => return Ok(false),
            Err(e) => {
                log::warn!("Discarding unreadable stored session: {}", e);
                return Ok(false);
            }
        };

        self.values = values.conform_to(&template.fields);
        self.validation.clear();
        self.queue.clear();
        log::info!("Restored form '{}'", template.form_name);
        self.template = Some(template);
        Ok(true)
    }

    // =========================================================================
    // Work Items
    // =========================================================================

    /// Queue photos with a snapshot of the current values.
    ///
    /// The values must validate first. In single mode only the last photo is
    /// kept. Returns the number of photos now queued.
    pub async fn add_images<I, P>(&mut self, sources: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.ensure_editable()?;
        self.require_valid().await?;

        match self.mode {
            EditMode::Single => {
                if let Some(last) = sources.into_iter().last() {
                    self.queue.clear();
                    self.queue.add_images([last], &self.values);
                }
            }
            EditMode::Batch => {
                self.queue.add_images(sources, &self.values);
            }
        }
        Ok(self.queue.len())
    }

    /// Select a work item and load its snapshot into the edit buffer
    pub fn select_item(&mut self, index: usize) -> Result<()> {
        self.ensure_editable()?;
        let snapshot = self.queue.select(index)?;
        self.values = match &self.template {
            Some(template) => snapshot.conform_to(&template.fields),
            None => snapshot.clone(),
        };
        self.validation.clear();
        Ok(())
    }

    /// Store the edit buffer as the selected item's snapshot
    pub fn save_selected(&mut self) -> Result<()> {
        self.ensure_editable()?;
        self.queue.save_selected(&self.values)
    }

    pub fn rotate_selected(&mut self) -> Result<Rotation> {
        self.ensure_editable()?;
        self.queue.rotate_selected()
    }

    pub fn remove_item(&mut self, index: usize) -> Result<()> {
        self.ensure_editable()?;
        self.queue.remove(index)?;
        Ok(())
    }

    /// Drop every queued photo
    pub fn clear_queue(&mut self) -> Result<()> {
        self.ensure_editable()?;
        self.queue.clear();
        Ok(())
    }

    // =========================================================================
    // Upload Lifecycle
    // =========================================================================

    /// Hand out the queued work for upload and lock the session.
    ///
    /// Fails without locking when no template is selected, nothing is queued
    /// or the current values do not validate. Until [`FormSession::thaw`]
    /// every edit returns [`FormError::UploadInProgress`].
    pub async fn freeze(&mut self) -> Result<UploadBatch> {
        self.ensure_editable()?;
        let template = self.template.clone().ok_or(FormError::NoTemplate)?;
        if self.queue.is_empty() {
            return Err(FormError::NoImages);
        }
        self.require_valid().await?;

        let items = match self.mode {
            // The single flow uploads whatever is in the editor
            EditMode::Single => self
                .queue
                .items()
                .iter()
                .map(|item| WorkItem::new(item.asset.clone(), self.values.clone()))
                .collect(),
            EditMode::Batch => self.queue.items().to_vec(),
        };

        self.in_flight = true;
        log::debug!("Session frozen for upload of {} item(s)", self.queue.len());
        Ok(UploadBatch {
            template,
            mode: self.mode,
            items,
        })
    }

    /// Unlock the session after an upload finished
    pub fn thaw(&mut self) {
        self.in_flight = false;
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.in_flight {
            return Err(FormError::UploadInProgress);
        }
        Ok(())
    }

    async fn require_valid(&mut self) -> Result<()> {
        if self.validate().await? {
            Ok(())
        } else {
            Err(FormError::MissingFields(
                self.validation.invalid_fields().to_vec(),
            ))
        }
    }
}
