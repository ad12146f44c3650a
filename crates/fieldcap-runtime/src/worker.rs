//! Background worker hosting one form session
//!
//! Commands are handled strictly in arrival order. The only exception is a
//! run of consecutive layout requests, which collapses into the newest one.

use std::sync::Arc;

use chrono::Local;
use fieldcap_composite::{CanvasSize, CompositeConfig, compute_table_layout};
use fieldcap_forms::{FormError, FormSession, FormTemplate, SessionStore, current_token};
use tokio::sync::mpsc;

use crate::api::{LoginRequest, RemoteApi, fetch_active_forms};
use crate::history::group_by_date;
use crate::types::{Result, RuntimeError};
use crate::upload::{BatchState, UploadEvent, UploadOrchestrator};
use crate::{SiteCommand, SiteUpdate, auth};

/// State owned by the worker task
pub struct SiteWorker<A, S> {
    api: Arc<A>,
    session: FormSession<S>,
    orchestrator: UploadOrchestrator<A, S>,
    config: CompositeConfig,
    forms: Vec<FormTemplate>,
}

impl<A: RemoteApi, S: SessionStore> SiteWorker<A, S> {
    pub fn new(
        api: Arc<A>,
        session: FormSession<S>,
        orchestrator: UploadOrchestrator<A, S>,
        config: CompositeConfig,
    ) -> Self {
        Self {
            api,
            session,
            orchestrator,
            config,
            forms: Vec::new(),
        }
    }

    pub fn session(&self) -> &FormSession<S> {
        &self.session
    }

    /// Templates from the last successful fetch
    pub fn forms(&self) -> &[FormTemplate] {
        &self.forms
    }

    fn store(&self) -> &S {
        self.session.store().as_ref()
    }

    async fn require_token(&self) -> Result<String> {
        current_token(self.store())
            .await?
            .ok_or(RuntimeError::LoginRequired)
    }

    fn session_changed(&self) -> SiteUpdate {
        SiteUpdate::SessionChanged {
            form_name: self.session.template().map(|t| t.form_name.clone()),
            values: self.session.values().clone(),
        }
    }

    fn queue_changed(&self) -> SiteUpdate {
        let queue = self.session.queue();
        SiteUpdate::QueueChanged {
            len: queue.len(),
            selected: queue.selected(),
        }
    }
}

/// Async worker task that processes site commands and sends updates
pub async fn worker_task<A, S>(
    mut worker: SiteWorker<A, S>,
    mut command_rx: mpsc::UnboundedReceiver<SiteCommand>,
    update_tx: mpsc::UnboundedSender<SiteUpdate>,
) where
    A: RemoteApi,
    S: SessionStore,
{
    while let Some(cmd) = command_rx.recv().await {
        process_command(cmd, &mut worker, &mut command_rx, &update_tx).await;
    }
    log::debug!("Command channel closed, worker exiting");
}

async fn process_command<A, S>(
    cmd: SiteCommand,
    worker: &mut SiteWorker<A, S>,
    command_rx: &mut mpsc::UnboundedReceiver<SiteCommand>,
    update_tx: &mpsc::UnboundedSender<SiteUpdate>,
) where
    A: RemoteApi,
    S: SessionStore,
{
    if let SiteCommand::RecomputeLayout { mut canvas } = cmd {
        // Collapse queued layout requests, stopping at the first other command
        let mut next = None;
        while let Ok(next_cmd) = command_rx.try_recv() {
            if let SiteCommand::RecomputeLayout { canvas: newer } = next_cmd {
                log::debug!("Discarding queued layout request, using newer canvas");
                canvas = newer;
            } else {
                next = Some(next_cmd);
                break;
            }
        }

        handle_layout(worker, canvas, update_tx);

        if let Some(next_cmd) = next {
            Box::pin(process_command(next_cmd, worker, command_rx, update_tx)).await;
        }
        return;
    }

    if let Err(e) = handle_command(cmd, worker, update_tx).await {
        send_error(e, update_tx);
    }
}

async fn handle_command<A, S>(
    cmd: SiteCommand,
    worker: &mut SiteWorker<A, S>,
    update_tx: &mpsc::UnboundedSender<SiteUpdate>,
) -> Result<()>
where
    A: RemoteApi,
    S: SessionStore,
{
    match cmd {
        SiteCommand::Login {
            username,
            password,
            company_id,
        } => {
            let request = LoginRequest {
                username,
                password,
                company_id,
            };
            let user = auth::login(worker.api.as_ref(), worker.store(), &request).await?;
            let _ = update_tx.send(SiteUpdate::LoggedIn { user });
        }
        SiteCommand::Logout => {
            auth::logout(worker.store()).await?;
            worker.forms.clear();
            let _ = update_tx.send(SiteUpdate::LoggedOut);
        }
        SiteCommand::FetchForms => {
            let token = worker.require_token().await?;
            worker.forms = fetch_active_forms(worker.api.as_ref(), &token).await?;
            log::info!("Loaded {} active form(s)", worker.forms.len());
            let _ = update_tx.send(SiteUpdate::FormsLoaded {
                forms: worker.forms.clone(),
            });
        }
        SiteCommand::SelectForm { form_id } => {
            let template = worker
                .forms
                .iter()
                .find(|t| t.id == form_id)
                .cloned()
                .ok_or_else(|| RuntimeError::UnknownForm(form_id))?;
            worker.session.select_template(template).await?;
            let _ = update_tx.send(worker.session_changed());
            let _ = update_tx.send(worker.queue_changed());
        }
        SiteCommand::UpdateField { field, value } => {
            worker.session.update_field(&field, &value)?;
            let _ = update_tx.send(worker.session_changed());
        }
        SiteCommand::SetDate { field, date } => {
            worker.session.set_date(&field, date)?;
            let _ = update_tx.send(worker.session_changed());
        }
        SiteCommand::Validate => {
            let valid = worker.session.validate().await?;
            let _ = update_tx.send(SiteUpdate::Validated {
                valid,
                invalid_fields: worker.session.validation().invalid_fields().to_vec(),
            });
        }
        SiteCommand::Restore => {
            let restored = worker.session.restore().await?;
            let _ = update_tx.send(SiteUpdate::Restored { restored });
            if restored {
                let _ = update_tx.send(worker.session_changed());
                let _ = update_tx.send(worker.queue_changed());
            }
        }
        SiteCommand::SetMode { mode } => {
            worker.session.set_mode(mode).await?;
            let _ = update_tx.send(worker.queue_changed());
        }
        SiteCommand::AddImages { paths } => {
            let result = worker.session.add_images(paths).await;
            if let Err(FormError::MissingFields(_)) = &result {
                let _ = update_tx.send(SiteUpdate::Validated {
                    valid: false,
                    invalid_fields: worker.session.validation().invalid_fields().to_vec(),
                });
            }
            result?;
            let _ = update_tx.send(worker.queue_changed());
        }
        SiteCommand::SelectItem { index } => {
            worker.session.select_item(index)?;
            let _ = update_tx.send(worker.session_changed());
            let _ = update_tx.send(worker.queue_changed());
        }
        SiteCommand::SaveSelected => {
            worker.session.save_selected()?;
        }
        SiteCommand::RotateSelected => {
            let rotation = worker.session.rotate_selected()?;
            log::debug!("Selected photo rotated to {} degrees", rotation.degrees());
            let _ = update_tx.send(worker.queue_changed());
        }
        SiteCommand::RemoveItem { index } => {
            worker.session.remove_item(index)?;
            let _ = update_tx.send(worker.queue_changed());
        }
        SiteCommand::RecomputeLayout { canvas } => {
            handle_layout(worker, canvas, update_tx);
        }
        SiteCommand::Upload => {
            handle_upload(worker, update_tx).await?;
        }
        SiteCommand::FetchHistory => {
            let token = worker.require_token().await?;
            let entries = worker.api.fetch_history(&token).await?;
            let groups = group_by_date(entries, &Local);
            let _ = update_tx.send(SiteUpdate::HistoryLoaded { groups });
        }
    }
    Ok(())
}

fn handle_layout<A, S>(
    worker: &SiteWorker<A, S>,
    canvas: CanvasSize,
    update_tx: &mpsc::UnboundedSender<SiteUpdate>,
) where
    A: RemoteApi,
    S: SessionStore,
{
    let Some(template) = worker.session.template() else {
        send_error(FormError::NoTemplate.into(), update_tx);
        return;
    };
    let values = worker.session.values();
    let layout = compute_table_layout(
        canvas,
        template.fields.as_slice(),
        |field| values.get(field),
        &worker.config.table,
    );
    let _ = update_tx.send(SiteUpdate::LayoutComputed { layout });
}

async fn handle_upload<A, S>(
    worker: &mut SiteWorker<A, S>,
    update_tx: &mpsc::UnboundedSender<SiteUpdate>,
) -> Result<()>
where
    A: RemoteApi,
    S: SessionStore,
{
    let batch = worker.session.freeze().await?;

    let result = worker
        .orchestrator
        .upload(&batch, |event| {
            let update = match event {
                UploadEvent::Progress {
                    completed,
                    total,
                    percent,
                } => SiteUpdate::UploadProgress {
                    completed,
                    total,
                    percent,
                },
                UploadEvent::ItemUploaded { index, image_url } => {
                    SiteUpdate::ItemUploaded { index, image_url }
                }
                UploadEvent::ItemFailed { index, reason } => {
                    SiteUpdate::ItemFailed { index, reason }
                }
                UploadEvent::LoginRequired => SiteUpdate::LoginRequired,
            };
            let _ = update_tx.send(update);
        })
        .await;

    worker.session.thaw();

    // LoginRequired was already announced through the event sink
    let report = match result {
        Ok(report) => report,
        Err(RuntimeError::LoginRequired) => return Ok(()),
        Err(e) => return Err(e),
    };

    if report.state == BatchState::Completed {
        worker.session.clear_queue()?;
        let _ = update_tx.send(worker.queue_changed());
    }
    let _ = update_tx.send(SiteUpdate::UploadFinished { report });
    Ok(())
}

fn send_error(error: RuntimeError, update_tx: &mpsc::UnboundedSender<SiteUpdate>) {
    if let RuntimeError::LoginRequired = error {
        let _ = update_tx.send(SiteUpdate::LoginRequired);
        return;
    }
    log::warn!("{}", error);
    let _ = update_tx.send(SiteUpdate::Error {
        message: error.to_string(),
    });
}
