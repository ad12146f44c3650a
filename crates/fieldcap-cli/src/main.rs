mod logger;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use fieldcap_composite::{
    CompositeConfig, CompositeSurface, EncodeOptions, Rotation, Scene, canvas_dims,
    compute_table_layout, image_placement, load_font, table_bounds,
};
use fieldcap_forms::{EditMode, FormSession, JsonFileStore, current_token, load_user};
use fieldcap_runtime::api::fetch_active_forms;
use fieldcap_runtime::{
    ApiConfig, BatchState, DEFAULT_BASE_URL, HttpApi, LoginRequest, RemoteApi, SiteCommand,
    SiteUpdate, SiteWorker, UploadOptions, UploadOrchestrator, auth, group_by_date, worker_task,
};
use log::{Level, LevelFilter};
use tokio::sync::mpsc;

use crate::logger::AppLogger;

#[derive(Parser)]
#[command(name = "fcap", about = "Field inspection photo capture", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Composite configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Session file holding the signed-in user and the last form
    #[arg(long, global = true, default_value = "fieldcap-session.json")]
    session: PathBuf,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the token
    Login {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        password: String,

        /// Company identifier
        #[arg(short, long)]
        company: String,
    },

    /// Forget the signed-in user
    Logout,

    /// List active forms
    Forms,

    /// Print the composite geometry for a viewport without rendering
    Layout {
        /// Viewport width in pixels
        #[arg(long, default_value = "390")]
        viewport: f32,

        /// Table row as name=value, in row order
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Render one composite to a local JPEG
    Compose {
        /// Source photo
        #[arg(short, long)]
        image: PathBuf,

        /// Output JPEG file
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value = "390")]
        viewport: f32,

        /// Clockwise rotation in degrees (0, 90, 180, 270)
        #[arg(long, default_value = "0")]
        rotate: i32,

        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Compose and upload photos for a form
    Upload {
        /// Form id (see `fcap forms`)
        #[arg(long)]
        form: String,

        /// Photos to upload
        #[arg(short, long, required = true, num_args = 1..)]
        image: Vec<PathBuf>,

        /// Field value as name=value; date fields default to today
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Upload one downscaled photo through the single-image flow
        #[arg(long)]
        single: bool,

        /// Keep a local copy of every composite here
        #[arg(long)]
        save_dir: Option<PathBuf>,

        #[arg(long, default_value = "390")]
        viewport: f32,
    },

    /// Show past uploads grouped by day
    History,
}

fn parse_field(input: &str) -> Result<(String, String), String> {
    let (name, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{input}'"))?;
    if name.trim().is_empty() {
        return Err(format!("missing field name in '{input}'"));
    }
    Ok((name.trim().to_string(), value.to_string()))
}

fn lookup<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(field, _)| field == name)
        .map(|(_, value)| value.as_str())
}

async fn load_config(path: Option<&Path>) -> Result<CompositeConfig> {
    let config = match path {
        Some(path) => CompositeConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => CompositeConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Table text needs a font; composites without one would carry no values
fn require_font_path(config: &CompositeConfig) -> Result<&Path> {
    config.font_path.as_deref().ok_or_else(|| {
        anyhow!("No font_path configured; set one in the --config file so tables carry their text")
    })
}

async fn load_surface(config: &CompositeConfig, encode: &EncodeOptions) -> Result<CompositeSurface> {
    let path = require_font_path(config)?;
    let font = load_font(path)
        .await
        .with_context(|| format!("loading font {}", path.display()))?;
    let surface = CompositeSurface::new(Some(font), encode.capture_quality);
    surface.mount();
    Ok(surface)
}

async fn require_token(store: &JsonFileStore) -> Result<String> {
    current_token(store)
        .await?
        .ok_or_else(|| anyhow!("Not signed in; run `fcap login` first"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let logger = AppLogger::new(500, level);
    logger.clone().init()?;

    let config = load_config(cli.config.as_deref()).await?;
    let api_config = ApiConfig::new(cli.api_url.clone());

    match cli.command {
        Commands::Login {
            username,
            password,
            company,
        } => {
            let store = JsonFileStore::open(&cli.session).await?;
            let api = HttpApi::new(api_config)?;
            let request = LoginRequest {
                username,
                password,
                company_id: company,
            };
            let user = auth::login(&api, &store, &request).await?;
            println!(
                "Signed in as {} → {}",
                user.name.as_deref().unwrap_or(&user.username),
                store.path().display()
            );
        }

        Commands::Logout => {
            let store = JsonFileStore::open(&cli.session).await?;
            auth::logout(&store).await?;
            println!("Signed out");
        }

        Commands::Forms => {
            let store = JsonFileStore::open(&cli.session).await?;
            let token = require_token(&store).await?;
            let api = HttpApi::new(api_config)?;
            let forms = fetch_active_forms(&api, &token).await?;

            println!("{} active form(s):", forms.len());
            for form in &forms {
                println!("  {}  {}", form.id, form.form_name);
                for field in &form.fields {
                    println!("      {} ({:?})", field, form.field_kind(field));
                }
            }
        }

        Commands::Layout { viewport, fields } => {
            let canvas = canvas_dims(viewport, &config);
            let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
            let layout = compute_table_layout(
                canvas,
                &names,
                |field| lookup(&fields, field),
                &config.table,
            );
            let table = table_bounds(&layout);
            let photo = image_placement(canvas, Rotation::None);

            println!("Canvas: {}x{}", canvas.width, canvas.height);
            println!(
                "Photo: left {:.1}, top {:.1}, {:.1}x{:.1}",
                photo.left, photo.top, photo.width, photo.height
            );
            println!("Table:");
            println!("  Rows: {}", layout.row_count);
            println!("  Font size: {:.1}", layout.font_size);
            println!("  Row height: {:.1}", layout.row_height);
            println!(
                "  Columns: {:.1} + {:.1} = {:.1}",
                layout.col1_width, layout.col2_width, layout.table_width
            );
            println!(
                "  Bounds: x {:.1}, y {:.1}, {:.1}x{:.1}",
                table.x, table.y, table.width, table.height
            );
        }

        Commands::Compose {
            image,
            output,
            viewport,
            rotate,
            fields,
        } => {
            let rotation = Rotation::from_degrees(rotate)
                .ok_or_else(|| anyhow!("rotation must be a multiple of 90, got {rotate}"))?;
            let encode = EncodeOptions::default();
            let surface = load_surface(&config, &encode).await?;

            let canvas = canvas_dims(viewport, &config);
            let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
            let scene = Scene::new(
                &image,
                rotation,
                canvas,
                &names,
                |field| lookup(&fields, field),
                &config.table,
            );
            let generation = surface.commit(scene);
            surface.rendered(generation).await?;

            let dir = output
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let captured = surface.capture(dir).await?;
            tokio::fs::rename(&captured, &output).await?;
            println!(
                "Composed {}x{} → {}",
                canvas.width,
                canvas.height,
                output.display()
            );
        }

        Commands::Upload {
            form,
            image,
            fields,
            single,
            save_dir,
            viewport,
        } => {
            require_font_path(&config)?;
            let store = Arc::new(JsonFileStore::open(&cli.session).await?);
            if load_user(store.as_ref()).await?.is_none() {
                bail!("Not signed in; run `fcap login` first");
            }
            let api = Arc::new(HttpApi::new(api_config)?);
            run_upload(
                api,
                store,
                config,
                UploadArgs {
                    form,
                    images: image,
                    fields,
                    mode: if single { EditMode::Single } else { EditMode::Batch },
                    save_dir,
                    viewport,
                },
            )
            .await?;

            let warnings = logger.count_at_least(Level::Warn);
            if warnings > 0 {
                println!("{warnings} warning(s) logged");
            }
        }

        Commands::History => {
            let store = JsonFileStore::open(&cli.session).await?;
            let token = require_token(&store).await?;
            let api = HttpApi::new(api_config)?;
            let groups = group_by_date(api.fetch_history(&token).await?, &Local);

            if groups.is_empty() {
                println!("No uploads yet");
            }
            for group in &groups {
                println!("{}", group.date.format("%Y-%m-%d"));
                for entry in &group.entries {
                    let time = entry
                        .created_at
                        .map(|at| at.with_timezone(&Local).format("%H:%M").to_string())
                        .unwrap_or_default();
                    println!(
                        "  {}  {}  {} image(s)",
                        time,
                        entry.form_name,
                        entry.image_urls.len()
                    );
                }
            }
        }
    }

    Ok(())
}

struct UploadArgs {
    form: String,
    images: Vec<PathBuf>,
    fields: Vec<(String, String)>,
    mode: EditMode,
    save_dir: Option<PathBuf>,
    viewport: f32,
}

/// Drive one upload through the worker and print its progress
async fn run_upload<A: RemoteApi + 'static>(
    api: Arc<A>,
    store: Arc<JsonFileStore>,
    config: CompositeConfig,
    args: UploadArgs,
) -> Result<()> {
    let mut options = UploadOptions::new(
        canvas_dims(args.viewport, &config),
        std::env::temp_dir().join("fcap-work"),
    );
    options.save_dir = args.save_dir;
    let surface = load_surface(&config, &options.encode).await?;

    let session = FormSession::new(store.clone(), args.mode);
    let orchestrator = UploadOrchestrator::new(api.clone(), store, surface, config.clone(), options);
    let worker = SiteWorker::new(api, session, orchestrator, config);

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(worker_task(worker, command_rx, update_tx));

    let mut commands = vec![
        SiteCommand::FetchForms,
        SiteCommand::SelectForm { form_id: args.form },
    ];
    commands.extend(
        args.fields
            .into_iter()
            .map(|(field, value)| SiteCommand::UpdateField { field, value }),
    );
    commands.push(SiteCommand::AddImages { paths: args.images });
    commands.push(SiteCommand::Upload);
    for cmd in commands {
        command_tx.send(cmd)?;
    }
    drop(command_tx);

    let mut report = None;
    while let Some(update) = update_rx.recv().await {
        match update {
            SiteUpdate::Validated {
                valid: false,
                invalid_fields,
            } => {
                eprintln!("Missing values: {}", invalid_fields.join(", "));
            }
            SiteUpdate::ItemUploaded { index, image_url } => {
                println!("  [{}] uploaded → {}", index + 1, image_url);
            }
            SiteUpdate::ItemFailed { index, reason } => {
                println!("  [{}] failed: {}", index + 1, reason);
            }
            SiteUpdate::UploadProgress {
                completed,
                total,
                percent,
            } => {
                println!("Progress: {completed}/{total} ({percent}%)");
            }
            SiteUpdate::LoginRequired => {
                eprintln!("Session expired; run `fcap login` again");
            }
            SiteUpdate::Error { message } => {
                eprintln!("Error: {message}");
            }
            SiteUpdate::UploadFinished { report: finished } => {
                report = Some(finished);
            }
            _ => {}
        }
    }
    handle.await?;

    let Some(report) = report else {
        bail!("Upload did not run");
    };
    if report.state == BatchState::Failed {
        bail!("{}", report.summary());
    }
    println!("{}", report.summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("위치=3-401"),
            Ok(("위치".to_string(), "3-401".to_string()))
        );
        assert_eq!(
            parse_field("메모=a=b"),
            Ok(("메모".to_string(), "a=b".to_string()))
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn test_font_is_required_for_rendering() {
        let mut config = CompositeConfig::default();
        assert!(require_font_path(&config).is_err());

        config.font_path = Some(PathBuf::from("fonts/NanumGothic.ttf"));
        assert_eq!(
            require_font_path(&config).unwrap(),
            Path::new("fonts/NanumGothic.ttf")
        );
    }

    #[tokio::test]
    async fn test_surface_refuses_missing_font() {
        let config = CompositeConfig::default();
        assert!(load_surface(&config, &EncodeOptions::default()).await.is_err());
    }

    #[test]
    fn test_cli_parses_upload() {
        let cli = Cli::try_parse_from([
            "fcap", "upload", "--form", "f1", "-i", "a.jpg", "b.jpg", "-f", "위치=3-401",
            "--single",
        ])
        .unwrap();
        match cli.command {
            Commands::Upload {
                image, fields, single, ..
            } => {
                assert_eq!(image.len(), 2);
                assert_eq!(fields, vec![("위치".to_string(), "3-401".to_string())]);
                assert!(single);
            }
            _ => panic!("expected upload"),
        }
        assert_eq!(cli.api_url, DEFAULT_BASE_URL);
    }
}
