//! The rendering surface composites are drawn on and captured from
//!
//! Scenes are committed to the surface and rendered in the background. Every
//! commit gets a generation number; [`CompositeSurface::rendered`] resolves
//! once the frame for a generation is ready, and [`CompositeSurface::capture`]
//! always flattens the frame of the most recent commit.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use ab_glyph::FontArc;
use image::{DynamicImage, RgbaImage};
use tokio::sync::watch;

use crate::render::{Scene, flatten, render_composite};
use crate::types::{CompositeError, Result};

/// Latest finished frame
#[derive(Clone, Default)]
struct Frame {
    generation: u64,
    image: Option<Arc<RgbaImage>>,
    error: Option<String>,
}

struct SurfaceInner {
    mounted: AtomicBool,
    font: Option<FontArc>,
    capture_quality: u8,
    next_generation: AtomicU64,
    committed: Mutex<Option<(u64, Scene)>>,
    frames: watch::Sender<Frame>,
    source_cache: tokio::sync::Mutex<Option<(PathBuf, Arc<DynamicImage>)>>,
}

/// A single shared canvas. Clones refer to the same surface.
#[derive(Clone)]
pub struct CompositeSurface {
    inner: Arc<SurfaceInner>,
}

impl CompositeSurface {
    pub fn new(font: Option<FontArc>, capture_quality: u8) -> Self {
        let (frames, _) = watch::channel(Frame::default());
        Self {
            inner: Arc::new(SurfaceInner {
                mounted: AtomicBool::new(false),
                font,
                capture_quality,
                next_generation: AtomicU64::new(1),
                committed: Mutex::new(None),
                frames,
                source_cache: tokio::sync::Mutex::new(None),
            }),
        }
    }

    pub fn mount(&self) {
        self.inner.mounted.store(true, Ordering::SeqCst);
    }

    pub fn unmount(&self) {
        self.inner.mounted.store(false, Ordering::SeqCst);
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }

    pub fn has_font(&self) -> bool {
        self.inner.font.is_some()
    }

    /// The scene of the most recent commit
    pub fn committed_scene(&self) -> Option<Scene> {
        self.lock_committed().as_ref().map(|(_, scene)| scene.clone())
    }

    /// Commit a scene and start rendering it in the background.
    ///
    /// Must be called from within a tokio runtime. Returns the generation to
    /// pass to [`CompositeSurface::rendered`].
    pub fn commit(&self, scene: Scene) -> u64 {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        *self.lock_committed() = Some((generation, scene.clone()));

        log::debug!(
            "Committed scene generation {} ({})",
            generation,
            scene.source.display()
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = inner.render(scene).await;
            inner.publish(generation, result);
        });

        generation
    }

    /// Wait until the frame for `generation` (or a newer one) has been rendered
    pub async fn rendered(&self, generation: u64) -> Result<Arc<RgbaImage>> {
        let mut frames = self.inner.frames.subscribe();
        let frame = frames
            .wait_for(|frame| frame.generation >= generation)
            .await
            .map_err(|_| CompositeError::Render("Surface was dropped".to_string()))?
            .clone();

        match (frame.image, frame.error) {
            (Some(image), _) => Ok(image),
            (None, Some(error)) => Err(CompositeError::Render(error)),
            (None, None) => Err(CompositeError::NothingCommitted),
        }
    }

    /// Flatten the most recently committed scene into a JPEG inside `dir` and
    /// return its path.
    ///
    /// Fails with [`CompositeError::NotMounted`] when the surface is not mounted.
    pub async fn capture(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        if !self.is_mounted() {
            return Err(CompositeError::NotMounted);
        }

        let generation = self
            .lock_committed()
            .as_ref()
            .map(|(generation, _)| *generation)
            .ok_or(CompositeError::NothingCommitted)?;

        let frame = self.rendered(generation).await?;
        let quality = self.inner.capture_quality;
        let bytes = tokio::task::spawn_blocking(move || flatten(&frame, quality)).await??;

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let path = dir
            .as_ref()
            .join(format!("composite_{generation}_{millis}.jpg"));
        tokio::fs::write(&path, bytes).await?;

        log::debug!("Captured generation {} to {}", generation, path.display());
        Ok(path)
    }

    fn lock_committed(&self) -> std::sync::MutexGuard<'_, Option<(u64, Scene)>> {
        // A poisoned lock still holds a consistent Option
        self.inner
            .committed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SurfaceInner {
    async fn render(&self, scene: Scene) -> Result<RgbaImage> {
        let source = self.load_source(&scene.source).await?;
        let font = self.font.clone();
        let image =
            tokio::task::spawn_blocking(move || render_composite(&scene, &source, font.as_ref()))
                .await?;
        Ok(image)
    }

    async fn load_source(&self, path: &Path) -> Result<Arc<DynamicImage>> {
        let mut cache = self.source_cache.lock().await;
        if let Some((cached_path, image)) = cache.as_ref() {
            if cached_path == path {
                return Ok(Arc::clone(image));
            }
        }

        let owned = path.to_owned();
        let image = tokio::task::spawn_blocking(move || image::open(owned)).await??;
        let image = Arc::new(image);
        *cache = Some((path.to_owned(), Arc::clone(&image)));
        Ok(image)
    }

    /// Publish a finished render unless a newer generation already landed
    fn publish(&self, generation: u64, result: Result<RgbaImage>) {
        let frame = match result {
            Ok(image) => Frame {
                generation,
                image: Some(Arc::new(image)),
                error: None,
            },
            Err(e) => {
                log::warn!("Render of generation {} failed: {}", generation, e);
                Frame {
                    generation,
                    image: None,
                    error: Some(e.to_string()),
                }
            }
        };

        self.frames.send_if_modified(|current| {
            if generation > current.generation {
                *current = frame;
                true
            } else {
                false
            }
        });
    }
}
