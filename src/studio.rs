//! View state controller: upload, transform, reset.
//!
//! State lives in a [`tokio::sync::watch`] channel so a front-end can
//! subscribe and re-render on every change. All mutations go through
//! `send_modify`/`send_if_modified`, which makes each check-and-update
//! atomic without holding a lock across an await.

use crate::error::{Result, StudioError};
use crate::image::{EncodedImage, FileLoader};
use crate::transform::ImageTransformer;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// File name used when saving the edited image.
pub const DOWNLOAD_FILE_NAME: &str = "vogue-cowboy-look.png";

/// Current step of the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewPhase {
    /// Waiting for a photo. No images set.
    #[default]
    Upload,
    /// Original loaded, edit not yet produced.
    Preview,
    /// Both original and edited images available.
    Result,
}

impl std::fmt::Display for ViewPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upload => write!(f, "upload"),
            Self::Preview => write!(f, "preview"),
            Self::Result => write!(f, "result"),
        }
    }
}

/// Snapshot of the studio.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudioState {
    /// The uploaded photo.
    pub original_image: Option<EncodedImage>,
    /// The restyled photo.
    pub edited_image: Option<EncodedImage>,
    /// True while a transform call is outstanding.
    pub is_processing: bool,
    /// Message from the last failed transform.
    pub error: Option<String>,
    /// Current view phase.
    pub phase: ViewPhase,
}

/// What a call to [`Studio::transform`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// Nothing to transform (no original, or already in the result phase).
    Skipped,
    /// Another transform is still in flight; state untouched.
    Busy,
    /// Edited image stored, phase advanced to result.
    Completed,
    /// The transform failed with this user-facing message.
    Failed(String),
    /// An upload or reset happened meanwhile; the response was dropped.
    Discarded,
}

/// Clears the in-flight flag when the owning transform returns or is dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

enum Start {
    Go(EncodedImage, u64),
    Refuse(TransformOutcome),
}

/// Drives the upload → transform → result flow.
pub struct Studio {
    transformer: Arc<dyn ImageTransformer>,
    loader: FileLoader,
    state: watch::Sender<StudioState>,
    // Bumped by upload and reset, only inside state-modify closures.
    epoch: AtomicU64,
    // Set while a remote call is outstanding. Survives reset and upload;
    // only the transform that set it clears it.
    in_flight: AtomicBool,
}

impl Studio {
    /// Creates a studio in the upload phase.
    pub fn new(transformer: impl ImageTransformer + 'static) -> Self {
        let (state, _) = watch::channel(StudioState::default());
        Self {
            transformer: Arc::new(transformer),
            loader: FileLoader::new(),
            state,
            epoch: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> StudioState {
        self.state.borrow().clone()
    }

    /// Returns the current phase.
    pub fn phase(&self) -> ViewPhase {
        self.state.borrow().phase
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<StudioState> {
        self.state.subscribe()
    }

    /// Returns the name of the underlying transformer.
    pub fn transformer_name(&self) -> &str {
        self.transformer.name()
    }

    /// Reads a local file and makes it the original image.
    ///
    /// On a read error the state is left as it was.
    pub async fn upload(&self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_not_result("upload")?;
        let image = self.loader.load(path).await?;
        self.load(image)
    }

    /// Makes an already encoded image the original and moves to preview.
    ///
    /// Clears any error and any edited image. Rejected in the result phase.
    pub fn load(&self, image: EncodedImage) -> Result<()> {
        let mut accepted = false;
        self.state.send_if_modified(|state| {
            if state.phase == ViewPhase::Result {
                return false;
            }
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *state = StudioState {
                original_image: Some(image),
                phase: ViewPhase::Preview,
                ..StudioState::default()
            };
            accepted = true;
            true
        });

        if accepted {
            tracing::debug!("original image loaded");
            Ok(())
        } else {
            Err(result_phase_error("upload"))
        }
    }

    /// Sends the original image to the transformer.
    ///
    /// Only one remote call runs at a time. A second call while one is
    /// outstanding returns [`TransformOutcome::Busy`] without touching state,
    /// even if the first was orphaned by a reset or a new upload.
    pub async fn transform(&self) -> TransformOutcome {
        let mut start = Start::Refuse(TransformOutcome::Skipped);
        self.state.send_if_modified(|state| {
            if self.in_flight.load(Ordering::SeqCst) {
                start = Start::Refuse(TransformOutcome::Busy);
                return false;
            }
            if state.phase != ViewPhase::Preview {
                return false;
            }
            let Some(original) = state.original_image.clone() else {
                return false;
            };
            self.in_flight.store(true, Ordering::SeqCst);
            state.is_processing = true;
            state.error = None;
            start = Start::Go(original, self.epoch.load(Ordering::SeqCst));
            true
        });

        let (original, epoch) = match start {
            Start::Go(original, epoch) => (original, epoch),
            Start::Refuse(outcome) => return outcome,
        };
        let _in_flight = InFlightGuard(&self.in_flight);

        tracing::debug!(transformer = self.transformer.name(), "transform started");
        let result = self.transformer.transform(&original).await;

        let mut outcome = TransformOutcome::Discarded;
        self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            state.is_processing = false;
            match result {
                Ok(edited) => {
                    state.edited_image = Some(edited);
                    state.phase = ViewPhase::Result;
                    outcome = TransformOutcome::Completed;
                }
                Err(e) => {
                    let message = e.user_message();
                    state.error = Some(message.clone());
                    outcome = TransformOutcome::Failed(message);
                }
            }
            true
        });

        match &outcome {
            TransformOutcome::Failed(message) => {
                tracing::warn!("transform failed: {message}");
            }
            TransformOutcome::Discarded => {
                tracing::warn!("dropping transform result that arrived after upload or reset");
            }
            _ => tracing::debug!("transform complete"),
        }
        outcome
    }

    /// Clears everything and returns to the upload phase.
    ///
    /// A transform still in flight keeps running, but its result is dropped,
    /// and new transforms are refused until it returns.
    pub fn reset(&self) {
        self.state.send_modify(|state| {
            self.epoch.fetch_add(1, Ordering::SeqCst);
            *state = StudioState::default();
        });
    }

    /// Saves the edited image as [`DOWNLOAD_FILE_NAME`] inside `dir`.
    pub async fn download(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let edited = {
            let state = self.state.borrow();
            match (&state.phase, &state.edited_image) {
                (ViewPhase::Result, Some(edited)) => edited.clone(),
                _ => {
                    return Err(StudioError::InvalidTransition(format!(
                        "nothing to download in the {} phase",
                        state.phase
                    )))
                }
            }
        };

        let path = dir.as_ref().join(DOWNLOAD_FILE_NAME);
        edited.save(&path).await?;
        tracing::debug!(path = %path.display(), "edited image saved");
        Ok(path)
    }

    fn ensure_not_result(&self, action: &str) -> Result<()> {
        if self.phase() == ViewPhase::Result {
            return Err(result_phase_error(action));
        }
        Ok(())
    }
}

fn result_phase_error(action: &str) -> StudioError {
    StudioError::InvalidTransition(format!("cannot {action} in the result phase; reset first"))
}
