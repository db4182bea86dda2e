//! The capture-and-upload loop.

use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use tokio_util::sync::CancellationToken;

use crate::camera::Camera;
use crate::photos::{PhotosLibrary, UploadOutcome};
use crate::schedule::{sleep_duration, Schedule};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub schedule: Schedule,
    pub album: Option<String>,
    /// Log cycle errors and keep going instead of returning them.
    pub harden: bool,
}

/// Capture one image and upload it.
pub async fn run_cycle(
    camera: &dyn Camera,
    library: &PhotosLibrary,
    album: Option<&str>,
) -> anyhow::Result<(PathBuf, UploadOutcome)> {
    tracing::info!("Taking picture");
    let image = camera.capture().await.context("Capturing image failed")?;
    let outcome = library
        .upload_photos(std::slice::from_ref(&image), album)
        .await
        .with_context(|| format!("Uploading {} failed", image.display()))?;
    if outcome == UploadOutcome::AlbumUnavailable {
        tracing::warn!("Skipped upload of {}: album unavailable", image.display());
    }
    Ok((image, outcome))
}

/// Run cycles on `options.schedule` until `shutdown` is cancelled.
///
/// The wait is the only cancellation point; a cycle that has started runs
/// to completion.
pub async fn run(
    camera: &dyn Camera,
    library: &PhotosLibrary,
    options: &RunOptions,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        let now = Local::now();
        let next = options.schedule.next_wake(&now);
        let wait = sleep_duration(&Local::now(), &next);
        tracing::info!(
            "Waiting {:.1} seconds until {}...",
            wait.as_secs_f64(),
            next.format("%Y-%m-%d %H:%M:%S")
        );

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                tracing::info!("Shutdown requested, stopping scheduler");
                return Ok(());
            }
            _ = tokio::time::sleep(wait) => {}
        }

        match run_cycle(camera, library, options.album.as_deref()).await {
            Ok(_) => {}
            Err(e) if options.harden => {
                tracing::error!("Cycle failed, continuing with next cycle: {:#}", e);
            }
            Err(e) => return Err(e),
        }
    }
}
