//! gphotos-timelapse: take a picture on a schedule and upload it into a
//! Google Photos album.
//!
//! Authorization happens once through the browser; the refresh token is kept
//! in the base directory and reused on every start. Each cycle captures one
//! image with an external camera command and uploads it.

#![warn(clippy::all)]

mod auth;
mod camera;
mod cli;
mod config;
mod photos;
mod runner;
mod schedule;
mod shutdown;
mod types;

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

use clap::Parser;
use futures_util::TryStreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use camera::CommandCamera;
use config::{Config, Mode};
use photos::{ApiEndpoints, PhotosLibrary, UploadOutcome};

/// Console output plus an appending, uncoloured copy in `log_file`.
///
/// A log file that cannot be opened is reported and skipped.
fn init_logging(level: types::LogLevel, log_file: &Path) {
    let (file_layer, open_error) = match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => {
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), None)
        }
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter())))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    if let Some(e) = open_error {
        tracing::warn!("Could not open log file {}: {}", log_file.display(), e);
    }
}

async fn list_albums(library: &PhotosLibrary) -> anyhow::Result<()> {
    let albums = library.albums(false);
    tokio::pin!(albums);
    println!("Albums:");
    while let Some(album) = albums.try_next().await? {
        println!("  {}", album.title);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_cli(cli::Cli::parse())?;
    init_logging(config.log_level, &config.log_file);
    tracing::debug!(?config, "Starting gphotos-timelapse");

    let session = Arc::new(
        auth::authorize(&auth::AuthOptions {
            credentials_dir: config.base_directory.clone(),
            oauth_port: config.oauth_port,
            http_timeout: config.http_timeout,
        })
        .await?,
    );
    let library = PhotosLibrary::new(session.clone(), ApiEndpoints::default());
    let album = config.album.as_deref();

    let camera = CommandCamera::new(
        config.capture_program.clone(),
        config.capture_args.clone(),
        config.image_directory.clone(),
    );

    match &config.mode {
        Mode::AuthOnly => {
            tracing::info!(
                "Authorization completed, credentials stored in {}",
                session.credentials_path().display()
            );
        }
        Mode::ListAlbums => list_albums(&library).await?,
        Mode::Upload(paths) => {
            if library.upload_photos(paths, album).await? == UploadOutcome::AlbumUnavailable {
                anyhow::bail!("Album '{}' could not be found or created", album.unwrap_or_default());
            }
        }
        Mode::Once => {
            runner::run_cycle(&camera, &library, album).await?;
        }
        Mode::Loop => {
            tracing::info!(
                schedule = ?config.schedule,
                images = %camera.image_dir().display(),
                "Starting capture loop"
            );
            let shutdown = shutdown::install_signal_handler()?;
            let options = runner::RunOptions {
                schedule: config.schedule,
                album: config.album.clone(),
                harden: config.harden,
            };
            runner::run(&camera, &library, &options, shutdown).await?;
        }
    }

    Ok(())
}
