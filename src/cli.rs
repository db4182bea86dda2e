use std::path::PathBuf;

use clap::Parser;

use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "gphotos-timelapse",
    version,
    about = "Take a picture on a schedule and upload it into a Google Photos album"
)]
pub struct Cli {
    /// Directory holding client_id_secret.json, the persisted session and the
    /// instance lock
    #[arg(long, env = "GPHOTOS_TIMELAPSE_DIR", default_value = "~/.gphotos-timelapse")]
    pub base_directory: String,

    /// Where captured images are written (default: <base-directory>/images)
    #[arg(long)]
    pub image_directory: Option<String>,

    /// Album to upload into; an empty value uploads to the library only
    #[arg(long, default_value = "Garden Timelapse")]
    pub album: String,

    /// Take a picture every 30 seconds instead of once a day
    #[arg(long)]
    pub testing: bool,

    /// Take a picture every N seconds (overrides --testing and --daily-at)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Local time of the daily capture (HH:MM or HH:MM:SS)
    #[arg(long, default_value = "12:00")]
    pub daily_at: String,

    /// Capture program and arguments; {output} is replaced by the image path
    #[arg(
        long,
        default_value = "libcamera-still --nopreview --timeout 5000 --output {output}"
    )]
    pub capture_command: String,

    /// Stop on the first failed cycle instead of logging it and continuing
    #[arg(long)]
    pub no_harden: bool,

    /// Run a single capture/upload cycle now, then exit
    #[arg(long)]
    pub once: bool,

    /// Upload existing files into the album, then exit
    #[arg(long, num_args = 1.., value_name = "FILE")]
    pub upload: Vec<PathBuf>,

    /// List albums visible to the account, then exit
    #[arg(short = 'l', long)]
    pub list_albums: bool,

    /// Only authorize (create/refresh the persisted session), then exit
    #[arg(long)]
    pub auth_only: bool,

    /// Loopback port for the browser authorization callback
    #[arg(long, default_value_t = 8080)]
    pub oauth_port: u16,

    /// Per-request HTTP timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub http_timeout: u64,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log file, appended to alongside console output
    #[arg(long, default_value = "log.txt")]
    pub log_file: PathBuf,
}
