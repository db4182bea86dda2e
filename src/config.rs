use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;

use crate::schedule::{Schedule, TESTING_INTERVAL};
use crate::types::LogLevel;

/// What the process should do after authorizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    AuthOnly,
    ListAlbums,
    Upload(Vec<PathBuf>),
    Once,
    Loop,
}

/// Resolved application configuration.
pub struct Config {
    pub base_directory: PathBuf,
    pub image_directory: PathBuf,
    pub album: Option<String>,
    pub capture_program: String,
    pub capture_args: Vec<String>,
    pub log_file: PathBuf,

    pub schedule: Schedule,
    pub http_timeout: Duration,
    pub mode: Mode,
    pub oauth_port: u16,
    pub log_level: LogLevel,
    pub harden: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_directory", &self.base_directory)
            .field("image_directory", &self.image_directory)
            .field("album", &self.album)
            .field("schedule", &self.schedule)
            .field("mode", &self.mode)
            .field("harden", &self.harden)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub(crate) fn parse_daily_at(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| anyhow::anyhow!("Cannot parse '{}' as a time of day. Expected HH:MM or HH:MM:SS", s))
}

/// Longest accepted `--interval`, one leap year.
const MAX_INTERVAL_SECS: u64 = 366 * 24 * 60 * 60;

pub(crate) fn parse_interval(secs: u64) -> anyhow::Result<Duration> {
    if secs == 0 || secs > MAX_INTERVAL_SECS {
        anyhow::bail!(
            "--interval must be between 1 and {} seconds, got {}",
            MAX_INTERVAL_SECS,
            secs
        );
    }
    Ok(Duration::from_secs(secs))
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        let base_directory = expand_tilde(&cli.base_directory);
        let image_directory = cli
            .image_directory
            .map(|d| expand_tilde(&d))
            .unwrap_or_else(|| base_directory.join("images"));

        let schedule = match (cli.interval, cli.testing) {
            (Some(secs), _) => Schedule::Interval(parse_interval(secs)?),
            (None, true) => Schedule::Interval(TESTING_INTERVAL),
            (None, false) => Schedule::Daily(parse_daily_at(&cli.daily_at)?),
        };

        let mut command = cli.capture_command.split_whitespace().map(str::to_string);
        let Some(capture_program) = command.next() else {
            anyhow::bail!("--capture-command must not be empty");
        };
        let capture_args = command.collect();

        let mode = if cli.auth_only {
            Mode::AuthOnly
        } else if cli.list_albums {
            Mode::ListAlbums
        } else if !cli.upload.is_empty() {
            Mode::Upload(cli.upload)
        } else if cli.once {
            Mode::Once
        } else {
            Mode::Loop
        };

        Ok(Self {
            base_directory,
            image_directory,
            album: Some(cli.album).filter(|a| !a.is_empty()),
            capture_program,
            capture_args,
            log_file: cli.log_file,
            schedule,
            http_timeout: Duration::from_secs(cli.http_timeout),
            mode,
            oauth_port: cli.oauth_port,
            log_level: cli.log_level,
            harden: !cli.no_harden,
        })
    }
}
