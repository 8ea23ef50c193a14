use std::time::Duration;

use crate::config::env::{self, EnvKey};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    /// Worker slot count; also the handoff channel capacity.
    pub max_concurrent_jobs: usize,
    /// Execution attempts per job before it fails for good.
    pub max_attempts: u32,
    pub ffmpeg_bin: String,
    /// A `Running` job with no worker update for this long is reaped.
    pub reap_after: Duration,
    pub reap_interval: Duration,
    /// How often an executing worker checks for a cancel request.
    pub cancel_poll: Duration,
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 18080),
            max_concurrent_jobs: env::get_parsed(EnvKey::MaxConcurrentJobs, 2),
            max_attempts: env::get_parsed(EnvKey::MaxAttempts, 1),
            ffmpeg_bin: env::get_or(EnvKey::FfmpegBin, "ffmpeg"),
            reap_after: Duration::from_secs(env::get_parsed(EnvKey::ReapAfterSecs, 3600)),
            reap_interval: Duration::from_secs(env::get_parsed(EnvKey::ReapIntervalSecs, 60)),
            cancel_poll: Duration::from_millis(env::get_parsed(EnvKey::CancelPollMs, 250)),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}
