use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    MaxConcurrentJobs,
    MaxAttempts,
    FfmpegBin,
    ReapAfterSecs,
    ReapIntervalSecs,
    CancelPollMs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "PORT",
            EnvKey::MaxConcurrentJobs => "MAX_CONCURRENT_JOBS",
            EnvKey::MaxAttempts => "MAX_ATTEMPTS",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
            EnvKey::ReapAfterSecs => "REAP_AFTER_SECS",
            EnvKey::ReapIntervalSecs => "REAP_INTERVAL_SECS",
            EnvKey::CancelPollMs => "CANCEL_POLL_MS",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
