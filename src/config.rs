use clap::{Parser, ValueEnum};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// One blocking request per message, with optional file attachments.
    Request,
    /// Responses arrive in chunks over a server-sent event stream.
    Streaming,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "parlor", version, about = "Desktop client for a local chat server")]
pub struct Config {
    /// Base URL of the chat server.
    #[arg(long, env = "PARLOR_BASE_URL", default_value = "http://localhost:5000")]
    pub base_url: String,

    #[arg(long, env = "PARLOR_MODE", value_enum, default_value_t = Mode::Streaming)]
    pub mode: Mode,

    /// Timeout for one-shot requests. The push channel has none.
    #[arg(long, env = "PARLOR_REQUEST_TIMEOUT_SECS", default_value_t = 120)]
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
