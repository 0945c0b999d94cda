use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use config::Config;
use tokio::sync::mpsc;

use crate::core::msg;

// Grace window granted to deprovisioning removals so downstream agents
// can push a replacement configuration.
pub const DEPROVISION_GRACE_MINUTES: i64 = 15;

// Default length of the write worker input queue.
pub const DEFAULT_QUEUE_LENGTH: usize = 255;

pub const DEFAULT_LISTEN: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8576;

/// Content-derived lookup identifier over a host/metric pair.
pub fn lookup_hash(host_id: u64, metric: &str) -> String {
    format!("{:x}", md5::compute(format!("{}:{}", host_id, metric)))
}

/// Shared state handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub app_config: Config,
    pub write_queue: mpsc::Sender<msg::Request>,
    pub http_client: reqwest::Client,
    pub cams_url: String,
    pub shutdown: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        app_config: Config,
        write_queue: mpsc::Sender<msg::Request>,
        cams_url: String,
    ) -> Self {
        AppState {
            app_config,
            write_queue,
            http_client: reqwest::Client::new(),
            cams_url,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_hash_is_stable() {
        let a = lookup_hash(1042, "cpu.usage.steal");
        let b = lookup_hash(1042, "cpu.usage.steal");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_lookup_hash_differs_per_pair() {
        assert_ne!(
            lookup_hash(1042, "cpu.usage.steal"),
            lookup_hash(1043, "cpu.usage.steal")
        );
        assert_ne!(
            lookup_hash(1042, "cpu.usage.steal"),
            lookup_hash(1042, "cpu.usage.user")
        );
    }
}
