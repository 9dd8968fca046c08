//! The `compression` trace flag.
//!
//! When set, the filter emits per-message events (sizes, algorithm, savings)
//! under the [`TRACE_TARGET`] target. The flag only controls log volume.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Target used for per-message trace events.
pub const TRACE_TARGET: &str = "compression_filter::trace";

/// Environment variable holding a comma-separated list of enabled traces.
pub const TRACE_ENV: &str = "GRPC_TRACE";

static COMPRESSION_TRACE: AtomicBool = AtomicBool::new(false);

/// Enable or disable the `compression` trace.
pub fn set_compression_trace(enabled: bool) {
    COMPRESSION_TRACE.store(enabled, Ordering::Relaxed);
}

/// Returns true if the `compression` trace is enabled.
pub fn compression_trace_enabled() -> bool {
    COMPRESSION_TRACE.load(Ordering::Relaxed)
}

/// Enable the trace if [`TRACE_ENV`] lists `compression` or `all`.
///
/// Meant to be called once by the embedding application at startup; channel
/// construction never reads the environment. The variable is read on the
/// first call only. Returns the resulting state.
pub fn init_trace_from_env() -> bool {
    static FROM_ENV: OnceLock<bool> = OnceLock::new();

    let enabled = *FROM_ENV.get_or_init(|| {
        std::env::var(TRACE_ENV).is_ok_and(|value| trace_list_enables(&value))
    });
    if enabled {
        set_compression_trace(true);
    }
    compression_trace_enabled()
}

fn trace_list_enables(list: &str) -> bool {
    list.split(',')
        .map(str::trim)
        .any(|name| name == "compression" || name == "all")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_list_enables() {
        assert!(trace_list_enables("compression"));
        assert!(trace_list_enables("http, compression"));
        assert!(trace_list_enables("all"));
        assert!(!trace_list_enables("http,channel"));
        assert!(!trace_list_enables(""));
    }
}
