//! Bootstrap utilities for rentsync binaries.
//!
//! Shared initialization code for the adapter and hub.

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with the RENTSYNC_LOG environment variable.
///
/// Defaults to "info" level if RENTSYNC_LOG is not set.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves when the process receives Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// Handle `--policy-version`: print the linked policy version and report
/// whether the caller should exit.
pub fn print_policy_version_if_requested(args: &[String]) -> bool {
    if args.iter().any(|a| a == "--policy-version") {
        println!("{}", rentsync_policy::POLICY_VERSION);
        return true;
    }
    false
}

/// Config path from `--config <path>`, if given.
pub fn config_path_arg(args: &[String]) -> Option<&str> {
    args.windows(2)
        .find(|pair| pair[0] == "--config")
        .map(|pair| pair[1].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_config_path_arg() {
        assert_eq!(
            config_path_arg(&args(&["bin", "--config", "hub.yaml"])),
            Some("hub.yaml")
        );
        assert_eq!(config_path_arg(&args(&["bin", "--config"])), None);
        assert_eq!(config_path_arg(&args(&["bin"])), None);
    }

    #[test]
    fn test_policy_version_flag_detected() {
        assert!(!print_policy_version_if_requested(&args(&["bin"])));
        assert!(print_policy_version_if_requested(&args(&[
            "bin",
            "--policy-version"
        ])));
    }
}
