// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - argument parsing and signal handling

#[cfg(test)]
mod tests {
    use crate::Args;
    use clap::Parser;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::time::timeout;

    #[test]
    fn test_default_config_path() {
        let args = Args::try_parse_from(["provisionize"]).unwrap();
        assert_eq!(args.config, PathBuf::from("config.yml"));
        assert!(args.listen.is_none());
    }

    #[test]
    fn test_config_and_listen_flags() {
        let args =
            Args::try_parse_from(["provisionize", "-c", "/etc/provisionize.yml", "--listen", "127.0.0.1:9000"])
                .unwrap();
        assert_eq!(args.config, PathBuf::from("/etc/provisionize.yml"));
        assert_eq!(args.listen.as_deref(), Some("127.0.0.1:9000"));
    }

    /// Test that SIGTERM signal handler can be created on Unix platforms
    #[tokio::test]
    #[cfg(unix)]
    async fn test_sigterm_signal_handler_creation() {
        use tokio::signal::unix::{signal, SignalKind};

        let result = signal(SignalKind::terminate());
        assert!(
            result.is_ok(),
            "Should be able to create SIGTERM signal handler"
        );
    }

    /// The shutdown future must stay pending while no signal arrives
    #[tokio::test]
    async fn test_shutdown_signal_pending_without_signal() {
        let result = timeout(
            Duration::from_millis(50),
            provisionize::server::shutdown_signal(),
        )
        .await;
        assert!(result.is_err(), "shutdown_signal() should not resolve on its own");
    }
}
