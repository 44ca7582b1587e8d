//! Integration tests for metrics server functionality.

use logalert_core::config::MetricsConfig;
use logalert_daemon::metrics_server;
use serial_test::serial;

#[test]
#[serial]
fn test_install_metrics_recorder_fails_with_invalid_address() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "999.999.999.999".to_string(),
        port: 9187,
    };

    let result = metrics_server::install_metrics_recorder(&config);

    assert!(
        result.is_err(),
        "install_metrics_recorder should fail with invalid address"
    );
}

#[test]
#[serial]
fn test_install_metrics_recorder_succeeds_with_valid_config() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "127.0.0.1".to_string(),
        port: 19187,
    };

    let addr = metrics_server::install_metrics_recorder(&config)
        .expect("install_metrics_recorder should succeed with valid config");

    assert_eq!(addr.port(), 19187);
    assert!(addr.ip().is_loopback());
}
