#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use wsnotify_client::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
endpoint: "ws://localhost:8080/ws"
reconnect:
  max_atempts: 3 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
endpoint: "ws://localhost:8080/ws"
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.endpoint, "ws://localhost:8080/ws");

    let policy = cfg.reconnect_policy();
    assert_eq!(policy.max_attempts(), 5);
    assert_eq!(policy.delay_for(0), Some(Duration::from_secs(1)));
    assert_eq!(policy.delay_for(4), Some(Duration::from_secs(16)));
    assert_eq!(policy.delay_for(5), None);
}

#[test]
fn endpoint_alone_is_enough() {
    let cfg = config::load_from_str("endpoint: \"ws://localhost:8080/ws\"\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.reconnect_policy().max_attempts(), 5);
}

#[test]
fn endpoint_is_required() {
    let err = config::load_from_str("version: 1\n").expect_err("must fail");
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn endpoint_must_be_websocket_url() {
    for endpoint in ["http://localhost:8080/ws", "not a url", ""] {
        let s = format!("version: 1\nendpoint: \"{endpoint}\"\n");
        let err = config::load_from_str(&s).expect_err("must fail");
        assert_eq!(err.kind().as_str(), "CONFIG", "endpoint={endpoint}");
    }
    let s = "version: 1\nendpoint: \"wss://hr.example.com/ws\"\n";
    assert!(config::load_from_str(s).is_ok());
}

#[test]
fn unsupported_version() {
    let s = "version: 2\nendpoint: \"ws://localhost/ws\"\n";
    let err = config::load_from_str(s).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn reconnect_ranges_are_checked() {
    let cases = [
        "base_delay_ms: 10",
        "base_delay_ms: 5000\n  max_delay_ms: 1000",
        "max_delay_ms: 900000",
        "max_attempts: 1000",
    ];
    for case in cases {
        let s = format!("version: 1\nendpoint: \"ws://localhost/ws\"\nreconnect:\n  {case}\n");
        let err = config::load_from_str(&s).expect_err("must fail");
        assert_eq!(err.kind().as_str(), "CONFIG", "case={case}");
    }
}

#[test]
fn custom_policy() {
    let s = r#"
version: 1
endpoint: "ws://localhost/ws"
reconnect:
  base_delay_ms: 500
  max_delay_ms: 2000
  max_attempts: 10
"#;
    let policy = config::load_from_str(s).unwrap().reconnect_policy();
    assert_eq!(policy.delay_for(0), Some(Duration::from_millis(500)));
    assert_eq!(policy.delay_for(2), Some(Duration::from_millis(2000)));
    assert_eq!(policy.delay_for(9), Some(Duration::from_millis(2000)));
    assert_eq!(policy.delay_for(10), None);
}
