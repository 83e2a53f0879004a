use std::fs;

use rover_link::{LinkConfig, LinkError};
use uuid::Uuid;

#[test]
fn test_defaults_match_vehicle_firmware() {
    let config = LinkConfig::default();
    assert_eq!(config.vehicle_host, "192.168.4.1");
    assert_eq!(config.vehicle_port, 10000);
    assert_eq!(config.telemetry_port, 10000);
    assert!(!config.logging);
    assert_eq!(config.dispatch_interval_ms, 1000);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_file_falls_back_to_defaults() {
    let path = std::env::temp_dir().join(format!("rover_link_{}.json", Uuid::new_v4()));
    fs::write(&path, r#"{ "vehicle_host": "10.0.0.7", "logging": true, "history_capacity": null }"#).unwrap();

    let config = LinkConfig::from_file(&path).unwrap();
    assert_eq!(config.vehicle_host, "10.0.0.7");
    assert!(config.logging);
    assert_eq!(config.history_capacity, None);
    assert_eq!(config.vehicle_port, 10000);

    fs::remove_file(path).ok();
}

#[test]
fn test_invalid_values_rejected() {
    let zero_ingest = LinkConfig { ingest_capacity: 0, ..LinkConfig::default() };
    assert!(matches!(zero_ingest.validate(), Err(LinkError::Config(_))));

    let empty_host = LinkConfig::new("  ", 10000, false);
    assert!(matches!(empty_host.validate(), Err(LinkError::Config(_))));

    let zero_history = LinkConfig { history_capacity: Some(0), ..LinkConfig::default() };
    assert!(zero_history.validate().is_err());
}

#[test]
fn test_missing_or_broken_file_is_reported() {
    let missing = std::env::temp_dir().join(format!("rover_link_missing_{}.json", Uuid::new_v4()));
    assert!(matches!(LinkConfig::from_file(&missing), Err(LinkError::ConfigRead { .. })));

    let broken = std::env::temp_dir().join(format!("rover_link_broken_{}.json", Uuid::new_v4()));
    fs::write(&broken, "{ vehicle_host: ").unwrap();
    assert!(matches!(LinkConfig::from_file(&broken), Err(LinkError::ConfigParse { .. })));
    fs::remove_file(broken).ok();
}

#[test]
fn test_vehicle_address_resolution() {
    let config = LinkConfig::new("127.0.0.1", 4242, false);
    let addr = config.vehicle_addr().unwrap();
    assert_eq!(addr.to_string(), "127.0.0.1:4242");
}
