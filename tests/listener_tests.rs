use std::net::UdpSocket;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rover_link::telemetry::{read_channel_log, Channel, Observer, Reading, TelemetryStore, Vector3};
use rover_link::{Command, LinkConfig, RoverLink};
use tokio::time::timeout;
use uuid::Uuid;

const REFERENCE: &[u8] = b"12,90,5.1,0.6,0.1,0.2,9.8,0.01,0.02,0.03";

fn loopback_config() -> LinkConfig {
    LinkConfig {
        vehicle_host: "127.0.0.1".into(),
        telemetry_port: 0,
        dispatch_interval_ms: 0,
        ..LinkConfig::default()
    }
}

fn vehicle_socket() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").unwrap()
}

#[tokio::test]
async fn test_datagram_reaches_store_and_subscribers() {
    let link = RoverLink::connect(loopback_config()).await.unwrap();
    let mut sub = link.subscribe();
    let vehicle = vehicle_socket();

    vehicle.send_to(REFERENCE, link.telemetry_addr()).unwrap();

    let event = timeout(Duration::from_secs(2), sub.recv()).await.unwrap().unwrap();
    assert_eq!(event.sequence, 1);

    link.store().read(|store| {
        assert_eq!(store.scalar(Channel::Range).unwrap().back(), Some(&12.0));
        assert_eq!(store.scalar(Channel::Voltage).unwrap().back(), Some(&5.1));
        assert_eq!(store.vector(Channel::Accel).unwrap().back(), Some(&Vector3::new(0.1, 0.2, 9.8)));
        assert_eq!(store.vector(Channel::Gyro).unwrap().back(), Some(&Vector3::new(0.01, 0.02, 0.03)));
    });

    link.shutdown().await;
}

#[tokio::test]
async fn test_malformed_datagram_dropped_and_loop_survives() {
    let link = RoverLink::connect(loopback_config()).await.unwrap();
    let mut sub = link.subscribe();
    let vehicle = vehicle_socket();
    let target = link.telemetry_addr();

    vehicle.send_to(b"12,90,5.1,0.6,0.1,0.2", target).unwrap();
    vehicle.send_to(b"not,a,number,at,all,really,no,way,ok,?", target).unwrap();
    vehicle.send_to(REFERENCE, target).unwrap();

    let event = timeout(Duration::from_secs(2), sub.recv()).await.unwrap().unwrap();
    assert_eq!(event.sequence, 1, "Only the valid datagram becomes a sample");
    assert_eq!(event.sample.range, 12.0);

    assert_eq!(link.store().len(), 1);
    link.store().read(|store| {
        for channel in Channel::ALL {
            assert_eq!(store.channel_len(channel), 1);
        }
    });

    let stats = link.stats();
    assert_eq!(stats.datagrams_received, 3);
    assert_eq!(stats.malformed_dropped, 2);
    assert_eq!(stats.samples_accepted, 1);
    assert!(link.is_listening());

    link.shutdown().await;
}

#[tokio::test]
async fn test_observer_sees_every_sample_in_arrival_order() {
    let link = RoverLink::connect(loopback_config()).await.unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let observer: Arc<dyn Observer> = Arc::new(move |store: &TelemetryStore| {
        if let Some(Reading::Scalar(range)) = store.last_reading(Channel::Range) {
            sink.lock().unwrap().push((range, store.len()));
        }
    });
    link.register_listener([observer]);
    let mut sub = link.subscribe();
    let vehicle = vehicle_socket();

    for i in 1..=5 {
        let payload = format!("{i},90,5.1,0.6,0.1,0.2,9.8,0.01,0.02,0.03");
        vehicle.send_to(payload.as_bytes(), link.telemetry_addr()).unwrap();
        timeout(Duration::from_secs(2), sub.recv()).await.unwrap().unwrap();
    }

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen, vec![(1.0, 1), (2.0, 2), (3.0, 3), (4.0, 4), (5.0, 5)]);

    link.shutdown().await;
}

#[tokio::test]
async fn test_paced_dispatch_drains_every_datagram() {
    let config = LinkConfig {
        dispatch_interval_ms: 200,
        ..loopback_config()
    };
    let link = RoverLink::connect(config).await.unwrap();
    let mut sub = link.subscribe();
    let vehicle = vehicle_socket();

    for _ in 0..10 {
        vehicle.send_to(REFERENCE, link.telemetry_addr()).unwrap();
    }

    for expected in 1..=10 {
        let event = timeout(Duration::from_secs(3), sub.recv()).await.unwrap().unwrap();
        assert_eq!(event.sequence, expected, "Bursts are buffered, not discarded");
    }
    assert_eq!(link.store().len(), 10);

    link.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_is_prompt_on_silent_link() {
    let link = RoverLink::connect(loopback_config()).await.unwrap();
    assert!(link.is_listening());

    // Nothing is ever sent: the worker sits in recv until cancelled.
    timeout(Duration::from_secs(1), link.shutdown())
        .await
        .expect("shutdown should not wait for a datagram");
}

#[tokio::test]
async fn test_logging_session_writes_channel_files() {
    let dir = std::env::temp_dir().join(format!("rover_link_session_{}", Uuid::new_v4()));
    let config = LinkConfig {
        logging: true,
        log_dir: dir.clone(),
        ..loopback_config()
    };
    let link = RoverLink::connect(config).await.unwrap();
    let mut sub = link.subscribe();
    let vehicle = vehicle_socket();

    for _ in 0..3 {
        vehicle.send_to(REFERENCE, link.telemetry_addr()).unwrap();
        timeout(Duration::from_secs(2), sub.recv()).await.unwrap().unwrap();
    }

    let range_path = link.log_path(Channel::Range).unwrap().to_path_buf();
    let accel_path = link.log_path(Channel::Accel).unwrap().to_path_buf();
    link.shutdown().await;

    let range = read_channel_log(&range_path, Channel::Range).unwrap();
    assert_eq!(range.len(), 3);
    assert!(range.iter().all(|r| r.value == Reading::Scalar(12.0)));

    let accel = read_channel_log(&accel_path, Channel::Accel).unwrap();
    assert_eq!(accel.last().unwrap().value, Reading::Vector(Vector3::new(0.1, 0.2, 9.8)));

    std::fs::remove_dir_all(dir).ok();
}

#[tokio::test]
async fn test_link_transmits_commands_to_vehicle() {
    let vehicle = vehicle_socket();
    vehicle.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let config = LinkConfig {
        vehicle_port: vehicle.local_addr().unwrap().port(),
        ..loopback_config()
    };
    let link = RoverLink::connect(config).await.unwrap();

    assert!(link.transmit(Command::GripUp).is_ok());
    assert!(link.transmit_token("jump").is_none());
    assert!(link.transmit_token("halt").unwrap().is_ok());

    let mut buf = [0u8; 32];
    let (len, _) = vehicle.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..len], b"gripup");
    let (len, _) = vehicle.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..len], b"halt");

    link.shutdown().await;
}

#[tokio::test]
async fn test_bind_failure_is_a_construction_error() {
    let occupied = vehicle_socket();
    let config = LinkConfig {
        telemetry_port: occupied.local_addr().unwrap().port(),
        ..loopback_config()
    };

    let err = RoverLink::connect(config).await.err().expect("port already bound");
    assert!(err.to_string().contains("bind"), "{err}");
}

#[tokio::test]
async fn test_oversized_datagram_is_dropped_not_truncated() {
    let link = RoverLink::connect(loopback_config()).await.unwrap();
    let mut sub = link.subscribe();
    let vehicle = vehicle_socket();
    let target = link.telemetry_addr();
    let limit = link.config().max_datagram_size;

    // Cut at the limit this would read as a valid ten-field sample.
    let prefix = "12,90,5.1,0.6,0.1,0.2,9.8,0.01,0.02,1";
    let oversized = format!("{prefix}{},99", "0".repeat(limit - prefix.len()));
    assert!(oversized.len() > limit);
    vehicle.send_to(oversized.as_bytes(), target).unwrap();

    // Exactly at the limit is still accepted.
    let at_limit = format!("{prefix}{}", "0".repeat(limit - prefix.len()));
    assert_eq!(at_limit.len(), limit);
    vehicle.send_to(at_limit.as_bytes(), target).unwrap();

    let event = timeout(Duration::from_secs(2), sub.recv()).await.unwrap().unwrap();
    assert_eq!(event.sequence, 1, "Only the datagram within the limit becomes a sample");
    assert!(event.sample.gyro.z > 1e200);
    assert_eq!(link.store().len(), 1);

    let stats = link.stats();
    assert_eq!(stats.datagrams_received, 2);
    assert_eq!(stats.oversized_dropped, 1);
    assert_eq!(stats.malformed_dropped, 0);
    assert_eq!(stats.samples_accepted, 1);

    link.shutdown().await;
}

#[tokio::test]
async fn test_bind_failure_leaves_no_log_files() {
    let occupied = vehicle_socket();
    let dir = std::env::temp_dir().join(format!("rover_link_unbound_{}", Uuid::new_v4()));
    let config = LinkConfig {
        telemetry_port: occupied.local_addr().unwrap().port(),
        logging: true,
        log_dir: dir.clone(),
        ..loopback_config()
    };

    assert!(RoverLink::connect(config).await.is_err(), "port already bound");
    assert!(!dir.exists(), "no log directory or header-only files after a failed bind");
}
