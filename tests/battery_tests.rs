use chrono::Utc;
use rover_link::telemetry::battery::{power_watts, ENERGY_PER_WATT, FULL_PACK_ENERGY};
use rover_link::telemetry::{BatteryMonitor, Observer, Sample, TelemetryStore};

fn sample(volts: f64, milliamps: f64) -> Sample {
    let line = format!("12,90,{volts},{milliamps},0.1,0.2,9.8,0.01,0.02,0.03");
    Sample::parse(&line, Utc::now()).unwrap()
}

#[test]
fn test_power_is_volts_times_milliamps() {
    assert_eq!(power_watts(5.0, 600.0), 3.0, "5 V at 600 mA draws 3 W");
    assert_eq!(power_watts(12.0, 0.0), 0.0);
}

#[test]
fn test_each_sample_deducts_energy_from_the_budget() {
    let monitor = BatteryMonitor::new();
    let mut store = TelemetryStore::new();

    store.append(&sample(5.0, 600.0));
    monitor.update(&store);

    let status = monitor.status();
    assert_eq!(status.watts, 3.0);
    assert_eq!(status.energy_consumed, 3.0 * ENERGY_PER_WATT, "27 units per sample at 3 W");
    assert_eq!(status.energy_remaining, FULL_PACK_ENERGY - 27.0);
    assert_eq!(status.samples, 1);

    store.append(&sample(10.0, 1000.0));
    monitor.update(&store);

    let status = monitor.status();
    assert_eq!(status.watts, 10.0, "Status tracks the latest sample");
    assert_eq!(status.energy_remaining, FULL_PACK_ENERGY - 27.0 - 90.0);
    assert_eq!(status.samples, 2);
}

#[test]
fn test_budget_never_goes_negative() {
    let monitor = BatteryMonitor::with_remaining(50.0);
    let mut store = TelemetryStore::new();

    store.append(&sample(10.0, 1000.0));
    monitor.update(&store);

    assert_eq!(monitor.status().energy_remaining, 0.0, "Exhausted pack stays at zero");
    assert_eq!(BatteryMonitor::with_remaining(-5.0).status().energy_remaining, 0.0);
}

#[test]
fn test_empty_store_leaves_budget_untouched() {
    let monitor = BatteryMonitor::default();
    monitor.update(&TelemetryStore::new());

    assert_eq!(monitor.status().energy_remaining, FULL_PACK_ENERGY);
    assert_eq!(monitor.status().samples, 0);
}

#[test]
fn test_power_series_covers_retained_history() {
    let mut store = TelemetryStore::new();
    store.append(&sample(5.0, 600.0));
    store.append(&sample(4.0, 500.0));

    assert_eq!(BatteryMonitor::power_series(&store), vec![3.0, 2.0]);
}
