use std::collections::BTreeSet;

use rct_power_sensors::entities::{
    BATTERY_SENSOR_DESCRIPTIONS, BITFIELD_SENSOR_DESCRIPTIONS, EntityDescription,
    INVERTER_SENSOR_DESCRIPTIONS, UpdatePriority, all_entity_descriptions, find_description,
};
use rct_power_sensors::registers::{Catalogue as _, REGISTRY, Value, get_matching_names};
use rct_power_sensors::state::{NativeValue, ResponseValues};

#[test]
fn master_list_is_battery_then_inverter_then_bitfield() {
    let all = all_entity_descriptions();
    let expected_len = BATTERY_SENSOR_DESCRIPTIONS.len()
        + INVERTER_SENSOR_DESCRIPTIONS.len()
        + BITFIELD_SENSOR_DESCRIPTIONS.len();
    assert_eq!(all.len(), expected_len);

    let keys = all.iter().map(|d| d.key()).collect::<Vec<_>>();
    let expected = BATTERY_SENSOR_DESCRIPTIONS
        .iter()
        .map(|d| d.key)
        .chain(INVERTER_SENSOR_DESCRIPTIONS.iter().map(|d| d.key))
        .chain(BITFIELD_SENSOR_DESCRIPTIONS.iter().map(|d| d.sensor.key))
        .collect::<Vec<_>>();
    assert_eq!(keys, expected);
    assert_eq!(keys.first(), Some(&"battery.stored_energy"));
    assert_eq!(keys.last(), Some(&"battery.bat_status"));
}

#[test]
fn unique_ids_are_unique() {
    let all = all_entity_descriptions();
    let unique = all.iter().map(|d| d.unique_id()).collect::<BTreeSet<_>>();
    assert_eq!(unique.len(), all.len());
}

#[test]
fn object_names_resolve_in_the_catalogue() {
    for description in all_entity_descriptions() {
        for name in description.object_names() {
            assert!(REGISTRY.lookup(name).is_some(), "{} reads unknown {name}", description.key());
        }
    }
}

#[test]
fn every_tier_is_used() {
    let tiers = all_entity_descriptions()
        .iter()
        .map(|d| d.update_priority())
        .collect::<BTreeSet<_>>();
    assert_eq!(tiers.len(), 3);
    assert!(tiers.contains(&UpdatePriority::Static));
}

#[test]
fn matcher_is_deterministic_and_within_catalogue() {
    let catalogue = REGISTRY.all().map(|info| info.name).collect::<BTreeSet<_>>();
    for pattern in ["", "battery", r"energy\.e_grid_(feed|load)", ".*total", "nothing.matches"] {
        let first = get_matching_names(pattern).unwrap();
        assert_eq!(first, get_matching_names(pattern).unwrap());
        assert!(first.iter().all(|name| catalogue.contains(name)));
    }
    assert!(get_matching_names("(unclosed").is_err());
}

#[test]
fn sensors_compute_states_from_responses() {
    let responses: ResponseValues = [
        ("energy.e_dc_total[0]", Value::Float(1200.5)),
        ("energy.e_dc_total[1]", Value::Float(799.5)),
        ("energy.e_grid_feed_total", Value::Float(-5000.0)),
        ("power_mng.bat_next_calib_date", Value::I32(1_735_689_600)),
        ("battery.bat_status", Value::I32(0)),
    ]
    .into_iter()
    .collect();
    let state = |key: &str| find_description(key).unwrap().native_value(&responses);

    assert_eq!(state("energy.e_dc_total"), Some(NativeValue::Float(2000.0)));
    assert_eq!(state("energy.e_grid_feed_absolute_total"), Some(NativeValue::Float(5000.0)));
    assert_eq!(state("battery.bat_status"), Some(NativeValue::Text("normal".into())));
    let Some(NativeValue::Timestamp(calibration)) = state("power_mng.bat_next_calib_date") else {
        panic!("calibration date should be a timestamp");
    };
    assert_eq!(calibration.to_string(), "2025-01-01T00:00:00Z");
    // Not part of the responses.
    assert_eq!(state("energy.e_load_day"), None);
    assert_eq!(state("fault.flt"), None);
}
