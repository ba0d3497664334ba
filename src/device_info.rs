use std::collections::BTreeSet;

use crate::state::ApiResponses;

pub const DOMAIN: &str = "rct_power";
pub const MANUFACTURER: &str = "RCT Power";

/// Identity of the device a sensor belongs to.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct DeviceInfo {
    pub identifiers: BTreeSet<(String, String, String)>,
    pub manufacturer: &'static str,
    pub model: Option<String>,
    pub name: String,
    pub sw_version: Option<String>,
    pub via_device: Option<(String, String, String)>,
}

pub type DeviceInfoFn = fn(&dyn ApiResponses) -> DeviceInfo;

fn text(responses: &dyn ApiResponses, name: &str) -> Option<String> {
    let value = responses.get(name)?.to_string();
    (!value.is_empty()).then_some(value)
}

fn inverter_identifier(responses: &dyn ApiResponses) -> (String, String, String) {
    let serial = text(responses, "inverter_sn").unwrap_or_default();
    (DOMAIN.to_string(), "STORAGE".to_string(), serial)
}

pub fn get_inverter_device_info(responses: &dyn ApiResponses) -> DeviceInfo {
    let identifier = inverter_identifier(responses);
    let name = text(responses, "android_description")
        .unwrap_or_else(|| format!("RCT Power Storage {}", identifier.2).trim_end().to_string());
    DeviceInfo {
        identifiers: BTreeSet::from([identifier]),
        manufacturer: MANUFACTURER,
        model: Some("RCT Power Storage".to_string()),
        name,
        sw_version: text(responses, "svnversion"),
        via_device: None,
    }
}

pub fn get_battery_device_info(responses: &dyn ApiResponses) -> DeviceInfo {
    let serial = text(responses, "battery.bms_sn").unwrap_or_default();
    let name = format!("Battery {serial}").trim_end().to_string();
    DeviceInfo {
        identifiers: BTreeSet::from([(DOMAIN.to_string(), "BATTERY".to_string(), serial)]),
        manufacturer: MANUFACTURER,
        model: Some("RCT Power Battery".to_string()),
        name,
        sw_version: text(responses, "battery.bms_software_version"),
        via_device: Some(inverter_identifier(responses)),
    }
}
