//! Static descriptions of all sensors exposed for an RCT Power system.
//!
//! The descriptions are built once and never change. The polling layer uses
//! [`EntityDescription::object_names`] and [`EntityDescription::update_priority`] to decide which
//! registers to read when, and hands the responses back to
//! [`EntityDescription::native_value`] to compute the reported state.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use tracing::{debug, trace};

use crate::device_info::{
    DeviceInfo, DeviceInfoFn, get_battery_device_info, get_inverter_device_info,
};
use crate::registers::Catalogue;
use crate::state::{
    AVAILABLE_BATTERY_STATUS, ApiResponses, NativeValue, NativeValueFn,
    first_value_as_absolute_state, first_value_as_battery_status, first_value_as_state,
    first_value_as_timestamp, sum_values_as_state, values_as_bitfield,
};

/// How often the registers behind a sensor are refreshed.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    strum::Display,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UpdatePriority {
    Static,
    Infrequent,
    Frequent,
}

/// How the consuming platform aggregates the history of a counter.
///
/// `Total` counters may go up and down or be reset by the device at any time, whereas
/// `TotalIncreasing` counters only ever grow and a drop is treated as a reset.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    Total,
    TotalIncreasing,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Energy,
    Timestamp,
    Enum,
}

pub struct SensorDescription {
    pub key: &'static str,
    /// Defaults to `key`.
    pub unique_id: Option<&'static str>,
    /// Registers feeding this sensor. Defaults to `[key]`.
    pub object_names: Option<&'static [&'static str]>,
    pub name: &'static str,
    pub update_priority: UpdatePriority,
    pub get_device_info: DeviceInfoFn,
    pub get_native_value: Option<NativeValueFn>,
    pub device_class: Option<DeviceClass>,
    pub state_class: Option<StateClass>,
    /// Defaults to the catalogue unit of the first object name.
    pub native_unit_of_measurement: Option<&'static str>,
}

impl SensorDescription {
    pub const fn new(
        get_device_info: DeviceInfoFn,
        key: &'static str,
        name: &'static str,
        update_priority: UpdatePriority,
    ) -> Self {
        Self {
            key,
            unique_id: None,
            object_names: None,
            name,
            update_priority,
            get_device_info,
            get_native_value: None,
            device_class: None,
            state_class: None,
            native_unit_of_measurement: None,
        }
    }

    pub const fn unique_id(mut self, unique_id: &'static str) -> Self {
        self.unique_id = Some(unique_id);
        self
    }

    pub const fn object_names(mut self, object_names: &'static [&'static str]) -> Self {
        self.object_names = Some(object_names);
        self
    }

    pub const fn native_value(mut self, get_native_value: NativeValueFn) -> Self {
        self.get_native_value = Some(get_native_value);
        self
    }

    pub const fn device_class(mut self, device_class: DeviceClass) -> Self {
        self.device_class = Some(device_class);
        self
    }

    pub const fn state_class(mut self, state_class: StateClass) -> Self {
        self.state_class = Some(state_class);
        self
    }
}

/// A sensor whose raw values are encoded flags or status codes.
pub struct BitfieldSensorDescription {
    pub sensor: SensorDescription,
    /// Labels the sensor may report.
    pub options: Option<&'static [&'static str]>,
}

impl BitfieldSensorDescription {
    pub const fn new(sensor: SensorDescription) -> Self {
        Self { sensor, options: None }
    }

    pub const fn options(mut self, options: &'static [&'static str]) -> Self {
        self.options = Some(options);
        self
    }
}

pub trait EntityDescription: Sync {
    fn sensor(&self) -> &SensorDescription;

    fn key(&self) -> &'static str {
        self.sensor().key
    }

    fn unique_id(&self) -> &'static str {
        let sensor = self.sensor();
        sensor.unique_id.unwrap_or(sensor.key)
    }

    fn object_names(&self) -> &[&'static str] {
        let sensor = self.sensor();
        match sensor.object_names {
            Some(names) => names,
            None => std::slice::from_ref(&sensor.key),
        }
    }

    fn name(&self) -> &'static str {
        self.sensor().name
    }

    fn update_priority(&self) -> UpdatePriority {
        self.sensor().update_priority
    }

    fn state_class(&self) -> Option<StateClass> {
        self.sensor().state_class
    }

    /// Unit of the reported state, looked up in `catalogue` unless set explicitly.
    fn unit(&self, catalogue: &dyn Catalogue) -> Option<&'static str> {
        let sensor = self.sensor();
        if sensor.native_unit_of_measurement.is_some() {
            return sensor.native_unit_of_measurement;
        }
        if matches!(sensor.device_class, Some(DeviceClass::Timestamp | DeviceClass::Enum)) {
            return None;
        }
        catalogue.lookup(self.object_names().first()?)?.unit
    }

    fn device_class(&self, catalogue: &dyn Catalogue) -> Option<DeviceClass> {
        self.sensor().device_class.or_else(|| match self.unit(catalogue)? {
            "Wh" | "kWh" => Some(DeviceClass::Energy),
            _ => None,
        })
    }

    fn options(&self) -> Option<&'static [&'static str]> {
        None
    }

    /// Transform used when the description does not name one.
    fn default_native_value(&self) -> NativeValueFn {
        first_value_as_state
    }

    fn device_info(&self, responses: &dyn ApiResponses) -> DeviceInfo {
        (self.sensor().get_device_info)(responses)
    }

    fn native_value(&self, responses: &dyn ApiResponses) -> Option<NativeValue> {
        let values = self
            .object_names()
            .iter()
            .map(|name| responses.get(name))
            .collect::<Vec<_>>();
        let transform = self.sensor().get_native_value.unwrap_or(self.default_native_value());
        let value = transform(&values);
        trace!(key = self.key(), ?value, "computed native value");
        value
    }
}

impl EntityDescription for SensorDescription {
    fn sensor(&self) -> &SensorDescription {
        self
    }
}

impl EntityDescription for BitfieldSensorDescription {
    fn sensor(&self) -> &SensorDescription {
        &self.sensor
    }

    fn options(&self) -> Option<&'static [&'static str]> {
        self.options
    }

    fn default_native_value(&self) -> NativeValueFn {
        values_as_bitfield
    }
}

pub static BATTERY_SENSOR_DESCRIPTIONS: [SensorDescription; 3] = [
    SensorDescription::new(
        get_battery_device_info,
        "battery.stored_energy",
        "Battery Stored Energy",
        UpdatePriority::Frequent,
    )
    .state_class(StateClass::TotalIncreasing),
    SensorDescription::new(
        get_battery_device_info,
        "battery.used_energy",
        "Battery Used Energy",
        UpdatePriority::Frequent,
    )
    .state_class(StateClass::TotalIncreasing),
    SensorDescription::new(
        get_battery_device_info,
        "power_mng.bat_next_calib_date",
        "Next Battery Calibration Date",
        UpdatePriority::Infrequent,
    )
    .device_class(DeviceClass::Timestamp)
    .native_value(first_value_as_timestamp),
];

pub static INVERTER_SENSOR_DESCRIPTIONS: [SensorDescription; 10] = [
    SensorDescription::new(
        get_inverter_device_info,
        "android_description",
        "Inverter Device Name",
        UpdatePriority::Static,
    ),
    SensorDescription::new(
        get_inverter_device_info,
        "energy.e_load_day",
        "Consumer Energy Consumption Day",
        UpdatePriority::Infrequent,
    )
    .state_class(StateClass::TotalIncreasing),
    SensorDescription::new(
        get_inverter_device_info,
        "energy.e_load_total",
        "Consumer Energy Consumption Total",
        UpdatePriority::Infrequent,
    )
    .state_class(StateClass::TotalIncreasing),
    SensorDescription::new(
        get_inverter_device_info,
        "energy.e_grid_feed_day",
        "Grid Energy Production Day",
        UpdatePriority::Infrequent,
    )
    .state_class(StateClass::Total),
    SensorDescription::new(
        get_inverter_device_info,
        "energy.e_grid_feed_month",
        "Grid Energy Production Month",
        UpdatePriority::Infrequent,
    )
    .state_class(StateClass::Total),
    SensorDescription::new(
        get_inverter_device_info,
        "energy.e_grid_feed_absolute_total",
        "Grid Energy Production Absolute Total",
        UpdatePriority::Infrequent,
    )
    // Spelled out so it never collides with a sensor keyed by the underlying register.
    .unique_id("energy.e_grid_feed_absolute_total")
    .object_names(&["energy.e_grid_feed_total"])
    .state_class(StateClass::TotalIncreasing)
    .native_value(first_value_as_absolute_state),
    SensorDescription::new(
        get_inverter_device_info,
        "energy.e_grid_load_day",
        "Grid Energy Consumption Day",
        UpdatePriority::Infrequent,
    )
    .state_class(StateClass::TotalIncreasing),
    SensorDescription::new(
        get_inverter_device_info,
        "energy.e_grid_load_month",
        "Grid Energy Consumption Month",
        UpdatePriority::Infrequent,
    )
    .state_class(StateClass::TotalIncreasing),
    SensorDescription::new(
        get_inverter_device_info,
        "energy.e_grid_load_total",
        "Grid Energy Consumption Total",
        UpdatePriority::Infrequent,
    )
    .state_class(StateClass::TotalIncreasing),
    SensorDescription::new(
        get_inverter_device_info,
        "energy.e_dc_total",
        "All Generators Energy Production Total",
        UpdatePriority::Infrequent,
    )
    .object_names(&["energy.e_dc_total[0]", "energy.e_dc_total[1]"])
    .state_class(StateClass::TotalIncreasing)
    .native_value(sum_values_as_state),
];

/// Unique id the fault sensor had before it was keyed by name.
///
/// Registered under this literal rather than the decimal form of `fault[0].flt`'s object id
/// (`0x37F9D5CA` is 939120074), so it does not follow from the register table.
pub const FAULTS_LEGACY_UNIQUE_ID: &str = "939524042";

pub static BITFIELD_SENSOR_DESCRIPTIONS: [BitfieldSensorDescription; 2] = [
    BitfieldSensorDescription::new(
        SensorDescription::new(
            get_inverter_device_info,
            "fault.flt",
            "Faults",
            UpdatePriority::Frequent,
        )
        .object_names(&["fault[0].flt", "fault[1].flt", "fault[2].flt", "fault[3].flt"])
        .unique_id(FAULTS_LEGACY_UNIQUE_ID),
    ),
    BitfieldSensorDescription::new(
        SensorDescription::new(
            get_battery_device_info,
            "battery.bat_status",
            "Battery Status",
            UpdatePriority::Frequent,
        )
        .device_class(DeviceClass::Enum)
        .native_value(first_value_as_battery_status),
    )
    .options(AVAILABLE_BATTERY_STATUS),
];

/// Per-sensor descriptions in battery, inverter, bitfield order.
pub fn sensor_entity_descriptions() -> impl Iterator<Item = &'static dyn EntityDescription> {
    let battery = BATTERY_SENSOR_DESCRIPTIONS.iter().map(|d| d as &dyn EntityDescription);
    let inverter = INVERTER_SENSOR_DESCRIPTIONS.iter().map(|d| d as &dyn EntityDescription);
    let bitfield = BITFIELD_SENSOR_DESCRIPTIONS.iter().map(|d| d as &dyn EntityDescription);
    battery.chain(inverter).chain(bitfield)
}

static ALL_ENTITY_DESCRIPTIONS: LazyLock<Vec<&'static dyn EntityDescription>> =
    LazyLock::new(|| sensor_entity_descriptions().collect());

/// Every description exposed to the entity registration layer.
pub fn all_entity_descriptions() -> &'static [&'static dyn EntityDescription] {
    &ALL_ENTITY_DESCRIPTIONS
}

/// Look a description up by its key or unique id.
pub fn find_description(key: &str) -> Option<&'static dyn EntityDescription> {
    all_entity_descriptions()
        .iter()
        .copied()
        .find(|d| d.key() == key || d.unique_id() == key)
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("sensor `{key}` reuses the unique id `{unique_id}`")]
    DuplicateUniqueId { key: &'static str, unique_id: &'static str },
    #[error("sensor `{key}` reads `{object_name}`, which is not a known register")]
    UnknownObjectName { key: &'static str, object_name: &'static str },
}

/// Check that unique ids do not collide and that every object name is a known register.
pub fn validate<'a, C: Catalogue + ?Sized>(
    descriptions: impl IntoIterator<Item = &'a dyn EntityDescription>,
    catalogue: &C,
) -> Result<(), Error> {
    let mut unique_ids = BTreeSet::new();
    let mut count = 0;
    for description in descriptions {
        let (key, unique_id) = (description.key(), description.unique_id());
        if !unique_ids.insert(unique_id) {
            return Err(Error::DuplicateUniqueId { key, unique_id });
        }
        for &object_name in description.object_names() {
            if catalogue.lookup(object_name).is_none() {
                return Err(Error::UnknownObjectName { key, object_name });
            }
        }
        count += 1;
    }
    debug!(count, "validated sensor descriptions");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{DataType, ObjectInfo, REGISTRY, Value};
    use crate::state::ResponseValues;

    #[test]
    fn bundled_descriptions_are_consistent() {
        validate(all_entity_descriptions().iter().copied(), &REGISTRY).unwrap();
    }

    #[test]
    fn object_names_default_to_key() {
        for description in all_entity_descriptions() {
            if description.sensor().object_names.is_none() {
                assert_eq!(description.object_names(), [description.key()]);
            }
        }
    }

    #[test]
    fn legacy_fault_unique_id() {
        let faults = find_description("fault.flt").unwrap();
        assert_eq!(faults.unique_id(), "939524042");
        assert_eq!(faults.object_names().len(), 4);
        assert!(std::ptr::eq(find_description("939524042").unwrap().sensor(), faults.sensor()));
    }

    #[test]
    fn duplicate_unique_ids_are_rejected() {
        let a = SensorDescription::new(get_inverter_device_info, "x", "X", UpdatePriority::Static)
            .object_names(&["battery.soc"]);
        let b = SensorDescription::new(get_inverter_device_info, "y", "Y", UpdatePriority::Static)
            .object_names(&["battery.soh"])
            .unique_id("x");
        let descriptions = [&a as &dyn EntityDescription, &b];
        let err = validate(descriptions, &REGISTRY).unwrap_err();
        assert!(matches!(err, Error::DuplicateUniqueId { key: "y", unique_id: "x" }));
    }

    #[test]
    fn unknown_object_names_are_rejected() {
        let a = SensorDescription::new(get_inverter_device_info, "x", "X", UpdatePriority::Static)
            .object_names(&["battery.soc", "battery.nope"]);
        let err = validate([&a as &dyn EntityDescription], &REGISTRY).unwrap_err();
        assert!(matches!(err, Error::UnknownObjectName { object_name: "battery.nope", .. }));
    }

    struct KiloCatalogue;

    impl Catalogue for KiloCatalogue {
        fn all(&self) -> Box<dyn Iterator<Item = ObjectInfo> + '_> {
            Box::new(std::iter::once(ObjectInfo {
                object_id: 1,
                name: "energy.e_load_day",
                data_type: DataType::Float,
                unit: Some("kWh"),
                description: "",
            }))
        }
    }

    #[test]
    fn unit_comes_from_the_given_catalogue() {
        let load = find_description("energy.e_load_day").unwrap();
        assert_eq!(load.unit(&REGISTRY), Some("Wh"));
        assert_eq!(load.unit(&KiloCatalogue), Some("kWh"));
        assert_eq!(load.device_class(&KiloCatalogue), Some(DeviceClass::Energy));
        let name = find_description("android_description").unwrap();
        assert_eq!(name.unit(&KiloCatalogue), None);
        assert_eq!(name.device_class(&KiloCatalogue), None);
    }

    #[test]
    fn generators_are_summed() {
        let generators = find_description("energy.e_dc_total").unwrap();
        let responses: ResponseValues = [
            ("energy.e_dc_total[0]", Value::Float(10.0)),
            ("energy.e_dc_total[1]", Value::Float(5.0)),
        ]
        .into_iter()
        .collect();
        assert_eq!(generators.native_value(&responses), Some(NativeValue::Float(15.0)));
        assert_eq!(generators.unit(&REGISTRY), Some("Wh"));
        assert_eq!(generators.device_class(&REGISTRY), Some(DeviceClass::Energy));
    }

    #[test]
    fn grid_feed_total_is_absolute() {
        let feed = find_description("energy.e_grid_feed_absolute_total").unwrap();
        let responses: ResponseValues =
            [("energy.e_grid_feed_total", Value::Float(-42.0))].into_iter().collect();
        assert_eq!(feed.native_value(&responses), Some(NativeValue::Float(42.0)));
        assert_eq!(feed.state_class(), Some(StateClass::TotalIncreasing));
        let day = find_description("energy.e_grid_feed_day").unwrap();
        assert_eq!(day.state_class(), Some(StateClass::Total));
    }

    #[test]
    fn battery_status_has_options() {
        let status = find_description("battery.bat_status").unwrap();
        assert_eq!(status.options(), Some(AVAILABLE_BATTERY_STATUS));
        assert_eq!(status.unit(&REGISTRY), None);
        assert_eq!(status.device_class(&REGISTRY), Some(DeviceClass::Enum));
        let responses: ResponseValues =
            [("battery.bat_status", Value::I32(-17))].into_iter().collect();
        assert_eq!(status.native_value(&responses), Some(NativeValue::Text("unknown".into())));
        assert_eq!(status.native_value(&ResponseValues::new()), None);
        assert_eq!(status.device_info(&responses).identifiers.len(), 1);
    }

    #[test]
    fn faults_default_to_bitfield() {
        let faults = find_description("fault.flt").unwrap();
        let responses: ResponseValues = [
            ("fault[0].flt", Value::U32(1)),
            ("fault[1].flt", Value::U32(0)),
            ("fault[2].flt", Value::U32(0)),
            ("fault[3].flt", Value::U32(0)),
        ]
        .into_iter()
        .collect();
        let Some(NativeValue::Text(bits)) = faults.native_value(&responses) else {
            panic!("faults should produce a bit string");
        };
        assert_eq!(bits.len(), 128);
        assert!(bits.starts_with('1'));
    }

    #[test]
    fn device_name_is_passed_through() {
        let name = find_description("android_description").unwrap();
        assert_eq!(name.update_priority(), UpdatePriority::Static);
        let responses: ResponseValues =
            [("android_description", Value::String("Garage".into()))].into_iter().collect();
        assert_eq!(name.native_value(&responses), Some(NativeValue::Text("Garage".into())));
    }
}
