use tracing::trace;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Bool,
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Enum,
    Float,
    String,
}

impl DataType {
    // Convenience aliases for nicely tabulated `for_each_register` macro definition below.
    pub const BOOL: Self = Self::Bool;
    pub const U8: Self = Self::Uint8;
    pub const I8: Self = Self::Int8;
    pub const U16: Self = Self::Uint16;
    pub const I16: Self = Self::Int16;
    pub const U32: Self = Self::Uint32;
    pub const I32: Self = Self::Int32;
    pub const ENM: Self = Self::Enum;
    pub const F32: Self = Self::Float;
    pub const STR: Self = Self::String;

    /// Parse a textual representation of a value of this data type.
    ///
    /// Booleans accept `true`/`false` as well as `1`/`0`. Enumerations are read as their raw
    /// numeric code.
    pub fn parse(self, input: &str) -> Result<Value, ParseValueError> {
        let error = || ParseValueError {
            input: input.to_string(),
            data_type: self,
        };
        let trimmed = input.trim();
        Ok(match self {
            Self::Bool => match trimmed {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => return Err(error()),
            },
            Self::Uint8 | Self::Enum => Value::U8(trimmed.parse().map_err(|_| error())?),
            Self::Int8 => Value::I8(trimmed.parse().map_err(|_| error())?),
            Self::Uint16 => Value::U16(trimmed.parse().map_err(|_| error())?),
            Self::Int16 => Value::I16(trimmed.parse().map_err(|_| error())?),
            Self::Uint32 => Value::U32(trimmed.parse().map_err(|_| error())?),
            Self::Int32 => Value::I32(trimmed.parse().map_err(|_| error())?),
            Self::Float => Value::Float(trimmed.parse().map_err(|_| error())?),
            Self::String => Value::String(input.to_string()),
        })
    }
}

#[derive(thiserror::Error, Debug)]
#[error("`{input}` is not a valid {data_type} value")]
pub struct ParseValueError {
    input: String,
    data_type: DataType,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    Float(f32),
    String(String),
}

impl Value {
    /// The value as an integer, if it is one. Booleans count as `0` or `1`.
    pub fn as_integer(&self) -> Option<i64> {
        Some(match *self {
            Value::Bool(b) => i64::from(b),
            Value::U8(n) => i64::from(n),
            Value::I8(n) => i64::from(n),
            Value::U16(n) => i64::from(n),
            Value::I16(n) => i64::from(n),
            Value::U32(n) => i64::from(n),
            Value::I32(n) => i64::from(n),
            Value::Float(_) | Value::String(_) => return None,
        })
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(f64::from(*n)),
            Value::String(_) => None,
            other => other.as_integer().map(|n| n as f64),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => f.write_fmt(format_args!("{}", b)),
            Value::Float(n) => f.write_fmt(format_args!("{}", n)),
            Value::String(s) => f.write_str(s),
            other => f.write_fmt(format_args!("{}", other.as_integer().unwrap_or_default())),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::U8(n) => serializer.serialize_u8(*n),
            Value::I8(n) => serializer.serialize_i8(*n),
            Value::U16(n) => serializer.serialize_u16(*n),
            Value::I16(n) => serializer.serialize_i16(*n),
            Value::U32(n) => serializer.serialize_u32(*n),
            Value::I32(n) => serializer.serialize_i32(*n),
            Value::Float(n) => serializer.serialize_f32(*n),
            Value::String(s) => serializer.serialize_str(s),
        }
    }
}

/// A single entry of a register catalogue.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct ObjectInfo {
    pub object_id: u32,
    pub name: &'static str,
    pub data_type: DataType,
    pub unit: Option<&'static str>,
    pub description: &'static str,
}

/// Read-only view over a set of known registers.
pub trait Catalogue {
    /// All registers in the catalogue's iteration order.
    fn all(&self) -> Box<dyn Iterator<Item = ObjectInfo> + '_>;

    fn lookup(&self, name: &str) -> Option<ObjectInfo> {
        self.all().find(|info| info.name == name)
    }
}

impl Catalogue for [ObjectInfo] {
    fn all(&self) -> Box<dyn Iterator<Item = ObjectInfo> + '_> {
        Box::new(self.iter().copied())
    }
}

/// The catalogue of registers bundled with this crate.
pub struct Registry;

pub static REGISTRY: Registry = Registry;

impl Catalogue for Registry {
    fn all(&self) -> Box<dyn Iterator<Item = ObjectInfo> + '_> {
        Box::new((0..NAMES.len()).map(|index| RegisterIndex(index).info()))
    }

    fn lookup(&self, name: &str) -> Option<ObjectInfo> {
        RegisterIndex::from_name(name).map(|index| index.info())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterIndex(usize);

impl RegisterIndex {
    pub fn from_object_id(object_id: u32) -> Option<RegisterIndex> {
        OBJECT_IDS.iter().position(|v| *v == object_id).map(Self)
    }

    pub fn from_name(name: &str) -> Option<RegisterIndex> {
        let index = NAMES.into_iter().position(|v| *v == name);
        index.map(Self)
    }

    pub fn object_id(&self) -> u32 {
        OBJECT_IDS[self.0]
    }

    pub fn name(&self) -> &'static str {
        NAMES[self.0]
    }

    pub fn data_type(&self) -> DataType {
        DATA_TYPES[self.0]
    }

    pub fn unit(&self) -> Option<&'static str> {
        UNITS[self.0]
    }

    pub fn description(&self) -> &'static str {
        DESCRIPTIONS[self.0]
    }

    pub fn info(&self) -> ObjectInfo {
        ObjectInfo {
            object_id: self.object_id(),
            name: self.name(),
            data_type: self.data_type(),
            unit: self.unit(),
            description: self.description(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("could not compile the register name pattern `{1}`")]
    InvalidPattern(#[source] regex::Error, String),
}

/// Names of all registers in `catalogue` matching `expression` at the very start of the name.
///
/// The expression need not consume the entire name: `energy\.e_dc` matches
/// `energy.e_dc_total[0]`. The returned names follow the catalogue's iteration order.
pub fn matching_names<C: Catalogue + ?Sized>(
    catalogue: &C,
    expression: &str,
) -> Result<Vec<&'static str>, Error> {
    let compiled = regex::Regex::new(expression)
        .map_err(|e| Error::InvalidPattern(e, expression.to_string()))?;
    // The leftmost match starts at offset 0 whenever there is any match starting there.
    let names = catalogue
        .all()
        .filter(|info| compiled.find(info.name).is_some_and(|m| m.start() == 0))
        .map(|info| info.name)
        .collect::<Vec<_>>();
    trace!(expression, matches = names.len(), "matched register names");
    Ok(names)
}

/// [`matching_names`] over the bundled [`REGISTRY`].
pub fn get_matching_names(expression: &str) -> Result<Vec<&'static str>, Error> {
    matching_names(&REGISTRY, expression)
}

macro_rules! for_each_register {
    ($m:ident) => {
        $m! {
            0x5570401B: F32, "battery.stored_energy", "Total energy flow into battery", unit = "Wh";
            0xA9033880: F32, "battery.used_energy", "Total energy flow from battery", unit = "Wh";
            0x70A2AF4F: I32, "battery.bat_status", "Battery status";
            0x959930BF: F32, "battery.soc", "SOC (State of charge)";
            0x381B8BF9: F32, "battery.soh", "SOH (State of Health)";
            0xA7FA5C5D: F32, "battery.voltage", "Battery voltage", unit = "V";
            0x21961B58: F32, "battery.current", "Battery current", unit = "A";
            0xC0DF2978: I32, "battery.cycles", "Battery charge cycles";
            0x16A1F844: STR, "battery.bms_sn", "BMS serial number";
            0x1B39A3A3: U32, "battery.bms_software_version", "BMS software version";
            0x1D2994EA: I32, "power_mng.bat_next_calib_date", "Next battery calibration";
            0x400F015B: F32, "g_sync.p_acc_lp", "Battery power (positive if discharge)", unit = "W";
            0xEBC62737: STR, "android_description", "Device name";
            0x7924ABD9: STR, "inverter_sn", "Serial number";
            0x9A51A23B: STR, "svnversion", "Control software version";
            0x5F33284E: ENM, "prim_sm.state", "Inverter status";
            0x2F3C1D7D: F32, "energy.e_load_day", "Household day energy", unit = "Wh";
            0xEFF4B537: F32, "energy.e_load_total", "Household total energy", unit = "Wh";
            0x3C87C4F5: F32, "energy.e_grid_feed_day", "Day energy grid feed-in", unit = "Wh";
            0x65B624AB: F32, "energy.e_grid_feed_month", "Month energy grid feed-in", unit = "Wh";
            0x26EFFC2F: F32, "energy.e_grid_feed_year", "Year energy grid feed-in", unit = "Wh";
            0x44D4C533: F32, "energy.e_grid_feed_total", "Total energy grid feed-in", unit = "Wh";
            0x867DEF7D: F32, "energy.e_grid_load_day", "Day energy grid load", unit = "Wh";
            0x126ABC86: F32, "energy.e_grid_load_month", "Month energy grid load", unit = "Wh";
            0xDE17F021: F32, "energy.e_grid_load_year", "Year energy grid load", unit = "Wh";
            0x62FBE7DC: F32, "energy.e_grid_load_total", "Total energy grid load", unit = "Wh";
            0xB1EF67CE: F32, "energy.e_ac_total", "Total inverter energy", unit = "Wh";
            0xFC724A9E: F32, "energy.e_dc_total[0]", "Solar generator A total energy", unit = "Wh";
            0x68EEFD3D: F32, "energy.e_dc_total[1]", "Solar generator B total energy", unit = "Wh";
            0xDB11855B: F32, "dc_conv.dc_conv_struct[0].p_dc", "Solar generator A power", unit = "W";
            0x0CB5D21B: F32, "dc_conv.dc_conv_struct[1].p_dc", "Solar generator B power", unit = "W";
            0xB55BA2CE: F32, "dc_conv.dc_conv_struct[0].u_sg_lp", "Solar generator A voltage", unit = "V";
            0xB0041187: F32, "dc_conv.dc_conv_struct[1].u_sg_lp", "Solar generator B voltage", unit = "V";
            0x1AC87AA0: F32, "g_sync.p_ac_load_sum_lp", "Load household - external Power", unit = "W";
            0x91617C58: F32, "g_sync.p_ac_grid_sum_lp", "Total grid power", unit = "W";
            0xDB2D69AE: F32, "g_sync.p_ac_sum_lp", "AC power", unit = "W";
            0x1C4A665F: F32, "grid_pll[0].f", "Grid frequency", unit = "Hz";
            0x37F9D5CA: U32, "fault[0].flt", "Error bit field 1";
            0x234B4736: U32, "fault[1].flt", "Error bit field 2";
            0x3B7FCD47: U32, "fault[2].flt", "Error bit field 3";
            0x7F813D73: U32, "fault[3].flt", "Error bit field 4";
            0xC36675D4: BOOL, "buf_v_control.power_reduction_max_solar_grid", "Max. solar power to grid limit active";
        }
    };
}

macro_rules! optional {
    () => {
        None
    };
    ($($lit: tt)+) => {
        Some($($lit)*)
    };
}

macro_rules! make_lists {
    ($($id: literal: $dt: ident, $name: literal, $description: literal $(, unit = $unit: literal)?;)+) => {
        pub static OBJECT_IDS: &[u32] = &[$($id),*];
        pub static NAMES: &[&str] = &[$($name),*];
        pub static DATA_TYPES: &[DataType] = &[$(DataType::$dt),*];
        pub static UNITS: &[Option<&str>] = &[$(optional!($($unit)?)),*];
        pub static DESCRIPTIONS: &[&str] = &[$($description),*];
    };
}

for_each_register!(make_lists);

const _: () = {
    let mut index = 0;
    while index < OBJECT_IDS.len() {
        let mut other = index + 1;
        while other < OBJECT_IDS.len() {
            if OBJECT_IDS[index] == OBJECT_IDS[other] {
                panic!("OBJECT_IDS has duplicate values!");
            }
            other += 1;
        }
        index += 1;
    }
};
