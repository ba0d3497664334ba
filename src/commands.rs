pub mod registers {
    use crate::output;
    use crate::registers::{Catalogue as _, DataType, ObjectInfo, REGISTRY, matching_names};

    /// Search and output the known registers whose names match a regular expression.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: output::Args,
        /// Regular expression the register names must match at their start.
        ///
        /// For example `energy\.e_grid` or `fault\[\d\]`. Lists all registers when omitted.
        pattern: Option<String>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not search the register catalogue")]
        Search(#[source] crate::registers::Error),
        #[error("could not output the registers")]
        Output(#[source] output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct RegisterSchema {
        #[serde(serialize_with = "serialize_object_id")]
        pub object_id: u32,
        pub name: &'static str,
        pub data_type: DataType,
        pub unit: Option<&'static str>,
        pub description: &'static str,
    }

    fn serialize_object_id<S: serde::Serializer>(id: &u32, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&format_args!("0x{id:08X}"))
    }

    impl From<ObjectInfo> for RegisterSchema {
        fn from(info: ObjectInfo) -> Self {
            Self {
                object_id: info.object_id,
                name: info.name,
                data_type: info.data_type,
                unit: info.unit,
                description: info.description,
            }
        }
    }

    impl output::Record for RegisterSchema {
        fn headers() -> &'static [&'static str] {
            &["Object ID", "Name", "Type", "Unit", "Description"]
        }

        fn row(&self) -> Vec<String> {
            vec![
                format!("0x{:08X}", self.object_id),
                self.name.to_string(),
                self.data_type.to_string(),
                self.unit.unwrap_or_default().to_string(),
                self.description.to_string(),
            ]
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let names = matching_names(&REGISTRY, args.pattern.as_deref().unwrap_or(""))
            .map_err(Error::Search)?;
        let records = names
            .into_iter()
            .filter_map(|name| REGISTRY.lookup(name))
            .map(RegisterSchema::from);
        args.output.write_records(records).map_err(Error::Output)
    }
}

pub mod sensors {
    use crate::entities::{
        self, DeviceClass, EntityDescription, StateClass, UpdatePriority, all_entity_descriptions,
    };
    use crate::output;
    use crate::registers::REGISTRY;

    /// Output the descriptions of all sensors exposed for the device.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: output::Args,
        /// Check the descriptions for duplicate ids and unknown registers before printing them.
        #[arg(long)]
        validate: bool,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("the sensor descriptions are inconsistent")]
        Validate(#[source] entities::Error),
        #[error("could not output the sensors")]
        Output(#[source] output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct SensorSchema {
        pub key: &'static str,
        pub unique_id: &'static str,
        pub object_names: Vec<&'static str>,
        pub name: &'static str,
        pub update_priority: UpdatePriority,
        pub device_class: Option<DeviceClass>,
        pub state_class: Option<StateClass>,
        pub unit: Option<&'static str>,
        pub options: Option<&'static [&'static str]>,
    }

    impl SensorSchema {
        pub fn new(description: &dyn EntityDescription) -> Self {
            Self {
                key: description.key(),
                unique_id: description.unique_id(),
                object_names: description.object_names().to_vec(),
                name: description.name(),
                update_priority: description.update_priority(),
                device_class: description.device_class(&REGISTRY),
                state_class: description.state_class(),
                unit: description.unit(&REGISTRY),
                options: description.options(),
            }
        }
    }

    fn show<T: ToString>(value: Option<T>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    impl output::Record for SensorSchema {
        fn headers() -> &'static [&'static str] {
            &["Unique ID", "Name", "Registers", "Priority", "Device class", "State class", "Unit"]
        }

        fn row(&self) -> Vec<String> {
            vec![
                self.unique_id.to_string(),
                self.name.to_string(),
                self.object_names.join("\n"),
                self.update_priority.to_string(),
                show(self.device_class),
                show(self.state_class),
                show(self.unit),
            ]
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let descriptions = all_entity_descriptions();
        if args.validate {
            entities::validate(descriptions.iter().copied(), &REGISTRY)
                .map_err(Error::Validate)?;
        }
        let records = descriptions.iter().map(|d| SensorSchema::new(*d));
        args.output.write_records(records).map_err(Error::Output)
    }
}

pub mod state {
    use crate::device_info::DeviceInfo;
    use crate::entities::find_description;
    use crate::output;
    use crate::registers::{Catalogue as _, ParseValueError, REGISTRY};
    use crate::state::{NativeValue, ResponseValues};

    /// Compute the state of a sensor from raw register values.
    ///
    /// Useful to check what a sensor would report for values observed on a device, e.g.
    /// `state energy.e_dc_total 'energy.e_dc_total[0]=1200.5' 'energy.e_dc_total[1]=800'`.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: output::Args,
        /// Key or unique id of the sensor.
        sensor: String,
        /// Raw register values as `NAME=VALUE`.
        values: Vec<String>,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("there is no sensor with the key or unique id `{0}`")]
        UnknownSensor(String),
        #[error("`{0}` is not of the form NAME=VALUE")]
        MalformedAssignment(String),
        #[error("`{0}` is not a known register")]
        UnknownRegister(String),
        #[error("could not parse the value for `{1}`")]
        ParseValue(#[source] ParseValueError, String),
        #[error("could not output the state")]
        Output(#[source] output::Error),
    }

    #[derive(serde::Serialize)]
    pub struct StateRecord {
        pub unique_id: &'static str,
        pub state: Option<NativeValue>,
        pub device: DeviceInfo,
    }

    impl output::Record for StateRecord {
        fn headers() -> &'static [&'static str] {
            &["Unique ID", "State", "Device"]
        }

        fn row(&self) -> Vec<String> {
            vec![
                self.unique_id.to_string(),
                self.state.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                self.device.name.clone(),
            ]
        }
    }

    pub fn parse_values(assignments: &[String]) -> Result<ResponseValues, Error> {
        let mut responses = ResponseValues::new();
        for assignment in assignments {
            let Some((name, raw)) = assignment.split_once('=') else {
                return Err(Error::MalformedAssignment(assignment.clone()));
            };
            let info =
                REGISTRY.lookup(name).ok_or_else(|| Error::UnknownRegister(name.to_string()))?;
            let value = info
                .data_type
                .parse(raw)
                .map_err(|e| Error::ParseValue(e, name.to_string()))?;
            tracing::debug!(name, %value, "parsed register value");
            responses.insert(name, value);
        }
        Ok(responses)
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let description = find_description(&args.sensor)
            .ok_or_else(|| Error::UnknownSensor(args.sensor.clone()))?;
        let responses = parse_values(&args.values)?;
        let record = StateRecord {
            unique_id: description.unique_id(),
            state: description.native_value(&responses),
            device: description.device_info(&responses),
        };
        args.output.write_records([record]).map_err(Error::Output)
    }
}

pub mod plan {
    use crate::config::{PollingIntervals, ReadBatch, read_plan};
    use crate::entities::all_entity_descriptions;
    use crate::output;

    /// Output which registers are read together and how often.
    #[derive(clap::Parser)]
    pub struct Args {
        #[clap(flatten)]
        output: output::Args,
        #[clap(flatten)]
        intervals: PollingIntervals,
    }

    #[derive(thiserror::Error, Debug)]
    pub enum Error {
        #[error("could not output the read plan")]
        Output(#[source] output::Error),
    }

    impl output::Record for ReadBatch {
        fn headers() -> &'static [&'static str] {
            &["Priority", "Interval", "Registers"]
        }

        fn row(&self) -> Vec<String> {
            vec![
                self.priority.to_string(),
                humantime::format_duration(self.interval).to_string(),
                self.object_names.join("\n"),
            ]
        }
    }

    pub fn run(args: Args) -> Result<(), Error> {
        let plan = read_plan(all_entity_descriptions().iter().copied(), &args.intervals);
        args.output.write_records(plan).map_err(Error::Output)
    }
}
