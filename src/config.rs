use std::collections::BTreeSet;
use std::time::Duration;

use crate::entities::{EntityDescription, UpdatePriority};

/// Refresh intervals for each [`UpdatePriority`].
#[derive(clap::Parser, Clone, Debug)]
#[group(id = "config::PollingIntervals")]
pub struct PollingIntervals {
    /// How often to read registers of frequently updated sensors (e.g. battery state).
    #[arg(long, default_value = "30s")]
    frequent_interval: humantime::Duration,

    /// How often to read registers of infrequently updated sensors (e.g. energy counters).
    #[arg(long, default_value = "3m")]
    infrequent_interval: humantime::Duration,

    /// How often to read registers that practically never change (e.g. the device name).
    #[arg(long, default_value = "1h")]
    static_interval: humantime::Duration,
}

impl Default for PollingIntervals {
    fn default() -> Self {
        Self {
            frequent_interval: Duration::from_secs(30).into(),
            infrequent_interval: Duration::from_secs(180).into(),
            static_interval: Duration::from_secs(3600).into(),
        }
    }
}

impl PollingIntervals {
    pub fn new(frequent: Duration, infrequent: Duration, r#static: Duration) -> Self {
        Self {
            frequent_interval: frequent.into(),
            infrequent_interval: infrequent.into(),
            static_interval: r#static.into(),
        }
    }

    pub fn interval(&self, priority: UpdatePriority) -> Duration {
        match priority {
            UpdatePriority::Frequent => *self.frequent_interval,
            UpdatePriority::Infrequent => *self.infrequent_interval,
            UpdatePriority::Static => *self.static_interval,
        }
    }
}

/// Registers to read together at one update priority.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ReadBatch {
    pub priority: UpdatePriority,
    #[serde(serialize_with = "serialize_duration")]
    pub interval: Duration,
    pub object_names: Vec<&'static str>,
}

fn serialize_duration<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&humantime::format_duration(*duration))
}

/// Group the object names of `descriptions` by update priority, most frequent first.
///
/// Each name is read once per batch, in the order it first appears. Priorities without any
/// sensor are left out.
pub fn read_plan<'a>(
    descriptions: impl IntoIterator<Item = &'a dyn EntityDescription>,
    intervals: &PollingIntervals,
) -> Vec<ReadBatch> {
    let descriptions = descriptions.into_iter().collect::<Vec<_>>();
    let order = [UpdatePriority::Frequent, UpdatePriority::Infrequent, UpdatePriority::Static];
    order
        .into_iter()
        .filter_map(|priority| {
            let mut seen = BTreeSet::new();
            let object_names = descriptions
                .iter()
                .filter(|d| d.update_priority() == priority)
                .flat_map(|d| d.object_names().iter().copied())
                .filter(|name| seen.insert(*name))
                .collect::<Vec<_>>();
            (!object_names.is_empty()).then(|| ReadBatch {
                priority,
                interval: intervals.interval(priority),
                object_names,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device_info::get_inverter_device_info;
    use crate::entities::{SensorDescription, all_entity_descriptions};

    #[test]
    fn default_intervals() {
        let intervals = PollingIntervals::default();
        assert_eq!(intervals.interval(UpdatePriority::Frequent), Duration::from_secs(30));
        assert_eq!(intervals.interval(UpdatePriority::Infrequent), Duration::from_secs(180));
        assert_eq!(intervals.interval(UpdatePriority::Static), Duration::from_secs(3600));
    }

    #[test]
    fn intervals_from_command_line() {
        use clap::Parser as _;
        let intervals =
            PollingIntervals::try_parse_from(["test", "--frequent-interval", "5s"]).unwrap();
        assert_eq!(intervals.interval(UpdatePriority::Frequent), Duration::from_secs(5));
        assert_eq!(intervals.interval(UpdatePriority::Static), Duration::from_secs(3600));
    }

    #[test]
    fn plan_for_bundled_sensors() {
        let plan = read_plan(all_entity_descriptions().iter().copied(), &Default::default());
        let priorities = plan.iter().map(|b| b.priority).collect::<Vec<_>>();
        assert_eq!(
            priorities,
            [UpdatePriority::Frequent, UpdatePriority::Infrequent, UpdatePriority::Static]
        );
        assert_eq!(
            plan[0].object_names,
            [
                "battery.stored_energy",
                "battery.used_energy",
                "fault[0].flt",
                "fault[1].flt",
                "fault[2].flt",
                "fault[3].flt",
                "battery.bat_status",
            ]
        );
        assert!(plan[1].object_names.contains(&"energy.e_dc_total[1]"));
        assert_eq!(plan[2].object_names, ["android_description"]);
    }

    #[test]
    fn plan_deduplicates_names() {
        let a = SensorDescription::new(get_inverter_device_info, "a", "A", UpdatePriority::Static)
            .object_names(&["x", "y"]);
        let b = SensorDescription::new(get_inverter_device_info, "b", "B", UpdatePriority::Static)
            .object_names(&["y", "z"]);
        let plan = read_plan(
            [&a as &dyn EntityDescription, &b],
            &PollingIntervals::new(
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3),
            ),
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].object_names, ["x", "y", "z"]);
        assert_eq!(plan[0].interval, Duration::from_secs(3));
    }
}
