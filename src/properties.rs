use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DesignType {
    #[default]
    Automatic,
    Manual,
}

/// Input of the scheduler.
///
/// When `is_simplified` is set only the session duration, the number of long
/// poses and the three toggles are taken from here; everything else is derived
/// from the session duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SessionProperties {
    pub design_type: DesignType,
    #[serde(with = "humantime_serde")]
    pub session_duration: Duration,
    pub add_warm_up: bool,
    #[serde(with = "duration_list")]
    pub available_warm_up_durations: Vec<Duration>,
    /// Share of the non-break time, 0-100.
    pub warm_up_percent: f64,
    pub add_cool_down: bool,
    #[serde(with = "duration_list")]
    pub available_cool_down_durations: Vec<Duration>,
    pub cool_down_percent: f64,
    pub number_of_long_poses: usize,
    pub add_breaks: bool,
    /// Length of a single break.
    #[serde(with = "humantime_serde")]
    pub breaks_duration: Duration,
    pub number_of_breaks: usize,
    /// How far a break may move to land on a segment boundary before a
    /// segment gets split instead.
    #[serde(with = "humantime_serde")]
    pub max_break_shift: Duration,
    pub is_simplified: bool,
    pub manual_segments_definition: String,
}

impl SessionProperties {
    const fn default_session_duration() -> Duration {
        Duration::from_secs(120 * 60)
    }

    const fn default_breaks_duration() -> Duration {
        Duration::from_secs(10 * 60)
    }

    const fn default_max_break_shift() -> Duration {
        Duration::from_secs(5 * 60)
    }

    fn default_available_durations() -> Vec<Duration> {
        [1, 2, 5]
            .into_iter()
            .map(|m| Duration::from_secs(m * 60))
            .collect()
    }

    /// Check ranges the scheduler relies on.
    ///
    /// # Errors
    /// Returns [`Error::InvalidProperties`] describing the first offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.design_type == DesignType::Manual {
            return Ok(());
        }
        if self.session_duration.is_zero() {
            return Err(invalid("session-duration must be positive"));
        }
        if self.number_of_long_poses == 0 {
            return Err(invalid("number-of-long-poses must be at least 1"));
        }
        if self.is_simplified {
            return Ok(());
        }
        for (name, enabled, percent) in [
            ("warm-up-percent", self.add_warm_up, self.warm_up_percent),
            ("cool-down-percent", self.add_cool_down, self.cool_down_percent),
        ] {
            if enabled && !(0.0..=100.0).contains(&percent) {
                return Err(invalid(&format!("{name} must be within 0-100, got {percent}")));
            }
        }
        if self.add_warm_up && self.available_warm_up_durations.is_empty() {
            return Err(invalid("available-warm-up-durations must not be empty"));
        }
        if self.add_cool_down && self.available_cool_down_durations.is_empty() {
            return Err(invalid("available-cool-down-durations must not be empty"));
        }
        if self.add_breaks {
            if self.number_of_breaks == 0 {
                return Err(invalid("number-of-breaks must be at least 1 when breaks are enabled"));
            }
            if self.breaks_duration.is_zero() {
                return Err(invalid("breaks-duration must be positive"));
            }
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidProperties(message.to_string())
}

impl Default for SessionProperties {
    fn default() -> Self {
        Self {
            design_type: DesignType::Automatic,
            session_duration: Self::default_session_duration(),
            add_warm_up: true,
            available_warm_up_durations: Self::default_available_durations(),
            warm_up_percent: 25.0,
            add_cool_down: false,
            available_cool_down_durations: Self::default_available_durations(),
            cool_down_percent: 12.5,
            number_of_long_poses: 3,
            add_breaks: false,
            breaks_duration: Self::default_breaks_duration(),
            number_of_breaks: 1,
            max_break_shift: Self::default_max_break_shift(),
            is_simplified: true,
            manual_segments_definition: String::new(),
        }
    }
}

/// Lists of humantime durations, e.g. `[1m, 2m, 5m]`.
mod duration_list {
    use std::time::Duration;

    use humantime_serde::Serde;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error> {
        durations
            .iter()
            .map(|d| Serde::from(*d))
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Duration>, D::Error> {
        let raw = Vec::<Serde<Duration>>::deserialize(deserializer)?;
        Ok(raw.into_iter().map(Serde::into_inner).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_simplified_two_hour_session() {
        let props = SessionProperties::default();
        assert_eq!(props.design_type, DesignType::Automatic);
        assert_eq!(props.session_duration, Duration::from_secs(7200));
        assert_eq!(props.number_of_long_poses, 3);
        assert!(props.add_warm_up && !props.add_cool_down && !props.add_breaks);
        assert!(props.is_simplified);
        props.validate().unwrap();
    }

    #[test]
    fn parse_kebab_case_yaml_with_humantime_durations() {
        let yaml = r#"
session-duration: 90m
number-of-long-poses: 2
add-breaks: true
breaks-duration: 15m
number-of-breaks: 2
is-simplified: false
available-warm-up-durations: [1m, 2m]
"#;
        let props: SessionProperties = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(props.session_duration, Duration::from_secs(90 * 60));
        assert_eq!(props.breaks_duration, Duration::from_secs(15 * 60));
        assert_eq!(
            props.available_warm_up_durations,
            vec![Duration::from_secs(60), Duration::from_secs(120)]
        );
        assert_eq!(props.max_break_shift, Duration::from_secs(300));
        props.validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_percent() {
        let props = SessionProperties {
            is_simplified: false,
            warm_up_percent: 140.0,
            ..SessionProperties::default()
        };
        assert!(matches!(props.validate(), Err(Error::InvalidProperties(_))));
    }

    #[test]
    fn rejects_zero_long_poses() {
        let props = SessionProperties {
            number_of_long_poses: 0,
            ..SessionProperties::default()
        };
        assert!(props.validate().is_err());
    }
}
