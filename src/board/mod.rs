//! Microcontroller board boundary
//!
//! The board delivers one JSON object per physical tick. Keys come from a fixed
//! vocabulary ([`SensorKey`]) and any subset may be present:
//!
//! ```text
//! {"orientation": 2, "propulsion": -5, "short_press": true, "long_press": false,
//!  "pitch": 1.2, "roll": 20.0, "yaw": 0.3,
//!  "delta_pitch": 0.1, "delta_roll": 0.0, "delta_yaw": 0.0}
//! ```
//!
//! [`BoardEvent`] keeps the raw mapping for relaying; [`SensorSnapshot`] is the
//! typed view consumed once by the fusion engine.

pub mod reader;

use serde_json::{Map, Value};
use std::fmt;

/// Keys the board may send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKey {
    Orientation,
    Propulsion,
    ShortPress,
    LongPress,
    Pitch,
    Roll,
    Yaw,
    DeltaPitch,
    DeltaRoll,
    DeltaYaw,
    /// Injected by this node into outbound reports
    Ip,
    /// Read from sibling platform reports
    Direction,
}

impl SensorKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SensorKey::Orientation => "orientation",
            SensorKey::Propulsion => "propulsion",
            SensorKey::ShortPress => "short_press",
            SensorKey::LongPress => "long_press",
            SensorKey::Pitch => "pitch",
            SensorKey::Roll => "roll",
            SensorKey::Yaw => "yaw",
            SensorKey::DeltaPitch => "delta_pitch",
            SensorKey::DeltaRoll => "delta_roll",
            SensorKey::DeltaYaw => "delta_yaw",
            SensorKey::Ip => "ip",
            SensorKey::Direction => "direction",
        }
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw board event as received
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardEvent {
    fields: Map<String, Value>,
}

impl BoardEvent {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Numeric value for `key`; non-numeric values count as absent
    pub fn number(&self, key: SensorKey) -> Option<f64> {
        self.fields.get(key.as_str()).and_then(Value::as_f64)
    }

    pub fn contains(&self, key: SensorKey) -> bool {
        self.fields.contains_key(key.as_str())
    }

    pub fn flag(&self, key: SensorKey) -> Option<bool> {
        self.fields.get(key.as_str()).and_then(Value::as_bool)
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot::from_event(self)
    }
}

/// Complete inertial reading; only built when all six fields are present
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InertialSample {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
    pub delta_pitch: f64,
    pub delta_roll: f64,
    pub delta_yaw: f64,
}

/// Both button keys of one event; a press is a literal `true`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonIntent {
    pub short_press: bool,
    pub long_press: bool,
}

/// Typed view of one board event
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorSnapshot {
    pub orientation: Option<f64>,
    pub propulsion: Option<f64>,
    /// Only set when the event carries both `short_press` and `long_press`
    pub buttons: Option<ButtonIntent>,
    pub inertial: Option<InertialSample>,
}

impl SensorSnapshot {
    pub fn from_event(event: &BoardEvent) -> Self {
        let inertial = (|| {
            Some(InertialSample {
                pitch: event.number(SensorKey::Pitch)?,
                roll: event.number(SensorKey::Roll)?,
                yaw: event.number(SensorKey::Yaw)?,
                delta_pitch: event.number(SensorKey::DeltaPitch)?,
                delta_roll: event.number(SensorKey::DeltaRoll)?,
                delta_yaw: event.number(SensorKey::DeltaYaw)?,
            })
        })();

        let has_buttons =
            event.contains(SensorKey::ShortPress) && event.contains(SensorKey::LongPress);
        let buttons = has_buttons.then(|| ButtonIntent {
                short_press: event.flag(SensorKey::ShortPress) == Some(true),
                long_press: event.flag(SensorKey::LongPress) == Some(true),
            });

        Self {
            orientation: event.number(SensorKey::Orientation),
            propulsion: event.number(SensorKey::Propulsion),
            buttons,
            inertial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: Value) -> BoardEvent {
        match value {
            Value::Object(map) => BoardEvent::new(map),
            _ => panic!("test events must be objects"),
        }
    }

    #[test]
    fn partial_inertial_data_is_dropped() {
        let snapshot = event(json!({
            "pitch": 1.0, "roll": 2.0, "yaw": 3.0,
            "delta_pitch": 0.5, "delta_roll": 0.5
        }))
        .snapshot();

        assert_eq!(snapshot.inertial, None);
    }

    #[test]
    fn full_inertial_data_is_fused_into_sample() {
        let snapshot = event(json!({
            "pitch": 1, "roll": 20.0, "yaw": 3.0,
            "delta_pitch": 0.5, "delta_roll": 0.25, "delta_yaw": -1.0
        }))
        .snapshot();

        let sample = snapshot.inertial.unwrap();
        assert_eq!(sample.pitch, 1.0);
        assert_eq!(sample.roll, 20.0);
        assert_eq!(sample.delta_yaw, -1.0);
    }

    #[test]
    fn wrong_value_types_count_as_absent() {
        let snapshot = event(json!({
            "orientation": "left",
            "propulsion": 5,
            "short_press": 1
        }))
        .snapshot();

        assert_eq!(snapshot.orientation, None);
        assert_eq!(snapshot.propulsion, Some(5.0));
        assert_eq!(snapshot.buttons, None);
    }

    #[test]
    fn buttons_need_both_keys() {
        assert_eq!(event(json!({"short_press": true})).snapshot().buttons, None);
        assert_eq!(event(json!({"long_press": true})).snapshot().buttons, None);

        let snapshot = event(json!({"short_press": true, "long_press": "no"})).snapshot();
        assert_eq!(
            snapshot.buttons,
            Some(ButtonIntent {
                short_press: true,
                long_press: false
            })
        );
    }
}
