//! Threshold evaluation for the plant actuators.
//!
//! The evaluator maps the latest readings to a display status per actuator:
//!
//! | Channel | Rule |
//! |---------|------|
//! | Pump | ON when soil moisture ≤ soil threshold |
//! | Fan | ON when temperature > temp threshold or humidity > hum threshold |
//! | Roof | OPEN when light is present, CLOSED when dark, UNKNOWN otherwise |
//!
//! In manual mode every channel reports "Manual Mode Active" instead.
//!
//! # Example
//!
//! ```
//! use plantcare_core::{Evaluator, Readings};
//! use plantcare_types::{ChannelStatus, Mode, Switch, ThresholdSet};
//!
//! let evaluator = Evaluator::new(ThresholdSet::default());
//! let readings = Readings { soil: Some(40), ..Readings::default() };
//!
//! let status = evaluator.evaluate(&readings, Mode::Auto);
//! assert_eq!(status.pump, Some(ChannelStatus::Auto(Switch::On)));
//! assert_eq!(status.fan, None);
//! ```

use serde::Serialize;

use plantcare_types::{
    ActuatorStatus, ChannelStatus, Climate, Command, LightLevel, Mode, RoofCommand, RoofStatus,
    Switch, ThresholdSet,
};

/// Sensor values gathered during one refresh cycle.
///
/// A field is `None` when the corresponding endpoint failed this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Readings {
    pub soil: Option<u8>,
    pub climate: Option<Climate>,
    pub light: Option<LightLevel>,
}

/// Threshold evaluator for plant readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    thresholds: ThresholdSet,
}

impl Evaluator {
    /// Create a new evaluator with the given thresholds.
    pub fn new(thresholds: ThresholdSet) -> Self {
        Self { thresholds }
    }

    /// Get the thresholds.
    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// Pump state for a soil moisture percentage.
    pub fn evaluate_pump(&self, soil: u8) -> Switch {
        Switch::from_bool(soil <= self.thresholds.soil)
    }

    /// Fan state for the current climate.
    pub fn evaluate_fan(&self, climate: &Climate) -> Switch {
        Switch::from_bool(
            climate.temperature > self.thresholds.temp
                || climate.humidity > self.thresholds.hum as f32,
        )
    }

    /// Roof state for the current light level.
    pub fn evaluate_roof(&self, light: LightLevel) -> RoofStatus {
        match light {
            LightLevel::Present => RoofStatus::Open,
            LightLevel::Absent => RoofStatus::Closed,
            LightLevel::Other(_) => RoofStatus::Unknown,
        }
    }

    /// Evaluate every channel that has a reading.
    pub fn evaluate(&self, readings: &Readings, mode: Mode) -> ActuatorStatus {
        match mode {
            Mode::Auto => ActuatorStatus {
                pump: readings
                    .soil
                    .map(|s| ChannelStatus::Auto(self.evaluate_pump(s))),
                fan: readings
                    .climate
                    .map(|c| ChannelStatus::Auto(self.evaluate_fan(&c))),
                roof: readings
                    .light
                    .map(|l| ChannelStatus::Auto(self.evaluate_roof(l))),
            },
            Mode::Manual => ActuatorStatus {
                pump: readings.soil.map(|_| ChannelStatus::ManualActive),
                fan: readings.climate.map(|_| ChannelStatus::ManualActive),
                roof: readings.light.map(|_| ChannelStatus::ManualActive),
            },
        }
    }
}

/// Actuator states last requested by automatic actuation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActuatorTargets {
    pub pump: Option<Switch>,
    pub fan: Option<Switch>,
    pub roof: Option<RoofCommand>,
}

impl ActuatorTargets {
    /// Targets implied by an evaluated status. Manual and unknown channels have none.
    pub fn from_status(status: &ActuatorStatus) -> Self {
        Self {
            pump: status.pump.and_then(|s| s.auto_state()),
            fan: status.fan.and_then(|s| s.auto_state()),
            roof: status
                .roof
                .and_then(|s| s.auto_state())
                .and_then(|r| r.command()),
        }
    }

    /// Commands needed to move from `previous` to `self`.
    pub fn changes_since(&self, previous: &ActuatorTargets) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(pump) = self.pump
            && previous.pump != Some(pump)
        {
            commands.push(Command::Pump(pump));
        }
        if let Some(fan) = self.fan
            && previous.fan != Some(fan)
        {
            commands.push(Command::Fan(fan));
        }
        if let Some(roof) = self.roof
            && previous.roof != Some(roof)
        {
            commands.push(Command::Roof(roof));
        }
        commands
    }

    /// Record that `command` was accepted by the controller.
    pub fn record(&mut self, command: Command) {
        match command {
            Command::Pump(s) => self.pump = Some(s),
            Command::Fan(s) => self.fan = Some(s),
            Command::Roof(r) => self.roof = Some(r),
            Command::Flash(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn climate(temperature: f32, humidity: f32) -> Climate {
        Climate {
            temperature,
            humidity,
        }
    }

    fn all_readings() -> Readings {
        Readings {
            soil: Some(40),
            climate: Some(climate(24.0, 50.0)),
            light: Some(LightLevel::Absent),
        }
    }

    #[test]
    fn test_pump_scenarios() {
        let e = Evaluator::new(ThresholdSet::default());
        let wet = Readings {
            soil: Some(60),
            ..Readings::default()
        };
        let dry = Readings {
            soil: Some(40),
            ..Readings::default()
        };

        assert_eq!(e.evaluate(&dry, Mode::Auto).pump.unwrap().to_string(), "ON (Auto)");
        assert_eq!(e.evaluate(&wet, Mode::Auto).pump.unwrap().to_string(), "OFF (Auto)");
    }

    #[test]
    fn test_pump_boundary() {
        let e = Evaluator::new(ThresholdSet::default());
        assert_eq!(e.evaluate_pump(55), Switch::On);
        assert_eq!(e.evaluate_pump(56), Switch::Off);
        assert_eq!(e.evaluate_pump(0), Switch::On);
    }

    #[test]
    fn test_fan_rules() {
        let e = Evaluator::new(ThresholdSet::default());
        assert_eq!(e.evaluate_fan(&climate(27.5, 75.0)), Switch::Off);
        assert_eq!(e.evaluate_fan(&climate(27.6, 40.0)), Switch::On);
        assert_eq!(e.evaluate_fan(&climate(20.0, 75.1)), Switch::On);
        assert_eq!(e.evaluate_fan(&climate(35.0, 90.0)), Switch::On);
    }

    #[test]
    fn test_roof_rules() {
        let e = Evaluator::default();
        assert_eq!(e.evaluate_roof(LightLevel::Present), RoofStatus::Open);
        assert_eq!(e.evaluate_roof(LightLevel::Absent), RoofStatus::Closed);
        assert_eq!(e.evaluate_roof(LightLevel::Other(2)), RoofStatus::Unknown);
    }

    #[test]
    fn test_manual_mode_suppresses_evaluation() {
        let e = Evaluator::new(ThresholdSet::default());
        let status = e.evaluate(&all_readings(), Mode::Manual);

        assert_eq!(status.pump, Some(ChannelStatus::ManualActive));
        assert_eq!(status.fan, Some(ChannelStatus::ManualActive));
        assert_eq!(status.roof, Some(ChannelStatus::ManualActive));
        assert_eq!(status.pump.unwrap().to_string(), "Manual Mode Active");
    }

    #[test]
    fn test_missing_readings_have_no_status() {
        let e = Evaluator::default();
        let status = e.evaluate(&Readings::default(), Mode::Auto);
        assert_eq!(status, ActuatorStatus::default());
    }

    #[test]
    fn test_targets_from_status() {
        let e = Evaluator::new(ThresholdSet::default());
        let status = e.evaluate(&all_readings(), Mode::Auto);
        let targets = ActuatorTargets::from_status(&status);

        assert_eq!(targets.pump, Some(Switch::On));
        assert_eq!(targets.fan, Some(Switch::Off));
        assert_eq!(targets.roof, Some(RoofCommand::Close));

        let manual = e.evaluate(&all_readings(), Mode::Manual);
        assert_eq!(ActuatorTargets::from_status(&manual), ActuatorTargets::default());
    }

    #[test]
    fn test_targets_unknown_roof_has_no_command() {
        let status = ActuatorStatus {
            roof: Some(ChannelStatus::Auto(RoofStatus::Unknown)),
            ..ActuatorStatus::default()
        };
        assert_eq!(ActuatorTargets::from_status(&status).roof, None);
    }

    #[test]
    fn test_targets_changes_since() {
        let previous = ActuatorTargets {
            pump: Some(Switch::On),
            fan: None,
            roof: Some(RoofCommand::Open),
        };
        let next = ActuatorTargets {
            pump: Some(Switch::On),
            fan: Some(Switch::Off),
            roof: Some(RoofCommand::Close),
        };

        assert_eq!(
            next.changes_since(&previous),
            vec![Command::Fan(Switch::Off), Command::Roof(RoofCommand::Close)]
        );
        assert!(next.changes_since(&next).is_empty());
    }

    #[test]
    fn test_targets_record() {
        let mut targets = ActuatorTargets::default();
        targets.record(Command::Pump(Switch::Off));
        targets.record(Command::Flash(Switch::On));
        assert_eq!(targets.pump, Some(Switch::Off));
        assert_eq!(targets.fan, None);
    }

    proptest! {
        #[test]
        fn pump_on_iff_soil_at_or_below_threshold(m in 0u8..=100, t in 0u8..=100) {
            let e = Evaluator::new(ThresholdSet { soil: t, ..ThresholdSet::default() });
            prop_assert_eq!(e.evaluate_pump(m) == Switch::On, m <= t);
        }

        #[test]
        fn fan_on_iff_either_exceeds(
            temp in -10.0f32..60.0,
            hum in 0.0f32..100.0,
            tt in 10.0f32..50.0,
            th in 0u8..=100,
        ) {
            let e = Evaluator::new(ThresholdSet { soil: 55, temp: tt, hum: th });
            let on = e.evaluate_fan(&climate(temp, hum)) == Switch::On;
            prop_assert_eq!(on, temp > tt || hum > th as f32);
        }

        #[test]
        fn manual_mode_never_reports_auto_state(
            soil in proptest::option::of(0u8..=100),
            raw_light in -5i64..5,
        ) {
            let readings = Readings {
                soil,
                climate: Some(climate(30.0, 90.0)),
                light: Some(LightLevel::from_raw(raw_light)),
            };
            let status = Evaluator::default().evaluate(&readings, Mode::Manual);
            prop_assert!(status.pump.is_none_or(|s| s == ChannelStatus::ManualActive));
            prop_assert_eq!(status.fan, Some(ChannelStatus::ManualActive));
            prop_assert_eq!(status.roof, Some(ChannelStatus::ManualActive));
        }
    }
}
