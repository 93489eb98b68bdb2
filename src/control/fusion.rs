//! Turns raw board events into actuator updates
//!
//! Each branch fires independently; one board event may carry an orientation
//! increment, a propulsion delta, button intents and a full inertial sample
//! all at once. Branches run in that order.

use super::NodeOutput;
use super::clamp;
use super::publisher::ActuatorPublisher;
use super::state::{ControlState, Direction};
use crate::audio::AudioCue;
use crate::board::{ButtonIntent, InertialSample, SensorSnapshot};
use crate::config::ControlConfig;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SensorFusionEngine {
    config: ControlConfig,
    publisher: ActuatorPublisher,
    last_inertial: Option<InertialSample>,
}

impl SensorFusionEngine {
    pub fn new(config: ControlConfig) -> Self {
        Self {
            publisher: ActuatorPublisher::new(config.clone()),
            config,
            last_inertial: None,
        }
    }

    /// Last complete inertial sample seen
    pub fn last_inertial(&self) -> Option<InertialSample> {
        self.last_inertial
    }

    pub fn process(
        &mut self,
        state: &mut ControlState,
        snapshot: &SensorSnapshot,
    ) -> Vec<NodeOutput> {
        let mut outputs = Vec::new();

        if let Some(increment) = snapshot.orientation {
            self.on_orientation(state, increment, &mut outputs);
        }

        if let Some(delta) = snapshot.propulsion {
            self.on_propulsion(state, delta, &mut outputs);
        }

        if let Some(buttons) = snapshot.buttons {
            self.on_buttons(state, buttons, &mut outputs);
        }

        if let Some(sample) = snapshot.inertial {
            self.on_inertial(state, sample, &mut outputs);
        }

        outputs
    }

    fn on_orientation(
        &self,
        state: &mut ControlState,
        increment: f64,
        outputs: &mut Vec<NodeOutput>,
    ) {
        let Some(command) = self.publisher.orientation(state, increment) else {
            return;
        };
        outputs.push(NodeOutput::Command(command));

        state.wheel_audio_tick += increment.abs();
        if state.wheel_audio_tick >= self.config.wheel_audio_threshold {
            state.wheel_audio_tick = 0.0;
            if state.session_enabled {
                outputs.push(NodeOutput::Cue(AudioCue::Wheel));
            }
        }
    }

    fn on_propulsion(&self, state: &mut ControlState, delta: f64, outputs: &mut Vec<NodeOutput>) {
        let candidate = state.propulsion as f64 + delta;
        let Some(clamped) = clamp::clamp_propulsion(candidate, state.direction, &self.config) else {
            debug!("Ignoring propulsion delta {} while stopped", delta);
            return;
        };

        if clamped == state.propulsion {
            debug!("Propulsion unchanged at {}", clamped);
            return;
        }

        state.propulsion = clamped;
        outputs.push(NodeOutput::Command(self.publisher.propulsion(state)));
    }

    fn on_buttons(
        &self,
        state: &mut ControlState,
        buttons: ButtonIntent,
        outputs: &mut Vec<NodeOutput>,
    ) {
        if buttons.long_press && state.direction != Direction::Reverse {
            state.direction = Direction::Reverse;
            if let Some(command) = self.publisher.direction(state) {
                outputs.push(NodeOutput::Command(command));
            }
            if state.session_enabled {
                outputs.push(NodeOutput::Cue(AudioCue::Bell));
            }
        }

        if buttons.short_press {
            state.direction = match state.direction {
                Direction::Stop => Direction::Forward,
                _ => Direction::Stop,
            };
            if state.session_enabled {
                outputs.push(NodeOutput::Cue(AudioCue::Bell));
            }
            if let Some(command) = self.publisher.direction(state) {
                outputs.push(NodeOutput::Command(command));
            }
        }
    }

    fn on_inertial(
        &mut self,
        state: &mut ControlState,
        sample: InertialSample,
        outputs: &mut Vec<NodeOutput>,
    ) {
        self.last_inertial = Some(sample);

        let tilt = clamp::clamp_angle(90.0 + sample.roll * self.config.tilt_multiplier);
        let pan =
            clamp::clamp_angle(state.pan_angle * self.config.pan_multiplier + sample.delta_pitch);

        let threshold = self.config.pan_tilt_threshold;
        if clamp::exceeds_hysteresis(state.tilt_angle, tilt, threshold)
            || clamp::exceeds_hysteresis(state.pan_angle, pan, threshold)
        {
            state.tilt_angle = tilt;
            state.pan_angle = pan;
            outputs.push(NodeOutput::Command(self.publisher.pan_tilt(state)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::publisher::OutboundCommand;

    fn setup() -> (SensorFusionEngine, ControlState) {
        let config = ControlConfig::default();
        (SensorFusionEngine::new(config.clone()), ControlState::new(&config))
    }

    fn commands(outputs: &[NodeOutput]) -> Vec<OutboundCommand> {
        outputs
            .iter()
            .filter_map(|output| match output {
                NodeOutput::Command(command) => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    fn buttons(short_press: bool, long_press: bool) -> SensorSnapshot {
        SensorSnapshot {
            buttons: Some(ButtonIntent {
                short_press,
                long_press,
            }),
            ..SensorSnapshot::default()
        }
    }

    fn inertial(roll: f64, delta_pitch: f64) -> SensorSnapshot {
        SensorSnapshot {
            inertial: Some(InertialSample {
                roll,
                delta_pitch,
                ..InertialSample::default()
            }),
            ..SensorSnapshot::default()
        }
    }

    #[test]
    fn propulsion_is_frozen_while_stopped() {
        let (mut engine, mut state) = setup();
        let snapshot = SensorSnapshot {
            propulsion: Some(10.0),
            ..SensorSnapshot::default()
        };

        assert!(engine.process(&mut state, &snapshot).is_empty());
        assert_eq!(state.propulsion, 45);
    }

    #[test]
    fn repeated_propulsion_at_bound_publishes_once() {
        let (mut engine, mut state) = setup();
        state.direction = Direction::Reverse;
        let snapshot = SensorSnapshot {
            propulsion: Some(30.0),
            ..SensorSnapshot::default()
        };

        let first = commands(&engine.process(&mut state, &snapshot));
        let second = commands(&engine.process(&mut state, &snapshot));

        assert_eq!(first, vec![OutboundCommand::Propulsion(50)]);
        assert!(second.is_empty());
        assert_eq!(state.propulsion, 50);
    }

    #[test]
    fn short_press_toggles_and_always_publishes() {
        let (mut engine, mut state) = setup();
        let press = buttons(true, false);

        let on = engine.process(&mut state, &press);
        assert_eq!(state.direction, Direction::Forward);
        assert_eq!(on, vec![NodeOutput::Command(OutboundCommand::Direction(Direction::Forward))]);

        let off = engine.process(&mut state, &press);
        assert_eq!(state.direction, Direction::Stop);
        assert_eq!(commands(&off), vec![OutboundCommand::Direction(Direction::Stop)]);
    }

    #[test]
    fn bell_cue_requires_enabled_session() {
        let (mut engine, mut state) = setup();
        state.session_enabled = true;
        let press = buttons(true, false);

        let outputs = engine.process(&mut state, &press);

        assert_eq!(outputs[0], NodeOutput::Cue(AudioCue::Bell));
        assert_eq!(outputs[1], NodeOutput::Command(OutboundCommand::Direction(Direction::Forward)));
    }

    #[test]
    fn released_buttons_change_nothing() {
        let (mut engine, mut state) = setup();
        state.session_enabled = true;

        assert!(engine.process(&mut state, &buttons(false, false)).is_empty());
        assert_eq!(state.direction, Direction::Stop);
    }

    #[test]
    fn long_press_reverses_once() {
        let (mut engine, mut state) = setup();
        let press = buttons(false, true);

        let first = commands(&engine.process(&mut state, &press));
        let second = commands(&engine.process(&mut state, &press));

        assert_eq!(first, vec![OutboundCommand::Direction(Direction::Reverse)]);
        assert!(second.is_empty());
    }

    #[test]
    fn orientation_ticks_wheel_cue_on_overflow() {
        let (mut engine, mut state) = setup();
        state.session_enabled = true;
        let turn = SensorSnapshot {
            orientation: Some(-12.0),
            ..SensorSnapshot::default()
        };

        let first = engine.process(&mut state, &turn);
        let _ = engine.process(&mut state, &turn);
        let third = engine.process(&mut state, &turn);

        assert_eq!(first, vec![NodeOutput::Command(OutboundCommand::Orientation(-12))]);
        assert!(third.contains(&NodeOutput::Cue(AudioCue::Wheel)));
        assert_eq!(state.wheel_audio_tick, 0.0);
    }

    #[test]
    fn pan_tilt_publishes_past_threshold_from_last_published() {
        let (mut engine, mut state) = setup();
        state.tilt_angle = 95.0;

        let outputs = commands(&engine.process(&mut state, &inertial(20.0, 0.0)));

        assert_eq!(
            outputs,
            vec![OutboundCommand::PanTilt {
                tilt: 110.0,
                pan: 90.0
            }]
        );
        assert_eq!(state.tilt_angle, 110.0);
    }

    #[test]
    fn small_moves_never_accumulate_past_threshold() {
        let (mut engine, mut state) = setup();

        for _ in 0..5 {
            assert!(engine.process(&mut state, &inertial(9.0, 4.0)).is_empty());
        }
        assert_eq!(state.tilt_angle, 90.0);
        assert_eq!(state.pan_angle, 90.0);

        let same = inertial(25.0, 0.0);
        assert_eq!(commands(&engine.process(&mut state, &same)).len(), 1);
        assert!(engine.process(&mut state, &same).is_empty());
        assert!(engine.last_inertial().is_some());
    }
}
