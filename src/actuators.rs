use tracing::{info, warn};

use crate::config::PinConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuator {
    Fan,
    Light,
    Buzzer,
}

impl Actuator {
    pub const ALL: [Actuator; 3] = [Actuator::Fan, Actuator::Light, Actuator::Buzzer];

    pub fn name(&self) -> &'static str {
        match self {
            Actuator::Fan => "fan",
            Actuator::Light => "light",
            Actuator::Buzzer => "buzzer",
        }
    }

    fn index(&self) -> usize {
        match self {
            Actuator::Fan => 0,
            Actuator::Light => 1,
            Actuator::Buzzer => 2,
        }
    }
}

/// Hardware seam for the relay and buzzer outputs.
pub trait ActuatorBus: Send {
    fn set(&mut self, actuator: Actuator, pin: u8, on: bool) -> Result<(), String>;
}

/// Default output backend: records the switch in the log. Real relay drivers
/// plug in at the `ActuatorBus` seam.
pub struct LoggingActuatorBus;

impl ActuatorBus for LoggingActuatorBus {
    fn set(&mut self, actuator: Actuator, pin: u8, on: bool) -> Result<(), String> {
        info!(
            "{} (pin {}) switched {}",
            actuator.name(),
            pin,
            if on { "on" } else { "off" }
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Auto,
    Manual,
}

/// Owns the fan relay, light relay and buzzer. Engine decisions only reach
/// an output while it is in auto mode; a manual control command pins the
/// output until overrides are released.
pub struct ActuatorBank {
    pins: [u8; 3],
    states: [bool; 3],
    modes: [Mode; 3],
    bus: Box<dyn ActuatorBus>,
}

impl ActuatorBank {
    pub fn new(pins: &PinConfig, bus: Box<dyn ActuatorBus>) -> Self {
        Self {
            pins: [pins.relay_fan, pins.relay_light, pins.buzzer],
            states: [false; 3],
            modes: [Mode::Auto; 3],
            bus,
        }
    }

    fn write(&mut self, actuator: Actuator, on: bool) {
        let idx = actuator.index();
        if self.states[idx] == on {
            return;
        }
        match self.bus.set(actuator, self.pins[idx], on) {
            // On failure the recorded state is left as-is so the next
            // evaluation retries the write.
            Ok(()) => self.states[idx] = on,
            Err(e) => warn!("Failed to switch {}: {}", actuator.name(), e),
        }
    }

    /// Engine-driven state change; ignored while the output is overridden.
    pub fn apply_auto(&mut self, actuator: Actuator, on: bool) {
        if self.modes[actuator.index()] == Mode::Manual {
            return;
        }
        self.write(actuator, on);
    }

    /// Operator override from the control topic. Pins the output to manual.
    pub fn set_manual(&mut self, actuator: Actuator, on: bool) {
        self.modes[actuator.index()] = Mode::Manual;
        self.write(actuator, on);
    }

    /// Return every output to engine control. The caller is expected to
    /// re-apply the current demands afterwards.
    pub fn release_overrides(&mut self) {
        for actuator in Actuator::ALL {
            if self.modes[actuator.index()] == Mode::Manual {
                info!("{} returned to automatic control", actuator.name());
                self.modes[actuator.index()] = Mode::Auto;
            }
        }
    }

    pub fn is_on(&self, actuator: Actuator) -> bool {
        self.states[actuator.index()]
    }

    pub fn is_manual(&self, actuator: Actuator) -> bool {
        self.modes[actuator.index()] == Mode::Manual
    }

    /// One-line state dump for the log, e.g. `fan=on light=off* buzzer=off`
    /// (`*` marks a manual override).
    pub fn summary(&self) -> String {
        Actuator::ALL
            .iter()
            .map(|a| {
                format!(
                    "{}={}{}",
                    a.name(),
                    if self.is_on(*a) { "on" } else { "off" },
                    if self.is_manual(*a) { "*" } else { "" },
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingBus {
        writes: Arc<Mutex<Vec<(Actuator, u8, bool)>>>,
    }

    impl ActuatorBus for RecordingBus {
        fn set(&mut self, actuator: Actuator, pin: u8, on: bool) -> Result<(), String> {
            self.writes.lock().unwrap().push((actuator, pin, on));
            Ok(())
        }
    }

    fn bank() -> (ActuatorBank, RecordingBus) {
        let bus = RecordingBus::default();
        let pins = crate::config::Config::default().pins;
        (ActuatorBank::new(&pins, Box::new(bus.clone())), bus)
    }

    #[test]
    fn auto_writes_only_on_change() {
        let (mut bank, bus) = bank();
        bank.apply_auto(Actuator::Fan, true);
        bank.apply_auto(Actuator::Fan, true);
        bank.apply_auto(Actuator::Fan, false);
        let writes = bus.writes.lock().unwrap();
        assert_eq!(
            *writes,
            vec![(Actuator::Fan, 26, true), (Actuator::Fan, 26, false)]
        );
    }

    #[test]
    fn manual_override_blocks_auto_changes() {
        let (mut bank, bus) = bank();
        bank.set_manual(Actuator::Light, true);
        assert!(bank.is_manual(Actuator::Light));
        assert!(bank.is_on(Actuator::Light));

        bank.apply_auto(Actuator::Light, false);
        assert!(bank.is_on(Actuator::Light));

        let writes = bus.writes.lock().unwrap();
        assert_eq!(*writes, vec![(Actuator::Light, 27, true)]);
    }

    #[test]
    fn summary_marks_manual_overrides() {
        let (mut bank, _bus) = bank();
        bank.apply_auto(Actuator::Fan, true);
        bank.set_manual(Actuator::Light, false);
        assert_eq!(bank.summary(), "fan=on light=off* buzzer=off");
    }

    #[test]
    fn release_returns_outputs_to_auto() {
        let (mut bank, _bus) = bank();
        bank.set_manual(Actuator::Buzzer, true);
        bank.release_overrides();
        assert!(!bank.is_manual(Actuator::Buzzer));

        bank.apply_auto(Actuator::Buzzer, false);
        assert!(!bank.is_on(Actuator::Buzzer));
    }

    #[test]
    fn failed_write_keeps_previous_state_for_retry() {
        struct FlakyBus {
            fail_next: bool,
        }
        impl ActuatorBus for FlakyBus {
            fn set(&mut self, _: Actuator, _: u8, _: bool) -> Result<(), String> {
                if self.fail_next {
                    self.fail_next = false;
                    Err("gpio busy".into())
                } else {
                    Ok(())
                }
            }
        }

        let pins = crate::config::Config::default().pins;
        let mut bank = ActuatorBank::new(&pins, Box::new(FlakyBus { fail_next: true }));
        bank.apply_auto(Actuator::Fan, true);
        assert!(!bank.is_on(Actuator::Fan));
        // Second attempt goes through.
        bank.apply_auto(Actuator::Fan, true);
        assert!(bank.is_on(Actuator::Fan));
    }
}
