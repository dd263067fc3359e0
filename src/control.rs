use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

/// A parsed message from the control topic. The dashboard publishes JSON
/// objects like `{"fan": true}`; `{"mode": "auto"}` hands overridden
/// outputs back to the engine.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ControlCommand {
    pub fan: Option<bool>,
    pub light: Option<bool>,
    pub buzzer: Option<bool>,
    pub release_overrides: bool,
}

#[derive(Deserialize)]
struct RawCommand {
    fan: Option<bool>,
    light: Option<bool>,
    buzzer: Option<bool>,
    mode: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, serde_json::Value>,
}

impl ControlCommand {
    pub fn parse(payload: &str) -> Result<ControlCommand, String> {
        let raw: RawCommand = serde_json::from_str(payload)
            .map_err(|e| format!("invalid control payload: {e}"))?;

        for key in raw.extra.keys() {
            warn!("Ignoring unknown control key '{}'", key);
        }

        let release_overrides = match raw.mode.as_deref() {
            None => false,
            Some("auto") => true,
            Some(other) => return Err(format!("unknown mode '{other}'")),
        };

        let command = ControlCommand {
            fan: raw.fan,
            light: raw.light,
            buzzer: raw.buzzer,
            release_overrides,
        };

        if command == ControlCommand::default() {
            return Err("control payload carries no recognized command".into());
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_device_command() {
        let command = ControlCommand::parse(r#"{"fan": true}"#).unwrap();
        assert_eq!(command.fan, Some(true));
        assert_eq!(command.light, None);
        assert_eq!(command.buzzer, None);
        assert!(!command.release_overrides);
    }

    #[test]
    fn parses_combined_commands() {
        let command = ControlCommand::parse(r#"{"light": false, "buzzer": true}"#).unwrap();
        assert_eq!(command.light, Some(false));
        assert_eq!(command.buzzer, Some(true));
    }

    #[test]
    fn mode_auto_releases_overrides() {
        let command = ControlCommand::parse(r#"{"mode": "auto"}"#).unwrap();
        assert!(command.release_overrides);
        assert_eq!(command.fan, None);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(ControlCommand::parse(r#"{"mode": "party"}"#).is_err());
    }

    #[test]
    fn non_json_payload_is_rejected() {
        assert!(ControlCommand::parse("fan on please").is_err());
    }

    #[test]
    fn non_boolean_device_value_is_rejected() {
        assert!(ControlCommand::parse(r#"{"fan": "yes"}"#).is_err());
    }

    #[test]
    fn empty_object_is_rejected() {
        assert!(ControlCommand::parse("{}").is_err());
    }

    #[test]
    fn unknown_keys_are_ignored_when_a_command_remains() {
        let command =
            ControlCommand::parse(r#"{"fan": true, "requested_by": "dashboard"}"#).unwrap();
        assert_eq!(command.fan, Some(true));
    }
}
