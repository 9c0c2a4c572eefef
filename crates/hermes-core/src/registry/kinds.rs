// ── Built-in kind handlers ──
//
// Each variant's string form is the kind tag the controller sends.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Board models the UI knows how to present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum BoardKind {
    #[strum(serialize = "ArduinoBoard")]
    Arduino,
    /// Fallback for any unrecognized model.
    #[strum(serialize = "GenericBoard")]
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum DeviceKind {
    #[strum(serialize = "LedDevice")]
    Led,
    #[strum(serialize = "ServoDevice")]
    Servo,
    #[strum(serialize = "GenericDevice")]
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum ProtocolKind {
    #[strum(serialize = "SerialProtocol")]
    Serial,
    #[strum(serialize = "CustomProtocol")]
    Custom,
}

impl ProtocolKind {
    /// Short human prefix for the connection target, e.g. "Serial on /dev/ttyUSB0".
    pub fn describe(self) -> &'static str {
        match self {
            Self::Serial => "Serial on",
            Self::Custom => "Custom protocol",
        }
    }
}

/// How a group renders its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum LayoutKind {
    /// Devices drawn with their board connections.
    #[strum(serialize = "ConnectedLayout")]
    Connected,
    /// Plain list.
    #[strum(serialize = "SimpleLayout")]
    Simple,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_strings() {
        assert_eq!(BoardKind::Arduino.to_string(), "ArduinoBoard");
        assert_eq!("ServoDevice".parse::<DeviceKind>().unwrap(), DeviceKind::Servo);
        let tag: &'static str = LayoutKind::Simple.into();
        assert_eq!(tag, "SimpleLayout");
        assert!("serialprotocol".parse::<ProtocolKind>().is_err());
    }
}
