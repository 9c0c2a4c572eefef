// ── Type registry ──
//
// Resolves a kind tag to the handler that knows how to present or
// control an entity of that kind. Tables are closed once built and
// every lookup has an answer: unknown tags get the default handler.

mod controllers;
mod kinds;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use controllers::{
    BlinkCommand, BooleanActionCommand, BooleanInputCommand, CommandContext, CommandController,
    GenericController, NO_CONTROLLER_TEXT, OnOffCommand, ServoCommand, render_value,
};
pub use kinds::{BoardKind, DeviceKind, LayoutKind, ProtocolKind};

/// Lookup table from kind tag to handler with a mandatory default.
///
/// Matching is exact and case-sensitive. Build it with [`with`](Self::with)
/// and share it read-only afterwards.
#[derive(Debug, Clone)]
pub struct TypeRegistry<H> {
    default: H,
    table: BTreeMap<String, H>,
}

impl<H> TypeRegistry<H> {
    pub fn new(default: H) -> Self {
        Self {
            default,
            table: BTreeMap::new(),
        }
    }

    /// Register `handler` under `kind`. An empty tag is ignored since it
    /// always resolves to the default.
    pub fn with(mut self, kind: impl Into<String>, handler: H) -> Self {
        let kind = kind.into();
        if kind.is_empty() {
            tracing::warn!("ignoring registry entry with an empty kind tag");
        } else {
            self.table.insert(kind, handler);
        }
        self
    }

    /// Handler for `kind`; the default for unknown, empty or absent tags.
    pub fn resolve<'a>(&self, kind: impl Into<Option<&'a str>>) -> &H {
        kind.into()
            .and_then(|k| self.table.get(k))
            .unwrap_or(&self.default)
    }

    pub fn default_handler(&self) -> &H {
        &self.default
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.table.contains_key(kind)
    }

    /// Registered tags, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// The five registries a session resolves kinds through.
#[derive(Debug, Clone)]
pub struct Registries {
    pub boards: TypeRegistry<BoardKind>,
    pub devices: TypeRegistry<DeviceKind>,
    pub protocols: TypeRegistry<ProtocolKind>,
    pub layouts: TypeRegistry<LayoutKind>,
    pub commands: TypeRegistry<Arc<dyn CommandController>>,
}

impl Registries {
    /// Registries with every handler that ships with Hermes.
    pub fn builtin() -> Self {
        Self {
            boards: TypeRegistry::new(BoardKind::Generic)
                .with(BoardKind::Arduino.to_string(), BoardKind::Arduino),
            devices: TypeRegistry::new(DeviceKind::Generic)
                .with(DeviceKind::Led.to_string(), DeviceKind::Led)
                .with(DeviceKind::Servo.to_string(), DeviceKind::Servo),
            protocols: TypeRegistry::new(ProtocolKind::Custom)
                .with(ProtocolKind::Serial.to_string(), ProtocolKind::Serial),
            layouts: TypeRegistry::new(LayoutKind::Connected)
                .with(LayoutKind::Connected.to_string(), LayoutKind::Connected)
                .with(LayoutKind::Simple.to_string(), LayoutKind::Simple),
            commands: command_registry(),
        }
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::builtin()
    }
}

fn command_registry() -> TypeRegistry<Arc<dyn CommandController>> {
    let builtin: [Arc<dyn CommandController>; 5] = [
        Arc::new(BooleanActionCommand),
        Arc::new(OnOffCommand),
        Arc::new(BlinkCommand),
        Arc::new(ServoCommand),
        Arc::new(BooleanInputCommand),
    ];

    builtin.into_iter().fold(
        TypeRegistry::new(Arc::new(GenericController) as Arc<dyn CommandController>),
        |registry, controller| registry.with(controller.kind(), controller),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_kinds_resolve_like_empty_tag() {
        let registries = Registries::builtin();
        let boards = &registries.boards;

        for kind in ["unknown_model", "arduinoboard", "Arduino", " ArduinoBoard"] {
            assert_eq!(boards.resolve(kind), boards.resolve(""));
        }
        assert_eq!(boards.resolve(None::<&str>), &BoardKind::Generic);
        assert_eq!(boards.resolve("ArduinoBoard"), &BoardKind::Arduino);
    }

    #[test]
    fn builtin_tables() {
        let registries = Registries::builtin();
        assert_eq!(
            registries.devices.kinds().collect::<Vec<_>>(),
            vec!["LedDevice", "ServoDevice"]
        );
        assert_eq!(registries.protocols.resolve("SerialProtocol"), &ProtocolKind::Serial);
        assert_eq!(registries.protocols.resolve("EthernetProtocol"), &ProtocolKind::Custom);
        assert_eq!(registries.layouts.resolve(None::<&str>), &LayoutKind::Connected);
        assert_eq!(registries.commands.len(), 5);
    }

    #[test]
    fn command_controllers_resolve_by_kind() {
        let commands = Registries::builtin().commands;
        assert_eq!(commands.resolve("ServoCommand").kind(), "ServoCommand");
        assert_eq!(commands.resolve("LaserCommand").kind(), "GenericController");
        assert!(commands.contains("BlinkCommand"));
        assert!(!commands.contains("GenericController"));
    }

    #[test]
    fn empty_tag_cannot_be_registered() {
        let registry = TypeRegistry::new(0u8).with("", 1).with("one", 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(*registry.resolve(""), 0);
    }
}
