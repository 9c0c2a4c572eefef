// ── Robot profile ──

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE_NAME: &str = "a Robot Management System";
pub const DEFAULT_PROFILE_DESCRIPTION: &str = "No profile loaded";

/// Profile pushed by the controller during the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_description")]
    pub description: String,
}

fn default_name() -> String {
    DEFAULT_PROFILE_NAME.to_owned()
}

fn default_description() -> String {
    DEFAULT_PROFILE_DESCRIPTION.to_owned()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: default_description(),
        }
    }
}
