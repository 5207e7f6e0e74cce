//! Deployment-level access settings.

use serde::{Deserialize, Serialize};

/// Access settings, deserialized from the `[access]` table of the site config.
///
/// These are read once at startup and passed explicitly into every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSettings {
    /// When set, anonymous viewers see nothing at all.
    #[serde(default = "default_require_login")]
    pub require_login: bool,
}

fn default_require_login() -> bool {
    true
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            require_login: default_require_login(),
        }
    }
}
