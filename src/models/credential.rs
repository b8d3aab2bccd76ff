use std::fmt;

use serde::Serialize;

/// The one-time view of a freshly issued robot credential.
///
/// Only account creation and secret regeneration produce this value. It is
/// not `Clone` or `Deserialize`, and its `Debug` output hides the secret.
#[derive(Serialize)]
pub struct RobotCredential {
    /// Login name, including the configured prefix (e.g. `robot$ci-bot`)
    pub name: String,
    /// Plaintext bearer secret
    #[serde(rename = "token")]
    pub secret: String,
}

impl RobotCredential {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for RobotCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobotCredential")
            .field("name", &self.name)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Login name shown to callers: the configured prefix followed by the bare name.
pub fn login_name(prefix: &str, name: &str) -> String {
    format!("{}{}", prefix, name)
}
