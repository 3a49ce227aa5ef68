//! Device fingerprinting for the secure config endpoint

use sha2::{Digest, Sha256};

/// Device and app metadata reported by the host platform
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    pub platform: String,
    pub model: String,
    pub os_version: String,
    pub app_version: String,
    pub install_id: String,
}

impl DeviceInfo {
    /// Lowercase hex SHA-256 over the `|`-joined metadata fields
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.platform.as_bytes());
        hasher.update(b"|");
        hasher.update(self.model.as_bytes());
        hasher.update(b"|");
        hasher.update(self.os_version.as_bytes());
        hasher.update(b"|");
        hasher.update(self.app_version.as_bytes());
        hasher.update(b"|");
        hasher.update(self.install_id.as_bytes());
        hex::encode(hasher.finalize())
    }
}
