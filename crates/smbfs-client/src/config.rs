use std::collections::HashMap;

/// Keys carrying this prefix in a file-system options map are handed to the
/// client implementation untouched (minus the prefix).
pub const CONFIG_PREFIX: &str = "smb.client.";

/// Per-connection configuration handed to [`crate::SmbClient::resource`].
///
/// Default credentials fill in when neither the URI nor the file-system
/// options carry any; `properties` is the opaque pass-through bag for
/// implementation-specific tuning.
#[derive(Debug, Clone, Default)]
pub struct SmbConfig {
    pub default_domain: Option<String>,
    pub default_username: Option<String>,
    pub default_password: Option<String>,
    pub properties: HashMap<String, String>,
}

impl SmbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style credential defaults.
    pub fn with_credentials(
        mut self,
        domain: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Self {
        self.default_domain = domain.map(str::to_string);
        self.default_username = username.map(str::to_string);
        self.default_password = password.map(str::to_string);
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// True when the configuration supplies a default domain or username,
    /// making it a credential source of last resort.
    pub fn has_default_credentials(&self) -> bool {
        self.default_domain.is_some() || self.default_username.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_credentials() {
        let config = SmbConfig::new();
        assert!(!config.has_default_credentials());
        assert!(config.properties.is_empty());
    }

    #[test]
    fn with_credentials_sets_all_three_fields() {
        let config = SmbConfig::new().with_credentials(Some("WORKGROUP"), Some("admin"), Some("secret"));
        assert_eq!(config.default_domain.as_deref(), Some("WORKGROUP"));
        assert_eq!(config.default_username.as_deref(), Some("admin"));
        assert_eq!(config.default_password.as_deref(), Some("secret"));
        assert!(config.has_default_credentials());
    }

    #[test]
    fn domain_alone_counts_as_a_credential_source() {
        let config = SmbConfig::new().with_credentials(Some("WORKGROUP"), None, None);
        assert!(config.has_default_credentials());
    }

    #[test]
    fn properties_round_trip() {
        let mut config = SmbConfig::new();
        config.set_property("connTimeout", "5000");
        assert_eq!(config.property("connTimeout"), Some("5000"));
        assert_eq!(config.property("missing"), None);
    }
}
