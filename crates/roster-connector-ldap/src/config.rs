//! Directory configuration
//!
//! Connection settings plus the attribute names and social-profile labels of
//! the corporate directory schema.

use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};

/// Configuration for the corporate directory.
#[derive(Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// LDAP server hostname.
    pub host: String,

    /// LDAP server port (389 for LDAP, 636 for LDAPS).
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Use SSL/TLS (LDAPS).
    #[serde(default)]
    pub use_ssl: bool,

    /// Use STARTTLS upgrade on plain LDAP connection.
    #[serde(default)]
    pub use_starttls: bool,

    /// Search base (e.g., "ou=users,dc=example,dc=com").
    pub base_dn: String,

    /// Bind DN. Anonymous when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_dn: Option<String>,

    /// Bind password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    /// Connect timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Account looked up by the connectivity probe.
    #[serde(default = "default_probe_uid")]
    pub probe_uid: String,

    /// Attribute names.
    #[serde(default)]
    pub attributes: DirectoryAttributes,

    /// Social-profile value layout.
    #[serde(default)]
    pub social: SocialProfiles,
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("use_ssl", &self.use_ssl)
            .field("use_starttls", &self.use_starttls)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("connection_timeout_secs", &self.connection_timeout_secs)
            .field("probe_uid", &self.probe_uid)
            .field("attributes", &self.attributes)
            .field("social", &self.social)
            .finish()
    }
}

fn default_ldap_port() -> u16 {
    389
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_probe_uid() -> String {
    "root".to_string()
}

impl DirectoryConfig {
    /// Create a config with required fields.
    pub fn new(host: impl Into<String>, base_dn: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_ldap_port(),
            use_ssl: false,
            use_starttls: false,
            base_dn: base_dn.into(),
            bind_dn: None,
            bind_password: None,
            connection_timeout_secs: default_connection_timeout(),
            probe_uid: default_probe_uid(),
            attributes: DirectoryAttributes::default(),
            social: SocialProfiles::default(),
        }
    }

    /// Set bind credentials.
    pub fn with_bind(mut self, bind_dn: impl Into<String>, password: impl Into<String>) -> Self {
        self.bind_dn = Some(bind_dn.into());
        self.bind_password = Some(password.into());
        self
    }

    /// Enable SSL (LDAPS).
    #[must_use]
    pub fn with_ssl(mut self) -> Self {
        self.use_ssl = true;
        self.port = 636;
        self
    }

    /// Connection URL.
    pub fn url(&self) -> String {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.host.trim().is_empty() {
            return Err(DirectoryError::InvalidConfiguration {
                message: "host is required".to_string(),
            });
        }
        if self.base_dn.trim().is_empty() {
            return Err(DirectoryError::InvalidConfiguration {
                message: "base_dn is required".to_string(),
            });
        }
        if self.use_ssl && self.use_starttls {
            return Err(DirectoryError::InvalidConfiguration {
                message: "use_ssl and use_starttls are mutually exclusive".to_string(),
            });
        }
        if self.bind_dn.is_some() && self.bind_password.is_none() {
            return Err(DirectoryError::InvalidConfiguration {
                message: "bind_password is required when bind_dn is set".to_string(),
            });
        }
        Ok(())
    }
}

/// Attribute names of a person entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryAttributes {
    #[serde(default = "default_uid_attribute")]
    pub uid: String,
    #[serde(default = "default_name_attribute")]
    pub name: String,
    #[serde(default = "default_email_attribute")]
    pub email: String,
    /// Multi-valued attribute holding `<Label>-><profile URL>` values.
    #[serde(default = "default_social_attribute")]
    pub social: String,
}

fn default_uid_attribute() -> String {
    "uid".to_string()
}

fn default_name_attribute() -> String {
    "cn".to_string()
}

fn default_email_attribute() -> String {
    "mail".to_string()
}

fn default_social_attribute() -> String {
    "rhatSocialURL".to_string()
}

impl Default for DirectoryAttributes {
    fn default() -> Self {
        Self {
            uid: default_uid_attribute(),
            name: default_name_attribute(),
            email: default_email_attribute(),
            social: default_social_attribute(),
        }
    }
}

/// Which external service a social-profile value points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocialService {
    /// The code-collaboration platform.
    Platform,
    /// The secondary service (container registry).
    Secondary,
}

/// Layout of social-profile values: `<label>-><url prefix><handle>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialProfiles {
    #[serde(default = "default_platform_label")]
    pub platform_label: String,
    #[serde(default = "default_platform_url")]
    pub platform_url: String,
    #[serde(default = "default_secondary_label")]
    pub secondary_label: String,
    #[serde(default = "default_secondary_url")]
    pub secondary_url: String,
}

fn default_platform_label() -> String {
    "Github".to_string()
}

fn default_platform_url() -> String {
    "https://github.com/".to_string()
}

fn default_secondary_label() -> String {
    "Quay".to_string()
}

fn default_secondary_url() -> String {
    "https://quay.io/user/".to_string()
}

impl Default for SocialProfiles {
    fn default() -> Self {
        Self {
            platform_label: default_platform_label(),
            platform_url: default_platform_url(),
            secondary_label: default_secondary_label(),
            secondary_url: default_secondary_url(),
        }
    }
}

impl SocialProfiles {
    /// `<label>->` prefix for a service.
    pub fn prefix(&self, service: SocialService) -> String {
        let label = match service {
            SocialService::Platform => &self.platform_label,
            SocialService::Secondary => &self.secondary_label,
        };
        format!("{label}->")
    }

    /// Full value the directory stores for `handle`.
    pub fn value(&self, service: SocialService, handle: &str) -> String {
        let url = match service {
            SocialService::Platform => &self.platform_url,
            SocialService::Secondary => &self.secondary_url,
        };
        format!("{}{}{}", self.prefix(service), url, handle)
    }

    /// Split a stored value into its service and bare handle.
    pub fn parse(&self, value: &str) -> Option<(SocialService, String)> {
        for service in [SocialService::Platform, SocialService::Secondary] {
            let prefix = self.prefix(service);
            let matches = value
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(&prefix));
            if matches {
                let handle = roster_core::remove_domain_name(&value[prefix.len()..]);
                return (!handle.is_empty()).then_some((service, handle));
            }
        }
        None
    }
}
