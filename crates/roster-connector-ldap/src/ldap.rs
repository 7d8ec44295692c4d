//! LDAP-backed directory sessions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, info, instrument, warn};

use crate::client::{DirectoryConnector, DirectorySession};
use crate::config::DirectoryConfig;
use crate::entry::DirectoryEntry;
use crate::error::{DirectoryError, DirectoryResult};
use crate::filter::Filter;

/// Opens sessions against an LDAP server.
#[derive(Debug, Clone)]
pub struct LdapDirectory {
    config: Arc<DirectoryConfig>,
}

impl LdapDirectory {
    /// Create a connector. The configuration is validated up front.
    pub fn new(config: DirectoryConfig) -> DirectoryResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }
}

#[async_trait]
impl DirectoryConnector for LdapDirectory {
    fn config(&self) -> &Arc<DirectoryConfig> {
        &self.config
    }

    #[instrument(skip(self), fields(host = %self.config.host))]
    async fn connect(&self) -> DirectoryResult<Box<dyn DirectorySession>> {
        let url = self.config.url();
        debug!(url = %url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.connection_timeout_secs))
            .set_starttls(self.config.use_starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("Failed to connect to LDAP server at {}", url),
                    e,
                )
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        if let Some(bind_dn) = &self.config.bind_dn {
            let bind_password = self.config.bind_password.as_deref().unwrap_or("");
            debug!(bind_dn = %bind_dn, "Performing LDAP bind");

            let result = ldap.simple_bind(bind_dn, bind_password).await.map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("LDAP bind failed for {}", bind_dn),
                    e,
                )
            })?;

            if result.rc != 0 {
                return Err(DirectoryError::BindFailed {
                    bind_dn: bind_dn.clone(),
                    code: result.rc,
                    message: result.text,
                });
            }
        }

        info!(host = %self.config.host, "LDAP connection established");

        Ok(Box::new(LdapSession {
            ldap,
            base_dn: self.config.base_dn.clone(),
        }))
    }
}

struct LdapSession {
    ldap: Ldap,
    base_dn: String,
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn search(
        &mut self,
        filter: &Filter,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let ldap_filter = filter.to_ldap();
        debug!(filter = %ldap_filter, base_dn = %self.base_dn, "Searching LDAP");

        let result = self
            .ldap
            .search(&self.base_dn, Scope::Subtree, &ldap_filter, attributes.to_vec())
            .await
            .map_err(|e| DirectoryError::search_failed_with_source("LDAP search failed", e))?;

        let (entries, _) = result
            .success()
            .map_err(|e| DirectoryError::search_failed_with_source("LDAP search rejected", e))?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| {
                entry
                    .attrs
                    .into_iter()
                    .fold(DirectoryEntry::new(entry.dn), |acc, (name, values)| {
                        acc.with_attr(&name, values)
                    })
            })
            .collect())
    }

    async fn close(&mut self) -> DirectoryResult<()> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| DirectoryError::connection_failed_with_source("LDAP unbind failed", e))
    }
}
