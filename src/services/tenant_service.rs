//! Tenant resolution and provisioning.
//!
//! Resolution maps a request's `Host` header onto an active tenant and never
//! writes. Provisioning is a separate, idempotent write. Development setups
//! may hand the resolver a provisioner, which it then calls on a miss.

use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::database::models::{NewTenant, Tenant};
use crate::database::{DatabaseError, Provisioned, TenantId, TenantStore};

pub const MAX_SUBDOMAIN_LEN: usize = 63;

#[derive(Debug, thiserror::Error)]
pub enum TenantError {
    #[error("Tenant not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidSubdomain(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// The tenant a request operates on
#[derive(Debug, Clone, Serialize)]
pub struct TenantContext {
    pub tenant: Tenant,
    pub tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant: Tenant) -> Self {
        let tenant_id = TenantId::from(tenant.id);
        Self { tenant, tenant_id }
    }
}

/// Derive the tenant subdomain candidate from a `Host` header value.
///
/// Ports and IPv6 brackets are stripped and the result lowercased. Missing
/// hosts, `localhost` and IP literals map to `default`. Hosts with two or
/// more labels yield the first label; a single label is used whole.
pub fn derive_subdomain(host: Option<&str>, default: &str) -> String {
    let Some(host) = host.map(str::trim).filter(|h| !h.is_empty()) else {
        return default.to_string();
    };

    // [::1]:8080 or [::1]
    if host.starts_with('[') {
        return default.to_string();
    }
    // Bare IPv6 literal
    if host.matches(':').count() > 1 {
        return default.to_string();
    }

    let name = host
        .split_once(':')
        .map_or(host, |(name, _port)| name)
        .trim_end_matches('.')
        .to_ascii_lowercase();

    if name.is_empty() || name == "localhost" || name.parse::<IpAddr>().is_ok() {
        return default.to_string();
    }

    match name.split_once('.') {
        Some((first, _)) => first.to_string(),
        None => name,
    }
}

/// Lowercase letters, digits and inner hyphens, at most 63 characters
pub fn is_valid_subdomain(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.len() <= MAX_SUBDOMAIN_LEN
        && !candidate.starts_with('-')
        && !candidate.ends_with('-')
        && candidate
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Explicit tenant creation
#[derive(Clone)]
pub struct TenantProvisioner {
    store: Arc<dyn TenantStore>,
}

impl TenantProvisioner {
    pub fn new(store: Arc<dyn TenantStore>) -> Self {
        Self { store }
    }

    /// Create the tenant, or return the existing one for the same subdomain
    pub async fn provision(&self, mut request: NewTenant) -> Result<Provisioned, TenantError> {
        request.subdomain = request.subdomain.trim().to_ascii_lowercase();
        if !is_valid_subdomain(&request.subdomain) {
            return Err(TenantError::InvalidSubdomain(format!(
                "'{}' is not a valid subdomain: use 1 to {} lowercase letters, digits or inner hyphens",
                request.subdomain, MAX_SUBDOMAIN_LEN
            )));
        }

        let outcome = self.store.provision(request).await?;
        if outcome.created {
            info!(
                "Provisioned tenant {} ({})",
                outcome.tenant.subdomain, outcome.tenant.id
            );
        }
        Ok(outcome)
    }
}

#[derive(Clone)]
pub struct TenantResolver {
    store: Arc<dyn TenantStore>,
    default_subdomain: String,
    /// Present only when misses may create tenants
    auto_provision: Option<TenantProvisioner>,
}

impl TenantResolver {
    pub fn new(store: Arc<dyn TenantStore>, default_subdomain: impl Into<String>) -> Self {
        Self {
            store,
            default_subdomain: default_subdomain.into(),
            auto_provision: None,
        }
    }

    pub fn with_auto_provision(mut self, provisioner: TenantProvisioner) -> Self {
        self.auto_provision = Some(provisioner);
        self
    }

    pub fn candidate(&self, host: Option<&str>) -> String {
        derive_subdomain(host, &self.default_subdomain)
    }

    /// Active tenant for `host`, without side effects
    pub async fn lookup(&self, host: Option<&str>) -> Result<Option<TenantContext>, TenantError> {
        let candidate = self.candidate(host);
        if !is_valid_subdomain(&candidate) {
            debug!("Host {:?} does not yield a valid subdomain", host);
            return Ok(None);
        }
        let tenant = self.store.find_by_subdomain(&candidate).await?;
        Ok(tenant.filter(Tenant::is_active).map(TenantContext::new))
    }

    /// Active tenant for `host`, provisioning it first when allowed
    pub async fn resolve(&self, host: Option<&str>) -> Result<TenantContext, TenantError> {
        let candidate = self.candidate(host);
        if !is_valid_subdomain(&candidate) {
            return Err(TenantError::NotFound(candidate));
        }

        if let Some(tenant) = self.store.find_by_subdomain(&candidate).await? {
            return if tenant.is_active() {
                Ok(TenantContext::new(tenant))
            } else {
                debug!("Tenant {} exists but is {}", candidate, tenant.status);
                Err(TenantError::NotFound(candidate))
            };
        }

        let Some(provisioner) = &self.auto_provision else {
            return Err(TenantError::NotFound(candidate));
        };
        let outcome = provisioner.provision(NewTenant::for_subdomain(candidate.clone())).await?;
        if outcome.tenant.is_active() {
            Ok(TenantContext::new(outcome.tenant))
        } else {
            Err(TenantError::NotFound(candidate))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryTenantStore;
    use crate::database::models::{TenantStatus, TenantUpdate};

    fn store() -> Arc<dyn TenantStore> {
        Arc::new(MemoryTenantStore::new())
    }

    #[test]
    fn first_label_of_multi_label_hosts() {
        assert_eq!(derive_subdomain(Some("acme.example.com"), "default"), "acme");
        assert_eq!(derive_subdomain(Some("a.b"), "default"), "a");
        assert_eq!(derive_subdomain(Some("a.b.c"), "default"), "a");
        assert_eq!(derive_subdomain(Some("ACME.Example.com:8443"), "default"), "acme");
        assert_eq!(derive_subdomain(Some("acme.localhost:3000"), "default"), "acme");
    }

    #[test]
    fn local_hosts_use_the_default() {
        for host in [
            "localhost",
            "localhost:3000",
            "127.0.0.1",
            "127.0.0.1:8080",
            "10.20.30.40",
            "192.168.1.5:80",
            "::1",
            "[::1]:3000",
            "[2001:db8::1]",
            "",
            "   ",
        ] {
            assert_eq!(derive_subdomain(Some(host), "default"), "default", "host {:?}", host);
        }
        assert_eq!(derive_subdomain(None, "principal"), "principal");
    }

    #[test]
    fn single_label_hosts_are_used_whole() {
        assert_eq!(derive_subdomain(Some("intranet"), "default"), "intranet");
        assert_eq!(derive_subdomain(Some("intranet:8080"), "default"), "intranet");
    }

    #[test]
    fn subdomain_rules() {
        assert!(is_valid_subdomain("acme"));
        assert!(is_valid_subdomain("bufete-garcia-2"));
        assert!(!is_valid_subdomain(""));
        assert!(!is_valid_subdomain("-acme"));
        assert!(!is_valid_subdomain("acme-"));
        assert!(!is_valid_subdomain("acme_legal"));
        assert!(!is_valid_subdomain("Acme"));
        assert!(!is_valid_subdomain(&"a".repeat(64)));
    }

    #[tokio::test]
    async fn miss_without_provisioning_creates_nothing() {
        let store = store();
        let resolver = TenantResolver::new(store.clone(), "default");

        let err = resolver.resolve(Some("acme.example.com")).await.unwrap_err();
        assert!(matches!(err, TenantError::NotFound(ref s) if s == "acme"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn development_miss_provisions_once_and_reuses() {
        let store = store();
        let resolver = TenantResolver::new(store.clone(), "default")
            .with_auto_provision(TenantProvisioner::new(store.clone()));

        let first = resolver.resolve(Some("acme.example.com")).await.unwrap();
        assert_eq!(first.tenant.name, "Tenant acme");
        assert_eq!(first.tenant.subdomain, "acme");
        assert_eq!(first.tenant.status, TenantStatus::Active);

        let second = resolver.resolve(Some("acme.example.com")).await.unwrap();
        assert_eq!(first.tenant_id, second.tenant_id);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_misses_converge_on_one_tenant() {
        let store = store();
        let resolver = TenantResolver::new(store.clone(), "default")
            .with_auto_provision(TenantProvisioner::new(store.clone()));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let resolver = resolver.clone();
            handles.push(tokio::spawn(async move {
                resolver.resolve(Some("nuevo.example.com")).await.unwrap().tenant_id
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inactive_tenants_are_not_resolved() {
        let store = store();
        let provisioner = TenantProvisioner::new(store.clone());
        let created = provisioner.provision(NewTenant::for_subdomain("acme")).await.unwrap();
        store
            .update(
                created.tenant.id,
                TenantUpdate {
                    status: Some(TenantStatus::Suspended),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let resolver = TenantResolver::new(store.clone(), "default").with_auto_provision(provisioner);
        assert!(matches!(
            resolver.resolve(Some("acme.example.com")).await,
            Err(TenantError::NotFound(_))
        ));
        assert!(resolver.lookup(Some("acme.example.com")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_candidates_are_never_provisioned() {
        let store = store();
        let resolver = TenantResolver::new(store.clone(), "default")
            .with_auto_provision(TenantProvisioner::new(store.clone()));

        assert!(matches!(
            resolver.resolve(Some("bad_name.example.com")).await,
            Err(TenantError::NotFound(_))
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookup_never_writes() {
        let store = store();
        let resolver = TenantResolver::new(store.clone(), "default")
            .with_auto_provision(TenantProvisioner::new(store.clone()));

        assert!(resolver.lookup(Some("acme.example.com")).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn provisioning_normalizes_and_validates() {
        let provisioner = TenantProvisioner::new(store());
        let outcome = provisioner.provision(NewTenant::for_subdomain("  ACME ")).await.unwrap();
        assert_eq!(outcome.tenant.subdomain, "acme");
        assert!(matches!(
            provisioner.provision(NewTenant::for_subdomain("no spaces")).await,
            Err(TenantError::InvalidSubdomain(_))
        ));
    }
}
