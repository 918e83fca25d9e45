//! In-process stores backing tests and database-less development runs.
//!
//! They honour the same contracts as the PostgreSQL stores: every scoped
//! operation filters on the tenant, uniqueness is checked while the write
//! lock is held, provisioning is idempotent per subdomain, and hard deletes
//! apply the schema's `ON DELETE` actions to dependent stores.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::catalog::{BUILTIN_ROLES, DEFAULT_LOOKUPS, PROVINCES};
use super::models::{Lookup, LookupCategory, NewLookup, NewRole, NewTenant, Province, Role, Tenant, TenantUpdate};
use super::scope::{ScopedEntity, ScopedRepository, TenantId};
use super::store::{CatalogStore, Provisioned, TenantStore, CUSTOM_DOMAIN_CONFLICT, LOOKUP_CONFLICT, ROLE_CONFLICT};

/// A store holding rows that reference another entity type
#[async_trait]
pub trait Dependents: Send + Sync {
    async fn parent_deleted(&self, tenant: TenantId, parent: &'static str, id: Uuid);
}

pub struct MemoryScoped<T> {
    rows: RwLock<Vec<T>>,
    dependents: Vec<Arc<dyn Dependents>>,
}

impl<T> MemoryScoped<T> {
    pub fn new() -> Self {
        Self::with_dependents(Vec::new())
    }

    /// Store whose hard deletes are propagated to `dependents`
    pub fn with_dependents(dependents: Vec<Arc<dyn Dependents>>) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            dependents,
        }
    }
}

impl<T: ScopedEntity> MemoryScoped<T> {
    pub fn dependent(self: &Arc<Self>) -> Arc<dyn Dependents> {
        self.clone()
    }
}

#[async_trait]
impl<T: ScopedEntity> Dependents for MemoryScoped<T> {
    async fn parent_deleted(&self, tenant: TenantId, parent: &'static str, id: Uuid) {
        let mut rows = self.rows.write().await;
        rows.retain_mut(|row| !(row.tenant_id() == tenant && row.on_parent_deleted(parent, id)));
    }
}

impl<T> Default for MemoryScoped<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn visible<T: ScopedEntity>(row: &T, tenant: TenantId) -> bool {
    row.tenant_id() == tenant && !row.is_deleted()
}

fn key_taken<T: ScopedEntity>(rows: &[T], tenant: TenantId, key: &str, except: Option<Uuid>) -> bool {
    rows.iter().any(|r| {
        visible(r, tenant)
            && Some(r.id()) != except
            && r.unique_key().is_some_and(|k| k.eq_ignore_ascii_case(key))
    })
}

#[async_trait]
impl<T: ScopedEntity> ScopedRepository<T> for MemoryScoped<T> {
    async fn list(&self, tenant: TenantId) -> Result<Vec<T>, DatabaseError> {
        let rows = self.rows.read().await;
        let mut found: Vec<T> = rows.iter().filter(|r| visible(*r, tenant)).cloned().collect();
        found.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(found)
    }

    async fn get(&self, tenant: TenantId, id: Uuid) -> Result<Option<T>, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|r| visible(*r, tenant) && r.id() == id).cloned())
    }

    async fn find_unique(&self, tenant: TenantId, key: &str) -> Result<Option<T>, DatabaseError> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|r| visible(*r, tenant) && r.unique_key().is_some_and(|k| k.eq_ignore_ascii_case(key)))
            .cloned())
    }

    async fn create(&self, tenant: TenantId, input: T::Create) -> Result<T, DatabaseError> {
        let row = T::build(tenant, input);
        let mut rows = self.rows.write().await;
        if let Some(key) = row.unique_key() {
            if key_taken(&rows, tenant, &key, None) {
                return Err(DatabaseError::Conflict(T::conflict_message()));
            }
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, tenant: TenantId, id: Uuid, input: T::Update) -> Result<Option<T>, DatabaseError> {
        let mut rows = self.rows.write().await;
        let Some(index) = rows.iter().position(|r| visible(r, tenant) && r.id() == id) else {
            return Ok(None);
        };

        let mut updated = rows[index].clone();
        updated.apply(input);
        if let Some(key) = updated.unique_key() {
            if key_taken(&rows, tenant, &key, Some(id)) {
                return Err(DatabaseError::Conflict(T::conflict_message()));
            }
        }
        rows[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<bool, DatabaseError> {
        let removed = {
            let mut rows = self.rows.write().await;
            let Some(index) = rows.iter().position(|r| visible(r, tenant) && r.id() == id) else {
                return Ok(false);
            };
            if rows[index].mark_deleted() {
                false
            } else {
                rows.remove(index);
                true
            }
        };

        // Soft deletes keep the row, so references to it stay valid
        if removed {
            for dependent in &self.dependents {
                dependent.parent_deleted(tenant, T::LABEL, id).await;
            }
        }
        Ok(true)
    }
}

#[derive(Default)]
pub struct MemoryTenantStore {
    tenants: RwLock<Vec<Tenant>>,
}

impl MemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantStore for MemoryTenantStore {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DatabaseError> {
        let tenants = self.tenants.read().await;
        Ok(tenants.iter().find(|t| t.subdomain == subdomain).cloned())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Tenant>, DatabaseError> {
        let tenants = self.tenants.read().await;
        Ok(tenants.iter().find(|t| t.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Tenant>, DatabaseError> {
        let tenants = self.tenants.read().await;
        let mut all = tenants.clone();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn provision(&self, request: NewTenant) -> Result<Provisioned, DatabaseError> {
        let candidate = request.into_tenant(Utc::now());
        let mut tenants = self.tenants.write().await;

        if let Some(existing) = tenants.iter().find(|t| t.subdomain == candidate.subdomain) {
            return Ok(Provisioned {
                tenant: existing.clone(),
                created: false,
            });
        }
        if let Some(domain) = &candidate.custom_domain {
            if tenants.iter().any(|t| t.custom_domain.as_ref() == Some(domain)) {
                return Err(DatabaseError::Conflict(CUSTOM_DOMAIN_CONFLICT.to_string()));
            }
        }

        tenants.push(candidate.clone());
        Ok(Provisioned {
            tenant: candidate,
            created: true,
        })
    }

    async fn update(&self, id: Uuid, update: TenantUpdate) -> Result<Option<Tenant>, DatabaseError> {
        let mut tenants = self.tenants.write().await;
        let Some(index) = tenants.iter().position(|t| t.id == id) else {
            return Ok(None);
        };

        let mut updated = tenants[index].clone();
        update.apply(&mut updated, Utc::now());
        if let Some(domain) = &updated.custom_domain {
            if tenants.iter().any(|t| t.id != id && t.custom_domain.as_ref() == Some(domain)) {
                return Err(DatabaseError::Conflict(CUSTOM_DOMAIN_CONFLICT.to_string()));
            }
        }
        tenants[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

pub struct MemoryCatalogStore {
    roles: RwLock<Vec<Role>>,
    lookups: RwLock<Vec<Lookup>>,
    provinces: Vec<Province>,
}

impl MemoryCatalogStore {
    /// Catalog holding the same seed data as a freshly migrated database
    pub fn seeded() -> Self {
        let roles = BUILTIN_ROLES
            .iter()
            .map(|(name, description)| Role {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: Some(description.to_string()),
            })
            .collect();
        let lookups = DEFAULT_LOOKUPS
            .iter()
            .map(|(category, code, label)| {
                NewLookup {
                    category: *category,
                    code: code.to_string(),
                    label: label.to_string(),
                }
                .into_lookup()
            })
            .collect();
        let provinces = PROVINCES
            .iter()
            .map(|(code, name)| Province {
                code: code.to_string(),
                name: name.to_string(),
            })
            .collect();

        Self {
            roles: RwLock::new(roles),
            lookups: RwLock::new(lookups),
            provinces,
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn provinces(&self) -> Result<Vec<Province>, DatabaseError> {
        Ok(self.provinces.clone())
    }

    async fn lookups(&self, category: Option<LookupCategory>) -> Result<Vec<Lookup>, DatabaseError> {
        let lookups = self.lookups.read().await;
        let mut found: Vec<Lookup> = lookups
            .iter()
            .filter(|l| category.map_or(true, |c| l.category == c))
            .cloned()
            .collect();
        found.sort_by(|a, b| (a.category.as_str(), &a.code).cmp(&(b.category.as_str(), &b.code)));
        Ok(found)
    }

    async fn get_lookup(&self, id: Uuid) -> Result<Option<Lookup>, DatabaseError> {
        let lookups = self.lookups.read().await;
        Ok(lookups.iter().find(|l| l.id == id).cloned())
    }

    async fn create_lookup(&self, input: NewLookup) -> Result<Lookup, DatabaseError> {
        let lookup = input.into_lookup();
        let mut lookups = self.lookups.write().await;
        if lookups
            .iter()
            .any(|l| l.category == lookup.category && l.code == lookup.code)
        {
            return Err(DatabaseError::Conflict(LOOKUP_CONFLICT.to_string()));
        }
        lookups.push(lookup.clone());
        Ok(lookup)
    }

    async fn roles(&self) -> Result<Vec<Role>, DatabaseError> {
        let roles = self.roles.read().await;
        let mut all = roles.clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, DatabaseError> {
        let roles = self.roles.read().await;
        Ok(roles.iter().find(|r| r.name == name).cloned())
    }

    async fn create_role(&self, input: NewRole) -> Result<Role, DatabaseError> {
        let name = input.name.trim().to_string();
        let mut roles = self.roles.write().await;
        if roles.iter().any(|r| r.name == name) {
            return Err(DatabaseError::Conflict(ROLE_CONFLICT.to_string()));
        }
        let role = Role {
            id: Uuid::new_v4(),
            name,
            description: input.description,
        };
        roles.push(role.clone());
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Activity, ActivityKind, Case, Lawyer, LawyerPatch, NewActivity, NewCase, NewLawyer};

    fn new_lawyer(email: &str) -> NewLawyer {
        NewLawyer {
            full_name: "Ana Pérez".into(),
            email: email.into(),
            phone: None,
            bar_number: None,
            specialty: None,
            province_code: None,
        }
    }

    #[tokio::test]
    async fn rows_never_cross_tenants() {
        let repo = MemoryScoped::<Lawyer>::new();
        let a = TenantId::from(Uuid::new_v4());
        let b = TenantId::from(Uuid::new_v4());

        let in_a = repo.create(a, new_lawyer("ana@bufete.es")).await.unwrap();
        // Same email is fine in another tenant
        let in_b = repo.create(b, new_lawyer("ana@bufete.es")).await.unwrap();

        assert_eq!(repo.list(a).await.unwrap().len(), 1);
        assert!(repo.get(b, in_a.id).await.unwrap().is_none());
        assert!(repo.find_unique(b, "ANA@bufete.es").await.unwrap().unwrap().id == in_b.id);

        let patch = LawyerPatch {
            full_name: Some("Intruso".into()),
            ..Default::default()
        };
        assert!(repo.update(b, in_a.id, patch).await.unwrap().is_none());
        assert!(!repo.delete(b, in_a.id).await.unwrap());

        let still = repo.get(a, in_a.id).await.unwrap().unwrap();
        assert_eq!(still.full_name, "Ana Pérez");
    }

    fn new_case(number: &str, lawyer_id: Option<Uuid>) -> NewCase {
        NewCase {
            case_number: number.into(),
            title: None,
            debtor_name: "Deudor SA".into(),
            court: None,
            status: None,
            process_type_id: None,
            product_id: None,
            guarantee_id: None,
            lawyer_id,
            amount_claimed: None,
            filed_on: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn hard_deletes_follow_the_schema_actions() {
        let activities = Arc::new(MemoryScoped::<Activity>::new());
        let cases = Arc::new(MemoryScoped::<Case>::with_dependents(vec![activities.dependent()]));
        let lawyers = MemoryScoped::<Lawyer>::with_dependents(vec![cases.dependent()]);
        let tenant = TenantId::from(Uuid::new_v4());
        let other = TenantId::from(Uuid::new_v4());

        let lawyer = lawyers.create(tenant, new_lawyer("ana@bufete.es")).await.unwrap();
        let case = cases.create(tenant, new_case("1/2024", Some(lawyer.id))).await.unwrap();
        let foreign = cases.create(other, new_case("1/2024", Some(lawyer.id))).await.unwrap();
        activities
            .create(
                tenant,
                NewActivity {
                    case_id: case.id,
                    kind: ActivityKind::Call,
                    description: "Llamada".into(),
                    occurred_at: None,
                    duration_minutes: None,
                    created_by: None,
                },
            )
            .await
            .unwrap();

        // Lawyer delete sets the case reference to null, only inside the tenant
        assert!(lawyers.delete(tenant, lawyer.id).await.unwrap());
        assert!(cases.get(tenant, case.id).await.unwrap().unwrap().lawyer_id.is_none());
        assert_eq!(cases.get(other, foreign.id).await.unwrap().unwrap().lawyer_id, Some(lawyer.id));

        // Case delete cascades to its activities
        assert!(cases.delete(tenant, case.id).await.unwrap());
        assert!(activities.list(tenant).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_unique_key_is_a_conflict() {
        let repo = MemoryScoped::<Lawyer>::new();
        let tenant = TenantId::from(Uuid::new_v4());
        repo.create(tenant, new_lawyer("ana@bufete.es")).await.unwrap();
        let err = repo.create(tenant, new_lawyer("Ana@Bufete.es")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn concurrent_provisioning_creates_one_row() {
        let store = Arc::new(MemoryTenantStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.provision(NewTenant::for_subdomain("acme")).await.unwrap()
            }));
        }

        let mut created = 0;
        let mut ids = Vec::new();
        for handle in handles {
            let outcome = handle.await.unwrap();
            if outcome.created {
                created += 1;
            }
            ids.push(outcome.tenant.id);
        }

        assert_eq!(created, 1);
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn seeded_catalog_filters_by_category() {
        let catalog = MemoryCatalogStore::seeded();
        assert_eq!(catalog.provinces().await.unwrap().len(), 52);
        assert!(catalog.role_by_name("admin").await.unwrap().is_some());

        let products = catalog.lookups(Some(LookupCategory::Product)).await.unwrap();
        assert!(!products.is_empty());
        assert!(products.iter().all(|l| l.category == LookupCategory::Product));

        let dup = NewLookup {
            category: LookupCategory::Product,
            code: "tarjeta_credito".into(),
            label: "Otra".into(),
        };
        assert!(matches!(catalog.create_lookup(dup).await, Err(DatabaseError::Conflict(_))));
    }
}
