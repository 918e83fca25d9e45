//! PostgreSQL stores.
//!
//! Scoped tables share one generic repository, [`PgScoped`]. Statements are
//! generated from the entity's [`PgEntity`] description and every one of them
//! binds the tenant id as `$1`.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, PgPool, Postgres, Row};
use uuid::Uuid;

use super::manager::{Database, DatabaseError};
use super::models::{
    Activity, Case, Creditor, Document, Event, Lawyer, Lookup, LookupCategory, NewLookup, NewRole, NewTenant,
    Province, Role, Tenant, TenantUpdate, User,
};
use super::scope::{ScopedEntity, ScopedRepository, TenantId};
use super::store::{CatalogStore, Provisioned, TenantStore, CUSTOM_DOMAIN_CONFLICT, LOOKUP_CONFLICT, ROLE_CONFLICT};

pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Table layout of a scoped entity
pub trait PgEntity: ScopedEntity + for<'r> FromRow<'r, PgRow> {
    const TABLE: &'static str;

    /// Writable columns, excluding `id`, `tenant_id`, `created_at` and `updated_at`
    const COLUMNS: &'static [&'static str];

    /// Column behind [`ScopedEntity::unique_key`]
    const UNIQUE_COLUMN: Option<&'static str> = None;

    /// Soft-deleted rows carry `status = 'deleted'` instead of being removed
    const SOFT_DELETE: bool = false;

    /// Select list for collection reads
    const LIST_COLUMNS: &'static str = "*";

    /// Bind the values of [`Self::COLUMNS`], in order
    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q>;
}

fn visibility<T: PgEntity>() -> &'static str {
    if T::SOFT_DELETE {
        " AND status <> 'deleted'"
    } else {
        ""
    }
}

pub(crate) fn list_sql<T: PgEntity>() -> String {
    format!(
        "SELECT {} FROM {} WHERE tenant_id = $1{} ORDER BY created_at DESC",
        T::LIST_COLUMNS,
        T::TABLE,
        visibility::<T>()
    )
}

pub(crate) fn get_sql<T: PgEntity>() -> String {
    format!("SELECT * FROM {} WHERE tenant_id = $1 AND id = $2{}", T::TABLE, visibility::<T>())
}

pub(crate) fn find_unique_sql<T: PgEntity>(column: &str) -> String {
    format!(
        "SELECT * FROM {} WHERE tenant_id = $1 AND lower({}) = lower($2){}",
        T::TABLE,
        column,
        visibility::<T>()
    )
}

pub(crate) fn insert_sql<T: PgEntity>() -> String {
    let columns = T::COLUMNS.join(", ");
    // $1 tenant_id, $2 id, then COLUMNS, then created_at and updated_at
    let placeholders: Vec<String> = (3..3 + T::COLUMNS.len() + 2).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {} (tenant_id, id, {}, created_at, updated_at) VALUES ($1, $2, {}) RETURNING *",
        T::TABLE,
        columns,
        placeholders.join(", ")
    )
}

pub(crate) fn update_sql<T: PgEntity>() -> String {
    let assignments: Vec<String> = T::COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ${}", column, i + 3))
        .collect();
    format!(
        "UPDATE {} SET {}, updated_at = ${} WHERE tenant_id = $1 AND id = $2{} RETURNING *",
        T::TABLE,
        assignments.join(", "),
        T::COLUMNS.len() + 3,
        visibility::<T>()
    )
}

pub(crate) fn delete_sql<T: PgEntity>() -> String {
    if T::SOFT_DELETE {
        format!(
            "UPDATE {} SET status = 'deleted', updated_at = now() WHERE tenant_id = $1 AND id = $2 AND status <> 'deleted'",
            T::TABLE
        )
    } else {
        format!("DELETE FROM {} WHERE tenant_id = $1 AND id = $2", T::TABLE)
    }
}

pub struct PgScoped<T> {
    pool: PgPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> PgScoped<T> {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
            _entity: PhantomData,
        }
    }
}

fn decode<T: PgEntity>(row: &PgRow) -> Result<T, DatabaseError> {
    T::from_row(row).map_err(|e| DatabaseError::QueryError(format!("decoding {} row: {}", T::TABLE, e)))
}

#[async_trait]
impl<T: PgEntity> ScopedRepository<T> for PgScoped<T> {
    async fn list(&self, tenant: TenantId) -> Result<Vec<T>, DatabaseError> {
        let sql = list_sql::<T>();
        let rows = sqlx::query(&sql).bind(tenant).fetch_all(&self.pool).await?;
        rows.iter().map(decode::<T>).collect()
    }

    async fn get(&self, tenant: TenantId, id: Uuid) -> Result<Option<T>, DatabaseError> {
        let sql = get_sql::<T>();
        let row = sqlx::query(&sql).bind(tenant).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode::<T>).transpose()
    }

    async fn find_unique(&self, tenant: TenantId, key: &str) -> Result<Option<T>, DatabaseError> {
        let Some(column) = T::UNIQUE_COLUMN else {
            return Ok(None);
        };
        let sql = find_unique_sql::<T>(column);
        let row = sqlx::query(&sql).bind(tenant).bind(key).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode::<T>).transpose()
    }

    async fn create(&self, tenant: TenantId, input: T::Create) -> Result<T, DatabaseError> {
        let entity = T::build(tenant, input);
        let sql = insert_sql::<T>();
        let created_at = entity.created_at();
        let query = sqlx::query(&sql).bind(tenant).bind(entity.id());
        let row = entity
            .bind_columns(query)
            .bind(created_at)
            .bind(created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_write(e, T::conflict_message))?;
        decode::<T>(&row)
    }

    async fn update(&self, tenant: TenantId, id: Uuid, input: T::Update) -> Result<Option<T>, DatabaseError> {
        let Some(mut entity) = self.get(tenant, id).await? else {
            return Ok(None);
        };
        entity.apply(input);

        let sql = update_sql::<T>();
        let query = sqlx::query(&sql).bind(tenant).bind(id);
        let row = entity
            .bind_columns(query)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_write(e, T::conflict_message))?;
        row.as_ref().map(decode::<T>).transpose()
    }

    async fn delete(&self, tenant: TenantId, id: Uuid) -> Result<bool, DatabaseError> {
        let sql = delete_sql::<T>();
        let result = sqlx::query(&sql).bind(tenant).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

impl PgEntity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["email", "name", "password_hash", "role", "active"];
    const UNIQUE_COLUMN: Option<&'static str> = Some("email");

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.email)
            .bind(&self.name)
            .bind(&self.password_hash)
            .bind(&self.role)
            .bind(self.active)
    }
}

impl PgEntity for Lawyer {
    const TABLE: &'static str = "lawyers";
    const COLUMNS: &'static [&'static str] = &[
        "full_name",
        "email",
        "phone",
        "bar_number",
        "specialty",
        "province_code",
        "active",
    ];
    const UNIQUE_COLUMN: Option<&'static str> = Some("email");

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.full_name)
            .bind(&self.email)
            .bind(&self.phone)
            .bind(&self.bar_number)
            .bind(&self.specialty)
            .bind(&self.province_code)
            .bind(self.active)
    }
}

impl PgEntity for Case {
    const TABLE: &'static str = "cases";
    const COLUMNS: &'static [&'static str] = &[
        "case_number",
        "title",
        "debtor_name",
        "court",
        "status",
        "process_type_id",
        "product_id",
        "guarantee_id",
        "lawyer_id",
        "amount_claimed",
        "filed_on",
        "notes",
    ];
    const UNIQUE_COLUMN: Option<&'static str> = Some("case_number");

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.case_number)
            .bind(&self.title)
            .bind(&self.debtor_name)
            .bind(&self.court)
            .bind(self.status.as_str())
            .bind(self.process_type_id)
            .bind(self.product_id)
            .bind(self.guarantee_id)
            .bind(self.lawyer_id)
            .bind(self.amount_claimed)
            .bind(self.filed_on)
            .bind(&self.notes)
    }
}

impl PgEntity for Creditor {
    const TABLE: &'static str = "creditors";
    const COLUMNS: &'static [&'static str] = &["case_id", "name", "tax_id", "email", "phone", "address", "debt_amount"];
    const UNIQUE_COLUMN: Option<&'static str> = Some("tax_id");

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.case_id)
            .bind(&self.name)
            .bind(&self.tax_id)
            .bind(&self.email)
            .bind(&self.phone)
            .bind(&self.address)
            .bind(self.debt_amount)
    }
}

impl PgEntity for Document {
    const TABLE: &'static str = "documents";
    const COLUMNS: &'static [&'static str] = &[
        "case_id",
        "file_name",
        "mime_type",
        "size_bytes",
        "checksum",
        "description",
        "status",
        "content",
        "uploaded_by",
    ];
    const SOFT_DELETE: bool = true;
    // Listings never ship the file body; it is only read by single-row gets
    const LIST_COLUMNS: &'static str = "id, tenant_id, case_id, file_name, mime_type, size_bytes, checksum, \
        description, status, '\\x'::bytea AS content, uploaded_by, created_at, updated_at";

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.case_id)
            .bind(&self.file_name)
            .bind(&self.mime_type)
            .bind(self.size_bytes)
            .bind(&self.checksum)
            .bind(&self.description)
            .bind(self.status.as_str())
            .bind(&self.content)
            .bind(self.uploaded_by)
    }
}

impl PgEntity for Activity {
    const TABLE: &'static str = "activities";
    const COLUMNS: &'static [&'static str] = &[
        "case_id",
        "kind",
        "description",
        "occurred_at",
        "duration_minutes",
        "created_by",
    ];

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.case_id)
            .bind(self.kind.as_str())
            .bind(&self.description)
            .bind(self.occurred_at)
            .bind(self.duration_minutes)
            .bind(self.created_by)
    }
}

impl PgEntity for Event {
    const TABLE: &'static str = "events";
    const COLUMNS: &'static [&'static str] = &[
        "case_id",
        "title",
        "description",
        "location",
        "starts_at",
        "ends_at",
        "all_day",
        "owner_id",
    ];

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.case_id)
            .bind(&self.title)
            .bind(&self.description)
            .bind(&self.location)
            .bind(self.starts_at)
            .bind(self.ends_at)
            .bind(self.all_day)
            .bind(self.owner_id)
    }
}

pub struct PgTenantStore {
    pool: PgPool,
}

impl PgTenantStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }
}

fn tenant_conflict() -> String {
    CUSTOM_DOMAIN_CONFLICT.to_string()
}

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Tenant>, DatabaseError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE subdomain = $1")
            .bind(subdomain)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Tenant>, DatabaseError> {
        let tenant = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    async fn list(&self) -> Result<Vec<Tenant>, DatabaseError> {
        let tenants = sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(tenants)
    }

    async fn provision(&self, request: NewTenant) -> Result<Provisioned, DatabaseError> {
        let tenant = request.into_tenant(Utc::now());

        // The no-op update makes RETURNING yield the existing row on conflict;
        // xmax is zero only for a freshly inserted tuple.
        let row = sqlx::query(
            r#"
            INSERT INTO tenants
                (id, name, company_name, description, subdomain, custom_domain, status, settings, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (subdomain) DO UPDATE SET subdomain = EXCLUDED.subdomain
            RETURNING *, (xmax = 0) AS inserted
            "#,
        )
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.company_name)
        .bind(&tenant.description)
        .bind(&tenant.subdomain)
        .bind(&tenant.custom_domain)
        .bind(tenant.status.as_str())
        .bind(&tenant.settings)
        .bind(tenant.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, tenant_conflict))?;

        Ok(Provisioned {
            tenant: Tenant::from_row(&row)?,
            created: row.try_get("inserted")?,
        })
    }

    async fn update(&self, id: Uuid, update: TenantUpdate) -> Result<Option<Tenant>, DatabaseError> {
        let Some(mut tenant) = self.get(id).await? else {
            return Ok(None);
        };
        update.apply(&mut tenant, Utc::now());

        let updated = sqlx::query_as::<_, Tenant>(
            r#"
            UPDATE tenants
               SET name = $2, company_name = $3, description = $4, custom_domain = $5,
                   status = $6, settings = $7, updated_at = $8
             WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&tenant.name)
        .bind(&tenant.company_name)
        .bind(&tenant.description)
        .bind(&tenant.custom_domain)
        .bind(tenant.status.as_str())
        .bind(&tenant.settings)
        .bind(tenant.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, tenant_conflict))?;
        Ok(updated)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(database: &Database) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn provinces(&self) -> Result<Vec<Province>, DatabaseError> {
        let provinces = sqlx::query_as::<_, Province>("SELECT code, name FROM provinces ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        Ok(provinces)
    }

    async fn lookups(&self, category: Option<LookupCategory>) -> Result<Vec<Lookup>, DatabaseError> {
        let lookups = match category {
            Some(category) => {
                sqlx::query_as::<_, Lookup>("SELECT * FROM lookups WHERE category = $1 ORDER BY code")
                    .bind(category.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as::<_, Lookup>("SELECT * FROM lookups ORDER BY category, code")
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(lookups)
    }

    async fn get_lookup(&self, id: Uuid) -> Result<Option<Lookup>, DatabaseError> {
        let lookup = sqlx::query_as::<_, Lookup>("SELECT * FROM lookups WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(lookup)
    }

    async fn create_lookup(&self, input: NewLookup) -> Result<Lookup, DatabaseError> {
        let lookup = input.into_lookup();
        let created = sqlx::query_as::<_, Lookup>(
            "INSERT INTO lookups (id, category, code, label, active, created_at) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(lookup.id)
        .bind(lookup.category.as_str())
        .bind(&lookup.code)
        .bind(&lookup.label)
        .bind(lookup.active)
        .bind(lookup.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, || LOOKUP_CONFLICT.to_string()))?;
        Ok(created)
    }

    async fn roles(&self) -> Result<Vec<Role>, DatabaseError> {
        let roles = sqlx::query_as::<_, Role>("SELECT id, name, description FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    async fn role_by_name(&self, name: &str) -> Result<Option<Role>, DatabaseError> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name, description FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn create_role(&self, input: NewRole) -> Result<Role, DatabaseError> {
        let role = sqlx::query_as::<_, Role>(
            "INSERT INTO roles (id, name, description) VALUES ($1, $2, $3) RETURNING id, name, description",
        )
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, || ROLE_CONFLICT.to_string()))?;
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_scoped(sql: &str) {
        assert!(sql.contains("WHERE tenant_id = $1"), "unscoped statement: {}", sql);
    }

    #[test]
    fn every_statement_is_tenant_scoped() {
        assert_scoped(&list_sql::<Lawyer>());
        assert_scoped(&get_sql::<Case>());
        assert_scoped(&find_unique_sql::<User>("email"));
        assert_scoped(&update_sql::<Creditor>());
        assert_scoped(&delete_sql::<Event>());
        assert_scoped(&delete_sql::<Document>());
        assert!(insert_sql::<Activity>().starts_with("INSERT INTO activities (tenant_id, id,"));
    }

    #[test]
    fn insert_placeholders_match_columns() {
        let sql = insert_sql::<User>();
        // tenant_id, id, 5 columns, created_at, updated_at
        assert!(sql.contains("VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"));
        assert!(!sql.contains("$10"));
    }

    #[test]
    fn update_assigns_columns_after_keys() {
        let sql = update_sql::<User>();
        assert!(sql.contains("email = $3"));
        assert!(sql.contains("active = $7"));
        assert!(sql.contains("updated_at = $8"));
    }

    #[test]
    fn soft_deleted_documents_are_hidden() {
        assert!(list_sql::<Document>().contains("status <> 'deleted'"));
        assert!(delete_sql::<Document>().starts_with("UPDATE documents SET status = 'deleted'"));
        assert!(!list_sql::<Lawyer>().contains("status"));
        assert!(delete_sql::<Lawyer>().starts_with("DELETE FROM lawyers"));
    }

    #[test]
    fn document_listing_leaves_content_in_the_table() {
        let sql = list_sql::<Document>();
        assert!(sql.starts_with("SELECT id, tenant_id, case_id, file_name"), "{}", sql);
        assert!(!sql.contains("SELECT *"));
        // The only mention of content is the empty placeholder
        assert_eq!(sql.matches("content").count(), 1, "{}", sql);
        assert!(sql.contains("'\\x'::bytea AS content"));
        for column in Document::COLUMNS.iter().filter(|c| **c != "content") {
            assert!(sql.contains(column), "{} missing from {}", column, sql);
        }
        assert!(list_sql::<Lawyer>().starts_with("SELECT * FROM lawyers"));
        assert!(get_sql::<Document>().starts_with("SELECT * FROM documents"));
    }
}
