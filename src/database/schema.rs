//! Embedded schema migrations.
//!
//! Each migration runs once, inside its own transaction, and is recorded in
//! `schema_migrations`. Seed data for the global catalog is inserted with
//! `ON CONFLICT DO NOTHING` so re-running against a seeded database is safe.

use sqlx::{Executor, PgPool};
use tracing::info;

use super::manager::DatabaseError;
use super::models::catalog::{BUILTIN_ROLES, DEFAULT_LOOKUPS, PROVINCES};

const CREATE_TENANTS: &str = r#"
CREATE EXTENSION IF NOT EXISTS pgcrypto;

CREATE TABLE IF NOT EXISTS tenants (
    id            UUID PRIMARY KEY,
    name          TEXT NOT NULL,
    company_name  TEXT,
    description   TEXT,
    subdomain     TEXT NOT NULL UNIQUE,
    custom_domain TEXT UNIQUE,
    status        TEXT NOT NULL DEFAULT 'active'
                  CHECK (status IN ('active', 'inactive', 'suspended')),
    settings      JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT now()
);
"#;

const CREATE_CATALOG: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    id          UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name        TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS provinces (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS lookups (
    id         UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    category   TEXT NOT NULL CHECK (category IN ('product', 'guarantee', 'process_type')),
    code       TEXT NOT NULL,
    label      TEXT NOT NULL,
    active     BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (category, code)
);
"#;

const CREATE_SCOPED: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            UUID PRIMARY KEY,
    tenant_id     UUID NOT NULL REFERENCES tenants(id),
    email         TEXT NOT NULL,
    name          TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL,
    active        BOOLEAN NOT NULL DEFAULT true,
    created_at    TIMESTAMPTZ NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS users_tenant_email ON users (tenant_id, lower(email));

CREATE TABLE IF NOT EXISTS lawyers (
    id            UUID PRIMARY KEY,
    tenant_id     UUID NOT NULL REFERENCES tenants(id),
    full_name     TEXT NOT NULL,
    email         TEXT NOT NULL,
    phone         TEXT,
    bar_number    TEXT,
    specialty     TEXT,
    province_code TEXT REFERENCES provinces(code),
    active        BOOLEAN NOT NULL DEFAULT true,
    created_at    TIMESTAMPTZ NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS lawyers_tenant_email ON lawyers (tenant_id, lower(email));

CREATE TABLE IF NOT EXISTS cases (
    id              UUID PRIMARY KEY,
    tenant_id       UUID NOT NULL REFERENCES tenants(id),
    case_number     TEXT NOT NULL,
    title           TEXT NOT NULL,
    debtor_name     TEXT NOT NULL,
    court           TEXT,
    status          TEXT NOT NULL CHECK (status IN ('open', 'in_progress', 'closed', 'archived')),
    process_type_id UUID REFERENCES lookups(id),
    product_id      UUID REFERENCES lookups(id),
    guarantee_id    UUID REFERENCES lookups(id),
    lawyer_id       UUID REFERENCES lawyers(id) ON DELETE SET NULL,
    amount_claimed  NUMERIC(14, 2),
    filed_on        DATE,
    notes           TEXT,
    created_at      TIMESTAMPTZ NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS cases_tenant_number ON cases (tenant_id, lower(case_number));
CREATE INDEX IF NOT EXISTS cases_tenant_created ON cases (tenant_id, created_at DESC);

CREATE TABLE IF NOT EXISTS creditors (
    id          UUID PRIMARY KEY,
    tenant_id   UUID NOT NULL REFERENCES tenants(id),
    case_id     UUID REFERENCES cases(id) ON DELETE SET NULL,
    name        TEXT NOT NULL,
    tax_id      TEXT,
    email       TEXT,
    phone       TEXT,
    address     TEXT,
    debt_amount NUMERIC(14, 2),
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS creditors_tenant_tax_id ON creditors (tenant_id, lower(tax_id))
    WHERE tax_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS documents (
    id          UUID PRIMARY KEY,
    tenant_id   UUID NOT NULL REFERENCES tenants(id),
    case_id     UUID REFERENCES cases(id) ON DELETE SET NULL,
    file_name   TEXT NOT NULL,
    mime_type   TEXT NOT NULL,
    size_bytes  BIGINT NOT NULL,
    checksum    TEXT NOT NULL,
    description TEXT,
    status      TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'deleted')),
    content     BYTEA NOT NULL,
    uploaded_by UUID REFERENCES users(id) ON DELETE SET NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS documents_tenant_created ON documents (tenant_id, created_at DESC);

CREATE TABLE IF NOT EXISTS activities (
    id               UUID PRIMARY KEY,
    tenant_id        UUID NOT NULL REFERENCES tenants(id),
    case_id          UUID NOT NULL REFERENCES cases(id) ON DELETE CASCADE,
    kind             TEXT NOT NULL
                     CHECK (kind IN ('call', 'email', 'meeting', 'filing', 'hearing', 'note')),
    description      TEXT NOT NULL,
    occurred_at      TIMESTAMPTZ NOT NULL,
    duration_minutes INTEGER,
    created_by       UUID REFERENCES users(id) ON DELETE SET NULL,
    created_at       TIMESTAMPTZ NOT NULL,
    updated_at       TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    id          UUID PRIMARY KEY,
    tenant_id   UUID NOT NULL REFERENCES tenants(id),
    case_id     UUID REFERENCES cases(id) ON DELETE SET NULL,
    title       TEXT NOT NULL,
    description TEXT,
    location    TEXT,
    starts_at   TIMESTAMPTZ NOT NULL,
    ends_at     TIMESTAMPTZ,
    all_day     BOOLEAN NOT NULL DEFAULT false,
    owner_id    UUID REFERENCES users(id) ON DELETE SET NULL,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS events_tenant_starts ON events (tenant_id, starts_at);
"#;

/// Ordered migrations: (version, statements)
const MIGRATIONS: &[(&str, &str)] = &[
    ("0001_tenants", CREATE_TENANTS),
    ("0002_catalog", CREATE_CATALOG),
    ("0003_scoped_entities", CREATE_SCOPED),
];

/// Apply pending migrations and the catalog seed. Returns the versions applied.
pub async fn migrate(pool: &PgPool) -> Result<Vec<&'static str>, DatabaseError> {
    pool.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    TEXT PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    )
    .await?;

    let mut applied = Vec::new();
    for (version, statements) in MIGRATIONS {
        let done: Option<String> = sqlx::query_scalar("SELECT version FROM schema_migrations WHERE version = $1")
            .bind(*version)
            .fetch_optional(pool)
            .await?;
        if done.is_some() {
            continue;
        }

        let mut tx = pool.begin().await?;
        (&mut *tx)
            .execute(*statements)
            .await
            .map_err(|e| DatabaseError::QueryError(format!("migration {} failed: {}", version, e)))?;
        sqlx::query("INSERT INTO schema_migrations (version) VALUES ($1)")
            .bind(*version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Applied migration {}", version);
        applied.push(*version);
    }

    seed_catalog(pool).await?;
    Ok(applied)
}

async fn seed_catalog(pool: &PgPool) -> Result<(), DatabaseError> {
    for (name, description) in BUILTIN_ROLES {
        sqlx::query("INSERT INTO roles (name, description) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(*name)
            .bind(*description)
            .execute(pool)
            .await?;
    }
    for (code, name) in PROVINCES {
        sqlx::query("INSERT INTO provinces (code, name) VALUES ($1, $2) ON CONFLICT (code) DO NOTHING")
            .bind(*code)
            .bind(*name)
            .execute(pool)
            .await?;
    }
    for (category, code, label) in DEFAULT_LOOKUPS {
        sqlx::query(
            "INSERT INTO lookups (category, code, label) VALUES ($1, $2, $3) ON CONFLICT (category, code) DO NOTHING",
        )
        .bind(category.as_str())
        .bind(*code)
        .bind(*label)
        .execute(pool)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered_and_unique() {
        let versions: Vec<&str> = MIGRATIONS.iter().map(|(v, _)| *v).collect();
        let mut sorted = versions.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(versions, sorted);
    }

    #[test]
    fn every_scoped_table_requires_a_tenant() {
        for table in ["users", "lawyers", "cases", "creditors", "documents", "activities", "events"] {
            let start = CREATE_SCOPED
                .find(&format!("CREATE TABLE IF NOT EXISTS {} (", table))
                .unwrap_or_else(|| panic!("missing table {}", table));
            let body = &CREATE_SCOPED[start..];
            let end = body.find(");").unwrap();
            let normalized = body[..end].split_whitespace().collect::<Vec<_>>().join(" ");
            assert!(
                normalized.contains("tenant_id UUID NOT NULL REFERENCES tenants(id)"),
                "{} lacks a mandatory tenant_id",
                table
            );
        }
    }

    #[test]
    fn references_to_deletable_rows_declare_an_action() {
        for line in CREATE_SCOPED.lines() {
            let deletable = ["REFERENCES users(id)", "REFERENCES lawyers(id)", "REFERENCES cases(id)"]
                .iter()
                .any(|r| line.contains(r));
            if deletable {
                assert!(line.contains("ON DELETE"), "missing ON DELETE action: {}", line.trim());
            }
        }
    }
}
