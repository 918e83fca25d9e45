//! Application state and router assembly.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::{AuthError, TokenKeys};
use crate::broker::{EventPublisher, MemoryBroker, MessageLog};
use crate::config::AppConfig;
use crate::database::memory::{MemoryCatalogStore, MemoryScoped, MemoryTenantStore};
use crate::database::models::{Activity, Case, Creditor, Document, Event, Lawyer, User};
use crate::database::postgres::{PgCatalogStore, PgScoped, PgTenantStore};
use crate::database::{CatalogStore, Database, ScopedRepository, TenantStore};
use crate::handlers::{elevated, protected, public};
use crate::middleware::{jwt_auth_middleware, optional_tenant, require_root, require_tenant};
use crate::services::tenant_service::{TenantProvisioner, TenantResolver};

/// One repository per tenant-scoped entity
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn ScopedRepository<User>>,
    pub lawyers: Arc<dyn ScopedRepository<Lawyer>>,
    pub cases: Arc<dyn ScopedRepository<Case>>,
    pub creditors: Arc<dyn ScopedRepository<Creditor>>,
    pub documents: Arc<dyn ScopedRepository<Document>>,
    pub activities: Arc<dyn ScopedRepository<Activity>>,
    pub events: Arc<dyn ScopedRepository<Event>>,
}

impl Repositories {
    /// Memory stores wired with the same delete actions as the SQL schema
    pub fn in_memory() -> Self {
        let creditors = Arc::new(MemoryScoped::<Creditor>::new());
        let documents = Arc::new(MemoryScoped::<Document>::new());
        let activities = Arc::new(MemoryScoped::<Activity>::new());
        let events = Arc::new(MemoryScoped::<Event>::new());
        let cases = Arc::new(MemoryScoped::<Case>::with_dependents(vec![
            creditors.dependent(),
            documents.dependent(),
            activities.dependent(),
            events.dependent(),
        ]));
        let lawyers = MemoryScoped::<Lawyer>::with_dependents(vec![cases.dependent()]);
        let users = MemoryScoped::<User>::with_dependents(vec![
            documents.dependent(),
            activities.dependent(),
            events.dependent(),
        ]);

        Self {
            users: Arc::new(users),
            lawyers: Arc::new(lawyers),
            cases,
            creditors,
            documents,
            activities,
            events,
        }
    }

    pub fn postgres(database: &Database) -> Self {
        Self {
            users: Arc::new(PgScoped::new(database)),
            lawyers: Arc::new(PgScoped::new(database)),
            cases: Arc::new(PgScoped::new(database)),
            creditors: Arc::new(PgScoped::new(database)),
            documents: Arc::new(PgScoped::new(database)),
            activities: Arc::new(PgScoped::new(database)),
            events: Arc::new(PgScoped::new(database)),
        }
    }
}

/// Everything a request handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub database: Option<Database>,
    pub tenants: Arc<dyn TenantStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub resolver: TenantResolver,
    pub provisioner: TenantProvisioner,
    pub keys: TokenKeys,
    pub repositories: Repositories,
    pub broker: Arc<dyn EventPublisher>,
    pub messages: Arc<MessageLog>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        database: Option<Database>,
        tenants: Arc<dyn TenantStore>,
        catalog: Arc<dyn CatalogStore>,
        repositories: Repositories,
        broker: Arc<dyn EventPublisher>,
        messages: Arc<MessageLog>,
    ) -> Result<Self, AuthError> {
        let keys = TokenKeys::from_config(&config.security)?;
        let provisioner = TenantProvisioner::new(tenants.clone());
        let mut resolver = TenantResolver::new(tenants.clone(), config.tenancy.default_subdomain.clone());
        if config.tenancy.auto_provision {
            if !config.is_development() {
                warn!("Tenant auto-provisioning is enabled outside development");
            }
            resolver = resolver.with_auto_provision(provisioner.clone());
        }

        Ok(Self {
            config: Arc::new(config),
            database,
            tenants,
            catalog,
            resolver,
            provisioner,
            keys,
            repositories,
            broker,
            messages,
        })
    }

    /// PostgreSQL-backed state for the server binary
    pub fn postgres(
        config: AppConfig,
        database: Database,
        broker: Arc<dyn EventPublisher>,
        messages: Arc<MessageLog>,
    ) -> Result<Self, AuthError> {
        Self::new(
            config,
            Some(database.clone()),
            Arc::new(PgTenantStore::new(&database)),
            Arc::new(PgCatalogStore::new(&database)),
            Repositories::postgres(&database),
            broker,
            messages,
        )
    }

    /// Fully in-process state: memory stores and an in-memory exchange
    pub fn in_memory(config: AppConfig) -> Result<Self, AuthError> {
        let messages = Arc::new(MessageLog::new(config.broker.recent_capacity));
        let broker = Arc::new(MemoryBroker::new(&config.broker, messages.clone()));
        Self::new(
            config,
            None,
            Arc::new(MemoryTenantStore::new()),
            Arc::new(MemoryCatalogStore::seeded()),
            Repositories::in_memory(),
            broker,
            messages,
        )
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    if config.security.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let open = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health));

    let catalog = Router::new()
        .route("/api/provincies", get(public::province_list))
        .route("/api/maestro", get(public::lookup_list))
        .route("/api/maestro/:id", get(public::lookup_get))
        .route_layer(from_fn_with_state(state.clone(), optional_tenant));

    let accounts = Router::new()
        .route("/api/usuarios/register", post(public::register))
        .route("/api/usuarios/login", post(public::login))
        .route_layer(from_fn_with_state(state.clone(), require_tenant));

    // Layers run bottom-up: tenant, then token
    let api = protected::routes()
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
        .route_layer(from_fn_with_state(state.clone(), require_tenant));

    let root = elevated::routes()
        .route_layer(from_fn(require_root))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
        .route_layer(from_fn_with_state(state.clone(), require_tenant));

    let mut app = Router::new()
        .merge(open)
        .merge(catalog)
        .merge(accounts)
        .merge(api)
        .merge(root)
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        app = app.layer(cors_layer(&config));
    }
    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app.with_state(state)
}
