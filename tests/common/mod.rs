// Shared across suites; not every binary touches every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};
use chrono::Utc;
use nutriline_api::{
    api_v1_routes, auth,
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{category, product, product_variant, user, User, UserRole},
    events::{self, EventSender},
    handlers::{self, AppServices},
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Harness for spinning up services backed by a fresh in-memory SQLite
/// database with the real migrations applied.
pub struct TestApp {
    pub db: Arc<db::DbPool>,
    pub config: Arc<AppConfig>,
    pub event_sender: Arc<EventSender>,
    pub services: AppServices,
    pub auth_service: Arc<AuthService>,
    #[allow(dead_code)]
    event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_config(Self::test_config()).await
    }

    /// Same, but with a caller-tuned configuration (e.g. a pinned mock
    /// gateway success rate).
    pub async fn with_config(cfg: AppConfig) -> Self {
        let pool = db::establish_connection_with_config(&db::DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(1024);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let config = Arc::new(cfg);
        let services = AppServices::new(db.clone(), event_sender.clone(), config.clone());

        let auth_cfg = AuthConfig {
            jwt_secret: config.jwt_secret.clone(),
            jwt_issuer: config.auth_issuer.clone(),
            jwt_audience: config.auth_audience.clone(),
            access_token_expiration: Duration::from_secs(config.jwt_expiration as u64),
        };
        let auth_service = Arc::new(AuthService::new(auth_cfg, db.clone()));

        Self {
            db,
            config,
            event_sender,
            services,
            auth_service,
            event_task,
        }
    }

    /// Assemble the same router `main` serves, minus the outer tower
    /// layers that do not affect routing semantics.
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            db: self.db.clone(),
            config: (*self.config).clone(),
            event_sender: (*self.event_sender).clone(),
            services: self.services.clone(),
        });

        Router::new()
            .merge(handlers::health::health_routes())
            .nest("/api/v1", api_v1_routes())
            .with_state(state)
            .nest(
                "/auth",
                auth::auth_routes().with_state(self.auth_service.clone()),
            )
            .layer(middleware::from_fn_with_state(
                self.auth_service.clone(),
                inject_auth_service,
            ))
    }

    /// Bearer token for a seeded user.
    pub async fn token_for(&self, user_id: Uuid) -> String {
        let user = User::find_by_id(user_id)
            .one(&*self.db)
            .await
            .expect("query user")
            .expect("user exists");
        self.auth_service
            .generate_token(&user)
            .expect("token issuance")
    }

    /// Minimal configuration suitable for tests. The mock gateway latency
    /// is dialed down so suites stay fast.
    pub fn test_config() -> AppConfig {
        let mut cfg = AppConfig::new(
            "sqlite::memory:",
            "test_secret_key_for_testing_purposes_only_32chars",
            3600,
            "127.0.0.1",
            18_080,
            "test",
        );
        cfg.payment_min_delay_ms = 1;
        cfg.payment_max_delay_ms = 2;
        cfg
    }

    /// Insert an account directly; registration flow is exercised in the
    /// auth unit tests.
    pub async fn seed_user(&self, role: UserRole) -> Uuid {
        let user_id = Uuid::new_v4();
        let row = user::ActiveModel {
            id: Set(user_id),
            email: Set(format!("user-{}@example.com", user_id)),
            password_hash: Set(auth::hash_password("test-password").expect("hash")),
            full_name: Set("Test User".to_string()),
            role: Set(role),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        row.insert(&*self.db).await.expect("failed to seed user");
        user_id
    }

    pub async fn seed_category(&self) -> Uuid {
        let category_id = Uuid::new_v4();
        let row = category::ActiveModel {
            id: Set(category_id),
            name: Set("Protein".to_string()),
            slug: Set(format!("protein-{}", category_id)),
            description: Set(None),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        row.insert(&*self.db)
            .await
            .expect("failed to seed category");
        category_id
    }

    pub async fn seed_product(&self, category_id: Option<Uuid>, is_active: bool) -> Uuid {
        let product_id = Uuid::new_v4();
        let row = product::ActiveModel {
            id: Set(product_id),
            category_id: Set(category_id),
            name: Set("Whey Protein".to_string()),
            slug: Set(format!("whey-protein-{}", product_id)),
            description: Set("24 g protein per serving".to_string()),
            brand: Set(Some("Nutriline".to_string())),
            is_active: Set(is_active),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        row.insert(&*self.db).await.expect("failed to seed product");
        product_id
    }

    pub async fn seed_variant(&self, spec: VariantSpec) -> Uuid {
        let product_id = match spec.product_id {
            Some(id) => id,
            None => self.seed_product(None, true).await,
        };

        let variant_id = Uuid::new_v4();
        let row = product_variant::ActiveModel {
            id: Set(variant_id),
            product_id: Set(product_id),
            sku: Set(format!("SKU-{}", variant_id)),
            name: Set("Chocolate / 1 kg".to_string()),
            aroma: Set(Some("Chocolate".to_string())),
            size: Set(Some("1 kg".to_string())),
            price: Set(spec.price),
            discount_percent: Set(spec.discount_percent),
            stock_count: Set(spec.stock_count),
            is_active: Set(spec.is_active),
            position: Set(0),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        row.insert(&*self.db).await.expect("failed to seed variant");
        variant_id
    }
}

async fn inject_auth_service(
    State(auth): State<Arc<AuthService>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    req.extensions_mut().insert(auth);
    next.run(req).await
}

/// Seed parameters for a product variant.
pub struct VariantSpec {
    pub product_id: Option<Uuid>,
    pub price: Decimal,
    pub discount_percent: Option<Decimal>,
    pub stock_count: i32,
    pub is_active: bool,
}

impl Default for VariantSpec {
    fn default() -> Self {
        Self {
            product_id: None,
            price: Decimal::new(2999, 2), // 29.99
            discount_percent: None,
            stock_count: 10,
            is_active: true,
        }
    }
}
