use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::ports::{
    ApartmentRepository, BillRepository, MembershipRepository, Notifier, PaymentRepository,
    UserRepository,
};
use domain::services::{
    ApartmentService, BillService, IdempotencyGate, InvitationService, PaymentService, UserService,
};
use domain::store::{AtomicStore, InvitationStore};
use persistence::repositories::{
    PgApartmentRepository, PgBillRepository, PgMembershipRepository, PgPaymentRepository,
    PgUserRepository,
};
use shared::capability::CapabilityCodec;
use shared::jwt::JwtConfig;

use crate::config::{Config, ConfigValidationError};
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{apartments, bills, health, invitations, payments, users};

/// Repository implementations behind the domain services.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub apartments: Arc<dyn ApartmentRepository>,
    pub bills: Arc<dyn BillRepository>,
    pub payments: Arc<dyn PaymentRepository>,
}

impl Repositories {
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            memberships: Arc::new(PgMembershipRepository::new(pool.clone())),
            apartments: Arc::new(PgApartmentRepository::new(pool.clone())),
            bills: Arc::new(PgBillRepository::new(pool.clone())),
            payments: Arc::new(PgPaymentRepository::new(pool.clone())),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jwt: JwtConfig,
    pub store: Arc<dyn AtomicStore>,
    /// `None` when the repositories are not PostgreSQL-backed.
    pub pool: Option<PgPool>,
    pub users: Arc<UserService>,
    pub apartments: Arc<ApartmentService>,
    pub bills: Arc<BillService>,
    pub invitations: Arc<InvitationService>,
    pub payments: Arc<PaymentService>,
}

impl AppState {
    /// Wires the domain services from configuration and collaborators.
    pub fn new(
        config: Config,
        repos: Repositories,
        store: Arc<dyn AtomicStore>,
        notifier: Arc<dyn Notifier>,
        pool: Option<PgPool>,
    ) -> Result<Self, ConfigValidationError> {
        let jwt = JwtConfig::new(
            &config.jwt.secret,
            config.jwt.access_token_expiry_secs,
            config.jwt.leeway_secs,
        )
        .map_err(|e| ConfigValidationError::InvalidValue(format!("jwt: {e}")))?;

        let codec = CapabilityCodec::new(
            &config.invitations.salt,
            config.invitations.min_code_length,
        )
        .map_err(|e| ConfigValidationError::InvalidValue(format!("invitations: {e}")))?;

        let users = Arc::new(UserService::new(repos.users.clone(), jwt.clone()));
        let apartments = Arc::new(ApartmentService::new(
            repos.apartments.clone(),
            repos.memberships.clone(),
        ));
        let bills = Arc::new(BillService::new(
            repos.bills.clone(),
            repos.payments.clone(),
            repos.memberships.clone(),
        ));
        let invitations = Arc::new(InvitationService::new(
            codec,
            InvitationStore::new(store.clone()),
            repos.users.clone(),
            repos.memberships.clone(),
            notifier.clone(),
            config.invitations.settings(),
        ));
        let payments = Arc::new(PaymentService::new(
            IdempotencyGate::new(store.clone()),
            repos.payments,
            repos.bills,
            repos.memberships,
            notifier,
        ));

        Ok(Self {
            config: Arc::new(config),
            jwt,
            store,
            pool,
            users,
            apartments,
            bills,
            invitations,
            payments,
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Account routes (no token required)
    let user_routes = Router::new()
        .route("/api/v1/user/signup", post(users::signup))
        .route("/api/v1/user/login", post(users::login));

    // Manager routes; ManagerAuth rejects resident tokens
    let manager_routes = Router::new()
        .route(
            "/api/v1/manager/apartment",
            post(apartments::create_apartment)
                .get(apartments::get_apartment)
                .put(apartments::update_apartment)
                .delete(apartments::delete_apartment),
        )
        .route(
            "/api/v1/manager/apartments/get-all/resident/:user_id",
            get(apartments::apartments_of_user),
        )
        .route(
            "/api/v1/manager/apartment/:apartment_id/residents",
            get(apartments::residents),
        )
        .route(
            "/api/v1/manager/apartment/:apartment_id/invite/resident/:telegram_username",
            post(invitations::create_invitation),
        )
        .route(
            "/api/v1/manager/bill/:apartment_id/create",
            post(bills::create_bill),
        )
        .route(
            "/api/v1/manager/bill",
            get(bills::get_bill)
                .put(bills::update_bill)
                .delete(bills::delete_bill),
        )
        .route("/api/v1/manager/bills/get-all", get(bills::list_bills))
        .route(
            "/api/v1/manager/bills/:apartment_id/divide/:bill_type",
            post(bills::divide_by_type),
        )
        .route(
            "/api/v1/manager/bills/:apartment_id/divide-all",
            post(bills::divide_all),
        )
        .route("/api/v1/manager/user/get-all", get(users::list_users))
        .route(
            "/api/v1/manager/user/:user_id",
            get(users::get_user).delete(users::delete_user),
        );

    // Resident routes; any authenticated user
    let resident_routes = Router::new()
        .route(
            "/api/v1/resident/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route(
            "/api/v1/resident/apartment/invite/:invitation_code",
            get(invitations::consume_invitation),
        )
        .route("/api/v1/resident/apartments", get(apartments::my_apartments))
        .route(
            "/api/v1/resident/apartment/:apartment_id",
            delete(apartments::leave_apartment),
        )
        .route("/api/v1/resident/bills/unpaid", get(bills::unpaid))
        .route("/api/v1/resident/bill/:bill_id", get(bills::bill_details))
        .route(
            "/api/v1/resident/bills/payment-history",
            get(bills::payment_history),
        )
        .route("/api/v1/resident/bills/pay", post(payments::pay_bills))
        .route("/api/v1/resident/bills/pay/:payment_id", post(payments::pay_bill))
        .route("/api/v1/resident/bills/pay-batch", post(payments::pay_batch));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(manager_routes)
        .merge(resident_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
