use std::net::SocketAddr;

use axum::Router;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod auth;
mod billing;
mod error;
mod extract;
mod facts;
mod middleware;
mod moderation;
mod routes;
mod state;
mod storage;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MasseurMatch API",
        version = "0.1.0",
        description = "Directory backend for massage therapists: onboarding, plan entitlements, content moderation, and review workflows."
    ),
    paths(
        routes::health::health_check,
        routes::auth::register,
        routes::auth::login,
        routes::auth::logout,
        routes::onboarding::onboarding_status,
        routes::onboarding::submit_for_review,
        routes::profiles::get_own_profile,
        routes::profiles::update_own_profile,
        routes::media::upload_media,
        routes::media::delete_media,
        routes::availability::toggle_available_now,
        routes::boosts::use_boost,
        routes::subscriptions::select_plan,
        routes::subscriptions::current_subscription,
        routes::webhooks::billing_webhook,
        routes::referrals::referral_summary,
        routes::guarantees::current_guarantee,
        routes::admin::review_queue,
        routes::admin::review_profile,
        routes::admin::pending_edits,
        routes::admin::resolve_pending_edit,
        routes::admin::suspend_user,
        routes::admin::reinstate_user,
    ),
    components(schemas(
        HealthResponse,
        mm_core::error::ApiError,
        mm_core::profiles::Profile,
        mm_core::profiles::OnboardingStage,
        mm_core::profiles::AdminStatus,
        mm_core::profiles::PublicationStatus,
        mm_core::profiles::ProfileCounts,
        mm_core::moderation::AutoModeration,
        mm_core::moderation::ModerationOutcome,
        mm_core::onboarding::Blocker,
        mm_core::plans::PlanTier,
        mm_core::plans::MediaKind,
        mm_core::plans::Entitlement,
        mm_core::subscriptions::Subscription,
        mm_core::subscriptions::SubscriptionStatus,
        mm_core::guarantees::GuaranteeProgress,
        routes::auth::RegisterRequest,
        routes::auth::RegisterResponse,
        routes::auth::LoginRequest,
        routes::auth::LoginResponse,
        routes::auth::LogoutResponse,
        routes::onboarding::OnboardingStatusResponse,
        routes::onboarding::SubmitResponse,
        routes::profiles::UpdateProfileRequest,
        routes::profiles::UpdateProfileResponse,
        routes::profiles::PendingField,
        routes::media::UploadMediaRequest,
        routes::media::UploadMediaResponse,
        routes::media::MediaLimits,
        routes::media::MediaDeletedResponse,
        routes::availability::AvailableNowRequest,
        routes::availability::AvailableNowResponse,
        routes::boosts::BoostResponse,
        routes::subscriptions::SelectPlanRequest,
        routes::webhooks::WebhookAck,
        routes::referrals::ReferralSummaryResponse,
        routes::referrals::TierPayload,
        routes::guarantees::GuaranteeResponse,
        routes::admin::ReviewQueueItem,
        routes::admin::ReviewQueueResponse,
        routes::admin::ReviewAction,
        routes::admin::ReviewRequest,
        routes::admin::ReviewResponse,
        routes::admin::PendingEditItem,
        routes::admin::PendingEditsResponse,
        routes::admin::EditResolution,
        routes::admin::ResolveEditRequest,
        routes::admin::ResolveEditResponse,
        routes::admin::SuspensionResponse,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mm_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Database connection
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let app_state = state::AppState {
        db: pool,
        moderation: state::ModerationConfig::from_env(),
        storage: state::StorageConfig::from_env(),
        billing: state::BillingConfig::from_env(),
    };

    // CORS
    let cors_layer = middleware::cors::build_cors_layer();

    // Router with per-endpoint rate limiting
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::auth::register_router().layer(middleware::rate_limit::register_layer()))
        .merge(routes::auth::login_router().layer(middleware::rate_limit::login_layer()))
        .merge(routes::auth::logout_router())
        .merge(routes::onboarding::status_router().layer(middleware::rate_limit::read_layer()))
        .merge(routes::onboarding::submit_router().layer(middleware::rate_limit::write_layer()))
        .merge(routes::profiles::read_router().layer(middleware::rate_limit::read_layer()))
        .merge(routes::profiles::write_router().layer(middleware::rate_limit::write_layer()))
        .merge(routes::media::router().layer(middleware::rate_limit::write_layer()))
        .merge(routes::availability::router().layer(middleware::rate_limit::write_layer()))
        .merge(routes::boosts::router().layer(middleware::rate_limit::write_layer()))
        .merge(routes::subscriptions::write_router().layer(middleware::rate_limit::write_layer()))
        .merge(routes::subscriptions::read_router().layer(middleware::rate_limit::read_layer()))
        .merge(routes::webhooks::router().layer(middleware::rate_limit::webhook_layer()))
        .merge(routes::referrals::router().layer(middleware::rate_limit::read_layer()))
        .merge(routes::guarantees::router().layer(middleware::rate_limit::read_layer()))
        .merge(routes::admin::router())
        .layer(auth::InjectAuthLayer::new(app_state.db.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("MasseurMatch API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
