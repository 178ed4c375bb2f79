//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{OpenAiCompletionAdapter, SupabaseIdentityAdapter, SupabaseStoreAdapter},
    ai::{AssetService, ChatService, QuizService},
    config::Config,
    error::ApiError,
    web::{
        generate_lesson_assets_handler, lesson_chat_handler, require_auth, rest::ApiDoc,
        state::AppState, submit_quiz_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::post,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let http = reqwest::Client::builder()
        .build()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let store = Arc::new(SupabaseStoreAdapter::new(
        http.clone(),
        &config.store_url,
        config.store_service_role_key.clone(),
    ));
    let identity = Arc::new(SupabaseIdentityAdapter::new(
        http,
        &config.store_url,
        config.store_service_role_key.clone(),
    ));

    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    let asset_completions = Arc::new(OpenAiCompletionAdapter::new(
        openai_client.clone(),
        config.asset_model.clone(),
    ));
    let chat_completions = Arc::new(OpenAiCompletionAdapter::new(
        openai_client,
        config.chat_model.clone(),
    ));

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        identity,
        assets: AssetService::new(store.clone(), asset_completions),
        chat: ChatService::new(store.clone(), chat_completions),
        quiz: QuizService::new(store),
    });

    // --- 4. Build the CORS Layer From the Allow-list ---
    let origins = config
        .cors_allowed_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|_| {
                ApiError::Internal(format!("Invalid origin in CORS_ALLOWED_ORIGINS: '{origin}'"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    // --- 5. Create the Web Router ---
    // Every AI route requires a verified caller; the CORS layer sits
    // outside the auth middleware so pre-flights answer without credentials.
    let protected_routes = Router::new()
        .route(
            "/api/ai/generate-lesson-assets",
            post(generate_lesson_assets_handler),
        )
        .route("/api/ai/lesson-chat", post(lesson_chat_handler))
        .route("/api/ai/submit-quiz", post(submit_quiz_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete
    // application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
