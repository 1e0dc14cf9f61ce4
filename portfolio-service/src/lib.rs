pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    create_ip_rate_limiter, ip_rate_limit_middleware, metrics_middleware,
    request_id_middleware, security_headers_middleware, IpRateLimiter, REQUEST_ID_HEADER,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::config::{PortfolioConfig, StorageBackend, StorageConfig};
use crate::services::{
    AuthService, EmailProvider, FileService, JwtService, ProjectService, Storage, Store,
    TokenService, UploadPipeline,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::metrics::metrics,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::verify_two_factor,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::projects::list_projects,
        handlers::projects::get_project,
        handlers::projects::create_project,
        handlers::projects::update_project,
        handlers::projects::delete_project,
        handlers::files::upload_files,
        handlers::files::get_file,
        handlers::files::download_file,
        handlers::files::delete_file,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::MessageResponse,
            dtos::auth::RegisterRequest,
            dtos::auth::LoginRequest,
            dtos::auth::VerifyTwoFactorRequest,
            dtos::auth::RefreshRequest,
            dtos::auth::LogoutRequest,
            dtos::auth::AuthResponse,
            dtos::auth::PendingTwoFactorResponse,
            dtos::auth::RefreshResponse,
            dtos::projects::CreateProjectRequest,
            dtos::projects::UpdateProjectRequest,
            dtos::projects::FileSummary,
            dtos::projects::ProjectResponse,
            dtos::projects::Pagination,
            dtos::projects::ProjectListResponse,
            dtos::files::UploadedFile,
            dtos::files::UploadResponse,
            models::SanitizedUser,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Admin login, 2FA and token management"),
        (name = "Projects", description = "Portfolio projects"),
        (name = "Files", description = "Project attachments"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Headroom for multipart boundaries and the projectId field.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: PortfolioConfig,
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub auth_service: AuthService,
    pub projects: ProjectService,
    pub files: FileService,
    pub uploads: UploadPipeline,
    pub login_rate_limiter: IpRateLimiter,
}

impl AppState {
    pub async fn new(
        config: PortfolioConfig,
        store: Arc<dyn Store>,
        storage: Arc<dyn Storage>,
        email: Arc<dyn EmailProvider>,
    ) -> Result<Self, AppError> {
        let jwt = JwtService::new(&config.jwt).map_err(AppError::ConfigError)?;
        let tokens = TokenService::new(
            store.clone(),
            jwt,
            config.jwt.verification_code_expiry_minutes,
        );

        let auth_service = AuthService::new(
            store.clone(),
            tokens.clone(),
            email,
            config.two_factor.clone(),
        );
        let projects = ProjectService::new(store.clone(), storage.clone());
        let files = FileService::new(store.clone(), storage.clone());
        let uploads = UploadPipeline::new(store.clone(), storage, config.upload.clone()).await?;

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );

        Ok(Self {
            config,
            store,
            tokens,
            auth_service,
            projects,
            files,
            uploads,
            login_rate_limiter,
        })
    }
}

fn api_routes(state: &AppState) -> Router<AppState> {
    let require_auth = from_fn_with_state(state.clone(), middleware::auth_middleware);

    let upload_limit = (state.uploads.max_file_size() as usize)
        .saturating_mul(state.uploads.max_files())
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    // Login and 2FA share one per-IP budget
    let rate_limited = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/verify-2fa", post(handlers::auth::verify_two_factor))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .merge(rate_limited)
        .route(
            "/projects",
            get(handlers::projects::list_projects).merge(
                post(handlers::projects::create_project).route_layer(require_auth.clone()),
            ),
        )
        .route(
            "/projects/:id",
            get(handlers::projects::get_project).merge(
                axum::routing::put(handlers::projects::update_project)
                    .delete(handlers::projects::delete_project)
                    .route_layer(require_auth.clone()),
            ),
        )
        .route(
            "/files/upload",
            post(handlers::files::upload_files)
                .route_layer(require_auth.clone())
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/files/:id",
            get(handlers::files::get_file)
                .merge(delete(handlers::files::delete_file).route_layer(require_auth)),
        )
        .route("/files/:id/download", get(handlers::files::download_file))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Path component of the public base URL under which local objects are served.
fn local_storage_mount(storage: &StorageConfig) -> Result<String, AppError> {
    let path = match reqwest::Url::parse(&storage.public_base_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => storage.public_base_url.clone(),
    };
    let mount = path.trim_end_matches('/');
    if !mount.starts_with('/') || mount.len() < 2 {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "STORAGE_PUBLIC_BASE_URL must carry a path for local storage, got '{}'",
            storage.public_base_url
        )));
    }
    Ok(mount.to_string())
}

/// Every route is served at the root and again under `/api`.
pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let api = api_routes(&state);

    let mut app = Router::new()
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(api.clone())
        .nest("/api", api);

    let storage = &state.config.storage;
    if storage.backend == StorageBackend::Local {
        let mount = local_storage_mount(storage)?;
        tracing::info!(mount = %mount, path = %storage.local_path.display(), "Serving local objects");
        app = app.nest_service(&mount, ServeDir::new(&storage.local_path));
    }

    let app = app
        .with_state(state.clone())
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins));

    Ok(app)
}
