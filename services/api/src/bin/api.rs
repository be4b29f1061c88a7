//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{db::DbAdapter, storage::LocalFileStorage},
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, me_handler, register_handler},
        courses::{
            add_content_handler, add_course_handler, get_content_handler,
            get_published_course_handler, get_student_content_handler, list_contents_handler,
            list_courses_handler, list_my_courses_handler, list_published_courses_handler,
            update_content_handler, update_course_handler, upload_handler,
        },
        enrollments::{
            get_enrollment_handler, grant_free_access_handler, list_course_enrollments_handler,
            revoke_free_access_handler,
        },
        notes::{add_note_handler, get_note_handler, list_course_notes_handler, update_note_handler},
        require_auth, ApiDoc, AppState,
    },
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
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

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize File Storage ---
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let storage = Arc::new(LocalFileStorage::new(
        config.upload_dir.clone(),
        config.upload_url_prefix.clone(),
    ));
    info!("Serving uploads from {}", config.upload_dir.display());

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        storage,
        config: config.clone(),
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/api/auth/me", get(me_handler))
        // Teacher dashboard
        .route(
            "/api/teacher/courses",
            post(add_course_handler).get(list_courses_handler),
        )
        .route("/api/teacher/courses/mine", get(list_my_courses_handler))
        .route("/api/teacher/courses/{course_id}", put(update_course_handler))
        .route(
            "/api/teacher/courses/{course_id}/contents",
            get(list_contents_handler).post(add_content_handler),
        )
        .route(
            "/api/teacher/courses/{course_id}/contents/{content_id}",
            put(update_content_handler),
        )
        .route("/api/teacher/contents/{content_id}", get(get_content_handler))
        .route(
            "/api/teacher/uploads",
            post(upload_handler).layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        // Student catalog
        .route("/api/student/courses", get(list_published_courses_handler))
        .route("/api/student/courses/{course_id}", get(get_published_course_handler))
        .route("/api/student/courses/{course_id}/contents", get(list_contents_handler))
        .route(
            "/api/student/courses/{course_id}/contents/{content_id}",
            get(get_student_content_handler),
        )
        // Free enrollments
        .route("/api/enrollments/free", post(grant_free_access_handler))
        .route(
            "/api/enrollments/{enrollment_id}",
            get(get_enrollment_handler).delete(revoke_free_access_handler),
        )
        .route(
            "/api/enrollments/course/{course_id}",
            get(list_course_enrollments_handler),
        )
        // Course notes
        .route("/api/notes", post(add_note_handler))
        .route("/api/notes/course/{course_id}", get(list_course_notes_handler))
        .route(
            "/api/notes/{note_id}",
            get(get_note_handler).put(update_note_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the uploaded files and the Swagger UI router.
    let app = Router::new()
        .merge(api_router)
        .nest_service(&config.upload_url_prefix, ServeDir::new(&config.upload_dir))
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
