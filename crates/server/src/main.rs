// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::multiple_crate_versions)]

use axum::{
    Json, Router,
    extract::{
        Path, State as AxumState,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use clap::Parser;
use fieldbook::ResolverConfig;
use fieldbook_api::{
    ApiError, AreaCheckInputs, AvailabilityInputs, AvailabilityRequest, AvailabilityResponse,
    BookingCoordinator, BookingEventsResponse, BookingInfo, CancelBookingRequest,
    CoordinatorConfig, CreateBookingRequest, CreateBookingResponse, CsvImportResult,
    CsvRowStatus, ServiceAreaCheckRequest, ServiceAreaCheckResponse, UpdateStatusRequest,
    compute_availability_response, get_booking, get_booking_events, import_service_areas,
    load_area_check, load_availability, resolve_area_check,
};
use fieldbook_persistence::SqlitePersistence;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Fieldbook Server - HTTP server for the Fieldbook booking engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Address to bind the server to
    #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    bind: IpAddr,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Total time a booking request may wait for technician locks
    #[arg(long, default_value_t = 2000)]
    lock_timeout_ms: u64,

    /// Maximum nearby areas suggested for an uncovered postal code
    #[arg(long, default_value_t = 5)]
    max_suggestions: usize,

    /// Service-area CSV to import at startup
    #[arg(long, requires = "business_id")]
    service_areas_csv: Option<PathBuf>,

    /// Business the startup CSV import belongs to
    #[arg(long)]
    business_id: Option<i64>,
}

impl Args {
    const fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            resolver: ResolverConfig {
                max_suggestions: self.max_suggestions,
            },
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    /// The only writer of booking state; also hands out the store for reads.
    coordinator: BookingCoordinator,
    /// Source of the current instant.
    clock: fn() -> DateTime<Utc>,
}

impl AppState {
    fn new(persistence: SqlitePersistence, config: CoordinatorConfig) -> Self {
        Self {
            coordinator: BookingCoordinator::new(Arc::new(Mutex::new(persistence)), config),
            clock: Utc::now,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Error response type.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// Stable error code.
    code: String,
    /// Error message.
    message: String,
    /// Whether the same request may succeed later.
    retryable: bool,
}

/// HTTP error wrapper that implements `IntoResponse`.
#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    body: ErrorResponse,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let status: StatusCode = match err {
            ApiError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,
            ApiError::ServiceNotFound { .. } | ApiError::BookingNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ApiError::SlotNoLongerAvailable { .. } | ApiError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            ApiError::AreaNotServiced { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(code = err.code(), error = %err, "Request failed");
        }

        Self {
            status,
            body: ErrorResponse {
                error: true,
                code: err.code().to_string(),
                message: err.to_string(),
                retryable: err.retryable(),
            },
        }
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        Self::from(ApiError::InvalidFormat {
            field: String::from("body"),
            message: rejection.body_text(),
        })
    }
}

impl From<PathRejection> for HttpError {
    fn from(rejection: PathRejection) -> Self {
        Self::from(ApiError::InvalidFormat {
            field: String::from("id"),
            message: rejection.body_text(),
        })
    }
}

/// Handler for GET `/health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: String::from("ok"),
    })
}

/// Handler for POST `/api/service-area/check`.
async fn handle_check_service_area(
    AxumState(app_state): AxumState<AppState>,
    payload: Result<Json<ServiceAreaCheckRequest>, JsonRejection>,
) -> Result<Json<ServiceAreaCheckResponse>, HttpError> {
    let Json(req) = payload?;
    info!(
        business_id = req.business_id,
        postal_code = %req.postal_code,
        "Handling service area check"
    );

    let resolver: ResolverConfig = app_state.coordinator.config().resolver;
    let inputs: AreaCheckInputs = {
        let mut persistence = app_state.coordinator.persistence().lock().await;
        load_area_check(&mut persistence, &req)?
    };
    Ok(Json(resolve_area_check(&inputs, &resolver)))
}

/// Handler for POST `/api/availability`.
async fn handle_availability(
    AxumState(app_state): AxumState<AppState>,
    payload: Result<Json<AvailabilityRequest>, JsonRejection>,
) -> Result<Json<AvailabilityResponse>, HttpError> {
    let Json(req) = payload?;
    info!(
        business_id = req.business_id,
        service_id = req.service_id,
        start_date = %req.start_date,
        end_date = %req.end_date,
        "Handling availability request"
    );

    let now: DateTime<Utc> = app_state.now();
    let inputs: AvailabilityInputs = {
        let mut persistence = app_state.coordinator.persistence().lock().await;
        load_availability(&mut persistence, &req, now)?
    };
    let response: AvailabilityResponse = compute_availability_response(&inputs, &req, now)?;
    Ok(Json(response))
}

/// Handler for POST `/api/bookings`.
///
/// Answers 201 for a new booking and 200 when the idempotency key replays
/// an earlier one.
async fn handle_create_booking(
    AxumState(app_state): AxumState<AppState>,
    payload: Result<Json<CreateBookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), HttpError> {
    let Json(req) = payload?;
    info!(
        business_id = req.business_id,
        service_id = req.service_id,
        requested_at = %req.requested_at,
        "Handling create booking request"
    );

    let response: CreateBookingResponse = app_state
        .coordinator
        .create_booking(&req, app_state.now())
        .await
        .inspect_err(|e| {
            if matches!(e, ApiError::SlotNoLongerAvailable { .. }) {
                warn!(error = %e, "Booking lost its slot");
            }
        })?;

    let status: StatusCode = if response.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(response)))
}

/// Handler for GET `/api/bookings/{booking_id}`.
async fn handle_get_booking(
    AxumState(app_state): AxumState<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<BookingInfo>, HttpError> {
    let Path(booking_id) = path?;
    let mut persistence = app_state.coordinator.persistence().lock().await;
    Ok(Json(get_booking(&mut persistence, booking_id)?))
}

/// Handler for GET `/api/bookings/{booking_id}/events`.
async fn handle_get_booking_events(
    AxumState(app_state): AxumState<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<BookingEventsResponse>, HttpError> {
    let Path(booking_id) = path?;
    let mut persistence = app_state.coordinator.persistence().lock().await;
    Ok(Json(get_booking_events(&mut persistence, booking_id)?))
}

/// Handler for POST `/api/bookings/{booking_id}/cancel`.
async fn handle_cancel_booking(
    AxumState(app_state): AxumState<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CancelBookingRequest>, JsonRejection>,
) -> Result<Json<BookingInfo>, HttpError> {
    let Path(booking_id) = path?;
    let Json(req) = payload?;
    info!(booking_id, actor_id = %req.actor.id, "Handling cancel booking request");

    let booking: BookingInfo = app_state
        .coordinator
        .cancel_booking(booking_id, &req, app_state.now())
        .await?;
    Ok(Json(booking))
}

/// Handler for POST `/api/bookings/{booking_id}/status`.
async fn handle_update_status(
    AxumState(app_state): AxumState<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<BookingInfo>, HttpError> {
    let Path(booking_id) = path?;
    let Json(req) = payload?;
    info!(
        booking_id,
        status = %req.status,
        actor_id = %req.actor.id,
        "Handling booking status update"
    );

    let booking: BookingInfo = app_state
        .coordinator
        .update_status(booking_id, &req, app_state.now())
        .await?;
    Ok(Json(booking))
}

/// Builds the application router with all endpoints.
fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/service-area/check", post(handle_check_service_area))
        .route("/api/availability", post(handle_availability))
        .route("/api/bookings", post(handle_create_booking))
        .route("/api/bookings/{booking_id}", get(handle_get_booking))
        .route(
            "/api/bookings/{booking_id}/events",
            get(handle_get_booking_events),
        )
        .route(
            "/api/bookings/{booking_id}/cancel",
            post(handle_cancel_booking),
        )
        .route(
            "/api/bookings/{booking_id}/status",
            post(handle_update_status),
        )
        .with_state(app_state)
}

/// Imports service areas from a CSV file, refusing to start on bad rows.
fn import_startup_csv(
    persistence: &mut SqlitePersistence,
    path: &std::path::Path,
    business_id: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let content: String = std::fs::read_to_string(path)?;
    let result: CsvImportResult = import_service_areas(persistence, &content, business_id)?;

    for row in result
        .preview
        .rows
        .iter()
        .filter(|row| row.status == CsvRowStatus::Invalid)
    {
        warn!(
            row = row.row_number,
            postal_code = row.postal_code.as_deref().unwrap_or_default(),
            errors = %row.errors.join("; "),
            "Invalid service area row"
        );
    }
    if result.preview.invalid_count > 0 {
        return Err(format!(
            "{} of {} service area rows in {} are invalid",
            result.preview.invalid_count,
            result.preview.total_rows,
            path.display()
        )
        .into());
    }

    info!(
        imported = result.imported,
        path = %path.display(),
        "Service areas imported"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Initializing Fieldbook Server");

    let mut persistence: SqlitePersistence = if let Some(db_path) = &args.database {
        info!("Using file-based database at: {}", db_path.display());
        SqlitePersistence::new_with_file(db_path)?
    } else {
        info!("Using in-memory database");
        SqlitePersistence::new_in_memory()?
    };

    if let (Some(path), Some(business_id)) = (&args.service_areas_csv, args.business_id) {
        import_startup_csv(&mut persistence, path, business_id)?;
    }

    let config: CoordinatorConfig = args.coordinator_config();
    info!(
        lock_timeout_ms = args.lock_timeout_ms,
        max_suggestions = args.max_suggestions,
        "Booking coordinator configured"
    );
    let app: Router = build_router(AppState::new(persistence, config));

    let addr: SocketAddr = SocketAddr::new(args.bind, args.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests;
