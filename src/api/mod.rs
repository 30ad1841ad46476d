mod error;

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

pub use error::ApiError;

use crate::auth::{MIN_PASSWORD_LEN, TokenSigner, hash_password, is_valid_email, verify_password};
use crate::config::ServeArgs;
use crate::core::{AgeGroup, Deductions, Investments, Regime, TaxInput, compute};
use crate::store::{CalculationRecord, HISTORY_LIMIT, Store};

const AUTH_HEADER: &str = "x-auth-token";
const DEFAULT_FINANCIAL_YEAR: &str = "2023-24";

pub struct AppState {
    pub store: Store,
    pub tokens: TokenSigner,
}

impl AppState {
    pub fn new(tokens: TokenSigner) -> Self {
        Self {
            store: Store::new(),
            tokens,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RegisterPayload {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LoginPayload {
    email: Option<String>,
    password: Option<String>,
}

/// Amount fields accept numbers, numeric strings, `""` and `null`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<RawAmount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawAmount::Number(v)) => Ok(Some(v)),
        Some(RawAmount::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawAmount::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid amount {s:?}"))),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DeductionsPayload {
    #[serde(deserialize_with = "lenient_amount")]
    section80c: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    section80d: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    section80e: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    section80g: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    other_deductions: Option<f64>,
}

impl From<DeductionsPayload> for Deductions {
    fn from(value: DeductionsPayload) -> Self {
        Deductions {
            section80c: value.section80c,
            section80d: value.section80d,
            section80e: value.section80e,
            section80g: value.section80g,
            other_deductions: value.other_deductions,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InvestmentsPayload {
    #[serde(deserialize_with = "lenient_amount")]
    ppf: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    elss: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    nps: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    fd: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    home_loan: Option<f64>,
}

impl From<InvestmentsPayload> for Investments {
    fn from(value: InvestmentsPayload) -> Self {
        Investments {
            ppf: value.ppf,
            elss: value.elss,
            nps: value.nps,
            fd: value.fd,
            home_loan: value.home_loan,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CalculatePayload {
    financial_year: Option<String>,
    age_group: Option<AgeGroup>,
    regime: Option<Regime>,
    #[serde(deserialize_with = "lenient_amount")]
    income: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    hra_exempt: Option<f64>,
    deductions: Option<DeductionsPayload>,
    investments: Option<InvestmentsPayload>,
}

#[derive(Debug)]
struct CalculateRequest {
    financial_year: String,
    input: TaxInput,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    id: Uuid,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}

fn calculate_request_from_payload(payload: CalculatePayload) -> Result<CalculateRequest, ApiError> {
    let mut errors = Vec::new();
    if payload.regime.is_none() {
        errors.push("regime must be 'old' or 'new'".to_string());
    }
    if payload.income.is_none() {
        errors.push("income is required".to_string());
    }
    let (Some(regime), Some(income)) = (payload.regime, payload.income) else {
        return Err(ApiError::Validation(errors));
    };

    let financial_year = payload
        .financial_year
        .map(|fy| fy.trim().to_string())
        .filter(|fy| !fy.is_empty())
        .unwrap_or_else(|| DEFAULT_FINANCIAL_YEAR.to_string());

    let input = TaxInput {
        age_group: payload.age_group.unwrap_or_default(),
        regime,
        income,
        hra_exempt: payload.hra_exempt.unwrap_or(0.0),
        deductions: payload.deductions.unwrap_or_default().into(),
        investments: payload.investments.unwrap_or_default().into(),
    };
    input.validate().map_err(ApiError::Validation)?;

    Ok(CalculateRequest {
        financial_year,
        input,
    })
}

fn validate_registration(payload: &RegisterPayload) -> Result<(), ApiError> {
    let mut errors = Vec::new();
    if payload.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
        errors.push("name is required".to_string());
    }
    if !payload.email.as_deref().is_some_and(is_valid_email) {
        errors.push("a valid email is required".to_string());
    }
    if payload
        .password
        .as_deref()
        .is_none_or(|p| p.chars().count() < MIN_PASSWORD_LEN)
    {
        errors.push(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/user", get(current_user_handler))
        .route("/api/tax/calculate", post(calculate_handler))
        .route("/api/tax/history", get(history_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_http_server(args: &ServeArgs) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let tokens = TokenSigner::new(args.jwt_secret.as_bytes(), args.token_ttl_secs);
    let app = router(Arc::new(AppState::new(tokens)));

    let listener = TcpListener::bind(addr).await?;
    info!("tax API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn not_found_handler() -> Response {
    ApiError::NotFound.into_response()
}

async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    validate_registration(&payload)?;

    let (Some(name), Some(email), Some(password)) =
        (payload.name, payload.email, payload.password)
    else {
        return Err(ApiError::BadRequest("missing registration fields".to_string()));
    };

    if state.store.find_user_by_email(&email).is_some() {
        return Err(crate::store::StoreError::UserExists.into());
    }

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(anyhow::Error::from)?;

    let user = state.store.register(&name, &email, password_hash)?;
    info!(user_id = %user.id, "registered user");

    let token = state.tokens.issue(user.id).map_err(anyhow::Error::from)?;
    Ok(json_response(StatusCode::OK, TokenResponse { token }))
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut errors = Vec::new();
    if !payload.email.as_deref().is_some_and(is_valid_email) {
        errors.push("a valid email is required".to_string());
    }
    if payload.password.is_none() {
        errors.push("password is required".to_string());
    }
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(ApiError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user = state
        .store
        .find_user_by_email(&email)
        .ok_or(ApiError::InvalidCredentials)?;

    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(anyhow::Error::from)?;
    if !matches {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.tokens.issue(user.id).map_err(anyhow::Error::from)?;
    Ok(json_response(StatusCode::OK, TokenResponse { token }))
}

async fn current_user_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &headers)?;
    let user = state
        .store
        .find_user(user_id)
        .ok_or(ApiError::UserNotFound)?;

    Ok(json_response(
        StatusCode::OK,
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        },
    ))
}

async fn calculate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CalculatePayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &headers)?;
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = calculate_request_from_payload(payload)?;

    let input = request.input;
    let result = compute(&input);
    info!(
        user_id = %user_id,
        regime = ?input.regime,
        total_tax = result.total_tax,
        "computed tax"
    );

    state.store.save_calculation(CalculationRecord {
        id: Uuid::new_v4(),
        user_id,
        financial_year: request.financial_year,
        age_group: input.age_group,
        regime: input.regime,
        income: input.income,
        hra_exempt: input.hra_exempt,
        deductions: input.deductions,
        investments: input.investments,
        result: result.clone(),
        created_at: Utc::now(),
    });

    Ok(json_response(StatusCode::OK, result))
}

async fn history_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &headers)?;
    let records = state.store.recent_calculations(user_id, HISTORY_LIMIT);
    Ok(json_response(StatusCode::OK, records))
}

/// Resolves the caller from `x-auth-token`, falling back to a bearer token.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let token = headers
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::MissingToken)?;

    Ok(state.tokens.verify(token)?.sub)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}
