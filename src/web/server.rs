use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use crate::cache::ResolveError;
use crate::cli::ServeArgs;
use crate::config::ResolverConfig;
use crate::core::result::MatchResult;
use crate::core::search::{LocationSearch, Search};
use crate::core::types::{Rank, SearchStyle};
use crate::service::MatchService;
use crate::utils::validation::{
    check_batch_limit, clamp_max_results, validate_identifier, validate_search, validate_text,
    ValidationError,
};

/// Security configuration constants to prevent `DoS` attacks
pub const MAX_BODY_SIZE: usize = 8 * 1024 * 1024; // 8MB
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const MAX_CONCURRENT_REQUESTS: usize = 100;

/// Default list sizes for autocomplete and common names
const DEFAULT_AUTOCOMPLETE: usize = 10;
const DEFAULT_COMMON_NAMES: usize = 10;

/// Shared application state
pub struct AppState {
    pub service: MatchService,
}

/// Error body for rejected requests
#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    pub details: Option<String>,
}

/// Create a safe error response that prevents information disclosure
/// while logging detailed errors server-side for debugging
pub fn create_safe_error_response(
    error_type: &str,
    user_message: &str,
    internal_error: Option<&str>,
) -> ErrorResponse {
    if let Some(internal_msg) = internal_error {
        tracing::error!("Internal error ({}): {}", error_type, internal_msg);
    }

    ErrorResponse {
        error: user_message.to_string(),
        error_type: error_type.to_string(),
        details: None,
    }
}

fn bad_request(error_type: &str, message: &str) -> Response {
    rejected(StatusCode::BAD_REQUEST, error_type, message)
}

/// A body the extractor refused keeps its status (e.g. 413 for oversized payloads)
fn rejected(status: StatusCode, error_type: &str, message: &str) -> Response {
    (
        status,
        Json(create_safe_error_response(error_type, message, None)),
    )
        .into_response()
}

fn invalid(error: &ValidationError) -> Response {
    bad_request("validation", &error.to_string())
}

/// A 500 whose body is still a well-formed failed result
fn internal_error(kind: &str, message: &str) -> Response {
    tracing::error!("Internal error ({kind}): {message}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(MatchResult::error(kind, message)),
    )
        .into_response()
}

/// Run a service call on the blocking pool and serialize its outcome
async fn blocking<T, F>(state: &Arc<AppState>, call: F) -> Response
where
    T: Serialize + Send + 'static,
    F: FnOnce(&MatchService) -> Result<T, ResolveError> + Send + 'static,
{
    let state = state.clone();
    match tokio::task::spawn_blocking(move || call(&state.service)).await {
        Ok(Ok(value)) => Json(value).into_response(),
        Ok(Err(e)) => internal_error(e.kind(), &e.to_string()),
        Err(e) => internal_error("TaskError", &e.to_string()),
    }
}

/// Run the web server
///
/// # Errors
///
/// Returns an error if the tokio runtime cannot be created or the server fails to start.
pub fn run(args: ServeArgs, config: &ResolverConfig) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_server(args, config).await })
}

/// Create the application router with all routes, middleware and IP rate
/// limiting configured.
///
/// # Errors
///
/// Returns an error if the taxonomy or species groups cannot be loaded.
#[allow(clippy::missing_panics_doc)] // Panics only on invalid governor config (constants are valid)
pub fn create_router(config: &ResolverConfig) -> anyhow::Result<Router> {
    let service = MatchService::from_config(config)?;
    let state = Arc::new(AppState { service });

    // Configure IP-based rate limiting
    let governor_conf = GovernorConfigBuilder::default()
        .per_second(10) // 10 requests per second per IP
        .burst_size(50) // Allow bursts of 50 requests
        .finish()
        .unwrap();

    Ok(build_router(state).layer(GovernorLayer {
        config: Arc::new(governor_conf),
    }))
}

/// Build the router over existing state, with security headers, timeout,
/// concurrency and body limits but no rate limiting
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .nest("/v2/api", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                // Security headers for browser protection
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("strict-transport-security"),
                    HeaderValue::from_static("max-age=31536000; includeSubDomains"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    HeaderName::from_static("referrer-policy"),
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                ))
                // Request timeout to prevent slow client attacks
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(REQUEST_TIMEOUT_SECS),
                ))
                // Limit concurrent requests to prevent DOS
                .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
                .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/searchByClassification",
            get(search_by_params_handler).post(search_handler),
        )
        .route("/searchAllByClassification", post(search_all_handler))
        .route("/search", get(search_name_handler))
        .route("/searchByVernacularName", get(vernacular_handler))
        .route("/getByTaxonID", get(get_by_id_handler))
        .route("/getAllByTaxonID", post(get_all_handler))
        .route("/check", get(check_handler))
        .route("/autocomplete", get(autocomplete_handler))
        .route("/searchForLsidById", get(lsid_by_id_handler))
        .route("/searchForLSID", get(lsid_by_name_handler))
        .route("/getGuidsForTaxa", post(guids_handler))
        .route("/getCommonNamesForLSID", get(common_names_handler))
        .route("/groups", get(groups_handler))
        .route("/health", get(health_handler))
}

async fn run_server(args: ServeArgs, config: &ResolverConfig) -> anyhow::Result<()> {
    let app = create_router(config)?;

    let addr = format!("{}:{}", args.address, args.port);
    println!("Starting taxon-solver server at http://{addr}");
    tracing::info!("Serving /api and /v2/api on {addr}");

    if args.open {
        let _ = open::that(format!("http://{addr}/api/health"));
    }

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Flat query parameters for a GET classification search
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchParams {
    kingdom: Option<String>,
    phylum: Option<String>,
    class: Option<String>,
    order: Option<String>,
    family: Option<String>,
    genus: Option<String>,
    specific_epithet: Option<String>,
    infraspecific_epithet: Option<String>,
    scientific_name: Option<String>,
    scientific_name_authorship: Option<String>,
    vernacular_name: Option<String>,
    rank: Option<String>,
    #[serde(rename = "taxonConceptID")]
    taxon_concept_id: Option<String>,
    #[serde(rename = "taxonID")]
    taxon_id: Option<String>,
    country: Option<String>,
    state_province: Option<String>,
    locality: Option<String>,
    style: Option<SearchStyle>,
    loose: bool,
}

impl From<SearchParams> for Search {
    fn from(p: SearchParams) -> Self {
        let location = LocationSearch {
            country: p.country,
            state_province: p.state_province,
            locality: p.locality,
        };
        Self {
            kingdom: p.kingdom,
            phylum: p.phylum,
            class: p.class,
            order: p.order,
            family: p.family,
            genus: p.genus,
            specific_epithet: p.specific_epithet,
            infraspecific_epithet: p.infraspecific_epithet,
            scientific_name: p.scientific_name,
            scientific_name_authorship: p.scientific_name_authorship,
            vernacular_name: p.vernacular_name,
            rank: p.rank,
            taxon_concept_id: p.taxon_concept_id,
            taxon_id: p.taxon_id,
            location: (!location.is_empty()).then_some(location),
            hints: std::collections::BTreeMap::new(),
            style: p.style,
            loose: p.loose,
        }
    }
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Search>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(search)) => match_one(&state, search).await,
        Err(e) => rejected(e.status(), "invalid_body", &e.body_text()),
    }
}

async fn search_by_params_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Response {
    match params {
        Ok(Query(params)) => match_one(&state, params.into()).await,
        Err(e) => bad_request("invalid_query", &e.body_text()),
    }
}

async fn match_one(state: &Arc<AppState>, search: Search) -> Response {
    if let Err(e) = validate_search(&search) {
        return invalid(&e);
    }
    blocking(state, move |service| service.match_search(&search)).await
}

async fn search_all_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<Option<Search>>>, JsonRejection>,
) -> Response {
    let searches = match payload {
        Ok(Json(searches)) => searches,
        Err(e) => return rejected(e.status(), "invalid_body", &e.body_text()),
    };
    if let Some(message) = check_batch_limit(searches.len()) {
        return bad_request("batch_too_large", &message);
    }
    if let Some(e) = searches.iter().flatten().find_map(|s| validate_search(s).err()) {
        return invalid(&e);
    }
    blocking(&state, move |service| service.match_all(&searches)).await
}

#[derive(Deserialize)]
struct NameQuery {
    q: String,
}

async fn search_name_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<NameQuery>, QueryRejection>,
) -> Response {
    let name = match required_text("q", params.map(|Query(p)| p.q)) {
        Ok(name) => name,
        Err(response) => return response,
    };
    blocking(&state, move |service| service.search_name(&name)).await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VernacularQuery {
    vernacular_name: String,
}

async fn vernacular_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<VernacularQuery>, QueryRejection>,
) -> Response {
    let name = match required_text("vernacularName", params.map(|Query(p)| p.vernacular_name)) {
        Ok(name) => name,
        Err(response) => return response,
    };
    blocking(&state, move |service| service.search_vernacular(&name)).await
}

/// Extract a non-blank, bounded text parameter
fn required_text(field: &str, value: Result<String, QueryRejection>) -> Result<String, Response> {
    let value = value.map_err(|e| bad_request("invalid_query", &e.body_text()))?;
    if value.trim().is_empty() {
        return Err(invalid(&ValidationError::EmptyQuery));
    }
    validate_text(field, &value).map_err(|e| invalid(&e))?;
    Ok(value)
}

#[derive(Deserialize)]
struct IdQuery {
    #[serde(rename = "taxonID")]
    taxon_id: String,
    #[serde(default)]
    follow: bool,
}

async fn get_by_id_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<IdQuery>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => return bad_request("invalid_query", &e.body_text()),
    };
    if let Err(e) = validate_identifier(&params.taxon_id) {
        return invalid(&e);
    }
    blocking(&state, move |service| {
        service.get_with_follow(&params.taxon_id, params.follow)
    })
    .await
}

/// Identifiers and flags of a `getAllByTaxonID` query string.
///
/// `taxonIDs` may repeat and each value may hold a comma-separated list.
#[derive(Debug, Default, PartialEq)]
struct GetAllQuery {
    taxon_ids: Option<Vec<String>>,
    follow: bool,
}

impl GetAllQuery {
    fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, String> {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "taxonIDs" => query.taxon_ids.get_or_insert_with(Vec::new).extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string),
                ),
                "follow" => {
                    query.follow = value
                        .parse()
                        .map_err(|_| format!("follow must be true or false, got '{value}'"))?;
                }
                _ => {}
            }
        }
        Ok(query)
    }
}

async fn get_all_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let query = match params
        .map_err(|e| e.body_text())
        .and_then(|Query(pairs)| GetAllQuery::from_pairs(pairs))
    {
        Ok(query) => query,
        Err(message) => return bad_request("invalid_query", &message),
    };
    let body = match body {
        Ok(body) => body,
        Err(e) => return rejected(e.status(), "invalid_body", &e.body_text()),
    };

    let ids: Vec<Option<String>> = match query.taxon_ids {
        Some(ids) => ids.into_iter().map(Some).collect(),
        None if body.is_empty() => {
            return bad_request("invalid_query", "taxonIDs or a JSON list of identifiers is required")
        }
        None => match serde_json::from_slice(&body) {
            Ok(ids) => ids,
            Err(e) => return bad_request("invalid_body", &e.to_string()),
        },
    };
    if let Some(message) = check_batch_limit(ids.len()) {
        return bad_request("batch_too_large", &message);
    }
    if let Some(e) = ids.iter().flatten().find_map(|id| validate_identifier(id).err()) {
        return invalid(&e);
    }
    let follow = query.follow;
    blocking(&state, move |service| service.get_all(&ids, follow)).await
}

#[derive(Deserialize)]
struct CheckQuery {
    name: String,
    rank: Option<String>,
}

async fn check_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<CheckQuery>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => return bad_request("invalid_query", &e.body_text()),
    };
    if let Err(e) = validate_text("name", &params.name) {
        return invalid(&e);
    }
    let rank = match params.rank.as_deref().filter(|r| !r.trim().is_empty()) {
        Some(text) => match Rank::parse(text) {
            Some(rank) => Some(rank),
            None => return bad_request("invalid_rank", &format!("Unknown rank '{text}'")),
        },
        None => None,
    };
    blocking(&state, move |service| service.check(&params.name, rank)).await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AutocompleteQuery {
    q: String,
    max: Option<usize>,
    include_synonyms: Option<bool>,
}

async fn autocomplete_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<AutocompleteQuery>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => return bad_request("invalid_query", &e.body_text()),
    };
    if params.q.trim().is_empty() {
        return invalid(&ValidationError::EmptyQuery);
    }
    if let Err(e) = validate_text("q", &params.q) {
        return invalid(&e);
    }
    let max = clamp_max_results(params.max, DEFAULT_AUTOCOMPLETE);
    let include_synonyms = params.include_synonyms.unwrap_or(true);
    blocking(&state, move |service| {
        service.autocomplete(&params.q, max, include_synonyms)
    })
    .await
}

#[derive(Deserialize)]
struct LsidByIdQuery {
    id: String,
}

async fn lsid_by_id_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<LsidByIdQuery>, QueryRejection>,
) -> Response {
    let id = match params {
        Ok(Query(params)) => params.id,
        Err(e) => return bad_request("invalid_query", &e.body_text()),
    };
    if let Err(e) = validate_identifier(&id) {
        return invalid(&e);
    }
    blocking(&state, move |service| service.lsid_for_id(&id)).await
}

#[derive(Deserialize)]
struct LsidByNameQuery {
    name: String,
}

async fn lsid_by_name_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<LsidByNameQuery>, QueryRejection>,
) -> Response {
    let name = match required_text("name", params.map(|Query(p)| p.name)) {
        Ok(name) => name,
        Err(response) => return response,
    };
    blocking(&state, move |service| service.lsid_for_name(&name)).await
}

async fn guids_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<Option<String>>>, JsonRejection>,
) -> Response {
    let names = match payload {
        Ok(Json(names)) => names,
        Err(e) => return rejected(e.status(), "invalid_body", &e.body_text()),
    };
    if let Some(message) = check_batch_limit(names.len()) {
        return bad_request("batch_too_large", &message);
    }
    if let Some(e) = names.iter().flatten().find_map(|n| validate_text("name", n).err()) {
        return invalid(&e);
    }
    blocking(&state, move |service| service.guids_for_taxa(&names)).await
}

#[derive(Deserialize)]
struct CommonNamesQuery {
    lsid: String,
    max: Option<usize>,
}

async fn common_names_handler(
    State(state): State<Arc<AppState>>,
    params: Result<Query<CommonNamesQuery>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => return bad_request("invalid_query", &e.body_text()),
    };
    if let Err(e) = validate_identifier(&params.lsid) {
        return invalid(&e);
    }
    let max = clamp_max_results(params.max, DEFAULT_COMMON_NAMES);
    blocking(&state, move |service| service.common_names(&params.lsid, max)).await
}

/// Return the species groups in evaluation order
async fn groups_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let groups: Vec<serde_json::Value> = state
        .service
        .groups()
        .iter()
        .map(|g| {
            serde_json::json!({
                "name": g.name,
                "rank": g.rank,
                "parent": g.parent,
                "intervals": g.intervals,
            })
        })
        .collect();

    Json(serde_json::json!({
        "count": groups.len(),
        "groups": groups,
    }))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "speciesGroups": state.service.groups().len(),
    }))
}
