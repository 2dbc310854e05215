//! # API REST
//!
//! REST API implementation for PROMs.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for wire types and `proms-core` for everything else.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    CreateFollowupActionReq, ErrorRes, FollowupActionDto, FormDataDto, HealthRes, HealthService,
    ListFollowupActionsRes, ResponseItemDto,
};
use proms_core::{
    forms::form_data_from_items, AlertService, AnswerValue, CoreConfig, EventBus, FollowupAction,
    FollowupActionRef, FollowupActionService, FollowupActionStore, FollowupStatus, FormController,
    FormData, FormSchema, PromsError, QuestionId, ResponseItem,
};

type ApiError = (StatusCode, Json<ErrorRes>);

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    store: Arc<FollowupActionStore>,
    events: EventBus,
    alerts: AlertService,
    // Followup actions with a write in flight.
    saving: Arc<Mutex<HashSet<i64>>>,
}

/// Claim on a followup action's write slot, released on drop.
struct SaveClaim {
    id: i64,
    saving: Arc<Mutex<HashSet<i64>>>,
}

impl Drop for SaveClaim {
    fn drop(&mut self) {
        self.saving
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        let store = Arc::new(FollowupActionStore::new(&cfg));
        let events = EventBus::new(cfg.event_capacity());
        let alerts = AlertService::new(cfg.event_capacity());
        Self {
            cfg,
            store,
            events,
            alerts,
            saving: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Reserves `id` for one read-modify-write cycle.
    ///
    /// Fails with `PromsError::SaveInProgress` while another request holds it.
    fn claim_save(&self, id: i64) -> Result<SaveClaim, PromsError> {
        let mut saving = self.saving.lock().unwrap_or_else(PoisonError::into_inner);
        if !saving.insert(id) {
            return Err(PromsError::SaveInProgress);
        }
        Ok(SaveClaim {
            id,
            saving: self.saving.clone(),
        })
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn alerts(&self) -> &AlertService {
        &self.alerts
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_followup_actions,
        create_followup_action,
        update_followup_action,
        get_followup_action,
        get_form_data,
        submit_form_data,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        ResponseItemDto,
        FollowupActionDto,
        ListFollowupActionsRes,
        CreateFollowupActionReq,
        FormDataDto,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/followup-actions",
            get(list_followup_actions)
                .post(create_followup_action)
                .put(update_followup_action),
        )
        .route("/api/followup-actions/:id", get(get_followup_action))
        .route(
            "/api/followup-actions/:id/form-data",
            get(get_form_data).post(submit_form_data),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Logs every event and alert published on the state's channels until they close.
pub fn spawn_bus_logger(state: &AppState) {
    let mut events = state.events.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!(
                    event = event.name(),
                    followup_action = ?event.content().id,
                    "bus event"
                ),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("event logger lagged, missed {missed} events")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut alerts = state.alerts.subscribe();
    tokio::spawn(async move {
        loop {
            match alerts.recv().await {
                Ok(alert) => tracing::warn!("alert: {}", alert.message),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("alert logger lagged, missed {missed} alerts")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Binds `addr` and serves the REST API until the server stops.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    spawn_bus_logger(&state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/api/followup-actions",
    responses(
        (status = 200, description = "All followup actions", body = ListFollowupActionsRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn list_followup_actions(
    State(state): State<AppState>,
) -> Result<Json<ListFollowupActionsRes>, ApiError> {
    let actions = state.store.list().await.map_err(|e| {
        tracing::error!("List followup actions error: {:?}", e);
        api_error(e)
    })?;

    Ok(Json(ListFollowupActionsRes {
        followup_actions: actions.into_iter().map(action_to_dto).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/followup-actions",
    request_body = CreateFollowupActionReq,
    responses(
        (status = 201, description = "Followup action created", body = FollowupActionDto),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn create_followup_action(
    State(state): State<AppState>,
    Json(req): Json<CreateFollowupActionReq>,
) -> Result<(StatusCode, Json<FollowupActionDto>), ApiError> {
    let name = proms_core::NonEmptyText::new(&req.name)
        .map_err(|e| bad_request(format!("name: {e}")))?;

    let mut action = FollowupAction::new(name.into_string());
    if let Some(status) = req.status {
        action.status = status.parse::<FollowupStatus>().map_err(api_error)?;
    }

    match state.store.create(action).await {
        Ok(created) => Ok((StatusCode::CREATED, Json(action_to_dto(created)))),
        Err(e) => {
            tracing::error!("Create followup action error: {:?}", e);
            Err(api_error(e))
        }
    }
}

#[utoipa::path(
    put,
    path = "/api/followup-actions",
    request_body = FollowupActionDto,
    responses(
        (status = 200, description = "Followup action updated", body = FollowupActionDto),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 404, description = "Followup action not found", body = ErrorRes),
        (status = 409, description = "A save is already in progress", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Replaces a followup action, including its whole response item collection.
///
/// Metadata the API does not model is kept from the stored record. Rejected with 409 while
/// another write to the same action is in flight.
#[axum::debug_handler]
async fn update_followup_action(
    State(state): State<AppState>,
    Json(dto): Json<FollowupActionDto>,
) -> Result<Json<FollowupActionDto>, ApiError> {
    let id = dto
        .id
        .ok_or_else(|| bad_request("cannot update a followup action without an id"))?;

    let _claim = state.claim_save(id).map_err(api_error)?;
    let stored = state.store.find(id).await.map_err(api_error)?;
    let action = apply_dto(stored, dto)?;

    match state.store.update(action).await {
        Ok(saved) => Ok(Json(action_to_dto(saved))),
        Err(e) => {
            tracing::error!("Update followup action error: {:?}", e);
            Err(api_error(e))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/followup-actions/{id}",
    params(("id" = i64, Path, description = "Followup action id")),
    responses(
        (status = 200, description = "Followup action", body = FollowupActionDto),
        (status = 404, description = "Followup action not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_followup_action(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<FollowupActionDto>, ApiError> {
    let action = state.store.find(id).await.map_err(api_error)?;
    Ok(Json(action_to_dto(action)))
}

#[utoipa::path(
    get,
    path = "/api/followup-actions/{id}/form-data",
    params(("id" = i64, Path, description = "Followup action id")),
    responses(
        (status = 200, description = "Saved answers keyed by question", body = FormDataDto),
        (status = 404, description = "Followup action not found", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_form_data(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<FormDataDto>, ApiError> {
    let action = state.store.find(id).await.map_err(api_error)?;
    let data = form_data_from_items(&action.response_items);
    Ok(Json(form_data_to_dto(data)))
}

#[utoipa::path(
    post,
    path = "/api/followup-actions/{id}/form-data",
    params(("id" = i64, Path, description = "Followup action id")),
    request_body = FormDataDto,
    responses(
        (status = 200, description = "Answers saved", body = FollowupActionDto),
        (status = 400, description = "Unknown question", body = ErrorRes),
        (status = 404, description = "Followup action not found", body = ErrorRes),
        (status = 409, description = "A save is already in progress", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Submits questionnaire answers for a followup action.
///
/// The `comment` field and unanswered questions are not stored. When the action's name
/// matches a built-in questionnaire, undeclared keys are rejected. Rejected with 409 while
/// another write to the same action is in flight.
#[axum::debug_handler]
async fn submit_form_data(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
    Json(req): Json<FormDataDto>,
) -> Result<Json<FollowupActionDto>, ApiError> {
    let _claim = state.claim_save(id).map_err(api_error)?;
    let action = state.store.find(id).await.map_err(api_error)?;

    let schema = match action.name.as_deref() {
        Some(name) => FormSchema::builtin(name).map_err(api_error)?,
        None => None,
    };

    let mut controller = FormController::new(
        action,
        state.store.clone(),
        state.events.clone(),
        state.alerts.clone(),
    )
    .with_policy(state.cfg.answer_policy());
    if let Some(schema) = schema {
        controller = controller.with_schema(Arc::new(schema));
    }
    controller.initialize().map_err(api_error)?;

    match controller.submit(form_data_from_dto(req)).await {
        Ok(saved) => Ok(Json(action_to_dto(saved))),
        Err(e) => {
            tracing::error!("Submit form data error: {:?}", e);
            Err(api_error(e))
        }
    }
}

fn api_error(e: PromsError) -> ApiError {
    let status = match &e {
        PromsError::InvalidInput(_) | PromsError::UnknownQuestion { .. } => {
            StatusCode::BAD_REQUEST
        }
        PromsError::NotFound(_) => StatusCode::NOT_FOUND,
        PromsError::SaveInProgress => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        "Internal error".to_string()
    } else {
        e.to_string()
    };
    (status, Json(ErrorRes { message }))
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorRes {
            message: message.into(),
        }),
    )
}

fn action_to_dto(action: FollowupAction) -> FollowupActionDto {
    FollowupActionDto {
        id: action.id,
        name: action.name,
        status: Some(action.status.as_str().to_string()),
        outcome_comment: action.outcome_comment,
        completed_date: action.completed_date.map(|d| d.to_rfc3339()),
        last_modified: action.last_modified.map(|d| d.to_rfc3339()),
        response_items: action
            .response_items
            .into_iter()
            .map(|item| ResponseItemDto {
                id: item.id,
                local_id: item.local_id.to_string(),
                value: item.value.into_json(),
                followup_action_id: item.followup_action.and_then(|owner| owner.id),
            })
            .collect(),
    }
}

fn apply_dto(mut action: FollowupAction, dto: FollowupActionDto) -> Result<FollowupAction, ApiError> {
    let owner = FollowupActionRef { id: action.id };

    action.name = dto.name;
    if let Some(status) = dto.status {
        action.status = status.parse::<FollowupStatus>().map_err(api_error)?;
    }
    action.outcome_comment = dto.outcome_comment;
    action.completed_date = dto
        .completed_date
        .as_deref()
        .map(parse_timestamp)
        .transpose()?;
    action.response_items = dto
        .response_items
        .into_iter()
        .map(|item| {
            let local_id = QuestionId::new(&item.local_id)
                .map_err(|e| bad_request(format!("localId: {e}")))?;
            Ok(ResponseItem {
                id: item.id,
                local_id,
                value: AnswerValue::new(item.value),
                followup_action: Some(owner),
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(action)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| bad_request(format!("invalid timestamp '{raw}': {e}")))
}

fn form_data_to_dto(data: FormData) -> FormDataDto {
    FormDataDto {
        form_data: data
            .into_iter()
            .map(|(key, value)| (key, value.into_json()))
            .collect(),
    }
}

fn form_data_from_dto(dto: FormDataDto) -> FormData {
    dto.form_data.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body, body::Body, http::Request};
    use proms_core::AnswerPolicy;
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_state(dir: &TempDir, policy: AnswerPolicy) -> AppState {
        let cfg = CoreConfig::new(dir.path().to_path_buf(), policy, 16)
            .expect("CoreConfig::new should succeed");
        AppState::new(Arc::new(cfg))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json")
        };
        (status, value)
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, AnswerPolicy::Truthy));

        let (status, body) = send(&app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
    }

    #[tokio::test]
    async fn create_then_fetch_followup_action() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, AnswerPolicy::Truthy));

        let (status, created) = send(
            &app,
            json_request("POST", "/api/followup-actions", json!({"name": "moxfq"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], json!(1));
        assert_eq!(created["status"], json!("PENDING"));

        let (status, fetched) = send(&app, get("/api/followup-actions/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["name"], json!("moxfq"));

        let (status, listed) = send(&app, get("/api/followup-actions")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["followupActions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, AnswerPolicy::Truthy));

        let (status, _) = send(
            &app,
            json_request("POST", "/api/followup-actions", json!({"name": "  "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn submit_form_data_saves_answered_questions_and_notifies() {
        let tmp = TempDir::new().unwrap();
        let state = test_state(&tmp, AnswerPolicy::Truthy);
        let mut events = state.events().subscribe();
        let app = router(state);

        send(
            &app,
            json_request("POST", "/api/followup-actions", json!({"name": "moxfq"})),
        )
        .await;

        let (status, saved) = send(
            &app,
            json_request(
                "POST",
                "/api/followup-actions/1/form-data",
                json!({"formData": {"q1": "", "q2": "5", "comment": "x"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let items = saved["responseItems"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["localId"], json!("q2"));
        assert_eq!(items[0]["value"], json!("5"));
        assert_eq!(items[0]["followupActionId"], json!(1));

        let event = events.recv().await.expect("event");
        assert_eq!(event.name(), "followupActionListModification");
        assert_eq!(event.content().id, Some(1));

        let (status, form) = send(&app, get("/api/followup-actions/1/form-data")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(form, json!({"formData": {"q2": "5"}}));
    }

    #[tokio::test]
    async fn present_policy_keeps_zero_scores() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, AnswerPolicy::Present));

        send(
            &app,
            json_request("POST", "/api/followup-actions", json!({"name": "moxfq"})),
        )
        .await;
        let (status, saved) = send(
            &app,
            json_request(
                "POST",
                "/api/followup-actions/1/form-data",
                json!({"formData": {"q1": 0, "q2": 4}}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["responseItems"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_question_for_builtin_form_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, AnswerPolicy::Truthy));

        send(
            &app,
            json_request("POST", "/api/followup-actions", json!({"name": "MOXFQ"})),
        )
        .await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/followup-actions/1/form-data",
                json!({"formData": {"q42": 1}}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("q42"));
    }

    #[tokio::test]
    async fn missing_followup_action_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, AnswerPolicy::Truthy));

        let (status, _) = send(&app, get("/api/followup-actions/99/form-data")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/followup-actions/99/form-data",
                json!({"formData": {"q1": "yes"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn put_replaces_items_and_keeps_unmodelled_metadata() {
        let tmp = TempDir::new().unwrap();
        let state = test_state(&tmp, AnswerPolicy::Truthy);
        let mut seeded = FollowupAction::new("oks");
        seeded
            .extra
            .insert("patient".to_string(), json!({"id": 12}));
        state.store.create(seeded).await.unwrap();
        let app = router(state.clone());

        let (status, updated) = send(
            &app,
            json_request(
                "PUT",
                "/api/followup-actions",
                json!({
                    "id": 1,
                    "name": "oks",
                    "status": "COMPLETED",
                    "completedDate": "2024-03-01T10:00:00Z",
                    "responseItems": [{"localId": "q1", "value": 3}]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], json!("COMPLETED"));
        assert_eq!(updated["responseItems"][0]["followupActionId"], json!(1));

        let stored = state.store.find(1).await.unwrap();
        assert_eq!(stored.extra.get("patient"), Some(&json!({"id": 12})));
        assert_eq!(stored.response_items.len(), 1);
    }

    #[tokio::test]
    async fn submit_while_another_save_is_in_flight_conflicts() {
        let tmp = TempDir::new().unwrap();
        let state = test_state(&tmp, AnswerPolicy::Truthy);
        state.store.create(FollowupAction::new("moxfq")).await.unwrap();
        let app = router(state.clone());

        let in_flight = state.claim_save(1).expect("first claim");

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/followup-actions/1/form-data",
                json!({"formData": {"q1": "yes"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["message"].as_str().unwrap().contains("in progress"));

        let (status, _) = send(
            &app,
            json_request(
                "PUT",
                "/api/followup-actions",
                json!({"id": 1, "name": "moxfq", "responseItems": []}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(state.store.find(1).await.unwrap().response_items.is_empty());

        drop(in_flight);
        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/followup-actions/1/form-data",
                json!({"formData": {"q1": "yes"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn save_claims_are_per_action_and_released_on_drop() {
        let tmp = TempDir::new().unwrap();
        let state = test_state(&tmp, AnswerPolicy::Truthy);

        let first = state.claim_save(1).expect("claim 1");
        assert!(matches!(state.claim_save(1), Err(PromsError::SaveInProgress)));
        let _other = state.claim_save(2).expect("claim 2");

        drop(first);
        assert!(state.claim_save(1).is_ok());
    }

    #[tokio::test]
    async fn put_without_id_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let app = router(test_state(&tmp, AnswerPolicy::Truthy));

        let (status, _) = send(
            &app,
            json_request("PUT", "/api/followup-actions", json!({"name": "oks"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
