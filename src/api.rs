//! REST API for the layout engine.
//!
//! Hosts one in-memory layout session and exposes it over HTTP.
//! Uses Axum as the web framework and supports CORS.

use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::{Mutex, mpsc, watch};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{ReceiverStream, WatchStream};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};

use plate_layout::{
    Container, InteractionController, Item, ItemId, ItemRequest, LayoutConfig, LayoutDocument,
    LayoutError, LayoutModel, LayoutSnapshot, MoveOutcome, PlacementReport, Point, Rect, Size,
    ViewportTransform, serializer,
};

use crate::env_config::{ApiConfig, SessionConfig};

/// Everything one editing session owns.
struct Session {
    model: LayoutModel,
    viewport: ViewportTransform,
    controller: InteractionController,
}

impl Session {
    fn new(model: LayoutModel, viewport: ViewportTransform) -> Self {
        let controller = InteractionController::new(model.config());
        Self {
            model,
            viewport,
            controller,
        }
    }
}

#[derive(Clone)]
struct ApiState {
    session: Arc<Mutex<Session>>,
    snapshots: Arc<watch::Sender<LayoutSnapshot>>,
    config: LayoutConfig,
}

impl ApiState {
    fn new(model: LayoutModel) -> Self {
        let config = *model.config();
        let (snapshots, _) = watch::channel(model.snapshot());
        Self {
            session: Arc::new(Mutex::new(Session::new(
                model,
                ViewportTransform::new(config.zoom_limits()),
            ))),
            snapshots: Arc::new(snapshots),
            config,
        }
    }

    /// Pushes the current model state to every stream subscriber.
    fn publish(&self, model: &LayoutModel) -> LayoutSnapshot {
        let snapshot = model.snapshot();
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>plate-layout API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Batch of item requests, placed first-fit in order.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "items": [
            { "width": 20.0, "height": 30.0, "quantity": 2 },
            { "width": 15.0, "height": 15.0 }
        ]
    })
)]
pub struct AddItemsRequest {
    pub items: Vec<ItemRequest>,
}

#[derive(Deserialize, ToSchema)]
pub struct PlaceItemRequest {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct MoveItemRequest {
    pub x: f64,
    pub y: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct MoveContainerRequest {
    pub dx: f64,
    pub dy: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct ResizeContainerRequest {
    pub width: f64,
    pub height: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct ItemIdsRequest {
    pub ids: Vec<ItemId>,
}

#[derive(Clone, Copy, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Cancel,
}

/// Pointer event in screen pixels.
#[derive(Deserialize, ToSchema)]
pub struct PointerRequest {
    pub kind: PointerKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct WheelRequest {
    pub x: f64,
    pub y: f64,
    /// Multiplier applied to the current zoom (e.g. 1.1 or 0.9).
    pub factor: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct FitRequest {
    pub screen_width: f64,
    pub screen_height: f64,
    #[serde(default)]
    pub margin: f64,
}

#[derive(Serialize, ToSchema)]
pub struct AddItemsResponse {
    pub placed: Vec<Item>,
    pub unplaced: Vec<UnplacedEntry>,
    pub is_complete: bool,
    pub snapshot: LayoutSnapshot,
}

#[derive(Serialize, ToSchema)]
pub struct UnplacedEntry {
    pub request_index: usize,
    pub width: f64,
    pub height: f64,
    pub count: u32,
    pub reason_code: String,
    pub reason: String,
}

impl AddItemsResponse {
    fn from_report(report: PlacementReport, snapshot: LayoutSnapshot) -> Self {
        let is_complete = report.is_complete();
        Self {
            placed: report.placed,
            unplaced: report
                .unplaced
                .into_iter()
                .map(|entry| UnplacedEntry {
                    request_index: entry.request_index,
                    width: entry.size.width,
                    height: entry.size.height,
                    count: entry.count,
                    reason_code: entry.error.code().to_string(),
                    reason: entry.error.to_string(),
                })
                .collect(),
            is_complete,
            snapshot,
        }
    }
}

/// Result of a move request; a rejection is not an HTTP error.
#[derive(Serialize, ToSchema)]
pub struct MoveItemResponse {
    pub accepted: bool,
    pub reason_code: Option<String>,
    pub reason: Option<String>,
    pub item: Option<Item>,
}

impl MoveItemResponse {
    fn new(id: ItemId, outcome: MoveOutcome, item: Option<Item>) -> Self {
        match outcome {
            MoveOutcome::Accepted => Self {
                accepted: true,
                reason_code: None,
                reason: None,
                item,
            },
            MoveOutcome::Rejected(reason) => Self {
                accepted: false,
                reason_code: Some(reason.code().to_string()),
                reason: Some(reason.into_error(id).to_string()),
                item,
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct MoveContainerResponse {
    pub applied: Point,
    pub snapshot: LayoutSnapshot,
}

#[derive(Serialize, ToSchema)]
pub struct CountResponse {
    pub count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct ViewportResponse {
    pub zoom: f64,
    pub pan: Point,
}

impl From<&ViewportTransform> for ViewportResponse {
    fn from(viewport: &ViewportTransform) -> Self {
        Self {
            zoom: viewport.zoom(),
            pan: viewport.pan(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PointerResponse {
    /// Interaction state after the event.
    pub state: String,
    #[schema(value_type = Object)]
    pub target: Option<serde_json::Value>,
    #[schema(value_type = Object)]
    pub frame: Option<serde_json::Value>,
    #[schema(value_type = Object)]
    pub ended: Option<serde_json::Value>,
    pub viewport: ViewportResponse,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn layout_error(err: LayoutError) -> Response {
    error_response(StatusCode::UNPROCESSABLE_ENTITY, err.code(), err.to_string())
}

fn parse_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(payload)) => Ok(payload),
        Err(err) => Err(json_deserialize_error(err)),
    }
}

fn to_value(value: &impl Serialize) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_reset,
        handle_snapshot,
        handle_add_items,
        handle_add_items_stream,
        handle_place_item,
        handle_move_item,
        handle_remove_items,
        handle_toggle_lock,
        handle_move_container,
        handle_resize_container,
        handle_pointer,
        handle_wheel,
        handle_fit,
        handle_export,
        handle_import,
        handle_stream
    ),
    components(
        schemas(
            Container,
            Item,
            ItemId,
            ItemRequest,
            LayoutSnapshot,
            LayoutDocument,
            Point,
            AddItemsRequest,
            AddItemsResponse,
            UnplacedEntry,
            PlaceItemRequest,
            MoveItemRequest,
            MoveItemResponse,
            MoveContainerRequest,
            MoveContainerResponse,
            ResizeContainerRequest,
            ItemIdsRequest,
            CountResponse,
            PointerKind,
            PointerRequest,
            PointerResponse,
            WheelRequest,
            FitRequest,
            ViewportResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "layout", description = "Container and item editing"),
        (name = "interaction", description = "Pointer-driven editing and viewport"),
        (name = "documents", description = "Export and import of layouts")
    )
)]
struct ApiDoc;

fn build_router(state: ApiState, cors_enabled: bool) -> Router {
    let router = Router::new()
        .route("/layout", get(handle_snapshot).post(handle_reset))
        .route("/layout/stream", get(handle_stream))
        .route("/layout/export", get(handle_export))
        .route("/layout/import", post(handle_import))
        .route("/items", post(handle_add_items))
        .route("/items/stream", post(handle_add_items_stream))
        .route("/items/place", post(handle_place_item))
        .route("/items/remove", post(handle_remove_items))
        .route("/items/lock", post(handle_toggle_lock))
        .route("/items/{id}/move", post(handle_move_item))
        .route("/container/move", post(handle_move_container))
        .route("/container/resize", post(handle_resize_container))
        .route("/pointer", post(handle_pointer))
        .route("/viewport/wheel", post(handle_wheel))
        .route("/viewport/fit", post(handle_fit))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .with_state(state);

    if cors_enabled {
        let cors = CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any);
        router.layer(cors)
    } else {
        router
    }
}

/// Starts the API server.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(
    config: ApiConfig,
    layout_config: LayoutConfig,
    session_config: SessionConfig,
) -> Result<(), std::io::Error> {
    let container = Container::new(Size::new(
        session_config.container_width,
        session_config.container_height,
    ))
    .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let model = LayoutModel::new(container, layout_config)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;

    let app = build_router(ApiState::new(model), config.cors_enabled());

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        info!("Local access: http://localhost:{}", config.port());
    }
    info!("Documentation: GET /docs, GET /docs/openapi.json");

    axum::serve(listener, app).await
}

/// Handler for POST /layout: discards the session and starts over.
#[utoipa::path(
    post,
    path = "/layout",
    request_body = Container,
    responses(
        (status = 200, description = "New empty layout", body = LayoutSnapshot),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid container", body = ErrorResponse)
    ),
    tag = "layout"
)]
async fn handle_reset(
    State(state): State<ApiState>,
    payload: Result<Json<Container>, JsonRejection>,
) -> Response {
    let container = match parse_payload(payload) {
        Ok(container) => container,
        Err(response) => return response,
    };
    let mut session = state.session.lock().await;
    if let Err(err) = session.model.reset(container) {
        return layout_error(err);
    }
    session.viewport = ViewportTransform::new(state.config.zoom_limits());
    session.controller = InteractionController::new(session.model.config());
    info!(
        width = session.model.container().width,
        height = session.model.container().height,
        "New layout session"
    );
    Json(state.publish(&session.model)).into_response()
}

/// Handler for GET /layout: current snapshot.
#[utoipa::path(
    get,
    path = "/layout",
    responses((status = 200, description = "Current layout", body = LayoutSnapshot)),
    tag = "layout"
)]
async fn handle_snapshot(State(state): State<ApiState>) -> Response {
    let session = state.session.lock().await;
    Json(session.model.snapshot()).into_response()
}

/// Handler for POST /items.
///
/// Places every requested copy first-fit, in request order.
///
/// # Parameters
/// * `payload` - JSON payload with item sizes and quantities
///
/// # Returns
/// Placed items, the requests that did not fit and the new snapshot
#[utoipa::path(
    post,
    path = "/items",
    request_body = AddItemsRequest,
    responses(
        (status = 200, description = "Placement finished", body = AddItemsResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "layout"
)]
async fn handle_add_items(
    State(state): State<ApiState>,
    payload: Result<Json<AddItemsRequest>, JsonRejection>,
) -> Response {
    let request = match parse_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    info!("New placement request: {} item types", request.items.len());

    let mut session = state.session.lock().await;
    let report = session.model.add_items(&request.items, |_| {});
    info!(
        "Result: {} placed, {} unplaced",
        report.placed.len(),
        report.unplaced_count()
    );
    let snapshot = state.publish(&session.model);
    Json(AddItemsResponse::from_report(report, snapshot)).into_response()
}

/// Handler for POST /items/stream (SSE).
///
/// Streams placement events in real time as Server-Sent Events.
#[utoipa::path(
    post,
    path = "/items/stream",
    request_body = AddItemsRequest,
    responses(
        (
            status = 200,
            description = "Streams placement events in real time",
            content_type = "text/event-stream",
            body = String
        ),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "layout"
)]
async fn handle_add_items_stream(
    State(state): State<ApiState>,
    payload: Result<Json<AddItemsRequest>, JsonRejection>,
) -> Response {
    let request = match parse_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let (tx, rx) = mpsc::channel::<String>(32);

    tokio::task::spawn_blocking(move || {
        let mut session = state.session.blocking_lock();
        session.model.add_items(&request.items, |evt| {
            if let Ok(json) = serde_json::to_string(evt) {
                // A closed receiver only drops the remaining events.
                let _ = tx.blocking_send(json);
            }
        });
        state.publish(&session.model);
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /items/place: manual placement at an explicit position.
#[utoipa::path(
    post,
    path = "/items/place",
    request_body = PlaceItemRequest,
    responses(
        (status = 200, description = "Item placed", body = Item),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid size, out of bounds or overlap", body = ErrorResponse)
    ),
    tag = "layout"
)]
async fn handle_place_item(
    State(state): State<ApiState>,
    payload: Result<Json<PlaceItemRequest>, JsonRejection>,
) -> Response {
    let request = match parse_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let mut session = state.session.lock().await;
    let rect = Rect::new(request.x, request.y, request.width, request.height);
    match session.model.place_item(rect) {
        Ok(item) => {
            state.publish(&session.model);
            Json(item).into_response()
        }
        Err(err) => layout_error(err),
    }
}

/// Handler for POST /items/{id}/move.
#[utoipa::path(
    post,
    path = "/items/{id}/move",
    params(("id" = u64, Path, description = "Item id")),
    request_body = MoveItemRequest,
    responses(
        (status = 200, description = "Move accepted or rejected", body = MoveItemResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "layout"
)]
async fn handle_move_item(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
    payload: Result<Json<MoveItemRequest>, JsonRejection>,
) -> Response {
    let request = match parse_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let id = ItemId(id);
    let mut session = state.session.lock().await;
    let outcome = session.model.move_item(id, request.x, request.y);
    if outcome.is_accepted() {
        state.publish(&session.model);
    }
    let item = session.model.item(id).cloned();
    Json(MoveItemResponse::new(id, outcome, item)).into_response()
}

/// Handler for POST /items/remove. Absent ids are ignored.
#[utoipa::path(
    post,
    path = "/items/remove",
    request_body = ItemIdsRequest,
    responses(
        (status = 200, description = "Number of removed items", body = CountResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "layout"
)]
async fn handle_remove_items(
    State(state): State<ApiState>,
    payload: Result<Json<ItemIdsRequest>, JsonRejection>,
) -> Response {
    let request = match parse_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let mut session = state.session.lock().await;
    let count = session.model.remove_items(request.ids);
    if count > 0 {
        state.publish(&session.model);
    }
    Json(CountResponse { count }).into_response()
}

/// Handler for POST /items/lock: flips the lock of every listed item.
#[utoipa::path(
    post,
    path = "/items/lock",
    request_body = ItemIdsRequest,
    responses(
        (status = 200, description = "Number of toggled items", body = CountResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "layout"
)]
async fn handle_toggle_lock(
    State(state): State<ApiState>,
    payload: Result<Json<ItemIdsRequest>, JsonRejection>,
) -> Response {
    let request = match parse_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let mut session = state.session.lock().await;
    let count = session.model.toggle_lock(request.ids);
    if count > 0 {
        state.publish(&session.model);
    }
    Json(CountResponse { count }).into_response()
}

/// Handler for POST /container/move: group move, clamped to the canvas.
#[utoipa::path(
    post,
    path = "/container/move",
    request_body = MoveContainerRequest,
    responses(
        (status = 200, description = "Applied delta and new layout", body = MoveContainerResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "layout"
)]
async fn handle_move_container(
    State(state): State<ApiState>,
    payload: Result<Json<MoveContainerRequest>, JsonRejection>,
) -> Response {
    let request = match parse_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let mut session = state.session.lock().await;
    let applied = session.model.move_container(request.dx, request.dy);
    let snapshot = state.publish(&session.model);
    Json(MoveContainerResponse { applied, snapshot }).into_response()
}

/// Handler for POST /container/resize.
#[utoipa::path(
    post,
    path = "/container/resize",
    request_body = ResizeContainerRequest,
    responses(
        (status = 200, description = "Resized layout", body = LayoutSnapshot),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid size or items would leave the container", body = ErrorResponse)
    ),
    tag = "layout"
)]
async fn handle_resize_container(
    State(state): State<ApiState>,
    payload: Result<Json<ResizeContainerRequest>, JsonRejection>,
) -> Response {
    let request = match parse_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let mut session = state.session.lock().await;
    match session
        .model
        .resize_container(Size::new(request.width, request.height))
    {
        Ok(()) => Json(state.publish(&session.model)).into_response(),
        Err(err) => layout_error(err),
    }
}

/// Handler for POST /pointer: feeds one pointer event into the state machine.
#[utoipa::path(
    post,
    path = "/pointer",
    request_body = PointerRequest,
    responses(
        (status = 200, description = "State after the event", body = PointerResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "interaction"
)]
async fn handle_pointer(
    State(state): State<ApiState>,
    payload: Result<Json<PointerRequest>, JsonRejection>,
) -> Response {
    let request = match parse_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let screen = Point::new(request.x, request.y);
    let mut guard = state.session.lock().await;
    let Session {
        model,
        viewport,
        controller,
    } = &mut *guard;
    let revision = model.revision();

    let mut target = None;
    let mut ended = None;
    match request.kind {
        PointerKind::Down => {
            target = controller
                .pointer_down(model, viewport, screen)
                .and_then(|hit| to_value(&hit));
        }
        PointerKind::Move => {
            controller.pointer_move(model, viewport, screen);
        }
        PointerKind::Up => ended = to_value(&controller.pointer_up(model, viewport)),
        PointerKind::Cancel => ended = to_value(&controller.cancel(model, viewport)),
    }
    let frame = controller.take_frame().and_then(|frame| to_value(&frame));

    if model.revision() != revision {
        state.publish(model);
    }
    Json(PointerResponse {
        state: format!("{:?}", controller.state()),
        target,
        frame,
        ended,
        viewport: ViewportResponse::from(&*viewport),
    })
    .into_response()
}

/// Handler for POST /viewport/wheel: zooms around the cursor.
#[utoipa::path(
    post,
    path = "/viewport/wheel",
    request_body = WheelRequest,
    responses(
        (status = 200, description = "New viewport", body = ViewportResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "interaction"
)]
async fn handle_wheel(
    State(state): State<ApiState>,
    payload: Result<Json<WheelRequest>, JsonRejection>,
) -> Response {
    let request = match parse_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let mut guard = state.session.lock().await;
    let Session {
        viewport,
        controller,
        ..
    } = &mut *guard;
    controller.wheel(viewport, Point::new(request.x, request.y), request.factor);
    Json(ViewportResponse::from(&*viewport)).into_response()
}

/// Handler for POST /viewport/fit: centres the container on a screen.
#[utoipa::path(
    post,
    path = "/viewport/fit",
    request_body = FitRequest,
    responses(
        (status = 200, description = "New viewport", body = ViewportResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid request", body = ErrorResponse)
    ),
    tag = "interaction"
)]
async fn handle_fit(
    State(state): State<ApiState>,
    payload: Result<Json<FitRequest>, JsonRejection>,
) -> Response {
    let request = match parse_payload(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let screen = Size::new(request.screen_width, request.screen_height);
    if !screen.is_valid_dimension() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid input data",
            "Screen size must be positive",
        );
    }
    let mut guard = state.session.lock().await;
    let Session {
        model, viewport, ..
    } = &mut *guard;
    viewport.fit(model.container(), screen, request.margin.max(0.0));
    Json(ViewportResponse::from(&*viewport)).into_response()
}

/// Handler for GET /layout/export.
#[utoipa::path(
    get,
    path = "/layout/export",
    responses((status = 200, description = "Layout document", body = LayoutDocument)),
    tag = "documents"
)]
async fn handle_export(State(state): State<ApiState>) -> Response {
    let session = state.session.lock().await;
    Json(serializer::export(&session.model, &session.viewport)).into_response()
}

/// Handler for POST /layout/import.
///
/// The document is validated as a whole; on failure the session is untouched.
#[utoipa::path(
    post,
    path = "/layout/import",
    request_body = LayoutDocument,
    responses(
        (status = 200, description = "Imported layout", body = LayoutSnapshot),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid document", body = ErrorResponse)
    ),
    tag = "documents"
)]
async fn handle_import(
    State(state): State<ApiState>,
    payload: Result<Json<LayoutDocument>, JsonRejection>,
) -> Response {
    let document = match parse_payload(payload) {
        Ok(document) => document,
        Err(response) => return response,
    };
    let (model, viewport) = match serializer::import(document, &state.config) {
        Ok(restored) => restored,
        Err(err) => {
            warn!("Import rejected: {}", err);
            return layout_error(err);
        }
    };
    let mut session = state.session.lock().await;
    *session = Session::new(model, viewport);
    info!("Imported layout with {} items", session.model.len());
    Json(state.publish(&session.model)).into_response()
}

/// Handler for GET /layout/stream (SSE).
///
/// Sends the current snapshot, then one per change.
#[utoipa::path(
    get,
    path = "/layout/stream",
    responses((
        status = 200,
        description = "Streams layout snapshots",
        content_type = "text/event-stream",
        body = String
    )),
    tag = "layout"
)]
async fn handle_stream(State(state): State<ApiState>) -> Response {
    let stream = WatchStream::new(state.snapshots.subscribe()).map(|snapshot| {
        Event::default()
            .event("snapshot")
            .json_data(&snapshot)
            .inspect_err(|err| error!("Could not encode snapshot: {}", err))
    });
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ApiState {
        let model = LayoutModel::new(
            Container::new(Size::new(100.0, 80.0)).unwrap(),
            LayoutConfig::default(),
        )
        .unwrap();
        ApiState::new(model)
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in [
            "/layout",
            "/items",
            "/items/stream",
            "/items/{id}/move",
            "/container/move",
            "/pointer",
            "/layout/export",
            "/layout/import",
            "/layout/stream",
        ] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        for name in ["AddItemsRequest", "LayoutSnapshot", "LayoutDocument", "ErrorResponse"] {
            assert!(
                components.schemas.contains_key(name),
                "Expected schema '{}' is missing from the OpenAPI document",
                name
            );
        }
    }

    #[test]
    fn add_items_request_defaults_quantity() {
        let json = r#"{ "items": [ { "width": 20.0, "height": 30.0 } ] }"#;
        let request: AddItemsRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert_eq!(request.items[0].quantity, 1);
    }

    #[test]
    fn pointer_request_parses_kind() {
        let json = r#"{ "kind": "cancel" }"#;
        let request: PointerRequest = serde_json::from_str(json).expect("Should parse valid JSON");
        assert!(matches!(request.kind, PointerKind::Cancel));
        assert_eq!(request.x, 0.0);
    }

    #[test]
    fn rejected_move_is_reported_in_body() {
        let response = MoveItemResponse::new(
            ItemId(7),
            MoveOutcome::Rejected(plate_layout::RejectReason::Locked),
            None,
        );
        assert!(!response.accepted);
        assert_eq!(response.reason_code.as_deref(), Some("locked"));
        assert_eq!(response.reason.as_deref(), Some("Item 7 is locked"));
    }

    #[tokio::test]
    async fn add_items_updates_session_and_stream() {
        let state = state();
        let mut rx = state.snapshots.subscribe();
        let request = AddItemsRequest {
            items: vec![ItemRequest::new(20.0, 30.0, 2)],
        };
        let response = handle_add_items(State(state.clone()), Ok(Json(request))).await;
        assert_eq!(response.status(), StatusCode::OK);

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().items.len(), 2);
        assert_eq!(state.session.lock().await.model.len(), 2);
    }

    #[tokio::test]
    async fn invalid_place_maps_to_unprocessable_entity() {
        let state = state();
        let request = PlaceItemRequest {
            x: 90.0,
            y: 0.0,
            width: 20.0,
            height: 10.0,
        };
        let response = handle_place_item(State(state.clone()), Ok(Json(request))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(state.session.lock().await.model.is_empty());
    }

    #[tokio::test]
    async fn import_rejects_overlapping_document_and_keeps_session() {
        let state = state();
        {
            let mut session = state.session.lock().await;
            session.model.add_item(Size::new(10.0, 10.0)).unwrap();
        }
        let mut document = {
            let session = state.session.lock().await;
            serializer::export(&session.model, &session.viewport)
        };
        document
            .items
            .push(Item::new(ItemId(50), Rect::new(5.0, 5.0, 10.0, 10.0)));

        let response = handle_import(State(state.clone()), Ok(Json(document))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.session.lock().await.model.len(), 1);
    }

    #[tokio::test]
    async fn oversized_grid_requests_are_rejected_without_crashing() {
        let state = state();
        {
            let mut session = state.session.lock().await;
            session.model.add_item(Size::new(10.0, 10.0)).unwrap();
        }
        let mut document = {
            let session = state.session.lock().await;
            serializer::export(&session.model, &session.viewport)
        };
        document.grid_size = 1e-9;
        let response = handle_import(State(state.clone()), Ok(Json(document))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let huge = Container::new(Size::new(1e10, 1e10)).unwrap();
        let response = handle_reset(State(state.clone()), Ok(Json(huge))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let session = state.session.lock().await;
        assert_eq!(session.model.len(), 1);
        assert_eq!(session.model.container().width, 100.0);
    }

    #[tokio::test]
    async fn pointer_drag_moves_item() {
        let state = state();
        let id = {
            let mut session = state.session.lock().await;
            session.model.add_item(Size::new(20.0, 20.0)).unwrap().id
        };
        for (kind, x, y) in [
            (PointerKind::Down, 10.0, 10.0),
            (PointerKind::Move, 40.0, 10.0),
            (PointerKind::Up, 40.0, 10.0),
        ] {
            let response =
                handle_pointer(State(state.clone()), Ok(Json(PointerRequest { kind, x, y }))).await;
            assert_eq!(response.status(), StatusCode::OK);
        }
        let session = state.session.lock().await;
        assert_eq!(session.model.item(id).unwrap().x, 30.0);
        assert!(session.controller.is_idle());
    }
}
