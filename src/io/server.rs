//! HTTP interface
//!
//! Hand-routed hyper http1 server exposing the route CRUD endpoints, the
//! database utilities, and the batch upload endpoint. The upload response
//! is a JSON-lines stream: each pipeline event is forwarded to the client
//! as soon as it is produced, never buffered as a whole.

use crate::domain::{ProgressEvent, RecordId, RouteRecord, RouteStats};
use crate::infra::Config;
use crate::io::geocoder::{Geocode, OpenCageGeocoder};
use crate::io::multipart;
use crate::io::router::{GraphHopperRouter, PlanRoute};
use crate::io::store::{RouteStore, StoreRoutes, TempFileGuard};
use crate::services::batch::BatchRun;
use crate::services::routes::resolve_route;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Frame;
use hyper::header::{HeaderMap, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Shared handler state
pub struct App<G, R> {
    store: Arc<RouteStore>,
    geocoder: Arc<G>,
    router: Arc<R>,
    backup_dir: String,
}

impl App<OpenCageGeocoder, GraphHopperRouter> {
    pub fn from_config(config: &Config, store: Arc<RouteStore>) -> Self {
        Self {
            store,
            geocoder: Arc::new(OpenCageGeocoder::new(config)),
            router: Arc::new(GraphHopperRouter::new(config)),
            backup_dir: config.backup_dir().to_string(),
        }
    }
}

impl<G, R> App<G, R> {
    pub fn new(store: Arc<RouteStore>, geocoder: Arc<G>, router: Arc<R>, backup_dir: &str) -> Self {
        Self { store, geocoder, router, backup_dir: backup_dir.to_string() }
    }
}

/// Streaming body fed by the batch pipeline, one frame per event line
struct JsonLinesBody {
    rx: mpsc::Receiver<Bytes>,
}

impl hyper::body::Body for JsonLinesBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => Poll::Ready(Some(Ok(Frame::data(chunk)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RouteRequest {
    start_address: String,
    end_address: String,
    #[serde(default)]
    notes: String,
}

/// Route listing entry, field names kept stable for the frontend
#[derive(Debug, Serialize)]
struct RouteSummary {
    id: i64,
    start: String,
    end: String,
    distance: f64,
    date: String,
    notes: String,
}

impl From<RouteRecord> for RouteSummary {
    fn from(record: RouteRecord) -> Self {
        Self {
            id: record.id.map(|id| id.0).unwrap_or(0),
            start: record.start_address,
            end: record.end_address,
            distance: record.distance_km,
            date: record.date,
            notes: record.notes,
        }
    }
}

fn full(body: impl Into<Bytes>) -> BoxBody<Bytes, Infallible> {
    Full::new(body.into()).boxed()
}

fn json_response(status: StatusCode, body: String) -> Response<BoxBody<Bytes, Infallible>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(full(body))
        .expect("static response should not fail")
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "success": false, "error": message }).to_string()
}

/// Parse the record id out of paths like /delete_route/42
fn parse_record_id(path: &str, prefix: &str) -> Option<RecordId> {
    path.strip_prefix(prefix)?.parse::<i64>().ok().map(RecordId)
}

/// Handle HTTP requests
async fn handle_request<G, R>(
    req: Request<hyper::body::Incoming>,
    app: Arc<App<G, R>>,
) -> Result<Response<BoxBody<Bytes, Infallible>>, Infallible>
where
    G: Geocode + 'static,
    R: PlanRoute + 'static,
{
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(error = %e, "request_body_read_failed");
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                error_json("failed to read request body"),
            ));
        }
    };

    let response = match (&parts.method, parts.uri.path()) {
        (&Method::POST, "/upload_addresses") => handle_upload(&parts.headers, body, app),
        (&Method::POST, "/add_route") => handle_add_route(body, app).await,
        (&Method::GET, "/get_routes") => handle_get_routes(app),
        (&Method::GET, "/get_statistics") => handle_statistics(app),
        (&Method::GET, "/export_csv") => handle_export_csv(app),
        (&Method::POST, "/backup_database") => handle_backup(app),
        (&Method::POST, "/restore_database") => handle_restore(&parts.headers, body, app),
        (&Method::POST, "/clear_database") => handle_clear(app),
        (&Method::GET, "/health") => Response::builder()
            .status(StatusCode::OK)
            .body(full("ok"))
            .expect("static response should not fail"),
        (&Method::PUT, path) if path.starts_with("/update_route/") => {
            match parse_record_id(path, "/update_route/") {
                Some(id) => handle_update_route(id, body, app).await,
                None => json_response(StatusCode::BAD_REQUEST, error_json("invalid route id")),
            }
        }
        (&Method::DELETE, path) if path.starts_with("/delete_route/") => {
            match parse_record_id(path, "/delete_route/") {
                Some(id) => handle_delete_route(id, app),
                None => json_response(StatusCode::BAD_REQUEST, error_json("invalid route id")),
            }
        }
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(full("Not Found"))
            .expect("static response should not fail"),
    };

    Ok(response)
}

/// POST /upload_addresses - multipart form with `file` and `startAddress`.
///
/// Form-level problems are reported as a single error object; once the form
/// parses, the batch pipeline drives a JSON-lines stream. The pipeline task
/// outlives a disconnecting client by design - there is no cancellation.
fn handle_upload<G, R>(
    headers: &HeaderMap,
    body: Bytes,
    app: Arc<App<G, R>>,
) -> Response<BoxBody<Bytes, Infallible>>
where
    G: Geocode + 'static,
    R: PlanRoute + 'static,
{
    let boundary = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(multipart::boundary_from_content_type);

    let Some(boundary) = boundary else {
        return upload_error("expected multipart/form-data");
    };

    let form = multipart::parse(&body, &boundary);

    let file = multipart::field(&form, "file")
        .filter(|p| p.filename.as_deref().is_some_and(|f| !f.is_empty()));
    let Some(file) = file else {
        return upload_error("no file uploaded");
    };

    let start_address = multipart::field(&form, "startAddress")
        .map(|p| String::from_utf8_lossy(&p.data).trim().to_string())
        .unwrap_or_default();
    if start_address.is_empty() {
        return upload_error("start address is required");
    }

    let addresses = BatchRun::<G, R, RouteStore>::parse_addresses(&String::from_utf8_lossy(
        &file.data,
    ));
    info!(
        start_address = %start_address,
        total = %addresses.len(),
        "upload_batch_accepted"
    );

    let mut run = BatchRun::new(
        app.geocoder.clone(),
        app.router.clone(),
        app.store.clone(),
        start_address,
        addresses,
    );

    let (tx, rx) = mpsc::channel::<Bytes>(16);
    tokio::spawn(async move {
        while let Some(event) = run.next_event().await {
            if tx.send(Bytes::from(event.to_line())).await.is_err() {
                // Client went away; the run finishes regardless
                debug!("upload_stream_client_disconnected");
            }
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/x-json-stream")
        .body(BoxBody::new(JsonLinesBody { rx }))
        .expect("static response should not fail")
}

/// Pre-stream failures use the same tagged shape as the stream itself
fn upload_error(message: &str) -> Response<BoxBody<Bytes, Infallible>> {
    json_response(StatusCode::OK, ProgressEvent::aborted(message.to_string()).to_line())
}

/// POST /add_route - one-shot geocode + route + insert
async fn handle_add_route<G: Geocode, R: PlanRoute>(
    body: Bytes,
    app: Arc<App<G, R>>,
) -> Response<BoxBody<Bytes, Infallible>> {
    let request: RouteRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(_) => return json_response(StatusCode::BAD_REQUEST, error_json("invalid request body")),
    };

    let route = resolve_route(
        app.geocoder.as_ref(),
        app.router.as_ref(),
        &request.start_address,
        &request.end_address,
    )
    .await;

    let Some(route) = route else {
        return json_response(StatusCode::OK, error_json("could not calculate route"));
    };

    let record = RouteRecord::from_route(
        &request.start_address,
        &request.end_address,
        route,
        &request.notes,
    );

    match app.store.insert_route(&record) {
        Ok(id) => {
            info!(record_id = %id, distance_km = %record.distance_km, "route_added");
            json_response(
                StatusCode::OK,
                serde_json::json!({ "success": true, "distance": record.distance_km })
                    .to_string(),
            )
        }
        Err(e) => {
            error!(error = %e, "route_insert_failed");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, error_json(&e.to_string()))
        }
    }
}

/// PUT /update_route/{id} - re-resolve and overwrite one record
async fn handle_update_route<G: Geocode, R: PlanRoute>(
    id: RecordId,
    body: Bytes,
    app: Arc<App<G, R>>,
) -> Response<BoxBody<Bytes, Infallible>> {
    let request: RouteRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(_) => return json_response(StatusCode::BAD_REQUEST, error_json("invalid request body")),
    };

    let route = resolve_route(
        app.geocoder.as_ref(),
        app.router.as_ref(),
        &request.start_address,
        &request.end_address,
    )
    .await;

    let Some(route) = route else {
        return json_response(StatusCode::OK, error_json("could not calculate new route"));
    };

    let record = RouteRecord::from_route(
        &request.start_address,
        &request.end_address,
        route,
        &request.notes,
    );

    match app.store.update(id, &record) {
        Ok(true) => {
            info!(record_id = %id, "route_updated");
            json_response(StatusCode::OK, serde_json::json!({ "success": true }).to_string())
        }
        Ok(false) => json_response(StatusCode::NOT_FOUND, error_json("route not found")),
        Err(e) => {
            error!(record_id = %id, error = %e, "route_update_failed");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, error_json(&e.to_string()))
        }
    }
}

/// DELETE /delete_route/{id}
fn handle_delete_route<G, R>(
    id: RecordId,
    app: Arc<App<G, R>>,
) -> Response<BoxBody<Bytes, Infallible>> {
    match app.store.delete(id) {
        Ok(found) => {
            info!(record_id = %id, found = %found, "route_deleted");
            json_response(
                StatusCode::OK,
                serde_json::json!({ "success": found, "route_id": id.0 }).to_string(),
            )
        }
        Err(e) => {
            error!(record_id = %id, error = %e, "route_delete_failed");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, error_json(&e.to_string()))
        }
    }
}

/// GET /get_routes
fn handle_get_routes<G, R>(app: Arc<App<G, R>>) -> Response<BoxBody<Bytes, Infallible>> {
    match app.store.list() {
        Ok(records) => {
            let summaries: Vec<RouteSummary> =
                records.into_iter().map(RouteSummary::from).collect();
            let body = serde_json::to_string(&summaries)
                .expect("route summary serialization should not fail");
            json_response(StatusCode::OK, body)
        }
        Err(e) => {
            error!(error = %e, "route_list_failed");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, error_json(&e.to_string()))
        }
    }
}

/// GET /get_statistics
fn handle_statistics<G, R>(app: Arc<App<G, R>>) -> Response<BoxBody<Bytes, Infallible>> {
    match app.store.statistics() {
        Ok(stats) => {
            let body = stats_json(&stats);
            json_response(StatusCode::OK, body)
        }
        Err(e) => {
            error!(error = %e, "statistics_failed");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, error_json(&e.to_string()))
        }
    }
}

fn stats_json(stats: &RouteStats) -> String {
    serde_json::to_string(stats).expect("statistics serialization should not fail")
}

/// GET /export_csv - CSV attachment, route_points excluded
fn handle_export_csv<G, R>(app: Arc<App<G, R>>) -> Response<BoxBody<Bytes, Infallible>> {
    match app.store.export_csv() {
        Ok(csv) => {
            let filename =
                format!("routes_export_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"));
            Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", "text/csv; charset=utf-8")
                .header(
                    "Content-Disposition",
                    format!("attachment; filename=\"{}\"", filename),
                )
                .body(full(csv))
                .expect("static response should not fail")
        }
        Err(e) => {
            error!(error = %e, "csv_export_failed");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, error_json("failed to export CSV"))
        }
    }
}

/// POST /backup_database
fn handle_backup<G, R>(app: Arc<App<G, R>>) -> Response<BoxBody<Bytes, Infallible>> {
    match app.store.backup(&app.backup_dir) {
        Ok(path) => json_response(
            StatusCode::OK,
            serde_json::json!({ "success": true, "backup_path": path.display().to_string() })
                .to_string(),
        ),
        Err(e) => {
            error!(error = %e, "backup_failed");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, error_json(&e.to_string()))
        }
    }
}

/// POST /restore_database - multipart `backup_file`; the uploaded copy is
/// removed once the response path is decided, success or not
fn handle_restore<G, R>(
    headers: &HeaderMap,
    body: Bytes,
    app: Arc<App<G, R>>,
) -> Response<BoxBody<Bytes, Infallible>> {
    let boundary = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(multipart::boundary_from_content_type);

    let Some(boundary) = boundary else {
        return json_response(StatusCode::BAD_REQUEST, error_json("expected multipart/form-data"));
    };

    let form = multipart::parse(&body, &boundary);
    let Some(file) = multipart::field(&form, "backup_file") else {
        return json_response(StatusCode::BAD_REQUEST, error_json("no file provided"));
    };
    if file.filename.as_deref().unwrap_or("").is_empty() {
        return json_response(StatusCode::BAD_REQUEST, error_json("no file selected"));
    }

    let temp_path = std::env::temp_dir()
        .join(format!("routetrack_restore_{}.db", Utc::now().format("%Y%m%d_%H%M%S%f")));
    if let Err(e) = std::fs::write(&temp_path, &file.data) {
        error!(error = %e, "restore_upload_write_failed");
        return json_response(StatusCode::INTERNAL_SERVER_ERROR, error_json(&e.to_string()));
    }
    let guard = TempFileGuard::new(temp_path);

    match app.store.restore(guard.path()) {
        Ok(()) => json_response(StatusCode::OK, serde_json::json!({ "success": true }).to_string()),
        Err(e) => {
            error!(error = %e, "restore_failed");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, error_json("Restore failed"))
        }
    }
}

/// POST /clear_database - backs up first, then wipes
fn handle_clear<G, R>(app: Arc<App<G, R>>) -> Response<BoxBody<Bytes, Infallible>> {
    if let Err(e) = app.store.backup(&app.backup_dir) {
        error!(error = %e, "pre_clear_backup_failed");
        return json_response(StatusCode::INTERNAL_SERVER_ERROR, error_json(&e.to_string()));
    }

    match app.store.clear() {
        Ok(deleted) => json_response(
            StatusCode::OK,
            serde_json::json!({ "success": true, "deleted": deleted }).to_string(),
        ),
        Err(e) => {
            error!(error = %e, "clear_failed");
            json_response(StatusCode::INTERNAL_SERVER_ERROR, error_json(&e.to_string()))
        }
    }
}

/// Start the HTTP server
pub async fn start_http_server<G, R>(
    port: u16,
    app: Arc<App<G, R>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    G: Geocode + 'static,
    R: PlanRoute + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(port = %port, "http_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let app = app.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let app = app.clone();
                                async move { handle_request(req, app).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "http_connection_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "http_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("http_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinates, RouteResult};
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct StubGeocoder;

    #[async_trait]
    impl Geocode for StubGeocoder {
        async fn geocode(&self, address: &str) -> Option<Coordinates> {
            if address.starts_with("bad") {
                None
            } else {
                Some(Coordinates { lat: 64.0, lon: -21.0 })
            }
        }
    }

    struct StubRouter;

    #[async_trait]
    impl PlanRoute for StubRouter {
        async fn route(&self, from: Coordinates, to: Coordinates) -> Option<RouteResult> {
            Some(RouteResult {
                distance_km: 7.0,
                points: vec![(from.lon, from.lat), (to.lon, to.lat)],
            })
        }
    }

    fn test_app(dir: &tempfile::TempDir) -> Arc<App<StubGeocoder, StubRouter>> {
        let store = Arc::new(RouteStore::open(dir.path().join("routes.db")).unwrap());
        let backup_dir = dir.path().join("backups");
        Arc::new(App::new(
            store,
            Arc::new(StubGeocoder),
            Arc::new(StubRouter),
            backup_dir.to_str().unwrap(),
        ))
    }

    async fn body_string(response: Response<BoxBody<Bytes, Infallible>>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_parse_record_id() {
        assert_eq!(parse_record_id("/delete_route/42", "/delete_route/"), Some(RecordId(42)));
        assert_eq!(parse_record_id("/delete_route/abc", "/delete_route/"), None);
        assert_eq!(parse_record_id("/other/42", "/delete_route/"), None);
    }

    #[tokio::test]
    async fn test_add_route_persists_and_reports_distance() {
        let dir = tempdir().unwrap();
        let app = test_app(&dir);

        let body = Bytes::from(
            r#"{"start_address": "Home", "end_address": "Work", "notes": "commute"}"#,
        );
        let response = handle_add_route(body, app.clone()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let value: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["distance"], 7.0);

        let records = app.store.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].notes, "commute");
    }

    #[tokio::test]
    async fn test_add_route_unresolvable_address() {
        let dir = tempdir().unwrap();
        let app = test_app(&dir);

        let body =
            Bytes::from(r#"{"start_address": "bad place", "end_address": "Work"}"#);
        let response = handle_add_route(body, app.clone()).await;

        let value: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "could not calculate route");
        assert!(app.store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_route_missing_record() {
        let dir = tempdir().unwrap();
        let app = test_app(&dir);

        let body = Bytes::from(r#"{"start_address": "Home", "end_address": "Gym"}"#);
        let response = handle_update_route(RecordId(99), body, app).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_streams_events_in_order() {
        let dir = tempdir().unwrap();
        let app = test_app(&dir);

        let boundary = "XBOUND";
        let mut body = Vec::new();
        body.extend_from_slice(b"--XBOUND\r\n");
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\n",
        );
        body.extend_from_slice(b"Work\r\nbad address\r\nGym\r\n");
        body.extend_from_slice(b"\r\n--XBOUND\r\n");
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"startAddress\"\r\n\r\n");
        body.extend_from_slice(b"Home");
        body.extend_from_slice(b"\r\n--XBOUND--\r\n");

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary).parse().unwrap(),
        );

        let response = handle_upload(&headers, Bytes::from(body), app.clone());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/x-json-stream"
        );

        let text = body_string(response).await;
        let events: Vec<ProgressEvent> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], ProgressEvent::item_ok(1, 3, "Work"));
        assert_eq!(
            events[1],
            ProgressEvent::item_failed(2, 3, "bad address", "could not geocode address")
        );
        assert_eq!(events[2], ProgressEvent::item_ok(3, 3, "Gym"));
        assert_eq!(events[3], ProgressEvent::Complete { successful: 2, total: 3 });

        // Two successes landed in the store
        assert_eq!(app.store.list().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_missing_start_address() {
        let dir = tempdir().unwrap();
        let app = test_app(&dir);

        let body = b"--B\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\nWork\r\n\r\n--B--\r\n".to_vec();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "multipart/form-data; boundary=B".parse().unwrap());

        let response = handle_upload(&headers, Bytes::from(body), app.clone());
        let text = body_string(response).await;
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["error"], "start address is required");
        assert!(app.store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_without_multipart_content_type() {
        let dir = tempdir().unwrap();
        let app = test_app(&dir);

        let response = handle_upload(&HeaderMap::new(), Bytes::from("Work\n"), app);
        let value: serde_json::Value =
            serde_json::from_str(body_string(response).await.trim()).unwrap();
        assert_eq!(value["type"], "error");
    }

    #[tokio::test]
    async fn test_statistics_payload() {
        let dir = tempdir().unwrap();
        let app = test_app(&dir);

        let body = Bytes::from(r#"{"start_address": "Home", "end_address": "Work"}"#);
        handle_add_route(body, app.clone()).await;

        let response = handle_statistics(app);
        let value: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(value["total_routes"], 1);
        assert_eq!(value["total_distance_km"], 7.0);
        assert!(value["daily_routes"].is_object());
        assert_eq!(value["daily_routes"].as_object().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_export_csv_headers() {
        let dir = tempdir().unwrap();
        let app = test_app(&dir);

        let response = handle_export_csv(app);
        assert_eq!(response.status(), StatusCode::OK);
        let disposition =
            response.headers().get("Content-Disposition").unwrap().to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\"routes_export_"));
        let text = body_string(response).await;
        assert!(text.starts_with("ID,Start Address,End Address,Distance (km),Date,Notes"));
    }

    #[tokio::test]
    async fn test_clear_database_backs_up_first() {
        let dir = tempdir().unwrap();
        let app = test_app(&dir);

        let body = Bytes::from(r#"{"start_address": "Home", "end_address": "Work"}"#);
        handle_add_route(body, app.clone()).await;

        let response = handle_clear(app.clone());
        let value: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["deleted"], 1);

        assert!(app.store.list().unwrap().is_empty());
        // The pre-clear backup landed in the backup directory
        let backups: Vec<_> =
            std::fs::read_dir(dir.path().join("backups")).unwrap().collect();
        assert_eq!(backups.len(), 1);
    }
}
