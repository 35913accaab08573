//! HTTP transport: every `/service/...` request is turned into a
//! [`Request`], run on the blocking pool and rendered by return format.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Form, FromRequest, Multipart, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response as HttpResponse};
use axum::routing::any;
use chem_editor::{Request, Response, ReturnFormat, Services, Upload, dispatch};
use log::{error, info};

pub async fn run(services: Arc<Services>, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(services))
        .await
        .context("Server stopped unexpectedly")
}

pub fn router(services: Arc<Services>) -> Router {
    Router::new()
        .route("/service/*operation", any(handle))
        .with_state(services)
}

async fn handle(
    State(services): State<Arc<Services>>,
    http_req: axum::extract::Request,
) -> HttpResponse {
    let req = match read_request(http_req).await {
        Ok(req) => req,
        Err(rejection) => return rejection,
    };

    let path = req.path().to_string();
    let response = run_blocking(&path, move || dispatch(&services, &req)).await;
    render(response).await
}

/// Runs a handler on the blocking pool. A handler that panics yields the
/// same `Operation failure` response as one that returns an error.
async fn run_blocking<F>(path: &str, handler: F) -> Response
where
    F: FnOnce() -> Response + Send + 'static,
{
    match tokio::task::spawn_blocking(handler).await {
        Ok(response) => response,
        Err(e) => {
            error!("Operation {} panicked: {}", path, e);
            Response::operation_failure()
        }
    }
}

/// Merges the query string with an urlencoded or multipart body.
async fn read_request(http_req: axum::extract::Request) -> Result<Request, HttpResponse> {
    let mut req = Request::new(http_req.uri().path());

    let Query(query) = Query::<Vec<(String, String)>>::try_from_uri(http_req.uri())
        .map_err(IntoResponse::into_response)?;
    for (key, value) in query {
        req.set_value(&key, value);
    }

    let content_type = http_req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(http_req, &())
            .await
            .map_err(IntoResponse::into_response)?;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(IntoResponse::into_response)?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let data = field.bytes().await.map_err(IntoResponse::into_response)?;
                    req.add_upload(
                        &name,
                        Upload {
                            file_name,
                            data: data.to_vec(),
                        },
                    );
                }
                None => {
                    let value = field.text().await.map_err(IntoResponse::into_response)?;
                    req.set_value(&name, value);
                }
            }
        }
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<Vec<(String, String)>>::from_request(http_req, &())
            .await
            .map_err(IntoResponse::into_response)?;
        for (key, value) in fields {
            req.set_value(&key, value);
        }
    }

    Ok(req)
}

async fn render(response: Response) -> HttpResponse {
    match response.format() {
        ReturnFormat::Json => (
            [(header::CONTENT_TYPE, "application/json")],
            response.json_string(),
        )
            .into_response(),
        ReturnFormat::Html => Html(response.html().to_string()).into_response(),
        ReturnFormat::Binary => {
            let Some(file) = response.binary_file() else {
                return StatusCode::NOT_FOUND.into_response();
            };
            let data = match tokio::fs::read(&file.path).await {
                Ok(data) => data,
                Err(e) => {
                    error!("Cannot read {}: {}", file.path.display(), e);
                    return StatusCode::NOT_FOUND.into_response();
                }
            };
            let name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().replace('"', ""))
                .unwrap_or_default();
            let disposition = if file.attachment {
                format!("attachment; filename=\"{name}\"")
            } else {
                format!("inline; filename=\"{name}\"")
            };
            (
                [
                    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                data,
            )
                .into_response()
        }
    }
}
