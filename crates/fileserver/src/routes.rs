#![forbid(unsafe_code)]

use crate::share::Share;
use axum::{
    Router,
    extract::{ConnectInfo, Path, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{error, info, warn};

/// Build the HTTP surface over `share`.
///
/// Every routed request first passes the access guard, which records the
/// client and rejects blocked addresses with 403.
pub fn router(share: Arc<Share>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/open/*path", get(open_file))
        .route("/download/*path", get(download_file))
        .route("/style.css", get(stylesheet))
        .layer(middleware::from_fn_with_state(share.clone(), guard))
        .with_state(share)
}

async fn guard(State(share): State<Arc<Share>>, request: Request, next: Next) -> Response {
    if let Some(ip) = client_ip(&request) {
        if share.record_visit(&ip) {
            info!(ip, "new client");
        }
        if share.is_blocked(&ip) {
            warn!(ip, "blocked access attempt");
            return StatusCode::FORBIDDEN.into_response();
        }
    }
    next.run(request).await
}

/// Peer address of the connection, with IPv4-mapped IPv6 folded back to
/// IPv4 so blocklist entries match either way.
fn client_ip(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_canonical().to_string())
}

async fn index(State(share): State<Arc<Share>>) -> Response {
    match share.render_index().await {
        Ok(page) => Html(page).into_response(),
        Err(err) => {
            error!(%err, root = %share.root().display(), "failed to render listing");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error listing files.").into_response()
        }
    }
}

async fn open_file(
    State(share): State<Arc<Share>>,
    Path(requested): Path<String>,
    request: Request,
) -> Response {
    serve(&share, &requested, request, false).await
}

async fn download_file(
    State(share): State<Arc<Share>>,
    Path(requested): Path<String>,
    request: Request,
) -> Response {
    serve(&share, &requested, request, true).await
}

async fn serve(share: &Share, requested: &str, request: Request, attachment: bool) -> Response {
    let Some(path) = share.resolve(requested).await else {
        warn!(requested, "non-existent or outside file requested");
        return StatusCode::NOT_FOUND.into_response();
    };

    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    };

    if attachment && response.status().is_success() {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let disposition = format!("attachment; filename*=UTF-8''{}", urlencoding::encode(&name));
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }
    response
}

async fn stylesheet(State(share): State<Arc<Share>>, request: Request) -> Response {
    let path = share.stylesheet();
    if !path.is_file() {
        warn!(path = %path.display(), "stylesheet not found");
        return StatusCode::NOT_FOUND.into_response();
    }
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
