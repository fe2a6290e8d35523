//! Path-prefix reverse proxy: `/{service}/{*path}` is forwarded to an
//! instance of `service`.

use axum::{
    body::{Body, Bytes},
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, HeaderName, Method, Response},
};
use reservation_http::AppError;

use super::client::LoadBalancedClient;
use super::discovery::DiscoveryError;

const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::TE,
    header::UPGRADE,
];

fn forwardable(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in &HOP_BY_HOP {
        forwarded.remove(name);
    }
    forwarded
}

pub async fn forward(
    State(client): State<LoadBalancedClient>,
    Path((service, path)): Path<(String, String)>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response<Body>, AppError> {
    let mut logical = format!("http://{service}/{path}");
    if let Some(query) = query {
        logical.push('?');
        logical.push_str(&query);
    }

    let request = client
        .request(method.clone(), &logical)
        .map_err(|error| match error {
            DiscoveryError::UnknownService(_) | DiscoveryError::InvalidServiceUrl(_) => {
                AppError::not_found(format!("no route for service '{service}'"))
            }
            other => AppError::bad_gateway(other.to_string()),
        })?;

    let upstream = request
        .headers(forwardable(&headers))
        .body(body)
        .send()
        .await
        .map_err(|error| {
            tracing::warn!(%service, %path, %error, "proxied call failed");
            AppError::bad_gateway(format!("service '{service}' unavailable"))
        })?;

    let status = upstream.status();
    let upstream_headers = forwardable(upstream.headers());
    let bytes = upstream.bytes().await.map_err(|error| {
        tracing::warn!(%service, %path, %error, "proxied response unreadable");
        AppError::bad_gateway(format!("service '{service}' sent an unreadable response"))
    })?;

    tracing::debug!(%method, %service, %path, status = status.as_u16(), "proxied");

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = upstream_headers;
    Ok(response)
}
