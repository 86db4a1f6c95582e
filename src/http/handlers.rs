// src/http/handlers.rs

use crate::expr::RequestContext;
use crate::handler::{ResolveRequest, ResolveResponse};
use crate::http::state::AppState;
use crate::r#const::http_params;
use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::{debug, warn};

/// 将请求头名称转换为 CGI 形式，例如 `user-agent` -> `HTTP_USER_AGENT`
pub fn cgi_header_name(name: &str) -> String {
    format!(
        "{}{}",
        http_params::CGI_HEADER_PREFIX,
        name.to_ascii_uppercase().replace('-', "_")
    )
}

/// 构建调度条件使用的请求上下文
///
/// 先放入查询参数，再放入请求头（小写和 CGI 两种形式）与对端地址，后写入的同名字段覆盖先写入的。
pub fn build_context(
    params: &HashMap<String, String>,
    headers: &HeaderMap,
    peer: SocketAddr,
) -> RequestContext {
    let mut context: RequestContext = params.clone();

    for (name, value) in headers {
        // 非 UTF-8 的请求头值无法参与字符串比较，直接跳过
        let Ok(value) = value.to_str() else {
            continue;
        };
        context.insert(name.as_str().to_string(), value.to_string());
        context.insert(cgi_header_name(name.as_str()), value.to_string());
    }

    context.insert(http_params::REMOTE_ADDR.to_string(), peer.ip().to_string());
    context
}

/// 确定客户端IP：查询参数 > X-Forwarded-For 的第一个地址 > 对端地址
pub fn client_ip(params: &HashMap<String, String>, headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(ip) = params
        .get(http_params::CLIENT_IP)
        .map(|ip| ip.trim())
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    if let Some(ip) = headers
        .get(http_params::X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return ip.to_string();
    }

    peer.ip().to_string()
}

/// 从 HTTP 请求构建解析请求
pub fn build_resolve_request(
    params: &HashMap<String, String>,
    headers: &HeaderMap,
    peer: SocketAddr,
) -> Result<ResolveRequest, StatusCode> {
    let domain = match params
        .get(http_params::DOMAIN)
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
    {
        Some(domain) => domain.to_string(),
        None => {
            warn!("Missing 'domain' parameter in resolve request");
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let min_ttl = match params.get(http_params::TTL) {
        Some(ttl) => match ttl.trim().parse::<u64>() {
            Ok(ttl) => Some(ttl),
            Err(_) => {
                warn!("Invalid 'ttl' parameter in resolve request: {:?}", ttl);
                return Err(StatusCode::BAD_REQUEST);
            }
        },
        None => None,
    };

    Ok(ResolveRequest {
        domain,
        client_ip: client_ip(params, headers, peer),
        extra_info: build_context(params, headers, peer),
        min_ttl,
    })
}

/// 处理 GET /resolve 请求
pub async fn handle_resolve(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<ResolveResponse>, StatusCode> {
    let request = build_resolve_request(&params, &headers, peer)?;

    debug!(
        "Resolve request from {} - Domain: {}, Client: {}",
        peer, request.domain, request.client_ip
    );

    Ok(Json(state.handler.resolve(&request).await))
}
