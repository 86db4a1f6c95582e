use super::cipher::DesCipher;
use super::http_client::HttpClient;
use super::{ResolveMode, UpstreamAnswer, UpstreamResolver};
use crate::error::UpstreamError;
use crate::metrics::METRICS;
use crate::r#const::{upstream_defaults, upstream_error_labels, upstream_protocol};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use std::time::Instant;
use tracing::{debug, warn};

// 解析上游响应体: "ip1;ip2;...,ttl"
pub fn parse_answer(body: &str) -> Result<UpstreamAnswer, UpstreamError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(UpstreamError::EmptyBody);
    }

    let (ips, ttl) = body
        .split_once(upstream_protocol::TTL_SEPARATOR)
        .ok_or_else(|| UpstreamError::Malformed(format!("missing ttl in {:?}", body)))?;

    let ttl = ttl
        .trim()
        .parse::<u64>()
        .map_err(|_| UpstreamError::Malformed(format!("invalid ttl {:?}", ttl)))?;

    let server_ip_list: Vec<String> = ips
        .split(upstream_protocol::IP_SEPARATOR)
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(String::from)
        .collect();

    if server_ip_list.is_empty() {
        return Err(UpstreamError::Malformed(format!(
            "no server ip in {:?}",
            body
        )));
    }

    Ok(UpstreamAnswer {
        server_ip_list,
        ttl,
    })
}

// 响应体必须是合法的 UTF-8 文本
fn body_text(body: &[u8]) -> Result<&str, UpstreamError> {
    std::str::from_utf8(body)
        .map_err(|e| UpstreamError::Malformed(format!("body is not valid UTF-8: {}", e)))
}

// 错误类型标签
fn error_label(error: &UpstreamError) -> &'static str {
    match error {
        UpstreamError::Request(_) => upstream_error_labels::REQUEST,
        UpstreamError::Status(_) => upstream_error_labels::STATUS,
        UpstreamError::EmptyBody => upstream_error_labels::EMPTY_BODY,
        UpstreamError::Malformed(_) => upstream_error_labels::MALFORMED,
        UpstreamError::Cipher(_) => upstream_error_labels::CIPHER,
    }
}

// 记录上游调用指标
fn record_outcome(
    mode: ResolveMode,
    domain: &str,
    started: Instant,
    result: &Result<UpstreamAnswer, UpstreamError>,
) {
    METRICS
        .upstream_duration_seconds()
        .with_label_values(&[mode.label()])
        .observe(started.elapsed().as_secs_f64());

    match result {
        Ok(answer) => debug!(
            "Upstream answered - Domain: {}, Mode: {}, IPs: {}, TTL: {}",
            domain,
            mode.label(),
            answer.server_ip_list.len(),
            answer.ttl
        ),
        Err(e) => {
            warn!(
                "Upstream resolve failed - Domain: {}, Mode: {}, Error: {}",
                domain,
                mode.label(),
                e
            );
            METRICS
                .upstream_errors_total()
                .with_label_values(&[error_label(e), mode.label()])
                .inc();
        }
    }
}

// 明文上游解析器
pub struct PlainResolver {
    client: ClientWithMiddleware,
    endpoint: String,
}

impl PlainResolver {
    pub fn new(client: ClientWithMiddleware, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn fetch(&self, domain: &str, client_ip: &str) -> Result<UpstreamAnswer, UpstreamError> {
        let request = self.client.get(&self.endpoint).query(&[
            (upstream_protocol::PARAM_DOMAIN, domain),
            (upstream_protocol::PARAM_IP, client_ip),
            (upstream_protocol::PARAM_TTL, upstream_defaults::TTL_FLAG),
        ]);

        let body = HttpClient::send_request(request).await?;
        parse_answer(body_text(&body)?)
    }
}

#[async_trait]
impl UpstreamResolver for PlainResolver {
    async fn resolve(&self, domain: &str, client_ip: &str) -> Result<UpstreamAnswer, UpstreamError> {
        METRICS
            .upstream_requests_total()
            .with_label_values(&[ResolveMode::Plain.label()])
            .inc();

        let started = Instant::now();
        let result = self.fetch(domain, client_ip).await;
        record_outcome(ResolveMode::Plain, domain, started, &result);
        result
    }

    fn mode(&self) -> ResolveMode {
        ResolveMode::Plain
    }
}

// 企业版上游解析器：域名加密后发送，响应体解密后解析
pub struct EnterpriseResolver {
    client: ClientWithMiddleware,
    endpoint: String,
    id: String,
    cipher: DesCipher,
}

impl EnterpriseResolver {
    pub fn new(
        client: ClientWithMiddleware,
        endpoint: impl Into<String>,
        id: impl Into<String>,
        secret: &str,
    ) -> Result<Self, UpstreamError> {
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            id: id.into(),
            cipher: DesCipher::new(secret)?,
        })
    }

    async fn fetch(&self, domain: &str, client_ip: &str) -> Result<UpstreamAnswer, UpstreamError> {
        let encrypted_domain = self.cipher.encrypt_hex(domain)?;
        let request = self.client.get(&self.endpoint).query(&[
            (upstream_protocol::PARAM_DOMAIN, encrypted_domain.as_str()),
            (upstream_protocol::PARAM_IP, client_ip),
            (upstream_protocol::PARAM_TTL, upstream_defaults::TTL_FLAG),
            (upstream_protocol::PARAM_ID, self.id.as_str()),
        ]);

        let body = HttpClient::send_request(request).await?;
        let plain = self.cipher.decrypt_hex(body_text(&body)?)?;
        parse_answer(&plain)
    }
}

#[async_trait]
impl UpstreamResolver for EnterpriseResolver {
    async fn resolve(&self, domain: &str, client_ip: &str) -> Result<UpstreamAnswer, UpstreamError> {
        METRICS
            .upstream_requests_total()
            .with_label_values(&[ResolveMode::Enterprise.label()])
            .inc();

        let started = Instant::now();
        let result = self.fetch(domain, client_ip).await;
        record_outcome(ResolveMode::Enterprise, domain, started, &result);
        result
    }

    fn mode(&self) -> ResolveMode {
        ResolveMode::Enterprise
    }
}
