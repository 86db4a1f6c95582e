use crate::config::{HttpClientConfig, RetryConfig, UpstreamConfig};
use crate::error::{AppError, HttpClientError, InvalidProxyConfig, UpstreamError};
use crate::r#const::{retry_limits, upstream_defaults};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use retry_policies::Jitter;
use std::time::Duration;
use tracing::debug;

pub struct HttpClient;

impl HttpClient {
    /// 创建访问上游解析端点的 HTTP 客户端
    ///
    /// 代理和重试取自上游配置；未配置重试时每次解析只发一次请求。
    pub fn create(
        upstream: &UpstreamConfig,
        config: &HttpClientConfig,
    ) -> Result<ClientWithMiddleware, AppError> {
        debug!(
            "Creating upstream HTTP client - Endpoint: {}, Config: {:?}, Proxy: {:?}, Retry: {:?}",
            upstream.endpoint, config, upstream.proxy, upstream.retry
        );

        let client = Self::base_client(config, upstream.proxy.as_deref())?;

        let builder = ClientBuilder::new(client);
        let client = match &upstream.retry {
            Some(retry) => builder
                .with(RetryTransientMiddleware::new_with_policy(Self::retry_policy(
                    retry,
                )))
                .build(),
            None => builder.build(),
        };

        Ok(client)
    }

    // 底层 reqwest 客户端，请求超时对每次上游调用都生效
    fn base_client(
        config: &HttpClientConfig,
        proxy: Option<&str>,
    ) -> Result<reqwest::Client, AppError> {
        // 上游只返回纯文本
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));

        let agent = config
            .agent
            .as_deref()
            .unwrap_or(upstream_defaults::USER_AGENT);

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(agent)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.request_timeout));

        if let Some(keepalive) = config.keepalive {
            builder = builder.tcp_keepalive(Duration::from_secs(u64::from(keepalive)));
        }
        if let Some(idle_timeout) = config.idle_timeout {
            builder = builder.pool_idle_timeout(Duration::from_secs(idle_timeout));
        }

        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
                AppError::InvalidProxy(InvalidProxyConfig(format!(
                    "Proxy configuration error: {}",
                    e
                )))
            })?;
            builder = builder.proxy(proxy);
        }

        builder.build().map_err(|e| {
            AppError::HttpError(HttpClientError(format!(
                "Failed to create HTTP client: {}",
                e
            )))
        })
    }

    // 指数退避重试策略，首次重试间隔为配置的 delay
    fn retry_policy(retry: &RetryConfig) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .retry_bounds(
                Duration::from_secs(u64::from(retry.delay)),
                Duration::from_secs(u64::from(retry_limits::MAX_DELAY)),
            )
            .base(retry.delay)
            .jitter(Jitter::Bounded)
            .build_with_max_retries(retry.attempts)
    }

    /// 发送请求并读取响应体，只接受 200 且非空的响应
    pub async fn send_request(request: RequestBuilder) -> Result<bytes::Bytes, UpstreamError> {
        let response = request.send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UpstreamError::Status(status));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(UpstreamError::EmptyBody);
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_with_retry_and_proxy() {
        let upstream = UpstreamConfig {
            retry: Some(RetryConfig {
                attempts: 3,
                delay: 1,
            }),
            proxy: Some("http://127.0.0.1:3128".to_string()),
            ..Default::default()
        };
        assert!(HttpClient::create(&upstream, &HttpClientConfig::default()).is_ok());
    }

    #[test]
    fn test_create_rejects_bad_proxy() {
        let upstream = UpstreamConfig {
            proxy: Some("not a proxy".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            HttpClient::create(&upstream, &HttpClientConfig::default()),
            Err(AppError::InvalidProxy(_))
        ));
    }
}
