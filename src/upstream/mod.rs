// 声明子模块
mod cipher;
mod http_client;
mod resolver;

use crate::config::{HttpClientConfig, UpstreamConfig};
use crate::error::{AppError, UpstreamError};
use crate::r#const::upstream_labels;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

// 重导出公共API
pub use cipher::DesCipher;
pub use http_client::HttpClient;
pub use resolver::{parse_answer, EnterpriseResolver, PlainResolver};

// 上游解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamAnswer {
    pub server_ip_list: Vec<String>,
    pub ttl: u64,
}

// 上游模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    // 明文
    Plain,
    // 企业版（DES 加密）
    Enterprise,
}

impl ResolveMode {
    pub fn label(&self) -> &'static str {
        match self {
            ResolveMode::Plain => upstream_labels::PLAIN,
            ResolveMode::Enterprise => upstream_labels::ENTERPRISE,
        }
    }
}

// 上游解析器接口
#[async_trait]
pub trait UpstreamResolver: Send + Sync {
    // 获取域名在指定客户端视角下的解析结果，失败时不返回部分结果
    async fn resolve(&self, domain: &str, client_ip: &str) -> Result<UpstreamAnswer, UpstreamError>;

    // 解析模式
    fn mode(&self) -> ResolveMode;
}

// 根据配置创建上游解析器
pub fn create_resolver(
    upstream: &UpstreamConfig,
    http_config: &HttpClientConfig,
) -> Result<Arc<dyn UpstreamResolver>, AppError> {
    let client = HttpClient::create(upstream, http_config)?;

    let resolver: Arc<dyn UpstreamResolver> = match &upstream.enterprise {
        Some(enterprise) => Arc::new(EnterpriseResolver::new(
            client,
            upstream.endpoint.clone(),
            enterprise.id.clone(),
            &enterprise.secret,
        )?),
        None => Arc::new(PlainResolver::new(client, upstream.endpoint.clone())),
    };

    info!(
        "Upstream resolver initialized - Endpoint: {}, Mode: {}, Retry: {}",
        upstream.endpoint,
        resolver.mode().label(),
        upstream.retry.is_some()
    );

    Ok(resolver)
}
