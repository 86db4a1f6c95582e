use crate::cache::ResolveCache;
use crate::dispatch::DispatchEngine;
use crate::expr::RequestContext;
use crate::metrics::METRICS;
use crate::r#const::{cache_limits, resolve_source_labels};
use crate::rules::RuleStore;
use crate::upstream::UpstreamResolver;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

// 解析请求
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    // 请求的域名
    pub domain: String,
    // 客户端IP
    pub client_ip: String,
    // 调度条件使用的请求上下文
    pub extra_info: RequestContext,
    // 缓存结果的最小剩余有效期（秒），未指定时为 1
    pub min_ttl: Option<u64>,
}

impl ResolveRequest {
    pub fn new(domain: impl Into<String>, client_ip: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            client_ip: client_ip.into(),
            ..Default::default()
        }
    }

    pub fn with_extra_info(mut self, extra_info: RequestContext) -> Self {
        self.extra_info = extra_info;
        self
    }

    pub fn with_min_ttl(mut self, min_ttl: u64) -> Self {
        self.min_ttl = Some(min_ttl);
        self
    }
}

// 解析响应，形状固定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub server_ip_list: Vec<String>,
    pub ttl: u64,
    pub backup: Vec<String>,
    // 实际解析的域名（可能已被调度规则改写）
    pub domain: String,
}

// 结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Cache,
    Upstream,
    Failed,
}

impl AnswerSource {
    fn label(&self) -> &'static str {
        match self {
            AnswerSource::Cache => resolve_source_labels::CACHE,
            AnswerSource::Upstream => resolve_source_labels::UPSTREAM,
            AnswerSource::Failed => resolve_source_labels::FAILED,
        }
    }
}

// 带来源信息的解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub response: ResolveResponse,
    pub source: AnswerSource,
}

// 解析请求处理器
pub struct ResolveHandler {
    // 调度规则存储
    rules: Arc<RuleStore>,
    // 解析结果缓存
    cache: Arc<ResolveCache>,
    // 上游解析器
    upstream: Arc<dyn UpstreamResolver>,
    // 备用IP列表
    backup_ips: Vec<String>,
}

impl ResolveHandler {
    // 创建解析请求处理器
    pub fn new(
        rules: Arc<RuleStore>,
        cache: Arc<ResolveCache>,
        upstream: Arc<dyn UpstreamResolver>,
        backup_ips: Vec<String>,
    ) -> Self {
        Self {
            rules,
            cache,
            upstream,
            backup_ips,
        }
    }

    // 处理解析请求，任何单次请求内的失败都不会向外传播
    pub async fn resolve(&self, request: &ResolveRequest) -> ResolveResponse {
        self.resolve_detailed(request).await.response
    }

    // 处理解析请求并返回结果来源
    pub async fn resolve_detailed(&self, request: &ResolveRequest) -> Resolution {
        let start_time = Instant::now();
        let resolution = self.process(request).await;

        let label = resolution.source.label();
        METRICS
            .resolve_requests_total()
            .with_label_values(&[label])
            .inc();
        METRICS
            .resolve_duration_seconds()
            .with_label_values(&[label])
            .observe(start_time.elapsed().as_secs_f64());

        resolution
    }

    async fn process(&self, request: &ResolveRequest) -> Resolution {
        let min_ttl = request.min_ttl.unwrap_or(cache_limits::DEFAULT_MIN_TTL);

        debug!(
            "Processing resolve request - Domain: {}, Client: {}, Min TTL: {}",
            request.domain, request.client_ip, min_ttl
        );

        // 1. 查询调度规则，存储异常时按无规则处理
        let rules = match self.rules.get_rules(&request.domain).await {
            Ok(lookup) => lookup.rules,
            Err(e) => {
                error!(
                    "Failed to load dispatch rules - Domain: {}, Error: {}",
                    request.domain, e
                );
                Vec::new()
            }
        };

        // 2. 调度改写域名
        let domain = DispatchEngine::dispatch(&request.extra_info, &rules)
            .unwrap_or_else(|| request.domain.clone());
        if domain != request.domain {
            debug!("Domain dispatched: {} -> {}", request.domain, domain);
        }

        // 3. 查询缓存，存储异常时按未命中处理
        match self.cache.get(&domain, &request.client_ip, min_ttl).await {
            Ok(Some(cached)) => {
                return Resolution {
                    response: self.response(cached.server_ip_list, cached.ttl, domain),
                    source: AnswerSource::Cache,
                };
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    "Cache lookup failed, treating as miss - Domain: {}, Client: {}, Error: {}",
                    domain, request.client_ip, e
                );
            }
        }

        // 4. 请求上游
        let answer = match self.upstream.resolve(&domain, &request.client_ip).await {
            Ok(answer) => answer,
            Err(_) => {
                // 5. 上游失败返回空结果，不触碰缓存
                return Resolution {
                    response: self.response(Vec::new(), 0, domain),
                    source: AnswerSource::Failed,
                };
            }
        };

        // 6. 写回缓存，失败只记录日志
        if let Err(e) = self
            .cache
            .put(&domain, &request.client_ip, &answer.server_ip_list)
            .await
        {
            error!(
                "Failed to store resolve result - Domain: {}, Client: {}, Error: {}",
                domain, request.client_ip, e
            );
        }

        Resolution {
            response: self.response(answer.server_ip_list, answer.ttl, domain),
            source: AnswerSource::Upstream,
        }
    }

    fn response(&self, server_ip_list: Vec<String>, ttl: u64, domain: String) -> ResolveResponse {
        ResolveResponse {
            server_ip_list,
            ttl,
            backup: self.backup_ips.clone(),
            domain,
        }
    }
}
