use axum::http::{header, StatusCode};
use axum::{routing::get, Router};
use once_cell::sync::Lazy;
use prometheus::{opts, HistogramVec, IntCounterVec, IntGauge, Registry};

// 全局静态指标实例
pub static METRICS: Lazy<ResolveMetrics> = Lazy::new(ResolveMetrics::new);

// 解析代理性能指标
pub struct ResolveMetrics {
    registry: Registry,

    // 1. 请求处理和性能指标
    resolve_requests_total: IntCounterVec,
    resolve_duration_seconds: HistogramVec,

    // 2. 缓存效率和状态指标
    cache_operations_total: IntCounterVec,
    cache_ttl_seconds: HistogramVec,
    storage_partitions: IntGauge,

    // 3. 上游解析器指标
    upstream_requests_total: IntCounterVec,
    upstream_errors_total: IntCounterVec,
    upstream_duration_seconds: HistogramVec,

    // 4. 调度规则指标
    dispatch_total: IntCounterVec,
    rule_lookups_total: IntCounterVec,
    condition_failures_total: IntCounterVec,
}

impl Default for ResolveMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolveMetrics {
    // 创建新的指标收集器
    pub fn new() -> Self {
        let registry = Registry::new();

        // 1. 请求处理和性能指标
        let resolve_requests_total = IntCounterVec::new(
            opts!(
                "httpdns_resolve_requests_total",
                "Total resolve requests processed, classified by answer source (cache, upstream, failed)"
            ),
            &["source"],
        )
        .unwrap();

        let resolve_duration_seconds = HistogramVec::new(
            prometheus::histogram_opts!(
                "httpdns_resolve_duration_seconds",
                "Resolve request processing duration in seconds, classified by answer source",
                vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
            ),
            &["source"],
        )
        .unwrap();

        // 2. 缓存效率和状态指标
        let cache_operations_total = IntCounterVec::new(
            opts!(
                "httpdns_cache_operations_total",
                "Total resolve cache operations, classified by operation type (hit, miss, stale, insert, clear)"
            ),
            &["operation"],
        )
        .unwrap();

        let cache_ttl_seconds = HistogramVec::new(
            prometheus::histogram_opts!(
                "httpdns_cache_ttl_seconds",
                "Remaining freshness of resolve cache hits in seconds",
                vec![1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 600.0, 1800.0, 3600.0, 86400.0]
            ),
            &["source"],
        )
        .unwrap();

        let storage_partitions = IntGauge::new(
            "httpdns_storage_partitions",
            "Current number of opened per-domain storage partitions",
        )
        .unwrap();

        // 3. 上游解析器指标
        let upstream_requests_total = IntCounterVec::new(
            opts!(
                "httpdns_upstream_requests_total",
                "Total requests sent to the upstream resolver, classified by mode (plain, enterprise)"
            ),
            &["mode"],
        )
        .unwrap();

        let upstream_errors_total = IntCounterVec::new(
            opts!(
                "httpdns_upstream_errors_total",
                "Total upstream resolver errors, classified by error type and mode"
            ),
            &["error_type", "mode"],
        )
        .unwrap();

        let upstream_duration_seconds = HistogramVec::new(
            prometheus::histogram_opts!(
                "httpdns_upstream_duration_seconds",
                "Upstream resolve duration in seconds, classified by mode",
                vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
            ),
            &["mode"],
        )
        .unwrap();

        // 4. 调度规则指标
        let dispatch_total = IntCounterVec::new(
            opts!(
                "httpdns_dispatch_total",
                "Total dispatch decisions, classified by outcome (rewritten, unchanged)"
            ),
            &["outcome"],
        )
        .unwrap();

        let rule_lookups_total = IntCounterVec::new(
            opts!(
                "httpdns_rule_lookups_total",
                "Total dispatch rule lookups, classified by rule source (persisted, seed, none, error)"
            ),
            &["source"],
        )
        .unwrap();

        let condition_failures_total = IntCounterVec::new(
            opts!(
                "httpdns_condition_failures_total",
                "Total condition evaluations that failed on bad input, classified by reason"
            ),
            &["reason"],
        )
        .unwrap();

        // 创建指标实例
        let metrics = ResolveMetrics {
            registry,
            resolve_requests_total,
            resolve_duration_seconds,
            cache_operations_total,
            cache_ttl_seconds,
            storage_partitions,
            upstream_requests_total,
            upstream_errors_total,
            upstream_duration_seconds,
            dispatch_total,
            rule_lookups_total,
            condition_failures_total,
        };

        // 注册所有指标
        metrics.register_all_metrics();

        metrics
    }

    // 注册所有指标
    fn register_all_metrics(&self) {
        // 1. 请求处理和性能指标
        self.registry
            .register(Box::new(self.resolve_requests_total.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.resolve_duration_seconds.clone()))
            .unwrap();

        // 2. 缓存效率和状态指标
        self.registry
            .register(Box::new(self.cache_operations_total.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.cache_ttl_seconds.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.storage_partitions.clone()))
            .unwrap();

        // 3. 上游解析器指标
        self.registry
            .register(Box::new(self.upstream_requests_total.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.upstream_errors_total.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.upstream_duration_seconds.clone()))
            .unwrap();

        // 4. 调度规则指标
        self.registry
            .register(Box::new(self.dispatch_total.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.rule_lookups_total.clone()))
            .unwrap();
        self.registry
            .register(Box::new(self.condition_failures_total.clone()))
            .unwrap();
    }

    // 导出所有指标为文本
    pub fn export_metrics(&self) -> String {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = String::new();
        if let Err(e) = encoder.encode_utf8(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        buffer
    }

    // 下面是各个指标的getter方法，用于其他模块增加计数或设置值

    // 1. 请求处理和性能指标
    pub fn resolve_requests_total(&self) -> &IntCounterVec {
        &self.resolve_requests_total
    }

    pub fn resolve_duration_seconds(&self) -> &HistogramVec {
        &self.resolve_duration_seconds
    }

    // 2. 缓存效率和状态指标
    pub fn cache_operations_total(&self) -> &IntCounterVec {
        &self.cache_operations_total
    }

    pub fn cache_ttl_seconds(&self) -> &HistogramVec {
        &self.cache_ttl_seconds
    }

    pub fn storage_partitions(&self) -> &IntGauge {
        &self.storage_partitions
    }

    // 3. 上游解析器指标
    pub fn upstream_requests_total(&self) -> &IntCounterVec {
        &self.upstream_requests_total
    }

    pub fn upstream_errors_total(&self) -> &IntCounterVec {
        &self.upstream_errors_total
    }

    pub fn upstream_duration_seconds(&self) -> &HistogramVec {
        &self.upstream_duration_seconds
    }

    // 4. 调度规则指标
    pub fn dispatch_total(&self) -> &IntCounterVec {
        &self.dispatch_total
    }

    pub fn rule_lookups_total(&self) -> &IntCounterVec {
        &self.rule_lookups_total
    }

    pub fn condition_failures_total(&self) -> &IntCounterVec {
        &self.condition_failures_total
    }
}

// 提供指标导出路由
pub fn metrics_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/metrics",
        get(|| async {
            // 直接从全局METRICS获取所有注册的指标
            let buffer = METRICS.export_metrics();

            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
                buffer,
            )
        }),
    )
}
