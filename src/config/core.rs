use crate::r#const::{cache_limits, http_client_limits, server_defaults};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_socket_addr;

// HTTP客户端配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct HttpClientConfig {
    // 连接超时（秒）
    #[validate(range(
        min = http_client_limits::MIN_CONNECT_TIMEOUT,
        max = http_client_limits::MAX_CONNECT_TIMEOUT,
        message = "Connect timeout must be between {} and {} seconds"
    ))]
    pub connect_timeout: u64,
    // 请求超时（秒）
    #[validate(range(
        min = http_client_limits::MIN_REQUEST_TIMEOUT,
        max = http_client_limits::MAX_REQUEST_TIMEOUT,
        message = "Request timeout must be between {} and {} seconds"
    ))]
    pub request_timeout: u64,
    // 空闲连接超时（秒）（可选）
    #[validate(range(
        min = http_client_limits::MIN_IDLE_TIMEOUT,
        max = http_client_limits::MAX_IDLE_TIMEOUT,
        message = "Idle timeout must be between {} and {} seconds"
    ))]
    pub idle_timeout: Option<u64>,
    // TCP Keepalive（秒）（可选）
    #[validate(range(
        min = http_client_limits::MIN_KEEPALIVE,
        max = http_client_limits::MAX_KEEPALIVE,
        message = "Keepalive must be between {} and {} seconds"
    ))]
    pub keepalive: Option<u32>,
    // HTTP用户代理（可选）
    pub agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: http_client_limits::DEFAULT_CONNECT_TIMEOUT,
            request_timeout: http_client_limits::DEFAULT_REQUEST_TIMEOUT,
            idle_timeout: Some(http_client_limits::DEFAULT_IDLE_TIMEOUT),
            keepalive: Some(http_client_limits::DEFAULT_KEEPALIVE),
            agent: None,
        }
    }
}

// 解析服务配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct ServerConfig {
    // HTTP监听地址
    #[validate(custom(
        function = "validate_socket_addr",
        message = "Invalid server listen address"
    ))]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: server_defaults::DEFAULT_HTTP_LISTEN.to_string(),
        }
    }
}

// 持久化存储配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct StorageConfig {
    // 数据库目录
    #[serde(default = "default_storage_path")]
    #[validate(length(min = 1, message = "Storage path must not be empty"))]
    pub path: String,
    // 解析结果缓存有效期（秒）
    #[serde(default = "default_cache_ttl")]
    #[validate(range(
        min = cache_limits::MIN_CACHE_TTL,
        max = cache_limits::MAX_CACHE_TTL,
        message = "Cache TTL must be between {} and {} seconds"
    ))]
    pub cache_ttl: u64,
}

fn default_storage_path() -> String {
    server_defaults::DEFAULT_STORAGE_PATH.to_string()
}

fn default_cache_ttl() -> u64 {
    cache_limits::DEFAULT_CACHE_TTL
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            cache_ttl: default_cache_ttl(),
        }
    }
}

// 管理服务器配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct AdminConfig {
    // 管理服务器监听地址
    #[validate(custom(
        function = "validate_socket_addr",
        message = "Invalid admin listen address"
    ))]
    pub listen: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            listen: server_defaults::DEFAULT_ADMIN_LISTEN.to_string(),
        }
    }
}
