use reqwest::StatusCode;
use std::io;
use std::net::AddrParseError;
use thiserror::Error;

// 统一错误类型
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Invalid proxy configuration: {0}")]
    InvalidProxy(#[from] InvalidProxyConfig),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] HttpClientError),

    #[error("Invalid shutdown timeout")]
    InvalidShutdownTimeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AddrParseError> for AppError {
    fn from(err: AddrParseError) -> Self {
        Self::Config(ConfigError::InvalidListenAddress(err.to_string()))
    }
}

// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadError(#[from] io::Error),

    #[error("YAML parsing error: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid server listen address: {0}")]
    InvalidListenAddress(String),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

// 持久化存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    OpenFailed(String),

    #[error("Invalid partition name: {0:?}")]
    InvalidPartition(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Scan failed: {0}")]
    ScanFailed(String),

    #[error("Task execution failed: {0}")]
    TaskFailed(String),

    #[error("Value encoding failed: {0}")]
    Encode(String),
}

// 上游解析错误类型
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),

    #[error("Upstream returned status {0}")]
    Status(StatusCode),

    #[error("Upstream returned an empty body")]
    EmptyBody,

    #[error("Malformed upstream answer: {0}")]
    Malformed(String),

    #[error("Cipher error: {0}")]
    Cipher(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(reqwest_middleware::Error::Reqwest(err))
    }
}

// 无效的代理配置错误
#[derive(Debug, Error)]
#[error("Proxy configuration error: {0}")]
pub struct InvalidProxyConfig(pub String);

// HTTP客户端错误
#[derive(Debug, Error)]
#[error("HTTP client error: {0}")]
pub struct HttpClientError(pub String);
