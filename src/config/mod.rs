use crate::error::ConfigError;
use crate::r#const::enterprise_limits;
use serde::{Deserialize, Serialize};
use std::{fs, net::IpAddr, net::SocketAddr, path::Path, str::FromStr};
use tracing::debug;
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

pub mod common;
pub mod core;
pub mod rule;
pub mod upstream;

pub use common::*;
pub use core::*;
pub use rule::*;
pub use upstream::*;

// 配置结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;

// 自定义验证函数 - 验证Socket地址格式
pub fn validate_socket_addr(addr: &str) -> Result<(), ValidationError> {
    match SocketAddr::from_str(addr) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("invalid_socket_addr")),
    }
}

// 自定义验证函数 - 验证URL格式
pub fn validate_url(url_str: &str) -> Result<(), ValidationError> {
    match Url::parse(url_str) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("invalid_url")),
    }
}

// 自定义验证函数 - 验证DES密钥长度
pub fn validate_des_secret(secret: &str) -> Result<(), ValidationError> {
    if secret.len() != enterprise_limits::SECRET_LEN {
        return Err(ValidationError::new("invalid_secret_length"));
    }
    Ok(())
}

// 自定义验证函数 - 验证备用IP列表
pub fn validate_backup_ips(config: &Config) -> Result<(), ValidationError> {
    for ip in &config.backup_ips {
        if IpAddr::from_str(ip).is_err() {
            return Err(ValidationError::new("invalid_backup_ip"));
        }
    }
    Ok(())
}

// 自定义验证函数 - 验证种子调度规则
pub fn validate_dispatch_rules(config: &Config) -> Result<(), ValidationError> {
    for (domain, rules) in &config.dispatch_rules {
        if domain.is_empty() {
            return Err(ValidationError::new("empty_source_domain"));
        }
        if rules.iter().any(|rule| rule.target.is_empty()) {
            return Err(ValidationError::new("empty_dispatch_target"));
        }
    }
    Ok(())
}

// 应用配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
#[validate(schema(
    function = "validate_backup_ips",
    message = "Backup IPs must be valid IP addresses"
))]
#[validate(schema(
    function = "validate_dispatch_rules",
    message = "Dispatch rules require a non-empty source domain and target"
))]
#[serde(rename_all = "lowercase")]
pub struct Config {
    // 解析服务配置
    #[validate(nested)]
    pub server: ServerConfig,
    // 管理服务器配置（可选）
    #[serde(default)]
    #[validate(nested)]
    pub admin: Option<AdminConfig>,
    // 持久化存储配置
    #[serde(default)]
    #[validate(nested)]
    pub storage: StorageConfig,
    // HTTP客户端配置
    #[serde(default)]
    #[validate(nested)]
    pub http_client: HttpClientConfig,
    // 上游解析服务配置
    #[serde(default)]
    #[validate(nested)]
    pub upstream: UpstreamConfig,
    // 备用IP列表，原样附加在每个响应中
    #[serde(default)]
    pub backup_ips: Vec<String>,
    // 表达式表
    #[serde(default)]
    pub expressions: ExpressionTable,
    // 种子调度规则表
    #[serde(default)]
    pub dispatch_rules: SeedRuleTable,
}

impl Config {
    // 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        debug!("Loading configuration file: {:?}", path.as_ref());
        let content = fs::read_to_string(path).map_err(ConfigError::LoadError)?;
        Self::from_yaml(&content)
    }

    // 从YAML文本加载配置
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    // 创建一个带有默认值的配置
    pub fn new_with_defaults() -> Self {
        Self::default()
    }

    // 验证配置有效性
    pub fn validate(&self) -> ConfigResult<()> {
        // 使用 validator 库进行验证
        if let Err(errors) = Validate::validate(self) {
            return Err(ConfigError::ValidationError(format_validation_errors(
                &errors,
            )));
        }
        Ok(())
    }
}

// 将 ValidationErrors 转换为友好的错误信息
fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    // 格式化字段错误
    for (field, error_kind) in errors.errors() {
        match error_kind {
            validator::ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    messages.push(format!("Field '{}': {}", field, message));
                }
            }
            validator::ValidationErrorsKind::Struct(struct_errors) => {
                messages.push(format!(
                    "Struct '{}' validation failed: {}",
                    field,
                    format_validation_errors(struct_errors)
                ));
            }
            validator::ValidationErrorsKind::List(list_errors) => {
                for (index, err) in list_errors {
                    messages.push(format!(
                        "List '{}' at index {}: {}",
                        field,
                        index,
                        format_validation_errors(err)
                    ));
                }
            }
        }
    }

    if messages.is_empty() {
        "Unknown validation error".to_string()
    } else {
        messages.join("\n")
    }
}

// 默认配置实现
impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            admin: Some(AdminConfig::default()),
            storage: StorageConfig::default(),
            http_client: HttpClientConfig::default(),
            upstream: UpstreamConfig::default(),
            backup_ips: Vec::new(),
            expressions: ExpressionTable::new(),
            dispatch_rules: SeedRuleTable::new(),
        }
    }
}
