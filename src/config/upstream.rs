use crate::r#const::upstream_defaults;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::RetryConfig;
use super::{validate_des_secret, validate_url};

// 企业版上游配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct EnterpriseConfig {
    // 企业ID
    #[validate(length(min = 1, message = "Enterprise id must not be empty"))]
    pub id: String,
    // DES 密钥（8字节）
    #[validate(custom(
        function = "validate_des_secret",
        message = "Enterprise secret must be exactly 8 bytes"
    ))]
    pub secret: String,
}

// 上游解析服务配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct UpstreamConfig {
    // 上游解析端点
    #[serde(default = "default_endpoint")]
    #[validate(custom(function = "validate_url", message = "Invalid upstream endpoint URL"))]
    pub endpoint: String,
    // 企业版配置（可选，存在时启用加密模式）
    #[serde(default)]
    #[validate(nested)]
    pub enterprise: Option<EnterpriseConfig>,
    // 重试配置（可选）
    #[serde(default)]
    #[validate(nested)]
    pub retry: Option<RetryConfig>,
    // 代理（可选）
    #[serde(default)]
    #[validate(custom(function = "validate_url", message = "Invalid upstream proxy URL"))]
    pub proxy: Option<String>,
}

fn default_endpoint() -> String {
    upstream_defaults::DEFAULT_ENDPOINT.to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            enterprise: None,
            retry: None,
            proxy: None,
        }
    }
}
