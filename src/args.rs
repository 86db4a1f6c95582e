use crate::error::AppError;
use crate::r#const::shutdown_timeout;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

// HTTP DNS 调度代理服务
#[derive(Parser, Debug, Clone)]
#[command(
    name = "httpdns",
    author,
    version,
    about = "An HTTP DNS resolution proxy with rule-based domain dispatch\n\n\
             Key Features:\n\
             - Domain Dispatch: Rewrite requested domains by request headers, query parameters and client IP\n\
             - Rule Expressions: Numeric comparison, equality, list membership, regex and a safe predicate language\n\
             - Answer Caching: Per-domain, per-client answers persisted on disk with freshness control\n\
             - Upstream Resolution: Plain and enterprise (DES encrypted) HTTP DNS upstream modes\n\
             - Administration: Runtime rule overrides, cache purge, health check and Prometheus metrics\n\
             - Usability: Simple YAML configuration, Configuration validation, Command-line interface"
)]
pub struct Args {
    // 配置文件路径
    #[arg(short, long, default_value = "./config.yaml")]
    pub config: PathBuf,

    // 测试配置
    #[arg(
        short = 't',
        long = "test",
        action = ArgAction::SetTrue,
        help = "Test configuration file for validity and exit"
    )]
    pub test_config: bool,

    // 启用调试日志
    #[arg(
        short = 'd',
        long = "debug",
        action = ArgAction::SetTrue,
        help = "Enable debug level logging for detailed output"
    )]
    pub debug: bool,

    // 关闭超时
    #[arg(
        long = "shutdown-timeout",
        help = "Maximum time in seconds to wait for complete shutdown",
        default_value_t = shutdown_timeout::DEFAULT
    )]
    pub shutdown_timeout: u64,
}

impl Args {
    // 解析命令行参数
    pub fn parse_args() -> Self {
        Args::parse()
    }

    // 验证参数
    pub fn validation(&self) -> Result<(), AppError> {
        if !(shutdown_timeout::MIN..=shutdown_timeout::MAX).contains(&self.shutdown_timeout) {
            return Err(AppError::InvalidShutdownTimeout);
        }
        Ok(())
    }
}
