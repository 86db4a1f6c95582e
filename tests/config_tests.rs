use assert_matches::assert_matches;
use httpdns::config::Config;
use httpdns::error::ConfigError;
use httpdns::expr::{Condition, Operator};
use std::io::Write;
use tempfile::NamedTempFile;

// 辅助函数：创建临时配置文件
fn create_temp_config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_basic_config_loading() {
    // 创建一个最小有效配置
    let config_content = r#"
server:
  listen: "127.0.0.1:8000"
admin:
  listen: "127.0.0.1:9000"
"#;

    let file = create_temp_config_file(config_content);
    let result = Config::from_file(file.path());

    assert!(
        result.is_ok(),
        "Failed to load valid config: {:?}",
        result.err()
    );
    let config = result.unwrap();

    // 验证基本配置值
    assert_eq!(config.server.listen, "127.0.0.1:8000");
    assert_eq!(config.admin.as_ref().unwrap().listen, "127.0.0.1:9000");

    // 验证默认值
    assert_eq!(config.storage.cache_ttl, 86400);
    assert_eq!(config.storage.path, "./database");
    assert_eq!(config.upstream.endpoint, "http://119.29.29.29/d");
    assert!(config.upstream.enterprise.is_none());
    assert!(config.upstream.retry.is_none());
    assert!(config.backup_ips.is_empty());
    assert!(config.expressions.is_empty());
    assert!(config.dispatch_rules.is_empty());
}

#[test]
fn test_required_parameters() {
    // 缺少 server 段
    let config_content = r#"
admin:
  listen: "127.0.0.1:9000"
"#;

    let file = create_temp_config_file(config_content);
    assert_matches!(Config::from_file(file.path()), Err(ConfigError::ParseError(_)));
}

#[test]
fn test_missing_file() {
    assert_matches!(
        Config::from_file("/nonexistent/httpdns/config.yaml"),
        Err(ConfigError::LoadError(_))
    );
}

#[test]
fn test_invalid_listen_address() {
    let config_content = r#"
server:
  listen: "not-an-address"
"#;

    let file = create_temp_config_file(config_content);
    let result = Config::from_file(file.path());
    assert_matches!(result, Err(ConfigError::ValidationError(msg)) if msg.contains("listen"));
}

#[test]
fn test_expressions_and_dispatch_rules() {
    let config_content = r#"
server:
  listen: "127.0.0.1:8000"
backup_ips: ["10.0.0.1", "10.0.0.2"]
expressions:
  expr1: ["$in", "field_1", "v1,v2"]
  expr2: ["$gte", "field_2", 15]
  expr3: ["$lte", "field_2", 99999]
  expr4: ["$regex", "field_1", "^v\\d{1,3}$"]
  expr5: ["predicate", "field_1", "equals('v3')"]
  expr6: ["$between", "field_2", "1,2"]
dispatch_rules:
  www.163.com:
    - target: mirrors.163.com
      expressions: [expr1, expr2, expr3, expr4]
    - target: news.163.com
      expressions: [expr5]
"#;

    let file = create_temp_config_file(config_content);
    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.backup_ips, vec!["10.0.0.1", "10.0.0.2"]);

    // 数字字面量转换为字符串
    assert_eq!(
        config.expressions["expr2"],
        Condition::new(Operator::Gte, "field_2", "15")
    );
    assert_eq!(config.expressions["expr1"].operator(), &Operator::In);
    assert_eq!(config.expressions["expr4"].expected(), r"^v\d{1,3}$");
    assert_eq!(config.expressions["expr5"].operator(), &Operator::Predicate);
    assert_eq!(
        config.expressions["expr6"].operator(),
        &Operator::Unsupported("$between".to_string())
    );

    let rules = &config.dispatch_rules["www.163.com"];
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].target, "mirrors.163.com");
    assert_eq!(rules[0].expressions, vec!["expr1", "expr2", "expr3", "expr4"]);
    assert_eq!(rules[1].target, "news.163.com");
}

#[test]
fn test_enterprise_secret_length() {
    let valid = r#"
server:
  listen: "127.0.0.1:8000"
upstream:
  enterprise:
    id: "1234"
    secret: "12345678"
"#;
    let config = Config::from_yaml(valid).unwrap();
    assert_eq!(config.upstream.enterprise.unwrap().id, "1234");

    let invalid = r#"
server:
  listen: "127.0.0.1:8000"
upstream:
  enterprise:
    id: "1234"
    secret: "1234567"
"#;
    assert_matches!(
        Config::from_yaml(invalid),
        Err(ConfigError::ValidationError(msg)) if msg.contains("8 bytes")
    );
}

#[test]
fn test_invalid_values() {
    // 无效的上游地址
    let config_content = r#"
server:
  listen: "127.0.0.1:8000"
upstream:
  endpoint: "not a url"
"#;
    assert_matches!(
        Config::from_yaml(config_content),
        Err(ConfigError::ValidationError(_))
    );

    // 无效的备用IP
    let config_content = r#"
server:
  listen: "127.0.0.1:8000"
backup_ips: ["not-an-ip"]
"#;
    assert_matches!(
        Config::from_yaml(config_content),
        Err(ConfigError::ValidationError(_))
    );

    // 超出范围的重试次数
    let config_content = r#"
server:
  listen: "127.0.0.1:8000"
upstream:
  retry:
    attempts: 100
    delay: 1
"#;
    assert_matches!(
        Config::from_yaml(config_content),
        Err(ConfigError::ValidationError(_))
    );

    // 超出范围的请求超时
    let config_content = r#"
server:
  listen: "127.0.0.1:8000"
http_client:
  connect_timeout: 5
  request_timeout: 0
"#;
    assert_matches!(
        Config::from_yaml(config_content),
        Err(ConfigError::ValidationError(_))
    );

    // 空的调度目标
    let config_content = r#"
server:
  listen: "127.0.0.1:8000"
dispatch_rules:
  a.com:
    - target: ""
      expressions: []
"#;
    assert_matches!(
        Config::from_yaml(config_content),
        Err(ConfigError::ValidationError(_))
    );
}

#[test]
fn test_default_config_is_valid() {
    let config = Config::new_with_defaults();
    assert!(config.validate().is_ok());
    assert!(config.admin.is_some());
}
