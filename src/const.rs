// 应用常量定义

//
// 配置参数限制常量
//

// 应用关闭等待时间限制
pub mod shutdown_timeout {
    // 默认值
    pub const DEFAULT: u64 = 30;
    // 最小值
    pub const MIN: u64 = 1;
    // 最大值
    pub const MAX: u64 = 120;
}

// 解析缓存限制
pub mod cache_limits {
    // 默认缓存有效期（秒），不是 DNS 记录的 TTL
    pub const DEFAULT_CACHE_TTL: u64 = 86400;
    // 最小缓存有效期（秒）
    pub const MIN_CACHE_TTL: u64 = 1;
    // 最大缓存有效期（秒）
    pub const MAX_CACHE_TTL: u64 = 30 * 86400;
    // 调用方未指定时的最小剩余TTL（秒）
    pub const DEFAULT_MIN_TTL: u64 = 1;
}

// HTTP客户端配置限制
pub mod http_client_limits {
    // 默认连接超时（秒）
    pub const DEFAULT_CONNECT_TIMEOUT: u64 = 3;
    // 最小连接超时（秒）
    pub const MIN_CONNECT_TIMEOUT: u64 = 1;
    // 最大连接超时（秒）
    pub const MAX_CONNECT_TIMEOUT: u64 = 120;
    // 默认请求超时（秒）
    pub const DEFAULT_REQUEST_TIMEOUT: u64 = 5;
    // 最小请求超时（秒）
    pub const MIN_REQUEST_TIMEOUT: u64 = 1;
    // 最大请求超时（秒）
    pub const MAX_REQUEST_TIMEOUT: u64 = 1200;
    // 默认空闲超时（秒）
    pub const DEFAULT_IDLE_TIMEOUT: u64 = 10;
    // 最小空闲超时（秒）
    pub const MIN_IDLE_TIMEOUT: u64 = 5;
    // 最大空闲超时（秒）
    pub const MAX_IDLE_TIMEOUT: u64 = 1800;
    // 默认keepalive时间（秒）
    pub const DEFAULT_KEEPALIVE: u32 = 30;
    // 最小keepalive时间（秒）
    pub const MIN_KEEPALIVE: u32 = 5;
    // 最大keepalive时间（秒）
    pub const MAX_KEEPALIVE: u32 = 600;
}

// 重试配置限制
pub mod retry_limits {
    // 最小重试次数
    pub const MIN_ATTEMPTS: u32 = 1;
    // 最大重试次数
    pub const MAX_ATTEMPTS: u32 = 10;
    // 最小重试延迟（秒）
    pub const MIN_DELAY: u32 = 1;
    // 最大重试延迟（秒）
    pub const MAX_DELAY: u32 = 120;
}

// 企业版密钥限制
pub mod enterprise_limits {
    // DES 密钥长度（字节）
    pub const SECRET_LEN: usize = 8;
}

//
// 存储键常量
//

// 持久化存储键前缀
pub mod storage_keys {
    // 解析缓存键前缀: resolve_cache$<domain>$<client_ip>
    pub const RESOLVE_CACHE_PREFIX: &str = "resolve_cache";
    // 调度规则键前缀: dispatch_rule$<domain>
    pub const DISPATCH_RULE_PREFIX: &str = "dispatch_rule";
    // 键分隔符
    pub const SEPARATOR: char = '$';
}

//
// 指标标签常量
//

// 解析结果来源标签
pub mod resolve_source_labels {
    // 缓存命中
    pub const CACHE: &str = "cache";
    // 上游解析
    pub const UPSTREAM: &str = "upstream";
    // 解析失败
    pub const FAILED: &str = "failed";
}

// 缓存操作标签
pub mod cache_labels {
    // 缓存命中
    pub const HIT: &str = "hit";
    // 缓存未命中
    pub const MISS: &str = "miss";
    // 缓存过期（剩余TTL不足）
    pub const STALE: &str = "stale";
    // 缓存值无法解析
    pub const CORRUPT: &str = "corrupt";
    // 插入成功
    pub const INSERT: &str = "insert";
    // 插入错误
    pub const INSERT_ERROR: &str = "insert_error";
    // 读取错误
    pub const READ_ERROR: &str = "read_error";
    // 清空缓存
    pub const CLEAR: &str = "clear";
}

// 上游模式标签
pub mod upstream_labels {
    // 明文模式
    pub const PLAIN: &str = "plain";
    // 企业版加密模式
    pub const ENTERPRISE: &str = "enterprise";
}

// 上游错误类型标签
pub mod upstream_error_labels {
    // 网络请求错误（含超时）
    pub const REQUEST: &str = "request";
    // 非200状态码
    pub const STATUS: &str = "status";
    // 空响应体
    pub const EMPTY_BODY: &str = "empty_body";
    // 响应格式错误
    pub const MALFORMED: &str = "malformed";
    // 加解密错误
    pub const CIPHER: &str = "cipher";
}

// 调度结果标签
pub mod dispatch_labels {
    // 域名被改写
    pub const REWRITTEN: &str = "rewritten";
    // 未命中任何规则
    pub const UNCHANGED: &str = "unchanged";
}

// 规则来源标签
pub mod rule_source_labels {
    // 持久化覆盖规则
    pub const PERSISTED: &str = "persisted";
    // 静态种子规则
    pub const SEED: &str = "seed";
    // 无规则
    pub const NONE: &str = "none";
    // 读取错误
    pub const ERROR: &str = "error";
}

// 条件求值失败原因标签
pub mod condition_error_labels {
    // 非数字比较值
    pub const NOT_NUMERIC: &str = "not_numeric";
    // 无效正则表达式
    pub const BAD_REGEX: &str = "bad_regex";
    // 无效谓词表达式
    pub const BAD_PREDICATE: &str = "bad_predicate";
    // 不支持的操作符
    pub const UNSUPPORTED: &str = "unsupported_operator";
}

// 子系统名称
pub mod subsystem_names {
    // HTTP解析服务子系统
    pub const HTTP_SERVER: &str = "http_server";
    // 管理服务器子系统
    pub const ADMIN_SERVER: &str = "admin_server";
}

// 服务器默认值
pub mod server_defaults {
    // 默认HTTP监听地址
    pub const DEFAULT_HTTP_LISTEN: &str = "0.0.0.0:8000";
    // 默认管理服务器监听地址
    pub const DEFAULT_ADMIN_LISTEN: &str = "127.0.0.1:9000";
    // 默认数据库路径
    pub const DEFAULT_STORAGE_PATH: &str = "./database";
}

// 上游默认值
pub mod upstream_defaults {
    // 默认上游解析端点
    pub const DEFAULT_ENDPOINT: &str = "http://119.29.29.29/d";
    // 上游请求固定的 ttl 参数
    pub const TTL_FLAG: &str = "1";
    // 未配置 agent 时使用的用户代理
    pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
}

// 上游协议常量
pub mod upstream_protocol {
    // 查询参数：域名
    pub const PARAM_DOMAIN: &str = "dn";
    // 查询参数：客户端IP
    pub const PARAM_IP: &str = "ip";
    // 查询参数：是否返回TTL
    pub const PARAM_TTL: &str = "ttl";
    // 查询参数：企业ID
    pub const PARAM_ID: &str = "id";
    // 响应体中IP列表与TTL的分隔符
    pub const TTL_SEPARATOR: char = ',';
    // 响应体中IP之间的分隔符
    pub const IP_SEPARATOR: char = ';';
}

// HTTP 请求参数和头常量
pub mod http_params {
    // 查询参数：域名
    pub const DOMAIN: &str = "domain";
    // 查询参数：客户端IP
    pub const CLIENT_IP: &str = "client_ip";
    // 查询参数：最小剩余TTL
    pub const TTL: &str = "ttl";
    // 转发的客户端IP头
    pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
    // CGI 风格的请求头前缀
    pub const CGI_HEADER_PREFIX: &str = "HTTP_";
    // CGI 风格的对端地址
    pub const REMOTE_ADDR: &str = "REMOTE_ADDR";
}

// 表达式常量
pub mod expr {
    // 列表分隔符（in / nin）
    pub const LIST_SEPARATOR: char = ',';
    // 缺失字段的字面值
    pub const ABSENT_LITERAL: &str = "None";
    // 旧配置的操作符前缀
    pub const OPERATOR_PREFIX: char = '$';
    // 正则表达式编译大小上限（字节）
    pub const REGEX_SIZE_LIMIT: usize = 1 << 20;
    // 谓词文本长度上限（字节）
    pub const PREDICATE_MAX_LEN: usize = 4096;
    // 谓词嵌套深度上限（`!` 与括号）
    pub const PREDICATE_MAX_DEPTH: usize = 64;
}
