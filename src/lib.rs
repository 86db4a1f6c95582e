pub mod admin;
pub mod args;
pub mod cache;
pub mod config;
pub mod r#const;
pub mod dispatch;
pub mod error;
pub mod expr;
pub mod handler;
pub mod http;
pub mod metrics;
pub mod rules;
pub mod storage;
pub mod upstream;

// 重导出常用组件
pub use admin::{AdminServer, AdminState};
pub use args::Args;
pub use cache::{CachedAnswer, ResolveCache};
pub use config::Config;
pub use dispatch::{DispatchEngine, DispatchRule};
pub use error::{AppError, StorageError, UpstreamError};
pub use expr::{evaluate, Condition, Operator, RequestContext};
pub use handler::{AnswerSource, Resolution, ResolveHandler, ResolveRequest, ResolveResponse};
pub use http::HttpServer;
pub use metrics::ResolveMetrics;
pub use r#const::subsystem_names;
pub use rules::{RuleLookup, RuleSource, RuleStore};
pub use storage::Storage;
pub use upstream::{create_resolver, UpstreamAnswer, UpstreamResolver};
