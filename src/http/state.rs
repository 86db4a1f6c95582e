// src/http/state.rs

use crate::handler::ResolveHandler;
use std::sync::Arc;

/// 应用程序状态结构体
#[derive(Clone)]
pub struct AppState {
    /// 解析请求处理器
    pub handler: Arc<ResolveHandler>,
}
