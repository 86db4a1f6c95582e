// src/http/mod.rs
//
// HTTP 解析服务模块实现:
// - GET /resolve: 根据域名、客户端IP和请求上下文返回调度后的解析结果

// 子模块定义
pub mod handlers;
pub mod server;
pub mod state;

// 公开导出
pub use server::HttpServer;
