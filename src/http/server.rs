// src/http/server.rs

use crate::error::AppError;
use crate::handler::ResolveHandler;
use crate::http::handlers::handle_resolve;
use crate::http::state::AppState;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_graceful_shutdown::SubsystemHandle;
use tracing::{error, info};

const RESOLVE_PATH: &str = "/resolve";

/// 创建解析服务路由
pub fn create_router(handler: Arc<ResolveHandler>) -> Router {
    Router::new()
        .route(RESOLVE_PATH, get(handle_resolve))
        .with_state(AppState { handler })
}

/// HTTP 解析服务器结构体
pub struct HttpServer {
    /// 监听地址
    bind_addr: SocketAddr,
    /// 解析请求处理器
    handler: Arc<ResolveHandler>,
    /// 关闭信号发送端
    shutdown_tx: oneshot::Sender<()>,
    /// 关闭信号接收端
    shutdown_rx: oneshot::Receiver<()>,
}

impl HttpServer {
    /// 创建新的 HTTP 解析服务器
    pub fn new(bind_addr: SocketAddr, handler: Arc<ResolveHandler>) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        Self {
            bind_addr,
            handler,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// 启动 HTTP 解析服务器
    pub async fn run(self, subsys: SubsystemHandle) -> Result<(), AppError> {
        let app = create_router(self.handler.clone());

        // 创建 TCP 监听器
        let listener = match TcpListener::bind(self.bind_addr).await {
            Ok(listener) => {
                info!("HTTP resolve server listening on {}", self.bind_addr);
                listener
            }
            Err(e) => {
                error!("Failed to bind HTTP resolve server: {}", e);
                return Err(AppError::Io(e));
            }
        };

        // 获取关闭信号接收端
        let shutdown_rx = self.shutdown_rx;

        // 启动 HTTP 服务器，客户端地址参与调度条件
        tokio::select! {
            result = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>()
            )
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("HTTP resolve server received shutdown signal");
            }) => {
                if let Err(e) = result {
                    error!("HTTP resolve server error: {}", e);
                } else {
                    info!("HTTP resolve server completed normally");
                }
                Ok(())
            }
            _ = subsys.on_shutdown_requested() => {
                info!("Shutdown requested, stopping HTTP resolve server");
                let _ = self.shutdown_tx.send(());
                Ok(())
            }
        }
    }
}
