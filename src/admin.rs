use crate::cache::ResolveCache;
use crate::dispatch::DispatchRule;
use crate::error::{AppError, StorageError};
use crate::metrics;
use crate::rules::{RuleLookup, RuleStore};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemHandle};
use tracing::{error, info};

// 管理接口状态
#[derive(Clone)]
pub struct AdminState {
    // 调度规则存储
    pub rules: Arc<RuleStore>,
    // 解析结果缓存
    pub cache: Arc<ResolveCache>,
}

// 管理接口错误响应
type AdminResult<T> = Result<T, (StatusCode, Json<Value>)>;

fn storage_error(domain: &str, e: StorageError) -> (StatusCode, Json<Value>) {
    let status = match e {
        StorageError::InvalidPartition(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!("Admin operation failed - Domain: {}, Error: {}", domain, e);
    (status, Json(json!({ "domain": domain, "error": e.to_string() })))
}

// 创建管理接口路由
pub fn create_router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/rules/{domain}",
            get(get_rules_handler)
                .put(put_rules_handler)
                .delete(delete_rules_handler),
        )
        .route("/cache/{domain}", delete(clear_cache_handler))
        .merge(metrics::metrics_routes::<AdminState>())
        .with_state(state)
}

// 管理服务器
pub struct AdminServer {
    // 监听地址
    listen_addr: SocketAddr,
    // 管理接口状态
    state: AdminState,
    // 停止信号接收端
    shutdown_rx: Option<oneshot::Receiver<()>>,
    // 停止信号发送端
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl AdminServer {
    // 创建新的管理服务器
    pub fn new(listen_addr: SocketAddr, state: AdminState) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        Self {
            listen_addr,
            state,
            shutdown_rx: Some(shutdown_rx),
            shutdown_tx: Some(shutdown_tx),
        }
    }

    // 停止管理服务器
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            info!("Admin server stop signal sent");
        }
    }

    // 启动管理服务器
    pub async fn start(&mut self) -> Result<(), AppError> {
        let app = create_router(self.state.clone());

        let listener = TcpListener::bind(self.listen_addr).await?;
        info!("Admin server listening on {}", self.listen_addr);

        let shutdown_rx = self
            .shutdown_rx
            .take()
            .ok_or_else(|| AppError::Internal("Admin server already started".to_string()))?;

        let server = axum::serve(listener, app);
        let server_with_graceful_shutdown = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
            info!("Admin server received shutdown signal");
        });

        server_with_graceful_shutdown.await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl IntoSubsystem<AppError> for AdminServer {
    async fn run(mut self, subsys: SubsystemHandle) -> Result<(), AppError> {
        tokio::select! {
            res = self.start() => {
                if let Err(err) = res {
                    error!("Admin server error: {}", err);
                    Err(err)
                } else {
                    info!("Admin server stopped");
                    Ok(())
                }
            }
            _ = subsys.on_shutdown_requested() => {
                info!("Received subsystem shutdown request, admin server is stopping");
                self.shutdown();
                Ok(())
            }
        }
    }
}

// 健康检查处理程序
async fn health_handler() -> &'static str {
    "OK"
}

// 查询域名当前生效的调度规则
async fn get_rules_handler(
    State(state): State<AdminState>,
    Path(domain): Path<String>,
) -> AdminResult<Json<RuleLookup>> {
    state
        .rules
        .get_rules(&domain)
        .await
        .map(Json)
        .map_err(|e| storage_error(&domain, e))
}

// 写入域名的覆盖规则
async fn put_rules_handler(
    State(state): State<AdminState>,
    Path(domain): Path<String>,
    Json(rules): Json<Vec<DispatchRule>>,
) -> AdminResult<Json<Value>> {
    state
        .rules
        .set_rules(&domain, &rules)
        .await
        .map_err(|e| storage_error(&domain, e))?;

    Ok(Json(json!({ "domain": domain, "rules": rules.len() })))
}

// 删除域名的覆盖规则，回退到种子规则
async fn delete_rules_handler(
    State(state): State<AdminState>,
    Path(domain): Path<String>,
) -> AdminResult<Json<Value>> {
    let deleted = state
        .rules
        .delete_rules(&domain)
        .await
        .map_err(|e| storage_error(&domain, e))?;

    Ok(Json(json!({ "domain": domain, "deleted": deleted })))
}

// 清空域名的解析缓存
async fn clear_cache_handler(
    State(state): State<AdminState>,
    Path(domain): Path<String>,
) -> AdminResult<Json<Value>> {
    let removed = state
        .cache
        .clear(&domain)
        .await
        .map_err(|e| storage_error(&domain, e))?;

    Ok(Json(json!({ "domain": domain, "removed": removed })))
}
