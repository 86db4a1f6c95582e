use httpdns::{
    create_resolver, subsystem_names, AdminServer, AdminState, AppError, Args, Config,
    HttpServer, ResolveCache, ResolveHandler, RuleStore, Storage,
};
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use tokio_graceful_shutdown::{IntoSubsystem, SubsystemBuilder, Toplevel};
use tracing::{error, info, warn};

// 使用 mimalloc 分配器提高内存效率
#[global_allocator]
static GLOBAL: MiMalloc = mimalloc::MiMalloc;

fn init_logging(args: &Args) {
    let builder = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_line_number(false);

    // 如果启用调试模式，输出调试信息，否则只输出 info 及以上级别
    if args.debug {
        builder.with_max_level(tracing::Level::DEBUG)
    } else {
        builder.with_max_level(tracing::Level::INFO)
    }
    .init();
}

// 程序入口
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 解析命令行参数
    let args = Args::parse_args();

    // 初始化日志
    init_logging(&args);

    // 验证参数
    if let Err(e) = args.validation() {
        error!("Invalid command line arguments: {}", e);
        process::exit(1);
    }

    info!("Starting HTTP DNS dispatch proxy");

    // 加载配置
    let config = match Config::from_file(&args.config) {
        Ok(config) => {
            info!("Successfully loaded configuration: {:?}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration file: {}", e);
            process::exit(1);
        }
    };

    // 如果是测试模式，成功验证配置后退出
    if args.test_config {
        info!("Configuration file validation successful");
        return Ok(());
    }

    // 创建应用组件
    let components = match create_components(config) {
        Ok(components) => components,
        Err(e) => {
            error!("Failed to create application components: {}", e);
            process::exit(1);
        }
    };

    let AppComponents {
        storage,
        http_server,
        admin_server,
    } = components;

    // 创建优雅关闭顶层管理器
    let toplevel = Toplevel::new(|s| async move {
        // 启动HTTP解析服务子系统
        s.start(SubsystemBuilder::new(
            subsystem_names::HTTP_SERVER,
            move |s| async move { http_server.run(s).await },
        ));
        // 启动管理服务器子系统
        if let Some(admin_server) = admin_server {
            s.start(SubsystemBuilder::new(
                subsystem_names::ADMIN_SERVER,
                move |s| async move { admin_server.run(s).await },
            ));
        }
    });

    // 等待关闭
    info!("All services started, waiting for requests...");
    let result = toplevel
        .catch_signals()
        .handle_shutdown_requests(tokio::time::Duration::from_secs(args.shutdown_timeout))
        .await;

    // 落盘
    if let Err(e) = storage.flush().await {
        warn!("Failed to flush storage on shutdown: {}", e);
    }

    match result {
        Ok(_) => {
            info!("Application gracefully shut down");
            Ok(())
        }
        Err(e) => {
            error!("Application shutdown error: {}", e);
            process::exit(1);
        }
    }
}

// 应用组件
struct AppComponents {
    // 持久化存储
    storage: Arc<Storage>,
    // HTTP 解析服务器
    http_server: HttpServer,
    // 管理服务器（可选）
    admin_server: Option<AdminServer>,
}

// 创建应用组件
fn create_components(config: Config) -> Result<AppComponents, AppError> {
    // 打开持久化存储
    let storage = Arc::new(Storage::open(&config.storage.path)?);

    // 创建解析缓存
    let cache = Arc::new(ResolveCache::new(
        Arc::clone(&storage),
        config.storage.cache_ttl,
    ));

    // 创建规则存储
    let rules = Arc::new(RuleStore::new(
        Arc::clone(&storage),
        config.expressions.clone(),
        config.dispatch_rules.clone(),
    ));

    // 创建上游解析器
    let upstream = match create_resolver(&config.upstream, &config.http_client) {
        Ok(resolver) => resolver,
        Err(e) => {
            error!("Failed to initialize upstream resolver: {}", e);
            return Err(e);
        }
    };

    // 创建请求处理器
    let handler = Arc::new(ResolveHandler::new(
        Arc::clone(&rules),
        Arc::clone(&cache),
        upstream,
        config.backup_ips.clone(),
    ));

    // 创建 HTTP 解析服务器
    let listen_addr: SocketAddr = config.server.listen.parse()?;
    let http_server = HttpServer::new(listen_addr, handler);
    info!("HTTP resolve server initialized on {}", listen_addr);

    // 创建管理服务器
    let admin_server = match &config.admin {
        Some(admin_config) => {
            let admin_addr: SocketAddr = admin_config.listen.parse()?;
            Some(AdminServer::new(admin_addr, AdminState { rules, cache }))
        }
        None => {
            warn!("Admin server configuration not provided, admin API disabled");
            None
        }
    };

    Ok(AppComponents {
        storage,
        http_server,
        admin_server,
    })
}
