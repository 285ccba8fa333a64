use order_server::{Config, Server, ServerState, init_logger, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv)
    setup_environment();

    // 2. 加载配置
    let config = Config::from_env()?;

    // 3. 日志 (guard 需存活到进程结束)
    let _log_guard = init_logger(&config.log);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Order server starting...");

    // 4. 初始化服务器状态
    let state = ServerState::initialize(&config).await?;

    // 5. 启动 HTTP 服务器
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
