//! # 像素网关 — 应用入口
//!
//! 本文件仅负责日志初始化、命令行解析、设置加载与 HTTP 服务启动。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pixel_gateway::error::AppError;
use pixel_gateway::image_handler::{self, ImageServiceState};
use pixel_gateway::settings::GatewaySettings;

#[derive(Debug, Parser)]
#[command(name = "pixel-gateway", version, about = "Serve images as framed pixel buffers")]
struct Cli {
    /// 监听端口
    #[arg(default_value_t = 8080)]
    port: u16,

    /// 监听地址
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// JSON 设置文件路径
    #[arg(long, env = "PIXEL_GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        log::error!("❌ 网关启动失败: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = GatewaySettings::load(cli.config.as_deref())?
        .with_env_overrides()
        .into_image_config()?;

    if config.gallery_endpoint.is_none() || config.gallery_client_id.is_none() {
        log::warn!("⚠️ 未配置图库地址或凭据，/random 将返回 E_GALLERY_FETCH");
    }

    let state = Arc::new(ImageServiceState::with_config(config)?);
    let app = image_handler::router(state);

    let listener = tokio::net::TcpListener::bind((cli.bind.as_str(), cli.port)).await?;
    log::info!("🚀 像素网关已启动: http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("👋 网关已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("监听退出信号失败: {err}");
        std::future::pending::<()>().await;
    }
}
