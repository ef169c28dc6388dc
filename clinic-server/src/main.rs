//! 门诊流转服务器主程序

mod config;
mod handlers;
mod server;
mod state;

use clap::Parser;
use clinic_core::Result;
use clinic_flow::{spawn_ticker, FlowEngine};
use clinic_storage::{LocalSnapshotStore, SnapshotStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::server::WebServer;
use crate::state::AppState;

/// 门诊流转服务器命令行参数
#[derive(Parser, Debug)]
#[command(name = "clinic-server")]
#[command(about = "门诊患者流转协调服务器")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 监听端口（覆盖配置文件）
    #[arg(short, long)]
    port: Option<u16>,

    /// 快照文件路径（覆盖配置文件）
    #[arg(short, long)]
    snapshot_path: Option<String>,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&args.log_level))
        .init();

    info!("启动门诊流转服务器...");

    // 加载配置
    let mut config = ServerConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(path) = args.snapshot_path {
        config.snapshot_path = path;
    }

    info!("服务器配置:");
    info!("  监听地址: {}:{}", config.host, config.port);
    info!("  快照路径: {}", config.snapshot_path);
    info!("  计时任务: {}", if config.tick_enabled { "启用" } else { "停用" });

    // 创建存储并恢复状态
    let store: Arc<dyn SnapshotStore> = Arc::new(LocalSnapshotStore::new(&config.snapshot_path));
    let mut engine = FlowEngine::new();
    match store.load().await {
        Ok(Some(snapshot)) => {
            engine.restore(&snapshot);
            info!("已从快照恢复状态");
        }
        Ok(None) => info!("未发现快照，以空状态启动"),
        Err(e) => {
            error!("快照读取失败: {}", e);
            return Err(e);
        }
    }

    let shared = engine.into_shared();

    // 启动按秒滴答任务
    if config.tick_enabled {
        spawn_ticker(shared.clone());
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| clinic_core::ClinicError::Config(format!("invalid listen address: {}", e)))?;

    // 启动Web服务器
    let server = WebServer::new(addr, AppState::new(shared, store));
    if let Err(e) = server.run().await {
        error!("服务器启动失败: {}", e);
        return Err(e);
    }

    Ok(())
}
