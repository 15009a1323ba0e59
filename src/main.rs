use audit_indexer::config::IndexerConfig;
use audit_indexer::core::{ActionKind, LogEntry};
use audit_indexer::index::{FsResourceAccess, MemoryIndex};
use audit_indexer::scan::{shutdown, IndexingRunner, TenantScanner};
use audit_indexer::storage::{AuditLogStore, FileCheckpointStore};
use audit_indexer::tenant::StaticTenantDirectory;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "audit-indexer", about = "Audit-log driven index dispatcher")]
struct Cli {
    /// TOML 配置文件
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 周期扫描审计日志并分发索引操作
    Run {
        /// 覆盖配置中的扫描间隔（秒）
        #[arg(long)]
        interval: Option<u64>,
        /// 只跑一轮后退出
        #[arg(long)]
        once: bool,
        /// --once 时以 JSON 输出本轮统计
        #[arg(long, requires = "once")]
        json: bool,
    },
    /// 向文件审计日志追加一条记录
    Append {
        #[arg(long)]
        tenant: i32,
        #[arg(long)]
        path: String,
        /// add / update / delete / move / copy / ...
        #[arg(long)]
        action: String,
        /// move 的旧路径 / copy 的目标路径
        #[arg(long)]
        data: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => IndexerConfig::load(path)?,
        None => IndexerConfig::default(),
    };

    match cli.command {
        Command::Append {
            tenant,
            path,
            action,
            data,
        } => {
            let action: ActionKind = action.parse().map_err(anyhow::Error::msg)?;
            let mut entry = LogEntry::new(path, action, SystemTime::now());
            entry.action_data = data;
            let log = AuditLogStore::open_in_dir(config.audit_dir())?;
            log.append(tenant, std::slice::from_ref(&entry))?;
            info!(
                "Appended {} {} for tenant {} to {:?}",
                entry.action,
                entry.resource_path,
                tenant,
                log.dir()
            );
            Ok(())
        }
        Command::Run {
            interval,
            once,
            json,
        } => {
            if let Some(secs) = interval {
                config.interval_secs = secs;
            }
            config.validate()?;
            run(config, once, json).await
        }
    }
}

async fn run(config: IndexerConfig, once: bool, json: bool) -> anyhow::Result<()> {
    info!("Starting audit-indexer, data dir {:?}", config.data_dir);

    let log = Arc::new(AuditLogStore::open_in_dir(config.audit_dir())?);
    let checkpoints = Arc::new(FileCheckpointStore::open(
        config.checkpoint_file(),
        config.checkpoint_location.clone(),
    )?);
    let index = Arc::new(MemoryIndex::new());
    let access = Arc::new(FsResourceAccess::new(config.resource_root()));

    let evict_target = index.clone();
    let directory = Arc::new(StaticTenantDirectory::new().with_evict_hook(move |tenant_id| {
        let freed = evict_target.evict_tenant(tenant_id);
        info!("Unloaded index of tenant {} ({} docs)", tenant_id, freed);
    }));
    config.populate(&directory);

    let scanner = TenantScanner::new(
        log,
        checkpoints,
        directory.clone(),
        index.clone(),
        access,
    );
    let (signal, handle) = shutdown::channel();
    let runner = Arc::new(IndexingRunner::new(
        scanner,
        directory,
        config.root_tenant(),
        signal,
    ));

    if once {
        let report = tokio::task::spawn_blocking(move || runner.run_once()).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            info!("\n{}", report);
        }
        return Ok(());
    }

    let task = tokio::spawn(
        runner
            .clone()
            .run_periodic(config.interval(), config.initial_delay()),
    );
    info!(
        "audit-indexer ready: scanning every {}s, root tenant {}",
        config.interval_secs,
        config.root_tenant().tenant_domain
    );

    // 优雅退出：请求停止 → 等待排空 → 超时则放弃在途任务
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    handle.request_stop();
    if handle.wait_drained_timeout(config.shutdown_grace()).await {
        task.await?;
    } else {
        tracing::warn!(
            "Indexing runner did not drain within {}s, abandoning it",
            config.shutdown_grace_secs
        );
        task.abort();
    }
    info!("Index holds {} docs at exit", index.len());

    Ok(())
}
