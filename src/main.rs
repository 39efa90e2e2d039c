use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
mod scenario;
mod services;
mod utils;

use config::Config;
use events::DocumentHandle;
use scenario::Scenario;
use services::{
    create_event_source, spawn_watcher, Collaborators, TracingNavigator, TracingRenderer,
    ValueEchoFactory, Watcher,
};
use utils::SystemClock;

#[derive(Parser, Debug)]
#[command(name = "a11y-watch")]
#[command(about = "Коалесценция событий доступности документа и их озвучивание")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "a11y-watch.toml")]
    config: String,

    /// Сценарий событий (TOML); без него проигрывается встроенный
    #[arg(short, long)]
    scenario: Option<String>,

    /// Только проверить конфигурацию и сценарий, ничего не проигрывая
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (перекрывает logging.level из конфигурации)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Загрузка конфигурации до логирования: уровень и формат берутся из неё
    let config = Config::load(&args.config)?;
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Запуск a11y-watch v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);

    let scenario = match &args.scenario {
        Some(path) => {
            info!("Сценарий: {}", path);
            Scenario::load(path)?
        }
        None => {
            info!("Сценарий не указан, используется встроенный");
            Scenario::builtin()?
        }
    };
    info!("Сценарий: {}", scenario.summary());

    if args.dry_run {
        warn!("Режим сухого запуска - конфигурация и сценарий проверены, проигрывание пропущено");
        return Ok(());
    }

    // Инициализация компонентов
    let tree = scenario.build_tree();
    let collaborators = Collaborators {
        tree: Box::new(tree.clone()),
        output: Box::new(TracingRenderer::new()),
        navigator: Box::new(TracingNavigator),
        factory: Box::new(ValueEchoFactory::new()),
    };
    let watcher = Watcher::new(&config, Arc::new(SystemClock), collaborators);
    let (handle, watcher_task) = spawn_watcher(watcher);

    let document = DocumentHandle(scenario.document);
    handle.init(document)?;
    let source = create_event_source(&scenario, tree)?;

    info!("Все компоненты инициализированы");

    // Проигрывание до конца сценария или до Ctrl+C
    let replay = source.run(handle.clone());
    tokio::select! {
        result = replay => {
            if let Err(e) = result {
                error!("Ошибка проигрывания сценария: {}", e);
            }
        }
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Получен сигнал завершения (Ctrl+C)"),
            Err(err) => error!("Ошибка при ожидании сигнала завершения: {}", err),
        },
    }

    info!("Завершение работы...");

    // Даём наблюдателю дообработать очередь (с таймаутом)
    let ready_timeout = config.timing.max_wait_time() * 10;
    match tokio::time::timeout(ready_timeout, handle.when_ready()).await {
        Ok(Ok(())) => info!("Очередь событий обработана"),
        Ok(Err(e)) => warn!("Наблюдатель недоступен: {}", e),
        Err(_) => warn!("Таймаут ожидания пустой очереди"),
    }

    if let Ok(stats) = handle.stats().await {
        info!(
            "Сбросов: {}, в очереди: {}, контрол: {:?}, активен: {}, сессия: {:?}",
            stats.flushes, stats.pending, stats.control, stats.active, stats.session
        );
        if let Some(report) = &stats.last_report {
            info!(
                "Последний сброс: обработано {}, устаревших {}, ошибок {}, отброшено live-регионов {}",
                report.dispatched.len(),
                report.skipped_stale,
                report.failed,
                report.dropped_live_regions
            );
        }
    }

    handle.cleanup(document)?;
    handle.shutdown()?;

    let shutdown_timeout = tokio::time::Duration::from_secs(5);
    match tokio::time::timeout(shutdown_timeout, watcher_task).await {
        Ok(_) => info!("Наблюдатель завершил работу корректно"),
        Err(_) => warn!("Таймаут при завершении наблюдателя"),
    }

    info!("a11y-watch завершил работу");
    Ok(())
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let registry = tracing_subscriber::registry().with(filter);

    if format == "compact" {
        registry
            .with(tracing_subscriber::fmt::layer().compact())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}
