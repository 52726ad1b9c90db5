use std::{io::Write, process, sync::Arc, time::Duration};

use admin_styler::{
    application::{
        error::AppError,
        preview::{PreviewConfig, PreviewService},
        repos::SettingsStore,
        settings::SettingsService,
        stylesheet::TemplateRenderer,
    },
    cache::{CacheConfig, GenerationCache},
    config,
    infra::{
        db::PostgresSettingsStore,
        error::InfraError,
        http::{self, RouterState},
        memory::MemorySettingsStore,
        telemetry,
    },
};
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
        config::Command::Export(args) => run_export(settings, args).await,
        config::Command::Import(args) => run_import(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let settings_service = build_settings_service(&settings).await?;
    let preview = Arc::new(PreviewService::new(
        Arc::clone(&settings_service),
        PreviewConfig::from(&settings.preview),
    ));

    let prune_handle = {
        let preview = Arc::clone(&preview);
        let period = settings.preview.prune_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // Skip the first immediate tick
            loop {
                interval.tick().await;
                preview.prune_idle();
            }
        })
    };

    let result = serve_http(&settings, RouterState::new(settings_service, preview)).await;

    prune_handle.abort();
    let _ = prune_handle.await;

    result
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let service = build_settings_service(&settings).await?;
    let rendered = service.stylesheet().await?;

    match args.output.as_ref() {
        Some(path) => {
            tokio::fs::write(path, rendered.css.as_str())
                .await
                .map_err(|err| AppError::from(InfraError::from(err)))?;
            info!(
                path = %path.display(),
                fingerprint = rendered.fingerprint.short(),
                bytes = rendered.css.len(),
                "Stylesheet written"
            );
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(rendered.css.as_str().as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|err| AppError::from(InfraError::from(err)))?;
        }
    }

    Ok(())
}

async fn run_export(settings: config::Settings, args: config::ArchiveArgs) -> Result<(), AppError> {
    warn_without_database(&settings);
    let service = build_settings_service(&settings).await?;
    service.export(&args.file).await?;
    Ok(())
}

async fn run_import(settings: config::Settings, args: config::ArchiveArgs) -> Result<(), AppError> {
    warn_without_database(&settings);
    let service = build_settings_service(&settings).await?;
    service.import(&args.file).await?;
    Ok(())
}

fn warn_without_database(settings: &config::Settings) {
    if settings.database.url.is_none() {
        warn!("No database url configured; the archive is applied to an in-memory store only");
    }
}

async fn build_settings_service(
    settings: &config::Settings,
) -> Result<Arc<SettingsService>, AppError> {
    let store = init_store(settings).await?;
    let cache = Arc::new(GenerationCache::new(
        CacheConfig::from(&settings.cache),
        Arc::new(TemplateRenderer),
    ));
    Ok(Arc::new(SettingsService::new(store, cache)))
}

async fn init_store(settings: &config::Settings) -> Result<Arc<dyn SettingsStore>, AppError> {
    let Some(database_url) = settings.database.url.as_deref() else {
        info!("No database url configured; settings are kept in memory");
        return Ok(Arc::new(MemorySettingsStore::default()));
    };

    let pool =
        PostgresSettingsStore::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresSettingsStore::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresSettingsStore::new(pool)))
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::app_router(state);
    let addr = settings.server.addr;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::from(InfraError::Bind { addr, source }))?;
    info!(%addr, "Listening");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_handle = tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut graceful_rx = shutdown_rx.clone();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            let _ = graceful_rx.wait_for(|stop| *stop).await;
        },
    );

    let grace = settings.server.graceful_shutdown;
    let mut deadline_rx = shutdown_rx;
    let result = tokio::select! {
        result = server => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        () = shutdown_deadline(&mut deadline_rx, grace) => {
            warn!(grace_seconds = grace.as_secs(), "Graceful shutdown window elapsed; closing open connections");
            Ok(())
        }
    };

    signal_handle.abort();
    result
}

async fn shutdown_deadline(rx: &mut watch::Receiver<bool>, grace: Duration) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("Shutdown signal received");
}
