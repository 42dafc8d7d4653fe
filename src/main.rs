use std::process::ExitCode;

use course_progress_backend::config::Config;
use course_progress_backend::db::Database;
use course_progress_backend::state::AppState;
use course_progress_backend::{create_app, logging, seed};

#[tokio::main]
async fn main() -> ExitCode {
    if dotenvy::dotenv().is_err() {
        eprintln!("no .env file found, using process environment");
    }
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    let db = match Database::from_env().await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(error = %err, "failed to initialize database");
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = config.catalog_path.as_deref() {
        match seed::import_catalog_file(&db, path).await {
            Ok(summary) if !summary.invalid_courses.is_empty() => {
                tracing::warn!(
                    courses = ?summary.invalid_courses,
                    "courses with invalid prerequisite graphs will refuse completions"
                );
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(error = %err, "catalog import failed");
                return ExitCode::FAILURE;
            }
        }
    }

    let addr = config.bind_addr();
    let state = AppState::new(config, db.clone());
    let app = create_app(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "course-progress-backend listening");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server error");
    }

    tracing::info!("HTTP server stopped, closing database pool");
    db.close().await;
    tracing::info!("graceful shutdown complete");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
