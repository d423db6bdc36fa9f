use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use waypoint::{config, error, middleware, uploads, App};

#[derive(Debug, Error)]
enum StartError {
    #[error("could not load server configuration")]
    Config(#[from] config::ParseError),
    #[error("could not initialize application state")]
    App(#[from] waypoint::db::Error),
    #[error("could not bind or serve the HTTP listener")]
    Serve(#[from] std::io::Error),
}

#[tracing::instrument(skip_all, name = "server.run")]
async fn run(config: config::Server) -> Result<(), StartError> {
    let app = App::new(config)?;

    app.db.wait_until_healthy().await?;
    app.db.run_pending_migrations().await?;

    // Uploaded files that lost their database reference (a crash between
    // write and commit, say) get swept in the background.
    tokio::spawn({
        let app = app.clone();
        async move {
            match uploads::sweep_orphans(&app).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "swept orphaned upload files"),
                Err(error) => warn!(%error, "could not sweep orphaned upload files"),
            }
        }
    });

    let listener = TcpListener::bind((app.config.ip, app.config.port)).await?;
    let addr = listener.local_addr()?;

    let router = middleware::apply(waypoint::build_router(app.clone()), &app.config);
    info!("HTTP server is listening at http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("received graceful shutdown signal, shutting down server");
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => warn!(%error, "could not install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

fn main() {
    let result = config::Server::load().map_err(StartError::from).and_then(|config| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,waypoint=debug,tower_http=debug")
            }))
            .init();

        error::install(!config.environment.is_production());

        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(StartError::Serve)?;

        rt.block_on(run(config))
    });

    if let Err(error) = result {
        eprintln!("{error}");

        let mut source = std::error::Error::source(&error);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }

        std::process::exit(1);
    }
}
