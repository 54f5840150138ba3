//! Language server binary for gherkin-autocomplete.
//!
//! This binary provides step autocomplete for Gherkin feature files to any
//! editor speaking the Language Server Protocol. It communicates via JSON-RPC
//! over stdin/stdout.

use std::ops::ControlFlow;

use async_lsp::concurrency::ConcurrencyLayer;
use async_lsp::panic::CatchUnwindLayer;
use async_lsp::router::Router;
use async_lsp::server::LifecycleLayer;
use async_lsp::tracing::TracingLayer;
use clap::Parser;
use lsp_types::{notification, request};
use tower::ServiceBuilder;
use tracing::info;

use gherkin_autocomplete_server::config::{LogLevel, ServerConfig};
use gherkin_autocomplete_server::error::ServerError;
use gherkin_autocomplete_server::handlers::{
    handle_completion, handle_did_change_configuration, handle_did_change_text_document,
    handle_did_close_text_document, handle_did_open_text_document, handle_did_save_text_document,
    handle_initialise, handle_initialised, handle_shutdown,
};
use gherkin_autocomplete_server::logging::init_logging;
use gherkin_autocomplete_server::server::ServerState;

/// LSP server providing step autocomplete for Gherkin feature files.
#[derive(Parser, Debug)]
#[command(name = "gherkin-autocomplete-lsp", version, about)]
struct Args {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<LogLevel>,

    /// Interval in milliseconds between index readiness checks.
    #[arg(long)]
    poll_interval_ms: Option<u64>,
}

fn main() {
    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            let fallback = ServerConfig::default();
            init_logging(&fallback);
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting gherkin-autocomplete-lsp"
    );

    let result = run_server(config);
    if let Err(e) = result {
        tracing::error!(error = %e, "server exited with error");
        std::process::exit(1);
    }
}

/// Run the language server.
fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run_server_async(config))
}

fn build_config(args: &Args) -> Result<ServerConfig, ServerError> {
    let config = ServerConfig::from_env()?;
    Ok(config.apply_overrides(args.log_level, args.poll_interval_ms))
}

/// Asynchronously run the language server main loop.
async fn run_server_async(config: ServerConfig) -> Result<(), ServerError> {
    let (server, _client) = async_lsp::MainLoop::new_server(|client| {
        let state = ServerState::with_client(config.clone(), Some(client));

        let mut router = Router::new(state);
        router
            .request::<request::Initialize, _>(|st, params| {
                let result = handle_initialise(st, params);
                std::future::ready(result)
            })
            .request::<request::Shutdown, _>(|st, _params| {
                let result = handle_shutdown(st);
                std::future::ready(result)
            })
            .request::<request::Completion, _>(|st, params| {
                let result = handle_completion(st, params);
                std::future::ready(result)
            })
            .notification::<notification::Initialized>(|st, params| {
                handle_initialised(st, params);
                ControlFlow::Continue(())
            })
            .notification::<notification::Exit>(|_, ()| ControlFlow::Break(Ok(())))
            .notification::<notification::DidOpenTextDocument>(|st, params| {
                handle_did_open_text_document(st, params);
                ControlFlow::Continue(())
            })
            .notification::<notification::DidChangeTextDocument>(|st, params| {
                handle_did_change_text_document(st, params);
                ControlFlow::Continue(())
            })
            .notification::<notification::DidSaveTextDocument>(|st, params| {
                handle_did_save_text_document(st, params);
                ControlFlow::Continue(())
            })
            .notification::<notification::DidCloseTextDocument>(|st, params| {
                handle_did_close_text_document(st, params);
                ControlFlow::Continue(())
            })
            .notification::<notification::DidChangeConfiguration>(|st, params| {
                handle_did_change_configuration(st, params);
                ControlFlow::Continue(())
            });

        ServiceBuilder::new()
            .layer(TracingLayer::default())
            .layer(LifecycleLayer::default())
            .layer(CatchUnwindLayer::default())
            .layer(ConcurrencyLayer::default())
            .service(router)
    });

    // Use platform-appropriate stdio with tokio integration
    #[cfg(unix)]
    let (stdin, stdout) = (
        async_lsp::stdio::PipeStdin::lock_tokio()?,
        async_lsp::stdio::PipeStdout::lock_tokio()?,
    );
    #[cfg(not(unix))]
    let (stdin, stdout) = {
        use tokio_util::compat::{TokioAsyncReadCompatExt, TokioAsyncWriteCompatExt};
        (
            tokio::io::stdin().compat(),
            tokio::io::stdout().compat_write(),
        )
    };

    server.run_buffered(stdin, stdout).await?;

    info!("server exited");
    Ok(())
}
