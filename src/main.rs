//! Codeweft CLI.

use clap::Parser;
use codeweft::cli::Cli;
use codeweft::core::cancel::CancellationSignal;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = Arc::new(CancellationSignal::new());
    spawn_interrupt_listener(Arc::clone(&cancel));

    if let Err(e) = codeweft::cli::dispatch(cli.command, &cancel) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "codeweft=debug" } else { "codeweft=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// First Ctrl-C lets in-flight targets finish building but stops writes and
/// commands; a second one exits immediately.
fn spawn_interrupt_listener(cancel: Arc<CancellationSignal>) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::warn!(error = %e, "cannot install interrupt handler");
            return;
        }
    };
    std::thread::spawn(move || {
        runtime.block_on(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            eprintln!("interrupt: finishing in-flight targets, no further writes (Ctrl-C again to abort)");
            cancel.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(130);
            }
        });
    });
}
