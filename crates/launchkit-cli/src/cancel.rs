//! Cancellation: Ctrl-C / SIGTERM while a task runs, Ctrl-C inside a prompt,
//! and panics all end with every tracked subprocess gone.

use launchkit_agent::ProcessRegistry;
use std::time::Duration;
use tokio::runtime::Runtime;

/// How long subprocesses get between SIGTERM and SIGKILL.
pub const GRACE: Duration = Duration::from_secs(2);

/// Install the signal watcher on `rt` and a panic hook. Only the first call
/// for a registry installs anything.
pub fn install(rt: &Runtime, registry: &'static ProcessRegistry) {
    if !registry.mark_handlers_installed() {
        return;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        registry.kill_all_now();
        previous(info);
    }));

    rt.spawn(async move {
        wait_for_signal().await;
        tracing::debug!("cancel signal received");
        terminate(registry).await;
        exit_cancelled();
    });
}

/// Cancel from synchronous code, e.g. after an interrupted prompt.
pub fn abort(rt: &Runtime, registry: &ProcessRegistry) -> ! {
    rt.block_on(terminate(registry));
    exit_cancelled()
}

async fn terminate(registry: &ProcessRegistry) {
    let count = registry.terminate_all(GRACE).await;
    if count > 0 {
        tracing::debug!(count, "terminated subprocesses");
    }
}

fn exit_cancelled() -> ! {
    let _ = console::Term::stderr().show_cursor();
    eprintln!("\nCancelled.");
    std::process::exit(0)
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot watch SIGTERM");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot watch Ctrl-C");
        std::future::pending::<()>().await;
    }
}
