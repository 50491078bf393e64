use std::thread;

use anyhow::Context as _;
use tetrevo_coordinator::StopSignal;

/// Raises the returned signal on the first Ctrl+C; a second one exits at once.
pub(crate) fn stop_on_ctrl_c() -> anyhow::Result<StopSignal> {
    let stop = StopSignal::new();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;
    let signal = stop.clone();
    thread::Builder::new()
        .name("tetrevo-interrupt".to_owned())
        .spawn(move || {
            runtime.block_on(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    log::warn!("cannot listen for Ctrl+C: {e}");
                    return;
                }
                eprintln!("Interrupted; finishing the current cycle (Ctrl+C again to abort)");
                signal.stop();
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });
        })
        .context("Failed to spawn signal thread")?;
    Ok(stop)
}
