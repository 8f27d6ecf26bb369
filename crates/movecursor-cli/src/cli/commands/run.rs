//! Default command: listen for hotkeys until ESC or a termination signal.

use anyhow::{Context, Result};
use movecursor_core::config::Config;
use movecursor_core::controller::InputController;
use movecursor_core::logging::{self, LogConfig};

pub fn run(config: &Config) -> Result<()> {
    // Held until return so the file writer flushes.
    let log_guard = logging::init(&LogConfig::from(config)).context("init logging")?;
    if let Some(path) = &log_guard.log_file {
        tracing::info!("Logging to {}", path.display());
    }

    let mut controller =
        InputController::for_current_platform(config).context("create platform backend")?;

    let stop = controller.stop_handle();
    ctrlc::set_handler(move || {
        tracing::info!("Termination signal received");
        stop.stop();
    })
    .context("install Ctrl+C handler")?;

    controller.start().context("start keyboard listener")?;

    tracing::info!("Program finished");
    Ok(())
}
