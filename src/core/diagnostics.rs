/////
///// Diagnostics
/////

use color_eyre::{eyre::eyre, Report};

/// Install the error-report hook and the tracing subscriber. Call once
/// at driver startup.
pub fn diagnostics_setup() -> Result<(), Report> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_target(false)
        .try_init()
        .map_err(|e| eyre!("failed to install tracing subscriber: {}", e))?;
    Ok(())
}

/// Disable colored output, for dumb terminals and log capture.
pub fn diagnostics_color_disable() {
    yansi::Paint::disable();
}
