//! Process lifecycle glue: interrupt handling and daemon mode.

use tokio_util::sync::CancellationToken;

/// Returns a token cancelled on the first Ctrl-C / SIGINT.
///
/// The run loops poll the token between steps, so the final report is
/// produced on the main task rather than inside a signal handler.
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::debug!("Interrupt received");
                trigger.cancel();
            }
            Err(e) => log::error!("Unable to listen for interrupt signal: {}", e),
        }
    });
    token
}

/// Re-delivers SIGINT with the default disposition so the process
/// terminates the way an uncaught interrupt would.
#[cfg(unix)]
pub fn reraise_interrupt() -> ! {
    use nix::sys::signal::{raise, signal, SigHandler, Signal};

    // SAFETY: restoring the default disposition installs no Rust handler.
    if let Err(e) = unsafe { signal(Signal::SIGINT, SigHandler::SigDfl) } {
        log::warn!("Failed to restore SIGINT disposition: {}", e);
    } else if let Err(e) = raise(Signal::SIGINT) {
        log::warn!("Failed to raise SIGINT: {}", e);
    }
    std::process::exit(130)
}

#[cfg(not(unix))]
pub fn reraise_interrupt() -> ! {
    std::process::exit(130)
}

/// Detaches from the controlling terminal: new session, working directory
/// `/`, standard streams on `/dev/null`, umask 027.
///
/// Must run before any tokio runtime is started.
#[cfg(target_os = "linux")]
pub fn daemonize() -> std::io::Result<()> {
    use nix::sys::stat::{umask, Mode};

    nix::unistd::daemon(false, false)?;
    umask(Mode::from_bits_truncate(0o027));
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn daemonize() -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "daemon mode is only available on Linux",
    ))
}
