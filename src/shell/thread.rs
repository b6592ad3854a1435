mod control;
mod job;
mod process;
mod worker;

use std::sync::Arc;

use anyhow::Result;
use nix::{libc::c_int, sys::signal::Signal};
use signal_hook::iterator::Signals;
use tracing::debug;

pub use control::JobControl;
pub use worker::{Flow, Worker};

/// Runs the reaper and the signal relay on a dedicated thread.
///
/// SIGCHLD drains child state changes into the job table, SIGINT and SIGTSTP
/// are forwarded to the foreground job, SIGQUIT ends the shell.
pub fn spawn_sig_handler(control: Arc<JobControl>) -> Result<()> {
    let mut signals = Signals::new([
        Signal::SIGCHLD as c_int,
        Signal::SIGINT as c_int,
        Signal::SIGTSTP as c_int,
        Signal::SIGQUIT as c_int,
    ])?;
    std::thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            for sig in signals.forever() {
                let result = match Signal::try_from(sig) {
                    Ok(Signal::SIGCHLD) => control.reap(),
                    Ok(sig @ (Signal::SIGINT | Signal::SIGTSTP)) => control.relay(sig),
                    Ok(Signal::SIGQUIT) => {
                        println!("Terminating after receipt of SIGQUIT signal");
                        std::process::exit(1);
                    }
                    other => {
                        debug!(?other, "unexpected signal");
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    eprintln!("tsh: signal handling failed: {}", e);
                    std::process::exit(1);
                }
            }
        })?;
    Ok(())
}
