use crate::config::RunnerTemplate;
use std::ffi::OsString;
use std::path::Path;
use std::process::{Child, Command};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use thiserror::Error;

const EXIT_POLL: Duration = Duration::from_millis(200);

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("a cartridge is already running")]
    Busy,
    #[error("no cartridge running")]
    NotRunning,
    #[error("failed to kill runner: {0}")]
    Kill(std::io::Error),
}

/// Substitute the cartridge path for every `{cart}` placeholder.
fn expand_args(tmpl: &RunnerTemplate, cart: &Path) -> Vec<OsString> {
    tmpl.args
        .iter()
        .map(|a| {
            if a == "{cart}" {
                cart.as_os_str().to_owned()
            } else {
                OsString::from(a)
            }
        })
        .collect()
}

/// Owns the runner child process and its completion signal.
///
/// `start` spawns the process and a reaper thread; the UI thread polls
/// `finished` once per frame and can `kill` at any time. One cartridge at a
/// time: starting while a child is alive is refused.
pub struct Runner {
    child: Arc<Mutex<Option<Child>>>,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
}

impl Runner {
    pub fn new() -> Self {
        let (done_tx, done_rx) = channel();
        Runner {
            child: Arc::new(Mutex::new(None)),
            done_tx,
            done_rx,
        }
    }

    pub fn start(&self, tmpl: &RunnerTemplate, cart: &Path) -> Result<(), LaunchError> {
        let mut slot = self.child.lock().map_err(|_| LaunchError::Busy)?;
        if slot.is_some() {
            return Err(LaunchError::Busy);
        }

        let child = Command::new(&tmpl.program)
            .args(expand_args(tmpl, cart))
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: tmpl.program.clone(),
                source,
            })?;
        log::info!(
            "launched {} (pid {}) for {}",
            tmpl.program,
            child.id(),
            cart.display()
        );
        *slot = Some(child);
        drop(slot);

        let child = Arc::clone(&self.child);
        let tx = self.done_tx.clone();
        thread::spawn(move || {
            reap(&child);
            let _ = tx.send(());
        });
        Ok(())
    }

    /// True once the runner has exited since the last call.
    pub fn finished(&self) -> bool {
        self.done_rx.try_recv().is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.child.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Signal the child to die; the reaper thread collects the exit.
    pub fn kill(&self) -> Result<(), LaunchError> {
        let mut slot = self.child.lock().map_err(|_| LaunchError::NotRunning)?;
        match slot.as_mut() {
            Some(child) => child.kill().map_err(LaunchError::Kill),
            None => Err(LaunchError::NotRunning),
        }
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

// Poll instead of blocking on wait() so the UI thread can lock the slot and
// kill between samples.
fn reap(slot: &Arc<Mutex<Option<Child>>>) {
    loop {
        {
            let Ok(mut guard) = slot.lock() else { return };
            let Some(child) = guard.as_mut() else { return };
            match child.try_wait() {
                Ok(Some(status)) => {
                    log::info!("runner exited: {}", status);
                    guard.take();
                    return;
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("waiting on runner failed: {}", e);
                    guard.take();
                    return;
                }
            }
        }
        thread::sleep(EXIT_POLL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tmpl(program: &str, args: &[&str]) -> RunnerTemplate {
        RunnerTemplate {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn cart_placeholder_is_substituted() {
        let t = tmpl("pico8", &["-run", "{cart}", "-x"]);
        let args = expand_args(&t, &PathBuf::from("/carts/celeste.p8"));
        assert_eq!(
            args,
            vec![
                OsString::from("-run"),
                OsString::from("/carts/celeste.p8"),
                OsString::from("-x"),
            ]
        );
    }

    #[test]
    fn kill_without_child_reports_not_running() {
        let runner = Runner::new();
        assert!(matches!(runner.kill(), Err(LaunchError::NotRunning)));
    }

    #[test]
    fn missing_program_fails_to_start() {
        let runner = Runner::new();
        let t = tmpl("pocket8-no-such-runner-binary", &["{cart}"]);
        let err = runner.start(&t, &PathBuf::from("x.p8")).unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
        assert!(!runner.is_running());
        assert!(!runner.finished());
    }

    #[test]
    fn completed_child_signals_finished() {
        let runner = Runner::new();
        runner
            .start(&tmpl("true", &[]), &PathBuf::from("x.p8"))
            .unwrap();
        let mut done = false;
        for _ in 0..50 {
            if runner.finished() {
                done = true;
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }
        assert!(done);
        assert!(!runner.is_running());
    }

    #[test]
    fn second_start_while_running_is_refused() {
        let runner = Runner::new();
        runner
            .start(&tmpl("sleep", &["5"]), &PathBuf::from("x.p8"))
            .unwrap();
        assert!(matches!(
            runner.start(&tmpl("sleep", &["5"]), &PathBuf::from("y.p8")),
            Err(LaunchError::Busy)
        ));
        runner.kill().unwrap();
    }
}
