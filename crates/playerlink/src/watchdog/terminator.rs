use tracing::error;

/// Ends the hosting process after a strict-mode fault.
pub trait Terminator: Send + Sync {
    fn terminate(&self, exit_code: i32);
}

/// Default terminator: exits the current process.
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn terminate(&self, exit_code: i32) {
        error!(exit_code, "terminating process after hung engine call");
        std::process::exit(exit_code);
    }
}
