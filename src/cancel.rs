//! Ctrl+C handling for interactive assessments.
//!
//! The handler only raises a flag; the runner checks it between prompts and
//! stores the session so it can be resumed.

use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

pub fn is_cancelled() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Clear the flag, e.g. before starting another session.
pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

/// Register the Ctrl+C handler. Registering twice is harmless.
pub fn register_handler() {
    let _ = ctrlc::set_handler(move || {
        INTERRUPTED.store(true, Ordering::SeqCst);
        eprintln!("\nInterrupted. Your answers so far will be saved; press Enter to finish.");
    });
}
