use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::cancel;
use crate::error::EngineError;
use crate::input::{InputError, Prompter, Reply};
use crate::session::Session;
use crate::store::{SessionSnapshot, SessionStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// How an interactive run ended.
#[derive(Debug)]
pub enum Outcome {
    /// Every prompt is answered. The full answer log stays in the store
    /// until the caller has scored it.
    Completed(Session),
    /// Stopped early; the snapshot was written to this path.
    Saved(PathBuf),
}

/// Walks a session prompt by prompt, persisting the answer log as it goes.
pub struct SessionRunner<'a, P: Prompter, S: SessionStore> {
    prompter: &'a mut P,
    store: &'a S,
    interrupted: fn() -> bool,
}

impl<'a, P: Prompter, S: SessionStore> SessionRunner<'a, P, S> {
    pub fn new(prompter: &'a mut P, store: &'a S) -> Self {
        Self {
            prompter,
            store,
            interrupted: cancel::is_cancelled,
        }
    }

    /// Replace the Ctrl+C flag check.
    pub fn with_interrupt_check(mut self, interrupted: fn() -> bool) -> Self {
        self.interrupted = interrupted;
        self
    }

    pub fn run(
        &mut self,
        mut session: Session,
        started_at: DateTime<Utc>,
    ) -> Result<Outcome, RunError> {
        let total = session.catalog().len();

        while !session.is_complete() {
            if (self.interrupted)() {
                warn!("Interrupted, saving progress...");
                return self.stop(&session, started_at);
            }

            let prompt = session.current_prompt()?.clone();
            let reply = match self.prompter.ask(&prompt, prompt.ordinal + 1, total) {
                Ok(reply) => reply,
                Err(InputError::EndOfInput) => {
                    warn!("Input ended before the last prompt, saving progress...");
                    return self.stop(&session, started_at);
                }
                Err(e) => return Err(e.into()),
            };

            let applied = match reply {
                Reply::Quit => return self.stop(&session, started_at),
                Reply::Skip => session.skip(),
                Reply::Answer(answer) => session.answer_and_advance(answer),
            };

            match applied {
                Ok(progress) => {
                    debug!("{} -> {:?}", prompt.id, progress);
                    self.store
                        .save(&SessionSnapshot::capture(&session, started_at))?;
                }
                Err(e) if e.is_recoverable() => self.prompter.reject(&e.to_string())?,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Outcome::Completed(session))
    }

    fn stop(&self, session: &Session, started_at: DateTime<Utc>) -> Result<Outcome, RunError> {
        let path = self
            .store
            .save(&SessionSnapshot::capture(session, started_at))?;
        Ok(Outcome::Saved(path))
    }
}
