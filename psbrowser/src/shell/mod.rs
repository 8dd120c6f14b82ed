//! The interactive shell: prompt, parse, validate, dispatch, wait, repeat.

use std::io::Write;

use anyhow::{Result, bail};
use tracing::debug;

use crate::error::RegistryError;
use crate::parser::{self, ParsedInput};
use crate::registry::CommandRegistry;
use crate::router::{Resolution, Router};
use crate::session::Session;
use crate::transport::Transport;

mod commands;
mod input;

pub use commands::{Handler, default_registry};
pub use input::{LineEditor, LineSource, ScriptedInput};

pub struct Shell<T, W> {
    registry: CommandRegistry<Handler>,
    session: Session,
    router: Router<T>,
    out: W,
}

impl<T: Transport, W: Write> Shell<T, W> {
    pub fn new(session: Session, router: Router<T>, out: W) -> Self {
        Self {
            registry: default_registry(),
            session,
            router,
            out,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn router(&self) -> &Router<T> {
        &self.router
    }

    pub fn registry(&self) -> &CommandRegistry<Handler> {
        &self.registry
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn prompt(&self) -> String {
        self.session.prompt()
    }

    /// Read and execute lines until end of input.
    ///
    /// Fails when the output cannot be written or the connection is lost.
    pub async fn run<L: LineSource>(&mut self, input: &mut L) -> Result<()> {
        loop {
            let prompt = self.prompt();
            let Some(line) = input.read_line(&prompt)? else {
                writeln!(self.out)?;
                self.out.flush()?;
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }
            input.add_history(&line);

            let resolution = self.execute(&line).await?;
            self.out.flush()?;
            if resolution == Resolution::Disconnected {
                bail!("connection to the pub/sub service was lost");
            }
        }
    }

    /// Execute one non-empty input line and wait until the engine is idle.
    pub async fn execute(&mut self, line: &str) -> Result<Resolution> {
        let ParsedInput { command, params } = match parser::parse(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                writeln!(self.out, "Parse error: {e}")?;
                return Ok(Resolution::Immediate);
            }
        };

        let handler = match self.registry.resolve(&command, params.len()) {
            Ok(descriptor) => descriptor.handler,
            Err(e) => {
                writeln!(self.out, "{e}")?;
                if let RegistryError::CommandNotFound(name) = &e
                    && let Some(suggestion) = self.registry.suggest(name)
                {
                    writeln!(self.out, "Did you mean '{suggestion}'?")?;
                }
                return Ok(Resolution::Immediate);
            }
        };

        debug!(command = command.as_str(), params = params.len(), "dispatch");
        self.dispatch(handler, &command, &params)?;
        let resolution = self.router.complete(&mut self.session, &mut self.out).await?;
        Ok(resolution)
    }
}
