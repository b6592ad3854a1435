use std::{
    io::{self, BufRead},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use thread::{spawn_sig_handler, Flow, JobControl, Worker};
use tracing::debug;

use crate::config::Config;

mod parser;
mod thread;

const PROMPT: &str = "tsh> ";

pub(crate) fn syscall<F, T>(f: F) -> Result<T, nix::Error>
where
    F: Fn() -> Result<T, nix::Error>,
{
    loop {
        match f() {
            Err(nix::errno::Errno::EINTR) => continue,
            other => return other,
        }
    }
}

/// Where command lines come from.
enum Input {
    /// Line editor with prompt and history.
    Interactive {
        editor: rustyline::Editor<()>,
        history: Option<PathBuf>,
    },
    /// Plain reader without prompt, for drivers feeding stdin.
    Scripted(io::StdinLock<'static>),
}

impl Input {
    fn open(config: &Config) -> Result<Self> {
        if !config.emit_prompt {
            return Ok(Input::Scripted(io::stdin().lock()));
        }
        let mut editor = rustyline::Editor::<()>::new()?;
        if let Some(path) = &config.history {
            if let Err(e) = editor.load_history(path) {
                debug!(path = %path.display(), "unable to load history: {}", e);
            }
        }
        Ok(Input::Interactive {
            editor,
            history: config.history.clone(),
        })
    }

    /// Next line, `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        match self {
            Input::Scripted(stdin) => {
                let mut line = String::new();
                let n = stdin.read_line(&mut line).context("reading standard input")?;
                Ok((n > 0).then_some(line))
            }
            Input::Interactive { editor, .. } => loop {
                match editor.readline(PROMPT) {
                    Ok(line) => {
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            editor.add_history_entry(trimmed);
                        }
                        return Ok(Some(line));
                    }
                    // Ctrl-C at the prompt discards the line
                    Err(ReadlineError::Interrupted) => continue,
                    Err(ReadlineError::Eof) => return Ok(None),
                    Err(e) => return Err(e.into()),
                }
            },
        }
    }

    fn close(&mut self) {
        if let Input::Interactive {
            editor,
            history: Some(path),
        } = self
        {
            if let Err(e) = editor.save_history(path) {
                eprintln!("tsh: Unable to save history: {}", e);
            }
        }
    }
}

#[derive(Debug)]
pub struct Shell {
    config: Config,
}

impl Shell {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Read-eval loop. Returns on end of input or `quit`.
    pub fn run(&self) -> Result<()> {
        let control = Arc::new(JobControl::new(self.config.verbose));
        spawn_sig_handler(Arc::clone(&control)).context("installing signal handlers")?;
        let mut worker = Worker::new(control);

        let mut input = Input::open(&self.config)?;
        let result = loop {
            let line = match input.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };
            match worker.eval(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        input.close();
        result
    }
}
