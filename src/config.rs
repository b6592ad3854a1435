//! Startup flags.

use std::path::PathBuf;

use thiserror::Error;

const HISTORY_FILE: &str = ".tsh_history";

pub const USAGE: &str = "\
Usage: tsh [-hvp]
   -h   print this message
   -v   print additional diagnostic information
   -p   do not emit a command prompt";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("invalid option -- '{0}'")]
    UnknownFlag(char),
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub emit_prompt: bool,
    pub verbose: bool,
    pub history: Option<PathBuf>, // Only used with a prompt
}

impl Default for Config {
    fn default() -> Self {
        Config {
            emit_prompt: true,
            verbose: false,
            history: default_history(),
        }
    }
}

/// What `main` should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Startup {
    Run(Config),
    Help,
}

impl Config {
    /// Parses getopt-style flags (`-v -p`, `-vp`). The program name must
    /// already be skipped.
    pub fn from_args<I, S>(args: I) -> Result<Startup, UsageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Config::default();
        for arg in args {
            let arg = arg.as_ref();
            let Some(flags) = arg.strip_prefix('-').filter(|f| !f.is_empty()) else {
                return Err(UsageError::UnexpectedArgument(arg.to_string()));
            };
            for flag in flags.chars() {
                match flag {
                    'h' => return Ok(Startup::Help),
                    'v' => config.verbose = true,
                    'p' => config.emit_prompt = false,
                    other => return Err(UsageError::UnknownFlag(other)),
                }
            }
        }
        Ok(Startup::Run(config))
    }
}

fn default_history() -> Option<PathBuf> {
    let mut path = dirs::home_dir()?;
    path.push(HISTORY_FILE);
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn run(args: &[&str]) -> Config {
        match Config::from_args(args).unwrap() {
            Startup::Run(config) => config,
            Startup::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn defaults() {
        let config = run(&[]);
        assert!(config.emit_prompt);
        assert!(!config.verbose);
    }

    #[rstest]
    #[case(&["-p"], false, false)]
    #[case(&["-v"], true, true)]
    #[case(&["-vp"], false, true)]
    #[case(&["-p", "-v"], false, true)]
    fn flags(#[case] args: &[&str], #[case] prompt: bool, #[case] verbose: bool) {
        let config = run(args);
        assert_eq!(config.emit_prompt, prompt);
        assert_eq!(config.verbose, verbose);
    }

    #[rstest]
    #[case(&["-h"])]
    #[case(&["-vh"])]
    #[case(&["-p", "-h", "-x"])]
    fn help_wins(#[case] args: &[&str]) {
        assert_eq!(Config::from_args(args), Ok(Startup::Help));
    }

    #[rstest]
    #[case(&["-x"], UsageError::UnknownFlag('x'))]
    #[case(&["-px"], UsageError::UnknownFlag('x'))]
    #[case(&["script.tsh"], UsageError::UnexpectedArgument("script.tsh".into()))]
    #[case(&["-"], UsageError::UnexpectedArgument("-".into()))]
    fn usage_errors(#[case] args: &[&str], #[case] err: UsageError) {
        assert_eq!(Config::from_args(args), Err(err));
    }
}
