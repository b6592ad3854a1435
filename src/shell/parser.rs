#[derive(Debug, PartialEq, Eq)]
pub struct Cmd {
    pub args: Vec<String>,
    pub background: bool, // Trailing `&`
}

/// Splits a command line into arguments.
///
/// Words are separated by whitespace. A word that starts with `'` runs to
/// the next `'` and may contain spaces; an unterminated quote runs to the
/// end of the line. A final `&` word requests background execution.
/// Returns `None` for a blank line.
pub fn parse_cmd(line: &str) -> Option<Cmd> {
    let mut args = Vec::new();
    let mut rest = line.trim_start();
    while !rest.is_empty() {
        let (word, tail) = match rest.strip_prefix('\'') {
            Some(quoted) => quoted.split_once('\'').unwrap_or((quoted, "")),
            None => rest
                .split_once(char::is_whitespace)
                .unwrap_or((rest, "")),
        };
        args.push(word.to_string());
        rest = tail.trim_start();
    }

    let background = args.last().map_or(false, |last| last == "&");
    if background {
        args.pop();
    }
    if args.is_empty() {
        return None;
    }
    Some(Cmd { args, background })
}
