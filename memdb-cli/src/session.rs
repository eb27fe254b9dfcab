//! Line-oriented command session
//!
//! Reads command lines from any [`BufRead`], executes each against a store and
//! writes one response line per command. Blank lines are skipped; `QUIT` or
//! `EXIT` (any case) ends the session early.

use std::io::{self, BufRead, Write};

use memdb::{CollectionEvictionPolicy, ScalarEvictionPolicy, Store};

use crate::command::execute_line;

/// Returns `true` for the session-ending keywords.
pub fn is_quit(line: &str) -> bool {
    line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit")
}

/// Runs every line of `input` and returns the number of commands executed.
///
/// When `prompt` is set it is written before each line is read.
pub fn run_session<P, C, R, W>(
    store: &Store<P, C>,
    input: R,
    mut output: W,
    prompt: Option<&str>,
) -> io::Result<usize>
where
    P: ScalarEvictionPolicy,
    C: CollectionEvictionPolicy,
    R: BufRead,
    W: Write,
{
    let mut executed = 0;
    let mut lines = input.lines();

    loop {
        if let Some(prompt) = prompt {
            write!(output, "{prompt}")?;
            output.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if is_quit(line) {
            break;
        }

        let response = execute_line(store, line);
        writeln!(output, "{}", response.text)?;
        executed += 1;
    }

    output.flush()?;
    Ok(executed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memdb::Store;
    use std::io::Cursor;

    fn session(script: &str) -> (usize, String) {
        let store = Store::new();
        let mut out = Vec::new();
        let executed = run_session(&store, Cursor::new(script), &mut out, None).unwrap();
        (executed, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_one_response_per_command() {
        let (executed, out) = session("SET a 1\nINCR a\nGET a\nZADD z 1 m\nZRANGE z 0 0\n");
        assert_eq!(executed, 5);
        assert_eq!(out, "OK\n2\n2\nOK\nm\n");
    }

    #[test]
    fn test_blank_lines_skipped_and_quit_stops() {
        let (executed, out) = session("\n   \nSET a 1\nquit\nGET a\n");
        assert_eq!(executed, 1);
        assert_eq!(out, "OK\n");
    }

    #[test]
    fn test_errors_written_inline() {
        let (_, out) = session("BOGUS\nGET a\n");
        assert_eq!(out, "Unknown command: BOGUS\n(nil)\n");
    }

    #[test]
    fn test_prompt_written_before_each_read() {
        let store = Store::new();
        let mut out = Vec::new();
        run_session(&store, Cursor::new("DBSIZE\n"), &mut out, Some("> ")).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "> 0\n> ");
    }
}
