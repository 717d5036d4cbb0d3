//! Interactive startup question
//!
//! The crawler itself only takes a `use_cache` flag; this module is the
//! optional stdin adapter that asks for it.

use std::io::{self, BufRead, Write};

const QUESTION: &str = "Do you want to use cached files when possible? [Y/n] ";

/// Interprets one answer line
///
/// Empty input and `y` mean yes, `n` means no (case-insensitive, surrounding
/// whitespace ignored). Anything else is `None`.
pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "y" => Some(true),
        "n" => Some(false),
        _ => None,
    }
}

/// Asks on stdout until a valid answer is read from stdin
pub fn ask_use_cache() -> io::Result<bool> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    ask(&mut stdin.lock(), &mut stdout.lock())
}

/// Prompt loop over arbitrary reader/writer
///
/// End of input counts as the default answer.
pub fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<bool> {
    loop {
        write!(output, "{}", QUESTION)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(true);
        }

        match parse_answer(&line) {
            Some(answer) => return Ok(answer),
            None => writeln!(output, "Invalid option \"{}\". Try again.", line.trim())?,
        }
    }
}
