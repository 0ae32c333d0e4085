//! Interactive prompts for the `batch-fetch` binary.
//!
//! Generic over reader and writer so the re-prompt loop can be tested
//! without a terminal.

use crate::config::Parallelism;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Question asked for the input file
pub const PATH_PROMPT: &str =
    "Please enter path to a file. If an entry does not exist or is not a file, default file will be used: ";

const PARALLELISM_PROMPT: &str =
    "How many parallel processes would you like to initiate? Available range: from 4 to 32. ";
const OUT_OF_RANGE_PROMPT: &str =
    "Number of parallel processes should be in the range between 4 and 32. ";
const NOT_A_NUMBER_PROMPT: &str =
    "The input doesn't appear to be a number. Please enter number between 4 and 32. ";

/// Print `question` and return the answer without its line terminator
pub fn ask<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> std::io::Result<String> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "input closed before an answer was given",
        ));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Ask for the parallelism until a number in [4, 32] is entered
pub fn ask_parallelism<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> std::io::Result<Parallelism> {
    let mut question = PARALLELISM_PROMPT;
    loop {
        let answer = ask(input, output, question)?;
        match answer.trim().parse::<usize>() {
            Ok(value) => match Parallelism::new(value) {
                Ok(parallelism) => return Ok(parallelism),
                Err(_) => question = OUT_OF_RANGE_PROMPT,
            },
            Err(_) => question = NOT_A_NUMBER_PROMPT,
        }
    }
}

/// Use `answer` as the input path if it names a regular file, else `fallback`
pub fn resolve_input_path(answer: &str, fallback: &Path) -> PathBuf {
    let candidate = Path::new(answer.trim());
    if !answer.trim().is_empty() && candidate.is_file() {
        candidate.to_path_buf()
    } else {
        tracing::info!(
            requested = %answer.trim(),
            fallback = %fallback.display(),
            "Using default input file"
        );
        fallback.to_path_buf()
    }
}
