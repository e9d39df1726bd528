//! Line-oriented question loop.

use anyhow::Result;
use console::Term;
use sre_pipeline::AnswerPipeline;
use tokio::io::{AsyncBufReadExt as _, BufReader, stdin};

use crate::handlers::answer_and_render;
use crate::render;

/// What a line of user input asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'line> {
    /// Blank or whitespace-only line
    Blank,
    /// `exit` or `quit`
    Quit,
    /// A question to answer, as typed
    Question(&'line str),
}

impl<'line> Input<'line> {
    /// Classifies one line, without its trailing newline.
    pub fn parse(line: &'line str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Self::Blank
        } else if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            Self::Quit
        } else {
            Self::Question(line)
        }
    }
}

/// Answers questions read from stdin until EOF or a quit command.
///
/// A failed run is reported and the loop carries on.
///
/// # Errors
/// Returns an error if stdin cannot be read or the terminal cannot be written
pub async fn run(pipeline: &AnswerPipeline) -> Result<()> {
    let out = Term::stdout();
    let err = Term::stderr();
    render::banner(&out)?;

    let mut lines = BufReader::new(stdin()).lines();
    loop {
        render::prompt(&out)?;
        let Some(line) = lines.next_line().await? else {
            tracing::debug!("stdin closed, ending session");
            out.write_line("")?;
            break;
        };

        match Input::parse(&line) {
            Input::Blank => render::empty_question(&err)?,
            Input::Quit => break,
            Input::Question(question) => {
                answer_and_render(pipeline, question, &out, &err).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines() {
        assert_eq!(Input::parse(""), Input::Blank);
        assert_eq!(Input::parse("   \t"), Input::Blank);
    }

    #[test]
    fn test_quit_commands() {
        assert_eq!(Input::parse("exit"), Input::Quit);
        assert_eq!(Input::parse("  QUIT "), Input::Quit);
    }

    #[test]
    fn test_question_kept_verbatim() {
        assert_eq!(
            Input::parse("  why is the queue backed up? "),
            Input::Question("  why is the queue backed up? ")
        );
        assert_eq!(Input::parse("exit code 137?"), Input::Question("exit code 137?"));
    }
}
