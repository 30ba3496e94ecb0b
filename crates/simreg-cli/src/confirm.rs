//! Yes/no questions to the operator

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::io::{BufRead, BufReader, Stdin, Stdout, Write};

/// Asks the operator a yes/no question
#[async_trait]
pub trait ConfirmationPort: Send {
    async fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Interpret an answer; `None` for anything that is not a clear yes or no
pub fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim() {
        "Y" | "y" | "yes" => Some(true),
        "N" | "n" | "no" => Some(false),
        _ => None,
    }
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<bool> {
    write!(output, "{question} (Y/n) ")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("no answer to `{question}`: input closed");
    }
    match parse_answer(&line) {
        Some(answer) => Ok(answer),
        None => bail!("invalid answer: {}", line.trim()),
    }
}

/// Prompts on a writer and reads the answer from a reader.
///
/// The blocking read runs on the runtime's blocking pool.
pub struct PromptConfirmation<R, W> {
    io: Option<(R, W)>,
}

impl<R, W> PromptConfirmation<R, W>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    pub fn new(input: R, output: W) -> Self {
        Self { io: Some((input, output)) }
    }

    /// The reader and writer back, unless a prompt task panicked with them
    pub fn into_inner(self) -> Option<(R, W)> {
        self.io
    }
}

/// The interactive terminal
pub type StdinConfirmation = PromptConfirmation<BufReader<Stdin>, Stdout>;

impl StdinConfirmation {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

#[async_trait]
impl<R, W> ConfirmationPort for PromptConfirmation<R, W>
where
    R: BufRead + Send + 'static,
    W: Write + Send + 'static,
{
    async fn confirm(&mut self, question: &str) -> Result<bool> {
        let (mut input, mut output) =
            self.io.take().context("prompt streams were lost by an earlier prompt")?;
        let question = question.to_string();
        let (answer, input, output) = tokio::task::spawn_blocking(move || {
            let answer = ask(&mut input, &mut output, &question);
            (answer, input, output)
        })
        .await
        .context("prompt task panicked")?;
        self.io = Some((input, output));
        answer
    }
}

/// Always gives the same answer; for unattended runs and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedConfirmation {
    pub answer: bool,
    pub asked: usize,
}

impl FixedConfirmation {
    pub fn new(answer: bool) -> Self {
        Self { answer, asked: 0 }
    }
}

#[async_trait]
impl ConfirmationPort for FixedConfirmation {
    async fn confirm(&mut self, _question: &str) -> Result<bool> {
        self.asked += 1;
        Ok(self.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn port(input: &str) -> PromptConfirmation<Cursor<Vec<u8>>, Vec<u8>> {
        PromptConfirmation::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn parses_answers() {
        assert_eq!(parse_answer("y\n"), Some(true));
        assert_eq!(parse_answer(" no "), Some(false));
        assert_eq!(parse_answer("maybe"), None);
    }

    #[tokio::test]
    async fn prompt_reads_one_line() {
        let mut port = port("yes\n");
        assert!(port.confirm("Publish?").await.unwrap());

        let (_, out) = port.into_inner().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Publish? (Y/n) ");
    }

    #[tokio::test]
    async fn streams_survive_between_questions() {
        let mut port = port("n\ny\n");
        assert!(!port.confirm("First?").await.unwrap());
        assert!(port.confirm("Second?").await.unwrap());

        let (_, out) = port.into_inner().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "First? (Y/n) Second? (Y/n) ");
    }

    #[tokio::test]
    async fn invalid_or_missing_answer_is_an_error() {
        assert!(port("perhaps\n").confirm("?").await.is_err());
        assert!(port("").confirm("?").await.is_err());
    }
}
