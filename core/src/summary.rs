use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::io::{self, Write};
use std::process::{Command as Process, Stdio};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// Produces a short description of a page.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, title: &str, text: &str) -> Result<String>;
}

/// First `words` words of the page text.
#[derive(Debug, Clone)]
pub struct Truncate {
    pub words: usize,
}

impl Default for Truncate {
    fn default() -> Self { Self { words: 20 } }
}

impl Truncate {
    pub fn apply(&self, text: &str) -> String {
        let cleaned = clean(text);
        let mut words = cleaned.split(' ');
        let head: Vec<&str> = words.by_ref().take(self.words).collect();
        let mut out = head.join(" ");
        if words.next().is_some() {
            out.push_str("...");
        }
        out
    }
}

impl Summarizer for Truncate {
    fn summarize(&self, _title: &str, text: &str) -> Result<String> {
        Ok(self.apply(text))
    }
}

/// Pipes the page text to an external program and reads the summary from its
/// stdout.
#[derive(Debug, Clone)]
pub struct Command {
    program: String,
    args: Vec<String>,
}

impl Command {
    /// Parse a whitespace-separated command line.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self { program, args: parts.collect() })
    }
}

impl Summarizer for Command {
    fn summarize(&self, _title: &str, text: &str) -> Result<String> {
        let mut child = Process::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawning summarizer `{}`", self.program))?;
        // The child may fill its stdout before it has read all of stdin, so the
        // page is fed from a separate thread while we drain stdout.
        let stdin = child.stdin.take();
        let (output, written) = std::thread::scope(|s| {
            let writer = s.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(text.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            (output, writer.join())
        });
        let output = output?;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(err)) if err.kind() == io::ErrorKind::BrokenPipe => {}
            Ok(Err(err)) => return Err(err).context("writing page text to summarizer"),
            Err(_) => bail!("summarizer input thread panicked"),
        }
        if !output.status.success() {
            bail!("summarizer `{}` exited with {}", self.program, output.status);
        }
        let summary = clean(&String::from_utf8_lossy(&output.stdout));
        if summary.is_empty() {
            bail!("summarizer `{}` produced no output", self.program);
        }
        Ok(summary)
    }
}

/// Ask `summarizer` and degrade to truncation when it fails.
pub fn summarize_or_truncate(summarizer: &dyn Summarizer, fallback: &Truncate, title: &str, text: &str) -> String {
    match summarizer.summarize(title, text) {
        Ok(summary) => summary,
        Err(err) => {
            tracing::warn!(error = %err, "summarizer failed, truncating");
            fallback.apply(text)
        }
    }
}

pub fn clean(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Title and summary of one indexed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocSummary {
    pub title: String,
    pub summary: String,
}

impl DocSummary {
    pub fn new(title: &str, summary: &str) -> Self {
        Self { title: clean(&title.replace(':', "-")), summary: clean(summary) }
    }

    /// `<title> : <summary>`. Titles never carry a colon, so the first colon
    /// is always the separator.
    pub fn encode(&self) -> String {
        format!("{} : {}", self.title, self.summary)
    }

    pub fn decode(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((title, summary)) => Self { title: title.trim().to_string(), summary: summary.trim().to_string() },
            None => Self { title: String::new(), summary: raw.trim().to_string() },
        }
    }
}
