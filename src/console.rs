use std::io::Write;

use anyhow::{Context, Result};
use colored::Colorize;
use thiserror::Error;

use crate::chapter_range::SelectionError;

/// An error that ends the program with a message for the user and an optional
/// tip on how to fix it.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct Abort {
    pub message: String,
    pub tip: Option<String>,
}

impl Abort {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tip: None,
        }
    }

    pub fn with_tip(mut self, tip: impl Into<String>) -> Self {
        self.tip = Some(tip.into());
        self
    }
}

const NETWORK_TIP: &str = "Are you connected to Internet?\n\
You can use offline mode (using your already downloaded chapters) with --cache";

/// Prints an error the way the user should see it, with the most helpful tip
/// found along its chain.
pub fn report(err: &anyhow::Error) {
    eprintln!("{}", err.to_string().red().bold());
    for cause in err.chain().skip(1) {
        eprintln!("{}", format!("  caused by: {}", cause).red());
    }
    if let Some(tip) = tip(err) {
        eprintln!("{}", tip.dimmed());
    }
}

fn tip(err: &anyhow::Error) -> Option<String> {
    for cause in err.chain() {
        if let Some(abort) = cause.downcast_ref::<Abort>() {
            if let Some(tip) = &abort.tip {
                return Some(tip.clone());
            }
        }
        if let Some(selection) = cause.downcast_ref::<SelectionError>() {
            return Some(selection.hint().to_string());
        }
        if let Some(request) = cause.downcast_ref::<reqwest::Error>() {
            if request.is_connect() || request.is_timeout() {
                return Some(NETWORK_TIP.to_string());
            }
        }
    }
    None
}

/// Shows a question and waits for the user to press enter.
pub async fn confirm(question: &str) -> Result<()> {
    print!("{} ", question.magenta().bold());
    std::io::stdout().flush()?;
    // A dedicated thread, so Ctrl+C can still end the program while waiting.
    tokio::task::spawn_blocking(|| {
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer).map(|_| ())
    })
    .await?
    .context("Unable to read the answer")
}

pub fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chapter_range::{parse_selection, ChapterNumber, IntervalFormat, CHAPTERS_FORMAT};

    #[test]
    fn abort_tip_is_reported() {
        let err = anyhow::Error::new(
            Abort::new("Please download those chapters first.")
                .with_tip("Try again this command without --cache"),
        );
        assert_eq!(err.to_string(), "Please download those chapters first.");
        assert_eq!(tip(&err).as_deref(), Some("Try again this command without --cache"));
    }

    #[test]
    fn selection_hint_survives_context() {
        let err = parse_selection("x", ChapterNumber::ZERO, &IntervalFormat::SELECTION)
            .context("Reading --chapters")
            .unwrap_err();
        assert_eq!(tip(&err).as_deref(), Some(CHAPTERS_FORMAT));
    }

    #[test]
    fn plain_errors_have_no_tip() {
        assert_eq!(tip(&anyhow::anyhow!("boom")), None);
    }

    #[test]
    fn plurals() {
        assert_eq!(plural(1), "");
        assert_eq!(plural(0), "s");
        assert_eq!(plural(3), "s");
    }
}
