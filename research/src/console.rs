//! Interactive variant: asks for a topic, streams the agents' output and
//! writes the report to a fixed path.

use crate::research::{Orchestrator, RunOptions};
use std::path::PathBuf;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const DEFAULT_OUTPUT: &str = "Final_Research_Report.pdf";
pub const PROMPT: &str = "What domain are you looking to perform a research in? ";

/// Prompts on `output` and reads one line. `None` on end of input or a blank line.
pub async fn read_topic<R, W>(input: &mut R, output: &mut W) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(PROMPT.as_bytes()).await?;
    output.flush().await?;

    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Ok(None);
    }

    let topic = line.trim();
    Ok((!topic.is_empty()).then(|| topic.to_string()))
}

pub async fn run<R, W>(
    orchestrator: &Orchestrator,
    report: PathBuf,
    input: &mut R,
    output: &mut W,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let Some(topic) = read_topic(input, output).await? else {
        output.write_all(b"No topic given, nothing to do.\n").await?;
        return Ok(());
    };

    let options = RunOptions {
        report_path: Some(report),
        echo: true,
    };

    let message = match orchestrator.run(&topic, options).await {
        Ok(report) => format!(
            "\nSuccess! Report saved to {} ({} of {} papers downloaded).\n",
            report.pdf_path.display(),
            report.downloaded,
            report.paper_titles.len()
        ),
        Err(err) => format!("\nResearch failed: {}\n", err),
    };
    output.write_all(message.as_bytes()).await?;
    output.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_topic() -> io::Result<()> {
        let mut out = Vec::new();
        let topic = read_topic(&mut &b"  graph neural networks \nrest"[..], &mut out).await?;

        assert_eq!(topic.as_deref(), Some("graph neural networks"));
        assert_eq!(out, PROMPT.as_bytes());
        Ok(())
    }

    #[tokio::test]
    async fn test_read_topic_blank_or_eof() -> io::Result<()> {
        let mut out = Vec::new();
        assert_eq!(read_topic(&mut &b"\n"[..], &mut out).await?, None);
        assert_eq!(read_topic(&mut &b""[..], &mut out).await?, None);
        Ok(())
    }
}
