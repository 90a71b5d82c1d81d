use crate::Result;
use crate::callbacks::Callback;
use crate::llm::Message;
use async_trait::async_trait;
use std::io::Write;

/// Streams the agent transcript to a writer, one step at a time.
///
/// Only messages that were not written in a previous step are emitted. If the
/// history shrinks, the whole history is written again after a marker.
pub struct MessageLogger<W: Write + Send> {
    writer: W,
    written: usize,
    step: u32,
    include_prompts: bool,
}

impl<W: Write + Send> MessageLogger<W> {
    pub fn new(name: &str, mut writer: W) -> Result<Box<Self>> {
        write!(writer, "## {}\n\n", name)?;

        Ok(Box::new(Self {
            writer,
            written: 0,
            step: 0,
            include_prompts: true,
        }))
    }

    /// Skip system and user messages, leaving only what the agent produced.
    pub fn agent_output_only(mut self: Box<Self>) -> Box<Self> {
        self.include_prompts = false;
        self
    }

    fn display_messages(&mut self, messages: &[Message]) -> Result<()> {
        write!(self.writer, "### Step {}\n\n", self.step)?;

        for message in messages {
            if !self.include_prompts && matches!(message, Message::System(_) | Message::User(_)) {
                continue;
            }
            write!(self.writer, "{}", message)?;
        }

        writeln!(self.writer, "---")?;

        Ok(())
    }

    fn display_history_cleared(&mut self) -> Result<()> {
        write!(self.writer, "## [HISTORY CLEARED]\n\n")?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: Write + Send> Callback for MessageLogger<W> {
    async fn call(&mut self, messages: Vec<Message>) -> Result<Vec<Message>> {
        if messages.len() < self.written {
            self.display_history_cleared()?;
            self.display_messages(&messages)?;
        } else {
            self.display_messages(&messages[self.written..])?;
        }

        self.writer.flush()?;

        self.step += 1;
        self.written = messages.len();

        Ok(messages)
    }
}
