use medrag_core::channel::{Channel, ChannelError, ChannelMessage};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

const PROMPT: &str = "You: ";

/// Line-oriented terminal channel.
#[derive(Debug)]
pub struct CliChannel<R, W> {
    reader: R,
    writer: W,
}

impl CliChannel<BufReader<Stdin>, Stdout> {
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> CliChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    async fn write_all(&mut self, text: &str) -> Result<(), ChannelError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

impl<R, W> Channel for CliChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> Result<Option<ChannelMessage>, ChannelError> {
        self.write_all(PROMPT).await?;
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            self.write_all("\n").await?;
            return Ok(None);
        }
        Ok(Some(ChannelMessage {
            text: line.trim_end_matches(['\r', '\n']).to_owned(),
        }))
    }

    async fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        self.write_all(&format!("{text}\n\n")).await
    }
}
