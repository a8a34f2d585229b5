//! Newline-delimited transport loop.
//!
//! Reads one JSON object per line, hands it to the [`Dispatcher`], writes one
//! response per line. A bad or oversized frame produces an error response and
//! the loop keeps reading; only I/O failure or EOF ends it.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::jsonrpc::{Response, RpcError};

/// Default ceiling for a single frame; tool arguments may carry whole files.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// Errors that end a serve loop.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("I/O error on protocol stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Counters reported when a serve loop finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub frames: u64,
    pub responses: u64,
    pub rejected: u64,
}

enum Frame {
    Line,
    Oversized,
    Eof,
}

/// JSON-RPC server over any buffered byte stream.
pub struct LineServer {
    dispatcher: Arc<Dispatcher>,
    max_line_bytes: usize,
}

impl LineServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    pub fn with_max_line_bytes(mut self, max: usize) -> Self {
        self.max_line_bytes = max;
        self
    }

    /// Serve over the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> Result<ServeStats, ProtocolError> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve until the reader reaches EOF.
    pub async fn serve<R, W>(
        &self,
        mut reader: R,
        mut writer: W,
    ) -> Result<ServeStats, ProtocolError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(max_line_bytes = self.max_line_bytes, "JSON-RPC server started");
        let mut stats = ServeStats::default();
        let mut buf = Vec::new();

        loop {
            let frame = read_frame(&mut reader, &mut buf, self.max_line_bytes).await?;
            let response = match frame {
                Frame::Eof => break,
                Frame::Oversized => {
                    stats.rejected += 1;
                    warn!(limit = self.max_line_bytes, "Discarded oversized frame");
                    Some(Response::failure(
                        Value::Null,
                        RpcError::invalid_request(format!(
                            "frame exceeds {} bytes",
                            self.max_line_bytes
                        )),
                    ))
                }
                Frame::Line => match std::str::from_utf8(&buf) {
                    Ok(line) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        stats.frames += 1;
                        self.dispatcher.handle_line(line).await
                    }
                    Err(e) => {
                        stats.rejected += 1;
                        Some(Response::failure(Value::Null, RpcError::parse_error(e)))
                    }
                },
            };

            if let Some(response) = response {
                let mut out = serde_json::to_vec(&response)?;
                out.push(b'\n');
                writer.write_all(&out).await?;
                writer.flush().await?;
                stats.responses += 1;
            }
        }

        info!(
            frames = stats.frames,
            responses = stats.responses,
            rejected = stats.rejected,
            "JSON-RPC server stopped"
        );
        Ok(stats)
    }
}

/// Read the next line into `buf` without its terminator, holding at most
/// `max + 1` bytes of it in memory.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let read = (&mut *reader)
        .take(max as u64 + 1)
        .read_until(b'\n', buf)
        .await?;
    if read == 0 {
        return Ok(Frame::Eof);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        return Ok(Frame::Line);
    }

    if buf.len() > max {
        buf.clear();
        discard_line(reader).await?;
        return Ok(Frame::Oversized);
    }

    // Final line without a trailing newline.
    Ok(Frame::Line)
}

/// Skip input up to and including the next newline.
async fn discard_line<R>(reader: &mut R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let (used, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|b| *b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (available.len(), false),
            }
        };
        reader.consume(used);
        if done {
            debug!("Resynchronised after oversized frame");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::{INVALID_REQUEST, PARSE_ERROR};
    use agentgate_core::tool::ToolRegistry;

    fn server(max: usize) -> LineServer {
        let registry = Arc::new(ToolRegistry::new());
        registry.register_fn("echo", "Echo a message back", None, |args| async move {
            Ok(format!("Echo: {}", args["message"].as_str().unwrap_or_default()))
        });
        LineServer::new(Arc::new(Dispatcher::with_default_info(registry))).with_max_line_bytes(max)
    }

    fn responses(out: &[u8]) -> Vec<Response> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn bad_frame_does_not_end_session() {
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\"}\n",
            "this is not json\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"echo\",\"arguments\":{\"message\":\"hi\"}}}\n",
        );
        let mut out = Vec::new();
        let stats = server(DEFAULT_MAX_LINE_BYTES)
            .serve(input.as_bytes(), &mut out)
            .await
            .unwrap();

        let resps = responses(&out);
        assert_eq!(resps.len(), 3);
        assert_eq!(resps[0].id, Value::from(1));
        assert_eq!(resps[1].error.as_ref().unwrap().code, PARSE_ERROR);
        assert_eq!(resps[2].result.as_ref().unwrap()["content"][0]["text"], "Echo: hi");
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.responses, 3);
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_and_skipped() {
        let big = format!(
            "{{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\",\"params\":{{\"name\":\"echo\",\"arguments\":{{\"message\":\"{}\"}}}}}}\n",
            "x".repeat(500)
        );
        let input = format!("{big}{{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}}\n");
        let mut out = Vec::new();
        let stats = server(128).serve(input.as_bytes(), &mut out).await.unwrap();

        let resps = responses(&out);
        assert_eq!(resps.len(), 2);
        assert_eq!(resps[0].error.as_ref().unwrap().code, INVALID_REQUEST);
        assert_eq!(resps[1].id, Value::from(2));
        assert!(resps[1].result.is_some());
        assert_eq!(stats.rejected, 1);
    }

    #[tokio::test]
    async fn last_line_without_newline_is_served() {
        let input = "{\"jsonrpc\":\"2.0\",\"id\":9,\"method\":\"ping\"}";
        let mut out = Vec::new();
        server(DEFAULT_MAX_LINE_BYTES)
            .serve(input.as_bytes(), &mut out)
            .await
            .unwrap();
        let resps = responses(&out);
        assert_eq!(resps.len(), 1);
        assert_eq!(resps[0].id, Value::from(9));
    }

    #[tokio::test]
    async fn invalid_utf8_is_parse_error() {
        let mut input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"".to_vec();
        input.extend_from_slice(&[0xff, 0xfe]);
        input.extend_from_slice(b"\"}\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n");
        let mut out = Vec::new();
        server(DEFAULT_MAX_LINE_BYTES)
            .serve(input.as_slice(), &mut out)
            .await
            .unwrap();
        let resps = responses(&out);
        assert_eq!(resps[0].error.as_ref().unwrap().code, PARSE_ERROR);
        assert_eq!(resps[1].id, Value::from(2));
    }

    #[tokio::test]
    async fn serves_over_a_duplex_pipe() {
        let (client, server_side) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server_side);
        let srv = server(DEFAULT_MAX_LINE_BYTES);

        let serving = tokio::spawn(async move {
            srv.serve(BufReader::new(server_read), server_write).await
        });

        let (client_read, mut client_write) = tokio::io::split(client);
        client_write
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n")
            .await
            .unwrap();
        let mut lines = BufReader::new(client_read).lines();
        let first = lines.next_line().await.unwrap().unwrap();
        let resp: Response = serde_json::from_str(&first).unwrap();
        assert_eq!(resp.result.unwrap()["tools"][0]["name"], "echo");

        client_write.shutdown().await.unwrap();
        let stats = serving.await.unwrap().unwrap();
        assert_eq!(stats.responses, 1);
    }
}
