//! Content-Length framing.
//!
//! Every message is a header block followed by exactly `Content-Length`
//! bytes of body:
//!
//! ```text
//! Content-Length: 42\r\n
//! \r\n
//! {"jsonrpc":"2.0","id":1,"method":"tools/list"}
//! ```
//!
//! Other headers are accepted and ignored. EOF before the first header line
//! is a clean close; EOF anywhere else is [`ChannelError::UnexpectedEof`].

use super::error::ChannelError;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

/// Default upper bound on a single message body.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Upper bound on the header block of a single frame.
const MAX_HEADER_BYTES: usize = 8 * 1024;

pub struct FrameReader<R> {
    reader: BufReader<R>,
    max_frame_bytes: usize,
    line: String,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_frame_bytes,
            line: String::new(),
        }
    }

    /// Read the next frame body.
    ///
    /// Returns `Ok(None)` when the stream ends exactly at a frame boundary.
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, ChannelError> {
        let mut content_length = None;
        let mut header_bytes = 0;
        let mut saw_header = false;

        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await?;
            if read == 0 {
                return if saw_header {
                    Err(ChannelError::UnexpectedEof)
                } else {
                    Ok(None)
                };
            }
            if !self.line.ends_with('\n') {
                return Err(ChannelError::UnexpectedEof);
            }

            header_bytes += read;
            if header_bytes > MAX_HEADER_BYTES {
                return Err(ChannelError::InvalidHeader(format!(
                    "header block exceeds {} bytes",
                    MAX_HEADER_BYTES
                )));
            }

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                if saw_header {
                    break;
                }
                // Blank lines between frames
                continue;
            }
            saw_header = true;

            let (name, value) = trimmed
                .split_once(':')
                .ok_or_else(|| ChannelError::InvalidHeader(trimmed.to_string()))?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                let len = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| ChannelError::InvalidHeader(trimmed.to_string()))?;
                content_length = Some(len);
            }
        }

        let size = content_length.ok_or(ChannelError::MissingContentLength)?;
        if size > self.max_frame_bytes {
            return Err(ChannelError::FrameTooLarge {
                size,
                max: self.max_frame_bytes,
            });
        }

        let mut body = vec![0u8; size];
        self.reader
            .read_exact(&mut body)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => ChannelError::UnexpectedEof,
                _ => ChannelError::Io(e),
            })?;
        Ok(Some(body))
    }
}

pub struct FrameWriter<W> {
    writer: BufWriter<W>,
    max_frame_bytes: usize,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W, max_frame_bytes: usize) -> Self {
        Self {
            writer: BufWriter::new(writer),
            max_frame_bytes,
        }
    }

    /// Write one frame and flush it.
    pub async fn write_frame(&mut self, body: &[u8]) -> Result<(), ChannelError> {
        if body.len() > self.max_frame_bytes {
            return Err(ChannelError::FrameTooLarge {
                size: body.len(),
                max: self.max_frame_bytes,
            });
        }
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        self.writer.write_all(header.as_bytes()).await?;
        self.writer.write_all(body).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), ChannelError> {
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn frames_from(bytes: &[u8], max: usize) -> Vec<Result<Option<Vec<u8>>, String>> {
        let mut reader = FrameReader::new(bytes, max);
        let mut out = Vec::new();
        loop {
            match reader.read_frame().await {
                Ok(Some(body)) => out.push(Ok(Some(body))),
                Ok(None) => {
                    out.push(Ok(None));
                    break;
                }
                Err(e) => {
                    out.push(Err(e.to_string()));
                    break;
                }
            }
        }
        out
    }

    #[tokio::test]
    async fn test_reads_consecutive_frames_then_clean_close() {
        let input = b"Content-Length: 2\r\n\r\n{}Content-Length: 4\r\n\r\nnull";
        let frames = frames_from(input, 1024).await;
        assert_eq!(
            frames,
            vec![
                Ok(Some(b"{}".to_vec())),
                Ok(Some(b"null".to_vec())),
                Ok(None)
            ]
        );
    }

    #[tokio::test]
    async fn test_extra_headers_are_ignored() {
        let input =
            b"Content-Type: application/json\r\ncontent-length: 2\r\n\r\n[]";
        let mut reader = FrameReader::new(&input[..], 1024);
        assert_eq!(reader.read_frame().await.unwrap(), Some(b"[]".to_vec()));
    }

    #[tokio::test]
    async fn test_eof_inside_body_is_an_error() {
        let input = b"Content-Length: 10\r\n\r\n{}";
        let mut reader = FrameReader::new(&input[..], 1024);
        assert!(matches!(
            reader.read_frame().await,
            Err(ChannelError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn test_eof_inside_header_is_an_error() {
        let input = b"Content-Length: 10\r\n";
        let mut reader = FrameReader::new(&input[..], 1024);
        assert!(matches!(
            reader.read_frame().await,
            Err(ChannelError::UnexpectedEof)
        ));
    }

    #[tokio::test]
    async fn test_missing_or_bad_length() {
        let mut reader = FrameReader::new(&b"X-Other: 1\r\n\r\n{}"[..], 1024);
        assert!(matches!(
            reader.read_frame().await,
            Err(ChannelError::MissingContentLength)
        ));

        let mut reader = FrameReader::new(&b"Content-Length: ten\r\n\r\n"[..], 1024);
        assert!(matches!(
            reader.read_frame().await,
            Err(ChannelError::InvalidHeader(_))
        ));

        let mut reader = FrameReader::new(&b"garbage without colon\r\n\r\n"[..], 1024);
        assert!(matches!(
            reader.read_frame().await,
            Err(ChannelError::InvalidHeader(_))
        ));
    }

    #[tokio::test]
    async fn test_oversize_frame_is_rejected() {
        let mut reader = FrameReader::new(&b"Content-Length: 100\r\n\r\n"[..], 10);
        assert!(matches!(
            reader.read_frame().await,
            Err(ChannelError::FrameTooLarge { size: 100, max: 10 })
        ));
    }

    #[tokio::test]
    async fn test_large_frame_is_not_truncated() {
        let body = vec![b'a'; 200_000];
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = FrameWriter::new(client, DEFAULT_MAX_FRAME_BYTES);
        let mut reader = FrameReader::new(server, DEFAULT_MAX_FRAME_BYTES);

        let expected = body.clone();
        let write = tokio::spawn(async move { writer.write_frame(&body).await });
        let read = reader.read_frame().await.unwrap().unwrap();

        write.await.unwrap().unwrap();
        assert_eq!(read.len(), expected.len());
        assert_eq!(read, expected);
    }

    #[tokio::test]
    async fn test_writer_enforces_limit() {
        let mut writer = FrameWriter::new(Vec::new(), 4);
        assert!(matches!(
            writer.write_frame(b"too long").await,
            Err(ChannelError::FrameTooLarge { .. })
        ));
    }
}
