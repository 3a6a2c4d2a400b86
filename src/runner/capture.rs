// file: src/runner/capture.rs
// version: 1.1.0
// guid: 8d21f6a4-93ce-47b0-ae58-1f2b60c47d93

//! Child output capture
//!
//! Each child pipe is drained by its own task into a per-stream log file.
//! Reads are raw byte chunks rather than lines, so the files hold exactly
//! what the child wrote, including partial lines, carriage returns and
//! invalid UTF-8.

use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const CHUNK_SIZE: usize = 8192;

/// Open a capture file, truncating any previous contents
pub async fn open_capture_file(path: &Path) -> std::io::Result<File> {
    File::create(path).await
}

/// Drain `reader` to EOF, appending every chunk to `file` and, when an
/// echo writer is given, mirroring the raw bytes to it. Returns the total
/// number of bytes captured. Each chunk is flushed as it lands, so even
/// a pump cut off mid-stream leaves every chunk it read on disk.
pub async fn pump_stream<R, W>(
    mut reader: R,
    mut file: File,
    mut echo: Option<W>,
) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let bytes_read = reader.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read]).await?;
        file.flush().await?;
        if let Some(echo) = echo.as_mut() {
            echo.write_all(&buffer[..bytes_read]).await?;
            echo.flush().await?;
        }

        total += bytes_read as u64;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_pump_captures_bytes_exactly() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.log");
        let file = open_capture_file(&path).await.unwrap();
        let input: &[u8] = b"line one\npartial line without newline";

        // Act
        let total = pump_stream(input, file, None::<tokio::io::Sink>)
            .await
            .unwrap();

        // Assert
        assert_eq!(total, input.len() as u64);
        assert_eq!(std::fs::read(&path).unwrap(), input);
    }

    #[tokio::test]
    async fn test_pump_preserves_invalid_utf8() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.log");
        let file = open_capture_file(&path).await.unwrap();
        let input: &[u8] = &[0xff, 0xfe, b'o', b'k', 0x00];

        // Act
        let total = pump_stream(input, file, None::<tokio::io::Sink>)
            .await
            .unwrap();

        // Assert
        assert_eq!(total, 5);
        assert_eq!(std::fs::read(&path).unwrap(), input);
    }

    #[tokio::test]
    async fn test_pump_echoes_to_writer() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.log");
        let file = open_capture_file(&path).await.unwrap();
        let input: &[u8] = b"echoed";
        let mut sink = Vec::new();

        // Act
        pump_stream(input, file, Some(&mut sink)).await.unwrap();

        // Assert
        assert_eq!(sink, input);
        assert_eq!(std::fs::read(&path).unwrap(), input);
    }

    #[tokio::test]
    async fn test_pump_handles_empty_stream() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.log");
        let file = open_capture_file(&path).await.unwrap();

        // Act
        let total = pump_stream(&b""[..], file, None::<tokio::io::Sink>)
            .await
            .unwrap();

        // Assert
        assert_eq!(total, 0);
        assert_eq!(std::fs::read(&path).unwrap().len(), 0);
    }
}
