//! Line source: background reader turning the adapter's byte stream into lines
//!
//! The adapter talks in CRLF-terminated text lines, except that `ERXUDP`
//! notifications may carry raw binary payloads. Lines are therefore decoded
//! byte-for-char (ISO-8859-1): every byte maps to exactly one `char`, the
//! text part of the protocol is unaffected and binary payloads can be
//! recovered losslessly with [`line_to_bytes`].

use std::fmt;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the queue between the reader task and the query engine
///
/// The reader task suspends when the queue is full, so lines are never
/// dropped; they wait in the transport's own buffer instead.
pub const LINE_QUEUE_CAPACITY: usize = 4;

/// Lines received from the adapter, in arrival order
///
/// Owns the background task that drains the transport. When the transport
/// reaches EOF or fails, the task ends and [`LineSource::next_line`] returns
/// `None` once the queued lines are consumed.
pub struct LineSource {
    receiver: mpsc::Receiver<String>,
    task: JoinHandle<()>,
}

impl LineSource {
    /// Start draining `reader` on a background task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(LINE_QUEUE_CAPACITY);
        let task = tokio::spawn(drain(reader, sender));
        Self { receiver, task }
    }

    /// Receive the next line, or `None` once the source has closed
    pub async fn next_line(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Check whether the reader task has finished
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl fmt::Debug for LineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineSource")
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

impl Drop for LineSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn drain<R>(reader: R, sender: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if sender.send(decode_line(&buf)).await.is_err() {
                    // Receiver dropped
                    break;
                }
            }
            Err(e) => {
                log::error!(target: "smartmeter::transport", "Error reading from adapter: {}", e);
                break;
            }
        }
    }
}

/// Strip the line terminator and decode byte-for-char
fn decode_line(raw: &[u8]) -> String {
    let mut end = raw.len();
    if end > 0 && raw[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && raw[end - 1] == b'\r' {
        end -= 1;
    }
    raw[..end].iter().map(|&b| b as char).collect()
}

/// Recover the raw bytes of a (part of a) line produced by [`LineSource`]
///
/// Characters outside `U+0000..=U+00FF` cannot come from the line source and
/// yield `None`.
pub fn line_to_bytes(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_lines_in_order() {
        let mock = Builder::new()
            .read(b"EVER 1.2.10\r\nO")
            .read(b"K\r\n")
            .build();
        let mut source = LineSource::spawn(mock);
        assert_eq!(source.next_line().await.as_deref(), Some("EVER 1.2.10"));
        assert_eq!(source.next_line().await.as_deref(), Some("OK"));
        assert_eq!(source.next_line().await, None);
    }

    #[tokio::test]
    async fn test_more_lines_than_queue_capacity() {
        let mut input = Vec::new();
        for i in 0..(LINE_QUEUE_CAPACITY * 3) {
            input.extend_from_slice(format!("LINE {}\r\n", i).as_bytes());
        }
        let mock = Builder::new().read(&input).build();
        let mut source = LineSource::spawn(mock);
        for i in 0..(LINE_QUEUE_CAPACITY * 3) {
            assert_eq!(source.next_line().await, Some(format!("LINE {}", i)));
        }
        assert_eq!(source.next_line().await, None);
    }

    #[tokio::test]
    async fn test_empty_line_and_unterminated_tail() {
        let mock = Builder::new().read(b"\r\nEVENT 22 FE80").build();
        let mut source = LineSource::spawn(mock);
        assert_eq!(source.next_line().await.as_deref(), Some(""));
        assert_eq!(source.next_line().await.as_deref(), Some("EVENT 22 FE80"));
        assert_eq!(source.next_line().await, None);
    }

    #[test]
    fn test_binary_round_trip() {
        let raw = [0x10u8, 0x81, 0x00, 0xFF, 0x7F, 0x80];
        let line = decode_line(&raw);
        assert_eq!(line.chars().count(), raw.len());
        assert_eq!(line_to_bytes(&line).unwrap(), raw.to_vec());
        assert_eq!(line_to_bytes("\u{3042}"), None);
    }
}
