use super::{Chunks, ChunksError};

#[derive(Debug)]
pub enum Error {
    Chunks(ChunksError),
    InvalidUtf8,
}

/// Reads server-sent events from a chunk stream and yields the `data` of
/// each event.
///
/// Line endings may be `\n` or `\r\n`. Comment lines and fields other than
/// `data` are skipped, and multiple `data` lines of one event are joined
/// with `\n`. An unterminated event at the end of the stream is dropped.
pub struct Sse {
    buf: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: Vec::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            if let Some(data) = self.take_event()? {
                return Ok(Some(data));
            }
            match self.chunks.next_chunk().await.map_err(Error::Chunks)? {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => {
                    if !self.buf.iter().all(u8::is_ascii_whitespace) {
                        debug!("dropping unterminated event");
                    }
                    self.buf.clear();
                    return Ok(None);
                }
            }
        }
    }

    /// Takes complete events from the buffer until one carries data.
    fn take_event(&mut self) -> Result<Option<String>, Error> {
        while let Some((end, sep_len)) = find_event_end(&self.buf) {
            let block: Vec<u8> = self.buf.drain(..end + sep_len).collect();
            let block =
                std::str::from_utf8(&block[..end]).map_err(|_| Error::InvalidUtf8)?;

            let mut data: Option<String> = None;
            for line in block.lines() {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let (field, value) = match line.split_once(':') {
                    Some((field, value)) => {
                        (field, value.strip_prefix(' ').unwrap_or(value))
                    }
                    None => (line, ""),
                };
                if field != "data" {
                    continue;
                }
                match &mut data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => data = Some(value.to_owned()),
                }
            }
            if data.is_some() {
                return Ok(data);
            }
        }
        Ok(None)
    }
}

/// Finds the blank line that terminates the first event, returning its
/// offset and the separator length.
fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buf
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_normal_events() {
        let chunks = Chunks::canned([
            b"data: hello\n\n".as_slice(),
            b"data: bye\n\n".as_slice(),
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_across_chunks() {
        // The euro sign is split in the middle of its UTF-8 encoding.
        let chunks = Chunks::canned([
            b"data: 5 \xe2\x82".as_slice(),
            b"\xac\r\n".as_slice(),
            b"\r\n".as_slice(),
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "5 \u{20ac}");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_comments_and_other_fields() {
        let chunks = Chunks::canned([
            b": keep-alive\n\nevent: message\nid: 7\ndata: a\ndata: b\n\n"
                .as_slice(),
        ]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "a\nb");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unterminated_event() {
        let chunks = Chunks::canned([b"data: partial\n".as_slice()]);
        let mut sse = Sse::new(chunks);
        assert_eq!(sse.next_event().await.unwrap(), None);
    }
}
