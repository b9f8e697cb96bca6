//! Line splitting over a raw byte stream
//!
//! `\n`, `\r\n` and a lone `\r` all end a line. Bytes that are not valid
//! UTF-8 are replaced with U+FFFD so that a single badly encoded row is
//! handed on like any other row instead of failing the read.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub struct LineReader<R> {
    reader: R,
    buf: Vec<u8>,
    // previous line ended in `\r`, so a leading `\n` belongs to it
    skip_lf: bool,
}

impl<R> LineReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            skip_lf: false,
        }
    }

    /// Next line without its terminator, or `None` at end of stream
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.buf.clear();
        let mut read_any = false;

        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if !read_any {
                    return Ok(None);
                }
                break;
            }

            if self.skip_lf {
                self.skip_lf = false;
                if available[0] == b'\n' {
                    self.reader.consume(1);
                    continue;
                }
            }
            read_any = true;

            match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(pos) => {
                    let terminator = available[pos];
                    self.buf.extend_from_slice(&available[..pos]);
                    self.reader.consume(pos + 1);
                    self.skip_lf = terminator == b'\r';
                    break;
                }
                None => {
                    let len = available.len();
                    self.buf.extend_from_slice(available);
                    self.reader.consume(len);
                }
            }
        }

        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}
