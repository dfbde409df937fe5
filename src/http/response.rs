use std::borrow::Cow;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;

use tokio::io::{AsyncRead, AsyncReadExt as _};

use super::{Error, HeaderMap, Result};
use crate::compress::try_decompress;

const READ_CHUNK: usize = 4096;

/// A response as parsed by a pipeline.
///
/// Fields are filled in stage by stage, so a response delivered together with
/// an error only carries what was parsed before the failure.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status_code: Option<u16>,
    status_message: String,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    /// `None` until a valid status line has been received.
    #[inline]
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    #[inline]
    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[inline]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Decodes the body according to its `Content-Encoding` header.
    pub fn decoded_body(&self) -> io::Result<Cow<'_, [u8]>> {
        match self.headers.find("Content-Encoding").map(str::trim) {
            None | Some("identity") => Ok(Cow::Borrowed(&self.body)),
            Some(encoding) => match try_decompress(encoding, &self.body)? {
                Some(decoded) => Ok(Cow::Owned(decoded)),
                None => Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("unsupported content encoding: {encoding}"),
                )),
            },
        }
    }

    #[inline]
    pub fn response_line(&self) -> String {
        match self.status_code {
            Some(code) => format!("HTTP/1.1 {} {}", code, self.status_message),
            None => String::from("HTTP/1.1 (no status)"),
        }
    }
}

impl Display for Response {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}\r\n{}\r\n{}",
            self.response_line(),
            self.headers,
            self.body_text()
        )
    }
}

/// Raw bytes read from the connection plus the parse cursor over them.
///
/// Only the pipeline owns one of these; it is the sole writer of the
/// [`Response`] it wraps.
#[derive(Debug, Default)]
pub(crate) struct ResponseBuffer {
    raw: Vec<u8>,
    cursor: usize,
    headers_parsed: bool,
    body_limit: Option<usize>,
    response: Response,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn status_line_end(pending: &[u8]) -> Option<usize> {
    find(pending, b"\r\n").map(|at| at + 2)
}

fn header_block_end(pending: &[u8]) -> Option<usize> {
    if pending.starts_with(b"\r\n") {
        return Some(2);
    }
    find(pending, b"\r\n\r\n").map(|at| at + 4)
}

impl ResponseBuffer {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn response(&self) -> &Response {
        &self.response
    }

    #[inline]
    fn pending(&self) -> &[u8] {
        &self.raw[self.cursor..]
    }

    async fn fill(&mut self, reader: &mut (impl AsyncRead + Unpin)) -> io::Result<usize> {
        self.raw.reserve(READ_CHUNK);
        reader.read_buf(&mut self.raw).await
    }

    /// Reads until `locate` finds a delimiter in the unparsed bytes and returns
    /// the absolute end offset of that delimiter. End of stream is an error.
    async fn read_until(
        &mut self,
        reader: &mut (impl AsyncRead + Unpin),
        locate: fn(&[u8]) -> Option<usize>,
    ) -> io::Result<usize> {
        loop {
            if let Some(end) = locate(self.pending()) {
                return Ok(self.cursor + end);
            }
            if self.fill(reader).await? == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
        }
    }

    #[inline]
    pub(crate) async fn read_status_line(
        &mut self,
        reader: &mut (impl AsyncRead + Unpin),
    ) -> io::Result<usize> {
        self.read_until(reader, status_line_end).await
    }

    #[inline]
    pub(crate) async fn read_header_block(
        &mut self,
        reader: &mut (impl AsyncRead + Unpin),
    ) -> io::Result<usize> {
        self.read_until(reader, header_block_end).await
    }

    /// Reads until the peer closes the connection, or until `Content-Length`
    /// bytes of body are buffered when that header is present.
    pub(crate) async fn read_body(
        &mut self,
        reader: &mut (impl AsyncRead + Unpin),
    ) -> io::Result<()> {
        self.body_limit = self.response.headers.content_length();
        loop {
            if let Some(limit) = self.body_limit {
                if self.pending().len() >= limit {
                    return Ok(());
                }
            }
            if self.fill(reader).await? == 0 {
                return Ok(());
            }
        }
    }

    /// Parses `HTTP/1.1 <code> <message>` and consumes it.
    pub(crate) fn parse_status_line(&mut self) -> Result<()> {
        let end = status_line_end(self.pending())
            .ok_or_else(|| Error::InvalidResponse("status line is not terminated".into()))?;
        let line = String::from_utf8_lossy(&self.pending()[..end - 2]).into_owned();

        let mut tokens = line.splitn(3, ' ');
        let version = tokens.next().unwrap_or_default();
        if version != "HTTP/1.1" {
            return Err(Error::InvalidResponse(format!("unsupported version: {version:?}")));
        }
        let code = tokens.next().unwrap_or_default();
        let code = code
            .parse::<u16>()
            .map_err(|_| Error::InvalidResponse(format!("bad status code: {code:?}")))?;
        let message = tokens.next().unwrap_or_default();

        self.response.status_code = Some(code);
        self.response.status_message = message.to_owned();
        self.cursor += end;
        Ok(())
    }

    /// Parses the header block up to and including its terminating empty line.
    pub(crate) fn parse_headers(&mut self) {
        let Some(end) = header_block_end(self.pending()) else {
            return;
        };
        let block = String::from_utf8_lossy(&self.pending()[..end]).into_owned();

        for line in block.split("\r\n") {
            if line.is_empty() {
                break;
            }
            // lines without a colon are skipped
            if let Some((name, value)) = line.split_once(':') {
                self.response
                    .headers
                    .insert(name, value.trim_start_matches([' ', '\t']));
            }
        }

        self.cursor += end;
        self.headers_parsed = true;
    }

    /// Hands out the response; the body is only attached once the header
    /// block was parsed.
    pub(crate) fn into_response(mut self) -> Response {
        if self.headers_parsed {
            let mut body = self.raw.split_off(self.cursor);
            if let Some(limit) = self.body_limit {
                body.truncate(limit);
            }
            self.response.body = body;
        }
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(mut wire: &[u8]) -> (ResponseBuffer, Result<()>) {
        let mut buffer = ResponseBuffer::new();
        let result = async {
            buffer.read_status_line(&mut wire).await.map_err(Error::Read)?;
            buffer.parse_status_line()?;
            buffer.read_header_block(&mut wire).await.map_err(Error::Read)?;
            buffer.parse_headers();
            buffer.read_body(&mut wire).await.map_err(Error::Read)
        }
        .await;
        (buffer, result)
    }

    #[tokio::test]
    async fn parses_complete_response() {
        let (buffer, result) =
            parse(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").await;
        assert!(result.is_ok());

        let response = buffer.into_response();
        assert_eq!(response.status_code(), Some(200));
        assert_eq!(response.status_message(), "OK");
        assert_eq!(response.headers().len(), 1);
        assert_eq!(response.headers().get("Content-Length"), Some("5"));
        assert_eq!(response.body(), b"hello");
    }

    #[tokio::test]
    async fn rejects_other_versions() {
        let (buffer, result) = parse(b"HTTP/1.0 200 OK\r\n\r\n").await;
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
        assert_eq!(buffer.into_response().status_code(), None);
    }

    #[tokio::test]
    async fn rejects_non_numeric_status() {
        let (_, result) = parse(b"HTTP/1.1 OK FOO\r\n\r\n").await;
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn status_message_may_be_empty() {
        let (buffer, result) = parse(b"HTTP/1.1 204\r\n\r\n").await;
        assert!(result.is_ok());
        let response = buffer.into_response();
        assert_eq!(response.status_code(), Some(204));
        assert_eq!(response.status_message(), "");
        assert!(response.headers().is_empty());
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn status_message_keeps_inner_spaces() {
        let (buffer, _) = parse(b"HTTP/1.1 404 Not Found\r\n\r\n").await;
        assert_eq!(buffer.response().status_message(), "Not Found");
    }

    #[tokio::test]
    async fn header_edge_cases() {
        let (buffer, result) = parse(
            b"HTTP/1.1 200 OK\r\n\
              X-Empty:\r\n\
              no colon here\r\n\
              X-Tight:value\r\n\
              X-Url: http://a:80/\r\n\r\n",
        )
        .await;
        assert!(result.is_ok());

        let headers = buffer.response().headers();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("X-Empty"), Some(""));
        assert_eq!(headers.get("X-Tight"), Some("value"));
        assert_eq!(headers.get("X-Url"), Some("http://a:80/"));
        assert!(!headers.contains("no colon here"));
    }

    #[tokio::test]
    async fn header_names_are_case_sensitive() {
        let (buffer, _) = parse(b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\n\r\n").await;
        let headers = buffer.response().headers();
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("Content-Type"), None);
    }

    #[tokio::test]
    async fn content_length_bounds_body() {
        let (buffer, result) =
            parse(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nabcdef").await;
        assert!(result.is_ok());
        assert_eq!(buffer.into_response().body(), b"abc");
    }

    #[tokio::test]
    async fn body_without_length_reads_to_close() {
        let (buffer, result) = parse(b"HTTP/1.1 200 OK\r\nServer: test\r\n\r\nall of it").await;
        assert!(result.is_ok());
        assert_eq!(buffer.into_response().body_text(), "all of it");
    }

    #[tokio::test]
    async fn eof_inside_status_line_is_read_error() {
        let (buffer, result) = parse(b"HTTP/1.1 200").await;
        assert!(matches!(result, Err(Error::Read(_))));
        assert!(buffer.into_response().body().is_empty());
    }

    #[tokio::test]
    async fn eof_inside_headers_keeps_status() {
        let (buffer, result) = parse(b"HTTP/1.1 301 Moved\r\nLocation: /x\r\n").await;
        assert!(matches!(result, Err(Error::Read(_))));

        let response = buffer.into_response();
        assert_eq!(response.status_code(), Some(301));
        assert!(response.headers().is_empty());
    }

    #[test]
    fn identity_body_is_borrowed() {
        let response = Response {
            body: b"plain".to_vec(),
            ..Response::default()
        };
        let decoded = response.decoded_body().unwrap();
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert_eq!(&*decoded, b"plain");
    }

    #[test]
    fn lowercase_content_encoding_is_honored() {
        let mut response = Response::default();
        response.headers.insert("content-encoding", "br");
        let error = response.decoded_body().unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn lowercase_content_length_bounds_body() {
        let (buffer, result) =
            parse(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nokay").await;
        assert!(result.is_ok());
        assert_eq!(buffer.into_response().body(), b"ok");
    }

    #[test]
    fn unknown_encoding_is_unsupported() {
        let mut response = Response::default();
        response.headers.insert("Content-Encoding", "br");
        let error = response.decoded_body().unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::Unsupported);
    }
}
