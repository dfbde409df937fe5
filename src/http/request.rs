use std::fmt::{Display, Formatter};

use super::HeaderMap;

/// The request message sent by a pipeline: a GET with only the mandatory
/// `Host` header and no body.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: &'static str,
    pub target: String,
    pub version: &'static str,
    pub headers: HeaderMap,
}

impl Request {
    #[inline]
    pub fn get(host: &str, target: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Host", host);
        Self {
            method: "GET",
            target: target.to_owned(),
            version: "HTTP/1.1",
            headers,
        }
    }

    #[inline]
    pub fn request_line(&self) -> String {
        format!("{} {} {}", self.method, self.target, self.version)
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl Display for Request {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\r\n{}\r\n", self.request_line(), self.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_request_has_only_host_header() {
        let request = Request::get("example.com", "/index.html");
        assert_eq!(
            request.to_bytes(),
            b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n"
        );
    }

    #[test]
    fn request_line_keeps_target_verbatim() {
        let request = Request::get("localhost", "/search?q=a%20b");
        assert_eq!(request.request_line(), "GET /search?q=a%20b HTTP/1.1");
    }
}
