use super::HandlerResponse;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use serde_json::Value;
use std::io::{self, Write};
use tracing::warn;

/// A header line is only written if both parts are valid on the wire, so a
/// CR or LF in either one can never start a new header or end the head early.
fn is_writable(name: &str, value: &str) -> bool {
    HeaderName::from_bytes(name.as_bytes()).is_ok() && HeaderValue::from_str(value).is_ok()
}

fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

impl HandlerResponse {
    /// Serialize this response as an HTTP/1.1 message into `sink`.
    ///
    /// String bodies are sent as `text/plain`, other JSON values as
    /// `application/json`, and `Null` as an empty body. An explicit
    /// `content-type` header wins over the default; `content-length` is always
    /// computed here. Headers whose name or value is not valid on the wire
    /// (for example a value containing CR or LF) are dropped with a warning.
    pub fn write_to<W: Write + ?Sized>(&self, sink: &mut W) -> io::Result<()> {
        let (default_type, body): (Option<&str>, Vec<u8>) = match &self.body {
            Value::Null => (None, Vec::new()),
            Value::String(s) => (Some("text/plain; charset=utf-8"), s.as_bytes().to_vec()),
            other => (
                Some("application/json"),
                serde_json::to_vec(other).map_err(io::Error::other)?,
            ),
        };

        write!(sink, "HTTP/1.1 {} {}\r\n", self.status, status_reason(self.status))?;
        let mut has_content_type = false;
        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            if !is_writable(name, value) {
                warn!(
                    header = %name.escape_debug(),
                    status = self.status,
                    "Dropping invalid response header"
                );
                continue;
            }
            has_content_type |= name.eq_ignore_ascii_case("content-type");
            write!(sink, "{name}: {value}\r\n")?;
        }
        if !has_content_type {
            if let Some(content_type) = default_type {
                write!(sink, "content-type: {content_type}\r\n")?;
            }
        }
        write!(sink, "content-length: {}\r\n\r\n", body.len())?;
        sink.write_all(&body)?;
        sink.flush()
    }
}
