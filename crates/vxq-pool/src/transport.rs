//! Byte transport abstraction and the default HTTP implementation.

use std::io::Read;

use crate::error::{Error, Result};

/// Retrieves the raw bytes behind a URL.
///
/// Implementations are blocking; fetches run on dedicated worker
/// threads, never on the caller's thread. Swap in a stub implementation
/// to test pool behavior without a network.
pub trait Transport: Send + Sync {
    /// Fetch the full byte body for `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP transport backed by reqwest.
///
/// Streams the response body into a single buffer pre-sized from the
/// declared `Content-Length` rather than growing incrementally. A body
/// that delivers more or fewer bytes than declared is rejected.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport with a default HTTP client.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url, "fetching");

        let response = self.client.get(url).send().map_err(|e| Error::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let declared = response
            .content_length()
            .and_then(|len| usize::try_from(len).ok());

        match declared {
            Some(expected) => read_declared(response, url, expected),
            // No declared length; an incrementally grown buffer is the
            // only option.
            None => read_to_end(response, url),
        }
    }
}

/// Read exactly `expected` bytes into a pre-sized buffer.
fn read_declared(mut body: impl Read, url: &str, expected: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; expected];
    let mut filled = 0;

    while filled < expected {
        let n = body.read(&mut buf[filled..]).map_err(|e| Error::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if n == 0 {
            return Err(Error::SizeMismatch {
                url: url.to_string(),
                expected,
                actual: filled,
            });
        }
        filled += n;
    }

    // The body must end exactly where the declared length says it does.
    let mut probe = [0u8; 64];
    let mut extra = 0;
    loop {
        let n = body.read(&mut probe).map_err(|e| Error::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        if n == 0 {
            break;
        }
        extra += n;
    }
    if extra > 0 {
        return Err(Error::SizeMismatch {
            url: url.to_string(),
            expected,
            actual: expected + extra,
        });
    }

    Ok(buf)
}

fn read_to_end(mut body: impl Read, url: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    body.read_to_end(&mut buf).map_err(|e| Error::Transport {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_declared_exact() {
        let body: &[u8] = &[1, 2, 3, 4];
        let bytes = read_declared(body, "http://example/a", 4).unwrap();
        assert_eq!(bytes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_read_declared_short_body() {
        let body: &[u8] = &[1, 2];
        let result = read_declared(body, "http://example/a", 4);
        assert_eq!(
            result,
            Err(Error::SizeMismatch {
                url: "http://example/a".to_string(),
                expected: 4,
                actual: 2,
            })
        );
    }

    #[test]
    fn test_read_declared_long_body() {
        let body: &[u8] = &[1, 2, 3, 4, 5, 6];
        let result = read_declared(body, "http://example/a", 4);
        assert_eq!(
            result,
            Err(Error::SizeMismatch {
                url: "http://example/a".to_string(),
                expected: 4,
                actual: 6,
            })
        );
    }

    #[test]
    fn test_read_to_end() {
        let body: &[u8] = &[9, 8, 7];
        assert_eq!(read_to_end(body, "http://example/a").unwrap(), vec![9, 8, 7]);
    }
}
