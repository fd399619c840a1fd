//! One-shot loopback redirect listener for the browser flow

use crate::error::{Error, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const CALLBACK_PATH: &str = "/auth/callback";
const MAX_REQUEST: usize = 16 * 1024;

const SUCCESS_PAGE: &str = "<html><body><h1>Authentication complete</h1>\
<p>You may close this window and return to the terminal.</p></body></html>";

/// What arrived at the listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    /// The provider redirected back with an authorization code
    Code(String),
    /// Some other request, such as a favicon fetch
    Ignored,
}

/// Interpret the request target of a redirect
///
/// Provider errors and state mismatches are failures; requests for other
/// paths are ignored.
pub fn parse_callback(target: &str, expected_state: &str) -> Result<Callback> {
    let url = url::Url::parse(&format!("http://localhost{}", target))
        .map_err(|e| Error::Listener(format!("bad request target: {}", e)))?;
    if url.path() != CALLBACK_PATH {
        return Ok(Callback::Ignored);
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(Error::OAuth(match description {
            Some(d) => format!("{}: {}", error, d),
            None => error,
        }));
    }
    if state.as_deref() != Some(expected_state) {
        return Err(Error::OAuth("state mismatch in redirect".to_string()));
    }
    code.map(Callback::Code)
        .ok_or_else(|| Error::OAuth("redirect carried no code".to_string()))
}

/// Listener on an ephemeral localhost port
#[derive(Debug)]
pub struct LoopbackListener {
    listener: TcpListener,
    port: u16,
}

impl LoopbackListener {
    /// Bind to an ephemeral port on 127.0.0.1
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| Error::Listener(e.to_string()))?;
        let port = listener
            .local_addr()
            .map_err(|e| Error::Listener(e.to_string()))?
            .port();
        Ok(Self { listener, port })
    }

    /// The redirect URI to register with the authorization request
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.port, CALLBACK_PATH)
    }

    /// Serve requests until the redirect with the code arrives
    pub async fn wait_for_code(self, expected_state: &str) -> Result<String> {
        loop {
            let (mut stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(|e| Error::Listener(e.to_string()))?;
            tracing::debug!(%peer, "redirect listener accepted connection");

            let target = match read_request_target(&mut stream).await {
                Ok(target) => target,
                Err(e) => {
                    tracing::warn!("ignoring malformed request on redirect listener: {}", e);
                    continue;
                }
            };

            match parse_callback(&target, expected_state) {
                Ok(Callback::Code(code)) => {
                    respond(&mut stream, "200 OK", SUCCESS_PAGE).await;
                    return Ok(code);
                }
                Ok(Callback::Ignored) => respond(&mut stream, "404 Not Found", "").await,
                Err(e) => {
                    respond(&mut stream, "400 Bad Request", &e.to_string()).await;
                    return Err(e);
                }
            }
        }
    }
}

async fn read_request_target(stream: &mut TcpStream) -> Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream
            .read(&mut chunk)
            .await
            .map_err(|e| Error::Listener(e.to_string()))?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > MAX_REQUEST {
            return Err(Error::Listener("request too large".to_string()));
        }
    }

    let head = String::from_utf8_lossy(&buf);
    let request_line = head.lines().next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Ok(target.to_string()),
        _ => Err(Error::Listener(format!(
            "unexpected request line {:?}",
            request_line
        ))),
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        tracing::debug!("failed to answer redirect: {}", e);
    }
    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_callback_code() {
        assert_eq!(
            parse_callback("/auth/callback?code=abc&state=xyz", "xyz").unwrap(),
            Callback::Code("abc".to_string())
        );
    }

    #[test]
    fn test_parse_callback_other_path() {
        assert_eq!(
            parse_callback("/favicon.ico", "xyz").unwrap(),
            Callback::Ignored
        );
    }

    #[test]
    fn test_parse_callback_state_mismatch() {
        assert!(matches!(
            parse_callback("/auth/callback?code=abc&state=other", "xyz"),
            Err(Error::OAuth(_))
        ));
    }

    #[test]
    fn test_parse_callback_provider_error() {
        let err = parse_callback(
            "/auth/callback?error=access_denied&error_description=nope&state=xyz",
            "xyz",
        )
        .unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[tokio::test]
    async fn test_listener_returns_code() {
        let listener = LoopbackListener::bind().await.unwrap();
        let redirect = url::Url::parse(&listener.redirect_uri()).unwrap();
        let port = redirect.port().unwrap();

        let waiter = tokio::spawn(listener.wait_for_code("s1"));

        let mut favicon = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        favicon
            .write_all(b"GET /favicon.ico HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut reply = Vec::new();
        favicon.read_to_end(&mut reply).await.unwrap();
        assert!(String::from_utf8_lossy(&reply).starts_with("HTTP/1.1 404"));

        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream
            .write_all(b"GET /auth/callback?code=c0de&state=s1 HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await.unwrap();
        assert!(String::from_utf8_lossy(&reply).starts_with("HTTP/1.1 200"));

        assert_eq!(waiter.await.unwrap().unwrap(), "c0de");
    }
}
