//! Purpose: Shared blocking HTTP helpers over `ureq` for the remote clients.
//! Exports: `HttpResponse`, `send`, `parse_json`, `parse_base_url`, `extend_url`, `join_path`.
//! Invariants: Non-2xx statuses are returned as responses, not transport errors.
//! Invariants: Response bodies are read in full without the client's default size cap.
use std::io::Read;

use serde_json::Value;
use url::Url;

use crate::core::error::{Error, ErrorKind};

const BODY_PREVIEW_CHARS: usize = 300;

#[derive(Debug)]
pub(crate) struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub url: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_preview(&self) -> String {
        let mut preview: String = self.body.chars().take(BODY_PREVIEW_CHARS).collect();
        if self.body.chars().nth(BODY_PREVIEW_CHARS).is_some() {
            preview.push('…');
        }
        preview
    }
}

pub(crate) fn send(request: ureq::Request, body: Option<&str>) -> Result<HttpResponse, Error> {
    let url = request.url().to_string();
    let result = match body {
        Some(payload) => request.send_string(payload),
        None => request.call(),
    };
    let response = match result {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(ureq::Error::Transport(err)) => {
            return Err(Error::new(ErrorKind::Transport)
                .with_message("request failed")
                .with_url(url)
                .with_source(err));
        }
    };

    let status = response.status();
    // `into_string` caps bodies at 10 MiB; content tables are larger.
    let mut text = String::new();
    response
        .into_reader()
        .read_to_string(&mut text)
        .map_err(|err| {
            Error::new(ErrorKind::Transport)
                .with_message("failed to read response body")
                .with_url(url.clone())
                .with_status(status)
                .with_source(err)
        })?;

    Ok(HttpResponse {
        status,
        body: text,
        url,
    })
}

pub(crate) fn parse_json(response: &HttpResponse) -> Result<Value, Error> {
    serde_json::from_str(&response.body).map_err(|err| {
        Error::new(ErrorKind::ResponseParse)
            .with_message(format!(
                "received a non-JSON response: {}",
                response.body_preview()
            ))
            .with_url(response.url.clone())
            .with_status(response.status)
            .with_source(err)
    })
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url, Error> {
    let url = Url::parse(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid base url")
            .with_url(raw)
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("base url must use http or https scheme")
            .with_url(raw));
    }
    Ok(url)
}

/// Appends path segments to a base URL that may already carry a path prefix.
pub(crate) fn extend_url(base_url: &Url, segments: &[&str]) -> Result<Url, Error> {
    let mut url = base_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage)
                .with_message("base url cannot be a base")
                .with_url(base_url.as_str())
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

/// Resolves an absolute API path (`/a/b/`) under the base URL's own path.
pub(crate) fn join_path(base_url: &Url, path: &str) -> Result<Url, Error> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    extend_url(base_url, &segments)
}

#[cfg(test)]
mod tests {
    use super::{HttpResponse, extend_url, join_path, parse_base_url, parse_json};
    use crate::core::error::ErrorKind;

    #[test]
    fn extend_url_keeps_existing_prefix() {
        let base = parse_base_url("https://api.cloudflare.com/client/v4").expect("url");
        let url = extend_url(&base, &["accounts", "a1", "bulk"]).expect("url");
        assert_eq!(url.as_str(), "https://api.cloudflare.com/client/v4/accounts/a1/bulk");

        let slash = parse_base_url("http://127.0.0.1:9000/").expect("url");
        let url = extend_url(&slash, &["accounts"]).expect("url");
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/accounts");
    }

    #[test]
    fn join_path_keeps_prefix_and_trailing_slash() {
        let base = parse_base_url("https://proxy.test/bungie").expect("url");
        let url = join_path(&base, "/Platform/Destiny2/Manifest/").expect("url");
        assert_eq!(url.as_str(), "https://proxy.test/bungie/Platform/Destiny2/Manifest/");

        let origin = parse_base_url("https://www.bungie.net").expect("url");
        let url = join_path(&origin, "/common/destiny2_content/json/en/A-1.json").expect("url");
        assert_eq!(
            url.as_str(),
            "https://www.bungie.net/common/destiny2_content/json/en/A-1.json"
        );
    }

    #[test]
    fn base_url_must_be_http() {
        let err = parse_base_url("ftp://example.test").expect_err("scheme");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn non_json_body_is_response_parse_error_with_preview() {
        let response = HttpResponse {
            status: 502,
            body: "<html>".to_string() + &"x".repeat(1000),
            url: "http://example.test/".to_string(),
        };
        let err = parse_json(&response).expect_err("html");
        assert_eq!(err.kind(), ErrorKind::ResponseParse);
        assert_eq!(err.status(), Some(502));
        assert!(err.message().unwrap_or_default().len() < 400);
    }
}
