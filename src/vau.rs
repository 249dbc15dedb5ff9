/*-
 * #%L
 * erp_vau
 * %%
 * (C) tech@Spree GmbH, 2026, licensed for gematik GmbH
 * %%
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 * *******
 *
 * For additional notes and disclaimer from gematik and in case of changes by gematik find details in the "Readme" file.
 * #L%
 */

//! HTTP level of the VAU channel: inner request serialization, outer request construction and
//! validation of the outer response.

use http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Method, Request, Response, StatusCode, Version};
use openssl::ec::EcKeyRef;
use openssl::pkey::{HasPublic, Private};
use reqwest::Url;
use thiserror::Error;
use tracing::debug;
use vau::{CryptoConfig, InnerVauRequest, RawRequestData, VauChannelSpec, VauError};

/// see also: https://github.com/http-rs/async-h1/blob/main/src/lib.rs#L100
static MAX_HEADERS: usize = 128;

pub const VAU_CONTENT_TYPE: &str = "application/octet-stream";
pub const USERPSEUDONYM: &str = "Userpseudonym";

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("authorization header with bearer token required")]
    MissingBearer,
    #[error("base url must end with `/` and carry neither query nor fragment: {0}")]
    InvalidBaseUrl(String),
    #[error("{0} is not below the base url")]
    UrlOutsideBaseUrl(String),
    #[error("VAU responded with {0}")]
    UnsuccessfulResponse(StatusCode),
    #[error("VAU response body has wrong content type")]
    WrongContentType,
    #[error("malformed inner http message: {0}")]
    MalformedInnerMessage(&'static str),
    #[error("vau: {0}")]
    Vau(#[from] VauError),
}

/// Token of an `Authorization: Bearer …` header, trimmed.
pub fn bearer_token<B>(request: &Request<B>) -> Result<String, HttpError> {
    let value = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(HttpError::MissingBearer)?;
    let token = value
        .strip_prefix("Bearer")
        .ok_or(HttpError::MissingBearer)?;
    Ok(token.trim().to_string())
}

fn check_base_url(base_url: &Url) -> Result<(), HttpError> {
    if base_url.query().is_some() || base_url.fragment().is_some() || !base_url.path().ends_with('/')
    {
        return Err(HttpError::InvalidBaseUrl(base_url.to_string()));
    }
    Ok(())
}

/// Serializes `request` as raw HTTP/1.1, its path taken relative to `base_url`.
///
/// `https://erp.example/VAU/` + `https://erp.example/VAU/Task/123` → `GET /Task/123 HTTP/1.1`
pub fn to_raw_inner_http_request(
    request: &Request<Vec<u8>>,
    base_url: &Url,
) -> Result<Vec<u8>, HttpError> {
    check_base_url(base_url)?;
    let uri = request.uri().to_string();
    let url = Url::parse(&uri).map_err(|_| HttpError::UrlOutsideBaseUrl(uri.clone()))?;
    if url.origin() != base_url.origin() {
        return Err(HttpError::UrlOutsideBaseUrl(uri));
    }
    let path = url
        .path()
        .strip_prefix(base_url.path())
        .ok_or_else(|| HttpError::UrlOutsideBaseUrl(uri.clone()))?;
    let relative = match url.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let host = url
        .host_str()
        .ok_or_else(|| HttpError::UrlOutsideBaseUrl(uri.clone()))?;

    let body = request.body();
    let mut raw = Vec::with_capacity(256 + body.len());
    // request line
    raw.extend_from_slice(format!("{} /{} HTTP/1.1\r\n", request.method(), relative).as_bytes());
    raw.extend_from_slice(format!("Host: {host}\r\n").as_bytes());
    // headers; bytes, not necessarily utf-8
    for (name, value) in request.headers() {
        if name == CONTENT_LENGTH {
            continue;
        }
        raw.extend_from_slice(name.as_str().as_bytes());
        raw.extend_from_slice(b": ");
        raw.extend_from_slice(value.as_bytes());
        raw.extend_from_slice(b"\r\n");
    }
    raw.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    // end of headers
    raw.extend_from_slice(b"\r\n");
    raw.extend_from_slice(body);
    Ok(raw)
}

/// Parses a raw inner HTTP response. The body is only kept when a `Content-Type` is present.
pub fn parse_inner_http_response(raw: &[u8]) -> Result<Response<Vec<u8>>, HttpError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut inner = httparse::Response::new(&mut headers);
    let status = inner
        .parse(raw)
        .map_err(|_| HttpError::MalformedInnerMessage("response head"))?;
    let header_len = match status {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => return Err(HttpError::MalformedInnerMessage("partial response")),
    };
    let code = inner
        .code
        .ok_or(HttpError::MalformedInnerMessage("missing status code"))?;
    // status line is `version code reason`, all three present
    if inner.reason.is_none_or(|reason| reason.trim().is_empty()) {
        return Err(HttpError::MalformedInnerMessage("status line"));
    }
    let version = match inner.version {
        Some(0) => Version::HTTP_10,
        _ => Version::HTTP_11,
    };

    let mut builder = Response::builder().status(code).version(version);
    let mut has_content_type = false;
    for header in inner.headers.iter() {
        has_content_type |= header.name.eq_ignore_ascii_case(CONTENT_TYPE.as_str());
        builder = builder.header(header.name, header.value);
    }
    let body = if has_content_type {
        raw[header_len..].to_vec()
    } else {
        vec![]
    };
    builder
        .body(body)
        .map_err(|_| HttpError::MalformedInnerMessage("response header"))
}

/// Parses a raw inner HTTP request as received by the VAU.
pub fn parse_inner_http_request(raw: &[u8]) -> Result<Request<Vec<u8>>, HttpError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut inner = httparse::Request::new(&mut headers);
    let status = inner
        .parse(raw)
        .map_err(|_| HttpError::MalformedInnerMessage("request head"))?;
    let header_len = match status {
        httparse::Status::Complete(n) => n,
        httparse::Status::Partial => return Err(HttpError::MalformedInnerMessage("partial request")),
    };
    let method = inner
        .method
        .ok_or(HttpError::MalformedInnerMessage("missing method"))?;
    let path = inner
        .path
        .ok_or(HttpError::MalformedInnerMessage("missing path"))?;
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| HttpError::MalformedInnerMessage("method"))?;

    let mut builder = Request::builder().method(method).uri(path);
    for header in inner.headers.iter() {
        builder = builder.header(header.name, header.value);
    }
    builder
        .body(raw[header_len..].to_vec())
        .map_err(|_| HttpError::MalformedInnerMessage("request header"))
}

/// Raw HTTP/1.1 bytes of `response`, as sent back through the channel.
pub fn to_raw_inner_http_response(response: &Response<Vec<u8>>) -> Vec<u8> {
    let status = response.status();
    let reason = status.canonical_reason().unwrap_or("Unknown");

    let mut raw = Vec::new();
    raw.extend_from_slice(format!("HTTP/1.1 {} {}\r\n", status.as_u16(), reason).as_bytes());
    for (name, value) in response.headers().iter() {
        raw.extend_from_slice(name.as_str().as_bytes());
        raw.extend_from_slice(b": ");
        raw.extend_from_slice(value.as_bytes());
        raw.extend_from_slice(b"\r\n");
    }
    raw.extend_from_slice(b"\r\n");
    raw.extend_from_slice(response.body());
    raw
}

/// Wraps `inner` into an outer `POST {base_url}VAU/{userpseudonym}`.
pub fn encrypt_http_request<T: HasPublic>(
    config: &CryptoConfig,
    spec: &VauChannelSpec,
    inner: &Request<Vec<u8>>,
    userpseudonym: &str,
    public_key: &EcKeyRef<T>,
    base_url: &Url,
) -> Result<(Request<Vec<u8>>, RawRequestData), HttpError> {
    let bearer = bearer_token(inner)?;
    let payload = to_raw_inner_http_request(inner, base_url)?;
    let raw = vau::encrypt_raw_vau_request(config, spec, public_key, bearer.as_bytes(), &payload)?;

    let url = base_url
        .join(&format!("VAU/{userpseudonym}"))
        .map_err(|_| HttpError::InvalidBaseUrl(base_url.to_string()))?;
    let outer = Request::builder()
        .method(Method::POST)
        .uri(url.as_str())
        .header(CONTENT_TYPE, VAU_CONTENT_TYPE)
        .header(CONTENT_LENGTH, raw.payload.len())
        .body(raw.payload.clone())
        .map_err(|_| HttpError::InvalidBaseUrl(url.to_string()))?;
    debug!(
        request_id = %raw.request_id_hex,
        "vau: {} {} → {}",
        inner.method(),
        inner.uri().path(),
        url
    );
    Ok((outer, raw))
}

/// Validates and decrypts the outer VAU response; returns the inner response and the
/// `Userpseudonym` to use for the next request.
///
/// The response is bound to the inner request it answers through `raw`: its key opens the body
/// and its request id must be echoed, so a response to any other request fails with
/// [`VauError::RequestIdMismatch`] or [`VauError::DecryptionFailure`].
pub fn decrypt_http_response(
    spec: &VauChannelSpec,
    outer: &Response<Vec<u8>>,
    raw: &RawRequestData,
) -> Result<(Response<Vec<u8>>, Option<String>), HttpError> {
    if !outer.status().is_success() {
        return Err(HttpError::UnsuccessfulResponse(outer.status()));
    }
    let content_type = outer
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or(HttpError::WrongContentType)?;
    if !content_type.trim().eq_ignore_ascii_case(VAU_CONTENT_TYPE) {
        return Err(HttpError::WrongContentType);
    }
    let userpseudonym = outer
        .headers()
        .get(USERPSEUDONYM)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let inner = vau::decrypt_raw_vau_response(spec, raw, outer.body())?;
    Ok((parse_inner_http_response(&inner)?, userpseudonym))
}

/// Receiving side: opens an outer request body and parses the inner HTTP request.
pub fn decrypt_http_request(
    config: &CryptoConfig,
    spec: &VauChannelSpec,
    our_key: &EcKeyRef<Private>,
    body: &[u8],
) -> Result<(InnerVauRequest, Request<Vec<u8>>), HttpError> {
    let inner = vau::decrypt_request(config, spec, our_key, body)?;
    let request = parse_inner_http_request(&inner.http)?;
    Ok((inner, request))
}

/// Receiving side: seals `response` for the sender of `request`.
pub fn encrypt_http_response(
    config: &CryptoConfig,
    spec: &VauChannelSpec,
    request: &InnerVauRequest,
    response: &Response<Vec<u8>>,
) -> Result<Vec<u8>, HttpError> {
    Ok(vau::encrypt_response(
        config,
        spec,
        request,
        &to_raw_inner_http_response(response),
    )?)
}
