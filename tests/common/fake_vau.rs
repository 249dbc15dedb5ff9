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

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use erp_vau::vau::{USERPSEUDONYM, VAU_CONTENT_TYPE, decrypt_http_request, encrypt_http_response};
use http::header::CONTENT_TYPE;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use reqwest::Url;
use tokio::net::TcpListener;
use vau::{CryptoConfig, VauChannelSpec, VauKeyPair, generate_key_pair};

use super::fixture;

/// A VAU backend on loopback: serves the fixture `CertList`/`OCSPList` and answers every inner
/// request with `"{method} {path} {bearer}"`.
pub struct FakeVau {
    addr: SocketAddr,
    state: Arc<State>,
}

pub struct State {
    crypto: CryptoConfig,
    key: VauKeyPair,
    cert_list_hits: AtomicUsize,
    pseudonyms: Mutex<Vec<String>>,
}

impl FakeVau {
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("loopback url")
    }

    pub fn key(&self) -> &VauKeyPair {
        &self.state.key
    }

    pub fn cert_list_hits(&self) -> usize {
        self.state.cert_list_hits.load(Ordering::SeqCst)
    }

    /// Userpseudonyms of the outer requests received so far.
    pub fn pseudonyms(&self) -> Vec<String> {
        self.state.pseudonyms.lock().expect("pseudonyms").clone()
    }
}

fn full<T: Into<Bytes>>(chunk: T) -> Full<Bytes> {
    Full::new(chunk.into())
}

fn status(code: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(full(Bytes::new()));
    *response.status_mut() = code;
    response
}

fn json(name: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(full(fixture(name)));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, "application/json".parse().expect("content type"));
    response
}

async fn answer(
    state: &State,
    pseudonym: &str,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>> {
    let spec = VauChannelSpec::V1;
    let body = req.into_body().collect().await?.to_bytes();
    let Ok((inner, request)) = decrypt_http_request(&state.crypto, &spec, &state.key, &body) else {
        return Ok(status(StatusCode::BAD_REQUEST));
    };

    let next_pseudonym = {
        let mut pseudonyms = state.pseudonyms.lock().expect("pseudonyms");
        pseudonyms.push(pseudonym.to_string());
        format!("pseudo-{}", pseudonyms.len())
    };
    let answer = http::Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/plain")
        .body(format!("{} {} {}", request.method(), request.uri(), inner.bearer).into_bytes())?;
    let sealed = encrypt_http_response(&state.crypto, &spec, &inner, &answer)?;

    let mut response = Response::new(full(sealed));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, VAU_CONTENT_TYPE.parse()?);
    response
        .headers_mut()
        .insert(USERPSEUDONYM, next_pseudonym.parse()?);
    Ok(response)
}

async fn vau_service(state: Arc<State>, req: Request<Incoming>) -> Result<Response<Full<Bytes>>> {
    let path = req.uri().path().to_string();
    match (req.method(), path.as_str()) {
        (&Method::GET, "/CertList") => {
            state.cert_list_hits.fetch_add(1, Ordering::SeqCst);
            Ok(json("cert_list.json"))
        }
        (&Method::GET, "/OCSPList") => Ok(json("ocsp_list.json")),
        (&Method::POST, path) => match path.strip_prefix("/VAU/") {
            Some(pseudonym) => answer(&state, pseudonym, req).await,
            None => Ok(status(StatusCode::NOT_FOUND)),
        },
        _ => Ok(status(StatusCode::NOT_FOUND)),
    }
}

pub async fn start() -> Result<FakeVau> {
    let crypto = CryptoConfig::default();
    let state = Arc::new(State {
        key: generate_key_pair(&crypto)?,
        crypto,
        cert_list_hits: AtomicUsize::new(0),
        pseudonyms: Mutex::new(vec![]),
    });
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;

    let server_state = state.clone();
    tokio::task::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let state = server_state.clone();
            tokio::task::spawn(async move {
                let service = service_fn(move |req| vau_service(state.clone(), req));
                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    eprintln!("fake vau: {e:?}");
                }
            });
        }
    });
    Ok(FakeVau { addr, state })
}
