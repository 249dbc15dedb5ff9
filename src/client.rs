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

//! Async client sending inner HTTP requests through the VAU channel.

use std::sync::{Arc, Mutex};

use http::{Request, Response};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use vau::{CryptoConfig, VauChannelSpec};

use crate::conf::{ClientConfig, TruststoreConfig};
use crate::trust::{TrustError, Truststore, UntrustedCertList, UntrustedOcspList, UntrustedRepository};
use crate::vau::{HttpError, decrypt_http_response, encrypt_http_request};

/// Pseudonym sent until the VAU hands out one.
pub const INITIAL_USERPSEUDONYM: &str = "0";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Trust(#[from] TrustError),
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("config: {0}")]
    Config(String),
}

pub fn build_http_client(conf: &ClientConfig) -> Result<Client, ClientError> {
    if conf.http_client_accept_invalid_certs {
        warn!("client: http_client_accept_invalid_certs = on, will accept *any* cert!");
    }
    Ok(ClientBuilder::new()
        .redirect(Policy::none())
        .pool_idle_timeout(conf.http_client_idle_timeout)
        .pool_max_idle_per_host(conf.http_client_max_idle_per_host)
        .tcp_keepalive(conf.http_client_tcp_keepalive)
        .connect_timeout(conf.http_client_connect_timeout)
        .timeout(conf.http_client_timeout)
        .use_rustls_tls()
        .danger_accept_invalid_certs(conf.http_client_accept_invalid_certs)
        .build()?)
}

/// Fetches `CertList` and `OCSPList` from the backend and keeps them until invalidated.
pub struct HttpRepository {
    client: Client,
    base_url: Url,
    cached: Mutex<Option<(UntrustedCertList, UntrustedOcspList)>>,
}

impl HttpRepository {
    pub fn new(client: Client, base_url: Url) -> Self {
        HttpRepository {
            client,
            base_url,
            cached: Mutex::new(None),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, name: &str) -> Result<T, TrustError> {
        let url = self
            .base_url
            .join(name)
            .map_err(|e| TrustError::Repository(e.to_string()))?;
        debug!("trust: GET {url}");
        let response = self
            .client
            .get(url)
            .header(http::header::ACCEPT, "application/json")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| TrustError::Repository(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| TrustError::Repository(format!("{name}: {e}")))
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Option<(UntrustedCertList, UntrustedOcspList)>>, TrustError>
    {
        self.cached
            .lock()
            .map_err(|_| TrustError::Repository("poisoned".to_string()))
    }
}

impl UntrustedRepository for HttpRepository {
    async fn load(&self) -> Result<(UntrustedCertList, UntrustedOcspList), TrustError> {
        let cached = self.lock()?.clone();
        if let Some(lists) = cached {
            return Ok(lists);
        }
        let cert_list: UntrustedCertList = self.fetch("CertList").await?;
        let ocsp_list: UntrustedOcspList = self.fetch("OCSPList").await?;
        *self.lock()? = Some((cert_list.clone(), ocsp_list.clone()));
        Ok((cert_list, ocsp_list))
    }

    fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            cached.take();
        }
    }
}

/// Sends inner requests below `base_url` as `POST {base_url}VAU/{userpseudonym}`.
///
/// The pseudonym returned by the VAU is remembered for the next request.
pub struct VauClient<R> {
    client: Client,
    base_url: Url,
    crypto: CryptoConfig,
    spec: VauChannelSpec,
    truststore: Arc<Truststore<R>>,
    userpseudonym: Mutex<String>,
}

impl VauClient<HttpRepository> {
    /// Client whose truststore is loaded from the same backend.
    pub fn connect(
        conf: &ClientConfig,
        truststore: TruststoreConfig,
        crypto: CryptoConfig,
    ) -> Result<Self, ClientError> {
        conf.validate()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        truststore.validate()?;
        let client = build_http_client(conf)?;
        let base_url = conf
            .base_url()
            .map_err(|e| ClientError::Config(e.to_string()))?
            .clone();
        let repository = HttpRepository::new(client.clone(), base_url.clone());
        let truststore = Arc::new(Truststore::new(truststore, repository));
        Ok(VauClient::with_client(client, base_url, crypto, truststore))
    }
}

impl<R: UntrustedRepository> VauClient<R> {
    pub fn new(
        conf: &ClientConfig,
        crypto: CryptoConfig,
        truststore: Arc<Truststore<R>>,
    ) -> Result<Self, ClientError> {
        conf.validate()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        let base_url = conf
            .base_url()
            .map_err(|e| ClientError::Config(e.to_string()))?
            .clone();
        Ok(VauClient::with_client(
            build_http_client(conf)?,
            base_url,
            crypto,
            truststore,
        ))
    }

    pub fn with_client(
        client: Client,
        base_url: Url,
        crypto: CryptoConfig,
        truststore: Arc<Truststore<R>>,
    ) -> Self {
        VauClient {
            client,
            base_url,
            crypto,
            spec: VauChannelSpec::V1,
            truststore,
            userpseudonym: Mutex::new(INITIAL_USERPSEUDONYM.to_string()),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn truststore(&self) -> &Truststore<R> {
        &self.truststore
    }

    pub fn userpseudonym(&self) -> String {
        self.userpseudonym
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|_| INITIAL_USERPSEUDONYM.to_string())
    }

    /// Encrypts `inner` for the validated VAU key, sends it and decrypts the response.
    ///
    /// `inner` must target a URL below the base url and carry an `Authorization: Bearer` header.
    pub async fn send(&self, inner: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, ClientError> {
        let userpseudonym = self.userpseudonym();
        let (outer, raw) = self
            .truststore
            .with_valid_vau_public_key(|key| {
                encrypt_http_request(
                    &self.crypto,
                    &self.spec,
                    &inner,
                    &userpseudonym,
                    key,
                    &self.base_url,
                )
            })
            .await??;

        let response = self
            .client
            .execute(reqwest::Request::try_from(outer)?)
            .await?;
        let outer = into_http_response(response).await?;

        let (response, userpseudonym) = decrypt_http_response(&self.spec, &outer, &raw)?;
        if let Some(userpseudonym) = userpseudonym {
            if let Ok(mut current) = self.userpseudonym.lock() {
                *current = userpseudonym;
            }
        }
        debug!(status = %response.status(), "vau: inner response");
        Ok(response)
    }
}

async fn into_http_response(response: reqwest::Response) -> Result<Response<Vec<u8>>, ClientError> {
    let status = response.status();
    let version = response.version();
    let headers = response.headers().clone();
    let mut outer = Response::new(response.bytes().await?.to_vec());
    *outer.status_mut() = status;
    *outer.version_mut() = version;
    *outer.headers_mut() = headers;
    Ok(outer)
}
