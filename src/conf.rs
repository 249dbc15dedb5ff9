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

use std::time::Duration;

use anyhow::bail;
use reqwest::Url;

use crate::trust::{Certificate, RCA_PREFIX, TrustError};

/// Parses `on`/`off` the way directive values are written.
fn parse_switch(name: &str, val: &str) -> anyhow::Result<bool> {
    if val.eq_ignore_ascii_case("on") {
        Ok(true)
    } else if val.eq_ignore_ascii_case("off") {
        Ok(false)
    } else {
        bail!("Unable to parse {name}: {val}")
    }
}

fn parse_seconds(val: &str) -> anyhow::Result<Duration> {
    Ok(Duration::from_secs(val.parse()?))
}

// CLIENT
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Option<Url>,
    pub http_client_idle_timeout: Duration,
    pub http_client_max_idle_per_host: usize,
    pub http_client_tcp_keepalive: Duration,
    pub http_client_connect_timeout: Duration,
    pub http_client_timeout: Duration,
    pub http_client_accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            http_client_idle_timeout: Duration::from_secs(30),
            http_client_max_idle_per_host: 8,
            http_client_tcp_keepalive: Duration::from_secs(30),
            http_client_connect_timeout: Duration::from_secs(2),
            http_client_timeout: Duration::from_secs(10),
            http_client_accept_invalid_certs: false,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let Some(base_url) = &self.base_url else {
            bail!("no base url configured");
        };
        if !base_url.path().ends_with('/') {
            bail!("base url must end with `/`: {base_url}");
        }
        if base_url.query().is_some() || base_url.fragment().is_some() {
            bail!("base url must carry neither query nor fragment: {base_url}");
        }
        if self.http_client_timeout.is_zero() {
            bail!("http_client_timeout must not be 0");
        }
        Ok(())
    }

    pub fn base_url(&self) -> anyhow::Result<&Url> {
        self.base_url
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no base url configured"))
    }

    /// Sets one option by name, e.g. `http_client_timeout 30` or `http_client_accept_invalid_certs on`.
    pub fn set(&mut self, name: &str, val: &str) -> anyhow::Result<()> {
        match name {
            "base_url" => {
                let url = if val.ends_with('/') {
                    val.to_string()
                } else {
                    format!("{val}/")
                };
                self.base_url = Some(Url::parse(&url)?);
            }
            "http_client_idle_timeout" => self.http_client_idle_timeout = parse_seconds(val)?,
            "http_client_max_idle_per_host" => self.http_client_max_idle_per_host = val.parse()?,
            "http_client_tcp_keepalive" => self.http_client_tcp_keepalive = parse_seconds(val)?,
            "http_client_connect_timeout" => self.http_client_connect_timeout = parse_seconds(val)?,
            "http_client_timeout" => self.http_client_timeout = parse_seconds(val)?,
            "http_client_accept_invalid_certs" => {
                self.http_client_accept_invalid_certs = parse_switch(name, val)?
            }
            _ => bail!("unknown option `{name}`"),
        }
        Ok(())
    }
}

// TRUSTSTORE
#[derive(Debug, Clone)]
pub struct TruststoreConfig {
    pub trust_anchor: Certificate,
    /// A_21218: OCSP responses older than this are not accepted.
    pub ocsp_response_max_age: Duration,
    /// Also require the `CertHash` extension of OCSP responses to match the end entity. Off by
    /// default: the test environment's responses carry none.
    pub require_ocsp_cert_hash: bool,
}

impl TruststoreConfig {
    pub fn new(trust_anchor: &[u8]) -> Result<Self, TrustError> {
        Ok(Self {
            trust_anchor: Certificate::from_der(trust_anchor)?,
            ocsp_response_max_age: Duration::from_secs(12 * 60 * 60),
            require_ocsp_cert_hash: false,
        })
    }

    pub fn validate(&self) -> Result<(), TrustError> {
        if !self
            .trust_anchor
            .subject_dn_contains_cn_prefix_with_number(RCA_PREFIX)
        {
            return Err(TrustError::Config(format!(
                "trust anchor `{}` is not a {RCA_PREFIX}<n> root",
                self.trust_anchor.subject()
            )));
        }
        if self.ocsp_response_max_age.is_zero() {
            return Err(TrustError::Config("ocsp_response_max_age must not be 0".to_string()));
        }
        Ok(())
    }

    pub fn set(&mut self, name: &str, val: &str) -> anyhow::Result<()> {
        match name {
            "ocsp_response_max_age" => self.ocsp_response_max_age = parse_seconds(val)?,
            "require_ocsp_cert_hash" => self.require_ocsp_cert_hash = parse_switch(name, val)?,
            _ => bail!("unknown option `{name}`"),
        }
        Ok(())
    }
}
