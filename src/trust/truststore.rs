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

//! The VAU truststore: certificates and OCSP responses as served by the backend, validated
//! against a configured trust anchor, and a cache that keeps a validated store as long as its
//! OCSP responses are fresh.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use vau::VauPublicKey;

use super::chain::{Chain, filter_by_oid_and_ocsp_response_with, filter_by_signature};
use super::{Certificate, OcspResponse, Timestamp, TrustError};
use crate::conf::TruststoreConfig;

pub const RCA_PREFIX: &str = "GEM.RCA";
pub const CA_PREFIX: &str = "GEM.KOMP-CA";

/// DER of OID 1.2.276.0.76.4.258, oid_erp-vau
pub const VAU_OID: [u8; 10] = [6, 8, 42, 130, 20, 0, 76, 4, 130, 2];
/// DER of OID 1.2.276.0.76.4.260, oid_idpd
pub const IDP_OID: [u8; 10] = [6, 8, 42, 130, 20, 0, 76, 4, 130, 4];

const MIN_IDP_CHAINS: usize = 2;

/// `GET …/CertList`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntrustedCertList {
    #[serde(with = "base64_der")]
    pub add_roots: Vec<Vec<u8>>,
    #[serde(with = "base64_der")]
    pub ca_certs: Vec<Vec<u8>>,
    #[serde(with = "base64_der")]
    pub ee_certs: Vec<Vec<u8>>,
}

/// `GET …/OCSPList`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntrustedOcspList {
    #[serde(rename = "OCSP Responses", with = "base64_der")]
    pub responses: Vec<Vec<u8>>,
}

mod base64_der {
    use base64ct::{Base64, Encoding};
    use serde::de::Error;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&Base64::encode_string(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| Base64::decode_vec(s.trim()).map_err(D::Error::custom))
            .collect()
    }
}

fn parse_certificates(ders: &[Vec<u8>]) -> Result<Vec<Certificate>, TrustError> {
    ders.iter().map(|der| Certificate::from_der(der)).collect()
}

fn distinct(certs: Vec<Certificate>) -> Vec<Certificate> {
    let mut seen: Vec<Certificate> = Vec::with_capacity(certs.len());
    for cert in certs {
        if !seen.contains(&cert) {
            seen.push(cert);
        }
    }
    seen
}

/// Keeps the certificates with a CN of the form `<prefix><n>…`.
pub fn validate_subject_dn(certs: Vec<Certificate>, prefix: &str) -> Vec<Certificate> {
    certs
        .into_iter()
        .filter(|cert| {
            let ok = cert.subject_dn_contains_cn_prefix_with_number(prefix);
            if !ok {
                debug!(subject = cert.subject(), prefix, "trust: unexpected subject");
            }
            ok
        })
        .collect()
}

/// The trust anchor followed by those of `cross_certs` that can be validated one after the
/// other, each by its predecessor. Stops at the first failure.
pub fn validated_chain_signed_by_trust_anchor(
    trust_anchor: &Certificate,
    cross_certs: &[Certificate],
    timestamp: Timestamp,
) -> Vec<Certificate> {
    let mut validated = vec![trust_anchor.clone()];
    for cert in cross_certs {
        let issuer = &validated[validated.len() - 1];
        if let Err(e) = cert.can_be_validated_by(issuer, timestamp) {
            debug!(subject = cert.subject(), "trust: cross certificate rejected: {e}");
            break;
        }
        validated.push(cert.clone());
    }
    validated
}

/// Those of `candidates` that can be validated by any of `trusted`.
pub fn validated_certificates(
    candidates: &[Certificate],
    trusted: &[Certificate],
    timestamp: Timestamp,
) -> Vec<Certificate> {
    candidates
        .iter()
        .filter(|candidate| {
            trusted
                .iter()
                .any(|issuer| candidate.can_be_validated_by(issuer, timestamp).is_ok())
        })
        .cloned()
        .collect()
}

fn check_ocsp_response(
    response: &OcspResponse,
    ca_chains: &[Chain],
    max_age: Duration,
    timestamp: Timestamp,
) -> Result<(), TrustError> {
    let signer = response.signer()?;
    let signer_chains: Vec<Chain> = ca_chains
        .iter()
        .map(|chain| {
            let mut full = Vec::with_capacity(chain.len() + 1);
            full.push(signer.clone());
            full.extend_from_slice(chain);
            full
        })
        .collect();
    if filter_by_signature(&signer_chains, timestamp).is_empty() {
        return Err(TrustError::OcspUntrustedSigner);
    }
    response.check_signature_with(signer)?;
    response.check_validity(max_age, timestamp)
}

/// Those of `responses` whose signer chains to one of `ca_chains`, whose signature verifies
/// and which are fresh. Everything else is dropped.
pub fn find_valid_ocsp_responses(
    responses: &[OcspResponse],
    ca_chains: &[Chain],
    max_age: Duration,
    timestamp: Timestamp,
) -> Vec<OcspResponse> {
    responses
        .iter()
        .filter(
            |response| match check_ocsp_response(response, ca_chains, max_age, timestamp) {
                Ok(()) => true,
                Err(e) => {
                    debug!("trust: ocsp response not valid: {e}");
                    false
                }
            },
        )
        .cloned()
        .collect()
}

pub fn find_valid_vau_chain(
    chains: &[Chain],
    responses: &[OcspResponse],
    timestamp: Timestamp,
    require_cert_hash: bool,
) -> Result<Chain, TrustError> {
    let candidates = filter_by_oid_and_ocsp_response_with(
        chains,
        &VAU_OID,
        responses,
        timestamp,
        require_cert_hash,
    );
    filter_by_signature(&candidates, timestamp)
        .into_iter()
        .next()
        .ok_or(TrustError::NoValidVauChain)
}

pub fn find_valid_idp_chains(
    chains: &[Chain],
    responses: &[OcspResponse],
    timestamp: Timestamp,
    require_cert_hash: bool,
) -> Result<Vec<Chain>, TrustError> {
    let candidates = filter_by_oid_and_ocsp_response_with(
        chains,
        &IDP_OID,
        responses,
        timestamp,
        require_cert_hash,
    );
    let valid = filter_by_signature(&candidates, timestamp);
    if valid.len() < MIN_IDP_CHAINS {
        return Err(TrustError::NotEnoughIdpChains {
            expected: MIN_IDP_CHAINS,
            actual: valid.len(),
        });
    }
    Ok(valid)
}

/// A truststore whose every element was validated at creation time.
#[derive(Debug, Clone)]
pub struct TrustedTruststore {
    pub vau_certificate: Certificate,
    pub idp_certificates: Vec<Certificate>,
    pub ca_certificates: Vec<Certificate>,
    pub ocsp_responses: Vec<OcspResponse>,
    pub vau_public_key: VauPublicKey,
}

impl TrustedTruststore {
    pub fn create(
        ocsp_list: &UntrustedOcspList,
        cert_list: &UntrustedCertList,
        config: &TruststoreConfig,
        timestamp: Timestamp,
    ) -> Result<Self, TrustError> {
        let add_roots = distinct(parse_certificates(&cert_list.add_roots)?);
        let add_roots = validate_subject_dn(add_roots, RCA_PREFIX);
        let ca_certs = validate_subject_dn(parse_certificates(&cert_list.ca_certs)?, CA_PREFIX);
        let ca_certs = distinct(ca_certs);
        let ee_certs = parse_certificates(&cert_list.ee_certs)?;

        // add roots are expected in order: RCA3→RCA4, RCA4→RCA5, …
        let roots =
            validated_chain_signed_by_trust_anchor(&config.trust_anchor, &add_roots, timestamp);
        let ca_certs = validated_certificates(&ca_certs, &roots, timestamp);
        let ee_certs = distinct(validated_certificates(&ee_certs, &ca_certs, timestamp));

        let ee_chains: Vec<Chain> = ee_certs
            .iter()
            .flat_map(|ee| {
                ca_certs.iter().map(|ca| {
                    let mut chain = vec![ee.clone(), ca.clone()];
                    chain.extend_from_slice(&roots);
                    chain
                })
            })
            .collect();
        if ee_chains.is_empty() {
            return Err(TrustError::NoChains);
        }
        if let Some(short) = ee_chains.iter().find(|c| c.len() < 3) {
            return Err(TrustError::ChainTooShort(short.len()));
        }

        let ca_chains: Vec<Chain> = ca_certs
            .iter()
            .map(|ca| {
                let mut chain = vec![ca.clone()];
                chain.extend_from_slice(&roots);
                chain
            })
            .collect();
        let responses = ocsp_list
            .responses
            .iter()
            .map(|der| OcspResponse::from_der(der))
            .collect::<Result<Vec<_>, _>>()?;
        let ocsp_responses = find_valid_ocsp_responses(
            &responses,
            &ca_chains,
            config.ocsp_response_max_age,
            timestamp,
        );

        let require_cert_hash = config.require_ocsp_cert_hash;
        let vau_chain =
            find_valid_vau_chain(&ee_chains, &ocsp_responses, timestamp, require_cert_hash)?;
        let idp_chains =
            find_valid_idp_chains(&ee_chains, &ocsp_responses, timestamp, require_cert_hash)?;

        let vau_certificate = vau_chain[0].clone();
        let mut ca_certificates = vec![vau_chain[1].clone()];
        ca_certificates.extend(idp_chains.iter().map(|c| c[1].clone()));
        let idp_certificates = idp_chains.into_iter().map(|c| c[0].clone()).collect();
        let vau_public_key = vau_certificate.public_key()?;

        debug!(
            vau = vau_certificate.subject(),
            ocsp_responses = ocsp_responses.len(),
            "trust: truststore created"
        );
        Ok(TrustedTruststore {
            vau_certificate,
            idp_certificates,
            ca_certificates,
            ocsp_responses,
            vau_public_key,
        })
    }

    pub fn check_validity(&self, max_age: Duration, timestamp: Timestamp) -> Result<(), TrustError> {
        if self.ocsp_responses.is_empty() {
            return Err(TrustError::NoOcspResponses);
        }
        for response in &self.ocsp_responses {
            response.check_validity(max_age, timestamp)?;
        }

        self.vau_certificate.check_validity(timestamp)?;

        if self.ca_certificates.is_empty() {
            return Err(TrustError::NoCaCertificates);
        }
        for cert in &self.ca_certificates {
            cert.check_validity(timestamp)?;
        }
        Ok(())
    }

    fn check_idp_certificate(&self, cert: &Certificate) -> Result<(), TrustError> {
        if self.idp_certificates.contains(cert) {
            Ok(())
        } else {
            Err(TrustError::UnknownIdpCertificate)
        }
    }
}

/// Source of the untrusted cert and OCSP lists, e.g. the VAU backend.
pub trait UntrustedRepository: Send + Sync {
    fn load(
        &self,
    ) -> impl Future<Output = Result<(UntrustedCertList, UntrustedOcspList), TrustError>> + Send;

    /// Drops anything cached locally, the next `load` fetches anew.
    fn invalidate(&self);
}

pub type TimeSource = dyn Fn() -> Timestamp + Send + Sync;

pub type TruststoreFactory = dyn Fn(
        &UntrustedOcspList,
        &UntrustedCertList,
        &TruststoreConfig,
        Timestamp,
    ) -> Result<TrustedTruststore, TrustError>
    + Send
    + Sync;

/// Caches a [`TrustedTruststore`] built from `R`.
///
/// A cached store is used as long as [`TrustedTruststore::check_validity`] passes, otherwise the
/// repository is invalidated and the store rebuilt. A failed first build is retried once after
/// invalidating the repository. Any failure that is returned drops the cache and invalidates the
/// repository.
pub struct Truststore<R> {
    config: TruststoreConfig,
    repository: R,
    now: Box<TimeSource>,
    factory: Box<TruststoreFactory>,
    cached: Mutex<Option<TrustedTruststore>>,
}

impl<R: UntrustedRepository> Truststore<R> {
    pub fn new(config: TruststoreConfig, repository: R) -> Self {
        Truststore {
            config,
            repository,
            now: Box::new(|| vau::utc_now() as Timestamp),
            factory: Box::new(TrustedTruststore::create),
            cached: Mutex::new(None),
        }
    }

    pub fn with_time_source(mut self, now: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        self.now = Box::new(now);
        self
    }

    pub fn with_factory(
        mut self,
        factory: impl Fn(
            &UntrustedOcspList,
            &UntrustedCertList,
            &TruststoreConfig,
            Timestamp,
        ) -> Result<TrustedTruststore, TrustError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.factory = Box::new(factory);
        self
    }

    pub fn config(&self) -> &TruststoreConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Runs `f` with the public key of a validated VAU certificate.
    pub async fn with_valid_vau_public_key<T>(
        &self,
        f: impl FnOnce(&VauPublicKey) -> T,
    ) -> Result<T, TrustError> {
        let mut cached = self.cached.lock().await;
        let timestamp = (self.now)();
        self.with_loaded_store(&mut cached, timestamp, |store| Ok(f(&store.vau_public_key)))
            .await
    }

    /// Fails unless `cert` is one of the validated IDP certificates. With
    /// `invalidate_on_failure` an unknown certificate also drops the cached store.
    pub async fn check_idp_certificate(
        &self,
        cert: &Certificate,
        invalidate_on_failure: bool,
    ) -> Result<(), TrustError> {
        let mut cached = self.cached.lock().await;
        let timestamp = (self.now)();
        debug!("trust: check IDP certificate with truststore");
        // an unknown certificate only counts as a truststore failure with `invalidate_on_failure`
        self.with_loaded_store(&mut cached, timestamp, |store| {
            match store.check_idp_certificate(cert) {
                Err(e) if invalidate_on_failure => Err(e),
                result => Ok(result),
            }
        })
        .await?
    }

    /// A copy of the validated store.
    pub async fn trusted(&self) -> Result<TrustedTruststore, TrustError> {
        let mut cached = self.cached.lock().await;
        let timestamp = (self.now)();
        self.with_loaded_store(&mut cached, timestamp, |store| Ok(store.clone()))
            .await
    }

    async fn with_loaded_store<T>(
        &self,
        cached: &mut Option<TrustedTruststore>,
        timestamp: Timestamp,
        f: impl FnOnce(&TrustedTruststore) -> Result<T, TrustError>,
    ) -> Result<T, TrustError> {
        let result = match self.valid_truststore(cached.take(), timestamp).await {
            Ok(store) => f(cached.insert(store)),
            Err(e) => Err(e),
        };
        if result.is_err() {
            debug!("trust: dropping cached truststore");
            *cached = None;
            self.repository.invalidate();
        }
        result
    }

    async fn valid_truststore(
        &self,
        cached: Option<TrustedTruststore>,
        timestamp: Timestamp,
    ) -> Result<TrustedTruststore, TrustError> {
        match cached {
            Some(store) => {
                debug!("trust: use cached truststore");
                match store.check_validity(self.config.ocsp_response_max_age, timestamp) {
                    Ok(()) => Ok(store),
                    Err(e) => {
                        debug!("trust: cached truststore outdated: {e}");
                        self.repository.invalidate();
                        self.create(timestamp).await
                    }
                }
            }
            None => {
                debug!("trust: create truststore from repository");
                match self.create(timestamp).await {
                    Ok(store) => Ok(store),
                    Err(e) => {
                        // might stem from an outdated ocsp response held by the repository
                        debug!("trust: retrying after: {e}");
                        self.repository.invalidate();
                        self.create(timestamp).await
                    }
                }
            }
        }
    }

    async fn create(&self, timestamp: Timestamp) -> Result<TrustedTruststore, TrustError> {
        let (cert_list, ocsp_list) = self.repository.load().await?;
        (self.factory)(&ocsp_list, &cert_list, &self.config, timestamp)
    }
}
