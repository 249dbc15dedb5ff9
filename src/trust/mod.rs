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

//! Certificate and OCSP trust validation for the VAU endpoint and the IDP signers.

use thiserror::Error;
use vau::VauError;

mod asn1;
pub mod cert;
pub mod chain;
pub mod ocsp;
pub mod truststore;

pub use cert::Certificate;
pub use chain::{
    Chain, check_chain, filter_by_oid_and_ocsp_response, filter_by_oid_and_ocsp_response_with,
    filter_by_signature, partition_by_signature,
};
pub use ocsp::{CertStatus, DigestAlgorithm, OcspResponse, SingleResponse};
pub use truststore::{
    CA_PREFIX, IDP_OID, RCA_PREFIX, TrustedTruststore, Truststore, UntrustedCertList,
    UntrustedOcspList, UntrustedRepository, VAU_OID, find_valid_idp_chains,
    find_valid_ocsp_responses, find_valid_vau_chain, validate_subject_dn,
    validated_certificates, validated_chain_signed_by_trust_anchor,
};

/// Timestamps are unix seconds throughout.
pub type Timestamp = i64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrustError {
    #[error("unable to parse certificate: {0}")]
    Parse(String),
    #[error("unable to parse ocsp response: {0}")]
    OcspParse(String),
    #[error("signature of `{subject}` does not verify with key of `{issuer}`")]
    Signature { subject: String, issuer: String },
    #[error("`{subject}` is not valid at {timestamp}")]
    Expired { subject: String, timestamp: Timestamp },
    #[error("chain of {0} certificates is too short, need at least 3")]
    ChainTooShort(usize),
    #[error("subject `{subject}` has no CN of the form `{prefix}<n>`")]
    SubjectMismatch { subject: String, prefix: String },
    #[error("ocsp response not fresh, produced at {0}")]
    OcspNotFresh(Timestamp),
    #[error("ocsp response status {0} is not successful")]
    OcspStatus(u32),
    #[error("no signer certificate within the ocsp response")]
    OcspMissingSigner,
    #[error("couldn't validate signer cert of ocsp response")]
    OcspUntrustedSigner,
    #[error("ocsp response signature does not verify")]
    OcspSignature,
    #[error("ocsp response carries no cert hash")]
    OcspMissingCertHash,
    #[error("ocsp cert hash does not match the certificate")]
    OcspCertHashMismatch,
    #[error("no valid certificate chain with VAU end entity found")]
    NoValidVauChain,
    #[error("expected at least {expected} valid IDP chains, found {actual}")]
    NotEnoughIdpChains { expected: usize, actual: usize },
    #[error("no certificate chains to validate")]
    NoChains,
    #[error("no OCSP responses")]
    NoOcspResponses,
    #[error("no CA certificates")]
    NoCaCertificates,
    #[error("IDP certificate could not be validated")]
    UnknownIdpCertificate,
    #[error("truststore repository: {0}")]
    Repository(String),
    #[error("truststore config: {0}")]
    Config(String),
    #[error("crypto: {0}")]
    Crypto(String),
    #[error("vau: {0}")]
    Vau(#[from] VauError),
}

impl From<openssl::error::ErrorStack> for TrustError {
    fn from(e: openssl::error::ErrorStack) -> Self {
        TrustError::Crypto(e.to_string())
    }
}
