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

use std::fmt;
use std::time::Duration;

use asn1_rs::{Class, FromDer, Oid, oid};
use openssl::hash::{MessageDigest, hash};
use openssl::sign::Verifier;

use super::asn1::{self, BasicOcspResponse, CertHash, OID_CERT_HASH, OID_OCSP_BASIC};
use super::cert::strip_leading_zeros;
use super::{Certificate, Timestamp, TrustError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// From a hash algorithm OID, e.g. the one of a `CertID`.
    pub fn from_hash_oid(oid: &Oid) -> Option<Self> {
        const SHA1: Oid = oid!(1.3.14.3.2.26);
        const SHA256: Oid = oid!(2.16.840.1.101.3.4.2.1);
        const SHA384: Oid = oid!(2.16.840.1.101.3.4.2.2);
        const SHA512: Oid = oid!(2.16.840.1.101.3.4.2.3);

        match oid {
            o if *o == SHA1 => Some(DigestAlgorithm::Sha1),
            o if *o == SHA256 => Some(DigestAlgorithm::Sha256),
            o if *o == SHA384 => Some(DigestAlgorithm::Sha384),
            o if *o == SHA512 => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    /// From an ECDSA or RSA signature algorithm OID.
    pub fn from_signature_oid(oid: &Oid) -> Option<Self> {
        const ECDSA_SHA1: Oid = oid!(1.2.840.10045.4.1);
        const ECDSA_SHA256: Oid = oid!(1.2.840.10045.4.3.2);
        const ECDSA_SHA384: Oid = oid!(1.2.840.10045.4.3.3);
        const ECDSA_SHA512: Oid = oid!(1.2.840.10045.4.3.4);
        const RSA_SHA1: Oid = oid!(1.2.840.113549.1.1.5);
        const RSA_SHA256: Oid = oid!(1.2.840.113549.1.1.11);
        const RSA_SHA384: Oid = oid!(1.2.840.113549.1.1.12);
        const RSA_SHA512: Oid = oid!(1.2.840.113549.1.1.13);

        match oid {
            o if *o == ECDSA_SHA1 || *o == RSA_SHA1 => Some(DigestAlgorithm::Sha1),
            o if *o == ECDSA_SHA256 || *o == RSA_SHA256 => Some(DigestAlgorithm::Sha256),
            o if *o == ECDSA_SHA384 || *o == RSA_SHA384 => Some(DigestAlgorithm::Sha384),
            o if *o == ECDSA_SHA512 || *o == RSA_SHA512 => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    pub fn message_digest(self) -> MessageDigest {
        match self {
            DigestAlgorithm::Sha1 => MessageDigest::sha1(),
            DigestAlgorithm::Sha256 => MessageDigest::sha256(),
            DigestAlgorithm::Sha384 => MessageDigest::sha384(),
            DigestAlgorithm::Sha512 => MessageDigest::sha512(),
        }
    }

    pub fn digest(self, data: &[u8]) -> Result<Vec<u8>, TrustError> {
        Ok(hash(self.message_digest(), data)?.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertStatus {
    Good,
    Revoked,
    Unknown,
}

/// One `SingleResponse` of a basic OCSP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleResponse {
    pub(crate) hash_algorithm: DigestAlgorithm,
    pub(crate) issuer_name_hash: Vec<u8>,
    pub(crate) issuer_key_hash: Vec<u8>,
    pub(crate) serial: Vec<u8>,
    pub(crate) status: CertStatus,
    pub(crate) this_update: Timestamp,
    pub(crate) cert_hash: Option<(DigestAlgorithm, Vec<u8>)>,
}

impl SingleResponse {
    fn from_asn1(single: &asn1::SingleResponse) -> Result<Self, TrustError> {
        let cert_id = &single.cert_id;
        let hash_algorithm = DigestAlgorithm::from_hash_oid(&cert_id.hash_algorithm.algorithm)
            .ok_or_else(|| {
                TrustError::OcspParse(format!(
                    "unsupported CertID hash {}",
                    cert_id.hash_algorithm.algorithm
                ))
            })?;

        let status = &single.cert_status;
        if status.header.class() != Class::ContextSpecific {
            return Err(TrustError::OcspParse("certStatus".to_string()));
        }
        let status = match status.header.tag().0 {
            0 => CertStatus::Good,
            1 => CertStatus::Revoked,
            _ => CertStatus::Unknown,
        };

        let mut cert_hash = None;
        for extension in single.single_extensions.iter().flatten() {
            if extension.extn_id == OID_CERT_HASH {
                let (_, h) = CertHash::from_der(extension.extn_value)
                    .map_err(|e| TrustError::OcspParse(e.to_string()))?;
                let algorithm = DigestAlgorithm::from_hash_oid(&h.hash_algorithm.algorithm)
                    .ok_or_else(|| TrustError::OcspParse("unsupported CertHash".to_string()))?;
                cert_hash = Some((algorithm, h.certificate_hash.to_vec()));
            }
        }

        Ok(SingleResponse {
            hash_algorithm,
            issuer_name_hash: cert_id.issuer_name_hash.to_vec(),
            issuer_key_hash: cert_id.issuer_key_hash.to_vec(),
            serial: strip_leading_zeros(cert_id.serial_number.data).to_vec(),
            status,
            this_update: asn1::timestamp(&single.this_update)?,
            cert_hash,
        })
    }

    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    pub fn status(&self) -> CertStatus {
        self.status
    }

    pub fn this_update(&self) -> Timestamp {
        self.this_update
    }

    /// True if this entry is about `cert`, issued by `issuer`: same serial, and the `CertID`
    /// hashes match the issuer's name and key.
    pub fn matches(&self, cert: &Certificate, issuer: &Certificate) -> bool {
        if self.serial != cert.serial() {
            return false;
        }
        let name_hash = self.hash_algorithm.digest(issuer.raw_subject());
        let key_hash = self.hash_algorithm.digest(issuer.public_key_bits());
        match (name_hash, key_hash) {
            (Ok(name_hash), Ok(key_hash)) => {
                name_hash == self.issuer_name_hash && key_hash == self.issuer_key_hash
            }
            _ => false,
        }
    }

    /// Compares the `CertHash` extension against a digest of the DER encoding of `cert`.
    pub fn matches_hash_of_certificate(&self, cert: &Certificate) -> Result<(), TrustError> {
        let (algorithm, expected) = self
            .cert_hash
            .as_ref()
            .ok_or(TrustError::OcspMissingCertHash)?;
        if algorithm.digest(cert.der())? == *expected {
            Ok(())
        } else {
            Err(TrustError::OcspCertHashMismatch)
        }
    }
}

/// A successful `OCSPResponse` of type `id-pkix-ocsp-basic`.
#[derive(Clone)]
pub struct OcspResponse {
    der: Vec<u8>,
    tbs: Vec<u8>,
    produced_at: Timestamp,
    signature_algorithm: DigestAlgorithm,
    signature: Vec<u8>,
    certs: Vec<Certificate>,
    responses: Vec<SingleResponse>,
}

impl OcspResponse {
    pub fn from_der(der: &[u8]) -> Result<Self, TrustError> {
        let (_, response) =
            asn1::OcspResponse::from_der(der).map_err(|e| TrustError::OcspParse(e.to_string()))?;
        if response.response_status.0 != 0 {
            return Err(TrustError::OcspStatus(response.response_status.0));
        }
        let bytes = response
            .response_bytes
            .ok_or_else(|| TrustError::OcspParse("missing responseBytes".to_string()))?;
        if bytes.response_type != OID_OCSP_BASIC {
            return Err(TrustError::OcspParse(format!(
                "unsupported response type {}",
                bytes.response_type
            )));
        }

        let basic = BasicOcspResponse::parse(bytes.response)?;
        let signature_algorithm =
            DigestAlgorithm::from_signature_oid(&basic.signature_algorithm.algorithm).ok_or_else(
                || {
                    TrustError::OcspParse(format!(
                        "unsupported signature algorithm {}",
                        basic.signature_algorithm.algorithm
                    ))
                },
            )?;
        let certs = basic
            .certs
            .iter()
            .map(|c| Certificate::from_der(c))
            .collect::<Result<Vec<_>, _>>()?;
        let responses = basic
            .tbs_response_data
            .responses
            .iter()
            .map(SingleResponse::from_asn1)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(OcspResponse {
            der: der.to_vec(),
            tbs: basic.tbs_raw.to_vec(),
            produced_at: asn1::timestamp(&basic.tbs_response_data.produced_at)?,
            signature_algorithm,
            signature: basic.signature,
            certs,
            responses,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn produced_at(&self) -> Timestamp {
        self.produced_at
    }

    pub fn certs(&self) -> &[Certificate] {
        &self.certs
    }

    pub fn responses(&self) -> &[SingleResponse] {
        &self.responses
    }

    /// The first embedded certificate, taken as the responder's.
    pub fn signer(&self) -> Result<&Certificate, TrustError> {
        self.certs.first().ok_or(TrustError::OcspMissingSigner)
    }

    pub fn check_signature_with(&self, signer: &Certificate) -> Result<(), TrustError> {
        let key = signer.x509().public_key()?;
        let mut verifier = Verifier::new(self.signature_algorithm.message_digest(), &key)?;
        verifier.update(&self.tbs)?;
        match verifier.verify(&self.signature) {
            Ok(true) => Ok(()),
            _ => Err(TrustError::OcspSignature),
        }
    }

    /// `producedAt` and every `thisUpdate` lie before `timestamp`, and `producedAt` is at most
    /// `max_age` old.
    pub fn check_validity(&self, max_age: Duration, timestamp: Timestamp) -> Result<(), TrustError> {
        let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        let fresh = self.produced_at <= timestamp
            && self.produced_at.saturating_add(max_age) >= timestamp
            && self.responses.iter().all(|r| r.this_update <= timestamp);
        if fresh {
            Ok(())
        } else {
            Err(TrustError::OcspNotFresh(self.produced_at))
        }
    }
}

impl PartialEq for OcspResponse {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for OcspResponse {}

impl fmt::Debug for OcspResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcspResponse")
            .field("produced_at", &self.produced_at)
            .field("signer", &self.certs.first().map(Certificate::subject))
            .field("responses", &self.responses)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const PRODUCED_AT: Timestamp = 1621232581;
    const HOUR: Timestamp = 3600;

    fn read(name: &str) -> Vec<u8> {
        std::fs::read(format!("{}/tests/fixtures/{name}.der", env!("CARGO_MANIFEST_DIR"))).unwrap()
    }

    fn ocsp(name: &str) -> OcspResponse {
        OcspResponse::from_der(&read(name)).unwrap()
    }

    fn cert(name: &str) -> Certificate {
        Certificate::from_der(&read(name)).unwrap()
    }

    #[test]
    fn it_parses_a_basic_response() {
        let response = ocsp("ocsp1");
        assert_eq!(response.produced_at(), PRODUCED_AT);
        assert_eq!(response.certs().len(), 1);
        assert_eq!(response.signer().unwrap(), &cert("ocsp_signer"));

        let single = &response.responses()[0];
        assert_eq!(response.responses().len(), 1);
        assert_eq!(single.hash_algorithm, DigestAlgorithm::Sha1);
        assert_eq!(single.serial(), hex::decode("03ad48e400948d").unwrap());
        assert_eq!(single.status(), CertStatus::Good);
        assert_eq!(single.this_update(), PRODUCED_AT);
        assert_eq!(
            single.issuer_name_hash,
            hex::decode("5c8dffbc4bdb7c3ede533a48d63b399a3e4e502e").unwrap()
        );
        assert!(single.cert_hash.is_none());
    }

    #[rstest]
    #[case("ocsp1", "idp1")]
    #[case("ocsp2", "idp2")]
    #[case("ocsp3", "vau")]
    fn it_matches_the_certificate(#[case] response: &str, #[case] subject: &str) {
        let response = ocsp(response);
        let single = &response.responses()[0];
        assert!(single.matches(&cert(subject), &cert("ca10")));
        assert!(!single.matches(&cert(subject), &cert("ca11")));
        assert!(!single.matches(&cert("idp3"), &cert("ca10")));
    }

    #[rstest]
    #[case("ocsp1")]
    #[case("ocsp2")]
    #[case("ocsp3")]
    fn it_checks_the_signature(#[case] name: &str) {
        let response = ocsp(name);
        assert!(response.check_signature_with(&cert("ocsp_signer")).is_ok());
        assert_eq!(
            response.check_signature_with(&cert("ca10")),
            Err(TrustError::OcspSignature)
        );
    }

    #[test]
    fn it_detects_a_tampered_response() {
        let mut response = ocsp("ocsp1");
        let last = response.tbs.len() - 1;
        response.tbs[last] ^= 0x01;
        assert_eq!(
            response.check_signature_with(&cert("ocsp_signer")),
            Err(TrustError::OcspSignature)
        );
    }

    #[rstest]
    #[case(PRODUCED_AT, true)]
    #[case(PRODUCED_AT + HOUR, true)]
    #[case(PRODUCED_AT + 12 * HOUR, true)]
    #[case(PRODUCED_AT + 12 * HOUR + 1, false)]
    #[case(PRODUCED_AT + 13 * HOUR, false)]
    #[case(PRODUCED_AT - 1, false)]
    fn it_checks_freshness(#[case] timestamp: Timestamp, #[case] fresh: bool) {
        let result = ocsp("ocsp1").check_validity(Duration::from_secs(12 * 3600), timestamp);
        assert_eq!(result.is_ok(), fresh);
    }

    #[test]
    fn it_requires_a_cert_hash() {
        let response = ocsp("ocsp3");
        assert_eq!(
            response.responses()[0].matches_hash_of_certificate(&cert("vau")),
            Err(TrustError::OcspMissingCertHash)
        );
    }

    #[test]
    fn it_compares_the_cert_hash() {
        let vau = cert("vau");
        let mut single = ocsp("ocsp3").responses()[0].clone();

        single.cert_hash = Some((
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha256.digest(vau.der()).unwrap(),
        ));
        assert!(single.matches_hash_of_certificate(&vau).is_ok());
        assert_eq!(
            single.matches_hash_of_certificate(&cert("idp1")),
            Err(TrustError::OcspCertHashMismatch)
        );
    }

    #[test]
    fn it_rejects_unsuccessful_responses() {
        // OCSPResponse { responseStatus: tryLater(3) }
        assert_eq!(
            OcspResponse::from_der(&[0x30, 0x03, 0x0a, 0x01, 0x03]),
            Err(TrustError::OcspStatus(3))
        );
    }
}
