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
use std::hash::{Hash, Hasher};

use openssl::x509::{X509, X509Ref};
use vau::{VauPublicKey, contains_subslice};
use x509_parser::parse_x509_certificate;

use super::{Timestamp, TrustError};

/// An X.509 certificate, parsed once and kept together with its DER encoding.
///
/// Two certificates are equal when their encodings are.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    x509: X509,
    subject: String,
    issuer: String,
    common_names: Vec<String>,
    not_before: Timestamp,
    not_after: Timestamp,
    serial: Vec<u8>,
    raw_subject: Vec<u8>,
    public_key_bits: Vec<u8>,
    extension_values: Vec<Vec<u8>>,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self, TrustError> {
        let (_, cert) = parse_x509_certificate(der).map_err(|e| TrustError::Parse(e.to_string()))?;
        let x509 = X509::from_der(der).map_err(|e| TrustError::Parse(e.to_string()))?;

        let common_names = cert
            .subject()
            .iter_common_name()
            .filter_map(|cn| cn.as_str().ok())
            .map(str::to_string)
            .collect();

        Ok(Certificate {
            der: der.to_vec(),
            x509,
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            common_names,
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
            serial: strip_leading_zeros(cert.raw_serial()).to_vec(),
            raw_subject: cert.subject().as_raw().to_vec(),
            public_key_bits: cert.public_key().subject_public_key.data.to_vec(),
            extension_values: cert.extensions().iter().map(|e| e.value.to_vec()).collect(),
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn common_names(&self) -> &[String] {
        &self.common_names
    }

    /// Serial number without leading zero octets.
    pub fn serial(&self) -> &[u8] {
        &self.serial
    }

    /// DER encoding of the subject `Name`.
    pub fn raw_subject(&self) -> &[u8] {
        &self.raw_subject
    }

    /// Content of the `subjectPublicKey` BIT STRING, for an EC key the uncompressed point.
    pub fn public_key_bits(&self) -> &[u8] {
        &self.public_key_bits
    }

    pub(crate) fn x509(&self) -> &X509Ref {
        &self.x509
    }

    pub fn not_before(&self) -> Timestamp {
        self.not_before
    }

    pub fn not_after(&self) -> Timestamp {
        self.not_after
    }

    pub fn check_validity(&self, timestamp: Timestamp) -> Result<(), TrustError> {
        if self.not_before <= timestamp && timestamp <= self.not_after {
            Ok(())
        } else {
            Err(TrustError::Expired {
                subject: self.subject.clone(),
                timestamp,
            })
        }
    }

    /// Verifies the signature of `self` with the public key of `signer`.
    pub fn check_signature_with(&self, signer: &Certificate) -> Result<(), TrustError> {
        let key = signer.x509.public_key()?;
        match self.x509.verify(&key) {
            Ok(true) => Ok(()),
            _ => Err(TrustError::Signature {
                subject: self.subject.clone(),
                issuer: signer.subject.clone(),
            }),
        }
    }

    /// Valid at `timestamp` and signed by `issuer`.
    pub fn can_be_validated_by(
        &self,
        issuer: &Certificate,
        timestamp: Timestamp,
    ) -> Result<(), TrustError> {
        self.check_validity(timestamp)?;
        self.check_signature_with(issuer)
    }

    /// True if some CN of the subject reads `<prefix><digit>…`.
    pub fn subject_dn_contains_cn_prefix_with_number(&self, prefix: &str) -> bool {
        self.common_names.iter().any(|cn| {
            cn.strip_prefix(prefix)
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_digit())
        })
    }

    /// True if any extension value contains the DER encoded OID `oid` (tag and length included).
    pub fn contains_oid(&self, oid: &[u8]) -> bool {
        self.extension_values
            .iter()
            .any(|value| contains_subslice(value, oid))
    }

    pub fn public_key(&self) -> Result<VauPublicKey, TrustError> {
        Ok(vau::public_key_from_certificate(&self.der)?)
    }
}

pub(crate) fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl Hash for Certificate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.der.hash(state);
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("serial", &hex::encode(&self.serial))
            .finish()
    }
}
