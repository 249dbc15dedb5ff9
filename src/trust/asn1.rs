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

use asn1_rs::*;
use chrono::NaiveDate;

use super::{Timestamp, TrustError};

pub const OID_OCSP_BASIC: Oid = oid!(1.3.6.1.5.5.7.48.1.1);
/// id-isismtt-at-certHash, common PKI
pub const OID_CERT_HASH: Oid = oid!(1.3.36.8.3.13);

/// AlgorithmIdentifier ::= SEQUENCE {
///   algorithm   OBJECT IDENTIFIER,
///   parameters  ANY DEFINED BY algorithm OPTIONAL
/// }
#[derive(Debug, DerSequence)]
pub struct AlgorithmIdentifier<'a> {
    pub algorithm: Oid<'a>,
    #[optional]
    pub _parameters: Option<Any<'a>>, // ignored
}

/// OCSPResponse ::= SEQUENCE {
///   responseStatus  OCSPResponseStatus,
///   responseBytes   [0] EXPLICIT ResponseBytes OPTIONAL
/// }
#[derive(Debug, DerSequence)]
pub struct OcspResponse<'a> {
    pub response_status: Enumerated,
    #[tag_explicit(0)]
    #[optional]
    pub response_bytes: Option<ResponseBytes<'a>>,
}

/// ResponseBytes ::= SEQUENCE {
///   responseType  OBJECT IDENTIFIER,
///   response      OCTET STRING
/// }
#[derive(Debug, DerSequence)]
pub struct ResponseBytes<'a> {
    pub response_type: Oid<'a>,
    pub response: &'a [u8],
}

/// ResponseData ::= SEQUENCE {
///   version             [0] EXPLICIT Version DEFAULT v1,
///   responderID         ResponderID,
///   producedAt          GeneralizedTime,
///   responses           SEQUENCE OF SingleResponse,
///   responseExtensions  [1] EXPLICIT Extensions OPTIONAL
/// }
#[derive(Debug, DerSequence)]
pub struct ResponseData<'a> {
    #[tag_explicit(0)]
    #[optional]
    pub _version: Option<Any<'a>>, // ignored
    pub _responder_id: Any<'a>, // ignored
    pub produced_at: GeneralizedTime,
    pub responses: Vec<SingleResponse<'a>>,
    #[tag_explicit(1)]
    #[optional]
    pub _response_extensions: Option<Any<'a>>, // ignored
}

/// SingleResponse ::= SEQUENCE {
///   certID            CertID,
///   certStatus        CertStatus,
///   thisUpdate        GeneralizedTime,
///   nextUpdate        [0] EXPLICIT GeneralizedTime OPTIONAL,
///   singleExtensions  [1] EXPLICIT Extensions OPTIONAL
/// }
#[derive(Debug, DerSequence)]
pub struct SingleResponse<'a> {
    pub cert_id: CertId<'a>,
    pub cert_status: Any<'a>,
    pub this_update: GeneralizedTime,
    #[tag_explicit(0)]
    #[optional]
    pub _next_update: Option<Any<'a>>, // ignored
    #[tag_explicit(1)]
    #[optional]
    pub single_extensions: Option<Vec<Extension<'a>>>,
}

/// CertID ::= SEQUENCE {
///   hashAlgorithm   AlgorithmIdentifier,
///   issuerNameHash  OCTET STRING,
///   issuerKeyHash   OCTET STRING,
///   serialNumber    CertificateSerialNumber
/// }
#[derive(Debug, DerSequence)]
pub struct CertId<'a> {
    pub hash_algorithm: AlgorithmIdentifier<'a>,
    pub issuer_name_hash: &'a [u8],
    pub issuer_key_hash: &'a [u8],
    pub serial_number: Any<'a>,
}

/// Extension ::= SEQUENCE {
///   extnID     OBJECT IDENTIFIER,
///   critical   BOOLEAN DEFAULT FALSE,
///   extnValue  OCTET STRING
/// }
#[derive(Debug, DerSequence)]
pub struct Extension<'a> {
    pub extn_id: Oid<'a>,
    #[optional]
    pub _critical: Option<Boolean>, // ignored
    pub extn_value: &'a [u8],
}

/// CertHash ::= SEQUENCE {
///   hashAlgorithm    AlgorithmIdentifier,
///   certificateHash  OCTET STRING
/// }
#[derive(Debug, DerSequence)]
pub struct CertHash<'a> {
    pub hash_algorithm: AlgorithmIdentifier<'a>,
    pub certificate_hash: &'a [u8],
}

/// BasicOCSPResponse ::= SEQUENCE {
///   tbsResponseData     ResponseData,
///   signatureAlgorithm  AlgorithmIdentifier,
///   signature           BIT STRING,
///   certs               [0] EXPLICIT SEQUENCE OF Certificate OPTIONAL
/// }
///
/// Parsed by hand, the signature covers the raw bytes of `tbsResponseData`.
#[derive(Debug)]
pub struct BasicOcspResponse<'a> {
    pub tbs_raw: &'a [u8],
    pub tbs_response_data: ResponseData<'a>,
    pub signature_algorithm: AlgorithmIdentifier<'a>,
    pub signature: Vec<u8>,
    pub certs: Vec<&'a [u8]>,
}

impl<'a> BasicOcspResponse<'a> {
    pub fn parse(der: &'a [u8]) -> std::result::Result<Self, TrustError> {
        let (_, outer) = Any::from_der(der).map_err(parse_error)?;
        if outer.header.tag() != Tag::Sequence {
            return Err(TrustError::OcspParse("BasicOCSPResponse".to_string()));
        }

        let (tbs_raw, rest) = split_tlv(outer.data)?;
        let (_, tbs_response_data) = ResponseData::from_der(tbs_raw).map_err(parse_error)?;
        let (rest, signature_algorithm) = AlgorithmIdentifier::from_der(rest).map_err(parse_error)?;
        let (rest, signature) = BitString::from_der(rest).map_err(parse_error)?;

        let mut certs = vec![];
        if !rest.is_empty() {
            // [0] EXPLICIT SEQUENCE OF Certificate
            let (_, tagged) = Any::from_der(rest).map_err(parse_error)?;
            if tagged.header.class() != Class::ContextSpecific || tagged.header.tag() != Tag(0) {
                return Err(TrustError::OcspParse("certs".to_string()));
            }
            let (_, sequence) = Any::from_der(tagged.data).map_err(parse_error)?;
            let mut remaining = sequence.data;
            while !remaining.is_empty() {
                let (cert, next) = split_tlv(remaining)?;
                certs.push(cert);
                remaining = next;
            }
        }

        Ok(BasicOcspResponse {
            tbs_raw,
            tbs_response_data,
            signature_algorithm,
            signature: signature.data.to_vec(),
            certs,
        })
    }
}

/// First complete TLV of `input`, and what follows it.
fn split_tlv(input: &[u8]) -> std::result::Result<(&[u8], &[u8]), TrustError> {
    let (rest, _) = Any::from_der(input).map_err(parse_error)?;
    Ok((&input[..input.len() - rest.len()], rest))
}

fn parse_error(e: impl std::fmt::Display) -> TrustError {
    TrustError::OcspParse(e.to_string())
}

pub fn timestamp(time: &GeneralizedTime) -> std::result::Result<Timestamp, TrustError> {
    let t = &time.0;
    let utc = NaiveDate::from_ymd_opt(t.year as i32, t.month as u32, t.day as u32)
        .and_then(|d| d.and_hms_opt(t.hour as u32, t.minute as u32, t.second as u32))
        .ok_or_else(|| TrustError::OcspParse(format!("invalid time {time:?}")))?
        .and_utc()
        .timestamp();
    let offset = match t.tz {
        ASN1TimeZone::Offset(h, m) => h as i64 * 3600 + m as i64 * 60,
        _ => 0,
    };
    Ok(utc - offset)
}
