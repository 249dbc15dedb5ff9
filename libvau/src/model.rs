/*-
 * #%L
 * libvau
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

use std::fmt::{Debug, Display};

use thiserror::Error;

/// Parameters of the AES-GCM layer: IV prefix and appended authentication tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VauAesGcmSpec {
    pub iv_size: usize,
    pub tag_size: usize,
}

impl VauAesGcmSpec {
    pub const V1: VauAesGcmSpec = VauAesGcmSpec {
        iv_size: 12,
        tag_size: 16,
    };
}

/// ECIES envelope: `version | x | y | iv | ciphertext | tag`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VauEciesSpec {
    pub version: u8,
    pub info: &'static [u8],
    pub coordinate_size: usize,
    pub key_size: usize,
    pub aes_gcm: VauAesGcmSpec,
}

impl VauEciesSpec {
    pub const V1: VauEciesSpec = VauEciesSpec {
        version: 0x01,
        info: b"ecies-vau-transport",
        coordinate_size: 32,
        key_size: 16,
        aes_gcm: VauAesGcmSpec::V1,
    };

    /// version byte, both coordinates and the IV
    pub const fn header_size(&self) -> usize {
        1 + 2 * self.coordinate_size + self.aes_gcm.iv_size
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VauChannelSpec {
    pub version: u8,
    pub request_id_size: usize,
    pub symmetric_key_size: usize,
    pub ecies: VauEciesSpec,
    pub aes_gcm: VauAesGcmSpec,
}

impl VauChannelSpec {
    pub const V1: VauChannelSpec = VauChannelSpec {
        version: b'1',
        request_id_size: 16,
        symmetric_key_size: 16,
        ecies: VauEciesSpec::V1,
        aes_gcm: VauAesGcmSpec::V1,
    };

    /// `version ' ' requestIdHex ' '` preceding the inner HTTP response
    pub const fn min_response_size(&self) -> usize {
        3 + self.request_id_size * 2
    }
}

/// Everything needed to decrypt the response belonging to one outgoing request.
pub struct RawRequestData {
    pub request_id_hex: String,
    pub decryption_key: Vec<u8>,
    pub payload: Vec<u8>,
}

impl Debug for RawRequestData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawRequestData")
            .field("request_id_hex", &self.request_id_hex)
            .field("payload", &format_args!("{}b", self.payload.len()))
            .finish_non_exhaustive()
    }
}

/// Composed inner request as seen by the receiving side of the channel.
pub struct InnerVauRequest {
    pub bearer: String,
    pub request_id_hex: String,
    pub response_key: Vec<u8>,
    pub http: Vec<u8>,
}

impl Debug for InnerVauRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InnerVauRequest")
            .field("request_id_hex", &self.request_id_hex)
            .field("http", &format_args!("{}b", self.http.len()))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VauError {
    DecodingError,     // malformed hex, point or composed payload
    BadFormat,         // envelope shorter than its fixed header
    VersionMismatch,   // leading version byte differs from the channel's
    RequestIdMismatch, // response is bound to another request
    ResponseTooShort,  // below min_response_size
    DecryptionFailure, // AES-GCM returns FAIL
    InvalidKey,        // key or request id of unexpected size
    InternalError,     // openssl failure outside of decryption
}

impl VauError {
    pub const fn message(&self) -> &'static str {
        match self {
            VauError::DecodingError => "Decoding Error",
            VauError::BadFormat => "bad format: ciphertext shorter than header",
            VauError::VersionMismatch => "version byte mismatch",
            VauError::RequestIdMismatch => "response request id does not match",
            VauError::ResponseTooShort => "response too short",
            VauError::DecryptionFailure => "GCM returns FAIL",
            VauError::InvalidKey => "invalid key",
            VauError::InternalError => "Internal error",
        }
    }
}

impl Display for VauError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_has_v1_layout() {
        let spec = VauChannelSpec::V1;
        assert_eq!(spec.version, 0x31);
        assert_eq!(spec.min_response_size(), 35);
        assert_eq!(spec.ecies.header_size(), 77);
    }

    #[test]
    fn it_hides_keys_in_debug() {
        let raw = RawRequestData {
            request_id_hex: "00".repeat(16),
            decryption_key: vec![0xAB; 16],
            payload: vec![0; 3],
        };
        let debug = format!("{raw:?}");
        assert!(!debug.contains("171")); // 0xAB
        assert!(debug.contains("3b"));
    }
}
