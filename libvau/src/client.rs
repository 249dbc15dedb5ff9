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

use openssl::ec::EcKeyRef;
use openssl::pkey::HasPublic;
use tracing::debug;

use super::aes_gcm;
use super::ecies;
use super::model::*;
use super::util::{CryptoConfig, to_hex};

/// Encrypts `inner_http` for the VAU with a fresh request id and response key.
pub fn encrypt_raw_vau_request<T: HasPublic>(
    config: &CryptoConfig,
    spec: &VauChannelSpec,
    public_key: &EcKeyRef<T>,
    bearer: &[u8],
    inner_http: &[u8],
) -> Result<RawRequestData, VauError> {
    let decryption_key = config.random_bytes(spec.symmetric_key_size)?;
    let request_id = config.random_bytes(spec.request_id_size)?;
    encrypt_raw_vau_request_with(
        config,
        spec,
        public_key,
        bearer,
        inner_http,
        &request_id,
        &decryption_key,
    )
}

/// Like [`encrypt_raw_vau_request`], with caller supplied request id and response key.
pub fn encrypt_raw_vau_request_with<T: HasPublic>(
    config: &CryptoConfig,
    spec: &VauChannelSpec,
    public_key: &EcKeyRef<T>,
    bearer: &[u8],
    inner_http: &[u8],
    request_id: &[u8],
    decryption_key: &[u8],
) -> Result<RawRequestData, VauError> {
    if request_id.len() != spec.request_id_size || decryption_key.len() != spec.symmetric_key_size
    {
        return Err(VauError::InvalidKey);
    }
    let request_id_hex = to_hex(request_id);
    let key_hex = to_hex(decryption_key);

    let composed = compose_inner_http(
        spec.version,
        bearer,
        request_id_hex.as_bytes(),
        key_hex.as_bytes(),
        inner_http,
    );
    let payload = ecies::encrypt(config, public_key, &spec.ecies, &composed)?;
    debug!(
        request_id = %request_id_hex,
        "vau: encrypted {}b inner request into {}b",
        inner_http.len(),
        payload.len()
    );

    Ok(RawRequestData {
        request_id_hex,
        decryption_key: decryption_key.to_vec(),
        payload,
    })
}

/// `version ' ' bearer ' ' requestIdHex ' ' keyHex ' ' innerHttp`
pub(crate) fn compose_inner_http(
    version: u8,
    bearer: &[u8],
    request_id_hex: &[u8],
    key_hex: &[u8],
    inner_http: &[u8],
) -> Vec<u8> {
    let mut out =
        Vec::with_capacity(5 + bearer.len() + request_id_hex.len() + key_hex.len() + inner_http.len());
    out.push(version);
    for part in [bearer, request_id_hex, key_hex, inner_http] {
        out.push(b' ');
        out.extend_from_slice(part);
    }
    out
}

/// Decrypts the VAU response belonging to `raw` and returns the inner HTTP response bytes.
///
/// The plaintext must start with the channel version and echo the request id of `raw`.
pub fn decrypt_raw_vau_response(
    spec: &VauChannelSpec,
    raw: &RawRequestData,
    encrypted_inner_http: &[u8],
) -> Result<Vec<u8>, VauError> {
    let plaintext = aes_gcm::decrypt(&raw.decryption_key, &spec.aes_gcm, encrypted_inner_http)?;
    let inner = validate_response(spec, raw, &plaintext)?;
    Ok(inner.to_vec())
}

fn validate_response<'a>(
    spec: &VauChannelSpec,
    raw: &RawRequestData,
    plaintext: &'a [u8],
) -> Result<&'a [u8], VauError> {
    let min = spec.min_response_size();
    if plaintext.len() < min {
        return Err(VauError::ResponseTooShort);
    }
    if plaintext[0] != spec.version {
        return Err(VauError::VersionMismatch);
    }
    if &plaintext[2..min - 1] != raw.request_id_hex.as_bytes() {
        return Err(VauError::RequestIdMismatch);
    }
    Ok(&plaintext[min..])
}
