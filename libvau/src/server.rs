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
use openssl::pkey::Private;
use tracing::debug;

use super::aes_gcm;
use super::ecies;
use super::model::*;
use super::util::CryptoConfig;

/// Opens a composed VAU request on the receiving side.
pub fn decrypt_request(
    config: &CryptoConfig,
    spec: &VauChannelSpec,
    our_key: &EcKeyRef<Private>,
    ciphertext: &[u8],
) -> Result<InnerVauRequest, VauError> {
    let plaintext = ecies::decrypt(config, our_key, &spec.ecies, ciphertext)?;

    let mut parts = plaintext.splitn(5, |b| *b == b' ');
    let version = parts.next().ok_or(VauError::DecodingError)?;
    if version != [spec.version].as_slice() {
        return Err(VauError::VersionMismatch);
    }
    let bearer = parts.next().ok_or(VauError::DecodingError)?;
    let request_id_hex = parts.next().ok_or(VauError::DecodingError)?;
    let key_hex = parts.next().ok_or(VauError::DecodingError)?;
    let http = parts.next().ok_or(VauError::DecodingError)?;

    if request_id_hex.len() != spec.request_id_size * 2 {
        return Err(VauError::DecodingError);
    }
    hex::decode(request_id_hex).map_err(|_| VauError::DecodingError)?;
    let response_key = hex::decode(key_hex).map_err(|_| VauError::DecodingError)?;
    if response_key.len() != spec.symmetric_key_size {
        return Err(VauError::InvalidKey);
    }

    let request = InnerVauRequest {
        bearer: String::from_utf8(bearer.to_vec()).map_err(|_| VauError::DecodingError)?,
        request_id_hex: String::from_utf8(request_id_hex.to_vec())
            .map_err(|_| VauError::DecodingError)?,
        response_key,
        http: http.to_vec(),
    };
    debug!(
        request_id = %request.request_id_hex,
        "vau: opened {}b inner request",
        request.http.len()
    );
    Ok(request)
}

/// Seals `http_response` for the client that sent `request`.
pub fn encrypt_response(
    config: &CryptoConfig,
    spec: &VauChannelSpec,
    request: &InnerVauRequest,
    http_response: &[u8],
) -> Result<Vec<u8>, VauError> {
    let mut plaintext = Vec::with_capacity(spec.min_response_size() + http_response.len());
    plaintext.push(spec.version);
    plaintext.push(b' ');
    plaintext.extend_from_slice(request.request_id_hex.as_bytes());
    plaintext.push(b' ');
    plaintext.extend_from_slice(http_response);
    aes_gcm::encrypt(config, &request.response_key, &spec.aes_gcm, &plaintext)
}
