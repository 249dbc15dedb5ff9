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

use openssl::symm::{Cipher, decrypt_aead, encrypt_aead};

use super::model::{VauAesGcmSpec, VauError};
use super::util::CryptoConfig;

fn cipher_for(key: &[u8]) -> Result<Cipher, VauError> {
    match key.len() {
        16 => Ok(Cipher::aes_128_gcm()),
        24 => Ok(Cipher::aes_192_gcm()),
        32 => Ok(Cipher::aes_256_gcm()),
        _ => Err(VauError::InvalidKey),
    }
}

/// Encrypts with a fresh random IV; returns `iv | ciphertext | tag`.
pub fn encrypt(
    config: &CryptoConfig,
    key: &[u8],
    spec: &VauAesGcmSpec,
    cleartext: &[u8],
) -> Result<Vec<u8>, VauError> {
    let iv = config.random_bytes(spec.iv_size)?;
    encrypt_with_iv(key, spec, &iv, cleartext)
}

pub fn encrypt_with_iv(
    key: &[u8],
    spec: &VauAesGcmSpec,
    iv: &[u8],
    cleartext: &[u8],
) -> Result<Vec<u8>, VauError> {
    if iv.len() != spec.iv_size {
        return Err(VauError::BadFormat);
    }
    let cipher = cipher_for(key)?;
    let mut tag = vec![0u8; spec.tag_size];
    let ciphertext = encrypt_aead(cipher, key, Some(iv), &[], cleartext, &mut tag)
        .map_err(|_| VauError::InternalError)?;

    let mut out = Vec::with_capacity(iv.len() + ciphertext.len() + tag.len());
    out.extend_from_slice(iv);
    out.extend(ciphertext);
    out.extend(tag);
    Ok(out)
}

/// Reverses [`encrypt`]. Any tag mismatch yields [`VauError::DecryptionFailure`].
pub fn decrypt(key: &[u8], spec: &VauAesGcmSpec, ciphertext: &[u8]) -> Result<Vec<u8>, VauError> {
    let cipher = cipher_for(key)?;
    if ciphertext.len() < spec.iv_size + spec.tag_size {
        return Err(VauError::DecryptionFailure);
    }
    let (iv, rest) = ciphertext.split_at(spec.iv_size);
    let (data, tag) = rest.split_at(rest.len() - spec.tag_size);
    decrypt_aead(cipher, key, Some(iv), &[], data, tag).map_err(|_| VauError::DecryptionFailure)
}
