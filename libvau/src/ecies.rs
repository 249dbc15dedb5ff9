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

use openssl::bn::{BigNum, BigNumContext};
use openssl::derive::Deriver;
use openssl::ec::{EcGroupRef, EcKey, EcKeyRef};
use openssl::pkey::{HasPublic, PKey, Private, Public};

use super::aes_gcm;
use super::model::{VauEciesSpec, VauError};
use super::util::{CryptoConfig, coordinate_bytes, hkdf_sha256};

/// Encrypts `plaintext` to `other_public_key` using a fresh ephemeral key pair.
pub fn encrypt<T: HasPublic>(
    config: &CryptoConfig,
    other_public_key: &EcKeyRef<T>,
    spec: &VauEciesSpec,
    plaintext: &[u8],
) -> Result<Vec<u8>, VauError> {
    let group = config.group()?;
    let ephemeral = EcKey::generate(&group).map_err(|_| VauError::InternalError)?;
    encrypt_with_ephemeral(config, other_public_key, &ephemeral, spec, plaintext)
}

pub fn encrypt_with_ephemeral<T: HasPublic>(
    config: &CryptoConfig,
    other_public_key: &EcKeyRef<T>,
    ephemeral: &EcKeyRef<Private>,
    spec: &VauEciesSpec,
    plaintext: &[u8],
) -> Result<Vec<u8>, VauError> {
    let key = derive_key(ephemeral, other_public_key, spec)?;
    let (x, y) = public_coordinates(ephemeral.group(), ephemeral, spec.coordinate_size)?;
    let iv = config.random_bytes(spec.aes_gcm.iv_size)?;
    let sealed = aes_gcm::encrypt_with_iv(&key, &spec.aes_gcm, &iv, plaintext)?;

    let mut out = Vec::with_capacity(1 + x.len() + y.len() + sealed.len());
    out.push(spec.version);
    out.extend(x);
    out.extend(y);
    out.extend(sealed);
    Ok(out)
}

pub fn decrypt(
    config: &CryptoConfig,
    our_key: &EcKeyRef<Private>,
    spec: &VauEciesSpec,
    ciphertext: &[u8],
) -> Result<Vec<u8>, VauError> {
    if ciphertext.len() < spec.header_size() {
        return Err(VauError::BadFormat);
    }
    if ciphertext[0] != spec.version {
        return Err(VauError::VersionMismatch);
    }

    let point_end = 1 + 2 * spec.coordinate_size;
    let sender = public_key_from_coordinates(
        config,
        &ciphertext[1..1 + spec.coordinate_size],
        &ciphertext[1 + spec.coordinate_size..point_end],
    )?;
    let key = derive_key(our_key, &sender, spec)?;
    aes_gcm::decrypt(&key, &spec.aes_gcm, &ciphertext[point_end..])
}

/// Rebuilds a public key from big-endian affine coordinates on the configured curve.
pub fn public_key_from_coordinates(
    config: &CryptoConfig,
    x: &[u8],
    y: &[u8],
) -> Result<EcKey<Public>, VauError> {
    let group = config.group()?;
    let x = BigNum::from_slice(x).map_err(|_| VauError::DecodingError)?;
    let y = BigNum::from_slice(y).map_err(|_| VauError::DecodingError)?;
    // rejects points off the curve
    EcKey::from_public_key_affine_coordinates(&group, &x, &y).map_err(|_| VauError::DecodingError)
}

pub(crate) fn public_coordinates<T: HasPublic>(
    group: &EcGroupRef,
    key: &EcKeyRef<T>,
    size: usize,
) -> Result<(Vec<u8>, Vec<u8>), VauError> {
    let mut ctx = BigNumContext::new().map_err(|_| VauError::InternalError)?;
    let mut x = BigNum::new().map_err(|_| VauError::InternalError)?;
    let mut y = BigNum::new().map_err(|_| VauError::InternalError)?;
    key.public_key()
        .affine_coordinates_gfp(group, &mut x, &mut y, &mut ctx)
        .map_err(|_| VauError::InternalError)?;
    Ok((coordinate_bytes(&x, size)?, coordinate_bytes(&y, size)?))
}

fn derive_key<T: HasPublic>(
    ours: &EcKeyRef<Private>,
    theirs: &EcKeyRef<T>,
    spec: &VauEciesSpec,
) -> Result<Vec<u8>, VauError> {
    let ours = PKey::from_ec_key(ours.to_owned()).map_err(|_| VauError::InvalidKey)?;
    let theirs = PKey::from_ec_key(theirs.to_owned()).map_err(|_| VauError::InvalidKey)?;
    let mut deriver = Deriver::new(&ours).map_err(|_| VauError::InternalError)?;
    deriver
        .set_peer(&theirs)
        .map_err(|_| VauError::InvalidKey)?;
    let shared_secret = deriver
        .derive_to_vec()
        .map_err(|_| VauError::InternalError)?;
    hkdf_sha256(&shared_secret, spec.info, spec.key_size)
}
