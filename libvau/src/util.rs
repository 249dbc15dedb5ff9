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

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use openssl::bn::BigNumRef;
use openssl::ec::EcGroup;
use openssl::md::Md;
use openssl::nid::Nid;
use openssl::pkey::Id;
use openssl::pkey_ctx::PkeyCtx;

use super::model::VauError;

/// Source of cryptographically secure random bytes.
pub trait SecureRandom: Send + Sync {
    fn fill(&self, buf: &mut [u8]) -> Result<(), VauError>;
}

/// OpenSSL's CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenSslRandom;

impl SecureRandom for OpenSslRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), VauError> {
        openssl::rand::rand_bytes(buf).map_err(|_| VauError::InternalError)
    }
}

/// Crypto configuration handed to every operation that needs randomness or the curve.
#[derive(Clone)]
pub struct CryptoConfig {
    random: Arc<dyn SecureRandom>,
    curve: Nid,
}

impl CryptoConfig {
    pub fn new(random: Arc<dyn SecureRandom>) -> Self {
        Self {
            random,
            curve: Nid::BRAINPOOL_P256R1,
        }
    }

    pub fn group(&self) -> Result<EcGroup, VauError> {
        EcGroup::from_curve_name(self.curve).map_err(|_| VauError::InternalError)
    }

    pub fn random_bytes(&self, len: usize) -> Result<Vec<u8>, VauError> {
        let mut buf = vec![0u8; len];
        self.random.fill(&mut buf)?;
        Ok(buf)
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self::new(Arc::new(OpenSslRandom))
    }
}

impl std::fmt::Debug for CryptoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoConfig")
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}

/// Unix seconds; 0 for a clock set before the epoch.
pub fn utc_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since_epoch| since_epoch.as_secs())
        .unwrap_or_default()
}

/// Lowercase hex, as used on the wire for request ids and keys.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

pub fn index_of(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    index_of(haystack, needle).is_some()
}

/// HKDF-SHA256, extract then expand, without salt.
pub(crate) fn hkdf_sha256(secret: &[u8], info: &[u8], out_len: usize) -> Result<Vec<u8>, VauError> {
    let mut ctx = PkeyCtx::new_id(Id::HKDF).map_err(|_| VauError::InternalError)?;
    ctx.derive_init().map_err(|_| VauError::InternalError)?;
    ctx.set_hkdf_md(Md::sha256())
        .map_err(|_| VauError::InternalError)?;
    ctx.set_hkdf_key(secret)
        .map_err(|_| VauError::InternalError)?;
    if !info.is_empty() {
        ctx.add_hkdf_info(info)
            .map_err(|_| VauError::InternalError)?;
    }
    let mut out = vec![0u8; out_len];
    let len = ctx
        .derive(Some(&mut out))
        .map_err(|_| VauError::InternalError)?;
    if len != out_len {
        return Err(VauError::InternalError);
    }
    Ok(out)
}

/// Big-endian, left padded with zeroes to exactly `size` bytes.
pub(crate) fn coordinate_bytes(n: &BigNumRef, size: usize) -> Result<Vec<u8>, VauError> {
    let bytes = n.to_vec();
    if bytes.len() > size {
        return Err(VauError::InvalidKey);
    }
    let mut padded = vec![0u8; size - bytes.len()];
    padded.extend(bytes);
    Ok(padded)
}
