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

use openssl::ec::{EcKey, EcKeyRef};
use openssl::pkey::{HasPublic, Private, Public};
use openssl::x509::X509;

use super::model::VauError;
use super::util::CryptoConfig;

pub type VauPublicKey = EcKey<Public>;
pub type VauKeyPair = EcKey<Private>;

pub fn generate_key_pair(config: &CryptoConfig) -> Result<VauKeyPair, VauError> {
    let group = config.group()?;
    EcKey::generate(&group).map_err(|_| VauError::InternalError)
}

/// Accepts SEC1 `EC PRIVATE KEY` PEM; a leading `EC PARAMETERS` block is skipped.
pub fn key_pair_from_pem(pem: &[u8]) -> Result<VauKeyPair, VauError> {
    let key = EcKey::private_key_from_pem(pem).map_err(|_| VauError::DecodingError)?;
    key.check_key().map_err(|_| VauError::InvalidKey)?;
    Ok(key)
}

pub fn key_pair_from_der(der: &[u8]) -> Result<VauKeyPair, VauError> {
    let key = EcKey::private_key_from_der(der).map_err(|_| VauError::DecodingError)?;
    key.check_key().map_err(|_| VauError::InvalidKey)?;
    Ok(key)
}

/// Extracts the EC public key of a DER certificate.
pub fn public_key_from_certificate(der: &[u8]) -> Result<VauPublicKey, VauError> {
    let cert = X509::from_der(der).map_err(|_| VauError::DecodingError)?;
    let key = cert.public_key().map_err(|_| VauError::DecodingError)?;
    key.ec_key().map_err(|_| VauError::InvalidKey)
}

/// Only the public half of `key`.
pub fn public_key_of<T: HasPublic>(key: &EcKeyRef<T>) -> Result<VauPublicKey, VauError> {
    EcKey::from_public_key(key.group(), key.public_key()).map_err(|_| VauError::InvalidKey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecies::public_coordinates;

    #[test]
    fn it_generates_brainpool_keys() {
        let config = CryptoConfig::default();
        let key = generate_key_pair(&config).unwrap();
        assert_eq!(
            key.group().curve_name(),
            Some(openssl::nid::Nid::BRAINPOOL_P256R1)
        );
        let public = public_key_of(&key).unwrap();
        let group = config.group().unwrap();
        assert_eq!(
            public_coordinates(&group, &public, 32).unwrap(),
            public_coordinates(&group, &key, 32).unwrap()
        );
    }

    #[test]
    fn it_rejects_garbage() {
        assert_eq!(
            key_pair_from_pem(b"-----BEGIN NOTHING-----").err(),
            Some(VauError::DecodingError)
        );
        assert_eq!(
            public_key_from_certificate(&[0x30, 0x00]).err(),
            Some(VauError::DecodingError)
        );
    }
}
