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

//! VAU channel codec: ECIES envelope for requests, AES-GCM for responses.

pub mod aes_gcm;
pub mod client;
pub mod ecies;
pub mod keys;
pub mod model;
pub mod server;
pub mod util;

pub use client::{decrypt_raw_vau_response, encrypt_raw_vau_request, encrypt_raw_vau_request_with};
pub use keys::{
    VauKeyPair, VauPublicKey, generate_key_pair, key_pair_from_der, key_pair_from_pem,
    public_key_from_certificate, public_key_of,
};
pub use model::{InnerVauRequest, RawRequestData, VauAesGcmSpec, VauChannelSpec, VauEciesSpec, VauError};
pub use server::{decrypt_request, encrypt_response};
pub use util::{CryptoConfig, OpenSslRandom, SecureRandom, contains_subslice, index_of, to_hex, utc_now};
