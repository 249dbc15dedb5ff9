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

//! Client side of the eRp VAU channel.
//!
//! - [`vau`]: inner HTTP framing around the `vau` codec crate
//! - [`trust`]: certificate and OCSP validation, the cached truststore
//! - [`client`]: async client sending requests through the channel
//! - [`card`]: health card commands and secure messaging
//! - [`conf`]: configuration of client and truststore

pub mod card;
pub mod client;
pub mod conf;
pub mod trust;
pub mod vau;
