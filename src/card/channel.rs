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

#[cfg(test)]
use mockall::automock;

use super::{CardError, CommandApdu, ResponseApdu};

/// Exclusive connection to one card, e.g. over NFC.
///
/// A lost connection is reported as [`CardError::Channel`], never retried here.
#[cfg_attr(test, automock)]
pub trait CardChannel {
    fn transmit(&mut self, command: &CommandApdu) -> Result<ResponseApdu, CardError>;

    fn is_extended_length_supported(&self) -> bool;

    /// Maximum length of an encoded command APDU in bytes.
    fn max_transceive_length(&self) -> usize;
}
