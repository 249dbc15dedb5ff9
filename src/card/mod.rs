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

//! Health card commands (gemSpec_COS) on top of ISO 7816-4 APDUs.
//!
//! A card is a single threaded state machine: a [`CardChannel`] is driven through `&mut`, so
//! there is at most one command in flight per channel.

use thiserror::Error;

pub mod apdu;
pub mod channel;
pub mod command;
pub mod identifiers;
pub mod secure_messaging;
pub mod status;

pub use apdu::{CommandApdu, ResponseApdu};
pub use channel::CardChannel;
pub use command::{ExpectedLength, HealthCardCommand, HealthCardResponse, PsoAlgorithm, UnlockMethod};
pub use identifiers::{
    ApplicationIdentifier, EncryptedPinFormat2, FileIdentifier, KeyReference, PasswordReference,
    ShortFileIdentifier,
};
pub use secure_messaging::{PaceKey, SecureCardChannel, SecureMessaging};
pub use status::{Classification, ResponseStatus, StatusTable};

#[derive(Debug, Error)]
pub enum CardError {
    #[error("{name} out of range: {value}")]
    ParameterOutOfRange { name: &'static str, value: usize },
    #[error("apdu of {length} bytes exceeds the transceive limit of {max}")]
    ApduTooLong { length: usize, max: usize },
    #[error("card channel: {0}")]
    Channel(#[from] std::io::Error),
    #[error("card responded with {0:?}")]
    Response(ResponseStatus),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("secure messaging: {0}")]
    SecureMessaging(&'static str),
}

impl From<openssl::error::ErrorStack> for CardError {
    fn from(_: openssl::error::ErrorStack) -> Self {
        CardError::SecureMessaging("cipher failure")
    }
}
