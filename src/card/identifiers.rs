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

//! Identifiers and secrets as they appear in command parameters, range checked on construction.

use std::fmt;

use super::CardError;

fn out_of_range(name: &'static str, value: usize) -> CardError {
    CardError::ParameterOutOfRange { name, value }
}

/// gemSpec_COS#N006.700: 1 to 30.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortFileIdentifier(u8);

impl ShortFileIdentifier {
    pub fn new(sfi: u8) -> Result<Self, CardError> {
        if (1..=30).contains(&sfi) {
            Ok(ShortFileIdentifier(sfi))
        } else {
            Err(out_of_range("short file identifier", sfi.into()))
        }
    }

    pub fn sf_id(&self) -> u8 {
        self.0
    }
}

/// gemSpec_COS#N006.600: `1000` to `FEFE` except `3FFF`, or `011C`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentifier(u16);

impl FileIdentifier {
    pub fn new(fid: u16) -> Result<Self, CardError> {
        if ((0x1000..=0xFEFE).contains(&fid) && fid != 0x3FFF) || fid == 0x011C {
            Ok(FileIdentifier(fid))
        } else {
            Err(out_of_range("file identifier", fid.into()))
        }
    }

    pub fn bytes(&self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

/// gemSpec_COS#N010.200: 5 to 16 octets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApplicationIdentifier(Vec<u8>);

impl ApplicationIdentifier {
    pub fn new(aid: &[u8]) -> Result<Self, CardError> {
        if (5..=16).contains(&aid.len()) {
            Ok(ApplicationIdentifier(aid.to_vec()))
        } else {
            Err(out_of_range("application identifier length", aid.len()))
        }
    }

    pub fn from_hex(aid: &str) -> Result<Self, CardError> {
        let aid = hex::decode(aid).map_err(|e| CardError::InvalidArgument(e.to_string()))?;
        Self::new(&aid)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ApplicationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}

/// gemSpec_COS#N015.000: password identifier, at most 31.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PasswordReference(u8);

impl PasswordReference {
    /// PIN.CH of the eGK
    pub const PIN_CH: PasswordReference = PasswordReference(1);
    /// CAN of the eGK, used for PACE
    pub const CAN: PasswordReference = PasswordReference(2);

    pub fn new(pwd_id: u8) -> Result<Self, CardError> {
        if pwd_id <= 31 {
            Ok(PasswordReference(pwd_id))
        } else {
            Err(out_of_range("password identifier", pwd_id.into()))
        }
    }

    pub fn pwd_id(&self) -> u8 {
        self.0
    }

    /// gemSpec_COS#N072.800: DF specific references have bit b8 set.
    pub fn calculate_key_reference(&self, df_specific: bool) -> u8 {
        if df_specific { self.0 | 0x80 } else { self.0 }
    }
}

/// gemSpec_COS#N016.400: key identifier, 1 to 28.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyReference(u8);

impl KeyReference {
    /// PrK.CH.AUT.E256 in DF.ESIGN of the eGK
    pub const PRK_CH_AUT_E256: KeyReference = KeyReference(4);

    pub fn new(key_id: u8) -> Result<Self, CardError> {
        if (1..=28).contains(&key_id) {
            Ok(KeyReference(key_id))
        } else {
            Err(out_of_range("key identifier", key_id.into()))
        }
    }

    pub fn calculate_key_reference(&self, df_specific: bool) -> u8 {
        if df_specific { self.0 | 0x80 } else { self.0 }
    }
}

/// A PIN in format 2 (ISO 9564-1): `2N` followed by the BCD digits, padded with `F` to 8 octets.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedPinFormat2([u8; 8]);

impl EncryptedPinFormat2 {
    pub fn new(pin: &str) -> Result<Self, CardError> {
        if !(4..=12).contains(&pin.len()) {
            return Err(out_of_range("pin length", pin.len()));
        }
        if !pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CardError::InvalidArgument("pin must consist of digits".to_string()));
        }
        let mut nibbles = Vec::with_capacity(16);
        nibbles.push(0x2);
        nibbles.push(pin.len() as u8);
        nibbles.extend(pin.bytes().map(|b| b - b'0'));
        nibbles.resize(16, 0xF);

        let mut bytes = [0u8; 8];
        for (byte, pair) in bytes.iter_mut().zip(nibbles.chunks(2)) {
            *byte = (pair[0] << 4) | pair[1];
        }
        Ok(EncryptedPinFormat2(bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for EncryptedPinFormat2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptedPinFormat2(***)")
    }
}
