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

//! ISO 7816-4 command and response APDUs.

use super::CardError;

/// `Ne` of a short APDU asking for everything available, encoded as `Le = 00`.
pub const EXPECTED_LENGTH_WILDCARD_SHORT: usize = 256;
/// `Ne` of an extended APDU asking for everything available, encoded as `Le = 0000`.
pub const EXPECTED_LENGTH_WILDCARD_EXTENDED: usize = 65536;

const MAX_NC: usize = 65535;
const MAX_SHORT_NC: usize = 255;

/// Appends a BER length, short or long form. Nothing above `Nc` fits into an APDU.
pub(crate) fn push_ber_length(buf: &mut Vec<u8>, len: usize) -> Result<(), CardError> {
    match len {
        0..=0x7F => buf.push(len as u8),
        0x80..=0xFF => buf.extend_from_slice(&[0x81, len as u8]),
        0x100..=MAX_NC => {
            buf.push(0x82);
            buf.extend_from_slice(&(len as u16).to_be_bytes());
        }
        _ => {
            return Err(CardError::ApduTooLong {
                length: len,
                max: MAX_NC,
            });
        }
    }
    Ok(())
}

/// Appends the tag-length-value `tag`, `value`.
pub(crate) fn push_tlv(buf: &mut Vec<u8>, tag: u8, value: &[u8]) -> Result<(), CardError> {
    buf.push(tag);
    push_ber_length(buf, value.len())?;
    buf.extend_from_slice(value);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandApdu {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Vec<u8>,
    ne: Option<usize>,
}

impl CommandApdu {
    pub fn new(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: Vec<u8>,
        ne: Option<usize>,
    ) -> Result<Self, CardError> {
        if data.len() > MAX_NC {
            return Err(CardError::ParameterOutOfRange {
                name: "Nc",
                value: data.len(),
            });
        }
        if let Some(ne) = ne {
            if ne == 0 || ne > EXPECTED_LENGTH_WILDCARD_EXTENDED {
                return Err(CardError::ParameterOutOfRange {
                    name: "Ne",
                    value: ne,
                });
            }
        }
        Ok(CommandApdu {
            cla,
            ins,
            p1,
            p2,
            data,
            ne,
        })
    }

    pub fn cla(&self) -> u8 {
        self.cla
    }

    pub fn ins(&self) -> u8 {
        self.ins
    }

    pub fn p1(&self) -> u8 {
        self.p1
    }

    pub fn p2(&self) -> u8 {
        self.p2
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn ne(&self) -> Option<usize> {
        self.ne
    }

    pub fn header(&self) -> [u8; 4] {
        [self.cla, self.ins, self.p1, self.p2]
    }

    /// Needs the extended length encoding of `Lc` and `Le`.
    pub fn is_extended_length(&self) -> bool {
        self.data.len() > MAX_SHORT_NC || self.ne.is_some_and(|ne| ne > EXPECTED_LENGTH_WILDCARD_SHORT)
    }

    /// Encodes the APDU as one of the cases 1, 2s, 2e, 3s, 3e, 4s or 4e.
    pub fn to_bytes(&self) -> Vec<u8> {
        let extended = self.is_extended_length();
        let mut bytes = Vec::with_capacity(4 + 3 + self.data.len() + 3);
        bytes.extend_from_slice(&self.header());

        if !self.data.is_empty() {
            let nc = self.data.len();
            if extended {
                bytes.push(0x00);
                bytes.extend_from_slice(&(nc as u16).to_be_bytes());
            } else {
                bytes.push(nc as u8);
            }
            bytes.extend_from_slice(&self.data);
        }

        if let Some(ne) = self.ne {
            if extended {
                // case 2e carries the leading zero octet, case 4e has it in Lc already
                if self.data.is_empty() {
                    bytes.push(0x00);
                }
                // 65536 wraps to 0000
                bytes.extend_from_slice(&((ne % EXPECTED_LENGTH_WILDCARD_EXTENDED) as u16).to_be_bytes());
            } else {
                // 256 wraps to 00
                bytes.push((ne % EXPECTED_LENGTH_WILDCARD_SHORT) as u8);
            }
        }
        bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseApdu {
    data: Vec<u8>,
    sw: u16,
}

impl ResponseApdu {
    pub fn new(data: Vec<u8>, sw: u16) -> Self {
        ResponseApdu { data, sw }
    }

    /// Splits the trailing status word off `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CardError> {
        let Some(split) = bytes.len().checked_sub(2) else {
            return Err(CardError::InvalidArgument(format!(
                "response apdu of {} bytes lacks a status word",
                bytes.len()
            )));
        };
        Ok(ResponseApdu {
            data: bytes[..split].to_vec(),
            sw: u16::from_be_bytes([bytes[split], bytes[split + 1]]),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn sw(&self) -> u16 {
        self.sw
    }

    pub fn sw1(&self) -> u8 {
        (self.sw >> 8) as u8
    }

    pub fn sw2(&self) -> u8 {
        self.sw as u8
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.data.clone();
        bytes.extend_from_slice(&self.sw.to_be_bytes());
        bytes
    }
}
