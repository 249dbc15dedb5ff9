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

//! Secure messaging after PACE, gemSpec_COS#13.
//!
//! Command data travels AES-128-CBC encrypted in `DO87`, the expected length in `DO97`; every
//! APDU carries an AES-CMAC truncated to 8 octets in `DO8E`. The IV of each message is the send
//! sequence counter encrypted with `kEnc`.

use openssl::memcmp;
use openssl::pkey::PKey;
use openssl::sign::Signer;
use openssl::symm::{Cipher, Crypter, Mode};

use super::apdu::{
    EXPECTED_LENGTH_WILDCARD_EXTENDED, EXPECTED_LENGTH_WILDCARD_SHORT, push_tlv,
};
use super::{CardChannel, CardError, CommandApdu, ResponseApdu};

const BLOCK_SIZE: usize = 16;
const MAC_SIZE: usize = 8;

const CLA_SECURE_MESSAGING: u8 = 0x0C;
const TAG_CRYPTOGRAM: u8 = 0x87;
const TAG_LE: u8 = 0x97;
const TAG_STATUS: u8 = 0x99;
const TAG_MAC: u8 = 0x8E;
const PADDING_INDICATOR: u8 = 0x01;

/// Session keys negotiated by PACE.
#[derive(Clone)]
pub struct PaceKey {
    enc: [u8; BLOCK_SIZE],
    mac: [u8; BLOCK_SIZE],
}

impl PaceKey {
    pub fn new(enc: &[u8], mac: &[u8]) -> Result<Self, CardError> {
        let enc = enc
            .try_into()
            .map_err(|_| CardError::SecureMessaging("kEnc must be 16 octets"))?;
        let mac = mac
            .try_into()
            .map_err(|_| CardError::SecureMessaging("kMac must be 16 octets"))?;
        Ok(PaceKey { enc, mac })
    }
}

pub struct SecureMessaging {
    key: PaceKey,
    ssc: [u8; BLOCK_SIZE],
}

impl SecureMessaging {
    pub fn new(key: PaceKey) -> Self {
        SecureMessaging {
            key,
            ssc: [0; BLOCK_SIZE],
        }
    }

    fn increment_ssc(&mut self) {
        for b in self.ssc.iter_mut().rev() {
            let (next, carry) = b.overflowing_add(1);
            *b = next;
            if !carry {
                break;
            }
        }
    }

    /// Protects `command`; the result asks for all available response data.
    pub fn encrypt(&mut self, command: &CommandApdu) -> Result<CommandApdu, CardError> {
        self.increment_ssc();
        let header = [
            command.cla() | CLA_SECURE_MESSAGING,
            command.ins(),
            command.p1(),
            command.p2(),
        ];
        let extended = command.is_extended_length();

        let mut body = vec![];
        if !command.data().is_empty() {
            let mut cryptogram = vec![PADDING_INDICATOR];
            cryptogram.extend(self.cbc(Mode::Encrypt, &pad(command.data()))?);
            push_tlv(&mut body, TAG_CRYPTOGRAM, &cryptogram)?;
        }
        if let Some(ne) = command.ne() {
            if extended {
                let le = ((ne % EXPECTED_LENGTH_WILDCARD_EXTENDED) as u16).to_be_bytes();
                push_tlv(&mut body, TAG_LE, &le)?;
            } else {
                push_tlv(&mut body, TAG_LE, &[(ne % EXPECTED_LENGTH_WILDCARD_SHORT) as u8])?;
            }
        }

        let mut mac_input = self.ssc.to_vec();
        mac_input.extend(pad(&header));
        if !body.is_empty() {
            mac_input.extend(pad(&body));
        }
        let mac = self.mac(&mac_input)?;
        push_tlv(&mut body, TAG_MAC, &mac)?;

        let ne = if extended {
            EXPECTED_LENGTH_WILDCARD_EXTENDED
        } else {
            EXPECTED_LENGTH_WILDCARD_SHORT
        };
        CommandApdu::new(header[0], header[1], header[2], header[3], body, Some(ne))
    }

    /// Verifies and opens a protected response. A response without data objects is a plain
    /// status word, as the card sends for secure messaging errors.
    pub fn decrypt(&mut self, response: &ResponseApdu) -> Result<ResponseApdu, CardError> {
        self.increment_ssc();
        if response.data().is_empty() {
            return Ok(response.clone());
        }

        let mut cryptogram = None;
        let mut status = None;
        let mut mac = None;
        let mut authenticated = vec![];
        let mut rest = response.data();
        while !rest.is_empty() {
            let (tag, value, object_len) = read_tlv(rest)?;
            match tag {
                TAG_MAC => mac = Some(value),
                _ => {
                    authenticated.extend_from_slice(&rest[..object_len]);
                    match tag {
                        TAG_CRYPTOGRAM => cryptogram = Some(value),
                        TAG_STATUS => status = Some(value),
                        _ => {}
                    }
                }
            }
            rest = &rest[object_len..];
        }

        let mac = mac.ok_or(CardError::SecureMessaging("response lacks DO8E"))?;
        let mut mac_input = self.ssc.to_vec();
        mac_input.extend(pad(&authenticated));
        let expected = self.mac(&mac_input)?;
        if mac.len() != MAC_SIZE || !memcmp::eq(mac, &expected) {
            return Err(CardError::SecureMessaging("response mac mismatch"));
        }

        let status: [u8; 2] = status
            .ok_or(CardError::SecureMessaging("response lacks DO99"))?
            .try_into()
            .map_err(|_| CardError::SecureMessaging("DO99 must hold two octets"))?;
        let data = match cryptogram {
            Some([PADDING_INDICATOR, encrypted @ ..]) => unpad(self.cbc(Mode::Decrypt, encrypted)?)?,
            Some(_) => return Err(CardError::SecureMessaging("unknown padding indicator")),
            None => vec![],
        };
        Ok(ResponseApdu::new(data, u16::from_be_bytes(status)))
    }

    /// AES-128-CBC without padding, IV = E(kEnc, SSC).
    fn cbc(&self, mode: Mode, data: &[u8]) -> Result<Vec<u8>, CardError> {
        if data.len() % BLOCK_SIZE != 0 {
            return Err(CardError::SecureMessaging("cryptogram is not block aligned"));
        }
        let iv = aes(Cipher::aes_128_ecb(), Mode::Encrypt, &self.key.enc, None, &self.ssc)?;
        aes(Cipher::aes_128_cbc(), mode, &self.key.enc, Some(&iv), data)
    }

    fn mac(&self, data: &[u8]) -> Result<[u8; MAC_SIZE], CardError> {
        let key = PKey::cmac(&Cipher::aes_128_cbc(), &self.key.mac)?;
        let mut signer = Signer::new_without_digest(&key)?;
        signer.update(data)?;
        let cmac = signer.sign_to_vec()?;
        let mut mac = [0; MAC_SIZE];
        mac.copy_from_slice(&cmac[..MAC_SIZE]);
        Ok(mac)
    }
}

fn aes(
    cipher: Cipher,
    mode: Mode,
    key: &[u8],
    iv: Option<&[u8]>,
    data: &[u8],
) -> Result<Vec<u8>, CardError> {
    let mut crypter = Crypter::new(cipher, mode, key, iv)?;
    crypter.pad(false);
    let mut out = vec![0; data.len() + cipher.block_size()];
    let mut len = crypter.update(data, &mut out)?;
    len += crypter.finalize(&mut out[len..])?;
    out.truncate(len);
    Ok(out)
}

/// ISO 7816-4 padding: `80` then zeros up to the block size.
fn pad(data: &[u8]) -> Vec<u8> {
    let mut padded = data.to_vec();
    padded.push(0x80);
    padded.resize(padded.len().next_multiple_of(BLOCK_SIZE), 0x00);
    padded
}

fn unpad(mut data: Vec<u8>) -> Result<Vec<u8>, CardError> {
    while data.last() == Some(&0x00) {
        data.pop();
    }
    match data.pop() {
        Some(0x80) => Ok(data),
        _ => Err(CardError::SecureMessaging("invalid padding")),
    }
}

/// Tag, value and total length of the first object of `bytes`, for single octet tags.
fn read_tlv(bytes: &[u8]) -> Result<(u8, &[u8], usize), CardError> {
    let malformed = CardError::SecureMessaging("malformed data object");
    let (&tag, rest) = bytes.split_first().ok_or(malformed)?;
    let (len, len_octets) = match rest {
        [len @ 0..=0x7F, ..] => (*len as usize, 1),
        [0x81, len, ..] => (*len as usize, 2),
        [0x82, hi, lo, ..] => (u16::from_be_bytes([*hi, *lo]) as usize, 3),
        _ => return Err(CardError::SecureMessaging("malformed data object")),
    };
    let start = 1 + len_octets;
    let value = bytes
        .get(start..start + len)
        .ok_or(CardError::SecureMessaging("truncated data object"))?;
    Ok((tag, value, start + len))
}

/// A [`CardChannel`] protecting every APDU with secure messaging.
pub struct SecureCardChannel<C> {
    channel: C,
    secure_messaging: SecureMessaging,
}

impl<C: CardChannel> SecureCardChannel<C> {
    pub fn new(channel: C, key: PaceKey) -> Self {
        SecureCardChannel {
            channel,
            secure_messaging: SecureMessaging::new(key),
        }
    }

    pub fn into_inner(self) -> C {
        self.channel
    }
}

impl<C: CardChannel> CardChannel for SecureCardChannel<C> {
    fn transmit(&mut self, command: &CommandApdu) -> Result<ResponseApdu, CardError> {
        let protected = self.secure_messaging.encrypt(command)?;
        let response = self.channel.transmit(&protected)?;
        self.secure_messaging.decrypt(&response)
    }

    fn is_extended_length_supported(&self) -> bool {
        self.channel.is_extended_length_supported()
    }

    /// Limit of the unprotected APDU: the underlying channel's less the secure messaging
    /// overhead of padding, `DO87`, `DO97` and `DO8E`.
    fn max_transceive_length(&self) -> usize {
        self.channel.max_transceive_length().saturating_sub(2 * BLOCK_SIZE)
    }
}
