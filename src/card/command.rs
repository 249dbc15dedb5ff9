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

//! Health card commands of gemSpec_COS and their execution on a [`CardChannel`].

use tracing::debug;

use super::apdu::{
    EXPECTED_LENGTH_WILDCARD_EXTENDED, EXPECTED_LENGTH_WILDCARD_SHORT, push_tlv,
};
use super::identifiers::KeyReference;
use super::{
    ApplicationIdentifier, CardChannel, CardError, CommandApdu, EncryptedPinFormat2,
    FileIdentifier, PasswordReference, ResponseApdu, ResponseStatus, ShortFileIdentifier,
    StatusTable,
};

const CLA: u8 = 0x00;
const CLA_COMMAND_CHAINING: u8 = 0x10;
const CLA_PROPRIETARY: u8 = 0x80;

const INS_SELECT: u8 = 0xA4;
const INS_READ_BINARY: u8 = 0xB0;
const INS_GENERAL_AUTHENTICATE: u8 = 0x86;
const INS_MANAGE_SECURITY_ENVIRONMENT: u8 = 0x22;
const INS_CHANGE_REFERENCE_DATA: u8 = 0x24;
const INS_VERIFY: u8 = 0x20;
const INS_GET_PIN_STATUS: u8 = 0x20;
const INS_PSO: u8 = 0x2A;
const INS_RESET_RETRY_COUNTER: u8 = 0x2C;
const INS_GET_RANDOM: u8 = 0x84;

/// Dynamic authentication data of GENERAL AUTHENTICATE
const TAG_DYNAMIC_AUTHENTICATION_DATA: u8 = 0x7C;

const MAX_OFFSET_WITHOUT_SFI: usize = 0x7FFF;
const MAX_OFFSET_WITH_SFI: usize = 0xFF;

/// `Ne` of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedLength {
    Exactly(usize),
    /// As much as the channel supports: 256 or, with extended length, 65536 octets.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockMethod {
    /// Sets a new PIN with the old one.
    ChangeReferenceData,
    /// Resets the retry counter with the PUK.
    ResetRetryCounter,
    /// Resets the retry counter with the PUK and sets a new PIN.
    ResetRetryCounterWithNewSecret,
}

/// Algorithm identifiers of MSE SET for PSO COMPUTE DIGITAL SIGNATURE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsoAlgorithm {
    SignEcdsa,
    SignPkcs1V15,
    SignPss,
}

impl PsoAlgorithm {
    fn identifier(self) -> u8 {
        match self {
            PsoAlgorithm::SignEcdsa => 0x00,
            PsoAlgorithm::SignPkcs1V15 => 0x02,
            PsoAlgorithm::SignPss => 0x05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCardCommand {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Option<Vec<u8>>,
    ne: Option<ExpectedLength>,
    status_table: StatusTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCardResponse {
    pub status: ResponseStatus,
    pub apdu: ResponseApdu,
}

impl HealthCardCommand {
    pub fn new(
        status_table: StatusTable,
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: Option<Vec<u8>>,
        ne: Option<ExpectedLength>,
    ) -> Self {
        HealthCardCommand {
            cla,
            ins,
            p1,
            p2,
            data,
            ne,
            status_table,
        }
    }

    pub fn status_table(&self) -> StatusTable {
        self.status_table
    }

    /// The APDU for a channel with or without extended length support.
    pub fn command_apdu(&self, extended_length_supported: bool) -> Result<CommandApdu, CardError> {
        let ne = self.ne.map(|ne| match ne {
            ExpectedLength::Exactly(ne) => ne,
            ExpectedLength::All if extended_length_supported => EXPECTED_LENGTH_WILDCARD_EXTENDED,
            ExpectedLength::All => EXPECTED_LENGTH_WILDCARD_SHORT,
        });
        CommandApdu::new(
            self.cla,
            self.ins,
            self.p1,
            self.p2,
            self.data.clone().unwrap_or_default(),
            ne,
        )
    }

    /// Transmits the command and maps the status word with the command's table. Status words
    /// unknown to the table yield [`ResponseStatus::UnknownStatus`].
    pub fn execute_on(
        &self,
        channel: &mut impl CardChannel,
    ) -> Result<HealthCardResponse, CardError> {
        let apdu = self.command_apdu(channel.is_extended_length_supported())?;
        let length = apdu.to_bytes().len();
        let max = channel.max_transceive_length();
        if length > max {
            return Err(CardError::ApduTooLong { length, max });
        }
        let response = channel.transmit(&apdu)?;
        let status = self.status_table.map(response.sw());
        debug!(
            "card: {:02X}{:02X} → {:04X} {status:?}",
            self.cla,
            self.ins,
            response.sw()
        );
        Ok(HealthCardResponse {
            status,
            apdu: response,
        })
    }

    /// As [`execute_on`](Self::execute_on), failing with [`CardError::Response`] unless the
    /// status is `Success`.
    pub fn execute_successful_on(
        &self,
        channel: &mut impl CardChannel,
    ) -> Result<HealthCardResponse, CardError> {
        let response = self.execute_on(channel)?;
        match response.status {
            ResponseStatus::Success => Ok(response),
            status => Err(CardError::Response(status)),
        }
    }
}

// SELECT, gemSpec_COS#14.2.6
impl HealthCardCommand {
    pub fn select_root() -> Self {
        Self::select_parent_else_root(false, false)
    }

    /// Selects the parent folder, or the root with `select_parent_else_root = false`.
    pub fn select_parent_else_root(select_parent_else_root: bool, read_first: bool) -> Self {
        let p1 = if select_parent_else_root { 0x03 } else { 0x04 };
        HealthCardCommand::new(
            StatusTable::Select,
            CLA,
            INS_SELECT,
            p1,
            select_p2(read_first, false),
            None,
            read_first.then_some(ExpectedLength::All),
        )
    }

    pub fn select_aid(
        aid: &ApplicationIdentifier,
        select_next_else_first_occurrence: bool,
        request_fcp: bool,
        fcp_length: usize,
    ) -> Self {
        HealthCardCommand::new(
            StatusTable::Select,
            CLA,
            INS_SELECT,
            0x04,
            select_p2(request_fcp, select_next_else_first_occurrence),
            Some(aid.bytes().to_vec()),
            request_fcp.then_some(ExpectedLength::Exactly(fcp_length)),
        )
    }

    pub fn select_fid(
        fid: &FileIdentifier,
        select_df_else_ef: bool,
        request_fcp: bool,
        fcp_length: usize,
    ) -> Self {
        HealthCardCommand::new(
            StatusTable::Select,
            CLA,
            INS_SELECT,
            if select_df_else_ef { 0x01 } else { 0x02 },
            select_p2(request_fcp, false),
            Some(fid.bytes().to_vec()),
            request_fcp.then_some(ExpectedLength::Exactly(fcp_length)),
        )
    }
}

fn select_p2(request_fcp: bool, next_occurrence: bool) -> u8 {
    let p2 = if request_fcp { 0x04 } else { 0x0C };
    if next_occurrence { p2 | 0x02 } else { p2 }
}

// READ BINARY, gemSpec_COS#14.3.2
impl HealthCardCommand {
    /// Reads the current EF from its start.
    pub fn read() -> Self {
        HealthCardCommand::new(
            StatusTable::Read,
            CLA,
            INS_READ_BINARY,
            0x00,
            0x00,
            None,
            Some(ExpectedLength::All),
        )
    }

    /// Reads the current EF from `offset`, at most `7FFF`.
    pub fn read_at(offset: usize) -> Result<Self, CardError> {
        if offset > MAX_OFFSET_WITHOUT_SFI {
            return Err(CardError::ParameterOutOfRange {
                name: "offset",
                value: offset,
            });
        }
        Ok(HealthCardCommand::new(
            StatusTable::Read,
            CLA,
            INS_READ_BINARY,
            (offset >> 8) as u8,
            offset as u8,
            None,
            Some(ExpectedLength::All),
        ))
    }

    pub fn read_sfi(sfi: ShortFileIdentifier) -> Self {
        HealthCardCommand::new(
            StatusTable::Read,
            CLA,
            INS_READ_BINARY,
            0x80 + sfi.sf_id(),
            0x00,
            None,
            Some(ExpectedLength::All),
        )
    }

    /// Reads `ne` octets from `offset`, at most `FF`, of the EF `sfi`.
    pub fn read_sfi_at(
        sfi: ShortFileIdentifier,
        offset: usize,
        ne: ExpectedLength,
    ) -> Result<Self, CardError> {
        if offset > MAX_OFFSET_WITH_SFI {
            return Err(CardError::ParameterOutOfRange {
                name: "offset",
                value: offset,
            });
        }
        Ok(HealthCardCommand::new(
            StatusTable::Read,
            CLA,
            INS_READ_BINARY,
            0x80 + sfi.sf_id(),
            offset as u8,
            None,
            Some(ne),
        ))
    }
}

// GENERAL AUTHENTICATE, gemSpec_COS#14.7.2
impl HealthCardCommand {
    /// Step without data, i.e. the first step of PACE.
    pub fn general_authenticate(command_chaining: bool) -> Self {
        let template = vec![TAG_DYNAMIC_AUTHENTICATION_DATA, 0x00];
        Self::general_authenticate_tagged(command_chaining, template)
    }

    /// Step sending `data` as the context specific object `tag_no` (1 mapping data, 3 ephemeral
    /// public key, 5 authentication token).
    pub fn general_authenticate_with(
        command_chaining: bool,
        data: &[u8],
        tag_no: u8,
    ) -> Result<Self, CardError> {
        let mut object = vec![];
        push_tlv(&mut object, 0x80 | tag_no, data)?;
        let mut template = vec![];
        push_tlv(&mut template, TAG_DYNAMIC_AUTHENTICATION_DATA, &object)?;
        Ok(Self::general_authenticate_tagged(command_chaining, template))
    }

    // PACE answers fit into a short response
    fn general_authenticate_tagged(command_chaining: bool, data: Vec<u8>) -> Self {
        HealthCardCommand::new(
            StatusTable::GeneralAuthenticate,
            if command_chaining {
                CLA_COMMAND_CHAINING
            } else {
                CLA
            },
            INS_GENERAL_AUTHENTICATE,
            0x00,
            0x00,
            Some(data),
            Some(ExpectedLength::Exactly(EXPECTED_LENGTH_WILDCARD_SHORT)),
        )
    }
}

// MANAGE SECURITY ENVIRONMENT, gemSpec_COS#14.9.9
impl HealthCardCommand {
    /// Sets up PACE with the protocol `oid` (content octets) and the password, e.g. the CAN.
    pub fn manage_sec_env_for_pace(
        oid: &[u8],
        password: PasswordReference,
        df_specific: bool,
    ) -> Result<Self, CardError> {
        let mut data = vec![];
        push_tlv(&mut data, 0x80, oid)?;
        data.extend_from_slice(&[0x83, 0x01, password.calculate_key_reference(df_specific)]);
        Ok(HealthCardCommand::new(
            StatusTable::ManageSecurityEnvironment,
            CLA,
            INS_MANAGE_SECURITY_ENVIRONMENT,
            0xC1,
            0xA4,
            Some(data),
            None,
        ))
    }

    /// Selects the private key and algorithm of a following PSO COMPUTE DIGITAL SIGNATURE.
    pub fn manage_sec_env_for_signing(
        key: KeyReference,
        df_specific: bool,
        algorithm: PsoAlgorithm,
    ) -> Self {
        let data = vec![
            0x84,
            0x01,
            key.calculate_key_reference(df_specific),
            0x80,
            0x01,
            algorithm.identifier(),
        ];
        HealthCardCommand::new(
            StatusTable::ManageSecurityEnvironment,
            CLA,
            INS_MANAGE_SECURITY_ENVIRONMENT,
            0x41,
            0xB6,
            Some(data),
            None,
        )
    }
}

// PIN management, gemSpec_COS#14.6
impl HealthCardCommand {
    pub fn change_reference_data(
        password: PasswordReference,
        df_specific: bool,
        old_secret: &EncryptedPinFormat2,
        new_secret: &EncryptedPinFormat2,
    ) -> Self {
        let mut data = old_secret.bytes().to_vec();
        data.extend_from_slice(new_secret.bytes());
        HealthCardCommand::new(
            StatusTable::ChangeReferenceData,
            CLA,
            INS_CHANGE_REFERENCE_DATA,
            0x00,
            password.calculate_key_reference(df_specific),
            Some(data),
            None,
        )
    }

    pub fn get_pin_status(password: PasswordReference, df_specific: bool) -> Self {
        HealthCardCommand::new(
            StatusTable::GetPinStatus,
            CLA_PROPRIETARY,
            INS_GET_PIN_STATUS,
            0x00,
            password.calculate_key_reference(df_specific),
            None,
            None,
        )
    }

    pub fn verify_pin(
        password: PasswordReference,
        df_specific: bool,
        pin: &EncryptedPinFormat2,
    ) -> Self {
        HealthCardCommand::new(
            StatusTable::VerifySecret,
            CLA,
            INS_VERIFY,
            0x00,
            password.calculate_key_reference(df_specific),
            Some(pin.bytes().to_vec()),
            None,
        )
    }

    /// Unlocks a blocked or changes a known PIN of the eGK. `secret` is the PUK, or for
    /// [`UnlockMethod::ChangeReferenceData`] the old PIN.
    pub fn unlock_egk(
        method: UnlockMethod,
        password: PasswordReference,
        df_specific: bool,
        secret: &EncryptedPinFormat2,
        new_secret: Option<&EncryptedPinFormat2>,
    ) -> Result<Self, CardError> {
        let key_reference = password.calculate_key_reference(df_specific);
        let missing_new_secret =
            || CardError::InvalidArgument(format!("{method:?} requires a new secret"));
        Ok(match method {
            UnlockMethod::ChangeReferenceData => Self::change_reference_data(
                password,
                df_specific,
                secret,
                new_secret.ok_or_else(missing_new_secret)?,
            ),
            UnlockMethod::ResetRetryCounter => HealthCardCommand::new(
                StatusTable::UnlockEgk,
                CLA,
                INS_RESET_RETRY_COUNTER,
                0x01,
                key_reference,
                Some(secret.bytes().to_vec()),
                None,
            ),
            UnlockMethod::ResetRetryCounterWithNewSecret => {
                let mut data = secret.bytes().to_vec();
                data.extend_from_slice(new_secret.ok_or_else(missing_new_secret)?.bytes());
                HealthCardCommand::new(
                    StatusTable::UnlockEgk,
                    CLA,
                    INS_RESET_RETRY_COUNTER,
                    0x00,
                    key_reference,
                    Some(data),
                    None,
                )
            }
        })
    }
}

// PSO COMPUTE DIGITAL SIGNATURE, gemSpec_COS#14.8.2; GET RANDOM, gemSpec_COS#14.9.5
impl HealthCardCommand {
    pub fn pso_compute_digital_signature(data_to_be_signed: &[u8]) -> Self {
        HealthCardCommand::new(
            StatusTable::PsoComputeDigitalSignature,
            CLA,
            INS_PSO,
            0x9E,
            0x9A,
            Some(data_to_be_signed.to_vec()),
            Some(ExpectedLength::All),
        )
    }

    pub fn get_random_values(length: usize) -> Self {
        HealthCardCommand::new(
            StatusTable::GetRandomValues,
            CLA_PROPRIETARY,
            INS_GET_RANDOM,
            0x00,
            0x00,
            None,
            Some(ExpectedLength::Exactly(length)),
        )
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::function;
    use rstest::rstest;

    use super::*;
    use crate::card::channel::MockCardChannel;

    fn bytes(command: HealthCardCommand, extended: bool) -> String {
        hex::encode_upper(command.command_apdu(extended).unwrap().to_bytes())
    }

    fn pin(pin: &str) -> EncryptedPinFormat2 {
        EncryptedPinFormat2::new(pin).unwrap()
    }

    fn channel(extended: bool, max: usize, response: &'static str) -> MockCardChannel {
        let mut channel = MockCardChannel::new();
        channel
            .expect_is_extended_length_supported()
            .return_const(extended);
        channel.expect_max_transceive_length().return_const(max);
        channel.expect_transmit().returning(move |_| {
            ResponseApdu::from_bytes(&hex::decode(response).unwrap())
        });
        channel
    }

    #[test]
    fn it_reads_with_sfi_and_offset() {
        let sfi = ShortFileIdentifier::new(4).unwrap();
        let command = HealthCardCommand::read_sfi_at(sfi, 10, ExpectedLength::Exactly(5)).unwrap();
        let apdu = command.command_apdu(false).unwrap();
        assert_eq!(
            (apdu.cla(), apdu.ins(), apdu.p1(), apdu.p2()),
            (0x00, 0xB0, 0x80 + 4, 10)
        );
        assert!(apdu.data().is_empty());
        assert_eq!(apdu.ne(), Some(5));
        assert_eq!(hex::encode_upper(apdu.to_bytes()), "00B0840A05");
    }

    #[rstest]
    #[case(HealthCardCommand::select_root(), false, "00A4040C")]
    #[case(HealthCardCommand::select_parent_else_root(true, true), false, "00A4030400")]
    #[case(
        HealthCardCommand::select_aid(
            &ApplicationIdentifier::from_hex("A000000167455349474E").unwrap(), false, false, 0
        ),
        false,
        "00A4040C0AA000000167455349474E"
    )]
    #[case(
        HealthCardCommand::select_fid(&FileIdentifier::new(0xC504).unwrap(), false, true, 0x20),
        false,
        "00A4020402C50420"
    )]
    #[case(HealthCardCommand::read(), false, "00B0000000")]
    #[case(HealthCardCommand::read(), true, "00B00000000000")]
    #[case(HealthCardCommand::read_at(0x1234).unwrap(), false, "00B0123400")]
    #[case(HealthCardCommand::read_sfi(ShortFileIdentifier::new(1).unwrap()), false, "00B0810000")]
    #[case(HealthCardCommand::general_authenticate(true), false, "10860000027C0000")]
    #[case(HealthCardCommand::general_authenticate(true), true, "10860000027C0000")]
    #[case(
        HealthCardCommand::general_authenticate_with(false, &[0xAB, 0xCD], 1).unwrap(),
        false,
        "00860000067C048102ABCD00"
    )]
    #[case(
        HealthCardCommand::general_authenticate_with(false, &[0xAB, 0xCD], 1).unwrap(),
        true,
        "00860000067C048102ABCD00"
    )]
    #[case(
        HealthCardCommand::manage_sec_env_for_pace(
            &hex::decode("04007F00070202040202").unwrap(), PasswordReference::CAN, false
        ).unwrap(),
        false,
        "0022C1A40F800A04007F00070202040202830102"
    )]
    #[case(
        HealthCardCommand::manage_sec_env_for_signing(
            KeyReference::PRK_CH_AUT_E256, true, PsoAlgorithm::SignEcdsa
        ),
        false,
        "002241B606840184800100"
    )]
    #[case(
        HealthCardCommand::change_reference_data(PasswordReference::PIN_CH, false, &pin("123456"), &pin("654321")),
        false,
        "002400011026123456FFFFFFFF26654321FFFFFFFF"
    )]
    #[case(HealthCardCommand::get_pin_status(PasswordReference::PIN_CH, false), false, "80200001")]
    #[case(
        HealthCardCommand::verify_pin(PasswordReference::PIN_CH, false, &pin("123456")),
        false,
        "002000010826123456FFFFFFFF"
    )]
    #[case(HealthCardCommand::pso_compute_digital_signature(&[0x01, 0x02]), false, "002A9E9A02010200")]
    #[case(HealthCardCommand::get_random_values(16), false, "8084000010")]
    fn it_builds_command_apdus(
        #[case] command: HealthCardCommand,
        #[case] extended: bool,
        #[case] expected: &str,
    ) {
        assert_eq!(bytes(command, extended), expected);
    }

    #[rstest]
    #[case(UnlockMethod::ResetRetryCounter, None, "002C0101082812345678FFFFFF")]
    #[case(
        UnlockMethod::ResetRetryCounterWithNewSecret,
        Some("123456"),
        "002C0001102812345678FFFFFF26123456FFFFFFFF"
    )]
    #[case(
        UnlockMethod::ChangeReferenceData,
        Some("123456"),
        "00240001102812345678FFFFFF26123456FFFFFFFF"
    )]
    fn it_builds_unlock_commands(
        #[case] method: UnlockMethod,
        #[case] new_secret: Option<&str>,
        #[case] expected: &str,
    ) {
        let new_secret = new_secret.map(pin);
        let command = HealthCardCommand::unlock_egk(
            method,
            PasswordReference::PIN_CH,
            false,
            &pin("12345678"),
            new_secret.as_ref(),
        )
        .unwrap();
        assert_eq!(bytes(command, false), expected);
    }

    #[test]
    fn it_requires_a_new_secret_to_change_the_pin() {
        let result = HealthCardCommand::unlock_egk(
            UnlockMethod::ResetRetryCounterWithNewSecret,
            PasswordReference::PIN_CH,
            false,
            &pin("12345678"),
            None,
        );
        assert!(matches!(result, Err(CardError::InvalidArgument(_))));
    }

    #[test]
    fn it_rejects_large_offsets() {
        assert!(HealthCardCommand::read_at(0x8000).is_err());
        let sfi = ShortFileIdentifier::new(1).unwrap();
        assert!(HealthCardCommand::read_sfi_at(sfi, 0x100, ExpectedLength::All).is_err());
    }

    #[test]
    fn it_maps_the_status_of_a_wrong_pin() {
        let mut channel = channel(false, 261, "63C2");
        let command = HealthCardCommand::verify_pin(PasswordReference::PIN_CH, false, &pin("123456"));
        let response = command.execute_on(&mut channel).unwrap();
        assert_eq!(response.status, ResponseStatus::WrongSecretWarningCount(2));

        let result = command.execute_successful_on(&mut channel);
        assert!(matches!(
            result,
            Err(CardError::Response(ResponseStatus::WrongSecretWarningCount(2)))
        ));
    }

    #[test]
    fn it_returns_the_response_data() {
        let mut channel = channel(true, 65546, "0102039000");
        let response = HealthCardCommand::read()
            .execute_successful_on(&mut channel)
            .unwrap();
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.apdu.data(), &[1, 2, 3]);
    }

    #[test]
    fn it_sends_the_wildcard_for_the_channel() {
        let mut channel = MockCardChannel::new();
        channel.expect_is_extended_length_supported().return_const(true);
        channel.expect_max_transceive_length().return_const(1024usize);
        channel
            .expect_transmit()
            .with(function(|apdu: &CommandApdu| apdu.ne() == Some(65536)))
            .times(1)
            .returning(|_| Ok(ResponseApdu::new(vec![0x30], 0x9000)));
        HealthCardCommand::pso_compute_digital_signature(&[0; 32])
            .execute_successful_on(&mut channel)
            .unwrap();
    }

    #[test]
    fn it_refuses_apdus_beyond_the_transceive_limit() {
        let mut channel = MockCardChannel::new();
        channel.expect_is_extended_length_supported().return_const(false);
        channel.expect_max_transceive_length().return_const(8usize);
        channel.expect_transmit().never();
        let result = HealthCardCommand::verify_pin(PasswordReference::PIN_CH, false, &pin("1234"))
            .execute_on(&mut channel);
        assert!(matches!(
            result,
            Err(CardError::ApduTooLong { length: 13, max: 8 })
        ));
    }

    #[test]
    fn it_surfaces_channel_loss() {
        let mut channel = MockCardChannel::new();
        channel.expect_is_extended_length_supported().return_const(false);
        channel.expect_max_transceive_length().return_const(261usize);
        channel.expect_transmit().returning(|_| {
            Err(CardError::Channel(std::io::Error::new(
                std::io::ErrorKind::ConnectionAborted,
                "tag lost",
            )))
        });
        let result = HealthCardCommand::select_root().execute_on(&mut channel);
        assert!(matches!(result, Err(CardError::Channel(_))));
    }

    #[test]
    fn it_maps_unknown_words_without_failing() {
        let mut channel = channel(false, 261, "6F00");
        let response = HealthCardCommand::select_root()
            .execute_on(&mut channel)
            .unwrap();
        assert_eq!(response.status, ResponseStatus::UnknownStatus);
    }
}
