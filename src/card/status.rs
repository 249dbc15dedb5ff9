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

//! Status words of gemSpec_COS and their meaning per command.

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    Success,
    UnknownStatus,

    // 62xx
    CorruptDataWarning,
    EndOfFileWarning,
    FileDeactivated,
    FileTerminated,
    TransportStatusTransportPin,
    TransportStatusEmptyPin,
    PasswordDisabled,

    // 63xx
    AuthenticationFailure,
    /// `63Cx`, `x` tries left before the secret is blocked.
    WrongSecretWarningCount(u8),
    /// `63Cx` of GET PIN STATUS, `x` tries left.
    RetryCounterCount(u8),

    // 64xx, 65xx
    KeyInvalid,
    ParameterMismatch,
    MemoryFailure,

    // 69xx
    WrongFileType,
    SecurityStatusNotSatisfied,
    PasswordBlocked,
    PukBlocked,
    KeyExpired,
    NoKeyReference,
    PasswordNotUsable,
    NoCurrentEf,
    IncorrectSmDo,

    // 6Axx, 6Bxx, 6Dxx
    NumberPreconditionWrong,
    UnsupportedFunction,
    FileNotFound,
    KeyNotFound,
    PasswordNotFound,
    OffsetTooBig,
    InstructionNotSupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    /// Retrying with other user input may succeed, e.g. a wrong PIN with tries left.
    RecoverableWithUserAction,
    Terminal,
    Unknown,
}

impl ResponseStatus {
    pub fn classification(&self) -> Classification {
        use ResponseStatus::*;
        match self {
            Success => Classification::Success,
            UnknownStatus => Classification::Unknown,

            AuthenticationFailure
            | TransportStatusTransportPin
            | TransportStatusEmptyPin
            | SecurityStatusNotSatisfied => Classification::RecoverableWithUserAction,
            WrongSecretWarningCount(n) | RetryCounterCount(n) if *n > 0 => {
                Classification::RecoverableWithUserAction
            }
            WrongSecretWarningCount(_) | RetryCounterCount(_) => Classification::Terminal,

            CorruptDataWarning
            | EndOfFileWarning
            | FileDeactivated
            | FileTerminated
            | PasswordDisabled
            | KeyInvalid
            | ParameterMismatch
            | MemoryFailure
            | WrongFileType
            | PasswordBlocked
            | PukBlocked
            | KeyExpired
            | NoKeyReference
            | PasswordNotUsable
            | NoCurrentEf
            | IncorrectSmDo
            | NumberPreconditionWrong
            | UnsupportedFunction
            | FileNotFound
            | KeyNotFound
            | PasswordNotFound
            | OffsetTooBig
            | InstructionNotSupported => Classification::Terminal,
        }
    }
}

/// The status word table a command is interpreted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTable {
    Select,
    Read,
    GeneralAuthenticate,
    ManageSecurityEnvironment,
    ChangeReferenceData,
    VerifySecret,
    GetPinStatus,
    PsoComputeDigitalSignature,
    UnlockEgk,
    GetRandomValues,
}

impl StatusTable {
    /// Meaning of `sw` within this table, `UnknownStatus` for words the table doesn't know.
    pub fn map(self, sw: u16) -> ResponseStatus {
        match self.lookup(sw) {
            Some(status) => status,
            None => {
                warn!("card: unknown status word {sw:04X} for {self:?}");
                ResponseStatus::UnknownStatus
            }
        }
    }

    fn lookup(self, sw: u16) -> Option<ResponseStatus> {
        use ResponseStatus::*;
        // counters in the low nibble of 63Cx
        let counter = (sw & 0xFFF0 == 0x63C0).then_some((sw & 0x0F) as u8);
        // any command
        match sw {
            0x6987 | 0x6988 => return Some(IncorrectSmDo),
            0x6D00 => return Some(InstructionNotSupported),
            _ => {}
        }
        let status = match self {
            StatusTable::Select => match sw {
                0x9000 => Success,
                0x6283 => FileDeactivated,
                0x6285 => FileTerminated,
                0x6A82 => FileNotFound,
                _ => return None,
            },
            StatusTable::Read => match sw {
                0x9000 => Success,
                0x6281 => CorruptDataWarning,
                0x6282 => EndOfFileWarning,
                0x6981 => WrongFileType,
                0x6982 => SecurityStatusNotSatisfied,
                0x6986 => NoCurrentEf,
                0x6A82 => FileNotFound,
                0x6B00 => OffsetTooBig,
                _ => return None,
            },
            StatusTable::GeneralAuthenticate => match sw {
                0x9000 => Success,
                0x6300 => AuthenticationFailure,
                0x6400 => ParameterMismatch,
                0x6982 => SecurityStatusNotSatisfied,
                0x6983 => KeyExpired,
                0x6985 => NoKeyReference,
                0x6A80 => NumberPreconditionWrong,
                0x6A81 => UnsupportedFunction,
                0x6A88 => KeyNotFound,
                _ => return None,
            },
            StatusTable::ManageSecurityEnvironment => match sw {
                0x9000 => Success,
                0x6A81 => UnsupportedFunction,
                0x6A88 => KeyNotFound,
                _ => return None,
            },
            StatusTable::ChangeReferenceData | StatusTable::VerifySecret => match (sw, counter) {
                (_, Some(n)) => WrongSecretWarningCount(n),
                (0x9000, _) => Success,
                (0x6581, _) => MemoryFailure,
                (0x6982, _) => SecurityStatusNotSatisfied,
                (0x6983, _) => PasswordBlocked,
                (0x6985, _) => PasswordNotUsable,
                (0x6A88, _) => PasswordNotFound,
                _ => return None,
            },
            StatusTable::UnlockEgk => match (sw, counter) {
                (_, Some(n)) => WrongSecretWarningCount(n),
                (0x9000, _) => Success,
                (0x6581, _) => MemoryFailure,
                (0x6982, _) => SecurityStatusNotSatisfied,
                (0x6983, _) => PukBlocked,
                (0x6985, _) => PasswordNotUsable,
                (0x6A88, _) => PasswordNotFound,
                _ => return None,
            },
            StatusTable::GetPinStatus => match (sw, counter) {
                (_, Some(n)) => RetryCounterCount(n),
                (0x9000, _) => Success,
                (0x62C1, _) => TransportStatusTransportPin,
                (0x62C7, _) => TransportStatusEmptyPin,
                (0x62D0, _) => PasswordDisabled,
                (0x6982, _) => SecurityStatusNotSatisfied,
                (0x6A88, _) => PasswordNotFound,
                _ => return None,
            },
            StatusTable::PsoComputeDigitalSignature => match sw {
                0x9000 => Success,
                0x6400 => KeyInvalid,
                0x6982 => SecurityStatusNotSatisfied,
                0x6985 => NoKeyReference,
                0x6A81 => UnsupportedFunction,
                0x6A88 => KeyNotFound,
                _ => return None,
            },
            StatusTable::GetRandomValues => match sw {
                0x9000 => Success,
                0x6982 => SecurityStatusNotSatisfied,
                _ => return None,
            },
        };
        Some(status)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(StatusTable::VerifySecret, 0x63C2, ResponseStatus::WrongSecretWarningCount(2))]
    #[case(StatusTable::VerifySecret, 0x6983, ResponseStatus::PasswordBlocked)]
    #[case(StatusTable::UnlockEgk, 0x6983, ResponseStatus::PukBlocked)]
    #[case(StatusTable::UnlockEgk, 0x63C9, ResponseStatus::WrongSecretWarningCount(9))]
    #[case(StatusTable::GetPinStatus, 0x63C3, ResponseStatus::RetryCounterCount(3))]
    #[case(StatusTable::GetPinStatus, 0x62C1, ResponseStatus::TransportStatusTransportPin)]
    #[case(StatusTable::GeneralAuthenticate, 0x6300, ResponseStatus::AuthenticationFailure)]
    #[case(StatusTable::Read, 0x6B00, ResponseStatus::OffsetTooBig)]
    #[case(StatusTable::Select, 0x6A82, ResponseStatus::FileNotFound)]
    #[case(StatusTable::PsoComputeDigitalSignature, 0x6A88, ResponseStatus::KeyNotFound)]
    #[case(StatusTable::GetRandomValues, 0x9000, ResponseStatus::Success)]
    #[case(StatusTable::Read, 0x6988, ResponseStatus::IncorrectSmDo)]
    fn it_maps_status_words(
        #[case] table: StatusTable,
        #[case] sw: u16,
        #[case] expected: ResponseStatus,
    ) {
        assert_eq!(table.map(sw), expected);
    }

    #[rstest]
    #[case(StatusTable::Select, 0x63C2)]
    #[case(StatusTable::GetRandomValues, 0x6A88)]
    #[case(StatusTable::Read, 0x1234)]
    fn it_maps_unknown_words_to_unknown_status(#[case] table: StatusTable, #[case] sw: u16) {
        assert_eq!(table.map(sw), ResponseStatus::UnknownStatus);
    }

    #[rstest]
    #[case(ResponseStatus::Success, Classification::Success)]
    #[case(ResponseStatus::WrongSecretWarningCount(1), Classification::RecoverableWithUserAction)]
    #[case(ResponseStatus::WrongSecretWarningCount(0), Classification::Terminal)]
    #[case(ResponseStatus::AuthenticationFailure, Classification::RecoverableWithUserAction)]
    #[case(ResponseStatus::PasswordBlocked, Classification::Terminal)]
    #[case(ResponseStatus::KeyNotFound, Classification::Terminal)]
    #[case(ResponseStatus::UnknownStatus, Classification::Unknown)]
    fn it_classifies(#[case] status: ResponseStatus, #[case] expected: Classification) {
        assert_eq!(status.classification(), expected);
    }
}
