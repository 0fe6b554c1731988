use std::fmt;

/// Status byte carried in SRSP payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtStatus {
    Success,
    InvalidSubsystem,
    InvalidCommandId,
    InvalidParameter,
    InvalidLength,
    UnsupportedHeaderType,
    MemAllocFail,
    /// A status code outside the documented set.
    Other(u8),
}

impl MtStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => MtStatus::Success,
            1 => MtStatus::InvalidSubsystem,
            2 => MtStatus::InvalidCommandId,
            3 => MtStatus::InvalidParameter,
            4 => MtStatus::InvalidLength,
            5 => MtStatus::UnsupportedHeaderType,
            6 => MtStatus::MemAllocFail,
            other => MtStatus::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            MtStatus::Success => 0,
            MtStatus::InvalidSubsystem => 1,
            MtStatus::InvalidCommandId => 2,
            MtStatus::InvalidParameter => 3,
            MtStatus::InvalidLength => 4,
            MtStatus::UnsupportedHeaderType => 5,
            MtStatus::MemAllocFail => 6,
            MtStatus::Other(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, MtStatus::Success)
    }
}

impl fmt::Display for MtStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MtStatus::Success => write!(f, "success"),
            MtStatus::InvalidSubsystem => write!(f, "invalid subsystem"),
            MtStatus::InvalidCommandId => write!(f, "invalid command id"),
            MtStatus::InvalidParameter => write!(f, "invalid parameter"),
            MtStatus::InvalidLength => write!(f, "invalid length"),
            MtStatus::UnsupportedHeaderType => write!(f, "unsupported extended header type"),
            MtStatus::MemAllocFail => write!(f, "memory allocation failure"),
            MtStatus::Other(code) => write!(f, "status {code:#04x}"),
        }
    }
}
