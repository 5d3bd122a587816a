//! Status codes and their categories.

use std::fmt;

/// Response category, the tens digit of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Input = 1,
    Success = 2,
    Redirect = 3,
    TemporaryFailure = 4,
    PermanentFailure = 5,
    ClientCertificateRequired = 6,
}

/// Every status code the server can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Input = 10,
    SensitiveInput = 11,
    Success = 20,
    RedirectTemporary = 30,
    RedirectPermanent = 31,
    TemporaryFailure = 40,
    ServerUnavailable = 41,
    CgiError = 42,
    ProxyError = 43,
    SlowDown = 44,
    PermanentFailure = 50,
    NotFound = 51,
    Gone = 52,
    ProxyRequestRefused = 53,
    BadRequest = 59,
    ClientCertificateRequired = 60,
    CertificateNotAuthorised = 61,
    CertificateNotValid = 62,
}

impl Status {
    const ALL: [Status; 18] = [
        Status::Input,
        Status::SensitiveInput,
        Status::Success,
        Status::RedirectTemporary,
        Status::RedirectPermanent,
        Status::TemporaryFailure,
        Status::ServerUnavailable,
        Status::CgiError,
        Status::ProxyError,
        Status::SlowDown,
        Status::PermanentFailure,
        Status::NotFound,
        Status::Gone,
        Status::ProxyRequestRefused,
        Status::BadRequest,
        Status::ClientCertificateRequired,
        Status::CertificateNotAuthorised,
        Status::CertificateNotValid,
    ];

    /// Numeric code, always two digits.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Status> {
        Self::ALL.into_iter().find(|status| status.code() == code)
    }

    pub fn category(self) -> Category {
        match self.code() / 10 {
            1 => Category::Input,
            2 => Category::Success,
            3 => Category::Redirect,
            4 => Category::TemporaryFailure,
            5 => Category::PermanentFailure,
            _ => Category::ClientCertificateRequired,
        }
    }

    /// Only success responses carry a body.
    pub fn allows_body(self) -> bool {
        self.category() == Category::Success
    }
}

impl TryFrom<u8> for Status {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Status::from_code(code).ok_or(code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.code())
    }
}
