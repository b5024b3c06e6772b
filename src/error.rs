// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! Error type used across the store.
//!
//! Every [Error] carries the PKCS#11 return code a token would report for
//! the same failure, so callers that speak PKCS#11 can forward it as is.

use std::error;
use std::fmt;

use crate::pkcs11::*;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    origin: Option<Box<dyn error::Error + Send + Sync>>,
    errmsg: Option<String>,
    ckrv: CK_RV,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[non_exhaustive]
pub enum ErrorKind {
    /* The creation template is malformed, incomplete or inconsistent */
    InvalidTemplate,
    /* No object is associated to the handle */
    ObjectNotFound,
    /* A byte sequence could not be parsed as an integer */
    MalformedAttribute,
    /* The object does not hold the requested attribute */
    AttributeTypeInvalid,
    /* The store reached its configured object limit */
    ResourceExhausted,
    /* The configuration could not be found or parsed */
    Config,
    /* Anything else, see ckrv and origin */
    General,
}

impl ErrorKind {
    fn from_rv(ckrv: CK_RV) -> ErrorKind {
        match ckrv {
            CKR_TEMPLATE_INCOMPLETE
            | CKR_TEMPLATE_INCONSISTENT
            | CKR_ATTRIBUTE_VALUE_INVALID => ErrorKind::InvalidTemplate,
            CKR_OBJECT_HANDLE_INVALID => ErrorKind::ObjectNotFound,
            CKR_ATTRIBUTE_TYPE_INVALID => ErrorKind::AttributeTypeInvalid,
            CKR_DEVICE_MEMORY => ErrorKind::ResourceExhausted,
            _ => ErrorKind::General,
        }
    }
}

impl Error {
    pub fn ck_rv(ckrv: CK_RV) -> Error {
        Error {
            kind: ErrorKind::from_rv(ckrv),
            origin: None,
            errmsg: None,
            ckrv: ckrv,
        }
    }

    pub fn ck_rv_with_errmsg(ckrv: CK_RV, errmsg: String) -> Error {
        Error {
            kind: ErrorKind::from_rv(ckrv),
            origin: None,
            errmsg: Some(errmsg),
            ckrv: ckrv,
        }
    }

    /// A template error, whatever the return code is
    pub fn template(ckrv: CK_RV, errmsg: String) -> Error {
        Error {
            kind: ErrorKind::InvalidTemplate,
            origin: None,
            errmsg: Some(errmsg),
            ckrv: ckrv,
        }
    }

    /// A template error caused by a nested error, for example a value
    /// the codec refused to decode
    pub fn template_from_error<E>(ckrv: CK_RV, error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error {
            kind: ErrorKind::InvalidTemplate,
            origin: Some(error.into()),
            errmsg: None,
            ckrv: ckrv,
        }
    }

    pub fn not_found(handle: CK_OBJECT_HANDLE) -> Error {
        Error {
            kind: ErrorKind::ObjectNotFound,
            origin: None,
            errmsg: Some(format!("no object with handle {}", handle)),
            ckrv: CKR_OBJECT_HANDLE_INVALID,
        }
    }

    pub fn malformed(errmsg: String) -> Error {
        Error {
            kind: ErrorKind::MalformedAttribute,
            origin: None,
            errmsg: Some(errmsg),
            ckrv: CKR_ATTRIBUTE_VALUE_INVALID,
        }
    }

    pub fn config_error<E>(error: E) -> Error
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Error {
            kind: ErrorKind::Config,
            origin: Some(error.into()),
            errmsg: None,
            ckrv: CKR_ARGUMENTS_BAD,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn rv(&self) -> CK_RV {
        self.ckrv
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref e) = self.errmsg {
            return write!(f, "{}", e);
        }
        if let Some(ref o) = self.origin {
            return write!(f, "{}", o);
        }
        match self.ckrv {
            CKR_GENERAL_ERROR => write!(f, "CKR_GENERAL_ERROR"),
            CKR_ARGUMENTS_BAD => write!(f, "CKR_ARGUMENTS_BAD"),
            CKR_ATTRIBUTE_TYPE_INVALID => {
                write!(f, "CKR_ATTRIBUTE_TYPE_INVALID")
            }
            CKR_ATTRIBUTE_VALUE_INVALID => {
                write!(f, "CKR_ATTRIBUTE_VALUE_INVALID")
            }
            CKR_BUFFER_TOO_SMALL => write!(f, "CKR_BUFFER_TOO_SMALL"),
            CKR_DEVICE_MEMORY => write!(f, "CKR_DEVICE_MEMORY"),
            CKR_OBJECT_HANDLE_INVALID => write!(f, "CKR_OBJECT_HANDLE_INVALID"),
            CKR_TEMPLATE_INCOMPLETE => write!(f, "CKR_TEMPLATE_INCOMPLETE"),
            CKR_TEMPLATE_INCONSISTENT => {
                write!(f, "CKR_TEMPLATE_INCONSISTENT")
            }
            _ => write!(f, "{:#x}", self.ckrv),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.origin {
            Some(ref e) => Some(e.as_ref()),
            None => None,
        }
    }
}

impl From<CK_RV> for Error {
    fn from(ckrv: CK_RV) -> Error {
        Error::ck_rv(ckrv)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::config_error(error)
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Error {
        Error::config_error(error)
    }
}
