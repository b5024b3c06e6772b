// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! This is p11store
//!
//! An in-memory store for RSA private keys in CRT form that follows the
//! PKCS#11 object model: keys are created from attribute templates, are
//! referred to by opaque handles, and their attributes are exported with
//! the size probe then fill protocol of `C_GetAttributeValue`.
//!
//! ```
//! use num_bigint::BigUint;
//! use p11store::{AttrRequest, AttributeTag, ObjectStore, RsaCrtKey};
//!
//! let key = RsaCrtKey::new(
//!     BigUint::from(299u32),
//!     BigUint::from(65537u32),
//!     BigUint::from(65u32),
//!     BigUint::from(13u32),
//!     BigUint::from(23u32),
//!     BigUint::from(5u32),
//!     BigUint::from(21u32),
//!     BigUint::from(4u32),
//! );
//! let mut store = ObjectStore::new();
//! let handle = store.create(&key.to_template()).unwrap();
//!
//! let mut probe = [AttrRequest::probe(AttributeTag::Modulus)];
//! let res = store.get_attributes(handle, &mut probe).unwrap();
//! assert_eq!(res[0].len(), Some(2));
//!
//! let mut buf = [0u8; 2];
//! let mut fill = [AttrRequest::fill(AttributeTag::Modulus, &mut buf)];
//! store.get_attributes(handle, &mut fill).unwrap();
//! assert_eq!(buf, [0x01, 0x2B]);
//! ```

pub mod attribute;
pub mod codec;
pub mod config;
pub mod error;
#[cfg(feature = "log")]
pub mod log;
pub mod object;
pub mod pkcs11;
pub mod rsa;
pub mod store;

pub use attribute::{AttributeTag, AttributeTemplate, AttributeValue};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use object::{AttrBuffer, AttrRequest, AttrResult, AttrResults, SlotStatus};
pub use rsa::RsaCrtKey;
pub use store::{ObjectStore, SharedStore};

#[cfg(test)]
mod tests;
