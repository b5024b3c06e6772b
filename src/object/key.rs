// Copyright 2023-2026 Simo Sorce
// See LICENSE.txt file for terms

use crate::attribute::AttributeTemplate;
use crate::error::{Error, Result};
use crate::pkcs11::*;

use super::factory::*;
use super::Object;

/// This is a common trait to define factories for objects that
/// are keys, this trait defines attribute common to all key classes.
///
/// [Key objects](https://docs.oasis-open.org/pkcs11/pkcs11-spec/v3.1/os/pkcs11-spec-v3.1-os.html#_Toc111203227)
/// (Version 3.1)

pub trait KeyFactory: ObjectFactory {
    /// The key type of the objects created by this factory
    fn key_type(&self) -> CK_KEY_TYPE;

    /// Adds the attributes PKCS#11 defines for all keys
    fn add_common_key_attrs(&mut self) {
        self.add_common_object_attrs();
        let attrs = self.get_data_mut().get_attributes_mut();
        attrs.push(attr_element!(KeyType; OAFlags::RequiredOnCreate));
    }

    /// Default key creation function
    ///
    /// Uses `default_object_create()` and then checks the key type is
    /// the one this factory handles.
    fn key_create(&self, template: &AttributeTemplate) -> Result<Object> {
        let obj = self.default_object_create(template)?;
        let key_type = obj.get_attr_as_ulong(CKA_KEY_TYPE)?;
        if key_type != self.key_type() {
            return Err(Error::template(
                CKR_TEMPLATE_INCONSISTENT,
                format!("key type {:#x} not handled here", key_type),
            ));
        }
        Ok(obj)
    }
}

/// This is a common trait to define factories for private key objects
///
/// [Private key objects](https://docs.oasis-open.org/pkcs11/pkcs11-spec/v3.1/os/pkcs11-spec-v3.1-os.html#_Toc111203231)
/// (Version 3.1)

pub trait PrivKeyFactory: KeyFactory {
    /// Adds the private key attributes
    fn add_common_private_key_attrs(&mut self) {
        self.add_common_key_attrs();
    }

    /// Creates the key, zeroization follows from its sensitive attributes
    fn privkey_create(&self, template: &AttributeTemplate) -> Result<Object> {
        self.key_create(template)
    }
}
