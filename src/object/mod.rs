// Copyright 2023-2026 Simo Sorce
// See LICENSE.txt file for terms

//! This module defines the stored representation of objects (`Object`)
//! and the associated factory system (`ObjectFactory` trait,
//! `ObjectFactories` registry) used to validate creation templates and to
//! answer attribute queries. Key specific behavior lives in the `key`
//! submodule and in the key type modules that implement factories.

use std::fmt::Debug;

use crate::attribute::Attribute;
use crate::error::{Error, Result};
use crate::pkcs11::*;

use num_bigint::BigUint;
use zeroize::Zeroize;

pub mod factory;
pub mod key;

pub use factory::{
    attr_element, AttrBuffer, AttrRequest, AttrResult, AttrResults, OAFlags,
    ObjectAttr, ObjectFactories, ObjectFactory, ObjectFactoryData,
    ObjectType, SlotStatus,
};

pub use key::{KeyFactory, PrivKeyFactory};

/// Helper macro that generates methods to retrieve attributes
/// values of a specific type from objects
macro_rules! attr_as_type {
    (make $name:ident; with $r:ty; via $conv:ident) => {
        #[doc = concat!("Returns the value of the attribute as a `", stringify!($r), "`")]
        pub fn $name(&self, t: CK_ATTRIBUTE_TYPE) -> Result<$r> {
            match self.get_attr(t) {
                Some(attr) => attr.$conv(),
                None => Err(CKR_ATTRIBUTE_TYPE_INVALID)?,
            }
        }
    };
}

/// This is the container for stored objects
///
/// Objects holding sensitive values are flagged for zeroization, which
/// wipes every attribute when the object is dropped.
#[derive(Debug, Clone)]
pub struct Object {
    /// The object handle value
    ///
    /// CK_INVALID_HANDLE until the object is stored
    handle: CK_OBJECT_HANDLE,
    /// All objects have a class so we keep it here in order to access it
    /// directly in some internal functions
    class: CK_OBJECT_CLASS,
    /// The object attributes as vector of [Attribute] values
    attributes: Vec<Attribute>,
    /// Flag to indicate if the object needs to be zeroized when it is
    /// drop()ed
    zeroize: bool,
}

impl Drop for Object {
    fn drop(&mut self) {
        if self.zeroize {
            for a in self.attributes.iter_mut() {
                a.zeroize()
            }
        }
    }
}

impl Object {
    /// Creates a new Object holding only its class
    pub fn new(class: CK_OBJECT_CLASS) -> Object {
        Object {
            handle: CK_INVALID_HANDLE,
            class: class,
            attributes: vec![Attribute::from_ulong(CKA_CLASS, class)],
            zeroize: false,
        }
    }

    /// Set zeroization for the whole object
    pub fn set_zeroize(&mut self) {
        self.zeroize = true;
    }

    /// Reports whether the object will be wiped on drop
    pub fn is_zeroize(&self) -> bool {
        self.zeroize
    }

    pub(crate) fn set_handle(&mut self, h: CK_OBJECT_HANDLE) {
        self.handle = h
    }

    /// Gets the object's handle
    pub fn get_handle(&self) -> CK_OBJECT_HANDLE {
        self.handle
    }

    /// Gets the object's class
    pub fn get_class(&self) -> CK_OBJECT_CLASS {
        self.class
    }

    /// Get an attribute from the object by attribute id
    pub fn get_attr(&self, ck_type: CK_ATTRIBUTE_TYPE) -> Option<&Attribute> {
        self.attributes.iter().find(|r| r.get_type() == ck_type)
    }

    /// Adds an attribute while the object is being built
    ///
    /// Fails with CKR_TEMPLATE_INCONSISTENT if the object already holds
    /// an attribute of the same type; stored objects are never modified.
    pub(crate) fn add_attr(&mut self, a: Attribute) -> Result<()> {
        if self.get_attr(a.get_type()).is_some() {
            return Err(Error::ck_rv_with_errmsg(
                CKR_TEMPLATE_INCONSISTENT,
                format!("duplicate attribute {}", a.name()),
            ));
        }
        self.attributes.push(a);
        Ok(())
    }

    /// Gets a reference to the internal vector of object attributes
    pub fn get_attributes(&self) -> &Vec<Attribute> {
        &self.attributes
    }

    attr_as_type! {make get_attr_as_ulong; with CK_ULONG; via to_ulong}
    attr_as_type! {make get_attr_as_biguint; with BigUint; via to_biguint}

    /// Returns the rough size of the object in bytes
    pub fn rough_size(&self) -> usize {
        let mut size = std::mem::size_of::<Attribute>() * self.attributes.len();
        for val in &self.attributes {
            size += val.value_len();
        }
        size
    }
}
