// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! The object store: a handle indexed table of objects created from
//! attribute templates and queried with the PKCS#11 two phase protocol,
//! where callers first probe for the size of an attribute then fill a
//! buffer of the right size.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::attribute::{AttrType, AttributeTag, AttributeTemplate};
use crate::codec;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::object::{AttrRequest, AttrResults, Object, ObjectFactories};
use crate::pkcs11::*;
use crate::rsa;

use num_bigint::BigUint;
use zeroize::Zeroize;

/// Holds objects and hands out the handles they are accessed by
///
/// Handles start at 1 and are never reused, not even after the object
/// they pointed to is destroyed.
#[derive(Debug)]
pub struct ObjectStore {
    /// The handle the next created object will get
    next_handle: CK_OBJECT_HANDLE,
    objects: HashMap<CK_OBJECT_HANDLE, Object>,
    factories: ObjectFactories,
    config: Config,
}

impl Default for ObjectStore {
    fn default() -> ObjectStore {
        ObjectStore::new()
    }
}

impl ObjectStore {
    /// Creates an empty store with the default configuration
    pub fn new() -> ObjectStore {
        ObjectStore::with_config(Config::default())
    }

    /// Creates an empty store with the provided configuration
    pub fn with_config(config: Config) -> ObjectStore {
        let mut factories = ObjectFactories::new();
        rsa::register(&mut factories);
        log::debug!(
            "{}: new store (max objects: {:?})",
            config.description(),
            config.max_objects()
        );
        ObjectStore {
            next_handle: 1,
            objects: HashMap::new(),
            factories: factories,
            config: config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validates the template and stores the resulting object
    ///
    /// Returns the handle of the new object. On failure the store is left
    /// untouched and no handle is consumed.
    pub fn create(
        &mut self,
        template: &AttributeTemplate,
    ) -> Result<CK_OBJECT_HANDLE> {
        if let Some(max) = self.config.max_objects() {
            if self.objects.len() >= max {
                log::warn!(
                    "{}: object limit ({}) reached",
                    self.config.description(),
                    max
                );
                return Err(Error::ck_rv_with_errmsg(
                    CKR_DEVICE_MEMORY,
                    format!("the store can't hold more than {} objects", max),
                ));
            }
        }

        let mut object = match self.factories.create(template) {
            Ok(o) => o,
            Err(e) => {
                log::error!(
                    "{}: template rejected: {}",
                    self.config.description(),
                    e
                );
                return Err(e);
            }
        };

        let handle = self.next_handle;
        let next = match handle.checked_add(1) {
            Some(n) => n,
            None => return Err(CKR_DEVICE_MEMORY)?,
        };
        object.set_handle(handle);
        log::debug!(
            "{}: created object {} ({} attributes, ~{} bytes)",
            self.config.description(),
            handle,
            object.get_attributes().len(),
            object.rough_size()
        );
        self.objects.insert(handle, object);
        self.next_handle = next;
        Ok(handle)
    }

    /// Answers an attribute query on the object
    ///
    /// Only an unknown handle fails the whole call, per attribute problems
    /// are reported in the slot of the request that caused them.
    pub fn get_attributes(
        &self,
        handle: CK_OBJECT_HANDLE,
        requests: &mut [AttrRequest],
    ) -> Result<AttrResults> {
        match self.objects.get(&handle) {
            Some(obj) => self.factories.get_object_attributes(obj, requests),
            None => Err(Error::not_found(handle)),
        }
    }

    /// Removes the object from the store
    pub fn destroy(&mut self, handle: CK_OBJECT_HANDLE) -> Result<()> {
        match self.objects.remove(&handle) {
            Some(_) => {
                log::debug!(
                    "{}: destroyed object {}",
                    self.config.description(),
                    handle
                );
                Ok(())
            }
            None => Err(Error::not_found(handle)),
        }
    }

    /// Reads the encoded value of one attribute, probing for its size
    /// first then filling a buffer of exactly that size
    pub fn read_attribute(
        &self,
        handle: CK_OBJECT_HANDLE,
        tag: AttributeTag,
    ) -> Result<Vec<u8>> {
        let mut probe = [AttrRequest::probe(tag)];
        let res = self.get_attributes(handle, &mut probe)?;
        let len = match res[0].len() {
            Some(l) if res[0].is_ok() => l,
            _ => {
                return Err(Error::ck_rv_with_errmsg(
                    res.rv(),
                    format!("{} not available on {}", tag.name(), handle),
                ))
            }
        };

        let mut value = vec![0u8; len];
        let res = {
            let mut fill = [AttrRequest::fill(tag, value.as_mut_slice())];
            self.get_attributes(handle, &mut fill)?
        };
        match res[0].len() {
            Some(l) if res[0].is_ok() => {
                value.truncate(l);
                Ok(value)
            }
            _ => Err(Error::ck_rv_with_errmsg(
                res.rv(),
                format!("failed to read {} from {}", tag.name(), handle),
            )),
        }
    }

    /// Reads an integer attribute
    ///
    /// Enumerated attributes like the class are rejected with
    /// CKR_ATTRIBUTE_TYPE_INVALID.
    pub fn read_biguint(
        &self,
        handle: CK_OBJECT_HANDLE,
        tag: AttributeTag,
    ) -> Result<BigUint> {
        if tag.attrtype() != AttrType::BigIntType {
            return Err(Error::ck_rv_with_errmsg(
                CKR_ATTRIBUTE_TYPE_INVALID,
                format!("{} is not an integer", tag.name()),
            ));
        }
        let mut value = self.read_attribute(handle, tag)?;
        let num = codec::decode(&value);
        value.zeroize();
        num
    }

    /// Number of objects currently stored
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns true if the handle refers to a stored object
    pub fn contains(&self, handle: CK_OBJECT_HANDLE) -> bool {
        self.objects.contains_key(&handle)
    }
}

/// An [ObjectStore] that can be shared between threads
///
/// Every operation holds the store lock for its whole duration.
#[derive(Debug, Default)]
pub struct SharedStore {
    inner: Mutex<ObjectStore>,
}

impl SharedStore {
    pub fn new(store: ObjectStore) -> SharedStore {
        SharedStore {
            inner: Mutex::new(store),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ObjectStore>> {
        match self.inner.lock() {
            Ok(guard) => Ok(guard),
            Err(_) => Err(Error::ck_rv_with_errmsg(
                CKR_GENERAL_ERROR,
                "store lock poisoned".to_string(),
            )),
        }
    }

    pub fn create(
        &self,
        template: &AttributeTemplate,
    ) -> Result<CK_OBJECT_HANDLE> {
        self.lock()?.create(template)
    }

    pub fn get_attributes(
        &self,
        handle: CK_OBJECT_HANDLE,
        requests: &mut [AttrRequest],
    ) -> Result<AttrResults> {
        self.lock()?.get_attributes(handle, requests)
    }

    pub fn destroy(&self, handle: CK_OBJECT_HANDLE) -> Result<()> {
        self.lock()?.destroy(handle)
    }

    pub fn read_attribute(
        &self,
        handle: CK_OBJECT_HANDLE,
        tag: AttributeTag,
    ) -> Result<Vec<u8>> {
        self.lock()?.read_attribute(handle, tag)
    }

    pub fn read_biguint(
        &self,
        handle: CK_OBJECT_HANDLE,
        tag: AttributeTag,
    ) -> Result<BigUint> {
        self.lock()?.read_biguint(handle, tag)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn contains(&self, handle: CK_OBJECT_HANDLE) -> Result<bool> {
        Ok(self.lock()?.contains(handle))
    }

    /// Returns the wrapped store
    pub fn into_inner(self) -> Result<ObjectStore> {
        match self.inner.into_inner() {
            Ok(store) => Ok(store),
            Err(_) => Err(Error::ck_rv_with_errmsg(
                CKR_GENERAL_ERROR,
                "store lock poisoned".to_string(),
            )),
        }
    }
}
