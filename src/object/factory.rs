// Copyright 2023-2026 Simo Sorce
// See LICENSE.txt file for terms

use std::collections::HashMap;
use std::fmt::Debug;

use crate::attribute::{
    attr_name, AttrType, Attribute, AttributeTag, AttributeTemplate,
    AttributeValue,
};
use crate::error::{Error, Result};
use crate::pkcs11::*;

use super::Object;

use bitflags::bitflags;

bitflags! {
    /// A bitflag set that defines attribute properties and behaviors
    #[derive(Debug, Clone, Copy)]
    pub struct OAFlags: u32 {
        /// The attribute holds secret material; objects carrying it are
        /// zeroized when dropped
        const Sensitive            = 0x00000002;

        /// The attribute must be provided in the template on object
        /// creation or the operation will fail
        const RequiredOnCreate     = 0x00000008;
    }
}

/// This object is used to list the attribute that are allowed for specific
/// object types and what properties they have for that object type.

#[derive(Debug, Clone)]
pub struct ObjectAttr {
    /// The attribute tag
    tag: AttributeTag,
    /// The flags that define the attribute properties for the object
    /// class this ObjectAttr is applied to
    flags: OAFlags,
}

impl ObjectAttr {
    /// Creates a new ObjectAttr
    pub fn new(tag: AttributeTag, f: OAFlags) -> ObjectAttr {
        ObjectAttr {
            tag: tag,
            flags: f,
        }
    }

    /// Gets the attribute tag
    pub fn get_tag(&self) -> AttributeTag {
        self.tag
    }

    /// Gets the internal attribute id (type)
    pub fn get_type(&self) -> CK_ATTRIBUTE_TYPE {
        self.tag.id()
    }

    /// Gets the data type of the attribute
    pub fn get_attrtype(&self) -> AttrType {
        self.tag.attrtype()
    }

    /// Check if a specific flag is present on the ObjectAttr
    pub fn is(&self, val: OAFlags) -> bool {
        if val.is_empty() {
            return false;
        }
        self.flags.contains(val)
    }
}

/// Helper to quickly instantiate an ObjectAttr element
#[macro_export]
macro_rules! attr_element {
    ($tag:ident; $flags:expr) => {
        $crate::object::factory::ObjectAttr::new(
            $crate::attribute::AttributeTag::$tag,
            $flags,
        )
    };
}
pub use attr_element;

/// Data every ObjectFactory holds: the class of the objects it creates and
/// the attributes those objects are allowed to (or must) have.

#[derive(Debug)]
pub struct ObjectFactoryData {
    /// Class of the object created by the factory
    class: CK_OBJECT_CLASS,
    /// List of valid attributes and their properties for this factory
    attributes: Vec<ObjectAttr>,
    /// List of attributes considered sensitive
    sensitive: Vec<CK_ATTRIBUTE_TYPE>,
    /// Flag that indicates this factory data has been finalized and cannot
    /// be further modified
    finalized: bool,
}

impl ObjectFactoryData {
    pub fn new(class: CK_OBJECT_CLASS) -> ObjectFactoryData {
        ObjectFactoryData {
            class: class,
            attributes: Vec::new(),
            sensitive: Vec::new(),
            finalized: false,
        }
    }

    /// Return the class of the object created by the factory
    pub fn get_class(&self) -> CK_OBJECT_CLASS {
        self.class
    }

    /// Returns a reference to factory valid attributes and their properties
    pub fn get_attributes(&self) -> &Vec<ObjectAttr> {
        &self.attributes
    }

    /// Returns a mutable reference to factory valid attributes and
    /// their properties
    ///
    /// This method panics if it is called after the factory data has
    /// been finalized.
    pub fn get_attributes_mut(&mut self) -> &mut Vec<ObjectAttr> {
        if self.finalized {
            panic!("Attempted modification after finalization");
        }
        &mut self.attributes
    }

    /// Get the list of sensitive attributes
    ///
    /// Empty until the factory data is finalized
    pub fn get_sensitive(&self) -> &Vec<CK_ATTRIBUTE_TYPE> {
        &self.sensitive
    }

    /// Finalizes the factory data and populates the sensitive list
    pub fn finalize(&mut self) {
        for a in &self.attributes {
            if a.is(OAFlags::Sensitive) {
                self.sensitive.push(a.get_type());
            }
        }
        self.finalized = true;
    }
}

/// This trait must be implemented by any type that defines an object
/// type, like a key object of a specific key type. The ObjectFactory is
/// responsible for defining what are the allowed attributes for the
/// specific object/key type, and any special behaviors for object creation.

pub trait ObjectFactory: Debug + Send + Sync {
    /// Creates a new object from the template
    ///
    /// Uses the default_object_create() internal method by default.
    fn create(&self, template: &AttributeTemplate) -> Result<Object> {
        self.default_object_create(template)
    }

    /// Adds the common object attributes
    fn add_common_object_attrs(&mut self) {
        let attrs = self.get_data_mut().get_attributes_mut();
        attrs.push(attr_element!(Class; OAFlags::RequiredOnCreate));
    }

    /// This function implements the creation of any object type and
    /// encodes common rules to interpret the list of ObjectAttr for the
    /// object.
    ///
    /// The required_flags argument defines what attributes must be provided
    /// in the template by the calling function when their flag matches one
    /// of the flags specified in this argument.
    ///
    /// Every attribute must appear at most once, big integer values are
    /// decoded and stored in their minimal form. No object is returned
    /// unless every check passed.
    ///
    /// This function should not be overridden by specialized factories.

    fn internal_object_create(
        &self,
        template: &AttributeTemplate,
        required_flags: OAFlags,
    ) -> Result<Object> {
        let data = self.get_data();
        let mut obj = Object::new(data.get_class());

        let attributes = data.get_attributes();
        for (tag, val) in template.iter() {
            let attr = match attributes.iter().find(|a| a.get_tag() == *tag)
            {
                Some(a) => a,
                None => {
                    return Err(Error::template(
                        CKR_ATTRIBUTE_TYPE_INVALID,
                        format!("{} not valid for this object", tag.name()),
                    ))
                }
            };
            if template.count(*tag) > 1 {
                return Err(Error::template(
                    CKR_TEMPLATE_INCONSISTENT,
                    format!("duplicate attribute {}", tag.name()),
                ));
            }
            match (attr.get_attrtype(), val) {
                (AttrType::NumType, AttributeValue::Ulong(u)) => {
                    if *tag == AttributeTag::Class {
                        /* Object::new() already set it */
                        if *u != data.get_class() {
                            return Err(CKR_TEMPLATE_INCONSISTENT)?;
                        }
                        continue;
                    }
                    obj.add_attr(Attribute::from_ulong(tag.id(), *u))?;
                }
                (AttrType::BigIntType, AttributeValue::Bytes(b)) => {
                    let a = Attribute::from_be_bytes(tag.id(), b).map_err(
                        |e| {
                            Error::template_from_error(
                                CKR_ATTRIBUTE_VALUE_INVALID,
                                e,
                            )
                        },
                    )?;
                    obj.add_attr(a)?;
                }
                _ => {
                    return Err(Error::template(
                        CKR_ATTRIBUTE_VALUE_INVALID,
                        format!("wrong value type for {}", tag.name()),
                    ))
                }
            }
        }
        for attr in attributes {
            if obj.get_attr(attr.get_type()).is_none()
                && attr.is(required_flags)
            {
                return Err(Error::template(
                    CKR_TEMPLATE_INCOMPLETE,
                    format!("missing attribute {}", attr.get_tag().name()),
                ));
            }
        }
        let sensitive = data.get_sensitive();
        if obj
            .get_attributes()
            .iter()
            .any(|a| sensitive.contains(&a.get_type()))
        {
            obj.set_zeroize();
        }
        Ok(obj)
    }

    fn default_object_create(
        &self,
        template: &AttributeTemplate,
    ) -> Result<Object> {
        self.internal_object_create(template, OAFlags::RequiredOnCreate)
    }

    /// Helper method to get a reference to the ObjectFactoryData
    fn get_data(&self) -> &ObjectFactoryData;

    /// Helper method to get a mutable reference to the ObjectFactoryData
    fn get_data_mut(&mut self) -> &mut ObjectFactoryData;
}

/// Structure that defines an Object Type
///
/// Holds a Class type and the underlying type.
/// For key objects the underlying type is the key type.

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub struct ObjectType {
    class: CK_ULONG,
    type_: CK_ULONG,
}

impl ObjectType {
    /// Initializes and returns a new ObjectType
    pub fn new(class: CK_ULONG, type_: CK_ULONG) -> ObjectType {
        ObjectType {
            class: class,
            type_: type_,
        }
    }
}

/// The destination of an attribute query
#[derive(Debug)]
pub enum AttrBuffer<'a> {
    /// Only ask for the length of the value, nothing is written
    Probe,
    /// Copy the value at the start of the buffer if it fits entirely
    ///
    /// A zero length buffer behaves like `Probe`.
    Fill(&'a mut [u8]),
}

/// One slot of an attribute query
#[derive(Debug)]
pub struct AttrRequest<'a> {
    type_: CK_ATTRIBUTE_TYPE,
    buffer: AttrBuffer<'a>,
}

impl<'a> AttrRequest<'a> {
    /// A size probe for the attribute
    pub fn probe<T: Into<CK_ATTRIBUTE_TYPE>>(t: T) -> AttrRequest<'a> {
        AttrRequest {
            type_: t.into(),
            buffer: AttrBuffer::Probe,
        }
    }

    /// A request to copy the attribute value in `buf`
    pub fn fill<T: Into<CK_ATTRIBUTE_TYPE>>(
        t: T,
        buf: &'a mut [u8],
    ) -> AttrRequest<'a> {
        AttrRequest {
            type_: t.into(),
            buffer: AttrBuffer::Fill(buf),
        }
    }

    /// Returns the requested attribute id
    pub fn get_type(&self) -> CK_ATTRIBUTE_TYPE {
        self.type_
    }

    /// Returns true if this slot is a size probe
    pub fn is_probe(&self) -> bool {
        matches!(self.buffer, AttrBuffer::Probe)
    }

    /// Returns the caller buffer, if any
    pub fn buffer(&self) -> Option<&[u8]> {
        match self.buffer {
            AttrBuffer::Probe => None,
            AttrBuffer::Fill(ref b) => Some(&**b),
        }
    }
}

/// Outcome of a single query slot
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SlotStatus {
    /// The length was reported and, for non empty fills, the value copied
    Ok,
    /// The object does not have this attribute
    AttributeTypeInvalid,
    /// The caller buffer can't hold the value, nothing was written
    BufferTooSmall,
}

/// The result of a single query slot
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct AttrResult {
    type_: CK_ATTRIBUTE_TYPE,
    status: SlotStatus,
    len: Option<usize>,
}

impl AttrResult {
    /// Returns the attribute id this result refers to
    pub fn get_type(&self) -> CK_ATTRIBUTE_TYPE {
        self.type_
    }

    pub fn status(&self) -> SlotStatus {
        self.status
    }

    /// The required length for probes and short buffers, the number of
    /// bytes written for fills, None for invalid attributes
    pub fn len(&self) -> Option<usize> {
        self.len
    }

    pub fn is_ok(&self) -> bool {
        self.status == SlotStatus::Ok
    }

    /// The PKCS#11 return code of this slot alone
    pub fn rv(&self) -> CK_RV {
        match self.status {
            SlotStatus::Ok => CKR_OK,
            SlotStatus::AttributeTypeInvalid => CKR_ATTRIBUTE_TYPE_INVALID,
            SlotStatus::BufferTooSmall => CKR_BUFFER_TOO_SMALL,
        }
    }
}

/// The ordered results of an attribute query, one per request
#[derive(Debug, Clone, Default)]
pub struct AttrResults {
    slots: Vec<AttrResult>,
}

impl AttrResults {
    /// The return code a PKCS#11 token reports for the whole batch: the
    /// code of the first slot that failed, or CKR_OK
    pub fn rv(&self) -> CK_RV {
        match self.slots.iter().find(|s| !s.is_ok()) {
            Some(s) => s.rv(),
            None => CKR_OK,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttrResult> {
        self.slots.iter()
    }
}

impl std::ops::Index<usize> for AttrResults {
    type Output = AttrResult;

    fn index(&self, idx: usize) -> &AttrResult {
        &self.slots[idx]
    }
}

/// This structure holds all of the registered object factories for
/// the implemented object types.
///
/// It provides accessors to find and retrieve object factories, and
/// to add object factories when a store is set up.

#[derive(Debug)]
pub struct ObjectFactories {
    factories: HashMap<ObjectType, &'static Box<dyn ObjectFactory>>,
}

impl Default for ObjectFactories {
    fn default() -> ObjectFactories {
        ObjectFactories::new()
    }
}

impl ObjectFactories {
    /// Crates a new Object Factory registry
    pub fn new() -> ObjectFactories {
        ObjectFactories {
            factories: HashMap::new(),
        }
    }

    /// Adds a factory to the registry
    pub fn add_factory(
        &mut self,
        otype: ObjectType,
        templ: &'static Box<dyn ObjectFactory>,
    ) {
        self.factories.insert(otype, templ);
    }

    /// Retrieves a factory for the specified object type from the registry
    pub fn get_factory(
        &self,
        otype: ObjectType,
    ) -> Result<&Box<dyn ObjectFactory>> {
        match self.factories.get(&otype) {
            Some(b) => Ok(b),
            None => Err(Error::template(
                CKR_TEMPLATE_INCONSISTENT,
                format!(
                    "unsupported object class {:#x} type {:#x}",
                    otype.class, otype.type_
                ),
            )),
        }
    }

    /// Crates a new object using the appropriate factory based on the
    /// data in the template.
    pub fn create(&self, template: &AttributeTemplate) -> Result<Object> {
        let class = match template.find(AttributeTag::Class) {
            Some(AttributeValue::Ulong(c)) => *c,
            Some(_) => return Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
            None => return Err(CKR_TEMPLATE_INCOMPLETE)?,
        };
        let type_ = match class {
            CKO_PUBLIC_KEY | CKO_PRIVATE_KEY => {
                match template.find(AttributeTag::KeyType) {
                    Some(AttributeValue::Ulong(k)) => *k,
                    Some(_) => return Err(CKR_ATTRIBUTE_VALUE_INVALID)?,
                    None => return Err(CKR_TEMPLATE_INCOMPLETE)?,
                }
            }
            _ => return Err(CKR_TEMPLATE_INCONSISTENT)?,
        };
        self.get_factory(ObjectType::new(class, type_))?
            .create(template)
    }

    /// Returns the object factory associated to the specified object
    pub fn get_object_factory(
        &self,
        obj: &Object,
    ) -> Result<&Box<dyn ObjectFactory>> {
        let class = obj.get_attr_as_ulong(CKA_CLASS)?;
        let type_ = match class {
            CKO_PUBLIC_KEY | CKO_PRIVATE_KEY => {
                obj.get_attr_as_ulong(CKA_KEY_TYPE)?
            }
            _ => 0,
        };
        self.get_factory(ObjectType::new(class, type_))
    }

    /// Answers an attribute query on the provided object.
    ///
    /// Each request is handled on its own: an attribute that is not valid
    /// for the object or a buffer that is too small only affects its own
    /// slot, and the rest of the batch is still processed. Values are
    /// never partially written.
    pub fn get_object_attributes(
        &self,
        obj: &Object,
        requests: &mut [AttrRequest],
    ) -> Result<AttrResults> {
        let factory_attrs =
            self.get_object_factory(obj)?.get_data().get_attributes();

        let mut slots = Vec::with_capacity(requests.len());
        for req in requests.iter_mut() {
            /* check if this attribute is valid/allowed */
            let oa = if factory_attrs
                .iter()
                .any(|a| a.get_type() == req.type_)
            {
                obj.get_attr(req.type_)
            } else {
                None
            };

            let (status, len) = match oa {
                None => (SlotStatus::AttributeTypeInvalid, None),
                Some(oa) => match req.buffer {
                    AttrBuffer::Probe => (SlotStatus::Ok, Some(oa.value_len())),
                    /* an empty buffer only asks for the length */
                    AttrBuffer::Fill(ref buf) if buf.is_empty() => {
                        (SlotStatus::Ok, Some(oa.value_len()))
                    }
                    AttrBuffer::Fill(ref mut buf) => {
                        match oa.write_value(buf) {
                            Some(n) => (SlotStatus::Ok, Some(n)),
                            None => (
                                SlotStatus::BufferTooSmall,
                                Some(oa.value_len()),
                            ),
                        }
                    }
                },
            };
            log::trace!(
                "object {}: {} -> {:?} {:?}",
                obj.get_handle(),
                attr_name(req.type_),
                status,
                len
            );
            slots.push(AttrResult {
                type_: req.type_,
                status: status,
                len: len,
            });
        }
        Ok(AttrResults { slots: slots })
    }
}
