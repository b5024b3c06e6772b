// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! This module provides the attribute vocabulary of the store: the closed
//! set of attribute tags ([AttributeTag]), the values callers put in
//! creation templates ([AttributeValue], [AttributeTemplate]) and the typed
//! values objects hold once created ([Attribute]). It also defines the
//! mapping between PKCS#11 attribute type values and the data type they
//! represent as described in the [AttrType] enumeration.

use std::cmp::Ordering;

use crate::codec;
use crate::error::Result;
use crate::pkcs11::*;

use num_bigint::BigUint;
use zeroize::Zeroize;

/// List of attribute types we understand
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AttrType {
    /// A `CK_ULONG` enumerated value (object class, key type)
    NumType,
    /// An unsigned big integer, exchanged as a minimal big-endian buffer
    BigIntType,
}

/// The attributes an RSA-CRT private key object is made of
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum AttributeTag {
    Class,
    KeyType,
    Modulus,
    PublicExponent,
    PrivateExponent,
    Prime1,
    Prime2,
    Exponent1,
    Exponent2,
    Coefficient,
}

impl AttributeTag {
    /// All tags, in attribute id order
    pub const ALL: [AttributeTag; 10] = [
        AttributeTag::Class,
        AttributeTag::KeyType,
        AttributeTag::Modulus,
        AttributeTag::PublicExponent,
        AttributeTag::PrivateExponent,
        AttributeTag::Prime1,
        AttributeTag::Prime2,
        AttributeTag::Exponent1,
        AttributeTag::Exponent2,
        AttributeTag::Coefficient,
    ];

    /// Returns the PKCS#11 attribute id of the tag
    pub fn id(self) -> CK_ATTRIBUTE_TYPE {
        match self {
            AttributeTag::Class => CKA_CLASS,
            AttributeTag::KeyType => CKA_KEY_TYPE,
            AttributeTag::Modulus => CKA_MODULUS,
            AttributeTag::PublicExponent => CKA_PUBLIC_EXPONENT,
            AttributeTag::PrivateExponent => CKA_PRIVATE_EXPONENT,
            AttributeTag::Prime1 => CKA_PRIME_1,
            AttributeTag::Prime2 => CKA_PRIME_2,
            AttributeTag::Exponent1 => CKA_EXPONENT_1,
            AttributeTag::Exponent2 => CKA_EXPONENT_2,
            AttributeTag::Coefficient => CKA_COEFFICIENT,
        }
    }

    /// Finds the tag for a PKCS#11 attribute id, if it is one we know
    pub fn from_id(id: CK_ATTRIBUTE_TYPE) -> Option<AttributeTag> {
        Attrmap::search_by_id(id).map(|a| a.tag)
    }

    /// Returns the PKCS#11 name of the attribute (eg. "CKA_MODULUS")
    pub fn name(self) -> &'static str {
        match Attrmap::search_by_id(self.id()) {
            Some(a) => a.name,
            None => "",
        }
    }

    /// Returns the data type the attribute holds
    pub fn attrtype(self) -> AttrType {
        match self {
            AttributeTag::Class | AttributeTag::KeyType => AttrType::NumType,
            _ => AttrType::BigIntType,
        }
    }
}

impl From<AttributeTag> for CK_ATTRIBUTE_TYPE {
    fn from(tag: AttributeTag) -> CK_ATTRIBUTE_TYPE {
        tag.id()
    }
}

/// Returns a printable name for any attribute id, known or not
pub fn attr_name(id: CK_ATTRIBUTE_TYPE) -> String {
    match Attrmap::search_by_id(id) {
        Some(a) => a.name.to_string(),
        None => format!("{:#x}", id),
    }
}

/// Struct to map a PKCS#11 attribute to a tag and a printable name
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Attrmap<'a> {
    id: CK_ULONG,
    name: &'a str,
    tag: AttributeTag,
}

impl PartialOrd for Attrmap<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Attrmap<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Attrmap<'_> {
    /// Convenience function to efficiently search for a mapping by id
    fn search_by_id(id: CK_ULONG) -> Option<&'static Attrmap<'static>> {
        match ATTRMAP.binary_search_by(|a| a.id.cmp(&id)) {
            Ok(i) => Some(&ATTRMAP[i]),
            Err(_) => None,
        }
    }
}

/// Helper macro to populate the static attributes map
macro_rules! attrmap_element {
    ($id:expr; as $tag:ident) => {
        Attrmap {
            id: $id,
            name: stringify!($id),
            tag: AttributeTag::$tag,
        }
    };
}

/// The attributes map, must be kept sorted by id
static ATTRMAP: [Attrmap<'_>; 10] = [
    attrmap_element!(CKA_CLASS; as Class),
    attrmap_element!(CKA_KEY_TYPE; as KeyType),
    attrmap_element!(CKA_MODULUS; as Modulus),
    attrmap_element!(CKA_PUBLIC_EXPONENT; as PublicExponent),
    attrmap_element!(CKA_PRIVATE_EXPONENT; as PrivateExponent),
    attrmap_element!(CKA_PRIME_1; as Prime1),
    attrmap_element!(CKA_PRIME_2; as Prime2),
    attrmap_element!(CKA_EXPONENT_1; as Exponent1),
    attrmap_element!(CKA_EXPONENT_2; as Exponent2),
    attrmap_element!(CKA_COEFFICIENT; as Coefficient),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_order_of_attrmap() {
        let mut copy = ATTRMAP.clone();
        copy.sort();
        assert_eq!(ATTRMAP, copy);
    }

    #[test]
    fn tags_map_both_ways() {
        for tag in AttributeTag::ALL {
            assert_eq!(AttributeTag::from_id(tag.id()), Some(tag));
        }
        assert_eq!(AttributeTag::from_id(CKA_LABEL), None);
        assert_eq!(AttributeTag::Prime2.name(), "CKA_PRIME_2");
        assert_eq!(attr_name(CKA_COEFFICIENT), "CKA_COEFFICIENT");
        assert_eq!(attr_name(CKA_LABEL), "0x3");
    }

    #[test]
    fn stored_values_encode() {
        let a = Attribute::from_ulong(CKA_CLASS, CKO_PRIVATE_KEY);
        assert_eq!(a.value_len(), std::mem::size_of::<CK_ULONG>());
        assert_eq!(a.to_bytes(), CKO_PRIVATE_KEY.to_ne_bytes().to_vec());
        assert_eq!(a.to_ulong().unwrap(), CKO_PRIVATE_KEY);
        assert!(a.to_biguint().is_err());

        let a = Attribute::from_biguint(CKA_MODULUS, &BigUint::from(299u32));
        assert_eq!(a.get_attrtype(), AttrType::BigIntType);
        assert_eq!(a.value_len(), 2);
        assert_eq!(a.to_bytes(), vec![0x01, 0x2B]);
        assert_eq!(a.to_biguint().unwrap(), BigUint::from(299u32));
        assert!(a.to_ulong().is_err());
        assert_eq!(a.name(), "CKA_MODULUS");

        let mut buf = [0xAAu8; 1];
        assert_eq!(a.write_value(&mut buf), None);
        assert_eq!(buf, [0xAA]);
        let mut buf = [0xAAu8; 4];
        assert_eq!(a.write_value(&mut buf), Some(2));
        assert_eq!(buf, [0x01, 0x2B, 0xAA, 0xAA]);
    }

    #[test]
    fn stored_integers_are_minimal() {
        let a = Attribute::from_be_bytes(CKA_PRIME_1, &[0, 0, 0x01, 0x2B])
            .unwrap();
        assert_eq!(a.to_bytes(), vec![0x01, 0x2B]);
        assert!(Attribute::from_be_bytes(CKA_PRIME_1, &[]).is_err());

        let mut a = Attribute::from_be_bytes(CKA_PRIME_1, &[0x7F]).unwrap();
        a.zeroize();
        assert_eq!(a.value_len(), 0);
        assert!(a.to_biguint().is_err());

        let mut a = Attribute::from_ulong(CKA_CLASS, CKO_PRIVATE_KEY);
        a.zeroize();
        assert_eq!(a.to_ulong().unwrap(), 0);
    }

    #[test]
    fn template_builder() {
        let mut t = AttributeTemplate::with_capacity(3);
        t.zeroize = true;
        t.add_ulong(AttributeTag::Class, CKO_PRIVATE_KEY);
        t.add_biguint(AttributeTag::Modulus, &BigUint::from(299u32));
        t.add_slice(AttributeTag::PublicExponent, &[0x01, 0x00, 0x01]);
        assert_eq!(t.len(), 3);
        assert_eq!(
            t.find(AttributeTag::Modulus),
            Some(&AttributeValue::Bytes(vec![0x01, 0x2B]))
        );
        assert_eq!(t.find(AttributeTag::Coefficient), None);
        assert_eq!(t.count(AttributeTag::Class), 1);
        t.add_ulong(AttributeTag::Class, CKO_PRIVATE_KEY);
        assert_eq!(t.count(AttributeTag::Class), 2);
    }
}

/// A value as supplied in a creation template
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AttributeValue {
    /// An enumerated value like an object class or a key type
    Ulong(CK_ULONG),
    /// A big-endian unsigned integer encoding
    Bytes(Vec<u8>),
}

/// An ordered list of attributes used to create objects
///
/// Templates that carry private key material can be flagged with
/// `zeroize`, in which case all byte buffers are wiped when the template
/// is dropped.
#[derive(Debug, Clone, Default)]
pub struct AttributeTemplate {
    attrs: Vec<(AttributeTag, AttributeValue)>,
    pub zeroize: bool,
}

impl Drop for AttributeTemplate {
    fn drop(&mut self) {
        if self.zeroize {
            for (_, val) in self.attrs.iter_mut() {
                if let AttributeValue::Bytes(v) = val {
                    v.zeroize();
                }
            }
        }
    }
}

impl AttributeTemplate {
    /// Creates a new empty template
    pub fn new() -> AttributeTemplate {
        Self::with_capacity(0)
    }

    /// Creates a new empty template with the specified capacity
    pub fn with_capacity(capacity: usize) -> AttributeTemplate {
        AttributeTemplate {
            attrs: Vec::with_capacity(capacity),
            zeroize: false,
        }
    }

    /// Add an enumerated value
    pub fn add_ulong(&mut self, tag: AttributeTag, val: CK_ULONG) {
        self.attrs.push((tag, AttributeValue::Ulong(val)));
    }

    /// Add a byte buffer, the vector ownership is transferred to the
    /// template
    pub fn add_bytes(&mut self, tag: AttributeTag, val: Vec<u8>) {
        self.attrs.push((tag, AttributeValue::Bytes(val)));
    }

    /// Add a byte buffer copied from a slice
    pub fn add_slice(&mut self, tag: AttributeTag, val: &[u8]) {
        self.add_bytes(tag, val.to_vec());
    }

    /// Add an integer, stored in its minimal big-endian encoding
    pub fn add_biguint(&mut self, tag: AttributeTag, val: &BigUint) {
        self.add_bytes(tag, codec::encode(val));
    }

    /// Returns the first value associated to the tag
    pub fn find(&self, tag: AttributeTag) -> Option<&AttributeValue> {
        self.attrs.iter().find(|(t, _)| *t == tag).map(|(_, v)| v)
    }

    /// Returns how many times the tag appears in the template
    pub fn count(&self, tag: AttributeTag) -> usize {
        self.attrs.iter().filter(|(t, _)| *t == tag).count()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = &(AttributeTag, AttributeValue)> {
        self.attrs.iter()
    }
}

#[derive(Clone)]
enum StoredValue {
    Ulong(CK_ULONG),
    /* always the minimal encoding, as produced by codec::encode */
    BigInt(Vec<u8>),
}

/// A Rust native, typed attribute as held by a stored object
#[derive(Clone)]
pub struct Attribute {
    ck_type: CK_ATTRIBUTE_TYPE,
    attrtype: AttrType,
    value: StoredValue,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        /* values may be private key material, never print them */
        f.debug_struct("Attribute")
            .field("ck_type", &attr_name(self.ck_type))
            .field("attrtype", &self.attrtype)
            .field("len", &self.value_len())
            .finish()
    }
}

impl Attribute {
    /// Creates an attribute of type AttrType::NumType from a CK_ULONG
    pub fn from_ulong(t: CK_ATTRIBUTE_TYPE, val: CK_ULONG) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::NumType,
            value: StoredValue::Ulong(val),
        }
    }

    /// Creates an attribute of type AttrType::BigIntType from a BigUint
    pub fn from_biguint(t: CK_ATTRIBUTE_TYPE, val: &BigUint) -> Attribute {
        Attribute {
            ck_type: t,
            attrtype: AttrType::BigIntType,
            value: StoredValue::BigInt(codec::encode(val)),
        }
    }

    /// Creates an attribute of type AttrType::BigIntType from a big-endian
    /// buffer
    ///
    /// The buffer is parsed and stored in its minimal form, so leading
    /// zeros supplied by the caller do not survive. Fails with a
    /// `MalformedAttribute` error if the buffer is empty.
    pub fn from_be_bytes(
        t: CK_ATTRIBUTE_TYPE,
        val: &[u8],
    ) -> Result<Attribute> {
        Ok(Attribute::from_biguint(t, &codec::decode(val)?))
    }

    /// Returns the PKCS#11 attribute 'type' which is the attribute ID
    pub fn get_type(&self) -> CK_ATTRIBUTE_TYPE {
        self.ck_type
    }

    /// Returns the internal attribute type
    pub fn get_attrtype(&self) -> AttrType {
        self.attrtype
    }

    /// Returns the name of the attribute as an allocated String
    pub fn name(&self) -> String {
        attr_name(self.ck_type)
    }

    /// Returns the internal value as a CK_ULONG
    ///
    /// Returns a CKR_ATTRIBUTE_TYPE_INVALID error if the value is
    /// not a ulong
    pub fn to_ulong(&self) -> Result<CK_ULONG> {
        match self.value {
            StoredValue::Ulong(u) => Ok(u),
            _ => Err(CKR_ATTRIBUTE_TYPE_INVALID)?,
        }
    }

    /// Returns the internal value as a BigUint
    ///
    /// Returns a CKR_ATTRIBUTE_TYPE_INVALID error if the value is
    /// not a big integer
    pub fn to_biguint(&self) -> Result<BigUint> {
        match self.value {
            StoredValue::BigInt(ref b) => codec::decode(b),
            _ => Err(CKR_ATTRIBUTE_TYPE_INVALID)?,
        }
    }

    /// Returns the length of the encoded value
    pub fn value_len(&self) -> usize {
        match self.value {
            StoredValue::Ulong(_) => std::mem::size_of::<CK_ULONG>(),
            StoredValue::BigInt(ref b) => b.len(),
        }
    }

    /// Copies the encoded value at the start of `buf`
    ///
    /// Returns the number of bytes written, or None without touching the
    /// buffer if it is too small to hold the whole value.
    pub fn write_value(&self, buf: &mut [u8]) -> Option<usize> {
        let len = self.value_len();
        if buf.len() < len {
            return None;
        }
        match self.value {
            StoredValue::Ulong(u) => {
                buf[..len].copy_from_slice(&u.to_ne_bytes())
            }
            StoredValue::BigInt(ref b) => buf[..len].copy_from_slice(b),
        }
        Some(len)
    }

    /// Returns the encoded value
    ///
    /// Enumerated values use the native byte order of a CK_ULONG as
    /// PKCS#11 does, integers use the minimal big-endian encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.value {
            StoredValue::Ulong(u) => u.to_ne_bytes().to_vec(),
            StoredValue::BigInt(ref b) => b.clone(),
        }
    }
}

impl Zeroize for Attribute {
    fn zeroize(&mut self) {
        match self.value {
            StoredValue::Ulong(ref mut u) => u.zeroize(),
            StoredValue::BigInt(ref mut b) => b.zeroize(),
        }
    }
}
