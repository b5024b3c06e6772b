// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

//! RSA private keys in their CRT form: the object factory that defines
//! which attributes such keys hold, and [RsaCrtKey], the set of integers
//! callers load keys from and compare exported keys against.

use std::fmt::Debug;
use std::sync::LazyLock;

use crate::attribute::{AttributeTag, AttributeTemplate};
use crate::codec;
use crate::error::Result;
use crate::object::*;
use crate::pkcs11::*;
use crate::store::ObjectStore;

use num_bigint::BigUint;

#[derive(Debug)]
pub struct RsaPrivKeyFactory {
    data: ObjectFactoryData,
}

impl RsaPrivKeyFactory {
    fn new() -> RsaPrivKeyFactory {
        let mut factory: RsaPrivKeyFactory = RsaPrivKeyFactory {
            data: ObjectFactoryData::new(CKO_PRIVATE_KEY),
        };

        factory.add_common_private_key_attrs();

        let attributes = factory.data.get_attributes_mut();
        attributes.push(attr_element!(Modulus; OAFlags::RequiredOnCreate));
        attributes
            .push(attr_element!(PublicExponent; OAFlags::RequiredOnCreate));
        attributes.push(attr_element!(
            PrivateExponent; OAFlags::Sensitive | OAFlags::RequiredOnCreate));
        attributes.push(attr_element!(
            Prime1; OAFlags::Sensitive | OAFlags::RequiredOnCreate));
        attributes.push(attr_element!(
            Prime2; OAFlags::Sensitive | OAFlags::RequiredOnCreate));
        attributes.push(attr_element!(
            Exponent1; OAFlags::Sensitive | OAFlags::RequiredOnCreate));
        attributes.push(attr_element!(
            Exponent2; OAFlags::Sensitive | OAFlags::RequiredOnCreate));
        attributes.push(attr_element!(
            Coefficient; OAFlags::Sensitive | OAFlags::RequiredOnCreate));

        factory.data.finalize();

        factory
    }
}

impl ObjectFactory for RsaPrivKeyFactory {
    fn create(&self, template: &AttributeTemplate) -> Result<Object> {
        self.privkey_create(template)
    }

    fn get_data(&self) -> &ObjectFactoryData {
        &self.data
    }

    fn get_data_mut(&mut self) -> &mut ObjectFactoryData {
        &mut self.data
    }
}

impl KeyFactory for RsaPrivKeyFactory {
    fn key_type(&self) -> CK_KEY_TYPE {
        CKK_RSA
    }
}

impl PrivKeyFactory for RsaPrivKeyFactory {}

/// The static RSA CRT Private Key factory
static PRIVATE_KEY_FACTORY: LazyLock<Box<dyn ObjectFactory>> =
    LazyLock::new(|| Box::new(RsaPrivKeyFactory::new()));

/// Registers the RSA key factories
pub fn register(ot: &mut ObjectFactories) {
    ot.add_factory(
        ObjectType::new(CKO_PRIVATE_KEY, CKK_RSA),
        &(*PRIVATE_KEY_FACTORY),
    );
}

/// The components of an RSA private key in CRT form
///
/// No consistency check is ever performed between the components, the
/// store keeps and returns whatever it is given.
#[derive(Clone, Eq, PartialEq)]
pub struct RsaCrtKey {
    n: BigUint,
    e: BigUint,
    d: BigUint,
    p: BigUint,
    q: BigUint,
    dp: BigUint,
    dq: BigUint,
    qinv: BigUint,
}

impl Debug for RsaCrtKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaCrtKey")
            .field("n", &self.n)
            .field("e", &self.e)
            .finish_non_exhaustive()
    }
}

impl RsaCrtKey {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n: BigUint,
        e: BigUint,
        d: BigUint,
        p: BigUint,
        q: BigUint,
        dp: BigUint,
        dq: BigUint,
        qinv: BigUint,
    ) -> RsaCrtKey {
        RsaCrtKey {
            n: n,
            e: e,
            d: d,
            p: p,
            q: q,
            dp: dp,
            dq: dq,
            qinv: qinv,
        }
    }

    /// Returns the modulus of the key
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// Returns the public exponent of the key
    pub fn e(&self) -> &BigUint {
        &self.e
    }

    /// Returns the private exponent of the key
    pub fn d(&self) -> &BigUint {
        &self.d
    }

    /// Returns the prime factors
    pub fn primes(&self) -> [&BigUint; 2] {
        [&self.p, &self.q]
    }

    /// Returns the CRT exponents (d mod p-1, d mod q-1)
    pub fn crt_exponents(&self) -> [&BigUint; 2] {
        [&self.dp, &self.dq]
    }

    /// Returns the CRT coefficient (q^-1 mod p)
    pub fn coefficient(&self) -> &BigUint {
        &self.qinv
    }

    /// Returns the modulus size in bytes
    pub fn size(&self) -> usize {
        codec::encoded_len(&self.n)
    }

    /// Returns the component held in the attribute, None for the class
    /// and key type tags
    pub fn component(&self, tag: AttributeTag) -> Option<&BigUint> {
        match tag {
            AttributeTag::Class | AttributeTag::KeyType => None,
            AttributeTag::Modulus => Some(&self.n),
            AttributeTag::PublicExponent => Some(&self.e),
            AttributeTag::PrivateExponent => Some(&self.d),
            AttributeTag::Prime1 => Some(&self.p),
            AttributeTag::Prime2 => Some(&self.q),
            AttributeTag::Exponent1 => Some(&self.dp),
            AttributeTag::Exponent2 => Some(&self.dq),
            AttributeTag::Coefficient => Some(&self.qinv),
        }
    }

    /// Builds the creation template of a private key object holding
    /// this key
    ///
    /// The template is flagged for zeroization.
    pub fn to_template(&self) -> AttributeTemplate {
        let mut tmpl = AttributeTemplate::with_capacity(10);
        tmpl.zeroize = true;
        tmpl.add_ulong(AttributeTag::Class, CKO_PRIVATE_KEY);
        tmpl.add_ulong(AttributeTag::KeyType, CKK_RSA);
        for tag in &AttributeTag::ALL[2..] {
            if let Some(v) = self.component(*tag) {
                tmpl.add_biguint(*tag, v);
            }
        }
        tmpl
    }

    /// Reads back a key from a store object, using the probe then fill
    /// protocol for every component
    pub fn from_store(
        store: &ObjectStore,
        handle: CK_OBJECT_HANDLE,
    ) -> Result<RsaCrtKey> {
        Ok(RsaCrtKey {
            n: store.read_biguint(handle, AttributeTag::Modulus)?,
            e: store.read_biguint(handle, AttributeTag::PublicExponent)?,
            d: store.read_biguint(handle, AttributeTag::PrivateExponent)?,
            p: store.read_biguint(handle, AttributeTag::Prime1)?,
            q: store.read_biguint(handle, AttributeTag::Prime2)?,
            dp: store.read_biguint(handle, AttributeTag::Exponent1)?,
            dq: store.read_biguint(handle, AttributeTag::Exponent2)?,
            qinv: store.read_biguint(handle, AttributeTag::Coefficient)?,
        })
    }
}
