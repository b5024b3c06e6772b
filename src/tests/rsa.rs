// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use super::tests;
use tests::*;

const COMPONENTS: [AttributeTag; 8] = [
    AttributeTag::Modulus,
    AttributeTag::PublicExponent,
    AttributeTag::PrivateExponent,
    AttributeTag::Prime1,
    AttributeTag::Prime2,
    AttributeTag::Exponent1,
    AttributeTag::Exponent2,
    AttributeTag::Coefficient,
];

#[test]
fn test_rsa_key_template() {
    let key = rsa2048_key();
    assert_eq!(key.size(), 256);
    assert_eq!(*key.e(), BigUint::from(65537u32));

    let tmpl = key.to_template();
    assert!(tmpl.zeroize);
    assert_eq!(tmpl.len(), 10);
    assert_eq!(
        tmpl.find(AttributeTag::Class),
        Some(&AttributeValue::Ulong(CKO_PRIVATE_KEY))
    );
    assert_eq!(
        tmpl.find(AttributeTag::KeyType),
        Some(&AttributeValue::Ulong(CKK_RSA))
    );
    for tag in COMPONENTS {
        assert_eq!(tmpl.count(tag), 1);
    }

    /* no private material in debug output */
    let dbg = format!("{:?}", key);
    assert!(dbg.contains(&key.n().to_string()));
    assert!(!dbg.contains(&key.d().to_string()));
    assert!(!dbg.contains(&key.primes()[0].to_string()));
}

#[test]
fn test_rsa_export() {
    let key = rsa2048_key();
    let (store, handle) = store_with_key(&key);

    /* probe every component at once */
    let mut reqs: Vec<AttrRequest> =
        COMPONENTS.iter().map(|t| AttrRequest::probe(*t)).collect();
    let res = ret_or_panic!(store.get_attributes(handle, &mut reqs));
    assert_eq!(res.rv(), CKR_OK);
    let lens: Vec<usize> = res.iter().map(|r| r.len().unwrap()).collect();
    assert_eq!(lens[0], 256);
    assert_eq!(lens[1], 3);
    assert_eq!(lens[3], 128);
    assert_eq!(lens[4], 128);

    /* then fill them */
    let mut bufs: Vec<Vec<u8>> = lens.iter().map(|l| vec![0u8; *l]).collect();
    let mut reqs: Vec<AttrRequest> = COMPONENTS
        .iter()
        .zip(bufs.iter_mut())
        .map(|(t, b)| AttrRequest::fill(*t, b))
        .collect();
    let res = ret_or_panic!(store.get_attributes(handle, &mut reqs));
    assert_eq!(res.rv(), CKR_OK);
    drop(reqs);

    for (i, tag) in COMPONENTS.iter().enumerate() {
        assert_eq!(res[i].len(), Some(lens[i]));
        let value = ret_or_panic!(codec::decode(&bufs[i]));
        assert_eq!(Some(&value), key.component(*tag), "{}", tag.name());
    }
}

#[test]
fn test_rsa_key_from_store() {
    let key = rsa2048_key();
    let (store, handle) = store_with_key(&key);

    let exported = ret_or_panic!(RsaCrtKey::from_store(&store, handle));
    assert_eq!(exported, key);
    assert_eq!(exported.crt_exponents(), key.crt_exponents());
    assert_eq!(exported.coefficient(), key.coefficient());

    assert_rv!(
        RsaCrtKey::from_store(&store, handle + 1),
        CKR_OBJECT_HANDLE_INVALID
    );
}

#[test]
fn test_rsa_signed_encoding() {
    let key = rsa2048_key();

    /* modulus as a two's complement encoder would produce it */
    let mut signed = vec![0u8];
    signed.extend_from_slice(&codec::encode(key.n()));
    assert_eq!(signed.len(), 257);

    let mut tmpl = template_without(&key, AttributeTag::Modulus);
    tmpl.add_bytes(AttributeTag::Modulus, signed);
    let mut store = ObjectStore::new();
    let handle = ret_or_panic!(store.create(&tmpl));

    let modulus =
        ret_or_panic!(store.read_attribute(handle, AttributeTag::Modulus));
    assert_eq!(modulus.len(), 256);
    assert_eq!(modulus[0] & 0x80, 0x80);
    assert_eq!(
        ret_or_panic!(RsaCrtKey::from_store(&store, handle)),
        key
    );
}
