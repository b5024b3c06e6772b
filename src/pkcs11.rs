// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! The subset of PKCS#11 identifiers understood by the object store.
//!
//! Values match the OASIS PKCS#11 3.x headers so that codes reported by
//! the store can be compared with those of any token implementation.

#![allow(non_camel_case_types)]

pub type CK_ULONG = std::ffi::c_ulong;
pub type CK_RV = CK_ULONG;
pub type CK_OBJECT_HANDLE = CK_ULONG;
pub type CK_OBJECT_CLASS = CK_ULONG;
pub type CK_KEY_TYPE = CK_ULONG;
pub type CK_ATTRIBUTE_TYPE = CK_ULONG;

pub const CK_INVALID_HANDLE: CK_OBJECT_HANDLE = 0;
pub const CK_UNAVAILABLE_INFORMATION: CK_ULONG = CK_ULONG::MAX;

/* Object classes */
pub const CKO_PUBLIC_KEY: CK_OBJECT_CLASS = 0x0000_0002;
pub const CKO_PRIVATE_KEY: CK_OBJECT_CLASS = 0x0000_0003;

/* Key types */
pub const CKK_RSA: CK_KEY_TYPE = 0x0000_0000;
pub const CKK_EC: CK_KEY_TYPE = 0x0000_0003;

/* Attributes */
pub const CKA_CLASS: CK_ATTRIBUTE_TYPE = 0x0000_0000;
pub const CKA_LABEL: CK_ATTRIBUTE_TYPE = 0x0000_0003;
pub const CKA_KEY_TYPE: CK_ATTRIBUTE_TYPE = 0x0000_0100;
pub const CKA_MODULUS: CK_ATTRIBUTE_TYPE = 0x0000_0120;
pub const CKA_MODULUS_BITS: CK_ATTRIBUTE_TYPE = 0x0000_0121;
pub const CKA_PUBLIC_EXPONENT: CK_ATTRIBUTE_TYPE = 0x0000_0122;
pub const CKA_PRIVATE_EXPONENT: CK_ATTRIBUTE_TYPE = 0x0000_0123;
pub const CKA_PRIME_1: CK_ATTRIBUTE_TYPE = 0x0000_0124;
pub const CKA_PRIME_2: CK_ATTRIBUTE_TYPE = 0x0000_0125;
pub const CKA_EXPONENT_1: CK_ATTRIBUTE_TYPE = 0x0000_0126;
pub const CKA_EXPONENT_2: CK_ATTRIBUTE_TYPE = 0x0000_0127;
pub const CKA_COEFFICIENT: CK_ATTRIBUTE_TYPE = 0x0000_0128;

/* Return values */
pub const CKR_OK: CK_RV = 0x0000_0000;
pub const CKR_GENERAL_ERROR: CK_RV = 0x0000_0005;
pub const CKR_ARGUMENTS_BAD: CK_RV = 0x0000_0007;
pub const CKR_ATTRIBUTE_TYPE_INVALID: CK_RV = 0x0000_0012;
pub const CKR_ATTRIBUTE_VALUE_INVALID: CK_RV = 0x0000_0013;
pub const CKR_DEVICE_MEMORY: CK_RV = 0x0000_0031;
pub const CKR_OBJECT_HANDLE_INVALID: CK_RV = 0x0000_0082;
pub const CKR_TEMPLATE_INCOMPLETE: CK_RV = 0x0000_00D0;
pub const CKR_TEMPLATE_INCONSISTENT: CK_RV = 0x0000_00D1;
pub const CKR_BUFFER_TOO_SMALL: CK_RV = 0x0000_0150;
