// Copyright 2023 Simo Sorce
// See LICENSE.txt file for terms

use super::*;
use crate::pkcs11::*;

use num_bigint::BigUint;

#[macro_use]
mod util;
use util::*;

mod rsa;
