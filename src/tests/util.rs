// Copyright 2024 Simo Sorce
// See LICENSE.txt file for terms

use super::tests;
use tests::*;

macro_rules! ret_or_panic {
    ($ret:expr) => {
        match $ret {
            Ok(r) => r,
            Err(e) => panic!("{e}"),
        }
    };
}

macro_rules! assert_rv {
    ($ret:expr, $rv:expr) => {
        match $ret {
            Ok(_) => panic!("call succeeded, expected {:#x}", $rv),
            Err(e) => assert_eq!(e.rv(), $rv, "unexpected error: {e}"),
        }
    };
}

pub const CK_ULONG_SIZE: usize = std::mem::size_of::<CK_ULONG>();

/* 2048 bit key, decimal components */
const RSA2048_MODULUS: &str = "31000296822646386998584161883868828760659721574044842402848806623672928074354715268502355519006545105567880858399197517290835313537026014607077524770377840766842604795117305069474843522905644090561429291565496868709053954136947264739356903926845185448323958328335200363237832476813215346720672072534967200096026119425179694268819250260499153729988739164619747683161611644351681214206887307330001040506009355564941750161859389976399069883751802040038840118519066063258553214379913795552720677334462446599648697357214664819560828909026738415884372844699912951846755690286141944255888656339408190200445386621584970932613";
const RSA2048_PUBLIC_EXPONENT: &str = "65537";
const RSA2048_PRIVATE_EXPONENT: &str = "10063495657442389541707402598216417167142767848510063355365798875728848509725751366974191886520045884324223953834367260942101733303328325385134722973126456235631420678641388305126528464070945847791238661794954695542748720177358637980527307185919882210249053411589352392204173000659187275912573025057317655401307089662747841468892585296391253665444610446164288716057027297202701806241656337154940674570480144564782064973604125601357111627417430393962339684270233104865244361883888489436881286938803420266136193811208329438902443740862371942632626013828079856312204125846703456025860194078539962300717728976659395077573";
const RSA2048_PRIME_1: &str = "179274130269001839205999133545996657215250561140229107938161917349296752985394846924797498079799544204628553605406228889319847402548833793223314768267306081575440333742641843553705624817320953058234448220463554871853064049350690832771076979281925556065848155038492847773302501253795184815867518138871405993819";
const RSA2048_PRIME_2: &str = "172921194910443952677252886314210352574032208167227642944747119398461158017758906086832356088933325609802165196871794246367540942962961867068881125198022402667671294513445868228162460173622821203845848017824657001181350972724354515930479834007840766256445876229298713518224249594413310470258817768573646010527";
const RSA2048_EXPONENT_1: &str = "67273275946496822124801817161247780504061172316731837763755070164506386410269244402727388654905018396088164225059972032211468440283862085184567192517171345410757345129206263004352998018407528549691926470327604329821053819455903377486596825479963916571210212198630614847930610393130368801999326694680325428475";
const RSA2048_EXPONENT_2: &str = "127939573370958646586925175160439839876134820663452724090938600676136885898394976841241041158372950020502879109985449917025736496686315485486106731765672952423100132744289129873435914542301249330199449540508411940282321853554957140591620560465175258480076965568800300895451052666181042943564395910407365631695";
const RSA2048_COEFFICIENT: &str = "98115720565758610794530818682238754380394383627437733527694535704315028691058186696476388021702450938158718557147776438778988623657810767441961659758069048196734742357031856905485672286714699728823916447071787274780461960210639540226507930338653529208036523123449611053237419418935258671659389259217746438177";

fn parse_dec(s: &str) -> BigUint {
    ret_or_panic!(BigUint::parse_bytes(s.as_bytes(), 10)
        .ok_or("not a decimal number"))
}

/// A tiny but consistent key: n = 13 * 23 = 299, e = 65537
pub fn small_key() -> RsaCrtKey {
    RsaCrtKey::new(
        BigUint::from(299u32),
        BigUint::from(65537u32),
        BigUint::from(65u32),
        BigUint::from(13u32),
        BigUint::from(23u32),
        BigUint::from(5u32),
        BigUint::from(21u32),
        BigUint::from(4u32),
    )
}

pub fn rsa2048_key() -> RsaCrtKey {
    RsaCrtKey::new(
        parse_dec(RSA2048_MODULUS),
        parse_dec(RSA2048_PUBLIC_EXPONENT),
        parse_dec(RSA2048_PRIVATE_EXPONENT),
        parse_dec(RSA2048_PRIME_1),
        parse_dec(RSA2048_PRIME_2),
        parse_dec(RSA2048_EXPONENT_1),
        parse_dec(RSA2048_EXPONENT_2),
        parse_dec(RSA2048_COEFFICIENT),
    )
}

/// Builds the template of `key` leaving out the `skip` attribute
pub fn template_without(
    key: &RsaCrtKey,
    skip: AttributeTag,
) -> AttributeTemplate {
    let mut tmpl = AttributeTemplate::new();
    for (tag, val) in key.to_template().iter() {
        if *tag != skip {
            match val {
                AttributeValue::Ulong(u) => tmpl.add_ulong(*tag, *u),
                AttributeValue::Bytes(b) => tmpl.add_slice(*tag, b),
            }
        }
    }
    tmpl
}

pub fn store_with_key(key: &RsaCrtKey) -> (ObjectStore, CK_OBJECT_HANDLE) {
    let mut store = ObjectStore::new();
    let handle = ret_or_panic!(store.create(&key.to_template()));
    (store, handle)
}
