// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Byte-exact vectors for the address codec, the canonical message encoding
//! and signing. The expected values were produced against a reference node.

use lumen::address::Address;
use lumen::bigint::BigInt;
use lumen::client::{KeyInfo, KeyStore};
use lumen::crypto::{Signature, SignatureType, Signer};
use lumen::encoding::Cbor;
use lumen::message::{Message, SignedMessage, UnsignedMessage};

const PRIV_KEY_B64: &str = "M8EkrelmXXqGwOqnSzPK19VPNo8X2ibvap2sVcF5AZtg=";

fn key_store_with_test_key() -> (KeyStore, Address) {
    let priv_key = base64::decode(PRIV_KEY_B64).unwrap();
    let mut ks = KeyStore::new();
    let addr = ks
        .import(KeyInfo::new(SignatureType::Secp256k1, priv_key))
        .unwrap();
    (ks, addr)
}

fn test_message() -> UnsignedMessage {
    UnsignedMessage::builder()
        .to("t15ihq5ibzwki2b4ep2f46avlkrqzhpqgtga7pdrq"
            .parse()
            .unwrap())
        .from("t1izccwid4h3svp5sl2xow6jhuc72qmznv6gkbecq"
            .parse()
            .unwrap())
        .sequence(34)
        .value(BigInt::from(12))
        .gas_limit(123)
        .gas_fee_cap(BigInt::from(234))
        .gas_premium(BigInt::from(234))
        .method_num(6)
        .build()
        .unwrap()
}

#[test]
fn private_key_to_address() {
    let (_, addr) = key_store_with_test_key();
    assert_eq!(
        addr.to_string(),
        "t1izccwid4h3svp5sl2xow6jhuc72qmznv6gkbecq"
    );
}

#[test]
fn address_decodes_to_wire_bytes() {
    let addr: Address = "t15ihq5ibzwki2b4ep2f46avlkrqzhpqgtga7pdrq".parse().unwrap();
    assert_eq!(
        hex::encode(addr.to_bytes()),
        "01ea0f0ea039b291a0f08fd179e0556a8c3277c0d3"
    );
    // wire form parses back to the same address
    assert_eq!(Address::from_bytes(&addr.to_bytes()).unwrap(), addr);
}

#[test]
fn unsigned_message_canonical_encoding() {
    let msg = test_message();
    let bz = msg.marshal_cbor().unwrap();
    assert_eq!(
        hex::encode(&bz),
        "8a005501ea0f0ea039b291a0f08fd179e0556a8c3277c0d3550146442b207c3ee557f64bd5dd6f\
         24f417f50665b5182242000c187b4200ea4200ea0640"
    );
    assert_eq!(
        msg.cid().unwrap().to_string(),
        "bafy2bzaceax4su4dipbrdsnqivh7i57flcprnmpd5u7jlax26geaze6de2eg4"
    );

    let decoded = UnsignedMessage::unmarshal_cbor(&bz).unwrap();
    assert_eq!(decoded, msg);
    assert_eq!(decoded.sequence(), 34);
}

#[test]
fn sign_message_over_cid_bytes() {
    let (ks, addr) = key_store_with_test_key();
    let msg = test_message();
    assert_eq!(*msg.from(), addr);

    let signed = SignedMessage::new(msg.clone(), &ks).unwrap();
    let sig_hex = hex::encode(signed.signature().bytes());
    assert_eq!(signed.signature().bytes().len(), 65);
    assert!(sig_hex.starts_with("efdbb8ac12e6a4fb"), "sig: {sig_hex}");
    assert!(sig_hex.ends_with("b13c01"), "sig: {sig_hex}");
    // recovery id byte
    assert_eq!(signed.signature().bytes()[64], 1);

    // the signed payload is the cid bytes of the unsigned message
    let direct = ks.sign_bytes(&msg.cid().unwrap().to_bytes(), &addr).unwrap();
    assert_eq!(signed.signature(), &direct);
    signed.verify().unwrap();

    let wire_hex = hex::encode(signed.marshal_cbor().unwrap());
    assert!(wire_hex.starts_with("828a00"), "wire: {wire_hex}");
    // signature element: 66-byte string with leading type byte 1
    assert!(wire_hex.ends_with(&format!("584201{sig_hex}")), "wire: {wire_hex}");
}

#[test]
fn signature_wire_form_carries_type_byte() {
    let sig = Signature::new_secp256k1(vec![0xaa; 65]);
    let bz = lumen::encoding::to_vec(&sig).unwrap();
    // byte string of 66 bytes; the first is the secp type byte
    assert_eq!(&bz[..3], &[0x58, 0x42, 0x01]);
    let back: Signature = lumen::encoding::from_slice(&bz).unwrap();
    assert_eq!(back, sig);
}
