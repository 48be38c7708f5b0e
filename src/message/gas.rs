// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use num_bigint::BigInt;
use num_traits::{Pow, Zero};

use super::UnsignedMessage;

/// Gas target for a full block; the default gas limit is a tenth of it.
pub const BLOCK_GAS_TARGET: i64 = 5_000_000_000;

/// Smallest premium accepted by miners.
pub const MIN_GAS_PREMIUM: i64 = 100_000;

/// Fixed-point precision, in bits, of the base fee extrapolation factor.
const BASE_FEE_SHIFT: u32 = 8;

/// Fills the gas fields a caller left at zero with static estimates derived
/// from the current base fee. Deliberately an over-approximation; matching a
/// node-side execution simulation is not attempted.
pub fn estimate_gas(msg: &mut UnsignedMessage, base_fee: &BigInt) {
    if msg.gas_limit == 0 {
        msg.gas_limit = BLOCK_GAS_TARGET / 10;
    }
    if msg.gas_premium.is_zero() {
        msg.gas_premium = BigInt::from(3 * MIN_GAS_PREMIUM / 2);
    }
    if msg.gas_fee_cap.is_zero() {
        let extrapolated = (base_fee * base_fee_multiplier()) >> BASE_FEE_SHIFT;
        msg.gas_fee_cap = extrapolated + &msg.gas_premium;
    }
}

/// Assumes 20 epochs of base fee growth at the maximum rate of 1/8 per epoch,
/// expressed in `BASE_FEE_SHIFT`-bit fixed point and rounded half up. The
/// whole computation stays in the integer domain.
fn base_fee_multiplier() -> BigInt {
    let num = BigInt::from(9u8).pow(20u32) << BASE_FEE_SHIFT;
    let den = BigInt::from(8u8).pow(20u32);
    (num + (&den >> 1)) / den
}
