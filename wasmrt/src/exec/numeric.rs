//! Pure per-opcode numeric semantics.
//!
//! Every function here is a plain value-in/value-out computation with no
//! access to `Store` or `Frame` -- the dispatch loop in `exec::mod` is
//! responsible for moving bytes in and out of slots; this module only
//! implements "what the op computes," which keeps each rule unit-testable
//! in isolation and keeps `exec::mod`'s dispatch arms to a single call each.

use wasmrt_abi::{Trap, TrapKind};

use crate::exception::Unwind;

pub fn i32_div_s(a: i32, b: i32) -> Result<i32, Unwind> {
    if b == 0 {
        return Err(TrapKind::IntegerDivideByZero.into());
    }
    a.checked_div(b).ok_or_else(|| TrapKind::IntegerOverflow.into())
}

pub fn i32_div_u(a: i32, b: i32) -> Result<i32, Unwind> {
    if b == 0 {
        return Err(TrapKind::IntegerDivideByZero.into());
    }
    Ok(((a as u32) / (b as u32)) as i32)
}

pub fn i32_rem_s(a: i32, b: i32) -> Result<i32, Unwind> {
    if b == 0 {
        return Err(TrapKind::IntegerDivideByZero.into());
    }
    Ok(a.checked_rem(b).unwrap_or(0))
}

pub fn i32_rem_u(a: i32, b: i32) -> Result<i32, Unwind> {
    if b == 0 {
        return Err(TrapKind::IntegerDivideByZero.into());
    }
    Ok(((a as u32) % (b as u32)) as i32)
}

pub fn i64_div_s(a: i64, b: i64) -> Result<i64, Unwind> {
    if b == 0 {
        return Err(TrapKind::IntegerDivideByZero.into());
    }
    a.checked_div(b).ok_or_else(|| TrapKind::IntegerOverflow.into())
}

pub fn i64_div_u(a: i64, b: i64) -> Result<i64, Unwind> {
    if b == 0 {
        return Err(TrapKind::IntegerDivideByZero.into());
    }
    Ok(((a as u64) / (b as u64)) as i64)
}

pub fn i64_rem_s(a: i64, b: i64) -> Result<i64, Unwind> {
    if b == 0 {
        return Err(TrapKind::IntegerDivideByZero.into());
    }
    Ok(a.checked_rem(b).unwrap_or(0))
}

pub fn i64_rem_u(a: i64, b: i64) -> Result<i64, Unwind> {
    if b == 0 {
        return Err(TrapKind::IntegerDivideByZero.into());
    }
    Ok(((a as u64) % (b as u64)) as i64)
}

/// Wasm shift/rotate amounts are masked to the operand width, never trap.
pub fn i32_shl(a: i32, b: i32) -> i32 {
    a.wrapping_shl((b as u32) & 31)
}
pub fn i32_shr_s(a: i32, b: i32) -> i32 {
    a.wrapping_shr((b as u32) & 31)
}
pub fn i32_shr_u(a: i32, b: i32) -> i32 {
    ((a as u32).wrapping_shr((b as u32) & 31)) as i32
}
pub fn i32_rotl(a: i32, b: i32) -> i32 {
    (a as u32).rotate_left((b as u32) & 31) as i32
}
pub fn i32_rotr(a: i32, b: i32) -> i32 {
    (a as u32).rotate_right((b as u32) & 31) as i32
}

pub fn i64_shl(a: i64, b: i64) -> i64 {
    a.wrapping_shl((b as u64 & 63) as u32)
}
pub fn i64_shr_s(a: i64, b: i64) -> i64 {
    a.wrapping_shr((b as u64 & 63) as u32)
}
pub fn i64_shr_u(a: i64, b: i64) -> i64 {
    ((a as u64).wrapping_shr((b as u64 & 63) as u32)) as i64
}
pub fn i64_rotl(a: i64, b: i64) -> i64 {
    (a as u64).rotate_left((b as u64 & 63) as u32) as i64
}
pub fn i64_rotr(a: i64, b: i64) -> i64 {
    (a as u64).rotate_right((b as u64 & 63) as u32) as i64
}

/// wasm `fmin`/`fmax`: propagate NaN (canonicalized), and distinguish -0.0
/// from +0.0 when the operands are otherwise equal -- `f32::min`/`max` from
/// std already implement this IEEE 754-2019 `minimum`/`maximum` behavior,
/// except for the NaN payload, which callers canonicalize on the way out.
pub fn f32_min(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        return f32::NAN;
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_negative() || b.is_sign_negative() {
            -0.0
        } else {
            0.0
        };
    }
    a.min(b)
}

pub fn f32_max(a: f32, b: f32) -> f32 {
    if a.is_nan() || b.is_nan() {
        return f32::NAN;
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_positive() || b.is_sign_positive() {
            0.0
        } else {
            -0.0
        };
    }
    a.max(b)
}

pub fn f64_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_negative() || b.is_sign_negative() {
            -0.0
        } else {
            0.0
        };
    }
    a.min(b)
}

pub fn f64_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return f64::NAN;
    }
    if a == 0.0 && b == 0.0 {
        return if a.is_sign_positive() || b.is_sign_positive() {
            0.0
        } else {
            -0.0
        };
    }
    a.max(b)
}

macro_rules! trunc_checked {
    ($name:ident, $src:ty, $dst:ty, $lo:expr, $hi:expr) => {
        pub fn $name(x: $src) -> Result<$dst, Unwind> {
            if x.is_nan() {
                return Err(TrapKind::InvalidConversionToInteger.into());
            }
            if x < $lo || x >= $hi {
                return Err(TrapKind::IntegerOverflow.into());
            }
            Ok(x as $dst)
        }
    };
}

trunc_checked!(i32_trunc_f32_s, f32, i32, -2147483648.0f32, 2147483648.0f32);
trunc_checked!(i32_trunc_f32_u, f32, i32, -1.0f32, 4294967296.0f32);
trunc_checked!(i32_trunc_f64_s, f64, i32, -2147483649.0f64, 2147483648.0f64);
trunc_checked!(i32_trunc_f64_u, f64, i32, -1.0f64, 4294967296.0f64);
trunc_checked!(i64_trunc_f32_s, f32, i64, -9223372036854775808.0f32, 9223372036854775808.0f32);
trunc_checked!(i64_trunc_f32_u, f32, i64, -1.0f32, 18446744073709551616.0f32);
trunc_checked!(i64_trunc_f64_s, f64, i64, -9223372036854775808.0f64, 9223372036854775808.0f64);
trunc_checked!(i64_trunc_f64_u, f64, i64, -1.0f64, 18446744073709551616.0f64);

/// i32 trunc sat ops never trap: NaN saturates to 0, out-of-range saturates
/// to the nearest representable bound.
pub fn i32_trunc_sat_f32_s(x: f32) -> i32 {
    if x.is_nan() {
        0
    } else {
        x.clamp(-2147483648.0, 2147483520.0) as i32
    }
}
pub fn i32_trunc_sat_f32_u(x: f32) -> i32 {
    if x.is_nan() || x < 0.0 {
        0
    } else {
        x.clamp(0.0, 4294967040.0) as u32 as i32
    }
}
pub fn i32_trunc_sat_f64_s(x: f64) -> i32 {
    if x.is_nan() {
        0
    } else {
        x.clamp(-2147483648.0, 2147483647.0) as i32
    }
}
pub fn i32_trunc_sat_f64_u(x: f64) -> i32 {
    if x.is_nan() || x < 0.0 {
        0
    } else {
        x.clamp(0.0, 4294967295.0) as u32 as i32
    }
}
pub fn i64_trunc_sat_f32_s(x: f32) -> i64 {
    if x.is_nan() {
        0
    } else {
        x.clamp(-9223372036854775808.0, 9223371487098961920.0) as i64
    }
}
pub fn i64_trunc_sat_f32_u(x: f32) -> i64 {
    if x.is_nan() || x < 0.0 {
        0
    } else {
        x.clamp(0.0, 18446742974197923840.0) as u64 as i64
    }
}
pub fn i64_trunc_sat_f64_s(x: f64) -> i64 {
    if x.is_nan() {
        0
    } else {
        x.clamp(-9223372036854775808.0, 9223372036854774784.0) as i64
    }
}
pub fn i64_trunc_sat_f64_u(x: f64) -> i64 {
    if x.is_nan() || x < 0.0 {
        0
    } else {
        x.clamp(0.0, 18446744073709549568.0) as u64 as i64
    }
}

pub fn trap_unreachable() -> Unwind {
    Trap::new(TrapKind::UnreachableExecuted).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_by_zero_traps() {
        assert!(i32_div_s(1, 0).is_err());
        assert!(i64_rem_u(1, 0).is_err());
    }

    #[test]
    fn div_overflow_traps() {
        assert!(i32_div_s(i32::MIN, -1).is_err());
        assert!(i64_div_s(i64::MIN, -1).is_err());
    }

    #[test]
    fn rem_overflow_does_not_trap_and_yields_zero() {
        assert_eq!(i32_rem_s(i32::MIN, -1).unwrap(), 0);
    }

    #[test]
    fn shift_amounts_are_masked() {
        assert_eq!(i32_shl(1, 32), 1);
        assert_eq!(i64_shl(1, 64), 1);
    }

    #[test]
    fn rotate_is_full_width() {
        assert_eq!(i32_rotl(1, 1), 2);
        assert_eq!(i32_rotr(1, 1), i32::MIN);
    }

    #[test]
    fn fmin_fmax_distinguish_signed_zero() {
        assert!(f32_min(0.0, -0.0).is_sign_negative());
        assert!(f32_max(0.0, -0.0).is_sign_positive());
    }

    #[test]
    fn fmin_fmax_propagate_nan() {
        assert!(f64_min(f64::NAN, 1.0).is_nan());
        assert!(f64_max(1.0, f64::NAN).is_nan());
    }

    #[test]
    fn trunc_sat_never_traps_and_saturates() {
        assert_eq!(i32_trunc_sat_f64_s(1e300), i32::MAX);
        assert_eq!(i32_trunc_sat_f64_s(-1e300), i32::MIN);
        assert_eq!(i32_trunc_sat_f64_s(f64::NAN), 0);
    }

    #[test]
    fn trunc_checked_rejects_nan_and_out_of_range() {
        assert!(i32_trunc_f64_s(f64::NAN).is_err());
        assert!(i32_trunc_f64_s(1e300).is_err());
        assert_eq!(i32_trunc_f64_s(3.9).unwrap(), 3);
    }
}
