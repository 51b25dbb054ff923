// 2.0: fixed point math. three scales on a 256-bit integer:
//   WAD = 1e18 (collateral amounts, debt shares)
//   RAY = 1e27 (rates, prices, ratios)
//   RAD = 1e45 = WAD * RAY (currency and debt values)
// every division truncates toward zero. every multiply is checked and fails closed.

use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const WAD_DECIMALS: u32 = 18;
pub const RAY_DECIMALS: u32 = 27;
pub const RAD_DECIMALS: u32 = 45;
pub const BPS_DENOMINATOR: u32 = 10_000;

const WAD_UNIT: U256 = U256([0x0de0_b6b3_a764_0000, 0, 0, 0]);
const RAY_UNIT: U256 = U256([0x9fd0_803c_e800_0000, 0x033b_2e3c, 0, 0]);
const RAD_UNIT: U256 = U256([0x0b22_a000_0000_0000, 0xe086_b93c_e2f7_68a0, 0x002c_d76f, 0]);
// RAY / WAD, used to lift a WAD price into RAY
const WAD_TO_RAY: u64 = 1_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("Overflow in {0}")]
    Overflow(&'static str),

    #[error("Underflow in {0}")]
    Underflow(&'static str),

    #[error("Division by zero in {0}")]
    DivisionByZero(&'static str),

    #[error("Value {0} is not representable as fixed point")]
    Unrepresentable(String),
}

pub fn checked_mul(a: U256, b: U256, op: &'static str) -> Result<U256, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow(op))
}

pub fn checked_div(a: U256, b: U256, op: &'static str) -> Result<U256, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero(op));
    }
    Ok(a / b)
}

/// `a * b / denominator`, truncated. The product must fit in 256 bits.
pub fn mul_div(a: U256, b: U256, denominator: U256, op: &'static str) -> Result<U256, MathError> {
    checked_div(checked_mul(a, b, op)?, denominator, op)
}

// 2.1: lossy decimal view. Decimal carries a 96-bit mantissa and at most 28 fractional
// digits, so low-order digits are dropped until the value fits.
fn to_decimal_lossy(raw: U256, decimals: u32) -> Option<Decimal> {
    let mut value = raw;
    let mut scale = decimals;
    while scale > 28 || value.bits() > 96 {
        if scale == 0 {
            return None;
        }
        value = value / U256::from(10u8);
        scale -= 1;
    }
    Some(Decimal::from_i128_with_scale(value.low_u128() as i128, scale))
}

fn from_decimal_scaled(value: Decimal, decimals: u32) -> Result<U256, MathError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(MathError::Unrepresentable(value.to_string()));
    }
    let mantissa = U256::from(value.mantissa().unsigned_abs());
    let scale = value.scale();
    if scale <= decimals {
        checked_mul(mantissa, U256::exp10((decimals - scale) as usize), "from_decimal")
    } else {
        Ok(mantissa / U256::exp10((scale - decimals) as usize))
    }
}

fn fmt_fixed(raw: U256, unit: U256, decimals: u32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let integer = raw / unit;
    let fraction = (raw % unit).to_string();
    let padded = format!("{}{}", "0".repeat(decimals as usize - fraction.len()), fraction);
    let trimmed = padded.trim_end_matches('0');
    if trimmed.is_empty() {
        write!(f, "{}", integer)
    } else {
        write!(f, "{}.{}", integer, trimmed)
    }
}

macro_rules! fixed_point {
    ($name:ident, $unit:expr, $decimals:expr) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(U256);

        impl $name {
            pub const DECIMALS: u32 = $decimals;
            pub const ONE: $name = $name($unit);

            pub fn zero() -> Self {
                Self(U256::zero())
            }

            pub fn from_raw(raw: U256) -> Self {
                Self(raw)
            }

            pub fn from_raw_u128(raw: u128) -> Self {
                Self(U256::from(raw))
            }

            /// Whole units, e.g. `Wad::from_integer(10)` is 10e18 raw.
            pub fn from_integer(units: u128) -> Self {
                // saturates past ~1e32 whole RAD units
                Self(U256::from(units).saturating_mul($unit))
            }

            pub fn from_decimal(value: Decimal) -> Result<Self, MathError> {
                from_decimal_scaled(value, $decimals).map(Self)
            }

            pub fn to_decimal(&self) -> Option<Decimal> {
                to_decimal_lossy(self.0, $decimals)
            }

            pub fn raw(&self) -> U256 {
                self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            pub fn checked_add(self, other: Self) -> Result<Self, MathError> {
                self.0
                    .checked_add(other.0)
                    .map(Self)
                    .ok_or(MathError::Overflow(concat!(stringify!($name), " add")))
            }

            pub fn checked_sub(self, other: Self) -> Result<Self, MathError> {
                self.0
                    .checked_sub(other.0)
                    .map(Self)
                    .ok_or(MathError::Underflow(concat!(stringify!($name), " sub")))
            }

            pub fn saturating_sub(self, other: Self) -> Self {
                Self(self.0.saturating_sub(other.0))
            }

            /// `self * bps / 10_000`, truncated.
            pub fn mul_bps(self, bps: u32) -> Result<Self, MathError> {
                mul_div(self.0, U256::from(bps), U256::from(BPS_DENOMINATOR), "mul_bps").map(Self)
            }

            /// `self * 10_000 / bps`, truncated.
            pub fn div_bps(self, bps: u32) -> Result<Self, MathError> {
                mul_div(self.0, U256::from(BPS_DENOMINATOR), U256::from(bps), "div_bps").map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt_fixed(self.0, $unit, $decimals, f)
            }
        }
    };
}

fixed_point!(Wad, WAD_UNIT, WAD_DECIMALS);
fixed_point!(Ray, RAY_UNIT, RAY_DECIMALS);
fixed_point!(Rad, RAD_UNIT, RAD_DECIMALS);

// 2.2: WAD ops. collateral and debt share live here.
impl Wad {
    /// WAD * RAY → RAD. exact, no division involved.
    pub fn mul_ray(self, rate: Ray) -> Result<Rad, MathError> {
        checked_mul(self.0, rate.0, "wad * ray").map(Rad)
    }

    pub fn wmul(self, other: Wad) -> Result<Wad, MathError> {
        mul_div(self.0, other.0, WAD_UNIT, "wmul").map(Wad)
    }

    /// A WAD price lifted to RAY precision.
    pub fn to_ray(self) -> Result<Ray, MathError> {
        checked_mul(self.0, U256::from(WAD_TO_RAY), "wad to ray").map(Ray)
    }

    /// A WAD currency amount expressed as RAD.
    pub fn to_rad(self) -> Result<Rad, MathError> {
        checked_mul(self.0, RAY_UNIT, "wad to rad").map(Rad)
    }
}

// 2.3: RAY ops. rates, ratios, prices.
impl Ray {
    /// `numerator / denominator` in RAY, truncated.
    pub fn from_fraction(numerator: u128, denominator: u128) -> Result<Ray, MathError> {
        mul_div(U256::from(numerator), RAY_UNIT, U256::from(denominator), "ray fraction").map(Ray)
    }

    pub fn rmul(self, other: Ray) -> Result<Ray, MathError> {
        mul_div(self.0, other.0, RAY_UNIT, "rmul").map(Ray)
    }

    pub fn rdiv(self, other: Ray) -> Result<Ray, MathError> {
        mul_div(self.0, RAY_UNIT, other.0, "rdiv").map(Ray)
    }

    /// `self ^ exponent` in RAY by repeated squaring, so compounding over n seconds
    /// costs O(log n) multiplications. `0 ^ 0` is one.
    pub fn rpow(self, exponent: u64) -> Result<Ray, MathError> {
        let mut base = self.0;
        let mut n = exponent;
        let mut result = if n % 2 == 1 { base } else { RAY_UNIT };
        n /= 2;
        while n > 0 {
            base = mul_div(base, base, RAY_UNIT, "rpow")?;
            if n % 2 == 1 {
                result = mul_div(result, base, RAY_UNIT, "rpow")?;
            }
            n /= 2;
        }
        Ok(Ray(result))
    }
}

// 2.4: RAD ops. debt values and currency balances.
impl Rad {
    /// RAD / RAY → WAD. how many shares (or collateral units) a value buys at a rate/price.
    pub fn div_ray(self, rate: Ray) -> Result<Wad, MathError> {
        checked_div(self.0, rate.0, "rad / ray").map(Wad)
    }

    /// RAD / WAD → RAY.
    pub fn div_wad(self, amount: Wad) -> Result<Ray, MathError> {
        checked_div(self.0, amount.0, "rad / wad").map(Ray)
    }
}

// 2.5: signed WAD delta for position adjustments. raw units, i128 covers ±1.7e20 whole tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedWad(i128);

impl SignedWad {
    pub fn new(raw: i128) -> Self {
        Self(raw)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn increase(amount: Wad) -> Result<Self, MathError> {
        if amount.raw().bits() > 127 {
            return Err(MathError::Overflow("signed wad cast"));
        }
        Ok(Self(amount.raw().low_u128() as i128))
    }

    pub fn decrease(amount: Wad) -> Result<Self, MathError> {
        Self::increase(amount).map(|d| Self(-d.0))
    }

    /// Opposite delta. `i128::MIN` has no positive counterpart.
    pub fn checked_neg(&self) -> Result<Self, MathError> {
        self.0.checked_neg().map(Self).ok_or(MathError::Overflow("signed wad neg"))
    }

    pub fn from_integer(units: i64) -> Self {
        Self(units as i128 * 1_000_000_000_000_000_000)
    }

    pub fn value(&self) -> i128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn magnitude(&self) -> Wad {
        Wad::from_raw_u128(self.0.unsigned_abs())
    }

    /// `base + self`, failing on underflow below zero.
    pub fn apply(&self, base: Wad) -> Result<Wad, MathError> {
        if self.is_negative() {
            base.checked_sub(self.magnitude())
        } else {
            base.checked_add(self.magnitude())
        }
    }
}

impl fmt::Display for SignedWad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-{}", self.magnitude())
        } else {
            write!(f, "{}", self.magnitude())
        }
    }
}
