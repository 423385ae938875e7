use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

/// Decimal places of one whole reward token.
pub const TOKEN_DECIMALS: u32 = 18;

/// Non-negative token amount.
///
/// Arithmetic is checked: `checked_add` returns `None` on overflow and
/// `checked_sub` returns `None` when the result would go negative. Callers
/// turn those into `Overflow` / `InsufficientBalance`; nothing wraps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    pub const MAX: Amount = Amount(u128::MAX);

    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// `whole` tokens expressed in base units.
    pub fn tokens(whole: u64) -> Self {
        Self(u128::from(whole) * 10u128.pow(TOKEN_DECIMALS))
    }

    pub const fn get(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    /// Checked sum; `None` if the total overflows.
    pub fn checked_sum<'a>(amounts: impl IntoIterator<Item = &'a Amount>) -> Option<Amount> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |acc, next| acc.checked_add(*next))
    }

    /// Parse a base-unit integer (`"1000"`) or a token quantity with the
    /// `geo` suffix (`"12.3456 geo"`, up to 18 fractional digits).
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let trimmed = input.trim();
        let invalid = |reason: &str| TypeError::InvalidAmount {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let Some(tokens) = trimmed.strip_suffix("geo") else {
            return trimmed
                .parse::<u128>()
                .map(Amount)
                .map_err(|e| invalid(&e.to_string()));
        };

        let tokens = tokens.trim_end();
        let (whole, fraction) = tokens.split_once('.').unwrap_or((tokens, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("missing quantity"));
        }
        if fraction.len() > TOKEN_DECIMALS as usize {
            return Err(invalid("more than 18 fractional digits"));
        }
        if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected decimal digits"));
        }

        let scale = 10u128.pow(TOKEN_DECIMALS);
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .map_err(|e| invalid(&e.to_string()))?
                .checked_mul(scale)
                .ok_or_else(|| invalid("overflows u128"))?
        };
        let fraction_units = if fraction.is_empty() {
            0
        } else {
            let padding = TOKEN_DECIMALS - fraction.len() as u32;
            fraction
                .parse::<u128>()
                .map_err(|e| invalid(&e.to_string()))?
                * 10u128.pow(padding)
        };

        whole_units
            .checked_add(fraction_units)
            .map(Amount)
            .ok_or_else(|| invalid("overflows u128"))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

// Human-readable formats get a decimal string: TOML integers are i64 and
// JSON consumers routinely lose precision above 2^53.
impl serde::Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.0.to_string())
        } else {
            serializer.serialize_u128(self.0)
        }
    }
}

impl<'de> serde::Deserialize<'de> for Amount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(HumanAmountVisitor)
        } else {
            <u128 as serde::Deserialize>::deserialize(deserializer).map(Amount)
        }
    }
}

struct HumanAmountVisitor;

impl serde::de::Visitor<'_> for HumanAmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or an amount string such as \"1.5 geo\"")
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::parse(v).map_err(E::custom)
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map(Amount::from)
            .map_err(|_| E::custom("amount cannot be negative"))
    }

    fn visit_u128<E: serde::de::Error>(self, v: u128) -> Result<Amount, E> {
        Ok(Amount(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_arithmetic_never_wraps() {
        assert_eq!(Amount::MAX.checked_add(Amount::new(1)), None);
        assert_eq!(Amount::ZERO.checked_sub(Amount::new(1)), None);
        assert_eq!(
            Amount::new(5).checked_sub(Amount::new(3)),
            Some(Amount::new(2))
        );
    }

    #[test]
    fn parse_base_units() {
        assert_eq!(Amount::parse("100").unwrap(), Amount::new(100));
        assert!(Amount::parse("-1").is_err());
        assert!(Amount::parse("ten").is_err());
    }

    #[test]
    fn parse_token_quantities() {
        assert_eq!(Amount::parse("100 geo").unwrap(), Amount::tokens(100));
        assert_eq!(
            Amount::parse("12.3456 geo").unwrap(),
            Amount::new(12_345_600_000_000_000_000)
        );
        assert_eq!(
            Amount::parse(".5geo").unwrap(),
            Amount::new(500_000_000_000_000_000)
        );
        assert!(Amount::parse("1.0000000000000000001 geo").is_err());
        assert!(Amount::parse(" geo").is_err());
    }

    #[test]
    fn checked_sum_detects_overflow() {
        let ok = [Amount::new(1), Amount::new(2)];
        assert_eq!(Amount::checked_sum(&ok), Some(Amount::new(3)));
        let overflow = [Amount::MAX, Amount::new(1)];
        assert_eq!(Amount::checked_sum(&overflow), None);
    }

    #[test]
    fn json_is_decimal_string_and_accepts_numbers() {
        let big = Amount::new(123_456_789_000_000_000_000);
        let json = serde_json::to_string(&big).unwrap();
        assert_eq!(json, "\"123456789000000000000\"");
        assert_eq!(serde_json::from_str::<Amount>(&json).unwrap(), big);
        assert_eq!(serde_json::from_str::<Amount>("42").unwrap(), Amount::new(42));
        assert!(serde_json::from_str::<Amount>("-42").is_err());
    }

    #[test]
    fn bincode_is_raw_integer() {
        let amount = Amount::tokens(3);
        let encoded = bincode::serialize(&amount).unwrap();
        assert_eq!(encoded.len(), 16);
        assert_eq!(bincode::deserialize::<Amount>(&encoded).unwrap(), amount);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn fractional_tokens_scale_to_base_units(whole in 0u64..1_000_000_000, frac in "[0-9]{1,18}") {
                let parsed = Amount::parse(&format!("{whole}.{frac} geo")).unwrap();
                let scale = 10u128.pow(TOKEN_DECIMALS - frac.len() as u32);
                let expected = Amount::tokens(whole).get() + frac.parse::<u128>().unwrap() * scale;
                prop_assert_eq!(parsed, Amount::new(expected));
            }
        }
    }
}
