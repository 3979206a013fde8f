//! Deserialization helpers for values that arrive as either numbers or strings
// (c) 2024 Ross Younger

use std::{fmt, marker::PhantomData, str::FromStr};

use serde::de::{self, Visitor};

/// Visitor accepting an unsigned integer (via `From<u64>`) or a string (via `FromStr`).
///
/// Config files say `byte_targets = [1000000, "2M"]`; both forms must land in the same type.
#[allow(missing_debug_implementations)]
pub struct IntOrString<T>(pub PhantomData<fn() -> T>);

impl<T> Visitor<'_> for IntOrString<T>
where
    T: TryFrom<u64> + FromStr,
    <T as FromStr>::Err: fmt::Display,
    <T as TryFrom<u64>>::Error: fmt::Display,
{
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an integer or a string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<T, E> {
        T::from_str(value).map_err(de::Error::custom)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<T, E> {
        T::try_from(value).map_err(de::Error::custom)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<T, E> {
        let u = u64::try_from(value).map_err(de::Error::custom)?;
        T::try_from(u).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use crate::util::humanu64::HumanU64;

    #[test]
    fn negative_rejected() {
        let r = serde_json::from_str::<HumanU64>("-5");
        assert!(r.is_err());
    }

    #[test]
    fn wrong_type_rejected() {
        let r = serde_json::from_str::<HumanU64>("[1]");
        assert!(r.unwrap_err().to_string().contains("an integer or a string"));
    }
}
