// Lenient JSON field decoding for tool output
//
// lsblk prints flags as `true`, `1` or `"1"` and sizes as numbers or strings depending on
// its version; PowerShell's ConvertTo-Json emits a bare object when only one item matches.

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum Flex {
    Bool(bool),
    Num(u64),
    Str(String),
}

pub(crate) fn flex_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Flex>::deserialize(deserializer)? {
        Some(Flex::Bool(b)) => b,
        Some(Flex::Num(n)) => n != 0,
        Some(Flex::Str(s)) => matches!(s.trim(), "1" | "true" | "True"),
        None => false,
    })
}

pub(crate) fn flex_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Flex>::deserialize(deserializer)? {
        Some(Flex::Num(n)) => Ok(n),
        Some(Flex::Str(s)) if s.trim().is_empty() => Ok(0),
        Some(Flex::Str(s)) => s.trim().parse().map_err(de::Error::custom),
        Some(Flex::Bool(_)) => Err(de::Error::custom("expected a size, found a boolean")),
        None => Ok(0),
    }
}

/// Trimmed, non-empty string or `None`
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// Parse ConvertTo-Json output; empty output means nothing matched
pub(crate) fn parse_powershell_list<T>(what: &str, stdout: &str) -> crate::WipeResult<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str::<OneOrMany<T>>(trimmed)
        .map(OneOrMany::into_vec)
        .map_err(|e| crate::WipeError::parse(what, e))
}
