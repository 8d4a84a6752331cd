mod explorer;
mod rpc;

pub use explorer::*;
pub use rpc::*;

/// Lenient deserializers for explorer fields that come back either as
/// JSON numbers or as numeric strings depending on the API version.
pub(crate) mod lenient {
    use std::str::FromStr;

    use serde::{
        Deserialize, Deserializer,
        de::{DeserializeOwned, IgnoredAny},
    };
    use tracing::warn;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr<T> {
        Num(T),
        Str(String),
        Other(IgnoredAny),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrOrNum {
        Str(String),
        Num(serde_json::Number),
        Other(IgnoredAny),
    }

    /// Numeric string field that may also arrive as a JSON number.
    /// Anything else reads as `None`.
    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(
            match Option::<StrOrNum>::deserialize(deserializer)? {
                Some(StrOrNum::Str(s)) => Some(s),
                Some(StrOrNum::Num(n)) => Some(n.to_string()),
                Some(StrOrNum::Other(_)) | None => None,
            },
        )
    }

    /// List of rows where rows that fail to decode are dropped instead of
    /// failing the whole list.
    pub fn skip_invalid<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let rows = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                serde_json::from_value(row)
                    .inspect_err(|err| warn!(%err, "skipping malformed explorer row"))
                    .ok()
            })
            .collect())
    }

    pub fn opt_num<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
    {
        Ok(
            match Option::<NumOrStr<T>>::deserialize(deserializer)? {
                None => None,
                Some(NumOrStr::Num(n)) => Some(n),
                Some(NumOrStr::Str(s)) => s.trim().parse().ok(),
                Some(NumOrStr::Other(_)) => None,
            },
        )
    }

    pub fn num_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr + Default,
    {
        opt_num(deserializer).map(Option::unwrap_or_default)
    }
}
