use serde::{Deserialize, Deserializer};

/// Treats an explicit YAML `null` (`warehouses:` with nothing after it) the
/// same as an absent key.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let opt = Option::<T>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}
