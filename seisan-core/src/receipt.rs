//! Receipt records as returned by the vision-extraction service.

use serde::{Deserialize, Deserializer, Serialize};

use crate::normalize;

/// Category tag assigned by the extraction service.
///
/// Anything outside the three fixed tags collapses to `General`,
/// including a missing field.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Transport,
    Parking,
    Highway,
    #[default]
    #[serde(other)]
    General,
}

impl Category {
    /// Parse a category tag the same way deserialization does.
    pub fn from_tag(tag: &str) -> Category {
        match tag {
            "transport" => Category::Transport,
            "parking" => Category::Parking,
            "highway" => Category::Highway,
            _ => Category::General,
        }
    }
}

/// One receipt extracted from the uploaded document.
///
/// Amount fields are coerced on deserialization: JSON numbers pass through,
/// numeric strings (comma/yen adornment tolerated) parse, anything else
/// becomes `0.0`. Extra fields such as the service's `status` marker are
/// ignored. Duplicate records and repeated store names are expected input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiptRecord {
    /// Receipt date, zero-padded `YYYY/MM/DD`. Blank or null becomes `None`.
    #[serde(default, deserialize_with = "de_date")]
    pub date: Option<String>,
    /// Store name. May be empty; compared byte-for-byte when merging, so
    /// near-duplicates (trailing spaces, width variants) stay separate.
    #[serde(default, deserialize_with = "de_string")]
    pub store_name: String,
    #[serde(default)]
    pub category: Category,
    /// Qualified-invoice registration number (`T` + 13 digits) when printed.
    #[serde(default, deserialize_with = "de_blank")]
    pub invoice_number: Option<String>,
    /// Tax-inclusive total.
    #[serde(default, deserialize_with = "de_amount")]
    pub total_amount: f64,
    /// Portion of the total taxed at the reduced 8% rate.
    #[serde(default, deserialize_with = "de_amount")]
    pub amount_8_percent: f64,
}

fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(normalize::coerce_amount(&value))
}

fn de_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

fn de_blank<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(normalize::blank_to_none(value))
}

fn de_date<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(normalize::blank_to_none(value).map(|d| normalize::canonical_date(&d)))
}
