use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars::JsonSchema;

/// An uploaded payment proof: a file name plus its encoded content.
/// Write-once; attached to exactly one booking or one subscription request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub name: String,
    pub data_url: String,
}
