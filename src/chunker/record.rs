use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unit to be segmented: fixed attributes plus one long free-text field
///
/// Fixed attributes are copied verbatim into every chunk. Keys are kept
/// sorted, so the serialized form is canonical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Scalar attributes repeated in every chunk
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Key the free-text slice is stored under in each chunk
    pub text_field: String,
    /// The free text to split
    #[serde(default)]
    pub text: String,
}

impl Record {
    pub fn new(text_field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            fields: Map::new(),
            text_field: text_field.into(),
            text: text.into(),
        }
    }

    /// Add a fixed attribute
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Canonical JSON of the fixed attributes alone
    pub fn fixed_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.fields)
    }
}

/// Real-estate listing as entered in the upload form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyListing {
    pub property_name: String,
    pub property_type: String,
    pub prefecture: String,
    pub city: String,
    #[serde(default)]
    pub detailed_address: String,
    #[serde(default = "default_coordinate")]
    pub latitude: String,
    #[serde(default = "default_coordinate")]
    pub longitude: String,
    #[serde(default)]
    pub property_details: String,
}

fn default_coordinate() -> String {
    "0.0".to_string()
}

impl From<PropertyListing> for Record {
    fn from(p: PropertyListing) -> Self {
        Record::new("property_details", p.property_details)
            .with_field("property_name", p.property_name)
            .with_field("property_type", p.property_type)
            .with_field("prefecture", p.prefecture)
            .with_field("city", p.city)
            .with_field("detailed_address", p.detailed_address)
            .with_field("latitude", p.latitude)
            .with_field("longitude", p.longitude)
    }
}
