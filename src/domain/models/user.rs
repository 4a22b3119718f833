use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Profile fields sent by the front end.
///
/// Every field is optional on the wire; an absent (or null) field leaves the
/// stored value untouched on update. `name` identifies the profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub care_topics: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_topics: Option<Vec<String>>,
}

impl UserProfile {
    /// Profile key, used verbatim. Blank names are rejected.
    pub fn key_name(&self) -> Result<&str, String> {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| "User 'name' is required to save or update a profile".to_string())
    }

    /// Overwrite the fields `update` provides, keep the rest
    pub fn merge(&mut self, update: UserProfile) {
        let UserProfile {
            name,
            gender,
            birthday,
            city,
            identity,
            care_topics,
            interest_topics,
        } = update;

        if name.is_some() {
            self.name = name;
        }
        if gender.is_some() {
            self.gender = gender;
        }
        if birthday.is_some() {
            self.birthday = birthday;
        }
        if city.is_some() {
            self.city = city;
        }
        if identity.is_some() {
            self.identity = identity;
        }
        if care_topics.is_some() {
            self.care_topics = care_topics;
        }
        if interest_topics.is_some() {
            self.interest_topics = interest_topics;
        }
    }

    /// Provided fields as `(wire name, JSON-encoded value)` pairs
    pub fn to_fields(&self) -> Result<Vec<(String, String)>, serde_json::Error> {
        let Value::Object(map) = serde_json::to_value(self)? else {
            return Ok(Vec::new());
        };
        Ok(map
            .into_iter()
            .map(|(field, value)| (field, value.to_string()))
            .collect())
    }

    /// Inverse of [`UserProfile::to_fields`]. Bookkeeping fields (leading
    /// underscore) are skipped.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, serde_json::Error> {
        let mut map = Map::new();
        for (field, raw) in fields.iter().filter(|(field, _)| !field.starts_with('_')) {
            map.insert(field.clone(), serde_json::from_str(raw)?);
        }
        serde_json::from_value(Value::Object(map))
    }
}

/// Stored profile together with its generated id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub user_id: String,
    pub profile: UserProfile,
}
