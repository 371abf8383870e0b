//! Pure validation of incoming configuration documents.
//!
//! Runs against the parsed JSON body of `PUT /config` before anything is
//! persisted. No side effects: the same document always yields the same
//! verdict, and a rejection carries a human-readable reason the portal
//! returns to the peer and writes to the log.

use core::fmt;

use serde_json::Value;

/// Why a configuration document was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationError(&'static str);

impl ValidationError {
    pub const fn reason(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// The validated fields extracted from an accepted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub name: String,
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub homie_host: String,
}

/// True when `name` fits in MQTT topics and mDNS hostnames: lowercase
/// `[a-z0-9-]` only, not starting or ending with a dash.
pub fn hostname_is_valid(name: &str) -> bool {
    if name.starts_with('-') || name.ends_with('-') {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn required_string<'a>(
    doc: &'a Value,
    field: &str,
    missing: &'static str,
) -> Result<&'a str, ValidationError> {
    doc.get(field)
        .and_then(Value::as_str)
        .ok_or(ValidationError(missing))
}

/// Validate a parsed `PUT /config` document.
///
/// Checks run in a fixed order so the first failure reported is stable:
/// field presence and type, then the non-empty rules, then the hostname
/// alphabet. `wifi_password` may be empty (open network).
pub fn validate_config_document(doc: &Value) -> Result<ConfigUpdate, ValidationError> {
    if !doc.is_object() {
        return Err(ValidationError("config document is not a JSON object"));
    }

    let name = required_string(doc, "name", "name is missing or not a string")?;
    let wifi_ssid = required_string(doc, "wifi_ssid", "wifi_ssid is missing or not a string")?;
    let wifi_password = required_string(
        doc,
        "wifi_password",
        "wifi_password is missing or not a string",
    )?;
    let homie_host = required_string(doc, "homie_host", "homie_host is missing or not a string")?;

    if name.is_empty() {
        return Err(ValidationError("name is empty"));
    }
    if wifi_ssid.is_empty() {
        return Err(ValidationError("wifi_ssid is empty"));
    }
    if homie_host.is_empty() {
        return Err(ValidationError("homie_host is empty"));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ValidationError(
            "name may only contain lowercase letters, digits and dashes",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(ValidationError("name starts or ends with a dash"));
    }

    Ok(ConfigUpdate {
        name: name.to_owned(),
        wifi_ssid: wifi_ssid.to_owned(),
        wifi_password: wifi_password.to_owned(),
        homie_host: homie_host.to_owned(),
    })
}
