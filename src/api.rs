//! Types and validation for the camera web API


use serde::{Deserialize, Deserializer, Serialize};

use crate::cameras::{CameraChanges, Direction, NewCamera};
use crate::error::{Error, Result};


/// Slowest speed limit a camera may enforce
pub const MIN_SPEED_LIMIT: i32 = 5;

/// Fastest speed limit a camera may enforce
pub const MAX_SPEED_LIMIT: i32 = 85;

/// Longest accepted street name, in characters
pub const MAX_STREET_LEN: usize = 100;


/// Ensures `zip` is exactly five ASCII digits
pub fn validate_zipcode(zip: &str) -> Result<()> {

    if zip.len() == 5 && zip.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::validation("Invalid zipcode format. Must be 5 digits."))
    }
}


fn validate_street(field: &str, street: &str) -> Result<()> {

    let len = street.chars().count();
    if len == 0 || len > MAX_STREET_LEN {
        return Err(Error::Validation(format!(
            "{} must be between 1 and {} characters",
            field,
            MAX_STREET_LEN,
        )));
    }

    Ok(())
}


fn validate_speed_limit(speed_limit: i32) -> Result<()> {

    if !(MIN_SPEED_LIMIT..=MAX_SPEED_LIMIT).contains(&speed_limit) {
        return Err(Error::Validation(format!(
            "speed_limit must be between {} and {}",
            MIN_SPEED_LIMIT,
            MAX_SPEED_LIMIT,
        )));
    }

    Ok(())
}


fn parse_direction(direction: &str) -> Result<Direction> {
    direction.parse()
        .map_err(Error::validation)
}


/// Camera representation required by POST requests
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CameraCreate {
    pub cross_street_1: String,
    pub cross_street_2: String,
    pub zipcode: String,
    pub speed_limit: i32,
    pub direction: String,
}

impl CameraCreate {

    /// Validates every field, producing a camera ready for storage
    pub fn validate(self) -> Result<NewCamera> {

        validate_street("cross_street_1", &self.cross_street_1)?;
        validate_street("cross_street_2", &self.cross_street_2)?;
        validate_zipcode(&self.zipcode)?;
        validate_speed_limit(self.speed_limit)?;
        let direction = parse_direction(&self.direction)?;

        Ok(NewCamera {
            cross_street_1: self.cross_street_1,
            cross_street_2: self.cross_street_2,
            zipcode: self.zipcode,
            speed_limit: self.speed_limit,
            direction,
        })
    }
}


/// Deserializes a field that was present in the body, possibly as `null`
///
/// Combined with `#[serde(default)]`, an omitted field stays `None` while an
/// explicit `null` becomes `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::deserialize(deserializer).map(Some)
}


/// Unwraps a supplied field, rejecting an explicit `null`
fn non_null<T>(field: &str, value: Option<Option<T>>) -> Result<Option<T>> {
    match value {
        Some(None) => Err(Error::Validation(format!("{} cannot be null", field))),
        Some(Some(value)) => Ok(Some(value)),
        None => Ok(None),
    }
}


/// Camera representation accepted by PUT requests
///
/// Every field is optional; only fields present in the body are changed.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CameraUpdate {
    #[serde(default, deserialize_with = "present")]
    pub cross_street_1: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub cross_street_2: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub zipcode: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub speed_limit: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    pub direction: Option<Option<String>>,
}

impl CameraUpdate {

    /// Validates the supplied fields, producing the changes to apply
    pub fn validate(self) -> Result<CameraChanges> {

        let cross_street_1 = non_null("cross_street_1", self.cross_street_1)?;
        if let Some(street) = &cross_street_1 {
            validate_street("cross_street_1", street)?;
        }

        let cross_street_2 = non_null("cross_street_2", self.cross_street_2)?;
        if let Some(street) = &cross_street_2 {
            validate_street("cross_street_2", street)?;
        }

        let zipcode = non_null("zipcode", self.zipcode)?;
        if let Some(zip) = &zipcode {
            validate_zipcode(zip)?;
        }

        let speed_limit = non_null("speed_limit", self.speed_limit)?;
        if let Some(speed_limit) = speed_limit {
            validate_speed_limit(speed_limit)?;
        }

        let direction = non_null("direction", self.direction)?
            .map(|d| parse_direction(&d))
            .transpose()?;

        Ok(CameraChanges {
            cross_street_1,
            cross_street_2,
            zipcode,
            speed_limit,
            direction,
        })
    }
}


/// Query string of a street search
#[derive(Clone, Debug, Deserialize)]
pub struct SearchQuery {
    pub street: String,
    pub zipcode: String,
}

impl SearchQuery {

    pub fn validate(&self) -> Result<()> {

        if self.street.is_empty() {
            return Err(Error::validation("street must not be empty"));
        }

        validate_zipcode(&self.zipcode)
    }
}


/// Body of a successful message-only response
#[derive(Debug, Deserialize, Serialize)]
pub struct Message {
    pub message: String,
}


/// Body of the health check response
#[derive(Debug, Deserialize, Serialize)]
pub struct Health {
    pub status: String,
}


/// Body of the root information response
#[derive(Debug, Deserialize, Serialize)]
pub struct Info {
    pub message: String,
    pub version: String,
}
