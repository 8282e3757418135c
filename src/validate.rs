use std::collections::BTreeMap;
use std::fmt;

use crate::feature::{FeatureId, NewFeature, MAX_FRIENDLY_ID};

/// Field-level validation failures, keyed by wire field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Records an error for `field`. The first message per field is kept.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn into_fields(self) -> BTreeMap<String, String> {
        self.fields
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

pub fn check_name(name: Option<&str>, errors: &mut ValidationErrors) -> Option<String> {
    match name {
        Some(n) if !n.trim().is_empty() => Some(n.to_string()),
        _ => {
            errors.add("name", "The name field cannot be empty or whitespace.");
            None
        }
    }
}

pub fn check_friendly_id(friendly_id: Option<i64>, errors: &mut ValidationErrors) -> Option<u32> {
    match friendly_id {
        None => {
            errors.add("friendlyId", "The friendlyId field is required.");
            None
        }
        Some(v) if v < 1 || v > MAX_FRIENDLY_ID as i64 => {
            errors.add(
                "friendlyId",
                format!("The friendlyId field must be between 1 and {}.", MAX_FRIENDLY_ID),
            );
            None
        }
        Some(v) => Some(v as u32),
    }
}

fn check_buckets(buckets: Option<Vec<String>>, errors: &mut ValidationErrors) -> Vec<String> {
    let buckets = buckets.unwrap_or_default();
    if buckets.iter().any(|b| b.trim().is_empty()) {
        errors.add("bucketList", "Bucket ids cannot be empty or whitespace.");
    }
    buckets
}

/// Parses a path or body id.
pub fn parse_feature_id(raw: &str) -> Result<FeatureId, ValidationErrors> {
    raw.parse::<FeatureId>().map_err(|_| {
        ValidationErrors::single(
            "id",
            "The id must be a valid unique identifier, e.g. 3f2504e0-4f89-41d3-9a0c-0305e82c3301.",
        )
    })
}

pub fn parse_bucket_id(raw: &str) -> Result<&str, ValidationErrors> {
    if raw.trim().is_empty() {
        return Err(ValidationErrors::single(
            "bucketId",
            "The bucketId cannot be empty or whitespace.",
        ));
    }
    Ok(raw)
}

/// Validates the fields of a feature to be added.
pub fn validate_new(
    name: Option<&str>,
    friendly_id: Option<i64>,
    buckets: Option<Vec<String>>,
) -> Result<NewFeature, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = check_name(name, &mut errors);
    let friendly_id = check_friendly_id(friendly_id, &mut errors);
    let bucket_list = check_buckets(buckets, &mut errors);
    errors.into_result(|| NewFeature {
        // both are Some when no errors were recorded
        friendly_id: friendly_id.unwrap_or_default(),
        name: name.unwrap_or_default(),
        bucket_list,
    })
}

/// Validates the fields of a full-replace update. The id must be present and non-nil.
pub fn validate_update(
    id: Option<&str>,
    name: Option<&str>,
    friendly_id: Option<i64>,
    buckets: Option<Vec<String>>,
) -> Result<(FeatureId, NewFeature), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let id = match id.map(parse_feature_id) {
        Some(Ok(id)) if !id.is_nil() => Some(id),
        Some(Err(e)) => {
            for (field, message) in e.into_fields() {
                errors.add(&field, message);
            }
            None
        }
        _ => {
            errors.add(
                "id",
                "A feature id cannot be empty and must be a valid meaningful unique id.",
            );
            None
        }
    };
    let fields = validate_new(name, friendly_id, buckets);
    match (id, fields) {
        (Some(id), Ok(new)) if errors.is_empty() => Ok((id, new)),
        (_, fields) => {
            if let Err(e) = fields {
                for (field, message) in e.into_fields() {
                    errors.add(&field, message);
                }
            }
            Err(errors)
        }
    }
}
