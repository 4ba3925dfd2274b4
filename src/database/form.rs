use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError, ValidationErrors};

use super::error::Error;

pub type FormData = Map<String, Value>;

pub const REQUIRED: &str = "This field is required.";

/// Validation messages keyed by field name.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors {
    inner: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.inner
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.inner.get(field).map(|messages| messages.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn extend(&mut self, errors: &ValidationErrors) {
        for (field, failures) in errors.field_errors() {
            for failure in failures {
                self.add(field, failure_message(failure));
            }
        }
    }

    pub fn into_result<T>(self, value: T) -> Result<T, Error> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(Error::validation(self))
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(value: ValidationErrors) -> Self {
        let mut errors = Self::new();
        errors.extend(&value);
        errors
    }
}

pub fn failure_message(failure: &ValidationError) -> &str {
    failure.message.as_deref().unwrap_or(&*failure.code)
}

/// A JSON object payload with typed, error-collecting accessors.
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(data) => Ok(Self::from_data(data)),
            _ => Err(Error::field(
                "non_field_errors",
                "Invalid data. Expected a dictionary.",
            )),
        }
    }

    /// Deserializes a fixed-shape payload and runs its `validator` rules.
    pub fn validated<T: DeserializeOwned + Validate>(&self) -> Result<T, Error> {
        let payload: T = serde_json::from_value(Value::Object(self.inner.clone()))
            .map_err(|e| Error::field("non_field_errors", &format!("Invalid data. {e}")))?;

        payload
            .validate()
            .map_err(|e| Error::validation(FieldErrors::from(e)))?;
        Ok(payload)
    }

    /// `Ok(None)` when the key is absent, `Err` with a message when the value has the wrong type.
    pub fn get_str(&self, key: &str) -> Result<Option<String>, String> {
        match self.inner.get(key) {
            None => Ok(None),
            Some(Value::String(v)) => Ok(Some(v.to_owned())),
            Some(Value::Null) => Err(String::from("This field may not be null.")),
            Some(_) => Err(String::from("Not a valid string.")),
        }
    }

    /// Accepts JSON integers and integer strings.
    pub fn get_number(&self, key: &str) -> Result<Option<i64>, String> {
        match self.inner.get(key) {
            None => Ok(None),
            Some(value) => parse_integer(value)
                .map(Some)
                .ok_or_else(|| String::from("A valid integer is required.")),
        }
    }

    pub fn get_array(&self, key: &str) -> Result<Option<&Vec<Value>>, String> {
        match self.inner.get(key) {
            None => Ok(None),
            Some(Value::Array(values)) => Ok(Some(values)),
            Some(_) => Err(String::from("Expected a list of items.")),
        }
    }
}

pub fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rejects_non_object_payloads() {
        let error = Form::from_value(json!([1, 2])).err().unwrap();
        assert!(error.fields.unwrap().get("non_field_errors").is_some());
    }

    #[test]
    fn numbers_accept_integer_strings() {
        let form = Form::from_value(json!({ "a": 5, "b": "7", "c": "x", "d": 1.5 })).unwrap();
        assert_eq!(form.get_number("a"), Ok(Some(5)));
        assert_eq!(form.get_number("b"), Ok(Some(7)));
        assert!(form.get_number("c").is_err());
        assert!(form.get_number("d").is_err());
        assert_eq!(form.get_number("missing"), Ok(None));
    }

    #[test]
    fn strings_reject_other_types() {
        let form = Form::from_value(json!({ "name": "soup", "text": 3 })).unwrap();
        assert_eq!(form.get_str("name"), Ok(Some(String::from("soup"))));
        assert!(form.get_str("text").is_err());
    }

    #[test]
    fn field_errors_accumulate_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("tags", "first");
        errors.add("tags", "second");
        assert_eq!(errors.get("tags").unwrap().len(), 2);
        assert!(errors.into_result(()).is_err());
    }

    #[derive(Debug, serde::Deserialize, Validate)]
    struct Portion {
        #[validate(length(min = 1, message = "This field may not be blank."))]
        name: String,
        #[validate(range(min = 1))]
        size: i32,
    }

    #[test]
    fn validated_payloads_report_failures_by_field() {
        let form = Form::from_value(json!({ "name": "", "size": 0 })).unwrap();
        let fields = form.validated::<Portion>().unwrap_err().fields.unwrap();
        assert_eq!(
            fields.get("name"),
            Some(&[String::from("This field may not be blank.")][..])
        );
        assert_eq!(fields.get("size"), Some(&[String::from("range")][..]));
    }

    #[test]
    fn validated_payloads_reject_wrong_shapes() {
        let form = Form::from_value(json!({ "name": 1, "size": 2 })).unwrap();
        let fields = form.validated::<Portion>().unwrap_err().fields.unwrap();
        assert!(fields.get("non_field_errors").is_some());

        let form = Form::from_value(json!({ "name": "soup", "size": 2 })).unwrap();
        assert_eq!(form.validated::<Portion>().unwrap().name, "soup");
    }
}
