use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use url::Url;

use super::domain::{Gender, InternetType, ValidatedSubmission};

/// Bucket for violations that cannot be attributed to a single field.
pub const FORM_FIELD: &str = "form";

const EMAIL_MAX_CHARS: usize = 254;

/// Field name to human-readable message, at most one message per field.
///
/// Entries keep the order they were recorded in, which follows the schema's field order, and
/// serialize as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrorSet(Vec<(String, String)>);

impl ValidationErrorSet {
    /// Error set with a single entry in the `form` bucket.
    pub fn form(message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.insert(FORM_FIELD, message);
        errors
    }

    /// Record a violation. The first message recorded for a field wins.
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        if !self.contains(field) {
            self.0.push((field.to_string(), message.into()));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(field, _)| field)
    }

    pub fn messages(&self) -> Vec<String> {
        self.iter().map(|(_, message)| message.to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(field, message)| (field.as_str(), message.as_str()))
    }
}

impl Serialize for ValidationErrorSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (field, message) in self.iter() {
            map.serialize_entry(field, message)?;
        }
        map.end()
    }
}

impl fmt::Display for ValidationErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrorSet {}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
            .expect("email pattern is a valid regex")
    })
}

pub(crate) fn is_valid_email(candidate: &str) -> bool {
    !candidate.starts_with('.') && !candidate.contains("..") && email_pattern().is_match(candidate)
}

/// Check a raw submission against the intake schema.
///
/// Numeric fields accept either JSON integers or strings holding an integer, so `"21"` and `21`
/// validate identically. Every violated field gets exactly one message.
pub fn validate(raw: &Value) -> Result<ValidatedSubmission, ValidationErrorSet> {
    let Some(fields) = raw.as_object() else {
        return Err(ValidationErrorSet::form(
            "Submission must be a JSON object of form fields.",
        ));
    };

    let mut reader = FieldReader::new(fields);

    let full_name = reader.required_text("full_name", "Full name", 2, 120);
    let email = reader.email("email", "Email");
    let university = reader.required_text("university", "University", 2, 160);
    let motivation = reader.required_text("motivation", "Motivation", 10, 5000);
    let year_level = reader.required_text("year_level", "Year level", 1, 100);
    let location = reader.optional_text("location", "Location", 2, 160);
    let device = reader.required_text("device", "Device", 2, 120);
    let learning_hopes = reader.required_text("learning_hopes", "Learning hopes", 10, 5000);
    let goal = reader.required_text("goal", "Goal", 10, 5000);
    let commitment_hours = reader.integer("commitment_hours", "Commitment hours", 0, 168);
    let internet_type = reader.choice(
        "internet_type",
        "Internet type",
        &InternetType::ALL,
        InternetType::label,
    );
    let age = reader.integer("age", "Age", 10, 100);
    let gender = reader.optional_choice("gender", "Gender", &Gender::ALL, Gender::label);
    let facebook_link = reader.url(
        "facebook_link",
        "Please provide a valid Facebook profile URL.",
    );
    let social_share_link = reader.url(
        "social_share_link",
        "Please provide a valid share post URL.",
    );

    let errors = reader.finish();
    if !errors.is_empty() {
        return Err(errors);
    }

    let assemble = || {
        Some(ValidatedSubmission {
            full_name: full_name?,
            email: email?,
            university: university?,
            motivation: motivation?,
            year_level: year_level?,
            location: location?,
            device: device?,
            learning_hopes: learning_hopes?,
            goal: goal?,
            commitment_hours: commitment_hours?,
            internet_type: internet_type?,
            age: age?,
            gender: gender?,
            facebook_link: facebook_link?,
            social_share_link: social_share_link?,
        })
    };

    assemble().ok_or_else(|| ValidationErrorSet::form("Validation failed."))
}

/// Walks the submission object, recording the first violation per field.
///
/// Every accessor returns `None` when the field failed. Optional accessors return
/// `Some(None)` when the field is absent, null, or blank.
struct FieldReader<'a> {
    fields: &'a Map<String, Value>,
    errors: ValidationErrorSet,
}

impl<'a> FieldReader<'a> {
    fn new(fields: &'a Map<String, Value>) -> Self {
        Self {
            fields,
            errors: ValidationErrorSet::default(),
        }
    }

    fn finish(self) -> ValidationErrorSet {
        self.errors
    }

    fn fail<T>(&mut self, field: &str, message: impl Into<String>) -> Option<T> {
        self.errors.insert(field, message);
        None
    }

    fn present(&self, field: &str) -> Option<&'a Value> {
        match self.fields.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) if raw.trim().is_empty() => None,
            Some(value) => Some(value),
        }
    }

    fn string(&mut self, field: &str, label: &str) -> Option<String> {
        match self.present(field) {
            None => self.fail(field, format!("{label} is required.")),
            Some(Value::String(raw)) => Some(raw.trim().to_string()),
            Some(_) => self.fail(field, format!("{label} must be text.")),
        }
    }

    fn required_text(&mut self, field: &str, label: &str, min: usize, max: usize) -> Option<String> {
        let value = self.string(field, label)?;
        self.check_length(field, label, value, min, max)
    }

    fn optional_text(
        &mut self,
        field: &str,
        label: &str,
        min: usize,
        max: usize,
    ) -> Option<Option<String>> {
        if self.present(field).is_none() {
            return Some(None);
        }
        self.required_text(field, label, min, max).map(Some)
    }

    fn check_length(
        &mut self,
        field: &str,
        label: &str,
        value: String,
        min: usize,
        max: usize,
    ) -> Option<String> {
        let length = value.chars().count();
        if length < min {
            return self.fail(field, format!("{label} must be at least {min} characters."));
        }
        if length > max {
            return self.fail(field, format!("{label} must be at most {max} characters."));
        }
        Some(value)
    }

    fn email(&mut self, field: &str, label: &str) -> Option<String> {
        let value = self.string(field, label)?;
        if !is_valid_email(&value) {
            return self.fail(field, "Please provide a valid email address.");
        }
        if value.chars().count() > EMAIL_MAX_CHARS {
            return self.fail(
                field,
                format!("{label} must be at most {EMAIL_MAX_CHARS} characters."),
            );
        }
        Some(value)
    }

    fn integer(&mut self, field: &str, label: &str, min: u8, max: u8) -> Option<u8> {
        let Some(value) = self.present(field) else {
            return self.fail(field, format!("{label} is required."));
        };

        let parsed = match value {
            Value::Number(number) => number.as_i64().or_else(|| whole_number(number.as_f64())),
            Value::String(raw) => {
                let raw = raw.trim();
                raw.parse::<i64>()
                    .ok()
                    .or_else(|| whole_number(raw.parse::<f64>().ok()))
            }
            _ => None,
        };

        match parsed {
            Some(number) if (i64::from(min)..=i64::from(max)).contains(&number) => {
                u8::try_from(number).ok()
            }
            _ => self.fail(
                field,
                format!("{label} must be a whole number between {min} and {max}."),
            ),
        }
    }

    fn choice<T: Copy>(
        &mut self,
        field: &str,
        label: &str,
        options: &[T],
        label_of: fn(T) -> &'static str,
    ) -> Option<T> {
        let Some(value) = self.present(field) else {
            return self.fail(field, format!("{label} is required."));
        };

        let matched = value.as_str().and_then(|raw| {
            let raw = raw.trim();
            options.iter().copied().find(|option| label_of(*option) == raw)
        });

        match matched {
            Some(option) => Some(option),
            None => {
                let allowed: Vec<&str> = options.iter().map(|option| label_of(*option)).collect();
                self.fail(
                    field,
                    format!("{label} must be one of: {}.", allowed.join(", ")),
                )
            }
        }
    }

    fn optional_choice<T: Copy>(
        &mut self,
        field: &str,
        label: &str,
        options: &[T],
        label_of: fn(T) -> &'static str,
    ) -> Option<Option<T>> {
        if self.present(field).is_none() {
            return Some(None);
        }
        self.choice(field, label, options, label_of).map(Some)
    }

    fn url(&mut self, field: &str, message: &str) -> Option<String> {
        let Some(value) = self.present(field) else {
            return self.fail(field, message);
        };

        match value.as_str().map(str::trim) {
            Some(raw) if Url::parse(raw).is_ok() => Some(raw.to_string()),
            _ => self.fail(field, message),
        }
    }
}

fn whole_number(value: Option<f64>) -> Option<i64> {
    value
        .filter(|number| number.is_finite() && number.fract() == 0.0)
        .filter(|number| number.abs() <= i64::MAX as f64)
        .map(|number| number as i64)
}
