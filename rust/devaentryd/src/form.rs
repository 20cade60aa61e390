use std::collections::BTreeMap;

use crate::config::FormConfig;
use crate::error::FlowError;

/// Field layout of the entry form plus its one numeric check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSpec {
    fields: Vec<String>,
    numeric_field: Option<String>,
}

impl FormSpec {
    pub fn new(fields: Vec<String>, numeric_field: Option<String>) -> Self {
        Self {
            fields,
            numeric_field,
        }
    }

    pub fn from_config(config: &FormConfig) -> Self {
        Self::new(config.fields.clone(), config.numeric_field.clone())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Every field present and empty.
    pub fn blank(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|f| (f.clone(), String::new()))
            .collect()
    }

    /// Form values taken from an existing entry; missing columns become "".
    pub fn prefill(&self, existing: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|f| (f.clone(), existing.get(f).cloned().unwrap_or_default()))
            .collect()
    }

    pub fn set(
        &self,
        values: &mut BTreeMap<String, String>,
        name: &str,
        value: String,
    ) -> Result<(), FlowError> {
        if !self.fields.iter().any(|f| f == name) {
            return Err(FlowError::UnknownField(name.to_string()));
        }
        values.insert(name.to_string(), value);
        Ok(())
    }

    /// Runs before any store call.
    pub fn validate(&self, values: &BTreeMap<String, String>) -> Result<(), FlowError> {
        let Some(field) = self.numeric_field.as_ref() else {
            return Ok(());
        };
        let raw = values.get(field).map(|s| s.as_str()).unwrap_or("");
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(()),
            _ => Err(FlowError::ValidationFailure {
                field: field.clone(),
                value: raw.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> FormSpec {
        FormSpec::new(vec!["Amount".into(), "Reason".into()], Some("Amount".into()))
    }

    #[test]
    fn numeric_field_must_parse() {
        let spec = spec();
        let mut values = spec.blank();
        assert!(matches!(
            spec.validate(&values),
            Err(FlowError::ValidationFailure { .. })
        ));

        spec.set(&mut values, "Amount", " 12.50 ".into()).expect("set");
        assert!(spec.validate(&values).is_ok());

        spec.set(&mut values, "Amount", "twelve".into()).expect("set");
        let err = spec.validate(&values).unwrap_err();
        assert_eq!(err.code(), "validation_failed");

        spec.set(&mut values, "Amount", "NaN".into()).expect("set");
        assert!(spec.validate(&values).is_err());
    }

    #[test]
    fn other_fields_are_free_text() {
        let spec = spec();
        let mut values = spec.blank();
        spec.set(&mut values, "Amount", "3".into()).expect("set");
        spec.set(&mut values, "Reason", "".into()).expect("set");
        assert!(spec.validate(&values).is_ok());
        assert!(matches!(
            spec.set(&mut values, "Bogus", "x".into()),
            Err(FlowError::UnknownField(_))
        ));
    }

    #[test]
    fn prefill_ignores_unknown_columns() {
        let spec = spec();
        let mut existing = BTreeMap::new();
        existing.insert("Amount".to_string(), "9".to_string());
        existing.insert("Legacy".to_string(), "x".to_string());
        let values = spec.prefill(&existing);
        assert_eq!(values.len(), 2);
        assert_eq!(values.get("Reason").map(String::as_str), Some(""));
    }
}
