// =============================================================================
// PROPERTY SCHEMA MODULE
// =============================================================================
// A component version carries a JSON-Schema-like description of its editable
// properties. This module turns that description into:
// - the editor widget for each property (Widget, decided once per property)
// - the default property bag for a new section
// - validation of a property bag before it is persisted
// - the single-key merge applied when one property is edited
// =============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::AppError;
use crate::models::PropertyBag;

/// Color shown when a color property has neither a value nor a default
pub const DEFAULT_COLOR: &str = "#ffffff";

/// Strings longer than this get a multi-line editor
pub const LONG_TEXT_THRESHOLD: u64 = 100;

pub const BOOLEAN_ON_LABEL: &str = "Aktif";
pub const BOOLEAN_OFF_LABEL: &str = "Pasif";

// =============================================================================
// SCHEMA TYPES
// =============================================================================

/// Declaration of one editable property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(rename = "enum", default)]
    pub enum_values: Vec<Value>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "maxLength", default)]
    pub max_length: Option<u64>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// All properties of a component version, keyed by property name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySchema {
    pub properties: BTreeMap<String, PropertyDef>,
    pub required: Vec<String>,
    /// `additionalProperties: false` rejects keys the schema doesn't declare
    pub allow_additional: bool,
}

impl PropertySchema {
    /// Parse a stored schema.
    ///
    /// Accepts both a full JSON Schema (`{"type": "object", "properties": {...}}`)
    /// and the flat form (`{"title": {"type": "string"}}`) used by older
    /// component versions.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let root = match value {
            Value::Null => return Ok(Self { allow_additional: true, ..Self::default() }),
            Value::Object(map) => map,
            _ => return Err("schema must be a JSON object".to_string()),
        };

        let (entries, nested) = match root.get("properties") {
            Some(Value::Object(props)) => (props, true),
            Some(_) => return Err("\"properties\" must be an object".to_string()),
            None => (root, false),
        };

        let mut properties = BTreeMap::new();
        for (key, raw) in entries {
            // In the flat form, top-level metadata such as "type": "object"
            // sits next to the property declarations.
            if !nested && !raw.is_object() {
                continue;
            }
            let prop: PropertyDef = serde_json::from_value(raw.clone())
                .map_err(|e| format!("property \"{key}\": {e}"))?;
            properties.insert(key.clone(), prop);
        }

        let required = if nested {
            root.get("required")
                .and_then(Value::as_array)
                .map(|keys| {
                    keys.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let allow_additional = !matches!(root.get("additionalProperties"), Some(Value::Bool(false)));

        Ok(Self {
            properties,
            required,
            allow_additional,
        })
    }

    /// Default property bag for a new section: every declared key, set to its
    /// declared default or to an explicit empty value.
    pub fn seed_defaults(&self) -> PropertyBag {
        self.properties
            .iter()
            .map(|(key, prop)| {
                let value = prop.default.clone().unwrap_or_else(|| prop.empty_value());
                (key.clone(), value)
            })
            .collect()
    }

    /// Check every property of `bag`, reporting all offending keys at once.
    pub fn validate(&self, bag: &PropertyBag) -> Result<(), AppError> {
        let mut violations: BTreeMap<String, String> = BTreeMap::new();

        for (key, value) in bag {
            match self.properties.get(key) {
                Some(prop) => {
                    if let Err(reason) = prop.check(value) {
                        violations.insert(key.clone(), reason);
                    }
                }
                None if !self.allow_additional => {
                    violations.insert(key.clone(), "not declared by the schema".to_string());
                }
                None => {}
            }
        }

        for key in &self.required {
            let missing = bag.get(key).map_or(true, |v| v.is_null());
            if missing {
                violations.entry(key.clone()).or_insert_with(|| "required".to_string());
            }
        }

        if violations.is_empty() {
            return Ok(());
        }

        metrics_violation(violations.len());
        let reasons = violations
            .iter()
            .map(|(key, reason)| format!("{key}: {reason}"))
            .collect();
        Err(AppError::SchemaViolation {
            keys: violations.into_keys().collect(),
            reasons,
        })
    }

    /// Editor form for a section's current property bag
    pub fn form(&self, bag: &PropertyBag) -> Vec<FormField> {
        self.properties
            .iter()
            .map(|(key, prop)| {
                let widget = Widget::for_property(prop);
                let value = widget.display_value(bag.get(key), prop);
                FormField {
                    key: key.clone(),
                    label: prop.display_label(key),
                    description: prop.description.clone(),
                    type_label: widget.type_label().to_string(),
                    widget,
                    value,
                }
            })
            .collect()
    }
}

fn metrics_violation(count: usize) {
    crate::metrics::record_schema_violations(count);
}

impl PropertyDef {
    fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("")
    }

    fn display_label(&self, key: &str) -> String {
        self.title
            .clone()
            .or_else(|| self.label.clone())
            .unwrap_or_else(|| key.to_string())
    }

    /// Value seeded when no default is declared. Free text starts as `""`;
    /// choices and colors start unset so they pass validation and the editor
    /// shows its own fallback.
    pub fn empty_value(&self) -> Value {
        let constrained = !self.enum_values.is_empty() || self.format.as_deref() == Some("color");
        match self.kind() {
            "string" if !constrained => Value::String(String::new()),
            _ => Value::Null,
        }
    }

    /// Check one value against this declaration. Null means "unset" and is
    /// always accepted here; required-ness is checked by the schema.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            return Ok(());
        }

        match self.kind() {
            "string" => {
                let text = value.as_str().ok_or("expected a string")?;
                if !self.enum_values.is_empty() && !self.enum_values.iter().any(|v| enum_matches(v, value)) {
                    return Err(format!("\"{text}\" is not one of the allowed values"));
                }
                if let Some(max) = self.max_length {
                    if text.chars().count() as u64 > max {
                        return Err(format!("longer than {max} characters"));
                    }
                }
                match self.format.as_deref() {
                    Some("color") if !text.is_empty() && !is_hex_color(text) => {
                        Err(format!("\"{text}\" is not a hex color"))
                    }
                    Some("url") if !text.is_empty() && !is_url_like(text) => {
                        Err(format!("\"{text}\" is not a URL"))
                    }
                    _ => Ok(()),
                }
            }
            "number" | "integer" => {
                let number = value.as_f64().ok_or("expected a number")?;
                if self.kind() == "integer" && number.fract() != 0.0 {
                    return Err("expected an integer".to_string());
                }
                if let Some(min) = self.minimum {
                    if number < min {
                        return Err(format!("below minimum {min}"));
                    }
                }
                if let Some(max) = self.maximum {
                    if number > max {
                        return Err(format!("above maximum {max}"));
                    }
                }
                Ok(())
            }
            "boolean" => value.as_bool().map(|_| ()).ok_or_else(|| "expected true or false".to_string()),
            "array" => value.as_array().map(|_| ()).ok_or_else(|| "expected an array".to_string()),
            "object" => value.as_object().map(|_| ()).ok_or_else(|| "expected an object".to_string()),
            _ => Ok(()),
        }
    }
}

fn enum_matches(allowed: &Value, value: &Value) -> bool {
    allowed == value || matches!((allowed, value), (a, Value::String(s)) if enum_label(a) == *s)
}

fn enum_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_hex_color(text: &str) -> bool {
    text.strip_prefix('#').is_some_and(|hex| {
        matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
    })
}

fn is_url_like(text: &str) -> bool {
    const PREFIXES: [&str; 7] = ["http://", "https://", "/", "#", "mailto:", "tel:", "?"];
    !text.chars().any(char::is_whitespace) && PREFIXES.iter().any(|p| text.starts_with(p))
}

// =============================================================================
// WIDGETS
// =============================================================================
/// Editor widget for one property, chosen by the first matching rule:
///
/// 1. string + format color  -> Color
/// 2. string + format url    -> Url
/// 3. string + format image  -> Image
/// 4. string + non-empty enum -> Enum
/// 5. string + maxLength > 100 -> LongText
/// 6. string                 -> Text
/// 7. number / integer       -> Number
/// 8. boolean                -> Boolean
/// 9. anything else          -> Raw (JSON-or-text input)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Widget {
    Color,
    Url,
    Image,
    Enum {
        options: Vec<String>,
    },
    LongText {
        max_length: u64,
    },
    Text,
    Number {
        minimum: Option<f64>,
        maximum: Option<f64>,
        step: f64,
    },
    Boolean {
        on_label: String,
        off_label: String,
    },
    Raw,
}

impl Widget {
    pub fn for_property(prop: &PropertyDef) -> Self {
        match prop.kind() {
            "string" => match prop.format.as_deref() {
                Some("color") => Widget::Color,
                Some("url") => Widget::Url,
                Some("image") => Widget::Image,
                _ if !prop.enum_values.is_empty() => Widget::Enum {
                    options: prop.enum_values.iter().map(enum_label).collect(),
                },
                _ => match prop.max_length {
                    Some(max) if max > LONG_TEXT_THRESHOLD => Widget::LongText { max_length: max },
                    _ => Widget::Text,
                },
            },
            kind @ ("number" | "integer") => Widget::Number {
                minimum: prop.minimum,
                maximum: prop.maximum,
                step: if kind == "integer" { 1.0 } else { 0.1 },
            },
            "boolean" => Widget::Boolean {
                on_label: BOOLEAN_ON_LABEL.to_string(),
                off_label: BOOLEAN_OFF_LABEL.to_string(),
            },
            _ => Widget::Raw,
        }
    }

    /// Label shown next to the property in the editor's property list
    pub fn type_label(&self) -> &'static str {
        match self {
            Widget::Color => "Color",
            Widget::Url => "Link",
            Widget::Image => "Image",
            Widget::Enum { .. } => "List",
            Widget::LongText { .. } => "Long Text",
            Widget::Text => "Text",
            Widget::Number { .. } => "Number",
            Widget::Boolean { .. } => "On/Off",
            Widget::Raw => "JSON",
        }
    }

    /// Value the widget is pre-filled with: current value, else the declared
    /// default, else the widget's own fallback.
    pub fn display_value(&self, current: Option<&Value>, prop: &PropertyDef) -> Value {
        let is_set = |v: &&Value| match self {
            Widget::Color => !v.is_null() && v.as_str() != Some(""),
            _ => !v.is_null(),
        };
        if let Some(value) = current.filter(is_set) {
            return value.clone();
        }
        if let Some(default) = prop.default.as_ref().filter(is_set) {
            return default.clone();
        }
        match self {
            Widget::Color => Value::String(DEFAULT_COLOR.to_string()),
            Widget::Boolean { .. } => Value::Bool(false),
            Widget::Number { .. } | Widget::Raw => Value::Null,
            _ => Value::String(String::new()),
        }
    }

    /// Turn editor input into the value stored in the property bag.
    ///
    /// Raw widgets parse text starting with `{` or `[` as JSON and keep the
    /// literal string when parsing fails. Number and boolean widgets accept
    /// their textual forms; anything unparseable is kept as-is so validation
    /// can name the key.
    pub fn coerce_input(&self, input: Value) -> Value {
        let Value::String(text) = input else {
            return input;
        };

        match self {
            Widget::Raw => {
                let trimmed = text.trim_start();
                if trimmed.starts_with('{') || trimmed.starts_with('[') {
                    serde_json::from_str(&text).unwrap_or(Value::String(text))
                } else {
                    Value::String(text)
                }
            }
            Widget::Number { step, .. } => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Value::Null;
                }
                if *step == 1.0 {
                    if let Ok(n) = trimmed.parse::<i64>() {
                        return Value::from(n);
                    }
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
                    .unwrap_or(Value::String(text))
            }
            Widget::Boolean { .. } => match text.trim() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => Value::String(text),
            },
            _ => Value::String(text),
        }
    }
}

/// One row of the generated property form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub key: String,
    pub label: String,
    pub description: Option<String>,
    pub type_label: String,
    pub widget: Widget,
    pub value: Value,
}

/// Apply a single-key edit, leaving every other key untouched
pub fn merge_property(bag: &PropertyBag, key: &str, value: Value) -> PropertyBag {
    let mut merged: Map<String, Value> = bag.clone();
    merged.insert(key.to_string(), value);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prop(value: Value) -> PropertyDef {
        serde_json::from_value(value).unwrap()
    }

    fn bag(value: Value) -> PropertyBag {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_widget_rules_in_priority_order() {
        // format wins over enum and maxLength
        let color = prop(json!({"type": "string", "format": "color", "enum": ["#000"], "maxLength": 500}));
        assert_eq!(Widget::for_property(&color), Widget::Color);

        assert_eq!(Widget::for_property(&prop(json!({"type": "string", "format": "url"}))), Widget::Url);
        assert_eq!(Widget::for_property(&prop(json!({"type": "string", "format": "image"}))), Widget::Image);

        // enum wins over maxLength
        let choice = prop(json!({"type": "string", "enum": ["left", "center"], "maxLength": 500}));
        assert_eq!(
            Widget::for_property(&choice),
            Widget::Enum { options: vec!["left".into(), "center".into()] }
        );

        let long = prop(json!({"type": "string", "maxLength": 101}));
        assert_eq!(Widget::for_property(&long), Widget::LongText { max_length: 101 });

        let short = prop(json!({"type": "string", "maxLength": 100}));
        assert_eq!(Widget::for_property(&short), Widget::Text);

        let empty_enum = prop(json!({"type": "string", "enum": []}));
        assert_eq!(Widget::for_property(&empty_enum), Widget::Text);
    }

    #[test]
    fn test_number_and_boolean_widgets() {
        let int = prop(json!({"type": "integer", "minimum": 1, "maximum": 12}));
        assert_eq!(
            Widget::for_property(&int),
            Widget::Number { minimum: Some(1.0), maximum: Some(12.0), step: 1.0 }
        );

        let float = prop(json!({"type": "number"}));
        assert_eq!(
            Widget::for_property(&float),
            Widget::Number { minimum: None, maximum: None, step: 0.1 }
        );

        let toggle = Widget::for_property(&prop(json!({"type": "boolean"})));
        assert_eq!(toggle.type_label(), "On/Off");
        assert!(matches!(toggle, Widget::Boolean { ref on_label, .. } if on_label == "Aktif"));

        assert_eq!(Widget::for_property(&prop(json!({"type": "array"}))), Widget::Raw);
        assert_eq!(Widget::for_property(&prop(json!({}))), Widget::Raw);
    }

    #[test]
    fn test_type_labels() {
        let labels: Vec<&str> = [
            json!({"type": "string", "format": "color"}),
            json!({"type": "string", "format": "url"}),
            json!({"type": "string", "enum": ["a"]}),
            json!({"type": "string", "maxLength": 400}),
            json!({"type": "string"}),
            json!({"type": "boolean"}),
        ]
        .into_iter()
        .map(|s| Widget::for_property(&prop(s)).type_label())
        .collect();

        assert_eq!(labels, vec!["Color", "Link", "List", "Long Text", "Text", "On/Off"]);
    }

    #[test]
    fn test_text_prefilled_with_declared_default() {
        let schema = PropertySchema::from_value(&json!({
            "title": {"type": "string", "default": "Ana Başlık"}
        }))
        .unwrap();

        let form = schema.form(&PropertyBag::new());
        assert_eq!(form.len(), 1);
        assert_eq!(form[0].key, "title");
        assert_eq!(form[0].widget, Widget::Text);
        assert_eq!(form[0].value, json!("Ana Başlık"));
    }

    #[test]
    fn test_color_falls_back_to_white() {
        let schema = PropertySchema::from_value(&json!({
            "type": "object",
            "properties": {
                "background": {"type": "string", "format": "color", "title": "Arka Plan"}
            }
        }))
        .unwrap();

        let form = schema.form(&PropertyBag::new());
        assert_eq!(form[0].label, "Arka Plan");
        assert_eq!(form[0].value, json!("#ffffff"));

        let form = schema.form(&bag(json!({"background": "#123456"})));
        assert_eq!(form[0].value, json!("#123456"));
    }

    #[test]
    fn test_seed_defaults_covers_every_key() {
        let schema = PropertySchema::from_value(&json!({
            "type": "object",
            "properties": {
                "title": {"type": "string", "default": "Hoş geldiniz"},
                "subtitle": {"type": "string"},
                "columns": {"type": "integer", "default": 3},
                "sticky": {"type": "boolean"}
            }
        }))
        .unwrap();

        let seeded = schema.seed_defaults();
        assert_eq!(seeded.len(), 4);
        assert_eq!(seeded["title"], json!("Hoş geldiniz"));
        assert_eq!(seeded["subtitle"], json!(""));
        assert_eq!(seeded["columns"], json!(3));
        assert_eq!(seeded["sticky"], Value::Null);
        assert!(schema.validate(&seeded).is_ok());
    }

    #[test]
    fn test_seeded_choices_and_colors_validate() {
        let schema = PropertySchema::from_value(&json!({
            "title": {"type": "string", "default": "Hi"},
            "align": {"type": "string", "enum": ["left", "right"]},
            "background": {"type": "string", "format": "color"}
        }))
        .unwrap();

        let seeded = schema.seed_defaults();
        assert_eq!(seeded["align"], Value::Null);
        assert_eq!(seeded["background"], Value::Null);
        assert!(schema.validate(&seeded).is_ok());

        // Another key can still be edited on a freshly seeded bag
        let edited = merge_property(&seeded, "title", json!("Merhaba"));
        assert!(schema.validate(&edited).is_ok());

        let form = schema.form(&seeded);
        let background = form.iter().find(|f| f.key == "background").unwrap();
        assert_eq!(background.value, json!("#ffffff"));
    }

    #[test]
    fn test_empty_color_shows_fallback() {
        let schema = PropertySchema::from_value(&json!({
            "bg": {"type": "string", "format": "color"}
        }))
        .unwrap();
        let form = schema.form(&bag(json!({"bg": ""})));
        assert_eq!(form[0].value, json!("#ffffff"));
    }

    #[test]
    fn test_flat_schema_skips_metadata_entries() {
        let schema = PropertySchema::from_value(&json!({
            "type": "object",
            "title": {"type": "string"}
        }))
        .unwrap();
        assert_eq!(schema.properties.keys().collect::<Vec<_>>(), vec!["title"]);
    }

    #[test]
    fn test_malformed_schema_is_rejected() {
        assert!(PropertySchema::from_value(&json!("nope")).is_err());
        assert!(PropertySchema::from_value(&json!({"properties": []})).is_err());
        assert!(PropertySchema::from_value(&json!({"title": {"type": 5}})).is_err());
    }

    #[test]
    fn test_validation_reports_every_offending_key() {
        let schema = PropertySchema::from_value(&json!({
            "type": "object",
            "properties": {
                "color": {"type": "string", "format": "color"},
                "align": {"type": "string", "enum": ["left", "right"]},
                "count": {"type": "integer", "minimum": 1},
                "title": {"type": "string"}
            }
        }))
        .unwrap();

        let err = schema
            .validate(&bag(json!({
                "color": "red",
                "align": "middle",
                "count": 0,
                "title": "fine"
            })))
            .unwrap_err();

        match err {
            AppError::SchemaViolation { keys, reasons } => {
                assert_eq!(keys, vec!["align", "color", "count"]);
                assert_eq!(reasons.len(), 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validation_of_types_and_formats() {
        let s = prop(json!({"type": "integer"}));
        assert!(s.check(&json!(4)).is_ok());
        assert!(s.check(&json!(4.5)).is_err());
        assert!(s.check(&json!("4")).is_err());

        let s = prop(json!({"type": "string", "format": "url"}));
        assert!(s.check(&json!("https://example.com")).is_ok());
        assert!(s.check(&json!("/products")).is_ok());
        assert!(s.check(&json!("")).is_ok());
        assert!(s.check(&json!("not a url")).is_err());

        let s = prop(json!({"type": "string", "maxLength": 3}));
        assert!(s.check(&json!("abç")).is_ok());
        assert!(s.check(&json!("abcd")).is_err());

        let s = prop(json!({"type": "boolean"}));
        assert!(s.check(&json!(true)).is_ok());
        assert!(s.check(&json!("true")).is_err());
        assert!(s.check(&Value::Null).is_ok());
    }

    #[test]
    fn test_required_and_additional_properties() {
        let schema = PropertySchema::from_value(&json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["title"],
            "properties": {"title": {"type": "string"}}
        }))
        .unwrap();

        let err = schema.validate(&bag(json!({"extra": 1}))).unwrap_err();
        match err {
            AppError::SchemaViolation { keys, .. } => assert_eq!(keys, vec!["extra", "title"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_raw_input_parsing() {
        let raw = Widget::Raw;
        assert_eq!(raw.coerce_input(json!("{\"a\": 1}")), json!({"a": 1}));
        assert_eq!(raw.coerce_input(json!("[1, 2]")), json!([1, 2]));
        assert_eq!(raw.coerce_input(json!("{broken")), json!("{broken"));
        assert_eq!(raw.coerce_input(json!("plain")), json!("plain"));
        assert_eq!(raw.coerce_input(json!(7)), json!(7));
    }

    #[test]
    fn test_number_and_boolean_input_coercion() {
        let int = Widget::Number { minimum: None, maximum: None, step: 1.0 };
        assert_eq!(int.coerce_input(json!("12")), json!(12));
        assert_eq!(int.coerce_input(json!("")), Value::Null);
        assert_eq!(int.coerce_input(json!("x")), json!("x"));

        let float = Widget::Number { minimum: None, maximum: None, step: 0.1 };
        assert_eq!(float.coerce_input(json!("1.5")), json!(1.5));

        let toggle = Widget::for_property(&prop(json!({"type": "boolean"})));
        assert_eq!(toggle.coerce_input(json!("true")), json!(true));
    }

    #[test]
    fn test_merge_touches_only_one_key() {
        let original = bag(json!({"title": "A", "subtitle": "B", "color": "#000000"}));
        let merged = merge_property(&original, "title", json!("New"));

        assert_eq!(merged["title"], json!("New"));
        assert_eq!(merged["subtitle"], json!("B"));
        assert_eq!(merged["color"], json!("#000000"));
        assert_eq!(merged.len(), 3);
        assert_eq!(original["title"], json!("A"));
    }
}
