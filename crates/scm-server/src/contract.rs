//! Argument contracts.
//!
//! A contract is compiled once from an operation's JSON schema and then
//! checks every incoming argument object against it. Only the subset of JSON
//! Schema the catalog uses is supported: `type`, `properties`, `required`,
//! `enum`, `default`, `format: uuid`, `minimum`/`maximum`,
//! `minLength`/`maxLength` and `items`.

use std::collections::BTreeMap;
use std::fmt;

use scm_protocol::ExchangeError;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("schema root must be an object schema")]
    RootNotObject,
    #[error("unsupported type '{ty}' at '{path}'")]
    UnsupportedType { path: String, ty: String },
    #[error("required field '{0}' is not declared in properties")]
    UndeclaredRequired(String),
    #[error("invalid schema at '{path}': {reason}")]
    Invalid { path: String, reason: String },
}

/// A single contract violation, naming the offending field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentViolation {
    pub field: String,
    pub reason: String,
}

impl ArgumentViolation {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Nest under a parent path, e.g. `name` → `items[2].name`.
    pub fn within(mut self, parent: &str) -> Self {
        self.field = if self.field.is_empty() {
            parent.to_string()
        } else if self.field.starts_with('[') {
            format!("{parent}{}", self.field)
        } else {
            format!("{parent}.{}", self.field)
        };
        self
    }
}

impl fmt::Display for ArgumentViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

impl From<ArgumentViolation> for ExchangeError {
    fn from(v: ArgumentViolation) -> Self {
        ExchangeError::validation(v.field, v.reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Any,
}

impl FieldType {
    fn parse(ty: &str) -> Option<Self> {
        Some(match ty {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => return None,
        })
    }

    fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Any => true,
        }
    }
}

#[derive(Debug, Clone)]
struct FieldSpec {
    ty: FieldType,
    allowed: Option<Vec<Value>>,
    default: Option<Value>,
    uuid: bool,
    minimum: Option<f64>,
    maximum: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    items: Option<Box<FieldSpec>>,
    object: Option<ObjectSpec>,
}

#[derive(Debug, Clone, Default)]
struct ObjectSpec {
    properties: BTreeMap<String, FieldSpec>,
    required: Vec<String>,
}

/// Compiled argument contract for one operation.
#[derive(Debug, Clone)]
pub struct ArgumentContract {
    schema: Value,
    root: ObjectSpec,
}

impl ArgumentContract {
    /// Compile a contract from a JSON schema. The root must be an object
    /// schema (or omit `type`).
    pub fn from_schema(schema: Value) -> Result<Self, ContractError> {
        let Some(obj) = schema.as_object() else {
            return Err(ContractError::RootNotObject);
        };
        match obj.get("type").and_then(Value::as_str) {
            None | Some("object") => {}
            Some(_) => return Err(ContractError::RootNotObject),
        }
        let root = compile_object(obj, "")?;
        Ok(Self { schema, root })
    }

    /// Contract accepting any object.
    pub fn any() -> Self {
        Self {
            schema: serde_json::json!({"type": "object"}),
            root: ObjectSpec::default(),
        }
    }

    /// The schema this contract was compiled from.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validate arguments and fill defaults for absent optional fields.
    /// Unknown fields are passed through untouched.
    pub fn validate(&self, arguments: Option<Value>) -> Result<Map<String, Value>, ArgumentViolation> {
        let mut args = match arguments {
            None => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(ArgumentViolation::new("arguments", "must be an object")),
        };
        validate_object(&self.root, &mut args, "")?;
        Ok(args)
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn compile_object(obj: &Map<String, Value>, path: &str) -> Result<ObjectSpec, ContractError> {
    let mut spec = ObjectSpec::default();

    if let Some(props) = obj.get("properties") {
        let props = props.as_object().ok_or_else(|| ContractError::Invalid {
            path: path.to_string(),
            reason: "'properties' must be an object".into(),
        })?;
        for (key, field) in props {
            let field_path = join(path, key);
            spec.properties
                .insert(key.clone(), compile_field(field, &field_path)?);
        }
    }

    if let Some(required) = obj.get("required") {
        let required = required.as_array().ok_or_else(|| ContractError::Invalid {
            path: path.to_string(),
            reason: "'required' must be an array".into(),
        })?;
        for name in required {
            let name = name.as_str().ok_or_else(|| ContractError::Invalid {
                path: path.to_string(),
                reason: "'required' entries must be strings".into(),
            })?;
            if !spec.properties.contains_key(name) {
                return Err(ContractError::UndeclaredRequired(join(path, name)));
            }
            spec.required.push(name.to_string());
        }
    }

    Ok(spec)
}

fn compile_field(schema: &Value, path: &str) -> Result<FieldSpec, ContractError> {
    let obj = schema.as_object().ok_or_else(|| ContractError::Invalid {
        path: path.to_string(),
        reason: "property schema must be an object".into(),
    })?;

    let ty = match obj.get("type") {
        None => FieldType::Any,
        Some(Value::String(t)) => FieldType::parse(t).ok_or_else(|| ContractError::UnsupportedType {
            path: path.to_string(),
            ty: t.clone(),
        })?,
        Some(other) => {
            return Err(ContractError::UnsupportedType {
                path: path.to_string(),
                ty: other.to_string(),
            });
        }
    };

    let number = |key: &str| obj.get(key).and_then(Value::as_f64);
    let length = |key: &str| obj.get(key).and_then(Value::as_u64).map(|n| n as usize);

    let allowed = match obj.get("enum") {
        None => None,
        Some(Value::Array(values)) if !values.is_empty() => Some(values.clone()),
        Some(_) => {
            return Err(ContractError::Invalid {
                path: path.to_string(),
                reason: "'enum' must be a non-empty array".into(),
            });
        }
    };

    let items = match (ty, obj.get("items")) {
        (FieldType::Array, Some(items)) => Some(Box::new(compile_field(items, &format!("{path}[]"))?)),
        _ => None,
    };

    let object = match ty {
        FieldType::Object if obj.contains_key("properties") => Some(compile_object(obj, path)?),
        _ => None,
    };

    let spec = FieldSpec {
        ty,
        allowed,
        default: obj.get("default").cloned(),
        uuid: obj.get("format").and_then(Value::as_str) == Some("uuid"),
        minimum: number("minimum"),
        maximum: number("maximum"),
        min_length: length("minLength"),
        max_length: length("maxLength"),
        items,
        object,
    };

    if let Some(default) = &spec.default
        && let Err(v) = check_value(&spec, &mut default.clone(), path)
    {
        return Err(ContractError::Invalid {
            path: path.to_string(),
            reason: format!("default does not satisfy the field: {}", v.reason),
        });
    }

    Ok(spec)
}

fn validate_object(
    spec: &ObjectSpec,
    args: &mut Map<String, Value>,
    path: &str,
) -> Result<(), ArgumentViolation> {
    for name in &spec.required {
        match args.get(name) {
            None | Some(Value::Null) => {
                return Err(ArgumentViolation::new(join(path, name), "required"));
            }
            Some(_) => {}
        }
    }

    for (name, field) in &spec.properties {
        let present = args.get(name).is_some_and(|v| !v.is_null());
        if !present {
            match &field.default {
                Some(default) => {
                    args.insert(name.clone(), default.clone());
                }
                None => {
                    args.remove(name);
                }
            }
            continue;
        }
        if let Some(value) = args.get_mut(name) {
            check_value(field, value, &join(path, name))?;
        }
    }
    Ok(())
}

fn check_value(spec: &FieldSpec, value: &mut Value, path: &str) -> Result<(), ArgumentViolation> {
    if !spec.ty.matches(value) {
        return Err(ArgumentViolation::new(
            path,
            format!("expected {}", spec.ty.name()),
        ));
    }

    if let Some(allowed) = &spec.allowed
        && !allowed.contains(value)
    {
        let options: Vec<String> = allowed.iter().map(Value::to_string).collect();
        return Err(ArgumentViolation::new(
            path,
            format!("must be one of {}", options.join(", ")),
        ));
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = spec.minimum
            && n < min
        {
            return Err(ArgumentViolation::new(path, format!("must be >= {min}")));
        }
        if let Some(max) = spec.maximum
            && n > max
        {
            return Err(ArgumentViolation::new(path, format!("must be <= {max}")));
        }
    }

    match value {
        Value::String(s) => {
            let len = s.chars().count();
            if let Some(min) = spec.min_length
                && len < min
            {
                let reason = if min == 1 {
                    "must not be empty".to_string()
                } else {
                    format!("must be at least {min} characters")
                };
                return Err(ArgumentViolation::new(path, reason));
            }
            if let Some(max) = spec.max_length
                && len > max
            {
                return Err(ArgumentViolation::new(
                    path,
                    format!("must be at most {max} characters"),
                ));
            }
            if spec.uuid && Uuid::parse_str(s).is_err() {
                return Err(ArgumentViolation::new(path, "must be a valid UUID"));
            }
        }
        Value::Array(elements) => {
            if let Some(items) = &spec.items {
                for (i, element) in elements.iter_mut().enumerate() {
                    check_value(items, element, &format!("{path}[{i}]"))?;
                }
            }
        }
        Value::Object(map) => {
            if let Some(object) = &spec.object {
                validate_object(object, map, path)?;
            }
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn upload_contract() -> ArgumentContract {
        ArgumentContract::from_schema(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "minLength": 1},
                "owner_id": {"type": "string", "format": "uuid"},
                "format": {"type": "string", "enum": ["url", "base64"], "default": "base64"},
                "limit": {"type": "integer", "minimum": 1, "maximum": 100},
                "tags": {"type": "array", "items": {"type": "string"}},
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"name": {"type": "string"}},
                        "required": ["name"]
                    }
                }
            },
            "required": ["name"]
        }))
        .unwrap()
    }

    #[test]
    fn absent_arguments_treated_as_empty_object() {
        let c = ArgumentContract::any();
        assert!(c.validate(None).unwrap().is_empty());
    }

    #[test]
    fn non_object_arguments_rejected() {
        let err = upload_contract().validate(Some(json!([1]))).unwrap_err();
        assert_eq!(err.field, "arguments");
    }

    #[test]
    fn missing_required_field_named() {
        let err = upload_contract().validate(Some(json!({}))).unwrap_err();
        assert_eq!(err, ArgumentViolation::new("name", "required"));

        let err = upload_contract().validate(Some(json!({"name": null}))).unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn wrong_type_named() {
        let err = upload_contract().validate(Some(json!({"name": 5}))).unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.reason, "expected string");
    }

    #[test]
    fn defaults_filled_and_unknown_fields_kept() {
        let args = upload_contract()
            .validate(Some(json!({"name": "a", "extra": true})))
            .unwrap();
        assert_eq!(args["format"], "base64");
        assert_eq!(args["extra"], true);
        assert!(!args.contains_key("limit"));
    }

    #[test]
    fn enum_and_bounds_enforced() {
        let c = upload_contract();
        assert_eq!(
            c.validate(Some(json!({"name": "a", "format": "ftp"}))).unwrap_err().field,
            "format"
        );
        assert_eq!(
            c.validate(Some(json!({"name": "a", "limit": 0}))).unwrap_err().reason,
            "must be >= 1"
        );
        assert!(c.validate(Some(json!({"name": "a", "limit": 1.5}))).is_err());
        assert!(c.validate(Some(json!({"name": "a", "limit": 100}))).is_ok());
    }

    #[test]
    fn uuid_format_and_min_length() {
        let c = upload_contract();
        let err = c
            .validate(Some(json!({"name": "a", "owner_id": "nope"})))
            .unwrap_err();
        assert_eq!(err.field, "owner_id");
        let err = c.validate(Some(json!({"name": ""}))).unwrap_err();
        assert_eq!(err.reason, "must not be empty");
    }

    #[test]
    fn nested_paths_are_reported() {
        let c = upload_contract();
        let err = c
            .validate(Some(json!({"name": "a", "tags": ["x", 2]})))
            .unwrap_err();
        assert_eq!(err.field, "tags[1]");

        let err = c
            .validate(Some(json!({"name": "a", "items": [{"name": "x"}, {"name": "y"}, {}]})))
            .unwrap_err();
        assert_eq!(err.field, "items[2].name");
    }

    #[test]
    fn violation_nests_under_parent() {
        let v = ArgumentViolation::new("name", "required").within("items[2]");
        assert_eq!(v.field, "items[2].name");
        let err: ExchangeError = v.into();
        assert_eq!(err.field.as_deref(), Some("items[2].name"));
    }

    #[test]
    fn invalid_schemas_rejected() {
        assert_eq!(
            ArgumentContract::from_schema(json!("string")).unwrap_err(),
            ContractError::RootNotObject
        );
        assert!(matches!(
            ArgumentContract::from_schema(json!({"properties": {"a": {"type": "date"}}})),
            Err(ContractError::UnsupportedType { .. })
        ));
        assert_eq!(
            ArgumentContract::from_schema(json!({"properties": {}, "required": ["a"]}))
                .unwrap_err(),
            ContractError::UndeclaredRequired("a".into())
        );
        assert!(matches!(
            ArgumentContract::from_schema(json!({
                "properties": {"f": {"type": "string", "enum": ["a"], "default": "b"}}
            })),
            Err(ContractError::Invalid { .. })
        ));
    }
}
