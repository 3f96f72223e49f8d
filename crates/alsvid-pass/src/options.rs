//! Typed pass options with validation and defaults.
//!
//! Every pass declares its options up front: name, documentation, kind and
//! hardcoded default. Values can then be (re)configured until the pass is
//! constructed, at which point the set freezes. JSON values map onto
//! options directly; JSON `null` resets an option to its default.

use serde_json::Value;
use std::fmt;

use crate::error::{PassError, PassResult};

/// An option value: boolean, integer or string.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A string (also used for enumerated options).
    Str(String),
}

impl OptionValue {
    /// The boolean value; `false` for non-boolean options.
    pub fn as_bool(&self) -> bool {
        matches!(self, OptionValue::Bool(true))
    }

    /// The integer value; -1 for non-integer options.
    pub fn as_int(&self) -> i64 {
        match self {
            OptionValue::Int(i) => *i,
            _ => -1,
        }
    }

    /// The string value; empty for non-string options.
    pub fn as_str(&self) -> &str {
        match self {
            OptionValue::Str(s) => s,
            _ => "",
        }
    }

    /// Convert a JSON value; `None` stands for JSON `null` (reset to the
    /// hardcoded default). Only booleans, integers and strings are
    /// accepted.
    pub fn from_json(option: &str, value: &Value) -> PassResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(OptionValue::Bool(*b))),
            Value::Number(n) => n.as_i64().map(|i| Some(OptionValue::Int(i))).ok_or_else(|| {
                PassError::OptionValueInvalid {
                    option: option.into(),
                    reason: format!("{n} is not an integer"),
                }
            }),
            Value::String(s) => Ok(Some(OptionValue::Str(s.clone()))),
            _ => Err(PassError::OptionValueInvalid {
                option: option.into(),
                reason: "value must be a boolean, integer, string, or null".into(),
            }),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            OptionValue::Int(i) => write!(f, "{i}"),
            OptionValue::Str(s) => write!(f, "{s}"),
        }
    }
}

/// What values an option accepts.
#[derive(Debug, Clone)]
enum OptionKind {
    Bool,
    Int { min: i64, max: i64 },
    Str,
    Enum(Vec<String>),
}

#[derive(Debug, Clone)]
struct OptionSlot {
    name: String,
    description: String,
    kind: OptionKind,
    default: OptionValue,
    value: Option<OptionValue>,
}

impl OptionSlot {
    fn validate(&self, value: &OptionValue) -> PassResult<()> {
        let invalid = |reason: String| PassError::OptionValueInvalid {
            option: self.name.clone(),
            reason,
        };
        match (&self.kind, value) {
            (OptionKind::Bool, OptionValue::Bool(_)) => Ok(()),
            (OptionKind::Int { min, max }, OptionValue::Int(i)) => {
                if i < min || i > max {
                    Err(invalid(format!("{i} not in {min}..={max}")))
                } else {
                    Ok(())
                }
            }
            (OptionKind::Str, OptionValue::Str(_)) => Ok(()),
            (OptionKind::Enum(values), OptionValue::Str(s)) => {
                if values.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(invalid(format!(
                        "'{s}' is not one of {}",
                        values.join(", ")
                    )))
                }
            }
            (kind, value) => Err(invalid(format!("{value} does not fit a {kind:?} option"))),
        }
    }
}

/// The ordered option set of one pass.
#[derive(Debug, Clone, Default)]
pub struct Options {
    slots: Vec<OptionSlot>,
    frozen: bool,
}

impl Options {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    fn add(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        kind: OptionKind,
        default: OptionValue,
    ) {
        let name = name.into();
        debug_assert!(
            !self.slots.iter().any(|s| s.name == name),
            "duplicate option '{name}'"
        );
        self.slots.push(OptionSlot {
            name,
            description: description.into(),
            kind,
            default,
            value: None,
        });
    }

    /// Declare a boolean option.
    pub fn add_bool(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        default: bool,
    ) {
        self.add(name, description, OptionKind::Bool, OptionValue::Bool(default));
    }

    /// Declare a bounded integer option.
    pub fn add_int(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        default: i64,
        min: i64,
        max: i64,
    ) {
        self.add(
            name,
            description,
            OptionKind::Int { min, max },
            OptionValue::Int(default),
        );
    }

    /// Declare a free-form string option.
    pub fn add_str(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<String>,
    ) {
        self.add(name, description, OptionKind::Str, OptionValue::Str(default.into()));
    }

    /// Declare an enumerated option. The default must be one of the
    /// values.
    pub fn add_enum(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        default: &str,
        values: &[&str],
    ) {
        debug_assert!(values.contains(&default));
        self.add(
            name,
            description,
            OptionKind::Enum(values.iter().map(ToString::to_string).collect()),
            OptionValue::Str(default.into()),
        );
    }

    fn slot(&self, name: &str) -> Option<&OptionSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut OptionSlot> {
        self.slots.iter_mut().find(|s| s.name == name)
    }

    /// Whether an option with this name is declared.
    pub fn has_option(&self, name: &str) -> bool {
        self.slot(name).is_some()
    }

    /// Whether the option was explicitly configured.
    pub fn is_set(&self, name: &str) -> bool {
        self.slot(name).is_some_and(|s| s.value.is_some())
    }

    /// Whether the set is frozen (the owning pass was constructed).
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// The current value: the configured one, or the hardcoded default.
    pub fn get(&self, name: &str) -> PassResult<&OptionValue> {
        let slot = self
            .slot(name)
            .ok_or_else(|| PassError::OptionPathNotFound { path: name.into() })?;
        Ok(slot.value.as_ref().unwrap_or(&slot.default))
    }

    /// Configure an option. Fails on unknown names, invalid values, and
    /// after the set was frozen.
    pub fn set(&mut self, name: &str, value: OptionValue) -> PassResult<()> {
        if self.frozen {
            return Err(PassError::OptionsFrozen {
                option: name.into(),
            });
        }
        let slot = self
            .slot(name)
            .ok_or_else(|| PassError::OptionPathNotFound { path: name.into() })?;
        slot.validate(&value)?;
        // Re-borrow mutably; the immutable probe above kept validation
        // separate from mutation.
        self.slot_mut(name).expect("checked above").value = Some(value);
        Ok(())
    }

    /// Reset an option to its hardcoded default.
    pub fn reset(&mut self, name: &str) -> PassResult<()> {
        if self.frozen {
            return Err(PassError::OptionsFrozen {
                option: name.into(),
            });
        }
        let slot = self
            .slot_mut(name)
            .ok_or_else(|| PassError::OptionPathNotFound { path: name.into() })?;
        slot.value = None;
        Ok(())
    }

    /// Configure from a JSON value; `null` resets to the default.
    pub fn set_from_json(&mut self, name: &str, value: &Value) -> PassResult<()> {
        match OptionValue::from_json(name, value)? {
            Some(v) => self.set(name, v),
            None => self.reset(name),
        }
    }

    /// Freeze the set; subsequent `set`/`reset` calls fail.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Iterate `(name, value, is_set)` over the declared options.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue, bool)> {
        self.slots.iter().map(|s| {
            (
                s.name.as_str(),
                s.value.as_ref().unwrap_or(&s.default),
                s.value.is_some(),
            )
        })
    }

    /// Write a help blurb for every declared option.
    pub fn dump_help(&self, w: &mut impl fmt::Write, prefix: &str) -> fmt::Result {
        for s in &self.slots {
            let kind = match &s.kind {
                OptionKind::Bool => "yes or no".to_string(),
                OptionKind::Int { min, max } => format!("integer in {min}..={max}"),
                OptionKind::Str => "any string".to_string(),
                OptionKind::Enum(values) => format!("one of {}", values.join(", ")),
            };
            writeln!(
                w,
                "{prefix}{}: {} (must be {kind}, default {}){}",
                s.name,
                s.description,
                s.default,
                match &s.value {
                    Some(v) => format!(", currently {v}"),
                    None => String::new(),
                },
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Options {
        let mut o = Options::new();
        o.add_bool("verbose", "extra logging", false);
        o.add_int("limit", "search bound", 10, 0, 100);
        o.add_enum("mode", "operating mode", "fast", &["fast", "thorough"]);
        o
    }

    #[test]
    fn test_defaults_until_set() {
        let mut o = sample();
        assert!(!o.get("verbose").unwrap().as_bool());
        assert!(!o.is_set("verbose"));
        o.set("verbose", OptionValue::Bool(true)).unwrap();
        assert!(o.get("verbose").unwrap().as_bool());
        assert!(o.is_set("verbose"));
    }

    #[test]
    fn test_validation() {
        let mut o = sample();
        let err = o.set("limit", OptionValue::Int(1000)).unwrap_err();
        assert!(matches!(err, PassError::OptionValueInvalid { .. }));
        let err = o
            .set("mode", OptionValue::Str("slow".into()))
            .unwrap_err();
        assert!(matches!(err, PassError::OptionValueInvalid { .. }));
        let err = o.set("verbose", OptionValue::Int(1)).unwrap_err();
        assert!(matches!(err, PassError::OptionValueInvalid { .. }));
    }

    #[test]
    fn test_unknown_option() {
        let mut o = sample();
        let err = o.set("nope", OptionValue::Bool(true)).unwrap_err();
        assert!(matches!(err, PassError::OptionPathNotFound { .. }));
    }

    #[test]
    fn test_freeze() {
        let mut o = sample();
        o.freeze();
        let err = o.set("verbose", OptionValue::Bool(true)).unwrap_err();
        assert!(matches!(err, PassError::OptionsFrozen { .. }));
    }

    #[test]
    fn prop_int_validation_matches_bounds() {
        use proptest::prelude::*;

        proptest!(|(value in -200i64..200)| {
            let mut o = sample();
            let result = o.set("limit", OptionValue::Int(value));
            prop_assert_eq!(result.is_ok(), (0..=100).contains(&value));
        });
    }

    #[test]
    fn test_json_null_resets() {
        let mut o = sample();
        o.set_from_json("limit", &json!(42)).unwrap();
        assert_eq!(o.get("limit").unwrap().as_int(), 42);
        o.set_from_json("limit", &json!(null)).unwrap();
        assert!(!o.is_set("limit"));
        assert_eq!(o.get("limit").unwrap().as_int(), 10);
        let err = o.set_from_json("limit", &json!(1.5)).unwrap_err();
        assert!(matches!(err, PassError::OptionValueInvalid { .. }));
    }
}
