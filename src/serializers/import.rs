//! Shared helpers for keyvalue-based importers.
//!
//! Each helper reads or writes exactly one attribute and reports success as a
//! bool; callers decide whether a failed attribute fails the surrounding
//! element.

use std::io::{Error as IoError, Write};

use crate::{
    AttributeFlags, Element,
    keyvalues::{KeyValues, KeyValuesWriter},
};

pub(crate) fn add_bool_attribute(element: &mut Element, keyvalues: &KeyValues, key: &str, default: Option<bool>) -> bool {
    add_bool_attribute_flags(element, keyvalues, key, AttributeFlags::default(), default)
}

pub(crate) fn add_bool_attribute_flags(element: &mut Element, keyvalues: &KeyValues, key: &str, flags: AttributeFlags, default: Option<bool>) -> bool {
    let value = match keyvalues.get(key) {
        Some(text) => match text.trim().parse::<i32>() {
            Ok(parsed) => parsed != 0,
            Err(_) => return false,
        },
        None => match default {
            Some(default) => default,
            None => return false,
        },
    };

    element.set_value(key.to_string(), value);
    if !flags.is_empty() {
        element.add_attribute_flags(key, flags);
    }
    true
}

pub(crate) fn add_int_attribute(element: &mut Element, keyvalues: &KeyValues, key: &str, default: Option<i32>) -> bool {
    add_int_attribute_flags(element, keyvalues, key, AttributeFlags::default(), default)
}

pub(crate) fn add_int_attribute_flags(element: &mut Element, keyvalues: &KeyValues, key: &str, flags: AttributeFlags, default: Option<i32>) -> bool {
    let value = match keyvalues.get(key) {
        Some(text) => match text.trim().parse::<i32>() {
            Ok(parsed) => parsed,
            Err(_) => return false,
        },
        None => match default {
            Some(default) => default,
            None => return false,
        },
    };

    element.set_value(key.to_string(), value);
    if !flags.is_empty() {
        element.add_attribute_flags(key, flags);
    }
    true
}

pub(crate) fn add_float_attribute_flags(element: &mut Element, keyvalues: &KeyValues, key: &str, flags: AttributeFlags, default: Option<f32>) -> bool {
    let value = match keyvalues.get(key) {
        Some(text) => match text.trim().parse::<f32>() {
            Ok(parsed) => parsed,
            Err(_) => return false,
        },
        None => match default {
            Some(default) => default,
            None => return false,
        },
    };

    element.set_value(key.to_string(), value);
    if !flags.is_empty() {
        element.add_attribute_flags(key, flags);
    }
    true
}

pub(crate) fn add_string_attribute(element: &mut Element, keyvalues: &KeyValues, key: &str, default: Option<&str>) -> bool {
    add_string_attribute_flags(element, keyvalues, key, AttributeFlags::default(), default)
}

/// A field that is present but empty is omitted, not stored as an empty
/// string.
pub(crate) fn add_string_attribute_flags(element: &mut Element, keyvalues: &KeyValues, key: &str, flags: AttributeFlags, default: Option<&str>) -> bool {
    let value = match keyvalues.get(key) {
        Some(text) if !text.is_empty() => text.to_string(),
        Some(_) => return false,
        None => match default {
            Some(default) => default.to_string(),
            None => return false,
        },
    };

    element.set_value(key.to_string(), value);
    if !flags.is_empty() {
        element.add_attribute_flags(key, flags);
    }
    true
}

pub(crate) fn print_bool_attribute<T: Write>(element: &Element, writer: &mut KeyValuesWriter<T>, key: &str) -> Result<(), IoError> {
    if let Some(value) = element.get_value::<bool>(key) {
        writer.keyvalue(key, if *value { "1" } else { "0" })?;
    }
    Ok(())
}

pub(crate) fn print_int_attribute<T: Write>(element: &Element, writer: &mut KeyValuesWriter<T>, key: &str) -> Result<(), IoError> {
    if let Some(value) = element.get_value::<i32>(key) {
        writer.keyvalue(key, &value.to_string())?;
    }
    Ok(())
}

pub(crate) fn print_string_attribute<T: Write>(element: &Element, writer: &mut KeyValuesWriter<T>, key: &str) -> Result<(), IoError> {
    if let Some(value) = element.get_value::<String>(key) {
        writer.keyvalue(key, &value)?;
    }
    Ok(())
}
