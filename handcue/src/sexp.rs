//! Property-list helpers for the s-expression formats used by scenario
//! files, config overrides, status output, and trigger events.

use lexpr::Value;

/// Find the raw value that follows `:key` in a plist.
/// Handles both `Value::Keyword("key")` (elisp parser) and
/// `Value::Symbol(":key")` (default parser) forms.
pub fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            return match pair.cdr() {
                Value::Cons(next) => Some(next.car()),
                _ => None,
            };
        }
        current = pair.cdr();
    }
    None
}

/// Extract a keyword value from a plist as a string.
/// Keywords and symbols lose their leading colon; booleans and the empty
/// list render as `t`/`nil`.
pub fn get_keyword(value: &Value, key: &str) -> Option<String> {
    get_value(value, key).map(atom_string)
}

pub fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

pub fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Treats "nil" as false, anything else as true.
pub fn get_bool(value: &Value, key: &str) -> Option<bool> {
    get_keyword(value, key).map(|s| s != "nil")
}

pub fn get_string(value: &Value, key: &str) -> Option<String> {
    get_keyword(value, key)
}

/// Render a leaf value the way plist readers expect to compare it.
pub fn atom_string(val: &Value) -> String {
    match val {
        Value::Keyword(v) => v.to_string(),
        Value::Symbol(v) => {
            let s = v.to_string();
            s.strip_prefix(':').unwrap_or(&s).to_string()
        }
        Value::String(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => bool_sexp(*b).to_string(),
        Value::Null | Value::Nil => "nil".to_string(),
        _ => val.to_string(),
    }
}

/// Top-level elements of a proper or dotted list. Non-lists yield nothing.
pub fn list_items(value: &Value) -> Vec<&Value> {
    let mut out = Vec::new();
    let mut current = value;
    while let Value::Cons(pair) = current {
        out.push(pair.car());
        current = pair.cdr();
    }
    out
}

/// Keys of a plist in order, without the leading colon.
/// Returns `Err(index)` at the first position that is not a keyword.
pub fn plist_keys(value: &Value) -> Result<Vec<String>, usize> {
    let items = list_items(value);
    let mut keys = Vec::with_capacity(items.len() / 2);
    for (i, item) in items.iter().enumerate().step_by(2) {
        match item {
            Value::Keyword(k) => keys.push(k.to_string()),
            Value::Symbol(s) => match s.strip_prefix(':') {
                Some(k) => keys.push(k.to_string()),
                None => return Err(i),
            },
            _ => return Err(i),
        }
    }
    Ok(keys)
}

/// Escape a string for s-expression output.
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

pub fn quote(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

pub fn bool_sexp(b: bool) -> &'static str {
    if b {
        "t"
    } else {
        "nil"
    }
}

/// Format an event s-expression.
pub fn format_event(event_type: &str, fields: &[(&str, &str)]) -> String {
    let mut s = format!("(:type :event :event :{}", event_type);
    for (key, val) in fields {
        s.push_str(&format!(" :{} {}", key, val));
    }
    s.push(')');
    s
}
