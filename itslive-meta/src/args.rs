//! Value parsers for arguments as HyP3 passes them.
//!
//! The job runner renders unset optional parameters as the literal text
//! `None` (or an empty string), so both mean "not set" here.

/// Optional string argument; `None`/blank parse to unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NullableString(pub Option<String>);

/// Optional non-negative index; `None`/blank parse to unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullableIndex(pub Option<usize>);

fn strip_none(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed == "None" {
        ""
    } else {
        trimmed
    }
}

pub fn nullable_string(raw: &str) -> Result<NullableString, String> {
    let value = strip_none(raw);
    Ok(NullableString((!value.is_empty()).then(|| value.to_string())))
}

pub fn nullable_index(raw: &str) -> Result<NullableIndex, String> {
    let value = strip_none(raw);
    if value.is_empty() {
        return Ok(NullableIndex(None));
    }
    value
        .parse::<usize>()
        .map(|idx| NullableIndex(Some(idx)))
        .map_err(|e| format!("expected a non-negative index or None, got {raw:?}: {e}"))
}

pub fn string_is_true(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" | "" | "none" => Ok(false),
        other => Err(format!("expected a boolean, got {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_and_blank_strings_are_unset() {
        assert_eq!(nullable_string("None").unwrap(), NullableString(None));
        assert_eq!(nullable_string("  ").unwrap(), NullableString(None));
        assert_eq!(
            nullable_string(" its-live-pub ").unwrap(),
            NullableString(Some("its-live-pub".into()))
        );
    }

    #[test]
    fn indices_accept_none() {
        assert_eq!(nullable_index("None").unwrap(), NullableIndex(None));
        assert_eq!(nullable_index("").unwrap(), NullableIndex(None));
        assert_eq!(nullable_index("42").unwrap(), NullableIndex(Some(42)));
        assert!(nullable_index("-1").is_err());
        assert!(nullable_index("ten").is_err());
    }

    #[test]
    fn booleans_are_case_insensitive() {
        assert!(string_is_true("True").unwrap());
        assert!(string_is_true("YES").unwrap());
        assert!(!string_is_true("false").unwrap());
        assert!(!string_is_true("None").unwrap());
        assert!(string_is_true("maybe").is_err());
    }
}
