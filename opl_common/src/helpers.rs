use std::{fmt::Display, str::FromStr};

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parses `value` and checks that it lies within `min..=max`.
///
/// The error string is suitable for logging next to the name of the variable that was being read.
pub fn parse_bounded<T>(value: &str, min: T, max: T) -> Result<T, String>
where
    T: FromStr + PartialOrd + Display + Copy,
    T::Err: Display,
{
    let parsed = value.trim().parse::<T>().map_err(|e| format!("'{value}' is not a valid value. {e}"))?;
    if parsed < min || parsed > max {
        return Err(format!("{parsed} is out of range. It must be between {min} and {max}"));
    }
    Ok(parsed)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("YES".into()), false));
        assert!(parse_boolean_flag(Some(" 1 ".into()), false));
        assert!(!parse_boolean_flag(Some("off".into()), true));
        assert!(parse_boolean_flag(Some("maybe".into()), true));
        assert!(!parse_boolean_flag(None, false));
    }

    #[test]
    fn bounded_values() {
        assert_eq!(parse_bounded::<u32>("10", 1, 10), Ok(10));
        assert_eq!(parse_bounded::<f64>("0.25", 0.0, 1.0), Ok(0.25));
        assert!(parse_bounded::<u32>("11", 1, 10).is_err());
        assert!(parse_bounded::<u32>("ten", 1, 10).is_err());
        assert!(parse_bounded::<f64>("-0.1", 0.0, 1.0).is_err());
    }
}
