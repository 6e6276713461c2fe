//! Tolerant price parsing

/// Parse a raw price cell into a non-negative amount.
///
/// Accepts plain decimals plus common export noise (currency symbols,
/// thousands separators, surrounding whitespace). Unparsable input and
/// negative amounts default to 0.
pub fn parse_price(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    if let Ok(value) = trimmed.parse::<f64>() {
        return sanitize(value);
    }

    // Strip everything that is not a digit, decimal point or leading minus
    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    cleaned.parse::<f64>().map(sanitize).unwrap_or(0.0)
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_decimals_parse() {
        assert_eq!(parse_price("5.99"), 5.99);
        assert_eq!(parse_price(" 12 "), 12.0);
        assert_eq!(parse_price("0"), 0.0);
    }

    #[test]
    fn currency_noise_is_stripped() {
        assert_eq!(parse_price("$5.99"), 5.99);
        assert_eq!(parse_price("EUR 1,299.00"), 1299.0);
        assert_eq!(parse_price("£7.50"), 7.5);
    }

    #[test]
    fn unparsable_defaults_to_zero() {
        assert_eq!(parse_price(""), 0.0);
        assert_eq!(parse_price("free"), 0.0);
        assert_eq!(parse_price("n/a"), 0.0);
    }

    #[test]
    fn negative_amounts_clamp_to_zero() {
        assert_eq!(parse_price("-3.00"), 0.0);
    }
}
