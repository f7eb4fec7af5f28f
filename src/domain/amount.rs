use std::fmt;

/// Balances and prices are whole currency units (the upstream billing API
/// deals in integer prices), represented as signed 64-bit integers.
pub type Amount = i64;

/// Format an amount with thousands separators.
/// Example: 25000 -> "25,000", -1500 -> "-1,500"
pub fn format_amount(amount: Amount) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let digits = amount.abs().to_string();

    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}", sign, grouped)
}

/// Parse a user-supplied amount into whole currency units.
/// Accepts an optional sign and thousands separators: "25,000" -> 25000.
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches(['-', '+']);

    if input.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }

    let digits: String = input.chars().filter(|c| *c != ',').collect();
    let value: i64 = digits
        .parse()
        .map_err(|_| ParseAmountError::InvalidFormat)?;

    Ok(if negative { -value } else { value })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid amount format"),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1000), "1,000");
        assert_eq!(format_amount(25000), "25,000");
        assert_eq!(format_amount(1234567), "1,234,567");
        assert_eq!(format_amount(-1500), "-1,500");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("25000"), Ok(25000));
        assert_eq!(parse_amount("25,000"), Ok(25000));
        assert_eq!(parse_amount(" 100 "), Ok(100));
        assert_eq!(parse_amount("-1,500"), Ok(-1500));
        assert_eq!(parse_amount("+42"), Ok(42));
        assert_eq!(parse_amount("0"), Ok(0));
    }

    #[test]
    fn test_parse_amount_invalid() {
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("12.5").is_err());
        assert!(parse_amount("").is_err());
        assert!(parse_amount("-").is_err());
    }
}
