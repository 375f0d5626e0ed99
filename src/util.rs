//! Small display helpers shared across view composition.

/// Format a monetary amount as USD with thousands separators, e.g.
/// `1234.5 -> "$1,234.50"`. Negative amounts keep a leading minus sign.
pub fn fmt_currency(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-${}.{:02}", grouped, frac)
    } else {
        format!("${}.{:02}", grouped, frac)
    }
}

/// Format a plain count with thousands separators, e.g. `12000 -> "12,000"`.
pub fn fmt_count(count: u64) -> String {
    let digits = count.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_currency_groups_thousands() {
        assert_eq!(fmt_currency(1234.5), "$1,234.50");
        assert_eq!(fmt_currency(1_000_000.0), "$1,000,000.00");
        assert_eq!(fmt_currency(0.0), "$0.00");
        assert_eq!(fmt_currency(999.0), "$999.00");
    }

    #[test]
    fn test_fmt_currency_negative() {
        assert_eq!(fmt_currency(-1234.56), "-$1,234.56");
    }

    #[test]
    fn test_fmt_currency_rounds_cents() {
        assert_eq!(fmt_currency(10.005), "$10.01");
        assert_eq!(fmt_currency(10.004), "$10.00");
    }

    #[test]
    fn test_fmt_count() {
        assert_eq!(fmt_count(120), "120");
        assert_eq!(fmt_count(12_000), "12,000");
    }
}
