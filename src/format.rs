//! Display helpers using the Indian numbering system (lakh = 10^5, crore = 10^7).

const LAKH: f64 = 100_000.0;
const CRORE: f64 = 10_000_000.0;

/// Compact rupee display: crores and lakhs get two decimals, smaller amounts are
/// grouped (`₹12,345`).
pub fn format_currency(amount: f64) -> String {
    if amount == 0.0 || !amount.is_finite() {
        return "₹0".to_string();
    }
    if amount >= CRORE {
        return format!("₹{:.2} Cr", amount / CRORE);
    }
    if amount >= LAKH {
        return format!("₹{:.2} L", amount / LAKH);
    }

    let whole = amount.round() as i64;
    let sign = if whole < 0 { "-" } else { "" };
    format!("₹{sign}{}", group_indian(&whole.unsigned_abs().to_string()))
}

pub fn format_number_with_commas(number: f64) -> String {
    if number == 0.0 || !number.is_finite() {
        return "0".to_string();
    }

    let text = number.to_string();
    let (integer_part, decimal_part) = match text.split_once('.') {
        Some((int, dec)) => (int, Some(dec)),
        None => (text.as_str(), None),
    };
    let (sign, digits) = match integer_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer_part),
    };

    let mut out = format!("{sign}{}", group_indian(digits));
    if let Some(dec) = decimal_part {
        out.push('.');
        out.push_str(dec);
    }
    out
}

pub fn amount_in_words(amount: f64) -> String {
    if amount == 0.0 || !amount.is_finite() {
        return String::new();
    }
    if amount >= CRORE {
        let crores = format!("{:.1}", amount / CRORE);
        let plural = if crores == "1.0" { "" } else { "s" };
        return format!("{crores} Crore{plural}");
    }
    if amount >= LAKH {
        let lakhs = format!("{:.1}", amount / LAKH);
        let plural = if lakhs == "1.0" { "" } else { "s" };
        return format!("{lakhs} Lakh{plural}");
    }
    if amount >= 1_000.0 {
        return format!("{:.1} Thousand", amount / 1_000.0);
    }
    amount.to_string()
}

/// Groups a plain digit string as `xx,xx,xxx`.
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, last_three) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{last_three}", groups.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_uses_crore_and_lakh_suffixes() {
        assert_eq!(format_currency(25_000_000.0), "₹2.50 Cr");
        assert_eq!(format_currency(1_234_567.0), "₹12.35 L");
        assert_eq!(format_currency(100_000.0), "₹1.00 L");
    }

    #[test]
    fn currency_groups_small_amounts() {
        assert_eq!(format_currency(12_345.0), "₹12,345");
        assert_eq!(format_currency(999.4), "₹999");
        assert_eq!(format_currency(-12_345.0), "₹-12,345");
        assert_eq!(format_currency(-2_500_000.0), "₹-25,00,000");
        assert_eq!(format_currency(0.0), "₹0");
        assert_eq!(format_currency(f64::NAN), "₹0");
    }

    #[test]
    fn numbers_keep_decimals_and_sign() {
        assert_eq!(format_number_with_commas(12_345_678.5), "1,23,45,678.5");
        assert_eq!(format_number_with_commas(-1_000.0), "-1,000");
        assert_eq!(format_number_with_commas(100.0), "100");
        assert_eq!(format_number_with_commas(0.0), "0");
    }

    #[test]
    fn words_pluralise_above_one() {
        assert_eq!(amount_in_words(10_000_000.0), "1.0 Crore");
        assert_eq!(amount_in_words(25_000_000.0), "2.5 Crores");
        assert_eq!(amount_in_words(100_000.0), "1.0 Lakh");
        assert_eq!(amount_in_words(150_000.0), "1.5 Lakhs");
        assert_eq!(amount_in_words(2_500.0), "2.5 Thousand");
        assert_eq!(amount_in_words(999.0), "999");
        assert_eq!(amount_in_words(0.0), "");
    }

    #[test]
    fn grouping_handles_odd_lengths() {
        assert_eq!(group_indian("1234"), "1,234");
        assert_eq!(group_indian("123456"), "1,23,456");
        assert_eq!(group_indian("1234567"), "12,34,567");
        assert_eq!(group_indian("12"), "12");
    }
}
