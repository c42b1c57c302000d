use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 1800;

/// Currency display: fixed '₹' glyph, two fraction digits rounded
/// half-away-from-zero, en-IN digit grouping. The glyph sits before the sign,
/// matching the original dashboard's `'₹' + toLocaleString('en-IN')`.
pub fn format_inr(amount: f64) -> String {
    let value = round2(amount);
    let negative = value.is_sign_negative() && !value.is_zero();
    let text = format!("{:.2}", value.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!(
        "₹{}{}.{}",
        if negative { "-" } else { "" },
        group_indian(int_part),
        frac_part
    )
}

/// Two fixed fraction digits, half-away-from-zero, no grouping. Used for the
/// price cells of the quote table.
pub fn fixed2(amount: f64) -> String {
    format!("{:.2}", round2(amount))
}

/// Plain count with Indian grouping (volume column).
pub fn format_count(count: u64) -> String {
    group_indian(&count.to_string())
}

fn round2(amount: f64) -> Decimal {
    Decimal::from_f64(amount)
        .unwrap_or_default()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Indian grouping: rightmost group of three, then groups of two.
fn group_indian(digits: &str) -> String {
    let len = digits.len();
    if len <= 3 {
        return digits.to_string();
    }

    let mut groups = vec![digits[len - 3..].to_string()];
    let mut rest = &digits[..len - 3];
    while rest.len() > 2 {
        let split = rest.len() - 2;
        groups.push(rest[split..].to_string());
        rest = &rest[..split];
    }
    groups.push(rest.to_string());
    groups.reverse();
    groups.join(",")
}

/// Wall-clock in Indian Standard Time for the dashboard header.
pub fn ist_clock(now: DateTime<Utc>) -> String {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECONDS).unwrap();
    now.with_timezone(&ist).format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_indian_grouping() {
        assert_eq!(format_inr(1234567.5), "₹12,34,567.50");
        assert_eq!(format_inr(1000000.0), "₹10,00,000.00");
        assert_eq!(format_inr(100000.0), "₹1,00,000.00");
        assert_eq!(format_inr(1000.0), "₹1,000.00");
        assert_eq!(format_inr(100.0), "₹100.00");
        assert_eq!(format_inr(0.0), "₹0.00");
    }

    #[test]
    fn negative_amounts_keep_glyph_first() {
        assert_eq!(format_inr(-1234.0), "₹-1,234.00");
        assert_eq!(format_inr(-0.004), "₹0.00");
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(format_inr(0.125), "₹0.13");
        assert_eq!(format_inr(-0.125), "₹-0.13");
        assert_eq!(fixed2(2412.375), "2412.38");
    }

    #[test]
    fn counts_group_like_currency() {
        assert_eq!(format_count(48213), "48,213");
        assert_eq!(format_count(4821300), "48,21,300");
        assert_eq!(format_count(999), "999");
    }

    #[test]
    fn ist_clock_offsets_utc() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(ist_clock(now), "15:30:00");
    }
}
