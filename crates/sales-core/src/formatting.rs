//! Display helpers for amounts, quantities and period-over-period change.

/// Render `value` with `decimals` fraction digits and comma-grouped thousands.
///
/// Values that round to zero are printed without a sign.
///
/// ```
/// use sales_core::formatting::format_number;
///
/// assert_eq!(format_number(98765.4, 1), "98,765.4");
/// assert_eq!(format_number(2500000.0, 0), "2,500,000");
/// assert_eq!(format_number(-42.125, 2), "-42.13");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let scale = 10_f64.powi(decimals as i32);
    let magnitude = value.abs();
    // A few ULPs upward so 1.005 lands on 1.01 instead of 1.00.
    let scaled = (magnitude * scale * (1.0 + 4.0 * f64::EPSILON)).round();

    let text = format!("{:.*}", decimals as usize, scaled / scale);
    let (digits, fraction) = match text.split_once('.') {
        Some((digits, fraction)) => (digits, Some(fraction)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + text.len() / 3 + 1);
    if value < 0.0 && scaled != 0.0 {
        out.push('-');
    }
    out.push_str(&group_thousands(digits));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Dollar amount with cents, e.g. `"$1,230.00"` or `"-$9.99"`.
///
/// ```
/// use sales_core::formatting::format_currency;
///
/// assert_eq!(format_currency(350.0), "$350.00");
/// assert_eq!(format_currency(-9.99), "-$9.99");
/// ```
pub fn format_currency(amount: f64) -> String {
    let body = format_number(amount, 2);
    match body.strip_prefix('-') {
        Some(unsigned) => format!("-${unsigned}"),
        None => format!("${body}"),
    }
}

/// Quantities are usually whole units; only show decimals when present.
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        format_number(value, 0)
    } else {
        format_number(value, 2)
    }
}

/// Relative change from `first` to `second` in percent.
///
/// Returns `0.0` when `first` is zero. That value is a placeholder, not a
/// real percentage.
pub fn percentage_change(first: f64, second: f64) -> f64 {
    if first == 0.0 {
        return 0.0;
    }
    (second - first) / first * 100.0
}

/// Signed percentage with two decimals, e.g. `"+150.00%"`.
pub fn format_change(pct: f64) -> String {
    let body = format_number(pct, 2);
    if body.starts_with('-') {
        format!("{body}%")
    } else {
        format!("+{body}%")
    }
}

/// Comma every three digits, counted from the right.
fn group_thousands(digits: &str) -> String {
    let lead = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.char_indices() {
        if i > 0 && (i + 3 - lead) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
