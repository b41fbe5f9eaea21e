//! Turns raw record fields into the strings written to the CSV.

/// Strips everything but digits and prefixes `+1` to 10-digit numbers.
/// Anything else passes through as the bare digit string.
pub fn format_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("+1{digits}")
    } else {
        digits
    }
}

pub fn join_list(items: &[String]) -> String {
    items.join(", ")
}
