//! Timestamp normalization for analysis output.
//!
//! The analysis service reports every occurrence as an `H:MM:SS` string
//! (hours are not zero-padded beyond what the service emits, and seconds may
//! carry a fractional part). Cards only ever show whole seconds.

/// Convert an `HH:MM:SS` timestamp to whole seconds.
///
/// Returns `None` for a missing or empty timestamp, or when any component is
/// not a number or the total does not fit in a `u64`. A fractional seconds
/// component is truncated.
pub fn to_seconds(timestamp: Option<&str>) -> Option<u64> {
    let timestamp = timestamp.map(str::trim).filter(|s| !s.is_empty())?;

    let mut parts = timestamp.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    // "05.250" -> 5
    let whole_seconds: u64 = seconds.split('.').next()?.parse().ok()?;

    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(whole_seconds)
}
