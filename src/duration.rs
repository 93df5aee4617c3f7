// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Format a duration in seconds as zero-padded `HH:MM:SS`
///
/// Hours are not wrapped, so durations of 100 hours or more widen the hour field.
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Parse an `HH:MM:SS` string back into seconds
///
/// Minutes and seconds must be below 60.
pub fn parse_duration(value: &str) -> Option<u64> {
    let mut parts = value.split(':');
    let hours: u64 = parse_field(parts.next()?)?;
    let minutes: u64 = parse_field(parts.next()?)?;
    let seconds: u64 = parse_field(parts.next()?)?;

    if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
        return None;
    }

    hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)
}

fn parse_field(field: &str) -> Option<u64> {
    if field.len() < 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}
