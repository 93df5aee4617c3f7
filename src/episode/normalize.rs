// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::duration::format_duration;
use crate::error::NormalizeError;

use super::{Episode, RawDuration, RawEpisode};

/// Abbreviated pt-BR month names, January first
const PT_BR_MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Convert a backend record into a display-ready episode
///
/// Either every field converts or an error is returned; no partially filled
/// episode is ever produced.
pub fn normalize(raw: RawEpisode) -> Result<Episode, NormalizeError> {
    let published_at =
        format_published_at(&raw.published_at).map_err(|reason| NormalizeError::InvalidDate {
            id: raw.id.clone(),
            value: raw.published_at.clone(),
            reason,
        })?;

    let duration =
        coerce_duration(&raw.file.duration).ok_or_else(|| NormalizeError::InvalidDuration {
            id: raw.id.clone(),
            value: raw.file.duration.to_string(),
        })?;

    Ok(Episode {
        id: raw.id,
        title: raw.title,
        members: raw.members,
        thumbnail: raw.thumbnail,
        duration,
        duration_at_string: format_duration(duration),
        url: raw.file.url,
        published_at,
        description: raw.description,
    })
}

/// Format an ISO-8601 timestamp as a short pt-BR date (`d MMM yy`)
///
/// The calendar date is taken in UTC.
pub fn format_published_at(value: &str) -> Result<String, String> {
    let date = parse_publish_date(value.trim())?;
    let month = PT_BR_MONTHS[date.month0() as usize];

    Ok(format!("{} {} {}", date.day(), month, date.format("%y")))
}

fn parse_publish_date(value: &str) -> Result<NaiveDate, String> {
    let with_offset = match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => return Ok(dt.to_utc().date_naive()),
        Err(e) => e,
    };

    // Offset-less forms are read as UTC
    let naive_formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    for format in naive_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.date());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| with_offset.to_string())
}

/// Coerce the backend duration into whole seconds
///
/// Accepts decimal integers (surrounding whitespace allowed) and finite,
/// non-negative numbers without a fractional part. Returns `None` for
/// anything else, including the empty string.
pub fn coerce_duration(value: &RawDuration) -> Option<u64> {
    match value {
        RawDuration::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            text.parse::<u64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(whole_seconds))
        }
        RawDuration::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().and_then(whole_seconds)),
    }
}

fn whole_seconds(value: f64) -> Option<u64> {
    let whole = value.is_finite() && value >= 0.0 && value.fract() == 0.0;
    (whole && value < u64::MAX as f64).then_some(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::RawFile;

    fn make_raw(published_at: &str, duration: &str) -> RawEpisode {
        RawEpisode {
            id: "como-virar-lider-desenvolvendo".to_string(),
            title: "Como virar líder desenvolvendo".to_string(),
            members: "Diego Fernandes e Richard Nunes".to_string(),
            thumbnail: "https://example.com/lideranca.jpg".to_string(),
            published_at: published_at.to_string(),
            description: "<p>Líderes <strong>técnicos</strong> &amp; times</p>".to_string(),
            file: RawFile {
                url: "x".to_string(),
                duration: RawDuration::Text(duration.to_string()),
            },
        }
    }

    #[test]
    fn normalizes_reference_episode() {
        let episode = normalize(make_raw("2021-06-01T00:00:00.000Z", "725")).unwrap();

        assert_eq!(episode.duration, 725);
        assert_eq!(episode.duration_at_string, "00:12:05");
        assert_eq!(episode.published_at, "1 jun 21");
        assert_eq!(episode.url, "x");
        assert_eq!(episode.id, "como-virar-lider-desenvolvendo");
        assert_eq!(episode.members, "Diego Fernandes e Richard Nunes");
        assert_eq!(episode.thumbnail, "https://example.com/lideranca.jpg");
    }

    #[test]
    fn description_passes_through_verbatim() {
        let raw = make_raw("2021-06-01T00:00:00.000Z", "725");
        let expected = raw.description.clone();

        assert_eq!(normalize(raw).unwrap().description, expected);
    }

    #[test]
    fn normalize_is_deterministic() {
        let raw = make_raw("2021-01-22T11:11:12-03:00", "3981");

        let first = serde_json::to_vec(&normalize(raw.clone()).unwrap()).unwrap();
        let second = serde_json::to_vec(&normalize(raw).unwrap()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn serializes_with_display_field_names() {
        let episode = normalize(make_raw("2021-06-01T00:00:00.000Z", "725")).unwrap();
        let json = serde_json::to_value(&episode).unwrap();

        assert_eq!(json["durationAtString"], "00:12:05");
        assert_eq!(json["publishedAt"], "1 jun 21");
        assert_eq!(json["duration"], 725);
    }

    #[test]
    fn formats_every_month_in_portuguese() {
        let expected = [
            "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
        ];
        for (index, month) in expected.iter().enumerate() {
            let value = format!("2020-{:02}-15T12:00:00Z", index + 1);
            assert_eq!(format_published_at(&value).unwrap(), format!("15 {} 20", month));
        }
    }

    #[test]
    fn publish_date_is_taken_in_utc() {
        // 22:30 in São Paulo is already the next day in UTC
        assert_eq!(
            format_published_at("2021-01-22T22:30:00-03:00").unwrap(),
            "23 jan 21"
        );
    }

    #[test]
    fn accepts_offsetless_and_date_only_timestamps() {
        assert_eq!(format_published_at("2021-01-22 11:11:12").unwrap(), "22 jan 21");
        assert_eq!(format_published_at("2021-01-22T11:11:12").unwrap(), "22 jan 21");
        assert_eq!(format_published_at("2009-12-05").unwrap(), "5 dez 09");
    }

    #[test]
    fn rejects_unparseable_dates() {
        let err = normalize(make_raw("yesterday", "725")).unwrap_err();

        assert!(matches!(err, NormalizeError::InvalidDate { ref value, .. } if value == "yesterday"));
    }

    #[test]
    fn rejects_malformed_durations() {
        for bad in ["", "  ", "abc", "-5", "12.5", "NaN", "inf", "12:05"] {
            let err = normalize(make_raw("2021-06-01T00:00:00.000Z", bad)).unwrap_err();
            assert!(
                matches!(err, NormalizeError::InvalidDuration { .. }),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn coerces_numeric_variants() {
        let text = |s: &str| RawDuration::Text(s.to_string());
        let number = |s: &str| RawDuration::Number(serde_json::from_str(s).unwrap());

        assert_eq!(coerce_duration(&text(" 725 ")), Some(725));
        assert_eq!(coerce_duration(&text("725.0")), Some(725));
        assert_eq!(coerce_duration(&text("0")), Some(0));
        assert_eq!(coerce_duration(&number("3981")), Some(3981));
        assert_eq!(coerce_duration(&number("60.0")), Some(60));
        assert_eq!(coerce_duration(&number("-1")), None);
        assert_eq!(coerce_duration(&number("1.5")), None);
    }
}
