use anyhow::{Context, Result};
use time::{
    Date, OffsetDateTime, UtcDateTime, format_description::well_known::Rfc3339,
    macros::format_description,
};
use url::Url;

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_timestamp(value: UtcDateTime) -> String {
    value
        .format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z"))
        .unwrap_or_default()
}

/// Format a date as `YYYY-MM-DD`.
pub fn format_date(value: Date) -> String {
    value.format(format_description!("[year]-[month]-[day]")).unwrap_or_default()
}

pub fn parse_timestamp(value: &str) -> Option<UtcDateTime> {
    OffsetDateTime::parse(value, &Rfc3339).ok().map(|v| v.to_utc())
}

/// Calendar-day prefix of an ISO-8601 timestamp.
pub fn date_key(timestamp: &str) -> &str { timestamp.split('T').next().unwrap_or(timestamp) }

/// Build `https://<host>/<segments...>`. The host may carry a path prefix
/// (GitHub Enterprise serves the API under `/api/v3`).
pub fn api_url(host: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(&format!("https://{}", host.trim_end_matches('/')))
        .with_context(|| format!("Invalid API host {host}"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("API host {host} cannot be a base"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use time::macros::{date, utc_datetime};

    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(utc_datetime!(2024-01-02 03:04:05.678)), "2024-01-02T03:04:05Z");
        assert_eq!(format_date(date!(2024-01-02)), "2024-01-02");
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            parse_timestamp("2024-01-02T03:04:05Z"),
            Some(utc_datetime!(2024-01-02 03:04:05))
        );
        assert_eq!(
            parse_timestamp("2024-01-02T05:04:05+02:00"),
            Some(utc_datetime!(2024-01-02 03:04:05))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_date_key() {
        assert_eq!(date_key("2024-01-02T03:04:05Z"), "2024-01-02");
        assert_eq!(date_key("2024-01-02"), "2024-01-02");
    }

    #[test]
    fn test_api_url() {
        let cases: &[(&str, &[&str], &str)] = &[
            (
                "api.github.com",
                &["repos", "acme", "widgets", "git", "trees", "abc123"],
                "https://api.github.com/repos/acme/widgets/git/trees/abc123",
            ),
            (
                "github.example.com/api/v3/",
                &["repos", "acme", "widgets", "traffic", "clones"],
                "https://github.example.com/api/v3/repos/acme/widgets/traffic/clones",
            ),
            ("api.github.com", &["repos", "acme", "a b"], "https://api.github.com/repos/acme/a%20b"),
        ];
        for &(host, segments, expected) in cases {
            assert_eq!(api_url(host, segments).unwrap().as_str(), expected);
        }
    }
}
