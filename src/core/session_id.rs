//! Session id generation: second-precision UTC timestamps with bounded
//! collision suffixing.

use anyhow::{Result, anyhow};
use time::OffsetDateTime;
use time::macros::format_description;

/// Format `now` as a filename-safe second-precision id, e.g.
/// `20260807T142305`.
pub fn session_timestamp(now: OffsetDateTime) -> Result<String> {
    let format = format_description!("[year][month][day]T[hour][minute][second]");
    Ok(now.format(&format)?)
}

/// Pick the first id not already taken: `base`, then `base-2`, `base-3`, …
///
/// The suffix search is bounded; two snapshots within the same second get
/// distinct ids, and exhausting the bound is an error rather than a reused
/// id.
pub fn unique_id(base: &str, taken: &[String]) -> Result<String> {
    for suffix in 1..=999u32 {
        let candidate = if suffix == 1 {
            base.to_string()
        } else {
            format!("{base}-{suffix}")
        };
        if !taken.iter().any(|t| t == &candidate) {
            return Ok(candidate);
        }
    }
    Err(anyhow!(
        "unable to find a free id for base '{base}' (too many collisions)"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn timestamp_is_second_precision_and_filename_safe() {
        let ts = session_timestamp(datetime!(2026-08-07 14:23:05 UTC)).expect("format");
        assert_eq!(ts, "20260807T142305");
        assert!(ts.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn unique_id_returns_base_when_free() {
        let id = unique_id("20260807T142305", &[]).expect("id");
        assert_eq!(id, "20260807T142305");
    }

    #[test]
    fn unique_id_suffixes_on_collision() {
        let taken = vec![
            "20260807T142305".to_string(),
            "20260807T142305-2".to_string(),
        ];
        let id = unique_id("20260807T142305", &taken).expect("id");
        assert_eq!(id, "20260807T142305-3");
    }

    #[test]
    fn unique_id_errors_when_exhausted() {
        let mut taken = vec!["t".to_string()];
        for suffix in 2..=999u32 {
            taken.push(format!("t-{suffix}"));
        }
        assert!(unique_id("t", &taken).is_err());
    }
}
