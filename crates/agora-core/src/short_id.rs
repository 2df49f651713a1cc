//! Short identifiers for topics.
//!
//! A short id is the creation timestamp, in nanoseconds since the Unix epoch,
//! encoded as a hashid with the default alphabet, an empty salt and a
//! minimum length of [`MIN_LENGTH`]. The encoding is reversible and
//! deterministic; it is not a secret. Uniqueness comes from timestamp
//! granularity plus the `UNIQUE` index on `topics.short_id`.

use chrono::{DateTime, Duration, Utc};
use harsh::Harsh;

use crate::{Error, Result};

/// Minimum length of an encoded short id.
pub const MIN_LENGTH: usize = 5;

/// How many candidates a writer tries before giving up on a unique short id.
pub const MAX_ATTEMPTS: usize = 3;

fn hasher() -> Result<Harsh> {
  Harsh::builder()
    .length(MIN_LENGTH)
    .build()
    .map_err(|e| Error::ShortIdCodec(e.to_string()))
}

/// Encode a timestamp as a short id.
pub fn generate(at: DateTime<Utc>) -> Result<String> {
  let nanos = at
    .timestamp_nanos_opt()
    .ok_or_else(|| Error::InvalidTimestamp(at.to_rfc3339()))?;
  let nanos =
    u64::try_from(nanos).map_err(|_| Error::InvalidTimestamp(at.to_rfc3339()))?;
  encode(nanos)
}

/// Short ids to try, in order, for a row created at `at`. Each candidate
/// nudges the timestamp forward by one nanosecond.
pub fn candidates(at: DateTime<Utc>) -> Result<Vec<String>> {
  (0..MAX_ATTEMPTS as i64)
    .map(|n| generate(at + Duration::nanoseconds(n)))
    .collect()
}

pub fn encode(value: u64) -> Result<String> { Ok(hasher()?.encode(&[value])) }

/// Recover the number a short id was built from. Ids that do not decode to
/// exactly one value are rejected.
pub fn decode(s: &str) -> Result<u64> {
  match hasher()?.decode(s).as_deref() {
    Ok([value]) => Ok(*value),
    _ => Err(Error::InvalidShortId(s.to_owned())),
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn pads_small_values_to_min_length() {
    for value in [0, 1, 61, 62] {
      let id = encode(value).unwrap();
      assert!(id.len() >= MIN_LENGTH, "{id:?} is too short");
      assert_eq!(decode(&id).unwrap(), value);
    }
  }

  #[test]
  fn timestamp_round_trips() {
    let at = Utc.with_ymd_and_hms(2019, 3, 14, 15, 9, 26).unwrap()
      + Duration::nanoseconds(535_897_932);
    let id = generate(at).unwrap();
    assert!(id.len() >= MIN_LENGTH);
    assert!(id.bytes().all(|b| b.is_ascii_alphanumeric()));
    assert!(!id.contains('-'));
    assert_eq!(
      decode(&id).unwrap(),
      at.timestamp_nanos_opt().unwrap() as u64
    );
  }

  #[test]
  fn distinct_nanoseconds_give_distinct_ids() {
    let at = Utc::now();
    let ids = candidates(at).unwrap();
    assert_eq!(ids.len(), MAX_ATTEMPTS);
    assert_eq!(ids[0], generate(at).unwrap());
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
    assert_ne!(ids[0], ids[2]);
  }

  #[test]
  fn rejects_pre_epoch_timestamps() {
    let at = Utc.with_ymd_and_hms(1969, 12, 31, 0, 0, 0).unwrap();
    assert!(matches!(generate(at), Err(Error::InvalidTimestamp(_))));
  }

  #[test]
  fn decode_rejects_foreign_characters() {
    assert!(matches!(decode("abc-def"), Err(Error::InvalidShortId(_))));
    assert!(matches!(decode("abc def"), Err(Error::InvalidShortId(_))));
  }
}
