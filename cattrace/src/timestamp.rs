// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use crate::error::ConvertError;

/// Rebases raw timestamps onto an origin by plain subtraction.
///
/// A normalizer built with [`TimestampNormalizer::with_origin`] uses a fixed
/// origin, normally the run's earliest timestamp, so every event lands at or
/// after 0 whatever order it arrives in. One built with `new` latches the
/// first timestamp it is asked to normalize. Viewers that shift a 0 timestamp
/// to 1 are left to sort that out themselves.
#[derive(Debug, Default)]
pub struct TimestampNormalizer {
    origin: Option<i64>,
}

impl TimestampNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origin(origin: i64) -> Self {
        Self {
            origin: Some(origin),
        }
    }

    pub fn origin(&self) -> Option<i64> {
        self.origin
    }

    pub fn normalize(&mut self, raw: i64) -> Result<u64, ConvertError> {
        let origin = *self.origin.get_or_insert(raw);
        let relative = i128::from(raw) - i128::from(origin);
        u64::try_from(relative).map_err(|_| ConvertError::BeforeOrigin {
            timestamp: raw,
            origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_timestamp_is_zero() {
        let mut normalizer = TimestampNormalizer::new();
        assert_eq!(normalizer.origin(), None);
        assert_eq!(normalizer.normalize(1_700_000_000_123_456), Ok(0));
        assert_eq!(normalizer.origin(), Some(1_700_000_000_123_456));
        assert_eq!(normalizer.normalize(1_700_000_000_123_556), Ok(100));
    }

    #[test]
    fn test_order_is_preserved() {
        let mut normalizer = TimestampNormalizer::new();
        let raw = [5, 6, 90, 91, 1000];
        let relative: Vec<u64> = raw
            .iter()
            .map(|&ts| normalizer.normalize(ts).unwrap())
            .collect();
        assert_eq!(relative, vec![0, 1, 85, 86, 995]);
        assert!(relative.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_negative_raw_timestamps() {
        let mut normalizer = TimestampNormalizer::new();
        assert_eq!(normalizer.normalize(-50), Ok(0));
        assert_eq!(normalizer.normalize(50), Ok(100));
    }

    #[test]
    fn test_full_range_does_not_overflow() {
        let mut normalizer = TimestampNormalizer::new();
        assert_eq!(normalizer.normalize(i64::MIN), Ok(0));
        assert_eq!(normalizer.normalize(i64::MAX), Ok(u64::MAX));
    }

    #[test]
    fn test_fixed_origin_accepts_out_of_order_timestamps() {
        let mut normalizer = TimestampNormalizer::with_origin(100);
        assert_eq!(normalizer.normalize(200), Ok(100));
        assert_eq!(normalizer.normalize(100), Ok(0));
        assert_eq!(normalizer.normalize(150), Ok(50));
        assert_eq!(normalizer.origin(), Some(100));
    }

    #[test]
    fn test_before_origin() {
        let mut normalizer = TimestampNormalizer::new();
        normalizer.normalize(100).unwrap();
        assert_eq!(
            normalizer.normalize(99),
            Err(ConvertError::BeforeOrigin {
                timestamp: 99,
                origin: 100
            })
        );
    }
}
