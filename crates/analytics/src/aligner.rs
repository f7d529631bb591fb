//! Resampling of raw sales events onto regular grids.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use demandlens_core::{AlignedSeries, Frequency, GroupKey, RawSaleEvent};

use crate::error::AnalyticsError;

/// Buckets events per [`GroupKey`] at a fixed frequency.
///
/// Each group's series spans its own first to last observed bucket. Buckets
/// inside that span with no events hold `0.0` (gaps are zero-filled, never
/// forward-filled).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SeriesAligner {
    frequency: Frequency,
}

impl SeriesAligner {
    pub fn new(frequency: Frequency) -> Self {
        Self { frequency }
    }

    pub fn hourly() -> Self {
        Self::new(Frequency::Hourly)
    }

    pub fn daily() -> Self {
        Self::new(Frequency::Daily)
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn align<'a, I>(&self, events: I) -> Result<BTreeMap<GroupKey, AlignedSeries>, AnalyticsError>
    where
        I: IntoIterator<Item = &'a RawSaleEvent>,
    {
        let mut buckets: BTreeMap<GroupKey, BTreeMap<NaiveDateTime, f64>> = BTreeMap::new();
        for event in events {
            let bucket = self.frequency.floor(event.timestamp);
            *buckets
                .entry(event.group_key())
                .or_default()
                .entry(bucket)
                .or_insert(0.0) += event.quantity;
        }

        let step_secs = self.frequency.step().num_seconds();
        let mut aligned = BTreeMap::new();
        for (key, sums) in buckets {
            let (Some((&start, _)), Some((&end, _))) = (sums.first_key_value(), sums.last_key_value())
            else {
                continue;
            };
            let len = ((end - start).num_seconds() / step_secs) as usize + 1;
            let mut values = vec![0.0; len];
            for (ts, qty) in sums {
                let idx = ((ts - start).num_seconds() / step_secs) as usize;
                values[idx] = qty;
            }
            aligned.insert(key, AlignedSeries::new(self.frequency, start, values)?);
        }
        Ok(aligned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn sale(ts: NaiveDateTime, pid: &str, loc: &str, qty: f64) -> RawSaleEvent {
        RawSaleEvent {
            timestamp: ts,
            product_id: pid.to_string(),
            product_name: format!("P{pid}"),
            location: loc.to_string(),
            quantity: qty,
        }
    }

    #[test]
    fn sums_within_bucket_and_zero_fills_gaps() {
        let events = vec![
            sale(at(1, 10, 5), "1", "A", 3.0),
            sale(at(1, 10, 55), "1", "A", 2.0),
            sale(at(1, 13, 0), "1", "A", 4.0),
        ];
        let series = SeriesAligner::hourly().align(&events).unwrap();
        let s = &series[&GroupKey::new("1", "P1", "A")];
        assert_eq!(s.start(), at(1, 10, 0));
        assert_eq!(s.values(), &[5.0, 0.0, 0.0, 4.0]);
    }

    #[test]
    fn groups_are_independent_and_sorted() {
        let events = vec![
            sale(at(2, 0, 0), "2", "B", 1.0),
            sale(at(1, 0, 0), "1", "A", 1.0),
            sale(at(3, 5, 0), "1", "A", 1.0),
        ];
        let series = SeriesAligner::daily().align(&events).unwrap();
        let keys: Vec<_> = series.keys().map(|k| k.product_id.as_str()).collect();
        assert_eq!(keys, vec!["1", "2"]);
        assert_eq!(series[&GroupKey::new("1", "P1", "A")].values(), &[1.0, 0.0, 1.0]);
        assert_eq!(series[&GroupKey::new("2", "P2", "B")].len(), 1);
    }

    #[test]
    fn unsorted_input_is_fine() {
        let events = vec![
            sale(at(1, 3, 0), "1", "A", 1.0),
            sale(at(1, 1, 0), "1", "A", 2.0),
        ];
        let series = SeriesAligner::hourly().align(&events).unwrap();
        assert_eq!(series[&GroupKey::new("1", "P1", "A")].values(), &[2.0, 0.0, 1.0]);
    }

    proptest! {
        #[test]
        fn aligned_total_matches_event_total(
            offsets in prop::collection::vec((0i64..500, 0u32..50), 1..60)
        ) {
            let base = at(1, 0, 0);
            let events: Vec<RawSaleEvent> = offsets
                .iter()
                .map(|(mins, qty)| sale(base + chrono::Duration::minutes(*mins * 7), "9", "Z", *qty as f64))
                .collect();
            let series = SeriesAligner::hourly().align(&events).unwrap();
            let s = &series[&GroupKey::new("9", "P9", "Z")];

            let total: f64 = events.iter().map(|e| e.quantity).sum();
            prop_assert!((s.values().iter().sum::<f64>() - total).abs() < 1e-9);

            let first = events.iter().map(|e| e.timestamp).min().unwrap();
            let last = events.iter().map(|e| e.timestamp).max().unwrap();
            prop_assert_eq!(s.start(), Frequency::Hourly.floor(first));
            prop_assert_eq!(s.last_timestamp(), Frequency::Hourly.floor(last));
        }
    }
}
