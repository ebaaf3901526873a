//! PriceSeries — a validated, date-ordered run of daily bars for one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bar::Bar;

/// Violations of the price series invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("price series for '{symbol}' is empty")]
    Empty { symbol: String },

    #[error("bar {index} ({date}) is not after the previous bar ({previous})")]
    Unsorted {
        index: usize,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("duplicate bar date {date} at index {index}")]
    DuplicateDate { index: usize, date: NaiveDate },

    #[error("bar {index} ({date}) has a negative price")]
    NegativeValue { index: usize, date: NaiveDate },
}

/// Daily bars for a single instrument, strictly ascending by date.
///
/// The invariant is checked on construction and the bars are never exposed
/// mutably, so every `PriceSeries` in circulation is sorted and duplicate-free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series from bars that must already be sorted ascending.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        validate(&symbol, &bars)?;
        Ok(Self { symbol, bars })
    }

    /// Build a series from provider rows in arbitrary order.
    ///
    /// Rows are sorted by date; when a date repeats, the last row for that
    /// date wins. Negative prices still fail.
    pub fn from_unsorted(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Result<Self, SeriesError> {
        // Stable sort keeps provider order within a date, so the later row
        // overwrites the earlier one below.
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self::new(symbol, deduped)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent bar. A validated series is never empty.
    pub fn last(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.last().date
    }

    /// Close prices in bar order.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// The last `n` bars (or all of them if the series is shorter).
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    /// BLAKE3 content hash over dates and OHLCV, used to fingerprint runs.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.symbol.as_bytes());
        for bar in &self.bars {
            hasher.update(bar.date.to_string().as_bytes());
            for v in [bar.open, bar.high, bar.low, bar.close] {
                hasher.update(&v.to_le_bytes());
            }
            hasher.update(&bar.volume.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn validate(symbol: &str, bars: &[Bar]) -> Result<(), SeriesError> {
    if bars.is_empty() {
        return Err(SeriesError::Empty {
            symbol: symbol.to_string(),
        });
    }
    for (i, bar) in bars.iter().enumerate() {
        if bar.has_negative_price() {
            return Err(SeriesError::NegativeValue {
                index: i,
                date: bar.date,
            });
        }
        if i > 0 {
            let previous = bars[i - 1].date;
            if bar.date == previous {
                return Err(SeriesError::DuplicateDate {
                    index: i,
                    date: bar.date,
                });
            }
            if bar.date < previous {
                return Err(SeriesError::Unsorted {
                    index: i,
                    date: bar.date,
                    previous,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn accepts_sorted_bars() {
        let series = PriceSeries::new("TEST", make_bars(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.last().close, 3.0);
    }

    #[test]
    fn rejects_empty() {
        let err = PriceSeries::new("TEST", vec![]).unwrap_err();
        assert!(matches!(err, SeriesError::Empty { .. }));
    }

    #[test]
    fn rejects_unsorted() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars.swap(0, 2);
        let err = PriceSeries::new("TEST", bars).unwrap_err();
        assert!(matches!(err, SeriesError::Unsorted { index: 1, .. }));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars[2].date = bars[1].date;
        let err = PriceSeries::new("TEST", bars).unwrap_err();
        assert!(matches!(err, SeriesError::DuplicateDate { index: 2, .. }));
    }

    #[test]
    fn rejects_negative_prices() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        bars[1].close = -2.0;
        let err = PriceSeries::new("TEST", bars).unwrap_err();
        assert!(matches!(err, SeriesError::NegativeValue { index: 1, .. }));
    }

    #[test]
    fn from_unsorted_sorts_and_keeps_last_duplicate() {
        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        let mut dup = bars[1].clone();
        dup.close = 20.0;
        bars.push(dup);
        bars.reverse();
        // After reverse the duplicate comes first, so the original row wins.
        let series = PriceSeries::from_unsorted("TEST", bars).unwrap();
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);

        let mut bars = make_bars(&[1.0, 2.0, 3.0]);
        let mut dup = bars[1].clone();
        dup.close = 20.0;
        bars.push(dup);
        let series = PriceSeries::from_unsorted("TEST", bars).unwrap();
        assert_eq!(series.closes(), vec![1.0, 20.0, 3.0]);
    }

    #[test]
    fn tail_clamps_to_length() {
        let series = PriceSeries::new("TEST", make_bars(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(series.tail(2).len(), 2);
        assert_eq!(series.tail(10).len(), 3);
    }

    #[test]
    fn content_hash_changes_with_data() {
        let a = PriceSeries::new("TEST", make_bars(&[1.0, 2.0, 3.0])).unwrap();
        let b = PriceSeries::new("TEST", make_bars(&[1.0, 2.0, 3.5])).unwrap();
        assert_eq!(a.content_hash(), a.content_hash());
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
