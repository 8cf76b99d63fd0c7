// =============================================================================
// Series Model
// =============================================================================
//
// A `Series` is an immutable, date-ordered sequence of optional values. Every
// series owns a handle to its date axis; derived series share the axis of the
// series they were computed from, so an undefined position stays on the axis
// as `None` instead of being dropped.
//
// Combining two series is a merge-join on dates (`zip_by_date`), never an
// index offset computation.
// =============================================================================

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::errors::IndicatorError;
use crate::types::{Bar, PriceField};

// =============================================================================
// Series
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    dates: Arc<[NaiveDate]>,
    values: Vec<Option<f64>>,
}

impl Series {
    /// Build a series from a date axis and matching values.
    ///
    /// Fails when the lengths differ or the dates are not strictly increasing.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> Result<Self, IndicatorError> {
        if dates.len() != values.len() {
            return Err(IndicatorError::AxisMismatch);
        }
        check_strictly_increasing(&dates)?;
        Ok(Self {
            dates: dates.into(),
            values,
        })
    }

    /// Project one field of `bars` into a fully-defined series.
    pub fn from_bars(bars: &[Bar], field: PriceField) -> Result<Self, IndicatorError> {
        if bars.is_empty() {
            return Err(IndicatorError::EmptyInput);
        }
        let dates: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
        check_strictly_increasing(&dates)?;
        Ok(Self {
            dates: dates.into(),
            values: bars.iter().map(|b| Some(b.field(field))).collect(),
        })
    }

    /// A new series on this series' date axis.
    pub(crate) fn derive(&self, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(values.len(), self.dates.len());
        Self {
            dates: Arc::clone(&self.dates),
            values,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`; `None` for out-of-range or undefined positions.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    /// Number of defined positions.
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Index of the first defined position.
    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }

    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        let idx = self.values.iter().rposition(Option::is_some)?;
        Some((self.dates[idx], self.values[idx]?))
    }

    /// `(date, value)` pairs in axis order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Whether both series use the same date axis.
    pub fn same_axis(&self, other: &Series) -> bool {
        Arc::ptr_eq(&self.dates, &other.dates) || self.dates == other.dates
    }

    /// Lazy windows of exactly `size` consecutive defined values.
    pub fn rolling_window(&self, size: usize) -> RollingWindows<'_> {
        RollingWindows {
            values: &self.values,
            size,
            cursor: 0,
            run: 0,
        }
    }

    /// Merge-join this series with `other` on date.
    ///
    /// Dates present on only one side yield `None` for the other side.
    pub fn zip_by_date<'a>(&'a self, other: &'a Series) -> ZipByDate<'a> {
        ZipByDate {
            left: self,
            right: other,
            l: 0,
            r: 0,
        }
    }

    /// Combine two series that share a date axis, applying `f` where both are
    /// defined.
    pub fn zip_with<F>(&self, other: &Series, f: F) -> Result<Series, IndicatorError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let mut values = Vec::with_capacity(self.len());
        for (_, a, b) in self.zip_by_date(other) {
            match (a, b) {
                (Some(Some(a)), Some(Some(b))) => values.push(Some(f(a, b))),
                (Some(_), Some(_)) => values.push(None),
                _ => return Err(IndicatorError::AxisMismatch),
            }
        }
        Ok(self.derive(values))
    }
}

fn check_strictly_increasing(dates: &[NaiveDate]) -> Result<(), IndicatorError> {
    match dates.windows(2).position(|w| w[0] >= w[1]) {
        Some(i) => Err(IndicatorError::UnorderedDates { index: i + 1 }),
        None => Ok(()),
    }
}

/// Serialised as an ordered list of `{date, value}` records; undefined
/// positions become `null` and are never omitted.
impl Serialize for Series {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for (date, value) in self.iter() {
            seq.serialize_element(&Point { date, value })?;
        }
        seq.end()
    }
}

struct Point {
    date: NaiveDate,
    value: Option<f64>,
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Point", 2)?;
        s.serialize_field("date", &self.date)?;
        s.serialize_field("value", &self.value.filter(|v| v.is_finite()))?;
        s.end()
    }
}

// =============================================================================
// Rolling windows
// =============================================================================

/// A read-only view over `size` consecutive defined values.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    end: usize,
    values: &'a [Option<f64>],
}

impl<'a> Window<'a> {
    /// Axis index of the last (most recent) value in the window.
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + 'a {
        self.values.iter().flatten().copied()
    }

    pub fn mean(&self) -> f64 {
        self.iter().sum::<f64>() / self.len() as f64
    }

    /// Population standard deviation (divides by the window length).
    pub fn population_std_dev(&self) -> f64 {
        let mean = self.mean();
        let variance = self.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / self.len() as f64;
        variance.sqrt()
    }
}

/// Iterator returned by [`Series::rolling_window`].
///
/// Tracks the length of the current run of defined values, so each position
/// is inspected once.
#[derive(Debug, Clone)]
pub struct RollingWindows<'a> {
    values: &'a [Option<f64>],
    size: usize,
    cursor: usize,
    run: usize,
}

impl<'a> Iterator for RollingWindows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Window<'a>> {
        if self.size == 0 {
            return None;
        }
        while self.cursor < self.values.len() {
            let idx = self.cursor;
            self.cursor += 1;
            if self.values[idx].is_none() {
                self.run = 0;
                continue;
            }
            self.run += 1;
            if self.run >= self.size {
                return Some(Window {
                    end: idx,
                    values: &self.values[idx + 1 - self.size..=idx],
                });
            }
        }
        None
    }
}

// =============================================================================
// Zip by date
// =============================================================================

/// Merge-join over two date axes. Each item is
/// `(date, left value slot, right value slot)`, where an outer `None` means
/// the date is absent from that side.
pub struct ZipByDate<'a> {
    left: &'a Series,
    right: &'a Series,
    l: usize,
    r: usize,
}

impl Iterator for ZipByDate<'_> {
    type Item = (NaiveDate, Option<Option<f64>>, Option<Option<f64>>);

    fn next(&mut self) -> Option<Self::Item> {
        let ld = self.left.dates.get(self.l).copied();
        let rd = self.right.dates.get(self.r).copied();
        let item = match (ld, rd) {
            (None, None) => return None,
            (Some(d), None) => {
                self.l += 1;
                (d, Some(self.left.values[self.l - 1]), None)
            }
            (None, Some(d)) => {
                self.r += 1;
                (d, None, Some(self.right.values[self.r - 1]))
            }
            (Some(a), Some(b)) => match a.cmp(&b) {
                Ordering::Less => {
                    self.l += 1;
                    (a, Some(self.left.values[self.l - 1]), None)
                }
                Ordering::Greater => {
                    self.r += 1;
                    (b, None, Some(self.right.values[self.r - 1]))
                }
                Ordering::Equal => {
                    self.l += 1;
                    self.r += 1;
                    (
                        a,
                        Some(self.left.values[self.l - 1]),
                        Some(self.right.values[self.r - 1]),
                    )
                }
            },
        };
        Some(item)
    }
}

// =============================================================================
// IndicatorResult
// =============================================================================

/// Named bundle of series that share one date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorResult {
    components: Vec<(String, Series)>,
}

impl IndicatorResult {
    pub fn single(name: impl Into<String>, series: Series) -> Self {
        Self {
            components: vec![(name.into(), series)],
        }
    }

    /// Append a component; it must sit on the same date axis as the others.
    pub fn with(mut self, name: impl Into<String>, series: Series) -> Result<Self, IndicatorError> {
        if let Some((_, first)) = self.components.first() {
            if !first.same_axis(&series) {
                return Err(IndicatorError::AxisMismatch);
            }
        }
        self.components.push((name.into(), series));
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.components
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|(n, _)| n.as_str())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        self.components
            .first()
            .map(|(_, s)| s.dates())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.dates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates().is_empty()
    }

    /// Combine two results into one, prefixing component names.
    pub fn merge(self, prefix: &str, other: IndicatorResult) -> Result<Self, IndicatorError> {
        let mut merged = self;
        for (name, series) in other.components {
            let name = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}_{name}")
            };
            merged = merged.with(name, series)?;
        }
        Ok(merged)
    }

    /// One record per date with every component's value.
    pub fn rows(&self) -> Vec<Row<'_>> {
        self.dates()
            .iter()
            .enumerate()
            .map(|(i, &date)| Row {
                date,
                values: self
                    .components
                    .iter()
                    .map(|(n, s)| (n.as_str(), s.values()[i]))
                    .collect(),
            })
            .collect()
    }
}

/// Serialised as `{name: [{date, value}], ...}` in component order.
impl Serialize for IndicatorResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.components.len()))?;
        for (name, series) in &self.components {
            map.serialize_entry(name, series)?;
        }
        map.end()
    }
}

/// A single date of an [`IndicatorResult`], flattened to `{date, name: value}`.
#[derive(Debug)]
pub struct Row<'a> {
    pub date: NaiveDate,
    pub values: Vec<(&'a str, Option<f64>)>,
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("date", &self.date)?;
        for (name, value) in &self.values {
            map.serialize_entry(name, &value.filter(|v| v.is_finite()))?;
        }
        map.end()
    }
}
