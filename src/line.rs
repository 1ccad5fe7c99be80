use std::borrow::Cow;
use std::fmt::{self, Write};

use derive_more::Display;

use crate::sample::FULL_SAMPLE_RATE;

/// Kind of metric carried by one wire line. Displays as the statsd type
/// tag.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum MetricKind {
    #[display("g")]
    Gauge,
    #[display("c")]
    Counter,
    #[display("ms")]
    Timing,
}

/// Numeric payload of one wire line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricValue {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Signed(value) => write!(f, "{value}"),
            MetricValue::Unsigned(value) => write!(f, "{value}"),
            // Integral floats render without a decimal point, `42` not `42.0`.
            MetricValue::Float(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        MetricValue::Signed(value)
    }
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        MetricValue::Unsigned(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Float(value)
    }
}

/// One metric emission, constructed and consumed within a single recording
/// call. Never stored.
#[derive(Debug)]
pub struct MetricSample<'a> {
    pub kind: MetricKind,
    pub key: &'a str,
    pub value: MetricValue,
    pub sample_rate: f64,
}

impl MetricSample<'_> {
    /// Encode the sample as one wire line under `namespace`:
    /// `<namespace>.<key>:<value>|<tag>[|@<rate>]`.
    ///
    /// The key has all `:` characters stripped first; the `|@` suffix is
    /// present only for sampled emissions and carries two decimal places.
    pub fn encode(&self, namespace: &str) -> String {
        let key = strip_field_delimiter(self.key);
        let mut line = String::with_capacity(namespace.len() + key.len() + 24);
        let _ = write!(line, "{namespace}.{key}:{}|{}", self.value, self.kind);
        if self.sample_rate < FULL_SAMPLE_RATE {
            let _ = write!(line, "|@{:.2}", self.sample_rate);
        }
        line
    }
}

/// Strip the key/value delimiter from a metric key or namespace segment,
/// borrowing when the input is already clean.
pub(crate) fn strip_field_delimiter(input: &str) -> Cow<'_, str> {
    if input.contains(':') {
        Cow::Owned(input.chars().filter(|c| *c != ':').collect())
    } else {
        Cow::Borrowed(input)
    }
}
