//! Trace filter predicates.
//!
//! A [`Query`] is a conjunction of optional constraints plus a result limit.
//! Parsing queries out of request parameters belongs to the serving layer;
//! this module only evaluates them against a [`Trace`].

use crate::core::error::{Result, StoreError};
use crate::core::types::{Span, Trace};
use serde::{Deserialize, Serialize};

/// Filter criteria for trace searches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    /// Some span of the trace must be recorded by this service
    pub service_name: Option<String>,
    /// Some span of the trace must carry this operation name
    pub span_name: Option<String>,
    /// Every value must appear as an annotation value
    pub annotations: Vec<String>,
    /// Every key/value pair must appear as a binary annotation
    pub binary_annotations: Vec<(String, String)>,
    /// Upper bound of the trace's minimum timestamp, microseconds
    pub end_ts: Option<i64>,
    /// Window ending at `end_ts`, microseconds
    pub lookback: Option<i64>,
    /// Some span must last at least this long, microseconds
    pub min_duration: Option<i64>,
    /// Upper bound for the span satisfying `min_duration`, microseconds
    pub max_duration: Option<i64>,
    /// Maximum number of traces to return; zero means unbounded
    pub limit: usize,
}

impl Query {
    /// Creates a new query builder
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// Query matching every trace, truncated to the `limit` most recent
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Validates constraint consistency
    pub fn validate(&self) -> Result<()> {
        if matches!(self.lookback, Some(l) if l < 0) {
            return Err(StoreError::invalid_query("lookback cannot be negative"));
        }
        if self.lookback.is_some() && self.end_ts.is_none() {
            return Err(StoreError::invalid_query("lookback requires end_ts"));
        }
        if let (Some(min), Some(max)) = (self.min_duration, self.max_duration) {
            if min > max {
                return Err(StoreError::invalid_query(format!(
                    "min_duration {} exceeds max_duration {}",
                    min, max
                )));
            }
        }
        Ok(())
    }

    /// Keeps the last `limit` entries of an ascending list
    pub(crate) fn truncate<T>(&self, items: &mut Vec<T>) {
        if self.limit > 0 && items.len() > self.limit {
            items.drain(..items.len() - self.limit);
        }
    }

    fn span_matches_name(&self, span: &Span) -> bool {
        match (&self.span_name, &self.service_name) {
            (Some(name), Some(service)) => span.name == *name && span.has_service(service),
            (Some(name), None) => span.name == *name,
            (None, _) => true,
        }
    }

    fn span_matches_duration(&self, span: &Span) -> bool {
        let Some(duration) = span.duration else {
            return false;
        };
        self.min_duration.map_or(true, |min| duration >= min)
            && self.max_duration.map_or(true, |max| duration <= max)
    }
}

impl Trace {
    /// Returns true if this trace satisfies every constraint of the query.
    /// Empty traces never match.
    pub fn matches(&self, query: &Query) -> bool {
        if self.is_empty() {
            return false;
        }

        if let Some(end_ts) = query.end_ts {
            if self.min_timestamp > end_ts {
                return false;
            }
            if let Some(lookback) = query.lookback {
                if self.min_timestamp < end_ts.saturating_sub(lookback) {
                    return false;
                }
            }
        }

        if let Some(service) = &query.service_name {
            if !self.spans.iter().any(|span| span.has_service(service)) {
                return false;
            }
        }

        if query.span_name.is_some() && !self.spans.iter().any(|span| query.span_matches_name(span)) {
            return false;
        }

        if (query.min_duration.is_some() || query.max_duration.is_some())
            && !self.spans.iter().any(|span| query.span_matches_duration(span))
        {
            return false;
        }

        let has_annotation = |value: &String| {
            self.spans
                .iter()
                .flat_map(|span| span.annotations.iter())
                .any(|a| a.value == *value)
        };
        if !query.annotations.iter().all(has_annotation) {
            return false;
        }

        let has_tag = |(key, value): &(String, String)| {
            self.spans
                .iter()
                .flat_map(|span| span.binary_annotations.iter())
                .any(|b| b.key == *key && b.value == *value)
        };
        query.binary_annotations.iter().all(has_tag)
    }
}

/// Builder for creating Query instances
#[derive(Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn service_name<S: Into<String>>(mut self, service: S) -> Self {
        self.query.service_name = Some(service.into());
        self
    }

    pub fn span_name<S: Into<String>>(mut self, name: S) -> Self {
        self.query.span_name = Some(name.into());
        self
    }

    pub fn annotation<S: Into<String>>(mut self, value: S) -> Self {
        self.query.annotations.push(value.into());
        self
    }

    pub fn binary_annotation<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.binary_annotations.push((key.into(), value.into()));
        self
    }

    pub fn end_ts(mut self, end_ts: i64) -> Self {
        self.query.end_ts = Some(end_ts);
        self
    }

    pub fn lookback(mut self, lookback: i64) -> Self {
        self.query.lookback = Some(lookback);
        self
    }

    pub fn min_duration(mut self, min: i64) -> Self {
        self.query.min_duration = Some(min);
        self
    }

    pub fn max_duration(mut self, max: i64) -> Self {
        self.query.max_duration = Some(max);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = limit;
        self
    }

    /// Build and validate the query
    pub fn build(self) -> Result<Query> {
        self.query.validate()?;
        Ok(self.query)
    }
}
