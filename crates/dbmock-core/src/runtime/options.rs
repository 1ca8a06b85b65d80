// crates/dbmock-core/src/runtime/options.rs
// ============================================================================
// Module: dbmock Options
// Description: Construction-time settings of a mock instance.
// Purpose: Select matching policy, converter, ping monitoring, and event sink.
// Dependencies: crate::interfaces, crate::runtime::{converter, events, query}
// ============================================================================

//! ## Overview
//! [`MockOptions`] defaults to ordered matching, the regular
//! expression SQL matcher, the default converter, no ping monitoring and a
//! discarding event sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::interfaces::EventSink;
use crate::interfaces::QueryMatcher;
use crate::interfaces::ValueConverter;
use crate::runtime::converter::DefaultConverter;
use crate::runtime::events::NoopEventSink;
use crate::runtime::query::RegexpQueryMatcher;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Settings used when creating a mock.
#[derive(Clone)]
pub struct MockOptions {
    /// Identifier of the mock; generated when absent.
    pub id: Option<String>,
    /// Whether calls must follow declaration order.
    pub ordered: bool,
    /// Whether ping calls are matched against expectations.
    pub monitor_pings: bool,
    /// SQL matching strategy.
    pub query_matcher: Arc<dyn QueryMatcher>,
    /// Value converter for arguments and rows.
    pub converter: Arc<dyn ValueConverter>,
    /// Destination for activity events.
    pub sink: Arc<dyn EventSink>,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            id: None,
            ordered: true,
            monitor_pings: false,
            query_matcher: Arc::new(RegexpQueryMatcher::new()),
            converter: Arc::new(DefaultConverter),
            sink: Arc::new(NoopEventSink),
        }
    }
}

impl MockOptions {
    /// Sets the mock identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets ordered matching.
    #[must_use]
    pub const fn with_ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    /// Enables or disables ping monitoring.
    #[must_use]
    pub const fn with_monitor_pings(mut self, monitor_pings: bool) -> Self {
        self.monitor_pings = monitor_pings;
        self
    }

    /// Replaces the SQL matcher.
    #[must_use]
    pub fn with_query_matcher(mut self, matcher: impl QueryMatcher + 'static) -> Self {
        self.query_matcher = Arc::new(matcher);
        self
    }

    /// Replaces the value converter.
    #[must_use]
    pub fn with_converter(mut self, converter: impl ValueConverter + 'static) -> Self {
        self.converter = Arc::new(converter);
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl fmt::Debug for MockOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockOptions")
            .field("id", &self.id)
            .field("ordered", &self.ordered)
            .field("monitor_pings", &self.monitor_pings)
            .field("query_matcher", &self.query_matcher)
            .field("converter", &self.converter)
            .finish_non_exhaustive()
    }
}
