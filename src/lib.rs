//! statline emits application metrics (gauges, counters, timings) to a
//! statsd daemon as fire-and-forget UDP datagrams. The library is built
//! so that instrumentation can never destabilize the host application:
//! construction never fails, recording calls never block on the network,
//! and an unreachable or misconfigured daemon only ever shows up as a
//! `false` return and an optional error callback.
//!
//! ### Example: recording metrics
//!
//! ```no_run
//! use statline::StatlineClient;
//!
//! let client = StatlineClient::from_connection_string(
//!     "statsd://metrics.example.com:8125?application=checkout&environment=prod",
//! );
//! let _ = client.incr("orders.accepted");
//! let _ = client.gauge("queue.depth", 17.0, 1.0);
//! let _ = client.timing("render", 250, 0.5);
//! let result = client.time_callable("reprice", 1.0, || 2 + 2);
//! assert_eq!(result, 4);
//! ```
//!
//! Every emitted key is prefixed with the namespace resolved from the
//! connection string: `application[.environment][.machine identity]`.
//! The machine segment is included by default and switched off with
//! `usemachinenamefolder=false`.
//!
//! ### Example: observing errors and emissions in tests
//!
//! ```
//! use std::sync::Arc;
//! use statline::{CaptureSink, StatlineClient};
//!
//! let sink = Arc::new(CaptureSink::new());
//! let client = StatlineClient::builder()
//!     .connection_string("statsd://localhost:8125?application=App&usemachinenamefolder=false")
//!     .with_sink(sink.clone())
//!     .with_error_handler(|err| eprintln!("metric error: {err}"))
//!     .build();
//!
//! client.gauge("memory", 42.0, 1.0).unwrap();
//! assert_eq!(sink.lines(), vec!["App.memory:42|g".to_string()]);
//! ```
//!
//! ### Disabled instrumentation
//!
//! Building without a connection string (for example when
//! [config::connection_string_from_env] finds nothing) yields an inactive
//! client: every recording call is a no-op returning `Ok(false)`. This is
//! a supported mode, not an error.

/// [StatlineClient] is the client for formatting, sampling and emitting
/// statsd metrics; [ClientBuilder](client::ClientBuilder) is its
/// never-failing constructor.
pub mod client;
/// Immutable client configuration resolved from a connection string.
pub mod config;
/// Connection-string parsing, no metric logic.
pub mod connection;
/// Error taxonomy and the error-notification channel.
pub mod error;
/// Wall-clock timing wrappers around synchronous and asynchronous work.
pub mod instrument;
/// Wire-format types and line encoding.
pub mod line;
/// Probabilistic sampling of emissions.
pub mod sample;
/// [MetricSink](sink::MetricSink) is the transport seam; production sends
/// UDP datagrams, test doubles capture lines.
pub mod sink;

pub use client::{ClientBuilder, StatlineClient};
pub use config::{connection_string_from_env, ClientConfig, ServerAddress};
pub use connection::{ConnectionDescriptor, ParseError};
pub use error::{ErrorHandler, MetricError};
pub use instrument::{measure_async_fut, measure_sync_fn};
pub use line::{MetricKind, MetricValue};
pub use sample::{SampleSource, SequenceSource, ThreadRngSource, FULL_SAMPLE_RATE};
pub use sink::{CaptureSink, MetricSink, NopSink, UdpSink};
