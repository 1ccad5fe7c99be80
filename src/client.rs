use tracing::debug;

use crate::config::{ClientConfig, ServerAddress};
use crate::connection::ConnectionDescriptor;
use crate::error::{default_error_handler, ErrorHandler, MetricError};
use crate::line::{MetricKind, MetricSample, MetricValue};
use crate::sample::{should_send, SampleSource, ThreadRngSource, FULL_SAMPLE_RATE};
use crate::sink::{MetricSink, UdpSink};

/// Client for emitting statsd metrics over an unreliable datagram
/// transport.
///
/// Construction never fails and recording operations never unwind into
/// the caller: a client built from a bad connection string or an
/// unreachable daemon is inactive, and every operation on it is a no-op
/// returning `Ok(false)`. Failures below the public boundary are routed
/// to the error handler installed at construction.
/// [MetricError::InvalidArgument] is the one exception, surfaced as `Err`
/// because it indicates programmer error rather than an environmental
/// condition.
///
/// Recording operations return `Ok(true)` when at least one line was
/// handed to the transport.
pub struct StatlineClient {
    active: bool,
    config: Option<ClientConfig>,
    sink: Option<Box<dyn MetricSink>>,
    sample_source: Box<dyn SampleSource>,
    errors: ErrorHandler,
}

impl StatlineClient {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Build directly from a connection string with default handler,
    /// sampling source and UDP transport.
    pub fn from_connection_string(connection_string: &str) -> Self {
        ClientBuilder::new().connection_string(connection_string).build()
    }

    /// An inactive client: the supported instrumentation-disabled mode,
    /// not a failure. No error is reported.
    pub fn disabled() -> Self {
        ClientBuilder::new().build()
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn application_name(&self) -> Option<&str> {
        self.config.as_ref().map(ClientConfig::application_name)
    }

    /// Resolved namespace every emitted key is prefixed with. `None` when
    /// inactive.
    pub fn namespace(&self) -> Option<&str> {
        self.config.as_ref().map(ClientConfig::namespace)
    }

    /// Whether the machine identity is part of the namespace. Reports the
    /// default of `true` on an inactive client.
    pub fn use_machine_name_folder(&self) -> bool {
        self.config
            .as_ref()
            .map(ClientConfig::use_machine_name_folder)
            .unwrap_or(true)
    }

    pub fn server_address(&self) -> Option<&ServerAddress> {
        self.config.as_ref().map(ClientConfig::server_address)
    }

    /// Record an instantaneous gauge value: `<key>:<value>|g`.
    pub fn gauge(&self, key: &str, value: f64, sample_rate: f64) -> Result<bool, MetricError> {
        self.send_one(MetricKind::Gauge, key, MetricValue::Float(value), sample_rate)
    }

    /// Record a timing in milliseconds: `<key>:<millis>|ms`.
    pub fn timing(&self, key: &str, milliseconds: u64, sample_rate: f64) -> Result<bool, MetricError> {
        self.send_one(
            MetricKind::Timing,
            key,
            MetricValue::Unsigned(milliseconds),
            sample_rate,
        )
    }

    /// Add `magnitude` to one or more counters: `<key>:<magnitude>|c` per
    /// key. The sampling decision is made independently for each key.
    pub fn increment<I, K>(&self, keys: I, magnitude: i64, sample_rate: f64) -> Result<bool, MetricError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.send_counters(keys, magnitude, sample_rate)
    }

    /// Subtract `magnitude` from one or more counters. The magnitude is
    /// negated exactly once; callers that already pass a negative value
    /// are not double-negated.
    pub fn decrement<I, K>(&self, keys: I, magnitude: i64, sample_rate: f64) -> Result<bool, MetricError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let magnitude = if magnitude < 0 { magnitude } else { -magnitude };
        self.send_counters(keys, magnitude, sample_rate)
    }

    /// Increment a single counter by one, unsampled.
    pub fn incr(&self, key: &str) -> Result<bool, MetricError> {
        self.increment([key], 1, FULL_SAMPLE_RATE)
    }

    /// Decrement a single counter by one, unsampled.
    pub fn decr(&self, key: &str) -> Result<bool, MetricError> {
        self.decrement([key], 1, FULL_SAMPLE_RATE)
    }

    /// Single funnel for the counter family. Keys are validated up front
    /// so a bad batch fails before any line is sent.
    fn send_counters<I, K>(&self, keys: I, magnitude: i64, sample_rate: f64) -> Result<bool, MetricError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        if keys.is_empty() {
            return Err(MetricError::InvalidArgument("key collection is empty"));
        }
        if keys.iter().any(|key| key.as_ref().is_empty()) {
            return Err(MetricError::InvalidArgument("key is empty"));
        }
        let mut any_sent = false;
        for key in &keys {
            any_sent |= self.send_one(
                MetricKind::Counter,
                key.as_ref(),
                MetricValue::Signed(magnitude),
                sample_rate,
            )?;
        }
        Ok(any_sent)
    }

    /// Core emission path: validate, short-circuit when inactive, decide
    /// sampling, encode, hand off to the transport. Transport failures
    /// are reported and contained to `Ok(false)`.
    fn send_one(
        &self,
        kind: MetricKind,
        key: &str,
        value: MetricValue,
        sample_rate: f64,
    ) -> Result<bool, MetricError> {
        if key.is_empty() {
            return Err(MetricError::InvalidArgument("key is empty"));
        }
        if !self.active {
            return Ok(false);
        }
        let (Some(config), Some(sink)) = (&self.config, &self.sink) else {
            return Ok(false);
        };
        if !should_send(sample_rate, self.sample_source.as_ref()) {
            return Ok(false);
        }
        let sample = MetricSample {
            kind,
            key,
            value,
            sample_rate,
        };
        let line = sample.encode(config.namespace());
        match sink.emit(&line) {
            Ok(_) => Ok(true),
            Err(err) => {
                let err = MetricError::Transport(err);
                debug!("Failed to send metric line, was: {err}");
                (self.errors)(&err);
                Ok(false)
            }
        }
    }

    fn inactive(errors: ErrorHandler, sample_source: Box<dyn SampleSource>) -> Self {
        Self {
            active: false,
            config: None,
            sink: None,
            sample_source,
            errors,
        }
    }

    fn report_inactive(err: MetricError, errors: ErrorHandler, sample_source: Box<dyn SampleSource>) -> Self {
        debug!("Disabling metrics client, was: {err}");
        (errors)(&err);
        Self::inactive(errors, sample_source)
    }
}

/// Builder for [StatlineClient].
///
/// [build](ClientBuilder::build) never fails and never panics: an empty
/// or absent connection string yields a silently inactive client, while a
/// parse, configuration or transport failure is reported through the
/// error handler and also yields an inactive client.
#[derive(Default)]
pub struct ClientBuilder {
    connection_string: Option<String>,
    sink: Option<Box<dyn MetricSink>>,
    sample_source: Option<Box<dyn SampleSource>>,
    errors: Option<ErrorHandler>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_string(mut self, value: impl Into<String>) -> Self {
        self.connection_string = Some(value.into());
        self
    }

    /// Install the error-notification callback, invoked synchronously for
    /// every caught construction or transport error. Without one, errors
    /// are logged at debug level and dropped.
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&MetricError) + Send + Sync + 'static,
    {
        self.errors = Some(std::sync::Arc::new(handler));
        self
    }

    /// Replace the UDP transport. Used by tests to intercept emission
    /// without network I/O; when set, no socket is constructed.
    pub fn with_sink<S: MetricSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Replace the sampling source, e.g. with a
    /// [SequenceSource](crate::sample::SequenceSource) for deterministic
    /// tests.
    pub fn with_sample_source<S: SampleSource + 'static>(mut self, source: S) -> Self {
        self.sample_source = Some(Box::new(source));
        self
    }

    pub fn build(self) -> StatlineClient {
        let errors = self.errors.unwrap_or_else(default_error_handler);
        let sample_source = self
            .sample_source
            .unwrap_or_else(|| Box::new(ThreadRngSource));
        let Some(connection_string) = self.connection_string.filter(|value| !value.is_empty()) else {
            return StatlineClient::inactive(errors, sample_source);
        };
        let descriptor = match ConnectionDescriptor::parse(&connection_string) {
            Ok(descriptor) => descriptor,
            Err(err) => return StatlineClient::report_inactive(err.into(), errors, sample_source),
        };
        let config = match ClientConfig::resolve(&descriptor) {
            Ok(config) => config,
            Err(err) => return StatlineClient::report_inactive(err, errors, sample_source),
        };
        let sink: Box<dyn MetricSink> = match self.sink {
            Some(sink) => sink,
            None => match UdpSink::connect(config.server_address()) {
                Ok(sink) => Box::new(sink),
                Err(err) => {
                    return StatlineClient::report_inactive(
                        MetricError::Transport(err),
                        errors,
                        sample_source,
                    )
                }
            },
        };
        StatlineClient {
            active: true,
            config: Some(config),
            sink: Some(sink),
            sample_source,
            errors,
        }
    }
}

#[cfg(test)]
mod test {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::sample::SequenceSource;
    use crate::sink::CaptureSink;

    const PLAIN: &str = "statsd://localhost:8125?application=App&usemachinenamefolder=false";

    fn capture_client(connection_string: &str) -> (StatlineClient, Arc<CaptureSink>) {
        let sink = Arc::new(CaptureSink::new());
        let client = StatlineClient::builder()
            .connection_string(connection_string)
            .with_sink(sink.clone())
            .build();
        (client, sink)
    }

    fn counting_handler() -> (Arc<AtomicUsize>, impl Fn(&MetricError) + Send + Sync) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        (count, move |_: &MetricError| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// Fails every send with an I/O error.
    struct FailingSink;

    impl MetricSink for FailingSink {
        fn emit(&self, _line: &str) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "daemon down"))
        }
    }

    #[test]
    fn test_missing_application_reports_one_error_and_deactivates() {
        let (count, handler) = counting_handler();
        let client = StatlineClient::builder()
            .connection_string("statsd://localhost:8125?environment=qa")
            .with_error_handler(handler)
            .build();
        assert!(!client.active());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_absent_connection_string_is_silently_inactive() {
        let (count, handler) = counting_handler();
        let client = StatlineClient::builder().with_error_handler(handler).build();
        assert!(!client.active());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let (count, handler) = counting_handler();
        let client = StatlineClient::builder()
            .connection_string("")
            .with_error_handler(handler)
            .build();
        assert!(!client.active());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_malformed_connection_string_reports_and_deactivates() {
        let (count, handler) = counting_handler();
        let client = StatlineClient::builder()
            .connection_string("not a connection string")
            .with_error_handler(handler)
            .build();
        assert!(!client.active());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_accessors_reflect_resolved_config() {
        let (client, _sink) = capture_client(PLAIN);
        assert!(client.active());
        assert_eq!(client.application_name(), Some("App"));
        assert_eq!(client.namespace(), Some("App"));
        assert!(!client.use_machine_name_folder());
        assert_eq!(client.server_address().unwrap().to_string(), "localhost:8125");
    }

    #[test]
    fn test_full_rate_sends_one_line_per_call() {
        let (client, sink) = capture_client(PLAIN);
        for _ in 0..10 {
            assert!(client.gauge("memory", 42.0, 1.0).unwrap());
        }
        assert_eq!(sink.lines().len(), 10);
        assert_eq!(sink.lines()[0], "App.memory:42|g");
    }

    #[test]
    fn test_zero_rate_never_sends() {
        let sink = Arc::new(CaptureSink::new());
        let client = StatlineClient::builder()
            .connection_string(PLAIN)
            .with_sink(sink.clone())
            .with_sample_source(SequenceSource::new(vec![0.7, 0.2, 0.0001]))
            .build();
        for _ in 0..100 {
            assert!(!client.increment(["hits"], 1, 0.0).unwrap());
        }
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_sampled_line_carries_the_rate_suffix() {
        let sink = Arc::new(CaptureSink::new());
        let client = StatlineClient::builder()
            .connection_string(PLAIN)
            .with_sink(sink.clone())
            .with_sample_source(SequenceSource::new(vec![0.1]))
            .build();
        assert!(client.increment(["hits"], 1, 0.5).unwrap());
        assert_eq!(sink.lines(), vec!["App.hits:1|c|@0.50".to_string()]);
    }

    #[test]
    fn test_batch_sampling_is_decided_per_key() {
        let sink = Arc::new(CaptureSink::new());
        let client = StatlineClient::builder()
            .connection_string(PLAIN)
            .with_sink(sink.clone())
            .with_sample_source(SequenceSource::new(vec![0.9, 0.1]))
            .build();
        // First draw misses the 0.5 rate, second hits: only "b" goes out.
        assert!(client.increment(["a", "b"], 1, 0.5).unwrap());
        assert_eq!(sink.lines(), vec!["App.b:1|c|@0.50".to_string()]);
    }

    #[test]
    fn test_decrement_normalizes_the_sign_exactly_once() {
        let (client, sink) = capture_client(PLAIN);
        client.decrement(["logins"], 3, 1.0).unwrap();
        client.decrement(["logins"], -3, 1.0).unwrap();
        assert_eq!(
            sink.lines(),
            vec!["App.logins:-3|c".to_string(), "App.logins:-3|c".to_string()]
        );
    }

    #[test]
    fn test_increment_emits_one_line_per_key() {
        let (client, sink) = capture_client(PLAIN);
        assert!(client.increment(["a", "b", "c"], 2, 1.0).unwrap());
        assert_eq!(
            sink.lines(),
            vec![
                "App.a:2|c".to_string(),
                "App.b:2|c".to_string(),
                "App.c:2|c".to_string()
            ]
        );
    }

    #[test]
    fn test_key_colons_are_stripped_before_encoding() {
        let (client, sink) = capture_client(PLAIN);
        client.gauge("a:b", 1.0, 1.0).unwrap();
        assert_eq!(sink.lines(), vec!["App.ab:1|g".to_string()]);
    }

    #[test]
    fn test_inactive_client_is_a_complete_no_op() {
        let sink = Arc::new(CaptureSink::new());
        let client = StatlineClient::builder()
            .connection_string("statsd://localhost:8125?environment=qa")
            .with_sink(sink.clone())
            .build();
        assert!(!client.active());
        assert!(!client.gauge("g", 1.0, 1.0).unwrap());
        assert!(!client.timing("t", 5, 1.0).unwrap());
        assert!(!client.increment(["c"], 1, 1.0).unwrap());
        assert!(!client.decrement(["c"], 1, 1.0).unwrap());
        assert!(!client.incr("c").unwrap());
        assert!(!client.decr("c").unwrap());
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_empty_key_is_an_invalid_argument() {
        let (client, sink) = capture_client(PLAIN);
        assert!(matches!(
            client.gauge("", 1.0, 1.0),
            Err(MetricError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.increment(Vec::<&str>::new(), 1, 1.0),
            Err(MetricError::InvalidArgument(_))
        ));
        // A bad key anywhere in the batch fails before anything is sent.
        assert!(client.increment(["ok", ""], 1, 1.0).is_err());
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_transport_failure_is_contained_and_reported() {
        let (count, handler) = counting_handler();
        let client = StatlineClient::builder()
            .connection_string(PLAIN)
            .with_sink(FailingSink)
            .with_error_handler(handler)
            .build();
        assert!(client.active());
        assert!(!client.gauge("g", 1.0, 1.0).unwrap());
        assert!(!client.incr("c").unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        // A failed send does not retroactively deactivate the client.
        assert!(client.active());
    }

    #[test]
    fn test_client_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StatlineClient>();

        let client = Arc::new(capture_client(PLAIN).0);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let client = client.clone();
                std::thread::spawn(move || client.incr("shared").unwrap())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }

    #[test]
    fn test_timing_encodes_milliseconds() {
        let (client, sink) = capture_client(PLAIN);
        assert!(client.timing("db.query", 250, 1.0).unwrap());
        assert_eq!(sink.lines(), vec!["App.db.query:250|ms".to_string()]);
    }
}
