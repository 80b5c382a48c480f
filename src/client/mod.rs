//! Time fetch orchestration
//!
//! [`TimeClient`] drives a run: hosts are processed strictly in order, and for
//! each host the resolved endpoints are tried one after another until one
//! answers. Nothing is attempted concurrently.

use std::ops::ControlFlow;

use tracing::{debug, trace, warn};

use crate::core::{Config, Error, HostResult, Result, RunSummary, TimeSample};
use crate::network::{Fetch, NetworkFetcher, Resolve, SystemResolver};

/// RFC 868 client
///
/// Generic over its resolver and fetcher so the fallback policy can be
/// exercised without a network.
pub struct TimeClient<R = SystemResolver, F = NetworkFetcher> {
    config: Config,
    resolver: R,
    fetcher: F,
}

impl TimeClient {
    /// Creates a client that uses the system resolver and real sockets
    pub fn new(config: Config) -> Self {
        TimeClient::with_parts(config, SystemResolver::new(), NetworkFetcher::new())
    }
}

impl<R, F> TimeClient<R, F>
where
    R: Resolve,
    F: Fetch,
{
    /// Creates a client from explicit parts
    pub fn with_parts(config: Config, resolver: R, fetcher: F) -> Self {
        TimeClient {
            config,
            resolver,
            fetcher,
        }
    }

    /// Returns the run configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetches the time from one host
    ///
    /// A resolution failure ends the host immediately without opening any
    /// socket. Otherwise endpoints are tried in resolver order; the first
    /// success is returned and the remaining endpoints are never contacted.
    /// When every endpoint fails, the last failure is returned.
    ///
    /// Every failure except the one returned is logged at `WARN` as soon as
    /// the next endpoint is tried, so each failed attempt is reported once.
    pub async fn fetch_host_time(&self, host: &str) -> Result<TimeSample> {
        let endpoints = self
            .resolver
            .resolve(host, &self.config.service, self.config.transport)
            .await?;

        let timeout = self.config.timeout();
        let mut last_failure: Option<Error> = None;

        for endpoint in endpoints {
            if let Some(e) = last_failure.take() {
                warn!(host, "{}", e);
            }

            trace!(host, %endpoint, "trying endpoint");
            match self.fetcher.fetch(&endpoint, timeout).await {
                Ok(payload) => {
                    let sample = TimeSample::from_payload(payload, endpoint);
                    debug!(host, %endpoint, secs = sample.unix_secs(), "got time");
                    return Ok(sample);
                }
                Err(e) => {
                    debug!(host, %endpoint, kind = ?e.kind(), "attempt failed");
                    last_failure = Some(e);
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| Error::resolution(host, "no addresses found")))
    }

    /// Queries every host in order and collects one result per host
    pub async fn run<I, S>(&self, hosts: I) -> RunSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run_with(hosts, |_| ControlFlow::Continue(())).await
    }

    /// Like [`run`](Self::run), handing each result to `on_result` as soon as
    /// its host completes
    ///
    /// Returning `ControlFlow::Break` from the callback stops the run; hosts
    /// after that point are not queried and do not appear in the summary.
    pub async fn run_with<I, S, C>(&self, hosts: I, mut on_result: C) -> RunSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        C: FnMut(&HostResult) -> ControlFlow<()>,
    {
        let mut summary = RunSummary::new();

        for host in hosts {
            let host = host.as_ref();
            let result = HostResult::new(host, self.fetch_host_time(host).await);
            let flow = on_result(&result);
            summary.push(result);

            if flow.is_break() {
                debug!(host, "run stopped early");
                break;
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Endpoint, FailureKind, Transport};
    use crate::protocol::{self, Payload};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Resolver answering from a fixed table
    #[derive(Default)]
    struct ScriptedResolver {
        table: HashMap<String, Vec<SocketAddr>>,
    }

    impl ScriptedResolver {
        fn with(mut self, host: &str, addrs: &[&str]) -> Self {
            let addrs = addrs.iter().map(|a| a.parse().unwrap()).collect();
            self.table.insert(host.to_string(), addrs);
            self
        }
    }

    #[async_trait]
    impl Resolve for ScriptedResolver {
        async fn resolve(
            &self,
            host: &str,
            _service: &str,
            transport: Transport,
        ) -> Result<Vec<Endpoint>> {
            match self.table.get(host) {
                Some(addrs) => Ok(addrs
                    .iter()
                    .map(|&a| Endpoint::new(a, transport))
                    .collect()),
                None => Err(Error::resolution(host, "Name or service not known")),
            }
        }
    }

    /// Fetcher that answers for some addresses and refuses the rest,
    /// recording every attempt
    #[derive(Default, Clone)]
    struct ScriptedFetcher {
        answers: HashMap<SocketAddr, Payload>,
        attempts: Arc<Mutex<Vec<Endpoint>>>,
    }

    impl ScriptedFetcher {
        fn answering(mut self, addr: &str, unix_secs: i64) -> Self {
            let payload = protocol::from_unix_secs(unix_secs).unwrap();
            self.answers.insert(addr.parse().unwrap(), payload);
            self
        }

        fn attempts(&self) -> Vec<SocketAddr> {
            self.attempts.lock().unwrap().iter().map(Endpoint::addr).collect()
        }
    }

    #[async_trait]
    impl Fetch for ScriptedFetcher {
        async fn fetch(&self, endpoint: &Endpoint, timeout: Option<Duration>) -> Result<Payload> {
            self.attempts.lock().unwrap().push(*endpoint);
            let addr = endpoint.addr();
            match self.answers.get(&addr) {
                Some(payload) => Ok(*payload),
                None if addr.is_ipv6() => Err(Error::timeout(
                    addr,
                    endpoint.transport(),
                    timeout.unwrap_or_default(),
                )),
                None => Err(Error::connect(
                    addr,
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "Connection refused",
                    ),
                )),
            }
        }
    }

    fn client(
        resolver: ScriptedResolver,
        fetcher: ScriptedFetcher,
    ) -> TimeClient<ScriptedResolver, ScriptedFetcher> {
        TimeClient::with_parts(Config::default(), resolver, fetcher)
    }

    #[tokio::test]
    async fn test_resolution_failure_attempts_nothing() {
        let fetcher = ScriptedFetcher::default();
        let client = client(ScriptedResolver::default(), fetcher.clone());

        let err = client.fetch_host_time("nowhere.example").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Resolution);
        assert!(fetcher.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_zero_endpoints_is_resolution_failure() {
        let fetcher = ScriptedFetcher::default();
        let resolver = ScriptedResolver::default().with("empty.example", &[]);
        let client = client(resolver, fetcher.clone());

        let err = client.fetch_host_time("empty.example").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Resolution);
        assert!(fetcher.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_second_endpoint_success_short_circuits() {
        let fetcher = ScriptedFetcher::default().answering("10.0.0.2:37", 1_700_000_000);
        let resolver = ScriptedResolver::default().with(
            "multi.example",
            &["10.0.0.1:37", "10.0.0.2:37", "10.0.0.3:37"],
        );
        let client = client(resolver, fetcher.clone());

        let sample = client.fetch_host_time("multi.example").await.unwrap();
        assert_eq!(sample.unix_secs(), 1_700_000_000);
        assert_eq!(sample.endpoint().addr(), "10.0.0.2:37".parse().unwrap());

        let tried: Vec<SocketAddr> = vec![
            "10.0.0.1:37".parse().unwrap(),
            "10.0.0.2:37".parse().unwrap(),
        ];
        assert_eq!(fetcher.attempts(), tried);
    }

    #[tokio::test]
    async fn test_all_endpoints_fail_reports_last_failure() {
        let fetcher = ScriptedFetcher::default();
        let resolver = ScriptedResolver::default()
            .with("down.example", &["10.0.0.1:37", "[2001:db8::1]:37"]);
        let client = client(resolver, fetcher.clone());

        let err = client.fetch_host_time("down.example").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Timeout);
        assert_eq!(err.endpoint(), Some("[2001:db8::1]:37".parse().unwrap()));
        assert_eq!(fetcher.attempts().len(), 2);
    }

    /// Records the level and message of every event
    #[derive(Clone, Default)]
    struct Events(Arc<Mutex<Vec<(tracing::Level, String)>>>);

    impl Events {
        fn warnings(&self) -> Vec<String> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|(level, _)| *level == tracing::Level::WARN)
                .map(|(_, message)| message.clone())
                .collect()
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Events {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            struct Message(String);

            impl tracing::field::Visit for Message {
                fn record_debug(
                    &mut self,
                    field: &tracing::field::Field,
                    value: &dyn std::fmt::Debug,
                ) {
                    if field.name() == "message" {
                        self.0 = format!("{:?}", value);
                    }
                }
            }

            let mut message = Message(String::new());
            event.record(&mut message);
            self.0
                .lock()
                .unwrap()
                .push((*event.metadata().level(), message.0));
        }
    }

    fn capture_events() -> (Events, tracing::subscriber::DefaultGuard) {
        use tracing_subscriber::layer::SubscriberExt;

        let events = Events::default();
        let subscriber = tracing_subscriber::registry().with(events.clone());
        (events, tracing::subscriber::set_default(subscriber))
    }

    #[tokio::test]
    async fn test_each_superseded_failure_is_warned() {
        let resolver = ScriptedResolver::default().with(
            "flaky.example",
            &["10.0.0.1:37", "[2001:db8::1]:37", "10.0.0.3:37"],
        );
        let client = client(resolver, ScriptedFetcher::default());
        let (events, _guard) = capture_events();

        let err = client.fetch_host_time("flaky.example").await.unwrap_err();

        // The returned failure is left to the per-host report
        assert_eq!(err.endpoint(), Some("10.0.0.3:37".parse().unwrap()));
        assert_eq!(
            events.warnings(),
            [
                "connect to address 10.0.0.1:37: Connection refused",
                "timed out connecting to [2001:db8::1]:37 after 10 seconds.",
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_before_success_is_warned() {
        let fetcher = ScriptedFetcher::default().answering("10.0.0.2:37", 0);
        let resolver =
            ScriptedResolver::default().with("multi.example", &["10.0.0.1:37", "10.0.0.2:37"]);
        let client = client(resolver, fetcher);
        let (events, _guard) = capture_events();

        client.fetch_host_time("multi.example").await.unwrap();

        assert_eq!(
            events.warnings(),
            ["connect to address 10.0.0.1:37: Connection refused"]
        );
    }

    #[tokio::test]
    async fn test_single_failure_is_not_warned_twice() {
        let resolver = ScriptedResolver::default().with("one.example", &["10.0.0.1:37"]);
        let client = client(resolver, ScriptedFetcher::default());
        let (events, _guard) = capture_events();

        client.fetch_host_time("one.example").await.unwrap_err();

        assert!(events.warnings().is_empty());
    }

    #[tokio::test]
    async fn test_endpoints_carry_configured_transport() {
        let fetcher = ScriptedFetcher::default().answering("10.0.0.1:37", 0);
        let resolver = ScriptedResolver::default().with("udp.example", &["10.0.0.1:37"]);
        let config = Config {
            transport: Transport::Datagram,
            ..Config::default()
        };
        let client = TimeClient::with_parts(config, resolver, fetcher.clone());

        let sample = client.fetch_host_time("udp.example").await.unwrap();
        assert_eq!(sample.endpoint().transport(), Transport::Datagram);
        assert_eq!(client.config().transport, Transport::Datagram);
    }

    #[tokio::test]
    async fn test_run_preserves_order_and_continues_past_failures() {
        let fetcher = ScriptedFetcher::default().answering("10.0.0.1:37", 1_600_000_000);
        let resolver = ScriptedResolver::default().with("good.example", &["10.0.0.1:37"]);
        let client = client(resolver, fetcher);

        let summary = client.run(["good.example", "bad.example"]).await;

        assert!(summary.any_succeeded());
        let hosts: Vec<_> = summary.results().iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, ["good.example", "bad.example"]);
        assert!(summary.results()[0].is_success());
        assert!(!summary.results()[1].is_success());

        let summary = client.run(["bad.example", "good.example"]).await;
        assert_eq!(summary.len(), 2);
        assert_eq!(summary.first_success().map(|(h, _)| h), Some("good.example"));
    }

    #[tokio::test]
    async fn test_run_all_failed() {
        let client = client(ScriptedResolver::default(), ScriptedFetcher::default());

        let summary = client.run(vec!["a.example".to_string(), "b.example".to_string()]).await;
        assert_eq!(summary.len(), 2);
        assert!(!summary.any_succeeded());
    }

    #[tokio::test]
    async fn test_run_with_stops_on_break() {
        let fetcher = ScriptedFetcher::default().answering("10.0.0.1:37", 1_600_000_000);
        let resolver = ScriptedResolver::default()
            .with("first.example", &["10.0.0.1:37"])
            .with("second.example", &["10.0.0.1:37"]);
        let client = client(resolver, fetcher.clone());

        let mut seen = Vec::new();
        let summary = client
            .run_with(["bad.example", "first.example", "second.example"], |result| {
                seen.push(result.host.clone());
                if result.is_success() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await;

        assert_eq!(seen, ["bad.example", "first.example"]);
        assert_eq!(summary.len(), 2);
        assert_eq!(fetcher.attempts().len(), 1);
    }

    #[tokio::test]
    async fn test_end_to_end_against_local_server() {
        use tokio::io::AsyncWriteExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(&[0x83, 0xaa, 0x7e, 0x80]).await.unwrap();
        });

        let config = Config {
            service: port.to_string(),
            timeout_secs: 5,
            ..Config::default()
        };
        let summary = TimeClient::new(config).run(["127.0.0.1"]).await;

        let (host, sample) = summary.first_success().unwrap();
        assert_eq!(host, "127.0.0.1");
        // 0x83aa7e80 is the RFC 868 example for 1970-01-01T00:00:00Z
        assert_eq!(sample.unix_secs(), 0);
    }
}
