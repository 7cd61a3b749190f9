//! Test Registry (C6) and the `TestContext` test bodies run against.
//!
//! Grounded on the teacher's builder pattern (`Client::builder()` /
//! `Server::builder()`, `src/client/conn/http1.rs`): a `Suite` is built
//! with a fluent `.test(...)` builder that records each `TestCase` at
//! registration time, the same way the teacher's builders accumulate
//! configuration before a final `build()`/`handshake()` call. There is no
//! proc-macro magic and no global registration list — spec.md §9's design
//! note on "Fixture decorator as test builder" calls for a two-field
//! record `{fixture_ref, param_map, body}` registered at module load; here
//! that's simply a `Vec<TestCase>` built once per `Suite` and never
//! mutated afterward.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Result;
use crate::probe::{ProbeDriver, ProbeParams};
use crate::report::Report;
use crate::transport::Transport;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The object a test body receives: a live handle to the `ProbeDriver` plus
/// the in-progress `Report` for this test (spec.md §9, "Chained probes
/// within one test").
pub struct TestContext {
    driver: ProbeDriver,
    conn: Option<Transport>,
    default_fixture: String,
    default_params: HashMap<String, String>,
    pub report: Report,
}

impl TestContext {
    pub(crate) fn new(
        driver: ProbeDriver,
        report: Report,
        default_fixture: String,
        default_params: HashMap<String, String>,
    ) -> Self {
        TestContext {
            driver,
            conn: None,
            default_fixture,
            default_params,
            report,
        }
    }

    /// Runs the test's primary fixture binding — the `{fixture_ref,
    /// param_map}` a test is registered with via `Suite::test` (spec.md
    /// §9, "Fixture decorator as test builder") — as the first probe. Most
    /// test bodies call this once at the top, then chain further
    /// `probe()` calls of their own for any follow-up requests.
    pub async fn probe_default(&mut self) -> Report {
        let fixture = self.default_fixture.clone();
        let params = ProbeParams {
            params: self.default_params.clone(),
            keep_alive: false,
        };
        self.probe(&fixture, params).await
    }

    /// Runs one probe and merges it into `self.report` using the typical
    /// policy spec.md §9 describes ("raw headers and notes are typically
    /// concatenated, payload replaced"). A test body that needs a
    /// different merge can read the returned standalone `Report` instead
    /// and assign fields onto `self.report` itself.
    pub async fn probe(&mut self, fixture_name: &str, params: ProbeParams) -> Report {
        let mut probe_report = Report::new(
            self.report.id.clone(),
            self.report.suite.clone(),
            self.report.description.clone(),
        );
        let conn = self.conn.take();
        self.conn = self
            .driver
            .probe(fixture_name, &params, conn, &mut probe_report)
            .await;

        if self.report.request.raw.is_empty() {
            self.report.request.raw = probe_report.request.raw.clone();
        } else {
            self.report.request.raw.push_str("\n---\n");
            self.report.request.raw.push_str(&probe_report.request.raw);
        }
        self.report.notes.extend(probe_report.notes.clone());
        self.report.errors.extend(probe_report.errors.clone());
        self.report.response = probe_report.response.clone();

        probe_report
    }

    /// Sleeps `lifetime_timeout + 1s` on the currently held connection, for
    /// the long-lived-connection idle-timeout scenario (spec.md §5,
    /// §8.e). Does nothing if no connection is currently held.
    pub async fn sleep_past_lifetime(&self) {
        if let Some(conn) = &self.conn {
            self.driver.sleep_lifetime_plus_one(conn).await;
        }
    }

    pub fn has_open_connection(&self) -> bool {
        self.conn.is_some()
    }
}

type TestBodyFn = Arc<dyn for<'ctx> Fn(&'ctx mut TestContext) -> BoxFuture<'ctx, Result<()>> + Send + Sync>;

/// One registered test: identity, fixture binding, and body. The
/// `declared_index` is assigned at registration time and is what ordering
/// is sorted by — never map/hashing order (spec.md §9, "Tests as ordered
/// declarations").
#[derive(Clone)]
pub struct TestCase {
    pub id: String,
    pub description: String,
    pub fixture_name: String,
    pub default_params: HashMap<String, String>,
    pub declared_index: usize,
    body: TestBodyFn,
}

impl TestCase {
    /// The numeric batch prefix of this test's id, if its id is of the
    /// form `test_<batch>_<name>` and `<batch>` parses as an integer
    /// (spec.md §3, "Suite"/"batch").
    pub fn batch(&self) -> Option<u32> {
        let rest = self.id.strip_prefix("test_")?;
        let (head, _) = rest.split_once('_')?;
        head.parse().ok()
    }

    pub(crate) async fn run(&self, ctx: &mut TestContext) -> Result<()> {
        (self.body)(ctx).await
    }
}

/// A named grouping of `TestCase`s sharing a fixture directory and
/// user-agent template (spec.md §3, "Suite").
pub struct Suite {
    name: String,
    fixture_dir: std::path::PathBuf,
    user_agent: String,
    cases: Vec<TestCase>,
}

impl Suite {
    pub fn new(name: impl Into<String>, fixture_dir: impl Into<std::path::PathBuf>, user_agent: impl Into<String>) -> Self {
        Suite {
            name: name.into(),
            fixture_dir: fixture_dir.into(),
            user_agent: user_agent.into(),
            cases: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fixture_dir(&self) -> &std::path::Path {
        &self.fixture_dir
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Registers one test. `id` must be `test_<name>` or
    /// `test_<batch>_<name>` (spec.md §3, "TestCase"). The declaration
    /// index is taken from this call's position, so the inner test
    /// declaration's order is preserved even if a caller wraps this in its
    /// own decorator-like helper (spec.md §9).
    pub fn test<F>(
        mut self,
        id: impl Into<String>,
        description: impl Into<String>,
        fixture_name: impl Into<String>,
        default_params: HashMap<String, String>,
        body: F,
    ) -> Self
    where
        F: for<'ctx> Fn(&'ctx mut TestContext) -> BoxFuture<'ctx, Result<()>> + Send + Sync + 'static,
    {
        let declared_index = self.cases.len();
        self.cases.push(TestCase {
            id: id.into(),
            description: description.into(),
            fixture_name: fixture_name.into(),
            default_params,
            declared_index,
            body: Arc::new(body),
        });
        self
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }
}

/// Discovers and orders tests across one or more suites (spec.md §4.6).
/// Suites register themselves under their (lowercased) name.
#[derive(Default)]
pub struct TestRegistry {
    suites: HashMap<String, Suite>,
    suite_order: Vec<String>,
}

impl TestRegistry {
    pub fn new() -> Self {
        TestRegistry::default()
    }

    pub fn register(&mut self, suite: Suite) {
        let key = suite.name().to_lowercase();
        if !self.suites.contains_key(&key) {
            self.suite_order.push(key.clone());
        }
        self.suites.insert(key, suite);
    }

    pub fn suite(&self, name: &str) -> Option<&Suite> {
        self.suites.get(&name.to_lowercase())
    }

    pub fn suites(&self) -> impl Iterator<Item = &Suite> {
        self.suite_order.iter().filter_map(move |k| self.suites.get(k))
    }

    /// Finds a test by id across every registered suite.
    pub fn find(&self, id: &str) -> Option<(&Suite, &TestCase)> {
        for suite in self.suites() {
            if let Some(case) = suite.cases().iter().find(|c| c.id == id) {
                return Some((suite, case));
            }
        }
        None
    }

    /// Lists every registered test id, in suite-registration then
    /// declaration order (spec.md §4.7, "Ordering").
    pub fn list(&self) -> Vec<String> {
        let mut ids = Vec::new();
        for suite in self.suites() {
            let mut cases: Vec<&TestCase> = suite.cases().iter().collect();
            cases.sort_by_key(|c| c.declared_index);
            ids.extend(cases.into_iter().map(|c| c.id.clone()));
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_body() -> impl for<'ctx> Fn(&'ctx mut TestContext) -> BoxFuture<'ctx, Result<()>> + Send + Sync + 'static {
        |_ctx: &mut TestContext| Box::pin(async { Ok(()) })
    }

    #[test]
    fn declared_index_follows_registration_order_not_id_text() {
        let suite = Suite::new("demo", "/fixtures/demo", "ua")
            .test("test_9_last", "d", "f.txt", HashMap::new(), noop_body())
            .test("test_1_first", "d", "f.txt", HashMap::new(), noop_body());
        let ids: Vec<&str> = suite.cases().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["test_9_last", "test_1_first"]);
        assert_eq!(suite.cases()[0].declared_index, 0);
        assert_eq!(suite.cases()[1].declared_index, 1);
    }

    #[test]
    fn batch_extraction() {
        let suite = Suite::new("demo", "/fixtures/demo", "ua").test(
            "test_2_fairlane",
            "d",
            "f.txt",
            HashMap::new(),
            noop_body(),
        );
        assert_eq!(suite.cases()[0].batch(), Some(2));

        let suite2 = Suite::new("demo", "/fixtures/demo", "ua").test(
            "test_no_batch",
            "d",
            "f.txt",
            HashMap::new(),
            noop_body(),
        );
        assert_eq!(suite2.cases()[0].batch(), None);
    }

    #[test]
    fn registry_lists_in_declaration_order() {
        let mut registry = TestRegistry::new();
        registry.register(
            Suite::new("demo", "/fixtures", "ua")
                .test("test_1_a", "d", "f.txt", HashMap::new(), noop_body())
                .test("test_2_b", "d", "f.txt", HashMap::new(), noop_body()),
        );
        assert_eq!(registry.list(), vec!["test_1_a", "test_2_b"]);
    }
}
