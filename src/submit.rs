//! Chunked profile submission.
//!
//! Profiles are split into contiguous chunks of at most `chunk_size` records
//! and POSTed to `/api/profile/` one chunk per request:
//!
//! ```text
//! records ──▶ [0..k) ──POST──▶ sleep ──▶ [k..2k) ──POST──▶ sleep ──▶ ... ──▶ [..n)
//! ```
//!
//! A [`Submission`] is a single-pass producer. Each call to
//! [`Submission::next`] sends exactly one chunk and waits for its response.
//! The pause runs *before* every chunk except the first, so nothing sleeps
//! after the last chunk and abandoning the submission early skips the
//! remaining pauses too.
//!
//! A non-2xx response ends the run: the error is yielded once and the
//! submission is exhausted afterwards. Chunks already accepted stay
//! accepted; nothing is retried or rolled back.

use serde::Serialize;
use std::ops::Range;
use tracing::{debug, info};
use url::Url;

use crate::client::QuickPin;
use crate::config::SubmitOptions;
use crate::error::{check_status, QpiError, Result};
use crate::models::{IdentityKind, ProfileRecord, Site};
use crate::normalize::{normalize_profiles, LabelMap};
use crate::progress::{NoProgress, SubmitProgressEvent, SubmitProgressReporter};

pub(crate) const PROFILE_PATH: &str = "api/profile/";

/// Index ranges partitioning `len` items into groups of at most `size`.
///
/// Ranges are contiguous, in order, and cover `0..len` exactly; only the last
/// may be shorter than `size`. `size` must be at least 1.
pub(crate) fn chunk_ranges(len: usize, size: usize) -> Vec<Range<usize>> {
    assert!(size >= 1, "chunk size must be >= 1");
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

/// Server response for one chunk.
#[derive(Debug, Clone)]
pub struct SubmissionResult {
    /// 0-based chunk position.
    pub chunk: usize,
    /// Record indices covered by this chunk.
    pub range: Range<usize>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl SubmissionResult {
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// What an eagerly collected submission produced.
#[derive(Debug)]
pub struct SubmitOutcome {
    /// Results of every chunk the server accepted, in chunk order.
    pub completed: Vec<SubmissionResult>,
    /// The failure that stopped the run, if any.
    pub error: Option<QpiError>,
}

impl SubmitOutcome {
    pub fn into_result(self) -> Result<Vec<SubmissionResult>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.completed),
        }
    }
}

#[derive(Serialize)]
struct ProfilePayload<'a> {
    profiles: &'a [ProfileRecord],
    stub: bool,
}

/// In-progress submission. Obtain one from [`QuickPin::submit_profiles`].
pub struct Submission<'a> {
    client: &'a QuickPin,
    url: Url,
    records: Vec<ProfileRecord>,
    ranges: Vec<Range<usize>>,
    options: SubmitOptions,
    next_chunk: usize,
    failed: bool,
    reporter: Box<dyn SubmitProgressReporter>,
}

impl<'a> Submission<'a> {
    pub fn with_progress(mut self, reporter: Box<dyn SubmitProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn total_chunks(&self) -> usize {
        self.ranges.len()
    }

    pub fn total_records(&self) -> usize {
        self.records.len()
    }

    /// Send the next chunk. `None` once every chunk is sent or after an error.
    pub async fn next(&mut self) -> Option<Result<SubmissionResult>> {
        if self.failed || self.next_chunk >= self.ranges.len() {
            return None;
        }

        let chunk = self.next_chunk;
        let range = self.ranges[chunk].clone();
        self.next_chunk += 1;

        if chunk > 0 && self.options.interval_secs > 0 {
            self.reporter.report(SubmitProgressEvent::Waiting {
                secs: self.options.interval_secs,
            });
            tokio::time::sleep(self.options.interval()).await;
        }

        match self.send_chunk(chunk, range).await {
            Ok(result) => Some(Ok(result)),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    async fn send_chunk(&self, chunk: usize, range: Range<usize>) -> Result<SubmissionResult> {
        let chunks = self.ranges.len();
        self.reporter.report(SubmitProgressEvent::Requesting {
            chunk: chunk + 1,
            chunks,
            start: range.start,
            end: range.end,
            total: self.records.len(),
        });
        info!(chunk = chunk + 1, chunks, start = range.start, end = range.end, "submitting profiles");

        let payload = ProfilePayload {
            profiles: &self.records[range.clone()],
            stub: self.options.stub,
        };
        let response = self
            .client
            .http()
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await?;
        let response = check_status(response).await?;
        let body = response.bytes().await?.to_vec();
        debug!(chunk = chunk + 1, bytes = body.len(), "chunk accepted");

        self.reporter
            .report(SubmitProgressEvent::Accepted { chunk: chunk + 1, chunks });
        Ok(SubmissionResult { chunk, range, body })
    }

    /// Drive the submission to the end, keeping whatever completed before a failure.
    pub async fn collect_all(mut self) -> SubmitOutcome {
        let mut completed = Vec::with_capacity(self.ranges.len());
        while let Some(item) = self.next().await {
            match item {
                Ok(result) => completed.push(result),
                Err(e) => {
                    return SubmitOutcome {
                        completed,
                        error: Some(e),
                    }
                }
            }
        }
        SubmitOutcome {
            completed,
            error: None,
        }
    }
}

impl QuickPin {
    /// Prepare a chunked submission of already-built records. Nothing is sent
    /// until [`Submission::next`] is awaited.
    pub fn submit_profiles(
        &self,
        records: Vec<ProfileRecord>,
        options: SubmitOptions,
    ) -> Result<Submission<'_>> {
        options.validate()?;
        let url = self.endpoint(PROFILE_PATH)?;
        let ranges = chunk_ranges(records.len(), options.chunk_size);
        Ok(Submission {
            client: self,
            url,
            records,
            ranges,
            options,
            next_chunk: 0,
            failed: false,
            reporter: Box::new(NoProgress),
        })
    }

    /// Submit profiles identified by username.
    pub fn submit_usernames<S: AsRef<str>>(
        &self,
        usernames: &[S],
        site: Site,
        labels: Option<&LabelMap>,
        options: SubmitOptions,
    ) -> Result<Submission<'_>> {
        let records = normalize_profiles(usernames, site, IdentityKind::Username, labels)?;
        self.submit_profiles(records, options)
    }

    /// Submit profiles identified by the site's own user ID.
    pub fn submit_user_ids<S: AsRef<str>>(
        &self,
        user_ids: &[S],
        site: Site,
        labels: Option<&LabelMap>,
        options: SubmitOptions,
    ) -> Result<Submission<'_>> {
        let records = normalize_profiles(user_ids, site, IdentityKind::UpstreamId, labels)?;
        self.submit_profiles(records, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Auth, Token};
    use crate::config::ClientConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn opts(chunk_size: usize) -> SubmitOptions {
        SubmitOptions {
            stub: false,
            chunk_size,
            interval_secs: 0,
        }
    }

    async fn client_for(server: &MockServer) -> QuickPin {
        QuickPin::connect(
            ClientConfig::new(server.uri()),
            Auth::Token(Token::new("abc123")),
        )
        .await
        .unwrap()
    }

    #[test]
    fn chunk_ranges_partition_exactly() {
        for n in 0..40usize {
            for k in 1..12usize {
                let ranges = chunk_ranges(n, k);
                assert_eq!(ranges.len(), n.div_ceil(k), "n={} k={}", n, k);
                let mut expected_start = 0;
                for (i, r) in ranges.iter().enumerate() {
                    assert_eq!(r.start, expected_start);
                    if i + 1 < ranges.len() {
                        assert_eq!(r.len(), k);
                    } else {
                        assert!(r.len() >= 1 && r.len() <= k);
                    }
                    expected_start = r.end;
                }
                assert_eq!(expected_start, n);
            }
        }
    }

    #[test]
    #[should_panic]
    fn chunk_ranges_zero_size_panics() {
        chunk_ranges(3, 0);
    }

    #[tokio::test]
    async fn one_post_per_chunk_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/profile/"))
            .and(header("X-Auth", "abc123"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({"message": "ok"})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let results = client
            .submit_usernames(&["hyperiongray", "darpa"], Site::Twitter, None, opts(1))
            .unwrap()
            .collect_all()
            .await
            .into_result()
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].range, 0..1);
        assert_eq!(results[1].range, 1..2);
        assert_eq!(results[0].json().unwrap(), json!({"message": "ok"}));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let first: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(
            first,
            json!({"profiles": [{"username": "hyperiongray", "site": "twitter", "labels": []}], "stub": false})
        );
        assert_eq!(second["profiles"][0]["username"], "darpa");
        assert_eq!(second["profiles"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn user_ids_and_stub_flag_reach_the_wire() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/profile/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let options = SubmitOptions {
            stub: true,
            chunk_size: 2,
            interval_secs: 0,
        };
        let outcome = client
            .submit_user_ids(&["1", "2", "3"], Site::Instagram, None, options)
            .unwrap()
            .collect_all()
            .await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.completed.len(), 2);

        let requests = server.received_requests().await.unwrap();
        let first: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(first["stub"], true);
        assert_eq!(first["profiles"].as_array().unwrap().len(), 2);
        assert_eq!(first["profiles"][0]["upstream_id"], "1");
        assert_eq!(first["profiles"][0]["site"], "instagram");
        let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(second["profiles"].as_array().unwrap().len(), 1);
        assert_eq!(second["profiles"][0]["upstream_id"], "3");
    }

    #[tokio::test]
    async fn failure_mid_run_stops_before_next_chunk() {
        let server = MockServer::start().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        Mock::given(method("POST"))
            .and(path("/api/profile/"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                match calls_clone.fetch_add(1, Ordering::SeqCst) {
                    1 => ResponseTemplate::new(500).set_body_string("boom"),
                    _ => ResponseTemplate::new(200).set_body_string("accepted"),
                }
            })
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let outcome = client
            .submit_usernames(&["a", "b", "c"], Site::Twitter, None, opts(1))
            .unwrap()
            .collect_all()
            .await;

        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(outcome.completed[0].text(), "accepted");
        match outcome.error {
            Some(QpiError::Http { status, ref body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            ref other => panic!("expected HTTP error, got {:?}", other),
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn lazy_submission_is_exhausted_after_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/profile/"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let mut submission = client
            .submit_usernames(&["a", "b"], Site::Twitter, None, opts(1))
            .unwrap();
        assert_eq!(submission.total_chunks(), 2);
        assert!(matches!(submission.next().await, Some(Err(QpiError::Http { status: 403, .. }))));
        assert!(submission.next().await.is_none());
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn nothing_sent_until_polled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let submission = client
            .submit_usernames(&["a"], Site::Twitter, None, opts(1))
            .unwrap();
        assert_eq!(submission.total_records(), 1);
        drop(submission);
    }

    #[tokio::test]
    async fn empty_input_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let empty: [&str; 0] = [];
        let result = client.submit_usernames(&empty, Site::Twitter, None, opts(1));
        assert!(matches!(result, Err(QpiError::EmptyInput)));
    }

    #[tokio::test]
    async fn zero_chunk_size_rejected() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;
        let result = client.submit_usernames(&["a"], Site::Twitter, None, opts(0));
        assert!(matches!(result, Err(QpiError::Config(_))));
    }

    #[tokio::test]
    async fn interval_separates_chunks_but_not_the_tail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let options = SubmitOptions {
            stub: false,
            chunk_size: 1,
            interval_secs: 1,
        };
        let started = Instant::now();
        let outcome = client
            .submit_usernames(&["a", "b"], Site::Twitter, None, options)
            .unwrap()
            .collect_all()
            .await;
        let elapsed = started.elapsed();
        assert!(outcome.error.is_none());
        assert!(elapsed >= Duration::from_secs(1), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2), "elapsed {:?}", elapsed);
    }
}
