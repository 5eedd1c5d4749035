//! Chromium over the DevTools protocol

use super::idle::wait_for_network_idle;
use super::{
    BrowserEngine, BrowserError, CaptureLog, CapturedResponse, FailedRequest, NavigationOptions,
    Tab,
};
use crate::config::BrowserConfig;
use crate::filter::RequestFilter;
use async_trait::async_trait;
use base64::Engine as _;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, FailRequestParams, RequestPattern,
    RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::{
    self, ErrorReason, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    EventResponseReceived, GetResponseBodyParams, RequestId, SetCacheDisabledParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use url::Url;

impl From<CdpError> for BrowserError {
    fn from(err: CdpError) -> Self {
        BrowserError::Protocol(err.to_string())
    }
}

/// A launched Chromium process plus the task driving its protocol handler
pub struct ChromiumBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumBrowser {
    /// Launches Chromium with the configured viewport and head mode
    ///
    /// # Returns
    ///
    /// * `Ok(ChromiumBrowser)` - Browser is running
    /// * `Err(BrowserError::Launch)` - No usable browser binary or it failed to start
    pub async fn launch(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let mut builder = CdpBrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Some(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..Default::default()
            }));

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }

        let cdp_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {}", e);
                }
            }
        });

        tracing::info!(
            "Browser launched ({}x{}, headless: {})",
            config.viewport_width,
            config.viewport_height,
            config.headless
        );

        Ok(Self { browser, handler })
    }
}

#[async_trait]
impl BrowserEngine for ChromiumBrowser {
    type Tab = ChromiumTab;

    async fn open_tab(&self) -> Result<ChromiumTab, BrowserError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Tab(e.to_string()))?;

        Ok(ChromiumTab {
            page,
            capture: None,
        })
    }

    async fn close(mut self) -> Result<(), BrowserError> {
        self.browser.close().await?;
        if let Err(e) = self.browser.wait().await {
            tracing::warn!("Browser process did not exit cleanly: {}", e);
        }
        self.handler.abort();
        Ok(())
    }
}

/// Observer tasks attached to a tab between `start_capture` and `finish_capture`
struct ActiveCapture {
    stop: oneshot::Sender<()>,
    collector: JoinHandle<CaptureLog>,
    interceptor: JoinHandle<()>,
    blocked: Arc<AtomicUsize>,
    in_flight: watch::Receiver<usize>,
}

impl ActiveCapture {
    fn abort(self) {
        self.collector.abort();
        self.interceptor.abort();
    }
}

/// Network event streams read by the collector
struct NetworkObservers {
    will_be_sent: EventStream<EventRequestWillBeSent>,
    responses: EventStream<EventResponseReceived>,
    finished: EventStream<EventLoadingFinished>,
    failed: EventStream<EventLoadingFailed>,
}

/// One Chromium page
pub struct ChromiumTab {
    page: Page,
    capture: Option<ActiveCapture>,
}

#[async_trait]
impl Tab for ChromiumTab {
    async fn start_capture(&mut self, filter: Arc<RequestFilter>) -> Result<(), BrowserError> {
        if let Some(previous) = self.capture.take() {
            previous.abort();
        }

        self.page.execute(network::EnableParams::default()).await?;
        self.page.execute(SetCacheDisabledParams::new(true)).await?;

        let paused = self.page.event_listener::<EventRequestPaused>().await?;
        let observers = NetworkObservers {
            will_be_sent: self.page.event_listener::<EventRequestWillBeSent>().await?,
            responses: self.page.event_listener::<EventResponseReceived>().await?,
            finished: self.page.event_listener::<EventLoadingFinished>().await?,
            failed: self.page.event_listener::<EventLoadingFailed>().await?,
        };

        let blocked = Arc::new(AtomicUsize::new(0));
        let interceptor = tokio::spawn(intercept(
            self.page.clone(),
            paused,
            filter,
            blocked.clone(),
        ));

        let (stop_tx, stop_rx) = oneshot::channel();
        let (in_flight_tx, in_flight_rx) = watch::channel(0usize);
        let collector = tokio::spawn(collect(observers, in_flight_tx, stop_rx));

        let pattern = RequestPattern::builder()
            .url_pattern("*")
            .request_stage(RequestStage::Request)
            .build();
        if let Err(e) = self
            .page
            .execute(fetch::EnableParams::builder().pattern(pattern).build())
            .await
        {
            collector.abort();
            interceptor.abort();
            return Err(e.into());
        }

        self.capture = Some(ActiveCapture {
            stop: stop_tx,
            collector,
            interceptor,
            blocked,
            in_flight: in_flight_rx,
        });

        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &Url,
        options: &NavigationOptions,
    ) -> Result<(), BrowserError> {
        let in_flight = self.capture.as_ref().map(|c| c.in_flight.clone());
        let page = &self.page;

        let settle = async move {
            page.goto(url.as_str())
                .await
                .map_err(|e| BrowserError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;

            if let Some(in_flight) = in_flight {
                wait_for_network_idle(in_flight, options.idle_window, options.idle_max_in_flight)
                    .await;
            }
            Ok(())
        };

        tokio::time::timeout(options.timeout, settle)
            .await
            .map_err(|_| BrowserError::Timeout {
                url: url.to_string(),
                timeout: options.timeout,
            })?
    }

    async fn finish_capture(&mut self) -> CaptureLog {
        let Some(capture) = self.capture.take() else {
            return CaptureLog::default();
        };

        if let Err(e) = self.page.execute(fetch::DisableParams::default()).await {
            tracing::debug!("Failed to disable request interception: {}", e);
        }
        capture.interceptor.abort();

        let _ = capture.stop.send(());
        let mut log = match capture.collector.await {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!("Network observer task failed: {}", e);
                CaptureLog::default()
            }
        };
        log.blocked = capture.blocked.load(Ordering::Relaxed);
        log
    }

    async fn response_body(&self, response: &CapturedResponse) -> Result<Vec<u8>, BrowserError> {
        let body = self
            .page
            .execute(GetResponseBodyParams::new(RequestId::new(
                response.request_id.clone(),
            )))
            .await?
            .result;

        if body.base64_encoded {
            base64::engine::general_purpose::STANDARD
                .decode(body.body.as_bytes())
                .map_err(|e| BrowserError::Protocol(format!("invalid body encoding: {}", e)))
        } else {
            Ok(body.body.into_bytes())
        }
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.page.content().await?)
    }

    async fn select_inner_html(
        &self,
        selectors: &[String],
    ) -> Result<Vec<Vec<String>>, BrowserError> {
        let selectors = serde_json::to_string(selectors)
            .map_err(|e| BrowserError::Evaluation(e.to_string()))?;
        let script = format!(
            "(() => {{ \
                const selectors = {}; \
                return selectors.map((s) => {{ \
                    try {{ return Array.from(document.querySelectorAll(s), (el) => el.innerHTML); }} \
                    catch (e) {{ return []; }} \
                }}); \
            }})()",
            selectors
        );
        self.evaluate(script).await
    }

    async fn anchor_hrefs(&self) -> Result<Vec<String>, BrowserError> {
        self.evaluate(
            "Array.from(document.querySelectorAll('a[href]'), (a) => a.href)".to_string(),
        )
        .await
    }

    async fn close(mut self) -> Result<(), BrowserError> {
        if let Some(capture) = self.capture.take() {
            capture.abort();
        }
        self.page.close().await?;
        Ok(())
    }
}

impl ChromiumTab {
    async fn evaluate<T: serde::de::DeserializeOwned>(
        &self,
        script: String,
    ) -> Result<T, BrowserError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .return_by_value(true)
            .build()
            .map_err(BrowserError::Evaluation)?;

        self.page
            .evaluate_expression(params)
            .await?
            .into_value::<T>()
            .map_err(|e| BrowserError::Evaluation(e.to_string()))
    }
}

/// Resolves every paused request: denylisted ones fail as blocked by client,
/// everything else continues unchanged
async fn intercept(
    page: Page,
    mut paused: EventStream<EventRequestPaused>,
    filter: Arc<RequestFilter>,
    blocked: Arc<AtomicUsize>,
) {
    while let Some(event) = paused.next().await {
        let url = &event.request.url;
        let result = if filter.is_blocked(url) {
            blocked.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Blocked {}", url);
            page.execute(FailRequestParams::new(
                event.request_id.clone(),
                ErrorReason::BlockedByClient,
            ))
            .await
            .map(|_| ())
        } else {
            page.execute(ContinueRequestParams::new(event.request_id.clone()))
                .await
                .map(|_| ())
        };

        if let Err(e) = result {
            tracing::debug!("Failed to resolve intercepted request {}: {}", url, e);
        }
    }
}

/// Records responses and failures until told to stop, publishing the number
/// of in-flight requests as it goes
async fn collect(
    mut observers: NetworkObservers,
    in_flight: watch::Sender<usize>,
    mut stop: oneshot::Receiver<()>,
) -> CaptureLog {
    let mut log = CaptureLog::default();
    // request id -> url
    let mut pending: HashMap<String, String> = HashMap::new();

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            Some(event) = observers.will_be_sent.next() => {
                pending.insert(event.request_id.inner().clone(), event.request.url.clone());
            }
            Some(event) = observers.responses.next() => {
                log.responses.push(captured_response(&event));
            }
            Some(event) = observers.finished.next() => {
                pending.remove(event.request_id.inner());
            }
            Some(event) = observers.failed.next() => {
                let url = pending.remove(event.request_id.inner()).unwrap_or_default();
                tracing::debug!("Request failed: {} ({})", url, event.error_text);
                log.failures.push(FailedRequest {
                    url,
                    reason: event.error_text.clone(),
                });
            }
            else => break,
        }
        in_flight.send_replace(pending.len());
    }

    log
}

fn captured_response(event: &EventResponseReceived) -> CapturedResponse {
    let response = &event.response;
    let content_type = response
        .headers
        .inner()
        .as_object()
        .and_then(|headers| {
            headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
                .and_then(|(_, value)| value.as_str())
        })
        .map(str::to_string)
        .unwrap_or_else(|| response.mime_type.clone());

    CapturedResponse {
        request_id: event.request_id.inner().clone(),
        url: response.url.clone(),
        status: u16::try_from(response.status).unwrap_or(0),
        content_type,
        from_cache: served_from_cache(&[
            response.from_disk_cache,
            response.from_prefetch_cache,
            response.from_service_worker,
        ]),
    }
}

/// True if any of the cache-source flags DevTools reports is set
fn served_from_cache(flags: &[Option<bool>]) -> bool {
    flags.iter().any(|flag| flag.unwrap_or(false))
}
