use super::Notice;
use crate::config::moderation::ModerationConfig;
use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Where the poller reads notices from and sends the user's answers to.
pub trait NoticeSource: Send + Sync + 'static {
    fn fetch_pending(&self) -> impl Future<Output = AppResult<Vec<Notice>>> + Send;

    fn acknowledge(&self, action_id: i32) -> impl Future<Output = AppResult<()>> + Send;

    fn submit_appeal(
        &self,
        action_id: i32,
        text: String,
    ) -> impl Future<Output = AppResult<()>> + Send;
}

/// The user's answer to the notice on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeReply {
    Acknowledge,
    Appeal(String),
}

/// An answer plus where its outcome goes.
type Answer = (NoticeReply, oneshot::Sender<AppResult<()>>);

fn stopped() -> AppError {
    AppError::Internal(anyhow::anyhow!("notice poller has stopped"))
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`NoticeSource`] backed by the member HTTP API.
#[derive(Clone)]
pub struct HttpNoticeSource {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpNoticeSource {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn check(resp: reqwest::Response) -> AppResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .json::<ErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| status.to_string());
        Err(match status.as_u16() {
            400 => AppError::Validation(message),
            401 => AppError::Unauthorized,
            403 => AppError::Forbidden,
            404 => AppError::NotFound,
            409 => AppError::InvalidState(message),
            _ => AppError::Internal(anyhow::anyhow!("notice request failed: {}", message)),
        })
    }
}

fn transport(err: reqwest::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("notice request failed: {}", err))
}

impl NoticeSource for HttpNoticeSource {
    async fn fetch_pending(&self) -> AppResult<Vec<Notice>> {
        let resp = self
            .client
            .get(self.url("/moderation/notices"))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;
        let body: Envelope<Vec<Notice>> = Self::check(resp).await?.json().await.map_err(transport)?;
        Ok(body.data.unwrap_or_default())
    }

    async fn acknowledge(&self, action_id: i32) -> AppResult<()> {
        let resp = self
            .client
            .post(self.url(&format!("/moderation/notices/{}/acknowledge", action_id)))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn submit_appeal(&self, action_id: i32, text: String) -> AppResult<()> {
        let resp = self
            .client
            .post(self.url(&format!("/moderation/actions/{}/appeal", action_id)))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(transport)?;
        Self::check(resp).await?;
        Ok(())
    }
}

/// Client-side loop: refresh on an interval or on demand, present one notice
/// at a time, forward the user's answer, pause, present the next.
pub struct NotificationPoller<S> {
    source: Arc<S>,
    poll_interval: Duration,
    next_delay: Duration,
}

impl<S: NoticeSource> NotificationPoller<S> {
    pub fn new(source: S, poll_interval: Duration, next_delay: Duration) -> Self {
        Self {
            source: Arc::new(source),
            poll_interval,
            next_delay,
        }
    }

    pub fn from_config(source: S, config: &ModerationConfig) -> Self {
        Self::new(source, config.notice_poll_interval, config.notice_next_delay)
    }

    pub fn spawn(self) -> PollerHandle {
        let (notice_tx, notice_rx) = mpsc::channel(1);
        let (reply_tx, reply_rx) = mpsc::channel(1);
        let (stop_tx, stop_rx) = watch::channel(false);
        let trigger = Arc::new(Notify::new());

        let task = tokio::spawn(self.run(notice_tx, reply_rx, stop_rx, trigger.clone()));

        PollerHandle {
            notices: notice_rx,
            replies: reply_tx,
            trigger,
            stop: stop_tx,
            task,
        }
    }

    async fn run(
        self,
        notices: mpsc::Sender<Notice>,
        mut replies: mpsc::Receiver<Answer>,
        mut stop: watch::Receiver<bool>,
        trigger: Arc<Notify>,
    ) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop.changed() => return,
                _ = ticker.tick() => {}
                _ = trigger.notified() => {}
            }

            let mut queue = match self.source.fetch_pending().await {
                Ok(queue) => queue,
                Err(err) => {
                    tracing::warn!("Notice poll failed, retrying next interval: {}", err);
                    continue;
                }
            };
            tracing::debug!("Notice poll found {} pending", queue.len());

            while !queue.is_empty() {
                let notice = queue.remove(0);
                let id = notice.id;
                if notices.send(notice).await.is_err() {
                    return;
                }

                // The notice stays on screen until an answer goes through.
                loop {
                    // An answer already sent is forwarded even if a stop races it.
                    let (reply, outcome) = tokio::select! {
                        biased;
                        answer = replies.recv() => match answer {
                            Some(answer) => answer,
                            None => return,
                        },
                        _ = stop.changed() => return,
                    };

                    let result = match reply {
                        NoticeReply::Acknowledge => self.source.acknowledge(id).await,
                        NoticeReply::Appeal(text) => self.source.submit_appeal(id, text).await,
                    };
                    match result {
                        Ok(()) => {
                            let _ = outcome.send(Ok(()));
                            break;
                        }
                        // Gone server-side: nothing left to answer.
                        Err(AppError::NotFound) => {
                            tracing::warn!("Notice {} no longer exists, moving on", id);
                            let _ = outcome.send(Err(AppError::NotFound));
                            break;
                        }
                        Err(err) => {
                            tracing::debug!("Answer to notice {} rejected: {}", id, err);
                            let _ = outcome.send(Err(err));
                        }
                    }
                }

                if !queue.is_empty() {
                    tokio::select! {
                        _ = stop.changed() => return,
                        _ = tokio::time::sleep(self.next_delay) => {}
                    }
                }
            }
        }
    }
}

/// Presenter side of a running [`NotificationPoller`].
pub struct PollerHandle {
    notices: mpsc::Receiver<Notice>,
    replies: mpsc::Sender<Answer>,
    trigger: Arc<Notify>,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Wait for the next notice to show. `None` once the loop has stopped.
    pub async fn next_notice(&mut self) -> Option<Notice> {
        self.notices.recv().await
    }

    /// Answer the notice on screen and wait for the outcome. On a rejected
    /// answer the same notice stays on screen so the user can try again.
    pub async fn reply(&self, reply: NoticeReply) -> AppResult<()> {
        let (tx, rx) = oneshot::channel();
        self.replies.send((reply, tx)).await.map_err(|_| stopped())?;
        rx.await.map_err(|_| stopped())?
    }

    /// Re-check now instead of waiting for the interval.
    pub fn refresh(&self) {
        self.trigger.notify_one();
    }

    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            tracing::warn!("Notice poller ended abnormally: {}", err);
        }
    }
}
