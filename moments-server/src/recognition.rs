//! Recognition service notifier.
//!
//! After the compressed representation lands, the pipeline tells the
//! recognition process where to fetch it. Notification is
//! fire-and-forget: a failure is logged and dropped, and the match set
//! simply stays stale until the next callback.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Notification {
    Photo { photo_id: Uuid, url: String },
    Facecam { user_id: Uuid, url: String },
}

enum NotifierBackend {
    /// No recognition deployment configured.
    Disabled,
    /// JSON over HTTP to a recognition deployment.
    Remote {
        http: reqwest::Client,
        base_url: String,
    },
    /// Records notifications instead of sending them (tests).
    Recording(Mutex<Vec<Notification>>),
}

pub struct RecognitionNotifier {
    backend: NotifierBackend,
}

impl RecognitionNotifier {
    pub fn disabled() -> Self {
        Self {
            backend: NotifierBackend::Disabled,
        }
    }

    pub fn remote(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            backend: NotifierBackend::Remote {
                http,
                base_url: base_url.into().trim_end_matches('/').to_string(),
            },
        }
    }

    pub fn recording() -> Self {
        Self {
            backend: NotifierBackend::Recording(Mutex::new(Vec::new())),
        }
    }

    /// Tell the recognition process a photo is ready for matching.
    pub async fn notify_photo(&self, photo_id: Uuid, url: &str) {
        self.send(Notification::Photo {
            photo_id,
            url: url.to_string(),
        })
        .await;
    }

    /// Tell the recognition process a facecam is ready for matching.
    pub async fn notify_facecam(&self, user_id: Uuid, url: &str) {
        self.send(Notification::Facecam {
            user_id,
            url: url.to_string(),
        })
        .await;
    }

    async fn send(&self, notification: Notification) {
        match &self.backend {
            NotifierBackend::Disabled => {
                tracing::debug!(?notification, "Recognition disabled, dropping notification");
            }
            NotifierBackend::Remote { http, base_url } => {
                let path = match &notification {
                    Notification::Photo { .. } => "process/photo",
                    Notification::Facecam { .. } => "process/facecam",
                };
                let result = http
                    .post(format!("{base_url}/{path}"))
                    .json(&notification)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status());
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Recognition notification failed, dropping");
                }
            }
            NotifierBackend::Recording(sent) => {
                if let Ok(mut sent) = sent.lock() {
                    sent.push(notification);
                }
            }
        }
    }

    /// Notifications captured by the recording backend.
    pub fn recorded(&self) -> Vec<Notification> {
        match &self.backend {
            NotifierBackend::Recording(sent) => {
                sent.lock().map(|s| s.clone()).unwrap_or_default()
            }
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Debug for RecognitionNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            NotifierBackend::Disabled => "Disabled",
            NotifierBackend::Remote { .. } => "Remote",
            NotifierBackend::Recording(_) => "Recording",
        };
        f.debug_struct("RecognitionNotifier")
            .field("backend", &backend)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_backend_captures_notifications() {
        let notifier = RecognitionNotifier::recording();
        let id = Uuid::new_v4();
        notifier.notify_photo(id, "http://cdn/x.jpg").await;

        assert_eq!(
            notifier.recorded(),
            vec![Notification::Photo {
                photo_id: id,
                url: "http://cdn/x.jpg".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_disabled_backend_is_a_no_op() {
        let notifier = RecognitionNotifier::disabled();
        notifier.notify_facecam(Uuid::new_v4(), "http://cdn/y.jpg").await;
        assert!(notifier.recorded().is_empty());
    }
}
