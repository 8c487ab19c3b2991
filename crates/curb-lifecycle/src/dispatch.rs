//! Background notification dispatch.
//!
//! Lifecycle operations hand finished [`NotificationJob`]s to a
//! [`NotificationQueue`] and move on; a single spawned worker owns the
//! provider seams and drains the queue at its own pace. Delivery failures
//! are logged here and go no further — they must never become the
//! triggering operation's error.

use curb_core::{
  notify::{
    DeliveryError, EmailSender, NotificationJob, SmsSender, resolve_channel,
  },
  report::NotificationPreference,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

// ─── Queue handle ────────────────────────────────────────────────────────────

/// Cloneable producer side of the dispatch queue.
#[derive(Clone)]
pub struct NotificationQueue {
  tx: mpsc::UnboundedSender<NotificationJob>,
}

impl NotificationQueue {
  /// Enqueue one notification. Never blocks and never fails the caller: if
  /// the dispatcher is gone, the job is dropped with a warning.
  pub fn enqueue(&self, job: NotificationJob) {
    if self.tx.send(job).is_err() {
      warn!("notification dispatcher is gone; dropping job");
    }
  }
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Owns the provider seams and applies the channel-resolution policy.
pub struct Dispatcher<E, S> {
  email: E,
  sms:   S,
}

impl<E: EmailSender, S: SmsSender> Dispatcher<E, S> {
  pub fn new(email: E, sms: S) -> Self {
    Self { email, sms }
  }

  /// Deliver one job on its resolved channel(s).
  ///
  /// Under `Both`, each channel is attempted regardless of the other's
  /// outcome, and each failure is logged on its own.
  pub async fn dispatch(&self, job: &NotificationJob) {
    match resolve_channel(job.preference, &job.recipient) {
      NotificationPreference::Email => self.send_email(job).await,
      NotificationPreference::Sms => self.send_sms(job).await,
      NotificationPreference::Both => {
        self.send_email(job).await;
        self.send_sms(job).await;
      }
    }
  }

  async fn send_email(&self, job: &NotificationJob) {
    let Some(to) = job.recipient.email.as_deref() else {
      debug!("recipient has no email address; skipping email channel");
      return;
    };
    if let Err(DeliveryError(reason)) = self
      .email
      .send(to, &job.template.email_subject, &job.template.email_html)
      .await
    {
      warn!(%reason, "email delivery failed");
    }
  }

  async fn send_sms(&self, job: &NotificationJob) {
    let Some(to) = job.recipient.phone.as_deref() else {
      debug!("recipient has no phone number; skipping sms channel");
      return;
    };
    if let Err(DeliveryError(reason)) =
      self.sms.send(to, &job.template.sms).await
    {
      warn!(%reason, "sms delivery failed");
    }
  }

  /// Drain jobs until every [`NotificationQueue`] handle is dropped.
  pub async fn run(self, mut rx: mpsc::UnboundedReceiver<NotificationJob>) {
    while let Some(job) = rx.recv().await {
      self.dispatch(&job).await;
    }
    info!("notification queue closed; dispatcher stopping");
  }
}

/// Spawn a dispatcher on the current runtime. Returns the queue handle for
/// the lifecycle and the worker's join handle for shutdown sequencing.
pub fn spawn_dispatcher<E, S>(
  email: E,
  sms: S,
) -> (NotificationQueue, JoinHandle<()>)
where
  E: EmailSender + 'static,
  S: SmsSender + 'static,
{
  let (tx, rx) = mpsc::unbounded_channel();
  let worker = tokio::spawn(Dispatcher::new(email, sms).run(rx));
  (NotificationQueue { tx }, worker)
}
