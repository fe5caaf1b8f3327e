//! Bot runtime - long-polling loop around the delivery controller.

use crate::access::{MembershipOracle, VerificationConfig, VerificationEngine};
use crate::artifact::{ArtifactCache, ArtifactSource};
use crate::config::GateConfig;
use crate::controller::{DeliveryController, Presentation};
use crate::error::Result;
use crate::event::{create_event_channel, GateEvent, GateEventsChannel, GateEventsSender};
use crate::telegram::render::PREPARING_TEXT;
use crate::telegram::{render, CallbackContext, InboundEvent, Reply, TelegramClient, Update};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Pause after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Builder for constructing the bot.
pub struct BotBuilder {
    config: GateConfig,
}

impl BotBuilder {
    /// Create a new bot builder with the given configuration.
    #[must_use]
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Validate the configuration and wire up the gate.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub async fn build(self) -> Result<RunningBot> {
        self.config.validate()?;
        info!(
            "Building channel-gate (groups={}, {}; artifact={})",
            self.config.groups.primary.id,
            self.config.groups.secondary.id,
            self.config.artifact.path.display()
        );

        let client = Arc::new(TelegramClient::new(&self.config)?);
        let (events_tx, events_rx) = create_event_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let oracle = MembershipOracle::new(client.clone(), self.config.verification.query_timeout());
        let engine = VerificationEngine::new(
            oracle,
            VerificationConfig {
                groups: [self.config.groups.primary.id, self.config.groups.secondary.id],
                cooldown: self.config.verification.cooldown(),
            },
        );
        let cache = ArtifactCache::with_timeout(
            client.clone(),
            Duration::from_secs(self.config.artifact.upload_timeout_secs),
        );
        let controller = DeliveryController::new(
            engine,
            cache,
            ArtifactSource::new(self.config.artifact.path.clone()),
            [
                self.config.groups.primary.join_url.clone(),
                self.config.groups.secondary.join_url.clone(),
            ],
            events_tx.clone(),
        );

        Ok(RunningBot {
            config: self.config,
            client,
            controller: Arc::new(controller),
            shutdown_tx,
            shutdown_rx,
            events_tx,
            events_rx: Some(events_rx),
        })
    }
}

/// A running bot.
pub struct RunningBot {
    config: GateConfig,
    client: Arc<TelegramClient>,
    controller: Arc<DeliveryController>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    events_tx: GateEventsSender,
    events_rx: Option<GateEventsChannel>,
}

impl RunningBot {
    /// Get a receiver for gate events.
    ///
    /// Note: Can only be called once. Subsequent calls return None.
    pub fn events(&mut self) -> Option<GateEventsChannel> {
        self.events_rx.take()
    }

    /// Subscribe to gate events.
    #[must_use]
    pub fn subscribe_events(&self) -> GateEventsChannel {
        self.events_tx.subscribe()
    }

    /// The delivery controller.
    #[must_use]
    pub fn controller(&self) -> &Arc<DeliveryController> {
        &self.controller
    }

    /// Poll for updates until shutdown is requested.
    ///
    /// Every update is handled on its own task, so a slow membership query or
    /// upload never holds up unrelated requesters.
    ///
    /// # Errors
    ///
    /// Returns an error if the bot encounters a fatal error.
    pub async fn run(&mut self) -> Result<()> {
        info!("🤖 Bot is running. Press Ctrl+C to stop.");
        let _ = self.events_tx.send(GateEvent::Started);

        if let Some(interval) = self.config.verification.sweep_interval() {
            self.spawn_cooldown_sweep(interval);
        }

        let mut offset = 0;
        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("Shutdown signal received");
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C received, initiating shutdown");
                    self.shutdown();
                    break;
                }
                result = self.client.get_updates(offset) => match result {
                    Ok(updates) => {
                        for update in updates {
                            offset = offset.max(update.update_id + 1);
                            self.spawn_dispatch(update);
                        }
                    }
                    Err(e) => {
                        warn!("Polling for updates failed: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                    }
                },
            }
        }

        let _ = self.events_tx.send(GateEvent::ShuttingDown);
        info!("Bot shutdown complete");
        Ok(())
    }

    /// Request the bot to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    fn spawn_dispatch(&self, update: Update) {
        let Some(event) = update.classify() else {
            debug!("Ignoring update {}", update.update_id);
            return;
        };
        let client = Arc::clone(&self.client);
        let controller = Arc::clone(&self.controller);
        let events_tx = self.events_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = dispatch(&client, &controller, event).await {
                warn!("Failed to answer requester: {e}");
                let _ = events_tx.send(GateEvent::Error {
                    message: format!("reply failed: {e}"),
                });
            }
        });
    }

    fn spawn_cooldown_sweep(&self, interval: Duration) {
        let controller = Arc::clone(&self.controller);
        let mut shutdown_rx = self.shutdown_rx.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let removed = controller.engine().cooldown_gate().sweep_expired();
                        if removed > 0 {
                            debug!("Swept {removed} expired cooldown entries");
                        }
                    }
                }
            }
        });
    }
}

/// Run the controller operation for `event` and show the result.
async fn dispatch(client: &TelegramClient, controller: &DeliveryController, event: InboundEvent) -> Result<()> {
    match event {
        InboundEvent::Start { requester, chat } => {
            let presentation = controller.on_start(requester);
            if let Reply::Message { text, keyboard } = render(&presentation) {
                client.send_message(chat, &text, keyboard.as_ref()).await?;
            }
            Ok(())
        }
        InboundEvent::VerifyClick { requester, callback } => {
            let presentation = controller.on_verify_request(requester).await;
            answer(client, &callback, &presentation, false).await
        }
        InboundEvent::DeliverClick { requester, callback } => {
            client
                .answer_callback_query(&callback.query_id, Some(PREPARING_TEXT), false)
                .await?;
            let presentation = controller.on_deliver_request(requester, callback.chat).await;
            answer(client, &callback, &presentation, true).await
        }
    }
}

/// Show `presentation` in response to a button press. A press can be answered
/// only once, so alerts after an acknowledgement become chat messages.
async fn answer(
    client: &TelegramClient,
    callback: &CallbackContext,
    presentation: &Presentation,
    acknowledged: bool,
) -> Result<()> {
    match render(presentation) {
        Reply::Edit { text, keyboard } => {
            if let Some(message_id) = callback.message_id {
                client
                    .edit_message_text(callback.chat, message_id, &text, keyboard.as_ref())
                    .await?;
            } else {
                client.send_message(callback.chat, &text, keyboard.as_ref()).await?;
            }
            if !acknowledged {
                client.answer_callback_query(&callback.query_id, None, false).await?;
            }
        }
        Reply::Message { text, keyboard } => {
            client.send_message(callback.chat, &text, keyboard.as_ref()).await?;
            if !acknowledged {
                client.answer_callback_query(&callback.query_id, None, false).await?;
            }
        }
        Reply::Alert { text } if acknowledged => {
            client.send_message(callback.chat, &text, None).await?;
        }
        Reply::Alert { text } => {
            client
                .answer_callback_query(&callback.query_id, Some(&text), true)
                .await?;
        }
        Reply::Silent => {
            if !acknowledged {
                client.answer_callback_query(&callback.query_id, None, false).await?;
            }
        }
    }
    Ok(())
}
