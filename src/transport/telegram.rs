//! Telegram Bot API transport.
//!
//! # Responsibilities
//! - Long-poll `getUpdates` and turn text messages into `InboundMessage`s
//! - Hand each message to the registered handler on its own task
//! - Deliver replies with `sendMessage`
//! - Stop polling on shutdown and drain in-flight handlers
//!
//! # Design Decisions
//! - The token is part of every request URL, so reqwest errors are stripped
//!   of their URL before they are logged or returned
//! - `/start <arg>` and `/kbot <arg>` carry their argument as the payload;
//!   any other text is passed through untouched

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use url::Url;

use crate::config::TelegramConfig;
use crate::resilience::Backoff;
use crate::transport::{InboundMessage, MessageHandler, ReplySink, Sender, TransportError};

/// Commands whose argument is the actual bot command.
const ENTRY_COMMANDS: [&str; 2] = ["start", "kbot"];

/// Extra time allowed on top of the long-poll timeout before a request fails.
const POLL_GRACE: Duration = Duration::from_secs(10);

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Thin Bot API client.
pub struct TelegramClient {
    http: reqwest::Client,
    base: Url,
    poll_timeout: Duration,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, TransportError> {
        // Built by hand: `Url::join` would read the `123:` prefix of a token as a scheme.
        let base = Url::parse(&format!(
            "{}/bot{}/",
            config.api_url.trim_end_matches('/'),
            config.token
        ))?;
        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Http(e.without_url()))?;

        Ok(Self {
            http,
            base,
            poll_timeout: config.poll_timeout(),
        })
    }

    /// Long-poll for updates with id `>= offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        let request = self
            .http
            .get(self.base.join("getUpdates")?)
            .timeout(self.poll_timeout + POLL_GRACE)
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_timeout.as_secs().to_string()),
                ("allowed_updates", "[\"message\"]".to_string()),
            ]);
        Ok(self.call("getUpdates", request).await?.unwrap_or_default())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        let request = self
            .http
            .post(self.base.join("sendMessage")?)
            .json(&SendMessage { chat_id, text });
        self.call::<serde_json::Value>("sendMessage", request).await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        request: RequestBuilder,
    ) -> Result<Option<T>, TransportError> {
        let response = request.send().await.map_err(|e| e.without_url())?;
        let body: ApiResponse<T> = response.json().await.map_err(|e| e.without_url())?;
        if body.ok {
            Ok(body.result)
        } else {
            Err(TransportError::Api {
                method,
                description: body
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            })
        }
    }
}

/// Reply sink bound to one chat.
pub struct ChatReply {
    client: Arc<TelegramClient>,
    chat_id: i64,
}

#[async_trait]
impl ReplySink for ChatReply {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        self.client.send_message(self.chat_id, text).await
    }
}

/// Argument of an entry command, e.g. `hello` in `/start hello`.
pub fn extract_payload(text: &str) -> Option<String> {
    let rest = text.trim_start().strip_prefix('/')?;
    let (head, args) = rest.split_once(char::is_whitespace)?;
    // `/start@kbot_bot hello` in group chats
    let command = head.split('@').next().unwrap_or(head);
    if !ENTRY_COMMANDS.iter().any(|entry| entry.eq_ignore_ascii_case(command)) {
        return None;
    }
    let args = args.trim();
    (!args.is_empty()).then(|| args.to_string())
}

/// Convert an update into an inbound message; non-text updates yield `None`.
pub fn to_inbound(update: Update) -> Option<InboundMessage> {
    let message = update.message?;
    let text = message.text?;
    let sender = match message.from {
        Some(user) => Sender {
            id: user.id,
            display_name: user.username.unwrap_or(user.first_name),
        },
        None => Sender {
            id: 0,
            display_name: String::new(),
        },
    };

    Some(InboundMessage {
        sender,
        chat_id: message.chat.id,
        payload: extract_payload(&text),
        text,
    })
}

/// Long-poll loop feeding the message handler.
pub struct TelegramPoller {
    client: Arc<TelegramClient>,
    backoff: Backoff,
}

impl TelegramPoller {
    pub fn new(client: TelegramClient) -> Self {
        Self {
            client: Arc::new(client),
            backoff: Backoff::new(Duration::from_millis(500), Duration::from_secs(30)),
        }
    }

    /// Poll until shutdown, then wait for every in-flight handler to finish.
    pub async fn run(
        mut self,
        handler: Arc<dyn MessageHandler>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let mut offset = 0_i64;
        let mut in_flight = JoinSet::new();

        tracing::info!("Telegram poller started");

        loop {
            while let Some(finished) = in_flight.try_join_next() {
                log_handler_exit(finished);
            }

            let polled = tokio::select! {
                _ = shutdown.recv() => break,
                polled = self.client.get_updates(offset) => polled,
            };

            match polled {
                Ok(updates) => {
                    self.backoff.reset();
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(message) = to_inbound(update) else {
                            continue;
                        };
                        let handler = handler.clone();
                        let reply = ChatReply {
                            client: self.client.clone(),
                            chat_id: message.chat_id,
                        };
                        in_flight.spawn(async move {
                            if let Err(e) = handler.handle(message, &reply).await {
                                tracing::warn!(error = %e, chat_id = reply.chat_id, "Reply was not delivered");
                            }
                        });
                    }
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        attempt = self.backoff.attempts(),
                        delay = ?delay,
                        "Polling failed, retrying"
                    );
                    tokio::select! {
                        _ = shutdown.recv() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        tracing::info!(in_flight = in_flight.len(), "Telegram poller stopped, draining handlers");
        while let Some(finished) = in_flight.join_next().await {
            log_handler_exit(finished);
        }
        tracing::info!("Telegram poller drained");
    }
}

fn log_handler_exit(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "Message handler task failed");
    }
}
