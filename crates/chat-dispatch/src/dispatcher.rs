//! Priority-ordered chat dispatch loop.

use std::future::Future;

use futures::StreamExt;
use regex::{Regex, RegexBuilder};
use signald_client::{ClientError, Message, SignaldClient};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::handler::ChatHandler;

/// Order assigned to registrations that don't specify one.
pub const DEFAULT_ORDER: i32 = 100;

/// Errors surfaced by dispatcher setup and the dispatch loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Error from the signald client.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// A handler pattern failed to compile.
    #[error("invalid handler pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The subscription stream ended.
    #[error("message stream ended")]
    StreamEnded,
}

/// Handle returned by registration, usable to remove the handler again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// A pattern accepted by [`ChatDispatcher::register_handler`]: a prebuilt
/// [`Regex`] used as-is, or a string compiled case-insensitively.
pub trait IntoHandlerPattern {
    fn into_pattern(self) -> Result<Regex, regex::Error>;
}

impl IntoHandlerPattern for Regex {
    fn into_pattern(self) -> Result<Regex, regex::Error> {
        Ok(self)
    }
}

impl IntoHandlerPattern for &str {
    fn into_pattern(self) -> Result<Regex, regex::Error> {
        RegexBuilder::new(self).case_insensitive(true).build()
    }
}

impl IntoHandlerPattern for String {
    fn into_pattern(self) -> Result<Regex, regex::Error> {
        self.as_str().into_pattern()
    }
}

struct Registration {
    id: HandlerId,
    order: i32,
    pattern: Regex,
    handler: Box<dyn ChatHandler>,
}

/// Dispatches inbound messages to pattern-matched handlers in priority
/// order and routes their replies back to the sender or group.
pub struct ChatDispatcher {
    client: SignaldClient,
    handlers: Vec<Registration>,
    next_id: u64,
}

impl ChatDispatcher {
    pub fn new(client: SignaldClient) -> Self {
        Self {
            client,
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    /// The client used for subscribing and reply routing.
    pub fn client(&self) -> &SignaldClient {
        &self.client
    }

    /// Register `handler` at the default order.
    pub fn register_handler<P, H>(
        &mut self,
        pattern: P,
        handler: H,
    ) -> Result<HandlerId, DispatchError>
    where
        P: IntoHandlerPattern,
        H: ChatHandler + 'static,
    {
        self.register_handler_with_order(DEFAULT_ORDER, pattern, handler)
    }

    /// Register `handler` at `order`. Lower orders are evaluated first;
    /// equal orders keep their registration sequence.
    pub fn register_handler_with_order<P, H>(
        &mut self,
        order: i32,
        pattern: P,
        handler: H,
    ) -> Result<HandlerId, DispatchError>
    where
        P: IntoHandlerPattern,
        H: ChatHandler + 'static,
    {
        let pattern = pattern.into_pattern()?;
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        debug!("registered chat handler {:?} (order {})", pattern.as_str(), order);
        self.handlers.push(Registration {
            id,
            order,
            pattern,
            handler: Box::new(handler),
        });
        // Sort on the order key alone so registration sequence breaks ties.
        self.handlers.sort_by_key(|registration| registration.order);
        Ok(id)
    }

    /// Remove a previously registered handler. Returns whether it existed.
    pub fn remove_handler(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|registration| registration.id != id);
        self.handlers.len() != before
    }

    /// Subscribe and dispatch until the connection drops.
    ///
    /// Each message is fully processed, reply sends included, before the
    /// next one is read.
    pub async fn run(&self) -> Result<(), DispatchError> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Like [`run`](Self::run), but stops cleanly when `shutdown`
    /// completes.
    pub async fn run_with_shutdown<S>(&self, shutdown: S) -> Result<(), DispatchError>
    where
        S: Future<Output = ()> + Send,
    {
        info!("starting chat dispatch with {} handlers", self.handlers.len());
        let stream = self.client.receive_messages().await?.into_stream();
        tokio::pin!(stream);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!("shutdown signal received, stopping chat dispatch");
                    return Ok(());
                }

                item = stream.next() => match item {
                    Some(Ok(message)) => self.dispatch(&message).await,
                    Some(Err(err)) if err.is_connection() => return Err(err.into()),
                    Some(Err(err)) => warn!("skipping undecodable event: {}", err),
                    None => return Err(DispatchError::StreamEnded),
                },
            }
        }
    }

    /// Evaluate registrations against one message and route any replies.
    ///
    /// Registrations are tried in ascending order; the first whose pattern
    /// is found in the text is invoked. A failing handler ends this
    /// message's processing with nothing sent. A reply with `stop` unset
    /// lets later registrations match the same message.
    pub async fn dispatch(&self, message: &Message) {
        if message.text.is_empty() {
            return;
        }

        for registration in &self.handlers {
            let Some(captures) = registration.pattern.captures(&message.text) else {
                continue;
            };

            let reply = match registration.handler.handle(message, &captures) {
                Ok(reply) => reply,
                Err(err) => {
                    warn!("chat handler failed for {}: {}", message.source, err);
                    return;
                }
            };

            self.route_reply(message, &reply.text).await;

            if reply.stop {
                return;
            }
        }
    }

    /// Send `text` back to where `message` came from: its group when it has
    /// one, its sender otherwise.
    async fn route_reply(&self, message: &Message, text: &str) {
        let sent = match message.group_info.group_id.as_deref() {
            Some(group_id) => self.client.send_group_message(group_id, text).await,
            None => self.client.send_message(&message.source, text).await.map(drop),
        };
        if let Err(err) = sent {
            warn!("failed to send reply to {}: {}", message.source, err);
        }
    }
}
