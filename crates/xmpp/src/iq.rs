use std::collections::HashMap;

use async_trait::async_trait;
use jid::Jid;
use minidom::Element;
use tracing::{debug, warn};
use xmpp_parsers::iq::{Iq, IqType};

use crate::error::IqError;
use crate::ns;
use crate::pipeline::{ProcessorContext, ProcessorResult, StanzaProcessor};

/// Sends one request IQ and resolves with the payload of the matching result.
///
/// Implementations correlate by the IQ `id`. An empty `result` resolves to
/// `Ok(None)`; an `error` response resolves to [`IqError::Stanza`].
#[async_trait]
pub trait IqRequester: Send + Sync {
    async fn request(&self, iq: Iq) -> Result<Option<Element>, IqError>;
}

/// What an inbound request handler gets to look at.
#[derive(Debug)]
pub struct IqRequestContext<'a> {
    pub id: &'a str,
    /// Sender, or `None` when the stanza had no `from` attribute.
    pub from: Option<Jid>,
    pub account: &'a Jid,
    pub payload: &'a Element,
    pub stanza: &'a Element,
}

/// Handler for one inbound `get`/`set` payload. Returning `false` declines the stanza.
pub trait IqHandler: Send + Sync + 'static {
    fn handle(&self, ctx: &IqRequestContext<'_>) -> bool;
}

impl<F> IqHandler for F
where
    F: Fn(&IqRequestContext<'_>) -> bool + Send + Sync + 'static,
{
    fn handle(&self, ctx: &IqRequestContext<'_>) -> bool {
        self(ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RequestKind {
    Get,
    Set,
}

impl RequestKind {
    fn from_type(value: &str) -> Option<Self> {
        match value {
            "get" => Some(Self::Get),
            "set" => Some(Self::Set),
            _ => None,
        }
    }
}

type HandlerKey = (RequestKind, String, String);

/// Routes inbound `get`/`set` IQs to handlers registered by payload namespace and name.
pub struct IqCallee {
    handlers: HashMap<HandlerKey, Box<dyn IqHandler>>,
    priority: i32,
}

impl IqCallee {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn on_get(&mut self, ns: &str, name: &str, handler: impl IqHandler) {
        self.register(RequestKind::Get, ns, name, Box::new(handler));
    }

    pub fn on_set(&mut self, ns: &str, name: &str, handler: impl IqHandler) {
        self.register(RequestKind::Set, ns, name, Box::new(handler));
    }

    fn register(&mut self, kind: RequestKind, ns: &str, name: &str, handler: Box<dyn IqHandler>) {
        let key = (kind, ns.to_string(), name.to_string());
        if self.handlers.insert(key, handler).is_some() {
            debug!(ns, name, ?kind, "replaced iq handler");
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for IqCallee {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_result(id: &str, to: Option<Jid>) -> Element {
    Iq {
        from: None,
        to,
        id: id.to_string(),
        payload: IqType::Result(None),
    }
    .into()
}

impl StanzaProcessor for IqCallee {
    fn name(&self) -> &str {
        "iq-callee"
    }

    fn process_inbound(&self, stanza: &Element, ctx: &ProcessorContext) -> ProcessorResult {
        if !stanza.is("iq", ns::CLIENT) {
            return ProcessorResult::Continue;
        }
        let Some(kind) = stanza.attr("type").and_then(RequestKind::from_type) else {
            return ProcessorResult::Continue;
        };
        let Some(payload) = stanza.children().next() else {
            return ProcessorResult::Continue;
        };

        let key = (kind, payload.ns(), payload.name().to_string());
        let Some(handler) = self.handlers.get(&key) else {
            return ProcessorResult::Continue;
        };

        let from = match stanza.attr("from") {
            Some(raw) => match raw.parse::<Jid>() {
                Ok(jid) => Some(jid),
                Err(error) => {
                    warn!(from = raw, %error, "declining iq with unparseable sender");
                    return ProcessorResult::Continue;
                }
            },
            None => None,
        };

        let id = stanza.attr("id").unwrap_or_default();
        let request = IqRequestContext {
            id,
            from,
            account: &ctx.account,
            payload,
            stanza,
        };

        if handler.handle(&request) {
            ProcessorResult::Reply(Box::new(empty_result(id, request.from.clone())))
        } else {
            ProcessorResult::Continue
        }
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
