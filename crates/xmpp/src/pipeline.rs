use jid::Jid;
use minidom::Element;
use tracing::trace;

use crate::error::PipelineError;
use crate::stanza::parse_element;

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessorResult {
    /// Not for this processor; hand the stanza to the next one.
    Continue,
    /// Consumed; later processors never see the stanza.
    Handled,
    /// Consumed, and the stack should send this stanza back.
    Reply(Box<Element>),
}

impl ProcessorResult {
    pub fn is_handled(&self) -> bool {
        !matches!(self, ProcessorResult::Continue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StanzaDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone)]
pub struct ProcessorContext {
    pub direction: StanzaDirection,
    /// Address the session authenticated as.
    pub account: Jid,
}

impl ProcessorContext {
    pub fn inbound(account: Jid) -> Self {
        Self {
            direction: StanzaDirection::Inbound,
            account,
        }
    }
}

pub trait StanzaProcessor: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn process_inbound(&self, stanza: &Element, ctx: &ProcessorContext) -> ProcessorResult;

    fn process_outbound(&self, _stanza: &Element, _ctx: &ProcessorContext) -> ProcessorResult {
        ProcessorResult::Continue
    }

    fn priority(&self) -> i32;
}

pub struct StanzaPipeline {
    processors: Vec<Box<dyn StanzaProcessor>>,
}

impl StanzaPipeline {
    pub fn new() -> Self {
        Self {
            processors: Vec::new(),
        }
    }

    pub fn register(&mut self, processor: Box<dyn StanzaProcessor>) {
        self.processors.push(processor);
        self.processors.sort_by_key(|p| p.priority());
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Offer `stanza` to each processor in priority order until one consumes it.
    pub fn process_inbound(&self, stanza: &Element, ctx: &ProcessorContext) -> ProcessorResult {
        for processor in &self.processors {
            let result = processor.process_inbound(stanza, ctx);
            if result.is_handled() {
                trace!(processor = processor.name(), stanza = stanza.name(), "stanza handled");
                return result;
            }
        }
        ProcessorResult::Continue
    }

    pub fn process_inbound_raw(
        &self,
        raw: &[u8],
        ctx: &ProcessorContext,
    ) -> Result<ProcessorResult, PipelineError> {
        let stanza = parse_element(raw)?;
        Ok(self.process_inbound(&stanza, ctx))
    }

    pub fn process_outbound(&self, stanza: &Element, ctx: &ProcessorContext) -> ProcessorResult {
        for processor in &self.processors {
            let result = processor.process_outbound(stanza, ctx);
            if result.is_handled() {
                return result;
            }
        }
        ProcessorResult::Continue
    }
}

impl Default for StanzaPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recording {
        name: &'static str,
        priority: i32,
        result: ProcessorResult,
        calls: Arc<Mutex<Vec<&'static str>>>,
    }

    impl StanzaProcessor for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn process_inbound(&self, _stanza: &Element, _ctx: &ProcessorContext) -> ProcessorResult {
            self.calls.lock().unwrap().push(self.name);
            self.result.clone()
        }

        fn priority(&self) -> i32 {
            self.priority
        }
    }

    fn context() -> ProcessorContext {
        ProcessorContext::inbound("user@example.com/desk".parse().unwrap())
    }

    fn message() -> Element {
        "<message xmlns='jabber:client' from='a@b'/>".parse().unwrap()
    }

    #[test]
    fn runs_processors_in_priority_order_until_handled() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = StanzaPipeline::new();
        for (name, priority, result) in [
            ("late", 30, ProcessorResult::Continue),
            ("handler", 20, ProcessorResult::Handled),
            ("early", 10, ProcessorResult::Continue),
        ] {
            pipeline.register(Box::new(Recording {
                name,
                priority,
                result,
                calls: Arc::clone(&calls),
            }));
        }

        let result = pipeline.process_inbound(&message(), &context());

        assert_eq!(result, ProcessorResult::Handled);
        assert_eq!(*calls.lock().unwrap(), vec!["early", "handler"]);
    }

    #[test]
    fn unclaimed_stanza_continues() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = StanzaPipeline::new();
        pipeline.register(Box::new(Recording {
            name: "only",
            priority: 0,
            result: ProcessorResult::Continue,
            calls,
        }));

        assert_eq!(
            pipeline.process_inbound(&message(), &context()),
            ProcessorResult::Continue
        );
    }

    #[test]
    fn raw_input_is_parsed_first() {
        let pipeline = StanzaPipeline::new();
        assert!(pipeline.process_inbound_raw(b"<broken", &context()).is_err());
        assert_eq!(
            pipeline
                .process_inbound_raw(b"<presence xmlns='jabber:client'/>", &context())
                .unwrap(),
            ProcessorResult::Continue
        );
    }
}
