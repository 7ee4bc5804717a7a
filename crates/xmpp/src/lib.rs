pub mod error;
pub mod iq;
pub mod ns;
pub mod pipeline;
pub mod rsm;
pub mod stanza;

pub use error::{IqError, PipelineError};
pub use iq::{IqCallee, IqHandler, IqRequestContext, IqRequester};
pub use pipeline::{
    ProcessorContext, ProcessorResult, StanzaDirection, StanzaPipeline, StanzaProcessor,
};
pub use rsm::{RsmError, RsmField, RsmQuery, RsmSet, RsmValue};
pub use stanza::{element_to_string, first_text_node, iq_get, iq_set, parse_element};

pub use jid::{BareJid, Jid};
pub use minidom::Element;
pub use xmpp_parsers::iq::{Iq, IqType};
