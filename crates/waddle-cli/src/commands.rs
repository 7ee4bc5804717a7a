use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use jid::Jid;
use minidom::Element;
use serde_json::{json, Value};
use tracing::info;
use waddle_core::config::{MixedContentPolicy, RsmNumberPolicy};
use waddle_pubsub::{
    NotificationChannel, NotificationChannels, NotificationEvent, NotificationKind,
    NotificationRouter, PubSubClient,
};
use waddle_roster::{RosterClient, RosterEvent, RosterEventKind, RosterEvents, RosterPushHandler};
use waddle_vcard::{VCardClient, VCardTree};
use waddle_xmpp::{
    element_to_string, IqCallee, ProcessorContext, ProcessorResult, StanzaPipeline,
};

use crate::replay::ReplayRequester;

const KINDS: [NotificationKind; 3] = [
    NotificationKind::Published,
    NotificationKind::PublishedLast,
    NotificationKind::Retracted,
];

/// Account the stanza was delivered to: the configured one, else its `to`.
pub fn resolve_account(configured: Option<&str>, stanza: &Element) -> Result<Jid> {
    let raw = configured
        .or_else(|| stanza.attr("to"))
        .context("no account configured and the stanza has no 'to' address")?;
    raw.parse()
        .with_context(|| format!("invalid account address {raw:?}"))
}

fn outcome(result: &ProcessorResult) -> Result<Value> {
    Ok(match result {
        ProcessorResult::Continue => json!("declined"),
        ProcessorResult::Handled => json!("handled"),
        ProcessorResult::Reply(reply) => json!({ "reply": element_to_string(reply)? }),
    })
}

pub fn notification(stanza: &Element, account: Jid) -> Result<Value> {
    let channels = Arc::new(NotificationChannels::new());
    let service = match stanza.attr("from") {
        Some(from) => from.to_string(),
        None => account.to_bare().to_string(),
    };

    let routed = Arc::new(Mutex::new(Vec::new()));
    for kind in KINDS {
        let sink = Arc::clone(&routed);
        let channel = NotificationChannel::service(kind, service.clone());
        let name = channel.to_string();
        channels.subscribe(channel, move |event: &NotificationEvent| {
            if let Ok(mut routed) = sink.lock() {
                routed.push((name.clone(), event.clone()));
            }
        });
    }

    let mut pipeline = StanzaPipeline::new();
    pipeline.register(Box::new(NotificationRouter::new(channels)));
    let result = pipeline.process_inbound(stanza, &ProcessorContext::inbound(account));

    let routed = routed
        .lock()
        .map_err(|_| anyhow::anyhow!("listener state poisoned"))?;
    let events = routed
        .iter()
        .map(|(channel, event)| {
            let node_channel = NotificationChannel::node(event.kind(), service.clone(), event.node());
            Ok(json!({
                "channels": [channel, node_channel.to_string()],
                "event": serde_json::to_value(event)?,
            }))
        })
        .collect::<Result<Vec<_>>>()?;
    info!(count = events.len(), "notification routed");

    Ok(json!({ "outcome": outcome(&result)?, "events": events }))
}

pub fn roster_push(stanza: &Element, account: Jid) -> Result<Value> {
    let events = Arc::new(RosterEvents::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in [RosterEventKind::Set, RosterEventKind::Remove] {
        let sink = Arc::clone(&seen);
        events.subscribe(kind, move |event: &RosterEvent| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(event.clone());
            }
        });
    }

    let mut callee = IqCallee::new();
    RosterPushHandler::new(events).register(&mut callee);
    let mut pipeline = StanzaPipeline::new();
    pipeline.register(Box::new(callee));

    let result = pipeline.process_inbound(stanza, &ProcessorContext::inbound(account));
    let seen = seen
        .lock()
        .map_err(|_| anyhow::anyhow!("listener state poisoned"))?;

    Ok(json!({
        "outcome": outcome(&result)?,
        "events": serde_json::to_value(&*seen)?,
    }))
}

pub async fn roster(recorded: Element) -> Result<Value> {
    let client = RosterClient::new(Arc::new(ReplayRequester::new(recorded)));
    let roster = client.get(None).await.context("decoding roster result")?;
    Ok(serde_json::to_value(roster)?)
}

pub async fn items(recorded: Element, policy: RsmNumberPolicy) -> Result<Value> {
    let service: Jid = match recorded.attr("from") {
        Some(from) => from.parse().with_context(|| format!("invalid service {from:?}"))?,
        None => "pubsub.localhost".parse()?,
    };
    let node = recorded
        .get_child("pubsub", waddle_xmpp::ns::PUBSUB)
        .or(Some(&recorded))
        .and_then(|pubsub| pubsub.get_child("items", waddle_xmpp::ns::PUBSUB))
        .and_then(|items| items.attr("node"))
        .unwrap_or_default()
        .to_string();

    let client =
        PubSubClient::new(Arc::new(ReplayRequester::new(recorded))).with_rsm_policy(policy);
    let page = client
        .items(&service, &node, None)
        .await
        .context("decoding items result")?;
    Ok(serde_json::to_value(page)?)
}

pub async fn vcard(recorded: Element, policy: MixedContentPolicy) -> Result<Value> {
    let client =
        VCardClient::new(Arc::new(ReplayRequester::new(recorded))).with_mixed_content(policy);
    let vcard = client.get(None).await.context("decoding vCard result")?;
    Ok(serde_json::to_value(vcard)?)
}

pub fn vcard_encode(json: &str) -> Result<String> {
    let tree: VCardTree = serde_json::from_str(json).context("vCard JSON must be an object")?;
    if tree.is_empty() {
        bail!("refusing to encode an empty vCard");
    }
    Ok(element_to_string(&tree.to_element())?)
}
