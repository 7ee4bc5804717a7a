use std::sync::{Arc, Mutex};

use minidom::Element;
use tracing_test::traced_test;
use waddle_roster::{
    RosterEvent, RosterEventKind, RosterEvents, RosterItem, RosterPushHandler, Subscription,
};
use waddle_test_support::fixtures;
use waddle_xmpp::{IqCallee, ProcessorContext, ProcessorResult, StanzaPipeline};

fn pipeline(events: &Arc<RosterEvents>) -> StanzaPipeline {
    let mut callee = IqCallee::new();
    RosterPushHandler::new(Arc::clone(events)).register(&mut callee);

    let mut pipeline = StanzaPipeline::new();
    pipeline.register(Box::new(callee));
    pipeline
}

fn context() -> ProcessorContext {
    ProcessorContext::inbound("juliet@example.com/balcony".parse().unwrap())
}

fn record(events: &RosterEvents) -> Arc<Mutex<Vec<RosterEvent>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for kind in [RosterEventKind::Set, RosterEventKind::Remove] {
        let sink = Arc::clone(&log);
        events.subscribe(kind, move |event: &RosterEvent| {
            sink.lock().unwrap().push(event.clone());
        });
    }
    log
}

#[test]
fn push_without_sender_is_trusted() {
    let events = Arc::new(RosterEvents::new());
    let log = record(&events);

    let result =
        pipeline(&events).process_inbound(&fixtures::element("roster-push-set.xml"), &context());

    let ProcessorResult::Reply(reply) = &result else {
        panic!("push must be acknowledged, got {result:?}");
    };
    assert_eq!(reply.attr("type"), Some("result"));
    assert_eq!(reply.attr("id"), Some("push1"));

    assert_eq!(
        *log.lock().unwrap(),
        vec![RosterEvent::Set {
            item: RosterItem {
                jid: "nurse@example.com".parse().unwrap(),
                name: "Nurse".into(),
                subscription: Subscription::None,
                approved: false,
                ask: true,
                groups: vec!["Servants".into()],
            },
            version: Some("ver13".into()),
        }]
    );
}

#[test]
fn remove_push_from_own_bare_address() {
    let events = Arc::new(RosterEvents::new());
    let log = record(&events);

    let result = pipeline(&events)
        .process_inbound(&fixtures::element("roster-push-remove.xml"), &context());

    assert!(result.is_handled());
    assert_eq!(
        *log.lock().unwrap(),
        vec![RosterEvent::Remove {
            jid: "nurse@example.com".parse().unwrap(),
            version: Some("ver14".into()),
        }]
    );
}

#[test]
#[traced_test]
fn spoofed_push_is_ignored() {
    let events = Arc::new(RosterEvents::new());
    let log = record(&events);

    let result = pipeline(&events)
        .process_inbound(&fixtures::element("roster-push-spoofed.xml"), &context());

    assert_eq!(result, ProcessorResult::Continue);
    assert!(log.lock().unwrap().is_empty());
    assert!(logs_contain("ignoring roster push from foreign sender"));
}

#[test]
fn push_without_version_has_none() {
    let events = Arc::new(RosterEvents::new());
    let log = record(&events);
    let stanza: Element = "<iq xmlns='jabber:client' type='set' id='p'>\
         <query xmlns='jabber:iq:roster'><item jid='foo@bar' subscription='none'/></query></iq>"
        .parse()
        .unwrap();

    pipeline(&events).process_inbound(&stanza, &context());

    assert_eq!(
        *log.lock().unwrap(),
        vec![RosterEvent::Set {
            item: RosterItem::new("foo@bar".parse().unwrap()),
            version: None,
        }]
    );
}

#[test]
fn roster_get_is_not_a_push() {
    let events = Arc::new(RosterEvents::new());
    let log = record(&events);
    let stanza: Element = "<iq xmlns='jabber:client' type='get' id='g'>\
         <query xmlns='jabber:iq:roster'/></iq>"
        .parse()
        .unwrap();

    let result = pipeline(&events).process_inbound(&stanza, &context());

    assert_eq!(result, ProcessorResult::Continue);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn events_serialize_with_tag() {
    let event = RosterEvent::Remove {
        jid: "foo@bar".parse().unwrap(),
        version: Some("v1".into()),
    };
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        serde_json::json!({"event": "remove", "jid": "foo@bar", "version": "v1"})
    );
}
