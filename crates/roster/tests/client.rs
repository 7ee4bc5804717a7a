use std::sync::Arc;

use assert_matches::assert_matches;
use jid::{BareJid, Jid};
use minidom::Element;
use waddle_roster::{
    Roster, RosterClient, RosterError, RosterItem, RosterItemUpdate, RosterUpdate, Subscription,
};
use waddle_test_support::{fixtures, MockIqRequester};
use waddle_xmpp::{IqError, IqType};
use xmpp_parsers::stanza_error::DefinedCondition;

fn xml(raw: &str) -> Element {
    raw.parse().unwrap()
}

fn jid(raw: &str) -> Jid {
    raw.parse().unwrap()
}

fn setup() -> (Arc<MockIqRequester>, RosterClient) {
    let mock = Arc::new(MockIqRequester::new());
    let client = RosterClient::new(mock.clone());
    (mock, client)
}

#[tokio::test]
async fn get_parses_items_and_version() {
    let (mock, client) = setup();
    mock.respond(xml(concat!(
        "<query xmlns='jabber:iq:roster' ver='ver1'>",
        "<item jid='foo@foobar.com' ask='subscribe' name='Foo' subscription='both'>",
        "<group>Friends</group><group>Buddies</group></item>",
        "<item jid='bar@foobar.com' approved='true' name='Bar' subscription='from'/>",
        "</query>"
    )));

    let roster = client.get(None).await.unwrap();

    assert_eq!(
        roster,
        Some(Roster {
            items: vec![
                RosterItem {
                    jid: jid("foo@foobar.com"),
                    name: "Foo".into(),
                    subscription: Subscription::Both,
                    approved: false,
                    ask: true,
                    groups: vec!["Friends".into(), "Buddies".into()],
                },
                RosterItem {
                    jid: jid("bar@foobar.com"),
                    name: "Bar".into(),
                    subscription: Subscription::From,
                    approved: true,
                    ask: false,
                    groups: vec![],
                },
            ],
            version: Some("ver1".into()),
        })
    );
    assert_matches!(mock.last_sent().payload, IqType::Get(_));
    assert_eq!(mock.sent_payload(0), xml("<query xmlns='jabber:iq:roster'/>"));
}

#[tokio::test]
async fn empty_roster_is_not_absent() {
    let (mock, client) = setup();
    mock.respond(xml("<query xmlns='jabber:iq:roster'/>"));

    assert_eq!(client.get(None).await.unwrap(), Some(Roster::default()));
}

#[tokio::test]
async fn unchanged_version_yields_none() {
    let (mock, client) = setup();
    mock.respond_empty();

    assert_eq!(client.get(Some("ver6")).await.unwrap(), None);
    assert_eq!(
        mock.sent_payload(0),
        xml("<query xmlns='jabber:iq:roster' ver='ver6'/>")
    );
}

#[tokio::test]
async fn newer_version_returns_roster() {
    let (mock, client) = setup();
    mock.respond(xml(
        "<query xmlns='jabber:iq:roster' ver='ver7'><item jid='foo@bar'/></query>",
    ));

    let roster = client.get(Some("ver6")).await.unwrap().unwrap();

    assert_eq!(roster.version.as_deref(), Some("ver7"));
    assert_eq!(roster.items, vec![RosterItem::new(jid("foo@bar"))]);
}

#[tokio::test]
async fn fixture_roster_decodes() {
    let (mock, client) = setup();
    mock.respond(fixtures::element("roster-result.xml"));

    let roster = client.get(None).await.unwrap().unwrap();

    assert_eq!(roster.items.len(), 3);
    assert_eq!(roster.items[0].groups, vec!["Friends", "Lovers"]);
    assert!(roster.items[0].approved);
    assert!(!roster.items[2].ask, "ask='subscribed' is not a pending request");
}

#[tokio::test]
async fn set_accepts_address_forms() {
    let (mock, client) = setup();
    mock.respond_empty().respond_empty().respond_empty();
    let expected = xml("<query xmlns='jabber:iq:roster'><item jid='foo@bar'/></query>");

    client
        .set("foo@bar".parse::<RosterUpdate>().unwrap())
        .await
        .unwrap();
    client.set(jid("foo@bar")).await.unwrap();
    client
        .set("foo@bar".parse::<BareJid>().unwrap())
        .await
        .unwrap();

    for n in 0..3 {
        assert_eq!(mock.sent_payload(n), expected);
    }
    assert_matches!(mock.last_sent().payload, IqType::Set(_));
}

#[tokio::test]
async fn set_item_emits_groups_as_children() {
    let (mock, client) = setup();
    mock.respond_empty();

    client
        .set(
            RosterItemUpdate::new(jid("foo@bar"))
                .name("foobar")
                .group("a")
                .group("b"),
        )
        .await
        .unwrap();

    assert_eq!(
        mock.sent_payload(0),
        xml(concat!(
            "<query xmlns='jabber:iq:roster'><item jid='foo@bar' name='foobar'>",
            "<group>a</group><group>b</group></item></query>"
        ))
    );
}

#[tokio::test]
async fn remove_sends_remove_subscription() {
    let (mock, client) = setup();
    mock.respond_empty();

    client.remove(&jid("foo@bar")).await.unwrap();

    assert_eq!(
        mock.sent_payload(0),
        xml("<query xmlns='jabber:iq:roster'><item jid='foo@bar' subscription='remove'/></query>")
    );
}

#[tokio::test]
async fn failures_propagate() {
    let (mock, client) = setup();
    mock.fail_with(DefinedCondition::NotAuthorized);

    assert_matches!(
        client.remove(&jid("foo@bar")).await,
        Err(RosterError::Request(IqError::Stanza(_)))
    );
    assert_matches!(
        client.get(None).await,
        Err(RosterError::Request(IqError::Timeout))
    );
}

#[tokio::test]
async fn unexpected_payload_is_malformed() {
    let (mock, client) = setup();
    mock.respond(xml("<vCard xmlns='vcard-temp'/>"));

    assert_matches!(
        client.get(None).await,
        Err(RosterError::MalformedResponse(_))
    );
}
