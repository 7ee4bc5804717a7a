use std::sync::Arc;

use assert_matches::assert_matches;
use jid::Jid;
use minidom::Element;
use waddle_core::config::MixedContentPolicy;
use waddle_test_support::{fixtures, MockIqRequester};
use waddle_vcard::{VCardClient, VCardError, VCardTree};
use waddle_xmpp::{IqError, IqType};

fn xml(raw: &str) -> Element {
    raw.parse().unwrap()
}

fn setup() -> (Arc<MockIqRequester>, VCardClient) {
    let mock = Arc::new(MockIqRequester::new());
    let client = VCardClient::new(mock.clone());
    (mock, client)
}

fn foo_bar() -> VCardTree {
    VCardTree::new().with("FN", "Foo Bar").with(
        "N",
        VCardTree::new().with("FAMILY", "Bar").with("GIVEN", "Foo"),
    )
}

#[tokio::test]
async fn set_sends_rebuilt_tree() {
    let (mock, client) = setup();
    mock.respond_empty();

    client.set(&foo_bar()).await.unwrap();

    let sent = mock.last_sent();
    assert_eq!(sent.to, None);
    assert_matches!(sent.payload, IqType::Set(_));
    assert_eq!(
        mock.sent_payload(0),
        xml(concat!(
            "<vCard xmlns='vcard-temp'><FN>Foo Bar</FN>",
            "<N><FAMILY>Bar</FAMILY><GIVEN>Foo</GIVEN></N></vCard>"
        ))
    );
}

#[tokio::test]
async fn get_own_vcard() {
    let (mock, client) = setup();
    mock.respond(xml(concat!(
        "<vCard xmlns='vcard-temp'><FN>Foo Bar</FN>",
        "<N><FAMILY>Bar</FAMILY><GIVEN>Foo</GIVEN></N></vCard>"
    )));

    let vcard = client.get(None).await.unwrap();

    assert_eq!(vcard, Some(foo_bar()));
    let sent = mock.last_sent();
    assert_eq!(sent.to, None);
    assert_matches!(sent.payload, IqType::Get(_));
    assert_eq!(mock.sent_payload(0), xml("<vCard xmlns='vcard-temp'/>"));
}

#[tokio::test]
async fn get_addresses_target_on_the_iq_only() {
    let (mock, client) = setup();
    mock.respond(fixtures::element("vcard-result.xml"));
    let target: Jid = "stpeter@jabber.org".parse().unwrap();

    let vcard = client.get(Some(&target)).await.unwrap().unwrap();

    assert_eq!(mock.last_sent().to, Some(target));
    assert_eq!(mock.sent_payload(0), xml("<vCard xmlns='vcard-temp'/>"));
    assert_eq!(vcard.text("NICKNAME"), Some("stpeter"));
    assert_eq!(
        vcard.tree("N").and_then(|n| n.text("MIDDLE")),
        Some(""),
        "an empty element decodes to an empty string"
    );
    assert_eq!(
        vcard.tree("ORG").and_then(|org| org.text("ORGNAME")),
        Some("XMPP Standards Foundation")
    );
}

#[tokio::test]
async fn policy_decides_mixed_content() {
    let mixed = "<vCard xmlns='vcard-temp'><ORG>XSF<ORGUNIT>Council</ORGUNIT></ORG></vCard>";
    let mock = Arc::new(MockIqRequester::new());
    let client =
        VCardClient::new(mock.clone()).with_mixed_content(MixedContentPolicy::ElementsFirst);
    mock.respond(xml(mixed));

    let vcard = client.get(None).await.unwrap().unwrap();

    assert_eq!(
        vcard.tree("ORG"),
        Some(&VCardTree::new().with("ORGUNIT", "Council"))
    );
}

#[tokio::test]
async fn empty_result_is_none() {
    let (mock, client) = setup();
    mock.respond_empty();

    assert_eq!(client.get(None).await.unwrap(), None);
}

#[tokio::test]
async fn wrong_payload_is_malformed() {
    let (mock, client) = setup();
    mock.respond(xml("<query xmlns='jabber:iq:roster'/>"));

    assert_matches!(client.get(None).await, Err(VCardError::MalformedResponse(_)));
}

#[tokio::test]
async fn timeouts_propagate() {
    let (_mock, client) = setup();

    assert_matches!(
        client.set(&foo_bar()).await,
        Err(VCardError::Request(IqError::Timeout))
    );
}
