pub mod fixtures {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    use minidom::Element;

    pub fn root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("tests")
            .join("fixtures")
    }

    pub fn path(relative: impl AsRef<Path>) -> PathBuf {
        root().join(relative.as_ref())
    }

    pub fn read(relative: impl AsRef<Path>) -> io::Result<String> {
        fs::read_to_string(path(relative))
    }

    pub fn stanza(name: &str) -> String {
        read_or_panic(Path::new("stanzas").join(name))
    }

    /// Parse a stanza fixture. Fixture files are kept free of inter-element
    /// whitespace so parsed trees compare equal to built ones.
    pub fn element(name: &str) -> Element {
        let xml = stanza(name);
        xml.trim()
            .parse()
            .unwrap_or_else(|error| panic!("fixture {name} is not valid XML: {error}"))
    }

    pub fn config(name: &str) -> String {
        read_or_panic(Path::new("config").join(name))
    }

    fn read_or_panic(relative: impl AsRef<Path>) -> String {
        let relative = relative.as_ref();
        read(relative).unwrap_or_else(|error| {
            panic!(
                "failed to read fixture {}: {error}",
                relative.to_string_lossy()
            )
        })
    }
}

pub mod requester {
    use std::collections::VecDeque;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use async_trait::async_trait;
    use minidom::Element;
    use tracing::debug;
    use waddle_xmpp::{Iq, IqError, IqRequester, IqType};
    use xmpp_parsers::stanza_error::{DefinedCondition, ErrorType, StanzaError};

    /// Scripted request correlator: answers requests from a queue and keeps
    /// every request it was handed.
    ///
    /// An exhausted queue answers with [`IqError::Timeout`].
    #[derive(Default)]
    pub struct MockIqRequester {
        responses: Mutex<VecDeque<Result<Option<Element>, IqError>>>,
        sent: Mutex<Vec<Iq>>,
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    impl MockIqRequester {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a `result` carrying `payload`.
        pub fn respond(&self, payload: Element) -> &Self {
            lock(&self.responses).push_back(Ok(Some(payload)));
            self
        }

        /// Queue an empty `result`.
        pub fn respond_empty(&self) -> &Self {
            lock(&self.responses).push_back(Ok(None));
            self
        }

        pub fn fail(&self, error: IqError) -> &Self {
            lock(&self.responses).push_back(Err(error));
            self
        }

        /// Queue a stanza error with the given condition.
        pub fn fail_with(&self, condition: DefinedCondition) -> &Self {
            let error = StanzaError::new(ErrorType::Cancel, condition, "en", "");
            self.fail(IqError::from(error))
        }

        pub fn sent(&self) -> Vec<Iq> {
            lock(&self.sent).clone()
        }

        /// Payload of the `n`th request.
        pub fn sent_payload(&self, n: usize) -> Element {
            let sent = lock(&self.sent);
            let iq = sent
                .get(n)
                .unwrap_or_else(|| panic!("only {} requests were sent", sent.len()));
            match &iq.payload {
                IqType::Get(payload) | IqType::Set(payload) => payload.clone(),
                other => panic!("request {n} is not a get/set: {other:?}"),
            }
        }

        /// Last request, panicking if nothing was sent.
        pub fn last_sent(&self) -> Iq {
            lock(&self.sent)
                .last()
                .cloned()
                .unwrap_or_else(|| panic!("no requests were sent"))
        }
    }

    #[async_trait]
    impl IqRequester for MockIqRequester {
        async fn request(&self, iq: Iq) -> Result<Option<Element>, IqError> {
            debug!(id = %iq.id, "mock request");
            lock(&self.sent).push(iq);
            lock(&self.responses)
                .pop_front()
                .unwrap_or(Err(IqError::Timeout))
        }
    }
}

pub use requester::MockIqRequester;

#[cfg(test)]
mod tests {
    use super::fixtures;
    use super::MockIqRequester;
    use minidom::Element;
    use waddle_xmpp::{iq_get, IqError, IqRequester, IqType};

    #[test]
    fn fixture_root_exists() {
        assert!(fixtures::root().is_dir());
    }

    #[test]
    fn loads_stanza_fixture() {
        let stanza = fixtures::element("pubsub-item-published.xml");
        assert_eq!(stanza.name(), "message");
    }

    #[test]
    fn loads_config_fixture() {
        let config = fixtures::config("adapters.toml");
        let toml: toml::Value =
            toml::from_str(&config).expect("adapters.toml should be valid toml");
        assert!(toml.is_table());
    }

    #[tokio::test]
    async fn mock_replays_queue_then_times_out() {
        let mock = MockIqRequester::new();
        let payload = Element::builder("query", "jabber:iq:roster").build();
        mock.respond(payload.clone()).respond_empty();

        let request = || iq_get(None, Element::builder("query", "jabber:iq:roster").build());
        assert_eq!(mock.request(request()).await.unwrap(), Some(payload));
        assert_eq!(mock.request(request()).await.unwrap(), None);
        assert!(matches!(
            mock.request(request()).await,
            Err(IqError::Timeout)
        ));

        assert_eq!(mock.sent().len(), 3);
        assert!(matches!(mock.last_sent().payload, IqType::Get(_)));
    }
}
