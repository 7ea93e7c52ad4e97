use std::collections::BTreeMap;

use translation_session::{Error, SessionConfig, TranslationSession};

fn config(address: &str) -> SessionConfig {
    SessionConfig {
        address: address.to_string(),
        secure: false,
        client_name: "test-operator".into(),
        client_version: "0.0.0".into(),
        namespace: "default".into(),
        metadata: BTreeMap::new(),
    }
}

#[tokio::test]
async fn rejects_a_malformed_endpoint_without_dialing() {
    let result = TranslationSession::connect(config("not a uri \n"), std::sync::Arc::new(|_| {})).await;

    assert!(matches!(result, Err(Error::InvalidEndpoint(_))));
}
