fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chatlink_protocol::{InboundFrame, OutboundFrame};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn read_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_str(&read_fixture(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  server: {fixture}\n  client: {reserialized}"
        );
    }

    // --- Server to client ---

    #[test]
    fn fixture_inbound_token() {
        roundtrip_test::<InboundFrame>("inbound_token.json");
        let frame = InboundFrame::decode(&read_fixture("inbound_token.json")).unwrap();
        assert!(frame.token.is_some());
        assert!(frame.message.is_none());
    }

    #[test]
    fn fixture_inbound_token_with_greeting() {
        roundtrip_test::<InboundFrame>("inbound_token_with_greeting.json");
        let frame =
            InboundFrame::decode(&read_fixture("inbound_token_with_greeting.json")).unwrap();
        assert!(frame.token.is_some());
        assert!(frame.message.is_some());
    }

    #[test]
    fn fixture_inbound_message() {
        roundtrip_test::<InboundFrame>("inbound_message.json");
        let frame = InboundFrame::decode(&read_fixture("inbound_message.json")).unwrap();
        assert!(frame.token.is_none());
        assert!(!frame.is_token_expired());
    }

    #[test]
    fn fixture_inbound_token_expired() {
        roundtrip_test::<InboundFrame>("inbound_token_expired.json");
        let frame = InboundFrame::decode(&read_fixture("inbound_token_expired.json")).unwrap();
        assert!(frame.is_token_expired());
    }

    // --- Client to server ---

    #[test]
    fn fixture_outbound_user_input() {
        roundtrip_test::<OutboundFrame>("outbound_user_input.json");
        let encoded = OutboundFrame::UserInput("Summarise my latest repository".into())
            .encode()
            .unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&encoded).unwrap(),
            load_fixture("outbound_user_input.json")
        );
    }

    #[test]
    fn fixture_outbound_update_token() {
        roundtrip_test::<OutboundFrame>("outbound_update_token.json");
        let parsed: OutboundFrame =
            serde_json::from_value(load_fixture("outbound_update_token.json")).unwrap();
        assert!(matches!(parsed, OutboundFrame::UpdateToken(_)));
    }

    #[test]
    fn every_fixture_is_covered() {
        let mut names: Vec<String> = fs::read_dir(fixtures_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".json"))
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "inbound_message.json",
                "inbound_token.json",
                "inbound_token_expired.json",
                "inbound_token_with_greeting.json",
                "outbound_update_token.json",
                "outbound_user_input.json",
            ]
        );
    }
}
