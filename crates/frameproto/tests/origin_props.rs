//! Property tests for origin derivation and parsing.

use frameproto::LoadingProtocol;
use frameproto::app_id_from_origin;
use frameproto::app_origin;
use frameproto::payload;
use proptest::prelude::*;

fn protocol() -> impl Strategy<Value = LoadingProtocol> {
    prop_oneof![
        Just(LoadingProtocol::Assets),
        Just(LoadingProtocol::LocalhostSubdomain),
        Just(LoadingProtocol::LocaltestMe),
    ]
}

proptest! {
    #[test]
    fn app_id_survives_origin(
        protocol in protocol(),
        app_id in "[^.:/?]{1,40}",
        port in any::<u16>(),
    ) {
        let origin = app_origin(protocol, &app_id, port);
        let parsed = app_id_from_origin(protocol, &origin).unwrap();
        prop_assert_eq!(parsed.as_str(), app_id.as_str());
    }

    #[test]
    fn unicode_and_punctuation_ids_survive(
        protocol in protocol(),
        app_id in "[\\p{L}\\p{N}\\p{P}&&[^.:/?]]{1,20}",
        port in any::<u16>(),
    ) {
        let origin = app_origin(protocol, &app_id, port);
        let parsed = app_id_from_origin(protocol, &origin).unwrap();
        prop_assert_eq!(parsed.as_str(), app_id.as_str());
    }

    #[test]
    fn app_id_survives_path_and_query(
        protocol in protocol(),
        app_id in "[a-z0-9-]{1,20}",
        query in "[a-z=&/.]{0,20}",
    ) {
        let origin = format!("{}/index.html?{}", app_origin(protocol, &app_id, 4040), query);
        let parsed = app_id_from_origin(protocol, &origin).unwrap();
        prop_assert_eq!(parsed.as_str(), app_id.as_str());
    }

    #[test]
    fn origin_is_deterministic(protocol in protocol(), app_id in "[a-z]{1,10}", port in any::<u16>()) {
        prop_assert_eq!(app_origin(protocol, &app_id, port), app_origin(protocol, &app_id, port));
    }

    #[test]
    fn integers_read_back_unchanged(n in any::<i64>()) {
        let value = serde_json::json!(n);
        let bytes = payload::encode(&value).unwrap();
        let decoded: serde_json::Value = rmp_serde::from_slice(&bytes).unwrap();
        prop_assert_eq!(decoded, value);
    }
}
