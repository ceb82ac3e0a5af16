use mimebundle_core::{
    build_bundle, global_registry, BundleError, BundleResolver, ConfigError, Object,
    ResolverConfig, TrustPolicy, ARROW_STREAM_CONTENT_TYPE, OBJECT_GRAPH_CONTENT_TYPE,
};
use std::fs;

#[test]
fn config_file_drives_resolver_behaviour() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("resolver.json");
    fs::write(
        &path,
        r#"{"preferred_order": ["application/vnd.apache.arrow.stream"], "max_payload_bytes": 65536}"#,
    )
    .expect("write config");

    let text = fs::read_to_string(&path).expect("read config");
    let config = ResolverConfig::from_json_str(&text).expect("config parses");
    assert_eq!(config.preferred_order, vec![ARROW_STREAM_CONTENT_TYPE]);
    assert_eq!(config.trust, TrustPolicy::TrustedProducer);

    let resolver = BundleResolver::new(global_registry(), config);
    let bundle = build_bundle(&Object::Int(1), None).expect("bundle");
    let err = resolver.resolve(&bundle).expect_err("graph not preferred");
    assert_eq!(
        err,
        BundleError::NoUsableRepresentation {
            available: vec![OBJECT_GRAPH_CONTENT_TYPE.to_string()],
        }
    );
}

#[test]
fn invalid_configs_are_rejected() {
    assert_eq!(
        ResolverConfig::from_json_str(r#"{"preferred_order": []}"#),
        Err(ConfigError::EmptyPreferredOrder)
    );
    assert_eq!(
        ResolverConfig::from_json_str(r#"{"max_payload_bytes": 0}"#),
        Err(ConfigError::ZeroPayloadLimit)
    );
    assert!(matches!(
        ResolverConfig::from_json_str(r#"{"trust": "sometimes"}"#),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn config_serializes_back_to_the_same_document() {
    let config = ResolverConfig::default().with_trust(TrustPolicy::RejectObjectGraph);
    let text = serde_json::to_string(&config).expect("config serializes");
    assert_eq!(ResolverConfig::from_json_str(&text), Ok(config));
}
