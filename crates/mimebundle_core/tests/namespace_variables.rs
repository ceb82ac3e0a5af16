use arrow::array::{ArrayRef, Int64Array, StringArray};
use mimebundle_core::{
    build_bundle, get_variable, global_registry, set_variable, Bundle, BundleError,
    BundleResolver, DataFrame, LiveHandle, Namespace, Object, Payload, ResolverConfig, Sidecar,
    SharedObject, TrustPolicy, OBJECT_GRAPH_CONTENT_TYPE,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

fn sample_value() -> Object {
    Object::dict([
        ("a", Object::Int(1)),
        (
            "b",
            Object::List(vec![Object::Int(1), Object::Int(2), Object::Int(3)]),
        ),
    ])
}

#[test]
fn set_then_get_returns_equal_value() {
    let mut namespace: HashMap<String, Object> = HashMap::new();
    let bundle = build_bundle(&sample_value(), None).expect("bundle");

    set_variable(&mut namespace, "x", &bundle).expect("set x");
    let value = get_variable(&namespace, "x", None).expect("get x");
    assert_eq!(value, sample_value());
}

#[test]
fn set_overwrites_existing_binding() {
    let mut namespace: BTreeMap<String, Object> = BTreeMap::new();
    namespace.set("x", Object::from("old"));

    let bundle = build_bundle(&Object::Int(7), None).expect("bundle");
    set_variable(&mut namespace, "x", &bundle).expect("set x");
    assert_eq!(namespace.get("x"), Some(&Object::Int(7)));
}

#[test]
fn failed_set_leaves_namespace_untouched() {
    let mut namespace: HashMap<String, Object> = HashMap::new();
    namespace.set("x", Object::from("kept"));

    let broken = Bundle::single(
        OBJECT_GRAPH_CONTENT_TYPE,
        Payload::base64(b"garbage"),
        Sidecar::new("mimebundle.dict", 7),
    );
    let err = set_variable(&mut namespace, "x", &broken).expect_err("garbage bundle");
    assert!(matches!(err, BundleError::Decode { .. }));
    assert_eq!(Namespace::get(&namespace, "x"), Some(&Object::from("kept")));
}

#[test]
fn missing_variable_is_reported_by_name() {
    let namespace: HashMap<String, Object> = HashMap::new();
    let err = get_variable(&namespace, "nope", None).expect_err("missing");
    assert_eq!(err, BundleError::VariableNotFound("nope".to_string()));
}

#[test]
fn get_variable_returns_a_copy_not_the_live_value() {
    let node = SharedObject::new(Object::Int(1));
    let mut namespace: HashMap<String, Object> = HashMap::new();
    namespace.set("shared", Object::Shared(node.clone()));

    let copy = get_variable(&namespace, "shared", None).expect("get shared");
    let copy_node = copy.as_shared().expect("shared copy");
    assert!(!copy_node.ptr_eq(&node));

    node.replace(Object::Int(2));
    assert_eq!(*copy_node.read(), Object::Int(1));
}

#[test]
fn explicit_fallback_hint_works_for_tabular_values() {
    let frame = DataFrame::try_from_columns(vec![
        ("id", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
        ("name", Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef),
    ])
    .expect("frame");
    let mut namespace: HashMap<String, Object> = HashMap::new();
    namespace.set("df", Object::Frame(frame.clone()));

    let value = get_variable(&namespace, "df", Some(OBJECT_GRAPH_CONTENT_TYPE))
        .expect("hinted get");
    assert_eq!(value, Object::Frame(frame));
}

#[test]
fn live_handle_variable_cannot_be_fetched() {
    let mut namespace: HashMap<String, Object> = HashMap::new();
    namespace.set(
        "conn",
        Object::dict([("socket", Object::Handle(LiveHandle::new("tcp", 0_u16)))]),
    );
    let err = get_variable(&namespace, "conn", None).expect_err("handle");
    assert_eq!(
        err,
        BundleError::UnserializableObject {
            type_name: "mimebundle.LiveHandle".to_string(),
            path: "$.socket".to_string(),
        }
    );
}

#[test]
fn untrusting_resolver_refuses_object_graph_variables() {
    let resolver = BundleResolver::new(
        global_registry(),
        ResolverConfig::default().with_trust(TrustPolicy::RejectObjectGraph),
    );
    let mut namespace: HashMap<String, Object> = HashMap::new();
    let bundle = build_bundle(&sample_value(), None).expect("bundle");

    let err = resolver
        .set_variable(&mut namespace, "x", &bundle)
        .expect_err("graph refused");
    assert!(matches!(err, BundleError::UntrustedRepresentation(_)));
    assert!(namespace.is_empty());
}
