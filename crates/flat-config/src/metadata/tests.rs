use super::*;

fn attribute(
    field: &'static str,
    operative: Option<&'static str>,
    legacy: &'static [&'static str],
) -> AttributeMetadata {
    AttributeMetadata {
        rust_field_name: field,
        help: "",
        operative,
        legacy,
        security_sensitive: false,
        deprecation: None,
        rust_type: RustType::of::<String>("String"),
    }
}

fn metadata_for(
    attributes: Vec<AttributeMetadata>,
    defunct: &'static [&'static str],
) -> ConfigMetadata {
    ConfigMetadata::new(
        RustType::of::<()>("TestConfig"),
        "",
        attributes.into_boxed_slice(),
        defunct.to_vec().into_boxed_slice(),
    )
}

#[test]
fn valid_metadata_has_no_problems() {
    let metadata = metadata_for(
        vec![
            attribute("http_port", Some("http.port"), &["server.http-port"]),
            attribute("threads", Some("task.threads"), &[]),
        ],
        &["task.writer-threads"],
    );
    assert!(!metadata.problems().has_errors());
    assert_eq!(metadata.attributes().len(), 2);
    assert_eq!(
        metadata.attribute("http_port").unwrap().operative,
        Some("http.port")
    );
}

#[test]
fn duplicate_operative_names_are_ambiguous() {
    let metadata = metadata_for(
        vec![
            attribute("first", Some("http.port"), &[]),
            attribute("second", Some("http.port"), &[]),
        ],
        &[],
    );
    let errors = metadata.problems().errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].text().contains("Ambiguous property 'http.port'"));
    assert!(errors[0].text().contains("'first'"));
    assert!(errors[0].text().contains("'second'"));
}

#[test]
fn legacy_name_colliding_with_operative_name() {
    let metadata = metadata_for(
        vec![
            attribute("port", Some("http.port"), &[]),
            attribute("other", Some("other.port"), &["http.port"]),
        ],
        &[],
    );
    let errors = metadata.problems().errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].text().contains("Legacy property 'http.port'"));
    assert!(errors[0].text().contains("collides"));
}

#[test]
fn duplicate_legacy_names() {
    let metadata = metadata_for(
        vec![
            attribute("first", Some("a"), &["old.name"]),
            attribute("second", Some("b"), &["old.name"]),
        ],
        &[],
    );
    let errors = metadata.problems().errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].text().contains("Duplicate legacy property"));
}

#[test]
fn bindable_defunct_name_is_an_error() {
    let metadata = metadata_for(vec![attribute("port", Some("http.port"), &[])], &["http.port"]);
    let errors = metadata.problems().errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].text().contains("Defunct property 'http.port'"));
    assert!(errors[0].text().contains("still bound"));
}

#[test]
fn attribute_without_names_is_an_error() {
    let metadata = metadata_for(vec![attribute("orphan", None, &[])], &[]);
    let errors = metadata.problems().errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].text().contains("has no property names"));
}

#[test]
fn malformed_property_names_are_rejected() {
    for name in [".leading.dot", "trailing.dot.", "with space", "non-ascii-é"] {
        let boxed: &'static str = Box::leak(name.to_owned().into_boxed_str());
        let metadata = metadata_for(vec![attribute("field", Some(boxed), &[])], &[]);
        assert!(
            metadata.problems().has_errors(),
            "name {name:?} should be rejected"
        );
    }
}
