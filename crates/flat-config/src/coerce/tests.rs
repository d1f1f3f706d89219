use std::collections::{BTreeSet, HashSet};

use assert_matches::assert_matches;
use secrecy::ExposeSecret;

use super::*;

#[test]
fn strings_pass_through_unchanged() {
    let value = String::from_config_string("  spaced, not trimmed ").unwrap();
    assert_eq!(value, "  spaced, not trimmed ");
}

#[test]
fn booleans_are_strict() {
    assert!(bool::from_config_string("true").unwrap());
    assert!(bool::from_config_string("TRUE").unwrap());
    assert!(bool::from_config_string("True").unwrap());
    assert!(!bool::from_config_string("false").unwrap());
    assert!(!bool::from_config_string("FALSE").unwrap());

    for bogus in ["1", "0", "yes", "no", " true", "true ", ""] {
        assert_matches!(bool::from_config_string(bogus), Err(_), "input: {bogus:?}");
    }
}

#[test]
fn integers_and_floats() {
    assert_eq!(u16::from_config_string("8080").unwrap(), 8080);
    assert_eq!(i64::from_config_string("-42").unwrap(), -42);
    assert_eq!(f64::from_config_string("2.5").unwrap(), 2.5);
    assert_eq!(NonZeroU32::from_config_string("7").unwrap().get(), 7);

    assert_matches!(u16::from_config_string("70000"), Err(_));
    assert_matches!(u16::from_config_string("8080 "), Err(_));
    assert_matches!(NonZeroU32::from_config_string("0"), Err(_));
    assert_matches!(f64::from_config_string("2,5"), Err(_));
}

#[test]
fn urls() {
    let url = Url::from_config_string("https://example.com/status").unwrap();
    assert_eq!(url.host_str(), Some("example.com"));

    let err = Url::from_config_string("not a url").unwrap_err();
    assert!(err.detail().is_some());
}

#[test]
fn durations_with_unit_suffixes() {
    assert_eq!(
        Duration::from_config_string("300ms").unwrap(),
        Duration::from_millis(300)
    );
    assert_eq!(
        Duration::from_config_string("10s").unwrap(),
        Duration::from_secs(10)
    );
    assert_eq!(
        Duration::from_config_string("10 s").unwrap(),
        Duration::from_secs(10)
    );
    assert_eq!(
        Duration::from_config_string("5m").unwrap(),
        Duration::from_secs(300)
    );
    assert_eq!(
        Duration::from_config_string("1.5h").unwrap(),
        Duration::from_secs(5_400)
    );
    assert_eq!(
        Duration::from_config_string("2d").unwrap(),
        Duration::from_secs(2 * 86_400)
    );

    for bogus in ["10", "s", "-5s", "1.5.2h", "10 minutes"] {
        assert_matches!(Duration::from_config_string(bogus), Err(_), "input: {bogus:?}");
    }
}

#[test]
fn secret_strings() {
    let secret = SecretString::from_config_string("hunter2").unwrap();
    assert_eq!(secret.expose_secret(), "hunter2");
}

#[test]
fn lists_preserve_order_and_duplicates() {
    let items = Vec::<String>::from_config_string("a, b ,,c").unwrap();
    assert_eq!(items, ["a", "b", "c"]);

    let items = Vec::<u32>::from_config_string("3,1,3").unwrap();
    assert_eq!(items, [3, 1, 3]);

    assert_matches!(Vec::<u32>::from_config_string("1,2,x"), Err(_));
}

#[test]
fn sets_deduplicate() {
    let items = HashSet::<u32>::from_config_string("3,1,3").unwrap();
    assert_eq!(items, HashSet::from([1, 3]));

    let items = BTreeSet::<String>::from_config_string(" a , b , a ").unwrap();
    assert_eq!(items.into_iter().collect::<Vec<_>>(), ["a", "b"]);
}

#[test]
fn options_wrap_present_values() {
    assert_eq!(Option::<u16>::from_config_string("80").unwrap(), Some(80));
    assert_matches!(Option::<u16>::from_config_string("x"), Err(_));
}

#[test]
fn splitting_repeated_values() {
    assert_eq!(split_items("a, b ,,c").collect::<Vec<_>>(), ["a", "b", "c"]);
    assert_eq!(split_items("").count(), 0);
    assert_eq!(split_items(" , ,").count(), 0);
}

#[test]
fn canonical_round_trips() {
    for value in [0_i64, -17, i64::MAX] {
        assert_eq!(i64::from_config_string(&value.to_string()).unwrap(), value);
    }
    for value in [0.5_f64, -3.25, 1e10] {
        assert_eq!(f64::from_config_string(&value.to_string()).unwrap(), value);
    }
    for value in [true, false] {
        assert_eq!(bool::from_config_string(&value.to_string()).unwrap(), value);
    }
    let url = Url::from_config_string("https://example.com/a?b=c").unwrap();
    assert_eq!(Url::from_config_string(url.as_str()).unwrap(), url);
}
