use crate::shared::media::{MediaType, MediaTypeError};

fn mt(raw: &str) -> MediaType {
    raw.parse().unwrap()
}

#[test]
fn parses_type_subtype_and_parameters() {
    let parsed = mt("Application/JSON; charset=UTF-8");
    assert_eq!(parsed.kind(), "application");
    assert_eq!(parsed.subtype(), "json");
    assert_eq!(parsed.parameter("CHARSET"), Some("UTF-8"));
    assert_eq!(parsed.to_string(), "application/json; charset=UTF-8");
}

#[test]
fn lone_star_is_full_wildcard() {
    assert_eq!(mt("*"), MediaType::wildcard());
}

#[test]
fn rejects_malformed_input() {
    assert_eq!("".parse::<MediaType>(), Err(MediaTypeError::Empty));
    assert!(matches!(
        "text".parse::<MediaType>(),
        Err(MediaTypeError::MissingSubtype(_))
    ));
    assert!(matches!(
        "text/csv; header".parse::<MediaType>(),
        Err(MediaTypeError::MalformedParameter(_))
    ));
}

#[test]
fn exact_match_is_case_insensitive() {
    assert!(mt("TEXT/CSV").accepts(&mt("text/csv")));
    assert!(!mt("text/csv").accepts(&mt("text/plain")));
}

#[test]
fn subtype_wildcard_requires_same_type() {
    assert!(mt("text/*").accepts(&mt("text/csv")));
    assert!(!mt("text/*").accepts(&mt("application/json")));
}

#[test]
fn suffix_matches_registered_subtype() {
    assert!(mt("application/ld+json").accepts(&mt("application/json")));
    assert!(!mt("text/ld+json").accepts(&mt("application/json")));
    assert!(!mt("application/json").accepts(&mt("application/ld+json")));
}

#[test]
fn full_wildcard_accepts_anything() {
    assert!(mt("*/*").accepts(&mt("application/sparql-results+xml")));
}

#[test]
fn registered_parameters_must_be_present_on_request() {
    let registered = mt("text/csv; header=absent");
    assert!(!mt("text/csv").accepts(&registered));
    assert!(!mt("text/csv; header=present").accepts(&registered));
    assert!(mt("text/csv; header=absent; charset=utf-8").accepts(&registered));
}

#[test]
fn requested_parameters_are_advisory() {
    assert!(mt("text/csv; charset=utf-8").accepts(&mt("text/csv")));
}

#[test]
fn round_trips_through_serde_as_string() {
    let json = serde_json::to_string(&mt("text/csv")).unwrap();
    assert_eq!(json, "\"text/csv\"");
    let back: MediaType = serde_json::from_str(&json).unwrap();
    assert_eq!(back, mt("text/csv"));
}
