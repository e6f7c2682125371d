use layered_text::{AttributeValue, ErrorKind, Layer, Text};
use layered_text_ops::ConflictStrategy;

use crate::{RegexRule, RegexTagger, Tagger, TaggerError};

fn tagged(text: &str, tagger: &RegexTagger) -> Layer {
    let mut text = Text::new(text);
    tagger.tag(&mut text).unwrap();
    text.pop_layer(&tagger.descriptor().output_layer, false)
        .unwrap()
        .remove(0)
}

fn locations(layer: &Layer) -> Vec<(usize, usize)> {
    layer.iter().map(|s| (s.start(), s.end())).collect()
}

fn new_york_rules() -> Vec<RegexRule> {
    vec![
        RegexRule::new("New York").unwrap().with_attribute("kind", "state").with_priority(1),
        RegexRule::new("York City").unwrap().with_attribute("kind", "borough").with_priority(0),
        RegexRule::new("New York City").unwrap().with_attribute("kind", "city").with_priority(2),
    ]
}

#[test]
fn tags_matches_with_their_text() {
    let tagger = RegexTagger::new("numbers", vec![RegexRule::new(r"\d+").unwrap()])
        .with_match_attribute("match");
    let layer = tagged("3 apples and 12 pears", &tagger);

    assert_eq!(locations(&layer), vec![(0, 1), (13, 15)]);
    assert_eq!(layer.spans()[1].value("match"), Some(&AttributeValue::from("12")));
    assert!(!layer.is_ambiguous());
}

#[test]
fn capture_group_gives_the_span() {
    let rule = RegexRule::new(r"(\d+) apples").unwrap().with_group(1);
    let layer = tagged("3 apples and 12 pears", &RegexTagger::new("counts", vec![rule]));
    assert_eq!(locations(&layer), vec![(0, 1)]);
}

#[test]
fn empty_matches_are_skipped() {
    let layer = tagged("ab", &RegexTagger::new("xs", vec![RegexRule::new("x*").unwrap()]));
    assert!(layer.is_empty());
}

#[test]
fn invalid_pattern_is_a_configuration_error() {
    let err = RegexRule::new("(unclosed").unwrap_err();
    assert!(matches!(err, TaggerError::InvalidPattern { .. }));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

// ============ Conflicts ============

#[test]
fn strategies_choose_among_overlapping_matches() {
    let base = RegexTagger::new("places", new_york_rules()).with_output_attributes(["kind"]);

    let layer = tagged("New York City", &base);
    assert_eq!(locations(&layer), vec![(0, 13)]);
    assert_eq!(layer.spans()[0].value("kind"), Some(&AttributeValue::from("city")));

    let tagger = RegexTagger::new("places", new_york_rules())
        .with_output_attributes(["kind"])
        .with_strategy(ConflictStrategy::KeepMinimal);
    assert_eq!(locations(&tagged("New York City", &tagger)), vec![(0, 8)]);

    let tagger = RegexTagger::new("places", new_york_rules())
        .with_output_attributes(["kind"])
        .with_strategy(ConflictStrategy::KeepAll);
    assert_eq!(
        locations(&tagged("New York City", &tagger)),
        vec![(0, 8), (0, 13), (4, 13)]
    );
}

#[test]
fn lower_priority_wins_before_the_strategy() {
    let tagger = RegexTagger::new("places", new_york_rules())
        .with_output_attributes(["kind"])
        .with_priority_attribute("priority")
        .with_strategy(ConflictStrategy::KeepAll);
    let layer = tagged("New York City", &tagger);

    assert_eq!(layer.attributes(), ["kind", "priority"]);
    assert_eq!(locations(&layer), vec![(4, 13)]);
    assert_eq!(layer.spans()[0].value("priority"), Some(&AttributeValue::Int(0)));
}

#[test]
fn rules_matching_one_location() {
    let rules = || {
        vec![
            RegexRule::new(r"\bcat\b").unwrap().with_attribute("kind", "animal"),
            RegexRule::new("cat").unwrap().with_attribute("kind", "word"),
        ]
    };

    let ambiguous = RegexTagger::new("cats", rules())
        .with_output_attributes(["kind"])
        .with_ambiguous(true);
    let layer = tagged("a cat", &ambiguous);
    assert_eq!(locations(&layer), vec![(2, 5)]);
    assert_eq!(layer.spans()[0].annotations().len(), 2);

    let single = RegexTagger::new("cats", rules()).with_output_attributes(["kind"]);
    let layer = tagged("a cat", &single);
    assert_eq!(layer.spans()[0].annotations().len(), 1);
    assert_eq!(layer.spans()[0].value("kind"), Some(&AttributeValue::from("animal")));
}

#[test]
fn undeclared_rule_attribute_is_rejected() {
    let rule = RegexRule::new(r"\d").unwrap().with_attribute("kind", "digit");
    let tagger = RegexTagger::new("numbers", vec![rule]);
    let mut text = Text::new("1");
    assert!(tagger.tag(&mut text).is_err());
    assert!(!text.has_layer("numbers"));
}
