use crate::{
    layer_from_json, layer_to_json, text_from_json, text_from_ron_str, text_to_json,
    text_to_ron_string, AttributeValue, BaseSpan, Layer, LayerError, Text,
};

fn span(start: usize, end: usize) -> BaseSpan {
    BaseSpan::elementary(start, end).unwrap()
}

fn annotated_text() -> Text {
    let mut text = Text::new("Tere, maailm!");
    text.meta_mut().insert("source".into(), AttributeValue::from("unit-test"));

    let mut words = Layer::builder("words")
        .attributes(["normalized"])
        .default_value("normalized", AttributeValue::Null)
        .build()
        .unwrap();
    words.add_annotation(span(0, 4), [("normalized", "tere")]).unwrap();
    words.add_default_annotation(span(4, 5)).unwrap();
    words.add_annotation(span(6, 12), [("normalized", "maailm")]).unwrap();
    words.add_default_annotation(span(12, 13)).unwrap();
    text.add_layer(words).unwrap();

    let mut morph = Layer::builder("morph")
        .attributes(["lemma", "score", "forms"])
        .parent("words")
        .ambiguous(true)
        .meta("tagger", "manual")
        .build()
        .unwrap();
    morph
        .add_annotation(
            span(0, 4),
            vec![
                ("lemma", AttributeValue::from("tere")),
                ("score", AttributeValue::from(0.75)),
                ("forms", AttributeValue::from(vec!["sg", "n"])),
            ],
        )
        .unwrap();
    morph
        .add_annotation(
            span(0, 4),
            vec![
                ("lemma", AttributeValue::from("tere")),
                ("score", AttributeValue::from(2)),
                ("forms", AttributeValue::Null),
            ],
        )
        .unwrap();
    text.add_layer(morph).unwrap();

    let mut sentences = Layer::builder("sentences")
        .attributes(["closed"])
        .enveloping("words")
        .build()
        .unwrap();
    sentences
        .add_annotation(
            BaseSpan::from_ranges(&[(0, 4), (4, 5), (6, 12), (12, 13)]).unwrap(),
            [("closed", true)],
        )
        .unwrap();
    text.add_layer(sentences).unwrap();

    text
}

#[test]
fn test_layer_json_shape() {
    let mut layer = Layer::new("words", ["lemma"]).unwrap();
    layer.add_annotation(span(0, 5), [("lemma", "hello")]).unwrap();

    insta::assert_snapshot!(serde_json::to_string(&layer).unwrap(), @r###"{"name":"words","attributes":["lemma"],"parent":null,"enveloping":null,"ambiguous":false,"default_values":{},"meta":{},"spans":[{"base_span":[0,5],"annotations":[{"lemma":"hello"}]}]}"###);
}

#[test]
fn test_text_layers_in_dependency_order() {
    let json: serde_json::Value =
        serde_json::from_str(&text_to_json(&annotated_text()).unwrap()).unwrap();
    let names: Vec<&str> = json["layers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|layer| layer["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["words", "morph", "sentences"]);
    assert_eq!(
        json["layers"][2]["spans"][0]["base_span"],
        serde_json::json!([[0, 4], [4, 5], [6, 12], [12, 13]])
    );
}

#[test]
fn test_json_round_trip() {
    let text = annotated_text();
    let back = text_from_json(&text_to_json(&text).unwrap()).unwrap();
    assert_eq!(text.diff(&back), None);
    assert_eq!(back, text);

    let layer = text.layer("morph").unwrap();
    assert_eq!(&layer_from_json(&layer_to_json(layer).unwrap()).unwrap(), layer);
}

#[test]
fn test_ron_round_trip() {
    let text = annotated_text();
    let ron = text_to_ron_string(&text).unwrap();
    let back = text_from_ron_str(&ron).unwrap();
    assert_eq!(back, text);
}

#[test]
fn test_deserialization_revalidates() {
    let duplicate = r#"{"name":"words","attributes":[],"parent":null,"enveloping":null,"ambiguous":false,
        "meta":{},"spans":[{"base_span":[0,1],"annotations":[{}]},{"base_span":[0,1],"annotations":[{}]}]}"#;
    assert!(matches!(layer_from_json(duplicate), Err(LayerError::Serialization { .. })));

    let both = r#"{"name":"x","attributes":[],"parent":"a","enveloping":"b","ambiguous":false,"meta":{},"spans":[]}"#;
    let err = layer_from_json(both).unwrap_err();
    assert!(err.to_string().contains("declares both parent"));

    let orphan = r#"{"text":"abc","meta":{},"layers":[
        {"name":"lemmas","attributes":[],"parent":"words","enveloping":null,"ambiguous":false,"meta":{},"spans":[]}]}"#;
    assert!(text_from_json(orphan).is_err());
}
