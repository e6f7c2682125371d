use crate::{BaseSpan, Layer, LayerError, Text};

fn span(start: usize, end: usize) -> BaseSpan {
    BaseSpan::elementary(start, end).unwrap()
}

/// "Hello world. Bye." with words, sentences and a parent layer over words.
fn sample_text() -> Text {
    let mut text = Text::new("Hello world. Bye.");

    let mut words = Layer::new("words", Vec::<String>::new()).unwrap();
    for &(start, end) in &[(0, 5), (6, 11), (11, 12), (13, 16), (16, 17)] {
        words.add_default_annotation(span(start, end)).unwrap();
    }
    text.add_layer(words).unwrap();

    let mut sentences = Layer::builder("sentences").enveloping("words").build().unwrap();
    sentences
        .add_default_annotation(BaseSpan::from_ranges(&[(0, 5), (6, 11), (11, 12)]).unwrap())
        .unwrap();
    sentences
        .add_default_annotation(BaseSpan::from_ranges(&[(13, 16), (16, 17)]).unwrap())
        .unwrap();
    text.add_layer(sentences).unwrap();

    let mut lemmas = Layer::builder("lemmas")
        .attributes(["lemma"])
        .parent("words")
        .ambiguous(true)
        .build()
        .unwrap();
    lemmas.add_annotation(span(0, 5), [("lemma", "hello")]).unwrap();
    lemmas.add_annotation(span(13, 16), [("lemma", "bye")]).unwrap();
    text.add_layer(lemmas).unwrap();

    text
}

#[test]
fn add_layer_requires_referenced_layer() {
    let mut text = Text::new("Hello");
    let sentences = Layer::builder("sentences").enveloping("words").build().unwrap();
    let err = text.add_layer(sentences).unwrap_err();
    assert_eq!(err, LayerError::MissingLayer { name: "words".into() });
}

#[test]
fn add_layer_rejects_duplicates_and_out_of_bounds_spans() {
    let mut text = sample_text();
    let err = text.add_layer(Layer::new("words", Vec::<String>::new()).unwrap()).unwrap_err();
    assert_eq!(err, LayerError::DuplicateLayer { name: "words".into() });

    let mut long = Layer::new("long", Vec::<String>::new()).unwrap();
    long.add_default_annotation(span(10, 40)).unwrap();
    assert!(matches!(text.add_layer(long), Err(LayerError::SpanOutOfBounds { len: 17, .. })));
}

#[test]
fn add_layer_rejects_spans_inside_characters() {
    let mut text = Text::new("naïve");
    let mut layer = Layer::new("chars", Vec::<String>::new()).unwrap();
    layer.add_default_annotation(span(0, 3)).unwrap();
    assert!(matches!(text.add_layer(layer), Err(LayerError::NotCharBoundary { .. })));
}

#[test]
fn enveloping_layer_sits_one_level_above() {
    let mut text = sample_text();
    let mut paragraphs = Layer::builder("paragraphs").enveloping("words").build().unwrap();
    let sentence = BaseSpan::from_ranges(&[(0, 5)]).unwrap();
    paragraphs
        .add_default_annotation(BaseSpan::enveloping(vec![sentence]).unwrap())
        .unwrap();
    assert!(matches!(
        text.add_layer(paragraphs),
        Err(LayerError::SpanLevelMismatch { expected: 1, found: 2, .. })
    ));
}

#[test]
fn navigation_through_span_refs() {
    let text = sample_text();

    let sentence = text.layer("sentences").unwrap().span_ref(1).unwrap();
    assert_eq!(sentence.enclosing_text(&text), "Bye.");
    assert_eq!(sentence.texts(&text), vec!["Bye", "."]);
    let children: Vec<&str> = sentence
        .children(&text)
        .iter()
        .map(|word| word.enclosing_text(&text))
        .collect();
    assert_eq!(children, vec!["Bye", "."]);

    let lemma = text.layer("lemmas").unwrap().span_ref(0).unwrap();
    let parent = lemma.parent(&text).unwrap();
    assert_eq!(parent.layer().name(), "words");
    assert_eq!(parent.enclosing_text(&text), "Hello");
}

#[test]
fn sorted_layers_puts_dependencies_first() {
    let text = sample_text();
    let names: Vec<&str> = text.sorted_layers().iter().map(|l| l.name()).collect();
    assert_eq!(names, vec!["words", "lemmas", "sentences"]);
}

#[test]
fn pop_layer_cascades_to_dependents() {
    let mut text = sample_text();

    let err = text.pop_layer("words", false).unwrap_err();
    assert_eq!(
        err,
        LayerError::LayerHasDependents {
            name: "words".into(),
            dependents: vec!["lemmas".into(), "sentences".into()],
        }
    );
    assert!(text.has_layer("words"));

    let removed = text.pop_layer("words", true).unwrap();
    let names: Vec<&str> = removed.iter().map(|l| l.name()).collect();
    assert_eq!(names, vec!["words", "lemmas", "sentences"]);
    assert_eq!(text.layer_names().count(), 0);
}

#[test]
fn update_layer_puts_layer_back_and_checks_it() {
    let mut text = sample_text();

    let count = text
        .update_layer("lemmas", true, |text, lemmas| -> Result<usize, LayerError> {
            let words = text.get_layer("words")?;
            lemmas.add_annotation(words.spans()[1].base_span().clone(), [("lemma", "world")])?;
            Ok(lemmas.len())
        })
        .unwrap();
    assert_eq!(count, 3);
    assert_eq!(text.layer("lemmas").unwrap().len(), 3);

    let err = text
        .update_layer("lemmas", true, |_, lemmas| -> Result<(), LayerError> {
            lemmas.remove_attribute("lemma")?;
            Err(LayerError::MissingLayer { name: "nowhere".into() })
        })
        .unwrap_err();
    assert_eq!(err, LayerError::MissingLayer { name: "nowhere".into() });
    assert!(text.has_layer("lemmas"));
}

#[test]
fn update_layer_rejects_spans_outside_the_text() {
    let mut text = sample_text();
    let before = text.clone();

    let err = text
        .update_layer("words", true, |_, words| -> Result<(), LayerError> {
            words.add_default_annotation(span(0, 100))?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, LayerError::SpanOutOfBounds { len: 17, .. }));
    assert_eq!(text.diff(&before), None);
    assert_eq!(text.layer("words").unwrap().len(), 5);
}

#[test]
fn update_layer_rejects_equal_annotations_on_one_span() {
    let mut text = sample_text();

    let err = text
        .update_layer("lemmas", true, |_, lemmas| -> Result<(), LayerError> {
            lemmas.add_annotation(span(0, 5), [("lemma", "hi")])?;
            if let Some(mut annotation) = lemmas.annotation_mut(0, 1) {
                annotation.set("lemma", "hello")?;
            }
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, LayerError::Inconsistent { .. }));

    let lemmas = text.layer("lemmas").unwrap();
    assert_eq!(lemmas.spans()[0].annotations().len(), 1);
    let back = crate::text_from_json(&crate::text_to_json(&text).unwrap()).unwrap();
    assert_eq!(back.diff(&text), None);
}

#[test]
fn diff_finds_changed_layer() {
    let a = sample_text();
    let mut b = sample_text();
    assert_eq!(a.diff(&b), None);

    b.pop_layer("lemmas", false).unwrap();
    assert!(a.diff(&b).unwrap().starts_with("layer names differ"));
}
