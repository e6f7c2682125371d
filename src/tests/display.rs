use crate::{BaseSpan, Layer, Text, TextDisplay};

fn words_and_sentences(
    input: &str,
    words: &[(usize, usize)],
    sentences: &[&[(usize, usize)]],
) -> Text {
    let mut text = Text::new(input);

    let mut word_layer = Layer::builder("words").attributes(["len"]).build().unwrap();
    for &(start, end) in words {
        word_layer
            .add_annotation(BaseSpan::elementary(start, end).unwrap(), [("len", end - start)])
            .unwrap();
    }
    text.add_layer(word_layer).unwrap();

    let mut sentence_layer = Layer::builder("sentences").enveloping("words").build().unwrap();
    for ranges in sentences {
        sentence_layer
            .add_default_annotation(BaseSpan::from_ranges(ranges).unwrap())
            .unwrap();
    }
    text.add_layer(sentence_layer).unwrap();
    text
}

#[test]
fn test_display_words() {
    let text = words_and_sentences("A B C D", &[(0, 1), (2, 3), (4, 5), (6, 7)], &[]);
    let display = TextDisplay::new(&text).with("words");

    insta::assert_snapshot!(display, @r###"
    A B C D
    ╰words { len: 1 }
      ╰words { len: 1 }
        ╰words { len: 1 }
          ╰words { len: 1 }
    "###);
}

#[test]
fn test_display_enveloping() {
    let text = words_and_sentences(
        "Hello world. Bye.",
        &[(0, 5), (6, 11), (11, 12), (13, 16), (16, 17)],
        &[&[(0, 5), (6, 11), (11, 12)], &[(13, 16), (16, 17)]],
    );
    let display = TextDisplay::new(&text).with("sentences").with("missing");

    insta::assert_snapshot!(display, @r###"
    Hello world. Bye.
    ╰──────────╯sentences
                 ╰──╯sentences
    "###);
}

#[test]
fn test_display_wide_characters() {
    let text = words_and_sentences("日本 go", &[(0, 6), (7, 9)], &[]);
    let display = TextDisplay::new(&text).with("words");

    insta::assert_snapshot!(display, @r###"
    日本 go
    ╰──╯words { len: 6 }
         ╰╯words { len: 2 }
    "###);
}
