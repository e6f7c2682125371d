use layered_text::{BaseSpan, Layer, Located, Span};

use crate::{
    iterate_consecutive_spans, iterate_enclosed_spans, iterate_hovering_spans,
    iterate_intersecting_pairs, iterate_intersecting_spans, iterate_nested_spans,
    iterate_overlapping_spans, iterate_touching_spans, pattern_gap, whitespace_gap,
};

fn letters(text: &str, ranges: &[(usize, usize)]) -> Layer {
    let mut layer = Layer::new("letters", Vec::<String>::new()).unwrap();
    for &(start, end) in ranges {
        layer
            .add_default_annotation(BaseSpan::elementary(start, end).unwrap())
            .unwrap();
    }
    assert!(ranges.iter().all(|&(_, end)| end <= text.len()));
    layer
}

fn texts<'a>(
    text: &'a str,
    pairs: impl Iterator<Item = (&'a Span, &'a Span)>,
) -> Vec<(&'a str, &'a str)> {
    pairs
        .map(|(a, b)| (&text[a.start()..a.end()], &text[b.start()..b.end()]))
        .collect()
}

fn bounds<'a, A: Located + 'a, B: Located + 'a>(
    pairs: impl Iterator<Item = (&'a A, &'a B)>,
) -> Vec<((usize, usize), (usize, usize))> {
    pairs
        .map(|(a, b)| ((a.start(), a.end()), (b.start(), b.end())))
        .collect()
}

#[test]
fn hovering_pairs_of_single_spaced_letters() {
    let text = "A B C D";
    let layer = letters(text, &[(0, 1), (2, 3), (4, 5), (6, 7)]);
    assert_eq!(
        texts(text, iterate_hovering_spans(layer.spans(), 0)),
        vec![("A", "B"), ("B", "C"), ("C", "D")]
    );
    assert!(iterate_touching_spans(layer.spans()).next().is_none());
}

#[test]
fn hovering_with_minimal_gap() {
    let text = "A  B C  D E";
    let layer = letters(text, &[(0, 1), (3, 4), (5, 6), (8, 9), (10, 11)]);
    assert_eq!(
        texts(text, iterate_hovering_spans(layer.spans(), 2)),
        vec![("A", "B"), ("C", "D")]
    );
}

#[test]
fn consecutive_spans_respect_gap_rules() {
    let text = "a, b c;d";
    let layer = letters(text, &[(0, 1), (3, 4), (5, 6), (7, 8)]);

    assert_eq!(
        texts(text, iterate_consecutive_spans(text, layer.spans(), None, |_: &str| true)),
        vec![("a", "b"), ("b", "c"), ("c", "d")]
    );
    assert_eq!(
        texts(text, iterate_consecutive_spans(text, layer.spans(), Some(1), |_: &str| true)),
        vec![("b", "c"), ("c", "d")]
    );
    assert_eq!(
        texts(text, iterate_consecutive_spans(text, layer.spans(), None, whitespace_gap)),
        vec![("b", "c")]
    );
    let punctuation = pattern_gap(r"\s*[,;]\s*").unwrap();
    assert_eq!(
        texts(text, iterate_consecutive_spans(text, layer.spans(), None, punctuation)),
        vec![("a", "b"), ("c", "d")]
    );
}

#[test]
fn successors_share_the_nearest_start() {
    let text = "ab cd";
    let layer = letters(text, &[(0, 2), (3, 4), (3, 5), (4, 5)]);
    assert_eq!(
        bounds(iterate_hovering_spans(layer.spans(), 1)),
        vec![((0, 2), (3, 4)), ((0, 2), (3, 5))]
    );
    assert_eq!(
        bounds(iterate_touching_spans(layer.spans())),
        vec![((3, 4), (4, 5))]
    );
}

#[test]
fn overlap_nesting_and_intersection() {
    let text = "0123456789";
    let layer = letters(text, &[(0, 4), (0, 6), (2, 5), (3, 8), (8, 9)]);
    let spans = layer.spans();

    assert_eq!(
        bounds(iterate_overlapping_spans(spans)),
        vec![((0, 4), (2, 5)), ((0, 4), (3, 8)), ((0, 6), (3, 8)), ((2, 5), (3, 8))]
    );
    assert_eq!(
        bounds(iterate_nested_spans(spans)),
        vec![((0, 4), (0, 6)), ((0, 6), (2, 5))]
    );
    assert_eq!(
        bounds(iterate_intersecting_spans(spans)),
        vec![
            ((0, 4), (0, 6)),
            ((0, 4), (2, 5)),
            ((0, 4), (3, 8)),
            ((0, 6), (2, 5)),
            ((0, 6), (3, 8)),
            ((2, 5), (3, 8)),
        ]
    );
}

#[test]
fn nested_pairs_keep_sorted_order() {
    let text = "A B CD EF G";
    let layer = letters(
        text,
        &[(0, 1), (2, 3), (4, 5), (5, 6), (4, 6), (7, 8), (8, 9), (7, 9), (10, 11)],
    );
    assert_eq!(
        texts(text, iterate_nested_spans(layer.spans())),
        vec![("C", "CD"), ("CD", "D"), ("E", "EF"), ("EF", "F")]
    );
}

#[test]
fn two_layer_sweeps() {
    let text = "Hello world. Bye.";
    let sentences = letters(text, &[(0, 12), (13, 17)]);
    let words = letters(text, &[(0, 5), (6, 11), (11, 12), (13, 16), (16, 17)]);
    let enclosed: Vec<((usize, usize), (usize, usize))> =
        bounds(iterate_enclosed_spans(sentences.spans(), words.spans()));
    assert_eq!(enclosed.len(), 5);
    assert_eq!(enclosed[3], ((13, 17), (13, 16)));

    let chunks = letters(text, &[(4, 7), (15, 17)]);
    assert_eq!(
        bounds(iterate_intersecting_pairs(chunks.spans(), words.spans())),
        vec![((4, 7), (0, 5)), ((4, 7), (6, 11)), ((15, 17), (13, 16)), ((15, 17), (16, 17))]
    );
}

#[test]
fn enveloping_spans_use_outer_bounds() {
    let spans = vec![
        BaseSpan::from_ranges(&[(0, 2), (3, 5)]).unwrap(),
        BaseSpan::from_ranges(&[(6, 8)]).unwrap(),
    ];
    assert_eq!(
        bounds(iterate_hovering_spans(&spans, 1)),
        vec![((0, 5), (6, 8))]
    );
}
