//! Whole-layer operations: diff walks, annotation filters, joining and
//! section extraction.

use layered_text::{Annotation, BaseSpan, Layer, LayerError, LayerMode, LayerResult, Span, Text};
use std::cmp::Ordering;
use std::collections::BTreeMap;

fn owned_pairs(
    annotation: &Annotation,
) -> impl Iterator<Item = (String, layered_text::AttributeValue)> + '_ {
    annotation.iter().map(|(attribute, value)| (attribute.to_string(), value.clone()))
}

fn copy_annotations(target: &mut Layer, base_span: &BaseSpan, span: &Span) -> LayerResult<()> {
    for annotation in span.annotations() {
        target.add_annotation(base_span.clone(), owned_pairs(annotation))?;
    }
    Ok(())
}

/// Walks two layers by location and yields the places where they differ.
///
/// A location present on one side only comes out as `(Some, None)` or
/// `(None, Some)`. A location present on both sides comes out as
/// `(Some, Some)` unless `same` accepts the pair.
pub fn diff_layer<'a, F>(
    a: &'a Layer,
    b: &'a Layer,
    mut same: F,
) -> Vec<(Option<&'a Span>, Option<&'a Span>)>
where
    F: FnMut(&Span, &Span) -> bool,
{
    let mut differences = Vec::new();
    let mut left = a.spans().iter().peekable();
    let mut right = b.spans().iter().peekable();
    loop {
        match (left.peek(), right.peek()) {
            (None, None) => break,
            (Some(_), None) => differences.extend(left.by_ref().map(|x| (Some(x), None))),
            (None, Some(_)) => differences.extend(right.by_ref().map(|y| (None, Some(y)))),
            (Some(x), Some(y)) => match x.base_span().cmp(y.base_span()) {
                Ordering::Less => {
                    differences.push((Some(*x), None));
                    left.next();
                }
                Ordering::Greater => {
                    differences.push((None, Some(*y)));
                    right.next();
                }
                Ordering::Equal => {
                    if !same(x, y) {
                        differences.push((Some(*x), Some(*y)));
                    }
                    left.next();
                    right.next();
                }
            },
        }
    }
    differences
}

/// Removes the annotations matching `drop`; spans left empty are removed.
///
/// With `preserve_spans` every span keeps at least its first annotation.
pub fn drop_annotations<F>(layer: &mut Layer, mut drop: F, preserve_spans: bool)
where
    F: FnMut(&BaseSpan, &Annotation) -> bool,
{
    let mut flags = Vec::with_capacity(layer.annotation_count());
    for span in layer.spans() {
        let first = flags.len();
        flags.extend(span.annotations().iter().map(|a| !drop(span.base_span(), a)));
        if preserve_spans && !flags[first..].iter().any(|&keep| keep) {
            if let Some(flag) = flags.get_mut(first) {
                *flag = true;
            }
        }
    }
    let mut flags = flags.into_iter();
    layer.retain_annotations(|_, _| flags.next().unwrap_or(false));
}

/// Keeps only the annotations matching `keep`; see [`drop_annotations`].
pub fn keep_annotations<F>(layer: &mut Layer, mut keep: F, preserve_spans: bool)
where
    F: FnMut(&BaseSpan, &Annotation) -> bool,
{
    drop_annotations(layer, |base_span, annotation| !keep(base_span, annotation), preserve_spans)
}

fn check_joinable(layers: &[&Layer]) -> LayerResult<()> {
    let first = layers
        .first()
        .ok_or_else(|| LayerError::invalid_argument("cannot join an empty list of layers"))?;
    for layer in &layers[1..] {
        let mismatch = if layer.name() != first.name() {
            Some("name")
        } else if layer.mode() != first.mode() {
            Some("structure")
        } else if layer.attributes() != first.attributes() {
            Some("attributes")
        } else if layer.is_ambiguous() != first.is_ambiguous() {
            Some("ambiguity")
        } else {
            None
        };
        if let Some(what) = mismatch {
            return Err(LayerError::invalid_argument(format!(
                "layers {:?} and {:?} differ in {}",
                first.name(),
                layer.name(),
                what
            )));
        }
    }
    Ok(())
}

/// Concatenates layers of one schema, shifting the spans of `layers[i]` by
/// `offsets[i]`. The result is detached and has no meta.
pub fn join_layers(layers: &[&Layer], offsets: &[usize]) -> LayerResult<Layer> {
    check_joinable(layers)?;
    if layers.len() != offsets.len() {
        return Err(LayerError::invalid_argument(format!(
            "{} layers need {} offsets, got {}",
            layers.len(),
            layers.len(),
            offsets.len()
        )));
    }

    let mut joined = layers[0].empty_like();
    joined.meta_mut().clear();
    for (layer, &offset) in layers.iter().zip(offsets) {
        let delta = isize::try_from(offset)
            .map_err(|_| LayerError::invalid_argument(format!("offset {} is too large", offset)))?;
        for span in layer.spans() {
            copy_annotations(&mut joined, &span.base_span().shift(delta)?, span)?;
        }
    }
    Ok(joined)
}

/// Concatenates texts, putting `separators[i]` between `texts[i]` and
/// `texts[i + 1]`, and joins their layers. All texts must carry the same
/// layers. Text meta is not carried over.
pub fn join_texts(texts: &[&Text], separators: &[&str]) -> LayerResult<Text> {
    let first = texts
        .first()
        .ok_or_else(|| LayerError::invalid_argument("cannot join an empty list of texts"))?;
    if separators.len() + 1 != texts.len() {
        return Err(LayerError::invalid_argument(format!(
            "{} texts need {} separators, got {}",
            texts.len(),
            texts.len() - 1,
            separators.len()
        )));
    }
    let names: Vec<&str> = first.layer_names().collect();
    if let Some(other) = texts.iter().find(|t| t.layer_names().ne(names.iter().copied())) {
        return Err(LayerError::invalid_argument(format!(
            "texts have different layers: {:?} != {:?}",
            names,
            other.layer_names().collect::<Vec<_>>()
        )));
    }

    let mut joined_text = String::new();
    let mut offsets = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        if i > 0 {
            joined_text.push_str(separators[i - 1]);
        }
        offsets.push(joined_text.len());
        joined_text.push_str(text.text());
    }

    let mut joined = Text::new(joined_text);
    for layer in first.sorted_layers() {
        let parts = texts
            .iter()
            .map(|text| text.get_layer(layer.name()))
            .collect::<LayerResult<Vec<_>>>()?;
        joined.add_layer(join_layers(&parts, &offsets)?)?;
    }
    Ok(joined)
}

fn check_section(text: &Text, start: usize, end: usize) -> LayerResult<()> {
    let source = text.text();
    if start > end
        || end > source.len()
        || !source.is_char_boundary(start)
        || !source.is_char_boundary(end)
    {
        return Err(LayerError::invalid_argument(format!(
            "section ({}, {}) is not a valid range of the text",
            start, end
        )));
    }
    Ok(())
}

fn check_layers_to_keep(text: &Text, layers_to_keep: &[&str]) -> LayerResult<()> {
    for name in layers_to_keep {
        if let Some(dependency) = text.get_layer(name)?.mode().dependency() {
            if !layers_to_keep.contains(&dependency) {
                return Err(LayerError::invalid_argument(format!(
                    "layer {:?} needs {:?}, which is not kept",
                    name, dependency
                )));
            }
        }
    }
    Ok(())
}

type Relocations = BTreeMap<BaseSpan, BaseSpan>;

/// Cuts `text` into one text per `(start, end)` section.
///
/// Spans are shifted to the section start. A span crossing a section
/// boundary is dropped, or clipped to the section with `trim_overlapping`.
/// Parent layers follow their parent spans and enveloping spans keep the
/// enveloped spans that survived. `layers_to_keep` (all layers when `None`)
/// must be closed under dependencies.
pub fn extract_sections(
    text: &Text,
    sections: &[(usize, usize)],
    layers_to_keep: Option<&[&str]>,
    trim_overlapping: bool,
) -> LayerResult<Vec<Text>> {
    if let Some(keep) = layers_to_keep {
        check_layers_to_keep(text, keep)?;
    }
    let layers: Vec<&Layer> = text
        .sorted_layers()
        .into_iter()
        .filter(|layer| layers_to_keep.map_or(true, |keep| keep.contains(&layer.name())))
        .collect();

    let mut result = Vec::with_capacity(sections.len());
    for &(start, end) in sections {
        check_section(text, start, end)?;
        let mut section = Text::new(text.slice(start, end));
        let mut relocations: BTreeMap<&str, Relocations> = BTreeMap::new();

        for layer in &layers {
            let mut extracted = layer.empty_like();
            let mut moved = Relocations::new();
            for span in layer.spans() {
                let target = match layer.mode() {
                    LayerMode::Flat => clip(span.base_span(), start, end, trim_overlapping)?,
                    LayerMode::Parent(parent) => relocations
                        .get(parent.as_str())
                        .and_then(|m| m.get(span.base_span()))
                        .cloned(),
                    LayerMode::Enveloping(enveloped) => match relocations.get(enveloped.as_str()) {
                        Some(m) => envelop(span.base_span(), m, start, end, trim_overlapping)?,
                        None => None,
                    },
                };
                let target = match target {
                    Some(target) => target,
                    None => continue,
                };
                if !extracted.is_ambiguous() && extracted.get(&target).is_some() {
                    continue;
                }
                copy_annotations(&mut extracted, &target, span)?;
                moved.insert(span.base_span().clone(), target);
            }
            relocations.insert(layer.name(), moved);
            section.add_layer(extracted)?;
        }
        result.push(section);
    }
    Ok(result)
}

/// Splits `text` along the spans of `layer`; see [`extract_sections`].
pub fn split_by(
    text: &Text,
    layer: &str,
    layers_to_keep: Option<&[&str]>,
    trim_overlapping: bool,
) -> LayerResult<Vec<Text>> {
    let sections: Vec<(usize, usize)> = text
        .get_layer(layer)?
        .iter()
        .map(|span| (span.start(), span.end()))
        .collect();
    extract_sections(text, &sections, layers_to_keep, trim_overlapping)
}

fn clip(
    base_span: &BaseSpan,
    start: usize,
    end: usize,
    trim: bool,
) -> LayerResult<Option<BaseSpan>> {
    let (mut from, mut to) = (base_span.start(), base_span.end());
    if trim {
        from = from.max(start);
        to = to.min(end);
        if from > to || (from == to && !base_span.is_empty()) {
            return Ok(None);
        }
    } else if from < start || to > end {
        return Ok(None);
    }
    BaseSpan::elementary(from - start, to - start).map(Some)
}

fn envelop(
    base_span: &BaseSpan,
    enveloped: &Relocations,
    start: usize,
    end: usize,
    trim: bool,
) -> LayerResult<Option<BaseSpan>> {
    if !trim && (base_span.start() < start || base_span.end() > end) {
        return Ok(None);
    }
    let mut children: Vec<BaseSpan> = base_span
        .children()
        .iter()
        .filter_map(|child| enveloped.get(child).cloned())
        .collect();
    children.dedup();
    if children.is_empty() {
        return Ok(None);
    }
    BaseSpan::enveloping(children).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(ranges: &[(usize, usize)]) -> Layer {
        let mut layer = Layer::new("words", ["n"]).unwrap();
        for (i, &(start, end)) in ranges.iter().enumerate() {
            layer
                .add_annotation(BaseSpan::elementary(start, end).unwrap(), [("n", i)])
                .unwrap();
        }
        layer
    }

    #[test]
    fn test_diff_layer_walk() {
        let a = words(&[(0, 1), (2, 3), (4, 5)]);
        let mut b = words(&[(0, 1), (2, 4), (4, 5)]);
        b.for_each_annotation_mut(|base_span, mut annotation| {
            if base_span.start() == 4 {
                annotation.set("n", 9)?;
            }
            Ok(())
        })
        .unwrap();

        let diff = diff_layer(&a, &b, |x, y| x.annotations() == y.annotations());
        let shape: Vec<(Option<usize>, Option<usize>)> = diff
            .iter()
            .map(|(x, y)| (x.map(|s| s.end()), y.map(|s| s.end())))
            .collect();
        assert_eq!(shape, vec![(Some(3), None), (None, Some(4)), (Some(5), Some(5))]);
    }

    #[test]
    fn test_join_layers_checks_arguments() {
        let a = words(&[(0, 1)]);
        let b = Layer::new("other", ["n"]).unwrap();
        assert!(join_layers(&[], &[]).is_err());
        assert!(join_layers(&[&a, &b], &[0, 2]).is_err());
        assert!(join_layers(&[&a, &a], &[0]).is_err());
        let joined = join_layers(&[&a, &a], &[0, 2]).unwrap();
        let starts: Vec<usize> = joined.iter().map(|s| s.start()).collect();
        assert_eq!(starts, vec![0, 2]);
    }
}
