//! Small taggers shared by the tests.

use crate::{InputLayers, Retagger, Tagger, TaggerDescriptor, TaggerResult};
use layered_text::{BaseSpan, Layer, LayerError, LayerMode, Text};

/// Whitespace tokenizer producing `words` with a lowercased `normalized`.
#[derive(Debug)]
pub struct WordTagger {
    descriptor: TaggerDescriptor,
}

impl WordTagger {
    pub fn new() -> Self {
        WordTagger {
            descriptor: TaggerDescriptor::new("WordTagger", "words")
                .with_output_attributes(["normalized"]),
        }
    }
}

impl Tagger for WordTagger {
    fn descriptor(&self) -> &TaggerDescriptor {
        &self.descriptor
    }

    fn make_layer(&self, text: &Text, _inputs: &InputLayers<'_>) -> TaggerResult<Layer> {
        let mut layer = Layer::new("words", ["normalized"])?;
        let raw = text.text();
        let mut start = None;
        for (i, c) in raw.char_indices().chain(std::iter::once((raw.len(), ' '))) {
            if c.is_whitespace() {
                if let Some(s) = start.take() {
                    let normalized = raw[s..i].to_lowercase();
                    let base_span = BaseSpan::elementary(s, i)?;
                    layer.add_annotation(base_span, [("normalized", normalized)])?;
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        Ok(layer)
    }
}

/// Groups `words` into `sentences`, closing a sentence after a word ending in '.'.
#[derive(Debug)]
pub struct SentenceTagger {
    descriptor: TaggerDescriptor,
}

impl SentenceTagger {
    pub fn new() -> Self {
        SentenceTagger {
            descriptor: TaggerDescriptor::new("SentenceTagger", "sentences")
                .with_input_layers(["words"])
                .with_output_mode(LayerMode::Enveloping("words".to_string())),
        }
    }
}

impl Tagger for SentenceTagger {
    fn descriptor(&self) -> &TaggerDescriptor {
        &self.descriptor
    }

    fn make_layer(&self, text: &Text, inputs: &InputLayers<'_>) -> TaggerResult<Layer> {
        let words = inputs.get("words")?;
        let mut layer = Layer::builder("sentences").enveloping("words").build()?;
        let mut current = Vec::new();
        for word in words {
            current.push(word.base_span().clone());
            if text.slice(word.start(), word.end()).ends_with('.') {
                layer.add_default_annotation(BaseSpan::enveloping(std::mem::take(&mut current))?)?;
            }
        }
        if !current.is_empty() {
            layer.add_default_annotation(BaseSpan::enveloping(current)?)?;
        }
        Ok(layer)
    }
}

/// Appends `mark` to every `normalized` value of `words`.
#[derive(Debug)]
pub struct MarkRetagger {
    descriptor: TaggerDescriptor,
    mark: &'static str,
}

impl MarkRetagger {
    pub fn new(mark: &'static str) -> Self {
        MarkRetagger {
            descriptor: TaggerDescriptor::new("MarkRetagger", "words")
                .with_input_layers(["words"])
                .with_output_attributes(["normalized"]),
            mark,
        }
    }

    /// Same retagger, additionally reading `layer`.
    pub fn reading(mut self, layer: &str) -> Self {
        self.descriptor.input_layers.push(layer.to_string());
        self
    }
}

impl Retagger for MarkRetagger {
    fn descriptor(&self) -> &TaggerDescriptor {
        &self.descriptor
    }

    fn change_layer(
        &self,
        _text: &Text,
        _inputs: &InputLayers<'_>,
        layer: &mut Layer,
    ) -> TaggerResult<()> {
        layer.for_each_annotation_mut(|_, mut annotation| {
            let marked = format!(
                "{}{}",
                annotation.get("normalized").and_then(|v| v.as_str()).unwrap_or_default(),
                self.mark
            );
            annotation.set("normalized", marked)?;
            Ok(())
        })?;
        Ok(())
    }
}

/// Adds one span to `words`, wherever it points.
#[derive(Debug)]
pub struct ExtraWordRetagger {
    descriptor: TaggerDescriptor,
    start: usize,
    end: usize,
}

impl ExtraWordRetagger {
    pub fn new(start: usize, end: usize) -> Self {
        ExtraWordRetagger {
            descriptor: TaggerDescriptor::new("ExtraWordRetagger", "words")
                .with_output_attributes(["normalized"]),
            start,
            end,
        }
    }
}

impl Retagger for ExtraWordRetagger {
    fn descriptor(&self) -> &TaggerDescriptor {
        &self.descriptor
    }

    fn change_layer(
        &self,
        _text: &Text,
        _inputs: &InputLayers<'_>,
        layer: &mut Layer,
    ) -> TaggerResult<()> {
        layer.add_annotation(
            BaseSpan::elementary(self.start, self.end)?,
            [("normalized", "extra")],
        )?;
        Ok(())
    }
}

/// Declares `output` built from `inputs` and always fails.
#[derive(Debug)]
pub struct FailingTagger {
    descriptor: TaggerDescriptor,
}

impl FailingTagger {
    pub fn new(output: &str, inputs: &[&str]) -> Self {
        FailingTagger {
            descriptor: TaggerDescriptor::new("FailingTagger", output)
                .with_input_layers(inputs.iter().copied()),
        }
    }
}

impl Tagger for FailingTagger {
    fn descriptor(&self) -> &TaggerDescriptor {
        &self.descriptor
    }

    fn make_layer(&self, _text: &Text, _inputs: &InputLayers<'_>) -> TaggerResult<Layer> {
        Err(LayerError::invalid_argument("cannot tag this text").into())
    }
}

/// Declares `output` with no attributes and produces an empty layer named
/// `produced` with `attributes`.
#[derive(Debug)]
pub struct StubTagger {
    descriptor: TaggerDescriptor,
    produced: String,
    attributes: Vec<String>,
}

impl StubTagger {
    pub fn new(output: &str, inputs: &[&str]) -> Self {
        StubTagger {
            descriptor: TaggerDescriptor::new("StubTagger", output)
                .with_input_layers(inputs.iter().copied()),
            produced: output.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn producing(mut self, name: &str, attributes: &[&str]) -> Self {
        self.produced = name.to_string();
        self.attributes = attributes.iter().map(|a| a.to_string()).collect();
        self
    }
}

impl Tagger for StubTagger {
    fn descriptor(&self) -> &TaggerDescriptor {
        &self.descriptor
    }

    fn make_layer(&self, _text: &Text, _inputs: &InputLayers<'_>) -> TaggerResult<Layer> {
        Ok(Layer::new(self.produced.clone(), self.attributes.clone())?)
    }
}
