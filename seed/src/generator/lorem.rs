use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;

use crate::error::SeedResult;
use crate::generator::RecordSource;
use crate::types::{RecordLevel, SyntheticRecord, TextShape};

const WORDS: &[&str] = &[
    "a", "ac", "accumsan", "ad", "adipiscing", "aenean", "aliquam", "aliquet", "amet", "ante",
    "aptent", "arcu", "at", "auctor", "augue", "bibendum", "blandit", "class", "commodo",
    "condimentum", "congue", "consectetur", "consequat", "conubia", "convallis", "cras",
    "cubilia", "curabitur", "curae", "cursus", "dapibus", "diam", "dictum", "dictumst",
    "dignissim", "dis", "dolor", "donec", "dui", "duis", "egestas", "eget", "eleifend",
    "elementum", "elit", "enim", "erat", "eros", "est", "et", "etiam", "eu", "euismod",
    "facilisi", "facilisis", "fames", "faucibus", "felis", "fermentum", "feugiat", "fringilla",
    "fusce", "gravida", "habitant", "habitasse", "hac", "hendrerit", "himenaeos", "iaculis",
    "id", "imperdiet", "in", "inceptos", "integer", "interdum", "ipsum", "justo", "lacinia",
    "lacus", "laoreet", "lectus", "leo", "libero", "ligula", "litora", "lobortis", "lorem",
    "luctus", "maecenas", "magna", "magnis", "malesuada", "massa", "mattis", "mauris", "metus",
    "mi", "molestie", "mollis", "montes", "morbi", "mus", "nam", "nascetur", "natoque", "nec",
    "neque", "netus", "nibh", "nisi", "nisl", "non", "nostra", "nulla", "nullam", "nunc", "odio",
    "orci", "ornare", "parturient", "pellentesque", "penatibus", "per", "pharetra", "phasellus",
    "placerat", "platea", "porta", "porttitor", "posuere", "potenti", "praesent", "pretium",
    "primis", "proin", "pulvinar", "purus", "quam", "quis", "quisque", "rhoncus", "ridiculus",
    "risus", "rutrum", "sagittis", "sapien", "scelerisque", "sed", "sem", "semper", "senectus",
    "sit", "sociis", "sociosqu", "sodales", "sollicitudin", "suscipit", "suspendisse", "taciti",
    "tellus", "tempor", "tempus", "tincidunt", "torquent", "tortor", "tristique", "turpis",
    "ullamcorper", "ultrices", "ultricies", "urna", "ut", "varius", "vehicula", "vel", "velit",
    "venenatis", "vestibulum", "vitae", "vivamus", "viverra", "volutpat", "vulputate",
];

/// Generates lorem ipsum records shaped for one hierarchy level.
///
/// Both the name and the body are single sentences: the first word is capitalized and the
/// sentence ends with a period.
#[derive(Debug)]
pub struct LoremSource {
    shape: TextShape,
    rng: StdRng,
}

impl LoremSource {
    pub fn new(level: RecordLevel) -> Self {
        Self {
            shape: level.text_shape(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(level: RecordLevel, seed: u64) -> Self {
        Self {
            shape: level.text_shape(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn sentence(&mut self, words: RangeInclusive<usize>) -> String {
        let count = self.rng.gen_range(words);
        let mut sentence = String::with_capacity(count * 8);

        for index in 0..count {
            let word = WORDS.choose(&mut self.rng).copied().unwrap_or("lorem");
            if index == 0 {
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    sentence.extend(first.to_uppercase());
                    sentence.push_str(chars.as_str());
                }
            } else {
                sentence.push(' ');
                sentence.push_str(word);
            }
        }
        sentence.push('.');

        sentence
    }
}

impl RecordSource for LoremSource {
    fn next_record(&mut self) -> SeedResult<SyntheticRecord> {
        let name = self.sentence(self.shape.name_words.clone());
        let body = self.sentence(self.shape.body_words.clone());

        Ok(SyntheticRecord::new(name, body))
    }
}
