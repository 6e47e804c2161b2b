//! Prompt catalog and the random source used to draw from it.
//!
//! The catalog is static, partitioned by mode and prompt kind. Randomness goes
//! through [`PromptRng`] so tests can pin exactly which prompt and which wheel
//! outcome come up.

use crate::types::{Mode, Prompt, PromptKind};
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Source of random indices for prompt draws and wheel spins
pub trait PromptRng: Send {
    /// Pick an index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// Thread-local OS-seeded randomness, used in production
#[derive(Debug, Default)]
pub struct SystemRng;

impl PromptRng for SystemRng {
    fn pick(&mut self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Reproducible randomness from a fixed seed
#[derive(Debug)]
pub struct SeededRng(rand::rngs::StdRng);

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self(rand::rngs::StdRng::seed_from_u64(seed))
    }
}

impl PromptRng for SeededRng {
    fn pick(&mut self, len: usize) -> usize {
        self.0.random_range(0..len)
    }
}

/// Replays a fixed list of indices, cycling when exhausted.
/// Values larger than the range wrap around.
#[derive(Debug)]
pub struct SequenceRng {
    values: Vec<usize>,
    index: usize,
}

impl SequenceRng {
    pub fn new(values: Vec<usize>) -> Self {
        Self { values, index: 0 }
    }
}

impl PromptRng for SequenceRng {
    fn pick(&mut self, len: usize) -> usize {
        if self.values.is_empty() {
            return 0;
        }
        let value = self.values[self.index % self.values.len()];
        self.index += 1;
        value % len
    }
}

impl PromptKind {
    /// Spin the wheel: truth on 0, dare on 1
    pub fn spin(rng: &mut dyn PromptRng) -> PromptKind {
        match rng.pick(2) {
            0 => PromptKind::Truth,
            _ => PromptKind::Dare,
        }
    }
}

const FRIENDLY_TRUTHS: &[&str] = &[
    "What's your funniest school memory?",
    "If you could have any superpower, what would it be?",
    "What's the most embarrassing thing that happened to you?",
    "What's your secret talent?",
    "Who's your celebrity crush?",
];

const FRIENDLY_DARES: &[&str] = &[
    "Take a selfie making your goofiest face!",
    "Do your best impression of a celebrity",
    "Dance for 30 seconds without music",
    "Send a funny meme to a random contact",
    "Speak in an accent for the next 2 rounds",
];

const CRUSH_TRUTHS: &[&str] = &[
    "Who do you secretly think about when you wake up?",
    "What's your idea of a perfect date?",
    "Have you ever had a crush on someone in this chat?",
    "What makes you instantly attracted to someone?",
    "What's the sweetest thing someone has done for you?",
];

const CRUSH_DARES: &[&str] = &[
    "Send your crush a random emoji without explanation 😏",
    "Compliment the other player in the sweetest way",
    "Share your favorite love song",
    "Tell a romantic story that moved you",
    "Describe what your dream partner looks like",
];

const ADULT_TRUTHS: &[&str] = &[
    "What kind of moment instantly melts your heart?",
    "If we were together right now, what would you want to do first?",
    "What's your love language?",
    "What's the most romantic thing you've ever experienced?",
    "What makes you feel most connected to someone?",
];

const ADULT_DARES: &[&str] = &[
    "Compliment the other player in the sweetest way you can",
    "Send a voice note describing your perfect date",
    "Share a song that describes how you feel right now",
    "Write a short romantic message to the other player",
    "Share what you find most attractive about the other person",
];

/// Prompt texts keyed by (mode, kind)
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    prompts: HashMap<(Mode, PromptKind), Vec<String>>,
}

impl PromptCatalog {
    /// The catalog shipped with the game
    pub fn builtin() -> Self {
        let sets: [(Mode, PromptKind, &[&str]); 6] = [
            (Mode::Friendly, PromptKind::Truth, FRIENDLY_TRUTHS),
            (Mode::Friendly, PromptKind::Dare, FRIENDLY_DARES),
            (Mode::Crush, PromptKind::Truth, CRUSH_TRUTHS),
            (Mode::Crush, PromptKind::Dare, CRUSH_DARES),
            (Mode::Adult, PromptKind::Truth, ADULT_TRUTHS),
            (Mode::Adult, PromptKind::Dare, ADULT_DARES),
        ];

        let prompts = sets
            .into_iter()
            .map(|(mode, kind, texts)| {
                (
                    (mode, kind),
                    texts.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect();

        Self { prompts }
    }

    /// Build a catalog from explicit entries. Later entries for the same key are appended.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Mode, PromptKind, String)>,
    {
        let mut prompts: HashMap<(Mode, PromptKind), Vec<String>> = HashMap::new();
        for (mode, kind, text) in entries {
            prompts.entry((mode, kind)).or_default().push(text);
        }
        Self { prompts }
    }

    pub fn prompts(&self, mode: Mode, kind: PromptKind) -> &[String] {
        self.prompts
            .get(&(mode, kind))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Draw uniformly from the prompts for (mode, kind); None if there are none
    pub fn draw(&self, mode: Mode, kind: PromptKind, rng: &mut dyn PromptRng) -> Option<Prompt> {
        let texts = self.prompts(mode, kind);
        if texts.is_empty() {
            return None;
        }
        let index = rng.pick(texts.len());
        Some(Prompt {
            kind,
            text: texts[index].clone(),
        })
    }
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
