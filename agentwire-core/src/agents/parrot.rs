//! A parrot-therapist agent that answers with a private response event.

use futures::StreamExt;
use rand::seq::SliceRandom;
use rand::Rng;

use super::expand_response;
use crate::agent::{Agent, EventStream, RunStream};
use crate::error::AgentError;
use crate::input::RunAgentInput;

const FALLBACK_PROMPT: &str = "My life is complicated";

const REFLECTIONS: &[(&str, &str)] = &[
    ("am", "are"),
    ("are", "am"),
    ("i", "you"),
    ("you", "I"),
    ("me", "you"),
    ("my", "your"),
    ("your", "my"),
    ("i'm", "you are"),
    ("im", "you are"),
    ("myself", "yourself"),
    ("was", "were"),
    ("were", "was"),
    ("i'd", "you would"),
    ("i've", "you have"),
    ("i'll", "you will"),
    ("you've", "I have"),
    ("you'll", "I will"),
];

const INTERJECTIONS: &[&str] = &[
    "Squawk!",
    "Pretty bird!",
    "Polly wants a cracker!",
    "Raawwkk!",
    "Hrrrrk!",
];

const QUESTION_PHRASES: &[&str] = &[
    "Why do you say",
    "Could you elaborate on why you said",
    "What makes you mention",
    "Why might you feel",
    "What's behind your statement about",
    "Tell me more about",
];

/// Event produced by [`ParrotAgent::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParrotEvent {
    /// The full reply text.
    Response(String),
}

/// Reflects the last user message back as a question.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParrotAgent;

impl ParrotAgent {
    pub fn new() -> Self {
        Self
    }

    /// Build a reply to `prompt` using the thread-local RNG.
    pub fn completion(prompt: &str) -> String {
        Self::completion_with(prompt, &mut rand::thread_rng())
    }

    /// Build a reply to `prompt` using `rng` to pick the phrasing.
    ///
    /// Words are lowercased and pronouns are swapped, so "I am tired"
    /// becomes "you are tired".
    pub fn completion_with<R: Rng + ?Sized>(prompt: &str, rng: &mut R) -> String {
        let reflected: Vec<String> = prompt
            .split_whitespace()
            .map(|word| {
                let word = word.to_lowercase();
                match REFLECTIONS.iter().find(|(from, _)| *from == word) {
                    Some((_, to)) => to.to_string(),
                    None => word,
                }
            })
            .collect();

        let question = QUESTION_PHRASES.choose(rng).unwrap_or(&QUESTION_PHRASES[0]);
        let interjection = INTERJECTIONS.choose(rng).unwrap_or(&INTERJECTIONS[0]);

        format!("{} \"{}\"? {}", question, reflected.join(" "), interjection)
    }
}

impl Agent for ParrotAgent {
    type Event = ParrotEvent;

    fn description(&self) -> &str {
        "A stochastic parrot therapist"
    }

    fn run(&self, input: RunAgentInput) -> RunStream<ParrotEvent> {
        Box::pin(async_stream::stream! {
            let prompt = input
                .last_user_content()
                .filter(|content| !content.trim().is_empty())
                .unwrap_or(FALLBACK_PROMPT);
            let reply = ParrotAgent::completion(prompt);
            yield Ok::<ParrotEvent, AgentError>(ParrotEvent::Response(reply));
        })
    }

    fn transform(&self, input: &RunAgentInput, source: RunStream<ParrotEvent>) -> EventStream {
        let responses = source.map(|item| item.map(|ParrotEvent::Response(text)| text));
        expand_response(input, Box::pin(responses))
    }
}
