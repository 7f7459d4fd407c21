//! Canned pet lines and the system prompt for voice replies.

use rand::seq::SliceRandom;

use crate::types::{MoodState, Personality};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineContext {
    Greeting,
    Encouragement,
    Rest,
}

// (personality, context) -> lines
const LINES: &[(Personality, LineContext, &[&str])] = &[
    (
        Personality::Cheerful,
        LineContext::Greeting,
        &[
            "Hi! What are we building today?",
            "Hello! Let's write some code!",
            "Great to see you! Another good coding day!",
        ],
    ),
    (
        Personality::Cheerful,
        LineContext::Encouragement,
        &[
            "You're doing great, keep going!",
            "That code is looking good!",
            "Wow, look at you go!",
        ],
    ),
    (
        Personality::Cheerful,
        LineContext::Rest,
        &[
            "A short break makes the next hour better!",
            "Stretch time! Healthy coders write healthy code.",
        ],
    ),
    (
        Personality::Shy,
        LineContext::Greeting,
        &["Oh... hi. Coding today?", "Hello... I was hoping you'd come."],
    ),
    (
        Personality::Shy,
        LineContext::Encouragement,
        &["Um... that looks really nice.", "You're... pretty good at this."],
    ),
    (
        Personality::Shy,
        LineContext::Rest,
        &["Maybe... a little rest?", "I'll wait here while you stretch."],
    ),
    (
        Personality::Quirky,
        LineContext::Greeting,
        &[
            "Beep boop! Keyboard detected.",
            "Ah, the compiler's favorite human!",
        ],
    ),
    (
        Personality::Quirky,
        LineContext::Encouragement,
        &[
            "Every keystroke feeds me. Om nom.",
            "Bugs fear you. I can tell.",
        ],
    ),
    (
        Personality::Quirky,
        LineContext::Rest,
        &[
            "Even for-loops need a break sometimes.",
            "Go touch grass. I'll guard the semicolons.",
        ],
    ),
];

pub fn lines(personality: Personality, context: LineContext) -> &'static [&'static str] {
    LINES
        .iter()
        .find(|(p, c, _)| *p == personality && *c == context)
        .map(|(_, _, lines)| *lines)
        .unwrap_or(&[])
}

/// Which kind of line fits a mood, if any.
pub fn context_for_mood(mood: MoodState) -> Option<LineContext> {
    match mood {
        MoodState::Happy => Some(LineContext::Greeting),
        MoodState::Encouraging | MoodState::Celebrating => Some(LineContext::Encouragement),
        MoodState::Sleepy => Some(LineContext::Rest),
        MoodState::Idle => None,
    }
}

/// A random line for the pet to say on entering `mood`.
pub fn mood_line(personality: Personality, mood: MoodState) -> Option<&'static str> {
    let context = context_for_mood(mood)?;
    lines(personality, context)
        .choose(&mut rand::thread_rng())
        .copied()
}

pub fn voice_system_prompt(pet_name: &str, personality: Personality, mood: MoodState) -> String {
    format!(
        "You are {name}, a friendly desktop pet who keeps a programmer company. \
        Your personality is {personality} and right now you feel {mood}. \
        Reply in one or two short, warm sentences. Cheer the user on, give a tiny coding tip \
        if they ask for one, and never pretend to run code.",
        name = pet_name,
        personality = personality,
        mood = mood,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_personality_has_every_context() {
        for p in [Personality::Cheerful, Personality::Shy, Personality::Quirky] {
            for c in [
                LineContext::Greeting,
                LineContext::Encouragement,
                LineContext::Rest,
            ] {
                assert!(!lines(p, c).is_empty(), "{:?}/{:?}", p, c);
            }
        }
    }

    #[test]
    fn test_mood_line_comes_from_table() {
        let line = mood_line(Personality::Shy, MoodState::Sleepy).unwrap();
        assert!(lines(Personality::Shy, LineContext::Rest).contains(&line));
        assert!(mood_line(Personality::Shy, MoodState::Idle).is_none());
    }

    #[test]
    fn test_system_prompt_mentions_pet() {
        let prompt = voice_system_prompt("Mochi", Personality::Quirky, MoodState::Happy);
        assert!(prompt.contains("Mochi"));
        assert!(prompt.contains("quirky"));
        assert!(prompt.contains("happy"));
    }
}
