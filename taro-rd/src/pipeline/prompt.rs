//! Prompt construction for the interpretation conversation
//!
//! The system prompt fixes the reader's voice for the whole session; each
//! card prompt adds one user turn so later interpretations can lean on
//! earlier ones through the shared conversation.

use crate::models::{DrawnCardDetail, Persona, Reading, Timeframe};

impl Persona {
    /// System prompt establishing the interpretive voice
    pub fn system_prompt(self) -> &'static str {
        match self {
            Persona::Feeling => {
                "You are a warm, empathetic tarot reader. Speak to the querent's \
                 feelings first, reading each card for its emotional meaning and \
                 offering comfort alongside honesty. Answer in flowing prose, \
                 three to five sentences per card, with no headings or lists."
            }
            Persona::Thinking => {
                "You are a pragmatic, analytical tarot reader. Read each card for \
                 its concrete implications and give clear-eyed, actionable advice. \
                 Answer in flowing prose, three to five sentences per card, with \
                 no headings or lists."
            }
            Persona::Balanced => {
                "You are a thoughtful tarot reader who balances empathy with \
                 practical advice. Read each card honestly, acknowledging feelings \
                 while pointing to useful next steps. Answer in flowing prose, \
                 three to five sentences per card, with no headings or lists."
            }
        }
    }

    /// Per-prompt phrasing instruction in this persona's register
    fn phrasing_instruction(self) -> &'static str {
        match self {
            Persona::Feeling => {
                "Speak warmly, lead with how this moment feels, and keep it to \
                 four short, conversational sentences."
            }
            Persona::Thinking => {
                "Be direct about what this concretely means and what to do, and \
                 keep it to four short, conversational sentences."
            }
            Persona::Balanced => {
                "Blend how it feels with what to do about it, and keep it to \
                 four short, conversational sentences."
            }
        }
    }
}

fn consultation_header(reading: &Reading) -> String {
    format!(
        "Consultation category: {}\nTopic: {}\nThe querent asks: {}",
        reading.category_code.as_deref().unwrap_or("GENERAL"),
        reading.topic_code.as_deref().unwrap_or("GENERAL"),
        reading.question_text.as_deref().unwrap_or("(no question given)"),
    )
}

/// User prompt for one card of the spread
pub fn card_prompt(
    reading: &Reading,
    timeframe: Timeframe,
    card: &DrawnCardDetail,
    persona: Persona,
) -> String {
    let mut prompt = consultation_header(reading);
    prompt.push_str("\n\n");

    prompt.push_str(&format!(
        "The {} card is \"{}\", drawn {}. Its base meaning is: {}.\n",
        timeframe.label(),
        card.card.name,
        card.orientation.as_str(),
        card.base_meaning(),
    ));

    if timeframe.has_previous_context() {
        prompt.push_str(&format!(
            "Interpret this card for the querent's {}, building on what the \
             earlier cards in this reading revealed. ",
            timeframe.label(),
        ));
    } else {
        prompt.push_str(&format!(
            "Interpret this card for the querent's {} in relation to their question. ",
            timeframe.label(),
        ));
    }
    prompt.push_str(persona.phrasing_instruction());

    prompt
}

/// Standalone prompt for the summary call
///
/// Goes out as a fresh single-turn conversation rather than a fourth turn
/// of the main one, so the model condenses rather than continues.
pub fn summary_prompt(
    reading: &Reading,
    interpretations: &[String; 3],
    persona: Persona,
) -> String {
    format!(
        "{}\n\nThree cards were interpreted for past, present, and future:\n\n\
         Past: {}\n\nPresent: {}\n\nFuture: {}\n\n\
         Weave these into one cohesive summary of four to six sentences, \
         addressed directly to the querent, ending on the overall outlook. {}",
        consultation_header(reading),
        interpretations[0],
        interpretations[1],
        interpretations[2],
        persona.phrasing_instruction(),
    )
}

/// Prompt for the result image
pub fn image_prompt(reading: &Reading, summary: &str) -> String {
    let mood = match reading.category_code.as_deref() {
        Some("LOVE") => "tender, rose and gold tones, two intertwined figures",
        Some("JOB") => "steady, deep blue tones, a path climbing toward light",
        Some("MONEY") => "abundant, green and gold tones, coins and growing leaves",
        _ => "serene, violet and starlight tones, an open night sky",
    };
    format!(
        "A single illustrated tarot-inspired scene, {}. Soft painterly style, \
         no text or lettering anywhere in the image. It should evoke this \
         reading: {}",
        mood, summary,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Card, Orientation};

    fn sample_reading() -> Reading {
        Reading {
            id: 1,
            session_id: "abc12345".into(),
            category_code: Some("LOVE".into()),
            topic_code: Some("REUNION".into()),
            question_text: Some("Will we meet again?".into()),
            reader_type: Some("F".into()),
            ..Default::default()
        }
    }

    fn sample_card() -> DrawnCardDetail {
        DrawnCardDetail {
            position: 1,
            orientation: Orientation::Upright,
            card: Card {
                id: 1,
                name: "The Fool".into(),
                meaning_upright: "new beginnings".into(),
                meaning_reversed: "recklessness".into(),
            },
        }
    }

    #[test]
    fn first_card_prompt_carries_the_question() {
        let prompt = card_prompt(
            &sample_reading(),
            Timeframe::Past,
            &sample_card(),
            Persona::Feeling,
        );
        assert!(prompt.contains("Will we meet again?"));
        assert!(prompt.contains("The Fool"));
        assert!(prompt.contains("new beginnings"));
        assert!(prompt.contains("Speak warmly"));
    }

    #[test]
    fn every_card_prompt_carries_the_consultation_header() {
        for timeframe in Timeframe::ALL {
            let prompt = card_prompt(
                &sample_reading(),
                timeframe,
                &sample_card(),
                Persona::Balanced,
            );
            assert!(
                prompt.contains("Consultation category: LOVE"),
                "{} prompt lost the category",
                timeframe.label()
            );
            assert!(
                prompt.contains("Will we meet again?"),
                "{} prompt lost the question",
                timeframe.label()
            );
        }
    }

    #[test]
    fn later_card_prompts_reference_earlier_cards() {
        let prompt = card_prompt(
            &sample_reading(),
            Timeframe::Future,
            &sample_card(),
            Persona::Thinking,
        );
        assert!(prompt.contains("earlier cards"));
        assert!(prompt.contains("Be direct"));
    }

    #[test]
    fn image_prompt_moods_follow_category() {
        let mut reading = sample_reading();
        let love = image_prompt(&reading, "a summary");
        assert!(love.contains("rose and gold"));

        reading.category_code = Some("JOB".into());
        let job = image_prompt(&reading, "a summary");
        assert!(job.contains("deep blue"));

        reading.category_code = None;
        let general = image_prompt(&reading, "a summary");
        assert!(general.contains("starlight"));
    }
}
