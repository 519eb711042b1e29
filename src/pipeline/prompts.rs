//! Fixed instructional prompts for the two inference calls.

pub const CLASSIFY_SYSTEM: &str =
    "You are a healthcare professional reviewing home-care visit notes. \
     Answer with a single word.";

pub const SUMMARY_SYSTEM: &str =
    "You are a healthcare professional summarising a client's home-care visit notes. \
     Use clear, professional language.";

/// Prompt asking for a one-word risk classification of a single note.
pub fn classification_prompt(note: &str) -> String {
    format!(
        "Classify the following care visit note into exactly one category based on the level of concern:\n\
         \n\
         RED: urgent or critical issues requiring immediate attention (safety concerns, medical emergencies, serious incidents, safeguarding issues)\n\
         AMBER: moderate concerns that need follow-up (minor health changes, care plan adjustments needed, family concerns)\n\
         GREEN: routine visit with no significant concerns (normal care delivery, positive outcomes, standard activities)\n\
         \n\
         Visit note: \"{}\"\n\
         \n\
         Classification (respond with only RED, AMBER, or GREEN):",
        note.trim()
    )
}

/// Prompt asking for a concise summary of one client's notes,
/// numbered oldest to newest.
pub fn summary_prompt(notes: &[String]) -> String {
    let numbered: Vec<String> = notes
        .iter()
        .enumerate()
        .map(|(idx, note)| format!("{}. {}", idx + 1, note))
        .collect();
    format!(
        "Summarise this client's home-care visit notes in at most 150 words, \
         highlighting changes, concerns, and any trends over time.\n\
         \n\
         Visit notes (oldest to newest):\n{}\n\
         \n\
         Summary:",
        numbered.join("\n")
    )
}
