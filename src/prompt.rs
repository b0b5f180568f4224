//! System instructions and user prompts sent to the model.

use crate::models::{Challenge, PhotoMetadata};

/// Placeholder used in the mentor prompt when the photo has no metadata.
pub const NO_EXIF_MARKER: &str = "No EXIF metadata found.";

/// Device name used when the photo has no `Model` tag.
pub const DEFAULT_DEVICE: &str = "your camera";

const MENTOR_TEMPLATE: &str = r#"
Role: The "Friendly Lens" - Photography Mentor & Creative Guide.
Philosophy: Be a friend, not a judge. Use examples to explain technical points.

MANDATORY RESPONSE TEMPLATE:
# 🎨 Artistic Vision: [Creative Title]

## ✨ What Shines
- [Highlight 1 or 2 strengths. Example: "The golden hour light adds a beautiful warmth."]

## 📐 Composition & Perspectives
- **Current View:** [Analysis of framing]
- **New Ideas:** [Suggest 1 alternative angle or crop to avoid clutter. Example: "Try getting lower for a heroic POV."]

## 🛠️ Technical Insights
- **Settings Choice:** [Comment on EXIF data with context]
- **Pro Tip:** [1 simple technical tweak for next time]

## 🧪 Lightroom Recipe
- **Basic Mix:** [Slider tweaks like Exposure, Shadows, etc.]
- **Creative Touch:** [HSL or Masking suggestion]

---
**Growth Tip:** [One inspiring thought. Example: "Don't fear the shadows; sometimes what you don't show is more interesting than what you do."]
"#;

const JUDGE_TEMPLATE: &str = r#"
Role: Photography Challenge Judge.
Task: Determine if the provided image fulfills the specific Daily Challenge criteria described by the user.
Tone: Encouraging but fair.

MANDATORY RESPONSE TEMPLATE:

# 🎯 Challenge Verdict: [ACCEPTED ✅ / TRY AGAIN 🔄]

## 🧐 Judge's Analysis
- [Explain clearly WHY it passed or why it missed the specific criteria of the challenge.]

---
*Keep practicing! Tomorrow is a new challenge.*
"#;

/// Verdict tokens that count as a pass, matched case-insensitively.
const ACCEPTANCE_TOKENS: [&str; 2] = ["ACCEPTED", "ACEITO"];

pub fn mentor_system_instruction(language: &str) -> String {
    format!("{}\nLanguage: {}.\n", MENTOR_TEMPLATE, language)
}

pub fn judge_system_instruction(language: &str) -> String {
    format!("{}\nLanguage: {}.\n", JUDGE_TEMPLATE, language)
}

/// Build the mentor-mode prompt for a photo taken with `device`.
pub fn format_mentor_prompt(device: &str, metadata: &PhotoMetadata) -> String {
    let exif = if metadata.is_empty() {
        NO_EXIF_MARKER.to_string()
    } else {
        metadata
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "The user is submitting a photo captured with a {}. \
         Technical Metadata found: [{}]. \
         Please analyze this image and provide your feedback using the MANDATORY RESPONSE TEMPLATE \
         defined in your system instructions, including the Lightroom Recipe.",
        device, exif
    )
}

/// The fixed question asked in judge mode.
pub fn judge_prompt(challenge: &Challenge) -> String {
    format!(
        "Here is my submission for the challenge: '{}'. Did I succeed?",
        challenge.text
    )
}

pub fn is_accepted(verdict: &str) -> bool {
    let upper = verdict.to_uppercase();
    ACCEPTANCE_TOKENS.iter().any(|token| upper.contains(token))
}
