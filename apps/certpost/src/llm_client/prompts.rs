// Shared prompt fragments. Generation-specific templates live in generation/prompts.rs.

/// Which invented details are acceptable and which are not.
pub const SPECIFICITY_INSTRUCTION: &str = "\
## The specificity spectrum

TIER 1 — CERTAIN: facts printed on the certificate (names, dates, titles, organisations). Always use.
TIER 2 — LOGICALLY ENTAILED: things that must be true given what the certificate says. Safe.
TIER 3 — PLAUSIBLE EXPERIENCE: what a student at this kind of event would almost certainly \
experience. Use 1-2 per post, framed as personal reflection (\"I found\", \"what stuck with me\"), \
kept at the topic level.
TIER 4 — FABRICATION: specific cases, patient stories, quotes, conversations with named people. Never.";

/// Certificates are always for things that already happened.
pub const TENSE_INSTRUCTION: &str = "\
## Tense
The certificate is for something that has ALREADY HAPPENED. Always write in past tense, even if \
the certificate reads like an invitation. Never write \"I'm looking forward to\" or \"will be attending\".";

/// Words and openings the posts must avoid.
pub const BANNED_PATTERNS: &str = "\
## Banned words and patterns
Never use: \"invaluable\", \"incredibly\", \"insightful\", \"fantastic\", \"inspiring\", \"passion\", \
\"passionate\", \"privilege\", \"rewarding\", \"empowering\", \"thought-provoking\", \"eye-opening\", \
\"grateful\", \"humbled\".
Never open with: \"Thrilled to share\", \"I'm delighted\", \"Excited to announce\", \
\"Had the opportunity to\", \"Recently\", \"I recently\", \"Attended\".
Never close with: \"Thanks to [org] for organising\", \"Grateful to\", \"Looking forward to more\", \
\"What's your experience with X?\".";
