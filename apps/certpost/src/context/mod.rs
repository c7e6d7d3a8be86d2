// Context Lookup: the read-only bank of event-type snippets, plus the swappable
// classifier that picks which entry applies to a certificate.

pub mod bank;
pub mod classifier;
