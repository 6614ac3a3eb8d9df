use studymate_core::types::SearchHit;

const SEPARATOR: &str = "\n\n";

/// Concatenate hits into a context block of at most `max_chars` characters.
///
/// Each hit becomes `[source] text`; blocks are separated by a blank line.
/// The block that crosses the budget is cut at a character boundary and
/// later hits are dropped.
pub fn format_context(hits: &[SearchHit], max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for hit in hits {
        let sep = if out.is_empty() { "" } else { SEPARATOR };
        let block = format!("{sep}[{}] {}", hit.source, hit.text.trim());
        let len = block.chars().count();
        if used + len <= max_chars {
            out.push_str(&block);
            used += len;
            continue;
        }
        let remaining = max_chars - used;
        if remaining > sep.len() {
            out.extend(block.chars().take(remaining));
        }
        break;
    }
    out
}
