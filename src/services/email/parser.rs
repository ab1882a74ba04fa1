//! Splits a plain-text email body into greeting, paragraphs and sign-off so
//! it can be poured into the HTML templates.

pub const DEFAULT_GREETING: &str = "Greetings from Helium,";
pub const DEFAULT_SIGNOFF: [&str; 2] = ["Thanks,", "The Helium Team"];

const GREETING_WORDS: [&str; 4] = ["greetings", "dear", "hello", "hi"];
const SIGNOFF_PREFIXES: [&str; 6] = [
    "thanks",
    "thank you",
    "best regards",
    "sincerely",
    "regards",
    "yours truly",
];
const TEAM_MARKERS: [&str; 2] = ["team", "helium"];
const SHORT_LINE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEmail {
    pub greeting: String,
    pub paragraphs: Vec<String>,
    /// Sign-off lines, rendered joined by `<br>`
    pub signoff: Vec<String>,
}

impl Default for ParsedEmail {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            paragraphs: Vec::new(),
            signoff: DEFAULT_SIGNOFF.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub fn parse_email_text(text: &str) -> ParsedEmail {
    let mut parsed = ParsedEmail::default();

    if text.trim().is_empty() {
        return parsed;
    }

    let content = strip_title_line(text);

    let mut paragraphs = split_non_empty(&content, "\n\n");
    if paragraphs.is_empty() {
        paragraphs = split_non_empty(&content, "\n");
    }

    if let Some(index) = paragraphs.iter().position(|p| is_greeting(p)) {
        parsed.greeting = normalize_greeting(&paragraphs.remove(index));
    } else if let Some(first) = paragraphs.first() {
        if first.len() < SHORT_LINE && !has_sentence_break(first) {
            parsed.greeting = paragraphs.remove(0);
        }
    }

    if let Some(index) = paragraphs.iter().position(|p| is_signoff(p)) {
        let line = paragraphs.remove(index);
        let next_is_team = paragraphs
            .get(index)
            .map(|next| contains_any(next, &TEAM_MARKERS))
            .unwrap_or(false);

        parsed.signoff = if next_is_team {
            vec![line, paragraphs.remove(index)]
        } else if let Some((thanks, team)) = split_inline_team(&line) {
            vec![thanks, team]
        } else {
            vec![line]
        };
    } else if let Some(last) = paragraphs.last() {
        if last.len() < SHORT_LINE && (is_signoff(last) || is_name_with_comma(last)) {
            parsed.signoff = paragraphs.pop().into_iter().collect();
        }
    }

    parsed.paragraphs = paragraphs;
    parsed
}

/// Drops a leading `Title: ...` line and the blank line after it
fn strip_title_line(text: &str) -> String {
    let (first, rest) = match text.split_once('\n') {
        Some(parts) => parts,
        None => return text.trim().to_string(),
    };

    match first.find(':') {
        Some(pos) if pos > 0 => rest.strip_prefix('\n').unwrap_or(rest).trim().to_string(),
        _ => text.trim().to_string(),
    }
}

fn split_non_empty(text: &str, separator: &str) -> Vec<String> {
    text.split(separator)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn starts_with_word(text: &str, word: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    match lower.strip_prefix(word) {
        Some(rest) => rest
            .chars()
            .next()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true),
        None => false,
    }
}

fn is_greeting(paragraph: &str) -> bool {
    GREETING_WORDS.iter().any(|w| starts_with_word(paragraph, w))
}

fn is_signoff(paragraph: &str) -> bool {
    let lower = paragraph.to_ascii_lowercase();
    SIGNOFF_PREFIXES.iter().any(|p| lower.starts_with(p))
}

fn normalize_greeting(greeting: &str) -> String {
    const PREFIX: &str = "greetings from ";
    if greeting.len() >= PREFIX.len()
        && greeting.is_char_boundary(PREFIX.len())
        && greeting[..PREFIX.len()].eq_ignore_ascii_case(PREFIX)
    {
        format!("Greetings from {}", &greeting[PREFIX.len()..])
    } else {
        greeting.to_string()
    }
}

fn has_sentence_break(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    chars
        .windows(2)
        .any(|w| matches!(w[0], '.' | '!' | '?') && w[1].is_whitespace())
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    let lower = text.to_ascii_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

/// `Thanks, the Helium Team` on one line becomes two sign-off lines
fn split_inline_team(line: &str) -> Option<(String, String)> {
    const TEAM: &str = "the helium team";
    let lower = line.to_ascii_lowercase();
    let thanks = lower.find("thanks")?;
    let team = thanks + lower[thanks..].find(TEAM)?;
    let before_team = &line[thanks..team];
    if before_team.contains('\n') {
        return None;
    }
    Some((
        before_team.trim_end().to_string(),
        line[team..team + TEAM.len()].to_string(),
    ))
}

/// Matches a lone capitalised word followed by a comma, e.g. `Cheers,`
fn is_name_with_comma(text: &str) -> bool {
    let trimmed = text.trim_end();
    let Some(word) = trimmed.strip_suffix(',') else {
        return false;
    };
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            let rest: Vec<char> = chars.collect();
            !rest.is_empty() && rest.iter().all(|c| c.is_ascii_lowercase())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_uses_defaults() {
        assert_eq!(parse_email_text("   \n"), ParsedEmail::default());
    }

    #[test]
    fn test_full_downtime_text() {
        let text = "Scheduled Downtime: Helium will be unavailable for 1 hour\n\n\
                    Greetings from Helium,\n\n\
                    We wanted to let you know. It will be short.\n\n\
                    During this window, you won't be able to access Helium.\n\n\
                    We appreciate your patience.\n\n\
                    Thanks,\nThe Helium Team";

        let parsed = parse_email_text(text);
        assert_eq!(parsed.greeting, "Greetings from Helium,");
        assert_eq!(parsed.paragraphs.len(), 3);
        assert_eq!(parsed.paragraphs[0], "We wanted to let you know. It will be short.");
        assert_eq!(parsed.signoff, vec!["Thanks,\nThe Helium Team".to_string()]);
    }

    #[test]
    fn test_signoff_followed_by_team_paragraph() {
        let text = "Hello Ada,\n\nYour credits are ready. Enjoy them.\n\nBest regards,\n\nThe Helium Team";
        let parsed = parse_email_text(text);
        assert_eq!(parsed.greeting, "Hello Ada,");
        assert_eq!(parsed.paragraphs, vec!["Your credits are ready. Enjoy them.".to_string()]);
        assert_eq!(
            parsed.signoff,
            vec!["Best regards,".to_string(), "The Helium Team".to_string()]
        );
    }

    #[test]
    fn test_inline_team_signoff_is_split() {
        let text = "Dear team,\n\nA short update. More soon.\n\nThanks, the Helium Team";
        let parsed = parse_email_text(text);
        assert_eq!(
            parsed.signoff,
            vec!["Thanks,".to_string(), "the Helium Team".to_string()]
        );
    }

    #[test]
    fn test_greeting_normalized() {
        let parsed = parse_email_text("greetings from helium,\n\nBody text here. Done.");
        assert_eq!(parsed.greeting, "Greetings from helium,");
    }

    #[test]
    fn test_short_first_line_becomes_greeting() {
        let parsed = parse_email_text("Team update\n\nThe release shipped. Thanks to all.");
        assert_eq!(parsed.greeting, "Team update");
        assert_eq!(parsed.signoff, ParsedEmail::default().signoff);
    }

    #[test]
    fn test_hi_needs_word_boundary() {
        let parsed =
            parse_email_text("History shows that uptime matters. We agree.\n\nCheers,");
        assert_eq!(parsed.greeting, DEFAULT_GREETING);
        assert_eq!(parsed.signoff, vec!["Cheers,".to_string()]);
        assert_eq!(
            parsed.paragraphs,
            vec!["History shows that uptime matters. We agree.".to_string()]
        );
    }
}
