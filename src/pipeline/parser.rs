//! Parser for the key transcription format
//!
//! Format:
//! +<step_delta>| <event1> <event2>  # comments
//!
//! Events:
//! - Key by symbol: a single character in single quotes (e.g. 'q', ' ', ',', ''')
//! - Note by pitch: a signed integer in semitones from concert A (e.g. 0, -24, +7)
//!
//! Events are separated by whitespace or commas. Outside quotes, `#` starts
//! a comment that runs to the end of the line.

use std::iter::Peekable;
use std::str::CharIndices;

/// A single instrument event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Pluck the string bound to a keyboard symbol
    Key(char),
    /// Play the string tuned to a pitch
    Pitch(i32),
}

/// A line from the transcription with its step delta
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvents {
    /// Steps since previous line (absolute step for first line)
    pub delta: usize,
    /// Events occurring at this step
    pub events: Vec<Event>,
}

/// Parse errors
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    InvalidLine(String),
    InvalidTimestep(String),
    InvalidEvent(String),
    InvalidPitch(String),
    UnterminatedSymbol(String),
    /// Wraps another error with the 1-based line it occurred on
    AtLine(usize, Box<ParseError>),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidLine(s) => write!(f, "Invalid line: {}", s),
            ParseError::InvalidTimestep(s) => write!(f, "Invalid timestep: {}", s),
            ParseError::InvalidEvent(s) => write!(f, "Invalid event: {}", s),
            ParseError::InvalidPitch(s) => write!(f, "Invalid pitch: {}", s),
            ParseError::UnterminatedSymbol(s) => write!(f, "Unterminated symbol: {}", s),
            ParseError::AtLine(line, e) => write!(f, "line {}: {}", line, e),
        }
    }
}

impl std::error::Error for ParseError {}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

/// Parse a quoted symbol, the opening quote already consumed
fn parse_symbol(
    chars: &mut Peekable<CharIndices<'_>>,
    text: &str,
    start: usize,
) -> Result<Event, ParseError> {
    let symbol = match chars.next() {
        Some((_, c)) => c,
        None => return Err(ParseError::UnterminatedSymbol(text[start..].to_string())),
    };

    match chars.next() {
        Some((_, '\'')) => Ok(Event::Key(symbol)),
        Some((end, _)) => Err(ParseError::UnterminatedSymbol(text[start..end].to_string())),
        None => Err(ParseError::UnterminatedSymbol(text[start..].to_string())),
    }
}

/// Parse a signed integer pitch starting at `start`
fn parse_pitch(
    chars: &mut Peekable<CharIndices<'_>>,
    text: &str,
    start: usize,
) -> Result<Event, ParseError> {
    let mut end = text.len();
    while let Some(&(i, c)) = chars.peek() {
        if is_separator(c) || c == '#' {
            end = i;
            break;
        }
        chars.next();
    }

    let token = &text[start..end];
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError::InvalidEvent(token.to_string()));
    }

    token
        .parse::<i32>()
        .map(Event::Pitch)
        .map_err(|_| ParseError::InvalidPitch(token.to_string()))
}

/// Parse the event section of a line, stopping at a comment
fn parse_events(text: &str) -> Result<Vec<Event>, ParseError> {
    let mut events = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        if is_separator(c) {
            chars.next();
        } else if c == '#' {
            break;
        } else if c == '\'' {
            chars.next();
            events.push(parse_symbol(&mut chars, text, i)?);
            // A symbol must be followed by a separator, a comment or the end
            if let Some(&(j, next)) = chars.peek() {
                if !is_separator(next) && next != '#' {
                    let end = j + next.len_utf8();
                    return Err(ParseError::InvalidEvent(text[i..end].to_string()));
                }
            }
        } else {
            events.push(parse_pitch(&mut chars, text, i)?);
        }
    }

    Ok(events)
}

/// Parse a line of the transcription format
/// Format: +<delta>| event1 event2 ...  # comment
///
/// Returns `None` for blank and comment-only lines.
pub fn parse_line(line: &str) -> Result<Option<TimedEvents>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    // Split by | to get timestep and events
    let (timestep_part, events_part) = line.split_once('|').ok_or_else(|| {
        ParseError::InvalidLine("expected format: +<delta>| events".to_string())
    })?;

    // Parse timestep delta (starts with +)
    let timestep_part = timestep_part.trim();
    let delta_str = timestep_part.strip_prefix('+').ok_or_else(|| {
        ParseError::InvalidTimestep("timestep must start with +".to_string())
    })?;
    let delta = delta_str
        .parse::<usize>()
        .map_err(|_| ParseError::InvalidTimestep(timestep_part.to_string()))?;

    let events = parse_events(events_part)?;

    Ok(Some(TimedEvents { delta, events }))
}

/// Parse full transcription text
/// Returns a list of timed events in chronological order
///
/// Lines with no events still advance time: their delta is carried into
/// the next line that has events.
pub fn parse_transcription(text: &str) -> Result<Vec<TimedEvents>, ParseError> {
    let mut result = Vec::new();
    let mut carried = 0usize;

    for (number, line) in text.lines().enumerate() {
        let timed = parse_line(line).map_err(|e| ParseError::AtLine(number + 1, Box::new(e)))?;

        let Some(timed) = timed else {
            continue;
        };

        if timed.events.is_empty() {
            carried = carried.saturating_add(timed.delta);
            continue;
        }

        result.push(TimedEvents {
            delta: carried.saturating_add(timed.delta),
            events: timed.events,
        });
        carried = 0;
    }

    Ok(result)
}
