//! Reply classification against fixed, ordered vocabulary tables.
//!
//! Matching is substring-based and case-sensitive, exactly as the reply
//! keyboards present the phrases; each yes/no table also carries the
//! Basque variants. The first table entry found in the reply wins, so
//! tables are ordered to keep overlapping variants unambiguous.

/// Canonical token a recognized reply normalizes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Affirmative answer.
    Yes,
    /// Negative answer.
    No,
    /// Chose the confirm-delivery branch.
    ConfirmPickup,
    /// Chose the schedule-pickup branch.
    SchedulePickup,
    /// Morning pickup window.
    Morning,
    /// Afternoon pickup window.
    Afternoon,
    /// Whole-day pickup window.
    FullDay,
    /// 1.75 mm filament.
    DiameterNarrow,
    /// 3 mm filament.
    DiameterWide,
}

impl Token {
    /// The canonical form stored in collected fields (never the raw
    /// reply text).
    pub fn canonical(self) -> &'static str {
        match self {
            Token::Yes => "Sí",
            Token::No => "No",
            Token::ConfirmPickup => "Confirmar",
            Token::SchedulePickup => "Programar",
            Token::Morning => "Mañana",
            Token::Afternoon => "Tarde",
            Token::FullDay => "Todo el día",
            Token::DiameterNarrow => "1.75",
            Token::DiameterWide => "3",
        }
    }
}

/// What kind of reply the current state expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expecting {
    /// Yes/no choice (with Basque variants).
    YesNo,
    /// Confirm-delivery vs. schedule-pickup choice.
    BranchChoice,
    /// Pickup time window choice.
    TimeWindow,
    /// Filament diameter choice.
    Diameter,
    /// An integer count; the whole reply must parse.
    Count,
}

/// Result of classifying one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The reply matched a vocabulary entry.
    Matched(Token),
    /// The reply parsed as an integer (count states only).
    Numeric(i64),
    /// Nothing matched; the state self-loops.
    Unrecognized,
}

const YES_NO: &[(&str, Token)] = &[
    ("Sí", Token::Yes),
    ("Si", Token::Yes),
    ("sí", Token::Yes),
    ("si", Token::Yes),
    ("Bai", Token::Yes),
    ("bai", Token::Yes),
    ("No", Token::No),
    ("no", Token::No),
    ("Ez", Token::No),
    ("ez", Token::No),
];

const BRANCH_CHOICE: &[(&str, Token)] = &[
    ("Programar recogida", Token::SchedulePickup),
    ("programar recogida", Token::SchedulePickup),
    ("Programar", Token::SchedulePickup),
    ("programar", Token::SchedulePickup),
    ("Confirmar recogida", Token::ConfirmPickup),
    ("confirmar recogida", Token::ConfirmPickup),
];

const TIME_WINDOW: &[(&str, Token)] = &[
    ("Mañana", Token::Morning),
    ("Tarde", Token::Afternoon),
    ("Todo el día", Token::FullDay),
];

// The bare "1" shorthand stays last so it cannot shadow the longer
// variants in ambiguous replies.
const DIAMETER: &[(&str, Token)] = &[
    ("1.75mm", Token::DiameterNarrow),
    ("1.75 mm", Token::DiameterNarrow),
    ("1.75", Token::DiameterNarrow),
    ("1,75", Token::DiameterNarrow),
    ("175", Token::DiameterNarrow),
    ("3mm", Token::DiameterWide),
    ("3 mm", Token::DiameterWide),
    ("3", Token::DiameterWide),
    ("1", Token::DiameterNarrow),
];

fn lookup(text: &str, table: &[(&str, Token)]) -> Classification {
    for (variant, token) in table {
        if text.contains(variant) {
            return Classification::Matched(*token);
        }
    }
    Classification::Unrecognized
}

/// Classifies a raw reply against the expected vocabulary.
///
/// Pure; any parse or match failure is [`Classification::Unrecognized`],
/// never an error.
pub fn classify(text: &str, expecting: Expecting) -> Classification {
    match expecting {
        Expecting::YesNo => lookup(text, YES_NO),
        Expecting::BranchChoice => lookup(text, BRANCH_CHOICE),
        Expecting::TimeWindow => lookup(text, TIME_WINDOW),
        Expecting::Diameter => lookup(text, DIAMETER),
        Expecting::Count => match text.trim().parse::<i64>() {
            Ok(n) => Classification::Numeric(n),
            Err(_) => Classification::Unrecognized,
        },
    }
}
