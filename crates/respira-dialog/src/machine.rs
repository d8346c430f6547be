//! The per-state transition function.
//!
//! `advance` is pure apart from the session it was handed: it classifies
//! the turn, writes at most one validated field, moves the state tag, and
//! returns the replies to deliver. Malformed input is never an error —
//! numeric and choice states self-loop with a corrective prompt until
//! they get something they understand.

use crate::prompts::{self, MessageCatalog};
use crate::vocab::{classify, Classification, Expecting, Token};
use rand::Rng;
use respira_core::{OutboundMessage, TurnMessage};
use respira_session::{Branch, DialogState, Session};
use tracing::info;

/// Texts the entry handler accepts, besides the slash commands.
const ENTRY_COMMANDS: &[&str] = &["/start", "/empezar", "Vamos", "vamos", "Empezar", "empezar"];
const CANCEL_COMMAND: &str = "/cancel";

/// Whether a turn's text is one of the fixed entry literals.
///
/// Matching is case-sensitive and exact, like the keyboards that
/// produce these texts.
pub fn is_entry_command(text: &str) -> bool {
    ENTRY_COMMANDS.contains(&text.trim())
}

/// Whether a turn's text is the cancel command.
pub fn is_cancel_command(text: &str) -> bool {
    text.trim() == CANCEL_COMMAND
}

/// What the dispatcher should do after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The dialog continues; wait for the next turn.
    Continue,
    /// A terminal state was reached: finalize the record, then dispose
    /// of the session.
    Finalize,
}

/// Result of advancing the state machine by one turn.
#[derive(Debug)]
pub struct Step {
    /// Replies to deliver, in order.
    pub replies: Vec<OutboundMessage>,
    /// Whether the session continues or finalizes.
    pub outcome: StepOutcome,
}

impl Step {
    fn reply(reply: OutboundMessage) -> Self {
        Self {
            replies: vec![reply],
            outcome: StepOutcome::Continue,
        }
    }

    fn finalize(replies: Vec<OutboundMessage>) -> Self {
        Self {
            replies,
            outcome: StepOutcome::Finalize,
        }
    }
}

/// Advances `session` by one turn.
///
/// Writes the validated field for the current state (if any), moves
/// `session.state`, and returns the replies to send. The random source
/// feeds the "didn't understand" responder.
pub fn advance(
    session: &mut Session,
    turn: &TurnMessage,
    catalog: &MessageCatalog,
    rng: &mut impl Rng,
) -> Step {
    let text = turn.text();
    let chat_id = session.chat_id;
    match session.state {
        DialogState::Province => province(session, text),
        DialogState::ChooseBranch => choose_branch(session, text, catalog, rng),
        DialogState::ConfirmDelivery => confirm_delivery(session, text, catalog, rng),
        DialogState::NotDelivered => not_delivered(session, text, catalog, rng),
        DialogState::QuantityDeliveredA => quantity(
            session,
            text,
            "👎 Por favor, introduce el número de unidades del modelo de Osakidetza.",
            |s, n| s.fields.qty_delivered_a = Some(n),
            DialogState::QuantityDeliveredB,
            OutboundMessage::text(
                chat_id,
                "👍 Estupendo, ¿me puedes decir cuántos has entregado del modelo anterior?",
            ),
        ),
        DialogState::QuantityDeliveredB => quantity(
            session,
            text,
            "👎 Por favor, introduce el número de unidades del modelo anterior.",
            |s, n| s.fields.qty_delivered_b = Some(n),
            DialogState::PlaReceived,
            OutboundMessage::choices(
                chat_id,
                "Vale.\n¿Necesitas más PLA 🎁?",
                prompts::YES_NO_KEYBOARD,
            ),
        ),
        DialogState::PlaReceived => pla_received(session, text, catalog, rng),
        DialogState::PlaDiameter => pla_diameter(session, text, catalog, rng),
        DialogState::CoilsReturned => coils_returned(session, text, catalog, rng),
        DialogState::CoilsReturnedQty => quantity(
            session,
            text,
            "👎 Por favor, introduce el número de bobinas entregadas para su reutilización.",
            |s, n| s.fields.coils_returned_qty = Some(n),
            DialogState::PlaReceived,
            OutboundMessage::choices(
                chat_id,
                "Muy bien. ¿Necesitas más PLA 🎁?",
                prompts::YES_NO_KEYBOARD,
            ),
        ),
        DialogState::QuantityPreparedA => quantity(
            session,
            text,
            "👎 Por favor, introduce el número de unidades listas del modelo de Osakidetza.",
            |s, n| s.fields.qty_prepared_a = Some(n),
            DialogState::QuantityPreparedB,
            OutboundMessage::text(
                chat_id,
                "👍 Estupendo, ¿me puedes decir cuántas tienes listas del modelo anterior?",
            ),
        ),
        DialogState::QuantityPreparedB => quantity(
            session,
            text,
            "👎 Por favor, introduce el número de unidades listas del modelo anterior.",
            |s, n| s.fields.qty_prepared_b = Some(n),
            DialogState::Municipality,
            OutboundMessage::text(
                chat_id,
                "Ok, voy a necesitar algo de información para programar esta recogida.\n\
                 Dime cuál es tu municipio.",
            ),
        ),
        DialogState::Municipality => free_text(
            session,
            text,
            "Dime cuál es tu municipio.",
            |s, value| s.fields.municipality = Some(value),
            DialogState::Address,
            OutboundMessage::text(chat_id, "Muy bien, ahora la dirección para esta recogida."),
        ),
        DialogState::Address => free_text(
            session,
            text,
            "Dime la dirección para esta recogida.",
            |s, value| s.fields.address = Some(value),
            DialogState::Schedule,
            OutboundMessage::choices(
                chat_id,
                "¿En qué horario podemos pasar?",
                prompts::TIME_KEYBOARD,
            ),
        ),
        DialogState::Schedule => schedule(session, text, catalog, rng),
        DialogState::Phone => phone(session, turn, catalog),
    }
}

// ── Per-state handlers ──────────────────────────────────────────────────────

fn province(session: &mut Session, text: &str) -> Step {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Step::reply(OutboundMessage::choices(
            session.chat_id,
            "Dime en qué provincia estás, por favor.",
            prompts::PROVINCE_KEYBOARD,
        ));
    }
    session.fields.province = Some(trimmed.to_string());
    session.state = DialogState::ChooseBranch;
    info!(user = %session.first_name, province = %trimmed, "Province recorded");
    Step::reply(OutboundMessage::choices(
        session.chat_id,
        "¿En qué te puedo ayudar?",
        prompts::BRANCH_KEYBOARD,
    ))
}

fn choose_branch(
    session: &mut Session,
    text: &str,
    catalog: &MessageCatalog,
    rng: &mut impl Rng,
) -> Step {
    match classify(text, Expecting::BranchChoice) {
        Classification::Matched(Token::SchedulePickup) => {
            session.branch = Some(Branch::Schedule);
            session.state = DialogState::QuantityPreparedA;
            info!(user = %session.first_name, "Schedule branch chosen");
            Step::reply(OutboundMessage::text(
                session.chat_id,
                "👌 Estupendo, ¿me puedes decir cuántas viseras tienes listas del \
                 modelo de Osakidetza?",
            ))
        }
        Classification::Matched(Token::ConfirmPickup) => {
            session.branch = Some(Branch::Confirm);
            session.state = DialogState::ConfirmDelivery;
            info!(user = %session.first_name, "Confirm branch chosen");
            Step::reply(OutboundMessage::choices(
                session.chat_id,
                "¿Puedes confirmar la entrega de productos? 🚚",
                prompts::YES_NO_KEYBOARD,
            ))
        }
        _ => unrecognized(session, text, catalog, rng, prompts::BRANCH_KEYBOARD),
    }
}

fn confirm_delivery(
    session: &mut Session,
    text: &str,
    catalog: &MessageCatalog,
    rng: &mut impl Rng,
) -> Step {
    match classify(text, Expecting::YesNo) {
        Classification::Matched(token @ Token::Yes) => {
            session.fields.delivered = Some(token.canonical().to_string());
            session.state = DialogState::QuantityDeliveredA;
            info!(user = %session.first_name, "Delivery confirmed");
            Step::reply(OutboundMessage::text(
                session.chat_id,
                "👌 Estupendo, ¿me puedes decir cuántos has entregado del modelo de \
                 Osakidetza?",
            ))
        }
        Classification::Matched(token @ Token::No) => {
            session.fields.delivered = Some(token.canonical().to_string());
            session.state = DialogState::NotDelivered;
            info!(user = %session.first_name, "Delivery not confirmed");
            Step::reply(OutboundMessage::choices(
                session.chat_id,
                "☹️ Lo sentimos, puede que nuestros compañeros de recogida hayan tenido \
                 algún problema 🚑.\nTe pedimos que esperes un poco antes de marcar la \
                 recogida como fallida. Si ya llevas un rato esperando o son más de las \
                 20:00, márcala como fallida para que lo tengamos en cuenta.\n\
                 ¿Prefieres esperar un rato?",
                prompts::YES_NO_KEYBOARD,
            ))
        }
        _ => unrecognized(session, text, catalog, rng, prompts::YES_NO_KEYBOARD),
    }
}

fn not_delivered(
    session: &mut Session,
    text: &str,
    catalog: &MessageCatalog,
    rng: &mut impl Rng,
) -> Step {
    match classify(text, Expecting::YesNo) {
        Classification::Matched(Token::No) => {
            info!(user = %session.first_name, "Failed pickup reported");
            Step::finalize(vec![
                OutboundMessage::text(
                    session.chat_id,
                    "🤷 Ahora mismo no sé lo que ha podido pasar. Déjame que pase esta \
                     información y el equipo tratará de solucionarlo lo antes posible. \
                     Sentimos las molestias.",
                ),
                prompts::farewell(session),
            ])
        }
        Classification::Matched(Token::Yes) => {
            info!(user = %session.first_name, "User will wait for the pickup");
            Step::finalize(vec![
                OutboundMessage::text(session.chat_id, "Vale, ¡gracias por tu paciencia!"),
                prompts::farewell(session),
            ])
        }
        _ => unrecognized(session, text, catalog, rng, prompts::YES_NO_KEYBOARD),
    }
}

fn pla_received(
    session: &mut Session,
    text: &str,
    catalog: &MessageCatalog,
    rng: &mut impl Rng,
) -> Step {
    match classify(text, Expecting::YesNo) {
        Classification::Matched(token @ Token::Yes) => {
            session.fields.pla_received = Some(token.canonical().to_string());
            session.state = DialogState::PlaDiameter;
            Step::reply(OutboundMessage::choices(
                session.chat_id,
                "¿De qué diámetro lo necesitas?",
                prompts::DIAMETER_KEYBOARD,
            ))
        }
        Classification::Matched(token @ Token::No) => {
            session.fields.pla_received = Some(token.canonical().to_string());
            if session.fields.coils_returned.is_none() {
                // Coils not asked about yet; detour before closing.
                session.state = DialogState::CoilsReturned;
                Step::reply(OutboundMessage::choices(
                    session.chat_id,
                    "Vale.\n¿Has entregado ya bobinas vacías para su reutilización?",
                    prompts::YES_NO_KEYBOARD,
                ))
            } else {
                info!(user = %session.first_name, "No more PLA needed");
                Step::finalize(vec![prompts::farewell(session)])
            }
        }
        _ => unrecognized(session, text, catalog, rng, prompts::YES_NO_KEYBOARD),
    }
}

fn pla_diameter(
    session: &mut Session,
    text: &str,
    catalog: &MessageCatalog,
    rng: &mut impl Rng,
) -> Step {
    match classify(text, Expecting::Diameter) {
        Classification::Matched(token @ Token::DiameterNarrow) => {
            session.fields.pla_diameter = Some(token.canonical().to_string());
            info!(user = %session.first_name, diameter = "1.75", "Filament diameter recorded");
            Step::finalize(vec![
                OutboundMessage::text(session.chat_id, "1.75mm 🧵, entendido."),
                prompts::farewell(session),
            ])
        }
        Classification::Matched(token @ Token::DiameterWide) => {
            session.fields.pla_diameter = Some(token.canonical().to_string());
            info!(user = %session.first_name, diameter = "3", "Filament diameter recorded");
            Step::finalize(vec![
                OutboundMessage::text(session.chat_id, "3mm 🧶, entendido."),
                prompts::farewell(session),
            ])
        }
        _ => unrecognized(session, text, catalog, rng, prompts::DIAMETER_KEYBOARD),
    }
}

fn coils_returned(
    session: &mut Session,
    text: &str,
    catalog: &MessageCatalog,
    rng: &mut impl Rng,
) -> Step {
    match classify(text, Expecting::YesNo) {
        Classification::Matched(token @ Token::Yes) => {
            session.fields.coils_returned = Some(token.canonical().to_string());
            session.state = DialogState::CoilsReturnedQty;
            Step::reply(OutboundMessage::text(session.chat_id, "¿Cuántas?"))
        }
        Classification::Matched(token @ Token::No) => {
            session.fields.coils_returned = Some(token.canonical().to_string());
            session.state = DialogState::PlaReceived;
            Step::reply(OutboundMessage::choices(
                session.chat_id,
                "Muy bien. ¿Necesitas más PLA 🎁?",
                prompts::YES_NO_KEYBOARD,
            ))
        }
        _ => unrecognized(session, text, catalog, rng, prompts::YES_NO_KEYBOARD),
    }
}

fn schedule(
    session: &mut Session,
    text: &str,
    catalog: &MessageCatalog,
    rng: &mut impl Rng,
) -> Step {
    match classify(text, Expecting::TimeWindow) {
        Classification::Matched(token @ (Token::Morning | Token::Afternoon | Token::FullDay)) => {
            session.fields.time_window = Some(token.canonical().to_string());
            session.state = DialogState::Phone;
            info!(user = %session.first_name, window = token.canonical(), "Time window recorded");
            Step::reply(OutboundMessage::contact_request(
                session.chat_id,
                "Muy bien, por último, dime tu teléfono",
            ))
        }
        _ => unrecognized(session, text, catalog, rng, prompts::TIME_KEYBOARD),
    }
}

fn phone(session: &mut Session, turn: &TurnMessage, catalog: &MessageCatalog) -> Step {
    let number = match &turn.contact {
        Some(contact) => Some(contact.phone_number.clone()),
        None if turn.text().chars().count() >= 9 => Some(turn.text().to_string()),
        None => None,
    };

    match number {
        Some(number) => {
            session.fields.phone = Some(number);
            info!(user = %session.first_name, "Phone number recorded");
            Step::finalize(vec![
                OutboundMessage::text(
                    session.chat_id,
                    "👌 Genial, en la próxima recogida pasarán por tu dirección en el \
                     horario indicado. Gracias.",
                ),
                OutboundMessage::text(session.chat_id, catalog.pickup_ready.clone()),
                prompts::farewell(session),
            ])
        }
        None => Step::reply(OutboundMessage::contact_request(
            session.chat_id,
            "Yo creo que ahí me faltan números. Dímelo de nuevo sólo con números \
             (ej. 679123456) o comparte tu contacto, por favor.",
        )),
    }
}

// ── Shared handler shapes ───────────────────────────────────────────────────

/// Numeric-expecting state: on a whole-reply integer, store and advance;
/// otherwise self-loop with the corrective prompt and write nothing.
fn quantity(
    session: &mut Session,
    text: &str,
    corrective: &str,
    store: impl FnOnce(&mut Session, i64),
    next: DialogState,
    success: OutboundMessage,
) -> Step {
    match classify(text, Expecting::Count) {
        Classification::Numeric(n) => {
            store(session, n);
            session.state = next;
            info!(user = %session.first_name, value = n, state = ?next, "Count recorded");
            Step::reply(success)
        }
        _ => {
            info!(
                user = %session.first_name,
                reply = %text,
                state = ?session.state,
                "Reply is not a number"
            );
            Step::reply(OutboundMessage::text(session.chat_id, corrective))
        }
    }
}

/// Free-text state: any non-empty reply is stored verbatim.
fn free_text(
    session: &mut Session,
    text: &str,
    re_ask: &str,
    store: impl FnOnce(&mut Session, String),
    next: DialogState,
    success: OutboundMessage,
) -> Step {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Step::reply(OutboundMessage::text(session.chat_id, re_ask));
    }
    store(session, trimmed.to_string());
    session.state = next;
    Step::reply(success)
}

fn unrecognized(
    session: &Session,
    text: &str,
    catalog: &MessageCatalog,
    rng: &mut impl Rng,
    keyboard: &[&str],
) -> Step {
    info!(
        user = %session.first_name,
        reply = %text,
        state = ?session.state,
        "Reply not in vocabulary"
    );
    Step::reply(OutboundMessage::choices(
        session.chat_id,
        catalog.didnt_understand(&session.first_name, rng),
        keyboard,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use respira_core::{TurnContact, TurnUser};

    fn session() -> Session {
        Session::new(
            1,
            &TurnUser {
                id: 1,
                first_name: "Ane".to_string(),
                last_name: None,
                handle: None,
            },
        )
    }

    fn turn(text: &str) -> TurnMessage {
        TurnMessage {
            chat_id: 1,
            user: TurnUser {
                id: 1,
                first_name: "Ane".to_string(),
                last_name: None,
                handle: None,
            },
            text: Some(text.to_string()),
            contact: None,
        }
    }

    fn step(session: &mut Session, text: &str) -> Step {
        let catalog = MessageCatalog::default();
        let mut rng = StdRng::seed_from_u64(0);
        advance(session, &turn(text), &catalog, &mut rng)
    }

    #[test]
    fn test_entry_commands_are_exact_and_case_sensitive() {
        assert!(is_entry_command("/start"));
        assert!(is_entry_command("Empezar"));
        assert!(is_entry_command("vamos"));
        assert!(!is_entry_command("EMPEZAR"));
        assert!(!is_entry_command("empieza"));
    }

    #[test]
    fn test_non_numeric_reply_self_loops_without_writing() {
        let mut s = session();
        s.state = DialogState::QuantityPreparedA;
        let step = step(&mut s, "muchas");
        assert_eq!(step.outcome, StepOutcome::Continue);
        assert_eq!(s.state, DialogState::QuantityPreparedA);
        assert!(s.fields.qty_prepared_a.is_none());
    }

    #[test]
    fn test_choice_state_stores_canonical_token() {
        let mut s = session();
        s.state = DialogState::ConfirmDelivery;
        step(&mut s, "Bai");
        assert_eq!(s.fields.delivered.as_deref(), Some("Sí"));
        assert_eq!(s.state, DialogState::QuantityDeliveredA);
    }

    #[test]
    fn test_branch_tag_set_once_at_choose_branch() {
        let mut s = session();
        s.state = DialogState::ChooseBranch;
        step(&mut s, "Programar recogida");
        assert_eq!(s.branch, Some(Branch::Schedule));
        assert_eq!(s.state, DialogState::QuantityPreparedA);
    }

    #[test]
    fn test_phone_contact_payload_wins_over_text() {
        let mut s = session();
        s.state = DialogState::Phone;
        let catalog = MessageCatalog::default();
        let mut rng = StdRng::seed_from_u64(0);
        let mut t = turn("x");
        t.contact = Some(TurnContact {
            phone_number: "+34600111222".to_string(),
        });
        let step = advance(&mut s, &t, &catalog, &mut rng);
        assert_eq!(step.outcome, StepOutcome::Finalize);
        assert_eq!(s.fields.phone.as_deref(), Some("+34600111222"));
    }

    #[test]
    fn test_short_phone_text_self_loops() {
        let mut s = session();
        s.state = DialogState::Phone;
        let step = step(&mut s, "12345");
        assert_eq!(step.outcome, StepOutcome::Continue);
        assert!(s.fields.phone.is_none());
        assert_eq!(
            step.replies[0].reply,
            respira_core::ReplyHint::RequestContact
        );
    }
}
