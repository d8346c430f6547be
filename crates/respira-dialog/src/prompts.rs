//! Configurable message texts, reply keyboards, and the "didn't
//! understand" responder.

use rand::Rng;
use respira_core::OutboundMessage;
use respira_session::Session;
use serde::{Deserialize, Serialize};

/// Province choices offered at session start.
pub const PROVINCE_KEYBOARD: &[&str] = &["Álava", "Bizkaia", "Gipuzkoa"];
/// Branch choice offered after the province.
pub const BRANCH_KEYBOARD: &[&str] = &["Confirmar recogida", "Programar recogida"];
/// Plain yes/no choice.
pub const YES_NO_KEYBOARD: &[&str] = &["Sí", "No"];
/// Pickup time windows.
pub const TIME_KEYBOARD: &[&str] = &["Mañana", "Tarde", "Todo el día"];
/// Filament diameters.
pub const DIAMETER_KEYBOARD: &[&str] = &["1.75mm", "3mm"];
/// Restart shortcut shown on every conversation end.
pub const RESTART_KEYBOARD: &[&str] = &["Empezar"];

/// Greeting and first question for a freshly created session.
pub fn greeting(session: &Session) -> OutboundMessage {
    OutboundMessage::choices(
        session.chat_id,
        format!(
            "Hola, {} soy RespiraBot 💨 y estoy aquí para ayudarte a ser más eficiente \
             con los envíos y el material que estamos recogiendo para combatir el 🦠\n\
             Dime en qué provincia estás, por favor.",
            session.first_name
        ),
        PROVINCE_KEYBOARD,
    )
}

/// Closing message for a finalized conversation.
pub fn farewell(session: &Session) -> OutboundMessage {
    OutboundMessage::choices(
        session.chat_id,
        format!(
            "🎉 🎉 🎉 Debuti. Esto es todo por ahora. Muchas gracias, {}\n\
             Si quieres empezar de nuevo, dale al botón o escribe /empezar",
            session.first_name
        ),
        RESTART_KEYBOARD,
    )
}

/// Reply to an explicit `/cancel`.
pub fn cancelled(chat_id: i64) -> OutboundMessage {
    OutboundMessage::text(chat_id, "Bueno, pues nada... luego hablamos :(")
}

/// Goodbye for a session that went quiet past the inactivity limit.
pub fn timed_out(session: &Session) -> OutboundMessage {
    OutboundMessage::choices(
        session.chat_id,
        "Oye, mejor hablamos luego, que ahora te veo liado. 👋\n\
         Si quieres empezar de nuevo, dale al botón o escribe /empezar",
        RESTART_KEYBOARD,
    )
}

/// Generic apology after an unexpected handler failure.
pub fn handler_fault(chat_id: i64) -> OutboundMessage {
    OutboundMessage::choices(
        chat_id,
        "Perdona, algo ha ido mal mientras hablábamos.\n¿Probamos de nuevo? 😅\n\
         Si quieres empezar de nuevo, dale al botón o escribe /empezar",
        RESTART_KEYBOARD,
    )
}

/// Configurable text catalog.
///
/// Deserialized from the bot configuration; every key has a shipped
/// default so a minimal config file works out of the box. The dialog
/// engine treats the catalog as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCatalog {
    /// Lead-in phrases for the "didn't understand" reply; the user's
    /// first name is appended directly after the chosen lead-in.
    #[serde(default = "default_apology_leads")]
    pub apology_leads: Vec<String>,
    /// Follow-up phrases appended after the first name.
    #[serde(default = "default_apology_follows")]
    pub apology_follows: Vec<String>,
    /// Pickup instructions sent once a pickup has been scheduled.
    #[serde(default = "default_pickup_ready")]
    pub pickup_ready: String,
}

fn default_apology_leads() -> Vec<String> {
    vec![
        "Perdona, no te he entendido, ".to_string(),
        "Uy, eso no me suena de nada, ".to_string(),
        "Vaya, creo que me he perdido, ".to_string(),
    ]
}

fn default_apology_follows() -> Vec<String> {
    vec![
        ". ¿Me lo dices con los botones, por favor?".to_string(),
        ". Prueba a responder con los botones de abajo 👇".to_string(),
        ". Dímelo otra vez usando los botones.".to_string(),
    ]
}

fn default_pickup_ready() -> String {
    "Recuerda dejar el material en una bolsa cerrada junto a la puerta. \
     Nuestros compañeros de recogida pasarán en el horario indicado. \
     ¡Gracias por colaborar! 💪"
        .to_string()
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            apology_leads: default_apology_leads(),
            apology_follows: default_apology_follows(),
            pickup_ready: default_pickup_ready(),
        }
    }
}

impl MessageCatalog {
    /// Builds the randomized apology for an unrecognized reply: one
    /// lead-in, the user's first name, one follow-up.
    ///
    /// The random source is injected so tests can seed it; repeats
    /// across consecutive calls are acceptable. Never touches session
    /// state.
    pub fn didnt_understand(&self, first_name: &str, rng: &mut impl Rng) -> String {
        let lead = &self.apology_leads[rng.gen_range(0..self.apology_leads.len())];
        let follow = &self.apology_follows[rng.gen_range(0..self.apology_follows.len())];
        format!("{lead}{first_name}{follow}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_didnt_understand_is_deterministic_with_seeded_rng() {
        let catalog = MessageCatalog::default();
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(
            catalog.didnt_understand("Joseba", &mut a),
            catalog.didnt_understand("Joseba", &mut b)
        );
    }

    #[test]
    fn test_didnt_understand_combines_lead_name_follow() {
        let catalog = MessageCatalog {
            apology_leads: vec!["A ".to_string()],
            apology_follows: vec![" B".to_string()],
            pickup_ready: String::new(),
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(catalog.didnt_understand("Ane", &mut rng), "A Ane B");
    }

    #[test]
    fn test_every_combination_stays_in_catalog() {
        let catalog = MessageCatalog::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let msg = catalog.didnt_understand("Jon", &mut rng);
            assert!(catalog
                .apology_leads
                .iter()
                .any(|lead| msg.starts_with(lead.as_str())));
            assert!(catalog
                .apology_follows
                .iter()
                .any(|follow| msg.ends_with(follow.as_str())));
            assert!(msg.contains("Jon"));
        }
    }

    #[test]
    fn test_catalog_deserializes_with_defaults() {
        let catalog: MessageCatalog = toml_like_empty();
        assert_eq!(catalog.apology_leads.len(), 3);
        assert_eq!(catalog.apology_follows.len(), 3);
        assert!(!catalog.pickup_ready.is_empty());
    }

    fn toml_like_empty() -> MessageCatalog {
        serde_json::from_str("{}").unwrap()
    }
}
