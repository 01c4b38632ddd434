//! The scripted dialogue: a pure decision layer.
//!
//! Given the user's step and the inbound text, [`respond`] returns the
//! replies to send and the transition to apply. No I/O happens here, which
//! keeps the whole transition table testable in isolation; the engine
//! applies the decision against the store and the sender.
//!
//! Commands are matched exactly on trimmed, lowercased input, with Arabic
//! aliases kept from the first generation of the script.

use chrono::{DateTime, Utc};

use waba_core::{ConversationStep, UserStatus};

use super::smart_reply::{ReplyPicker, smart_reply};

/// Fallback display name for conversation replies.
const FALLBACK_NAME: &str = "dear customer";

/// Free-form welcome message for brand-new users. Supersedes the earlier
/// template-based onboarding.
const WELCOME_MESSAGE: &str = "👋 Welcome! Thanks for reaching out.\n\n\
    I'm your automated assistant. Type 'help' at any time to see what I \
    can do, or 'menu' to browse the options.";

const NAME_PROMPT: &str = "Let's get to know you better. What is your name?";

/// Read-only view of the user record that the script interpolates into
/// replies.
#[derive(Debug, Clone)]
pub struct UserView {
    /// Display name, if captured.
    pub name: Option<String>,
    /// Inbound message counter.
    pub message_count: i32,
    /// Signup timestamp.
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: UserStatus,
}

impl UserView {
    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(FALLBACK_NAME)
    }
}

/// State change to persist after a reply cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The next step.
    pub step: ConversationStep,
    /// New lifecycle status, if it changes.
    pub status: Option<UserStatus>,
    /// Captured display name, if one was provided this cycle.
    pub name: Option<String>,
}

impl Transition {
    /// Transition that only moves the step.
    #[must_use]
    pub const fn to(step: ConversationStep) -> Self {
        Self {
            step,
            status: None,
            name: None,
        }
    }
}

/// Replies to send plus the transition to apply.
#[derive(Debug, Clone, Default)]
pub struct Decision {
    /// Reply texts, sent in order.
    pub replies: Vec<String>,
    /// State change, or `None` to stay put.
    pub transition: Option<Transition>,
}

/// The onboarding decision for a brand-new user.
///
/// The inbound content is deliberately ignored: the new-user branch wins
/// even when the first message is a known command.
#[must_use]
pub fn onboarding() -> Decision {
    Decision {
        replies: vec![WELCOME_MESSAGE.to_string()],
        transition: Some(Transition {
            step: ConversationStep::Conversation,
            status: Some(UserStatus::Active),
            name: None,
        }),
    }
}

/// Decide the replies for one inbound message from an already-onboarded
/// user.
///
/// `step` is the parsed persisted step; unknown/legacy values and the
/// pre-onboarding `welcome` marker both dispatch to the conversation
/// handler.
#[must_use]
pub fn respond(
    step: Option<ConversationStep>,
    content: &str,
    user: &UserView,
    now: DateTime<Utc>,
    picker: &dyn ReplyPicker,
) -> Decision {
    match step {
        Some(ConversationStep::AwaitingResponse) => first_response(content),
        Some(ConversationStep::AwaitingName) => name_input(content),
        Some(ConversationStep::Menu) => menu_selection(content, user, now),
        Some(ConversationStep::Conversation | ConversationStep::Welcome) | None => {
            conversation(content, user, now, picker)
        }
    }
}

/// First reply after the welcome message: greet, then ask for a name.
fn first_response(content: &str) -> Decision {
    let normalized = normalize(content);

    let greeting = match normalized.as_str() {
        "hello" => "🌟 Hello! Welcome to our service.",
        "hi" => "🌟 Hi there! Great to have you here.",
        "hey" => "🌟 Hey! Glad you reached out.",
        "مرحبا" => "🌟 أهلاً بك! سعداء بتواصلك معنا.",
        _ => "👋 Welcome! How can I help you today?",
    };

    Decision {
        replies: vec![greeting.to_string(), NAME_PROMPT.to_string()],
        transition: Some(Transition::to(ConversationStep::AwaitingName)),
    }
}

/// Capture the name verbatim (trimmed, no validation) and confirm.
fn name_input(content: &str) -> Decision {
    let name = content.trim();
    if name.is_empty() {
        // Nothing to store; ask again and stay in this step.
        return Decision {
            replies: vec![NAME_PROMPT.to_string()],
            transition: None,
        };
    }

    let confirmation = format!(
        "Nice to meet you, {name}! 😊\n\n\
         You can now:\n\
         • Type 'help' for assistance\n\
         • Type 'services' to see what we offer\n\
         • Type 'menu' to view the options\n\
         • Or just ask me anything!"
    );

    Decision {
        replies: vec![confirmation],
        transition: Some(Transition {
            step: ConversationStep::Conversation,
            status: None,
            name: Some(name.to_string()),
        }),
    }
}

/// Steady-state command dispatch.
fn conversation(
    content: &str,
    user: &UserView,
    now: DateTime<Utc>,
    picker: &dyn ReplyPicker,
) -> Decision {
    let normalized = normalize(content);

    match normalized.as_str() {
        "help" | "مساعدة" => Decision {
            replies: vec![help_reply(user)],
            transition: None,
        },
        "services" | "خدمات" => Decision {
            replies: vec![services_reply()],
            transition: None,
        },
        "info" | "معلومات" => Decision {
            replies: vec![info_reply()],
            transition: None,
        },
        "time" | "وقت" => Decision {
            replies: vec![time_reply(now)],
            transition: None,
        },
        "stats" | "إحصائيات" => Decision {
            replies: vec![stats_reply(user, now)],
            transition: None,
        },
        "menu" | "قائمة" => Decision {
            replies: vec![menu_reply()],
            transition: Some(Transition::to(ConversationStep::Menu)),
        },
        _ => Decision {
            replies: vec![smart_reply(&normalized, user.name.as_deref(), picker)],
            transition: None,
        },
    }
}

/// One menu selection cycle. Whatever happens, the user goes back to
/// `conversation` (single-shot menu).
fn menu_selection(content: &str, user: &UserView, now: DateTime<Utc>) -> Decision {
    let normalized = normalize(content);

    // TODO: add a contact-details reply for option 3; it is advertised in
    // the menu text but currently falls through to the invalid-option
    // branch.
    let reply = match normalized.as_str() {
        "1" | "services" | "خدماتنا" => services_reply(),
        "2" | "info" | "معلومات" => info_reply(),
        "4" | "help" | "مساعدة" => help_reply(user),
        "5" | "stats" | "إحصائياتك" => stats_reply(user, now),
        _ => "❌ Invalid option. Type 'menu' to see the options again.".to_string(),
    };

    Decision {
        replies: vec![reply],
        transition: Some(Transition::to(ConversationStep::Conversation)),
    }
}

// =============================================================================
// Reply templates
// =============================================================================

fn help_reply(user: &UserView) -> String {
    format!(
        "📋 How can I help you, {}?\n\n\
         • 'services' - what we offer\n\
         • 'info' - about us\n\
         • 'contact' - how to reach us\n\
         • 'time' - current time\n\
         • 'stats' - your statistics",
        user.display_name()
    )
}

fn services_reply() -> String {
    "🛎️ Our available services:\n\n\
     ✅ Smart auto-replies\n\
     ✅ Inquiry handling\n\
     ✅ Free technical support\n\
     ✅ Around-the-clock follow-up\n\n\
     Type 'help' to see all commands!"
        .to_string()
}

fn info_reply() -> String {
    "ℹ️ About our service:\n\n\
     We run an automated WhatsApp Business assistant\n\
     built on the provider's Cloud API.\n\n\
     🕒 Available 24/7\n\
     ⚡ Instant replies\n\
     🔒 Your data stays protected"
        .to_string()
}

fn time_reply(now: DateTime<Utc>) -> String {
    format!("⏰ Current time: {}", now.format("%Y-%m-%d %H:%M:%S"))
}

fn stats_reply(user: &UserView, now: DateTime<Utc>) -> String {
    let last_active = user
        .last_message_at
        .map_or_else(|| "never".to_string(), |t| humanize_since(now, t));

    format!(
        "📊 Your statistics, {}:\n\n\
         • Messages: {}\n\
         • Joined: {}\n\
         • Last active: {}\n\
         • Status: {}",
        user.display_name(),
        user.message_count,
        user.created_at.format("%Y-%m-%d"),
        last_active,
        user.status
    )
}

fn menu_reply() -> String {
    "📋 Main menu:\n\n\
     1️⃣ Our services\n\
     2️⃣ About us\n\
     3️⃣ Contact options\n\
     4️⃣ Help\n\
     5️⃣ Your statistics\n\n\
     Type the number or name of an option:"
        .to_string()
}

// =============================================================================
// Helpers
// =============================================================================

fn normalize(content: &str) -> String {
    content.trim().to_lowercase()
}

/// Rough human-readable elapsed time ("5 minutes ago").
fn humanize_since(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    if seconds < 60 {
        return "just now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{minutes} minute{} ago", plural(minutes));
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours} hour{} ago", plural(hours));
    }
    let days = hours / 24;
    format!("{days} day{} ago", plural(days))
}

const fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}
