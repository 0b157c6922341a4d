//! Sponsorship outreach pipeline

pub mod clock;
pub mod contact;
pub mod dispatch;
pub mod error;
pub mod ledger;
pub mod message;
pub mod pacer;
pub mod run;
pub mod template;

pub use clock::{Clock, ManualClock, SystemClock};
pub use contact::{Category, Contact, ContactKey, Status};
pub use dispatch::{Dispatcher, Security, SendResult, SmtpDispatcher, SmtpSettings};
pub use error::{BuildError, ConfigError, LedgerError, OutreachError, TemplateError};
pub use ledger::Ledger;
pub use message::{Attachment, Campaign, CategoryCampaign, MessageBuilder, RenderedEmail, Sender};
pub use pacer::{Pacer, PacerState, Pacing, PacingConfig, Phase};
pub use run::{RunLoop, RunSummary};
pub use template::{CategoryTemplate, Placeholders, TemplateSet, TemplateSource};
