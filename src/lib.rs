//! # Okurimail
//!
//! Okurimail sends templated sponsorship emails over SMTP, one contact at a
//! time, and records every successful send back into a CSV ledger.
//!
//! It is meant to be re-run: contacts already marked `Sent` are skipped, so
//! a run that was interrupted or hit failures simply picks up where it left
//! off.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use okurimail::{
//!     Campaign, Ledger, MessageBuilder, Pacer, PacerState, PacingConfig, RunLoop, Security,
//!     Sender, SmtpDispatcher, SmtpSettings, SystemClock, TemplateSet,
//! };
//! use std::time::Duration;
//!
//! let sender = Sender {
//!     name: "RoboVITics".to_string(),
//!     address: "team@example.com".to_string(),
//! };
//! let templates = TemplateSet::builtin();
//! let campaign = Campaign::default();
//! let dispatcher = SmtpDispatcher::new(SmtpSettings {
//!     host: "smtp.gmail.com".to_string(),
//!     port: 587,
//!     security: Security::StartTls,
//!     user: sender.address.clone(),
//!     password: "app-password".to_string(),
//!     timeout: Duration::from_secs(60),
//! });
//!
//! let ledger = Ledger::new("sponsors.csv");
//! let clock = SystemClock::new();
//! let mut run = RunLoop::new(
//!     &ledger,
//!     MessageBuilder::new(&templates, &campaign, &sender),
//!     &dispatcher,
//!     Pacer::new(PacingConfig::default()).expect("default pacing is valid"),
//!     &clock,
//! );
//!
//! let summary = run.run(&mut PacerState::new());
//! println!("{} of {} sent", summary.sent, summary.processed);
//! ```
//!
//! ## Ledger
//!
//! The ledger is a CSV file with the columns `Company Name`, `POC Name`,
//! `Email Address` and `Category`. `Status` and `Sent Timestamp` are added
//! on the first update if they are missing. Only the rows that are marked
//! are rewritten; every other byte of the file is kept as it was.
//!
//! ## Templates
//!
//! Each category (`Mechanical`, `CS`, anything else is `General`) looks for
//! `<category>_template.html`, then `<category>_template.txt`, in the
//! template directory, and falls back to a built-in template. Templates may
//! use `{company_name}`, `{poc_name}`, `{event_name}`, `{sender_name}` and
//! `{sender_email}`; write `{{` or `}}` for literal braces.
//!
//! ## Pacing
//!
//! After every accepted message the run waits a random 5 to 13 seconds.
//! Every 40th accepted message triggers a 35 minute cooldown, shortened by
//! the time already spent since the previous cooldown ended. Failed sends
//! are not paced and do not count towards a batch.
//!
//! ## Notes
//!
//! - One SMTP session per message; sessions are never reused.
//! - Pacing state lives in memory only and restarts with every run.
//! - The first Ctrl-C finishes the current contact and stops; a second one
//!   exits immediately.

pub mod config;
mod outreach;
pub mod shutdown;
pub mod telemetry;

pub use outreach::{
    Attachment, BuildError, Campaign, Category, CategoryCampaign, CategoryTemplate, Clock,
    ConfigError, Contact, ContactKey, Dispatcher, Ledger, LedgerError, ManualClock,
    MessageBuilder, OutreachError, Pacer, PacerState, Pacing, PacingConfig, Phase, Placeholders,
    RenderedEmail, RunLoop, RunSummary, Security, SendResult, Sender, SmtpDispatcher,
    SmtpSettings, Status, SystemClock, TemplateError, TemplateSet, TemplateSource,
};
pub use outreach::template::{default_template, render, text_to_html};
pub use shutdown::Shutdown;
