//! The outreach run loop

use rand::Rng;
use tracing::{error, info, warn};

use crate::outreach::clock::Clock;
use crate::outreach::contact::Contact;
use crate::outreach::dispatch::{Dispatcher, SendResult};
use crate::outreach::ledger::Ledger;
use crate::outreach::message::MessageBuilder;
use crate::outreach::pacer::{Pacer, PacerState};
use crate::shutdown::Shutdown;

const RULE: &str = "============================================================";

/// Totals reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Contacts the loop started work on
    pub processed: usize,
    /// Contacts whose message was accepted by the relay
    pub sent: usize,
    /// Contacts whose message could not be built or sent
    pub failed: usize,
    /// Sent contacts whose ledger row could not be updated
    pub ledger_errors: usize,
    /// Messages built but not sent because of a dry run
    pub previewed: usize,
    /// The run stopped early on an interrupt
    pub interrupted: bool,
}

enum Outcome {
    Sent,
    Failed,
    Previewed,
}

/// Drives one pass over the pending contacts
pub struct RunLoop<'a, D: ?Sized, R> {
    ledger: &'a Ledger,
    builder: MessageBuilder<'a>,
    dispatcher: &'a D,
    pacer: Pacer<R>,
    clock: &'a dyn Clock,
    shutdown: Shutdown,
    dry_run: bool,
}

impl<'a, D, R> RunLoop<'a, D, R>
where
    D: Dispatcher + ?Sized,
    R: Rng,
{
    pub fn new(
        ledger: &'a Ledger,
        builder: MessageBuilder<'a>,
        dispatcher: &'a D,
        pacer: Pacer<R>,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            ledger,
            builder,
            dispatcher,
            pacer,
            clock,
            shutdown: Shutdown::new(),
            dry_run: false,
        }
    }

    /// Stop before the next contact once `shutdown` is requested
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Build messages without sending them or touching the ledger
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Process every pending contact in ledger order.
    ///
    /// Per-contact failures are logged and the loop moves on; nothing here
    /// aborts the run. `state` carries the batch counters and is left
    /// `Idle` on return.
    pub fn run(&mut self, state: &mut PacerState) -> RunSummary {
        let mut summary = RunSummary::default();

        info!("Starting sponsorship outreach");
        info!("{RULE}");

        let contacts = match self.ledger.load() {
            Ok(contacts) => contacts,
            Err(e) => {
                error!("Could not read ledger {}: {e}", self.ledger.path().display());
                return summary;
            }
        };

        if contacts.is_empty() {
            error!("No valid sponsors found to process");
            return summary;
        }

        let total = contacts.len();
        info!("Processing {total} sponsors");
        info!("{RULE}");

        state.begin();
        for (i, contact) in contacts.iter().enumerate() {
            if self.shutdown.is_requested() {
                warn!(
                    "Stopping before {}; {} contacts left pending for the next run",
                    contact.organization,
                    total - i
                );
                summary.interrupted = true;
                break;
            }

            info!(
                "Processing sponsor {}/{}: {}",
                i + 1,
                total,
                contact.organization
            );
            summary.processed += 1;

            match self.process(contact, state, &mut summary) {
                Outcome::Sent => summary.sent += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Previewed => summary.previewed += 1,
            }
        }
        state.finish();

        info!("{RULE}");
        info!(
            "Automation completed. {} of {} processed emails sent successfully.",
            summary.sent, summary.processed
        );
        if summary.ledger_errors > 0 {
            warn!(
                "{} sent contacts could not be marked in the ledger and may be emailed again",
                summary.ledger_errors
            );
        }
        info!("{RULE}");

        summary
    }

    fn process(
        &mut self,
        contact: &Contact,
        state: &mut PacerState,
        summary: &mut RunSummary,
    ) -> Outcome {
        let message = match self.builder.build(contact) {
            Ok(message) => message,
            Err(e) => {
                error!("Error building email for {}: {e}", contact.organization);
                return Outcome::Failed;
            }
        };

        if self.dry_run {
            info!(
                "Dry run: would send {:?} to {} <{}>",
                message
                    .headers()
                    .get_raw("Subject")
                    .unwrap_or_default(),
                contact.name,
                contact.email
            );
            return Outcome::Previewed;
        }

        if let SendResult::Failed { reason } = self.dispatcher.send(&message) {
            warn!(
                "Skipping rate limiting for failed email to {}: {reason}",
                contact.organization
            );
            return Outcome::Failed;
        }

        if let Err(e) = self.ledger.mark_sent(contact) {
            error!("Error updating ledger for {}: {e}", contact.organization);
            summary.ledger_errors += 1;
        }

        self.pacer.after_success(state, self.clock);
        Outcome::Sent
    }
}
