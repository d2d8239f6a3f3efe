use tracing::{debug, info};

use super::defaults::DefaultOptions;
use super::reconcile::{ReconcileOutcome, Reconciliation};
use super::schema::OptionSchema;
use super::user::UserOptions;

/// Everything one reconciliation pass produced.
///
/// Built once at startup and handed by reference (or `&mut` for writers such
/// as the notification flow) to every later component.
#[derive(Debug, Clone)]
pub struct OptionsContext {
    graph: OptionSchema,
    defaults: DefaultOptions,
    user: UserOptions,
    outcome: ReconcileOutcome,
    verbose: bool,
}

impl OptionsContext {
    pub fn new(graph: OptionSchema, defaults: DefaultOptions, reconciliation: Reconciliation) -> Self {
        Self {
            graph,
            defaults,
            user: reconciliation.options,
            outcome: reconciliation.outcome,
            verbose: false,
        }
    }

    /// The options currently in effect.
    pub fn user_options(&self) -> &UserOptions {
        &self.user
    }

    pub fn user_options_mut(&mut self) -> &mut UserOptions {
        &mut self.user
    }

    /// The full option schema tree, for an options panel to render.
    pub fn options_graph(&self) -> &OptionSchema {
        &self.graph
    }

    pub fn defaults(&self) -> &DefaultOptions {
        &self.defaults
    }

    pub fn outcome(&self) -> &ReconcileOutcome {
        &self.outcome
    }

    /// Whether verbose diagnostics are on for this session.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Turn verbose diagnostics on when the `verbose` option or `dev` is set,
    /// dumping the effective options when they are.
    pub fn configure_diagnostics(&mut self, dev: bool) -> bool {
        self.verbose = self.user.verbose() || dev;
        if self.verbose {
            info!(target: "midnight", "Verbose mode enabled");
            for (key, value) in self.user.iter() {
                info!(target: "midnight", "{}: {}", key.to_uppercase(), value);
            }
        } else {
            debug!(target: "midnight", options = self.user.len(), "Verbose mode disabled");
        }
        self.verbose
    }
}
