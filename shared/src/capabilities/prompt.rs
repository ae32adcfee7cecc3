use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

/// Asks the shell to put a question in front of the user and report the
/// answer back. How the question is rendered (dialog, sheet, inline banner) is
/// the shell's business.
pub struct Prompt<Ev> {
    context: CapabilityContext<PromptOperation, Ev>,
}

impl<Ev> Capability<Ev> for Prompt<Ev> {
    type Operation = PromptOperation;
    type MappedSelf<MappedEv> = Prompt<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Prompt::new(self.context.map_event(f))
    }
}

impl<Ev> Prompt<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<PromptOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn confirm<F>(&self, message: impl Into<String>, callback: F)
    where
        F: FnOnce(ConfirmOutcome) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        let operation = PromptOperation::Confirm {
            message: message.into(),
        };
        self.context.spawn(async move {
            let outcome = context.request_from_shell(operation).await;
            context.update_app(callback(outcome));
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PromptOperation {
    Confirm { message: String },
}

impl Operation for PromptOperation {
    type Output = ConfirmOutcome;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed,
    Declined,
}

impl ConfirmOutcome {
    pub const fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

impl From<bool> for ConfirmOutcome {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::Declined
        }
    }
}
