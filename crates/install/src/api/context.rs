use ifw_events::EventSender;
use tokio_util::sync::CancellationToken;

/// Installation context
#[derive(Clone, Debug)]
pub struct InstallContext {
    /// Components selected by the user
    pub components: Vec<String>,
    /// Cancelling stops the run at the next operation boundary
    pub cancel: CancellationToken,

    /// Event sender for progress reporting
    pub event_sender: Option<EventSender>,
}

context_builder! {
    InstallContext {
        components: Vec<String>,
    }
}
context_add_component_method!(InstallContext);

/// Uninstall context
#[derive(Clone, Debug)]
pub struct UninstallContext {
    /// Components to remove (empty = everything)
    pub components: Vec<String>,
    pub cancel: CancellationToken,

    /// Event sender for progress reporting
    pub event_sender: Option<EventSender>,
}

context_builder! {
    UninstallContext {
        components: Vec<String>,
    }
}
context_add_component_method!(UninstallContext);

/// Update context
#[derive(Clone, Debug)]
pub struct UpdateContext {
    /// Components to update (empty = every installed one)
    pub components: Vec<String>,
    pub cancel: CancellationToken,

    /// Event sender for progress reporting
    pub event_sender: Option<EventSender>,
}

context_builder! {
    UpdateContext {
        components: Vec<String>,
    }
}
context_add_component_method!(UpdateContext);
