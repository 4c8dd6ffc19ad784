//! Macros for context builder helpers

#[macro_export]
macro_rules! context_add_component_method {
    ($name:ident) => {
        impl $name {
            /// Add a component to the context
            #[must_use]
            pub fn add_component(mut self, component: impl Into<String>) -> Self {
                self.components.push(component.into());
                self
            }
        }
    };
}

#[macro_export]
macro_rules! context_builder {
    ($name:ident { $($field:ident: $ty:ty),* $(,)? }) => {
        paste::paste! {
            impl $name {
                /// Create a new context with default values
                #[must_use]
                pub fn new() -> Self {
                    Self {
                        $($field: Default::default(),)*
                        cancel: tokio_util::sync::CancellationToken::new(),
                        event_sender: None,
                    }
                }

                $( #[must_use]
                pub fn [<with_ $field>](mut self, value: $ty) -> Self {
                    self.$field = value;
                    self
                } )*

                /// Cancel the run through this token
                #[must_use]
                pub fn with_cancel(mut self, cancel: tokio_util::sync::CancellationToken) -> Self {
                    self.cancel = cancel;
                    self
                }

                /// Set the event sender for progress reporting
                #[must_use]
                pub fn with_event_sender(mut self, sender: ifw_events::EventSender) -> Self {
                    self.event_sender = Some(sender);
                    self
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }
        }
    };
}
