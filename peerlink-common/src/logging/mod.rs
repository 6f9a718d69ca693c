// Logging utilities for the PeerLink stack
//
// Records go through the `log` facade; binaries decide the sink.
// Every line carries the scope (device id or a fixed label before the
// identity is known) and the component that emitted it.

use log::{debug, error, info, warn};
use std::fmt::{self, Arguments, Display, Formatter};

/// Predefined components for logging categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Identity,
    Keys,
    Certificate,
    Cipher,
    CLI,
    Custom(&'static str),
}

impl Component {
    /// Get the string representation of the component
    pub fn as_str(&self) -> &str {
        match self {
            Component::Identity => "Identity",
            Component::Keys => "Keys",
            Component::Certificate => "Cert",
            Component::Cipher => "Cipher",
            Component::CLI => "CLI",
            Component::Custom(name) => name,
        }
    }
}

// Display helper so `_args` logging does not allocate the prefix
struct ComponentPrefixDisplay {
    parent: Option<Component>,
    component: Component,
}

impl Display for ComponentPrefixDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(parent) if parent != self.component => {
                write!(f, "{}.{}", parent.as_str(), self.component.as_str())
            }
            _ => write!(f, "{}", self.component.as_str()),
        }
    }
}

/// A component-specific logger carrying the scope it reports for
#[derive(Clone, Debug)]
pub struct Logger {
    component: Component,
    scope: String,
    parent_component: Option<Component>,
}

impl Logger {
    /// Create a root logger for a component and scope
    pub fn new_root(component: Component, scope: &str) -> Self {
        Self {
            component,
            scope: scope.to_string(),
            parent_component: None,
        }
    }

    /// Create a child logger with the same scope but a different component
    pub fn with_component(&self, component: Component) -> Self {
        Self {
            component,
            scope: self.scope.clone(),
            parent_component: Some(self.component),
        }
    }

    /// Same component, new scope. Used once the device id is known.
    pub fn with_scope(&self, scope: impl Into<String>) -> Self {
        Self {
            component: self.component,
            scope: scope.into(),
            parent_component: self.parent_component,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn component(&self) -> Component {
        self.component
    }

    fn prefix(&self) -> ComponentPrefixDisplay {
        ComponentPrefixDisplay {
            parent: self.parent_component,
            component: self.component,
        }
    }

    /// Log a debug message
    pub fn debug(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Debug) {
            debug!("[{}][{}] {}", self.scope, self.prefix(), message.into());
        }
    }

    /// Log a debug message using fmt::Arguments (avoids allocating message String)
    pub fn debug_args(&self, args: Arguments) {
        if log::log_enabled!(log::Level::Debug) {
            debug!("[{}][{}] {}", self.scope, self.prefix(), args);
        }
    }

    /// Log an info message
    pub fn info(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Info) {
            info!("[{}][{}] {}", self.scope, self.prefix(), message.into());
        }
    }

    /// Log an info message using fmt::Arguments
    pub fn info_args(&self, args: Arguments) {
        if log::log_enabled!(log::Level::Info) {
            info!("[{}][{}] {}", self.scope, self.prefix(), args);
        }
    }

    /// Log a warning message
    pub fn warn(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Warn) {
            warn!("[{}][{}] {}", self.scope, self.prefix(), message.into());
        }
    }

    /// Log an error message
    pub fn error(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Error) {
            error!("[{}][{}] {}", self.scope, self.prefix(), message.into());
        }
    }
}
