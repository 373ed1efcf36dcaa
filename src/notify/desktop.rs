use notify_rust::{Hint, Notification, Timeout};

use crate::notify::{Toast, ToastKind};

/// Mirrors success and error toasts to the desktop notification daemon.
pub struct DesktopNotifier {
    enabled: bool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn mirror(&self, toast: &Toast) {
        if !self.enabled || toast.kind == ToastKind::Info {
            return;
        }

        let summary = match toast.kind {
            ToastKind::Error => "Invoice client: error",
            _ => "Invoice client",
        };

        let mut n = Notification::new();
        n.summary(summary)
            .body(&toast.message)
            .hint(Hint::Category("transfer".to_string()))
            .timeout(Timeout::Milliseconds(5_000));

        // best-effort
        if let Err(e) = n.show() {
            log::debug!("notification error: {e}");
        }
    }

    pub fn mirror_all<'a>(&self, toasts: impl IntoIterator<Item = &'a Toast>) {
        for t in toasts {
            self.mirror(t);
        }
    }
}
