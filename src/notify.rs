/// Non-blocking user-facing notification channel.
///
/// The pipelines never block on the user; an alert is fire-and-forget with
/// message text and an optional help link.
pub trait Notifier {
    fn alert(&self, message: &str, link: Option<&str>);
}

/// Writes alerts to stderr. The editor shell swaps in a dialog-backed one.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn alert(&self, message: &str, link: Option<&str>) {
        match link {
            Some(link) => eprintln!("{} ({})", message, link),
            None => eprintln!("{}", message),
        }
    }
}
