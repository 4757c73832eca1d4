use anyhow::Result;
use std::io::{self, Write};
use std::rc::Rc;
use wacrm_config::{NotificationBackend, NotificationsConfig};
use wacrm_core::Emission;
use wacrm_extract::{ExtractError, MemoryNotifier, Notifier};

pub struct StdoutNotifier;

impl Notifier for StdoutNotifier {
    fn notify(&self, emission: &Emission) -> wacrm_extract::Result<()> {
        println!(
            "{}  key={}  via={}  ({})",
            emission.identifier, emission.lookup_key, emission.source, emission.reason
        );
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonNotifier;

impl Notifier for JsonNotifier {
    fn notify(&self, emission: &Emission) -> wacrm_extract::Result<()> {
        let line =
            serde_json::to_string(emission).map_err(|err| ExtractError::Notify(err.to_string()))?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{line}")?;
        Ok(())
    }
}

#[cfg(feature = "desktop-notify")]
pub struct DesktopNotifier;

#[cfg(feature = "desktop-notify")]
impl Notifier for DesktopNotifier {
    fn notify(&self, emission: &Emission) -> wacrm_extract::Result<()> {
        notify_rust::Notification::new()
            .summary("wacrm contact")
            .body(&format!("{} (via {})", emission.identifier, emission.source))
            .show()
            .map_err(|err| ExtractError::Notify(err.to_string()))?;
        Ok(())
    }
}

/// Picks the downstream consumer for emissions. `--json` always wins so
/// stdout stays machine-readable.
pub fn notifier_for(config: &NotificationsConfig, json: bool) -> Result<Rc<dyn Notifier>> {
    if json {
        return Ok(Rc::new(JsonNotifier));
    }
    if !config.enabled {
        return Ok(Rc::new(MemoryNotifier::new()));
    }
    match config.backend {
        NotificationBackend::Stdout => Ok(Rc::new(StdoutNotifier)),
        NotificationBackend::Json => Ok(Rc::new(JsonNotifier)),
        NotificationBackend::Desktop => desktop_notifier(),
    }
}

#[cfg(feature = "desktop-notify")]
fn desktop_notifier() -> Result<Rc<dyn Notifier>> {
    Ok(Rc::new(DesktopNotifier))
}

#[cfg(not(feature = "desktop-notify"))]
fn desktop_notifier() -> Result<Rc<dyn Notifier>> {
    Err(crate::error::invalid_input(
        "desktop notifications require the desktop-notify feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::notifier_for;
    use wacrm_config::{NotificationBackend, NotificationsConfig};

    #[test]
    fn disabled_notifications_still_build_a_notifier() {
        let config = NotificationsConfig {
            enabled: false,
            backend: NotificationBackend::Stdout,
        };
        assert!(notifier_for(&config, false).is_ok());
        assert!(notifier_for(&config, true).is_ok());
    }

    #[cfg(not(feature = "desktop-notify"))]
    #[test]
    fn desktop_backend_needs_the_feature() {
        let config = NotificationsConfig {
            enabled: true,
            backend: NotificationBackend::Desktop,
        };
        let err = match notifier_for(&config, false) {
            Ok(_) => panic!("expected error"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("desktop-notify"));
    }
}
