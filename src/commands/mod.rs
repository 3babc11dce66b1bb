pub mod demo;
pub mod run;

use wakelink::services::PresentationView;

pub(crate) fn describe(prefix: &str, view: &PresentationView) -> String {
    let mut line = format!("[{prefix}] {}", view.status_text);
    if let Some(remaining) = &view.remaining_text {
        line.push_str(&format!(" ({remaining} left)"));
    }
    if view.has_live_peer {
        line.push_str(" [peer attached]");
    }
    line
}
