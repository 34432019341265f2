//! Channel and event-name matching.
//!
//! Handlers are matched on channel first, then on event name.

/// The wildcard channel / event pattern.
pub const WILDCARD: &str = "*";

/// Whether a handler bound to `handler_channel` hears an event on `event_channel`.
///
/// The wildcard on either side matches every channel.
pub fn channel_matches(handler_channel: &str, event_channel: &str) -> bool {
    handler_channel == WILDCARD || event_channel == WILDCARD || handler_channel == event_channel
}

/// Glob-match an event name against a handler pattern.
///
/// `*` matches any (possibly empty) run of characters; everything else is
/// compared literally.
pub fn name_matches(pattern: &str, name: &str) -> bool {
    let p = pattern.as_bytes();
    let n = name.as_bytes();
    let (mut pi, mut ni) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && p[pi] == b'*' {
            backtrack = Some((pi, ni));
            pi += 1;
        } else if pi < p.len() && p[pi] == n[ni] {
            pi += 1;
            ni += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ni = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&b| b == b'*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_channels() {
        assert!(channel_matches("*", "web"));
        assert!(channel_matches("web", "*"));
        assert!(channel_matches("web", "web"));
        assert!(!channel_matches("web", "irc"));
    }

    #[test]
    fn name_globs() {
        assert!(name_matches("request", "request"));
        assert!(!name_matches("request", "requests"));
        assert!(name_matches("*", "anything"));
        assert!(name_matches("*", ""));
        assert!(name_matches("http*", "httperror"));
        assert!(name_matches("*error", "httperror"));
        assert!(name_matches("re*st*", "request_started"));
        assert!(!name_matches("re*x", "request"));
    }
}
