// SPDX-License-Identifier: GPL-3.0-only

//! Desktop collaborators used by the result presenter
//!
//! Clipboard, share target, URL opener and the scan feedback cue sit behind
//! small traits so the page logic can be exercised without a desktop
//! session. Every system implementation fails soft: errors come back as
//! strings for the caller to log.

use crate::constants::share;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Content handed to the share target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    /// Present only for URL results
    pub url: Option<String>,
    /// The scanned text itself
    pub content: String,
}

impl SharePayload {
    pub fn for_result(content: &str, url: Option<&str>) -> Self {
        Self {
            title: share::TITLE.to_string(),
            text: share::TEXT.to_string(),
            url: url.map(str::to_string),
            content: content.to_string(),
        }
    }
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), String>;
}

pub trait ShareTarget {
    /// Whether sharing can be attempted at all
    fn is_available(&self) -> bool;
    fn share(&mut self, payload: &SharePayload) -> Result<(), String>;
}

pub trait UrlOpener {
    fn open(&mut self, url: &str) -> Result<(), String>;
}

/// Audible/visible cue for a successful scan
pub trait Feedback {
    fn success_cue(&mut self);
}

/// System clipboard through `arboard`, falling back to command line tools
/// (`wl-copy`, `xclip`, `xsel`, `pbcopy`) when no display connection works
#[derive(Default)]
pub struct SystemClipboard {
    // Kept alive: on X11 the selection is served by this handle
    native: Option<arboard::Clipboard>,
}

/// Candidate tools in preference order: (program, args)
const CLIPBOARD_TOOLS: [(&str, &[&str]); 4] = [
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("pbcopy", &[]),
];

impl SystemClipboard {
    fn write_native(&mut self, text: &str) -> Result<(), String> {
        if self.native.is_none() {
            self.native = Some(arboard::Clipboard::new().map_err(|e| e.to_string())?);
        }
        match self.native.as_mut() {
            Some(clipboard) => clipboard.set_text(text.to_string()).map_err(|e| e.to_string()),
            None => Err("clipboard unavailable".to_string()),
        }
    }

    fn write_with_tools(text: &str) -> Result<(), String> {
        let mut last_error = String::from("no clipboard tool found");

        for (program, args) in CLIPBOARD_TOOLS {
            if program == "wl-copy" && std::env::var_os("WAYLAND_DISPLAY").is_none() {
                continue;
            }
            match pipe_to(program, args, text) {
                Ok(()) => {
                    debug!(tool = program, "Copied to clipboard");
                    return Ok(());
                }
                Err(e) => {
                    debug!(tool = program, error = %e, "Clipboard tool failed");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), String> {
        match self.write_native(text) {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!(error = %e, "Native clipboard failed, trying tools");
                self.native = None;
                Self::write_with_tools(text)
            }
        }
    }
}

fn pipe_to(program: &str, args: &[&str], input: &str) -> Result<(), String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("{program}: {e}"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|e| format!("{program}: {e}"))?;
    }

    let status = child.wait().map_err(|e| format!("{program}: {e}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{program} exited with {status}"))
    }
}

/// Share target running a user-configured command.
///
/// Arguments may contain `{title}`, `{text}`, `{url}` and `{content}`
/// placeholders. `{url}` expands to the content for non-URL results.
#[derive(Debug, Clone, Default)]
pub struct CommandShare {
    argv: Vec<String>,
}

impl CommandShare {
    pub fn new(argv: Option<Vec<String>>) -> Self {
        Self {
            argv: argv.unwrap_or_default(),
        }
    }

    /// Command line with placeholders filled in
    pub fn expand(&self, payload: &SharePayload) -> Vec<String> {
        let url = payload.url.as_deref().unwrap_or(&payload.content);
        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{title}", &payload.title)
                    .replace("{text}", &payload.text)
                    .replace("{url}", url)
                    .replace("{content}", &payload.content)
            })
            .collect()
    }
}

impl ShareTarget for CommandShare {
    fn is_available(&self) -> bool {
        !self.argv.is_empty()
    }

    fn share(&mut self, payload: &SharePayload) -> Result<(), String> {
        let argv = self.expand(payload);
        let Some((program, args)) = argv.split_first() else {
            return Err("no share command configured".to_string());
        };

        info!(program = %program, "Sharing scan result");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("{program}: {e}"))?;

        // Reap in the background; share helpers may stay open for a while
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

/// Opens URLs with the desktop's default handler
#[derive(Debug, Default)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&mut self, url: &str) -> Result<(), String> {
        open::that_detached(url).map_err(|e| e.to_string())
    }
}

/// Terminal bell
#[derive(Debug, Default)]
pub struct TerminalBell {
    pub enabled: bool,
}

impl Feedback for TerminalBell {
    fn success_cue(&mut self) {
        if !self.enabled {
            return;
        }
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x07");
        let _ = stdout.flush();
    }
}

/// The set of collaborators the page talks to
pub struct Platform {
    pub clipboard: Box<dyn Clipboard>,
    pub share: Box<dyn ShareTarget>,
    pub opener: Box<dyn UrlOpener>,
    pub feedback: Box<dyn Feedback>,
}

impl Platform {
    /// Desktop implementations
    pub fn system(share_command: Option<Vec<String>>, beep: bool) -> Self {
        Self {
            clipboard: Box::new(SystemClipboard::default()),
            share: Box::new(CommandShare::new(share_command)),
            opener: Box::new(SystemOpener),
            feedback: Box::new(TerminalBell { enabled: beep }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_payload_for_url() {
        let payload = SharePayload::for_result("https://example.com", Some("https://example.com"));
        assert_eq!(payload.title, "QR Scan Result");
        assert_eq!(payload.text, "Check out this QR code result:");
        assert_eq!(payload.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_command_share_expansion() {
        let share = CommandShare::new(Some(vec![
            "notify-send".to_string(),
            "{title}".to_string(),
            "{text} {url}".to_string(),
        ]));
        assert!(share.is_available());

        let text = SharePayload::for_result("hello", None);
        assert_eq!(
            share.expand(&text),
            vec![
                "notify-send",
                "QR Scan Result",
                "Check out this QR code result: hello"
            ]
        );
    }

    #[test]
    fn test_unconfigured_share_is_unavailable() {
        let mut share = CommandShare::new(None);
        assert!(!share.is_available());
        assert!(share.share(&SharePayload::for_result("x", None)).is_err());
    }
}
