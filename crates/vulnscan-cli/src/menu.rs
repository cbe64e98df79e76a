use std::io::{self, BufRead, Write};

use vulnscan_core::ScanRequest;

/// Commands offered by the interactive menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    HostScan,
    WebScan,
    Exit,
}

pub struct MenuEntry {
    pub key: &'static str,
    pub label: &'static str,
    pub command: MenuCommand,
}

/// Dispatch table: what the operator types, what is shown, what runs.
pub const MENU: &[MenuEntry] = &[
    MenuEntry {
        key: "1",
        label: "Network scan (nmap)",
        command: MenuCommand::HostScan,
    },
    MenuEntry {
        key: "2",
        label: "Web page scan (nmap, Nikto and Wapiti)",
        command: MenuCommand::WebScan,
    },
    MenuEntry {
        key: "3",
        label: "Exit",
        command: MenuCommand::Exit,
    },
];

impl MenuCommand {
    pub fn parse(choice: &str) -> Option<Self> {
        MENU.iter()
            .find(|entry| entry.key == choice.trim())
            .map(|entry| entry.command)
    }

    /// Prompt for the target and how to turn the answer into a request.
    fn target_prompt(self) -> Option<(&'static str, fn(String) -> ScanRequest)> {
        match self {
            Self::HostScan => Some(("Enter the IP/host to scan: ", host_request as fn(String) -> ScanRequest)),
            Self::WebScan => Some(("Enter the URL to analyze: ", web_request as fn(String) -> ScanRequest)),
            Self::Exit => None,
        }
    }
}

fn host_request(target: String) -> ScanRequest {
    ScanRequest::host(target)
}

fn web_request(target: String) -> ScanRequest {
    ScanRequest::web(target)
}

/// What the operator chose.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Scan(ScanRequest),
    Exit,
    Invalid(String),
}

/// Show the menu once, read a choice (and a target when needed).
pub fn prompt_action<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<Action> {
    writeln!(out, "=== Main Menu ===")?;
    for entry in MENU {
        writeln!(out, "{}. {}", entry.key, entry.label)?;
    }
    let choice = ask(input, out, "Select an option: ")?;
    let Some(command) = MenuCommand::parse(&choice) else {
        return Ok(Action::Invalid("Invalid option.".into()));
    };
    let Some((prompt, build)) = command.target_prompt() else {
        return Ok(Action::Exit);
    };
    let target = ask(input, out, prompt)?;
    if target.is_empty() {
        return Ok(Action::Invalid("No target given.".into()));
    }
    Ok(Action::Scan(build(target)))
}

fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> io::Result<String> {
    write!(out, "{prompt}")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
