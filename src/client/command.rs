//! Line commands understood by the interactive chat.

use std::path::PathBuf;

use super::session::TabId;

/// A parsed chat input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Blank line.
    Empty,
    /// Plain text: ask it as a question.
    Ask(String),
    /// `/upload <path>`
    Upload(PathBuf),
    /// `/tabs`: show the strip and the active answer.
    Tabs,
    /// `/open <id>`
    Open(TabId),
    /// `/close [id]`: close the given tab, or the active one.
    Close(Option<TabId>),
    /// `/more`: show the overflow menu.
    Overflow,
    /// `/find [text]`: filter the overflow menu; no text clears the filter.
    Find(String),
    /// `/next`
    NextPage,
    /// `/prev`
    PrevPage,
    /// `/width <columns>`
    Width(u32),
    /// `/help`
    Help,
    /// `/quit` or `/exit`
    Quit,
}

/// Usage text printed by `/help`.
pub const HELP: &str = "\
Type a question to ask it. Commands:
  /upload <path>   upload a PDF
  /tabs            list tabs and show the active answer
  /open <id>       switch to a tab
  /close [id]      close a tab (default: the active one)
  /more            show the overflow menu
  /find [text]     filter the overflow menu
  /next, /prev     page through the overflow menu
  /width <n>       set the tab strip width
  /quit            leave";

impl ChatCommand {
    /// Parse one input line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Self::Empty);
        }
        let Some(command) = line.strip_prefix('/') else {
            return Ok(Self::Ask(line.to_string()));
        };

        let (name, argument) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };

        match name {
            "upload" if !argument.is_empty() => Ok(Self::Upload(PathBuf::from(argument))),
            "upload" => Err("usage: /upload <path>".into()),
            "tabs" => Ok(Self::Tabs),
            "open" => argument.parse().map(Self::Open),
            "close" if argument.is_empty() => Ok(Self::Close(None)),
            "close" => argument.parse().map(|id| Self::Close(Some(id))),
            "more" => Ok(Self::Overflow),
            "find" => Ok(Self::Find(argument.to_string())),
            "next" => Ok(Self::NextPage),
            "prev" => Ok(Self::PrevPage),
            "width" => argument
                .parse()
                .map(Self::Width)
                .map_err(|_| "usage: /width <columns>".to_string()),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command /{other}; try /help")),
        }
    }
}
