use std::collections::{HashMap, HashSet};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Reserved actions handled by the dispatcher instead of the active pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionId {
    Quit,
    TogglePane,
    ConfirmSelection,
    RequestDiff,
    Refresh,
    Filter,
}

impl ActionId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::TogglePane => "toggle_pane",
            Self::ConfirmSelection => "confirm_selection",
            Self::RequestDiff => "request_diff",
            Self::Refresh => "refresh",
            Self::Filter => "filter",
        }
    }

    pub fn from_name(raw: &str) -> Option<Self> {
        match raw.trim() {
            "quit" => Some(Self::Quit),
            "toggle_pane" => Some(Self::TogglePane),
            "confirm_selection" => Some(Self::ConfirmSelection),
            "request_diff" => Some(Self::RequestDiff),
            "refresh" => Some(Self::Refresh),
            "filter" => Some(Self::Filter),
            _ => None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Quit,
            Self::TogglePane,
            Self::ConfirmSelection,
            Self::RequestDiff,
            Self::Refresh,
            Self::Filter,
        ]
    }
}

pub const DEFAULT_BINDINGS: &[(ActionId, &str)] = &[
    (ActionId::Quit, "q"),
    (ActionId::TogglePane, "tab"),
    (ActionId::ConfirmSelection, "space"),
    (ActionId::RequestDiff, "enter"),
    (ActionId::Refresh, "r"),
    (ActionId::Filter, "/"),
];

#[derive(Debug, Clone)]
pub struct ActionKeyMap {
    event_to_action: HashMap<String, ActionId>,
    primary_for_action: HashMap<ActionId, String>,
}

impl Default for ActionKeyMap {
    fn default() -> Self {
        let mut event_to_action = HashMap::new();
        let mut primary_for_action = HashMap::new();
        for (action, key) in DEFAULT_BINDINGS {
            event_to_action.insert((*key).to_string(), *action);
            primary_for_action
                .entry(*action)
                .or_insert_with(|| (*key).to_string());
        }
        Self {
            event_to_action,
            primary_for_action,
        }
    }
}

impl ActionKeyMap {
    pub fn from_overrides(overrides: &HashMap<String, String>) -> Result<Self, Vec<String>> {
        let mut issues = Vec::new();

        let mut action_to_keys = HashMap::<ActionId, Vec<String>>::new();
        for (action, key) in DEFAULT_BINDINGS {
            action_to_keys
                .entry(*action)
                .or_default()
                .push((*key).to_string());
        }

        for (action_name, key_raw) in overrides {
            let Some(action) = ActionId::from_name(action_name) else {
                issues.push(format!(
                    "unknown keybinding action '{action_name}' (expected one of: {})",
                    ActionId::all()
                        .iter()
                        .map(|id| id.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
                continue;
            };
            match canonicalize_key_binding(key_raw) {
                Ok(canonical) if canonical == "ctrl+c" => {
                    issues.push(format!(
                        "keybinding for '{action_name}' uses ctrl+c, which always quits"
                    ));
                }
                Ok(canonical) => {
                    action_to_keys.insert(action, vec![canonical]);
                }
                Err(err) => {
                    issues.push(format!("invalid keybinding for '{action_name}': {err}"));
                }
            }
        }

        let mut event_to_action = HashMap::<String, ActionId>::new();
        let mut primary_for_action = HashMap::<ActionId, String>::new();
        let mut seen = HashSet::<String>::new();
        for action in ActionId::all() {
            let keys = action_to_keys.remove(action).unwrap_or_default();
            let Some(primary) = keys.first() else {
                issues.push(format!("no keybinding for action '{}'", action.as_str()));
                continue;
            };
            primary_for_action.insert(*action, primary.clone());
            for key in keys {
                if !seen.insert(key.clone()) {
                    issues.push(format!("duplicate keybinding '{key}'"));
                    continue;
                }
                event_to_action.insert(key, *action);
            }
        }

        if !issues.is_empty() {
            return Err(issues);
        }

        Ok(Self {
            event_to_action,
            primary_for_action,
        })
    }

    pub fn action_for_event(&self, key: KeyEvent) -> Option<ActionId> {
        let canonical = canonicalize_key_event(key)?;
        self.event_to_action.get(&canonical).copied()
    }

    pub fn key_for_action(&self, action: ActionId) -> Option<&str> {
        self.primary_for_action.get(&action).map(String::as_str)
    }
}

pub fn validate_key_overrides(overrides: &HashMap<String, String>) -> Vec<String> {
    ActionKeyMap::from_overrides(overrides)
        .err()
        .unwrap_or_default()
}

pub fn canonicalize_key_binding(raw: &str) -> Result<String, String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err("empty keybinding".to_string());
    }
    let mut tokens = text.split('+').map(str::trim).collect::<Vec<_>>();
    if tokens.iter().any(|t| t.is_empty()) {
        return Err(format!("invalid keybinding '{text}'"));
    }

    let Some(key_token) = tokens.pop() else {
        return Err("empty keybinding".to_string());
    };
    let mut ctrl = false;
    let mut alt = false;
    let mut shift = false;

    for modifier in tokens {
        match modifier.to_ascii_lowercase().as_str() {
            "ctrl" | "control" => ctrl = true,
            "alt" => alt = true,
            "shift" => shift = true,
            other => return Err(format!("unknown modifier '{other}'")),
        }
    }

    let key = normalize_key_token(key_token)?;
    // Char keys already carry their case.
    if key.chars().count() == 1 {
        shift = false;
    }
    Ok(canonical_key_string(key, ctrl, alt, shift))
}

fn normalize_key_token(token: &str) -> Result<String, String> {
    let key = token.trim();
    if key.chars().count() == 1 {
        return Ok(key.to_string());
    }
    match key.to_ascii_lowercase().as_str() {
        "tab" => Ok("tab".to_string()),
        "space" => Ok("space".to_string()),
        "up" => Ok("up".to_string()),
        "down" => Ok("down".to_string()),
        "pageup" | "pgup" => Ok("pageup".to_string()),
        "pagedown" | "pgdn" => Ok("pagedown".to_string()),
        "home" => Ok("home".to_string()),
        "end" => Ok("end".to_string()),
        "enter" | "return" => Ok("enter".to_string()),
        "esc" | "escape" => Ok("esc".to_string()),
        "backspace" => Ok("backspace".to_string()),
        _ => Err(format!("unknown key '{key}'")),
    }
}

fn canonicalize_key_event(event: KeyEvent) -> Option<String> {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
    let alt = event.modifiers.contains(KeyModifiers::ALT);
    let mut shift = event.modifiers.contains(KeyModifiers::SHIFT);

    let key = match event.code {
        KeyCode::Char(' ') => {
            shift = false;
            "space".to_string()
        }
        KeyCode::Char(c) => {
            shift = false;
            c.to_string()
        }
        KeyCode::Tab => "tab".to_string(),
        KeyCode::BackTab => {
            shift = true;
            "tab".to_string()
        }
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::PageUp => "pageup".to_string(),
        KeyCode::PageDown => "pagedown".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        _ => return None,
    };

    Some(canonical_key_string(key, ctrl, alt, shift))
}

fn canonical_key_string(key: String, ctrl: bool, alt: bool, shift: bool) -> String {
    let mut parts = Vec::new();
    if ctrl {
        parts.push("ctrl".to_string());
    }
    if alt {
        parts.push("alt".to_string());
    }
    if shift {
        parts.push("shift".to_string());
    }
    parts.push(key);
    parts.join("+")
}
