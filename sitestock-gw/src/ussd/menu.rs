//! USSD menu session state machine
//!
//! The telephony gateway keeps no session state: every callback carries the
//! full `*`-joined input history, and the current menu position is re-derived
//! by replaying that history from the beginning. `respond` is a pure function
//! of the material catalog and the history, so replaying the same history
//! always produces the same reply and never repeats a side effect.

use sitestock_common::db::Material;

/// Reply to one session step, following the gateway's CON/END convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UssdResponse {
    /// Session continues; the gateway displays the prompt and awaits input
    Continue(String),
    /// Terminal response; the gateway closes the session
    End(String),
}

impl UssdResponse {
    /// Render with the two-token prefix the gateway dispatches on
    pub fn render(&self) -> String {
        match self {
            UssdResponse::Continue(text) => format!("CON {}", text),
            UssdResponse::End(text) => format!("END {}", text),
        }
    }
}

/// Stock mutation requested by a completed recording flow.
///
/// `material` indexes into the catalog slice passed to `respond`. The effect
/// is only emitted when the final token of the history completed the flow;
/// gateway resends with trailing tokens re-render the terminal reply without
/// requesting the mutation again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    Receipt { material: usize, quantity: i64 },
    Usage { material: usize, quantity: i64 },
}

/// Outcome of replaying one session history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuStep {
    pub response: UssdResponse,
    pub effect: Option<StockEffect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Receipt,
    Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Record(RecordKind),
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Root,
    SelectMaterial { action: MenuAction },
    AwaitQuantity { kind: RecordKind, material: usize },
    Done(Terminal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    Stock { material: usize },
    Recorded { kind: RecordKind, material: usize, quantity: i64 },
}

/// Replay a session's input history and produce the next reply.
///
/// Invalid tokens are consumed without advancing the state; the following
/// prompt carries a one-line error prefix. Tokens arriving after a terminal
/// state are ignored.
pub fn respond(materials: &[Material], text: &str) -> MenuStep {
    let trimmed = text.trim();
    let tokens: Vec<&str> = if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('*').collect()
    };

    let mut state = State::Root;
    let mut error: Option<&'static str> = None;
    let mut completed_at: Option<usize> = None;

    for (index, token) in tokens.iter().enumerate() {
        error = None;
        state = match state {
            State::Root => match token.trim() {
                "1" => State::SelectMaterial {
                    action: MenuAction::Record(RecordKind::Receipt),
                },
                "2" => State::SelectMaterial {
                    action: MenuAction::Check,
                },
                "3" => State::SelectMaterial {
                    action: MenuAction::Record(RecordKind::Usage),
                },
                _ => {
                    error = Some("Invalid choice.");
                    State::Root
                }
            },
            State::SelectMaterial { action } => match resolve_material(materials, token) {
                Some(material) => match action {
                    MenuAction::Check => {
                        completed_at = Some(index);
                        State::Done(Terminal::Stock { material })
                    }
                    MenuAction::Record(kind) => State::AwaitQuantity { kind, material },
                },
                None => {
                    error = Some("Invalid selection.");
                    State::SelectMaterial { action }
                }
            },
            State::AwaitQuantity { kind, material } => match parse_quantity(token) {
                Some(quantity) => {
                    completed_at = Some(index);
                    State::Done(Terminal::Recorded {
                        kind,
                        material,
                        quantity,
                    })
                }
                None => {
                    error = Some("Invalid quantity. Enter a positive number.");
                    State::AwaitQuantity { kind, material }
                }
            },
            done @ State::Done(_) => done,
        };
    }

    build_step(materials, state, error, completed_at, tokens.len())
}

/// Resolve a material selection token: 1-based menu index or material name
/// (case-insensitive).
fn resolve_material(materials: &[Material], token: &str) -> Option<usize> {
    let token = token.trim();

    if let Ok(index) = token.parse::<usize>() {
        if index >= 1 && index <= materials.len() {
            return Some(index - 1);
        }
        return None;
    }

    materials
        .iter()
        .position(|m| m.name.eq_ignore_ascii_case(token))
}

fn parse_quantity(token: &str) -> Option<i64> {
    token.trim().parse::<i64>().ok().filter(|q| *q > 0)
}

fn build_step(
    materials: &[Material],
    state: State,
    error: Option<&'static str>,
    completed_at: Option<usize>,
    token_count: usize,
) -> MenuStep {
    let effect = match (state, completed_at) {
        (
            State::Done(Terminal::Recorded {
                kind,
                material,
                quantity,
            }),
            Some(at),
        ) if at + 1 == token_count => Some(match kind {
            RecordKind::Receipt => StockEffect::Receipt { material, quantity },
            RecordKind::Usage => StockEffect::Usage { material, quantity },
        }),
        _ => None,
    };

    let response = match state {
        State::Root => UssdResponse::Continue(with_error(error, root_menu())),
        State::SelectMaterial { .. } => {
            if materials.is_empty() {
                UssdResponse::End("No materials found.".to_string())
            } else {
                UssdResponse::Continue(with_error(error, material_menu(materials)))
            }
        }
        State::AwaitQuantity { kind, .. } => {
            let prompt = match kind {
                RecordKind::Receipt => "Enter quantity received:",
                RecordKind::Usage => "Enter quantity used:",
            };
            UssdResponse::Continue(with_error(error, prompt.to_string()))
        }
        State::Done(Terminal::Stock { material }) => {
            let m = &materials[material];
            UssdResponse::End(format!("{}: {} {} in stock.", m.name, m.quantity, m.unit))
        }
        State::Done(Terminal::Recorded {
            kind,
            material,
            quantity,
        }) => {
            let m = &materials[material];
            match kind {
                RecordKind::Receipt => UssdResponse::End(format!(
                    "Recorded {} {} of {}. Thank you.",
                    quantity, m.unit, m.name
                )),
                RecordKind::Usage => {
                    UssdResponse::End(format!("Used {} {} of {}.", quantity, m.unit, m.name))
                }
            }
        }
    };

    MenuStep { response, effect }
}

fn with_error(error: Option<&'static str>, body: String) -> String {
    match error {
        Some(e) => format!("{}\n{}", e, body),
        None => body,
    }
}

fn root_menu() -> String {
    "Welcome to SiteStock\n1. Record material\n2. Check stock\n3. Record material used"
        .to_string()
}

fn material_menu(materials: &[Material]) -> String {
    let mut menu = String::from("Select material:");
    for (i, material) in materials.iter().enumerate() {
        menu.push_str(&format!("\n{}. {}", i + 1, material.name));
    }
    menu
}
