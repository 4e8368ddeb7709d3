use crate::entity::bo::session_bo::{ActionOutcome, SessionSnapshot, ValuePolicy};

fn enabled(flag: bool) -> &'static str {
    if flag { "enabled" } else { "disabled" }
}

/// the status card
pub fn render(snapshot: &SessionSnapshot) -> String {
    let status = match &snapshot.serial_port {
        Some(port) => format!("{} ({})", snapshot.status, port),
        None => snapshot.status.to_string(),
    };
    let policy = match snapshot.value_policy {
        ValuePolicy::Optimistic => "optimistic",
        ValuePolicy::Confirmed => "confirmed",
    };
    format!(
        "status : {}\nled    : {}\ncontrol: [ON] {}  [OFF] {}\nvalue  : {}\npolicy : {}",
        status,
        snapshot.device_state,
        enabled(snapshot.controls.on_enabled),
        enabled(snapshot.controls.off_enabled),
        snapshot.display_value(),
        policy,
    )
}

pub fn outcome_line(action: &str, outcome: &ActionOutcome) -> String {
    match outcome {
        ActionOutcome::Done => format!("{}: ok", action),
        ActionOutcome::Rejected(reason) => format!("{}: {}", action, reason),
        ActionOutcome::Busy => format!("{}: busy, wait for the running action", action),
    }
}
