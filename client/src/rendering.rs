//! Text rendering of server snapshots for the terminal

use shared::{PlayerView, ResponseView, ServerMessage, Snapshot};

const HAND_GAME_NOTE: &str =
    "Hand game: 0 beats any other number, 100 loses to any other number";

/// Turns one server message into the block of text shown to the player
pub fn render(message: &ServerMessage) -> String {
    match message {
        ServerMessage::State(snapshot) => render_state(snapshot),
        ServerMessage::Result(snapshot) => render_result("Round result", snapshot),
        ServerMessage::Gameover(snapshot) => {
            let mut out = render_result("Game over", snapshot);
            out.push_str(&render_leaderboard(snapshot));
            out
        }
        ServerMessage::Error { message } => format!("Error: {}\n", message),
    }
}

fn render_state(snapshot: &Snapshot) -> String {
    let mut out = String::from("Round in progress\n");

    for player in snapshot.players.iter().filter(|p| !p.eliminated) {
        let status = match &player.response {
            Some(ResponseView::Value(_)) => "Responded",
            Some(ResponseView::Pending(placeholder)) => placeholder.as_str(),
            None => "",
        };
        out.push_str(&format!(
            "  {:<16} score {:>2}  {}\n",
            player.name, player.score, status
        ));
    }

    let eliminated = eliminated_names(&snapshot.players);
    if !eliminated.is_empty() {
        out.push_str(&format!("Eliminated: {}\n", eliminated.join(", ")));
    }
    out
}

fn render_result(title: &str, snapshot: &Snapshot) -> String {
    let mut out = format!("{}\n", title);

    for player in &snapshot.players {
        if let Some(value) = player.response.as_ref().and_then(ResponseView::value) {
            out.push_str(&format!(
                "  {:<16} answered {:>3}  score {:>2}\n",
                player.name, value, player.score
            ));
        }
    }

    match (snapshot.average, snapshot.target) {
        (Some(average), Some(target)) => {
            out.push_str(&format!("Average {:.2}, target {:.2}\n", average, target));
        }
        _ => {
            out.push_str(HAND_GAME_NOTE);
            out.push('\n');
        }
    }

    let winners = snapshot.winners.clone().unwrap_or_default();
    if winners.is_empty() {
        out.push_str("Winners: none\n");
    } else {
        out.push_str(&format!("Winners: {}\n", winners.join(", ")));
    }

    let eliminated = eliminated_names(&snapshot.players);
    if !eliminated.is_empty() {
        out.push_str(&format!("Eliminated: {}\n", eliminated.join(", ")));
    }
    out
}

/// Highest score first, ties by name
fn render_leaderboard(snapshot: &Snapshot) -> String {
    let mut ranked: Vec<&PlayerView> = snapshot.players.iter().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));

    let mut out = String::from("Leaderboard\n");
    for (place, player) in ranked.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {:<16} {:>2}\n",
            place + 1,
            player.name,
            player.score
        ));
    }
    out
}

fn eliminated_names(players: &[PlayerView]) -> Vec<&str> {
    players
        .iter()
        .filter(|p| p.eliminated)
        .map(|p| p.name.as_str())
        .collect()
}
