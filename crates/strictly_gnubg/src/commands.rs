//! gnubg command script builders.
//!
//! Every script starts a fresh game or match, loads the position by its
//! Position ID and then asks a single question.

use strictly_backgammon::{Board, Color, DiceRoll, DoublingCube, MatchContext, position_id};

fn preamble(plies: u8) -> Vec<String> {
    vec![
        "set automatic game off".to_string(),
        "set automatic roll off".to_string(),
        format!("set evaluation chequerplay evaluation plies {}", plies),
        format!("set evaluation cubedecision evaluation plies {}", plies),
    ]
}

fn setup(board: &Board, color: Color, context: &MatchContext) -> Vec<String> {
    let mut commands = Vec::new();
    if context.is_money_game() {
        commands.push("new session".to_string());
    } else {
        commands.push(format!("new match {}", context.target_score()));
        commands.push(format!(
            "set score {} {}",
            context.score(color),
            context.score(color.opponent())
        ));
        if context.is_crawford_game() {
            commands.push("set crawford on".to_string());
        }
    }
    commands.push(format!("set board {}", position_id::encode(board, color)));
    commands
}

/// Script for a static evaluation of `board` with `color` on roll.
pub fn evaluation(plies: u8, board: &Board, color: Color, context: &MatchContext) -> Vec<String> {
    let mut commands = preamble(plies);
    commands.push("set evaluation chequerplay evaluation cubeful off".to_string());
    commands.extend(setup(board, color, context));
    commands.push("eval".to_string());
    commands
}

/// Script ranking the plays of `dice`.
pub fn hint(
    plies: u8,
    board: &Board,
    color: Color,
    dice: DiceRoll,
    context: &MatchContext,
) -> Vec<String> {
    let mut commands = preamble(plies);
    commands.push("set evaluation chequerplay evaluation cubeful off".to_string());
    commands.extend(setup(board, color, context));
    commands.push(format!("set dice {} {}", dice.high(), dice.low()));
    commands.push("hint".to_string());
    commands
}

/// Script for a cube decision by `color` before rolling.
pub fn cube(
    plies: u8,
    board: &Board,
    color: Color,
    cube: &DoublingCube,
    context: &MatchContext,
) -> Vec<String> {
    let mut commands = preamble(plies);
    commands.push("set evaluation chequerplay evaluation cubeful on".to_string());
    commands.push("set evaluation cubedecision evaluation cubeful on".to_string());
    commands.extend(setup(board, color, context));
    if cube.value() > 1 {
        commands.push(format!("set cube value {}", cube.value()));
    }
    commands.push("hint cube".to_string());
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_script_for_opening() {
        let commands = hint(
            2,
            &Board::new(),
            Color::White,
            DiceRoll::new(1, 3).unwrap(),
            &MatchContext::money_game(),
        );
        assert_eq!(commands[2], "set evaluation chequerplay evaluation plies 2");
        assert!(commands.contains(&"set board 4HPwATDgc/ABMA".to_string()));
        assert!(commands.contains(&"set dice 3 1".to_string()));
        assert_eq!(commands.last().map(String::as_str), Some("hint"));
    }

    #[test]
    fn test_cube_script_sets_match_state() {
        let context = MatchContext::new(5, 4, 2, false);
        let commands = cube(1, &Board::new(), Color::White, &DoublingCube::new(), &context);
        assert!(commands.contains(&"set evaluation cubedecision evaluation cubeful on".to_string()));
        assert!(commands.contains(&"new match 5".to_string()));
        assert!(commands.contains(&"set crawford on".to_string()));
        assert_eq!(commands.last().map(String::as_str), Some("hint cube"));
    }
}
