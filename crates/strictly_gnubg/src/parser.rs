//! Parsers for gnubg text output.
//!
//! gnubg prints human-oriented text, so the parsers look for labels and
//! read the first number after each one. Anything unrecognised is skipped.

use serde::{Deserialize, Serialize};
use strictly_backgammon::{CubeDecision, CubeRecommendation, EvaluatorError, PositionEvaluation};
use tracing::{debug, instrument, warn};

/// One ranked line of `hint` output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HintLine {
    /// gnubg's rank, starting at 1.
    pub rank: u32,
    /// Move text in the mover's numbering, e.g. `8/5 6/5`.
    pub notation: String,
    /// Equity gnubg assigned to the play.
    pub equity: f64,
}

/// Reads a signed decimal at the start of `text`, returning it and the rest.
fn leading_number(text: &str) -> Option<(f64, &str)> {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    text[..end].parse().ok().map(|value| (value, &text[end..]))
}

/// First number following any occurrence of `label` and a `:`/space gap.
///
/// With `percent` the number must be followed by `%` and is scaled to 0-1.
fn labelled(text: &str, labels: &[&str], percent: bool) -> Option<f64> {
    let lower = text.to_ascii_lowercase();
    for label in labels {
        let mut search = 0;
        while let Some(found) = lower[search..].find(label) {
            let after = search + found + label.len();
            search = after;
            let rest = &lower[after..];
            let gap = rest
                .find(|c: char| c != ':' && !c.is_whitespace())
                .unwrap_or(rest.len());
            if gap == 0 {
                continue;
            }
            let Some((value, tail)) = leading_number(&rest[gap..]) else {
                continue;
            };
            match (percent, tail.starts_with('%')) {
                (true, true) => return Some(value / 100.0),
                (false, _) => return Some(value),
                (true, false) => continue,
            }
        }
    }
    None
}

/// Reads gnubg's probability table (`Win W(g) W(bg) L(g) L(bg) Equity`).
///
/// Uses the last row under the header, which is the deepest evaluation.
fn probability_table(text: &str) -> Option<PositionEvaluation> {
    let mut lines = text.lines().skip_while(|line| !line.contains("W(g)"));
    lines.next()?;
    let mut best = None;
    for line in lines {
        let values = line.split_once(':').map_or(line, |(_, rest)| rest);
        let numbers: Vec<f64> = values
            .split_whitespace()
            .filter_map(|token| leading_number(token.trim_matches(|c| c == '(' || c == ')')))
            .map(|(value, _)| value)
            .collect();
        if numbers.len() < 6 {
            if best.is_some() {
                break;
            }
            continue;
        }
        best = Some(PositionEvaluation {
            win: numbers[0],
            win_gammon: numbers[1],
            win_backgammon: numbers[2],
            lose_gammon: numbers[3],
            lose_backgammon: numbers[4],
            equity: numbers[5],
        });
    }
    best
}

/// Parses `eval` output.
///
/// Accepts gnubg's probability table or labelled lines such as
/// `Equity: +0.234` and `Win: 56.2%`.
#[instrument(skip(output))]
pub fn parse_evaluation(output: &str) -> Result<PositionEvaluation, EvaluatorError> {
    if let Some(evaluation) = probability_table(output) {
        debug!(equity = evaluation.equity, "Parsed probability table");
        return Ok(evaluation);
    }
    let equity = labelled(output, &["equity"], false);
    let win = labelled(output, &["win"], true);
    if equity.is_none() && win.is_none() {
        warn!("No evaluation found in gnubg output");
        return Err(EvaluatorError::Parse("no equity or win probability in output".into()));
    }
    Ok(PositionEvaluation {
        equity: equity.unwrap_or_default(),
        win: win.unwrap_or_default(),
        win_gammon: labelled(output, &["win g", "gammon"], true).unwrap_or_default(),
        win_backgammon: labelled(output, &["win bg", "backgammon"], true).unwrap_or_default(),
        lose_gammon: 0.0,
        lose_backgammon: 0.0,
    })
}

/// Parses `hint` output into ranked lines.
///
/// A line qualifies when it starts with `N.` and carries `Eq.:`; the move
/// text is every token between them that contains a `/`.
#[instrument(skip(output))]
pub fn parse_move_analysis(output: &str) -> Vec<HintLine> {
    let mut hints = Vec::new();
    for line in output.lines().map(str::trim) {
        let Some((rank_text, rest)) = line.split_once('.') else {
            continue;
        };
        let Ok(rank) = rank_text.parse::<u32>() else {
            continue;
        };
        let Some(eq_at) = rest.to_ascii_lowercase().find("eq.:") else {
            continue;
        };
        let notation = rest[..eq_at]
            .split_whitespace()
            .filter(|part| part.contains('/'))
            .collect::<Vec<_>>()
            .join(" ");
        if notation.is_empty() {
            warn!(rank, "Hint line without move text");
            continue;
        }
        let Some((equity, _)) = leading_number(rest[eq_at + 4..].trim_start()) else {
            warn!(rank, "Hint line without equity");
            continue;
        };
        debug!(rank, %notation, equity, "Parsed hint line");
        hints.push(HintLine {
            rank,
            notation,
            equity,
        });
    }
    hints
}

/// The action named on gnubg's `Proper cube action:` line, if any.
fn stated_action(output: &str) -> Option<CubeRecommendation> {
    let lower = output.to_ascii_lowercase();
    let at = ["proper cube action:", "correct cube action:"]
        .iter()
        .find_map(|marker| lower.find(marker).map(|i| i + marker.len()))?;
    let action = lower[at..].trim_start();
    if action.starts_with("no double") || action.starts_with("no redouble") {
        Some(CubeRecommendation::NoDouble)
    } else if action.starts_with("too good") {
        Some(CubeRecommendation::TooGood)
    } else if action.starts_with("double") || action.starts_with("redouble") {
        Some(CubeRecommendation::Double)
    } else {
        None
    }
}

/// Parses `hint cube` output from the doubler's point of view.
///
/// The three equities come from the `No double`, `Double, take` and
/// `Double, pass` lines. gnubg's stated action overrides the derived one.
#[instrument(skip(output))]
pub fn parse_cube_decision(output: &str) -> Result<CubeDecision, EvaluatorError> {
    let no_double = labelled(output, &["no double", "no redouble"], false);
    let take = labelled(output, &["double, take", "redouble, take"], false);
    let pass = labelled(output, &["double, pass", "redouble, pass"], false);
    if no_double.is_none() && take.is_none() && pass.is_none() {
        warn!("No cube equities found in gnubg output");
        return Err(EvaluatorError::Parse("no cube equities in output".into()));
    }
    let mut decision = CubeDecision::from_equities(
        no_double.unwrap_or_default(),
        take.unwrap_or_default(),
        pass.unwrap_or_default(),
    );
    if let Some(action) = stated_action(output) {
        decision.recommendation = action;
    }
    debug!(recommendation = %decision.recommendation, "Parsed cube decision");
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVAL_TABLE: &str = "\
Position ID: 4HPwATDgc/ABMA
Evaluator:   2-ply

              Win     W(g)    W(bg)   L(g)    L(bg)   Equity  (cubeful)
static:       0.528   0.152   0.007   0.134   0.006   +0.048  (+0.041)
1 ply:        0.515   0.147   0.008   0.136   0.006   +0.022  (+0.019)
2 ply:        0.520   0.149   0.008   0.135   0.006   +0.033  (+0.030)
";

    const HINT: &str = "\
    1. Cubeful 2-ply    8/5 6/5                      Eq.: +0.163
       0.551 0.170 0.007 - 0.449 0.124 0.005
        2-ply cubeful prune [world class]
    2. Cubeful 2-ply    24/23 13/10                  Eq.: -0.010 (-0.173)
       0.503 0.136 0.008 - 0.497 0.135 0.006
    3. Cubeful 2-ply    13/10 6/5                    Eq.: -0.015 (-0.178)
";

    const CUBE: &str = "\
Cube analysis
2-ply cubeful prune [world class]  0.712 (Money: +0.712)
  0.740 0.220 0.010 - 0.260 0.050 0.002
Cubeful equities:
1. Double, take               +0.924
2. Double, pass               +1.000  (+0.076)
3. No double                  +0.702  (-0.222)
Proper cube action: Double, take (29.9%)
";

    #[test]
    fn test_table_uses_deepest_row() {
        let evaluation = parse_evaluation(EVAL_TABLE).unwrap();
        assert_eq!(evaluation.win, 0.520);
        assert_eq!(evaluation.win_gammon, 0.149);
        assert_eq!(evaluation.equity, 0.033);
    }

    #[test]
    fn test_labelled_evaluation() {
        let evaluation =
            parse_evaluation("Equity: +0.234\nWin: 56.2%\nWin G: 12.5%\nWin BG: 0.8%\n").unwrap();
        assert_eq!(evaluation.equity, 0.234);
        assert!((evaluation.win - 0.562).abs() < 1e-9);
        assert!((evaluation.win_gammon - 0.125).abs() < 1e-9);
        assert!((evaluation.win_backgammon - 0.008).abs() < 1e-9);
    }

    #[test]
    fn test_evaluation_without_numbers_is_an_error() {
        assert!(matches!(
            parse_evaluation("gnubg: unknown command"),
            Err(EvaluatorError::Parse(_))
        ));
    }

    #[test]
    fn test_hint_lines() {
        let hints = parse_move_analysis(HINT);
        assert_eq!(hints.len(), 3);
        assert_eq!(hints[0].notation, "8/5 6/5");
        assert_eq!(hints[0].equity, 0.163);
        assert_eq!(hints[1].rank, 2);
        assert_eq!(hints[1].equity, -0.010);
    }

    #[test]
    fn test_cube_stated_action_wins() {
        let decision = parse_cube_decision(CUBE).unwrap();
        assert_eq!(decision.no_double_equity, 0.702);
        assert_eq!(decision.double_take_equity, 0.924);
        assert_eq!(decision.double_pass_equity, 1.0);
        assert_eq!(decision.recommendation, CubeRecommendation::Double);
        assert_eq!(decision.response(), CubeRecommendation::Take);
    }

    #[test]
    fn test_cube_derived_without_stated_action() {
        let text = "No double +0.400\nDouble, take +0.300\nDouble, pass +1.000\n";
        let decision = parse_cube_decision(text).unwrap();
        assert_eq!(decision.recommendation, CubeRecommendation::NoDouble);

        let too_good = "No double +1.200\nDouble, take +1.500\nDouble, pass +1.000\n\
                        Proper cube action: Too good to double, pass (12.0%)\n";
        assert_eq!(
            parse_cube_decision(too_good).unwrap().recommendation,
            CubeRecommendation::TooGood
        );
    }
}
