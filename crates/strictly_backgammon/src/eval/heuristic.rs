//! Reference heuristic evaluator.
//!
//! A static, single-ply evaluation built from a handful of classic features.
//! The race term rewards every pip gained. Home-board, prime and anchor
//! strength is worth at most the race value of the pips over which the two
//! rear guards still overlap, so it fades out as contact is broken and a
//! safe advance never lowers equity. Blot and bar terms vanish on their own
//! once the sides have passed.

use super::{
    BestMovesAnalysis, CubeDecision, CubeRecommendation, Evaluator, EvaluatorError,
    PositionEvaluation, RankedPlay,
};
use crate::board::Board;
use crate::cube::DoublingCube;
use crate::dice::DiceRoll;
use crate::match_play::MatchContext;
use crate::movegen::MoveGenerator;
use crate::registry::PluginInfo;
use crate::types::{CHECKERS_PER_SIDE, Color, POINTS};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const ON_ROLL_PIPS: f64 = 4.0;
const RACE_SCALE: f64 = 8.0;
const HOME_POINT: f64 = 0.12;
const PRIME: f64 = 0.10;
const ANCHOR: f64 = 0.15;
const DIRECT_SHOT: f64 = 0.20;
const INDIRECT_SHOT: f64 = 0.08;
const BAR: f64 = 0.25;

/// Equity thresholds for cube actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubeThresholds {
    /// Taker's minimum winning chance to accept a double.
    pub take_point: f64,
    /// Doubler's minimum winning chance to offer a double.
    pub double_point: f64,
}

impl Default for CubeThresholds {
    fn default() -> Self {
        Self {
            take_point: 0.2,
            double_point: 0.70,
        }
    }
}

/// Positional features for one side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionFeatures {
    /// Pip count.
    pub pips: u32,
    /// Checkers borne off.
    pub off: u8,
    /// Checkers on the bar.
    pub bar: u8,
    /// Made points in the home board.
    pub home_points: u8,
    /// Longest run of consecutive made points.
    pub prime: u8,
    /// Made points in the opponent's home board.
    pub anchors: u8,
    /// Blots within six pips of an opposing checker.
    pub direct_blots: u8,
    /// Blots seven to twelve pips from an opposing checker.
    pub indirect_blots: u8,
    /// Checkers on the bar or in the opponent's home board.
    pub stragglers: u8,
}

impl PositionFeatures {
    /// Extracts features for `color`.
    pub fn extract(board: &Board, color: Color) -> Self {
        let opponent = color.opponent();
        let made = |d: u8| board.checkers_at(color, color.point_at(d)) >= 2;

        let mut prime = 0u8;
        let mut run = 0u8;
        for d in 1..=POINTS {
            run = if made(d) { run + 1 } else { 0 };
            prime = prime.max(run);
        }

        let mut direct_blots = 0;
        let mut indirect_blots = 0;
        for point in 1..=POINTS {
            if board.checkers_at(color, point) != 1 {
                continue;
            }
            match nearest_attacker(board, opponent, point) {
                Some(gap) if gap <= 6 => direct_blots += 1,
                Some(gap) if gap <= 12 => indirect_blots += 1,
                _ => {}
            }
        }

        let in_opponent_home: u8 = (1..=POINTS)
            .filter(|&p| opponent.is_home(p))
            .map(|p| board.checkers_at(color, p))
            .sum();

        Self {
            pips: board.pip_count(color),
            off: board.borne_off(color),
            bar: board.bar(color),
            home_points: (1..=6).filter(|&d| made(d)).count() as u8,
            prime,
            anchors: (19..=24).filter(|&d| made(d)).count() as u8,
            direct_blots,
            indirect_blots,
            stragglers: board.bar(color) + in_opponent_home,
        }
    }

    /// Chance of being gammoned if this side loses.
    fn gammon_rate(&self) -> f64 {
        if self.off > 0 {
            return 0.0;
        }
        let base = (self.pips as f64 - 60.0) / 300.0;
        (base + 0.04 * self.stragglers as f64).clamp(0.0, 0.6)
    }

    /// Fraction of gammon losses that are backgammons.
    fn backgammon_share(&self) -> f64 {
        (self.stragglers as f64 / 3.0).min(1.0) * 0.5
    }
}

/// Race value of one pip for a side with `mine` pips against `theirs`.
fn pip_value(mine: f64, theirs: f64) -> f64 {
    RACE_SCALE * (2.0 * theirs + ON_ROLL_PIPS + 20.0) / (mine + theirs + 20.0).powi(2)
}

/// Smallest distance from an attacker of `attacker` color behind `point`.
fn nearest_attacker(board: &Board, attacker: Color, point: u8) -> Option<u8> {
    let target = attacker.distance(point);
    let from_bar = (board.bar(attacker) > 0).then(|| 25 - target);
    (1..=POINTS)
        .filter(|&p| board.checkers_at(attacker, p) > 0)
        .map(|p| attacker.distance(p))
        .filter(|&d| d > target)
        .map(|d| d - target)
        .chain(from_bar)
        .min()
}

/// Heuristic evaluator.
#[derive(Debug, Clone)]
pub struct HeuristicEvaluator {
    info: PluginInfo,
    thresholds: CubeThresholds,
}

impl HeuristicEvaluator {
    /// Creates an evaluator with the given cube thresholds.
    pub fn new(thresholds: CubeThresholds) -> Self {
        Self {
            info: Self::plugin_info(),
            thresholds,
        }
    }

    /// Registry metadata.
    pub fn plugin_info() -> PluginInfo {
        PluginInfo::new("heuristic", "Heuristic evaluator", 35, false)
    }

    /// Cube thresholds in use.
    pub fn thresholds(&self) -> CubeThresholds {
        self.thresholds
    }

    /// Static evaluation of `board` for `color`, who is on roll.
    #[instrument(skip(self, board, context))]
    pub fn evaluate(&self, board: &Board, color: Color, context: &MatchContext) -> PositionEvaluation {
        let opponent = color.opponent();
        if board.borne_off(color) == CHECKERS_PER_SIDE {
            return PositionEvaluation {
                equity: 1.0,
                win: 1.0,
                ..Default::default()
            };
        }
        if board.borne_off(opponent) == CHECKERS_PER_SIDE {
            return PositionEvaluation {
                equity: -1.0,
                ..Default::default()
            };
        }

        let mine = PositionFeatures::extract(board, color);
        let theirs = PositionFeatures::extract(board, opponent);

        let (my_pips, their_pips) = (mine.pips as f64, theirs.pips as f64);
        let mut score = RACE_SCALE * (their_pips - my_pips + ON_ROLL_PIPS) / (my_pips + their_pips + 20.0);
        let strength = HOME_POINT * (mine.home_points as f64 - theirs.home_points as f64)
            + PRIME * (mine.prime.saturating_sub(2) as f64 - theirs.prime.saturating_sub(2) as f64)
            + ANCHOR * (mine.anchors.min(2) as f64 - theirs.anchors.min(2) as f64);
        let cap = board.contact_overlap() as f64 * pip_value(my_pips, their_pips);
        score += strength.clamp(-cap, cap);
        score += DIRECT_SHOT * (theirs.direct_blots as f64 - mine.direct_blots as f64);
        score += INDIRECT_SHOT * (theirs.indirect_blots as f64 - mine.indirect_blots as f64);
        score += BAR * (theirs.bar as f64 - mine.bar as f64);

        let win = 1.0 / (1.0 + (-score).exp());
        let win_gammon = win * theirs.gammon_rate();
        let win_backgammon = win_gammon * theirs.backgammon_share();
        let lose_gammon = (1.0 - win) * mine.gammon_rate();
        let lose_backgammon = lose_gammon * mine.backgammon_share();

        let my_gammons = if context.gammon_counts_for(color) { 1.0 } else { 0.0 };
        let their_gammons = if context.gammon_counts_for(opponent) { 1.0 } else { 0.0 };
        let equity = (2.0 * win - 1.0)
            + my_gammons * (win_gammon + win_backgammon)
            - their_gammons * (lose_gammon + lose_backgammon);

        debug!(score, win, equity, "Heuristic evaluation");
        PositionEvaluation {
            equity,
            win,
            win_gammon,
            win_backgammon,
            lose_gammon,
            lose_backgammon,
        }
    }

    /// Ranks every legal play of `dice` by the opponent's resulting equity.
    pub fn rank_plays(
        &self,
        board: &Board,
        color: Color,
        dice: &[u8],
        context: &MatchContext,
    ) -> BestMovesAnalysis {
        let plays = MoveGenerator::sequences(board, color, dice)
            .iter()
            .map(|seq| {
                let reply = self.evaluate(seq.result(), color.opponent(), context);
                RankedPlay::from_sequence(seq, -reply.equity)
            })
            .collect();
        BestMovesAnalysis::new(plays)
    }

    /// Cube analysis for `color`; see [`Evaluator::analyze_cube_decision`].
    pub fn cube_decision(
        &self,
        board: &Board,
        color: Color,
        cube: &DoublingCube,
        context: &MatchContext,
    ) -> CubeDecision {
        let responding = cube.pending_offer() == Some(color.opponent());
        let doubler = if responding { color.opponent() } else { color };
        let equity = self.evaluate(board, doubler, context).equity;
        let no_double = equity;
        let double_take = (2.0 * equity).clamp(-2.0 * 3.0, 2.0 * 3.0);
        let double_pass = 1.0;

        let doubler_chance = ((1.0 + equity) / 2.0).clamp(0.0, 1.0);
        let taker_chance = 1.0 - doubler_chance;

        let recommendation = if responding {
            if taker_chance >= self.thresholds.take_point {
                CubeRecommendation::Take
            } else {
                CubeRecommendation::Pass
            }
        } else if context.is_crawford_game()
            || !cube.has_access(color)
            || cube.pending_offer().is_some()
            || doubler_chance < self.thresholds.double_point
        {
            CubeRecommendation::NoDouble
        } else if taker_chance < self.thresholds.take_point && no_double > double_pass {
            CubeRecommendation::TooGood
        } else {
            CubeRecommendation::Double
        };

        CubeDecision {
            no_double_equity: no_double,
            double_take_equity: double_take,
            double_pass_equity: double_pass,
            recommendation,
        }
    }
}

impl Default for HeuristicEvaluator {
    fn default() -> Self {
        Self::new(CubeThresholds::default())
    }
}

fn check_cancel(cancel: &CancellationToken) -> Result<(), EvaluatorError> {
    if cancel.is_cancelled() {
        Err(EvaluatorError::Cancelled)
    } else {
        Ok(())
    }
}

#[async_trait]
impl Evaluator for HeuristicEvaluator {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn evaluate_position(
        &self,
        board: &Board,
        color: Color,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<PositionEvaluation, EvaluatorError> {
        check_cancel(cancel)?;
        Ok(self.evaluate(board, color, context))
    }

    async fn find_best_moves(
        &self,
        board: &Board,
        color: Color,
        dice: DiceRoll,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<BestMovesAnalysis, EvaluatorError> {
        check_cancel(cancel)?;
        Ok(self.rank_plays(board, color, &dice.values(), context))
    }

    async fn analyze_cube_decision(
        &self,
        board: &Board,
        color: Color,
        cube: &DoublingCube,
        context: &MatchContext,
        cancel: &CancellationToken,
    ) -> Result<CubeDecision, EvaluatorError> {
        check_cancel(cancel)?;
        Ok(self.cube_decision(board, color, cube, context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Move;
    use crate::types::Location;

    fn race() -> Board {
        Board::from_layout(
            &[(Location::Point(6), 5), (Location::Point(4), 5), (Location::Point(2), 5)],
            &[(Location::Point(20), 5), (Location::Point(22), 5), (Location::Point(24), 5)],
        )
        .unwrap()
    }

    /// No hit, no weaker structure for the mover and nothing changed for the opponent.
    fn is_safe_advance(before: &Board, after: &Board, mv: &Move) -> bool {
        let (b, a) = (
            PositionFeatures::extract(before, Color::White),
            PositionFeatures::extract(after, Color::White),
        );
        !mv.hit
            && a.home_points >= b.home_points
            && a.prime >= b.prime
            && a.anchors >= b.anchors
            && a.direct_blots <= b.direct_blots
            && a.indirect_blots <= b.indirect_blots
            && a.stragglers <= b.stragglers
            && a.bar <= b.bar
            && PositionFeatures::extract(before, Color::Red) == PositionFeatures::extract(after, Color::Red)
    }

    fn contact() -> Board {
        Board::from_layout(
            &[
                (Location::Point(6), 3),
                (Location::Point(5), 3),
                (Location::Point(4), 3),
                (Location::Point(3), 3),
                (Location::Point(2), 2),
                (Location::Point(15), 1),
            ],
            &[(Location::Point(13), 2), (Location::Point(24), 7), (Location::Point(23), 6)],
        )
        .unwrap()
    }

    #[test]
    fn test_opening_position_is_roughly_even() {
        let eval = HeuristicEvaluator::default().evaluate(&Board::new(), Color::White, &MatchContext::money_game());
        assert!(eval.win > 0.45 && eval.win < 0.65, "win = {}", eval.win);
    }

    #[test]
    fn test_safe_advance_never_lowers_equity() {
        let evaluator = HeuristicEvaluator::default();
        let ctx = MatchContext::money_game();
        let board = race();
        let before = evaluator.evaluate(&board, Color::White, &ctx).equity;
        for die in 1..=6 {
            for mv in MoveGenerator::single_moves(&board, Color::White, &[die]) {
                let after = board.apply(Color::White, &mv).unwrap();
                let equity = evaluator.evaluate(&after, Color::White, &ctx).equity;
                assert!(equity >= before, "{} lowered equity {} -> {}", mv, before, equity);
            }
        }
    }

    #[test]
    fn test_breaking_contact_never_lowers_equity() {
        let evaluator = HeuristicEvaluator::default();
        let ctx = MatchContext::money_game();
        let board = contact();
        assert!(board.has_contact());
        let mv = Move::new(Location::Point(15), Location::Point(9), 6, false);
        let after = board.apply(Color::White, &mv).unwrap();
        assert!(!after.has_contact());
        let before = evaluator.evaluate(&board, Color::White, &ctx).equity;
        let equity = evaluator.evaluate(&after, Color::White, &ctx).equity;
        assert!(equity >= before, "15/9 lowered equity {} -> {}", before, equity);
    }

    #[test]
    fn test_safe_advance_in_contact_never_lowers_equity() {
        let evaluator = HeuristicEvaluator::default();
        let ctx = MatchContext::money_game();
        let mut checked = 0;
        for board in [Board::new(), contact(), race()] {
            let before = evaluator.evaluate(&board, Color::White, &ctx).equity;
            for die in 1..=6 {
                for mv in MoveGenerator::single_moves(&board, Color::White, &[die]) {
                    let after = board.apply(Color::White, &mv).unwrap();
                    if !is_safe_advance(&board, &after, &mv) {
                        continue;
                    }
                    checked += 1;
                    let equity = evaluator.evaluate(&after, Color::White, &ctx).equity;
                    assert!(
                        equity >= before - 1e-12,
                        "{} lowered equity {} -> {}",
                        mv,
                        before,
                        equity
                    );
                }
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn test_ranked_plays_are_legal() {
        let evaluator = HeuristicEvaluator::default();
        let board = Board::new();
        let analysis = evaluator.rank_plays(&board, Color::White, &[3, 1], &MatchContext::money_game());
        let legal = MoveGenerator::sequences(&board, Color::White, &[3, 1]);
        assert_eq!(analysis.top_moves().len(), legal.len());
        assert_eq!(analysis.clone().retain_legal(&legal), analysis);
    }

    #[test]
    fn test_big_race_lead_passes() {
        let evaluator = HeuristicEvaluator::default();
        let board = Board::from_layout(
            &[(Location::Point(1), 3)],
            &[(Location::Point(1), 0), (Location::Point(13), 15)],
        )
        .unwrap();
        let ctx = MatchContext::new(7, 0, 0, false);
        let mut cube = DoublingCube::new();
        let doubler = evaluator.cube_decision(&board, Color::White, &cube, &ctx);
        assert_ne!(doubler.recommendation, CubeRecommendation::NoDouble);
        cube.offer(Color::White, false).unwrap();
        let taker = evaluator.cube_decision(&board, Color::Red, &cube, &ctx);
        assert_eq!(taker.recommendation, CubeRecommendation::Pass);
    }

    #[test]
    fn test_crawford_never_doubles() {
        let evaluator = HeuristicEvaluator::default();
        let board = Board::from_layout(&[(Location::Point(1), 3)], &[(Location::Point(13), 15)]).unwrap();
        let ctx = MatchContext::new(5, 4, 0, false);
        assert!(ctx.is_crawford_game());
        let decision = evaluator.cube_decision(&board, Color::Red, &DoublingCube::new(), &ctx);
        assert_eq!(decision.recommendation, CubeRecommendation::NoDouble);
    }

    #[tokio::test]
    async fn test_cancelled_token_returns_nothing() {
        let evaluator = HeuristicEvaluator::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = evaluator
            .evaluate_position(&Board::new(), Color::White, &MatchContext::money_game(), &cancel)
            .await;
        assert_eq!(result, Err(EvaluatorError::Cancelled));
    }
}
