pub mod parameters;
pub mod pv;

use std::ops::ControlFlow;

use arrayvec::ArrayVec;

use crate::{
    chess::{
        board::{
            Board,
            movegen::{MAX_POSITION_MOVES, MoveList},
        },
        chessmove::Move,
        piece::PieceType,
    },
    evaluation::{DRAW_SCORE, MATE_SCORE, is_mate_score, mated_in},
    historytable::{HistoryTable, KillerTable, update_history},
    search::pv::PVariation,
    searchinfo::SearchInfo,
    transpositiontable::{Bound, TT},
    uci,
    util::{INFINITY, MAX_DEPTH, MAX_PLY},
};

use self::parameters::Config;

// In alpha-beta search, there are three classes of node to be aware of:
// 1. PV-nodes: nodes that end up being within the alpha-beta window,
// i.e. a call to alpha_beta(PVNODE, a, b) returns a value v where v is within the exclusive window (a, b).
// 2. Cut-nodes: nodes that fail high, returning a lower bound v >= beta.
// 3. All-nodes: nodes where no move raises alpha, returning an upper bound v <= alpha.

const ASPIRATION_WINDOW: i32 = 50;
const ASPIRATION_MIN_DEPTH: i32 = 4;
const RFP_MARGIN: i32 = 80;
const RFP_DEPTH: i32 = 6;
const NMP_BASE_REDUCTION: i32 = 3;
const NMP_REDUCTION_DEPTH_DIVISOR: i32 = 4;
const RAZORING_COEFF_0: i32 = 150;
const RAZORING_COEFF_1: i32 = 175;
const RAZORING_DEPTH: i32 = 3;
const LMR_BASE: f64 = 75.0;
const LMR_DIVISION: f64 = 225.0;
const LMR_BASE_MOVES: usize = 4;
const LMR_MIN_DEPTH: i32 = 3;

/// A stopped iteration whose score moved further than this from the last
/// completed one is not trusted.
const UNSTABLE_SCORE_SWING: i32 = 300;

const TT_MOVE_SCORE: i32 = 30_000_000;
const TACTICAL_SCORE: i32 = 20_000_000;
const FIRST_KILLER_SCORE: i32 = 10_000_000;
const SECOND_KILLER_SCORE: i32 = 9_000_000;

pub trait NodeType {
    /// Whether this node is on the principal variation.
    const PV: bool;
    /// Whether this node is the root of the search tree.
    const ROOT: bool;
    /// The node type that arises from a PV search in this node.
    type Next: NodeType;
}

/// The root node of the search tree.
pub struct Root;
/// A node with a non-null search window.
pub struct OnPV;
/// A node with a null window, where we're trying to prove a PV.
pub struct OffPV;

impl NodeType for Root {
    const PV: bool = true;
    const ROOT: bool = true;
    type Next = OnPV;
}
impl NodeType for OnPV {
    const PV: bool = true;
    const ROOT: bool = false;
    type Next = Self;
}
impl NodeType for OffPV {
    const PV: bool = false;
    const ROOT: bool = false;
    type Next = Self;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StackEntry {
    /// The move being searched from this ply, or `None` for a null move.
    pub searching: Option<Move>,
}

/// Everything a search owns besides the board: the hash table, the move-ordering
/// heuristics, and the best line found so far. One session serves a whole game.
pub struct SearchSession {
    pub tt: TT,
    pub history: HistoryTable,
    pub killers: KillerTable,
    pub ss: [StackEntry; MAX_PLY + 1],
    pub lm_table: LMTable,
    pub conf: Config,
    /// The line from the deepest iteration that is fit to be reported.
    pub best_line: PVariation,
    /// The depth of `best_line`, zero before the first iteration completes.
    pub completed: i32,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new(TT::default())
    }
}

impl SearchSession {
    pub fn new(tt: TT) -> Self {
        let conf = Config::default();
        Self {
            tt,
            history: HistoryTable::new(),
            killers: KillerTable::new(),
            ss: [StackEntry::default(); MAX_PLY + 1],
            lm_table: LMTable::new(&conf),
            conf,
            best_line: PVariation::default(),
            completed: 0,
        }
    }

    /// Forgets everything learned about the previous game.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.history.clear();
        self.killers.clear();
    }

    /// Resets the per-search state. The hash table survives between searches of the same game.
    pub fn set_up_for_search(&mut self) {
        self.history.clear();
        self.killers.clear();
        self.ss = [StackEntry::default(); MAX_PLY + 1];
        self.best_line = PVariation::default();
        self.completed = 0;
    }

    pub fn set_hash_size(&mut self, megabytes: usize) {
        self.tt.resize(megabytes);
    }

    fn update_best_line(&mut self, pv: &PVariation, depth: i32) {
        self.best_line.clone_from(pv);
        self.completed = depth;
    }

    /// Assigns ordering scores: hash move, then captures and promotions by
    /// most-valuable-victim / least-valuable-attacker, then killers, then history.
    fn score_moves(&self, board: &Board, move_list: &mut MoveList, tt_move: Option<Move>, height: usize) {
        for entry in move_list.iter_mut() {
            let m = entry.mov;
            entry.score = if Some(m) == tt_move {
                TT_MOVE_SCORE
            } else if !m.is_quiet() {
                let promo_value = m.promotion().map_or(0, |p| p.piece_type().see_value());
                let mvv_lva = if m.is_capture() {
                    let victim = if m.is_ep() {
                        PieceType::Pawn
                    } else {
                        board.piece_at(m.to()).map_or(PieceType::Pawn, |p| p.piece_type())
                    };
                    victim.see_value() - m.piece().piece_type().see_value()
                } else {
                    0
                };
                TACTICAL_SCORE + mvv_lva + promo_value
            } else {
                match self.killers.slot_of(height, m) {
                    Some(0) => FIRST_KILLER_SCORE,
                    Some(_) => SECOND_KILLER_SCORE,
                    None => i32::from(self.history.get(m.piece(), m.to())),
                }
            };
        }
    }
}

impl Board {
    /// Performs the root search, printing `info` lines and the chosen move if
    /// the `SearchInfo` asks for it. Returns the score of the position, from the
    /// side to move's perspective, and the best move.
    pub fn search_position(&mut self, info: &mut SearchInfo, t: &mut SearchSession) -> (i32, Option<Move>) {
        self.zero_height();
        t.set_up_for_search();

        let legal_moves = self.legal_moves();
        if legal_moves.is_empty() {
            tracing::warn!(fen = %self, "search called on a position with no legal moves");
            let score = if self.in_check() { -MATE_SCORE } else { DRAW_SCORE };
            if info.print_to_stdout {
                println!("info depth 0 score {}", uci::format_score(score));
                println!("bestmove 0000");
            }
            return (score, None);
        }

        self.iterative_deepening(info, t);

        let best_move = t
            .best_line
            .moves()
            .first()
            .copied()
            .filter(|m| legal_moves.contains(m))
            .unwrap_or(legal_moves[0]);

        tracing::debug!(
            depth = t.completed,
            score = t.best_line.score,
            nodes = info.nodes,
            elapsed_ms = info.elapsed().as_millis(),
            "search finished"
        );

        if info.print_to_stdout {
            println!("bestmove {best_move}");
        }

        (t.best_line.score, Some(best_move))
    }

    /// Searches depth 1, 2, 3, ... until the limit is reached or the search is stopped.
    fn iterative_deepening(&mut self, info: &mut SearchInfo, t: &mut SearchSession) {
        let max_depth = info.limit.depth().unwrap_or(MAX_DEPTH - 1).clamp(1, MAX_DEPTH - 1);
        let mut aw = AspirationWindow::infinite();
        let mut pv = PVariation::default();

        for depth in 1..=max_depth {
            if self.aspiration(&mut pv, info, t, &mut aw, depth).is_break() {
                break;
            }

            let score = t.best_line.score;
            aw = if depth >= ASPIRATION_MIN_DEPTH {
                AspirationWindow::around_value(score, t.conf.aspiration_window)
            } else {
                AspirationWindow::infinite()
            };

            // a forced mate that fits inside the completed depth can't be improved upon.
            if is_mate_score(score) && MATE_SCORE - score.abs() <= depth {
                break;
            }
        }
    }

    /// Searches one depth to completion, re-searching with the full window on
    /// a fail. Breaks if the search was stopped before the depth completed.
    fn aspiration(
        &mut self,
        pv: &mut PVariation,
        info: &mut SearchInfo,
        t: &mut SearchSession,
        aw: &mut AspirationWindow,
        depth: i32,
    ) -> ControlFlow<()> {
        loop {
            pv.score = self.alpha_beta::<Root>(pv, info, t, depth, aw.alpha, aw.beta);
            if info.stopped {
                self.salvage_partial_iteration(pv, info, t, aw, depth);
                return ControlFlow::Break(());
            }

            if pv.score <= aw.alpha {
                self.readout_info(Bound::Upper, pv, depth, info, t);
                *aw = AspirationWindow::infinite();
                continue;
            }
            if pv.score >= aw.beta {
                self.readout_info(Bound::Lower, pv, depth, info, t);
                *aw = AspirationWindow::infinite();
                continue;
            }

            t.update_best_line(pv, depth);
            self.readout_info(Bound::Exact, pv, depth, info, t);
            return ControlFlow::Continue(());
        }
    }

    /// A stopped iteration still carries the best move among the root moves it
    /// finished. It replaces the last completed line only if it looks sane:
    /// inside the window, close to the previous score, and not a mate.
    fn salvage_partial_iteration(
        &self,
        pv: &PVariation,
        info: &SearchInfo,
        t: &mut SearchSession,
        aw: &AspirationWindow,
        depth: i32,
    ) {
        let Some(&first) = pv.moves().first() else {
            return;
        };
        let score = pv.score;
        let unreliable = t.completed == 0
            || score <= aw.alpha
            || score >= aw.beta
            || (score - t.best_line.score).abs() > UNSTABLE_SCORE_SWING
            || is_mate_score(score);
        if unreliable {
            tracing::debug!(depth, score, mv = %first, "discarding partial iteration");
            return;
        }
        t.best_line.clone_from(pv);
        self.readout_info(Bound::Lower, pv, depth, info, t);
    }

    /// Quiescence search: only captures are explored, except when in check.
    pub fn quiescence<NT: NodeType>(
        &mut self,
        pv: &mut PVariation,
        info: &mut SearchInfo,
        t: &mut SearchSession,
        mut alpha: i32,
        beta: i32,
    ) -> i32 {
        #[cfg(debug_assertions)]
        if let Err(e) = self.check_validity() {
            panic!("invalid position in quiescence: {e}");
        }

        pv.moves.clear();

        if info.stopped {
            return 0;
        }
        info.visit();

        let height = self.height();
        let in_check = self.in_check();

        if self.is_draw() {
            return self.draw_score(in_check, height);
        }

        // are we too deep?
        if height >= MAX_PLY {
            return if in_check { DRAW_SCORE } else { self.evaluate() };
        }

        let mut local_pv = PVariation::default();
        let l_pv = &mut local_pv;

        // the side to move can always decline to capture, unless it is in check.
        let stand_pat = if in_check { -INFINITY } else { self.evaluate() };
        if stand_pat >= beta {
            return stand_pat;
        }
        alpha = alpha.max(stand_pat);

        let mut move_list = MoveList::new();
        if in_check {
            self.generate_moves(&mut move_list);
        } else {
            self.generate_captures(&mut move_list);
        }
        t.score_moves(self, &mut move_list, None, height);

        let mut best_score = stand_pat;
        let mut moves_made = 0;
        let mut index = 0;
        while let Some(m) = move_list.pick(index) {
            index += 1;
            if !self.make_move(m, true) {
                continue;
            }
            moves_made += 1;
            let score = -self.quiescence::<NT::Next>(l_pv, info, t, -beta, -alpha);
            self.unmake_move();

            if info.stopped {
                return 0;
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    alpha = score;
                    if NT::PV {
                        pv.load_from(m, l_pv);
                    }
                }
                if alpha >= beta {
                    break;
                }
            }
        }

        if in_check && moves_made == 0 {
            return mated_in(height);
        }

        best_score
    }

    /// Performs alpha-beta minimax search over the game tree, returning a
    /// fail-soft score from the side to move's perspective.
    #[allow(clippy::too_many_lines)]
    pub fn alpha_beta<NT: NodeType>(
        &mut self,
        pv: &mut PVariation,
        info: &mut SearchInfo,
        t: &mut SearchSession,
        mut depth: i32,
        mut alpha: i32,
        beta: i32,
    ) -> i32 {
        #[cfg(debug_assertions)]
        if let Err(e) = self.check_validity() {
            panic!("invalid position in alpha_beta: {e}");
        }

        pv.moves.clear();

        if info.stopped {
            return 0;
        }

        let height = self.height();
        debug_assert_eq!(height == 0, NT::ROOT);

        let in_check = self.in_check();

        if !NT::ROOT {
            if self.is_draw() {
                return self.draw_score(in_check, height);
            }

            // are we too deep?
            if height >= MAX_PLY {
                return if in_check { DRAW_SCORE } else { self.evaluate() };
            }
        }

        // check extension.
        if in_check {
            depth += 1;
        }

        let key = self.key();
        let tt_hit = t.tt.probe(key, height);
        if !NT::PV {
            if let Some(value) = tt_hit.and_then(|hit| hit.cutoff(depth, alpha, beta)) {
                return value;
            }
        }
        let tt_move = tt_hit.and_then(|hit| hit.mov);

        if depth <= 0 {
            return self.quiescence::<NT::Next>(pv, info, t, alpha, beta);
        }

        info.visit();

        let mut local_pv = PVariation::default();
        let l_pv = &mut local_pv;

        if !NT::PV && !in_check {
            let static_eval = self.evaluate();

            // reverse futility pruning: if the static eval is far enough above
            // beta, assume some move will hold it there.
            if depth <= t.conf.rfp_depth
                && !is_mate_score(beta)
                && static_eval - t.conf.rfp_margin * depth >= beta
            {
                return static_eval;
            }

            let last_move_was_null = height > 0 && t.ss[height - 1].searching.is_none();

            // null-move pruning.
            // if we can give the opponent a free move while retaining
            // a score above beta, we can prune the node.
            if !last_move_was_null
                && depth >= 3
                && static_eval >= beta
                && !is_mate_score(beta)
                && self.zugzwang_unlikely()
            {
                let r = t.conf.nmp_base_reduction + depth / t.conf.nmp_reduction_depth_divisor;
                t.ss[height].searching = None;
                self.make_nullmove();
                let mut null_score = -self.alpha_beta::<OffPV>(l_pv, info, t, depth - r, -beta, -beta + 1);
                self.unmake_nullmove();
                if info.stopped {
                    return 0;
                }
                if null_score >= beta {
                    // don't return unproven mates.
                    if is_mate_score(null_score) {
                        null_score = beta;
                    }
                    return null_score;
                }
            }

            // razoring: hopeless shallow nodes only get a capture search.
            if depth <= t.conf.razoring_depth
                && static_eval + t.conf.razoring_coeff_0 + t.conf.razoring_coeff_1 * depth <= alpha
            {
                let v = self.quiescence::<OffPV>(l_pv, info, t, alpha, beta);
                if v <= alpha {
                    return v;
                }
            }
        }

        let mut move_list = MoveList::new();
        self.generate_moves(&mut move_list);
        t.score_moves(self, &mut move_list, tt_move, height);
        t.killers.clear_child(height);

        let original_alpha = alpha;
        let mut best_move = None;
        let mut best_score = -INFINITY;
        let mut moves_made = 0;
        let mut quiets_tried = ArrayVec::<Move, MAX_POSITION_MOVES>::new();

        let mut index = 0;
        while let Some(m) = move_list.pick(index) {
            index += 1;
            let is_quiet = m.is_quiet();
            let is_killer = t.killers.slot_of(height, m).is_some();

            t.ss[height].searching = Some(m);
            if !self.make_move(m, false) {
                continue;
            }
            moves_made += 1;

            let gives_check = self.in_check();
            let new_depth = depth - 1;

            let mut score;
            if moves_made == 1 {
                // first move (presumably the PV-move)
                score = -self.alpha_beta::<NT::Next>(l_pv, info, t, new_depth, -beta, -alpha);
            } else {
                // calculation of LMR stuff
                let r = if depth >= t.conf.lmr_min_depth
                    && moves_made > t.conf.lmr_base_moves
                    && is_quiet
                    && !is_killer
                    && !in_check
                    && !gives_check
                {
                    t.lm_table.lm_reduction(depth, moves_made).clamp(0, new_depth - 1)
                } else {
                    0
                };
                // perform a zero-window search, reduced if the move is late and quiet.
                score = -self.alpha_beta::<OffPV>(l_pv, info, t, new_depth - r, -alpha - 1, -alpha);
                // if we failed high on a reduced search, try again at full depth.
                if r > 0 && score > alpha {
                    score = -self.alpha_beta::<OffPV>(l_pv, info, t, new_depth, -alpha - 1, -alpha);
                }
                // if we failed completely, then do full-window search
                if NT::PV && score > alpha && score < beta {
                    score = -self.alpha_beta::<NT::Next>(l_pv, info, t, new_depth, -beta, -alpha);
                }
            }
            self.unmake_move();

            if info.stopped {
                // the root keeps whatever it finished, for the driver to judge.
                return if NT::ROOT { best_score } else { 0 };
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    best_move = Some(m);
                    alpha = score;
                    if NT::PV {
                        pv.load_from(m, l_pv);
                    }
                    if is_quiet {
                        update_history(t.history.get_mut(m.piece(), m.to()), depth, true);
                    }
                }
                if alpha >= beta {
                    if is_quiet {
                        t.killers.insert(height, m);
                        for &failed in &quiets_tried {
                            update_history(t.history.get_mut(failed.piece(), failed.to()), depth, false);
                        }
                    }
                    break;
                }
            }

            if is_quiet {
                quiets_tried.push(m);
            }
        }

        if moves_made == 0 {
            return if in_check { mated_in(height) } else { DRAW_SCORE };
        }

        let flag = if best_score >= beta {
            Bound::Lower
        } else if alpha != original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        t.tt.store(key, height, best_move, best_score, flag, depth);

        best_score
    }

    /// The score of a position the rules declare drawn. Checkmate on the
    /// hundredth half-move still counts as checkmate.
    fn draw_score(&mut self, in_check: bool, height: usize) -> i32 {
        if in_check && self.fifty_move_counter() >= 100 && self.legal_moves().is_empty() {
            return mated_in(height);
        }
        DRAW_SCORE
    }

    fn readout_info(&self, bound: Bound, pv: &PVariation, depth: i32, info: &SearchInfo, t: &SearchSession) {
        debug_assert_eq!(self.height(), 0);
        if !info.print_to_stdout {
            return;
        }
        let bound_string = match bound {
            Bound::Upper => " upperbound",
            Bound::Lower => " lowerbound",
            _ => "",
        };
        println!(
            "info depth {depth} score {score}{bound_string} nodes {nodes} nps {nps} time {time} hashfull {hashfull} {pv}",
            score = uci::format_score(pv.score),
            nodes = info.nodes,
            nps = info.nps(),
            time = info.elapsed().as_millis(),
            hashfull = t.tt.hashfull(),
        );
    }
}

#[derive(Clone, Debug)]
pub struct LMTable {
    /// The reduction table. rtable\[depth]\[played] is the base LMR reduction for a move
    lm_reduction_table: [[i32; 64]; 64],
}

impl LMTable {
    pub const NULL: Self = Self {
        lm_reduction_table: [[0; 64]; 64],
    };

    pub fn new(config: &Config) -> Self {
        #![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let mut out = Self::NULL;
        let (base, division) = (config.lmr_base / 100.0, config.lmr_division / 100.0);
        cfor!(let mut depth = 1; depth < 64; depth += 1; {
            cfor!(let mut played = 1; played < 64; played += 1; {
                let ld = f64::ln(depth as f64);
                let lp = f64::ln(played as f64);
                out.lm_reduction_table[depth][played] = (base + ld * lp / division) as i32;
            });
        });
        out
    }

    pub fn lm_reduction(&self, depth: i32, moves_made: usize) -> i32 {
        let depth: usize = depth.clamp(0, 63).try_into().unwrap_or_default();
        let played = moves_made.min(63);
        self.lm_reduction_table[depth][played]
    }
}

impl Default for LMTable {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

pub struct AspirationWindow {
    pub alpha: i32,
    pub beta: i32,
}

impl AspirationWindow {
    pub const fn infinite() -> Self {
        Self {
            alpha: -INFINITY,
            beta: INFINITY,
        }
    }

    pub const fn around_value(value: i32, margin: i32) -> Self {
        if is_mate_score(value) {
            // mate scores fluctuate by whole plies, a window would only cause re-searches.
            Self::infinite()
        } else {
            Self {
                alpha: value - margin,
                beta: value + margin,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chess::magic::test_tables, evaluation::mate_in, timemgmt::SearchLimit,
    };

    fn quiet_info(limit: SearchLimit) -> SearchInfo<'static> {
        let mut info = SearchInfo::new(limit);
        info.print_to_stdout = false;
        info
    }

    #[test]
    fn finds_a_rook_roller_mate_in_two() {
        let mut board = Board::from_fen("7k/8/8/8/8/8/8/RR4K1 w - - 0 1", test_tables()).unwrap();
        let mut t = SearchSession::new(TT::with_entries(1 << 16));
        let mut info = quiet_info(SearchLimit::Depth(5));
        let (score, best_move) = board.search_position(&mut info, &mut t);
        assert_eq!(score, mate_in(3));
        let best_move = best_move.unwrap().to_string();
        assert!(["a1a7", "b1b7"].contains(&best_move.as_str()), "{best_move}");
    }

    #[test]
    fn finds_mate_in_one_and_stops_early() {
        let mut board = Board::from_fen("7k/8/6K1/8/8/8/8/1Q6 w - - 0 1", test_tables()).unwrap();
        let mut t = SearchSession::new(TT::with_entries(1 << 16));
        let mut info = quiet_info(SearchLimit::Depth(6));
        let (score, best_move) = board.search_position(&mut info, &mut t);
        assert_eq!(score, mate_in(1));
        assert_eq!(best_move.unwrap().to_string(), "b1b8");
        assert_eq!(t.completed, 1);
    }

    #[test]
    fn threefold_repetition_scores_as_a_draw() {
        let mut board = Board::new(test_tables());
        board
            .play_uci_moves("g1f3 g8f6 f3g1 f6g8 g1f3 g8f6 f3g1".split_whitespace())
            .unwrap();
        let m = board.parse_uci("f6g8").unwrap();
        assert!(board.make_move(m, false));
        assert!(board.is_repetition());
        let mut t = SearchSession::new(TT::with_entries(1024));
        let mut info = quiet_info(SearchLimit::Infinite);
        let mut pv = PVariation::default();
        let score = board.alpha_beta::<OffPV>(&mut pv, &mut info, &mut t, 3, -101, -100);
        assert_eq!(score, DRAW_SCORE);
    }

    #[test]
    fn fifty_move_rule_yields_to_checkmate() {
        let mut t = SearchSession::new(TT::with_entries(1024));
        let mut info = quiet_info(SearchLimit::Infinite);
        let mut pv = PVariation::default();

        let mut board = Board::from_fen("7k/8/6K1/8/8/8/8/1Q6 w - - 99 80", test_tables()).unwrap();
        let mate = board.parse_uci("b1b8").unwrap();
        assert!(board.make_move(mate, false));
        assert_eq!(board.fifty_move_counter(), 100);
        let score = board.alpha_beta::<OffPV>(&mut pv, &mut info, &mut t, 2, -1, 0);
        assert_eq!(score, mated_in(1));
        board.unmake_move();

        let quiet = board.parse_uci("b1c1").unwrap();
        assert!(board.make_move(quiet, false));
        let score = board.alpha_beta::<OffPV>(&mut pv, &mut info, &mut t, 2, -1, 0);
        assert_eq!(score, DRAW_SCORE);
    }

    #[test]
    fn checkmated_and_stalemated_roots() {
        let mut t = SearchSession::new(TT::with_entries(1024));
        let mut info = quiet_info(SearchLimit::Depth(2));
        let mut board = Board::from_fen("7k/6Q1/6K1/8/8/8/8/8 b - - 0 1", test_tables()).unwrap();
        assert_eq!(board.search_position(&mut info, &mut t), (-MATE_SCORE, None));
        let mut board = Board::from_fen("7k/8/6QK/8/8/8/8/8 b - - 0 1", test_tables()).unwrap();
        assert_eq!(board.search_position(&mut info, &mut t), (DRAW_SCORE, None));
    }

    #[test]
    fn depth_limited_search_returns_a_legal_move() {
        let mut board = Board::new(test_tables());
        let mut t = SearchSession::new(TT::with_entries(1 << 16));
        let mut info = quiet_info(SearchLimit::Depth(4));
        let (score, best_move) = board.search_position(&mut info, &mut t);
        assert!(board.legal_moves().contains(&best_move.unwrap()));
        assert!(score.abs() < 200, "{score}");
        assert_eq!(t.completed, 4);
        assert!(info.nodes > 0);
    }

    #[test]
    fn wins_hanging_queen() {
        let mut board = Board::from_fen(
            "rnb1kbnr/pppp1ppp/8/4p1q1/3P4/2N5/PPP1PPPP/R1BQKBNR w KQkq - 0 1",
            test_tables(),
        )
        .unwrap();
        let mut t = SearchSession::new(TT::with_entries(1 << 16));
        let mut info = quiet_info(SearchLimit::Depth(3));
        let (_, best_move) = board.search_position(&mut info, &mut t);
        assert_eq!(best_move.unwrap().to_string(), "c1g5");
    }

    #[test]
    fn reductions_grow_with_depth_and_move_number() {
        let lmt = LMTable::default();
        assert!(lmt.lm_reduction(10, 20) >= lmt.lm_reduction(3, 5));
        assert!(lmt.lm_reduction(63, 63) > 0);
        assert_eq!(lmt.lm_reduction(1, 1), 0);
    }

    fn line(m: Move, score: i32) -> PVariation {
        let mut pv = PVariation::default();
        pv.load_from(m, &PVariation::default());
        pv.score = score;
        pv
    }

    #[test]
    fn partial_iterations_are_only_kept_when_sane() {
        let board = Board::new(test_tables());
        let info = quiet_info(SearchLimit::Infinite);
        let mut t = SearchSession::new(TT::with_entries(1024));
        let e4 = board.clone().parse_uci("e2e4").unwrap();
        let d4 = board.clone().parse_uci("d2d4").unwrap();
        let window = AspirationWindow::around_value(20, ASPIRATION_WINDOW);

        let reset = |t: &mut SearchSession| {
            t.best_line = line(e4, 20);
            t.completed = 6;
        };

        // close to the last score and inside the window: the new move wins.
        reset(&mut t);
        board.salvage_partial_iteration(&line(d4, 45), &info, &mut t, &window, 7);
        assert_eq!(t.best_line.moves(), [d4]);
        assert_eq!(t.best_line.score(), 45);
        assert_eq!(t.completed, 6);

        // failed high on the aspiration window.
        reset(&mut t);
        board.salvage_partial_iteration(&line(d4, 20 + ASPIRATION_WINDOW), &info, &mut t, &window, 7);
        assert_eq!(t.best_line.moves(), [e4]);

        // a wild swing, even with a window that would admit it.
        reset(&mut t);
        let open = AspirationWindow::infinite();
        board.salvage_partial_iteration(&line(d4, 20 + UNSTABLE_SCORE_SWING + 1), &info, &mut t, &open, 7);
        assert_eq!(t.best_line.moves(), [e4]);
        assert_eq!(t.best_line.score(), 20);

        // a mate found right at the cutoff.
        reset(&mut t);
        board.salvage_partial_iteration(&line(d4, mate_in(9)), &info, &mut t, &open, 7);
        assert_eq!(t.best_line.moves(), [e4]);

        // nothing completed yet, so there is nothing to compare against.
        t.best_line = PVariation::default();
        t.completed = 0;
        board.salvage_partial_iteration(&line(d4, 0), &info, &mut t, &open, 1);
        assert!(t.best_line.moves().is_empty());

        // a stopped iteration without a move leaves the old line alone.
        reset(&mut t);
        board.salvage_partial_iteration(&PVariation::default(), &info, &mut t, &open, 7);
        assert_eq!(t.best_line.moves(), [e4]);
    }

    #[test]
    fn failed_windows_re_search_the_same_depth() {
        let mut board = Board::new(test_tables());
        let mut info = quiet_info(SearchLimit::Infinite);
        let mut pv = PVariation::default();

        for (alpha, beta) in [(1000, 1001), (-1001, -1000)] {
            let mut t = SearchSession::new(TT::with_entries(1 << 12));
            let mut aw = AspirationWindow { alpha, beta };
            let flow = board.aspiration(&mut pv, &mut info, &mut t, &mut aw, 3);
            assert!(flow.is_continue());
            assert_eq!((aw.alpha, aw.beta), (-INFINITY, INFINITY));
            assert_eq!(t.completed, 3);
            assert!(t.best_line.score().abs() < 200, "{}", t.best_line.score());
            assert!(!t.best_line.moves().is_empty());
        }
    }

    #[test]
    fn stopped_iteration_breaks_the_deepening() {
        let mut board = Board::new(test_tables());
        let mut info = quiet_info(SearchLimit::Infinite);
        info.stopped = true;
        let mut t = SearchSession::new(TT::with_entries(1024));
        let mut pv = PVariation::default();
        let mut aw = AspirationWindow::infinite();
        assert!(board.aspiration(&mut pv, &mut info, &mut t, &mut aw, 1).is_break());
        assert_eq!(t.completed, 0);
        assert!(t.best_line.moves().is_empty());
    }

    #[test]
    fn aspiration_window_is_infinite_around_mates() {
        let aw = AspirationWindow::around_value(mate_in(5), ASPIRATION_WINDOW);
        assert_eq!((aw.alpha, aw.beta), (-INFINITY, INFINITY));
        let aw = AspirationWindow::around_value(30, ASPIRATION_WINDOW);
        assert_eq!((aw.alpha, aw.beta), (30 - ASPIRATION_WINDOW, 30 + ASPIRATION_WINDOW));
    }
}
